//! Outline tree construction from a flat heading sequence.
//!
//! Headings arrive in document order, each tagged with an element name such
//! as `H2`. A priority list (`["h1", "h2", ...]`) gives every tag a depth, and
//! the builder nests each heading under the nearest preceding heading of
//! smaller depth.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A heading element as reported by the page extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadingRecord {
    /// Element name, e.g. `H1` (matched case-insensitively)
    pub tag_name: String,
    /// Text content, used as the bookmark title
    pub text: String,
    /// The element's `id`; the bookmark's named destination
    #[serde(default)]
    pub anchor_id: String,
}

impl HeadingRecord {
    /// Create a heading record.
    pub fn new(
        tag_name: impl Into<String>,
        text: impl Into<String>,
        anchor_id: impl Into<String>,
    ) -> Self {
        Self {
            tag_name: tag_name.into(),
            text: text.into(),
            anchor_id: anchor_id.into(),
        }
    }
}

/// Source of heading records for a rendered document.
///
/// Implementations return headings in document order, restricted to the
/// given tag names.
pub trait HeadingExtractor {
    /// Headings whose tag is one of `tags` (ASCII case-insensitive).
    fn headings(&self, tags: &[String]) -> Vec<HeadingRecord>;
}

impl HeadingExtractor for [HeadingRecord] {
    fn headings(&self, tags: &[String]) -> Vec<HeadingRecord> {
        self.iter()
            .filter(|h| tags.iter().any(|t| t.eq_ignore_ascii_case(&h.tag_name)))
            .cloned()
            .collect()
    }
}

impl HeadingExtractor for Vec<HeadingRecord> {
    fn headings(&self, tags: &[String]) -> Vec<HeadingRecord> {
        self.as_slice().headings(tags)
    }
}

/// One bookmark with its nested children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineNode {
    /// Bookmark title
    pub title: String,
    /// Named destination the bookmark jumps to
    pub anchor_id: String,
    /// Index of the heading's tag in the priority list
    pub depth: usize,
    /// Child bookmarks in document order
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    /// Create a leaf node.
    pub fn new(title: impl Into<String>, anchor_id: impl Into<String>, depth: usize) -> Self {
        Self {
            title: title.into(),
            anchor_id: anchor_id.into(),
            depth,
            children: Vec::new(),
        }
    }

    /// Number of strict descendants (children, grandchildren, ...).
    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| 1 + child.descendant_count())
            .sum()
    }

    /// Visit this node and its descendants in pre-order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a OutlineNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

/// Flatten a forest into pre-order.
pub fn preorder(roots: &[OutlineNode]) -> Vec<&OutlineNode> {
    let mut out = Vec::new();
    for root in roots {
        root.walk(&mut |node| out.push(node));
    }
    out
}

/// Builds outline trees from heading sequences.
#[derive(Debug, Clone)]
pub struct OutlineTreeBuilder {
    priority: Vec<String>,
}

impl OutlineTreeBuilder {
    /// Create a builder; `priority[0]` is the top level.
    pub fn new<I, S>(priority: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            priority: priority.into_iter().map(Into::into).collect(),
        }
    }

    /// The tag names in priority order.
    pub fn priority(&self) -> &[String] {
        &self.priority
    }

    /// Depth of a tag name, or `None` if it is not in the priority list.
    pub fn depth_of(&self, tag_name: &str) -> Option<usize> {
        self.priority
            .iter()
            .position(|t| t.eq_ignore_ascii_case(tag_name))
    }

    /// Build the outline forest.
    ///
    /// Every heading must carry an anchor id; the first heading without one
    /// fails the whole build with [`Error::MissingAnchor`] before any node is
    /// created. Headings whose tag is not in the priority list are skipped.
    pub fn build(&self, headings: &[HeadingRecord]) -> Result<Vec<OutlineNode>> {
        if let Some(missing) = headings.iter().find(|h| h.anchor_id.is_empty()) {
            return Err(Error::MissingAnchor {
                title: missing.text.clone(),
            });
        }

        let mut roots = Vec::new();
        // Open nodes, outermost first; each is attached to its parent when closed
        let mut open: Vec<OutlineNode> = Vec::new();

        for heading in headings {
            let Some(depth) = self.depth_of(&heading.tag_name) else {
                log::warn!(
                    "Skipping heading '{}': tag '{}' is not an outline tag",
                    heading.text,
                    heading.tag_name
                );
                continue;
            };

            while open.last().is_some_and(|top| top.depth >= depth) {
                if let Some(closed) = open.pop() {
                    attach(closed, &mut open, &mut roots);
                }
            }
            open.push(OutlineNode::new(heading.text.clone(), heading.anchor_id.clone(), depth));
        }

        while let Some(closed) = open.pop() {
            attach(closed, &mut open, &mut roots);
        }

        log::debug!("Built outline with {} top-level entries", roots.len());
        Ok(roots)
    }
}

fn attach(node: OutlineNode, open: &mut [OutlineNode], roots: &mut Vec<OutlineNode>) {
    match open.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}
