//! Page boxes reported by the paginator.
//!
//! When a page is laid out with bleed, its crop box is smaller than its media
//! box. The crop box becomes the page's `/TrimBox` so print workflows know
//! where to cut.

use crate::index::DocumentIndex;
use crate::object::{Object, ObjectRef};
use crate::writer::ObjectSerializer;
use serde::{Deserialize, Serialize};

/// A rectangle in PDF user space, given by its origin and size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxRect {
    /// Left edge
    pub x: f64,
    /// Bottom edge
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl BoxRect {
    /// Create a rectangle.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The `[llx lly urx ury]` array for this rectangle.
    pub fn to_object(&self) -> Object {
        ObjectSerializer::rect(self.x, self.y, self.width, self.height)
    }
}

/// Media and crop boxes of one rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageBoxes {
    /// Full sheet including bleed
    pub media: BoxRect,
    /// Final trimmed page
    pub crop: BoxRect,
}

impl PageBoxes {
    /// Whether the page has a bleed area.
    pub fn has_bleed(&self) -> bool {
        self.media != self.crop
    }
}

/// Set `/TrimBox` on each page whose crop box differs from its media box.
///
/// `pages[i]` describes the page `page_refs[i]`; pages without an entry are
/// left alone. Returns the number of pages changed.
pub fn apply_trim_boxes(
    index: &mut DocumentIndex,
    page_refs: &[ObjectRef],
    pages: &[PageBoxes],
) -> usize {
    let mut changed = 0;
    for (page_ref, boxes) in page_refs.iter().zip(pages) {
        if !boxes.has_bleed() {
            continue;
        }
        match index.get_mut(*page_ref).and_then(Object::as_dict_mut) {
            Some(page) => {
                page.insert("TrimBox".to_string(), boxes.crop.to_object());
                changed += 1;
            },
            None => log::warn!("Page {} is missing; cannot set its trim box", page_ref),
        }
    }
    if pages.len() > page_refs.len() {
        log::warn!(
            "{} page box entries but only {} pages in the document",
            pages.len(),
            page_refs.len()
        );
    }
    changed
}
