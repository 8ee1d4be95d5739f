//! Reading an existing document outline back out of the object graph.

use crate::error::{Error, Result};
use crate::index::DocumentIndex;
use crate::object::{decode_text_string, Dictionary, Object, ObjectRef};
use std::collections::HashSet;

/// A single outline item (bookmark) in the document hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineItem {
    /// The title of this bookmark
    pub title: String,

    /// Where the bookmark points; `None` if it has no readable destination
    pub dest: Option<Destination>,

    /// The item's `/Count` entry, if any
    pub count: Option<i64>,

    /// Child bookmarks under this item
    pub children: Vec<OutlineItem>,
}

impl OutlineItem {
    /// Number of strict descendants.
    pub fn descendant_count(&self) -> usize {
        self.children.iter().map(|c| 1 + c.descendant_count()).sum()
    }
}

/// Destination of an outline item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Named destination (from a name or a string)
    Named(String),

    /// Explicit destination array starting with a page reference
    Page(ObjectRef),
}

/// Read the outline attached to the catalog.
///
/// Returns `Ok(None)` when the catalog has no `/Outlines` entry or the outline
/// has no items. Sibling chains are followed through `/First` and `/Next`.
///
/// # Errors
///
/// [`Error::MissingCatalog`] without a catalog, [`Error::ObjectNotFound`] for
/// links to absent objects and [`Error::InvalidPdf`] when links form a cycle.
pub fn read_outline(index: &DocumentIndex) -> Result<Option<Vec<OutlineItem>>> {
    let catalog_ref = index.catalog_ref().ok_or(Error::MissingCatalog)?;
    let catalog = dict_of(index, catalog_ref)?;

    let outlines_ref = match catalog.get("Outlines") {
        Some(Object::Reference(r)) => *r,
        _ => return Ok(None),
    };
    let outlines = dict_of(index, outlines_ref)?;

    let mut visited = HashSet::new();
    visited.insert(outlines_ref);
    let items = read_siblings(index, outlines.get("First"), &mut visited)?;

    if items.is_empty() {
        Ok(None)
    } else {
        Ok(Some(items))
    }
}

fn read_siblings(
    index: &DocumentIndex,
    first: Option<&Object>,
    visited: &mut HashSet<ObjectRef>,
) -> Result<Vec<OutlineItem>> {
    let mut items = Vec::new();
    let mut current = first.and_then(Object::as_reference);

    while let Some(item_ref) = current {
        if !visited.insert(item_ref) {
            return Err(Error::InvalidPdf(format!("outline item {} is linked twice", item_ref)));
        }
        let dict = dict_of(index, item_ref)?;

        let title = match dict.get("Title") {
            Some(Object::String(s)) => decode_text_string(s),
            _ => String::new(),
        };
        let children = read_siblings(index, dict.get("First"), visited)?;

        items.push(OutlineItem {
            title,
            dest: destination(index, dict),
            count: dict.get("Count").and_then(Object::as_integer),
            children,
        });
        current = dict.get("Next").and_then(Object::as_reference);
    }

    Ok(items)
}

fn destination(index: &DocumentIndex, dict: &Dictionary) -> Option<Destination> {
    let target = dict.get("Dest").or_else(|| {
        dict.get("A")
            .and_then(|a| index.resolve(a))
            .and_then(Object::as_dict)
            .and_then(|action| action.get("D"))
    })?;

    match index.resolve(target)? {
        Object::Name(name) => Some(Destination::Named(name.clone())),
        Object::String(s) => Some(Destination::Named(decode_text_string(s))),
        Object::Array(arr) => arr.first().and_then(Object::as_reference).map(Destination::Page),
        _ => None,
    }
}

fn dict_of(index: &DocumentIndex, reference: ObjectRef) -> Result<&Dictionary> {
    let obj = index
        .get(reference)
        .ok_or(Error::ObjectNotFound(reference.id, reference.gen))?;
    obj.as_dict().ok_or_else(|| Error::InvalidObjectType {
        expected: "Dictionary".to_string(),
        found: obj.type_name().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::assembler::ObjectGraphAssembler;
    use crate::outline::tree::{HeadingRecord, OutlineTreeBuilder};

    fn catalog_index() -> DocumentIndex {
        let mut index = DocumentIndex::new();
        let mut catalog = Dictionary::new();
        catalog.insert("Type".to_string(), Object::Name("Catalog".to_string()));
        index.register(Object::Dictionary(catalog)).unwrap();
        index
    }

    #[test]
    fn test_no_outline() {
        let index = catalog_index();
        assert_eq!(read_outline(&index).unwrap(), None);
    }

    #[test]
    fn test_no_catalog() {
        assert!(matches!(read_outline(&DocumentIndex::new()), Err(Error::MissingCatalog)));
    }

    #[test]
    fn test_reads_assembled_outline() {
        let mut index = catalog_index();
        let tree = OutlineTreeBuilder::new(["h1", "h2"])
            .build(&[
                HeadingRecord::new("h1", "Intro", "intro"),
                HeadingRecord::new("h2", "Größe", "size"),
                HeadingRecord::new("h1", "End", "end"),
            ])
            .unwrap();
        ObjectGraphAssembler::new().assemble(&tree, &mut index).unwrap();

        let items = read_outline(&index).unwrap().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Intro");
        assert_eq!(items[0].count, Some(1));
        assert_eq!(items[0].children[0].title, "Größe");
        assert_eq!(items[0].children[0].dest, Some(Destination::Named("size".to_string())));
        assert_eq!(items[1].dest, Some(Destination::Named("end".to_string())));
        assert_eq!(items[1].count, None);
    }

    #[test]
    fn test_action_and_explicit_destinations() {
        let mut index = catalog_index();
        let page = index.register(Object::Null).unwrap();

        let mut action = Dictionary::new();
        action.insert("S".to_string(), Object::Name("GoTo".to_string()));
        action.insert("D".to_string(), Object::String(b"named".to_vec()));

        let outlines = index.allocate().unwrap();
        let second = index.allocate().unwrap();
        let mut first_dict = Dictionary::new();
        first_dict.insert("Title".to_string(), Object::String(b"One".to_vec()));
        first_dict.insert("A".to_string(), Object::Dictionary(action));
        first_dict.insert("Next".to_string(), Object::Reference(second));
        let first = index.register(Object::Dictionary(first_dict)).unwrap();

        let mut second_dict = Dictionary::new();
        second_dict.insert("Title".to_string(), Object::String(b"Two".to_vec()));
        second_dict.insert(
            "Dest".to_string(),
            Object::Array(vec![Object::Reference(page), Object::Name("Fit".to_string())]),
        );
        index.assign(second, Object::Dictionary(second_dict)).unwrap();

        let mut root = Dictionary::new();
        root.insert("First".to_string(), Object::Reference(first));
        index.assign(outlines, Object::Dictionary(root)).unwrap();
        let catalog = index.catalog_ref().unwrap();
        index
            .get_mut(catalog)
            .and_then(Object::as_dict_mut)
            .unwrap()
            .insert("Outlines".to_string(), Object::Reference(outlines));

        let items = read_outline(&index).unwrap().unwrap();
        assert_eq!(items[0].dest, Some(Destination::Named("named".to_string())));
        assert_eq!(items[1].dest, Some(Destination::Page(page)));
    }

    #[test]
    fn test_cycle_is_an_error() {
        let mut index = catalog_index();
        let outlines = index.allocate().unwrap();
        let item = index.allocate().unwrap();

        let mut item_dict = Dictionary::new();
        item_dict.insert("Title".to_string(), Object::String(b"Loop".to_vec()));
        item_dict.insert("Next".to_string(), Object::Reference(item));
        index.assign(item, Object::Dictionary(item_dict)).unwrap();

        let mut root = Dictionary::new();
        root.insert("First".to_string(), Object::Reference(item));
        index.assign(outlines, Object::Dictionary(root)).unwrap();
        let catalog = index.catalog_ref().unwrap();
        index
            .get_mut(catalog)
            .and_then(Object::as_dict_mut)
            .unwrap()
            .insert("Outlines".to_string(), Object::Reference(outlines));

        assert!(matches!(read_outline(&index), Err(Error::InvalidPdf(_))));
    }
}
