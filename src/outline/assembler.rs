//! Outline dictionaries for a built outline tree.
//!
//! Assembly runs in two passes over an arena of slots. The first pass hands
//! out object references (outline root first, then every node in pre-order)
//! and records the child slots of each node; the second pass writes one
//! dictionary per slot, so every `/Parent`, `/Prev`, `/Next`, `/First` and
//! `/Last` link points at a reference that already exists.

use super::tree::OutlineNode;
use crate::error::{Error, Result};
use crate::index::DocumentIndex;
use crate::object::{Dictionary, Object, ObjectRef};

/// One arena entry per outline node.
#[derive(Debug)]
struct Slot<'a> {
    node: &'a OutlineNode,
    reference: ObjectRef,
    children: Vec<usize>,
    descendants: usize,
}

/// Turns an outline tree into linked outline dictionaries inside a
/// [`DocumentIndex`] and hooks them up to the catalog.
#[derive(Debug, Default)]
pub struct ObjectGraphAssembler;

impl ObjectGraphAssembler {
    /// Create an assembler.
    pub fn new() -> Self {
        Self
    }

    /// Write the outline for `tree` into `index` and return the reference of
    /// the `/Type /Outlines` root.
    ///
    /// The catalog (the index's `/Type /Catalog` object) gains an `/Outlines`
    /// entry. Fails with [`Error::EmptyTree`] for an empty tree and with
    /// [`Error::MissingCatalog`] when the index has no catalog; in both cases
    /// the index is left unchanged. Running out of object numbers fails with
    /// [`Error::ObjectNumberOutOfRange`] before any dictionary is stored.
    pub fn assemble(&self, tree: &[OutlineNode], index: &mut DocumentIndex) -> Result<ObjectRef> {
        if tree.is_empty() {
            return Err(Error::EmptyTree);
        }
        let catalog = index.catalog_ref().ok_or(Error::MissingCatalog)?;

        let root = index.allocate()?;
        let mut slots: Vec<Slot<'_>> = Vec::new();
        let top_level = tree
            .iter()
            .map(|node| allocate_slots(node, index, &mut slots))
            .collect::<Result<Vec<usize>>>()?;

        write_layer(&top_level, root, &slots, index)?;

        let total: usize = top_level.iter().map(|&i| 1 + slots[i].descendants).sum();
        let mut root_dict = Dictionary::new();
        root_dict.insert("Type".to_string(), Object::Name("Outlines".to_string()));
        insert_child_links(&mut root_dict, &top_level, &slots, total);
        index.assign(root, Object::Dictionary(root_dict))?;

        if let Some(dict) = index.get_mut(catalog).and_then(Object::as_dict_mut) {
            dict.insert("Outlines".to_string(), Object::Reference(root));
        }

        log::debug!(
            "Assembled outline {} with {} entries under catalog {}",
            root,
            slots.len(),
            catalog
        );
        Ok(root)
    }
}

/// Pre-order reference allocation. Returns the slot index of `node`.
fn allocate_slots<'a>(
    node: &'a OutlineNode,
    index: &mut DocumentIndex,
    slots: &mut Vec<Slot<'a>>,
) -> Result<usize> {
    let slot = slots.len();
    slots.push(Slot {
        node,
        reference: index.allocate()?,
        children: Vec::with_capacity(node.children.len()),
        descendants: 0,
    });

    let mut descendants = 0;
    for child in &node.children {
        let child_slot = allocate_slots(child, index, slots)?;
        descendants += 1 + slots[child_slot].descendants;
        slots[slot].children.push(child_slot);
    }
    slots[slot].descendants = descendants;
    Ok(slot)
}

/// Write the dictionaries for one sibling run and, recursively, their children.
fn write_layer(
    layer: &[usize],
    parent: ObjectRef,
    slots: &[Slot<'_>],
    index: &mut DocumentIndex,
) -> Result<()> {
    for (i, &slot_index) in layer.iter().enumerate() {
        let slot = &slots[slot_index];

        let mut dict = Dictionary::new();
        dict.insert("Title".to_string(), Object::text_string(&slot.node.title));
        dict.insert("Parent".to_string(), Object::Reference(parent));
        if i > 0 {
            dict.insert("Prev".to_string(), Object::Reference(slots[layer[i - 1]].reference));
        }
        if let Some(&next) = layer.get(i + 1) {
            dict.insert("Next".to_string(), Object::Reference(slots[next].reference));
        }
        if !slot.children.is_empty() {
            insert_child_links(&mut dict, &slot.children, slots, slot.descendants);
        }
        dict.insert("Dest".to_string(), Object::Name(slot.node.anchor_id.clone()));

        index.assign(slot.reference, Object::Dictionary(dict))?;
        write_layer(&slot.children, slot.reference, slots, index)?;
    }
    Ok(())
}

fn insert_child_links(dict: &mut Dictionary, children: &[usize], slots: &[Slot<'_>], count: usize) {
    if let (Some(&first), Some(&last)) = (children.first(), children.last()) {
        dict.insert("First".to_string(), Object::Reference(slots[first].reference));
        dict.insert("Last".to_string(), Object::Reference(slots[last].reference));
        dict.insert("Count".to_string(), Object::Integer(count as i64));
    }
}
