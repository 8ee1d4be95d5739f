//! Document outline (bookmarks).
//!
//! ```text
//! HeadingRecord[] ──OutlineTreeBuilder──▶ OutlineNode tree
//!                 ──ObjectGraphAssembler──▶ /Outlines dictionaries in a DocumentIndex
//! ```
//!
//! [`reader`] walks an existing `/Outlines` tree back into [`OutlineItem`]s.

pub mod assembler;
pub mod reader;
pub mod tree;

pub use assembler::ObjectGraphAssembler;
pub use reader::{read_outline, Destination, OutlineItem};
pub use tree::{preorder, HeadingExtractor, HeadingRecord, OutlineNode, OutlineTreeBuilder};
