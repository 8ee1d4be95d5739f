#![allow(clippy::enum_variant_names)]
#![allow(clippy::should_implement_trait)]

//! # paged_pdf
//!
//! Post-processing core for PDFs exported from paginated HTML.
//!
//! - **Outline**: turns the document's flat heading sequence into a nested
//!   bookmark tree and weaves it into the object graph as `/Outlines`
//!   dictionaries with `/Dest` names equal to the heading anchors.
//! - **Trim boxes**: marks the trimmed page area on pages laid out with bleed.
//! - **Serialization**: writes the object graph back out as a classic PDF with
//!   a cross-reference table and trailer.
//!
//! Input PDFs are read with their classic xref table (following `/Prev`
//! chains); damaged tables are rebuilt by scanning for object headers.
//!
//! ## Quick Start
//!
//! ```ignore
//! use paged_pdf::{postprocess, ExportConfig, HeadingRecord};
//!
//! let input = std::fs::read("book.pdf")?;
//! let headings = vec![
//!     HeadingRecord::new("h1", "Introduction", "intro"),
//!     HeadingRecord::new("h2", "Scope", "scope"),
//! ];
//! let config = ExportConfig::new().with_outline_tags(["h1", "h2"]);
//! let output = postprocess(&input, &headings, &[], &config)?;
//! std::fs::write("book-with-outline.pdf", output)?;
//! ```

// Error handling
pub mod error;

// Object model
pub mod index;
pub mod object;

// Reading
pub mod lexer;
pub mod parser;
pub mod xref;
pub mod xref_reconstruction;

// Document
pub mod config;
pub mod document;
pub mod page_boxes;

// Outline (bookmarks)
pub mod outline;

// Writing
pub mod writer;

// Pipeline
pub mod export;

pub use config::ExportConfig;
pub use document::PdfDocument;
pub use error::{Error, Result};
pub use export::postprocess;
pub use index::DocumentIndex;
pub use object::{Dictionary, Object, ObjectRef};
pub use outline::{
    read_outline, Destination, HeadingExtractor, HeadingRecord, ObjectGraphAssembler,
    OutlineItem, OutlineNode, OutlineTreeBuilder,
};
pub use page_boxes::{BoxRect, PageBoxes};
pub use writer::{DocumentSerializer, SerializedPdf};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
