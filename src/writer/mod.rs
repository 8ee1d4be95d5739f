//! PDF writing: object serialization and whole-document layout.
//!
//! ```text
//! DocumentIndex
//!     ↓
//! [DocumentSerializer] (header, objects, xref table, trailer)
//!     ↓
//! [ObjectSerializer] (one object → bytes)
//!     ↓
//! PDF bytes
//! ```

mod object_serializer;
mod pdf_writer;

pub use object_serializer::ObjectSerializer;
pub use pdf_writer::{header_for_version, DocumentSerializer, SerializedPdf, DEFAULT_HEADER};
