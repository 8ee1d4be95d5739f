//! Error types for the post-processing core.
//!
//! This module defines all error types that can occur while loading a PDF,
//! building its outline and serializing it back to bytes.

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during PDF post-processing.
#[derive(Debug, thiserror::Error)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    /// A heading meant for the outline has no anchor id to point at
    #[error(
        "Cannot generate outline item with title '{title}' without any target anchor; \
         the heading element needs an 'id' attribute"
    )]
    MissingAnchor {
        /// Title of the offending heading
        title: String,
    },

    /// Outline assembly was requested for an empty tree
    #[error("Cannot assemble an outline from zero headings")]
    EmptyTree,

    /// No object in the index is recognized as the document catalog
    #[error("Missing document catalog")]
    MissingCatalog,

    /// Invalid PDF header (expected '%PDF-')
    #[error("Invalid PDF header: expected '%PDF-', found '{0}'")]
    InvalidHeader(String),

    /// Parse error at specific byte offset
    #[error("Failed to parse object at byte {offset}: {reason}")]
    ParseError {
        /// Byte offset where error occurred
        offset: usize,
        /// Reason for parse failure
        reason: String,
    },

    /// Invalid cross-reference table
    #[error("Invalid cross-reference table")]
    InvalidXref,

    /// Referenced object not found in the index
    #[error("Object not found: {0} {1} R")]
    ObjectNotFound(u32, u16),

    /// Object has wrong type
    #[error("Invalid object type: expected {expected}, found {found}")]
    InvalidObjectType {
        /// Expected object type
        expected: String,
        /// Actual object type found
        found: String,
    },

    /// Invalid PDF structure (generic)
    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    /// Object number outside `1..=MAX_OBJECT_NUMBER`
    #[error("Object number {0} is outside the range 1..=8388607")]
    ObjectNumberOutOfRange(u64),

    /// Unsupported feature
    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
