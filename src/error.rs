//! Error types for the PDF generator.
//!
//! This module defines all error types that can occur while building and
//! compiling a document.

use crate::fonts::TrueTypeError;

/// Result type alias for PDF generator operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during document construction and compilation.
#[derive(Debug, thiserror::Error)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    /// No font with the requested family and style was registered
    #[error("Font family not registered: {0}")]
    MissingFontFamily(String),

    /// A glyph could not be resolved and no substitute was available
    #[error("Glyph not found for character: U+{0:04X}")]
    GlyphNotFound(u32),

    /// Rectangle corners are not ordered (x1 <= x0 or y1 <= y0)
    #[error("Invalid rectangle coordinates")]
    InvalidRectangleCoordinates,

    /// Text operation called with an empty string
    #[error("Empty string")]
    EmptyString,

    /// IO error from the output sink
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or unsupported font data
    #[error("Font error: {0}")]
    Font(#[from] TrueTypeError),

    /// Alpha value outside 0.0..=1.0
    #[error("Alpha value is out of range (0.0 - 1.0): {0:.3}")]
    InvalidAlpha(f64),

    /// A text operation was requested before any font was selected
    #[error("No font selected")]
    NoFontSelected,

    /// A content operation was requested before any page was added
    #[error("No current page")]
    NoCurrentPage,

    /// Page number does not exist or has no content
    #[error("Invalid page number: {0}")]
    InvalidPageNumber(usize),

    /// Registry slot holds a different object variant than expected
    #[error("Invalid object type at index {index}: expected {expected}, found {found}")]
    InvalidObjectType {
        /// Registry index that was looked up
        index: usize,
        /// Expected variant name
        expected: &'static str,
        /// Actual variant name found
        found: &'static str,
    },
}
