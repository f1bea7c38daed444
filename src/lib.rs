// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::too_many_arguments)]
#![allow(clippy::enum_variant_names)]
#![allow(clippy::write_with_newline)]

//! # PDF Forge
//!
//! PDF generation from scratch: an in-memory object graph, subset TrueType
//! fonts embedded as CID-keyed Type0 fonts, and byte-exact serialization
//! with a cross-reference table.
//!
//! ## Core Features
//!
//! - **Object registry**: append-only arena of document objects; object
//!   numbers are registry index + 1
//! - **Two-phase compilation**: `link()` derives page contents, the page
//!   tree and font wiring from registration order, then `serialize()` writes
//!   header, objects, xref and trailer
//! - **Font subsetting**: cmap format 4 and 12 lookup, composite glyph
//!   closure, rebuilt `glyf`/`loca` with checksummed table directory
//! - **Resource caches**: graphics states, transparencies, soft masks and
//!   transparency groups are written once per distinct option set
//! - **Encryption seam**: strings and streams pass through an injected
//!   stream cipher keyed per object
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdf_forge::config::PdfConfig;
//! use pdf_forge::fonts::FontStyle;
//! use pdf_forge::writer::PdfWriter;
//!
//! # fn main() -> pdf_forge::Result<()> {
//! let mut writer = PdfWriter::new(PdfConfig::default());
//! writer.add_ttf_font("Sans", std::fs::read("DejaVuSans.ttf")?)?;
//! writer.add_page();
//! writer.set_font("Sans", FontStyle::REGULAR, 14.0)?;
//! writer.text(72.0, 770.0, "Hello, World!")?;
//! writer.save("hello.pdf")?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

// Error handling
pub mod error;

// Low-level value model
pub mod object;

// Configuration
pub mod config;

// Encryption seam
pub mod encryption;

// TrueType parsing and subsetting
pub mod fonts;

// Geometry
pub mod geometry;

// PDF writing
pub mod writer;

pub use error::{Error, Result};
pub use writer::PdfWriter;
