//! PDF writing module for generating PDF files.
//!
//! ## Architecture
//!
//! ```text
//! upstream drawing / layout calls
//!     ↓
//! [PdfWriter] (registers objects, owns caches and the current page)
//!     ↓
//! [ObjectRegistry] (append-only DocObject arena, id = index + 1)
//!     ↓
//! compiler::link (page contents, page tree, font wiring, outlines)
//!     ↓
//! compiler::serialize ([ObjectSerializer], xref, trailer)
//!     ↓
//! PDF bytes
//! ```
//!
//! ## Example
//!
//! ```
//! use pdf_forge::config::PdfConfig;
//! use pdf_forge::geometry::Rect;
//! use pdf_forge::writer::{PaintStyle, PdfWriter};
//!
//! let mut writer = PdfWriter::new(PdfConfig::default());
//! writer.add_page();
//! writer.set_stroke_color(200, 0, 0).unwrap();
//! writer.rectangle(72.0, 72.0, 200.0, 120.0, PaintStyle::Stroke).unwrap();
//! writer
//!     .add_external_link("https://example.com", Rect::new(72.0, 72.0, 128.0, 48.0))
//!     .unwrap();
//! let pdf = writer.compile().unwrap();
//! assert!(pdf.ends_with(b"%%EOF\n"));
//! ```

pub mod compiler;
mod content_stream;
pub mod doc_object;
pub mod font_objects;
mod graphics_state;
mod object_serializer;
mod pdf_writer;
pub mod registry;
mod resource_cache;

pub use compiler::{link, serialize, CountingWriter, Linked};
pub use content_stream::{ContentStreamBuilder, ContentStreamOp, PaintStyle, TextArrayItem};
pub use doc_object::{
    Anchor, Annotation, ColorSpace, DocObject, Image, ImageSpec, LinkTarget, WriteContext,
};
pub use font_objects::{DescriptorMetrics, SimpleFontDef};
pub use graphics_state::{
    BlendMode, GraphicsStateOptions, SoftMaskOptions, SoftMaskSubtype, Transparency,
    TransparencyGroupOptions,
};
pub use object_serializer::ObjectSerializer;
pub use pdf_writer::PdfWriter;
pub use registry::ObjectRegistry;
pub use resource_cache::ResourceCache;
