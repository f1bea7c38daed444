//! TrueType fonts for embedding.
//!
//! Parsing of the tables the embedder needs, per-document glyph tracking and
//! subset reconstruction. The PDF objects that carry a subset into the output
//! live in [`crate::writer::font_objects`].

pub mod font_subsetter;
pub mod glyph_map;
pub mod sfnt_writer;
pub mod truetype_parser;

#[cfg(test)]
pub(crate) mod testing;

pub use font_subsetter::{
    FontOptions, FontStyle, GlyphNotFoundCallback, GlyphSubstitute, KernOverride, SubsetFont,
    SubsetStats,
};
pub use glyph_map::GlyphMap;
pub use sfnt_writer::{search_params, table_checksum, SfntBuilder};
pub use truetype_parser::{
    CmapFormat4, CmapGroup, FontMetrics, TableRecord, TrueTypeError, TrueTypeFont, TrueTypeResult,
};
