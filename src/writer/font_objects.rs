//! Font objects.
//!
//! A TrueType subset reaches the page through five objects, registered in
//! this order:
//!
//! ```text
//! UnicodeMap        ToUnicode CMap stream
//! EmbeddedFontFile  zlib-compressed rebuilt sfnt (/FontFile2)
//! FontDescriptor    metrics in 1000-unit glyph space
//! CidFont           /CIDFontType2 with the /W width array
//! Type0Font         /Identity-H top-level font, owns the SubsetFont
//! ```
//!
//! The four leading objects hold the registry index of the [`Type0Font`] and
//! read the subset from it at write time, when the glyph set is final.
//!
//! Simple single-byte TrueType fonts use [`SimpleFont`] together with an
//! [`Encoding`], a widths array and a descriptor in consecutive slots.

use std::io::Write;

use bytes::Bytes;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use super::object_serializer::ObjectSerializer as S;
use super::registry::ObjectRegistry;
use crate::error::Result;
use crate::fonts::{FontMetrics, SubsetFont};
use crate::object::Object;

const BFCHAR_CHUNK: usize = 100;

const CMAP_HEADER: &str = "/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def
/CMapName /Adobe-Identity-UCS def
/CMapType 2 def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
";

const CMAP_FOOTER: &str = "endcmap
CMapName currentdict /CMap defineresource pop
end
end
";

/// Font descriptor values in 1000-unit glyph space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DescriptorMetrics {
    /// Ascent
    pub ascent: i32,
    /// Descent (negative)
    pub descent: i32,
    /// Cap height
    pub cap_height: i32,
    /// x-height
    pub x_height: i32,
    /// Descriptor flags
    pub flags: u32,
    /// Bounding box `[llx lly urx ury]`
    pub bbox: [i32; 4],
    /// Italic angle in degrees
    pub italic_angle: f64,
    /// Vertical stem width
    pub stem_v: i32,
}

impl From<&FontMetrics> for DescriptorMetrics {
    fn from(metrics: &FontMetrics) -> Self {
        let (llx, lly, urx, ury) = metrics.pdf_bbox();
        Self {
            ascent: metrics.pdf_ascender(),
            descent: metrics.pdf_descender(),
            cap_height: metrics.pdf_cap_height(),
            x_height: metrics.pdf_x_height(),
            flags: metrics.flags,
            bbox: [llx, lly, urx, ury],
            italic_angle: metrics.italic_angle as f64,
            stem_v: metrics.stem_v as i32,
        }
    }
}

/// Top-level `/Type0` font; owner of the subset.
#[derive(Debug, Clone)]
pub struct Type0Font {
    font: SubsetFont,
    /// Registry index of the descendant CID font
    pub cid_font: usize,
    /// Registry index of the ToUnicode CMap
    pub unicode_map: usize,
    /// Position among the document's fonts; the resource name is `F<n+1>`
    pub count_of_font: usize,
}

impl Type0Font {
    /// Wrap a subset with the indices of its companion objects.
    pub fn new(font: SubsetFont, cid_font: usize, unicode_map: usize, count_of_font: usize) -> Self {
        Self {
            font,
            cid_font,
            unicode_map,
            count_of_font,
        }
    }

    /// The subset.
    pub fn font(&self) -> &SubsetFont {
        &self.font
    }

    /// The subset, for registering characters.
    pub fn font_mut(&mut self) -> &mut SubsetFont {
        &mut self.font
    }

    /// Name of the font in the page resources.
    pub fn resource_name(&self) -> String {
        format!("F{}", self.count_of_font + 1)
    }

    /// Build the font dictionary.
    pub fn to_object(&self) -> Object {
        S::dict(vec![
            ("Type", S::name("Font")),
            ("Subtype", S::name("Type0")),
            ("BaseFont", S::name(&self.font.subset_name())),
            ("Encoding", S::name("Identity-H")),
            ("DescendantFonts", S::array(vec![S::reference(self.cid_font)])),
            ("ToUnicode", S::reference(self.unicode_map)),
        ])
    }
}

/// Descendant `/CIDFontType2` font.
#[derive(Debug, Clone, Copy)]
pub struct CidFont {
    /// Registry index of the owning [`Type0Font`]
    pub subset: usize,
    /// Registry index of the font descriptor
    pub descriptor: usize,
}

impl CidFont {
    /// Build the CID font dictionary.
    pub fn to_object(&self, registry: &ObjectRegistry) -> Result<Object> {
        let font = registry.type0_font(self.subset)?.font();
        Ok(S::dict(vec![
            ("Type", S::name("Font")),
            ("Subtype", S::name("CIDFontType2")),
            ("BaseFont", S::name(&font.subset_name())),
            (
                "CIDSystemInfo",
                S::dict(vec![
                    ("Ordering", S::string("Identity")),
                    ("Registry", S::string("Adobe")),
                    ("Supplement", Object::Integer(0)),
                ]),
            ),
            ("CIDToGIDMap", S::name("Identity")),
            ("FontDescriptor", S::reference(self.descriptor)),
            ("W", width_array(font)),
        ]))
    }
}

/// `/W` array: runs of consecutive glyph ids as `start [w1 w2 ...]`.
pub fn width_array(font: &SubsetFont) -> Object {
    let mut out = Vec::new();
    let mut run_start: Option<u16> = None;
    let mut run: Vec<Object> = Vec::new();
    let mut prev: Option<u16> = None;

    for (glyph, _) in font.glyph_map().reverse_pairs() {
        let width = Object::Integer(font.glyph_index_to_pdf_width(glyph) as i64);
        let continues = prev.and_then(|p| p.checked_add(1)) == Some(glyph);
        if !continues {
            if let Some(start) = run_start {
                out.push(Object::Integer(start as i64));
                out.push(Object::Array(std::mem::take(&mut run)));
            }
            run_start = Some(glyph);
        }
        run.push(width);
        prev = Some(glyph);
    }
    if let Some(start) = run_start {
        out.push(Object::Integer(start as i64));
        out.push(Object::Array(run));
    }

    Object::Array(out)
}

/// ToUnicode CMap for a subset.
#[derive(Debug, Clone, Copy)]
pub struct UnicodeMap {
    /// Registry index of the owning [`Type0Font`]
    pub subset: usize,
}

impl UnicodeMap {
    /// Build the CMap stream.
    pub fn to_object(&self, registry: &ObjectRegistry) -> Result<Object> {
        let font = registry.type0_font(self.subset)?.font();
        Ok(S::stream(vec![], to_unicode_cmap(font)))
    }
}

/// CMap text mapping each used glyph back to its character.
///
/// Entries go in `bfchar` blocks of at most 100; characters above the BMP
/// are written as UTF-16 surrogate pairs.
pub fn to_unicode_cmap(font: &SubsetFont) -> Vec<u8> {
    let pairs = font.glyph_map().reverse_pairs();
    let mut cmap = String::from(CMAP_HEADER);

    for chunk in pairs.chunks(BFCHAR_CHUNK) {
        cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for &(glyph, ch) in chunk {
            let mut units = [0u16; 2];
            let unicode: String = ch
                .encode_utf16(&mut units)
                .iter()
                .map(|u| format!("{:04X}", u))
                .collect();
            cmap.push_str(&format!("<{:04X}> <{}>\n", glyph, unicode));
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str(CMAP_FOOTER);
    cmap.into_bytes()
}

/// Font descriptor of a subset or of a simple font.
#[derive(Debug, Clone)]
pub enum FontDescriptor {
    /// Metrics and name come from the subset at write time
    Subset {
        /// Registry index of the owning [`Type0Font`]
        subset: usize,
        /// Registry index of the embedded font file
        font_file: usize,
    },
    /// Metrics given up front
    Simple {
        /// `/FontName`
        font_name: String,
        /// Descriptor values
        metrics: DescriptorMetrics,
        /// Registry index of the embedded font file
        font_file: usize,
    },
}

impl FontDescriptor {
    /// Build the descriptor dictionary.
    pub fn to_object(&self, registry: &ObjectRegistry) -> Result<Object> {
        Ok(match self {
            FontDescriptor::Subset { subset, font_file } => {
                let font = registry.type0_font(*subset)?.font();
                let metrics = DescriptorMetrics::from(font.font().metrics());
                descriptor_object(&font.subset_name(), &metrics, *font_file)
            },
            FontDescriptor::Simple {
                font_name,
                metrics,
                font_file,
            } => descriptor_object(font_name, metrics, *font_file),
        })
    }
}

fn descriptor_object(font_name: &str, metrics: &DescriptorMetrics, font_file: usize) -> Object {
    let [llx, lly, urx, ury] = metrics.bbox;
    S::dict(vec![
        ("Type", S::name("FontDescriptor")),
        ("FontName", S::name(font_name)),
        ("Ascent", Object::Integer(metrics.ascent as i64)),
        ("Descent", Object::Integer(metrics.descent as i64)),
        ("CapHeight", Object::Integer(metrics.cap_height as i64)),
        ("XHeight", Object::Integer(metrics.x_height as i64)),
        ("Flags", Object::Integer(metrics.flags as i64)),
        (
            "FontBBox",
            S::array([llx, lly, urx, ury].into_iter().map(|v| Object::Integer(v as i64)).collect()),
        ),
        ("ItalicAngle", S::real(metrics.italic_angle)),
        ("StemV", Object::Integer(metrics.stem_v as i64)),
        ("FontFile2", S::reference(font_file)),
    ])
}

/// Embedded TrueType program (`/FontFile2`).
#[derive(Debug, Clone)]
pub enum EmbeddedFontFile {
    /// Rebuilt from the subset at write time
    Subset {
        /// Registry index of the owning [`Type0Font`]
        subset: usize,
    },
    /// Font program given up front
    Simple {
        /// Uncompressed font data
        data: Bytes,
    },
}

impl EmbeddedFontFile {
    /// Build the compressed font file stream.
    pub fn to_object(&self, registry: &ObjectRegistry) -> Result<Object> {
        match self {
            EmbeddedFontFile::Subset { subset } => {
                let font = registry.type0_font(*subset)?.font();
                let program = font.rebuild_subset()?;
                font_file_stream(&program)
            },
            EmbeddedFontFile::Simple { data } => font_file_stream(data),
        }
    }
}

/// zlib-compress a font program; `/Length1` is the uncompressed size.
pub fn font_file_stream(program: &[u8]) -> Result<Object> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(program)?;
    let compressed = encoder.finish()?;

    Ok(S::stream(
        vec![
            ("Filter", S::name("FlateDecode")),
            ("Length1", Object::Integer(program.len() as i64)),
        ],
        compressed,
    ))
}

/// Single-byte TrueType font description for [`PdfWriter::add_simple_font`].
///
/// [`PdfWriter::add_simple_font`]: super::PdfWriter::add_simple_font
#[derive(Debug, Clone)]
pub struct SimpleFontDef {
    /// Family name used by `set_font`
    pub family: String,
    /// `/BaseFont`
    pub base_font: String,
    /// Advance widths of codes 32..=255 in glyph space
    pub widths: Vec<u16>,
    /// `/Differences` entries, e.g. `128 /Euro 130 /quotesinglbase`
    pub differences: String,
    /// Descriptor values
    pub metrics: DescriptorMetrics,
    /// Uncompressed font program
    pub font_file: Bytes,
}

impl SimpleFontDef {
    /// Width of a single-byte code, 0 outside 32..=255.
    pub fn code_width(&self, code: u8) -> u16 {
        code.checked_sub(32)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
            .unwrap_or(0)
    }

    /// The widths array object.
    pub fn widths_object(&self) -> Object {
        S::array(self.widths.iter().map(|&w| Object::Integer(w as i64)).collect())
    }
}

/// WinAnsi encoding with differences; indexed so `link()` can find the
/// widths and descriptor that follow it.
#[derive(Debug, Clone)]
pub struct Encoding {
    /// Family this encoding belongs to
    pub family: String,
    /// `/Differences` entries
    pub differences: String,
}

impl Encoding {
    /// Build the encoding dictionary.
    pub fn to_object(&self) -> Object {
        S::dict(vec![
            ("Type", S::name("Encoding")),
            ("BaseEncoding", S::name("WinAnsiEncoding")),
            ("Differences", S::array(parse_differences(&self.differences))),
        ])
    }
}

/// Tokens of a differences string: integers and `/names`.
fn parse_differences(differences: &str) -> Vec<Object> {
    differences
        .split_whitespace()
        .filter_map(|token| {
            if let Some(name) = token.strip_prefix('/') {
                Some(S::name(name))
            } else if let Ok(code) = token.parse::<i64>() {
                Some(Object::Integer(code))
            } else {
                log::warn!("Ignoring differences token '{}'", token);
                None
            }
        })
        .collect()
}

/// Indices wired into a [`SimpleFont`] by `link()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimpleFontLinks {
    /// Registry index of the encoding
    pub encoding: usize,
    /// Registry index of the widths array
    pub widths: usize,
    /// Registry index of the descriptor
    pub descriptor: usize,
}

/// Single-byte `/TrueType` font dictionary.
#[derive(Debug, Clone)]
pub struct SimpleFont {
    /// Family name
    pub family: String,
    /// `/BaseFont`
    pub base_font: String,
    /// Position among the document's fonts
    pub count_of_font: usize,
    /// Set by `link()` when an embedded definition matches the family
    pub links: Option<SimpleFontLinks>,
}

impl SimpleFont {
    /// Build the font dictionary.
    pub fn to_object(&self) -> Object {
        let mut entries = vec![
            ("Type", S::name("Font")),
            ("Subtype", S::name("TrueType")),
            ("BaseFont", S::name(&self.base_font)),
        ];
        if let Some(links) = self.links {
            entries.extend([
                ("FirstChar", Object::Integer(32)),
                ("LastChar", Object::Integer(255)),
                ("Widths", S::reference(links.widths)),
                ("FontDescriptor", S::reference(links.descriptor)),
                ("Encoding", S::reference(links.encoding)),
            ]);
        }
        S::dict(entries)
    }
}
