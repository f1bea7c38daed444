//! TrueType font parser for PDF embedding.
//!
//! `ttf-parser` validates the face and supplies the descriptor metrics. The
//! tables the subsetter needs at byte level (directory, `head`, `hhea`, `maxp`,
//! `hmtx`, `loca`, `cmap` formats 4 and 12, `kern`, `post`) are read directly
//! so their raw ranges can be copied into a rebuilt font.

use std::collections::{BTreeMap, HashMap};
use std::io;

use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;
use ttf_parser::Face;

/// Error types for TrueType font parsing.
#[derive(Debug, thiserror::Error)]
pub enum TrueTypeError {
    /// Failed to parse font file
    #[error("Failed to parse font file: {0}")]
    ParseError(String),

    /// Font file is empty or invalid
    #[error("Font file is empty or invalid")]
    EmptyFont,

    /// Required table is missing
    #[error("Required font table is missing: {0}")]
    MissingTable(String),

    /// Table contents are truncated or inconsistent
    #[error("Malformed '{tag}' table: {reason}")]
    MalformedTable {
        /// Table tag
        tag: String,
        /// What was wrong
        reason: String,
    },

    /// IO error during font operations
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    /// Glyph not found
    #[error("Glyph not found for character: U+{0:04X}")]
    GlyphNotFound(u32),
}

/// Result type for TrueType operations.
pub type TrueTypeResult<T> = Result<T, TrueTypeError>;

fn malformed(tag: &str, reason: impl Into<String>) -> TrueTypeError {
    TrueTypeError::MalformedTable {
        tag: tag.to_string(),
        reason: reason.into(),
    }
}

pub(crate) fn read_u16(data: &[u8], offset: usize, tag: &str) -> TrueTypeResult<u16> {
    data.get(offset..offset + 2)
        .map(BigEndian::read_u16)
        .ok_or_else(|| malformed(tag, format!("unexpected end of data at offset {}", offset)))
}

pub(crate) fn read_i16(data: &[u8], offset: usize, tag: &str) -> TrueTypeResult<i16> {
    data.get(offset..offset + 2)
        .map(BigEndian::read_i16)
        .ok_or_else(|| malformed(tag, format!("unexpected end of data at offset {}", offset)))
}

pub(crate) fn read_u32(data: &[u8], offset: usize, tag: &str) -> TrueTypeResult<u32> {
    data.get(offset..offset + 4)
        .map(BigEndian::read_u32)
        .ok_or_else(|| malformed(tag, format!("unexpected end of data at offset {}", offset)))
}

/// One entry of the sfnt table directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableRecord {
    /// Stored checksum
    pub checksum: u32,
    /// Byte offset from the start of the file
    pub offset: u32,
    /// Unpadded length
    pub length: u32,
}

/// Segment arrays of a format 4 `cmap` subtable.
#[derive(Debug, Clone, Default)]
pub struct CmapFormat4 {
    /// Last code of each segment
    pub end_codes: Vec<u16>,
    /// First code of each segment
    pub start_codes: Vec<u16>,
    /// Delta for every code in the segment (modulo 65536)
    pub id_deltas: Vec<u16>,
    /// Offset into the glyph id array, or 0
    pub id_range_offsets: Vec<u16>,
    /// Glyph index array
    pub glyph_id_array: Vec<u16>,
}

impl CmapFormat4 {
    /// Number of segments.
    pub fn seg_count(&self) -> usize {
        self.end_codes.len()
    }

    /// Map a BMP code point to a glyph index.
    ///
    /// `Some(0)` is a valid `.notdef` result; `None` means the code point
    /// is not covered.
    pub fn lookup(&self, code: u32) -> Option<u16> {
        let seg = self.end_codes.iter().position(|&end| code <= end as u32)?;
        let start = *self.start_codes.get(seg)? as u32;
        if code < start {
            return None;
        }

        let delta = *self.id_deltas.get(seg)?;
        let range_offset = *self.id_range_offsets.get(seg)?;
        if range_offset == 0 {
            return Some((code as u16).wrapping_add(delta));
        }

        let idx = (range_offset / 2) as i64 + (code - start) as i64
            - (self.seg_count() - seg) as i64;
        if idx < 0 {
            return None;
        }
        let glyph = *self.glyph_id_array.get(idx as usize)?;
        if glyph == 0 {
            return Some(0);
        }
        Some(glyph.wrapping_add(delta))
    }
}

/// Sequential map group of a format 12 `cmap` subtable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CmapGroup {
    /// First code point in the group
    pub start_char_code: u32,
    /// Last code point in the group
    pub end_char_code: u32,
    /// Glyph index of the first code point
    pub start_glyph_id: u32,
}

impl CmapGroup {
    /// Glyph index of `code`; `None` outside the group or when the index
    /// does not fit in 16 bits.
    pub fn glyph_for(&self, code: u32) -> Option<u16> {
        if !(self.start_char_code..=self.end_char_code).contains(&code) {
            return None;
        }
        let glyph = self.start_glyph_id.checked_add(code - self.start_char_code)?;
        u16::try_from(glyph).ok()
    }
}

/// Parsed TrueType font data for PDF embedding.
///
/// Owns the raw font bytes so the subsetter can slice tables and glyph
/// outlines out of them after parsing.
#[derive(Debug, Clone)]
pub struct TrueTypeFont {
    data: Bytes,
    tables: BTreeMap<String, TableRecord>,
    units_per_em: u16,
    short_loca: bool,
    num_glyphs: u16,
    advance_widths: Vec<u16>,
    loca: Vec<u32>,
    cmap4: Option<CmapFormat4>,
    cmap12: Vec<CmapGroup>,
    kerning: HashMap<(u16, u16), i16>,
    metrics: FontMetrics,
}

impl TrueTypeFont {
    /// Parse a TrueType font from raw data.
    ///
    /// Requires the `head`, `hhea`, `maxp`, `hmtx`, `loca`, `glyf` and `cmap`
    /// tables. `kern` is read when present.
    pub fn parse(data: impl Into<Bytes>) -> TrueTypeResult<Self> {
        let data: Bytes = data.into();
        if data.is_empty() {
            return Err(TrueTypeError::EmptyFont);
        }

        let face = Face::parse(&data, 0).map_err(|e| TrueTypeError::ParseError(e.to_string()))?;
        let face_metrics = FaceMetrics::from_face(&face);

        let tables = parse_table_directory(&data)?;
        let table = |tag: &str| -> TrueTypeResult<&[u8]> {
            let record = tables
                .get(tag)
                .ok_or_else(|| TrueTypeError::MissingTable(tag.to_string()))?;
            Ok(&data[record.offset as usize..(record.offset + record.length) as usize])
        };

        let head = table("head")?;
        let units_per_em = read_u16(head, 18, "head")?;
        if units_per_em == 0 {
            return Err(malformed("head", "unitsPerEm is zero"));
        }
        let short_loca = match read_i16(head, 50, "head")? {
            0 => true,
            1 => false,
            other => return Err(malformed("head", format!("indexToLocFormat {}", other))),
        };

        let num_glyphs = read_u16(table("maxp")?, 4, "maxp")?;
        let number_of_h_metrics = read_u16(table("hhea")?, 34, "hhea")?;
        if number_of_h_metrics == 0 {
            return Err(malformed("hhea", "numberOfHMetrics is zero"));
        }

        let hmtx = table("hmtx")?;
        let advance_widths = (0..number_of_h_metrics as usize)
            .map(|i| read_u16(hmtx, i * 4, "hmtx"))
            .collect::<TrueTypeResult<Vec<_>>>()?;

        let loca = parse_loca(table("loca")?, num_glyphs, short_loca)?;
        let glyf_len = table("glyf")?.len() as u32;
        if loca.last().is_some_and(|&end| end > glyf_len) {
            return Err(malformed("loca", "offsets run past the end of 'glyf'"));
        }

        let (cmap4, cmap12) = parse_cmap(table("cmap")?)?;
        if cmap4.is_none() && cmap12.is_empty() {
            return Err(malformed("cmap", "no Unicode subtable of format 4 or 12"));
        }

        let kerning = match tables.get("kern") {
            Some(_) => parse_kern(table("kern")?)?,
            None => HashMap::new(),
        };

        let italic_angle = match tables.get("post") {
            Some(_) => read_u32(table("post")?, 4, "post")? as i32 as f32 / 65536.0,
            None => 0.0,
        };

        let metrics = FontMetrics::new(face_metrics, units_per_em, italic_angle);

        log::debug!(
            "Parsed TrueType font '{}': {} glyphs, {} h-metrics, {} kern pairs",
            metrics.name,
            num_glyphs,
            number_of_h_metrics,
            kerning.len()
        );

        Ok(Self {
            data,
            tables,
            units_per_em,
            short_loca,
            num_glyphs,
            advance_widths,
            loca,
            cmap4,
            cmap12,
            kerning,
            metrics,
        })
    }

    /// The raw font bytes.
    pub fn raw_data(&self) -> &Bytes {
        &self.data
    }

    /// Table directory keyed by tag.
    pub fn tables(&self) -> &BTreeMap<String, TableRecord> {
        &self.tables
    }

    /// Raw bytes of a table, if present.
    pub fn table_data(&self, tag: &str) -> Option<&[u8]> {
        self.tables
            .get(tag)
            .map(|r| &self.data[r.offset as usize..(r.offset + r.length) as usize])
    }

    /// Units per em.
    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    /// Whether `loca` uses the short (offset / 2) format.
    pub fn is_short_loca(&self) -> bool {
        self.short_loca
    }

    /// Number of glyphs from `maxp`.
    pub fn num_glyphs(&self) -> u16 {
        self.num_glyphs
    }

    /// Advance widths in design units, one per long horizontal metric.
    pub fn advance_widths(&self) -> &[u16] {
        &self.advance_widths
    }

    /// Number of long horizontal metrics.
    pub fn number_of_h_metrics(&self) -> usize {
        self.advance_widths.len()
    }

    /// Glyph offsets into `glyf`; `num_glyphs + 1` entries.
    pub fn loca(&self) -> &[u32] {
        &self.loca
    }

    /// Outline bytes of one glyph. Empty for glyphs without outlines.
    pub fn glyph_data(&self, glyph: u16) -> &[u8] {
        let (Some(glyf), Some(&start), Some(&end)) = (
            self.table_data("glyf"),
            self.loca.get(glyph as usize),
            self.loca.get(glyph as usize + 1),
        ) else {
            return &[];
        };
        glyf.get(start as usize..end as usize).unwrap_or(&[])
    }

    /// Format 4 `cmap` subtable.
    pub fn cmap4(&self) -> Option<&CmapFormat4> {
        self.cmap4.as_ref()
    }

    /// Format 12 `cmap` groups.
    pub fn cmap12(&self) -> &[CmapGroup] {
        &self.cmap12
    }

    /// Kerning adjustment for a glyph pair, in design units.
    pub fn kern_value(&self, left: u16, right: u16) -> Option<i16> {
        self.kerning.get(&(left, right)).copied()
    }

    /// Number of kerning pairs read from `kern`.
    pub fn kern_pair_count(&self) -> usize {
        self.kerning.len()
    }

    /// Descriptor metrics.
    pub fn metrics(&self) -> &FontMetrics {
        &self.metrics
    }
}

pub(crate) fn parse_table_directory(data: &[u8]) -> TrueTypeResult<BTreeMap<String, TableRecord>> {
    let num_tables = read_u16(data, 4, "sfnt")? as usize;
    let mut tables = BTreeMap::new();
    for i in 0..num_tables {
        let base = 12 + i * 16;
        let tag_bytes = data
            .get(base..base + 4)
            .ok_or_else(|| malformed("sfnt", "truncated table directory"))?;
        let tag = String::from_utf8_lossy(tag_bytes).into_owned();
        let record = TableRecord {
            checksum: read_u32(data, base + 4, "sfnt")?,
            offset: read_u32(data, base + 8, "sfnt")?,
            length: read_u32(data, base + 12, "sfnt")?,
        };
        let end = record.offset as u64 + record.length as u64;
        if end > data.len() as u64 {
            return Err(malformed(&tag, "table extends past end of file"));
        }
        tables.insert(tag, record);
    }
    Ok(tables)
}

fn parse_loca(loca: &[u8], num_glyphs: u16, short: bool) -> TrueTypeResult<Vec<u32>> {
    let count = num_glyphs as usize + 1;
    let offsets = (0..count)
        .map(|i| {
            if short {
                read_u16(loca, i * 2, "loca").map(|v| v as u32 * 2)
            } else {
                read_u32(loca, i * 4, "loca")
            }
        })
        .collect::<TrueTypeResult<Vec<_>>>()?;
    if offsets.windows(2).any(|w| w[1] < w[0]) {
        return Err(malformed("loca", "offsets are not monotonic"));
    }
    Ok(offsets)
}

fn parse_cmap(cmap: &[u8]) -> TrueTypeResult<(Option<CmapFormat4>, Vec<CmapGroup>)> {
    let num_subtables = read_u16(cmap, 2, "cmap")? as usize;
    let mut format4 = None;
    let mut format12 = Vec::new();

    for i in 0..num_subtables {
        let record = 4 + i * 8;
        let platform_id = read_u16(cmap, record, "cmap")?;
        let encoding_id = read_u16(cmap, record + 2, "cmap")?;
        let offset = read_u32(cmap, record + 4, "cmap")? as usize;

        let unicode = platform_id == 0 || (platform_id == 3 && matches!(encoding_id, 1 | 10));
        if !unicode {
            continue;
        }

        let subtable = cmap
            .get(offset..)
            .ok_or_else(|| malformed("cmap", "subtable offset out of range"))?;
        match read_u16(subtable, 0, "cmap")? {
            4 if format4.is_none() => format4 = Some(parse_cmap_format4(subtable)?),
            12 if format12.is_empty() => format12 = parse_cmap_format12(subtable)?,
            _ => {},
        }
    }

    Ok((format4, format12))
}

/// The 16-bit `length` field wraps on large subtables, so the glyph id
/// array runs to the end of the available bytes instead.
pub(crate) fn parse_cmap_format4(sub: &[u8]) -> TrueTypeResult<CmapFormat4> {
    let seg_count = read_u16(sub, 6, "cmap")? as usize / 2;

    let read_array = |start: usize| -> TrueTypeResult<Vec<u16>> {
        (0..seg_count)
            .map(|i| read_u16(sub, start + i * 2, "cmap"))
            .collect()
    };

    let end_offset = 14;
    let start_offset = end_offset + seg_count * 2 + 2;
    let delta_offset = start_offset + seg_count * 2;
    let range_offset = delta_offset + seg_count * 2;
    let glyph_array_offset = range_offset + seg_count * 2;

    let end_codes = read_array(end_offset)?;
    let start_codes = read_array(start_offset)?;
    let id_deltas = read_array(delta_offset)?;
    let id_range_offsets = read_array(range_offset)?;

    let glyph_count = sub.len().saturating_sub(glyph_array_offset) / 2;
    let glyph_id_array = (0..glyph_count)
        .map(|i| read_u16(sub, glyph_array_offset + i * 2, "cmap"))
        .collect::<TrueTypeResult<Vec<_>>>()?;

    Ok(CmapFormat4 {
        end_codes,
        start_codes,
        id_deltas,
        id_range_offsets,
        glyph_id_array,
    })
}

fn parse_cmap_format12(sub: &[u8]) -> TrueTypeResult<Vec<CmapGroup>> {
    let num_groups = read_u32(sub, 12, "cmap")? as usize;
    (0..num_groups)
        .map(|i| {
            let base = 16 + i * 12;
            Ok(CmapGroup {
                start_char_code: read_u32(sub, base, "cmap")?,
                end_char_code: read_u32(sub, base + 4, "cmap")?,
                start_glyph_id: read_u32(sub, base + 8, "cmap")?,
            })
        })
        .collect()
}

/// Horizontal format 0 pairs from every subtable of a version 0 `kern` table.
pub(crate) fn parse_kern(kern: &[u8]) -> TrueTypeResult<HashMap<(u16, u16), i16>> {
    let mut pairs = HashMap::new();
    if read_u16(kern, 0, "kern")? != 0 {
        log::warn!("Unsupported 'kern' table version, kerning disabled");
        return Ok(pairs);
    }

    let n_tables = read_u16(kern, 2, "kern")?;
    let mut offset = 4;
    for _ in 0..n_tables {
        let length = read_u16(kern, offset + 2, "kern")? as usize;
        let coverage = read_u16(kern, offset + 4, "kern")?;
        let format = coverage >> 8;
        let horizontal = coverage & 1 == 1;

        if format == 0 && horizontal {
            let n_pairs = read_u16(kern, offset + 6, "kern")? as usize;
            let pair_base = offset + 14;
            for p in 0..n_pairs {
                let at = pair_base + p * 6;
                let left = read_u16(kern, at, "kern")?;
                let right = read_u16(kern, at + 2, "kern")?;
                let value = read_i16(kern, at + 4, "kern")?;
                pairs.insert((left, right), value);
            }
        }

        if length == 0 {
            break;
        }
        offset += length;
    }
    Ok(pairs)
}

/// Values that come from `ttf-parser`'s face view.
struct FaceMetrics {
    name: Option<String>,
    family: Option<String>,
    ascender: i16,
    descender: i16,
    cap_height: Option<i16>,
    x_height: Option<i16>,
    bbox: (i16, i16, i16, i16),
    is_monospaced: bool,
    is_bold: bool,
    is_italic: bool,
}

impl FaceMetrics {
    fn from_face(face: &Face<'_>) -> Self {
        let name_for = |id: u16| {
            face.names()
                .into_iter()
                .find(|name| name.name_id == id)
                .and_then(|name| name.to_string())
        };
        let bbox = face.global_bounding_box();
        Self {
            name: name_for(ttf_parser::name_id::POST_SCRIPT_NAME),
            family: name_for(ttf_parser::name_id::FAMILY),
            ascender: face.ascender(),
            descender: face.descender(),
            cap_height: face.capital_height(),
            x_height: face.x_height(),
            bbox: (bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max),
            is_monospaced: face.is_monospaced(),
            is_bold: face.is_bold(),
            is_italic: face.is_italic(),
        }
    }
}

/// Font metrics extracted for the PDF FontDescriptor.
#[derive(Debug, Clone)]
pub struct FontMetrics {
    /// PostScript name
    pub name: String,
    /// Family name
    pub family: String,
    /// Units per em
    pub units_per_em: u16,
    /// Ascender (positive)
    pub ascender: i16,
    /// Descender (negative)
    pub descender: i16,
    /// Cap height
    pub cap_height: i16,
    /// x-height
    pub x_height: i16,
    /// Italic angle in degrees
    pub italic_angle: f32,
    /// Bounding box (llx, lly, urx, ury)
    pub bbox: (i16, i16, i16, i16),
    /// Stem V (vertical stem width)
    pub stem_v: i16,
    /// Font flags
    pub flags: u32,
    /// Is bold
    pub is_bold: bool,
    /// Is italic
    pub is_italic: bool,
}

impl FontMetrics {
    fn new(face: FaceMetrics, units_per_em: u16, italic_angle: f32) -> Self {
        let is_italic = face.is_italic || italic_angle != 0.0;

        // Bit 6 (nonsymbolic) is always set; bit 1 fixed pitch, bit 7 italic.
        let mut flags = 1u32 << 5;
        if face.is_monospaced {
            flags |= 1 << 0;
        }
        if is_italic {
            flags |= 1 << 6;
        }

        Self {
            name: face.name.unwrap_or_else(|| "Unknown".to_string()),
            family: face.family.unwrap_or_else(|| "Unknown".to_string()),
            units_per_em,
            ascender: face.ascender,
            descender: face.descender,
            cap_height: face.cap_height.unwrap_or(face.ascender),
            x_height: face
                .x_height
                .unwrap_or((face.ascender as f32 * 0.5) as i16),
            italic_angle,
            bbox: face.bbox,
            stem_v: if face.is_bold { 140 } else { 80 },
            flags,
            is_bold: face.is_bold,
            is_italic,
        }
    }

    /// Convert a value from design units to the 1000-unit glyph space.
    ///
    /// Rounds to the nearest integer.
    pub fn to_pdf_units(&self, value: i16) -> i32 {
        (value as f64 * 1000.0 / self.units_per_em as f64).round() as i32
    }

    /// Ascender in PDF units.
    pub fn pdf_ascender(&self) -> i32 {
        self.to_pdf_units(self.ascender)
    }

    /// Descender in PDF units.
    pub fn pdf_descender(&self) -> i32 {
        self.to_pdf_units(self.descender)
    }

    /// Cap height in PDF units.
    pub fn pdf_cap_height(&self) -> i32 {
        self.to_pdf_units(self.cap_height)
    }

    /// x-height in PDF units.
    pub fn pdf_x_height(&self) -> i32 {
        self.to_pdf_units(self.x_height)
    }

    /// Bounding box in PDF units.
    pub fn pdf_bbox(&self) -> (i32, i32, i32, i32) {
        (
            self.to_pdf_units(self.bbox.0),
            self.to_pdf_units(self.bbox.1),
            self.to_pdf_units(self.bbox.2),
            self.to_pdf_units(self.bbox.3),
        )
    }
}
