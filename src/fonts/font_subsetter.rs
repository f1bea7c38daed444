//! TrueType font subsetting for PDF embedding.
//!
//! [`SubsetFont`] records which characters a document draws, resolves them to
//! glyph indices through the font's `cmap`, and rebuilds a reduced sfnt that
//! keeps only the outlines those glyphs need. Subset fonts are named with a
//! six-letter tag prefix (`ABCDEF+Family`).
//!
//! # Subsetting strategy
//!
//! 1. Start from every glyph in the glyph map plus `.notdef` (glyph 0).
//! 2. Follow composite glyph component references until no new glyph appears.
//! 3. Rewrite `glyf` and `loca` over the full glyph index range, giving
//!    glyphs outside the closure zero length.
//! 4. Copy `cvt `, `fpgm`, `head`, `hhea`, `hmtx`, `maxp` and `prep` verbatim.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use sha2::{Digest, Sha256};

use super::glyph_map::GlyphMap;
use super::sfnt_writer::SfntBuilder;
use super::truetype_parser::{read_i16, read_u16, TrueTypeError, TrueTypeFont, TrueTypeResult};
use crate::error::{Error, Result};

bitflags::bitflags! {
    /// Font style used to select a registered family.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FontStyle: u8 {
        /// Regular
        const REGULAR = 0;
        /// Italic
        const ITALIC = 1;
        /// Bold
        const BOLD = 1 << 1;
        /// Underline; ignored when matching fonts
        const UNDERLINE = 1 << 2;
    }
}

impl FontStyle {
    /// The style without the underline bit.
    pub fn without_underline(self) -> Self {
        self - FontStyle::UNDERLINE
    }
}

bitflags::bitflags! {
    /// Component record flags of a composite glyph.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct ComponentFlags: u16 {
        const ARG_1_AND_2_ARE_WORDS = 1;
        const WE_HAVE_A_SCALE = 1 << 3;
        const MORE_COMPONENTS = 1 << 5;
        const WE_HAVE_AN_X_AND_Y_SCALE = 1 << 6;
        const WE_HAVE_A_TWO_BY_TWO = 1 << 7;
    }
}

/// Callback told about each character the font cannot render.
pub type GlyphNotFoundCallback = Arc<dyn Fn(char) + Send + Sync>;

/// Chooses the character drawn in place of a missing one.
pub type GlyphSubstitute = Arc<dyn Fn(char) -> char + Send + Sync>;

/// Rewrites a kerning value: `(left, right, left_glyph, right_glyph, value)`.
pub type KernOverride = Arc<dyn Fn(char, char, u16, u16, i16) -> i16 + Send + Sync>;

/// Per-font options.
#[derive(Clone)]
pub struct FontOptions {
    /// Apply `kern` table adjustments
    pub use_kerning: bool,
    /// Style this font is registered under
    pub style: FontStyle,
    /// Called once per distinct missing character
    pub on_glyph_not_found: Option<GlyphNotFoundCallback>,
    /// Replacement for missing characters; without one they draw as `.notdef`
    pub glyph_not_found_substitute: Option<GlyphSubstitute>,
}

impl Default for FontOptions {
    fn default() -> Self {
        Self {
            use_kerning: false,
            style: FontStyle::REGULAR,
            on_glyph_not_found: None,
            glyph_not_found_substitute: Some(Arc::new(|_| ' ')),
        }
    }
}

impl fmt::Debug for FontOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontOptions")
            .field("use_kerning", &self.use_kerning)
            .field("style", &self.style)
            .field("on_glyph_not_found", &self.on_glyph_not_found.is_some())
            .field("glyph_not_found_substitute", &self.glyph_not_found_substitute.is_some())
            .finish()
    }
}

/// A TrueType font together with the glyphs a document uses from it.
#[derive(Clone)]
pub struct SubsetFont {
    family: String,
    font: TrueTypeFont,
    options: FontOptions,
    glyphs: GlyphMap,
    /// Missing characters and the substitute recorded for each
    substitutions: HashMap<char, char>,
    kern_override: Option<KernOverride>,
}

impl SubsetFont {
    /// Parse font data and create an empty subset.
    pub fn new(family: &str, data: impl Into<Bytes>, options: FontOptions) -> Result<Self> {
        let font = TrueTypeFont::parse(data)?;
        Ok(Self::from_font(family, font, options))
    }

    /// Create an empty subset of an already parsed font.
    pub fn from_font(family: &str, font: TrueTypeFont, options: FontOptions) -> Self {
        Self {
            family: family.to_string(),
            font,
            options,
            glyphs: GlyphMap::new(),
            substitutions: HashMap::new(),
            kern_override: None,
        }
    }

    /// Family name the font was registered under.
    pub fn family(&self) -> &str {
        &self.family
    }

    /// Style the font was registered under.
    pub fn style(&self) -> FontStyle {
        self.options.style
    }

    /// Font options.
    pub fn options(&self) -> &FontOptions {
        &self.options
    }

    /// The parsed source font.
    pub fn font(&self) -> &TrueTypeFont {
        &self.font
    }

    /// Characters registered so far.
    pub fn glyph_map(&self) -> &GlyphMap {
        &self.glyphs
    }

    /// Install a kerning override.
    pub fn set_kern_override(&mut self, kern_override: KernOverride) {
        self.kern_override = Some(kern_override);
    }

    /// Register every character of `text` and return the text as it will be
    /// drawn, with missing characters replaced.
    ///
    /// Characters already registered are skipped, so repeated calls never
    /// reorder or duplicate glyph map entries. A missing character fires the
    /// not-found callback the first time it is seen and its substitute is
    /// registered instead. A substitute the font cannot render, or a missing
    /// character without any substitute, is registered with `.notdef`.
    pub fn add_chars(&mut self, text: &str) -> String {
        let mut normalized = String::with_capacity(text.len());
        for ch in text.chars() {
            if self.glyphs.contains(ch) {
                normalized.push(ch);
                continue;
            }
            if let Some(&substitute) = self.substitutions.get(&ch) {
                normalized.push(substitute);
                continue;
            }

            match self.font_glyph(ch) {
                Some(glyph) => {
                    self.glyphs.insert(ch, glyph);
                    normalized.push(ch);
                },
                None => normalized.push(self.substitute_missing(ch)),
            }
        }
        normalized
    }

    fn substitute_missing(&mut self, missing: char) -> char {
        log::debug!(
            "Font '{}' has no glyph for U+{:04X}",
            self.family,
            missing as u32
        );
        if let Some(callback) = &self.options.on_glyph_not_found {
            callback(missing);
        }

        let substitute = match &self.options.glyph_not_found_substitute {
            Some(f) => f(missing),
            None => missing,
        };
        if !self.glyphs.contains(substitute) {
            let glyph = self.font_glyph(substitute).unwrap_or_else(|| {
                if substitute != missing {
                    log::warn!(
                        "Substitute U+{:04X} for U+{:04X} is missing from font '{}'",
                        substitute as u32,
                        missing as u32,
                        self.family
                    );
                }
                0
            });
            self.glyphs.insert(substitute, glyph);
        }

        self.substitutions.insert(missing, substitute);
        substitute
    }

    /// Resolve a character through `cmap` without registering it.
    ///
    /// BMP code points go through format 4, the rest through format 12.
    /// Glyph 0 is a valid result.
    pub fn char_code_to_glyph_index(&self, ch: char) -> Result<u16> {
        self.font_glyph(ch)
            .ok_or(Error::GlyphNotFound(ch as u32))
    }

    fn font_glyph(&self, ch: char) -> Option<u16> {
        let code = ch as u32;
        if code <= 0xFFFF {
            self.font.cmap4()?.lookup(code)
        } else {
            self.font
                .cmap12()
                .iter()
                .find(|g| (g.start_char_code..=g.end_char_code).contains(&code))
                .and_then(|g| g.glyph_for(code))
        }
    }

    /// Glyph index of a registered character.
    pub fn glyph_index(&self, ch: char) -> Option<u16> {
        self.glyphs.glyph(ch)
    }

    /// Advance width of a glyph in 1000-unit glyph space.
    ///
    /// Glyphs past the last long horizontal metric share its advance.
    pub fn glyph_index_to_pdf_width(&self, glyph: u16) -> u32 {
        let widths = self.font.advance_widths();
        let Some(last) = widths.len().checked_sub(1) else {
            return 0;
        };
        let width = widths[(glyph as usize).min(last)] as u32;
        let units_per_em = self.font.units_per_em() as u32;
        if units_per_em == 1000 {
            return width;
        }
        width * 1000 / units_per_em
    }

    /// Width of a registered character in 1000-unit glyph space.
    pub fn char_width(&self, ch: char) -> Option<u32> {
        self.glyph_index(ch).map(|g| self.glyph_index_to_pdf_width(g))
    }

    /// Kerning between two registered characters in design units.
    ///
    /// `None` unless kerning is enabled and the pair is in the `kern` table.
    pub fn kern_value(&self, left: char, right: char) -> Option<i16> {
        if !self.options.use_kerning {
            return None;
        }
        let left_glyph = self.glyph_index(left)?;
        let right_glyph = self.glyph_index(right)?;
        let value = self.font.kern_value(left_glyph, right_glyph)?;
        Some(match &self.kern_override {
            Some(f) => f(left, right, left_glyph, right_glyph, value),
            None => value,
        })
    }

    /// Kerning between two registered characters in 1000-unit glyph space.
    pub fn kern_pdf_units(&self, left: char, right: char) -> Option<f64> {
        self.kern_value(left, right)
            .map(|v| v as f64 * 1000.0 / self.font.units_per_em() as f64)
    }

    /// Width in points of already registered text at `font_size`.
    ///
    /// Character spacing is added after every character.
    pub fn text_width(&self, text: &str, font_size: f64, char_spacing: f64) -> Result<f64> {
        let mut width = 0.0;
        let mut chars = text.chars().peekable();
        while let Some(ch) = chars.next() {
            let glyph = self
                .glyph_index(ch)
                .ok_or(Error::GlyphNotFound(ch as u32))?;
            width += self.glyph_index_to_pdf_width(glyph) as f64 * font_size / 1000.0;
            width += char_spacing;
            if let Some(&next) = chars.peek() {
                if let Some(kern) = self.kern_pdf_units(ch, next) {
                    width += kern * font_size / 1000.0;
                }
            }
        }
        Ok(width)
    }

    /// Components referenced by a composite glyph; empty for simple glyphs.
    fn composite_components(&self, glyph: u16) -> TrueTypeResult<Vec<u16>> {
        let data = self.font.glyph_data(glyph);
        if data.is_empty() || read_i16(data, 0, "glyf")? >= 0 {
            return Ok(Vec::new());
        }

        let mut components = Vec::new();
        let mut offset = 10;
        loop {
            let flags = ComponentFlags::from_bits_truncate(read_u16(data, offset, "glyf")?);
            components.push(read_u16(data, offset + 2, "glyf")?);
            offset += 4;

            if !flags.contains(ComponentFlags::MORE_COMPONENTS) {
                break;
            }

            offset += if flags.contains(ComponentFlags::ARG_1_AND_2_ARE_WORDS) {
                4
            } else {
                2
            };
            if flags.contains(ComponentFlags::WE_HAVE_A_SCALE) {
                offset += 2;
            } else if flags.contains(ComponentFlags::WE_HAVE_AN_X_AND_Y_SCALE) {
                offset += 4;
            }
            if flags.contains(ComponentFlags::WE_HAVE_A_TWO_BY_TWO) {
                offset += 8;
            }
        }
        Ok(components)
    }

    /// Every glyph the subset must contain: the registered glyphs, glyph 0
    /// and all composite components reachable from them.
    pub fn glyph_closure(&self) -> TrueTypeResult<BTreeSet<u16>> {
        let num_glyphs = self.font.num_glyphs();
        let mut closure: BTreeSet<u16> = self.glyphs.glyphs().collect();
        closure.insert(0);

        let mut pending: Vec<u16> = closure.iter().copied().collect();
        while let Some(glyph) = pending.pop() {
            for component in self.composite_components(glyph)? {
                if component >= num_glyphs {
                    log::warn!(
                        "Glyph {} references component {} beyond numGlyphs {}",
                        glyph,
                        component,
                        num_glyphs
                    );
                    continue;
                }
                if closure.insert(component) {
                    pending.push(component);
                }
            }
        }
        Ok(closure)
    }

    /// Rebuild a TrueType font holding only the glyph closure.
    pub fn rebuild_subset(&self) -> TrueTypeResult<Vec<u8>> {
        let closure = self.glyph_closure()?;
        let short = self.font.is_short_loca();

        let mut glyf = Vec::new();
        let mut offsets = Vec::with_capacity(self.font.num_glyphs() as usize + 1);
        for glyph in 0..self.font.num_glyphs() {
            offsets.push(glyf.len());
            if closure.contains(&glyph) {
                glyf.extend_from_slice(self.font.glyph_data(glyph));
                if short && glyf.len() % 2 == 1 {
                    glyf.push(0);
                }
            }
        }
        offsets.push(glyf.len());

        let mut loca = Vec::with_capacity(offsets.len() * if short { 2 } else { 4 });
        for offset in offsets {
            if short {
                let value = u16::try_from(offset / 2).map_err(|_| TrueTypeError::MalformedTable {
                    tag: "loca".to_string(),
                    reason: "subset glyph data exceeds the short offset range".to_string(),
                })?;
                loca.extend_from_slice(&value.to_be_bytes());
            } else {
                loca.extend_from_slice(&(offset as u32).to_be_bytes());
            }
        }

        let mut builder = SfntBuilder::new();
        for tag in ["cvt ", "fpgm", "head", "hhea", "hmtx", "maxp", "prep"] {
            if let Some(data) = self.font.table_data(tag) {
                let mut key = [0u8; 4];
                key.copy_from_slice(tag.as_bytes());
                builder.add_table(key, data.to_vec());
            }
        }
        builder.add_table(*b"glyf", glyf);
        builder.add_table(*b"loca", loca);

        let font = builder.build();
        let stats = self.stats();
        log::debug!(
            "Rebuilt subset of '{}': {} chars, {} of {} glyphs ({:.1}% dropped), {} tables, {} -> {} bytes",
            self.family,
            stats.unique_chars,
            closure.len(),
            self.font.num_glyphs(),
            stats.estimated_reduction(self.font.num_glyphs()),
            builder.table_count(),
            self.font.raw_data().len(),
            font.len()
        );
        Ok(font)
    }

    /// Six uppercase letters derived from the family and the used glyph set.
    pub fn subset_tag(&self) -> String {
        let used: BTreeSet<u16> = self.glyphs.glyphs().collect();
        let mut hasher = Sha256::new();
        hasher.update(self.family.as_bytes());
        hasher.update([0u8]);
        for glyph in &used {
            hasher.update(glyph.to_be_bytes());
        }
        let digest = hasher.finalize();

        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        let mut h = u64::from_be_bytes(prefix);
        let mut tag = String::with_capacity(6);
        for _ in 0..6 {
            tag.push((b'A' + (h % 26) as u8) as char);
            h /= 26;
        }
        tag
    }

    /// Subset font name, `TAG+Family` with spaces and slashes replaced.
    pub fn subset_name(&self) -> String {
        let base = self.family.replace([' ', '/'], "+");
        format!("{}+{}", self.subset_tag(), base)
    }

    /// Glyph usage statistics.
    pub fn stats(&self) -> SubsetStats {
        let used: BTreeSet<u16> = self.glyphs.glyphs().collect();
        SubsetStats {
            unique_chars: self.glyphs.len(),
            unique_glyphs: used.len(),
            min_glyph_id: used.first().copied(),
            max_glyph_id: used.last().copied(),
        }
    }
}

impl fmt::Debug for SubsetFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubsetFont")
            .field("family", &self.family)
            .field("options", &self.options)
            .field("glyphs", &self.glyphs.len())
            .field("kern_override", &self.kern_override.is_some())
            .finish()
    }
}

/// Statistics about a font subset.
#[derive(Debug, Clone)]
pub struct SubsetStats {
    /// Number of unique characters used
    pub unique_chars: usize,
    /// Number of unique glyphs used
    pub unique_glyphs: usize,
    /// Minimum glyph ID used
    pub min_glyph_id: Option<u16>,
    /// Maximum glyph ID used
    pub max_glyph_id: Option<u16>,
}

impl SubsetStats {
    /// Share of the font's glyphs left out of the subset, in percent.
    pub fn estimated_reduction(&self, total_glyphs: u16) -> f32 {
        if total_glyphs == 0 || self.unique_glyphs == 0 {
            return 0.0;
        }
        let used = self.unique_glyphs as f32;
        let total = total_glyphs as f32;
        (1.0 - used / total) * 100.0
    }
}
