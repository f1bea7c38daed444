//! Synthetic TrueType fonts for tests.
//!
//! Shared with the integration tests, which mount this file with `#[path]`;
//! the only outside name it uses is `super::SfntBuilder`.

#![allow(dead_code)]

use super::SfntBuilder;

const NOTDEF_WIDTH: u16 = 500;

/// Builder for small but structurally complete TrueType fonts.
///
/// Glyph 0 is `.notdef`. Characters get glyphs 1.. in the order given,
/// composites follow them.
#[derive(Debug, Clone)]
pub struct TestFont {
    chars: Vec<char>,
    composites: Vec<(char, Vec<char>)>,
    kerns: Vec<(char, char, i16)>,
    units_per_em: u16,
    long_loca: bool,
    truncated_composites: bool,
    ascender: i16,
    descender: i16,
    italic_angle: i32,
}

impl TestFont {
    /// Font covering the given characters with simple outlines.
    pub fn with_chars(chars: &str) -> Self {
        Self {
            chars: chars.chars().collect(),
            composites: Vec::new(),
            kerns: Vec::new(),
            units_per_em: 1000,
            long_loca: false,
            truncated_composites: false,
            ascender: 800,
            descender: -200,
            italic_angle: 0,
        }
    }

    /// Space, `A`-`Z` and `a`-`z`.
    pub fn latin() -> Self {
        let mut chars = String::from(" ");
        chars.extend('A'..='Z');
        chars.extend('a'..='z');
        Self::with_chars(&chars)
    }

    /// Set units per em.
    pub fn units_per_em(mut self, units_per_em: u16) -> Self {
        self.units_per_em = units_per_em;
        self
    }

    /// Use the long `loca` format.
    pub fn long_loca(mut self) -> Self {
        self.long_loca = true;
        self
    }

    /// Set the `post` italic angle in whole degrees.
    pub fn italic_angle(mut self, degrees: i32) -> Self {
        self.italic_angle = degrees;
        self
    }

    /// Flag the last component of every composite as followed by another,
    /// so reading the component records runs past the glyph data.
    pub fn truncated_composites(mut self) -> Self {
        self.truncated_composites = true;
        self
    }

    /// Add a composite glyph for `ch` built from `components`.
    pub fn composite(mut self, ch: char, components: &[char]) -> Self {
        self.composites.push((ch, components.to_vec()));
        self
    }

    /// Add a `kern` pair.
    pub fn kern(mut self, left: char, right: char, value: i16) -> Self {
        self.kerns.push((left, right, value));
        self
    }

    /// Glyph index of a character.
    pub fn glyph_of(&self, ch: char) -> u16 {
        if let Some(i) = self.chars.iter().position(|&c| c == ch) {
            return i as u16 + 1;
        }
        if let Some(i) = self.composites.iter().position(|(c, _)| *c == ch) {
            return (self.chars.len() + 1 + i) as u16;
        }
        panic!("character {:?} not in test font", ch);
    }

    /// Total glyph count including `.notdef`.
    pub fn num_glyphs(&self) -> u16 {
        (1 + self.chars.len() + self.composites.len()) as u16
    }

    /// Advance width of a glyph in design units.
    pub fn advance(&self, glyph: u16) -> u16 {
        if glyph == 0 {
            return NOTDEF_WIDTH;
        }
        match self.char_of(glyph) {
            Some('A') => 1229,
            Some(' ') => 250,
            _ => 400 + glyph * 10,
        }
    }

    fn char_of(&self, glyph: u16) -> Option<char> {
        let idx = glyph as usize;
        if idx == 0 {
            None
        } else if idx <= self.chars.len() {
            Some(self.chars[idx - 1])
        } else {
            self.composites.get(idx - 1 - self.chars.len()).map(|(c, _)| *c)
        }
    }

    fn mapped(&self) -> Vec<(char, u16)> {
        let mut mapped: Vec<(char, u16)> = self
            .chars
            .iter()
            .chain(self.composites.iter().map(|(c, _)| c))
            .map(|&c| (c, self.glyph_of(c)))
            .collect();
        mapped.sort_by_key(|&(c, _)| c);
        mapped
    }

    /// Serialize the font.
    pub fn build(&self) -> Vec<u8> {
        let (glyf, loca) = self.glyf_and_loca();

        let mut builder = SfntBuilder::new();
        builder
            .add_table(*b"cmap", self.cmap())
            .add_table(*b"cvt ", vec![0, 10, 0, 20])
            .add_table(*b"fpgm", vec![0xB0, 0x01, 0x2C, 0x00])
            .add_table(*b"glyf", glyf)
            .add_table(*b"head", self.head())
            .add_table(*b"hhea", self.hhea())
            .add_table(*b"hmtx", self.hmtx())
            .add_table(*b"loca", loca)
            .add_table(*b"maxp", self.maxp())
            .add_table(*b"post", self.post())
            .add_table(*b"prep", vec![0xB8, 0x01, 0xFF]);
        if !self.kerns.is_empty() {
            builder.add_table(*b"kern", self.kern_table());
        }
        builder.build()
    }

    fn head(&self) -> Vec<u8> {
        let mut t = Vec::with_capacity(54);
        t.extend(0x0001_0000u32.to_be_bytes());
        t.extend(0x0001_0000u32.to_be_bytes());
        t.extend(0u32.to_be_bytes());
        t.extend(0x5F0F_3CF5u32.to_be_bytes());
        t.extend(0x000Bu16.to_be_bytes());
        t.extend(self.units_per_em.to_be_bytes());
        t.extend([0u8; 16]);
        for v in [-50i16, self.descender, 1300, self.ascender] {
            t.extend(v.to_be_bytes());
        }
        t.extend(0u16.to_be_bytes()); // macStyle
        t.extend(8u16.to_be_bytes());
        t.extend(2i16.to_be_bytes());
        t.extend((self.long_loca as i16).to_be_bytes());
        t.extend(0i16.to_be_bytes());
        t
    }

    fn hhea(&self) -> Vec<u8> {
        let mut t = Vec::with_capacity(36);
        t.extend(0x0001_0000u32.to_be_bytes());
        t.extend(self.ascender.to_be_bytes());
        t.extend(self.descender.to_be_bytes());
        t.extend(0i16.to_be_bytes());
        t.extend(1300u16.to_be_bytes());
        t.extend([0u8; 22]);
        t.extend(self.num_glyphs().to_be_bytes());
        t
    }

    fn maxp(&self) -> Vec<u8> {
        let mut t = 0x0000_5000u32.to_be_bytes().to_vec();
        t.extend(self.num_glyphs().to_be_bytes());
        t
    }

    fn hmtx(&self) -> Vec<u8> {
        (0..self.num_glyphs())
            .flat_map(|g| {
                let mut m = self.advance(g).to_be_bytes().to_vec();
                m.extend(10i16.to_be_bytes());
                m
            })
            .collect()
    }

    fn post(&self) -> Vec<u8> {
        let mut t = 0x0003_0000u32.to_be_bytes().to_vec();
        t.extend((self.italic_angle << 16).to_be_bytes());
        t.extend((-100i16).to_be_bytes());
        t.extend(50i16.to_be_bytes());
        t.extend([0u8; 20]);
        t
    }

    fn simple_glyph(glyph: u16) -> Vec<u8> {
        // one contour, one on-curve point; 19 bytes
        let mut g = Vec::new();
        g.extend(1i16.to_be_bytes());
        for v in [0i16, 0, 500, 700] {
            g.extend(v.to_be_bytes());
        }
        g.extend(0u16.to_be_bytes());
        g.extend(0u16.to_be_bytes());
        g.push(0x01);
        g.extend((glyph as i16).to_be_bytes());
        g.extend(100i16.to_be_bytes());
        g
    }

    fn composite_glyph(&self, components: &[char]) -> Vec<u8> {
        let mut g = Vec::new();
        g.extend((-1i16).to_be_bytes());
        for v in [0i16, 0, 500, 900] {
            g.extend(v.to_be_bytes());
        }
        for (i, &c) in components.iter().enumerate() {
            let more = if i + 1 < components.len() || self.truncated_composites {
                0x0020
            } else {
                0
            };
            // ARG_1_AND_2_ARE_WORDS | ARGS_ARE_XY_VALUES, plus a scale on
            // every other component to vary the record length
            let scale = if i % 2 == 1 { 0x0008 } else { 0 };
            g.extend((0x0001u16 | 0x0002 | more | scale).to_be_bytes());
            g.extend(self.glyph_of(c).to_be_bytes());
            g.extend(0i16.to_be_bytes());
            g.extend((i as i16 * 200).to_be_bytes());
            if scale != 0 {
                g.extend(0x4000u16.to_be_bytes());
            }
        }
        g
    }

    fn glyf_and_loca(&self) -> (Vec<u8>, Vec<u8>) {
        let mut glyf = Vec::new();
        let mut offsets = Vec::new();
        for glyph in 0..self.num_glyphs() {
            offsets.push(glyf.len() as u32);
            let data = match self.char_of(glyph) {
                None => Self::simple_glyph(0),
                Some(' ') => Vec::new(),
                Some(c) => match self.composites.iter().find(|(cc, _)| *cc == c) {
                    Some((_, parts)) if glyph as usize > self.chars.len() => {
                        self.composite_glyph(parts)
                    },
                    _ => Self::simple_glyph(glyph),
                },
            };
            glyf.extend(data);
            if glyf.len() % 2 == 1 {
                glyf.push(0);
            }
        }
        offsets.push(glyf.len() as u32);

        let loca = if self.long_loca {
            offsets.iter().flat_map(|o| o.to_be_bytes()).collect()
        } else {
            offsets
                .iter()
                .flat_map(|o| ((o / 2) as u16).to_be_bytes())
                .collect()
        };
        (glyf, loca)
    }

    fn cmap(&self) -> Vec<u8> {
        let mapped = self.mapped();
        let bmp: Vec<_> = mapped.iter().filter(|(c, _)| (*c as u32) <= 0xFFFF).collect();
        let astral: Vec<_> = mapped.iter().filter(|(c, _)| (*c as u32) > 0xFFFF).collect();

        // format 4: one delta segment per character plus the 0xFFFF sentinel
        let seg_count = bmp.len() as u16 + 1;
        let mut ends: Vec<u16> = bmp.iter().map(|(c, _)| *c as u16).collect();
        let mut starts = ends.clone();
        let mut deltas: Vec<u16> = bmp
            .iter()
            .map(|(c, g)| g.wrapping_sub(*c as u16))
            .collect();
        ends.push(0xFFFF);
        starts.push(0xFFFF);
        deltas.push(1);

        let mut f4 = Vec::new();
        let length = 16 + 8 * seg_count;
        for v in [4u16, length, 0, seg_count * 2, 0, 0, 0] {
            f4.extend(v.to_be_bytes());
        }
        ends.iter().for_each(|v| f4.extend(v.to_be_bytes()));
        f4.extend(0u16.to_be_bytes());
        starts.iter().for_each(|v| f4.extend(v.to_be_bytes()));
        deltas.iter().for_each(|v| f4.extend(v.to_be_bytes()));
        (0..seg_count).for_each(|_| f4.extend(0u16.to_be_bytes()));

        let mut f12 = Vec::new();
        if !astral.is_empty() {
            f12.extend(12u16.to_be_bytes());
            f12.extend(0u16.to_be_bytes());
            f12.extend((16 + 12 * astral.len() as u32).to_be_bytes());
            f12.extend(0u32.to_be_bytes());
            f12.extend((astral.len() as u32).to_be_bytes());
            for (c, g) in &astral {
                f12.extend((*c as u32).to_be_bytes());
                f12.extend((*c as u32).to_be_bytes());
                f12.extend((*g as u32).to_be_bytes());
            }
        }

        let subtables = if f12.is_empty() { 1u16 } else { 2 };
        let header_len = 4 + 8 * subtables as u32;
        let mut cmap = Vec::new();
        cmap.extend(0u16.to_be_bytes());
        cmap.extend(subtables.to_be_bytes());
        cmap.extend(3u16.to_be_bytes());
        cmap.extend(1u16.to_be_bytes());
        cmap.extend(header_len.to_be_bytes());
        if !f12.is_empty() {
            cmap.extend(3u16.to_be_bytes());
            cmap.extend(10u16.to_be_bytes());
            cmap.extend((header_len + f4.len() as u32).to_be_bytes());
        }
        cmap.extend(f4);
        cmap.extend(f12);
        cmap
    }

    fn kern_table(&self) -> Vec<u8> {
        let mut pairs: Vec<(u16, u16, i16)> = self
            .kerns
            .iter()
            .map(|&(l, r, v)| (self.glyph_of(l), self.glyph_of(r), v))
            .collect();
        pairs.sort();

        let mut t = Vec::new();
        t.extend(0u16.to_be_bytes());
        t.extend(1u16.to_be_bytes());
        t.extend(0u16.to_be_bytes());
        t.extend((14 + 6 * pairs.len() as u16).to_be_bytes());
        t.extend(0x0001u16.to_be_bytes());
        t.extend((pairs.len() as u16).to_be_bytes());
        t.extend([0u8; 6]);
        for (l, r, v) in pairs {
            t.extend(l.to_be_bytes());
            t.extend(r.to_be_bytes());
            t.extend(v.to_be_bytes());
        }
        t
    }
}
