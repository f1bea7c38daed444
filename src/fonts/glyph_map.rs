//! Insertion-ordered character to glyph map.

use std::collections::HashMap;

use indexmap::IndexMap;

/// Characters registered for a font, in first-use order, with their glyph
/// indices.
///
/// Entries are never removed or reordered. Several characters may share a
/// glyph; the reverse lookup keeps the first character registered for it.
#[derive(Debug, Clone, Default)]
pub struct GlyphMap {
    forward: IndexMap<char, u16>,
    reverse: HashMap<u16, char>,
}

impl GlyphMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a character. Existing entries are left untouched.
    ///
    /// Returns `true` if the character was new.
    pub fn insert(&mut self, ch: char, glyph: u16) -> bool {
        if self.forward.contains_key(&ch) {
            return false;
        }
        self.forward.insert(ch, glyph);
        self.reverse.entry(glyph).or_insert(ch);
        true
    }

    /// Glyph index of a registered character.
    pub fn glyph(&self, ch: char) -> Option<u16> {
        self.forward.get(&ch).copied()
    }

    /// First character registered for a glyph.
    pub fn char_for_glyph(&self, glyph: u16) -> Option<char> {
        self.reverse.get(&glyph).copied()
    }

    /// Whether the character is registered.
    pub fn contains(&self, ch: char) -> bool {
        self.forward.contains_key(&ch)
    }

    /// Number of registered characters.
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (char, u16)> + '_ {
        self.forward.iter().map(|(&c, &g)| (c, g))
    }

    /// Glyph indices in registration order (may repeat).
    pub fn glyphs(&self) -> impl Iterator<Item = u16> + '_ {
        self.forward.values().copied()
    }

    /// Distinct (glyph, character) pairs sorted by glyph.
    pub fn reverse_pairs(&self) -> Vec<(u16, char)> {
        let mut pairs: Vec<_> = self.reverse.iter().map(|(&g, &c)| (g, c)).collect();
        pairs.sort_unstable_by_key(|&(g, _)| g);
        pairs
    }
}
