//! sfnt container assembly.
//!
//! Writes the offset table and table directory, lays tables out in tag order
//! on 4-byte boundaries and computes each table's checksum.

use std::collections::BTreeMap;

/// `log2` of the largest power of two not above the table count, indexed by
/// table count.
const ENTRY_SELECTORS: [u16; 32] = [
    0, 0, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 3, 3, 3, 3, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4,
];

const SFNT_VERSION_TRUETYPE: u32 = 0x0001_0000;

/// Wrapping sum of big-endian 32-bit words; a short tail is zero-padded.
pub fn table_checksum(data: &[u8]) -> u32 {
    data.chunks(4).fold(0u32, |sum, chunk| {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        sum.wrapping_add(u32::from_be_bytes(word))
    })
}

/// `(searchRange, entrySelector, rangeShift)` for a table count.
pub fn search_params(num_tables: u16) -> (u16, u16, u16) {
    let selector = match ENTRY_SELECTORS.get(num_tables as usize) {
        Some(&s) => s,
        None => 15 - num_tables.leading_zeros() as u16,
    };
    let search_range = (1u16 << selector) * 16;
    let range_shift = num_tables.saturating_mul(16).saturating_sub(search_range);
    (search_range, selector, range_shift)
}

fn padded_len(len: usize) -> usize {
    (len + 3) & !3
}

/// Collects tables and serializes them as a TrueType sfnt.
#[derive(Debug, Default, Clone)]
pub struct SfntBuilder {
    tables: BTreeMap<[u8; 4], Vec<u8>>,
}

impl SfntBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a table.
    pub fn add_table(&mut self, tag: [u8; 4], data: Vec<u8>) -> &mut Self {
        self.tables.insert(tag, data);
        self
    }

    /// Number of tables added so far.
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Serialize the font.
    ///
    /// Directory entries carry the unpadded table length; the checksum covers
    /// the zero-padded bytes.
    pub fn build(&self) -> Vec<u8> {
        let num_tables = self.tables.len() as u16;
        let (search_range, entry_selector, range_shift) = search_params(num_tables);

        let header_len = 12 + 16 * self.tables.len();
        let body_len: usize = self.tables.values().map(|t| padded_len(t.len())).sum();
        let mut out = Vec::with_capacity(header_len + body_len);

        out.extend_from_slice(&SFNT_VERSION_TRUETYPE.to_be_bytes());
        out.extend_from_slice(&num_tables.to_be_bytes());
        out.extend_from_slice(&search_range.to_be_bytes());
        out.extend_from_slice(&entry_selector.to_be_bytes());
        out.extend_from_slice(&range_shift.to_be_bytes());

        let mut offset = header_len;
        let mut body = Vec::with_capacity(body_len);
        for (tag, data) in &self.tables {
            let mut padded = data.clone();
            padded.resize(padded_len(data.len()), 0);

            out.extend_from_slice(tag);
            out.extend_from_slice(&table_checksum(&padded).to_be_bytes());
            out.extend_from_slice(&(offset as u32).to_be_bytes());
            out.extend_from_slice(&(data.len() as u32).to_be_bytes());

            offset += padded.len();
            body.extend_from_slice(&padded);
        }

        out.extend_from_slice(&body);
        out
    }
}
