//! Shared helpers for integration tests.

#![allow(dead_code)]

use pdf_forge::fonts::SfntBuilder;

#[path = "../../src/fonts/testing.rs"]
mod testing;

pub use testing::TestFont;

use pdf_forge::config::{CompressLevel, PdfConfig};
use pdf_forge::PdfWriter;

/// Route `log` output through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Writer with uncompressed content streams so output can be inspected.
pub fn plain_writer() -> PdfWriter {
    PdfWriter::new(PdfConfig::new().with_compress(CompressLevel::None))
}

/// Lossy text view of compiled output.
pub fn as_text(pdf: &[u8]) -> String {
    String::from_utf8_lossy(pdf).to_string()
}

/// Byte offsets listed in the xref table, in object order.
pub fn xref_offsets(pdf: &[u8]) -> Vec<usize> {
    let start = pdf
        .windows(5)
        .position(|w| w == b"xref\n")
        .expect("xref table present");
    let table = String::from_utf8_lossy(&pdf[start..]).to_string();
    let re = regex::Regex::new(r"(?m)^(\d{10}) 00000 n $").unwrap();
    re.captures_iter(&table)
        .map(|c| c[1].parse().unwrap())
        .collect()
}
