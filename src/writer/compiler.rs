//! Document compilation.
//!
//! Compiling runs two passes over the registry:
//!
//! 1. [`link`] re-derives the associations that depend on registration
//!    order: which content streams belong to which page, the page tree kids,
//!    the wiring of simple fonts to their encoding objects, the outline root
//!    and the encryption dictionary.
//! 2. [`serialize`] writes the header, every object in registration order,
//!    the cross-reference table and the trailer. Offsets come from a
//!    [`CountingWriter`] around the output.
//!
//! A content stream belongs to the closest page registered before it.

use std::io::{self, Write};

use chrono::{DateTime, FixedOffset};

use super::doc_object::{DocObject, WriteContext};
use super::font_objects::SimpleFontLinks;
use super::object_serializer::ObjectSerializer as S;
use super::registry::ObjectRegistry;
use crate::config::{PdfConfig, PdfInfo};
use crate::error::Result;

/// Header comment with high bytes marking the file as binary.
const BINARY_MARKER: &[u8] = b"%\xE2\xE3\xCF\xD3\n\n";

/// Associations resolved by [`link`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Linked {
    /// Registry index of the encryption dictionary
    pub encryption: Option<usize>,
    /// Number of pages
    pub page_count: usize,
}

/// Resolve order-dependent associations.
///
/// Running it again on an unchanged registry gives the same result.
pub fn link(registry: &mut ObjectRegistry, encoding_indices: &[usize]) -> Result<Linked> {
    let mut linked = Linked::default();
    let mut kids = Vec::new();
    let mut current_page = None;
    let mut outline_items = Vec::new();
    let mut outline_root = None;
    let mut catalog = None;

    for index in 0..registry.len() {
        let type_name = match registry.get(index) {
            Some(obj) => obj.type_name(),
            None => break,
        };
        match type_name {
            "Page" => {
                registry.page_mut(index)?.contents.clear();
                kids.push(index);
                current_page = Some(index);
            },
            "Content" => match current_page {
                Some(page) => registry.page_mut(page)?.contents.push(index),
                None => log::warn!("Content object {} precedes every page", index + 1),
            },
            "Font" => {
                let family = registry.simple_font(index)?.family.clone();
                let mut links = None;
                for &encoding in encoding_indices {
                    if registry.encoding(encoding)?.family == family {
                        links = Some(SimpleFontLinks {
                            encoding,
                            widths: encoding + 1,
                            descriptor: encoding + 2,
                        });
                        break;
                    }
                }
                registry.simple_font_mut(index)?.links = links;
            },
            "Catalog" => catalog = Some(index),
            "Outlines" => outline_root = Some(index),
            "Outline" => outline_items.push(index),
            "Encryption" => linked.encryption = Some(index),
            _ => {},
        }
    }

    linked.page_count = kids.len();
    for index in 0..registry.len() {
        if let Some(DocObject::Pages(pages)) = registry.get_mut(index) {
            pages.kids = kids.clone();
        }
    }

    let catalog_outlines = match outline_root {
        Some(root) => {
            let outlines = registry.outlines_mut(root)?;
            outlines.first = outline_items.first().copied();
            outlines.last = outline_items.last().copied();
            outlines.count = outline_items.len();
            (!outline_items.is_empty()).then_some(root)
        },
        None => None,
    };
    if let Some(index) = catalog {
        registry.catalog_mut(index)?.outlines = catalog_outlines;
    }

    log::debug!(
        "Linked {} objects: {} pages, {} outline items",
        registry.len(),
        linked.page_count,
        outline_items.len()
    );
    Ok(linked)
}

/// Write adapter that counts the bytes passed through it.
#[derive(Debug)]
pub struct CountingWriter<W> {
    inner: W,
    count: u64,
}

impl<W: Write> CountingWriter<W> {
    /// Wrap a writer.
    pub fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }

    /// Bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.count
    }

    /// Unwrap the inner writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Write the whole document into a buffer.
///
/// The first failing object aborts the pass.
pub fn serialize(
    ctx: &WriteContext<'_>,
    info: Option<&PdfInfo>,
    encryption: Option<usize>,
) -> Result<Vec<u8>> {
    let mut w = CountingWriter::new(Vec::new());

    writeln!(w, "%PDF-{}", PdfConfig::PDF_VERSION)?;
    w.write_all(BINARY_MARKER)?;

    let mut offsets = Vec::with_capacity(ctx.registry.len());
    for (index, obj) in ctx.registry.iter().enumerate() {
        let id = index as u32 + 1;
        offsets.push(w.bytes_written());
        writeln!(w, "{} 0 obj", id)?;
        obj.write(ctx, &mut w, id)?;
        write!(w, "endobj\n\n")?;
    }

    let xref_offset = w.bytes_written();
    write_xref(&mut w, &offsets)?;
    write_trailer(&mut w, offsets.len(), info, encryption, xref_offset)?;

    log::info!(
        "Compiled {} objects into {} bytes",
        offsets.len(),
        w.bytes_written()
    );
    Ok(w.into_inner())
}

fn write_xref<W: Write>(w: &mut W, offsets: &[u64]) -> io::Result<()> {
    write!(w, "xref\n0 {}\n", offsets.len() + 1)?;
    write!(w, "0000000000 65535 f \n")?;
    for offset in offsets {
        write!(w, "{:010} 00000 n \n", offset)?;
    }
    Ok(())
}

fn write_trailer<W: Write>(
    w: &mut W,
    object_count: usize,
    info: Option<&PdfInfo>,
    encryption: Option<usize>,
    xref_offset: u64,
) -> io::Result<()> {
    write!(w, "trailer\n<<\n/Size {}\n/Root 1 0 R\n", object_count + 1)?;
    if let Some(index) = encryption {
        write!(w, "/Encrypt {} 0 R\n/ID [()()]\n", index + 1)?;
    }
    if let Some(info) = info {
        write_info(w, info)?;
    }
    write!(w, ">>\nstartxref\n{}\n%%EOF\n", xref_offset)
}

/// `/Info` dictionary inline in the trailer; empty entries are skipped.
fn write_info<W: Write>(w: &mut W, info: &PdfInfo) -> io::Result<()> {
    write!(w, "/Info <<\n")?;
    let entries = [
        ("Author", &info.author),
        ("Title", &info.title),
        ("Subject", &info.subject),
        ("Creator", &info.creator),
        ("Producer", &info.producer),
    ];
    let serializer = S::compact();
    for (key, value) in entries {
        if value.is_empty() {
            continue;
        }
        write!(w, "/{} ", key)?;
        serializer.write_object(w, &S::text_string(value))?;
        writeln!(w)?;
    }
    if let Some(date) = &info.creation_date {
        write!(w, "/CreationDate (D:{})\n", pdf_date(date))?;
    }
    write!(w, ">>\n")
}

/// Date in PDF form: `YYYYMMDDHHmmSS+HH'mm'`.
pub fn pdf_date(date: &DateTime<FixedOffset>) -> String {
    let offset = date.offset().local_minus_utc();
    let sign = if offset < 0 { '-' } else { '+' };
    let minutes = offset.abs() / 60;
    format!(
        "{}{}{:02}'{:02}'",
        date.format("%Y%m%d%H%M%S"),
        sign,
        minutes / 60,
        minutes % 60
    )
}
