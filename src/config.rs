//! Configuration for PDF generation.

use chrono::{DateTime, FixedOffset};

use crate::encryption::Protection;

/// Page dimensions in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    /// Width in points
    pub width: f64,
    /// Height in points
    pub height: f64,
}

impl PageSize {
    /// ISO A4 (595 x 842 pt)
    pub const A4: PageSize = PageSize {
        width: 595.0,
        height: 842.0,
    };

    /// US Letter (612 x 792 pt)
    pub const LETTER: PageSize = PageSize {
        width: 612.0,
        height: 792.0,
    };

    /// Custom page size.
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::A4
    }
}

/// Margins of the trim box, measured inward from the media box edges.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrimBox {
    /// Left margin
    pub left: f64,
    /// Top margin
    pub top: f64,
    /// Right margin
    pub right: f64,
    /// Bottom margin
    pub bottom: f64,
}

impl TrimBox {
    /// True when every margin is zero.
    pub fn is_empty(&self) -> bool {
        self.left == 0.0 && self.top == 0.0 && self.right == 0.0 && self.bottom == 0.0
    }
}

/// Per-page overrides.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageOption {
    /// Page size; the document default applies when absent
    pub page_size: Option<PageSize>,
    /// Trim box; the document default applies when absent
    pub trim_box: Option<TrimBox>,
}

/// Stream compression level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompressLevel {
    /// Streams are written uncompressed
    None,
    /// Fastest deflate
    Fast,
    /// zlib default level
    #[default]
    Default,
    /// Smallest output
    Best,
}

impl CompressLevel {
    /// The matching flate2 level, or `None` when compression is disabled.
    pub fn flate_level(self) -> Option<flate2::Compression> {
        match self {
            CompressLevel::None => None,
            CompressLevel::Fast => Some(flate2::Compression::fast()),
            CompressLevel::Default => Some(flate2::Compression::default()),
            CompressLevel::Best => Some(flate2::Compression::best()),
        }
    }
}

/// Document information dictionary entries.
#[derive(Debug, Clone, Default)]
pub struct PdfInfo {
    /// Document title
    pub title: String,
    /// Author
    pub author: String,
    /// Subject
    pub subject: String,
    /// Creating application
    pub creator: String,
    /// Producing library
    pub producer: String,
    /// Creation date; omitted when unset
    pub creation_date: Option<DateTime<FixedOffset>>,
}

/// PDF generation configuration.
#[derive(Debug, Clone)]
pub struct PdfConfig {
    /// Default page size
    pub page_size: PageSize,
    /// Default trim box
    pub trim_box: TrimBox,
    /// Content stream compression
    pub compress: CompressLevel,
    /// Encryption settings; documents are written in the clear when absent
    pub protection: Option<Protection>,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfConfig {
    /// PDF version written in the file header.
    pub const PDF_VERSION: &'static str = "1.7";

    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self {
            page_size: PageSize::A4,
            trim_box: TrimBox::default(),
            compress: CompressLevel::Default,
            protection: None,
        }
    }

    /// Set the default page size.
    pub fn with_page_size(mut self, page_size: PageSize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the default trim box.
    pub fn with_trim_box(mut self, trim_box: TrimBox) -> Self {
        self.trim_box = trim_box;
        self
    }

    /// Set the compression level.
    pub fn with_compress(mut self, compress: CompressLevel) -> Self {
        self.compress = compress;
        self
    }

    /// Enable encryption.
    pub fn with_protection(mut self, protection: Protection) -> Self {
        self.protection = Some(protection);
        self
    }
}
