//! Document objects.
//!
//! [`DocObject`] is the closed set of objects a document is built from. Each
//! variant is created once, may be updated while the document is built or
//! during `link()`, and is written exactly once by the compiler through
//! [`DocObject::write`].
//!
//! Cross-references are registry indices; the object number of index `i` is
//! `i + 1`.

use std::collections::HashMap;
use std::io::Write;

use bytes::Bytes;
use flate2::write::ZlibEncoder;

use super::content_stream::ContentStreamBuilder;
use super::font_objects::{
    CidFont, EmbeddedFontFile, Encoding, FontDescriptor, SimpleFont, Type0Font, UnicodeMap,
};
use super::graphics_state::{GraphicsStateOptions, SoftMaskOptions, TransparencyGroupOptions};
use super::object_serializer::ObjectSerializer as S;
use super::registry::ObjectRegistry;
use crate::config::{CompressLevel, PageSize};
use crate::encryption::{EncryptionWriteHandler, Protection};
use crate::error::Result;
use crate::geometry::Rect;
use crate::object::Object;

/// Everything an object may need while it is written.
pub struct WriteContext<'a> {
    /// All objects of the document
    pub registry: &'a ObjectRegistry,
    /// Named link destinations
    pub anchors: &'a HashMap<String, Anchor>,
    /// Encrypts strings and streams when the document is protected
    pub handler: Option<&'a EncryptionWriteHandler>,
    /// Value serializer
    pub serializer: S,
}

/// A named position that internal links point to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    /// Registry index of the page
    pub page: usize,
    /// Vertical position on the page
    pub y: f64,
}

/// The document catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    /// Registry index of the page tree root
    pub pages: usize,
    /// Registry index of the outline root, set by `link()` when there are
    /// outline items
    pub outlines: Option<usize>,
}

impl Catalog {
    fn to_object(&self) -> Object {
        let mut entries = vec![("Type", S::name("Catalog")), ("Pages", S::reference(self.pages))];
        if let Some(outlines) = self.outlines {
            entries.push(("Outlines", S::reference(outlines)));
            entries.push(("PageMode", S::name("UseOutlines")));
        }
        S::dict(entries)
    }
}

/// The page tree root.
#[derive(Debug, Clone)]
pub struct Pages {
    /// Default media box
    pub media_box: PageSize,
    /// Page indices, filled by `link()`
    pub kids: Vec<usize>,
}

impl Pages {
    fn to_object(&self) -> Object {
        S::dict(vec![
            ("Type", S::name("Pages")),
            ("MediaBox", S::rect(0.0, 0.0, self.media_box.width, self.media_box.height)),
            ("Count", Object::Integer(self.kids.len() as i64)),
            ("Kids", S::array(self.kids.iter().map(|&k| S::reference(k)).collect())),
        ])
    }
}

/// A page.
#[derive(Debug, Clone)]
pub struct Page {
    /// Registry index of the page tree root
    pub parent: usize,
    /// Registry index of the shared resource dictionary
    pub resources: usize,
    /// Content stream indices, filled by `link()`
    pub contents: Vec<usize>,
    /// Link annotation indices
    pub annotations: Vec<usize>,
    /// Media box when it differs from the document default
    pub media_box: Option<PageSize>,
    /// Trim box `[llx lly urx ury]`
    pub trim_box: Option<[f64; 4]>,
}

impl Page {
    fn to_object(&self) -> Object {
        let mut entries = vec![
            ("Type", S::name("Page")),
            ("Parent", S::reference(self.parent)),
            ("Resources", S::reference(self.resources)),
            ("Contents", S::array(self.contents.iter().map(|&c| S::reference(c)).collect())),
        ];
        if !self.annotations.is_empty() {
            entries.push((
                "Annots",
                S::array(self.annotations.iter().map(|&a| S::reference(a)).collect()),
            ));
        }
        if let Some(size) = self.media_box {
            entries.push(("MediaBox", S::rect(0.0, 0.0, size.width, size.height)));
        }
        if let Some([llx, lly, urx, ury]) = self.trim_box {
            entries.push(("TrimBox", S::rect(llx, lly, urx, ury)));
        }
        S::dict(entries)
    }
}

/// A page content stream.
#[derive(Debug, Clone, Default)]
pub struct Content {
    /// Recorded operators
    pub stream: ContentStreamBuilder,
    /// Compression applied when written
    pub compress: CompressLevel,
}

impl Content {
    fn to_object(&self) -> Result<Object> {
        let data = self.stream.build()?;
        match self.compress.flate_level() {
            Some(level) => {
                let mut encoder = ZlibEncoder::new(Vec::new(), level);
                encoder.write_all(&data)?;
                Ok(S::stream(vec![("Filter", S::name("FlateDecode"))], encoder.finish()?))
            },
            None => Ok(S::stream(vec![], data)),
        }
    }
}

/// The resource dictionary shared by every page.
#[derive(Debug, Clone, Default)]
pub struct Resources {
    /// `(count_of_font, registry index)` per font; named `F<count+1>`
    pub fonts: Vec<(usize, usize)>,
    /// Image indices; named `I<id>`
    pub xobjects: Vec<usize>,
    /// Graphics state indices; named `GS<id>`
    pub ext_gstates: Vec<usize>,
}

impl Resources {
    fn to_object(&self) -> Object {
        let fonts = self
            .fonts
            .iter()
            .map(|&(count, index)| (format!("F{}", count + 1), S::reference(index)))
            .collect();
        let xobjects = self
            .xobjects
            .iter()
            .map(|&index| (format!("I{}", index + 1), S::reference(index)))
            .collect();
        let ext_gstates = self
            .ext_gstates
            .iter()
            .map(|&index| (format!("GS{}", index + 1), S::reference(index)))
            .collect();

        S::dict(vec![
            (
                "ProcSet",
                S::array(
                    ["PDF", "Text", "ImageB", "ImageC", "ImageI"]
                        .into_iter()
                        .map(S::name)
                        .collect(),
                ),
            ),
            ("Font", Object::Dictionary(fonts)),
            ("XObject", Object::Dictionary(xobjects)),
            ("ExtGState", Object::Dictionary(ext_gstates)),
        ])
    }
}

/// Color space of an image.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorSpace {
    /// One gray component
    DeviceGray,
    /// Three RGB components
    DeviceRgb,
    /// Four CMYK components
    DeviceCmyk,
    /// Palette of RGB triples indexed by one component
    Indexed {
        /// Packed RGB palette
        palette: Bytes,
    },
}

/// An encoded image ready for embedding; no decoding is performed.
#[derive(Debug, Clone)]
pub struct ImageSpec {
    /// Width in samples
    pub width: u32,
    /// Height in samples
    pub height: u32,
    /// Color space
    pub color_space: ColorSpace,
    /// Bits per component
    pub bits_per_component: u8,
    /// Filter the data is encoded with, e.g. `DCTDecode`
    pub filter: Option<String>,
    /// Integer decode parameters, e.g. `Predictor`, `Columns`
    pub decode_parms: Vec<(String, i64)>,
    /// Encoded samples
    pub data: Bytes,
    /// 8-bit alpha channel, encoded like `data`
    pub alpha: Option<Bytes>,
}

/// Image XObject.
#[derive(Debug, Clone)]
pub struct Image {
    /// Width in samples
    pub width: u32,
    /// Height in samples
    pub height: u32,
    /// Color space; indexed images reference their palette object
    pub color_space: ColorSpace,
    /// Bits per component
    pub bits_per_component: u8,
    /// Stream filter
    pub filter: Option<String>,
    /// Decode parameters
    pub decode_parms: Vec<(String, i64)>,
    /// Encoded samples
    pub data: Bytes,
    /// Registry index of the palette object for indexed images
    pub palette: Option<usize>,
    /// Registry index of the alpha mask image
    pub smask: Option<usize>,
}

impl Image {
    /// Image object for the color samples of a spec.
    pub fn from_spec(spec: &ImageSpec) -> Self {
        Self {
            width: spec.width,
            height: spec.height,
            color_space: spec.color_space.clone(),
            bits_per_component: spec.bits_per_component,
            filter: spec.filter.clone(),
            decode_parms: spec.decode_parms.clone(),
            data: spec.data.clone(),
            palette: None,
            smask: None,
        }
    }

    /// Grayscale mask image for the alpha channel of a spec.
    pub fn alpha_mask(spec: &ImageSpec) -> Option<Self> {
        let alpha = spec.alpha.clone()?;
        let decode_parms = if spec.decode_parms.is_empty() {
            Vec::new()
        } else {
            vec![
                ("Predictor".to_string(), 15),
                ("Colors".to_string(), 1),
                ("BitsPerComponent".to_string(), 8),
                ("Columns".to_string(), spec.width as i64),
            ]
        };
        Some(Self {
            width: spec.width,
            height: spec.height,
            color_space: ColorSpace::DeviceGray,
            bits_per_component: 8,
            filter: spec.filter.clone(),
            decode_parms,
            data: alpha,
            palette: None,
            smask: None,
        })
    }

    fn color_space_object(&self) -> Object {
        match &self.color_space {
            ColorSpace::DeviceGray => S::name("DeviceGray"),
            ColorSpace::DeviceRgb => S::name("DeviceRGB"),
            ColorSpace::DeviceCmyk => S::name("DeviceCMYK"),
            ColorSpace::Indexed { palette } => {
                let hival = (palette.len() / 3).saturating_sub(1) as i64;
                let lookup = match self.palette {
                    Some(index) => S::reference(index),
                    None => Object::String(palette.to_vec()),
                };
                S::array(vec![
                    S::name("Indexed"),
                    S::name("DeviceRGB"),
                    Object::Integer(hival),
                    lookup,
                ])
            },
        }
    }

    fn to_object(&self) -> Object {
        let mut entries = vec![
            ("Type", S::name("XObject")),
            ("Subtype", S::name("Image")),
            ("Width", Object::Integer(self.width as i64)),
            ("Height", Object::Integer(self.height as i64)),
            ("ColorSpace", self.color_space_object()),
            ("BitsPerComponent", Object::Integer(self.bits_per_component as i64)),
        ];
        if let Some(filter) = &self.filter {
            entries.push(("Filter", S::name(filter)));
        }
        if !self.decode_parms.is_empty() {
            let parms = self
                .decode_parms
                .iter()
                .map(|(k, v)| (k.clone(), Object::Integer(*v)))
                .collect();
            entries.push(("DecodeParms", Object::Dictionary(parms)));
        }
        if let Some(smask) = self.smask {
            entries.push(("SMask", S::reference(smask)));
        }
        S::stream(entries, self.data.clone())
    }
}

/// Where a link annotation points.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkTarget {
    /// External URI
    Uri(String),
    /// Named anchor inside the document
    Anchor(String),
}

/// Link annotation.
#[derive(Debug, Clone)]
pub struct Annotation {
    /// Active area
    pub rect: Rect,
    /// Destination
    pub target: LinkTarget,
}

impl Annotation {
    fn to_object(&self, anchors: &HashMap<String, Anchor>) -> Object {
        let [llx, lly, urx, ury] = self.rect.corners();
        let mut entries = vec![
            ("Type", S::name("Annot")),
            ("Subtype", S::name("Link")),
            ("Rect", S::rect(llx, lly, urx, ury)),
            (
                "Border",
                S::array(vec![Object::Integer(0), Object::Integer(0), Object::Integer(0)]),
            ),
        ];
        match &self.target {
            LinkTarget::Uri(uri) => entries.push((
                "A",
                S::dict(vec![("S", S::name("URI")), ("URI", S::string(uri))]),
            )),
            LinkTarget::Anchor(name) => match anchors.get(name) {
                Some(anchor) => entries.push((
                    "Dest",
                    S::array(vec![
                        S::reference(anchor.page),
                        S::name("XYZ"),
                        Object::Integer(0),
                        S::real(anchor.y),
                        Object::Null,
                    ]),
                )),
                None => log::warn!("Link to unknown anchor '{}' has no destination", name),
            },
        }
        S::dict(entries)
    }
}

/// Outline root.
#[derive(Debug, Clone, Default)]
pub struct Outlines {
    /// First item
    pub first: Option<usize>,
    /// Last item
    pub last: Option<usize>,
    /// Number of items
    pub count: usize,
}

impl Outlines {
    fn to_object(&self) -> Object {
        let mut entries = vec![
            ("Type", S::name("Outlines")),
            ("Count", Object::Integer(self.count as i64)),
        ];
        if let Some(first) = self.first {
            entries.push(("First", S::reference(first)));
        }
        if let Some(last) = self.last {
            entries.push(("Last", S::reference(last)));
        }
        S::dict(entries)
    }
}

/// Outline (bookmark) item.
#[derive(Debug, Clone)]
pub struct OutlineItem {
    /// Title shown in the viewer
    pub title: String,
    /// Registry index of the outline root
    pub parent: usize,
    /// Previous sibling
    pub prev: Option<usize>,
    /// Next sibling
    pub next: Option<usize>,
    /// Registry index of the target page
    pub page: usize,
    /// Vertical position on the page; the whole page is shown when absent
    pub y: Option<f64>,
}

impl OutlineItem {
    fn to_object(&self) -> Object {
        let dest = match self.y {
            Some(y) => S::array(vec![
                S::reference(self.page),
                S::name("XYZ"),
                Object::Integer(0),
                S::real(y),
                Object::Null,
            ]),
            None => S::array(vec![S::reference(self.page), S::name("Fit")]),
        };
        let mut entries = vec![
            ("Title", S::text_string(&self.title)),
            ("Parent", S::reference(self.parent)),
            ("Dest", dest),
        ];
        if let Some(prev) = self.prev {
            entries.push(("Prev", S::reference(prev)));
        }
        if let Some(next) = self.next {
            entries.push(("Next", S::reference(next)));
        }
        S::dict(entries)
    }
}

/// Standard security handler dictionary (revision 2).
#[derive(Debug, Clone)]
pub struct EncryptionDict {
    /// `/O`
    pub owner_entry: Vec<u8>,
    /// `/U`
    pub user_entry: Vec<u8>,
    /// `/P`
    pub permissions: i32,
}

impl EncryptionDict {
    /// Dictionary values of a protection setup.
    pub fn from_protection(protection: &Protection) -> Self {
        Self {
            owner_entry: protection.owner_entry.clone(),
            user_entry: protection.user_entry.clone(),
            permissions: protection.permissions.p_value(),
        }
    }

    fn to_object(&self) -> Object {
        S::dict(vec![
            ("Filter", S::name("Standard")),
            ("V", Object::Integer(1)),
            ("R", Object::Integer(2)),
            ("O", Object::String(self.owner_entry.clone())),
            ("U", Object::String(self.user_entry.clone())),
            ("P", Object::Integer(self.permissions as i64)),
        ])
    }
}

/// Every kind of object a document holds.
#[derive(Debug, Clone)]
pub enum DocObject {
    /// Document catalog
    Catalog(Catalog),
    /// Page tree root
    Pages(Pages),
    /// Page
    Page(Page),
    /// Page content stream
    Content(Content),
    /// Shared resource dictionary
    Resources(Resources),
    /// Single-byte TrueType font
    Font(SimpleFont),
    /// Type0 font owning a subset
    SubsetFont(Type0Font),
    /// Descendant CID font
    CidFont(CidFont),
    /// Simple font encoding
    Encoding(Encoding),
    /// ToUnicode CMap
    UnicodeMap(UnicodeMap),
    /// Embedded font program
    EmbeddedFontFile(EmbeddedFontFile),
    /// Font descriptor
    FontDescriptor(FontDescriptor),
    /// Image XObject
    Image(Image),
    /// Palette stream of an indexed image
    DeviceRgb(Bytes),
    /// Soft mask dictionary
    SoftMask(SoftMaskOptions),
    /// ExtGState dictionary
    GraphicsState(GraphicsStateOptions),
    /// Transparency group form XObject
    TransparencyGroup(TransparencyGroupOptions),
    /// Link annotation
    Annotation(Annotation),
    /// Outline root
    Outlines(Outlines),
    /// Outline item
    Outline(OutlineItem),
    /// Encryption dictionary
    Encryption(EncryptionDict),
    /// Pre-serialized object body written verbatim
    RawImported(Bytes),
}

impl DocObject {
    /// Variant name used in logs and type errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            DocObject::Catalog(_) => "Catalog",
            DocObject::Pages(_) => "Pages",
            DocObject::Page(_) => "Page",
            DocObject::Content(_) => "Content",
            DocObject::Resources(_) => "Resources",
            DocObject::Font(_) => "Font",
            DocObject::SubsetFont(_) => "SubsetFont",
            DocObject::CidFont(_) => "CIDFont",
            DocObject::Encoding(_) => "Encoding",
            DocObject::UnicodeMap(_) => "UnicodeMap",
            DocObject::EmbeddedFontFile(_) => "EmbeddedFontFile",
            DocObject::FontDescriptor(_) => "FontDescriptor",
            DocObject::Image(_) => "Image",
            DocObject::DeviceRgb(_) => "DeviceRGB",
            DocObject::SoftMask(_) => "SoftMask",
            DocObject::GraphicsState(_) => "GraphicsState",
            DocObject::TransparencyGroup(_) => "TransparencyGroup",
            DocObject::Annotation(_) => "Annotation",
            DocObject::Outlines(_) => "Outlines",
            DocObject::Outline(_) => "Outline",
            DocObject::Encryption(_) => "Encryption",
            DocObject::RawImported(_) => "RawImported",
        }
    }

    /// Build the object value; `None` for imported bodies, which are
    /// written verbatim.
    pub fn to_object(&self, ctx: &WriteContext<'_>) -> Result<Option<Object>> {
        Ok(Some(match self {
            DocObject::Catalog(o) => o.to_object(),
            DocObject::Pages(o) => o.to_object(),
            DocObject::Page(o) => o.to_object(),
            DocObject::Content(o) => o.to_object()?,
            DocObject::Resources(o) => o.to_object(),
            DocObject::Font(o) => o.to_object(),
            DocObject::SubsetFont(o) => o.to_object(),
            DocObject::CidFont(o) => o.to_object(ctx.registry)?,
            DocObject::Encoding(o) => o.to_object(),
            DocObject::UnicodeMap(o) => o.to_object(ctx.registry)?,
            DocObject::EmbeddedFontFile(o) => o.to_object(ctx.registry)?,
            DocObject::FontDescriptor(o) => o.to_object(ctx.registry)?,
            DocObject::Image(o) => o.to_object(),
            DocObject::DeviceRgb(palette) => S::stream(vec![], palette.clone()),
            DocObject::SoftMask(o) => o.to_object(),
            DocObject::GraphicsState(o) => o.to_object(),
            DocObject::TransparencyGroup(o) => o.to_object()?,
            DocObject::Annotation(o) => o.to_object(ctx.anchors),
            DocObject::Outlines(o) => o.to_object(),
            DocObject::Outline(o) => o.to_object(),
            DocObject::Encryption(o) => o.to_object(),
            DocObject::RawImported(_) => return Ok(None),
        }))
    }

    /// Write the object body as object number `id`.
    ///
    /// Strings and streams are encrypted when the context carries a handler,
    /// except in the encryption dictionary itself.
    pub fn write<W: Write>(&self, ctx: &WriteContext<'_>, w: &mut W, id: u32) -> Result<()> {
        match (self, self.to_object(ctx)?) {
            (_, Some(obj)) => {
                let handler = match self {
                    DocObject::Encryption(_) => None,
                    _ => ctx.handler,
                };
                ctx.serializer.write_object_with(w, &obj, id, handler)?;
            },
            (DocObject::RawImported(data), None) => w.write_all(data)?,
            (_, None) => {},
        }
        writeln!(w)?;
        Ok(())
    }
}
