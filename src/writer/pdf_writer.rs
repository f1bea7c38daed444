//! PDF document engine.
//!
//! [`PdfWriter`] owns the object registry of one document. Construction
//! calls register objects as they go; [`PdfWriter::compile`] links and
//! serializes them into a complete file: header, body, xref table and
//! trailer.
//!
//! Coordinates are PDF user space: origin at the bottom-left, y up.
//!
//! # Example
//!
//! ```
//! use pdf_forge::config::PdfConfig;
//! use pdf_forge::writer::PdfWriter;
//!
//! let mut writer = PdfWriter::new(PdfConfig::default());
//! writer.add_page();
//! writer.line(72.0, 72.0, 300.0, 72.0).unwrap();
//! let bytes = writer.compile().unwrap();
//! assert!(bytes.starts_with(b"%PDF-1.7"));
//! ```

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use bytes::Bytes;
use sha2::{Digest, Sha256};

use super::compiler::{link, serialize};
use super::content_stream::{ContentStreamBuilder, PaintStyle, TextArrayItem};
use super::doc_object::{
    Anchor, Annotation, Catalog, ColorSpace, Content, DocObject, EncryptionDict, Image, ImageSpec,
    LinkTarget, OutlineItem, Outlines, Page, Pages, Resources, WriteContext,
};
use super::font_objects::{
    CidFont, EmbeddedFontFile, Encoding, FontDescriptor, SimpleFont, SimpleFontDef, Type0Font,
    UnicodeMap,
};
use super::graphics_state::{
    GraphicsStateOptions, SoftMaskOptions, Transparency, TransparencyGroupOptions,
};
use super::object_serializer::ObjectSerializer;
use super::registry::ObjectRegistry;
use super::resource_cache::ResourceCache;
use crate::config::{PageOption, PageSize, PdfConfig, PdfInfo, TrimBox};
use crate::encryption::EncryptionWriteHandler;
use crate::error::{Error, Result};
use crate::fonts::{FontOptions, FontStyle, KernOverride, SubsetFont};
use crate::geometry::Rect;

/// A registered font family and style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FontSlot {
    /// Registry index of the [`Type0Font`]
    Subset(usize),
    /// Position in `simple_fonts`; the `Font` object is registered on first use
    Simple(usize),
}

#[derive(Debug, Clone)]
struct SimpleFontEntry {
    def: SimpleFontDef,
    font: Option<usize>,
}

/// PDF document builder.
///
/// One writer builds one document from a single thread of control; the
/// resource caches rely on that.
pub struct PdfWriter {
    config: PdfConfig,
    registry: ObjectRegistry,
    pages_index: usize,
    outlines_index: usize,
    resources_index: usize,
    handler: Option<EncryptionWriteHandler>,
    info: Option<PdfInfo>,

    /// Page indices in order
    pages: Vec<usize>,
    /// First content stream of each page, keyed by page index
    first_contents: HashMap<usize, usize>,
    current_page: Option<usize>,
    current_content: Option<usize>,

    fonts: HashMap<(String, FontStyle), FontSlot>,
    simple_fonts: Vec<SimpleFontEntry>,
    encoding_indices: Vec<usize>,
    count_of_font: usize,
    current_font: Option<FontSlot>,
    font_size: f64,
    char_spacing: f64,

    transparency: Option<Transparency>,
    gstate_cache: ResourceCache,
    transparency_cache: ResourceCache,
    soft_mask_cache: ResourceCache,
    group_cache: ResourceCache,
    image_cache: ResourceCache,

    anchors: HashMap<String, Anchor>,
    last_outline: Option<usize>,
}

impl PdfWriter {
    /// Create a writer and register the document skeleton: catalog, page
    /// tree, outline root, shared resources and, when protected, the
    /// encryption dictionary.
    pub fn new(config: PdfConfig) -> Self {
        let mut registry = ObjectRegistry::new();
        registry.register(DocObject::Catalog(Catalog {
            pages: 1,
            outlines: None,
        }));
        let pages_index = registry.register(DocObject::Pages(Pages {
            media_box: config.page_size,
            kids: Vec::new(),
        }));
        let outlines_index = registry.register(DocObject::Outlines(Outlines::default()));
        let resources_index = registry.register(DocObject::Resources(Resources::default()));

        let handler = config.protection.as_ref().map(|protection| {
            registry.register(DocObject::Encryption(EncryptionDict::from_protection(protection)));
            EncryptionWriteHandler::from_protection(protection)
        });

        log::debug!(
            "New document: {}x{} pt, compression {:?}, protected: {}",
            config.page_size.width,
            config.page_size.height,
            config.compress,
            handler.is_some()
        );

        Self {
            config,
            registry,
            pages_index,
            outlines_index,
            resources_index,
            handler,
            info: None,
            pages: Vec::new(),
            first_contents: HashMap::new(),
            current_page: None,
            current_content: None,
            fonts: HashMap::new(),
            simple_fonts: Vec::new(),
            encoding_indices: Vec::new(),
            count_of_font: 0,
            current_font: None,
            font_size: 0.0,
            char_spacing: 0.0,
            transparency: None,
            gstate_cache: ResourceCache::new("graphics state"),
            transparency_cache: ResourceCache::new("transparency"),
            soft_mask_cache: ResourceCache::new("soft mask"),
            group_cache: ResourceCache::new("transparency group"),
            image_cache: ResourceCache::new("image"),
            anchors: HashMap::new(),
            last_outline: None,
        }
    }

    /// The configuration this writer was created with.
    pub fn config(&self) -> &PdfConfig {
        &self.config
    }

    /// The object registry.
    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    /// Number of pages added so far.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Register an object and return its registry index.
    pub fn add_object(&mut self, obj: DocObject) -> usize {
        self.registry.register(obj)
    }

    // ==================== Pages ====================

    /// Add a page with the document defaults.
    pub fn add_page(&mut self) -> usize {
        self.add_page_with_option(PageOption::default())
    }

    /// Add a page, overriding the default size or trim box.
    pub fn add_page_with_option(&mut self, option: PageOption) -> usize {
        let size = option.page_size.unwrap_or(self.config.page_size);
        let trim = option.trim_box.unwrap_or(self.config.trim_box);
        let index = self.registry.register(DocObject::Page(Page {
            parent: self.pages_index,
            resources: self.resources_index,
            contents: Vec::new(),
            annotations: Vec::new(),
            media_box: option.page_size,
            trim_box: trim_box_rect(size, &trim),
        }));
        self.pages.push(index);
        self.current_page = Some(index);
        self.current_content = None;
        log::debug!("Added page {} as object {}", self.pages.len(), index + 1);
        index
    }

    /// Continue drawing on the `n`-th page (1-based).
    ///
    /// The page must already have content.
    pub fn set_page(&mut self, n: usize) -> Result<()> {
        let page = n
            .checked_sub(1)
            .and_then(|i| self.pages.get(i))
            .copied()
            .ok_or(Error::InvalidPageNumber(n))?;
        let content = self
            .first_contents
            .get(&page)
            .copied()
            .ok_or(Error::InvalidPageNumber(n))?;
        self.current_page = Some(page);
        self.current_content = Some(content);
        Ok(())
    }

    /// Content stream of the current page, created on first use.
    pub fn content(&mut self) -> Result<&mut ContentStreamBuilder> {
        let page = self.current_page.ok_or(Error::NoCurrentPage)?;
        let index = match self.current_content {
            Some(index) => index,
            None => {
                let index = self.registry.register(DocObject::Content(Content {
                    stream: ContentStreamBuilder::new(),
                    compress: self.config.compress,
                }));
                self.first_contents.entry(page).or_insert(index);
                self.current_content = Some(index);
                index
            },
        };
        Ok(&mut self.registry.content_mut(index)?.stream)
    }

    fn current_page(&self) -> Result<usize> {
        self.current_page.ok_or(Error::NoCurrentPage)
    }

    // ==================== Fonts ====================

    /// Register a TrueType font for subset embedding.
    pub fn add_ttf_font(&mut self, family: &str, data: impl Into<Bytes>) -> Result<()> {
        self.add_ttf_font_with_option(family, data, FontOptions::default())
    }

    /// Register a TrueType font with options.
    ///
    /// Registers the ToUnicode map, font file, descriptor, CID font and
    /// Type0 font in that order.
    pub fn add_ttf_font_with_option(
        &mut self,
        family: &str,
        data: impl Into<Bytes>,
        options: FontOptions,
    ) -> Result<()> {
        let subset = SubsetFont::new(family, data, options)?;
        let style = subset.style().without_underline();

        let base = self.registry.len();
        let type0 = base + 4;
        let unicode_map = self.registry.register(DocObject::UnicodeMap(UnicodeMap { subset: type0 }));
        let font_file = self
            .registry
            .register(DocObject::EmbeddedFontFile(EmbeddedFontFile::Subset { subset: type0 }));
        let descriptor = self.registry.register(DocObject::FontDescriptor(FontDescriptor::Subset {
            subset: type0,
            font_file,
        }));
        let cid_font = self.registry.register(DocObject::CidFont(CidFont {
            subset: type0,
            descriptor,
        }));
        let count = self.next_font_count();
        let index = self.registry.register(DocObject::SubsetFont(Type0Font::new(
            subset,
            cid_font,
            unicode_map,
            count,
        )));
        debug_assert_eq!(index, type0);

        self.registry.resources_mut(self.resources_index)?.fonts.push((count, index));
        if self
            .fonts
            .insert((family.to_string(), style), FontSlot::Subset(index))
            .is_some()
        {
            log::warn!("Font '{}' ({:?}) registered again; the new one wins", family, style);
        }
        log::info!("Registered TrueType font '{}' ({:?}) as F{}", family, style, count + 1);
        Ok(())
    }

    /// Register a single-byte TrueType font.
    ///
    /// The encoding, widths, descriptor and font file take four consecutive
    /// registry slots; `link()` finds the widths and descriptor from the
    /// encoding.
    pub fn add_simple_font(&mut self, def: SimpleFontDef) -> Result<()> {
        let encoding = self.registry.register(DocObject::Encoding(Encoding {
            family: def.family.clone(),
            differences: def.differences.clone(),
        }));
        let widths = ObjectSerializer::compact().serialize(&def.widths_object());
        self.registry.register(DocObject::RawImported(Bytes::from(widths)));
        self.registry.register(DocObject::FontDescriptor(FontDescriptor::Simple {
            font_name: def.base_font.clone(),
            metrics: def.metrics,
            font_file: encoding + 3,
        }));
        self.registry.register(DocObject::EmbeddedFontFile(EmbeddedFontFile::Simple {
            data: def.font_file.clone(),
        }));
        self.encoding_indices.push(encoding);

        log::info!("Registered simple font '{}'", def.family);
        self.fonts.insert(
            (def.family.clone(), FontStyle::REGULAR),
            FontSlot::Simple(self.simple_fonts.len()),
        );
        self.simple_fonts.push(SimpleFontEntry { def, font: None });
        Ok(())
    }

    fn next_font_count(&mut self) -> usize {
        let count = self.count_of_font;
        self.count_of_font += 1;
        count
    }

    /// Select the font for subsequent text; the underline bit is ignored.
    pub fn set_font(&mut self, family: &str, style: FontStyle, size: f64) -> Result<()> {
        let slot = self
            .fonts
            .get(&(family.to_string(), style.without_underline()))
            .copied()
            .ok_or_else(|| Error::MissingFontFamily(family.to_string()))?;

        if let FontSlot::Simple(i) = slot {
            if self.simple_fonts[i].font.is_none() {
                let count = self.next_font_count();
                let def = &self.simple_fonts[i].def;
                let index = self.registry.register(DocObject::Font(SimpleFont {
                    family: def.family.clone(),
                    base_font: def.base_font.clone(),
                    count_of_font: count,
                    links: None,
                }));
                self.registry.resources_mut(self.resources_index)?.fonts.push((count, index));
                self.simple_fonts[i].font = Some(index);
            }
        }

        self.current_font = Some(slot);
        self.font_size = size;
        Ok(())
    }

    /// Change the size of the current font.
    pub fn set_font_size(&mut self, size: f64) {
        self.font_size = size;
    }

    /// Extra space added after every character.
    pub fn set_char_spacing(&mut self, spacing: f64) {
        self.char_spacing = spacing;
    }

    /// Rewrite kerning values for every font of a family.
    pub fn kern_override(&mut self, family: &str, kern_override: KernOverride) -> Result<()> {
        let targets: Vec<usize> = self
            .fonts
            .iter()
            .filter_map(|((f, _), slot)| match slot {
                FontSlot::Subset(index) if f == family => Some(*index),
                _ => None,
            })
            .collect();
        if targets.is_empty() {
            return Err(Error::MissingFontFamily(family.to_string()));
        }
        for index in targets {
            self.registry
                .type0_font_mut(index)?
                .font_mut()
                .set_kern_override(kern_override.clone());
        }
        Ok(())
    }

    fn current_font(&self) -> Result<FontSlot> {
        self.current_font.ok_or(Error::NoFontSelected)
    }

    /// Register the characters of `text` with the current font and return
    /// the text as drawn.
    fn register_chars(&mut self, text: &str) -> Result<String> {
        match self.current_font()? {
            FontSlot::Subset(index) => Ok(self.registry.type0_font_mut(index)?.font_mut().add_chars(text)),
            FontSlot::Simple(_) => Ok(text.to_string()),
        }
    }

    /// Width of `text` in points with the current font, size and spacing.
    ///
    /// The characters are registered with the font first.
    pub fn measure_text_width(&mut self, text: &str) -> Result<f64> {
        let text = self.register_chars(text)?;
        match self.current_font()? {
            FontSlot::Subset(index) => self
                .registry
                .type0_font(index)?
                .font()
                .text_width(&text, self.font_size, self.char_spacing),
            FontSlot::Simple(i) => {
                let def = &self.simple_fonts[i].def;
                Ok(win_ansi_bytes(&text)
                    .into_iter()
                    .map(|code| def.code_width(code) as f64 * self.font_size / 1000.0 + self.char_spacing)
                    .sum())
            },
        }
    }

    /// Whether the current font has a real glyph for `ch`.
    ///
    /// Nothing is registered; `.notdef` counts as missing.
    pub fn is_current_font_contain_glyph(&self, ch: char) -> Result<bool> {
        Ok(match self.current_font()? {
            FontSlot::Subset(index) => matches!(
                self.registry.type0_font(index)?.font().char_code_to_glyph_index(ch),
                Ok(glyph) if glyph != 0
            ),
            FontSlot::Simple(_) => (32..=255).contains(&(ch as u32)),
        })
    }

    // ==================== Drawing ====================

    /// Draw text with its baseline starting at `(x, y)`.
    pub fn text(&mut self, x: f64, y: f64, text: &str) -> Result<()> {
        if text.is_empty() {
            return Err(Error::EmptyString);
        }
        let slot = self.current_font()?;
        self.current_page()?;
        let text = self.register_chars(text)?;
        let gstate = self.transparency_gstate()?;
        let (size, spacing) = (self.font_size, self.char_spacing);

        match slot {
            FontSlot::Subset(index) => {
                let font = self.registry.type0_font(index)?;
                let resource = font.resource_name();
                let run = glyph_run(font.font(), &text)?;
                self.with_gstate(gstate, |content| {
                    content.glyph_run(&resource, size, spacing, x, y, run);
                })
            },
            FontSlot::Simple(i) => {
                let count = self
                    .simple_fonts[i]
                    .font
                    .and_then(|index| self.registry.simple_font(index).ok())
                    .map(|font| font.count_of_font)
                    .ok_or(Error::NoFontSelected)?;
                let resource = format!("F{}", count + 1);
                let bytes = win_ansi_bytes(&text);
                self.with_gstate(gstate, |content| {
                    content.text(&resource, size, x, y, bytes);
                })
            },
        }
    }

    /// Draw text inside `rect`, left aligned and vertically centered on the
    /// cap height.
    pub fn cell(&mut self, rect: Rect, text: &str) -> Result<()> {
        let cap_height = match self.current_font()? {
            FontSlot::Subset(index) => {
                self.registry.type0_font(index)?.font().font().metrics().pdf_cap_height() as f64
            },
            FontSlot::Simple(i) => self.simple_fonts[i].def.metrics.cap_height as f64,
        };
        let text_height = cap_height * self.font_size / 1000.0;
        let y = rect.y + (rect.height - text_height) / 2.0;
        self.text(rect.x, y, text)
    }

    /// Stroke a line.
    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) -> Result<()> {
        let gstate = self.transparency_gstate()?;
        self.with_gstate(gstate, |content| {
            content.line(x1, y1, x2, y2);
        })
    }

    /// Paint the rectangle spanned by `(x0, y0)` and `(x1, y1)`.
    pub fn rectangle(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, style: PaintStyle) -> Result<()> {
        let rect = Rect::from_points(x0, y0, x1, y1)?;
        let gstate = self.transparency_gstate()?;
        self.with_gstate(gstate, |content| {
            content.rect(rect.x, rect.y, rect.width, rect.height, style);
        })
    }

    /// Stroke color from 8-bit components.
    pub fn set_stroke_color(&mut self, r: u8, g: u8, b: u8) -> Result<()> {
        self.content()?.set_stroke_color(unit(r), unit(g), unit(b));
        Ok(())
    }

    /// Fill color from 8-bit components.
    pub fn set_fill_color(&mut self, r: u8, g: u8, b: u8) -> Result<()> {
        self.content()?.set_fill_color(unit(r), unit(g), unit(b));
        Ok(())
    }

    /// Line width for strokes.
    pub fn set_line_width(&mut self, width: f64) -> Result<()> {
        self.content()?.set_line_width(width);
        Ok(())
    }

    /// Draw an already encoded image scaled into `rect`.
    ///
    /// Identical image data is embedded once.
    pub fn image(&mut self, spec: &ImageSpec, rect: Rect) -> Result<()> {
        self.current_page()?;
        let index = self.image_object(spec)?;
        let gstate = self.transparency_gstate()?;
        let name = format!("I{}", index + 1);
        self.with_gstate(gstate, |content| {
            content.draw_image(&name, rect.x, rect.y, rect.width, rect.height);
        })
    }

    fn image_object(&mut self, spec: &ImageSpec) -> Result<usize> {
        let key = hex_digest(&spec.data);
        if let Some(index) = self.image_cache.find(&key) {
            return Ok(index);
        }

        let mut image = Image::from_spec(spec);
        if let ColorSpace::Indexed { palette } = &spec.color_space {
            image.palette = Some(self.registry.register(DocObject::DeviceRgb(palette.clone())));
        }
        if let Some(mask) = Image::alpha_mask(spec) {
            image.smask = Some(self.registry.register(DocObject::Image(mask)));
        }
        let index = self.registry.register(DocObject::Image(image));
        self.registry.resources_mut(self.resources_index)?.xobjects.push(index);
        log::debug!("Embedded {}x{} image as object {}", spec.width, spec.height, index + 1);
        Ok(self.image_cache.save(key, index))
    }

    // ==================== Transparency ====================

    /// Apply a uniform transparency to subsequent drawing.
    pub fn set_transparency(&mut self, transparency: Transparency) {
        self.transparency = Some(transparency);
    }

    /// Stop applying transparency.
    pub fn clear_transparency(&mut self) {
        self.transparency = None;
    }

    /// Registry index of the graphics state for the active transparency.
    fn transparency_gstate(&mut self) -> Result<Option<usize>> {
        let Some(transparency) = self.transparency.filter(|t| !t.is_opaque()) else {
            return Ok(None);
        };
        let key = transparency.cache_key();
        if let Some(index) = self.transparency_cache.find(&key) {
            return Ok(Some(index));
        }
        let index = self.ext_gstate(transparency.graphics_state())?;
        Ok(Some(self.transparency_cache.save(key, index)))
    }

    fn with_gstate(&mut self, gstate: Option<usize>, draw: impl FnOnce(&mut ContentStreamBuilder)) -> Result<()> {
        let content = self.content()?;
        match gstate {
            Some(index) => {
                content.save_state().set_ext_gstate(&format!("GS{}", index + 1));
                draw(content);
                content.restore_state();
            },
            None => draw(content),
        }
        Ok(())
    }

    /// Get or create an ExtGState and add it to the page resources.
    pub fn ext_gstate(&mut self, options: GraphicsStateOptions) -> Result<usize> {
        let key = options.cache_key();
        if let Some(index) = self.gstate_cache.find(&key) {
            return Ok(index);
        }
        let index = self.registry.register(DocObject::GraphicsState(options));
        self.registry.resources_mut(self.resources_index)?.ext_gstates.push(index);
        Ok(self.gstate_cache.save(key, index))
    }

    /// Get or create a soft mask dictionary.
    pub fn soft_mask(&mut self, options: SoftMaskOptions) -> usize {
        let key = options.cache_key();
        if let Some(index) = self.soft_mask_cache.find(&key) {
            return index;
        }
        let index = self.registry.register(DocObject::SoftMask(options));
        self.soft_mask_cache.save(key, index)
    }

    /// Get or create a transparency group form XObject.
    pub fn transparency_group(&mut self, options: TransparencyGroupOptions) -> Result<usize> {
        let key = options.cache_key()?;
        if let Some(index) = self.group_cache.find(&key) {
            return Ok(index);
        }
        let index = self.registry.register(DocObject::TransparencyGroup(options));
        Ok(self.group_cache.save(key, index))
    }

    // ==================== Navigation ====================

    /// Add a bookmark to the current page showing the whole page.
    pub fn add_outline(&mut self, title: &str) -> Result<usize> {
        self.push_outline(title, None)
    }

    /// Add a bookmark to a vertical position on the current page.
    pub fn add_outline_with_position(&mut self, title: &str, y: f64) -> Result<usize> {
        self.push_outline(title, Some(y))
    }

    fn push_outline(&mut self, title: &str, y: Option<f64>) -> Result<usize> {
        let page = self.current_page()?;
        let index = self.registry.register(DocObject::Outline(OutlineItem {
            title: title.to_string(),
            parent: self.outlines_index,
            prev: self.last_outline,
            next: None,
            page,
            y,
        }));
        if let Some(prev) = self.last_outline {
            self.registry.outline_mut(prev)?.next = Some(index);
        }
        self.last_outline = Some(index);
        Ok(index)
    }

    /// Link an area of the current page to a URI.
    pub fn add_external_link(&mut self, url: &str, rect: Rect) -> Result<usize> {
        self.add_link(LinkTarget::Uri(url.to_string()), rect)
    }

    /// Link an area of the current page to a named anchor.
    pub fn add_internal_link(&mut self, anchor: &str, rect: Rect) -> Result<usize> {
        self.add_link(LinkTarget::Anchor(anchor.to_string()), rect)
    }

    fn add_link(&mut self, target: LinkTarget, rect: Rect) -> Result<usize> {
        let page = self.current_page()?;
        let index = self.registry.register(DocObject::Annotation(Annotation { rect, target }));
        self.registry.page_mut(page)?.annotations.push(index);
        Ok(index)
    }

    /// Name a vertical position on the current page as a link target.
    pub fn set_anchor(&mut self, name: &str, y: f64) -> Result<()> {
        let page = self.current_page()?;
        self.anchors.insert(name.to_string(), Anchor { page, y });
        Ok(())
    }

    // ==================== Output ====================

    /// Embed a pre-serialized object body verbatim.
    pub fn import_object(&mut self, body: impl Into<Bytes>) -> usize {
        self.registry.register(DocObject::RawImported(body.into()))
    }

    /// Document information written to the trailer.
    pub fn set_info(&mut self, info: PdfInfo) {
        self.info = Some(info);
    }

    /// Link and serialize the document into memory.
    pub fn compile(&mut self) -> Result<Vec<u8>> {
        let linked = link(&mut self.registry, &self.encoding_indices)?;
        log::debug!(
            "Shared resources: {} graphics states, {} transparencies, {} soft masks, {} groups, {} images",
            self.gstate_cache.len(),
            self.transparency_cache.len(),
            self.soft_mask_cache.len(),
            self.group_cache.len(),
            self.image_cache.len()
        );
        let ctx = WriteContext {
            registry: &self.registry,
            anchors: &self.anchors,
            handler: self.handler.as_ref(),
            serializer: ObjectSerializer::compact(),
        };
        serialize(&ctx, self.info.as_ref(), linked.encryption)
    }

    /// Compile and write the document to `w`.
    pub fn write_to<W: Write>(&mut self, w: &mut W) -> Result<()> {
        let bytes = self.compile()?;
        w.write_all(&bytes)?;
        Ok(())
    }

    /// Compile and save the document to a file.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.compile()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

/// Trim box from margins; `None` when no margin is set.
fn trim_box_rect(size: PageSize, trim: &TrimBox) -> Option<[f64; 4]> {
    if trim.is_empty() {
        return None;
    }
    Some([
        trim.left,
        trim.bottom,
        size.width - trim.right,
        size.height - trim.top,
    ])
}

/// Glyph codes for registered text, split where kerning adjusts the gap.
fn glyph_run(font: &SubsetFont, text: &str) -> Result<Vec<TextArrayItem>> {
    let mut run = Vec::new();
    let mut glyphs = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        let glyph = font.glyph_index(ch).ok_or(Error::GlyphNotFound(ch as u32))?;
        glyphs.push(glyph);
        let kern = chars.peek().and_then(|&next| font.kern_pdf_units(ch, next));
        if let Some(kern) = kern.filter(|k| *k != 0.0) {
            run.push(TextArrayItem::Glyphs(std::mem::take(&mut glyphs)));
            run.push(TextArrayItem::Adjustment(-kern));
        }
    }
    if !glyphs.is_empty() {
        run.push(TextArrayItem::Glyphs(glyphs));
    }
    Ok(run)
}

/// Single-byte codes; characters outside Latin-1 become `?`.
fn win_ansi_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| u8::try_from(ch as u32).unwrap_or(b'?'))
        .collect()
}

fn unit(component: u8) -> f64 {
    component as f64 / 255.0
}

fn hex_digest(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompressLevel;
    use crate::fonts::testing::TestFont;
    use crate::writer::graphics_state::BlendMode;

    fn writer() -> PdfWriter {
        PdfWriter::new(PdfConfig::new().with_compress(CompressLevel::None))
    }

    fn text_of(bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).to_string()
    }

    #[test]
    fn test_start_sequence() {
        let writer = writer();
        let names: Vec<&str> = writer.registry().iter().map(DocObject::type_name).collect();
        assert_eq!(names, ["Catalog", "Pages", "Outlines", "Resources"]);
    }

    #[test]
    fn test_content_requires_page() {
        let mut writer = writer();
        assert!(matches!(writer.line(0.0, 0.0, 1.0, 1.0), Err(Error::NoCurrentPage)));
    }

    #[test]
    fn test_content_follows_its_page() {
        let mut writer = writer();
        let first = writer.add_page();
        writer.line(0.0, 0.0, 10.0, 10.0).unwrap();
        let second = writer.add_page();
        writer.line(0.0, 0.0, 20.0, 20.0).unwrap();
        writer.compile().unwrap();

        assert_eq!(writer.registry().page(first).unwrap().contents, vec![first + 1]);
        assert_eq!(writer.registry().page(second).unwrap().contents, vec![second + 1]);
    }

    #[test]
    fn test_set_page_returns_to_first_content() {
        let mut writer = writer();
        writer.add_page();
        writer.line(0.0, 0.0, 1.0, 1.0).unwrap();
        writer.add_page();
        assert!(matches!(writer.set_page(2), Err(Error::InvalidPageNumber(2))));
        assert!(matches!(writer.set_page(0), Err(Error::InvalidPageNumber(0))));

        writer.set_page(1).unwrap();
        writer.line(5.0, 5.0, 6.0, 6.0).unwrap();
        let out = text_of(&writer.compile().unwrap());
        assert!(out.contains("0 0 m\n1 1 l\nS\n5 5 m\n6 6 l\nS\n"));
    }

    #[test]
    fn test_rectangle_rejects_inverted_corners() {
        let mut writer = writer();
        writer.add_page();
        assert!(matches!(
            writer.rectangle(10.0, 10.0, 5.0, 20.0, PaintStyle::Fill),
            Err(Error::InvalidRectangleCoordinates)
        ));
        writer.rectangle(10.0, 10.0, 50.0, 20.0, PaintStyle::Fill).unwrap();
        assert!(text_of(&writer.compile().unwrap()).contains("10 10 40 10 re\nf\n"));
    }

    #[test]
    fn test_text_errors() {
        let mut writer = writer();
        writer.add_page();
        assert!(matches!(writer.text(0.0, 0.0, "x"), Err(Error::NoFontSelected)));
        assert!(matches!(writer.text(0.0, 0.0, ""), Err(Error::EmptyString)));
        assert!(matches!(
            writer.set_font("Nope", FontStyle::REGULAR, 12.0),
            Err(Error::MissingFontFamily(_))
        ));
    }

    #[test]
    fn test_ttf_font_registration_order() {
        let mut writer = writer();
        writer.add_ttf_font("Test Sans", TestFont::latin().build()).unwrap();
        let names: Vec<&str> = writer.registry().iter().skip(4).map(DocObject::type_name).collect();
        assert_eq!(
            names,
            ["UnicodeMap", "EmbeddedFontFile", "FontDescriptor", "CIDFont", "SubsetFont"]
        );
        assert_eq!(writer.registry().resources(3).unwrap().fonts, vec![(0, 8)]);
    }

    #[test]
    fn test_underline_ignored_when_selecting_font() {
        let mut writer = writer();
        writer.add_ttf_font("Test Sans", TestFont::latin().build()).unwrap();
        writer
            .set_font("Test Sans", FontStyle::UNDERLINE, 12.0)
            .unwrap();
        assert!(writer.set_font("Test Sans", FontStyle::BOLD, 12.0).is_err());
    }

    #[test]
    fn test_measure_registers_chars() {
        let mut writer = writer();
        writer.add_ttf_font("Test Sans", TestFont::latin().build()).unwrap();
        writer.set_font("Test Sans", FontStyle::REGULAR, 10.0).unwrap();
        let width = writer.measure_text_width("AB").unwrap();
        assert!(width > 0.0);

        let font = writer.registry().type0_font(8).unwrap().font();
        assert!(font.glyph_index('A').is_some());
        assert!(font.glyph_index('B').is_some());
        assert!(writer.is_current_font_contain_glyph('A').unwrap());
        assert!(!writer.is_current_font_contain_glyph('\u{4E00}').unwrap());
    }

    #[test]
    fn test_transparency_shares_one_gstate() {
        let mut writer = writer();
        writer.add_page();
        writer.set_transparency(Transparency::new(0.5, BlendMode::Multiply).unwrap());
        writer.line(0.0, 0.0, 1.0, 1.0).unwrap();
        writer.line(2.0, 2.0, 3.0, 3.0).unwrap();
        writer.clear_transparency();
        writer.line(4.0, 4.0, 5.0, 5.0).unwrap();

        let gstates = writer
            .registry()
            .iter()
            .filter(|o| o.type_name() == "GraphicsState")
            .count();
        assert_eq!(gstates, 1);

        let out = text_of(&writer.compile().unwrap());
        assert_eq!(out.matches(" gs\n").count(), 2);
        assert!(out.contains("4 4 m\n5 5 l\nS\n"));
    }

    #[test]
    fn test_opaque_transparency_adds_nothing() {
        let mut writer = writer();
        writer.add_page();
        writer.set_transparency(Transparency::new(1.0, BlendMode::Normal).unwrap());
        writer.line(0.0, 0.0, 1.0, 1.0).unwrap();
        assert!(writer.registry().iter().all(|o| o.type_name() != "GraphicsState"));
    }

    #[test]
    fn test_images_deduplicated_by_data() {
        let mut writer = writer();
        writer.add_page();
        let spec = ImageSpec {
            width: 1,
            height: 1,
            color_space: ColorSpace::DeviceRgb,
            bits_per_component: 8,
            filter: None,
            decode_parms: vec![],
            data: Bytes::from_static(&[255, 0, 0]),
            alpha: None,
        };
        writer.image(&spec, Rect::new(0.0, 0.0, 10.0, 10.0)).unwrap();
        writer.image(&spec, Rect::new(20.0, 0.0, 10.0, 10.0)).unwrap();
        let images = writer.registry().iter().filter(|o| o.type_name() == "Image").count();
        assert_eq!(images, 1);
    }

    #[test]
    fn test_outlines_chain_and_catalog() {
        let mut writer = writer();
        writer.add_page();
        let first = writer.add_outline("One").unwrap();
        let second = writer.add_outline_with_position("Two", 400.0).unwrap();
        let out = text_of(&writer.compile().unwrap());

        assert_eq!(writer.registry().outline(first).unwrap().next, Some(second));
        assert_eq!(writer.registry().outline(second).unwrap().prev, Some(first));
        assert!(out.contains("/Outlines 3 0 R /PageMode /UseOutlines"));
        assert!(out.contains("/Count 2"));
        assert!(out.contains("/XYZ 0 400 null"));
    }

    #[test]
    fn test_internal_link_resolves_anchor() {
        let mut writer = writer();
        let page = writer.add_page();
        writer.set_anchor("top", 800.0).unwrap();
        writer.add_page();
        writer
            .add_internal_link("top", Rect::new(10.0, 10.0, 100.0, 20.0))
            .unwrap();
        let out = text_of(&writer.compile().unwrap());
        assert!(out.contains(&format!("/Dest [{} 0 R /XYZ 0 800 null]", page + 1)));
        assert!(out.contains("/Annots ["));
    }

    #[test]
    fn test_page_option_overrides() {
        let mut writer = PdfWriter::new(PdfConfig::new().with_trim_box(TrimBox {
            left: 10.0,
            top: 20.0,
            right: 30.0,
            bottom: 40.0,
        }));
        writer.add_page_with_option(PageOption {
            page_size: Some(PageSize::LETTER),
            trim_box: None,
        });
        let out = text_of(&writer.compile().unwrap());
        assert!(out.contains("/MediaBox [0 0 612 792]"));
        assert!(out.contains("/TrimBox [10 40 582 772]"));
    }

    #[test]
    fn test_import_object_verbatim() {
        let mut writer = writer();
        let index = writer.import_object(&b"<< /Custom true >>"[..]);
        let out = text_of(&writer.compile().unwrap());
        assert!(out.contains(&format!("{} 0 obj\n<< /Custom true >>\nendobj\n", index + 1)));
    }
}
