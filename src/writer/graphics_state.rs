//! Extended graphics state, soft mask and transparency group resources.
//!
//! Each option set has a canonical cache key built from the fields that are
//! present, in a fixed order, with fixed numeric precision. Two requests
//! that produce the same key share one object in the output.
//!
//! # Example
//!
//! ```
//! use pdf_forge::writer::{BlendMode, GraphicsStateOptions};
//!
//! let opts = GraphicsStateOptions::new()
//!     .stroking_alpha(0.5)
//!     .blend_mode(BlendMode::Multiply);
//! assert_eq!(opts.cache_key(), "CA_0.500;BM_/Multiply;");
//! ```

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use super::content_stream::ContentStreamBuilder;
use super::object_serializer::ObjectSerializer;
use crate::error::{Error, Result};
use crate::geometry::Rect;
use crate::object::Object;

/// Helper to create a string key for dictionary
fn key(s: &str) -> String {
    s.to_string()
}

/// Blend modes for transparency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Normal blend (default)
    #[default]
    Normal,
    /// Multiply
    Multiply,
    /// Screen
    Screen,
    /// Overlay
    Overlay,
    /// Darken
    Darken,
    /// Lighten
    Lighten,
    /// Color dodge
    ColorDodge,
    /// Color burn
    ColorBurn,
    /// Hard light
    HardLight,
    /// Soft light
    SoftLight,
    /// Difference
    Difference,
    /// Exclusion
    Exclusion,
    /// Hue
    Hue,
    /// Saturation
    Saturation,
    /// Color
    Color,
    /// Luminosity
    Luminosity,
}

impl BlendMode {
    const ALL: [BlendMode; 16] = [
        BlendMode::Normal,
        BlendMode::Multiply,
        BlendMode::Screen,
        BlendMode::Overlay,
        BlendMode::Darken,
        BlendMode::Lighten,
        BlendMode::ColorDodge,
        BlendMode::ColorBurn,
        BlendMode::HardLight,
        BlendMode::SoftLight,
        BlendMode::Difference,
        BlendMode::Exclusion,
        BlendMode::Hue,
        BlendMode::Saturation,
        BlendMode::Color,
        BlendMode::Luminosity,
    ];

    /// Get the PDF name for this blend mode.
    pub fn as_pdf_name(&self) -> &'static str {
        match self {
            BlendMode::Normal => "Normal",
            BlendMode::Multiply => "Multiply",
            BlendMode::Screen => "Screen",
            BlendMode::Overlay => "Overlay",
            BlendMode::Darken => "Darken",
            BlendMode::Lighten => "Lighten",
            BlendMode::ColorDodge => "ColorDodge",
            BlendMode::ColorBurn => "ColorBurn",
            BlendMode::HardLight => "HardLight",
            BlendMode::SoftLight => "SoftLight",
            BlendMode::Difference => "Difference",
            BlendMode::Exclusion => "Exclusion",
            BlendMode::Hue => "Hue",
            BlendMode::Saturation => "Saturation",
            BlendMode::Color => "Color",
            BlendMode::Luminosity => "Luminosity",
        }
    }

    /// Parse a blend mode name, with or without the leading `/`,
    /// ignoring ASCII case. An empty name is `Normal`.
    pub fn from_pdf_name(name: &str) -> Option<Self> {
        let name = name.strip_prefix('/').unwrap_or(name);
        if name.is_empty() {
            return Some(BlendMode::Normal);
        }
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_pdf_name().eq_ignore_ascii_case(name))
    }
}

/// Options of an ExtGState dictionary.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GraphicsStateOptions {
    /// Stroking alpha (`CA`)
    pub stroking_alpha: Option<f64>,
    /// Non-stroking alpha (`ca`)
    pub non_stroking_alpha: Option<f64>,
    /// Blend mode (`BM`)
    pub blend_mode: Option<BlendMode>,
    /// Registry index of a soft mask (`SMask`)
    pub soft_mask: Option<usize>,
}

impl GraphicsStateOptions {
    /// Empty option set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the stroking alpha.
    pub fn stroking_alpha(mut self, alpha: f64) -> Self {
        self.stroking_alpha = Some(alpha);
        self
    }

    /// Set the non-stroking alpha.
    pub fn non_stroking_alpha(mut self, alpha: f64) -> Self {
        self.non_stroking_alpha = Some(alpha);
        self
    }

    /// Set the blend mode.
    pub fn blend_mode(mut self, mode: BlendMode) -> Self {
        self.blend_mode = Some(mode);
        self
    }

    /// Reference a soft mask by registry index.
    pub fn soft_mask(mut self, index: usize) -> Self {
        self.soft_mask = Some(index);
        self
    }

    /// Canonical cache key, e.g. `CA_0.500;ca_0.500;BM_/Multiply;`.
    pub fn cache_key(&self) -> String {
        let mut id = String::new();
        if let Some(ca) = self.stroking_alpha {
            id.push_str(&format!("CA_{:.3};", ca));
        }
        if let Some(ca) = self.non_stroking_alpha {
            id.push_str(&format!("ca_{:.3};", ca));
        }
        if let Some(bm) = self.blend_mode {
            id.push_str(&format!("BM_/{};", bm.as_pdf_name()));
        }
        if let Some(index) = self.soft_mask {
            id.push_str(&format!("SMask_{}_0_R;", index + 1));
        }
        id
    }

    /// Build the ExtGState dictionary.
    pub fn to_object(&self) -> Object {
        let mut dict: HashMap<String, Object> = HashMap::new();
        dict.insert(key("Type"), Object::Name("ExtGState".to_string()));

        if let Some(alpha) = self.non_stroking_alpha {
            dict.insert(key("ca"), Object::Real(alpha));
        }
        if let Some(alpha) = self.stroking_alpha {
            dict.insert(key("CA"), Object::Real(alpha));
        }
        if let Some(mode) = self.blend_mode {
            dict.insert(key("BM"), Object::Name(mode.as_pdf_name().to_string()));
        }
        if let Some(index) = self.soft_mask {
            dict.insert(key("SMask"), ObjectSerializer::reference(index));
        }

        Object::Dictionary(dict)
    }
}

/// Uniform transparency applied to subsequent drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transparency {
    alpha: f64,
    blend_mode: BlendMode,
}

impl Transparency {
    /// Validate and create a transparency; `alpha` must be within `0.0..=1.0`.
    pub fn new(alpha: f64, blend_mode: BlendMode) -> Result<Self> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(Error::InvalidAlpha(alpha));
        }
        Ok(Self { alpha, blend_mode })
    }

    /// Alpha for stroking and non-stroking operations.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Blend mode.
    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    /// Whether drawing needs a graphics state at all.
    pub fn is_opaque(&self) -> bool {
        self.alpha == 1.0
    }

    /// Cache key, e.g. `0.500_/Multiply`.
    pub fn cache_key(&self) -> String {
        format!("{:.3}_/{}", self.alpha, self.blend_mode.as_pdf_name())
    }

    /// Graphics state options that realize this transparency.
    pub fn graphics_state(&self) -> GraphicsStateOptions {
        GraphicsStateOptions::new()
            .stroking_alpha(self.alpha)
            .non_stroking_alpha(self.alpha)
            .blend_mode(self.blend_mode)
    }
}

/// Soft mask subtype.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SoftMaskSubtype {
    /// Use alpha values from the group
    #[default]
    Alpha,
    /// Use luminosity values from the group
    Luminosity,
}

impl SoftMaskSubtype {
    /// Get the PDF name for this subtype.
    pub fn as_pdf_name(&self) -> &'static str {
        match self {
            SoftMaskSubtype::Alpha => "Alpha",
            SoftMaskSubtype::Luminosity => "Luminosity",
        }
    }
}

/// Options of a soft mask dictionary backed by a transparency group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SoftMaskOptions {
    /// Mask subtype
    pub subtype: SoftMaskSubtype,
    /// Registry index of the transparency group
    pub group: usize,
}

impl SoftMaskOptions {
    /// Cache key, e.g. `S_/Alpha;G_5_0_R`.
    pub fn cache_key(&self) -> String {
        format!("S_/{};G_{}_0_R", self.subtype.as_pdf_name(), self.group + 1)
    }

    /// Build the soft mask dictionary.
    pub fn to_object(&self) -> Object {
        ObjectSerializer::dict(vec![
            ("Type", ObjectSerializer::name("Mask")),
            ("S", ObjectSerializer::name(self.subtype.as_pdf_name())),
            ("G", ObjectSerializer::reference(self.group)),
        ])
    }
}

/// Options of a transparency group form XObject.
///
/// The group paints the listed images; its resources name them `/I<id>`
/// and the graphics states `/GS<id>`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransparencyGroupOptions {
    /// Bounding box `[llx lly urx ury]`
    pub bbox: [f64; 4],
    /// Registry indices of graphics states made available to the group
    pub ext_gstates: Vec<usize>,
    /// Registry indices of images and where to paint them
    pub images: Vec<(usize, Rect)>,
}

impl TransparencyGroupOptions {
    /// Content stream painting the images.
    pub fn content(&self) -> Result<Vec<u8>> {
        let mut builder = ContentStreamBuilder::new();
        for (index, rect) in &self.images {
            builder.draw_image(&format!("I{}", index + 1), rect.x, rect.y, rect.width, rect.height);
        }
        builder.build()
    }

    /// Cache key: SHA-256 over the box, the graphics states and the content.
    pub fn cache_key(&self) -> Result<String> {
        let mut hasher = Sha256::new();
        for v in self.bbox {
            hasher.update(format!("{:.3};", v));
        }
        for index in &self.ext_gstates {
            hasher.update(format!("GS{};", index + 1));
        }
        hasher.update(self.content()?);
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Build the form XObject stream.
    pub fn to_object(&self) -> Result<Object> {
        let mut resources = HashMap::new();
        if !self.ext_gstates.is_empty() {
            let states = self
                .ext_gstates
                .iter()
                .map(|&i| (format!("GS{}", i + 1), ObjectSerializer::reference(i)))
                .collect();
            resources.insert(key("ExtGState"), Object::Dictionary(states));
        }
        if !self.images.is_empty() {
            let images = self
                .images
                .iter()
                .map(|&(i, _)| (format!("I{}", i + 1), ObjectSerializer::reference(i)))
                .collect();
            resources.insert(key("XObject"), Object::Dictionary(images));
        }

        let [llx, lly, urx, ury] = self.bbox;
        Ok(ObjectSerializer::stream(
            vec![
                ("FormType", Object::Integer(1)),
                ("Subtype", ObjectSerializer::name("Form")),
                ("Type", ObjectSerializer::name("XObject")),
                (
                    "Matrix",
                    ObjectSerializer::array(
                        [1, 0, 0, 1, 0, 0].into_iter().map(Object::Integer).collect(),
                    ),
                ),
                ("BBox", ObjectSerializer::rect(llx, lly, urx, ury)),
                (
                    "Group",
                    ObjectSerializer::dict(vec![
                        ("CS", ObjectSerializer::name("DeviceGray")),
                        ("S", ObjectSerializer::name("Transparency")),
                    ]),
                ),
                ("Resources", Object::Dictionary(resources)),
            ],
            self.content()?,
        ))
    }
}
