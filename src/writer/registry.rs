//! Object registry.
//!
//! An append-only arena of [`DocObject`]s. The registry index of an object
//! never changes once assigned and its PDF object number is `index + 1`.

use super::doc_object::{Catalog, Content, DocObject, OutlineItem, Outlines, Page, Pages, Resources};
use super::font_objects::{Encoding, SimpleFont, Type0Font};
use crate::error::{Error, Result};

/// Append-only store of document objects.
#[derive(Debug, Clone, Default)]
pub struct ObjectRegistry {
    objects: Vec<DocObject>,
}

/// Typed access to one variant; a mismatch is an [`Error::InvalidObjectType`].
macro_rules! typed_accessors {
    ($($get:ident, $get_mut:ident => $variant:ident($ty:ty), $expected:literal;)*) => {
        $(
            #[doc = concat!("The `", $expected, "` object at `index`.")]
            pub fn $get(&self, index: usize) -> Result<&$ty> {
                match self.get(index) {
                    Some(DocObject::$variant(o)) => Ok(o),
                    other => Err(Self::mismatch(index, $expected, other.map(DocObject::type_name))),
                }
            }

            #[doc = concat!("The `", $expected, "` object at `index`, mutably.")]
            pub fn $get_mut(&mut self, index: usize) -> Result<&mut $ty> {
                match self.objects.get_mut(index) {
                    Some(DocObject::$variant(o)) => Ok(o),
                    other => Err(Self::mismatch(index, $expected, other.map(|o| o.type_name()))),
                }
            }
        )*
    };
}

impl ObjectRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an object and return its index.
    pub fn register(&mut self, obj: DocObject) -> usize {
        log::trace!("Registering {} as object {}", obj.type_name(), self.objects.len() + 1);
        self.objects.push(obj);
        self.objects.len() - 1
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Object at `index`.
    pub fn get(&self, index: usize) -> Option<&DocObject> {
        self.objects.get(index)
    }

    /// Object at `index`, mutably.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut DocObject> {
        self.objects.get_mut(index)
    }

    /// Objects in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &DocObject> {
        self.objects.iter()
    }

    fn mismatch(index: usize, expected: &'static str, found: Option<&'static str>) -> Error {
        Error::InvalidObjectType {
            index,
            expected,
            found: found.unwrap_or("nothing"),
        }
    }

    typed_accessors! {
        catalog, catalog_mut => Catalog(Catalog), "Catalog";
        pages, pages_mut => Pages(Pages), "Pages";
        page, page_mut => Page(Page), "Page";
        content, content_mut => Content(Content), "Content";
        resources, resources_mut => Resources(Resources), "Resources";
        type0_font, type0_font_mut => SubsetFont(Type0Font), "SubsetFont";
        simple_font, simple_font_mut => Font(SimpleFont), "Font";
        encoding, encoding_mut => Encoding(Encoding), "Encoding";
        outlines, outlines_mut => Outlines(Outlines), "Outlines";
        outline, outline_mut => Outline(OutlineItem), "Outline";
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_register_returns_sequential_indices() {
        let mut registry = ObjectRegistry::new();
        for i in 0..5 {
            let index = registry.register(DocObject::RawImported(Bytes::from_static(b"null")));
            assert_eq!(index, i);
        }
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn test_typed_access_mismatch() {
        let mut registry = ObjectRegistry::new();
        let index = registry.register(DocObject::Content(Content::default()));

        assert!(registry.content(index).is_ok());
        match registry.page_mut(index) {
            Err(Error::InvalidObjectType {
                index: 0,
                expected: "Page",
                found: "Content",
            }) => {},
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
        match registry.type0_font(7) {
            Err(Error::InvalidObjectType { found: "nothing", .. }) => {},
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }
}
