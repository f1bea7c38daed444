//! Resource de-duplication, images, links and encryption.

mod common;

use std::sync::Arc;

use bytes::Bytes;
use common::{as_text, plain_writer};
use pdf_forge::config::PdfConfig;
use pdf_forge::encryption::{Permissions, Protection, StreamCipher};
use pdf_forge::geometry::Rect;
use pdf_forge::writer::{
    BlendMode, ColorSpace, DocObject, GraphicsStateOptions, ImageSpec, SoftMaskOptions,
    SoftMaskSubtype, Transparency, TransparencyGroupOptions,
};
use pdf_forge::{Error, PdfWriter};

fn count(writer: &PdfWriter, type_name: &str) -> usize {
    writer
        .registry()
        .iter()
        .filter(|o| o.type_name() == type_name)
        .count()
}

#[test]
fn test_same_graphics_state_written_once() {
    let mut writer = plain_writer();
    writer.add_page();
    let options = GraphicsStateOptions::new()
        .stroking_alpha(0.5)
        .blend_mode(BlendMode::Multiply);
    let first = writer.ext_gstate(options).unwrap();
    let second = writer.ext_gstate(options).unwrap();
    let other = writer
        .ext_gstate(options.non_stroking_alpha(0.25))
        .unwrap();
    assert_eq!(first, second);
    assert_ne!(first, other);

    let text = as_text(&writer.compile().unwrap());
    assert_eq!(text.matches("/Type /ExtGState").count(), 2);
    assert!(text.contains("/BM /Multiply"));
    assert!(text.contains(&format!("/GS{} {} 0 R", first + 1, first + 1)));
}

#[test]
fn test_transparency_from_two_draw_calls_shares_state() {
    let mut writer = plain_writer();
    writer.add_page();
    writer.set_transparency(Transparency::new(0.5, BlendMode::Multiply).unwrap());
    writer.line(0.0, 0.0, 50.0, 50.0).unwrap();
    writer.add_page();
    writer.line(0.0, 50.0, 50.0, 0.0).unwrap();
    assert_eq!(count(&writer, "GraphicsState"), 1);

    let text = as_text(&writer.compile().unwrap());
    let gstate = writer
        .registry()
        .iter()
        .position(|o| o.type_name() == "GraphicsState")
        .unwrap();
    assert_eq!(text.matches(&format!("/GS{} gs", gstate + 1)).count(), 2);
    assert!(text.contains("/CA 0.5 /Type /ExtGState /ca 0.5"));
}

#[test]
fn test_invalid_alpha_rejected() {
    assert!(matches!(
        Transparency::new(1.5, BlendMode::Normal),
        Err(Error::InvalidAlpha(_))
    ));
    assert!(Transparency::new(-0.1, BlendMode::Normal).is_err());
}

#[test]
fn test_soft_mask_and_group_caches() {
    let mut writer = plain_writer();
    let group = TransparencyGroupOptions {
        bbox: [0.0, 0.0, 100.0, 100.0],
        ext_gstates: vec![],
        images: vec![],
    };
    let g1 = writer.transparency_group(group.clone()).unwrap();
    let g2 = writer.transparency_group(group).unwrap();
    assert_eq!(g1, g2);

    let mask = SoftMaskOptions {
        subtype: SoftMaskSubtype::Alpha,
        group: g1,
    };
    let m1 = writer.soft_mask(mask);
    let m2 = writer.soft_mask(mask);
    let m3 = writer.soft_mask(SoftMaskOptions {
        subtype: SoftMaskSubtype::Luminosity,
        group: g1,
    });
    assert_eq!(m1, m2);
    assert_ne!(m1, m3);
    assert_eq!(count(&writer, "SoftMask"), 2);
    assert_eq!(count(&writer, "TransparencyGroup"), 1);

    let gs = writer
        .ext_gstate(GraphicsStateOptions::new().soft_mask(m1))
        .unwrap();
    let text = as_text(&writer.compile().unwrap());
    assert!(text.contains(&format!("/SMask {} 0 R", m1 + 1)));
    assert!(text.contains(&format!("/G {} 0 R", g1 + 1)));
    assert!(gs > m3);
}

#[test]
fn test_indexed_image_with_alpha() {
    let mut writer = plain_writer();
    writer.add_page();
    let spec = ImageSpec {
        width: 2,
        height: 2,
        color_space: ColorSpace::Indexed {
            palette: Bytes::from_static(&[0, 0, 0, 255, 255, 255]),
        },
        bits_per_component: 8,
        filter: None,
        decode_parms: vec![],
        data: Bytes::from_static(&[0, 1, 1, 0]),
        alpha: Some(Bytes::from_static(&[255, 128, 128, 0])),
    };
    writer.image(&spec, Rect::new(10.0, 20.0, 30.0, 40.0)).unwrap();

    let names: Vec<&str> = writer
        .registry()
        .iter()
        .skip(4)
        .map(DocObject::type_name)
        .collect();
    assert_eq!(names, ["Page", "DeviceRGB", "Image", "Image", "Content"]);

    let text = as_text(&writer.compile().unwrap());
    assert!(text.contains("/ColorSpace [/Indexed /DeviceRGB 1 6 0 R]"));
    assert!(text.contains("/SMask 7 0 R"));
    assert!(text.contains("/XObject << /I8 8 0 R>>"));
    assert!(text.contains("q\n30 0 0 40 10 20 cm\n/I8 Do\nQ\n"));
}

#[test]
fn test_external_and_dangling_links() {
    let mut writer = plain_writer();
    writer.add_page();
    writer
        .add_external_link("https://example.com", Rect::new(0.0, 0.0, 10.0, 10.0))
        .unwrap();
    writer
        .add_internal_link("missing", Rect::new(0.0, 20.0, 10.0, 10.0))
        .unwrap();
    let text = as_text(&writer.compile().unwrap());
    assert!(text.contains("/A << /S /URI /URI (https://example.com)>>"));
    assert_eq!(text.matches("/Subtype /Link").count(), 2);
    assert!(!text.contains("/Dest"));
}

#[test]
fn test_rectangle_from_points() {
    assert!(matches!(
        Rect::from_points(5.0, 5.0, 5.0, 10.0),
        Err(Error::InvalidRectangleCoordinates)
    ));
}

/// Inverts every byte; enough to tell encrypted payloads from plain ones.
struct Invert;

impl StreamCipher for Invert {
    fn apply(&self, _object_key: &[u8], data: &[u8]) -> Vec<u8> {
        data.iter().map(|b| !b).collect()
    }
}

fn protected_writer() -> PdfWriter {
    let protection = Protection::new(
        Arc::new(Invert),
        vec![1, 2, 3, 4, 5],
        b"owner-entry".to_vec(),
        b"user-entry".to_vec(),
        Permissions::PRINT | Permissions::COPY,
    );
    PdfWriter::new(
        PdfConfig::new()
            .with_compress(pdf_forge::config::CompressLevel::None)
            .with_protection(protection),
    )
}

#[test]
fn test_encrypted_document() {
    let mut writer = protected_writer();
    assert_eq!(count(&writer, "Encryption"), 1);
    writer.add_page();
    writer.line(0.0, 0.0, 10.0, 10.0).unwrap();
    writer
        .add_external_link("https://example.com", Rect::new(0.0, 0.0, 10.0, 10.0))
        .unwrap();

    let pdf = writer.compile().unwrap();
    let text = as_text(&pdf);

    assert!(text.contains("/Encrypt 5 0 R\n/ID [()()]\n"));
    assert!(text.contains("/Filter /Standard /O (owner-entry) /P -44 /R 2 /U (user-entry) /V 1"));
    assert!(!text.contains("0 0 m"));
    assert!(!text.contains("https://example.com"));

    let plain = b"0 0 m\n10 10 l\nS\n";
    let inverted: Vec<u8> = plain.iter().map(|b| !b).collect();
    assert!(pdf.windows(inverted.len()).any(|w| w == inverted.as_slice()));
    assert!(text.contains(&format!("/Length {}>>", plain.len())));
}
