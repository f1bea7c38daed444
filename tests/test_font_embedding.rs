//! Subset font embedding through the document engine.

mod common;

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use common::{as_text, init_logging, plain_writer, TestFont};
use pdf_forge::fonts::{FontOptions, FontStyle, SubsetFont};
use pdf_forge::writer::{DescriptorMetrics, DocObject, SimpleFontDef};
use proptest::prelude::*;

fn subset_fonts(writer: &pdf_forge::PdfWriter) -> Vec<&SubsetFont> {
    writer
        .registry()
        .iter()
        .filter_map(|o| match o {
            DocObject::SubsetFont(f) => Some(f.font()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_add_chars_twice_keeps_order() {
    let mut font = SubsetFont::new("Sans", TestFont::latin().build(), FontOptions::default()).unwrap();
    font.add_chars("hello world");
    let before: Vec<(char, u16)> = font.glyph_map().iter().collect();
    font.add_chars("hello world");
    font.add_chars("world hello");
    let after: Vec<(char, u16)> = font.glyph_map().iter().collect();
    assert_eq!(before, after);
    assert_eq!(before.first().map(|p| p.0), Some('h'));
}

#[test]
fn test_composite_closure_includes_components_and_notdef() {
    let test_font = TestFont::with_chars("BX").composite('A', &['B']);
    let mut font = SubsetFont::new("Comp", test_font.build(), FontOptions::default()).unwrap();
    font.add_chars("A");

    let closure = font.glyph_closure().unwrap();
    let expected: Vec<u16> = vec![0, test_font.glyph_of('B'), test_font.glyph_of('A')];
    assert_eq!(closure.into_iter().collect::<Vec<_>>(), expected);
    assert!(font.glyph_index('B').is_none());
}

#[test]
fn test_rebuilt_tables_are_aligned_and_disjoint() {
    for test_font in [TestFont::latin(), TestFont::latin().long_loca()] {
        let mut font = SubsetFont::new("Sans", test_font.build(), FontOptions::default()).unwrap();
        font.add_chars("Quiz");
        let data = font.rebuild_subset().unwrap();

        let raw = ttf_parser::RawFace::parse(&data, 0).unwrap();
        let mut regions: Vec<(u32, u32)> = raw
            .table_records
            .into_iter()
            .map(|r| (r.offset, r.length))
            .collect();
        regions.sort();
        assert_eq!(regions.len(), 9);
        for pair in regions.windows(2) {
            let (offset, length) = pair[0];
            assert_eq!(offset % 4, 0);
            assert!(offset + length <= pair[1].0);
        }
        let (last_offset, last_length) = regions[regions.len() - 1];
        assert_eq!(last_offset % 4, 0);
        assert!((last_offset + last_length) as usize <= data.len());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_pdf_width_matches_scaled_advance(units_per_em in 16u16..=16384) {
        let test_font = TestFont::with_chars("AbZ").units_per_em(units_per_em);
        let font = SubsetFont::new("W", test_font.build(), FontOptions::default()).unwrap();
        for glyph in 0..test_font.num_glyphs() {
            let expected = test_font.advance(glyph) as u32 * 1000 / units_per_em as u32;
            prop_assert_eq!(font.glyph_index_to_pdf_width(glyph), expected);
        }
    }
}

#[test]
fn test_two_families_keep_separate_subsets() {
    init_logging();
    let mut writer = plain_writer();
    writer.add_ttf_font("Alpha", TestFont::latin().build()).unwrap();
    writer.add_ttf_font("Beta", TestFont::latin().build()).unwrap();
    writer.add_page();

    writer.set_font("Alpha", FontStyle::REGULAR, 12.0).unwrap();
    writer.text(72.0, 700.0, "AB").unwrap();
    writer.set_font("Beta", FontStyle::REGULAR, 12.0).unwrap();
    writer.text(72.0, 680.0, "CD").unwrap();

    let fonts = subset_fonts(&writer);
    assert_eq!(fonts.len(), 2);
    let chars = |f: &SubsetFont| f.glyph_map().iter().map(|(c, _)| c).collect::<String>();
    assert_eq!(chars(fonts[0]), "AB");
    assert_eq!(chars(fonts[1]), "CD");

    let text = as_text(&writer.compile().unwrap());
    assert_eq!(text.matches("/Subtype /Type0").count(), 2);
    assert!(text.contains("/F1 12 Tf"));
    assert!(text.contains("/F2 12 Tf"));
    assert!(text.contains("/Encoding /Identity-H"));
    assert!(text.contains("/CIDToGIDMap /Identity"));
    assert!(text.contains("+Alpha"));
    assert!(text.contains("+Beta"));
}

#[test]
fn test_missing_glyph_callback_once_and_space_drawn() {
    let missing = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&missing);
    let options = FontOptions {
        on_glyph_not_found: Some(Arc::new(move |ch| seen.lock().unwrap().push(ch))),
        ..Default::default()
    };

    let test_font = TestFont::latin();
    let mut writer = plain_writer();
    writer
        .add_ttf_font_with_option("Sans", test_font.build(), options)
        .unwrap();
    writer.add_page();
    writer.set_font("Sans", FontStyle::REGULAR, 10.0).unwrap();
    writer.text(10.0, 10.0, "A\u{4E00}B\u{4E00}").unwrap();
    writer.text(10.0, 30.0, "\u{4E00}").unwrap();

    assert_eq!(*missing.lock().unwrap(), vec!['\u{4E00}']);

    let text = as_text(&writer.compile().unwrap());
    let expected = format!(
        "<{:04X}{:04X}{:04X}{:04X}> Tj",
        test_font.glyph_of('A'),
        test_font.glyph_of(' '),
        test_font.glyph_of('B'),
        test_font.glyph_of(' ')
    );
    assert!(text.contains(&expected), "missing {} in output", expected);
}

#[test]
fn test_missing_glyph_without_substitute_draws_notdef() {
    let options = FontOptions {
        glyph_not_found_substitute: None,
        ..Default::default()
    };
    let test_font = TestFont::latin();
    let mut writer = plain_writer();
    writer
        .add_ttf_font_with_option("Sans", test_font.build(), options)
        .unwrap();
    writer.add_page();
    writer.set_font("Sans", FontStyle::REGULAR, 10.0).unwrap();
    writer.text(0.0, 0.0, "A\u{4E00}").unwrap();
    assert!(!writer.is_current_font_contain_glyph('\u{4E00}').unwrap());

    let text = as_text(&writer.compile().unwrap());
    assert!(text.contains(&format!("<{:04X}0000> Tj", test_font.glyph_of('A'))));
    assert!(text.contains("<0000> <4E00>"));
}

#[test]
fn test_kerning_emits_text_array() {
    let test_font = TestFont::latin().kern('A', 'V', -80);
    let options = FontOptions {
        use_kerning: true,
        ..Default::default()
    };
    let mut writer = plain_writer();
    writer
        .add_ttf_font_with_option("Kern", test_font.build(), options)
        .unwrap();
    writer.add_page();
    writer.set_font("Kern", FontStyle::REGULAR, 10.0).unwrap();
    writer.text(0.0, 0.0, "AV").unwrap();

    writer
        .kern_override("Kern", Arc::new(|_, _, _, _, value| value * 2))
        .unwrap();
    writer.text(0.0, 20.0, "AV").unwrap();

    let text = as_text(&writer.compile().unwrap());
    let a = test_font.glyph_of('A');
    let v = test_font.glyph_of('V');
    assert!(text.contains(&format!("[<{:04X}> 80 <{:04X}> ] TJ", a, v)));
    assert!(text.contains(&format!("[<{:04X}> 160 <{:04X}> ] TJ", a, v)));
}

#[test]
fn test_measure_text_width_in_points() {
    let test_font = TestFont::latin();
    let mut writer = plain_writer();
    writer.add_ttf_font("Sans", test_font.build()).unwrap();
    writer.set_font("Sans", FontStyle::REGULAR, 10.0).unwrap();
    writer.set_char_spacing(1.0);

    let width = writer.measure_text_width("A ").unwrap();
    // 'A' is 1229 units, space 250, both at 1000 units per em
    let expected = 1229.0 * 10.0 / 1000.0 + 250.0 * 10.0 / 1000.0 + 2.0;
    assert!((width - expected).abs() < 1e-9);
}

#[test]
fn test_simple_font_wired_by_link() {
    let mut writer = plain_writer();
    let encoding = writer.registry().len();
    writer
        .add_simple_font(SimpleFontDef {
            family: "Legacy".into(),
            base_font: "LegacySans".into(),
            widths: vec![500; 224],
            differences: "128 /Euro".into(),
            metrics: DescriptorMetrics {
                ascent: 800,
                descent: -200,
                cap_height: 700,
                x_height: 500,
                flags: 32,
                bbox: [0, -200, 1000, 800],
                italic_angle: 0.0,
                stem_v: 80,
            },
            font_file: Bytes::from_static(b"not really a font"),
        })
        .unwrap();
    writer.add_page();
    writer.set_font("Legacy", FontStyle::REGULAR, 9.0).unwrap();
    writer.text(5.0, 5.0, "Hi").unwrap();
    assert!((writer.measure_text_width("Hi").unwrap() - 9.0).abs() < 1e-9);

    let text = as_text(&writer.compile().unwrap());
    assert!(text.contains(&format!("/Encoding {} 0 R", encoding + 1)));
    assert!(text.contains(&format!("/Widths {} 0 R", encoding + 2)));
    assert!(text.contains(&format!("/FontDescriptor {} 0 R", encoding + 3)));
    assert!(text.contains("/Differences [128 /Euro]"));
    assert!(text.contains("/F1 9 Tf"));
    assert!(text.contains("(Hi) Tj"));
}
