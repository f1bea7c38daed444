//! PDF content stream builder.
//!
//! Collects graphics and text operators (ISO 32000-1 sections 8 and 9) for
//! one page content object and renders them to bytes.

use std::io::Write;

use crate::error::Result;

/// Operations that can be added to a content stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentStreamOp {
    /// Save graphics state (q)
    SaveState,
    /// Restore graphics state (Q)
    RestoreState,
    /// Set transformation matrix (cm)
    Transform(f64, f64, f64, f64, f64, f64),
    /// Begin text object (BT)
    BeginText,
    /// End text object (ET)
    EndText,
    /// Set font resource and size (Tf)
    SetFont(String, f64),
    /// Set text matrix (Tm)
    SetTextMatrix(f64, f64, f64, f64, f64, f64),
    /// Show a literal string (Tj)
    ShowText(Vec<u8>),
    /// Show two-byte glyph codes as a hex string (Tj)
    ShowGlyphs(Vec<u16>),
    /// Show text with positioning adjustments (TJ)
    ShowTextArray(Vec<TextArrayItem>),
    /// Set character spacing (Tc)
    SetCharacterSpacing(f64),
    /// Set fill color RGB (rg)
    SetFillColorRGB(f64, f64, f64),
    /// Set stroke color RGB (RG)
    SetStrokeColorRGB(f64, f64, f64),
    /// Set line width (w)
    SetLineWidth(f64),
    /// Move to (m)
    MoveTo(f64, f64),
    /// Line to (l)
    LineTo(f64, f64),
    /// Rectangle (re)
    Rectangle(f64, f64, f64, f64),
    /// Stroke (S)
    Stroke,
    /// Fill (f)
    Fill,
    /// Fill and stroke (B)
    FillStroke,
    /// Paint XObject (Do)
    PaintXObject(String),
    /// Set graphics state from an ExtGState resource (gs)
    SetExtGState(String),
    /// Raw operator text
    Raw(String),
}

/// Item in a TJ array.
#[derive(Debug, Clone, PartialEq)]
pub enum TextArrayItem {
    /// Two-byte glyph codes
    Glyphs(Vec<u16>),
    /// Positioning adjustment in thousandths of text space
    /// (negative moves right)
    Adjustment(f64),
}

/// How a rectangle is painted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PaintStyle {
    /// Outline only
    #[default]
    Stroke,
    /// Interior only
    Fill,
    /// Interior and outline
    FillStroke,
}

/// Builder for PDF content streams.
#[derive(Debug, Clone, Default)]
pub struct ContentStreamBuilder {
    /// Operations in the stream
    operations: Vec<ContentStreamOp>,
}

impl ContentStreamBuilder {
    /// Create a new content stream builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an operation to the stream.
    pub fn op(&mut self, op: ContentStreamOp) -> &mut Self {
        self.operations.push(op);
        self
    }

    /// Add multiple operations.
    pub fn ops(&mut self, ops: impl IntoIterator<Item = ContentStreamOp>) -> &mut Self {
        self.operations.extend(ops);
        self
    }

    /// Operations recorded so far.
    pub fn operations(&self) -> &[ContentStreamOp] {
        &self.operations
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Save the graphics state.
    pub fn save_state(&mut self) -> &mut Self {
        self.op(ContentStreamOp::SaveState)
    }

    /// Restore the graphics state.
    pub fn restore_state(&mut self) -> &mut Self {
        self.op(ContentStreamOp::RestoreState)
    }

    /// Apply an ExtGState resource by name.
    pub fn set_ext_gstate(&mut self, name: &str) -> &mut Self {
        self.op(ContentStreamOp::SetExtGState(name.to_string()))
    }

    /// Place a run of glyph codes at `(x, y)`.
    ///
    /// A plain `Tj` is written unless the run carries kerning adjustments.
    pub fn glyph_run(
        &mut self,
        font_resource: &str,
        font_size: f64,
        char_spacing: f64,
        x: f64,
        y: f64,
        run: Vec<TextArrayItem>,
    ) -> &mut Self {
        self.op(ContentStreamOp::BeginText)
            .op(ContentStreamOp::SetFont(font_resource.to_string(), font_size));
        if char_spacing != 0.0 {
            self.op(ContentStreamOp::SetCharacterSpacing(char_spacing));
        }
        self.op(ContentStreamOp::SetTextMatrix(1.0, 0.0, 0.0, 1.0, x, y));

        let show = match run.as_slice() {
            [TextArrayItem::Glyphs(glyphs)] => ContentStreamOp::ShowGlyphs(glyphs.clone()),
            _ => ContentStreamOp::ShowTextArray(run),
        };
        self.op(show).op(ContentStreamOp::EndText)
    }

    /// Place single-byte text at `(x, y)`.
    pub fn text(&mut self, font_resource: &str, font_size: f64, x: f64, y: f64, text: Vec<u8>) -> &mut Self {
        self.op(ContentStreamOp::BeginText)
            .op(ContentStreamOp::SetFont(font_resource.to_string(), font_size))
            .op(ContentStreamOp::SetTextMatrix(1.0, 0.0, 0.0, 1.0, x, y))
            .op(ContentStreamOp::ShowText(text))
            .op(ContentStreamOp::EndText)
    }

    /// Set the RGB stroke color (components in 0..=1).
    pub fn set_stroke_color(&mut self, r: f64, g: f64, b: f64) -> &mut Self {
        self.op(ContentStreamOp::SetStrokeColorRGB(r, g, b))
    }

    /// Set the RGB fill color (components in 0..=1).
    pub fn set_fill_color(&mut self, r: f64, g: f64, b: f64) -> &mut Self {
        self.op(ContentStreamOp::SetFillColorRGB(r, g, b))
    }

    /// Set the line width.
    pub fn set_line_width(&mut self, width: f64) -> &mut Self {
        self.op(ContentStreamOp::SetLineWidth(width))
    }

    /// Stroke a straight line.
    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) -> &mut Self {
        self.op(ContentStreamOp::MoveTo(x1, y1))
            .op(ContentStreamOp::LineTo(x2, y2))
            .op(ContentStreamOp::Stroke)
    }

    /// Paint a rectangle.
    pub fn rect(&mut self, x: f64, y: f64, width: f64, height: f64, style: PaintStyle) -> &mut Self {
        self.op(ContentStreamOp::Rectangle(x, y, width, height));
        match style {
            PaintStyle::Stroke => self.op(ContentStreamOp::Stroke),
            PaintStyle::Fill => self.op(ContentStreamOp::Fill),
            PaintStyle::FillStroke => self.op(ContentStreamOp::FillStroke),
        }
    }

    /// Paint an image XObject scaled into a rectangle.
    pub fn draw_image(&mut self, name: &str, x: f64, y: f64, width: f64, height: f64) -> &mut Self {
        self.op(ContentStreamOp::SaveState)
            .op(ContentStreamOp::Transform(width, 0.0, 0.0, height, x, y))
            .op(ContentStreamOp::PaintXObject(name.to_string()))
            .op(ContentStreamOp::RestoreState)
    }

    /// Build the content stream to bytes.
    pub fn build(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        for op in &self.operations {
            write_op(&mut buf, op)?;
            writeln!(buf)?;
        }
        Ok(buf)
    }
}

/// Write a single operation.
fn write_op<W: Write>(w: &mut W, op: &ContentStreamOp) -> std::io::Result<()> {
    match op {
        ContentStreamOp::SaveState => write!(w, "q"),
        ContentStreamOp::RestoreState => write!(w, "Q"),
        ContentStreamOp::Transform(a, b, c, d, e, f) => {
            write!(w, "{} {} {} {} {} {} cm", a, b, c, d, e, f)
        },
        ContentStreamOp::BeginText => write!(w, "BT"),
        ContentStreamOp::EndText => write!(w, "ET"),
        ContentStreamOp::SetFont(name, size) => write!(w, "/{} {} Tf", name, size),
        ContentStreamOp::SetTextMatrix(a, b, c, d, e, f) => {
            write!(w, "{} {} {} {} {} {} Tm", a, b, c, d, e, f)
        },
        ContentStreamOp::ShowText(text) => {
            write!(w, "(")?;
            write_escaped(w, text)?;
            write!(w, ") Tj")
        },
        ContentStreamOp::ShowGlyphs(glyphs) => {
            write_glyphs(w, glyphs)?;
            write!(w, " Tj")
        },
        ContentStreamOp::ShowTextArray(items) => {
            write!(w, "[")?;
            for item in items {
                match item {
                    TextArrayItem::Glyphs(glyphs) => write_glyphs(w, glyphs)?,
                    TextArrayItem::Adjustment(adj) => write!(w, "{}", adj)?,
                }
                write!(w, " ")?;
            }
            write!(w, "] TJ")
        },
        ContentStreamOp::SetCharacterSpacing(spacing) => write!(w, "{} Tc", spacing),
        ContentStreamOp::SetFillColorRGB(r, g, b) => write!(w, "{} {} {} rg", r, g, b),
        ContentStreamOp::SetStrokeColorRGB(r, g, b) => write!(w, "{} {} {} RG", r, g, b),
        ContentStreamOp::SetLineWidth(width) => write!(w, "{} w", width),
        ContentStreamOp::MoveTo(x, y) => write!(w, "{} {} m", x, y),
        ContentStreamOp::LineTo(x, y) => write!(w, "{} {} l", x, y),
        ContentStreamOp::Rectangle(x, y, w_val, h) => write!(w, "{} {} {} {} re", x, y, w_val, h),
        ContentStreamOp::Stroke => write!(w, "S"),
        ContentStreamOp::Fill => write!(w, "f"),
        ContentStreamOp::FillStroke => write!(w, "B"),
        ContentStreamOp::PaintXObject(name) => write!(w, "/{} Do", name),
        ContentStreamOp::SetExtGState(name) => write!(w, "/{} gs", name),
        ContentStreamOp::Raw(raw) => write!(w, "{}", raw),
    }
}

fn write_glyphs<W: Write>(w: &mut W, glyphs: &[u16]) -> std::io::Result<()> {
    write!(w, "<")?;
    for glyph in glyphs {
        write!(w, "{:04X}", glyph)?;
    }
    write!(w, ">")
}

fn write_escaped<W: Write>(w: &mut W, text: &[u8]) -> std::io::Result<()> {
    for &byte in text {
        match byte {
            b'(' => write!(w, "\\(")?,
            b')' => write!(w, "\\)")?,
            b'\\' => write!(w, "\\\\")?,
            b'\n' => write!(w, "\\n")?,
            b'\r' => write!(w, "\\r")?,
            _ => w.write_all(&[byte])?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(builder: &ContentStreamBuilder) -> String {
        String::from_utf8(builder.build().unwrap()).unwrap()
    }

    #[test]
    fn test_glyph_run_plain() {
        let mut builder = ContentStreamBuilder::new();
        builder.glyph_run("F1", 12.0, 0.0, 72.0, 720.0, vec![TextArrayItem::Glyphs(vec![0x24, 0x25])]);

        assert_eq!(render(&builder), "BT\n/F1 12 Tf\n1 0 0 1 72 720 Tm\n<00240025> Tj\nET\n");
    }

    #[test]
    fn test_glyph_run_with_kerning() {
        let mut builder = ContentStreamBuilder::new();
        builder.glyph_run(
            "F2",
            10.0,
            0.5,
            0.0,
            0.0,
            vec![
                TextArrayItem::Glyphs(vec![1]),
                TextArrayItem::Adjustment(80.0),
                TextArrayItem::Glyphs(vec![2]),
            ],
        );

        let content = render(&builder);
        assert!(content.contains("0.5 Tc"));
        assert!(content.contains("[<0001> 80 <0002> ] TJ"));
    }

    #[test]
    fn test_literal_text_is_escaped() {
        let mut builder = ContentStreamBuilder::new();
        builder.text("F1", 9.0, 10.0, 20.0, b"a(b)".to_vec());
        assert!(render(&builder).contains("(a\\(b\\)) Tj"));
    }

    #[test]
    fn test_path_operations() {
        let mut builder = ContentStreamBuilder::new();
        builder
            .set_stroke_color(0.0, 0.0, 0.0)
            .set_line_width(1.0)
            .line(0.0, 0.0, 100.0, 100.0)
            .rect(10.0, 10.0, 50.0, 20.0, PaintStyle::FillStroke);

        let content = render(&builder);
        assert!(content.contains("0 0 0 RG"));
        assert!(content.contains("1 w"));
        assert!(content.contains("0 0 m\n100 100 l\nS"));
        assert!(content.contains("10 10 50 20 re\nB"));
    }

    #[test]
    fn test_draw_image() {
        let mut builder = ContentStreamBuilder::new();
        builder.draw_image("I7", 10.0, 20.0, 100.0, 50.0);
        assert_eq!(render(&builder), "q\n100 0 0 50 10 20 cm\n/I7 Do\nQ\n");
    }

    #[test]
    fn test_ext_gstate_wrapping() {
        let mut builder = ContentStreamBuilder::new();
        builder.save_state().set_ext_gstate("GS5").restore_state();
        assert_eq!(render(&builder), "q\n/GS5 gs\nQ\n");
    }
}
