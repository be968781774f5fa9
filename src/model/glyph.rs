//! Positioned glyph runs as produced by the extractor.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// A 2x3 affine matrix `[a b c d e f]` in PDF order.
///
/// Maps `(x, y)` to `(a*x + c*y + e, b*x + d*y + f)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    pub const fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// A pure translation.
    pub const fn translate(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// `self × other`: apply `self` first, then `other`.
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// Transform a point.
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Horizontal scale factor, `sqrt(a² + b²)`.
    pub fn x_scale(&self) -> f32 {
        (self.a * self.a + self.b * self.b).sqrt()
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Bold/italic flags sniffed from a font name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontStyle {
    pub bold: bool,
    pub italic: bool,
}

impl FontStyle {
    /// Guess the style from a PostScript-ish font name.
    ///
    /// Matches weight/slant words anywhere in the name and the abbreviated
    /// `Bd`/`It` tokens only in the style suffix (`Arial-BdIt`, `Foo,It`), so
    /// family names like "Fruitiger" are not read as italic.
    pub fn from_font_name(name: &str) -> Self {
        static STYLE_SUFFIX: OnceLock<Regex> = OnceLock::new();
        let suffix_re = STYLE_SUFFIX.get_or_init(|| {
            Regex::new(r"[-,](?P<style>[A-Za-z]+)$").expect("static regex is valid")
        });

        let lower = name.to_lowercase();
        let suffix = suffix_re
            .captures(name)
            .and_then(|c| c.name("style"))
            .map(|m| m.as_str().to_lowercase())
            .unwrap_or_default();

        let bold = ["bold", "black", "heavy", "semibold", "demi"]
            .iter()
            .any(|w| lower.contains(w))
            || suffix.contains("bd");
        let italic = lower.contains("italic") || lower.contains("oblique") || suffix.contains("it");

        Self { bold, italic }
    }
}

/// One positioned text fragment from a PDF page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlyphRun {
    /// Decoded text (may contain spaces)
    pub text: String,
    /// Text rendering matrix with the font size baked in
    pub transform: Matrix,
    /// Advance width in points (0 when unknown)
    pub width: f32,
    /// Base font name, e.g. "ABCDEF+Helvetica-Bold"
    pub font_name: String,
    /// 1-indexed page number
    pub page: u32,
}

impl GlyphRun {
    pub fn new(
        text: impl Into<String>,
        transform: Matrix,
        width: f32,
        font_name: impl Into<String>,
        page: u32,
    ) -> Self {
        Self {
            text: text.into(),
            transform,
            width,
            font_name: font_name.into(),
            page,
        }
    }

    /// Upright run at `(x, y)` with the given size and no measured width.
    pub fn at(text: impl Into<String>, x: f32, y: f32, font_size: f32) -> Self {
        Self::new(
            text,
            Matrix::new(font_size, 0.0, 0.0, font_size, x, y),
            0.0,
            "Helvetica",
            1,
        )
    }

    /// Set the advance width.
    pub fn with_width(mut self, width: f32) -> Self {
        self.width = width;
        self
    }

    /// Set the font name.
    pub fn with_font(mut self, font_name: impl Into<String>) -> Self {
        self.font_name = font_name.into();
        self
    }

    /// Baseline x in page points.
    pub fn x(&self) -> f32 {
        self.transform.e
    }

    /// Baseline y in page points (y-up).
    pub fn y(&self) -> f32 {
        self.transform.f
    }

    /// Effective font size.
    pub fn font_size(&self) -> f32 {
        self.transform.x_scale()
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Measured width, or `fontSize × 0.5 × chars` when the decoder gave none.
    pub fn effective_width(&self) -> f32 {
        if self.width > 0.0 {
            self.width
        } else {
            self.font_size() * 0.5 * self.char_count() as f32
        }
    }

    /// Right edge of the run.
    pub fn end_x(&self) -> f32 {
        self.x() + self.effective_width()
    }

    /// Average width of one character.
    pub fn avg_char_width(&self) -> f32 {
        match self.char_count() {
            0 => self.font_size() * 0.5,
            n => self.effective_width() / n as f32,
        }
    }

    /// Whitespace-only runs carry no layout information.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}
