//! Glyph extraction: interpret a page content stream into positioned runs.

use std::collections::{BTreeMap, HashMap};

use lopdf::{Dictionary, Document as LopdfDocument, Object};
use unicode_normalization::UnicodeNormalization;

use crate::error::Result;
use crate::model::{GlyphRun, Matrix};

use super::backend::{decode_text_simple, get_number, page_content, resolve, PageId};

/// A `TJ` adjustment (thousandths of an em) this large reads as a word space.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// Extract all non-blank glyph runs of a page, in content-stream order.
pub fn extract_page(doc: &LopdfDocument, page_id: PageId, page: u32) -> Result<Vec<GlyphRun>> {
    let lopdf_fonts = doc.get_page_fonts(page_id)?;
    let fonts: HashMap<Vec<u8>, FontMetrics> = lopdf_fonts
        .iter()
        .map(|(name, dict)| (name.clone(), FontMetrics::from_dict(doc, dict)))
        .collect();

    let content = page_content(doc, page_id)?;
    let operations = lopdf::content::Content::decode(&content)?.operations;

    let mut interpreter = TextInterpreter {
        doc,
        lopdf_fonts: &lopdf_fonts,
        fonts: &fonts,
        page,
        state: GraphicsState::default(),
        stack: Vec::new(),
        text_matrix: TextMatrix::default(),
        in_text_block: false,
        runs: Vec::new(),
    };

    for op in &operations {
        interpreter.apply(&op.operator, &op.operands);
    }

    log::trace!(
        "Page {}: {} operations, {} glyph runs",
        page,
        operations.len(),
        interpreter.runs.len()
    );
    Ok(interpreter.runs)
}

/// Width table of a simple font.
#[derive(Debug, Clone, Default)]
struct FontMetrics {
    base_font: String,
    first_char: u32,
    /// Glyph widths in thousandths of an em
    widths: Vec<f32>,
    missing_width: f32,
    /// Composite (Type0) fonts use two-byte codes
    two_byte: bool,
}

impl FontMetrics {
    fn from_dict(doc: &LopdfDocument, dict: &Dictionary) -> Self {
        let base_font = dict
            .get(b"BaseFont")
            .ok()
            .and_then(|o| o.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).to_string())
            .unwrap_or_else(|| "Unknown".to_string());

        let two_byte = dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok())
            .is_some_and(|n| n == b"Type0");

        let first_char = dict
            .get(b"FirstChar")
            .ok()
            .and_then(|o| get_number(resolve(doc, o)))
            .unwrap_or(0.0)
            .max(0.0) as u32;

        let widths = dict
            .get(b"Widths")
            .ok()
            .and_then(|o| resolve(doc, o).as_array().ok())
            .map(|arr| {
                arr.iter()
                    .map(|w| get_number(resolve(doc, w)).unwrap_or(0.0))
                    .collect()
            })
            .unwrap_or_default();

        let missing_width = dict
            .get(b"FontDescriptor")
            .ok()
            .and_then(|o| resolve(doc, o).as_dict().ok())
            .and_then(|fd| fd.get(b"MissingWidth").ok())
            .and_then(get_number)
            .unwrap_or(0.0);

        Self {
            base_font,
            first_char,
            widths,
            missing_width,
            two_byte,
        }
    }

    /// Whether advance widths can be measured for this font.
    fn has_widths(&self) -> bool {
        !self.two_byte && !self.widths.is_empty()
    }

    fn glyph_width(&self, code: u8) -> f32 {
        (code as u32)
            .checked_sub(self.first_char)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
            .unwrap_or(self.missing_width)
    }
}

/// Graphics state parameters saved by `q` and restored by `Q`.
#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    font_key: Vec<u8>,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    leading: f32,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            font_key: Vec::new(),
            font_size: 12.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
        }
    }
}

/// Text matrix and text line matrix for tracking position in a text object.
#[derive(Debug, Clone, Default)]
struct TextMatrix {
    tm: Matrix,
    line: Matrix,
}

impl TextMatrix {
    fn set(&mut self, m: Matrix) {
        self.tm = m;
        self.line = m;
    }

    /// Start a new line offset from the start of the current one.
    fn translate(&mut self, tx: f32, ty: f32) {
        self.set(Matrix::translate(tx, ty).multiply(&self.line));
    }

    fn next_line(&mut self, leading: f32) {
        self.translate(0.0, -leading);
    }

    /// Move along the baseline after showing text.
    fn advance(&mut self, tx: f32) {
        self.tm = Matrix::translate(tx, 0.0).multiply(&self.tm);
    }
}

/// Text decoded from one show operator, with its advance in text space.
struct Shown {
    text: String,
    /// Horizontal displacement in unscaled text space units
    advance: f32,
    /// False when the font gave no widths and `advance` is an estimate
    measured: bool,
}

struct TextInterpreter<'a> {
    doc: &'a LopdfDocument,
    lopdf_fonts: &'a BTreeMap<Vec<u8>, &'a Dictionary>,
    fonts: &'a HashMap<Vec<u8>, FontMetrics>,
    page: u32,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    text_matrix: TextMatrix,
    in_text_block: bool,
    runs: Vec<GlyphRun>,
}

impl TextInterpreter<'_> {
    fn apply(&mut self, operator: &str, operands: &[Object]) {
        let num = |i: usize| operands.get(i).and_then(get_number);

        match operator {
            "q" => self.stack.push(self.state.clone()),
            "Q" => {
                if let Some(saved) = self.stack.pop() {
                    self.state = saved;
                }
            }
            "cm" => {
                if let Some(m) = matrix_operand(operands) {
                    self.state.ctm = m.multiply(&self.state.ctm);
                }
            }
            "BT" => {
                self.in_text_block = true;
                self.text_matrix = TextMatrix::default();
            }
            "ET" => self.in_text_block = false,
            "Tf" => {
                if let Some(Object::Name(key)) = operands.first() {
                    self.state.font_key = key.clone();
                }
                self.state.font_size = num(1).unwrap_or(12.0);
            }
            "Tc" => self.state.char_spacing = num(0).unwrap_or(0.0),
            "Tw" => self.state.word_spacing = num(0).unwrap_or(0.0),
            "Tz" => self.state.horizontal_scale = num(0).unwrap_or(100.0) / 100.0,
            "TL" => self.state.leading = num(0).unwrap_or(0.0),
            "Td" => self
                .text_matrix
                .translate(num(0).unwrap_or(0.0), num(1).unwrap_or(0.0)),
            "TD" => {
                let ty = num(1).unwrap_or(0.0);
                self.state.leading = -ty;
                self.text_matrix.translate(num(0).unwrap_or(0.0), ty);
            }
            "Tm" => {
                if let Some(m) = matrix_operand(operands) {
                    self.text_matrix.set(m);
                }
            }
            "T*" => self.text_matrix.next_line(self.state.leading),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    let shown = self.show_string(bytes);
                    self.emit(shown);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    let shown = self.show_array(items);
                    self.emit(shown);
                }
            }
            "'" => {
                self.text_matrix.next_line(self.state.leading);
                if let Some(Object::String(bytes, _)) = operands.first() {
                    let shown = self.show_string(bytes);
                    self.emit(shown);
                }
            }
            "\"" => {
                self.state.word_spacing = num(0).unwrap_or(0.0);
                self.state.char_spacing = num(1).unwrap_or(0.0);
                self.text_matrix.next_line(self.state.leading);
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    let shown = self.show_string(bytes);
                    self.emit(shown);
                }
            }
            _ => {}
        }
    }

    fn font(&self) -> Option<&FontMetrics> {
        self.fonts.get(&self.state.font_key)
    }

    fn decode(&self, bytes: &[u8]) -> String {
        let decoded = self
            .lopdf_fonts
            .get(&self.state.font_key)
            .and_then(|f| f.get_font_encoding(self.doc).ok())
            .and_then(|enc| LopdfDocument::decode_text(&enc, bytes).ok());

        decoded.unwrap_or_else(|| decode_text_simple(bytes))
    }

    fn show_string(&self, bytes: &[u8]) -> Shown {
        let text = self.decode(bytes);
        let state = &self.state;

        match self.font().filter(|f| f.has_widths()) {
            Some(font) => {
                let advance = bytes
                    .iter()
                    .map(|&code| {
                        let w0 = font.glyph_width(code) / 1000.0;
                        let word = if code == b' ' { state.word_spacing } else { 0.0 };
                        (w0 * state.font_size + state.char_spacing + word) * state.horizontal_scale
                    })
                    .sum();
                Shown {
                    text,
                    advance,
                    measured: true,
                }
            }
            None => {
                let chars = text.chars().count() as f32;
                let advance =
                    (state.font_size * 0.5 + state.char_spacing) * chars * state.horizontal_scale;
                Shown {
                    text,
                    advance,
                    measured: false,
                }
            }
        }
    }

    fn show_array(&self, items: &[Object]) -> Shown {
        let mut combined = Shown {
            text: String::new(),
            advance: 0.0,
            measured: true,
        };

        for item in items {
            match item {
                Object::String(bytes, _) => {
                    let part = self.show_string(bytes);
                    combined.text.push_str(&part.text);
                    combined.advance += part.advance;
                    combined.measured &= part.measured;
                }
                other => {
                    let Some(adjustment) = get_number(other) else {
                        continue;
                    };
                    combined.advance -=
                        adjustment / 1000.0 * self.state.font_size * self.state.horizontal_scale;

                    // Large negative adjustments separate words
                    if -adjustment > TJ_SPACE_THRESHOLD && needs_word_space(&combined.text) {
                        combined.text.push(' ');
                    }
                }
            }
        }

        combined
    }

    /// Record a run at the current position and advance the text matrix.
    fn emit(&mut self, shown: Shown) {
        if !self.in_text_block {
            return;
        }

        let page_matrix = self.text_matrix.tm.multiply(&self.state.ctm);
        let size = self.state.font_size;
        let transform = Matrix::new(size, 0.0, 0.0, size, 0.0, 0.0).multiply(&page_matrix);

        self.text_matrix.advance(shown.advance);

        let text: String = shown.text.nfc().collect();
        if text.trim().is_empty() {
            return;
        }

        let width = if shown.measured {
            shown.advance * page_matrix.x_scale()
        } else {
            0.0
        };
        let font_name = self
            .font()
            .map(|f| f.base_font.clone())
            .unwrap_or_else(|| String::from_utf8_lossy(&self.state.font_key).to_string());

        self.runs
            .push(GlyphRun::new(text, transform, width, font_name, self.page));
    }
}

fn matrix_operand(operands: &[Object]) -> Option<Matrix> {
    if operands.len() < 6 {
        return None;
    }
    let v: Vec<f32> = operands
        .iter()
        .take(6)
        .map(get_number)
        .collect::<Option<_>>()?;
    Some(Matrix::new(v[0], v[1], v[2], v[3], v[4], v[5]))
}

/// Whether a word space should follow `text` (not after existing space
/// or after scripts written without word spaces).
fn needs_word_space(text: &str) -> bool {
    match text.chars().last() {
        Some(c) => !c.is_whitespace() && !is_spaceless_script_char(c),
        None => false,
    }
}

/// Check if character is from a script that doesn't use word spaces.
/// Chinese and Japanese don't use spaces between words, but Korean does.
fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;

    // CJK Unified Ideographs and Extension A
    (0x4E00..=0x9FFF).contains(&code)
    || (0x3400..=0x4DBF).contains(&code)
    // Extensions B-F
    || (0x20000..=0x2EBEF).contains(&code)
    // Hiragana, Katakana
    || (0x3040..=0x30FF).contains(&code)
    // CJK Symbols and Punctuation
    || (0x3000..=0x303F).contains(&code)
}
