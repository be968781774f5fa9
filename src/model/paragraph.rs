//! Paragraph records: rows and segments projected into Word layout.

use serde::{Deserialize, Serialize};

/// Output length units (twentieths of a point) per PDF point.
pub const TWIPS_PER_POINT: f32 = 20.0;

/// Convert points to twips, rounding to the nearest unit.
pub fn to_twips(points: f32) -> i32 {
    (points * TWIPS_PER_POINT).round() as i32
}

/// One row or segment, ready to be written as a Word paragraph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParagraphRecord {
    /// Text runs and tab separators
    pub content: Vec<Inline>,

    /// Flow indent or absolute frame
    pub placement: Placement,

    /// Tab stops, in the order they were encountered
    pub tab_stops: Vec<TabStop>,

    /// Vertical spacing
    pub spacing: Spacing,
}

impl ParagraphRecord {
    /// Create an empty record with the given placement.
    pub fn new(placement: Placement) -> Self {
        Self {
            content: Vec::new(),
            placement,
            tab_stops: Vec::new(),
            spacing: Spacing::default(),
        }
    }

    /// Add a styled text run.
    pub fn add_run(&mut self, run: TextRun) {
        self.content.push(Inline::Text(run));
    }

    /// Append text, extending the last run when its style matches.
    pub fn push_text(&mut self, text: &str, style: &RunStyle) {
        if let Some(Inline::Text(last)) = self.content.last_mut() {
            if last.style == *style {
                last.text.push_str(text);
                return;
            }
        }
        self.add_run(TextRun::new(text, style.clone()));
    }

    /// Add a tab separator and the stop it advances to.
    pub fn add_tab(&mut self, stop: TabStop) {
        self.content.push(Inline::Tab);
        self.tab_stops.push(stop);
    }

    /// Append a literal space to the last text run.
    pub fn push_space(&mut self) {
        if let Some(Inline::Text(run)) = self.content.last_mut() {
            run.text.push(' ');
        }
    }

    /// Text with tabs rendered as `\t`.
    pub fn plain_text(&self) -> String {
        self.content
            .iter()
            .map(|c| match c {
                Inline::Text(run) => run.text.as_str(),
                Inline::Tab => "\t",
            })
            .collect()
    }

    /// Text runs only.
    pub fn runs(&self) -> impl Iterator<Item = &TextRun> {
        self.content.iter().filter_map(|c| match c {
            Inline::Text(run) => Some(run),
            Inline::Tab => None,
        })
    }

    pub fn is_absolute(&self) -> bool {
        matches!(self.placement, Placement::Absolute(_))
    }
}

/// Inline content within a paragraph record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inline {
    /// A styled text run
    Text(TextRun),

    /// Advance to the next tab stop
    Tab,
}

/// A run of text with one style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    pub style: RunStyle,
}

impl TextRun {
    pub fn new(text: impl Into<String>, style: RunStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// Run formatting in Word terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStyle {
    pub bold: bool,
    pub italic: bool,

    /// Size in half-points (`w:sz`)
    pub half_points: u32,

    /// Normalized output face
    pub font_family: String,
}

impl RunStyle {
    /// Style for a PDF font size in points.
    pub fn sized(font_size: f32, font_family: impl Into<String>) -> Self {
        Self {
            bold: false,
            italic: false,
            half_points: (font_size * 2.0).round().max(1.0) as u32,
            font_family: font_family.into(),
        }
    }

    /// Font size in points.
    pub fn points(&self) -> f32 {
        self.half_points as f32 / 2.0
    }
}

/// How a record is positioned on its page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Placement {
    /// Flowing paragraph with a left indent, in twips from the page edge
    Flow { indent: i32 },

    /// Positioned frame
    Absolute(Frame),
}

/// A page-anchored frame, all values in twips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// A tab stop in twips from the page edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabStop {
    pub position: i32,
    pub alignment: TabAlignment,
}

impl TabStop {
    pub fn left(position: i32) -> Self {
        Self {
            position,
            alignment: TabAlignment::Left,
        }
    }
}

/// Tab stop alignment (`w:tab w:val`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabAlignment {
    #[default]
    Left,
    Center,
    Right,
}

impl TabAlignment {
    /// Value of the `w:val` attribute.
    pub fn as_str(&self) -> &'static str {
        match self {
            TabAlignment::Left => "left",
            TabAlignment::Center => "center",
            TabAlignment::Right => "right",
        }
    }
}

/// Paragraph spacing in twips.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spacing {
    /// Space above the paragraph
    pub before: u32,

    /// Exact line height, if fixed
    pub line: Option<u32>,
}
