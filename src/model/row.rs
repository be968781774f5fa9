//! Clustered structure: rows and segments.

use super::GlyphRun;
use serde::{Deserialize, Serialize};

/// Glyph runs judged to share a baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Representative baseline (the y of the run that opened the row)
    pub y: f32,

    /// Member runs, sorted by ascending x once the row is closed
    pub runs: Vec<GlyphRun>,
}

impl Row {
    /// Open a row with its first run.
    pub fn new(first: GlyphRun) -> Self {
        Self {
            y: first.y(),
            runs: vec![first],
        }
    }

    /// Check whether a baseline falls within `tolerance` of this row.
    pub fn accepts(&self, y: f32, tolerance: f32) -> bool {
        (self.y - y).abs() <= tolerance
    }

    /// Left edge of the row (first run's x).
    pub fn x(&self) -> f32 {
        self.runs.first().map(|r| r.x()).unwrap_or(0.0)
    }

    /// Font size of the first run.
    pub fn font_size(&self) -> f32 {
        self.runs.first().map(|r| r.font_size()).unwrap_or(0.0)
    }

    /// Runs joined with single spaces.
    pub fn text(&self) -> String {
        self.runs
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

/// Gap-merged runs on one row, used for frame positioning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Merged text
    pub text: String,

    /// Left edge in points
    pub x: f32,

    /// Baseline in points
    pub y: f32,

    /// Extent from `x` to the right edge of the last merged run
    pub width: f32,

    /// Font size of the first run
    pub font_size: f32,

    /// Font name of the first run
    pub font_name: String,

    /// Number of glyph runs merged into this segment
    pub run_count: usize,
}

impl Segment {
    /// Start a segment from one run.
    pub fn new(run: &GlyphRun) -> Self {
        Self {
            text: run.text.clone(),
            x: run.x(),
            y: run.y(),
            width: run.effective_width(),
            font_size: run.font_size(),
            font_name: run.font_name.clone(),
            run_count: 1,
        }
    }

    /// Right edge in points.
    pub fn end_x(&self) -> f32 {
        self.x + self.width
    }

    /// Merge a run, optionally separated by one space.
    pub fn absorb(&mut self, run: &GlyphRun, with_space: bool) {
        if with_space {
            self.text.push(' ');
        }
        self.text.push_str(&run.text);
        self.width = self.width.max(run.end_x() - self.x);
        self.run_count += 1;
    }
}
