//! Line and segment clustering.
//!
//! PDFs position each word or run independently and carry no notion of a
//! line or column. Rows are recovered by baseline proximity; segments by
//! horizontal gaps measured relative to the font size.

use crate::model::{GlyphRun, Row, Segment};
use crate::parser::ConvertOptions;

/// Clustering thresholds for one page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clusterer {
    /// Maximum baseline distance for two runs to share a row, in points
    pub row_tolerance: f32,
    /// A run at or beyond this many font sizes from a segment starts a new one
    pub segment_gap_em: f32,
    /// Merged runs further apart than this many font sizes are joined by a space
    pub segment_space_em: f32,
}

impl Default for Clusterer {
    fn default() -> Self {
        Self::new(&ConvertOptions::default())
    }
}

impl Clusterer {
    pub fn new(options: &ConvertOptions) -> Self {
        Self {
            row_tolerance: options.row_tolerance,
            segment_gap_em: options.segment_gap_em,
            segment_space_em: options.segment_space_em,
        }
    }

    /// Group runs into rows, top of page first, each row sorted left to right.
    ///
    /// Blank runs and runs without a finite position are dropped; every other
    /// run lands in exactly one row.
    pub fn rows(&self, runs: Vec<GlyphRun>) -> Vec<Row> {
        let mut runs: Vec<GlyphRun> = runs
            .into_iter()
            .filter(|r| !r.is_blank() && r.x().is_finite() && r.y().is_finite())
            .collect();
        runs.sort_by(|a, b| b.y().total_cmp(&a.y()));

        let mut rows: Vec<Row> = Vec::new();
        for run in runs {
            // Rows are opened top-down, so the nearest candidate is at the back
            match rows
                .iter_mut()
                .rev()
                .find(|row| row.accepts(run.y(), self.row_tolerance))
            {
                Some(row) => row.runs.push(run),
                None => rows.push(Row::new(run)),
            }
        }

        for row in &mut rows {
            row.runs.sort_by(|a, b| a.x().total_cmp(&b.x()));
        }

        rows
    }

    /// Merge the runs of each row into gap-separated segments.
    ///
    /// Walks rows top-down and runs left to right. A run joins the current
    /// segment when its gap to the segment's right edge is strictly below
    /// `segment_gap_em` of its font size.
    pub fn segments(&self, rows: &[Row]) -> Vec<Segment> {
        let mut segments = Vec::new();

        for row in rows {
            let mut current: Option<Segment> = None;

            for run in &row.runs {
                let size = run.font_size();
                match current.as_mut() {
                    Some(seg) if run.x() - seg.end_x() < self.segment_gap_em * size => {
                        let gap = run.x() - seg.end_x();
                        let with_space = gap > self.segment_space_em * size
                            && !seg.text.ends_with(char::is_whitespace)
                            && !run.text.starts_with(char::is_whitespace);
                        seg.absorb(run, with_space);
                    }
                    _ => {
                        segments.extend(current.replace(Segment::new(run)));
                    }
                }
            }

            segments.extend(current);
        }

        segments
    }
}
