//! Layout encoding: rows and segments to paragraph records.
//!
//! Each row or segment becomes exactly one [`ParagraphRecord`]. Records carry
//! their own position, styling and tab stops, so none depends on a sibling
//! for rendering.

use crate::model::{
    to_twips, FontStyle, Frame, GlyphRun, Margins, ParagraphRecord, Placement, Row, RunStyle,
    Segment, Spacing, TabStop, TWIPS_PER_POINT,
};
use crate::parser::ConvertOptions;

/// Line height as a multiple of the font size.
const LINE_HEIGHT_EM: f32 = 1.2;

/// Distance from baseline to the top of a frame, as a multiple of the font size.
const ASCENT_EM: f32 = 0.8;

/// Encodes the clustered structure of one page.
#[derive(Debug, Clone)]
pub struct Encoder<'a> {
    options: &'a ConvertOptions,
    /// Page height in points
    page_height: f32,
}

impl<'a> Encoder<'a> {
    pub fn new(options: &'a ConvertOptions, page_height: f32) -> Self {
        Self {
            options,
            page_height,
        }
    }

    /// Encode rows as flowing paragraphs with indents and tab stops.
    pub fn encode_rows(&self, rows: &[Row]) -> Vec<ParagraphRecord> {
        let mut records = Vec::with_capacity(rows.len());
        let mut previous: Option<&Row> = None;

        for row in rows {
            let mut record = self.encode_row(row);
            record.spacing = self.flow_spacing(row, previous);
            records.push(record);
            previous = Some(row);
        }

        records
    }

    /// Encode one row, without vertical spacing.
    pub fn encode_row(&self, row: &Row) -> ParagraphRecord {
        let mut record = ParagraphRecord::new(Placement::Flow {
            indent: to_twips(row.x()),
        });
        let mut prev: Option<&GlyphRun> = None;

        for run in &row.runs {
            if let Some(p) = prev {
                let gap = run.x() - p.end_x();
                let char_width = p.avg_char_width();

                if gap > self.options.tab_gap_chars * char_width {
                    record.add_tab(TabStop::left(to_twips(run.x())));
                } else if gap > self.options.space_gap_chars * char_width
                    && !p.text.ends_with(char::is_whitespace)
                    && !run.text.starts_with(char::is_whitespace)
                {
                    record.push_space();
                }
            }

            record.push_text(&run.text, &self.run_style(run.font_size(), &run.font_name));
            prev = Some(run);
        }

        record
    }

    /// Encode segments as page-anchored frames.
    pub fn encode_segments(&self, segments: &[Segment]) -> Vec<ParagraphRecord> {
        segments.iter().map(|s| self.encode_segment(s)).collect()
    }

    pub fn encode_segment(&self, segment: &Segment) -> ParagraphRecord {
        let size = segment.font_size;
        let frame = Frame {
            x: to_twips(segment.x),
            y: to_twips((self.page_height - segment.y - size * ASCENT_EM).max(0.0)),
            width: to_twips(segment.width + size),
            height: to_twips(size * LINE_HEIGHT_EM),
        };

        let mut record = ParagraphRecord::new(Placement::Absolute(frame));
        record.push_text(&segment.text, &self.run_style(size, &segment.font_name));
        record
    }

    fn run_style(&self, font_size: f32, font_name: &str) -> RunStyle {
        let FontStyle { bold, italic } = FontStyle::from_font_name(font_name);
        RunStyle {
            bold,
            italic,
            ..RunStyle::sized(font_size, self.options.font_family.as_str())
        }
    }

    /// Space above a flow paragraph so its baseline lands near the PDF one.
    fn flow_spacing(&self, row: &Row, previous: Option<&Row>) -> Spacing {
        let size = row.font_size();
        let before = match previous {
            None => {
                let top_margin = self.options.text_margins.top as f32 / TWIPS_PER_POINT;
                self.page_height - row.y - size - top_margin
            }
            Some(prev) => (prev.y - row.y) - prev.font_size() * LINE_HEIGHT_EM,
        };

        Spacing {
            before: to_twips(before.max(0.0)) as u32,
            line: Some(to_twips(size * LINE_HEIGHT_EM).max(1) as u32),
        }
    }
}

/// Left indent relative to the text area, clamped at zero.
pub fn relative_indent(indent: i32, margins: &Margins) -> i32 {
    (indent - margins.left as i32).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Clusterer;
    use crate::model::Inline;

    fn rows(runs: Vec<GlyphRun>) -> Vec<Row> {
        Clusterer::default().rows(runs)
    }

    #[test]
    fn test_single_run_paragraph() {
        let options = ConvertOptions::default();
        let encoder = Encoder::new(&options, 792.0);
        let records = encoder.encode_rows(&rows(vec![GlyphRun::at("Hello", 72.0, 700.0, 12.0)]));

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.plain_text(), "Hello");
        assert_eq!(record.placement, Placement::Flow { indent: 1440 });
        assert!(record.tab_stops.is_empty());

        let run = record.runs().next().unwrap();
        assert!(!run.style.bold);
        assert!(!run.style.italic);
        assert_eq!(run.style.half_points, 24);
        assert_eq!(run.style.font_family, "Arial");

        // 792 - 700 - 12 = 80pt above the first line
        assert_eq!(record.spacing.before, 1600);
        assert_eq!(record.spacing.line, Some(288));
    }

    #[test]
    fn test_wide_gap_becomes_tab() {
        let options = ConvertOptions::default();
        let encoder = Encoder::new(&options, 792.0);
        let records = encoder.encode_rows(&rows(vec![
            GlyphRun::at("Name:", 72.0, 700.0, 12.0),
            GlyphRun::at("John Doe", 250.0, 700.0, 12.0),
        ]));

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].plain_text(), "Name:\tJohn Doe");
        assert_eq!(records[0].tab_stops, vec![TabStop::left(5000)]);
        assert!(matches!(records[0].content[1], Inline::Tab));
    }

    #[test]
    fn test_small_gap_becomes_space() {
        let options = ConvertOptions::default();
        let encoder = Encoder::new(&options, 792.0);
        // "Hello" ends at 102, gap of 4pt with a 6pt character width
        let records = encoder.encode_rows(&rows(vec![
            GlyphRun::at("Hello", 72.0, 700.0, 12.0),
            GlyphRun::at("world", 106.0, 700.0, 12.0),
            GlyphRun::at("!", 136.0, 700.0, 12.0),
        ]));

        assert_eq!(records[0].plain_text(), "Hello world!");
        assert_eq!(records[0].runs().count(), 1);
    }

    #[test]
    fn test_style_from_font_name() {
        let options = ConvertOptions::default().with_font_family("Calibri");
        let encoder = Encoder::new(&options, 792.0);
        let records = encoder.encode_rows(&rows(vec![
            GlyphRun::at("Bold", 72.0, 700.0, 10.0).with_font("ABCDEF+Arial-BoldMT"),
            GlyphRun::at("Slanted", 200.0, 700.0, 10.0).with_font("Times-Italic"),
        ]));

        let styles: Vec<&RunStyle> = records[0].runs().map(|r| &r.style).collect();
        assert_eq!(styles.len(), 2);
        assert!(styles[0].bold && !styles[0].italic);
        assert!(!styles[1].bold && styles[1].italic);
        assert!(styles.iter().all(|s| s.font_family == "Calibri"));
    }

    #[test]
    fn test_flow_spacing_between_rows() {
        let options = ConvertOptions::default();
        let encoder = Encoder::new(&options, 792.0);
        let records = encoder.encode_rows(&rows(vec![
            GlyphRun::at("First", 72.0, 700.0, 10.0),
            GlyphRun::at("Second", 72.0, 670.0, 10.0),
            // Overlapping line: spacing clamps at zero
            GlyphRun::at("Third", 72.0, 665.0, 10.0),
        ]));

        assert_eq!(records.len(), 3);
        // 30pt apart minus a 12pt line
        assert_eq!(records[1].spacing.before, 360);
        assert_eq!(records[2].spacing.before, 0);
    }

    #[test]
    fn test_first_spacing_respects_top_margin() {
        let options = ConvertOptions::default().with_text_margins(Margins::uniform(720));
        let encoder = Encoder::new(&options, 792.0);
        let records = encoder.encode_rows(&rows(vec![GlyphRun::at("Top", 72.0, 700.0, 12.0)]));
        // 80pt - 36pt margin
        assert_eq!(records[0].spacing.before, 880);
    }

    #[test]
    fn test_segment_frame() {
        let options = ConvertOptions::default().absolute();
        let encoder = Encoder::new(&options, 792.0);
        let run = GlyphRun::at("Total", 100.0, 700.0, 10.0).with_width(40.0);
        let record = encoder.encode_segment(&Segment::new(&run));

        assert_eq!(
            record.placement,
            Placement::Absolute(Frame {
                x: 2000,
                y: 1680,
                width: 1000,
                height: 240,
            })
        );
        assert_eq!(record.plain_text(), "Total");
        assert!(record.tab_stops.is_empty());
    }

    #[test]
    fn test_segment_frame_clamps_at_page_top() {
        let options = ConvertOptions::default().absolute();
        let encoder = Encoder::new(&options, 100.0);
        let run = GlyphRun::at("Header", 10.0, 98.0, 10.0);
        let record = encoder.encode_segment(&Segment::new(&run));

        match record.placement {
            Placement::Absolute(frame) => assert_eq!(frame.y, 0),
            other => panic!("expected frame, got {:?}", other),
        }
    }

    #[test]
    fn test_relative_indent() {
        assert_eq!(relative_indent(1440, &Margins::uniform(360)), 1080);
        assert_eq!(relative_indent(100, &Margins::uniform(360)), 0);
    }
}
