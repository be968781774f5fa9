//! Conversion options and configuration.

use crate::error::{Error, Result};
use crate::model::Margins;
use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Smallest rasterization scale used by the image fallback.
pub const MIN_RASTER_SCALE: f32 = 2.0;

/// Options for converting PDF documents.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    /// Clustering and encoding strategy
    pub layout_mode: LayoutMode,

    /// Vertical tolerance for row membership, in points
    pub row_tolerance: f32,

    /// Flow mode: gap (in average character widths) above which a tab is emitted
    pub tab_gap_chars: f32,

    /// Flow mode: gap (in average character widths) above which a space is emitted
    pub space_gap_chars: f32,

    /// Absolute mode: gap (in font sizes) at which a new segment starts
    pub segment_gap_em: f32,

    /// Absolute mode: gap (in font sizes) above which merged runs get a space
    pub segment_space_em: f32,

    /// Rasterization scale for image-only pages
    pub raster_scale: f32,

    /// Maximum display width of a fallback image, in 96-DPI pixels
    pub max_image_width: u32,

    /// Output font face for every run
    pub font_family: String,

    /// Page margins for text sections, in twips
    pub text_margins: Margins,

    /// Page margins for image sections, in twips
    pub image_margins: Margins,

    /// Page selection (which pages to convert)
    pub pages: PageSelection,
}

impl ConvertOptions {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the layout mode.
    pub fn with_layout_mode(mut self, mode: LayoutMode) -> Self {
        self.layout_mode = mode;
        self
    }

    /// Use segment clustering with positioned frames.
    pub fn absolute(mut self) -> Self {
        self.layout_mode = LayoutMode::Absolute;
        self
    }

    /// Set the row tolerance in points.
    pub fn with_row_tolerance(mut self, tolerance: f32) -> Self {
        self.row_tolerance = tolerance.max(0.0);
        self
    }

    /// Set the flow-mode tab and space thresholds, in character widths.
    pub fn with_gap_chars(mut self, tab: f32, space: f32) -> Self {
        self.tab_gap_chars = tab;
        self.space_gap_chars = space;
        self
    }

    /// Set the absolute-mode merge and space thresholds, in font sizes.
    pub fn with_segment_gaps(mut self, merge: f32, space: f32) -> Self {
        self.segment_gap_em = merge;
        self.segment_space_em = space;
        self
    }

    /// Set the rasterization scale (never below 2.0).
    pub fn with_raster_scale(mut self, scale: f32) -> Self {
        self.raster_scale = scale.max(MIN_RASTER_SCALE);
        self
    }

    /// Set the maximum fallback image width.
    pub fn with_max_image_width(mut self, px: u32) -> Self {
        self.max_image_width = px.max(1);
        self
    }

    /// Set the output font family.
    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = family.into();
        self
    }

    /// Set text section margins.
    pub fn with_text_margins(mut self, margins: Margins) -> Self {
        self.text_margins = margins;
        self
    }

    /// Set image section margins.
    pub fn with_image_margins(mut self, margins: Margins) -> Self {
        self.image_margins = margins;
        self
    }

    /// Set page selection.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.pages = pages;
        self
    }

    /// Effective rasterization scale.
    pub fn effective_raster_scale(&self) -> f32 {
        self.raster_scale.max(MIN_RASTER_SCALE)
    }
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            layout_mode: LayoutMode::Flow,
            row_tolerance: 3.0,
            tab_gap_chars: 3.0,
            space_gap_chars: 0.2,
            segment_gap_em: 2.0,
            segment_space_em: 0.2,
            raster_scale: MIN_RASTER_SCALE,
            max_image_width: 600,
            font_family: "Arial".to_string(),
            text_margins: Margins::default(),
            image_margins: Margins::uniform(360),
            pages: PageSelection::All,
        }
    }
}

/// Clustering and encoding strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutMode {
    /// Rows become flowing paragraphs with indents and tab stops
    #[default]
    Flow,
    /// Gap-merged segments become page-anchored frames
    Absolute,
}

impl LayoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutMode::Flow => "flow",
            LayoutMode::Absolute => "absolute",
        }
    }
}

impl FromStr for LayoutMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flow" => Ok(LayoutMode::Flow),
            "absolute" | "frames" => Ok(LayoutMode::Absolute),
            other => Err(format!("unknown layout mode '{other}' (expected flow or absolute)")),
        }
    }
}

/// Page selection for conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageSelection {
    /// Convert all pages
    #[default]
    All,
    /// Convert a range of pages (inclusive, 1-indexed)
    Range(RangeInclusive<u32>),
    /// Convert specific pages (1-indexed)
    Pages(Vec<u32>),
    /// Convert a list of pages and ranges, sorted with overlaps merged
    Ranges(Vec<RangeInclusive<u32>>),
}

impl PageSelection {
    /// Parse a page selection string (e.g., "1-10", "1,3,5,7-10").
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || Error::InvalidPageRange(s.to_string());

        if s.is_empty() || s == "all" {
            return Ok(PageSelection::All);
        }

        // Simple range (e.g., "1-10")
        if let Some((start, end)) = s.split_once('-') {
            if !start.contains(',') && !end.contains(',') {
                let start: u32 = start.trim().parse().map_err(|_| invalid())?;
                let end: u32 = end.trim().parse().map_err(|_| invalid())?;
                if start == 0 || start > end {
                    return Err(invalid());
                }
                return Ok(PageSelection::Range(start..=end));
            }
        }

        // Comma-separated list with possible ranges; expanded only in `resolve`
        let mut ranges = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            let (start, end) = match part.split_once('-') {
                Some((a, b)) => (
                    a.trim().parse::<u32>().map_err(|_| invalid())?,
                    b.trim().parse::<u32>().map_err(|_| invalid())?,
                ),
                None => {
                    let p = part.parse::<u32>().map_err(|_| invalid())?;
                    (p, p)
                }
            };
            if start == 0 || start > end {
                return Err(invalid());
            }
            ranges.push(start..=end);
        }

        ranges.sort_by_key(|r| *r.start());
        let mut merged: Vec<RangeInclusive<u32>> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match merged.last_mut() {
                Some(last) if *range.start() <= last.end().saturating_add(1) => {
                    if range.end() > last.end() {
                        let start = *last.start();
                        *last = start..=*range.end();
                    }
                }
                _ => merged.push(range),
            }
        }
        Ok(PageSelection::Ranges(merged))
    }

    /// Resolve the selection against a document, in ascending page order.
    ///
    /// A range may run past the last page and is clipped; a listed page or a
    /// range start beyond the document is an error. The result never holds
    /// more than `total_pages` entries.
    pub fn resolve(&self, total_pages: u32) -> Result<Vec<u32>> {
        match self {
            PageSelection::All => Ok((1..=total_pages).collect()),
            PageSelection::Range(range) => {
                if *range.start() == 0 || *range.start() > total_pages {
                    return Err(Error::PageOutOfRange(*range.start(), total_pages));
                }
                Ok((*range.start()..=(*range.end()).min(total_pages)).collect())
            }
            PageSelection::Pages(pages) => {
                if let Some(&bad) = pages.iter().find(|&&p| p == 0 || p > total_pages) {
                    return Err(Error::PageOutOfRange(bad, total_pages));
                }
                let unique: BTreeSet<u32> = pages.iter().copied().collect();
                Ok(unique.into_iter().collect())
            }
            PageSelection::Ranges(ranges) => {
                let mut pages = BTreeSet::new();
                for range in ranges {
                    let start = *range.start();
                    if start == 0 || start > total_pages {
                        return Err(Error::PageOutOfRange(start, total_pages));
                    }
                    pages.extend(start..=(*range.end()).min(total_pages));
                }
                Ok(pages.into_iter().collect())
            }
        }
    }
}

impl FromStr for PageSelection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PageSelection::parse(s)
    }
}
