//! Page sections.

use super::ParagraphRecord;
use serde::{Deserialize, Serialize};

/// One output section, built from exactly one PDF page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSection {
    /// Source page number (1-indexed)
    pub number: u32,

    /// Page width in twips
    pub width: u32,

    /// Page height in twips
    pub height: u32,

    /// Page margins
    pub margins: Margins,

    /// Text records or the fallback image
    pub content: SectionContent,
}

impl PageSection {
    /// Section holding text records.
    pub fn paragraphs(
        number: u32,
        size: (u32, u32),
        margins: Margins,
        records: Vec<ParagraphRecord>,
    ) -> Self {
        Self {
            number,
            width: size.0,
            height: size.1,
            margins,
            content: SectionContent::Paragraphs(records),
        }
    }

    /// Section holding a single page image.
    pub fn image(number: u32, size: (u32, u32), margins: Margins, image: ImageRecord) -> Self {
        Self {
            number,
            width: size.0,
            height: size.1,
            margins,
            content: SectionContent::Image(image),
        }
    }

    /// Number of content records (1 for an image section).
    pub fn record_count(&self) -> usize {
        match &self.content {
            SectionContent::Paragraphs(records) => records.len(),
            SectionContent::Image(_) => 1,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.content, SectionContent::Image(_))
    }

    /// Paragraph records, empty for an image section.
    pub fn records(&self) -> &[ParagraphRecord] {
        match &self.content {
            SectionContent::Paragraphs(records) => records,
            SectionContent::Image(_) => &[],
        }
    }

    /// Get plain text content of the section.
    pub fn plain_text(&self) -> String {
        self.records()
            .iter()
            .map(|p| p.plain_text())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Content of a section: text or one fallback image, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "records", rename_all = "snake_case")]
pub enum SectionContent {
    Paragraphs(Vec<ParagraphRecord>),
    Image(ImageRecord),
}

/// Page margins in twips.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Margins {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl Margins {
    /// Same margin on every side.
    pub const fn uniform(twips: u32) -> Self {
        Self {
            top: twips,
            right: twips,
            bottom: twips,
            left: twips,
        }
    }
}

/// A rasterized page embedded as the section's only content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// PNG bytes
    #[serde(skip)]
    pub data: Vec<u8>,

    /// Bitmap width in pixels
    pub pixel_width: u32,

    /// Bitmap height in pixels
    pub pixel_height: u32,

    /// Displayed width in 96-DPI pixels
    pub display_width: u32,

    /// Displayed height in 96-DPI pixels
    pub display_height: u32,
}

impl ImageRecord {
    /// English Metric Units per 96-DPI pixel.
    pub const EMU_PER_PIXEL: u64 = 9525;

    /// Display size in EMU.
    pub fn extent_emu(&self) -> (u64, u64) {
        (
            self.display_width as u64 * Self::EMU_PER_PIXEL,
            self.display_height as u64 * Self::EMU_PER_PIXEL,
        )
    }

    /// Display aspect ratio (height / width).
    pub fn aspect(&self) -> f64 {
        if self.display_width == 0 {
            return 0.0;
        }
        self.display_height as f64 / self.display_width as f64
    }
}
