//! Layout model for PDF-to-Word reconstruction.
//!
//! Types flow leaf to root: [`GlyphRun`]s are clustered into [`Row`]s or
//! [`Segment`]s, encoded into [`ParagraphRecord`]s, collected into one
//! [`PageSection`] per page and finally into an [`OutputDocument`].

mod document;
mod glyph;
mod paragraph;
mod row;
mod section;

pub use document::{Metadata, OutputDocument};
pub use glyph::{FontStyle, GlyphRun, Matrix};
pub use paragraph::{
    to_twips, Frame, Inline, ParagraphRecord, Placement, RunStyle, Spacing, TabAlignment, TabStop,
    TextRun, TWIPS_PER_POINT,
};
pub use row::{Row, Segment};
pub use section::{ImageRecord, Margins, PageSection, SectionContent};
