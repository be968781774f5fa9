//! Page layout reconstruction.
//!
//! One page at a time: glyph runs are clustered into rows (and, in absolute
//! mode, segments), encoded into paragraph records, or replaced by a page
//! image when the page has no text at all.

mod cluster;
mod encoder;
mod fallback;

pub use cluster::Clusterer;
pub use encoder::{relative_indent, Encoder};
pub use fallback::{display_size, rasterize_page};

use crate::error::Result;
use crate::model::PageSection;
use crate::parser::{ConvertOptions, LayoutMode, PdfBackend};

/// Build the section for one page.
///
/// Nothing computed here outlives the call; pages share no state.
pub fn layout_page<B: PdfBackend + ?Sized>(
    backend: &B,
    page: u32,
    options: &ConvertOptions,
) -> Result<PageSection> {
    let size = backend.page_size(page)?;
    let twips = size.to_twips();

    let runs = backend.text_content(page);
    let run_count = runs.len();
    let clusterer = Clusterer::new(options);
    let rows = clusterer.rows(runs);

    if rows.is_empty() {
        let image = rasterize_page(backend, page, size, options)?;
        return Ok(PageSection::image(page, twips, options.image_margins, image));
    }

    let encoder = Encoder::new(options, size.height);
    let records = match options.layout_mode {
        LayoutMode::Flow => encoder.encode_rows(&rows),
        LayoutMode::Absolute => encoder.encode_segments(&clusterer.segments(&rows)),
    };

    log::debug!(
        "Page {}: {} glyph runs, {} rows, {} {} records",
        page,
        run_count,
        rows.len(),
        records.len(),
        options.layout_mode.as_str()
    );

    Ok(PageSection::paragraphs(
        page,
        twips,
        options.text_margins,
        records,
    ))
}
