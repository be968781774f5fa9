//! PDF decoding: the backend seam, glyph extraction and page rasterization.

mod backend;
mod extract;
mod options;
mod pdf_parser;
mod raster;

pub use backend::{decode_text_simple, LopdfBackend, PageId, PageSize, PdfBackend};
pub use options::{ConvertOptions, LayoutMode, PageSelection, MIN_RASTER_SCALE};
