//! Page image fallback for pages without extractable text.

use std::io::Cursor;

use image::ImageFormat;

use crate::error::{Error, Result};
use crate::model::ImageRecord;
use crate::parser::{ConvertOptions, PageSize, PdfBackend};

/// CSS pixels per PDF point (96 DPI over 72 DPI).
const PIXELS_PER_POINT: f32 = 96.0 / 72.0;

/// Rasterize a page and wrap it as an image record.
///
/// Any failure here is fatal for the conversion.
pub fn rasterize_page<B: PdfBackend + ?Sized>(
    backend: &B,
    page: u32,
    size: PageSize,
    options: &ConvertOptions,
) -> Result<ImageRecord> {
    let scale = options.effective_raster_scale();
    let bitmap = backend.render(page, scale)?;
    let (pixel_width, pixel_height) = bitmap.dimensions();
    if pixel_width == 0 || pixel_height == 0 {
        return Err(Error::Rasterize {
            page,
            reason: "renderer produced an empty bitmap".to_string(),
        });
    }

    let mut png = Cursor::new(Vec::new());
    bitmap.write_to(&mut png, ImageFormat::Png)?;

    let (display_width, display_height) = display_size(size, options.max_image_width);
    log::info!(
        "Page {}: no text layer, embedding {}x{} px image at {}x{}",
        page,
        pixel_width,
        pixel_height,
        display_width,
        display_height
    );

    Ok(ImageRecord {
        data: png.into_inner(),
        pixel_width,
        pixel_height,
        display_width,
        display_height,
    })
}

/// Displayed size in 96-DPI pixels: the page's natural width capped at
/// `max_width`, height following the page's aspect ratio.
pub fn display_size(size: PageSize, max_width: u32) -> (u32, u32) {
    let natural = (size.width * PIXELS_PER_POINT).round().max(1.0);
    let width = natural.min(max_width.max(1) as f32);
    let height = if size.width > 0.0 {
        (width * size.height / size.width).round().max(1.0)
    } else {
        width
    };
    (width as u32, height as u32)
}
