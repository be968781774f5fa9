//! Page rasterizer for image-only pages.
//!
//! Scanned PDFs draw one or a few image XObjects and nothing else, so this
//! renderer composites images only: it tracks the CTM through `q`/`Q`/`cm`,
//! follows form XObjects, and ignores text and vector paths.

use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgba, RgbaImage};
use lopdf::{Dictionary, Document as LopdfDocument, Object, Stream};

use crate::error::{Error, Result};
use crate::model::Matrix;

use super::backend::{get_number, page_content, resolve, PageId, PageSize};
use super::pdf_parser::page_resources;

/// Largest canvas side we are willing to allocate, in pixels.
const MAX_CANVAS_SIDE: u32 = 16_384;

/// Form XObjects nested deeper than this are not followed.
const MAX_FORM_DEPTH: usize = 8;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Render a page at `scale` pixels per point onto a white canvas.
pub fn render_page(
    doc: &LopdfDocument,
    page_id: PageId,
    page: u32,
    size: PageSize,
    scale: f32,
) -> Result<RgbaImage> {
    let width = (size.width * scale).ceil();
    let height = (size.height * scale).ceil();
    if !(width >= 1.0 && height >= 1.0)
        || width > MAX_CANVAS_SIDE as f32
        || height > MAX_CANVAS_SIDE as f32
    {
        return Err(Error::Rasterize {
            page,
            reason: format!("cannot allocate a {}x{} canvas", width, height),
        });
    }

    let mut canvas = RgbaImage::from_pixel(width as u32, height as u32, WHITE);

    let content = match page_content(doc, page_id) {
        Ok(content) => content,
        Err(e) => {
            log::debug!("Page {} has no drawable content ({}), rendering blank", page, e);
            return Ok(canvas);
        }
    };

    // PDF space is y-up from the bottom-left; pixels are y-down from the top-left
    let device = Matrix::new(scale, 0.0, 0.0, -scale, 0.0, size.height * scale);

    let mut painter = Painter {
        doc,
        page,
        canvas: &mut canvas,
        device,
        drawn: 0,
    };
    painter.run(&content, page_resources(doc, page_id), Matrix::IDENTITY, 0)?;

    log::debug!(
        "Page {}: rasterized {}x{} px, {} image(s) drawn",
        page,
        width,
        height,
        painter.drawn
    );
    Ok(canvas)
}

struct Painter<'a> {
    doc: &'a LopdfDocument,
    page: u32,
    canvas: &'a mut RgbaImage,
    device: Matrix,
    drawn: usize,
}

impl Painter<'_> {
    fn run(
        &mut self,
        content: &[u8],
        resources: Option<&Dictionary>,
        base_ctm: Matrix,
        depth: usize,
    ) -> Result<()> {
        let operations = lopdf::content::Content::decode(content)
            .map_err(|e| Error::Rasterize {
                page: self.page,
                reason: format!("undecodable content stream: {}", e),
            })?
            .operations;

        let mut ctm = base_ctm;
        let mut stack: Vec<Matrix> = Vec::new();

        for op in &operations {
            match op.operator.as_str() {
                "q" => stack.push(ctm),
                "Q" => {
                    if let Some(saved) = stack.pop() {
                        ctm = saved;
                    }
                }
                "cm" => {
                    if let Some(m) = matrix_from(&op.operands) {
                        ctm = m.multiply(&ctm);
                    }
                }
                "Do" => {
                    if let Some(Object::Name(name)) = op.operands.first() {
                        self.draw_xobject(name, resources, ctm, depth)?;
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn draw_xobject(
        &mut self,
        name: &[u8],
        resources: Option<&Dictionary>,
        ctm: Matrix,
        depth: usize,
    ) -> Result<()> {
        let doc = self.doc;
        let stream = resources
            .and_then(|res| res.get(b"XObject").ok())
            .and_then(|x| resolve(doc, x).as_dict().ok())
            .and_then(|xobjects| xobjects.get(name).ok())
            .and_then(|obj| resolve(doc, obj).as_stream().ok());

        let Some(stream) = stream else {
            log::warn!(
                "Page {}: XObject /{} not found",
                self.page,
                String::from_utf8_lossy(name)
            );
            return Ok(());
        };

        match stream.dict.get(b"Subtype").and_then(|s| s.as_name()) {
            Ok(b"Image") => {
                match decode_image(doc, stream) {
                    Ok(img) => self.composite(&img, ctm),
                    Err(reason) => log::warn!(
                        "Page {}: skipping image /{}: {}",
                        self.page,
                        String::from_utf8_lossy(name),
                        reason
                    ),
                }
                Ok(())
            }
            Ok(b"Form") if depth < MAX_FORM_DEPTH => {
                let form_matrix = stream
                    .dict
                    .get(b"Matrix")
                    .ok()
                    .and_then(|m| m.as_array().ok())
                    .and_then(|arr| matrix_from(arr))
                    .unwrap_or(Matrix::IDENTITY);
                let form_resources = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|r| resolve(doc, r).as_dict().ok())
                    .or(resources);
                let content = stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone());
                self.run(
                    &content,
                    form_resources,
                    form_matrix.multiply(&ctm),
                    depth + 1,
                )
            }
            _ => Ok(()),
        }
    }

    /// Draw an image into the device-space box of the unit square under `ctm`.
    fn composite(&mut self, img: &RgbaImage, ctm: Matrix) {
        let m = ctm.multiply(&self.device);
        let corners = [
            m.apply(0.0, 0.0),
            m.apply(1.0, 0.0),
            m.apply(0.0, 1.0),
            m.apply(1.0, 1.0),
        ];
        let min_x = corners.iter().map(|c| c.0).fold(f32::INFINITY, f32::min);
        let max_x = corners.iter().map(|c| c.0).fold(f32::NEG_INFINITY, f32::max);
        let min_y = corners.iter().map(|c| c.1).fold(f32::INFINITY, f32::min);
        let max_y = corners.iter().map(|c| c.1).fold(f32::NEG_INFINITY, f32::max);

        let span_x = max_x - min_x;
        let span_y = max_y - min_y;
        if span_x.round() < 1.0 || span_y.round() < 1.0 {
            return;
        }

        // Only the part of the image box that lands on the canvas is resampled
        let visible_x0 = min_x.max(0.0);
        let visible_x1 = max_x.min(self.canvas.width() as f32);
        let visible_y0 = min_y.max(0.0);
        let visible_y1 = max_y.min(self.canvas.height() as f32);
        let target_w = (visible_x1 - visible_x0).round();
        let target_h = (visible_y1 - visible_y0).round();
        if target_w < 1.0 || target_h < 1.0 {
            return;
        }

        let flip_h = m.a < 0.0;
        // Image row 0 is the top of the unit square; with a y-down device
        // matrix that is already the top unless the CTM flips it
        let flip_v = m.d > 0.0;

        let (u0, u1) = source_span(
            (visible_x0 - min_x) / span_x,
            (visible_x1 - min_x) / span_x,
            flip_h,
            img.width(),
        );
        let (v0, v1) = source_span(
            (visible_y0 - min_y) / span_y,
            (visible_y1 - min_y) / span_y,
            flip_v,
            img.height(),
        );
        let source = imageops::crop_imm(img, u0, v0, u1 - u0, v1 - v0).to_image();

        let mut placed =
            imageops::resize(&source, target_w as u32, target_h as u32, FilterType::Triangle);
        if flip_h {
            placed = imageops::flip_horizontal(&placed);
        }
        if flip_v {
            placed = imageops::flip_vertical(&placed);
        }

        imageops::overlay(
            &mut *self.canvas,
            &placed,
            visible_x0.round() as i64,
            visible_y0.round() as i64,
        );
        self.drawn += 1;
    }
}

/// Source pixel range `[start, end)` covering the fraction `f0..f1` of the
/// placed image, reading from the far edge when the placement is mirrored.
fn source_span(f0: f32, f1: f32, flipped: bool, size: u32) -> (u32, u32) {
    let (f0, f1) = if flipped { (1.0 - f1, 1.0 - f0) } else { (f0, f1) };
    let start = ((f0 * size as f32).floor().max(0.0) as u32).min(size - 1);
    let end = ((f1 * size as f32).ceil() as u32).clamp(start + 1, size);
    (start, end)
}

fn matrix_from(operands: &[Object]) -> Option<Matrix> {
    if operands.len() < 6 {
        return None;
    }
    let v: Vec<f32> = operands
        .iter()
        .take(6)
        .map(get_number)
        .collect::<Option<_>>()?;
    Some(Matrix::new(v[0], v[1], v[2], v[3], v[4], v[5]))
}

/// Decode an image XObject to RGBA.
fn decode_image(doc: &LopdfDocument, stream: &Stream) -> std::result::Result<RgbaImage, String> {
    let dict = &stream.dict;
    let int = |key: &[u8]| {
        dict.get(key)
            .ok()
            .and_then(|o| get_number(resolve(doc, o)))
            .map(|n| n.max(0.0) as u32)
    };

    let filters = filter_names(doc, dict);
    if filters.iter().any(|f| f == "DCTDecode") {
        let jpeg = if filters.len() > 1 {
            stream.decompressed_content().map_err(|e| e.to_string())?
        } else {
            stream.content.clone()
        };
        return image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg)
            .map(|img| img.to_rgba8())
            .map_err(|e| format!("JPEG decode failed: {}", e));
    }
    if let Some(unsupported) = filters
        .iter()
        .find(|f| !matches!(f.as_str(), "FlateDecode" | "LZWDecode"))
    {
        return Err(format!("unsupported filter {}", unsupported));
    }

    let width = int(b"Width").ok_or("missing /Width")?;
    let height = int(b"Height").ok_or("missing /Height")?;
    if width == 0 || height == 0 {
        return Err("empty image".to_string());
    }
    if width > MAX_CANVAS_SIDE || height > MAX_CANVAS_SIDE {
        return Err(format!("image too large: {}x{}", width, height));
    }

    let data = if filters.is_empty() {
        stream.content.clone()
    } else {
        stream.decompressed_content().map_err(|e| e.to_string())?
    };

    let is_mask = dict
        .get(b"ImageMask")
        .ok()
        .and_then(|o| o.as_bool().ok())
        .unwrap_or(false);
    let bits = if is_mask { 1 } else { int(b"BitsPerComponent").unwrap_or(8) };
    let components = if is_mask { 1 } else { color_components(doc, dict)? };

    let pixels = (width as usize)
        .checked_mul(height as usize)
        .ok_or("image dimensions overflow")?;
    let row_bytes = match bits {
        8 => (width as usize).checked_mul(components as usize),
        1 => Some((width as usize).div_ceil(8)),
        _ => None,
    };
    let needed = row_bytes.and_then(|r| r.checked_mul(height as usize));
    match needed {
        Some(needed) if data.len() < needed => {
            return Err(format!(
                "short image data: {} bytes for {}x{} at {} bpc x {} components",
                data.len(),
                width,
                height,
                bits,
                components
            ))
        }
        _ => {}
    }

    match (bits, components) {
        (8, 1 | 3 | 4) => {
            let stride = components as usize;
            let mut rgba = Vec::with_capacity(pixels * 4);
            for px in data.chunks_exact(stride).take(pixels) {
                rgba.extend_from_slice(&sample_to_rgba(px));
            }
            RgbaImage::from_raw(width, height, rgba)
                .ok_or_else(|| "pixel buffer size mismatch".to_string())
        }
        (1, 1) => {
            let row_bytes = (width as usize).div_ceil(8);
            let mut rgba = Vec::with_capacity(pixels * 4);
            for row in data.chunks_exact(row_bytes).take(height as usize) {
                for x in 0..width as usize {
                    let bit = (row[x / 8] >> (7 - (x % 8))) & 1;
                    rgba.extend_from_slice(&match (is_mask, bit) {
                        // Stencil masks paint where the sample is 0
                        (true, 0) => [0, 0, 0, 255],
                        (true, _) => [0, 0, 0, 0],
                        (false, 0) => [0, 0, 0, 255],
                        (false, _) => [255, 255, 255, 255],
                    });
                }
            }
            RgbaImage::from_raw(width, height, rgba)
                .ok_or_else(|| "pixel buffer size mismatch".to_string())
        }
        (bits, components) => Err(format!(
            "unsupported sample layout: {} bpc x {} components",
            bits, components
        )),
    }
}

fn filter_names(doc: &LopdfDocument, dict: &Dictionary) -> Vec<String> {
    match dict.get(b"Filter").map(|f| resolve(doc, f)) {
        Ok(Object::Name(n)) => vec![String::from_utf8_lossy(n).to_string()],
        Ok(Object::Array(arr)) => arr
            .iter()
            .filter_map(|o| o.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).to_string())
            .collect(),
        _ => Vec::new(),
    }
}

/// Number of color components of the image's color space.
fn color_components(doc: &LopdfDocument, dict: &Dictionary) -> std::result::Result<u32, String> {
    let cs = match dict.get(b"ColorSpace") {
        Ok(obj) => resolve(doc, obj),
        Err(_) => return Ok(3),
    };

    let (family, param) = match cs {
        Object::Name(n) => (n.as_slice(), None),
        Object::Array(arr) => match arr.first().and_then(|o| o.as_name().ok()) {
            Some(n) => (n, arr.get(1)),
            None => return Err("malformed color space".to_string()),
        },
        _ => return Err("malformed color space".to_string()),
    };

    match family {
        b"DeviceGray" | b"CalGray" | b"G" => Ok(1),
        b"DeviceRGB" | b"CalRGB" | b"RGB" => Ok(3),
        b"DeviceCMYK" | b"CMYK" => Ok(4),
        b"ICCBased" => {
            let n = param
                .map(|p| resolve(doc, p))
                .and_then(|p| p.as_stream().ok())
                .and_then(|s| s.dict.get(b"N").ok())
                .and_then(get_number);
            match n {
                None => Ok(3),
                Some(n) if n == 1.0 || n == 3.0 || n == 4.0 => Ok(n as u32),
                Some(n) => Err(format!("unsupported ICC component count {}", n)),
            }
        }
        other => Err(format!(
            "unsupported color space {}",
            String::from_utf8_lossy(other)
        )),
    }
}

/// Convert one 8-bit sample (gray, RGB or CMYK) to RGBA.
fn sample_to_rgba(px: &[u8]) -> [u8; 4] {
    match *px {
        [g] => [g, g, g, 255],
        [r, g, b] => [r, g, b, 255],
        [c, m, y, k] => {
            let (r, g, b) = cmyk_to_rgb(
                c as f32 / 255.0,
                m as f32 / 255.0,
                y as f32 / 255.0,
                k as f32 / 255.0,
            );
            [
                (r * 255.0).round() as u8,
                (g * 255.0).round() as u8,
                (b * 255.0).round() as u8,
                255,
            ]
        }
        _ => [128, 128, 128, 255],
    }
}

/// Convert CMYK to RGB.
fn cmyk_to_rgb(c: f32, m: f32, y: f32, k: f32) -> (f32, f32, f32) {
    let r = (1.0 - c) * (1.0 - k);
    let g = (1.0 - m) * (1.0 - k);
    let b = (1.0 - y) * (1.0 - k);
    (r, g, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::dictionary;

    /// A page of `w`x`h` points drawing `image` stretched over `rect`.
    fn page_with_image(w: i64, h: i64, image: Stream, rect: [i64; 4]) -> (LopdfDocument, PageId) {
        let mut doc = LopdfDocument::with_version("1.5");
        let pages_id = doc.new_object_id();
        let image_id = doc.add_object(image);
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        rect[2].into(),
                        0.into(),
                        0.into(),
                        rect[3].into(),
                        rect[0].into(),
                        rect[1].into(),
                    ],
                ),
                Operation::new("Do", vec!["Im1".into()]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im1" => image_id },
            },
            "MediaBox" => vec![0.into(), 0.into(), w.into(), h.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        (doc, page_id)
    }

    fn gray_image(w: i64, h: i64, value: u8) -> Stream {
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => w,
                "Height" => h,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            vec![value; (w * h) as usize],
        )
    }

    #[test]
    fn test_render_places_image() {
        let (doc, page_id) = page_with_image(200, 100, gray_image(2, 2, 0), [10, 20, 100, 50]);
        let size = PageSize::new(200.0, 100.0);
        let canvas = render_page(&doc, page_id, 1, size, 2.0).unwrap();

        assert_eq!(canvas.dimensions(), (400, 200));
        // Image spans x 20..220, y (100-70)*2=60 .. (100-20)*2=160
        assert_eq!(canvas.get_pixel(100, 100), &Rgba([0, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(5, 5), &WHITE);
        assert_eq!(canvas.get_pixel(300, 100), &WHITE);
        assert_eq!(canvas.get_pixel(100, 40), &WHITE);
    }

    #[test]
    fn test_render_skips_unsupported_image() {
        let mut image = gray_image(2, 2, 0);
        image.dict.set("Filter", "JPXDecode");
        let (doc, page_id) = page_with_image(100, 100, image, [0, 0, 100, 100]);

        let canvas = render_page(&doc, page_id, 1, PageSize::new(100.0, 100.0), 2.0).unwrap();
        assert!(canvas.pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn test_render_rejects_empty_page() {
        let (doc, page_id) = page_with_image(0, 0, gray_image(1, 1, 0), [0, 0, 1, 1]);
        let err = render_page(&doc, page_id, 3, PageSize::new(0.0, 0.0), 2.0).unwrap_err();
        assert!(matches!(err, Error::Rasterize { page: 3, .. }));
    }

    #[test]
    fn test_decode_one_bit_image() {
        let doc = LopdfDocument::with_version("1.5");
        let stream = Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 3,
                "Height" => 1,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 1,
            },
            vec![0b0100_0000],
        );
        let img = decode_image(&doc, &stream).unwrap();
        assert_eq!(img.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
        assert_eq!(img.get_pixel(1, 0), &Rgba([255, 255, 255, 255]));
        assert_eq!(img.get_pixel(2, 0), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_decode_short_data_is_error() {
        let doc = LopdfDocument::with_version("1.5");
        let mut stream = gray_image(4, 4, 0);
        stream.set_content(vec![0; 3]);
        assert!(decode_image(&doc, &stream).is_err());
    }

    #[test]
    fn test_decode_rejects_oversized_dimensions() {
        let doc = LopdfDocument::with_version("1.5");
        let mut stream = gray_image(4, 4, 0);
        stream.dict.set("Width", 2_000_000_000i64);
        stream.dict.set("Height", 2_000_000_000i64);
        let err = decode_image(&doc, &stream).unwrap_err();
        assert!(err.contains("too large"));
    }

    fn icc_image(doc: &mut LopdfDocument, n: i64) -> Stream {
        let profile = doc.add_object(Stream::new(dictionary! { "N" => n }, Vec::new()));
        let mut image = gray_image(2, 2, 0);
        image.set_content(vec![0; 16]);
        image.dict.set(
            "ColorSpace",
            vec![Object::Name(b"ICCBased".to_vec()), profile.into()],
        );
        image
    }

    #[test]
    fn test_decode_icc_component_counts() {
        let mut doc = LopdfDocument::with_version("1.5");
        for n in [0, 2, 5] {
            let image = icc_image(&mut doc, n);
            let err = decode_image(&doc, &image).unwrap_err();
            assert!(err.contains("ICC component count"), "N={}: {}", n, err);
        }

        let image = icc_image(&mut doc, 4);
        let img = decode_image(&doc, &image).unwrap();
        assert_eq!(img.dimensions(), (2, 2));
        assert_eq!(img.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_render_clips_image_to_canvas() {
        let (doc, page_id) = page_with_image(
            100,
            100,
            gray_image(2, 2, 0),
            [-100_000, -100_000, 1_000_000, 1_000_000],
        );
        let canvas = render_page(&doc, page_id, 1, PageSize::new(100.0, 100.0), 2.0).unwrap();

        assert_eq!(canvas.dimensions(), (200, 200));
        assert!(canvas.pixels().all(|p| *p == Rgba([0, 0, 0, 255])));
    }

    #[test]
    fn test_render_clips_partially_visible_image() {
        // black | white | black | black over x -50..150; only the middle two show
        let mut image = gray_image(4, 1, 0);
        image.set_content(vec![0, 255, 0, 0]);
        let (doc, page_id) = page_with_image(100, 100, image, [-50, 0, 200, 100]);
        let canvas = render_page(&doc, page_id, 1, PageSize::new(100.0, 100.0), 1.0).unwrap();

        assert_eq!(canvas.get_pixel(10, 50), &Rgba([255, 255, 255, 255]));
        assert_eq!(canvas.get_pixel(90, 50), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_cmyk_to_rgb() {
        assert_eq!(sample_to_rgba(&[0, 0, 0, 0]), [255, 255, 255, 255]);
        assert_eq!(sample_to_rgba(&[0, 0, 0, 255]), [0, 0, 0, 255]);
        assert_eq!(sample_to_rgba(&[255, 0, 0, 0]), [0, 255, 255, 255]);
    }
}
