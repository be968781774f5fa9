//! PDF backend abstraction layer.
//!
//! The conversion pipeline only needs four capabilities from a PDF decoder:
//! page enumeration, page geometry, positioned text and a page bitmap.
//! [`PdfBackend`] captures exactly that, so the layout code never sees a
//! concrete PDF library type and tests can drive it with synthetic pages.

use std::collections::BTreeMap;
use std::path::Path;

use image::RgbaImage;
use lopdf::{Document as LopdfDocument, Object};

use crate::error::{Error, Result};
use crate::model::{GlyphRun, Metadata};

use super::{extract, pdf_parser, raster};

/// Page identifier: (object number, generation number).
pub type PageId = (u32, u16);

/// Page geometry in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    /// US Letter, the fallback when a page declares no usable MediaBox.
    pub const LETTER: PageSize = PageSize {
        width: 612.0,
        height: 792.0,
    };

    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Size in twips, rounded.
    pub fn to_twips(&self) -> (u32, u32) {
        (
            (self.width * 20.0).round().max(0.0) as u32,
            (self.height * 20.0).round().max(0.0) as u32,
        )
    }
}

/// Abstract interface for PDF document access.
///
/// Page numbers are 1-indexed.
pub trait PdfBackend {
    /// Total number of pages.
    fn page_count(&self) -> u32;

    /// Page size in points.
    fn page_size(&self, page: u32) -> Result<PageSize>;

    /// Positioned text runs of a page.
    ///
    /// An unreadable text layer yields an empty list, not an error.
    fn text_content(&self, page: u32) -> Vec<GlyphRun>;

    /// Render the page onto a bitmap of `ceil(size × scale)` pixels.
    fn render(&self, page: u32, scale: f32) -> Result<RgbaImage>;

    /// Document information.
    fn metadata(&self) -> Metadata;
}

/// Concrete [`PdfBackend`] backed by `lopdf::Document`.
pub struct LopdfBackend {
    doc: LopdfDocument,
    pages: BTreeMap<u32, PageId>,
}

impl LopdfBackend {
    /// Load from a file path.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::load_bytes(&data)
    }

    /// Load from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        let doc = LopdfDocument::load_mem(data)?;
        if doc.is_encrypted() {
            return Err(Error::Encrypted);
        }
        let pages = doc.get_pages();
        Ok(Self { doc, pages })
    }

    /// Direct access to the underlying `lopdf::Document`.
    pub fn raw_doc(&self) -> &LopdfDocument {
        &self.doc
    }

    /// Get PDF version string.
    pub fn version(&self) -> String {
        self.doc.version.to_string()
    }

    fn page_id(&self, page: u32) -> Result<PageId> {
        self.pages
            .get(&page)
            .copied()
            .ok_or(Error::PageOutOfRange(page, self.page_count()))
    }
}

impl PdfBackend for LopdfBackend {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_size(&self, page: u32) -> Result<PageSize> {
        let page_id = self.page_id(page)?;
        Ok(pdf_parser::page_size(&self.doc, page_id))
    }

    fn text_content(&self, page: u32) -> Vec<GlyphRun> {
        let runs = self
            .page_id(page)
            .and_then(|page_id| extract::extract_page(&self.doc, page_id, page));

        match runs {
            Ok(runs) => runs,
            Err(e) => {
                log::warn!("Text layer of page {} is unreadable: {}", page, e);
                Vec::new()
            }
        }
    }

    fn render(&self, page: u32, scale: f32) -> Result<RgbaImage> {
        let page_id = self.page_id(page)?;
        let size = pdf_parser::page_size(&self.doc, page_id);
        raster::render_page(&self.doc, page_id, page, size, scale)
    }

    fn metadata(&self) -> Metadata {
        pdf_parser::extract_metadata(&self.doc, self.page_count())
    }
}

/// Decompressed content stream of a page (all parts concatenated).
pub(crate) fn page_content(doc: &LopdfDocument, page_id: PageId) -> Result<Vec<u8>> {
    let page_dict = doc.get_dictionary(page_id)?;
    let contents = page_dict.get(b"Contents")?;

    match contents {
        Object::Reference(r) => match doc.get_object(*r)? {
            Object::Stream(s) => Ok(s.decompressed_content()?),
            Object::Array(arr) => Ok(concat_streams(doc, arr)),
            _ => Err(Error::PdfParse("Invalid content stream".to_string())),
        },
        Object::Array(arr) => Ok(concat_streams(doc, arr)),
        _ => Err(Error::PdfParse("Invalid content stream".to_string())),
    }
}

fn concat_streams(doc: &LopdfDocument, parts: &[Object]) -> Vec<u8> {
    let mut content = Vec::new();
    for obj in parts {
        if let Object::Reference(r) = obj {
            if let Ok(Object::Stream(s)) = doc.get_object(*r) {
                if let Ok(data) = s.decompressed_content() {
                    content.extend_from_slice(&data);
                    content.push(b' ');
                }
            }
        }
    }
    content
}

/// Follow a reference, returning the object itself otherwise.
pub(crate) fn resolve<'a>(doc: &'a LopdfDocument, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Helper to extract a number from a PDF object.
pub(crate) fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Simple text decoding fallback when no encoding is available.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    // UTF-16BE with BOM
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}
