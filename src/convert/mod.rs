//! Conversion pipeline.
//!
//! Pages are laid out strictly one after another in input order, then the
//! whole document is packaged. Progress goes out on a fire-and-forget
//! channel and a cancellation token is honored between pages.
//!
//! # Example
//!
//! ```no_run
//! use pdfdocx::convert::{progress_channel, Pipeline};
//! use pdfdocx::parser::{ConvertOptions, LopdfBackend};
//!
//! fn main() -> pdfdocx::Result<()> {
//!     let backend = LopdfBackend::load_file("document.pdf")?;
//!     let (tx, rx) = progress_channel();
//!     let conversion = Pipeline::new(backend, ConvertOptions::default())
//!         .with_progress(tx)
//!         .convert()?;
//!     for update in rx.try_iter() {
//!         println!("{}%", update.percent);
//!     }
//!     std::fs::write("document.docx", &conversion.bytes)?;
//!     Ok(())
//! }
//! ```

mod progress;

pub use progress::{
    layout_percent, progress_channel, CancellationToken, Phase, Progress, ProgressSender,
    PACKAGING_PERCENT,
};

use crate::error::{Error, Result};
use crate::layout::layout_page;
use crate::model::OutputDocument;
use crate::parser::{ConvertOptions, PdfBackend};
use crate::render::{to_docx, DocxOptions};

/// MIME type of the produced package.
pub const DOCX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Result of a full conversion.
#[derive(Debug, Clone)]
pub struct Conversion {
    /// The reconstructed layout
    pub document: OutputDocument,

    /// The `.docx` package
    pub bytes: Vec<u8>,
}

impl Conversion {
    pub fn mime_type(&self) -> &'static str {
        DOCX_MIME_TYPE
    }

    /// Number of pages that were embedded as images.
    pub fn fallback_pages(&self) -> usize {
        self.document.fallback_count()
    }
}

/// Drives a [`PdfBackend`] through layout and packaging.
pub struct Pipeline<B: PdfBackend> {
    backend: B,
    options: ConvertOptions,
    progress: ProgressSender,
    cancellation: Option<CancellationToken>,
}

impl<B: PdfBackend> Pipeline<B> {
    pub fn new(backend: B, options: ConvertOptions) -> Self {
        Self {
            backend,
            options,
            progress: ProgressSender::disabled(),
            cancellation: None,
        }
    }

    /// Report progress on the given channel.
    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = progress;
        self
    }

    /// Stop before the next page once the token is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Lay out the selected pages without packaging.
    pub fn analyze(&self) -> Result<OutputDocument> {
        let page_count = self.backend.page_count();
        let pages = self.options.pages.resolve(page_count)?;
        let total = pages.len() as u32;

        let mut document = OutputDocument::new(self.backend.metadata());

        for (i, &page) in pages.iter().enumerate() {
            if self.is_cancelled() {
                log::debug!("Cancelled before page {}", page);
                return Err(Error::Cancelled { page });
            }

            self.progress.send(Progress::layout(i as u32 + 1, total, page));
            document.add_section(layout_page(&self.backend, page, &self.options)?);
        }

        log::debug!(
            "Laid out {} of {} pages ({} as images)",
            total,
            page_count,
            document.fallback_count()
        );

        Ok(document)
    }

    /// Lay out the selected pages and package them as `.docx`.
    pub fn convert(&self) -> Result<Conversion> {
        let document = self.analyze()?;
        let total = document.section_count() as u32;

        self.progress.send(Progress::packaging(total));
        let docx_options = DocxOptions::default().with_font_family(&self.options.font_family);
        let bytes = to_docx(&document, &docx_options)?;
        self.progress.send(Progress::done(total));

        Ok(Conversion { document, bytes })
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GlyphRun, Metadata};
    use crate::parser::{PageSelection, PageSize};
    use image::{Rgba, RgbaImage};

    /// Pages with fixed runs; an empty page renders as a grey bitmap.
    struct FixedBackend {
        pages: Vec<Vec<GlyphRun>>,
    }

    impl PdfBackend for FixedBackend {
        fn page_count(&self) -> u32 {
            self.pages.len() as u32
        }

        fn page_size(&self, page: u32) -> Result<PageSize> {
            if page == 0 || page > self.page_count() {
                return Err(Error::PageOutOfRange(page, self.page_count()));
            }
            Ok(PageSize::LETTER)
        }

        fn text_content(&self, page: u32) -> Vec<GlyphRun> {
            self.pages
                .get(page as usize - 1)
                .cloned()
                .unwrap_or_default()
        }

        fn render(&self, _page: u32, scale: f32) -> Result<RgbaImage> {
            let w = (612.0 * scale).ceil() as u32;
            let h = (792.0 * scale).ceil() as u32;
            Ok(RgbaImage::from_pixel(w, h, Rgba([128, 128, 128, 255])))
        }

        fn metadata(&self) -> Metadata {
            Metadata {
                page_count: self.page_count(),
                ..Metadata::with_version("1.7")
            }
        }
    }

    fn backend() -> FixedBackend {
        FixedBackend {
            pages: vec![
                vec![GlyphRun::at("Page one", 72.0, 700.0, 12.0)],
                vec![],
                vec![GlyphRun::at("Page three", 72.0, 700.0, 12.0)],
            ],
        }
    }

    #[test]
    fn test_analyze_keeps_page_order() {
        let doc = Pipeline::new(backend(), ConvertOptions::default())
            .analyze()
            .unwrap();

        let numbers: Vec<u32> = doc.sections.iter().map(|s| s.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(!doc.sections[0].is_fallback());
        assert!(doc.sections[1].is_fallback());
        assert_eq!(doc.sections[2].plain_text(), "Page three");
    }

    #[test]
    fn test_page_selection() {
        let options = ConvertOptions::default().with_pages(PageSelection::Pages(vec![3, 1]));
        let doc = Pipeline::new(backend(), options).analyze().unwrap();
        let numbers: Vec<u32> = doc.sections.iter().map(|s| s.number).collect();
        assert_eq!(numbers, vec![1, 3]);
    }

    #[test]
    fn test_page_selection_out_of_range() {
        let options = ConvertOptions::default().with_pages(PageSelection::Pages(vec![4]));
        let result = Pipeline::new(backend(), options).analyze();
        assert!(matches!(result, Err(Error::PageOutOfRange(4, 3))));
    }

    #[test]
    fn test_progress_sequence() {
        let (tx, rx) = progress_channel();
        let conversion = Pipeline::new(backend(), ConvertOptions::default())
            .with_progress(tx)
            .convert()
            .unwrap();
        assert!(!conversion.bytes.is_empty());
        assert_eq!(conversion.fallback_pages(), 1);

        let updates: Vec<Progress> = rx.try_iter().collect();
        let percents: Vec<u8> = updates.iter().map(|p| p.percent).collect();
        assert_eq!(percents, vec![30, 60, 90, 95, 100]);
        assert_eq!(updates[1].page, Some(2));
        assert_eq!(updates[3].phase, Phase::Packaging);
        assert_eq!(updates[4].phase, Phase::Done);
    }

    #[test]
    fn test_cancelled_before_first_page() {
        let token = CancellationToken::new();
        token.cancel();
        let result = Pipeline::new(backend(), ConvertOptions::default())
            .with_cancellation(token)
            .convert();
        assert!(matches!(result, Err(Error::Cancelled { page: 1 })));
    }
}
