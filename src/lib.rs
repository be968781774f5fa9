//! # pdfdocx
//!
//! Reconstruct editable Word documents from the text layout of PDF files.
//!
//! Every PDF page becomes one Word section. Positioned text is clustered
//! into rows (or segments) and rebuilt as paragraphs whose indents, tab
//! stops and spacing follow the original placement. Pages without any
//! extractable text are embedded as a page image instead.
//!
//! ## Quick Start
//!
//! ```no_run
//! fn main() -> pdfdocx::Result<()> {
//!     let docx = pdfdocx::convert_file("report.pdf")?;
//!     std::fs::write("report.docx", docx)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Layout modes
//!
//! - **Flow** (default): one paragraph per visual line, horizontal gaps
//!   become tabs or spaces. Easy to edit.
//! - **Absolute**: one page-anchored frame per text segment. Closer to
//!   the original placement, harder to edit.

pub mod convert;
pub mod detect;
pub mod error;
pub mod layout;
pub mod model;
pub mod parser;
pub mod render;

// Re-export commonly used types
pub use convert::{
    progress_channel, CancellationToken, Conversion, Phase, Pipeline, Progress, ProgressSender,
};
pub use detect::{is_pdf_bytes, sniff_header, PdfHeader};
pub use error::{Error, Result};
pub use model::{
    Frame, GlyphRun, ImageRecord, Inline, Margins, Metadata, OutputDocument, PageSection,
    ParagraphRecord, Placement, RunStyle, SectionContent, TabStop, TextRun,
};
pub use parser::{ConvertOptions, LayoutMode, LopdfBackend, PageSelection, PdfBackend};
pub use render::JsonFormat;

use std::path::{Path, PathBuf};

/// Convert PDF bytes to `.docx` bytes with default options.
///
/// # Example
///
/// ```no_run
/// let data = std::fs::read("form.pdf").unwrap();
/// let docx = pdfdocx::convert_bytes(&data).unwrap();
/// ```
pub fn convert_bytes(data: &[u8]) -> Result<Vec<u8>> {
    convert_bytes_with_options(data, &ConvertOptions::default())
}

/// Convert PDF bytes to `.docx` bytes.
///
/// # Example
///
/// ```no_run
/// use pdfdocx::{convert_bytes_with_options, ConvertOptions, PageSelection};
///
/// let data = std::fs::read("form.pdf").unwrap();
/// let options = ConvertOptions::new()
///     .absolute()
///     .with_pages(PageSelection::parse("1-2").unwrap());
/// let docx = convert_bytes_with_options(&data, &options).unwrap();
/// ```
pub fn convert_bytes_with_options(data: &[u8], options: &ConvertOptions) -> Result<Vec<u8>> {
    PdfDocx::with_options(options.clone())
        .convert_bytes(data)
        .map(|c| c.bytes)
}

/// Convert a PDF file to `.docx` bytes with default options.
pub fn convert_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    convert_file_with_options(path, &ConvertOptions::default())
}

/// Convert a PDF file to `.docx` bytes.
pub fn convert_file_with_options<P: AsRef<Path>>(
    path: P,
    options: &ConvertOptions,
) -> Result<Vec<u8>> {
    let data = std::fs::read(path)?;
    convert_bytes_with_options(&data, options)
}

/// Lay out PDF bytes without writing a package.
///
/// Useful for inspecting how a document will be reconstructed.
pub fn analyze_bytes(data: &[u8], options: &ConvertOptions) -> Result<OutputDocument> {
    PdfDocx::with_options(options.clone()).analyze_bytes(data)
}

/// Convert a PDF file on a blocking worker thread.
#[cfg(feature = "async")]
pub async fn convert_file_async<P: AsRef<Path>>(
    path: P,
    options: ConvertOptions,
) -> Result<Vec<u8>> {
    let data = tokio::fs::read(path.as_ref()).await?;
    tokio::task::spawn_blocking(move || convert_bytes_with_options(&data, &options))
        .await
        .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
}

/// Output path for a source file: same stem, `.docx` extension.
///
/// # Example
///
/// ```
/// use std::path::PathBuf;
///
/// assert_eq!(
///     pdfdocx::output_filename("scans/invoice.PDF"),
///     PathBuf::from("scans/invoice.docx")
/// );
/// ```
pub fn output_filename<P: AsRef<Path>>(path: P) -> PathBuf {
    path.as_ref().with_extension("docx")
}

/// Builder for converting PDF documents.
///
/// # Example
///
/// ```no_run
/// use pdfdocx::{progress_channel, LayoutMode, PdfDocx};
///
/// let (tx, rx) = progress_channel();
/// let conversion = PdfDocx::new()
///     .with_layout_mode(LayoutMode::Absolute)
///     .with_font_family("Calibri")
///     .with_progress(tx)
///     .convert_file("statement.pdf")?;
///
/// for update in rx.try_iter() {
///     println!("{}%", update.percent);
/// }
/// std::fs::write("statement.docx", &conversion.bytes)?;
/// # Ok::<(), pdfdocx::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct PdfDocx {
    options: ConvertOptions,
    progress: ProgressSender,
    cancellation: Option<CancellationToken>,
}

impl PdfDocx {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder from existing options.
    pub fn with_options(options: ConvertOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Set the layout strategy.
    pub fn with_layout_mode(mut self, mode: LayoutMode) -> Self {
        self.options = self.options.with_layout_mode(mode);
        self
    }

    /// Set page selection.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.options = self.options.with_pages(pages);
        self
    }

    /// Set the output font family.
    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.options = self.options.with_font_family(family);
        self
    }

    /// Set the vertical row tolerance in points.
    pub fn with_row_tolerance(mut self, tolerance: f32) -> Self {
        self.options = self.options.with_row_tolerance(tolerance);
        self
    }

    /// Set the display width cap for page images.
    pub fn with_max_image_width(mut self, px: u32) -> Self {
        self.options = self.options.with_max_image_width(px);
        self
    }

    /// Report progress on a channel.
    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = progress;
        self
    }

    /// Honor a cancellation token between pages.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Convert PDF bytes.
    pub fn convert_bytes(self, data: &[u8]) -> Result<Conversion> {
        self.pipeline(data)?.convert()
    }

    /// Convert a PDF file.
    pub fn convert_file<P: AsRef<Path>>(self, path: P) -> Result<Conversion> {
        let data = std::fs::read(path)?;
        self.convert_bytes(&data)
    }

    /// Lay out PDF bytes without packaging.
    pub fn analyze_bytes(self, data: &[u8]) -> Result<OutputDocument> {
        self.pipeline(data)?.analyze()
    }

    fn pipeline(self, data: &[u8]) -> Result<Pipeline<LopdfBackend>> {
        let header = sniff_header(data)?;
        log::debug!("PDF {} header at offset {}", header.version, header.offset);

        let backend = LopdfBackend::load_bytes(data)?;
        let mut pipeline = Pipeline::new(backend, self.options).with_progress(self.progress);
        if let Some(token) = self.cancellation {
            pipeline = pipeline.with_cancellation(token);
        }
        Ok(pipeline)
    }
}
