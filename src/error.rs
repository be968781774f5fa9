//! Error types for pdfdocx.

use std::io;
use thiserror::Error;

/// Result type alias for pdfdocx operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while converting a PDF.
///
/// Every variant is fatal for the conversion that raised it. A page without
/// extractable text is not an error; it takes the image fallback path.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF header carries a version we cannot read.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// The PDF structure could not be decoded.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted.
    #[error("Document is encrypted")]
    Encrypted,

    /// Page number is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// Invalid page range specification.
    #[error("Invalid page range: {0}")]
    InvalidPageRange(String),

    /// Rendering a page to a bitmap failed.
    #[error("Failed to rasterize page {page}: {reason}")]
    Rasterize {
        /// 1-indexed page number
        page: u32,
        /// What went wrong
        reason: String,
    },

    /// Encoding a rasterized page failed.
    #[error("Image encoding error: {0}")]
    ImageEncode(String),

    /// Writing the output package failed.
    #[error("Packaging error: {0}")]
    Package(String),

    /// Error while dumping the layout (JSON).
    #[error("Rendering error: {0}")]
    Render(String),

    /// The caller abandoned the conversion.
    #[error("Conversion cancelled before page {page}")]
    Cancelled {
        /// Page that was about to be processed
        page: u32,
    },
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::Package(err.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Package(err.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::ImageEncode(err.to_string())
    }
}
