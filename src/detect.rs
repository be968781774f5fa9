//! PDF header sniffing.
//!
//! Runs before lopdf sees the buffer so that non-PDF input fails fast with
//! [`Error::UnknownFormat`] instead of a parser error deep in the xref code.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Readers accept a header anywhere in the first kilobyte.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Header information of a PDF buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfHeader {
    /// Version declared in the header (e.g. "1.7")
    pub version: String,
    /// Byte offset of `%PDF-` (non-zero when junk precedes it)
    pub offset: usize,
}

impl std::fmt::Display for PdfHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PDF {}", self.version)
    }
}

/// Locate and validate the PDF header in a byte buffer.
pub fn sniff_header(data: &[u8]) -> Result<PdfHeader> {
    let window = &data[..data.len().min(HEADER_SEARCH_WINDOW)];
    let offset = window
        .windows(PDF_MAGIC.len())
        .position(|w| w == PDF_MAGIC)
        .ok_or(Error::UnknownFormat)?;

    let version_start = offset + PDF_MAGIC.len();
    let version_bytes = data
        .get(version_start..version_start + 3)
        .ok_or(Error::UnknownFormat)?;
    let version = String::from_utf8_lossy(version_bytes).to_string();

    match version_bytes {
        [major @ (b'1' | b'2'), b'.', minor] if minor.is_ascii_digit() => {
            if *major == b'2' && *minor != b'0' {
                return Err(Error::UnsupportedVersion(version));
            }
            Ok(PdfHeader { version, offset })
        }
        _ => Err(Error::UnsupportedVersion(version)),
    }
}

/// Read the first kilobyte of a file and sniff its header.
pub fn sniff_file<P: AsRef<Path>>(path: P) -> Result<PdfHeader> {
    let mut head = Vec::with_capacity(HEADER_SEARCH_WINDOW);
    File::open(path)?
        .take(HEADER_SEARCH_WINDOW as u64 + 3)
        .read_to_end(&mut head)?;
    sniff_header(&head)
}

/// Check if bytes look like a PDF.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    sniff_header(data).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_valid_header() {
        let header = sniff_header(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3").unwrap();
        assert_eq!(header.version, "1.7");
        assert_eq!(header.offset, 0);
        assert_eq!(header.to_string(), "PDF 1.7");
    }

    #[test]
    fn test_sniff_header_after_junk() {
        let mut data = b"garbage bytes\r\n".to_vec();
        data.extend_from_slice(b"%PDF-2.0\n");
        let header = sniff_header(&data).unwrap();
        assert_eq!(header.version, "2.0");
        assert_eq!(header.offset, 15);
    }

    #[test]
    fn test_sniff_rejects_non_pdf() {
        assert!(matches!(
            sniff_header(b"<!DOCTYPE html><html></html>"),
            Err(Error::UnknownFormat)
        ));
        assert!(matches!(sniff_header(b""), Err(Error::UnknownFormat)));
        assert!(matches!(sniff_header(b"%PDF-"), Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_sniff_rejects_bad_version() {
        assert!(matches!(
            sniff_header(b"%PDF-X.Y\n"),
            Err(Error::UnsupportedVersion(_))
        ));
        assert!(matches!(
            sniff_header(b"%PDF-3.0\n"),
            Err(Error::UnsupportedVersion(_))
        ));
        assert!(matches!(
            sniff_header(b"%PDF-2.5\n"),
            Err(Error::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_is_pdf_bytes() {
        assert!(is_pdf_bytes(b"%PDF-1.4\n"));
        assert!(!is_pdf_bytes(b"Not a PDF"));
    }
}
