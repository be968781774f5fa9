//! `.docx` packaging.
//!
//! `docx-rs` writes the package. Its core properties carry no title or
//! author, so `docProps/core.xml` is regenerated from the PDF metadata and
//! swapped into the archive.

use std::io::{Cursor, Write};

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesText, Event};
use quick_xml::Writer;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::docx::{xml_safe_text, DocxRenderer};
use crate::error::{Error, Result};
use crate::model::{Metadata, OutputDocument};

const CORE_PART: &str = "docProps/core.xml";

const CORE_NAMESPACES: [(&str, &str); 5] = [
    (
        "xmlns:cp",
        "http://schemas.openxmlformats.org/package/2006/metadata/core-properties",
    ),
    ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
    ("xmlns:dcterms", "http://purl.org/dc/terms/"),
    ("xmlns:dcmitype", "http://purl.org/dc/dcmitype/"),
    ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
];

/// Options for the `.docx` package.
#[derive(Debug, Clone)]
pub struct DocxOptions {
    /// Face used by the document defaults
    pub font_family: String,
}

impl Default for DocxOptions {
    fn default() -> Self {
        Self {
            font_family: "Arial".to_string(),
        }
    }
}

impl DocxOptions {
    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = family.into();
        self
    }
}

/// Serialize a document as `.docx` bytes.
pub fn to_docx(doc: &OutputDocument, options: &DocxOptions) -> Result<Vec<u8>> {
    let docx = DocxRenderer::new(options.font_family.clone()).render(doc)?;

    let mut packed = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut packed)
        .map_err(|e| Error::Package(e.to_string()))?;

    let core = core_properties_xml(&doc.metadata, Utc::now())?;
    let bytes = replace_part(packed.into_inner(), CORE_PART, &core)?;

    log::debug!(
        "Packaged {} sections, {} page images, {} bytes",
        doc.section_count(),
        doc.fallback_count(),
        bytes.len()
    );

    Ok(bytes)
}

/// `docProps/core.xml` from the PDF metadata.
pub fn core_properties_xml(metadata: &Metadata, now: DateTime<Utc>) -> Result<Vec<u8>> {
    let created = metadata.created.unwrap_or(now);
    let modified = metadata.modified.unwrap_or(created);
    let w3c = |d: DateTime<Utc>| d.format("%Y-%m-%dT%H:%M:%SZ").to_string();

    let fields = [
        ("dc:title", &metadata.title),
        ("dc:subject", &metadata.subject),
        ("dc:creator", &metadata.author),
        ("cp:keywords", &metadata.keywords),
    ];

    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    writer
        .create_element("cp:coreProperties")
        .with_attributes(CORE_NAMESPACES)
        .write_inner_content::<_, quick_xml::Error>(|w| {
            for (tag, value) in fields {
                if let Some(value) = value {
                    w.create_element(tag)
                        .write_text_content(BytesText::new(&xml_safe_text(value)))?;
                }
            }
            for (tag, date) in [("dcterms:created", created), ("dcterms:modified", modified)] {
                w.create_element(tag)
                    .with_attribute(("xsi:type", "dcterms:W3CDTF"))
                    .write_text_content(BytesText::new(&w3c(date)))?;
            }
            Ok(())
        })?;

    Ok(writer.into_inner().into_inner())
}

/// Copy a package, replacing (or adding) the part `name`.
fn replace_part(package: Vec<u8>, name: &str, content: &[u8]) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(package))?;
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i)?;
        if entry.name() != name {
            zip.raw_copy_file(entry)?;
        }
    }

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(name, options)?;
    zip.write_all(content)?;

    Ok(zip.finish()?.into_inner())
}
