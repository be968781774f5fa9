//! Document-level lookups on a lopdf document: info dictionary, page
//! geometry and inherited page attributes.

use lopdf::{Dictionary, Document as LopdfDocument, Object};

use crate::model::Metadata;

use super::backend::{get_number, resolve, PageId, PageSize};

/// Page tree nesting limit when walking `/Parent` links.
const MAX_TREE_DEPTH: usize = 32;

/// Extract document metadata from the trailer's Info dictionary.
pub fn extract_metadata(doc: &LopdfDocument, page_count: u32) -> Metadata {
    let mut metadata = Metadata::with_version(doc.version.to_string());
    metadata.page_count = page_count;

    let info_dict = doc
        .trailer
        .get(b"Info")
        .ok()
        .map(|info| resolve(doc, info))
        .and_then(|info| info.as_dict().ok());

    if let Some(info_dict) = info_dict {
        metadata.title = get_string_from_dict(info_dict, b"Title");
        metadata.author = get_string_from_dict(info_dict, b"Author");
        metadata.subject = get_string_from_dict(info_dict, b"Subject");
        metadata.keywords = get_string_from_dict(info_dict, b"Keywords");
        metadata.creator = get_string_from_dict(info_dict, b"Creator");
        metadata.producer = get_string_from_dict(info_dict, b"Producer");

        if let Some(date_str) = get_string_from_dict(info_dict, b"CreationDate") {
            metadata.created = parse_pdf_date(&date_str);
        }
        if let Some(date_str) = get_string_from_dict(info_dict, b"ModDate") {
            metadata.modified = parse_pdf_date(&date_str);
        }
    }

    metadata
}

/// Page size from the (possibly inherited) MediaBox.
pub fn page_size(doc: &LopdfDocument, page_id: PageId) -> PageSize {
    let media_box = inherited_attribute(doc, page_id, b"MediaBox")
        .and_then(|obj| obj.as_array().ok())
        .filter(|arr| arr.len() >= 4)
        .map(|arr| {
            arr.iter()
                .take(4)
                .map(|o| get_number(resolve(doc, o)).unwrap_or(0.0))
                .collect::<Vec<_>>()
        });

    match media_box {
        Some(b) if (b[2] - b[0]).abs() > 0.0 && (b[3] - b[1]).abs() > 0.0 => {
            PageSize::new((b[2] - b[0]).abs(), (b[3] - b[1]).abs())
        }
        _ => {
            log::debug!("Page {:?} has no usable MediaBox, assuming Letter", page_id);
            PageSize::LETTER
        }
    }
}

/// The page's resource dictionary, inherited from ancestors if needed.
pub fn page_resources(doc: &LopdfDocument, page_id: PageId) -> Option<&Dictionary> {
    inherited_attribute(doc, page_id, b"Resources").and_then(|obj| obj.as_dict().ok())
}

/// Look up an inheritable page attribute, walking up the page tree.
fn inherited_attribute<'a>(
    doc: &'a LopdfDocument,
    page_id: PageId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;

    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(resolve(doc, value));
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }

    None
}

/// Helper to get a string from a PDF dictionary.
fn get_string_from_dict(dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key).ok()? {
        Object::String(bytes, _) => {
            let text = super::backend::decode_text_simple(bytes);
            let text = text.trim_end_matches('\0').trim();
            (!text.is_empty()).then(|| text.to_string())
        }
        Object::Name(bytes) => String::from_utf8(bytes.clone()).ok(),
        _ => None,
    }
}

/// Parse a PDF date string (D:YYYYMMDDHHmmSSOHH'mm').
pub(crate) fn parse_pdf_date(s: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    let s = s.strip_prefix("D:").unwrap_or(s);

    // At minimum we need YYYY
    if s.len() < 4 {
        return None;
    }

    let year: i32 = s.get(0..4)?.parse().ok()?;
    let month: u32 = s.get(4..6).and_then(|m| m.parse().ok()).unwrap_or(1);
    let day: u32 = s.get(6..8).and_then(|d| d.parse().ok()).unwrap_or(1);
    let hour: u32 = s.get(8..10).and_then(|h| h.parse().ok()).unwrap_or(0);
    let minute: u32 = s.get(10..12).and_then(|m| m.parse().ok()).unwrap_or(0);
    let second: u32 = s.get(12..14).and_then(|s| s.parse().ok()).unwrap_or(0);

    let naive = chrono::NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))?;

    // Shift to UTC when a +HH'mm / -HH'mm offset is present
    let offset_minutes = match s.get(14..15) {
        Some(sign @ ("+" | "-")) => {
            let hh: i64 = s.get(15..17).and_then(|h| h.parse().ok()).unwrap_or(0);
            let mm: i64 = s
                .get(17..)
                .map(|rest| rest.trim_matches('\''))
                .and_then(|m| m.get(0..2))
                .and_then(|m| m.parse().ok())
                .unwrap_or(0);
            let total = hh * 60 + mm;
            if sign == "+" {
                total
            } else {
                -total
            }
        }
        _ => 0,
    };

    let utc = naive - chrono::Duration::minutes(offset_minutes);
    Some(chrono::DateTime::from_naive_utc_and_offset(utc, chrono::Utc))
}
