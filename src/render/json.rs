//! JSON dump of the reconstructed layout.

use crate::error::{Error, Result};
use crate::model::OutputDocument;

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Convert a document's layout to JSON. Image bytes are omitted.
pub fn to_json(doc: &OutputDocument, format: JsonFormat) -> Result<String> {
    let result = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(doc),
        JsonFormat::Compact => serde_json::to_string(doc),
    };

    result.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Margins, Metadata, PageSection, ParagraphRecord, Placement, RunStyle};

    fn sample() -> OutputDocument {
        let mut doc = OutputDocument::new(Metadata::with_version("1.7"));
        doc.metadata.title = Some("Test".to_string());
        let mut p = ParagraphRecord::new(Placement::Flow { indent: 1440 });
        p.push_text("Hello", &RunStyle::sized(12.0, "Arial"));
        doc.add_section(PageSection::paragraphs(
            1,
            (12240, 15840),
            Margins::default(),
            vec![p],
        ));
        doc
    }

    #[test]
    fn test_to_json_pretty() {
        let json = to_json(&sample(), JsonFormat::Pretty).unwrap();
        assert!(json.contains("\"title\""));
        assert!(json.contains("Hello"));
        assert!(json.contains('\n')); // Pretty has newlines
    }

    #[test]
    fn test_to_json_compact() {
        let json = to_json(&sample(), JsonFormat::Compact).unwrap();
        assert!(!json.contains('\n')); // Compact has no newlines
        assert!(json.contains("\"type\":\"paragraphs\""));
    }

    #[test]
    fn test_json_round_trips_layout() {
        let doc = sample();
        let json = to_json(&doc, JsonFormat::Compact).unwrap();
        let back: OutputDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
    }
}
