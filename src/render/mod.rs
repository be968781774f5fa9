//! Rendering of the reconstructed document.
//!
//! The `.docx` writer is the primary output; JSON is a debug view of the
//! same layout.

mod docx;
mod json;
mod package;

pub use docx::{xml_safe_text, DocxRenderer};
pub use json::{to_json, JsonFormat};
pub use package::{core_properties_xml, to_docx, DocxOptions};
