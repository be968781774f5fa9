//! WordprocessingML rendering.
//!
//! Maps an [`OutputDocument`] onto a `docx-rs` document. Every page section
//! becomes one Word section with its own page size and margins; image
//! sections hold a single inline picture.

use std::borrow::Cow;

use docx_rs::{
    Docx, LineSpacing, LineSpacingType, PageMargin, PageOrientationType,
    PageSize as DocxPageSize, Paragraph, Pic, Run, RunFonts, SectionProperty, Tab, TabValueType,
};
use image::ImageFormat;

use crate::error::Result;
use crate::layout::relative_indent;
use crate::model::{
    ImageRecord, Inline, OutputDocument, PageSection, ParagraphRecord, Placement, SectionContent,
    TabAlignment, TextRun,
};

/// Builds the `docx-rs` document for an [`OutputDocument`].
pub struct DocxRenderer {
    font_family: String,
}

impl DocxRenderer {
    /// `font_family` becomes the document default face.
    pub fn new(font_family: impl Into<String>) -> Self {
        Self {
            font_family: font_family.into(),
        }
    }

    pub fn render(&self, doc: &OutputDocument) -> Result<Docx> {
        let mut docx = Docx::new().default_fonts(fonts(&self.font_family));

        let last = doc.sections.len().saturating_sub(1);
        for (i, section) in doc.sections.iter().enumerate() {
            let mut paragraphs = section_paragraphs(section)?;

            if i < last {
                // Section properties cannot live on a framed paragraph
                let carrier = match paragraphs.pop() {
                    Some((p, false)) => p,
                    Some(framed) => {
                        paragraphs.push(framed);
                        Paragraph::new()
                    }
                    None => Paragraph::new(),
                };
                paragraphs.push((carrier.section_property(section_property(section)), false));
            }

            for (p, _) in paragraphs {
                docx = docx.add_paragraph(p);
            }
        }

        // The body-level section properties describe the last page
        if let Some(section) = doc.sections.last() {
            docx = docx
                .page_size(section.width, section.height)
                .page_margin(page_margin(section));
            if is_landscape(section) {
                docx = docx.page_orient(PageOrientationType::Landscape);
            }
        }

        Ok(docx)
    }
}

/// Paragraphs of one section, each flagged when it is a frame.
fn section_paragraphs(section: &PageSection) -> Result<Vec<(Paragraph, bool)>> {
    match &section.content {
        SectionContent::Image(image) => Ok(vec![(image_paragraph(image)?, false)]),
        SectionContent::Paragraphs(records) => Ok(records
            .iter()
            .map(|record| (paragraph(record, section), record.is_absolute()))
            .collect()),
    }
}

fn paragraph(record: &ParagraphRecord, section: &PageSection) -> Paragraph {
    let mut p = Paragraph::new();

    match &record.placement {
        Placement::Absolute(frame) => {
            p = p
                .frame_width(frame.width.max(0) as _)
                .frame_height(frame.height.max(0) as _)
                .h_rule("atLeast")
                .wrap("none")
                .h_anchor("page")
                .v_anchor("page")
                .frame_x(frame.x as _)
                .frame_y(frame.y as _)
                .line_spacing(LineSpacing::new().before(0).after(0));
        }
        Placement::Flow { indent } => {
            let mut stops: Vec<(i32, TabAlignment)> = record
                .tab_stops
                .iter()
                .map(|t| (relative_indent(t.position, &section.margins), t.alignment))
                .collect();
            stops.sort_by_key(|&(pos, _)| pos);
            stops.dedup_by_key(|&mut (pos, _)| pos);
            for (pos, alignment) in stops {
                p = p.add_tab(Tab::new().val(tab_value(alignment)).pos(pos as _));
            }

            let mut spacing = LineSpacing::new().before(record.spacing.before as _).after(0);
            if let Some(line) = record.spacing.line {
                spacing = spacing.line(line as _).line_rule(LineSpacingType::Exact);
            }
            p = p
                .line_spacing(spacing)
                .indent(Some(relative_indent(*indent, &section.margins) as _), None, None, None);
        }
    }

    for inline in &record.content {
        p = p.add_run(match inline {
            Inline::Text(run) => text_run(run),
            Inline::Tab => Run::new().add_tab(),
        });
    }

    p
}

fn image_paragraph(image: &ImageRecord) -> Result<Paragraph> {
    // The picture builder decodes the bytes itself and cannot report a bad image
    image::load_from_memory_with_format(&image.data, ImageFormat::Png)?;

    let (cx, cy) = image.extent_emu();
    let pic = Pic::new(&image.data).size(cx as _, cy as _);

    Ok(Paragraph::new()
        .line_spacing(LineSpacing::new().before(0).after(0))
        .add_run(Run::new().add_image(pic)))
}

fn text_run(run: &TextRun) -> Run {
    let style = &run.style;
    let mut r = Run::new()
        .add_text(xml_safe_text(&run.text))
        .fonts(fonts(&style.font_family))
        .size(style.half_points as usize);
    if style.bold {
        r = r.bold();
    }
    if style.italic {
        r = r.italic();
    }
    r
}

fn fonts(family: &str) -> RunFonts {
    RunFonts::new().ascii(family).hi_ansi(family).cs(family)
}

fn tab_value(alignment: TabAlignment) -> TabValueType {
    match alignment {
        TabAlignment::Left => TabValueType::Left,
        TabAlignment::Center => TabValueType::Center,
        TabAlignment::Right => TabValueType::Right,
    }
}

fn is_landscape(section: &PageSection) -> bool {
    section.width > section.height
}

fn page_margin(section: &PageSection) -> PageMargin {
    let m = &section.margins;
    PageMargin::new()
        .top(m.top as _)
        .right(m.right as _)
        .bottom(m.bottom as _)
        .left(m.left as _)
        .header(0)
        .footer(0)
        .gutter(0)
}

fn section_property(section: &PageSection) -> SectionProperty {
    let mut size = DocxPageSize::new().size(section.width, section.height);
    if is_landscape(section) {
        size = size.orient(PageOrientationType::Landscape);
    }
    SectionProperty::new()
        .page_size(size)
        .page_margin(page_margin(section))
}

/// Drop characters XML 1.0 cannot carry. Escaping is left to the writer.
pub fn xml_safe_text(text: &str) -> Cow<'_, str> {
    let valid = |c: char| {
        matches!(c, '\t' | '\n' | '\r')
            || (c >= '\u{20}' && c != '\u{FFFE}' && c != '\u{FFFF}')
    };
    if text.chars().all(valid) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|&c| valid(c)).collect())
    }
}
