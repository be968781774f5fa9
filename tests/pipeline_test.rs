//! Integration tests for the conversion pipeline, driven by a mock backend.

use image::{Rgba, RgbaImage};
use pdfdocx::error::Result;
use pdfdocx::layout::Clusterer;
use pdfdocx::parser::PageSize;
use pdfdocx::{
    progress_channel, CancellationToken, ConvertOptions, Error, GlyphRun, Inline, LayoutMode,
    Metadata, PageSelection, PdfBackend, Pipeline, SectionContent,
};

/// Mock backend with fixed pages.
struct MockBackend {
    pages: Vec<Vec<GlyphRun>>,
    size: PageSize,
    fail_render: bool,
}

impl MockBackend {
    fn new(pages: Vec<Vec<GlyphRun>>) -> Self {
        Self {
            pages,
            size: PageSize::LETTER,
            fail_render: false,
        }
    }

    fn failing_render(mut self) -> Self {
        self.fail_render = true;
        self
    }
}

impl PdfBackend for MockBackend {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_size(&self, page: u32) -> Result<PageSize> {
        if page == 0 || page > self.page_count() {
            return Err(Error::PageOutOfRange(page, self.page_count()));
        }
        Ok(self.size)
    }

    fn text_content(&self, page: u32) -> Vec<GlyphRun> {
        self.pages[page as usize - 1].clone()
    }

    fn render(&self, page: u32, scale: f32) -> Result<RgbaImage> {
        if self.fail_render {
            return Err(Error::Rasterize {
                page,
                reason: "mock renderer failure".to_string(),
            });
        }
        let w = (self.size.width * scale).ceil() as u32;
        let h = (self.size.height * scale).ceil() as u32;
        Ok(RgbaImage::from_pixel(w, h, Rgba([200, 200, 200, 255])))
    }

    fn metadata(&self) -> Metadata {
        Metadata {
            page_count: self.page_count(),
            ..Metadata::with_version("1.7")
        }
    }
}

fn text_page(label: &str) -> Vec<GlyphRun> {
    vec![
        GlyphRun::at(label, 72.0, 700.0, 12.0),
        GlyphRun::at("second line", 72.0, 680.0, 12.0),
    ]
}

// ==================== Concrete scenarios ====================

#[test]
fn test_scenario_single_run() {
    let backend = MockBackend::new(vec![vec![GlyphRun::at("Hello", 72.0, 700.0, 12.0)]]);
    let doc = Pipeline::new(backend, ConvertOptions::default())
        .analyze()
        .unwrap();

    assert_eq!(doc.section_count(), 1);
    let records = doc.sections[0].records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].plain_text(), "Hello");

    let run = records[0].runs().next().unwrap();
    assert!(!run.style.bold);
    assert!(!run.style.italic);
}

#[test]
fn test_scenario_tab_between_columns() {
    let backend = MockBackend::new(vec![vec![
        GlyphRun::at("Name:", 72.0, 700.0, 12.0),
        GlyphRun::at("John Doe", 250.0, 700.0, 12.0),
    ]]);
    let doc = Pipeline::new(backend, ConvertOptions::default())
        .analyze()
        .unwrap();

    let records = doc.sections[0].records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(
        record
            .content
            .iter()
            .filter(|c| matches!(c, Inline::Tab))
            .count(),
        1
    );
    assert_eq!(record.tab_stops.len(), 1);
    assert_eq!(record.tab_stops[0].position, 250 * 20);
}

#[test]
fn test_scenario_scanned_page() {
    let backend = MockBackend::new(vec![vec![]]);
    let options = ConvertOptions::default();
    let doc = Pipeline::new(backend, options.clone()).analyze().unwrap();

    assert_eq!(doc.section_count(), 1);
    let section = &doc.sections[0];
    assert_eq!(section.record_count(), 1);
    match &section.content {
        SectionContent::Image(image) => {
            assert!(image.display_width <= options.max_image_width);
            let expected = 792.0 / 612.0;
            assert!(((image.aspect() - expected) / expected).abs() < 0.01);
            // Rendered at 2x
            assert_eq!(image.pixel_width, 1224);
            assert!(image.data.starts_with(&[0x89, b'P', b'N', b'G']));
        }
        other => panic!("expected image section, got {:?}", other),
    }
}

#[test]
fn test_scenario_mixed_pages() {
    let backend = MockBackend::new(vec![text_page("one"), vec![], text_page("three")]);
    let conversion = Pipeline::new(backend, ConvertOptions::default())
        .convert()
        .unwrap();
    let doc = &conversion.document;

    assert_eq!(doc.section_count(), 3);
    let numbers: Vec<u32> = doc.sections.iter().map(|s| s.number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert!(!doc.sections[0].is_fallback());
    assert!(doc.sections[1].is_fallback());
    assert!(!doc.sections[2].is_fallback());
    assert!(!conversion.bytes.is_empty());
}

// ==================== Properties ====================

#[test]
fn test_record_count_matches_rows_and_segments() {
    let runs = vec![
        GlyphRun::at("Invoice", 72.0, 720.0, 14.0),
        GlyphRun::at("Date:", 72.0, 690.0, 10.0),
        GlyphRun::at("2024-05-01", 300.0, 691.0, 10.0),
        GlyphRun::at("Item", 72.0, 650.0, 10.0),
        GlyphRun::at("Qty", 300.0, 650.0, 10.0),
        GlyphRun::at("Price", 400.0, 649.0, 10.0),
        GlyphRun::at("Widget", 72.0, 630.0, 10.0),
    ];
    let clusterer = Clusterer::default();
    let rows = clusterer.rows(runs.clone());
    let segments = clusterer.segments(&rows);

    let flow = Pipeline::new(MockBackend::new(vec![runs.clone()]), ConvertOptions::default())
        .analyze()
        .unwrap();
    assert_eq!(flow.sections[0].record_count(), rows.len());
    assert_eq!(rows.len(), 4);

    let absolute = Pipeline::new(
        MockBackend::new(vec![runs]),
        ConvertOptions::default().absolute(),
    )
    .analyze()
    .unwrap();
    assert_eq!(absolute.sections[0].record_count(), segments.len());
    assert_eq!(segments.len(), 7);
    assert!(absolute.sections[0].records().iter().all(|r| r.is_absolute()));
}

#[test]
fn test_page_order_is_identity() {
    for n in 1..=6 {
        let pages: Vec<Vec<GlyphRun>> = (1..=n)
            .map(|i| {
                if i % 2 == 0 {
                    vec![]
                } else {
                    vec![GlyphRun::at(format!("page {}", i), 72.0, 700.0, 12.0)]
                }
            })
            .collect();
        let doc = Pipeline::new(MockBackend::new(pages), ConvertOptions::default())
            .analyze()
            .unwrap();
        let numbers: Vec<u32> = doc.sections.iter().map(|s| s.number).collect();
        assert_eq!(numbers, (1..=n).collect::<Vec<u32>>());
    }
}

#[test]
fn test_idempotent_layout() {
    let pages = vec![text_page("alpha"), text_page("beta")];
    for mode in [LayoutMode::Flow, LayoutMode::Absolute] {
        let options = ConvertOptions::default().with_layout_mode(mode);
        let first = Pipeline::new(MockBackend::new(pages.clone()), options.clone())
            .analyze()
            .unwrap();
        let second = Pipeline::new(MockBackend::new(pages.clone()), options)
            .analyze()
            .unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn test_page_selection_keeps_input_order() {
    let pages = vec![text_page("one"), text_page("two"), text_page("three")];
    let options = ConvertOptions::default().with_pages(PageSelection::parse("3,1").unwrap());
    let doc = Pipeline::new(MockBackend::new(pages), options)
        .analyze()
        .unwrap();
    let numbers: Vec<u32> = doc.sections.iter().map(|s| s.number).collect();
    assert_eq!(numbers, vec![1, 3]);
}

#[test]
fn test_page_range_clipped_to_document() {
    let pages = vec![text_page("one"), text_page("two")];
    let options = ConvertOptions::default().with_pages(PageSelection::parse("2-10").unwrap());
    let doc = Pipeline::new(MockBackend::new(pages), options)
        .analyze()
        .unwrap();
    assert_eq!(doc.section_count(), 1);
    assert_eq!(doc.sections[0].number, 2);
}

// ==================== Errors ====================

#[test]
fn test_rasterize_failure_is_fatal() {
    let backend = MockBackend::new(vec![text_page("one"), vec![]]).failing_render();
    let result = Pipeline::new(backend, ConvertOptions::default()).convert();
    assert!(matches!(result, Err(Error::Rasterize { page: 2, .. })));
}

#[test]
fn test_text_pages_never_rasterize() {
    let backend = MockBackend::new(vec![text_page("one"), text_page("two")]).failing_render();
    let result = Pipeline::new(backend, ConvertOptions::default()).convert();
    assert!(result.is_ok());
}

// ==================== Progress and cancellation ====================

#[test]
fn test_progress_percentages() {
    let pages = vec![text_page("1"), vec![], text_page("3"), text_page("4")];
    let (tx, rx) = progress_channel();
    Pipeline::new(MockBackend::new(pages), ConvertOptions::default())
        .with_progress(tx)
        .convert()
        .unwrap();

    let percents: Vec<u8> = rx.try_iter().map(|p| p.percent).collect();
    // round(i / 4 * 90)
    assert_eq!(percents, vec![23, 45, 68, 90, 95, 100]);
}

#[test]
fn test_progress_without_receiver() {
    let (tx, rx) = progress_channel();
    drop(rx);
    let result = Pipeline::new(MockBackend::new(vec![text_page("1")]), ConvertOptions::default())
        .with_progress(tx)
        .convert();
    assert!(result.is_ok());
}

#[test]
fn test_cancellation_between_pages() {
    let token = CancellationToken::new();
    let (tx, rx) = progress_channel();
    let pages = vec![text_page("1"), text_page("2"), text_page("3")];

    // Cancel as soon as the first page has been announced
    let watcher = {
        let token = token.clone();
        std::thread::spawn(move || {
            if rx.recv().is_ok() {
                token.cancel();
            }
            rx
        })
    };

    let pipeline = Pipeline::new(MockBackend::new(pages), ConvertOptions::default())
        .with_progress(tx)
        .with_cancellation(token.clone());

    // Wait for the watcher so the outcome is deterministic
    let first = pipeline.analyze();
    let _ = watcher.join();
    match first {
        Ok(doc) => assert_eq!(doc.section_count(), 3),
        Err(Error::Cancelled { page }) => assert!(page >= 2),
        Err(e) => panic!("unexpected error: {}", e),
    }

    // Once cancelled, a new run stops before its first page
    assert!(token.is_cancelled());
    assert!(matches!(
        pipeline.analyze(),
        Err(Error::Cancelled { page: 1 })
    ));
}
