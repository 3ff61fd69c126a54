//! Integration tests for the full render pipeline.
//!
//! The office engine and pdfium are replaced by in-process fakes: the fake
//! engine writes real PDFs with `lopdf`, the fake renderer writes raw page
//! files the way the pdfium worker pool names them. Everything else (input
//! resolution, OOXML geometry, PDF inspection, the fallback chain, temp-dir
//! lifetimes, sequencing) is the production code.
//!
//! Run with:
//!   cargo test --test pipeline

use doc2png::pipeline::engine::{expected_output, EngineInvocation, TargetFormat};
use doc2png::pipeline::render::{page_chunks, raw_page_name, PageRenderRequest};
use doc2png::{
    inspect, render_document, render_document_async, Doc2PngError, DocumentKind, DpiSource,
    GeometrySource, HeadlessEngine, ImageFormat, PageRenderer, RenderConfig,
    RenderProgressCallback,
};
use lopdf::{dictionary, Object};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use zip::write::SimpleFileOptions;

// ── Fixtures ─────────────────────────────────────────────────────────────────

const LETTER_SECTION: &str = r#"<w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:bottom="1440"/></w:sectPr>"#;

/// A `.docx`-shaped zip; `document_xml` of `None` leaves out `word/document.xml`.
fn write_docx(path: &Path, document_xml: Option<&str>) {
    let mut zip = zip::ZipWriter::new(fs::File::create(path).unwrap());
    let options = SimpleFileOptions::default();

    zip.start_file("[Content_Types].xml", options).unwrap();
    zip.write_all(br#"<?xml version="1.0"?><Types/>"#).unwrap();

    if let Some(xml) = document_xml {
        zip.start_file("word/document.xml", options).unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

fn document_xml(section: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body><w:p><w:r><w:t>Hello</w:t></w:r></w:p>{section}</w:body>
</w:document>"#
    )
}

/// A PDF with `pages` pages of `(width, height)` points.
fn write_pdf(path: &Path, pages: usize, size_pts: (i64, i64)) {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let kids: Vec<Object> = (0..pages)
        .map(|_| {
            Object::Reference(doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(size_pts.0),
                    Object::Integer(size_pts.1),
                ],
            }))
        })
        .collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => Object::Integer(pages as i64),
            "Kids" => kids,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

// ── Fakes ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Call {
    source: PathBuf,
    target: TargetFormat,
    output_dir: PathBuf,
    profile_dir: PathBuf,
}

/// Converts anything straight to a PDF of fixed size, or produces nothing
/// when `pages` is `None`. Every invocation is recorded.
struct FakeEngine {
    pages: Option<usize>,
    size_pts: (i64, i64),
    /// Hold the profile lock this long, to overlap concurrent calls.
    hold: Duration,
    calls: Mutex<Vec<Call>>,
}

impl FakeEngine {
    fn producing(pages: usize, size_pts: (i64, i64)) -> Arc<Self> {
        Arc::new(Self {
            pages: Some(pages),
            size_pts,
            hold: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            pages: None,
            size_pts: (0, 0),
            hold: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl HeadlessEngine for FakeEngine {
    fn name(&self) -> &str {
        "fake"
    }

    fn invoke(&self, inv: &EngineInvocation<'_>) {
        // A second holder of the same profile would fail here, as soffice does.
        let lock = inv.profile_dir.join(".lock");
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock)
            .expect("profile directory shared with another conversion");

        self.calls.lock().unwrap().push(Call {
            source: inv.source.to_path_buf(),
            target: inv.target,
            output_dir: inv.output_dir.to_path_buf(),
            profile_dir: inv.profile_dir.to_path_buf(),
        });

        std::thread::sleep(self.hold);
        if let (Some(pages), TargetFormat::Pdf) = (self.pages, inv.target) {
            write_pdf(
                &expected_output(inv.source, inv.target, inv.output_dir),
                pages,
                self.size_pts,
            );
        }
        fs::remove_file(&lock).unwrap();
    }
}

/// Writes empty raw page files named like the pdfium pool, last chunk first.
/// With `fail_after` set it stops after that many pages and returns an error.
struct FakeRenderer {
    seen_dpi: Mutex<Vec<u32>>,
    fail_after: Option<usize>,
}

impl FakeRenderer {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            seen_dpi: Mutex::new(Vec::new()),
            fail_after: None,
        })
    }

    fn failing_after(pages: usize) -> Arc<Self> {
        Arc::new(Self {
            seen_dpi: Mutex::new(Vec::new()),
            fail_after: Some(pages),
        })
    }
}

impl PageRenderer for FakeRenderer {
    fn render_pages(
        &self,
        pdf_path: &Path,
        request: &PageRenderRequest<'_>,
    ) -> Result<Vec<PathBuf>, Doc2PngError> {
        assert!(pdf_path.is_file(), "PDF must exist while rendering");
        self.seen_dpi.lock().unwrap().push(request.dpi);

        let mut written = Vec::new();
        let chunks = page_chunks(request.page_count, request.workers);
        for (i, pages) in chunks.iter().enumerate().rev() {
            for page in pages.clone() {
                if self.fail_after == Some(written.len()) {
                    return Err(Doc2PngError::RasterizationFailed {
                        detail: format!("page {page} failed"),
                    });
                }
                let name = raw_page_name(i + 1, page, request.page_count, request.format);
                let path = request.output_dir.join(name);
                fs::write(&path, b"").unwrap();
                if let Some(cb) = request.progress {
                    cb.on_page_rendered(page, request.page_count);
                }
                written.push(path);
            }
        }
        Ok(written)
    }
}

fn config_with(engine: Arc<FakeEngine>, renderer: Arc<FakeRenderer>) -> doc2png::RenderConfigBuilder {
    RenderConfig::builder()
        .engine(engine as Arc<dyn HeadlessEngine>)
        .page_renderer(renderer as Arc<dyn PageRenderer>)
}

fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn assert_scratch_dirs_removed(calls: &[Call]) {
    assert!(!calls.is_empty());
    for call in calls {
        assert!(
            call.profile_dir
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("soffice_profile_"),
            "unexpected profile dir {}",
            call.profile_dir.display()
        );
        assert!(!call.profile_dir.exists(), "{} left behind", call.profile_dir.display());
        assert!(!call.output_dir.exists(), "{} left behind", call.output_dir.display());
    }
}

// ── Geometry ─────────────────────────────────────────────────────────────────

#[test]
fn native_geometry_needs_no_engine() {
    let dir = tempfile::tempdir().unwrap();
    let docx = dir.path().join("letter.docx");
    write_docx(&docx, Some(&document_xml(LETTER_SECTION)));

    let engine = FakeEngine::failing();
    let config = config_with(engine.clone(), FakeRenderer::new()).build().unwrap();
    let inspection = inspect(&docx, &config).unwrap();

    assert_eq!(inspection.kind, DocumentKind::Native);
    assert_eq!(inspection.geometry.source, GeometrySource::NativeContainer);
    assert_eq!(inspection.geometry.width_in, 8.5);
    assert_eq!(inspection.geometry.height_in, 11.0);
    assert_eq!(inspection.dpi, 182);
    assert_eq!(inspection.dpi_source, DpiSource::Computed);
    assert!(engine.calls().is_empty(), "native path must not invoke the engine");
}

#[test]
fn missing_document_part_falls_back_to_pdf_size() {
    let dir = tempfile::tempdir().unwrap();
    let docx = dir.path().join("broken.docx");
    write_docx(&docx, None);

    // A4 in points.
    let engine = FakeEngine::producing(1, (595, 842));
    let config = config_with(engine.clone(), FakeRenderer::new()).build().unwrap();
    let inspection = inspect(&docx, &config).unwrap();

    assert_eq!(inspection.geometry.source, GeometrySource::ConvertedPdf);
    assert!((inspection.geometry.width_in - 595.0 / 72.0).abs() < 0.01);
    assert!((inspection.geometry.height_in - 842.0 / 72.0).abs() < 0.01);
    assert_eq!(engine.calls().len(), 1);
    assert_scratch_dirs_removed(&engine.calls());
}

#[test]
fn section_without_page_size_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let docx = dir.path().join("nosize.docx");
    write_docx(&docx, Some(&document_xml("<w:sectPr/>")));

    let engine = FakeEngine::producing(2, (612, 792));
    let config = config_with(engine, FakeRenderer::new()).build().unwrap();
    let inspection = inspect(&docx, &config).unwrap();

    assert_eq!(inspection.geometry.source, GeometrySource::ConvertedPdf);
    assert_eq!(inspection.geometry.width_in, 8.5);
}

#[test]
fn generic_document_goes_straight_to_conversion() {
    let dir = tempfile::tempdir().unwrap();
    let doc = dir.path().join("legacy.doc");
    fs::write(&doc, b"\xd0\xcf\x11\xe0").unwrap();

    let engine = FakeEngine::producing(1, (612, 792));
    let config = config_with(engine.clone(), FakeRenderer::new()).build().unwrap();
    let inspection = inspect(&doc, &config).unwrap();

    assert_eq!(inspection.kind, DocumentKind::Generic);
    assert_eq!(inspection.geometry.source, GeometrySource::ConvertedPdf);
    assert_eq!(engine.calls()[0].source, std::path::absolute(&doc).unwrap());
}

#[test]
fn geometry_unavailable_names_both_strategies() {
    let dir = tempfile::tempdir().unwrap();
    let docx = dir.path().join("broken.docx");
    write_docx(&docx, None);

    let config = config_with(FakeEngine::failing(), FakeRenderer::new())
        .build()
        .unwrap();
    match inspect(&docx, &config) {
        Err(Doc2PngError::GeometryUnavailable { detail, .. }) => {
            assert!(detail.contains("NativeContainer"), "{detail}");
            assert!(detail.contains("ConvertedPdf"), "{detail}");
        }
        other => panic!("expected GeometryUnavailable, got {other:?}"),
    }
}

// ── Full renders ─────────────────────────────────────────────────────────────

#[test]
fn explicit_dpi_renders_contiguous_pages_and_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let docx = dir.path().join("three.docx");
    write_docx(&docx, Some(&document_xml(LETTER_SECTION)));
    let out = dir.path().join("pages");

    let engine = FakeEngine::producing(3, (612, 792));
    let renderer = FakeRenderer::new();
    let config = config_with(engine.clone(), renderer.clone())
        .dpi(150)
        .workers(2)
        .output_dir(&out)
        .build()
        .unwrap();

    let output = render_document(&docx, &config).unwrap();

    assert_eq!(output.dpi, 150);
    assert_eq!(output.dpi_source, DpiSource::Override);
    assert!(output.geometry.is_none());
    assert_eq!(output.output_dir, out);
    assert_eq!(*renderer.seen_dpi.lock().unwrap(), vec![150]);
    assert_eq!(listing(&out), vec!["page-1.png", "page-2.png", "page-3.png"]);

    let numbers: Vec<usize> = output.pages.iter().map(|p| p.page_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(output.pages[2].path, out.join("page-3.png"));
    assert_eq!(output.stats.page_count, 3);

    // One direct conversion, no geometry conversion.
    let calls = engine.calls();
    assert_eq!(calls.len(), 1);
    assert_scratch_dirs_removed(&calls);
}

#[test]
fn computed_dpi_uses_native_geometry() {
    let dir = tempfile::tempdir().unwrap();
    let docx = dir.path().join("letter.docx");
    write_docx(&docx, Some(&document_xml(LETTER_SECTION)));

    let engine = FakeEngine::producing(2, (612, 792));
    let renderer = FakeRenderer::new();
    let config = config_with(engine, renderer.clone())
        .image_format(ImageFormat::Jpeg)
        .build()
        .unwrap();

    let output = render_document(&docx, &config).unwrap();

    assert_eq!(output.dpi, 182);
    assert_eq!(output.dpi_source, DpiSource::Computed);
    assert_eq!(
        output.geometry.map(|g| g.source),
        Some(GeometrySource::NativeContainer)
    );
    // Default output directory: the input path without its extension.
    assert_eq!(output.output_dir, std::path::absolute(dir.path()).unwrap().join("letter"));
    assert_eq!(listing(&output.output_dir), vec!["page-1.jpg", "page-2.jpg"]);
}

#[test]
fn failed_conversion_cleans_up_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let docx = dir.path().join("three.docx");
    write_docx(&docx, Some(&document_xml(LETTER_SECTION)));
    let out = dir.path().join("pages");

    let engine = FakeEngine::failing();
    let config = config_with(engine.clone(), FakeRenderer::new())
        .dpi(150)
        .output_dir(&out)
        .build()
        .unwrap();

    match render_document(&docx, &config) {
        Err(Doc2PngError::ConversionFailed { attempts, target, .. }) => {
            assert_eq!(attempts, 2);
            assert_eq!(target, "pdf");
        }
        other => panic!("expected ConversionFailed, got {other:?}"),
    }

    // Direct, then the ODT hop that produced nothing.
    let calls = engine.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].target, TargetFormat::Odt);
    assert_scratch_dirs_removed(&calls);
    assert!(!out.exists(), "output dir created by a failed call must be removed");
}

#[test]
fn renderer_failure_leaves_no_raw_pages() {
    let dir = tempfile::tempdir().unwrap();
    let docx = dir.path().join("three.docx");
    write_docx(&docx, Some(&document_xml(LETTER_SECTION)));
    let out = dir.path().join("pages");
    fs::create_dir(&out).unwrap();

    let engine = FakeEngine::producing(3, (612, 792));
    let config = config_with(engine.clone(), FakeRenderer::failing_after(2))
        .dpi(150)
        .output_dir(&out)
        .build()
        .unwrap();

    match render_document(&docx, &config) {
        Err(Doc2PngError::RasterizationFailed { detail }) => assert!(detail.contains("failed")),
        other => panic!("expected RasterizationFailed, got {other:?}"),
    }

    assert!(listing(&out).is_empty(), "left behind: {:?}", listing(&out));
    assert_scratch_dirs_removed(&engine.calls());
}

#[test]
fn rerender_into_same_dir_drops_stale_pages() {
    let dir = tempfile::tempdir().unwrap();
    let docx = dir.path().join("report.docx");
    write_docx(&docx, Some(&document_xml(LETTER_SECTION)));
    let out = dir.path().join("pages");

    let render = |pages: usize| {
        let config = config_with(FakeEngine::producing(pages, (612, 792)), FakeRenderer::new())
            .dpi(96)
            .output_dir(&out)
            .build()
            .unwrap();
        render_document(&docx, &config).unwrap()
    };

    assert_eq!(render(4).pages.len(), 4);
    let second = render(2);

    assert_eq!(second.pages.len(), 2);
    assert_eq!(listing(&out), vec!["page-1.png", "page-2.png"]);
}

#[test]
fn extensionless_input_renders_next_to_itself() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("README");
    fs::write(&input, "plain text").unwrap();

    let config = config_with(FakeEngine::producing(1, (612, 792)), FakeRenderer::new())
        .dpi(72)
        .build()
        .unwrap();
    let output = render_document(&input, &config).unwrap();

    assert_eq!(
        output.output_dir,
        std::path::absolute(dir.path()).unwrap().join("README_pages")
    );
    assert_eq!(listing(&output.output_dir), vec!["page-1.png"]);
}

#[test]
fn missing_input_is_file_not_found() {
    let config = config_with(FakeEngine::failing(), FakeRenderer::new())
        .build()
        .unwrap();
    assert!(matches!(
        render_document("/no/such/document.docx", &config),
        Err(Doc2PngError::FileNotFound { .. })
    ));
}

#[test]
fn progress_callback_sees_every_page() {
    #[derive(Default)]
    struct Tracking {
        started: AtomicUsize,
        rendered: AtomicUsize,
        completed: AtomicUsize,
    }

    impl RenderProgressCallback for Tracking {
        fn on_render_start(&self, total_pages: usize) {
            self.started.store(total_pages, Ordering::SeqCst);
        }
        fn on_page_rendered(&self, _page_num: usize, _total_pages: usize) {
            self.rendered.fetch_add(1, Ordering::SeqCst);
        }
        fn on_render_complete(&self, total_pages: usize) {
            self.completed.store(total_pages, Ordering::SeqCst);
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let docx = dir.path().join("five.docx");
    write_docx(&docx, Some(&document_xml(LETTER_SECTION)));

    let tracking = Arc::new(Tracking::default());
    let config = config_with(FakeEngine::producing(5, (612, 792)), FakeRenderer::new())
        .dpi(96)
        .progress_callback(tracking.clone() as Arc<dyn RenderProgressCallback>)
        .build()
        .unwrap();

    render_document(&docx, &config).unwrap();

    assert_eq!(tracking.started.load(Ordering::SeqCst), 5);
    assert_eq!(tracking.rendered.load(Ordering::SeqCst), 5);
    assert_eq!(tracking.completed.load(Ordering::SeqCst), 5);
}

// ── Concurrency ──────────────────────────────────────────────────────────────

#[test]
fn concurrent_renders_use_distinct_profiles() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine {
        pages: Some(2),
        size_pts: (612, 792),
        hold: Duration::from_millis(100),
        calls: Mutex::new(Vec::new()),
    });

    let outputs: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = ["a", "b"]
            .into_iter()
            .map(|name| {
                let docx = dir.path().join(format!("{name}.docx"));
                write_docx(&docx, Some(&document_xml(LETTER_SECTION)));
                let config = config_with(engine.clone(), FakeRenderer::new())
                    .dpi(150)
                    .build()
                    .unwrap();
                s.spawn(move || render_document(&docx, &config))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for output in outputs {
        let output = output.unwrap();
        assert_eq!(listing(&output.output_dir), vec!["page-1.png", "page-2.png"]);
    }

    let calls = engine.calls();
    assert_eq!(calls.len(), 2);
    assert_ne!(calls[0].profile_dir, calls[1].profile_dir);
    assert_ne!(calls[0].output_dir, calls[1].output_dir);
    assert_scratch_dirs_removed(&calls);
}

#[tokio::test(flavor = "multi_thread")]
async fn async_wrapper_matches_blocking_call() {
    let dir = tempfile::tempdir().unwrap();
    let docx = dir.path().join("async.docx");
    write_docx(&docx, Some(&document_xml(LETTER_SECTION)));

    let config = config_with(FakeEngine::producing(4, (612, 792)), FakeRenderer::new())
        .dpi(72)
        .build()
        .unwrap();

    let output = render_document_async(&docx, &config).await.unwrap();
    assert_eq!(output.pages.len(), 4);
    assert_eq!(
        listing(&output.output_dir),
        vec!["page-1.png", "page-2.png", "page-3.png", "page-4.png"]
    );
}
