//! Batch-level integration tests.
//!
//! The extraction and translation services are replaced by in-memory doubles
//! so these run offline. Every test works in its own temporary directory and
//! disables pacing.

use async_trait::async_trait;
use paper_translate::{
    run_batch_with, BatchConfig, BatchProgressCallback, BatchSummary, ExtractError, OutputFormat,
    ProgressCallback, StructureExtractor, TextTranslator, Translation, TranslationOutcome,
};
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use tempfile::TempDir;

// ── Test helpers ─────────────────────────────────────────────────────────────

const A_STUDY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <teiHeader>
    <fileDesc><titleStmt><title level="a" type="main">A Study</title></titleStmt></fileDesc>
  </teiHeader>
  <text>
    <body><div><p>Hello world.</p></div></body>
    <back><div type="references"><listBibl>
      <biblStruct><analytic><title>Deep Nets</title></analytic>
        <monogr><imprint><date type="published" when="2020"/></imprint></monogr>
      </biblStruct>
    </listBibl></div></back>
  </text>
</TEI>"#;

const A_STUDY_NO_REFS: &str = r#"<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <teiHeader><fileDesc><titleStmt><title>A Study</title></titleStmt></fileDesc></teiHeader>
  <text><body><div><p>Hello world.</p></div></body><back><div type="references"><listBibl/></div></back></text>
</TEI>"#;

const THREE_PARAGRAPHS: &str = r#"<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <teiHeader><fileDesc><titleStmt><title>Limits</title></titleStmt></fileDesc></teiHeader>
  <text><body><div>
    <p>First paragraph.</p>
    <p>Second LIMIT paragraph.</p>
    <p>Third paragraph.</p>
  </div></body></text>
</TEI>"#;

const NO_BODY: &str = r#"<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <teiHeader><fileDesc><titleStmt><title>Empty</title></titleStmt></fileDesc></teiHeader>
  <text><body><div><head>Only a heading</head></div></body></text>
</TEI>"#;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("in")).unwrap();
        Self { dir }
    }

    fn input(&self) -> PathBuf {
        self.dir.path().join("in")
    }

    fn output(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    fn add_pdf(&self, name: &str) {
        std::fs::write(self.input().join(name), b"%PDF-1.7\n% test fixture\n").unwrap();
    }

    fn config(&self, format: OutputFormat) -> BatchConfig {
        BatchConfig::builder()
            .api_key("test-key")
            .input_dir(self.input())
            .output_dir(self.output())
            .output_format(format)
            .pacing_ms(0)
            .build()
            .unwrap()
    }

    fn artifact(&self, rel: &str) -> PathBuf {
        self.output().join(rel)
    }

    fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.artifact(rel)).unwrap()
    }

    /// Every file under the output root with its modification time.
    fn snapshot(&self) -> Vec<(PathBuf, SystemTime)> {
        fn walk(dir: &Path, out: &mut Vec<(PathBuf, SystemTime)>) {
            for entry in std::fs::read_dir(dir).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    walk(&path, out);
                } else {
                    let modified = std::fs::metadata(&path).unwrap().modified().unwrap();
                    out.push((path, modified));
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.output(), &mut out);
        out.sort();
        out
    }
}

/// Returns the configured markup per file name, or `default` for the rest.
struct ScriptedExtractor {
    default: Result<String, ExtractError>,
    per_file: HashMap<String, Result<String, ExtractError>>,
    calls: AtomicUsize,
}

impl ScriptedExtractor {
    fn always(markup: &str) -> Self {
        Self {
            default: Ok(markup.to_string()),
            per_file: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    fn failing(err: ExtractError) -> Self {
        Self {
            default: Err(err),
            per_file: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    fn with(mut self, file: &str, result: Result<String, ExtractError>) -> Self {
        self.per_file.insert(file.to_string(), result);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StructureExtractor for ScriptedExtractor {
    async fn extract(&self, file_name: &str, pdf: Vec<u8>) -> Result<String, ExtractError> {
        assert!(pdf.starts_with(b"%PDF"));
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.per_file
            .get(file_name)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

/// Looks text up in a dictionary and upper-cases anything else. Text
/// containing `quota_marker` gets a quota failure.
struct DictTranslator {
    dict: HashMap<&'static str, &'static str>,
    quota_marker: Option<&'static str>,
    seen: Mutex<Vec<String>>,
}

impl DictTranslator {
    fn new(entries: &[(&'static str, &'static str)]) -> Self {
        Self {
            dict: entries.iter().copied().collect(),
            quota_marker: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    fn quota_on(mut self, marker: &'static str) -> Self {
        self.quota_marker = Some(marker);
        self
    }

    fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextTranslator for DictTranslator {
    async fn translate(&self, text: &str) -> Translation {
        self.seen.lock().unwrap().push(text.to_string());
        if let Some(marker) = self.quota_marker {
            if text.contains(marker) {
                return Translation::failed(TranslationOutcome::QuotaExceeded);
            }
        }
        match self.dict.get(text) {
            Some(t) => Translation::ok(*t),
            None => Translation::ok(text.to_uppercase()),
        }
    }
}

fn a_study_translator() -> DictTranslator {
    DictTranslator::new(&[("A Study", "ある研究"), ("Hello world.", "こんにちは世界。")])
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn a_study_end_to_end_text() {
    let ws = Workspace::new();
    ws.add_pdf("study.pdf");
    let extractor = ScriptedExtractor::always(A_STUDY);
    let translator = a_study_translator();

    let summary = run_batch_with(&ws.config(OutputFormat::Text), &extractor, &translator)
        .await
        .unwrap();

    assert_eq!(summary.total, 1);
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.with_errors, 0);
    assert_eq!(
        ws.read("txt/study_translated.txt"),
        "# ある研究\n\n_A Study_\n\n## Body (Translated)\n\nこんにちは世界。\n\n---\n\n## References\n\n[1] \"Deep Nets\" (2020)\n"
    );
    assert_eq!(ws.read("text/study_title.txt"), "A Study");
    assert_eq!(ws.read("text/study_body.txt"), "Hello world.");
    assert_eq!(ws.read("text/study_references.txt"), "[1] \"Deep Nets\" (2020)");
    assert_eq!(ws.read("text/study_body_translated.txt"), "こんにちは世界。");
    assert!(ws.artifact("xml/study.xml").is_file());
}

#[tokio::test]
async fn a_study_without_references_has_no_reference_section() {
    let ws = Workspace::new();
    ws.add_pdf("study.pdf");
    let extractor = ScriptedExtractor::always(A_STUDY_NO_REFS);
    let translator = a_study_translator();

    run_batch_with(&ws.config(OutputFormat::Text), &extractor, &translator)
        .await
        .unwrap();

    assert_eq!(
        ws.read("txt/study_translated.txt"),
        "# ある研究\n\n_A Study_\n\n## Body (Translated)\n\nこんにちは世界。\n"
    );
    assert_eq!(ws.read("text/study_references.txt"), "");
}

#[tokio::test]
async fn a_study_end_to_end_docx() {
    let ws = Workspace::new();
    ws.add_pdf("study.pdf");
    let extractor = ScriptedExtractor::always(A_STUDY);
    let translator = a_study_translator();

    run_batch_with(&ws.config(OutputFormat::Docx), &extractor, &translator)
        .await
        .unwrap();

    let bytes = std::fs::read(ws.artifact("docx/study_translated.docx")).unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .unwrap()
        .read_to_string(&mut xml)
        .unwrap();

    let title = xml.find("ある研究").unwrap();
    let subtitle = xml.find("A Study").unwrap();
    let body = xml.find("こんにちは世界。").unwrap();
    let refs = xml.find("[1] &quot;Deep Nets&quot; (2020)").unwrap();
    assert!(title < subtitle && subtitle < body && body < refs);
    assert!(xml.contains("w:type=\"page\""));
}

#[tokio::test]
async fn completed_documents_are_skipped_without_calls_or_writes() {
    let ws = Workspace::new();
    ws.add_pdf("a.pdf");
    ws.add_pdf("b.pdf");
    let config = ws.config(OutputFormat::Text);

    let first_extractor = ScriptedExtractor::always(A_STUDY);
    let first_translator = a_study_translator();
    let first = run_batch_with(&config, &first_extractor, &first_translator)
        .await
        .unwrap();
    assert_eq!(first.processed, 2);
    let before = ws.snapshot();

    let extractor = ScriptedExtractor::always(A_STUDY);
    let translator = a_study_translator();
    let second = run_batch_with(&config, &extractor, &translator).await.unwrap();

    assert_eq!(second.processed, 0);
    assert_eq!(second.cached, 2);
    assert_eq!(second.skipped(), 2);
    assert_eq!(extractor.calls(), 0);
    assert_eq!(translator.calls(), 0);
    assert_eq!(ws.snapshot(), before);
}

#[tokio::test]
async fn extraction_status_error_skips_and_continues() {
    let ws = Workspace::new();
    ws.add_pdf("a_bad.pdf");
    ws.add_pdf("b_good.pdf");
    let extractor = ScriptedExtractor::always(A_STUDY).with("a_bad.pdf", Err(ExtractError::Status(500)));
    let translator = a_study_translator();

    let summary = run_batch_with(&ws.config(OutputFormat::Text), &extractor, &translator)
        .await
        .unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.processed, 1);
    assert!(!summary.was_aborted());
    assert_eq!(extractor.calls(), 2);
    assert!(!ws.artifact("xml/a_bad.xml").exists());
    assert!(ws.artifact("txt/b_good_translated.txt").is_file());
}

#[tokio::test]
async fn unreachable_service_aborts_the_batch() {
    let ws = Workspace::new();
    for name in ["one.pdf", "two.pdf", "three.pdf"] {
        ws.add_pdf(name);
    }
    let extractor = ScriptedExtractor::failing(ExtractError::Unreachable {
        url: "http://localhost:8070".into(),
        detail: "connection refused".into(),
    });
    let translator = a_study_translator();

    let summary = run_batch_with(&ws.config(OutputFormat::Text), &extractor, &translator)
        .await
        .unwrap();

    assert!(summary.was_aborted());
    assert!(summary.aborted.as_deref().unwrap().contains("unreachable"));
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.remaining, 2);
    assert_eq!(summary.processed, 0);
    assert_eq!(extractor.calls(), 1);
    assert_eq!(translator.calls(), 0);
}

#[tokio::test]
async fn timeout_is_not_fatal() {
    let ws = Workspace::new();
    ws.add_pdf("a.pdf");
    ws.add_pdf("b.pdf");
    let extractor =
        ScriptedExtractor::always(A_STUDY).with("a.pdf", Err(ExtractError::Timeout { secs: 180 }));
    let translator = a_study_translator();

    let summary = run_batch_with(&ws.config(OutputFormat::Text), &extractor, &translator)
        .await
        .unwrap();

    assert!(!summary.was_aborted());
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.processed, 1);
}

#[tokio::test]
async fn cached_markup_skips_extraction() {
    let ws = Workspace::new();
    ws.add_pdf("study.pdf");
    let config = ws.config(OutputFormat::Text);
    std::fs::create_dir_all(ws.artifact("xml")).unwrap();
    std::fs::write(ws.artifact("xml/study.xml"), A_STUDY).unwrap();

    let extractor = ScriptedExtractor::failing(ExtractError::Status(500));
    let translator = a_study_translator();
    let summary = run_batch_with(&config, &extractor, &translator).await.unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(extractor.calls(), 0);
    assert!(ws.read("txt/study_translated.txt").contains("こんにちは世界。"));
}

#[tokio::test]
async fn cached_translation_skips_body_translation() {
    let ws = Workspace::new();
    ws.add_pdf("study.pdf");
    let config = ws.config(OutputFormat::Text);
    std::fs::create_dir_all(ws.artifact("text")).unwrap();
    std::fs::write(ws.artifact("text/study_title.txt"), "A Study").unwrap();
    std::fs::write(ws.artifact("text/study_references.txt"), "").unwrap();
    std::fs::write(ws.artifact("text/study_body_translated.txt"), "前に訳した本文。").unwrap();

    let extractor = ScriptedExtractor::failing(ExtractError::Status(500));
    let translator = a_study_translator();
    let summary = run_batch_with(&config, &extractor, &translator).await.unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(extractor.calls(), 0);
    // Only the title is translated again.
    assert_eq!(translator.seen(), vec!["A Study".to_string()]);

    let text = ws.read("txt/study_translated.txt");
    assert!(text.starts_with("# ある研究"));
    assert!(text.contains("前に訳した本文。"));
    assert!(!text.contains("## References"));
}

#[tokio::test]
async fn quota_failure_marks_only_that_paragraph() {
    let ws = Workspace::new();
    ws.add_pdf("limits.pdf");
    let extractor = ScriptedExtractor::always(THREE_PARAGRAPHS);
    let translator = DictTranslator::new(&[]).quota_on("LIMIT");

    let summary = run_batch_with(&ws.config(OutputFormat::Text), &extractor, &translator)
        .await
        .unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.with_errors, 1);

    let text = ws.read("txt/limits_translated.txt");
    assert!(text.contains(
        "FIRST PARAGRAPH.\n\n[Translation Error: Quota Exceeded]\n\nTHIRD PARAGRAPH.\n"
    ));
    // Incomplete translations are not cached, so the next run retries them.
    assert!(!ws.artifact("text/limits_body_translated.txt").exists());
    assert!(ws.artifact("text/limits_body.txt").exists());
}

#[tokio::test]
async fn non_pdf_file_is_skipped_before_extraction() {
    let ws = Workspace::new();
    std::fs::write(ws.input().join("fake.pdf"), b"<html>not a pdf</html>").unwrap();
    ws.add_pdf("real.pdf");
    let extractor = ScriptedExtractor::always(A_STUDY);
    let translator = a_study_translator();

    let summary = run_batch_with(&ws.config(OutputFormat::Text), &extractor, &translator)
        .await
        .unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.processed, 1);
    assert_eq!(extractor.calls(), 1);
}

#[tokio::test]
async fn document_without_paragraphs_fails() {
    let ws = Workspace::new();
    ws.add_pdf("empty.pdf");
    let extractor = ScriptedExtractor::always(NO_BODY);
    let translator = a_study_translator();

    let summary = run_batch_with(&ws.config(OutputFormat::Text), &extractor, &translator)
        .await
        .unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.processed, 0);
    assert_eq!(translator.calls(), 0);
    assert!(ws.artifact("xml/empty.xml").exists());
    assert!(!ws.artifact("text/empty_title.txt").exists());
    assert!(!ws.artifact("txt/empty_translated.txt").exists());
}

#[tokio::test]
async fn non_pdf_extensions_are_ignored() {
    let ws = Workspace::new();
    std::fs::write(ws.input().join("notes.txt"), b"%PDF but wrong extension").unwrap();
    ws.add_pdf("UPPER.PDF");
    let extractor = ScriptedExtractor::always(A_STUDY);
    let translator = a_study_translator();

    let summary = run_batch_with(&ws.config(OutputFormat::Text), &extractor, &translator)
        .await
        .unwrap();

    assert_eq!(summary.total, 1);
    assert!(ws.artifact("txt/UPPER_translated.txt").is_file());
}

#[tokio::test]
async fn inputs_sharing_a_name_are_processed_once() {
    let ws = Workspace::new();
    ws.add_pdf("study.pdf");
    ws.add_pdf("study.PDF");
    let extractor = ScriptedExtractor::always(A_STUDY);
    let translator = a_study_translator();

    let summary = run_batch_with(&ws.config(OutputFormat::Text), &extractor, &translator)
        .await
        .unwrap();

    assert_eq!(summary.total, 1);
    assert_eq!(summary.processed, 1);
    assert_eq!(extractor.calls(), 1);
    assert!(ws.artifact("txt/study_translated.txt").is_file());
}

// ── Progress events ──────────────────────────────────────────────────────────

#[derive(Default)]
struct EventLog {
    events: Mutex<Vec<String>>,
}

impl BatchProgressCallback for EventLog {
    fn on_batch_start(&self, total_documents: usize) {
        self.events.lock().unwrap().push(format!("start {total_documents}"));
    }

    fn on_document_cached(&self, name: &str) {
        self.events.lock().unwrap().push(format!("cached {name}"));
    }

    fn on_document_complete(&self, name: &str, failed_translations: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("done {name} {failed_translations}"));
    }

    fn on_document_error(&self, name: &str, _error: &str) {
        self.events.lock().unwrap().push(format!("error {name}"));
    }

    fn on_batch_complete(&self, summary: &BatchSummary) {
        self.events
            .lock()
            .unwrap()
            .push(format!("end {}", summary.processed));
    }
}

#[tokio::test]
async fn progress_events_follow_file_name_order() {
    let ws = Workspace::new();
    ws.add_pdf("b.pdf");
    ws.add_pdf("a.pdf");
    ws.add_pdf("c.pdf");
    let log = Arc::new(EventLog::default());

    let config = BatchConfig::builder()
        .api_key("test-key")
        .input_dir(ws.input())
        .output_dir(ws.output())
        .output_format(OutputFormat::Text)
        .pacing_ms(0)
        .progress_callback(log.clone() as ProgressCallback)
        .build()
        .unwrap();
    let extractor =
        ScriptedExtractor::always(A_STUDY).with("b.pdf", Err(ExtractError::Status(503)));
    let translator = a_study_translator();

    run_batch_with(&config, &extractor, &translator).await.unwrap();

    assert_eq!(
        *log.events.lock().unwrap(),
        vec!["start 3", "done a 0", "error b", "done c 0", "end 2"]
    );
}
