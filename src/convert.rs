//! Per-document pipeline: extract, parse, translate, assemble.
//!
//! [`process_document`] asks the artifact store where to start and runs only
//! the stages after that point. Every completed stage leaves its artifact on
//! disk, so a crash or abort costs at most the stage that was in flight.
//!
//! ```text
//! ResumePoint::Extract   ─▶ extract ─▶ parse ─▶ title ─▶ body ─▶ assemble
//! ResumePoint::Parse     ───────────▶ parse ─▶ title ─▶ body ─▶ assemble
//! ResumePoint::Translate ─────────────────────▶ title ─▶ body ─▶ assemble
//! ResumePoint::Assemble  ─────────────────────▶ title ──────────▶ assemble
//! ResumePoint::Complete  (nothing runs)
//! ```
//!
//! The translated title is never stored on its own, so every non-cached run
//! translates it again.

use crate::config::BatchConfig;
use crate::error::ItemError;
use crate::output::{Document, ItemOutcome, Stage};
use crate::pipeline::artifacts::{ArtifactKind, ArtifactLayout, ArtifactPaths, ResumePoint};
use crate::pipeline::assemble::{assemble, AssemblyInput};
use crate::pipeline::extract::StructureExtractor;
use crate::pipeline::input;
use crate::pipeline::paragraphs::{split_paragraphs, translate_long, BatchOptions};
use crate::pipeline::tei;
use crate::pipeline::translate::TextTranslator;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where the body text comes from once the title is known.
enum Body {
    /// Untranslated body from the parse stage or its artifact.
    Source(String),
    /// Previously completed translation loaded from its artifact.
    Translated(String),
}

/// Inputs for the translation stages, however they were obtained.
struct Prepared {
    title: String,
    references: Vec<String>,
    body: Body,
}

/// Run the pipeline for one PDF.
///
/// # Returns
/// * `Ok(ItemOutcome::Cached)` when the final artifact already existed
/// * `Ok(ItemOutcome::Processed { .. })` when it was written in this run,
///   possibly with translation sentinels in some slots
///
/// # Errors
/// Any [`ItemError`] abandons this document. Only an unreachable extraction
/// service ([`ItemError::is_fatal`]) should stop the batch.
pub async fn process_document(
    pdf: &Path,
    config: &BatchConfig,
    layout: &ArtifactLayout,
    extractor: &dyn StructureExtractor,
    translator: &dyn TextTranslator,
) -> Result<ItemOutcome, ItemError> {
    let name = input::base_name(pdf);
    let paths = layout.paths_for(&name);

    let plan = paths.plan().await;
    if plan == ResumePoint::Complete {
        info!("Skipping {} (already translated)", name);
        return Ok(ItemOutcome::Cached);
    }
    info!("Processing {} from {:?}", name, plan);

    let notify = |stage: Stage| {
        debug!("{}: {}", name, stage);
        if let Some(ref cb) = config.progress_callback {
            cb.on_stage(&name, stage);
        }
    };

    let prepared = match plan {
        ResumePoint::Assemble => {
            info!("Using cached translation for {}", name);
            Prepared {
                title: paths.read(ArtifactKind::ExtractedTitle).await?,
                references: paths.read_references().await?,
                body: Body::Translated(paths.read(ArtifactKind::TranslatedBody).await?),
            }
        }
        ResumePoint::Translate => {
            info!("Using cached extraction for {}", name);
            Prepared {
                title: paths.read(ArtifactKind::ExtractedTitle).await?,
                references: paths.read_references().await?,
                body: Body::Source(paths.read(ArtifactKind::ExtractedBody).await?),
            }
        }
        _ => {
            let markup = if plan == ResumePoint::Parse {
                info!("Using cached markup for {}", name);
                paths.read(ArtifactKind::RawMarkup).await?
            } else {
                notify(Stage::Extract);
                extract_markup(pdf, &paths, extractor).await?
            };

            notify(Stage::Parse);
            let doc = parse_markup(&markup, &paths).await?;
            let body = doc.body_text();
            Prepared {
                title: doc.title,
                references: doc.references,
                body: Body::Source(body),
            }
        }
    };

    if let Body::Source(ref text) = prepared.body {
        if split_paragraphs(text).is_empty() {
            return Err(ItemError::EmptyBody);
        }
    }

    notify(Stage::TranslateTitle);
    let title = translator.translate(&prepared.title).await;
    let mut failed = usize::from(!title.is_ok());
    if !title.is_ok() {
        warn!("{}: title translation failed: {}", name, title);
    }

    let translated_body = match prepared.body {
        Body::Translated(text) => text,
        Body::Source(text) => {
            notify(Stage::TranslateBody);
            let options = BatchOptions {
                pacing: Duration::from_millis(config.pacing_ms),
                progress_every: config.progress_every,
                name: name.clone(),
                progress: config.progress_callback.clone(),
            };
            let body = translate_long(translator, &text, &options).await;
            failed += body.failures();

            let joined = body.joined();
            if body.is_complete() {
                paths
                    .write(ArtifactKind::TranslatedBody, joined.as_bytes())
                    .await?;
            } else {
                warn!(
                    "{}: {} of {} paragraphs failed; translation not cached",
                    name,
                    body.failures(),
                    body.paragraphs.len()
                );
            }
            joined
        }
    };

    notify(Stage::Assemble);
    let translated_title = title.rendered();
    let assembly = AssemblyInput {
        original_title: &prepared.title,
        translated_title: &translated_title,
        translated_body: &translated_body,
        references: &prepared.references,
    };
    assemble(
        &assembly,
        layout.format(),
        paths.path(ArtifactKind::FinalOutput),
    )
    .await?;

    Ok(ItemOutcome::Processed {
        failed_translations: failed,
    })
}

async fn extract_markup(
    pdf: &Path,
    paths: &ArtifactPaths,
    extractor: &dyn StructureExtractor,
) -> Result<String, ItemError> {
    let bytes = input::read_pdf(pdf).await?;
    let file_name = pdf
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let markup = extractor.extract(&file_name, bytes).await?;
    paths
        .write(ArtifactKind::RawMarkup, markup.as_bytes())
        .await?;
    Ok(markup)
}

/// Parse `markup` and persist title, body and references.
///
/// Nothing is written when the body is empty, so the document will be
/// parsed again on the next run.
async fn parse_markup(markup: &str, paths: &ArtifactPaths) -> Result<Document, ItemError> {
    let doc = tei::parse_tei(markup)?;
    if doc.paragraphs.is_empty() {
        return Err(ItemError::EmptyBody);
    }

    paths
        .write(ArtifactKind::ExtractedTitle, doc.title.as_bytes())
        .await?;
    paths
        .write(ArtifactKind::ExtractedBody, doc.body_text().as_bytes())
        .await?;
    paths.write_references(&doc.references).await?;
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use crate::error::ExtractError;
    use crate::pipeline::translate::{Translation, TranslationOutcome};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const TEI: &str = r#"<TEI xmlns="http://www.tei-c.org/ns/1.0">
      <teiHeader><fileDesc><titleStmt><title>A Study</title></titleStmt></fileDesc></teiHeader>
      <text><body><div><p>Hello world.</p></div></body></text></TEI>"#;

    struct FixedExtractor {
        markup: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl StructureExtractor for FixedExtractor {
        async fn extract(&self, _name: &str, _pdf: Vec<u8>) -> Result<String, ExtractError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.markup.to_string())
        }
    }

    struct Upper {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextTranslator for Upper {
        async fn translate(&self, text: &str) -> Translation {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Translation::ok(text.to_uppercase())
        }
    }

    struct AlwaysQuota;

    #[async_trait]
    impl TextTranslator for AlwaysQuota {
        async fn translate(&self, _text: &str) -> Translation {
            Translation::failed(TranslationOutcome::QuotaExceeded)
        }
    }

    fn setup(dir: &TempDir) -> (BatchConfig, ArtifactLayout, std::path::PathBuf) {
        let input = dir.path().join("in");
        std::fs::create_dir_all(&input).unwrap();
        let pdf = input.join("paper.pdf");
        std::fs::write(&pdf, b"%PDF-1.4 test").unwrap();

        let config = BatchConfig::builder()
            .api_key("k")
            .input_dir(&input)
            .output_dir(dir.path().join("out"))
            .output_format(OutputFormat::Text)
            .pacing_ms(0)
            .build()
            .unwrap();
        let layout = ArtifactLayout::new(&config.output_dir, config.output_format);
        layout.ensure_dirs().unwrap();
        (config, layout, pdf)
    }

    #[tokio::test]
    async fn full_run_writes_every_artifact() {
        let dir = TempDir::new().unwrap();
        let (config, layout, pdf) = setup(&dir);
        let extractor = FixedExtractor { markup: TEI, calls: AtomicUsize::new(0) };
        let translator = Upper { calls: AtomicUsize::new(0) };

        let outcome = process_document(&pdf, &config, &layout, &extractor, &translator)
            .await
            .unwrap();
        assert_eq!(outcome, ItemOutcome::Processed { failed_translations: 0 });

        let paths = layout.paths_for("paper");
        for kind in [
            ArtifactKind::RawMarkup,
            ArtifactKind::ExtractedTitle,
            ArtifactKind::ExtractedBody,
            ArtifactKind::ExtractedReferences,
            ArtifactKind::TranslatedBody,
            ArtifactKind::FinalOutput,
        ] {
            assert!(paths.exists(kind).await, "missing {kind:?}");
        }
        let text = paths.read(ArtifactKind::FinalOutput).await.unwrap();
        assert!(text.starts_with("# A STUDY\n\n_A Study_"));
        assert!(text.contains("HELLO WORLD."));
    }

    #[tokio::test]
    async fn second_run_is_cached() {
        let dir = TempDir::new().unwrap();
        let (config, layout, pdf) = setup(&dir);
        let extractor = FixedExtractor { markup: TEI, calls: AtomicUsize::new(0) };
        let translator = Upper { calls: AtomicUsize::new(0) };

        process_document(&pdf, &config, &layout, &extractor, &translator)
            .await
            .unwrap();
        let outcome = process_document(&pdf, &config, &layout, &extractor, &translator)
            .await
            .unwrap();

        assert_eq!(outcome, ItemOutcome::Cached);
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);
        assert_eq!(translator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_translations_are_not_cached() {
        let dir = TempDir::new().unwrap();
        let (config, layout, pdf) = setup(&dir);
        let extractor = FixedExtractor { markup: TEI, calls: AtomicUsize::new(0) };

        let outcome = process_document(&pdf, &config, &layout, &extractor, &AlwaysQuota)
            .await
            .unwrap();
        assert_eq!(outcome, ItemOutcome::Processed { failed_translations: 2 });

        let paths = layout.paths_for("paper");
        assert!(!paths.exists(ArtifactKind::TranslatedBody).await);
        let text = paths.read(ArtifactKind::FinalOutput).await.unwrap();
        assert!(text.contains("[Translation Error: Quota Exceeded]"));
    }

    #[tokio::test]
    async fn empty_body_writes_no_text_artifacts() {
        let dir = TempDir::new().unwrap();
        let (config, layout, pdf) = setup(&dir);
        let extractor = FixedExtractor {
            markup: "<TEI><text><body/></text></TEI>",
            calls: AtomicUsize::new(0),
        };
        let translator = Upper { calls: AtomicUsize::new(0) };

        let err = process_document(&pdf, &config, &layout, &extractor, &translator)
            .await
            .unwrap_err();
        assert!(matches!(err, ItemError::EmptyBody));

        let paths = layout.paths_for("paper");
        assert!(paths.exists(ArtifactKind::RawMarkup).await);
        assert!(!paths.exists(ArtifactKind::ExtractedTitle).await);
        assert_eq!(translator.calls.load(Ordering::SeqCst), 0);
    }
}
