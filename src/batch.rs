//! Batch driver: every PDF in the input directory, one at a time.
//!
//! Documents are processed sequentially in file-name order. A document that
//! fails is logged, counted and skipped; the next one starts immediately.
//! The loop stops early only when the extraction service cannot be reached,
//! since every remaining document would fail the same way.

use crate::config::BatchConfig;
use crate::convert::process_document;
use crate::error::PipelineError;
use crate::output::{BatchSummary, ItemOutcome};
use crate::pipeline::artifacts::ArtifactLayout;
use crate::pipeline::extract::{GrobidClient, StructureExtractor};
use crate::pipeline::input;
use crate::pipeline::translate::{DeeplTranslator, TextTranslator};
use std::time::Instant;
use tracing::{error, info, warn};

/// Run the batch against the configured services.
///
/// Builds a [`GrobidClient`] and a [`DeeplTranslator`] from `config` and
/// delegates to [`run_batch_with`].
///
/// # Errors
/// Returns `Err` only when the run cannot start. Per-document failures are
/// reported through the returned [`BatchSummary`].
pub async fn run_batch(config: &BatchConfig) -> Result<BatchSummary, PipelineError> {
    let extractor =
        GrobidClient::from_config(config).map_err(|e| PipelineError::ClientInit(e.to_string()))?;
    let translator = DeeplTranslator::from_config(config)
        .map_err(|e| PipelineError::ClientInit(e.to_string()))?;
    run_batch_with(config, &extractor, &translator).await
}

/// Run the batch with caller-supplied service implementations.
pub async fn run_batch_with(
    config: &BatchConfig,
    extractor: &dyn StructureExtractor,
    translator: &dyn TextTranslator,
) -> Result<BatchSummary, PipelineError> {
    let start = Instant::now();

    let layout = ArtifactLayout::new(&config.output_dir, config.output_format);
    layout.ensure_dirs()?;

    let inputs = input::list_pdfs(&config.input_dir)?;
    let total = inputs.len();
    if total == 0 {
        warn!("No PDF files found in {}", config.input_dir.display());
    } else {
        info!("Found {} PDF file(s) in {}", total, config.input_dir.display());
    }

    let mut summary = BatchSummary {
        total,
        ..Default::default()
    };
    let cb = config.progress_callback.as_ref();
    if let Some(cb) = cb {
        cb.on_batch_start(total);
    }

    for (i, pdf) in inputs.iter().enumerate() {
        let name = input::base_name(pdf);
        info!("[{}/{}] {}", i + 1, total, name);
        if let Some(cb) = cb {
            cb.on_document_start(i + 1, total, &name);
        }

        match process_document(pdf, config, &layout, extractor, translator).await {
            Ok(ItemOutcome::Cached) => {
                summary.cached += 1;
                if let Some(cb) = cb {
                    cb.on_document_cached(&name);
                }
            }
            Ok(ItemOutcome::Processed {
                failed_translations,
            }) => {
                summary.processed += 1;
                if failed_translations > 0 {
                    summary.with_errors += 1;
                    warn!(
                        "{}: completed with {} failed translation(s)",
                        name, failed_translations
                    );
                } else {
                    info!("{}: completed", name);
                }
                if let Some(cb) = cb {
                    cb.on_document_complete(&name, failed_translations);
                }
            }
            Err(e) if e.is_fatal() => {
                error!("{}: {}. Stopping batch.", name, e);
                summary.failed += 1;
                summary.remaining = total - i - 1;
                summary.aborted = Some(e.to_string());
                if let Some(cb) = cb {
                    cb.on_document_error(&name, &e.to_string());
                }
                break;
            }
            Err(e) => {
                warn!("Skipping {}: {}", name, e);
                summary.failed += 1;
                if let Some(cb) = cb {
                    cb.on_document_error(&name, &e.to_string());
                }
            }
        }
    }

    summary.elapsed_ms = start.elapsed().as_millis() as u64;
    info!(
        "Batch finished in {}ms: {} processed, {} cached, {} failed, {} with errors",
        summary.elapsed_ms, summary.processed, summary.cached, summary.failed, summary.with_errors
    );
    if let Some(cb) = cb {
        cb.on_batch_complete(&summary);
    }
    Ok(summary)
}

/// Synchronous wrapper around [`run_batch`] for non-async callers.
///
/// Creates a new single-threaded Tokio runtime. Do not call from inside an
/// existing runtime.
pub fn run_batch_sync(config: &BatchConfig) -> Result<BatchSummary, PipelineError> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| PipelineError::ClientInit(format!("tokio runtime: {e}")))?;
    rt.block_on(run_batch(config))
}
