//! Paragraph-batch translation of a long body text.
//!
//! A paper body easily exceeds what one translation request should carry,
//! so the body is split on the blank-line separator and each paragraph is
//! sent on its own, strictly in order, one request at a time. After every
//! request the task sleeps for `pacing` to stay under the service's rate
//! limit; nothing here is parallel.
//!
//! A failed paragraph does not stop the loop: its slot keeps the failed
//! [`Translation`], which renders as a sentinel in the joined output.

use crate::output::PARAGRAPH_SEPARATOR;
use crate::pipeline::translate::{TextTranslator, Translation};
use crate::progress::ProgressCallback;
use std::time::Duration;
use tokio::time::sleep;
use tracing::info;

/// Knobs for [`translate_long`].
#[derive(Clone, Default)]
pub struct BatchOptions {
    /// Sleep after each request. `Duration::ZERO` disables pacing.
    pub pacing: Duration,
    /// Report progress every N paragraphs (counted over the split input).
    pub progress_every: usize,
    /// Document name passed to progress events.
    pub name: String,
    pub progress: Option<ProgressCallback>,
}

/// Per-paragraph results of a body translation, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslatedBody {
    pub paragraphs: Vec<Translation>,
}

impl TranslatedBody {
    /// Rendered paragraphs joined with the blank-line separator.
    pub fn joined(&self) -> String {
        self.paragraphs
            .iter()
            .map(Translation::rendered)
            .collect::<Vec<_>>()
            .join(PARAGRAPH_SEPARATOR)
    }

    /// Number of paragraphs whose translation failed.
    pub fn failures(&self) -> usize {
        self.paragraphs.iter().filter(|t| !t.is_ok()).count()
    }

    /// Whether every paragraph translated successfully.
    pub fn is_complete(&self) -> bool {
        self.failures() == 0
    }
}

/// Split `text` on the paragraph separator, dropping blank paragraphs.
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    text.split(PARAGRAPH_SEPARATOR)
        .filter(|p| !p.trim().is_empty())
        .collect()
}

/// Translate `full_text` paragraph by paragraph.
///
/// Blank paragraphs are dropped and leave no slot, so the output may have
/// fewer paragraphs than the input had separators.
pub async fn translate_long(
    translator: &dyn TextTranslator,
    full_text: &str,
    options: &BatchOptions,
) -> TranslatedBody {
    let pieces: Vec<&str> = full_text.split(PARAGRAPH_SEPARATOR).collect();
    let total = pieces.len();
    let every = options.progress_every.max(1);
    let mut out = Vec::with_capacity(total);

    info!("Translating body: {} paragraphs", total);

    for (i, para) in pieces.iter().enumerate() {
        if para.trim().is_empty() {
            continue;
        }

        out.push(translator.translate(para).await);

        if !options.pacing.is_zero() {
            sleep(options.pacing).await;
        }

        if (i + 1) % every == 0 {
            info!("  … {}/{} paragraphs", i + 1, total);
            if let Some(ref cb) = options.progress {
                cb.on_paragraph_progress(&options.name, i + 1, total);
            }
        }
    }

    TranslatedBody { paragraphs: out }
}
