//! Result types shared by the pipeline stages and the batch driver.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between paragraphs in every flat-text body representation.
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Title used when the markup carries no usable title.
pub const NO_TITLE: &str = "No Title Found";

/// A parsed paper: title, body paragraphs and reference entries.
///
/// Built once by [`crate::pipeline::tei::parse_tei`] and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Original-language title, or [`NO_TITLE`].
    pub title: String,
    /// Non-empty, trimmed body paragraphs in document order.
    pub paragraphs: Vec<String>,
    /// Display strings, each prefixed with its 1-based `[i]` index.
    pub references: Vec<String>,
}

impl Document {
    /// The body as one string, paragraphs separated by a blank line.
    pub fn body_text(&self) -> String {
        self.paragraphs.join(PARAGRAPH_SEPARATOR)
    }
}

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Extract,
    Parse,
    TranslateTitle,
    TranslateBody,
    Assemble,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Extract => "extract",
            Stage::Parse => "parse",
            Stage::TranslateTitle => "translate-title",
            Stage::TranslateBody => "translate-body",
            Stage::Assemble => "assemble",
        };
        f.write_str(s)
    }
}

/// What happened to a document that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// The final artifact already existed; nothing ran.
    Cached,
    /// The final artifact was written in this run.
    ///
    /// `failed_translations > 0` means the title or some body slots hold
    /// translation sentinels.
    Processed { failed_translations: usize },
}

/// Aggregate counts for one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Documents found in the input directory.
    pub total: usize,
    /// Documents whose final artifact was written in this run.
    pub processed: usize,
    /// Documents skipped because their final artifact already existed.
    pub cached: usize,
    /// Documents abandoned with a recoverable error.
    pub failed: usize,
    /// Processed documents containing at least one failed paragraph.
    pub with_errors: usize,
    /// Documents never attempted because the batch was aborted.
    pub remaining: usize,
    /// Reason for an early abort, if any.
    pub aborted: Option<String>,
    /// Wall-clock duration of the run.
    pub elapsed_ms: u64,
}

impl BatchSummary {
    /// Documents that produced no output in this run (cache hits + failures).
    pub fn skipped(&self) -> usize {
        self.cached + self.failed
    }

    /// Whether the loop stopped before attempting every document.
    pub fn was_aborted(&self) -> bool {
        self.aborted.is_some()
    }
}
