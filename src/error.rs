//! Error types for the paper-translate library.
//!
//! The batch distinguishes three severities, and each gets its own type:
//!
//! * [`PipelineError`] — **Run-level**: the batch cannot start at all
//!   (missing credential, unreadable input directory). Returned as
//!   `Err(PipelineError)` from [`crate::batch::run_batch`].
//!
//! * [`ItemError`] — **Per document**: one input failed (bad status from
//!   the extraction service, malformed markup, no body text). The driver
//!   logs it, counts it and moves on. The single exception is
//!   [`ItemError::is_fatal`]: when the extraction service is unreachable no
//!   other document can succeed either, so the driver stops the loop.
//!
//! * Per-paragraph translation failures are not errors at all. They are
//!   [`crate::pipeline::translate::Translation`] values with a non-`Ok`
//!   outcome, embedded in the output as sentinels.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors that prevent a batch run from starting.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// The translation-service credential is missing or blank.
    #[error("Translation API key is not set.\nExport DEEPL_API_KEY=<your key> and re-run.")]
    MissingCredential,

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An HTTP client for one of the services could not be constructed.
    #[error("Cannot initialise HTTP client: {0}")]
    ClientInit(String),

    // ── Filesystem errors ─────────────────────────────────────────────────
    /// The input directory does not exist or cannot be listed.
    #[error("Cannot read input directory '{path}': {source}")]
    InputDirUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stage output directory could not be created.
    #[error("Cannot create output directory '{path}': {source}")]
    OutputDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure talking to the structure-extraction service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    /// Connection refused / DNS failure. Fatal to the whole batch.
    #[error("Extraction service unreachable at '{url}': {detail}")]
    Unreachable { url: String, detail: String },

    /// The service answered with a non-success status.
    #[error("Extraction service returned HTTP {0}")]
    Status(u16),

    /// The service accepted the connection but did not answer in time.
    #[error("Extraction timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Any other transport failure (body read, TLS, protocol).
    #[error("Extraction transport error: {0}")]
    Transport(String),
}

/// Structured markup could not be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The XML reader rejected the input.
    #[error("Malformed markup at byte {position}: {detail}")]
    Malformed { position: usize, detail: String },

    /// The input ended without any element, or with elements left open.
    #[error("Markup has no complete root element")]
    NoRootElement,
}

/// A recoverable (except [`ItemError::is_fatal`]) failure for one document.
#[derive(Debug, Error)]
pub enum ItemError {
    /// The input PDF could not be read.
    #[error("Cannot read '{path}': {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file has a `.pdf` extension but not the `%PDF` magic bytes.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: Vec<u8> },

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("Markup parse failed: {0}")]
    Parse(#[from] ParseError),

    /// Parsing succeeded but produced zero body paragraphs.
    #[error("No body text extracted; nothing to translate")]
    EmptyBody,

    /// A cached artifact exists but could not be loaded.
    #[error("Failed to read artifact '{path}': {source}")]
    ArtifactRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stage artifact could not be persisted.
    #[error("Failed to write artifact '{path}': {source}")]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The output document could not be rendered.
    #[error("Failed to render output document: {0}")]
    RenderFailed(String),
}

impl ItemError {
    /// Whether this failure must stop the whole batch.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ItemError::Extract(ExtractError::Unreachable { .. }))
    }
}
