//! Configuration types for a batch translation run.
//!
//! All run behaviour is controlled through [`BatchConfig`], built via its
//! [`BatchConfigBuilder`]. The configuration is constructed once at process
//! start and shared by reference with every pipeline component; nothing
//! reads the environment after that point.
//!
//! # Design choice: builder over constructor
//! Most fields have sensible defaults (public service endpoints, the
//! conventional `input_pdf/` / `output_pdf/` layout). The builder lets the
//! CLI set only what the environment provides and fails fast in
//! [`BatchConfigBuilder::build`] when the one required field, the
//! translation credential, is missing.

use crate::error::PipelineError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default DeepL endpoint (free tier).
pub const DEFAULT_TRANSLATE_URL: &str = "https://api-free.deepl.com/v2/translate";

/// Default GROBID full-text endpoint on a local container.
pub const DEFAULT_EXTRACT_URL: &str = "http://localhost:8070/api/processFulltextDocument";

/// Default target language code.
pub const DEFAULT_TARGET_LANG: &str = "JA";

/// Configuration for one batch run.
///
/// Built via [`BatchConfig::builder()`].
///
/// # Example
/// ```rust
/// use paper_translate::{BatchConfig, OutputFormat};
///
/// let config = BatchConfig::builder()
///     .api_key("my-deepl-key")
///     .input_dir("papers")
///     .output_format(OutputFormat::Text)
///     .pacing_ms(0)
///     .build()
///     .unwrap();
/// assert_eq!(config.target_lang, "JA");
/// ```
#[derive(Clone)]
pub struct BatchConfig {
    /// Translation-service credential. Required.
    pub api_key: String,

    /// Translation-service endpoint. Default: [`DEFAULT_TRANSLATE_URL`].
    pub translate_url: String,

    /// Extraction-service endpoint. Default: [`DEFAULT_EXTRACT_URL`].
    pub extract_url: String,

    /// Target language code sent with every translation request. Default: `JA`.
    pub target_lang: String,

    /// Per-request timeout for the extraction service in seconds. Default: 180.
    ///
    /// GROBID needs tens of seconds for a long paper with citation
    /// consolidation enabled; three minutes leaves headroom for 50+ pages.
    pub extract_timeout_secs: u64,

    /// Per-request timeout for the translation service in seconds. Default: 30.
    pub translate_timeout_secs: u64,

    /// Ask the extraction service to consolidate header metadata. Default: true.
    pub consolidate_header: bool,

    /// Ask the extraction service to consolidate citations. Default: true.
    pub consolidate_citations: bool,

    /// Directory scanned for `*.pdf` inputs. Default: `input_pdf`.
    pub input_dir: PathBuf,

    /// Root of the artifact tree. Default: `output_pdf`.
    pub output_dir: PathBuf,

    /// Final output format. Default: [`OutputFormat::Docx`].
    pub output_format: OutputFormat,

    /// Delay after each paragraph translation in milliseconds. Default: 500.
    ///
    /// The free DeepL tier throttles bursts; half a second between calls
    /// keeps a single sequential client below the limit. `0` disables it.
    pub pacing_ms: u64,

    /// Emit a progress event every N paragraphs. Default: 10.
    pub progress_every: usize,

    /// Optional observer for per-document and per-paragraph events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            translate_url: DEFAULT_TRANSLATE_URL.to_string(),
            extract_url: DEFAULT_EXTRACT_URL.to_string(),
            target_lang: DEFAULT_TARGET_LANG.to_string(),
            extract_timeout_secs: 180,
            translate_timeout_secs: 30,
            consolidate_header: true,
            consolidate_citations: true,
            input_dir: PathBuf::from("input_pdf"),
            output_dir: PathBuf::from("output_pdf"),
            output_format: OutputFormat::default(),
            pacing_ms: 500,
            progress_every: 10,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for BatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfig")
            .field("api_key", &"<redacted>")
            .field("translate_url", &self.translate_url)
            .field("extract_url", &self.extract_url)
            .field("target_lang", &self.target_lang)
            .field("extract_timeout_secs", &self.extract_timeout_secs)
            .field("translate_timeout_secs", &self.translate_timeout_secs)
            .field("consolidate_header", &self.consolidate_header)
            .field("consolidate_citations", &self.consolidate_citations)
            .field("input_dir", &self.input_dir)
            .field("output_dir", &self.output_dir)
            .field("output_format", &self.output_format)
            .field("pacing_ms", &self.pacing_ms)
            .field("progress_every", &self.progress_every)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl BatchConfig {
    /// Create a new builder for `BatchConfig`.
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`BatchConfig`].
#[derive(Debug)]
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl BatchConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn translate_url(mut self, url: impl Into<String>) -> Self {
        self.config.translate_url = url.into();
        self
    }

    pub fn extract_url(mut self, url: impl Into<String>) -> Self {
        self.config.extract_url = url.into();
        self
    }

    pub fn target_lang(mut self, lang: impl Into<String>) -> Self {
        self.config.target_lang = lang.into().to_uppercase();
        self
    }

    pub fn extract_timeout_secs(mut self, secs: u64) -> Self {
        self.config.extract_timeout_secs = secs;
        self
    }

    pub fn translate_timeout_secs(mut self, secs: u64) -> Self {
        self.config.translate_timeout_secs = secs;
        self
    }

    pub fn consolidate_header(mut self, v: bool) -> Self {
        self.config.consolidate_header = v;
        self
    }

    pub fn consolidate_citations(mut self, v: bool) -> Self {
        self.config.consolidate_citations = v;
        self
    }

    pub fn input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.input_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    pub fn pacing_ms(mut self, ms: u64) -> Self {
        self.config.pacing_ms = ms;
        self
    }

    pub fn progress_every(mut self, n: usize) -> Self {
        self.config.progress_every = n.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BatchConfig, PipelineError> {
        let c = &self.config;
        if c.api_key.trim().is_empty() {
            return Err(PipelineError::MissingCredential);
        }
        if c.extract_timeout_secs == 0 || c.translate_timeout_secs == 0 {
            return Err(PipelineError::InvalidConfig(
                "Request timeouts must be ≥ 1 second".into(),
            ));
        }
        if c.target_lang.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "Target language must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Format of the final per-document artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain UTF-8 text with Markdown-style headings.
    Text,
    /// Word-processor document (Office Open XML). (default)
    #[default]
    Docx,
}

impl OutputFormat {
    /// File extension of the final artifact, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Docx => "docx",
        }
    }

    /// Name of the stage directory holding final artifacts.
    pub fn dir_name(self) -> &'static str {
        self.extension()
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "docx" | "word" => Ok(OutputFormat::Docx),
            other => Err(PipelineError::InvalidConfig(format!(
                "Unknown output format '{other}' (expected 'docx' or 'text')"
            ))),
        }
    }
}
