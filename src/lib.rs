//! # paper-translate
//!
//! Batch-translate academic papers from PDF into a target language.
//!
//! ## Why this crate?
//!
//! Translating a paper by pasting the whole PDF text into a translator mixes
//! running headers, figure captions and the bibliography into the body. This
//! crate first sends each PDF to a GROBID server, which recovers the
//! document structure as TEI XML. Only the title and the body paragraphs go
//! to DeepL. References stay in the original language and are appended as a
//! numbered list.
//!
//! ## Pipeline Overview
//!
//! ```text
//! input_pdf/*.pdf
//!  │
//!  ├─ 1. Extract    upload to GROBID          → xml/<name>.xml
//!  ├─ 2. Parse      TEI → title/body/refs     → text/<name>_{title,body,references}.txt
//!  ├─ 3. Title      one DeepL request
//!  ├─ 4. Body       one paced request per paragraph → text/<name>_body_translated.txt
//!  └─ 5. Assemble   heading, subtitle, body, references → docx/<name>_translated.docx
//! ```
//!
//! Each stage writes its artifact before the next begins. A re-run picks up
//! at the latest stage whose artifacts exist, and a document whose final
//! output exists is skipped without any network traffic.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use paper_translate::{run_batch, BatchConfig, OutputFormat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BatchConfig::builder()
//!         .api_key(std::env::var("DEEPL_API_KEY")?)
//!         .input_dir("input_pdf")
//!         .output_dir("output_pdf")
//!         .output_format(OutputFormat::Docx)
//!         .build()?;
//!
//!     let summary = run_batch(&config).await?;
//!     eprintln!(
//!         "{} processed, {} skipped",
//!         summary.processed,
//!         summary.skipped()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `paper-translate` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! paper-translate = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{run_batch, run_batch_sync, run_batch_with};
pub use config::{BatchConfig, BatchConfigBuilder, OutputFormat};
pub use convert::process_document;
pub use error::{ExtractError, ItemError, ParseError, PipelineError};
pub use output::{BatchSummary, Document, ItemOutcome, Stage};
pub use pipeline::extract::{GrobidClient, StructureExtractor};
pub use pipeline::tei::parse_tei;
pub use pipeline::translate::{DeeplTranslator, TextTranslator, Translation, TranslationOutcome};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
