//! CLI binary for paper-translate.
//!
//! A thin shim over the library crate that maps environment variables and
//! flags to `BatchConfig`, runs the batch and prints a summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use paper_translate::{
    run_batch, BatchConfig, BatchProgressCallback, BatchSummary, OutputFormat, ProgressCallback,
    Stage,
};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar over the documents in the batch and
/// one log line per finished document.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start time of the document currently in flight.
    current: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    /// Spinner-only until `on_batch_start` reports the document count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Scanning input directory…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            current: Mutex::new(None),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} papers  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Translating");
        self.bar.reset_eta();
    }

    fn elapsed(&self) -> String {
        let secs = self
            .current
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        dim(&format!("{secs:.1}s"))
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_documents: usize) {
        self.activate_bar(total_documents);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Found {total_documents} PDF file(s)"))
        ));
    }

    fn on_document_start(&self, _index: usize, _total: usize, name: &str) {
        if let Ok(mut t) = self.current.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_message(name.to_string());
    }

    fn on_stage(&self, name: &str, stage: Stage) {
        self.bar.set_message(format!("{name}: {stage}"));
    }

    fn on_paragraph_progress(&self, name: &str, done: usize, total: usize) {
        self.bar
            .set_message(format!("{name}: paragraph {done}/{total}"));
    }

    fn on_document_cached(&self, name: &str) {
        self.bar
            .println(format!("  {} {:<40}  {}", dim("↷"), name, dim("cached")));
        if let Ok(mut t) = self.current.lock() {
            t.take();
        }
        self.bar.inc(1);
    }

    fn on_document_complete(&self, name: &str, failed_translations: usize) {
        let status = if failed_translations == 0 {
            green("✓")
        } else {
            yellow("⚠")
        };
        let note = if failed_translations == 0 {
            String::new()
        } else {
            yellow(&format!("{failed_translations} failed translation(s)"))
        };
        self.bar.println(format!(
            "  {} {:<40}  {}  {}",
            status,
            name,
            self.elapsed(),
            note
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, name: &str, error: &str) {
        let msg = if error.chars().count() > 80 {
            let cut: String = error.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:<40}  {}  {}",
            red("✗"),
            name,
            red(&msg),
            self.elapsed()
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, _summary: &BatchSummary) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Translate every PDF in ./input_pdf to Japanese .docx files
  DEEPL_API_KEY=... paper-translate

  # Plain-text output into a custom directory
  paper-translate --output-format text --output-dir out

  # German, no pacing delay, JSON summary on stdout
  paper-translate --target-lang DE --pacing-ms 0 --json

LAYOUT:
  <output>/xml/<name>.xml                      GROBID TEI markup
  <output>/text/<name>_title.txt               extracted title
  <output>/text/<name>_body.txt                extracted body
  <output>/text/<name>_references.txt          formatted references
  <output>/text/<name>_body_translated.txt     translated body
  <output>/docx/<name>_translated.docx         final output (or txt/)

  A paper whose final output exists is skipped. Delete it to re-run
  assembly; delete the earlier artifacts to redo those stages too.

SETUP:
  1. Start GROBID:   docker run --rm -p 8070:8070 grobid/grobid:0.8.0
  2. Set API key:    export DEEPL_API_KEY=...
  3. Translate:      paper-translate
"#;

/// Translate a directory of academic PDFs with GROBID and DeepL.
#[derive(Parser, Debug)]
#[command(
    name = "paper-translate",
    version,
    about = "Translate a directory of academic PDFs with GROBID and DeepL",
    long_about = "Extract the structure of each PDF in the input directory with a GROBID \
server, translate the title and body paragraphs with DeepL, and write a .docx or text file \
with the original references appended. Intermediate results are cached so an interrupted \
run resumes where it stopped.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// DeepL authentication key.
    #[arg(long, env = "DEEPL_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// DeepL translate endpoint.
    #[arg(
        long,
        env = "DEEPL_API_URL",
        default_value = paper_translate::config::DEFAULT_TRANSLATE_URL
    )]
    api_url: String,

    /// GROBID full-text endpoint.
    #[arg(
        long,
        env = "GROBID_API_URL",
        default_value = paper_translate::config::DEFAULT_EXTRACT_URL
    )]
    grobid_url: String,

    /// Target language code (JA, DE, EN-US, …).
    #[arg(long, env = "TARGET_LANG", default_value = paper_translate::config::DEFAULT_TARGET_LANG)]
    target_lang: String,

    /// GROBID request timeout in seconds.
    #[arg(long, env = "GROBID_TIMEOUT", default_value_t = 180)]
    grobid_timeout: u64,

    /// DeepL request timeout in seconds.
    #[arg(long, env = "DEEPL_TIMEOUT", default_value_t = 30)]
    deepl_timeout: u64,

    /// Directory scanned for *.pdf files.
    #[arg(long, env = "INPUT_DIR", default_value = "input_pdf")]
    input_dir: PathBuf,

    /// Root directory for all artifacts.
    #[arg(long, env = "OUTPUT_DIR", default_value = "output_pdf")]
    output_dir: PathBuf,

    /// Final output format.
    #[arg(long, env = "OUTPUT_FORMAT", value_enum, default_value = "docx")]
    output_format: FormatArg,

    /// Delay after each paragraph request, in milliseconds.
    #[arg(long, env = "PACING_MS", default_value_t = 500)]
    pacing_ms: u64,

    /// Print the batch summary as JSON on stdout.
    #[arg(long, env = "PAPER_TRANSLATE_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PAPER_TRANSLATE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PAPER_TRANSLATE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PAPER_TRANSLATE_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum FormatArg {
    Docx,
    #[value(alias = "txt")]
    Text,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Docx => OutputFormat::Docx,
            FormatArg::Text => OutputFormat::Text,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run batch ────────────────────────────────────────────────────────
    let summary = run_batch(&config).await.context("Batch failed to start")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&summary, &config);
    }

    Ok(())
}

/// Map CLI args to `BatchConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<BatchConfig> {
    let api_key = cli
        .api_key
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .context("DEEPL_API_KEY is not set. Export it or pass --api-key.")?;

    let mut builder = BatchConfig::builder()
        .api_key(api_key)
        .translate_url(&cli.api_url)
        .extract_url(&cli.grobid_url)
        .target_lang(&cli.target_lang)
        .extract_timeout_secs(cli.grobid_timeout)
        .translate_timeout_secs(cli.deepl_timeout)
        .input_dir(&cli.input_dir)
        .output_dir(&cli.output_dir)
        .output_format(cli.output_format.clone().into())
        .pacing_ms(cli.pacing_ms);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(summary: &BatchSummary, config: &BatchConfig) {
    let icon = if summary.was_aborted() {
        red("✘")
    } else if summary.failed > 0 || summary.with_errors > 0 {
        yellow("⚠")
    } else {
        green("✔")
    };
    eprintln!(
        "{}  {} processed  {} skipped ({} cached, {} failed)  {}ms  →  {}",
        icon,
        bold(&summary.processed.to_string()),
        summary.skipped(),
        summary.cached,
        summary.failed,
        summary.elapsed_ms,
        bold(&config.output_dir.display().to_string()),
    );
    if summary.with_errors > 0 {
        eprintln!(
            "   {} paper(s) contain translation error markers",
            yellow(&summary.with_errors.to_string())
        );
    }
    if let Some(ref reason) = summary.aborted {
        eprintln!(
            "   {} {}  ({} paper(s) not attempted)",
            red("stopped:"),
            reason,
            summary.remaining
        );
    }
}
