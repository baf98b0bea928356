//! CLI binary for pdf-abstractor.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `AbstractorConfig` and either serves the web app or runs one document.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdf_abstractor::{
    server, AbstractOutput, Abstractor, AbstractorConfig, EmptyPagePolicy, InferenceBackendKind,
    LanguageCode, PipelineProgressCallback, ProgressCallback, Stage,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
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

const STAGES: usize = 4;

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one bar over the four stages, one log line per stage.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(STAGES as u64);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:24.green/238}] {pos}/{len}  {msg}  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Abstracting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_pipeline_start(&self, request_id: &str) {
        self.bar.println(format!(
            "{} {} {}",
            cyan("◆"),
            bold("Processing document"),
            dim(request_id)
        ));
    }

    fn on_stage_start(&self, _request_id: &str, stage: Stage) {
        self.bar.set_message(format!("{stage}…"));
    }

    fn on_stage_complete(&self, _request_id: &str, stage: Stage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<18} {}",
            green("✓"),
            stage.label(),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_stage_error(&self, _request_id: &str, stage: Stage, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let first_line = error.lines().next().unwrap_or(error);
        let msg = match first_line.char_indices().nth(80) {
            Some((idx, _)) => format!("{}\u{2026}", &first_line[..idx]),
            None => first_line.to_string(),
        };
        self.bar
            .println(format!("  {} {:<18} {}", red("✗"), stage.label(), red(&msg)));
    }

    fn on_pipeline_complete(&self, _request_id: &str, success: bool) {
        self.bar.finish_and_clear();
        if success && self.errors.load(Ordering::SeqCst) == 0 {
            eprintln!("{} Done", green("✔"));
        } else {
            eprintln!("{} Failed", red("✘"));
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the web app on http://127.0.0.1:5000
  abstractor serve

  # Listen on all interfaces
  abstractor serve --bind 0.0.0.0:8080

  # Summarize one document, translate into Spanish, write the audio to ./static
  abstractor process contract.pdf --target-lang es

  # Same, with an LLM provider instead of the Hugging Face models
  abstractor process contract.pdf --target-lang de --backend llm --provider openai

  # JSON output
  abstractor process contract.pdf --target-lang fr --json > out.json

  # Supported target languages
  abstractor languages

ENVIRONMENT VARIABLES:
  HF_API_TOKEN            Hugging Face inference API token
  OPENAI_API_KEY          OpenAI API key (--backend llm)
  ANTHROPIC_API_KEY       Anthropic API key (--backend llm)
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to an existing libpdfium; skips auto-download
  PDFIUM_AUTO_CACHE_DIR   Override the default pdfium cache directory
  RUST_LOG                Log filter, e.g. pdf_abstractor=debug

  Every flag can also be set through its ABSTRACTOR_* variable (see --help).
"#;

/// Summarize PDFs, translate the summary, and speak both.
#[derive(Parser, Debug)]
#[command(
    name = "abstractor",
    version,
    about = "Summarize PDFs, translate the summary, and speak both",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    opts: CommonOpts,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the web app.
    Serve {
        /// Address to listen on.
        #[arg(long, env = "ABSTRACTOR_BIND", default_value = "127.0.0.1:5000")]
        bind: SocketAddr,
    },
    /// Run the pipeline once on a local PDF.
    Process {
        /// PDF file to summarize.
        input: PathBuf,

        /// Language to translate the summary into (e.g. es, de, fr).
        #[arg(short, long, env = "ABSTRACTOR_TARGET_LANG")]
        target_lang: String,

        /// Output structured JSON (AbstractOutput) instead of text.
        #[arg(long, env = "ABSTRACTOR_JSON")]
        json: bool,

        /// Disable progress bar.
        #[arg(long, env = "ABSTRACTOR_NO_PROGRESS")]
        no_progress: bool,
    },
    /// List supported target languages.
    Languages {
        /// Output JSON.
        #[arg(long, env = "ABSTRACTOR_JSON")]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct CommonOpts {
    /// Inference backend: huggingface or llm.
    #[arg(long, global = true, env = "ABSTRACTOR_BACKEND", value_enum, default_value = "huggingface")]
    backend: BackendArg,

    /// Hugging Face inference API base URL.
    #[arg(long, global = true, env = "ABSTRACTOR_HF_BASE_URL")]
    hf_base_url: Option<String>,

    /// Hugging Face API token (falls back to HF_API_TOKEN).
    #[arg(long, global = true, env = "ABSTRACTOR_HF_TOKEN", hide_env_values = true)]
    hf_token: Option<String>,

    /// Summarization model id.
    #[arg(long, global = true, env = "ABSTRACTOR_SUMMARIZATION_MODEL")]
    summarization_model: Option<String>,

    /// Fail fast with 503 while a model is loading instead of waiting for it.
    #[arg(long, global = true, env = "ABSTRACTOR_HF_NO_WAIT")]
    hf_no_wait: bool,

    /// Translation model id.
    #[arg(long, global = true, env = "ABSTRACTOR_TRANSLATION_MODEL")]
    translation_model: Option<String>,

    /// LLM provider for --backend llm: openai, anthropic, gemini, ollama, azure.
    #[arg(long, global = true, env = "ABSTRACTOR_PROVIDER")]
    provider: Option<String>,

    /// LLM model ID for --backend llm.
    #[arg(long, global = true, env = "ABSTRACTOR_MODEL")]
    model: Option<String>,

    /// Language the documents are written in.
    #[arg(long, global = true, env = "ABSTRACTOR_SOURCE_LANG", default_value = "en")]
    source_lang: String,

    /// Input token budget for the summarizer.
    #[arg(long, global = true, env = "ABSTRACTOR_MAX_INPUT_TOKENS", default_value_t = 1024)]
    max_input_tokens: usize,

    /// Maximum summary length in tokens.
    #[arg(long, global = true, env = "ABSTRACTOR_MAX_SUMMARY_TOKENS", default_value_t = 512)]
    max_summary_tokens: usize,

    /// Directory receiving uploaded PDFs.
    #[arg(long, global = true, env = "ABSTRACTOR_UPLOADS_DIR", default_value = "uploads")]
    uploads_dir: PathBuf,

    /// Directory receiving generated audio (served under /static).
    #[arg(long, global = true, env = "ABSTRACTOR_STATIC_DIR", default_value = "static")]
    static_dir: PathBuf,

    /// Delete uploaded PDFs once their request finishes.
    #[arg(long, global = true, env = "ABSTRACTOR_DISCARD_UPLOADS")]
    discard_uploads: bool,

    /// Handling of pages without text: ignore, warn, reject.
    #[arg(long, global = true, env = "ABSTRACTOR_EMPTY_PAGES", value_enum, default_value = "warn")]
    empty_pages: EmptyPagesArg,

    /// PDF user password for encrypted documents.
    #[arg(long, global = true, env = "ABSTRACTOR_PASSWORD")]
    password: Option<String>,

    /// Google TTS base URL (e.g. https://translate.google.co.uk for a regional accent).
    #[arg(long, global = true, env = "ABSTRACTOR_TTS_BASE_URL")]
    tts_base_url: Option<String>,

    /// Read speech more slowly.
    #[arg(long, global = true, env = "ABSTRACTOR_TTS_SLOW")]
    tts_slow: bool,

    /// Path to an existing libpdfium; skips the auto-download.
    #[arg(long, global = true, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,

    /// Maximum concurrent inference calls.
    #[arg(long, global = true, env = "ABSTRACTOR_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Whole-request timeout in seconds.
    #[arg(long, global = true, env = "ABSTRACTOR_REQUEST_TIMEOUT", default_value_t = 600)]
    request_timeout: u64,

    /// Per-call backend timeout in seconds.
    #[arg(long, global = true, env = "ABSTRACTOR_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Largest accepted upload in MiB.
    #[arg(long, global = true, env = "ABSTRACTOR_MAX_UPLOAD_MB", default_value_t = 50)]
    max_upload_mb: usize,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "ABSTRACTOR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "ABSTRACTOR_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum BackendArg {
    Huggingface,
    Llm,
}

impl From<BackendArg> for InferenceBackendKind {
    fn from(v: BackendArg) -> Self {
        match v {
            BackendArg::Huggingface => InferenceBackendKind::HuggingFace,
            BackendArg::Llm => InferenceBackendKind::Llm,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum EmptyPagesArg {
    Ignore,
    Warn,
    Reject,
}

impl From<EmptyPagesArg> for EmptyPagePolicy {
    fn from(v: EmptyPagesArg) -> Self {
        match v {
            EmptyPagesArg::Ignore => EmptyPagePolicy::Ignore,
            EmptyPagesArg::Warn => EmptyPagePolicy::Warn,
            EmptyPagesArg::Reject => EmptyPagePolicy::Reject,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let opts = &cli.opts;

    // ── Logging setup ────────────────────────────────────────────────────
    // While the progress bar is active it carries the feedback; library
    // INFO logs would only tear it.
    let show_progress = match &cli.command {
        Command::Process {
            json, no_progress, ..
        } => !opts.quiet && !no_progress && !json,
        _ => false,
    };
    let filter = if opts.verbose {
        "debug"
    } else if opts.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Command::Languages { json } = cli.command {
        return list_languages(opts, json).await;
    }

    if opts.pdfium_lib_path.is_none() {
        ensure_pdfium(opts.quiet)?;
    }

    match cli.command {
        Command::Serve { bind } => {
            let config = build_config(opts, None)?;
            let abstractor = Abstractor::new(config)
                .await
                .context("Failed to initialise the pipeline")?;
            if !opts.quiet {
                eprintln!(
                    "{} Serving on {}",
                    cyan("◆"),
                    bold(&format!("http://{bind}"))
                );
            }
            server::serve(Arc::new(abstractor), bind)
                .await
                .context("Server error")?;
        }
        Command::Process {
            input,
            target_lang,
            json,
            ..
        } => {
            let progress: Option<ProgressCallback> = if show_progress {
                Some(CliProgressCallback::new() as Arc<dyn PipelineProgressCallback>)
            } else {
                None
            };
            let config = build_config(opts, progress)?;
            let abstractor = Abstractor::new(config)
                .await
                .context("Failed to initialise the pipeline")?;

            let output = abstractor
                .process_file(&input, &LanguageCode::new(&target_lang))
                .await
                .map_err(|failure| {
                    if let Some(ref summary) = failure.partial.summary {
                        eprintln!("{}\n{}\n", bold("Summary (partial result):"), summary.text);
                    }
                    anyhow::Error::new(failure)
                })
                .with_context(|| format!("Failed to process {}", input.display()))?;

            if json {
                let json =
                    serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
                println!("{json}");
            } else {
                print_output(&output, opts.quiet);
            }
        }
        Command::Languages { .. } => {}
    }

    Ok(())
}

fn print_output(output: &AbstractOutput, quiet: bool) {
    println!(
        "{}\n{}\n",
        bold(&format!(
            "Summary ({})",
            output.summary.language.english_name()
        )),
        output.summary.text
    );
    println!(
        "{}\n{}",
        bold(&format!(
            "Translated summary ({})",
            output.translation.target_language.english_name()
        )),
        output.translation.text
    );

    if !quiet {
        eprintln!();
        eprintln!("   {} {}", dim("summary audio:    "), output.summary_audio.path.display());
        eprintln!(
            "   {} {}",
            dim("translation audio:"),
            output.translation_audio.path.display()
        );
        eprintln!(
            "   {} pages in {}ms",
            output.page_count, output.stats.total_ms
        );
    }
}

async fn list_languages(opts: &CommonOpts, json: bool) -> Result<()> {
    let config = build_config(opts, None)?;
    let abstractor = Abstractor::new(config)
        .await
        .context("Failed to initialise the pipeline")?;
    let languages = abstractor.supported_languages();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&languages).context("Failed to serialise languages")?
        );
    } else {
        for l in &languages {
            println!("{:<8} {}", l.code, l.name);
        }
    }
    Ok(())
}

/// Make sure a pdfium library is available before the first extraction.
fn ensure_pdfium(quiet: bool) -> Result<()> {
    // With `bundled` the library was embedded at compile time; extract it.
    #[cfg(feature = "bundled")]
    {
        let _ = quiet;
        tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_bundled())
            .context("Failed to extract bundled PDFium engine")?;
    }

    // Otherwise the first run downloads it (~30 MB) into the cache.
    #[cfg(not(feature = "bundled"))]
    if !pdfium_auto::is_pdfium_cached() {
        if !quiet {
            let dl_bar = ProgressBar::new(0);
            dl_bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.cyan} {prefix:.bold}  \
                     [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏  ")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
            );
            dl_bar.set_prefix("PDF engine");
            dl_bar.set_message("Connecting…");
            dl_bar.enable_steady_tick(Duration::from_millis(80));

            let bar = dl_bar.clone();
            tokio::task::block_in_place(|| {
                pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
                    if let Some(t) = total {
                        if bar.length().unwrap_or(0) != t {
                            bar.set_length(t);
                        }
                    }
                    bar.set_position(downloaded);
                }))
            })
            .context("Failed to download PDFium engine")?;

            dl_bar.finish_with_message("ready ✓");
        } else {
            tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
                .context("Failed to download PDFium engine")?;
        }
    }

    Ok(())
}

/// Map CLI args to `AbstractorConfig`.
fn build_config(opts: &CommonOpts, progress: Option<ProgressCallback>) -> Result<AbstractorConfig> {
    let mut builder = AbstractorConfig::builder()
        .inference_backend(opts.backend.clone().into())
        .source_lang(opts.source_lang.as_str())
        .max_input_tokens(opts.max_input_tokens)
        .max_summary_tokens(opts.max_summary_tokens)
        .uploads_dir(&opts.uploads_dir)
        .static_dir(&opts.static_dir)
        .keep_uploads(!opts.discard_uploads)
        .empty_page_policy(opts.empty_pages.clone().into())
        .tts_slow(opts.tts_slow)
        .hf_wait_for_model(!opts.hf_no_wait)
        .inference_concurrency(opts.concurrency)
        .request_timeout_secs(opts.request_timeout)
        .api_timeout_secs(opts.api_timeout)
        .max_upload_bytes(opts.max_upload_mb.saturating_mul(1024 * 1024));

    if let Some(ref url) = opts.hf_base_url {
        builder = builder.hf_base_url(url);
    }
    if let Some(ref token) = opts.hf_token {
        builder = builder.hf_api_token(token);
    }
    if let Some(ref m) = opts.summarization_model {
        builder = builder.summarization_model(m);
    }
    if let Some(ref m) = opts.translation_model {
        builder = builder.translation_model(m);
    }
    if let Some(ref p) = opts.provider {
        builder = builder.llm_provider_name(p);
    }
    if let Some(ref m) = opts.model {
        builder = builder.llm_model(m);
    }
    if let Some(ref url) = opts.tts_base_url {
        builder = builder.tts_base_url(url);
    }
    if let Some(ref path) = opts.pdfium_lib_path {
        builder = builder.pdfium_lib_path(path);
    }
    if let Some(ref pwd) = opts.password {
        builder = builder.pdf_password(pwd);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
