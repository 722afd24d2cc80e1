//! CLI binary for img2alt.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `CaptionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use img2alt::{
    audit, run, CaptionConfig, CaptionProgress, FileConfig, RunSummary, SharedProgress,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
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
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar across the whole run, growing as
/// directories report how many images they still need. Works when
/// directories complete out of order (concurrent mode).
struct CliProgress {
    /// The single progress bar anchored at the bottom of the terminal.
    bar: ProgressBar,
    /// Per-image wall-clock start times, keyed `dir/name`.
    start_times: Mutex<HashMap<String, Instant>>,
    /// Count of images whose attempt failed.
    errors: AtomicUsize,
}

impl CliProgress {
    /// Create a callback whose bar length grows via `on_directory_start`
    /// as each directory reports its pending count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Scanning");
        bar.set_message("Listing content directories…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    /// Switch from the spinner-only style to the full progress bar.
    fn activate_bar(&self) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} images  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_style(progress_style);
        self.bar.set_prefix("Captioning");
    }

    fn elapsed_secs(&self, key: &str) -> f64 {
        self.start_times
            .lock()
            .unwrap()
            .remove(key)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0) as f64
            / 1000.0
    }
}

impl CaptionProgress for CliProgress {
    fn on_run_start(&self, total_dirs: usize) {
        self.activate_bar();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Captioning across {total_dirs} directories…"))
        ));
    }

    fn on_directory_start(&self, dir: &str, total_images: usize, pending: usize) {
        // Bar length counts pending images only; skips never move the bar.
        self.bar.inc_length(pending as u64);
        self.bar.println(format!(
            "{} {}  {}",
            cyan("▸"),
            bold(dir),
            dim(&format!("{pending} to caption, {total_images} images")),
        ));
    }

    fn on_image_start(&self, dir: &str, name: &str) {
        self.start_times
            .lock()
            .unwrap()
            .insert(format!("{dir}/{name}"), Instant::now());
        self.bar.set_message(format!("{dir}/{name}"));
    }

    fn on_image_captioned(&self, dir: &str, name: &str, caption_len: usize) {
        let secs = self.elapsed_secs(&format!("{dir}/{name}"));
        self.bar.println(format!(
            "  {} {:<40}  {:<11}  {}",
            green("✓"),
            name,
            dim(&format!("{caption_len:>4} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_image_failed(&self, dir: &str, name: &str, error: &str) {
        let secs = self.elapsed_secs(&format!("{dir}/{name}"));
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
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
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, _dirs: usize, generated: usize, skipped: usize, errored: usize) {
        self.bar.finish_and_clear();

        if errored == 0 {
            eprintln!(
                "{} {} captions generated  {}",
                green("✔"),
                bold(&generated.to_string()),
                dim(&format!("({skipped} already resolved)")),
            );
        } else {
            eprintln!(
                "{} {} captions generated, {} failed  {}",
                cyan("⚠"),
                bold(&generated.to_string()),
                red(&errored.to_string()),
                dim(&format!("({skipped} already resolved)")),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Caption every new image under the content root
  img2alt ./content/blog

  # See what a run would do, without calling the model
  img2alt --audit ./content/blog

  # Location-anchored SEO captions, capped at 125 characters
  img2alt --seo-location "Boston engagement session" ./content/blog

  # Per-directory models and prompts from a config file
  img2alt --config img2alt.json

  # Machine-readable summary
  img2alt --json ./content/blog > summary.json

ENDPOINT:
  Any OpenAI-compatible chat-completions server works. The default
  (http://127.0.0.1:1234/v1/chat/completions) matches LM Studio's local
  server; llama.cpp's llama-server and vLLM behave the same way. No API
  key is sent.

CONFIG FILE:
  JSON, every field optional; flags override it. Example:
    {
      "root": "content/blog",
      "model": "qwen/qwen3-vl-8b",
      "directories": {
        "4-britton-manor-proposal": {
          "model": "gemma-3-12b-it",
          "location": "Britton Manor proposal"
        }
      }
    }

STORE FORMAT:
  Each directory gets an alt-text.json mapping image filename to record:
    {"beach-kiss.jpg": {"status": "ok", "text": "Couple kisses at dusk."}}
  Failed attempts are stored with "status": "error" and retried on the
  next run. Keys starting with "_" pass through untouched. Older stores
  holding bare strings (failures marked by an "Error:" prefix) are read
  compatibly.

ENVIRONMENT VARIABLES:
  IMG2ALT_ENDPOINT         Chat-completions URL
  IMG2ALT_MODEL            Model identifier
  IMG2ALT_LOCATION         Location context for {location} prompts
  IMG2ALT_TIMEOUT          Per-request timeout in seconds
  IMG2ALT_MAX_TOKENS       Completion budget per caption
  IMG2ALT_TEMPERATURE      Sampling temperature
  IMG2ALT_MAX_CAPTION_LEN  Hard cap on caption length
  IMG2ALT_CONCURRENCY      Directories processed in parallel
  IMG2ALT_CONFIG           Run-config file path

SETUP:
  1. Start a local server with a vision model loaded (LM Studio: Server tab)
  2. Run:  img2alt ./content/blog

  Interrupt at any time; finished captions are already on disk and the
  next run resumes where this one stopped.
"#;

/// Generate alt text for every image under a content root.
#[derive(Parser, Debug)]
#[command(
    name = "img2alt",
    version,
    about = "Generate alt text for blog images with a local vision model",
    long_about = "Walk the subdirectories of a content root and generate alt text for every \
image that does not have one yet, using an OpenAI-compatible vision endpoint (LM Studio, \
llama.cpp, vLLM). Captions are persisted to a per-directory alt-text.json after every image, \
so interrupted runs resume without losing or repeating work.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Content root whose immediate subdirectories hold the images.
    root: Option<PathBuf>,

    /// JSON run-config file; flags override its values.
    #[arg(short, long, env = "IMG2ALT_CONFIG")]
    config: Option<PathBuf>,

    /// Chat-completions endpoint URL.
    #[arg(long, env = "IMG2ALT_ENDPOINT")]
    endpoint: Option<String>,

    /// Vision model identifier (e.g. qwen/qwen3-vl-8b, gemma-3-12b-it).
    #[arg(long, env = "IMG2ALT_MODEL")]
    model: Option<String>,

    /// Read the prompt template from this file (may contain {location}).
    #[arg(long, env = "IMG2ALT_PROMPT_FILE")]
    prompt_file: Option<PathBuf>,

    /// Location context substituted into the prompt's {location} placeholder.
    #[arg(long, env = "IMG2ALT_LOCATION")]
    location: Option<String>,

    /// Use the location-anchored SEO prompt with its companion settings
    /// (125-character cap, temperature 0.3).
    #[arg(long, value_name = "LOCATION", conflicts_with = "prompt_file")]
    seo_location: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, env = "IMG2ALT_TIMEOUT")]
    timeout_secs: Option<u64>,

    /// Max completion tokens per caption.
    #[arg(long, env = "IMG2ALT_MAX_TOKENS")]
    max_tokens: Option<u32>,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "IMG2ALT_TEMPERATURE")]
    temperature: Option<f32>,

    /// Hard cap on stored caption length in characters.
    #[arg(long, env = "IMG2ALT_MAX_CAPTION_LEN")]
    max_caption_len: Option<usize>,

    /// Directories processed in parallel (images stay sequential).
    #[arg(short = 'j', long, env = "IMG2ALT_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Count pending/resolved images without calling the model.
    #[arg(long)]
    audit: bool,

    /// Print the run summary as JSON to stdout.
    #[arg(long, env = "IMG2ALT_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "IMG2ALT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "IMG2ALT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "IMG2ALT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.audit;
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

    // ── Audit mode ───────────────────────────────────────────────────────
    if cli.audit {
        let config = build_config(&cli, None).await?;
        let summary = audit(&config).await.context("Audit failed")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
            );
        } else {
            for dir in &summary.directories {
                println!(
                    "{:<40} {:>4} images  {:>4} resolved  {:>4} pending  {:>3} failures recorded",
                    dir.directory,
                    dir.images,
                    dir.skipped,
                    dir.images - dir.skipped,
                    dir.errored,
                );
            }
            print_failed_directories(&summary);
            println!(
                "\n{} images total: {} resolved, {} pending",
                summary.total_images(),
                summary.skipped,
                summary.pending(),
            );
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress: Option<SharedProgress> = if show_progress {
        Some(CliProgress::new_dynamic() as Arc<dyn CaptionProgress>)
    } else {
        None
    };
    let config = build_config(&cli, progress).await?;

    // ── Run ──────────────────────────────────────────────────────────────
    let summary = run(&config).await.context("Captioning run failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
    } else if !cli.quiet && !show_progress {
        // Only print inline stats when the progress callback is disabled;
        // otherwise on_run_complete already printed the final tick line.
        eprintln!(
            "{} generated, {} skipped, {} errored in {}ms",
            summary.generated, summary.skipped, summary.errored, summary.total_duration_ms
        );
    }

    if !cli.quiet {
        print_failed_directories(&summary);
    }

    Ok(())
}

fn print_failed_directories(summary: &RunSummary) {
    for dir in &summary.failed_directories {
        eprintln!(
            "{} {} skipped: alt-text.json could not be parsed (fix or delete it)",
            red("✗"),
            bold(dir),
        );
    }
}

/// Map the config file and CLI flags to a `CaptionConfig`.
///
/// Precedence, lowest first: built-in defaults, config file, `--seo-location`
/// preset, individual flags.
async fn build_config(cli: &Cli, progress: Option<SharedProgress>) -> Result<CaptionConfig> {
    let mut builder = CaptionConfig::builder();

    if let Some(ref path) = cli.config {
        let file = FileConfig::load(path)
            .await
            .with_context(|| format!("Failed to load config {}", path.display()))?;
        builder = file.apply_to(builder);
    }

    if let Some(ref location) = cli.seo_location {
        builder = builder.seo_preset(location.clone());
    }

    if let Some(ref root) = cli.root {
        builder = builder.root(root.clone());
    }
    if let Some(ref endpoint) = cli.endpoint {
        builder = builder.endpoint(endpoint.clone());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref path) = cli.prompt_file {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {}", path.display()))?;
        builder = builder.prompt(prompt);
    }
    if let Some(ref location) = cli.location {
        builder = builder.location(location.clone());
    }
    if let Some(secs) = cli.timeout_secs {
        builder = builder.timeout_secs(secs);
    }
    if let Some(n) = cli.max_tokens {
        builder = builder.max_tokens(n);
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(chars) = cli.max_caption_len {
        builder = builder.max_caption_len(chars);
    }
    if let Some(n) = cli.concurrency {
        builder = builder.concurrency(n);
    }
    if let Some(cb) = progress {
        builder = builder.progress(cb);
    }

    builder.build().context("Invalid configuration")
}
