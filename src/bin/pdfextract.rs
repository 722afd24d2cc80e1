//! CLI binary for the inventory-driven PDF text extractor.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `PdfConfig` and prints the final counts.

use anyhow::{Context, Result};
use clap::Parser;
use img2alt::{run_extraction, PdfConfig};
use std::io;
use std::path::PathBuf;
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

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract every PDF the inventory lists
  pdfextract --inventory /kb/inventory.json

  # Keep the reports next to the inventory
  pdfextract --inventory /kb/inventory.json \
      --report /kb/pdf-extraction-report.json \
      --summary /kb/pdf-extraction-summary.md

  # Tune the scanned-document heuristic
  pdfextract --inventory /kb/inventory.json \
      --ocr-min-chars 200 --ocr-min-file-bytes 50000

  # Report JSON on stdout as well
  pdfextract --inventory /kb/inventory.json --json > report.json

INVENTORY FORMAT:
  A JSON object with a "files" array; non-PDF entries are ignored:
    {"files": [{"type": "pdf", "path": "/kb/guides/light.pdf",
                "filename": "light.pdf", "size_bytes": 123456}]}

OUTPUTS:
  <source>.extracted.md   one per readable PDF, next to the source
                          (YAML frontmatter + raw extracted text)
  report JSON             aggregate counts + one record per file
  summary markdown        per-category counts, OCR and failure lists

CLASSIFICATION:
  success             text extracted and written
  needs_ocr           under --ocr-min-chars characters out of a file over
                      --ocr-min-file-bytes: almost certainly a scan
  password_protected  encrypted; nothing extracted
  corrupted           the PDF container could not be parsed
  file_not_found      the inventory entry points at nothing
  error               anything else; see the record's message
"#;

/// Extract text from every PDF in a file inventory.
#[derive(Parser, Debug)]
#[command(
    name = "pdfextract",
    version,
    about = "Extract text from every PDF in a file inventory",
    long_about = "Walk a precomputed file inventory, extract text from each PDF page by page, \
and classify the outcome. Readable documents get a markdown file with YAML frontmatter next \
to the source; the run ends with an aggregate JSON report and a markdown summary grouped by \
category. Encrypted, corrupted, and image-only documents are recorded, never fatal.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Inventory JSON listing the candidate files.
    #[arg(short, long, env = "PDFEXTRACT_INVENTORY")]
    inventory: PathBuf,

    /// Where to write the aggregate JSON report.
    #[arg(
        long,
        env = "PDFEXTRACT_REPORT",
        default_value = "pdf-extraction-report.json"
    )]
    report: PathBuf,

    /// Where to write the markdown summary.
    #[arg(
        long,
        env = "PDFEXTRACT_SUMMARY",
        default_value = "pdf-extraction-summary.md"
    )]
    summary: PathBuf,

    /// Flag extractions under this many characters as OCR candidates.
    #[arg(long, env = "PDFEXTRACT_OCR_MIN_CHARS", default_value_t = 100)]
    ocr_min_chars: usize,

    /// Only files over this many bytes can be OCR candidates.
    #[arg(long, env = "PDFEXTRACT_OCR_MIN_FILE_BYTES", default_value_t = 100_000)]
    ocr_min_file_bytes: u64,

    /// Print the report JSON to stdout as well.
    #[arg(long)]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFEXTRACT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFEXTRACT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The per-file [n/m] lines come from the library's info logs, so the
    // default level stays at info here.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || cli.json {
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

    // ── Build config & run ───────────────────────────────────────────────
    let config = PdfConfig {
        inventory_path: cli.inventory.clone(),
        report_path: cli.report.clone(),
        summary_path: cli.summary.clone(),
        ocr_min_chars: cli.ocr_min_chars,
        ocr_min_file_bytes: cli.ocr_min_file_bytes,
        ..Default::default()
    };

    let report = run_extraction(&config).await.context("Extraction failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    }

    if !cli.quiet {
        eprintln!(
            "{} {}/{} PDFs extracted ({:.1}%)",
            if report.failed == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            bold(&report.successful.to_string()),
            report.total,
            report.success_rate(),
        );
        if report.needs_ocr > 0 {
            eprintln!("   {} image-heavy, need OCR", report.needs_ocr);
        }
        if report.failed > 0 {
            eprintln!(
                "   {} failed  {}",
                red(&report.failed.to_string()),
                dim(&format!(
                    "({} password protected, {} corrupted, {} other)",
                    report.password_protected,
                    report.corrupted,
                    report.other_failures()
                )),
            );
        }
        eprintln!("   report  → {}", bold(&cli.report.display().to_string()));
        eprintln!("   summary → {}", bold(&cli.summary.display().to_string()));
    }

    Ok(())
}
