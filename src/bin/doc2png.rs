//! CLI binary for doc2png.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `RenderConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use doc2png::{
    inspect, render_document_async, DocumentInspection, ImageFormat, ProgressCallback,
    RenderConfig, RenderOutput, RenderProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
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

/// Spinner while the document is measured and converted, then a bar that
/// fills as render workers finish pages (in any order).
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    /// The bar length is set by `on_render_start`, once the PDF page count is known.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Measuring and converting document…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl RenderProgressCallback for CliProgressCallback {
    fn on_render_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Rendering");
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Rendering {total_pages} pages…"))
        ));
    }

    fn on_page_rendered(&self, _page_num: usize, _total_pages: usize) {
        self.bar.inc(1);
    }

    fn on_render_complete(&self, total_pages: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} pages rendered",
            green("✔"),
            bold(&total_pages.to_string())
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Render report.docx into ./report/page-N.png
  doc2png report.docx

  # Into a chosen directory, with a tighter pixel budget
  doc2png report.docx -o /tmp/pages --width 1200 --height 1600

  # Fixed resolution; page geometry is not resolved
  doc2png --dpi 150 slides.odp

  # JPEG output, JSON summary on stdout
  doc2png --format jpeg --json report.docx > render.json

  # Page size and DPI only, nothing rendered
  doc2png --inspect-only report.docx

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Path to libpdfium; the system library is used otherwise
  DOC2PNG_*         Every flag, e.g. DOC2PNG_WIDTH=1200, DOC2PNG_SOFFICE=/opt/lo/soffice
  RUST_LOG          Overrides the log filter (e.g. doc2png=debug)

REQUIREMENTS:
  LibreOffice (soffice) and the pdfium shared library must be installed.
"#;

/// Render documents to one image per page at a page-size-derived DPI.
#[derive(Parser, Debug)]
#[command(
    name = "doc2png",
    version,
    about = "Render documents to one image per page",
    long_about = "Render word-processing documents to page images. The DPI is derived from the \
document's physical page size so each page fits the pixel budget; documents are converted to PDF \
through headless LibreOffice and rasterised with pdfium.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Document to render (.docx, .docm, .dotx, .dotm natively; anything soffice opens otherwise).
    input: PathBuf,

    /// Directory for page-N images. Default: the input path without its extension (`<name>_pages` if it has none).
    #[arg(short, long, env = "DOC2PNG_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Maximum page width in pixels.
    #[arg(long, env = "DOC2PNG_WIDTH", default_value_t = doc2png::config::DEFAULT_MAX_WIDTH_PX,
          value_parser = clap::value_parser!(u32).range(1..))]
    width: u32,

    /// Maximum page height in pixels.
    #[arg(long, env = "DOC2PNG_HEIGHT", default_value_t = doc2png::config::DEFAULT_MAX_HEIGHT_PX,
          value_parser = clap::value_parser!(u32).range(1..))]
    height: u32,

    /// Fixed DPI; skips page-size detection and ignores --width/--height.
    #[arg(long, env = "DOC2PNG_DPI", value_parser = clap::value_parser!(u32).range(1..))]
    dpi: Option<u32>,

    /// Image format of the pages.
    #[arg(long, env = "DOC2PNG_FORMAT", value_enum, default_value = "png")]
    format: FormatArg,

    /// Render worker threads.
    #[arg(long, env = "DOC2PNG_WORKERS", default_value_t = doc2png::config::DEFAULT_WORKERS)]
    workers: usize,

    /// LibreOffice executable.
    #[arg(long, env = "DOC2PNG_SOFFICE", default_value = "soffice")]
    soffice: PathBuf,

    /// Print the result (RenderOutput, or the inspection) as JSON.
    #[arg(long, env = "DOC2PNG_JSON")]
    json: bool,

    /// Print page size and DPI only, no rendering.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOC2PNG_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOC2PNG_QUIET")]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long, env = "DOC2PNG_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Png,
    Jpeg,
}

impl From<FormatArg> for ImageFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Png => ImageFormat::Png,
            FormatArg::Jpeg => ImageFormat::Jpeg,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
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
        Some(cb as Arc<dyn RenderProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let inspection = tokio::task::block_in_place(|| inspect(&cli.input, &config))
            .context("Failed to inspect document")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&inspection)
                    .context("Failed to serialise inspection")?
            );
        } else {
            print_inspection(&inspection);
        }
        return Ok(());
    }

    // ── Run render ───────────────────────────────────────────────────────
    let output = render_document_async(&cli.input, &config)
        .await
        .with_context(|| format!("Failed to render {}", cli.input.display()))?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&output);
        println!("Pages rendered to {}", output.output_dir.display());
    }

    Ok(())
}

/// Map CLI args to `RenderConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<RenderConfig> {
    let mut builder = RenderConfig::builder()
        .max_width_px(cli.width)
        .max_height_px(cli.height)
        .image_format(cli.format.into())
        .workers(cli.workers)
        .soffice_path(&cli.soffice);

    if let Some(dpi) = cli.dpi {
        builder = builder.dpi(dpi);
    }
    if let Some(ref dir) = cli.output_dir {
        builder = builder.output_dir(dir);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_inspection(inspection: &DocumentInspection) {
    println!("File:         {}", inspection.path.display());
    println!("Kind:         {:?}", inspection.kind);
    println!(
        "Page size:    {:.3}in × {:.3}in",
        inspection.geometry.width_in, inspection.geometry.height_in
    );
    println!("Measured by:  {:?}", inspection.geometry.source);
    println!("DPI:          {} ({:?})", inspection.dpi, inspection.dpi_source);
}

fn print_summary(output: &RenderOutput) {
    let geometry = match output.geometry {
        Some(g) => format!("{:.2}in × {:.2}in, ", g.width_in, g.height_in),
        None => String::new(),
    };
    eprintln!(
        "   {}",
        dim(&format!(
            "{}{} DPI ({:?}), {} pages, {}ms total",
            geometry,
            output.dpi,
            output.dpi_source,
            output.stats.page_count,
            output.stats.total_duration_ms
        ))
    );
}
