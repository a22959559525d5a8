use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod engine;
mod engines;
mod error;
mod input;
mod matcher;
mod normalize;
mod probe;
mod report;
mod transcript;

use report::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "ocr-probe")]
#[command(about = "Probe, normalize and search OCR detection results")]
#[command(version)]
pub struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info", global = true)]
    pub log_level: String,

    /// Report format written to stdout
    #[arg(
        long,
        env = "OCR_PROBE_FORMAT",
        value_enum,
        default_value_t = OutputFormat::Text,
        global = true
    )]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run an OCR engine over an image and normalize its output
    Extract(ExtractArgs),
    /// Normalize a saved detection result (JSON)
    Normalize(NormalizeArgs),
    /// Describe the structure of a saved detection result
    Probe(ProbeArgs),
    /// Search text blocks for keywords and show the anchor context
    Search(SearchArgs),
}

/// Field names tried when decoding a result
#[derive(clap::Args, Debug)]
pub struct HintArgs {
    /// Text field name, repeat for alternatives (default: rec_texts, rec_text)
    #[arg(long = "text-field")]
    pub text_fields: Vec<String>,

    /// Score field name, repeat for alternatives (default: rec_scores, rec_score)
    #[arg(long = "score-field")]
    pub score_fields: Vec<String>,

    /// Polygon field whose size is reported (default: dt_polys)
    #[arg(long)]
    pub polygon_field: Option<String>,

    /// Object holding result attributes (default: res)
    #[arg(long)]
    pub attribute_container: Option<String>,
}

/// Which recognized texts make it into the transcript
#[derive(clap::Args, Debug)]
pub struct PolicyArgs {
    /// Minimum trimmed text length (default: 2)
    #[arg(long)]
    pub min_text_len: Option<usize>,

    /// Minimum confidence (default: 0.3)
    #[arg(long)]
    pub min_confidence: Option<f32>,
}

#[derive(clap::Args, Debug)]
pub struct ExtractArgs {
    /// Image to recognize
    #[arg(long, env = "OCR_PROBE_IMAGE")]
    pub image: PathBuf,

    /// Engine name (default: first available engine)
    #[arg(long, env = "OCR_PROBE_ENGINE")]
    pub engine: Option<String>,

    /// Recognition language code
    #[arg(long, default_value = "en")]
    pub lang: String,

    /// Enable text angle classification
    #[arg(long)]
    pub use_angle_cls: bool,

    /// Detection map threshold (default: 0.3)
    #[arg(long)]
    pub det_db_thresh: Option<f32>,

    /// Detection box score threshold (default: 0.6)
    #[arg(long)]
    pub det_db_box_thresh: Option<f32>,

    /// Where a substantial transcript is written
    #[arg(long, default_value = "extracted_sample.txt")]
    pub output: PathBuf,

    /// Transcript length above which extraction counts as working
    #[arg(long, default_value = "50")]
    pub min_chars: usize,

    #[command(flatten)]
    pub policy: PolicyArgs,
}

#[derive(clap::Args, Debug)]
pub struct NormalizeArgs {
    /// JSON dump of a detection result
    #[arg(long)]
    pub input: PathBuf,

    /// Select one page of a multi-page result
    #[arg(long)]
    pub page: Option<usize>,

    /// Write a substantial transcript to this file
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Transcript length above which extraction counts as working
    #[arg(long, default_value = "50")]
    pub min_chars: usize,

    #[command(flatten)]
    pub hints: HintArgs,

    #[command(flatten)]
    pub policy: PolicyArgs,
}

#[derive(clap::Args, Debug)]
pub struct ProbeArgs {
    /// JSON dump of a detection result
    #[arg(long)]
    pub input: PathBuf,

    /// Select one page of a multi-page result
    #[arg(long)]
    pub page: Option<usize>,

    /// Number of entries to preview
    #[arg(long, default_value = "3")]
    pub preview: usize,

    /// Object holding result attributes
    #[arg(long, default_value = "res")]
    pub attribute_container: String,
}

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// Text blocks: JSON array of strings or one block per line
    #[arg(long)]
    pub blocks: PathBuf,

    /// Keyword to look for, repeatable
    #[arg(long = "keyword")]
    pub keywords: Vec<String>,

    /// File with one keyword per line
    #[arg(long)]
    pub keywords_file: Option<PathBuf>,

    /// Block at the center of the context window
    #[arg(long, default_value = "Educational objective:")]
    pub anchor: String,

    /// Blocks shown before the anchor
    #[arg(long, default_value = "5")]
    pub before: usize,

    /// Blocks shown from the anchor on
    #[arg(long, default_value = "10")]
    pub after: usize,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr, reports to stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("ocr-probe v{}", env!("CARGO_PKG_VERSION"));

    let format = args.format;
    match args.command {
        Command::Extract(args) => commands::extract(args.into(), format),
        Command::Normalize(args) => commands::normalize(args.into(), format),
        Command::Probe(args) => commands::probe(args.into(), format),
        Command::Search(args) => commands::search(args.into(), format),
    }
}
