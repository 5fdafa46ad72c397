//! Command-line interface definitions for pvalab.

use clap::{Args, Parser, Subcommand};

use pva_rs::types::{
    DEFAULT_DEBOUNCE_WINDOW, DEFAULT_FINISH_THRESHOLD, DEFAULT_OUTLIER_THRESHOLD,
    DEFAULT_START_THRESHOLD, DEFAULT_TOLERANCE, DEFAULT_TRIGGER_DELAY,
};

#[derive(Parser)]
#[command(
    name = "pvalab",
    version,
    about = "Patient-ventilator asynchrony detection for pressure/volume recordings",
    long_about = "Detects patient-ventilator asynchronies in mechanical ventilation \
                  recordings. Input files are header-labeled CSV or whitespace-separated \
                  ASCII with at least a 'volume' and a 'pmus' column; detected events are \
                  reported as JSON with sample indices and wall-clock offsets."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the full asynchrony analysis on a recording
    Analyze(AnalyzeArgs),

    /// Extract breath and effort marks without classifying them
    Marks(MarksArgs),

    /// List the detectable asynchrony types
    Types(TypesArgs),

    /// Check that a recording file is readable and well-formed
    Validate(ValidateArgs),

    /// Analyze multiple recordings matching a glob pattern
    Batch(BatchArgs),
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Path to the recording file (.csv, .txt, or .ascii)
    #[arg(short, long)]
    pub file: String,

    /// Sampling rate in Hz (otherwise inferred from the time column)
    #[arg(long, env = "PVALAB_SAMPLE_RATE")]
    pub sample_rate: Option<f64>,

    /// Trigger tolerance window in samples
    #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
    pub tolerance: usize,

    /// Delayed-triggering threshold in samples
    #[arg(long, default_value_t = DEFAULT_TRIGGER_DELAY)]
    pub trigger_delay: usize,

    /// Minimum sample gap between successive effort candidates
    #[arg(long, default_value_t = DEFAULT_DEBOUNCE_WINDOW)]
    pub debounce_window: usize,

    /// Near-baseline pressure magnitude for effort onset detection
    #[arg(long, default_value_t = DEFAULT_START_THRESHOLD)]
    pub start_threshold: f64,

    /// Deflection pressure magnitude for effort onset detection
    #[arg(long, default_value_t = DEFAULT_FINISH_THRESHOLD)]
    pub finish_threshold: f64,

    /// Minimum trough magnitude for an effort to count
    #[arg(long, default_value_t = DEFAULT_OUTLIER_THRESHOLD)]
    pub outlier_threshold: f64,

    /// Only report these asynchrony types (e.g. --types DT IEE)
    #[arg(long, num_args = 1..)]
    pub types: Option<Vec<String>>,

    /// Write JSON results to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<String>,

    /// Emit compact JSON instead of pretty-printed
    #[arg(long)]
    pub compact: bool,

    /// Suppress progress messages
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct MarksArgs {
    /// Path to the recording file (.csv, .txt, or .ascii)
    #[arg(short, long)]
    pub file: String,

    /// Minimum sample gap between successive effort candidates
    #[arg(long, default_value_t = DEFAULT_DEBOUNCE_WINDOW)]
    pub debounce_window: usize,

    /// Near-baseline pressure magnitude for effort onset detection
    #[arg(long, default_value_t = DEFAULT_START_THRESHOLD)]
    pub start_threshold: f64,

    /// Deflection pressure magnitude for effort onset detection
    #[arg(long, default_value_t = DEFAULT_FINISH_THRESHOLD)]
    pub finish_threshold: f64,

    /// Minimum trough magnitude for an effort to count
    #[arg(long, default_value_t = DEFAULT_OUTLIER_THRESHOLD)]
    pub outlier_threshold: f64,

    /// Write JSON results to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<String>,

    /// Emit compact JSON instead of pretty-printed
    #[arg(long)]
    pub compact: bool,

    /// Suppress progress messages
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct TypesArgs {
    /// Output as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Path to the recording file to check
    #[arg(short, long)]
    pub file: String,

    /// Output as JSON instead of plain text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern for recording files (e.g. "data/*.csv")
    #[arg(short, long)]
    pub pattern: String,

    /// Sampling rate in Hz applied to every file (otherwise inferred per file)
    #[arg(long, env = "PVALAB_SAMPLE_RATE")]
    pub sample_rate: Option<f64>,

    /// Trigger tolerance window in samples
    #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
    pub tolerance: usize,

    /// Delayed-triggering threshold in samples
    #[arg(long, default_value_t = DEFAULT_TRIGGER_DELAY)]
    pub trigger_delay: usize,

    /// Minimum sample gap between successive effort candidates
    #[arg(long, default_value_t = DEFAULT_DEBOUNCE_WINDOW)]
    pub debounce_window: usize,

    /// Near-baseline pressure magnitude for effort onset detection
    #[arg(long, default_value_t = DEFAULT_START_THRESHOLD)]
    pub start_threshold: f64,

    /// Deflection pressure magnitude for effort onset detection
    #[arg(long, default_value_t = DEFAULT_FINISH_THRESHOLD)]
    pub finish_threshold: f64,

    /// Minimum trough magnitude for an effort to count
    #[arg(long, default_value_t = DEFAULT_OUTLIER_THRESHOLD)]
    pub outlier_threshold: f64,

    /// Only report these asynchrony types (e.g. --types DT IEE)
    #[arg(long, num_args = 1..)]
    pub types: Option<Vec<String>>,

    /// Write one <stem>_pva.json per input into this directory
    /// (otherwise results stream to stdout as JSON lines)
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// List matching files without analyzing them
    #[arg(long)]
    pub dry_run: bool,

    /// Emit compact JSON in per-file outputs
    #[arg(long)]
    pub compact: bool,

    /// Suppress progress messages
    #[arg(short, long)]
    pub quiet: bool,
}
