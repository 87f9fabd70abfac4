use bandmeter::WindowUnit;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Measure {
    /// Log-magnitude spectral bands
    Spectral,
    /// Absolute sample peak
    Peak,
}

#[derive(Parser, Debug)]
#[command(name = "bandmeter", about = "Streaming spectral band analysis of raw PCM")]
pub struct Cli {
    /// Raw interleaved little-endian f32 PCM. Reads stdin when omitted or "-".
    pub input: Option<PathBuf>,

    /// Write JSON lines here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Config file (defaults to bandmeter.toml or the user config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Sample rate of the input in Hz
    #[arg(short = 'r', long)]
    pub sample_rate: u32,

    /// Number of interleaved channels
    #[arg(short, long)]
    pub channels: usize,

    /// Stream name stamped on every point (defaults to the input file stem)
    #[arg(long)]
    pub stream: Option<String>,

    /// What to measure at each anchor
    #[arg(long, value_enum, default_value_t = Measure::Spectral)]
    pub measure: Measure,

    /// Window length, in --unit
    #[arg(long)]
    pub window: Option<u64>,

    /// Spacing between anchors, in --unit
    #[arg(long)]
    pub hop: Option<u64>,

    /// Unit for window, hop and anchors (samples or ms)
    #[arg(long)]
    pub unit: Option<WindowUnit>,

    /// Number of spectral bands per point
    #[arg(long)]
    pub bands: Option<usize>,

    /// Lowest reported dB value
    #[arg(long, allow_hyphen_values = true)]
    pub floor_db: Option<f64>,

    /// Worker threads; more workers than channels selects pipeline mode
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Work items buffered between ingest and workers in pipeline mode
    #[arg(long)]
    pub queue_depth: Option<usize>,

    /// Frames read from the input per block
    #[arg(long)]
    pub block_frames: Option<usize>,

    /// Print the run summary as JSON to stderr
    #[arg(long)]
    pub summary: bool,
}
