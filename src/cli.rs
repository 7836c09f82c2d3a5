use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tunebeat", about = "Estimate pitch and tempo of recorded performances")]
pub struct Cli {
    /// Config file (default: ./tunebeat.toml or ~/.config/tunebeat/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory for saved results
    #[arg(long, global = true)]
    pub store_dir: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze one or more audio files (WAV, MP3, FLAC, OGG, AAC)
    Analyze(AnalyzeArgs),
    /// List saved results
    List,
    /// Print a saved result as JSON
    Show {
        /// Result key (file stem used when it was saved)
        key: String,
    },
}

#[derive(clap::Args, Debug)]
pub struct AnalyzeArgs {
    /// Input audio files
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Analyze a single channel instead of the mono downmix
    #[arg(long)]
    pub channel: Option<usize>,

    /// Save each result under its file stem
    #[arg(long)]
    pub save: bool,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    /// Lowest detectable pitch in Hz
    #[arg(long, default_value_t = 60.0)]
    pub min_hz: f32,

    /// Energy window for onset detection in milliseconds
    #[arg(long, default_value_t = 20)]
    pub window_ms: u32,

    /// Lower bound of the tempo range
    #[arg(long, default_value_t = 60.0)]
    pub min_bpm: f64,

    /// Upper bound of the tempo range
    #[arg(long, default_value_t = 240.0)]
    pub max_bpm: f64,

    /// Skip the per-frame pitch track
    #[arg(long)]
    pub no_pitch_track: bool,
}
