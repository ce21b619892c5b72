//! CLI module for Bindery.

mod output;
pub mod preflight;
mod process;

pub use output::Output;
pub use process::run_process;

use clap::Parser;

/// Bindery - Audiobook segment binder
///
/// Concatenates the audio segments found under a directory into one file,
/// normalizes loudness, reduces noise and attaches chapter markers.
#[derive(Parser, Debug)]
#[command(name = "bindery")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Directory containing the audio segments (searched recursively)
    #[arg(long)]
    pub input_dir: String,

    /// Output file path
    #[arg(long)]
    pub output_file: String,

    /// Hardcover book ID to fetch metadata for (optional)
    #[arg(long)]
    pub book_id: Option<String>,

    /// Path to the configuration file (YAML, TOML or JSON)
    #[arg(long, env = "BINDERY_CONFIG", default_value = "config.yaml")]
    pub config_file: String,
}
