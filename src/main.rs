//! Bindery CLI entry point.

use bindery::cli::{run_process, Cli, Output};
use bindery::config::Settings;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("bindery={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration; problems fall back to defaults with a warning
    let settings = Settings::load_or_default(&Settings::expand_path(&cli.config_file));

    match run_process(&cli, &settings).await {
        Ok(_) => {
            Output::success("Audio processing completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            Output::error(&format!("Audio processing failed: {:#}", e));
            ExitCode::FAILURE
        }
    }
}
