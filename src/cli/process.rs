//! Process command implementation.

use crate::cli::output::format_duration;
use crate::cli::{preflight, Cli, Output};
use crate::config::Settings;
use crate::discovery::discover;
use crate::error::BinderyError;
use crate::media::{Ffmpeg, MediaTool};
use crate::metadata::{write_sidecar, HardcoverClient};
use crate::pipeline::{Pipeline, PipelineReport};
use anyhow::Result;
use std::path::Path;

/// Run a full processing job: optional metadata fetch, discovery, then the
/// media pipeline.
pub async fn run_process(cli: &Cli, settings: &Settings) -> Result<PipelineReport> {
    let input_dir = Settings::expand_path(&cli.input_dir);
    let output_file = Settings::expand_path(&cli.output_file);

    if let Some(book_id) = &cli.book_id {
        fetch_metadata(book_id, &output_file, settings).await;
    }

    // Pre-flight checks
    preflight::check(settings)?;

    Output::info(&format!("Scanning {}", input_dir.display()));
    let files = discover(&input_dir, &settings.input.extension)?;
    if files.is_empty() {
        return Err(BinderyError::NoInputFiles(input_dir).into());
    }
    Output::info(&format!("Found {} files", files.len()));

    let tool = Ffmpeg::from_settings(settings);
    let report = Pipeline::new(settings, &tool)
        .run(&files, &output_file)
        .await?;

    Output::success(&format!("Output saved to {}", report.output.display()));
    Output::kv("Segments", &report.files.to_string());
    match &report.chapter_source {
        Some(source) => Output::kv("Chapters", &format!("{} ({})", report.chapters, source)),
        None => Output::kv("Chapters", "none"),
    }
    if let Ok(duration) = tool.probe_duration(&report.output).await {
        Output::kv("Duration", &format_duration(duration));
    }

    Ok(report)
}

/// Fetch the book record and write it next to the output. Failures are
/// reported but never abort the run.
async fn fetch_metadata(book_id: &str, output_file: &Path, settings: &Settings) {
    Output::info(&format!("Fetching metadata for book ID: {}", book_id));

    let client = match HardcoverClient::new(&settings.api) {
        Ok(client) => client,
        Err(e) => {
            Output::warning(&format!("Cannot create metadata client: {}", e));
            return;
        }
    };

    let spinner = Output::spinner("Querying Hardcover...");
    let record = client.fetch_book(book_id).await;
    spinner.finish_and_clear();

    let Some(record) = record else {
        Output::warning("No metadata retrieved, continuing without it");
        return;
    };

    match write_sidecar(output_file, &record).await {
        Ok(path) => Output::success(&format!("Metadata saved to {}", path.display())),
        Err(e) => Output::warning(&format!("Failed to save metadata: {}", e)),
    }
}
