//! Media pipeline driver.
//!
//! Runs the fixed stage sequence (concatenate, normalize, denoise, embed
//! chapters) on intermediate files in a run-owned scratch directory. The
//! first failing stage stops the run; its partial output and any earlier
//! intermediates are removed before the error is returned.

use crate::chapters::{derive_chapters, render_chapter_file, ChapterSource};
use crate::config::Settings;
use crate::discovery::MediaFile;
use crate::error::{BinderyError, Result};
use crate::media::MediaTool;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// One step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Concatenate,
    Normalize,
    Denoise,
    Chapters,
}

impl Stage {
    /// File name of the stage's output inside the scratch directory.
    pub fn artifact_name(&self) -> &'static str {
        match self {
            Stage::Concatenate => "concat.mp3",
            Stage::Normalize => "normalized.mp3",
            Stage::Denoise => "filtered.mp3",
            Stage::Chapters => "chaptered.mp3",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Concatenate => write!(f, "Concatenation"),
            Stage::Normalize => write!(f, "Loudness normalization"),
            Stage::Denoise => write!(f, "Noise filtering"),
            Stage::Chapters => write!(f, "Chapter embedding"),
        }
    }
}

/// Result of a successful pipeline run.
#[derive(Debug)]
pub struct PipelineReport {
    /// Final artifact location.
    pub output: PathBuf,
    /// Number of input segments concatenated.
    pub files: usize,
    /// Number of chapters embedded (0 when none could be derived).
    pub chapters: usize,
    /// Origin of the embedded chapters, if any.
    pub chapter_source: Option<ChapterSource>,
}

/// Drives the external media tool through the processing stages.
pub struct Pipeline<'a> {
    settings: &'a Settings,
    tool: &'a dyn MediaTool,
}

impl<'a> Pipeline<'a> {
    pub fn new(settings: &'a Settings, tool: &'a dyn MediaTool) -> Self {
        Self { settings, tool }
    }

    /// Process the ordered input files into a single chaptered artifact at `output`.
    #[instrument(skip_all, fields(output = %output.display(), files = files.len()))]
    pub async fn run(&self, files: &[MediaFile], output: &Path) -> Result<PipelineReport> {
        if files.is_empty() {
            return Err(BinderyError::InvalidInput("No input files to process".into()));
        }

        let parent = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        tokio::fs::create_dir_all(parent).await?;

        // Scratch lives next to the output so the final rename stays on one filesystem
        let scratch = tempfile::Builder::new()
            .prefix(".bindery-scratch-")
            .tempdir_in(parent)?;
        let scratch_dir = scratch.path();
        debug!("Scratch directory: {}", scratch_dir.display());

        let audio = &self.settings.audio_processing;

        info!("Concatenating {} files", files.len());
        eprintln!("  Concatenating {} files...", files.len());
        let concatenated = scratch_dir.join(Stage::Concatenate.artifact_name());
        let list_file = scratch_dir.join("file_list.txt");
        write_scratch(Stage::Concatenate, &list_file, &concat_list(files).await).await?;
        let result = self
            .tool
            .concatenate(&list_file, &audio.output.bitrate, &concatenated)
            .await;
        remove_scratch(&list_file).await;
        finish_stage(Stage::Concatenate, result, &concatenated, None).await?;

        info!("Normalizing loudness");
        eprintln!("  Normalizing loudness...");
        let normalized = scratch_dir.join(Stage::Normalize.artifact_name());
        let result = self
            .tool
            .normalize_loudness(&concatenated, &normalized, &audio.loudness_normalization)
            .await;
        finish_stage(Stage::Normalize, result, &normalized, Some(&concatenated)).await?;

        info!("Applying noise filter");
        eprintln!("  Applying noise filter...");
        let filtered = scratch_dir.join(Stage::Denoise.artifact_name());
        let result = self
            .tool
            .reduce_noise(&normalized, &filtered, &audio.noise_filter)
            .await;
        finish_stage(Stage::Denoise, result, &filtered, Some(&normalized)).await?;

        eprintln!("  Handling chapter markers...");
        let chapter_set = derive_chapters(self.tool, files).await;

        let (final_artifact, chapters, chapter_source) = if chapter_set.is_empty() {
            warn!("No chapters could be derived, output will have no chapter markers");
            (filtered, 0, None)
        } else {
            info!("Embedding {} chapters ({})", chapter_set.len(), chapter_set.source);
            let chaptered = scratch_dir.join(Stage::Chapters.artifact_name());
            let chapter_file = scratch_dir.join("chapters.txt");

            let rendered = render_chapter_file(&chapter_set.chapters);
            if let Err(e) = write_scratch(Stage::Chapters, &chapter_file, &rendered).await {
                remove_scratch(&filtered).await;
                return Err(e);
            }

            let result = self
                .tool
                .embed_chapters(&filtered, &chapter_file, &chaptered)
                .await;
            remove_scratch(&chapter_file).await;
            finish_stage(Stage::Chapters, result, &chaptered, Some(&filtered)).await?;

            (chaptered, chapter_set.len(), Some(chapter_set.source))
        };

        tokio::fs::rename(&final_artifact, output).await?;
        scratch.close()?;

        info!("Output saved to {}", output.display());

        Ok(PipelineReport {
            output: output.to_path_buf(),
            files: files.len(),
            chapters,
            chapter_source,
        })
    }
}

/// Build the concat demuxer list for the input files.
///
/// Paths are made absolute because the demuxer resolves relative entries
/// against the list file's own directory.
async fn concat_list(files: &[MediaFile]) -> String {
    let mut list = String::new();
    for file in files {
        let path = match tokio::fs::canonicalize(file.path()).await {
            Ok(p) => p,
            Err(_) => file.path().to_path_buf(),
        };
        list.push_str(&concat_entry(&path));
        list.push('\n');
    }
    list
}

/// Quote one path for the concat list; `'` becomes `'\''`.
fn concat_entry(path: &Path) -> String {
    format!("file '{}'", path.to_string_lossy().replace('\'', r"'\''"))
}

async fn write_scratch(stage: Stage, path: &Path, contents: &str) -> Result<()> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| BinderyError::StageFailed {
            stage,
            message: format!("Cannot write {}: {}", path.display(), e),
        })
}

/// Remove a scratch file if present. Failures are only logged.
async fn remove_scratch(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove scratch file {}: {}", path.display(), e),
    }
}

/// Settle a stage: its input is no longer needed either way, and on failure
/// its own output is discarded too.
async fn finish_stage(
    stage: Stage,
    result: Result<()>,
    output: &Path,
    input: Option<&Path>,
) -> Result<()> {
    if let Some(input) = input {
        remove_scratch(input).await;
    }

    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            remove_scratch(output).await;
            Err(BinderyError::StageFailed {
                stage,
                message: e.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chapters::Chapter;
    use crate::config::{LoudnessSettings, NoiseFilterSettings};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Tool that writes placeholder outputs and can fail a chosen stage after
    /// leaving a partial file behind.
    struct FakeTool {
        fail: Option<Stage>,
        durations: Vec<f64>,
        durations_fail: bool,
        embedded: Vec<Chapter>,
        calls: Mutex<Vec<Stage>>,
        written: Mutex<Vec<PathBuf>>,
        inputs_seen: Mutex<Vec<PathBuf>>,
        concat_lists: Mutex<Vec<String>>,
        chapter_files: Mutex<Vec<String>>,
    }

    impl FakeTool {
        fn new(fail: Option<Stage>) -> Self {
            Self {
                fail,
                durations: vec![10.0, 20.0],
                durations_fail: false,
                embedded: Vec::new(),
                calls: Mutex::new(Vec::new()),
                written: Mutex::new(Vec::new()),
                inputs_seen: Mutex::new(Vec::new()),
                concat_lists: Mutex::new(Vec::new()),
                chapter_files: Mutex::new(Vec::new()),
            }
        }

        fn produce(&self, stage: Stage, input: &Path, output: &Path) -> crate::error::Result<()> {
            self.calls.lock().unwrap().push(stage);
            self.inputs_seen.lock().unwrap().push(input.to_path_buf());
            assert!(input.exists(), "{} input missing", stage);

            std::fs::write(output, stage.artifact_name()).unwrap();
            self.written.lock().unwrap().push(output.to_path_buf());

            if self.fail == Some(stage) {
                return Err(BinderyError::ToolFailed(format!("{} exited with 1", stage)));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl MediaTool for FakeTool {
        async fn probe_chapters(&self, _path: &Path) -> crate::error::Result<Vec<Chapter>> {
            Ok(self.embedded.clone())
        }

        async fn probe_duration(&self, path: &Path) -> crate::error::Result<f64> {
            if self.durations_fail {
                return Err(BinderyError::Probe("unreadable".into()));
            }
            let name = path.file_stem().unwrap().to_string_lossy();
            let idx: usize = name.trim_start_matches("part").parse().unwrap();
            Ok(self.durations[idx - 1])
        }

        async fn concatenate(
            &self,
            list_file: &Path,
            _bitrate: &str,
            output: &Path,
        ) -> crate::error::Result<()> {
            let list = std::fs::read_to_string(list_file).unwrap();
            self.concat_lists.lock().unwrap().push(list);
            self.produce(Stage::Concatenate, list_file, output)
        }

        async fn normalize_loudness(
            &self,
            input: &Path,
            output: &Path,
            _params: &LoudnessSettings,
        ) -> crate::error::Result<()> {
            self.produce(Stage::Normalize, input, output)
        }

        async fn reduce_noise(
            &self,
            input: &Path,
            output: &Path,
            _params: &NoiseFilterSettings,
        ) -> crate::error::Result<()> {
            self.produce(Stage::Denoise, input, output)
        }

        async fn embed_chapters(
            &self,
            input: &Path,
            chapter_file: &Path,
            output: &Path,
        ) -> crate::error::Result<()> {
            let text = std::fs::read_to_string(chapter_file).unwrap();
            self.chapter_files.lock().unwrap().push(text);
            self.produce(Stage::Chapters, input, output)
        }
    }

    fn setup() -> (tempfile::TempDir, Vec<MediaFile>, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input");
        std::fs::create_dir_all(&input).unwrap();
        let files: Vec<MediaFile> = ["part1.mp3", "part2.mp3"]
            .iter()
            .map(|n| {
                let p = input.join(n);
                std::fs::write(&p, b"segment").unwrap();
                MediaFile::new(p)
            })
            .collect();
        let output = dir.path().join("out").join("book.mp3");
        (dir, files, output)
    }

    fn scratch_dirs(parent: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(parent)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.file_name().unwrap().to_string_lossy().starts_with(".bindery-scratch-"))
            .collect()
    }

    #[tokio::test]
    async fn test_successful_run_with_synthesized_chapters() {
        let (_dir, files, output) = setup();
        let settings = Settings::default();
        let tool = FakeTool::new(None);

        let report = Pipeline::new(&settings, &tool).run(&files, &output).await.unwrap();

        assert_eq!(report.files, 2);
        assert_eq!(report.chapters, 2);
        assert_eq!(report.chapter_source, Some(ChapterSource::Synthesized));
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "chaptered.mp3");
        assert_eq!(
            *tool.calls.lock().unwrap(),
            vec![Stage::Concatenate, Stage::Normalize, Stage::Denoise, Stage::Chapters]
        );

        // Each stage consumes the previous stage's artifact
        let inputs: Vec<String> = tool
            .inputs_seen
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(
            inputs,
            vec!["file_list.txt", "concat.mp3", "normalized.mp3", "filtered.mp3"]
        );

        // Every intermediate is gone, along with the scratch directory
        for path in tool.written.lock().unwrap().iter() {
            assert!(!path.exists(), "{} left behind", path.display());
        }
        assert!(scratch_dirs(output.parent().unwrap()).is_empty());

        let chapter_file = &tool.chapter_files.lock().unwrap()[0];
        assert_eq!(
            chapter_file,
            "CHAPTER0=0.000\nCHAPTER0NAME=Chapter 1\nCHAPTER1=10.000\nCHAPTER1NAME=Chapter 2\n"
        );
    }

    #[tokio::test]
    async fn test_concat_list_is_in_discovery_order() {
        let (_dir, files, output) = setup();
        let settings = Settings::default();
        let tool = FakeTool::new(None);

        Pipeline::new(&settings, &tool).run(&files, &output).await.unwrap();

        let list = &tool.concat_lists.lock().unwrap()[0];
        let lines: Vec<&str> = list.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("file '") && lines[0].ends_with("part1.mp3'"));
        assert!(lines[1].ends_with("part2.mp3'"));
    }

    #[tokio::test]
    async fn test_denoise_failure_cleans_up_and_stops() {
        let (_dir, files, output) = setup();
        let settings = Settings::default();
        let tool = FakeTool::new(Some(Stage::Denoise));

        let err = Pipeline::new(&settings, &tool)
            .run(&files, &output)
            .await
            .unwrap_err();

        assert!(matches!(err, BinderyError::StageFailed { stage: Stage::Denoise, .. }));
        assert_eq!(
            *tool.calls.lock().unwrap(),
            vec![Stage::Concatenate, Stage::Normalize, Stage::Denoise]
        );
        assert!(tool.chapter_files.lock().unwrap().is_empty());

        let written = tool.written.lock().unwrap();
        assert_eq!(written.len(), 3);
        for path in written.iter() {
            assert!(!path.exists(), "{} left behind", path.display());
        }
        assert!(!output.exists());
        assert!(scratch_dirs(output.parent().unwrap()).is_empty());
    }

    #[tokio::test]
    async fn test_concatenate_failure_stops_before_normalize() {
        let (_dir, files, output) = setup();
        let settings = Settings::default();
        let tool = FakeTool::new(Some(Stage::Concatenate));

        let err = Pipeline::new(&settings, &tool)
            .run(&files, &output)
            .await
            .unwrap_err();

        assert!(matches!(err, BinderyError::StageFailed { stage: Stage::Concatenate, .. }));
        assert_eq!(*tool.calls.lock().unwrap(), vec![Stage::Concatenate]);
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_embed_failure_reports_chapter_stage() {
        let (_dir, files, output) = setup();
        let settings = Settings::default();
        let tool = FakeTool::new(Some(Stage::Chapters));

        let err = Pipeline::new(&settings, &tool)
            .run(&files, &output)
            .await
            .unwrap_err();

        assert!(matches!(err, BinderyError::StageFailed { stage: Stage::Chapters, .. }));
        assert!(err.to_string().starts_with("Chapter embedding stage failed"));
        for path in tool.written.lock().unwrap().iter() {
            assert!(!path.exists());
        }
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_no_chapters_moves_filtered_output() {
        let (_dir, files, output) = setup();
        let settings = Settings::default();
        let mut tool = FakeTool::new(None);
        tool.durations_fail = true;

        let report = Pipeline::new(&settings, &tool).run(&files, &output).await.unwrap();

        assert_eq!(report.chapters, 0);
        assert!(report.chapter_source.is_none());
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "filtered.mp3");
        assert!(!tool.calls.lock().unwrap().contains(&Stage::Chapters));
        assert!(scratch_dirs(output.parent().unwrap()).is_empty());
    }

    #[tokio::test]
    async fn test_embedded_chapters_are_used() {
        let (_dir, files, output) = setup();
        let settings = Settings::default();
        let mut tool = FakeTool::new(None);
        tool.embedded = vec![Chapter {
            index: 0,
            start: 0.0,
            end: 42.0,
            title: "Prologue".to_string(),
        }];

        let report = Pipeline::new(&settings, &tool).run(&files, &output).await.unwrap();

        assert_eq!(report.chapters, 1);
        assert!(matches!(report.chapter_source, Some(ChapterSource::Embedded(_))));
        assert_eq!(
            tool.chapter_files.lock().unwrap()[0],
            "CHAPTER0=0.000\nCHAPTER0NAME=Prologue\n"
        );
    }

    #[tokio::test]
    async fn test_empty_file_list_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::default();
        let tool = FakeTool::new(None);

        let err = Pipeline::new(&settings, &tool)
            .run(&[], &dir.path().join("book.mp3"))
            .await
            .unwrap_err();

        assert!(matches!(err, BinderyError::InvalidInput(_)));
        assert!(tool.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_concat_entry_escapes_quotes() {
        assert_eq!(
            concat_entry(Path::new("/books/Author's Cut/01.mp3")),
            r"file '/books/Author'\''s Cut/01.mp3'"
        );
    }
}
