//! Chapter marker derivation.
//!
//! Chapters embedded in an input segment are reused as-is: the first file
//! that carries any wins and no other file is consulted. When no segment has
//! embedded chapters, one chapter per segment is synthesized from probed
//! durations.

use crate::discovery::MediaFile;
use crate::media::MediaTool;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::{debug, info, instrument, warn};

/// A named time interval in the final artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    /// Position in the chapter list.
    pub index: usize,
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    pub title: String,
}

impl Chapter {
    /// Chapter length in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Where a chapter set came from.
#[derive(Debug, Clone, PartialEq)]
pub enum ChapterSource {
    /// Reused from the markers embedded in this input file.
    Embedded(PathBuf),
    /// Built from per-file durations.
    Synthesized,
}

impl std::fmt::Display for ChapterSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChapterSource::Embedded(path) => write!(f, "embedded in {}", path.display()),
            ChapterSource::Synthesized => write!(f, "synthesized from file durations"),
        }
    }
}

/// An ordered chapter list and its origin.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterSet {
    pub chapters: Vec<Chapter>,
    pub source: ChapterSource,
}

impl ChapterSet {
    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }
}

/// Derive the chapter timeline for an ordered list of input files.
#[instrument(skip_all, fields(files = files.len()))]
pub async fn derive_chapters(tool: &dyn MediaTool, files: &[MediaFile]) -> ChapterSet {
    if let Some(set) = detect_embedded(tool, files).await {
        return set;
    }

    let chapters = synthesize(tool, files).await;
    ChapterSet {
        chapters,
        source: ChapterSource::Synthesized,
    }
}

/// Return the first non-empty embedded chapter list, stopping at that file.
async fn detect_embedded(tool: &dyn MediaTool, files: &[MediaFile]) -> Option<ChapterSet> {
    for file in files {
        match tool.probe_chapters(file.path()).await {
            Ok(chapters) if !chapters.is_empty() => {
                info!(
                    "Using {} embedded chapters from {}",
                    chapters.len(),
                    file.path().display()
                );
                return Some(ChapterSet {
                    chapters,
                    source: ChapterSource::Embedded(file.path().to_path_buf()),
                });
            }
            Ok(_) => {}
            Err(e) => debug!("No chapters read from {}: {}", file.path().display(), e),
        }
    }
    None
}

/// One chapter per file whose duration could be probed. Files that fail are
/// skipped and the numbering continues over the retained files only.
async fn synthesize(tool: &dyn MediaTool, files: &[MediaFile]) -> Vec<Chapter> {
    let mut chapters: Vec<Chapter> = Vec::with_capacity(files.len());
    let mut running = 0.0;

    for file in files {
        let duration = match tool.probe_duration(file.path()).await {
            Ok(d) => d,
            Err(e) => {
                warn!("Error getting duration for {}: {}", file.path().display(), e);
                continue;
            }
        };

        let index = chapters.len();
        chapters.push(Chapter {
            index,
            start: running,
            end: running + duration,
            title: format!("Chapter {}", index + 1),
        });
        running += duration;
    }

    info!("Synthesized {} chapters ({:.1}s total)", chapters.len(), running);
    chapters
}

/// Render the chapter description file handed to the media tool.
///
/// Two lines per chapter: `CHAPTERk=<start seconds>` and `CHAPTERkNAME=<title>`.
pub fn render_chapter_file(chapters: &[Chapter]) -> String {
    let mut out = String::new();
    for chapter in chapters {
        // Titles are single-line in this format
        let title = chapter.title.replace(['\r', '\n'], " ");
        let _ = writeln!(out, "CHAPTER{}={:.3}", chapter.index, chapter.start);
        let _ = writeln!(out, "CHAPTER{}NAME={}", chapter.index, title);
    }
    out
}
