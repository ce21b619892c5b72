//! Pre-flight checks before expensive operations.
//!
//! Validates that the configured media tools are available before the
//! pipeline starts writing intermediates.

use crate::config::Settings;
use crate::error::{BinderyError, Result};
use std::path::Path;
use std::process::Command;

/// Run pre-flight checks for a processing run.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(settings: &Settings) -> Result<()> {
    check_tool(&settings.ffmpeg_path())?;
    check_tool(&settings.ffprobe_path())?;
    Ok(())
}

/// Check if an external tool is available.
fn check_tool(path: &Path) -> Result<()> {
    let name = path.display();
    match Command::new(path).arg("-version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(BinderyError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(BinderyError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(BinderyError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
