//! External engine binary detection.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::types::EngineConfig;
use crate::{Error, Result};

/// Information about an external engine binary.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    /// Name of the tool.
    pub name: String,
    /// Whether the tool is available.
    pub available: bool,
    /// First line of its version output, if available.
    pub version: Option<String>,
    /// Resolved path to the executable.
    pub path: Option<PathBuf>,
}

/// Check whether a tool responds to `--version`.
pub fn check_tool(bin: &Path) -> ToolInfo {
    check_tool_with_arg(bin, "--version")
}

/// Check whether a tool is available using a custom version argument.
pub fn check_tool_with_arg(bin: &Path, version_arg: &str) -> ToolInfo {
    let name = tool_name(bin);
    let result = Command::new(bin).arg(version_arg).output();

    match result {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(|s| s.to_string());

            let path = which::which(bin).ok();

            ToolInfo {
                name,
                available: true,
                version,
                path,
            }
        }
        _ => ToolInfo {
            name,
            available: false,
            version: None,
            path: None,
        },
    }
}

/// Check the engines this library can invoke.
///
/// Returns information about pandoc, libreoffice, and ffmpeg as configured.
pub fn check_tools(config: &EngineConfig) -> Vec<ToolInfo> {
    vec![
        check_tool(&config.pandoc_path),
        check_tool(&config.libreoffice_path),
        // ffmpeg only understands the single-dash form
        check_tool_with_arg(&config.ffmpeg_path, "-version"),
    ]
}

/// Require that a tool is resolvable, returning its path.
///
/// # Errors
///
/// Returns an error if the tool is not found on the PATH or at the
/// configured location.
pub fn require_tool(bin: &Path) -> Result<PathBuf> {
    which::which(bin).map_err(|_| Error::tool_not_found(tool_name(bin)))
}

/// The display name of a binary, from its file stem.
pub(crate) fn tool_name(bin: &Path) -> String {
    bin.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| bin.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_tool_not_found() {
        let info = check_tool(Path::new("nonexistent_tool_12345"));
        assert!(!info.available);
        assert!(info.version.is_none());
        assert!(info.path.is_none());
    }

    #[test]
    fn require_tool_missing() {
        let err = require_tool(Path::new("nonexistent_tool_12345")).unwrap_err();
        assert!(matches!(err, Error::ToolNotFound { tool } if tool == "nonexistent_tool_12345"));
    }

    #[test]
    fn tool_name_from_path() {
        assert_eq!(tool_name(Path::new("/usr/bin/ffmpeg")), "ffmpeg");
        assert_eq!(tool_name(Path::new("pandoc")), "pandoc");
    }
}
