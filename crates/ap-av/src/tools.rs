//! Discovery and startup validation of the ffmpeg executable.

use std::path::{Path, PathBuf};

use ap_core::{ConverterConfig, Error, Result};

/// A validated handle to the ffmpeg executable.
///
/// The path is resolved and existence-checked exactly once, at startup; a
/// missing tool is a fatal [`Error::Config`], never a per-request failure.
#[derive(Debug, Clone)]
pub struct FfmpegTool {
    path: PathBuf,
    version: Option<String>,
}

impl FfmpegTool {
    /// Resolve ffmpeg from the configuration.
    ///
    /// An explicitly configured path must exist; otherwise ffmpeg is looked
    /// up in `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configured path does not exist or no
    /// ffmpeg is found in `PATH`.
    pub fn resolve(config: &ConverterConfig) -> Result<Self> {
        let path = match &config.ffmpeg_path {
            Some(p) if p.exists() => p.clone(),
            Some(p) => {
                return Err(Error::config(format!(
                    "configured ffmpeg path does not exist: {}",
                    p.display()
                )));
            }
            None => which::which("ffmpeg").map_err(|_| {
                Error::config("ffmpeg not found in PATH; install it or set ffmpeg_path")
            })?,
        };

        let version = detect_version(&path);
        match &version {
            Some(v) => tracing::info!(path = %path.display(), version = %v, "ffmpeg resolved"),
            None => tracing::info!(path = %path.display(), "ffmpeg resolved (version unknown)"),
        }

        Ok(Self { path, version })
    }

    /// Resolved path to the executable.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Tool name for error classification and logs.
    pub fn name(&self) -> &'static str {
        "ffmpeg"
    }

    /// Detected version string, if `-version` produced one.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

/// Run `<path> -version` and return the first line of stdout.
fn detect_version(path: &Path) -> Option<String> {
    let output = std::process::Command::new(path)
        .arg("-version")
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|l| l.trim().to_string())
}
