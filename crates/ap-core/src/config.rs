//! Converter configuration.
//!
//! [`ConverterConfig`] is deserialized from JSON and read exactly once at
//! startup; nothing in it is reconfigurable at runtime.  Every field
//! defaults sensibly so an empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Default number of transcoder processes allowed to run in parallel.
pub const DEFAULT_MAX_CONCURRENT: usize = 10;

/// Default grace window between the termination request and a hard kill.
pub const DEFAULT_KILL_GRACE_SECS: u64 = 5;

/// Configuration for the conversion pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Explicit path to the ffmpeg executable.
    ///
    /// When set, the path must exist at startup (a fatal configuration
    /// error otherwise).  When unset, ffmpeg is resolved from `PATH`.
    pub ffmpeg_path: Option<PathBuf>,

    /// Maximum number of concurrently running transcoder processes.
    ///
    /// Fixed for the process lifetime.  Zero is rejected at construction.
    pub max_concurrent: usize,

    /// Seconds to wait after a graceful termination request before the
    /// child is killed outright.
    pub kill_grace_secs: u64,

    /// Parent directory for per-job scratch areas.
    ///
    /// Defaults to the system temp directory when unset.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            kill_grace_secs: DEFAULT_KILL_GRACE_SECS,
            scratch_dir: None,
        }
    }
}

impl ConverterConfig {
    /// Deserialize a config from a JSON string.
    ///
    /// String-based so the caller can read the file however it sees fit
    /// (async, embedded, etc.).
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::config(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    ///
    /// Fatal problems (missing tool, zero capacity) are reported by the
    /// converter constructor instead.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.max_concurrent == 0 {
            warnings.push("max_concurrent is 0; converter construction will fail".into());
        }

        if self.kill_grace_secs == 0 {
            warnings.push("kill_grace_secs is 0; cancelled processes are killed immediately".into());
        }

        if let Some(dir) = &self.scratch_dir {
            if !dir.is_dir() {
                warnings.push(format!("scratch_dir {} is not a directory", dir.display()));
            }
        }

        warnings
    }
}
