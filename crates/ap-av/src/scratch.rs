//! Per-job scratch directories.
//!
//! A [`ScratchArea`] is a uniquely named temporary directory holding one
//! staged source file and one target file path, never shared between jobs.
//! It is removed recursively when disposed; dropping an undisposed area
//! still removes it, so a panicking or early-returning job cannot leak
//! directories.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use ap_core::Result;

/// Prefix for scratch directory names, for identification in the temp dir.
const SCRATCH_PREFIX: &str = "audiopress-";

/// An isolated temporary workspace for one conversion job.
#[derive(Debug)]
pub struct ScratchArea {
    dir: TempDir,
    source: PathBuf,
    target: PathBuf,
}

impl ScratchArea {
    /// Allocate a fresh scratch directory.
    ///
    /// The source file is named `audio.<source_ext>` (the tool staged there
    /// is referenced by the rendered command); `target_file` names the file
    /// the tool must produce.  `parent` overrides the system temp directory.
    pub fn create(parent: Option<&Path>, source_ext: &str, target_file: &str) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);

        let dir = match parent {
            Some(p) => builder.tempdir_in(p)?,
            None => builder.tempdir()?,
        };

        let source = dir.path().join(format!("audio.{source_ext}"));
        let target = dir.path().join(target_file);

        Ok(Self {
            dir,
            source,
            target,
        })
    }

    /// Path of the scratch directory itself.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of the staged source file.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Path the tool must write its output to.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Write the payload bytes to the source file.
    pub async fn write_source(&self, data: &[u8]) -> Result<()> {
        tokio::fs::write(&self.source, data).await?;
        Ok(())
    }

    /// Read the produced target file fully into memory.
    ///
    /// A missing or unreadable target is reported as a plain I/O error; the
    /// pipeline classifies it against the tool's exit code.
    pub async fn read_target(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.target).await
    }

    /// Remove the scratch directory and everything in it.
    ///
    /// A removal failure (e.g. a file handle still open) is logged as a
    /// warning and never surfaces as an error: it must not mask the job's
    /// primary outcome.
    pub fn dispose(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            tracing::warn!(path = %path.display(), "failed to remove scratch area: {e}");
        }
    }
}
