//! Asynchronous supervision of a single external process.
//!
//! [`ProcessRunner::run`] spawns the program with both output streams piped,
//! appends lines to two independent ordered buffers as they arrive, and
//! resolves exactly once: with a [`ProcessOutput`] when the child exits, or
//! with [`Error::Cancelled`] when the cancellation token fires first.  The
//! race between the two completions is decided by a biased `select!`, so a
//! cancellation that lands together with the exit wins and the exit
//! notification is discarded.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use ap_core::{Error, Result};

/// Default grace window between the termination request and a hard kill.
const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(5);

/// Captured result of one process invocation.
///
/// Immutable once constructed; owned by the caller after the runner
/// resolves.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Exit code, or `None` if the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// OS process id, for diagnostics.
    pub pid: Option<u32>,
    /// Standard output, split into lines in arrival order.
    pub stdout: Vec<String>,
    /// Standard error, split into lines in arrival order.
    pub stderr: Vec<String>,
}

impl ProcessOutput {
    /// Whether the process exited normally with code 0.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// The last `max_lines` of stderr, joined for error messages.
    pub fn stderr_tail(&self, max_lines: usize) -> String {
        let skip = self.stderr.len().saturating_sub(max_lines);
        self.stderr[skip..].join("\n")
    }
}

/// Runs one external program per invocation, with output capture and
/// cooperative cancellation.
///
/// The program path is taken as already validated (see
/// [`crate::FfmpegTool`]); spawn refusals are still reported as
/// [`Error::ProcessStart`].
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: PathBuf,
    tool: String,
    kill_grace: Duration,
}

impl ProcessRunner {
    /// Create a runner for the given program.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let tool = program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| program.to_string_lossy().to_string());
        Self {
            program,
            tool,
            kill_grace: DEFAULT_KILL_GRACE,
        }
    }

    /// Set the grace window used on the cancellation path.
    pub fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }

    /// The program this runner invokes.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run the program with the given arguments.
    ///
    /// A non-zero exit is not an error at this layer: the caller receives
    /// the exit code and classifies it.
    ///
    /// # Errors
    ///
    /// - [`Error::ProcessStart`] if the OS refuses to spawn the program.
    /// - [`Error::Cancelled`] if `cancel` fires before the child exits (the
    ///   child receives a termination request, then a kill after the grace
    ///   window).  A token cancelled before the call never spawns at all.
    /// - [`Error::Io`] if waiting on the child fails.
    pub async fn run(&self, args: &[String], cancel: &CancellationToken) -> Result<ProcessOutput> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        tracing::debug!(program = %self.program.display(), ?args, "spawning");

        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::process_start(self.tool.as_str(), e))?;

        let pid = child.id();
        let stdout_task = collect_lines(child.stdout.take());
        let stderr_task = collect_lines(child.stderr.take());

        // Scope the wait future so its borrow of `child` ends before the
        // cancellation path needs the handle back.
        let outcome = {
            let wait = child.wait();
            tokio::pin!(wait);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                status = &mut wait => Some(status),
            }
        };

        let Some(status) = outcome else {
            self.shutdown(&mut child).await;
            // The pipes are closed now; drain the reader tasks so no
            // buffers are leaked, then discard them with the outcome.
            let _ = stdout_task.await;
            let _ = stderr_task.await;
            tracing::debug!(pid, "process cancelled");
            return Err(Error::Cancelled);
        };
        let status = status?;

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        tracing::debug!(pid, exit_code = ?status.code(), "process exited");

        Ok(ProcessOutput {
            exit_code: status.code(),
            pid,
            stdout,
            stderr,
        })
    }

    /// Terminate the child: graceful request first, hard kill after the
    /// grace window.
    async fn shutdown(&self, child: &mut Child) {
        #[cfg(unix)]
        if let Some(pid) = child.id() {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            tracing::debug!(pid, "requesting termination");
            let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);

            if tokio::time::timeout(self.kill_grace, child.wait())
                .await
                .is_ok()
            {
                return;
            }
            tracing::warn!(
                pid,
                grace = ?self.kill_grace,
                "termination request ignored; killing"
            );
        }

        let _ = child.kill().await;
    }
}

/// Collect lines from a child stream into an ordered buffer.
///
/// A partial trailing line (no final newline) is flushed into the buffer at
/// EOF.
fn collect_lines<R>(stream: Option<R>) -> JoinHandle<Vec<String>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buffer = Vec::new();
        let Some(stream) = stream else {
            return buffer;
        };
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            buffer.push(line);
        }
        buffer
    })
}
