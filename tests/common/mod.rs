//! Shared helpers for integration tests.

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::Duration;

use audiopress::{AudioPayload, CommandTemplate, Converter, ConverterConfig, MediaType};

/// A converter wired to a fake transcoder script, plus the directories the
/// tests observe.
pub struct Harness {
    pub converter: Converter,
    control: PathBuf,
    scratch_parent: PathBuf,
    _dir: tempfile::TempDir,
}

/// Build a harness around a fake transcoder whose behavior is selected by
/// the first rendered argument:
///
/// - `-i <src> ... <dst>`: ffmpeg-style invocation; copies src to dst.
/// - `copy <src> <dst>`: convert by copying.
/// - `block <src> <dst>`: drop a `started.<pid>` marker, wait for the
///   control `go` file, then copy.
/// - `mark <src> <dst>`: drop a `mark` file, then copy.
/// - `fail <src> <dst>`: exit 1 with stderr output.
/// - `silent <src> <dst>`: exit 0 without producing the target.
pub fn harness(max_concurrent: usize) -> Harness {
    // Honor RUST_LOG when debugging a test run.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let dir = tempfile::tempdir().unwrap();
    let control = dir.path().join("control");
    let scratch_parent = dir.path().join("scratch");
    std::fs::create_dir(&control).unwrap();
    std::fs::create_dir(&scratch_parent).unwrap();

    let tool = dir.path().join("fake-ffmpeg");
    let script = format!(
        r#"#!/bin/sh
mode="$1"; shift
case "$mode" in
  -i)
    in="$1"
    for a in "$@"; do last="$a"; done
    cp "$in" "$last"
    ;;
  copy) cp "$1" "$2" ;;
  block)
    : > "{ctl}/started.$$"
    while [ ! -f "{ctl}/go" ]; do sleep 0.05; done
    cp "$1" "$2"
    ;;
  mark) : > "{ctl}/mark"; cp "$1" "$2" ;;
  fail) echo 'boom' >&2; exit 1 ;;
  silent) exit 0 ;;
esac
"#,
        ctl = control.display()
    );
    std::fs::write(&tool, script).unwrap();
    std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

    let config = ConverterConfig {
        ffmpeg_path: Some(tool),
        max_concurrent,
        kill_grace_secs: 2,
        scratch_dir: Some(scratch_parent.clone()),
    };

    Harness {
        converter: Converter::new(&config).unwrap(),
        control,
        scratch_parent,
        _dir: dir,
    }
}

impl Harness {
    /// Number of `block` invocations that have entered their Running phase.
    pub fn started_count(&self) -> usize {
        std::fs::read_dir(&self.control)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("started."))
            .count()
    }

    /// Whether a `mark` invocation ever ran.
    pub fn marked(&self) -> bool {
        self.control.join("mark").exists()
    }

    /// Unblock all `block` invocations.
    pub fn release_blocked(&self) {
        std::fs::write(self.control.join("go"), b"").unwrap();
    }

    /// Whether every scratch area has been removed.
    pub fn scratch_is_empty(&self) -> bool {
        std::fs::read_dir(&self.scratch_parent)
            .unwrap()
            .next()
            .is_none()
    }
}

/// A WAV payload of the given size.
pub fn wav(len: usize) -> AudioPayload {
    AudioPayload::new(MediaType::parse("audio/wav").unwrap(), vec![0x42; len])
}

/// Build a template, panicking on invalid test input.
pub fn template(s: &str) -> CommandTemplate {
    CommandTemplate::new(s).unwrap()
}

/// Poll `cond` until it holds or five seconds elapse.
pub async fn wait_until(cond: impl Fn() -> bool) {
    for _ in 0..100 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("condition not reached within 5s");
}
