//! The conversion pipeline: one job end-to-end.
//!
//! A job moves through staging (validate + write the source file into a
//! fresh scratch area), admission (gate acquire), running (transcoder
//! invocation), and collection (read the target file), with the gate permit
//! and the scratch area both released on every exit path.

use std::path::PathBuf;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use ap_av::{CommandTemplate, FfmpegTool, ProcessRunner, ScratchArea};
use ap_core::{AudioPayload, ConverterConfig, Error, MediaType, Result};

use crate::gate::ConcurrencyGate;

/// Name of the file the transcoder must produce inside the scratch area.
const TARGET_FILE: &str = "audio.m4a";

/// How many trailing stderr lines to carry into a failure message.
const STDERR_TAIL_LINES: usize = 8;

/// Orchestrates audio conversions through an external transcoder under a
/// process-wide concurrency cap.
///
/// Constructed once at startup and shared by reference (or cheaply cloned);
/// holds the only mutable state that crosses job boundaries — the gate's
/// permit counter.
#[derive(Debug, Clone)]
pub struct Converter {
    tool: FfmpegTool,
    runner: ProcessRunner,
    gate: ConcurrencyGate,
    scratch_dir: Option<PathBuf>,
}

impl Converter {
    /// Build a converter from configuration.
    ///
    /// Resolves and validates the transcoder executable exactly once; a
    /// missing tool or zero capacity is a fatal [`Error::Config`].
    pub fn new(config: &ConverterConfig) -> Result<Self> {
        let tool = FfmpegTool::resolve(config)?;
        let gate = ConcurrencyGate::new(config.max_concurrent)?;
        let runner = ProcessRunner::new(tool.path())
            .with_kill_grace(Duration::from_secs(config.kill_grace_secs));

        tracing::info!(capacity = gate.capacity(), "converter ready");

        Ok(Self {
            tool,
            runner,
            gate,
            scratch_dir: config.scratch_dir.clone(),
        })
    }

    /// The admission gate, for observability.
    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    /// The resolved transcoder.
    pub fn tool(&self) -> &FfmpegTool {
        &self.tool
    }

    /// Convert a payload with the built-in 96k AAC template.
    pub async fn convert_to_aac(
        &self,
        payload: AudioPayload,
        cancel: &CancellationToken,
    ) -> Result<AudioPayload> {
        self.convert(payload, &CommandTemplate::aac_96k(), cancel).await
    }

    /// Convert a payload by running the transcoder with the given template.
    ///
    /// Returns the produced `audio/mp4` payload, or exactly one classified
    /// error.  The scratch area created for the job is removed before this
    /// returns, whatever the outcome.
    ///
    /// # Errors
    ///
    /// - [`Error::Input`]: empty payload or unsupported media type (no
    ///   process is ever created).
    /// - [`Error::ProcessStart`]: the OS refused to start the transcoder.
    /// - [`Error::ProcessFailed`]: non-zero exit, or a zero exit that left
    ///   no readable target file.
    /// - [`Error::Cancelled`]: the token fired while waiting on the gate or
    ///   while the process was running.
    pub async fn convert(
        &self,
        payload: AudioPayload,
        template: &CommandTemplate,
        cancel: &CancellationToken,
    ) -> Result<AudioPayload> {
        let job_id = Uuid::new_v4();
        let span = tracing::info_span!("convert", job = %job_id, media_type = %payload.media_type);

        async move {
            // Staging: reject bad input before any scratch area or process
            // exists.
            if payload.is_empty() {
                return Err(Error::input("empty audio payload"));
            }
            if !payload.media_type.is_supported_source() {
                return Err(Error::input(format!(
                    "media type '{}' is not supported",
                    payload.media_type
                )));
            }

            let area = ScratchArea::create(
                self.scratch_dir.as_deref(),
                payload.media_type.extension(),
                TARGET_FILE,
            )?;

            let result = self.run_job(&area, &payload, template, cancel).await;

            // Unconditional cleanup; a removal failure is only a warning.
            area.dispose();

            match &result {
                Ok(out) => tracing::info!(bytes = out.len(), "conversion complete"),
                Err(e) if e.is_cancelled() => tracing::info!("conversion cancelled"),
                Err(e) => tracing::warn!("conversion failed: {e}"),
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Admitted → Running → Collecting, with the permit held for the
    /// Running and Collecting phases and released on drop.
    async fn run_job(
        &self,
        area: &ScratchArea,
        payload: &AudioPayload,
        template: &CommandTemplate,
        cancel: &CancellationToken,
    ) -> Result<AudioPayload> {
        area.write_source(&payload.data).await?;

        // May suspend indefinitely; deadlines are the caller's token.
        let _permit = self.gate.acquire(cancel).await?;

        let args = template.render(area.source(), area.target());
        let output = self.runner.run(&args, cancel).await?;

        if !output.success() {
            let message = if output.stderr.is_empty() {
                "transcoder exited with a non-zero status".to_string()
            } else {
                output.stderr_tail(STDERR_TAIL_LINES)
            };
            return Err(Error::process_failed(self.tool.name(), output.exit_code, message));
        }

        // Exit 0 with no readable target is a tool-contract violation, not
        // a success.
        let data = match area.read_target().await {
            Ok(data) => data,
            Err(e) => {
                return Err(Error::process_failed(
                    self.tool.name(),
                    output.exit_code,
                    format!("transcoder reported success but produced no readable output: {e}"),
                ));
            }
        };

        Ok(AudioPayload::new(MediaType::mp4_audio(), data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    /// Write a fake transcoder: a shell script dispatching on its first
    /// argument so each test picks a behavior through the template.
    fn fake_tool(dir: &Path) -> PathBuf {
        let path = dir.join("fake-ffmpeg");
        let script = concat!(
            "#!/bin/sh\n",
            "mode=\"$1\"; shift\n",
            "case \"$mode\" in\n",
            "  copy) cp \"$1\" \"$2\" ;;\n",
            "  fail) echo 'decode error' >&2; exit 1 ;;\n",
            "  silent) exit 0 ;;\n",
            "esac\n",
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    struct Fixture {
        converter: Converter,
        scratch_parent: PathBuf,
        _dir: tempfile::TempDir,
    }

    fn fixture(max_concurrent: usize) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let scratch_parent = dir.path().join("scratch");
        std::fs::create_dir(&scratch_parent).unwrap();
        let config = ConverterConfig {
            ffmpeg_path: Some(fake_tool(dir.path())),
            max_concurrent,
            kill_grace_secs: 2,
            scratch_dir: Some(scratch_parent.clone()),
        };
        Fixture {
            converter: Converter::new(&config).unwrap(),
            scratch_parent,
            _dir: dir,
        }
    }

    fn wav_payload(len: usize) -> AudioPayload {
        AudioPayload::new(MediaType::parse("audio/wav").unwrap(), vec![0x42; len])
    }

    fn scratch_is_empty(parent: &Path) -> bool {
        std::fs::read_dir(parent).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn successful_conversion() {
        let fx = fixture(2);
        let tpl = CommandTemplate::new("copy {source} {target}").unwrap();

        let out = fx
            .converter
            .convert(wav_payload(1024), &tpl, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(out.media_type, MediaType::mp4_audio());
        assert_eq!(out.len(), 1024);
        assert!(scratch_is_empty(&fx.scratch_parent));
        assert_eq!(fx.converter.gate().available(), 2);
    }

    #[tokio::test]
    async fn empty_payload_is_input_error() {
        let fx = fixture(1);
        let tpl = CommandTemplate::new("copy {source} {target}").unwrap();
        let payload = AudioPayload::new(MediaType::parse("audio/wav").unwrap(), vec![]);

        let err = fx
            .converter
            .convert(payload, &tpl, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_matches!(err, Error::Input(_));
    }

    #[tokio::test]
    async fn unsupported_type_is_input_error() {
        let fx = fixture(1);
        let tpl = CommandTemplate::new("copy {source} {target}").unwrap();
        let payload =
            AudioPayload::new(MediaType::parse("audio/unknown-format").unwrap(), vec![1, 2, 3]);

        let err = fx
            .converter
            .convert(payload, &tpl, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_matches!(err, Error::Input(_));
        assert!(scratch_is_empty(&fx.scratch_parent));
    }

    #[tokio::test]
    async fn nonzero_exit_is_process_failed() {
        let fx = fixture(1);
        let tpl = CommandTemplate::new("fail {source} {target}").unwrap();

        let err = fx
            .converter
            .convert(wav_payload(8), &tpl, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_matches!(
            err,
            Error::ProcessFailed { exit_code: Some(1), ref message, .. } if message.contains("decode error")
        );
        assert!(scratch_is_empty(&fx.scratch_parent));
        assert_eq!(fx.converter.gate().available(), 1);
    }

    #[tokio::test]
    async fn zero_exit_without_target_is_process_failed() {
        let fx = fixture(1);
        let tpl = CommandTemplate::new("silent {source} {target}").unwrap();

        let err = fx
            .converter
            .convert(wav_payload(8), &tpl, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_matches!(err, Error::ProcessFailed { exit_code: Some(0), .. });
        assert!(scratch_is_empty(&fx.scratch_parent));
    }

    #[tokio::test]
    async fn missing_tool_is_fatal_config_error() {
        let config = ConverterConfig {
            ffmpeg_path: Some(PathBuf::from("/nonexistent/ffmpeg")),
            ..Default::default()
        };
        assert_matches!(Converter::new(&config), Err(Error::Config(_)));
    }

    #[tokio::test]
    async fn zero_capacity_is_fatal_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConverterConfig {
            ffmpeg_path: Some(fake_tool(dir.path())),
            max_concurrent: 0,
            ..Default::default()
        };
        assert_matches!(Converter::new(&config), Err(Error::Config(_)));
    }
}
