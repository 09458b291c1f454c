//! # audiopress
//!
//! Bounded-concurrency orchestration of external audio transcoding
//! processes.
//!
//! A [`Converter`] is constructed once at startup from a
//! [`ConverterConfig`] (validating the ffmpeg executable up front) and then
//! shared with callers.  Each call to [`Converter::convert`] runs one job:
//! the payload is staged into a private scratch directory, the job waits
//! for a permit from the process-wide [`ConcurrencyGate`], the transcoder
//! runs with its output streams captured, and the produced file is returned
//! as an `audio/mp4` payload.  The permit and the scratch directory are
//! released on every exit path, including cancellation.
//!
//! ```no_run
//! use audiopress::{AudioPayload, Converter, ConverterConfig, MediaType};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(wav_bytes: Vec<u8>) -> audiopress::Result<()> {
//! let converter = Converter::new(&ConverterConfig::default())?;
//! let payload = AudioPayload::new(MediaType::parse("audio/wav")?, wav_bytes);
//! let aac = converter.convert_to_aac(payload, &CancellationToken::new()).await?;
//! assert_eq!(aac.media_type, MediaType::mp4_audio());
//! # Ok(())
//! # }
//! ```

pub mod converter;
pub mod gate;

pub use converter::Converter;
pub use gate::{ConcurrencyGate, GatePermit};

// Re-export the building blocks so callers need only this crate.
pub use ap_av::{CommandTemplate, FfmpegTool, ProcessOutput, ProcessRunner, ScratchArea};
pub use ap_core::{AudioPayload, ConverterConfig, Error, MediaType, Result};
