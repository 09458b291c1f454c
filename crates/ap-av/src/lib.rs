//! # ap-av
//!
//! External-tool plumbing for the audiopress pipeline.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`FfmpegTool`]) -- locate and validate the ffmpeg
//!   executable once at startup.
//! - **Command templates** ([`CommandTemplate`]) -- render caller-supplied
//!   argument templates against staged file paths, without any shell.
//! - **Process supervision** ([`ProcessRunner`]) -- spawn one process,
//!   capture its output streams line by line, and resolve exactly once on
//!   exit or cancellation.
//! - **Scratch areas** ([`ScratchArea`]) -- per-job temporary directories
//!   that are always removed, whatever the job's outcome.

pub mod command;
pub mod runner;
pub mod scratch;
pub mod tools;

// ---- Re-exports for convenience ----

pub use command::CommandTemplate;
pub use runner::{ProcessOutput, ProcessRunner};
pub use scratch::ScratchArea;
pub use tools::FfmpegTool;
