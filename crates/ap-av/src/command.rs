//! Argument templates for transcoder invocations.
//!
//! A template is a whitespace-separated argument list containing `{source}`
//! and `{target}` placeholders.  Rendering splits first and substitutes per
//! argument, so arguments are passed to the process verbatim with no shell
//! interpretation anywhere.

use std::path::Path;

use ap_core::{Error, Result};

/// Placeholder for the staged input file.
const SOURCE_PLACEHOLDER: &str = "{source}";
/// Placeholder for the output file the tool must produce.
const TARGET_PLACEHOLDER: &str = "{target}";

/// A validated transcoder argument template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    template: String,
}

impl CommandTemplate {
    /// Create a template, verifying both placeholders are present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Input`] when `{source}` or `{target}` is missing; a
    /// template without them could never reference the staged files.
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        for placeholder in [SOURCE_PLACEHOLDER, TARGET_PLACEHOLDER] {
            if !template.contains(placeholder) {
                return Err(Error::input(format!(
                    "command template is missing the {placeholder} placeholder"
                )));
            }
        }
        Ok(Self { template })
    }

    /// The built-in AAC template: 96 kbit/s MP4 audio.
    ///
    /// See <https://trac.ffmpeg.org/wiki/Encode/AAC>.
    pub fn aac_96k() -> Self {
        Self {
            template: format!("-i {SOURCE_PLACEHOLDER} -c:a aac -b:a 96k {TARGET_PLACEHOLDER}"),
        }
    }

    /// Render the template into an argument vector for the given paths.
    pub fn render(&self, source: &Path, target: &Path) -> Vec<String> {
        let source = source.to_string_lossy();
        let target = target.to_string_lossy();

        self.template
            .split_whitespace()
            .map(|arg| {
                arg.replace(SOURCE_PLACEHOLDER, &source)
                    .replace(TARGET_PLACEHOLDER, &target)
            })
            .collect()
    }
}
