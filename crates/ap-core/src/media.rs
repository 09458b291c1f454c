//! Media-domain types: MIME media types and typed byte payloads.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Source formats the pipeline accepts, by MIME subtype.
///
/// Anything ffmpeg can decode would work in principle; this is the set the
/// service commits to.
const SUPPORTED_SOURCE_SUBTYPES: &[&str] = &[
    "mpeg", "mp3", "wav", "wma", "ogg", "3gp", "amr", "aif", "au", "mid",
];

/// A parsed MIME media type, e.g. `audio/wav`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MediaType {
    top: String,
    subtype: String,
}

impl MediaType {
    /// Parse a `top/subtype` pair, normalizing to lowercase.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Input`] if the string is not exactly two non-empty
    /// slash-separated tokens without whitespace.
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(top), Some(subtype), None)
                if !top.is_empty()
                    && !subtype.is_empty()
                    && !s.chars().any(char::is_whitespace) =>
            {
                Ok(Self {
                    top: top.to_ascii_lowercase(),
                    subtype: subtype.to_ascii_lowercase(),
                })
            }
            _ => Err(Error::input(format!("invalid media type: '{s}'"))),
        }
    }

    /// The output type of the pipeline: MP4 audio (AAC).
    pub fn mp4_audio() -> Self {
        Self {
            top: "audio".into(),
            subtype: "mp4".into(),
        }
    }

    /// The top-level type (e.g. `audio`).
    pub fn top(&self) -> &str {
        &self.top
    }

    /// The subtype (e.g. `wav`).
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// File extension used when staging a payload of this type.
    ///
    /// The subtype doubles as the extension; ffmpeg detects input formats
    /// from content, so the staged name only needs to be distinct.
    pub fn extension(&self) -> &str {
        &self.subtype
    }

    /// Whether this type is accepted as conversion input.
    pub fn is_supported_source(&self) -> bool {
        self.top == "audio" && SUPPORTED_SOURCE_SUBTYPES.contains(&self.subtype.as_str())
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.top, self.subtype)
    }
}

impl TryFrom<String> for MediaType {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<MediaType> for String {
    fn from(mt: MediaType) -> Self {
        mt.to_string()
    }
}

/// A byte payload with a declared media type.
///
/// This is the unit that crosses the pipeline boundary in both directions:
/// raw input from the caller, converted output back to it.  How the bytes
/// were transported (base64 data URI, multipart, ...) is the caller's
/// concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPayload {
    /// Declared media type of `data`.
    pub media_type: MediaType,
    /// The payload bytes.
    pub data: Vec<u8>,
}

impl AudioPayload {
    /// Create a payload from a type and its bytes.
    pub fn new(media_type: MediaType, data: Vec<u8>) -> Self {
        Self { media_type, data }
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
