//! Structured `data:` URL handling.
//!
//! Only the base64 form is supported: `data:<mime>[;param...];base64,<data>`.

use std::fmt;
use std::str::FromStr;

use base64::{Engine, engine::general_purpose::STANDARD};
use thiserror::Error;

/// Why a string is not a usable base64 data URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataUrlError {
    /// Missing the `data:` scheme.
    #[error("missing data: scheme")]
    MissingScheme,

    /// No comma between header and payload.
    #[error("missing ',' between header and payload")]
    MissingSeparator,

    /// The header does not declare base64 encoding.
    #[error("payload is not declared as base64")]
    NotBase64,

    /// The header has no MIME type.
    #[error("missing MIME type")]
    MissingMimeType,

    /// The payload is not valid base64.
    #[error("invalid base64 payload: {0}")]
    InvalidPayload(String),
}

/// A decoded view of a base64 data URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    mime_type: String,
    data: String,
}

impl DataUrl {
    /// Encode raw bytes.
    #[must_use]
    pub fn encode(mime_type: &str, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            data: STANDARD.encode(bytes),
        }
    }

    /// Parse and validate a data URL.
    pub fn parse(input: &str) -> Result<Self, DataUrlError> {
        let rest = input
            .strip_prefix("data:")
            .ok_or(DataUrlError::MissingScheme)?;
        let (header, data) = rest.split_once(',').ok_or(DataUrlError::MissingSeparator)?;

        let mut params = header.split(';');
        let mime_type = params.next().unwrap_or_default().trim();
        if !params.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
            return Err(DataUrlError::NotBase64);
        }
        if mime_type.is_empty() {
            return Err(DataUrlError::MissingMimeType);
        }

        STANDARD
            .decode(data)
            .map_err(|e| DataUrlError::InvalidPayload(e.to_string()))?;

        Ok(Self {
            mime_type: mime_type.to_string(),
            data: data.to_string(),
        })
    }

    /// MIME type from the header.
    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// The base64 payload without the header.
    #[must_use]
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Consume and return the base64 payload.
    #[must_use]
    pub fn into_data(self) -> String {
        self.data
    }

    /// Decode the payload back into bytes.
    pub fn decode(&self) -> Result<Vec<u8>, DataUrlError> {
        STANDARD
            .decode(&self.data)
            .map_err(|e| DataUrlError::InvalidPayload(e.to_string()))
    }
}

impl fmt::Display for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime_type, self.data)
    }
}

impl FromStr for DataUrl {
    type Err = DataUrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
