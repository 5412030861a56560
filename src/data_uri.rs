//! `data:` URI parsing for screenshots carried inside analysis payloads.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataUriError {
    #[error("missing 'data:' prefix")]
    MissingPrefix,
    #[error("missing ',' separator")]
    MissingSeparator,
    #[error("only base64-encoded data URIs are supported")]
    NotBase64,
    #[error("empty media type")]
    EmptyMediaType,
}

/// A base64 `data:` URI split into its media type and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub media_type: String,
    pub data: String,
}

impl DataUri {
    pub fn new(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            data: data.into(),
        }
    }
}

impl FromStr for DataUri {
    type Err = DataUriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.trim().strip_prefix("data:").ok_or(DataUriError::MissingPrefix)?;
        let (header, data) = rest.split_once(',').ok_or(DataUriError::MissingSeparator)?;
        let media_type = header
            .strip_suffix(";base64")
            .ok_or(DataUriError::NotBase64)?;
        if media_type.is_empty() {
            return Err(DataUriError::EmptyMediaType);
        }
        Ok(DataUri::new(media_type, data))
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.media_type, self.data)
    }
}
