//! Error types for hasher configuration

use compact_str::CompactString;
use thiserror::Error;

pub type TwidResult<T> = Result<T, TwidError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TwidError {
    #[error("Invalid id prefix '{prefix}': {reason}")]
    InvalidPrefix {
        prefix: CompactString,
        reason: CompactString,
    },

    #[error("Digest length {len} out of range ({min}..={max} bytes)")]
    DigestLength { len: usize, min: usize, max: usize },

    #[error("Canonical serialization failed: {0}")]
    Serialization(CompactString),
}

impl TwidError {
    #[inline]
    pub fn invalid_prefix(prefix: &str, reason: impl Into<CompactString>) -> Self {
        Self::InvalidPrefix {
            prefix: CompactString::from(prefix),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for TwidError {
    fn from(err: serde_json::Error) -> Self {
        TwidError::Serialization(CompactString::from(err.to_string()))
    }
}
