use crate::error::{TwidError, TwidResult};
use serde::{Deserialize, Serialize};

pub const MIN_DIGEST_BYTES: usize = 8;
pub const MAX_DIGEST_BYTES: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HasherConfig {
    /// Leading characters of every id; keeps ids from starting with a digit
    pub prefix: String,

    /// Number of digest bytes kept before encoding
    pub digest_bytes: usize,

    /// Keys removed at every depth before hashing
    pub volatile_keys: Vec<String>,
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self {
            prefix: "tw".to_string(),
            digest_bytes: 16,
            volatile_keys: vec![
                "$id".to_string(),
                "labelFormatter".to_string(),
                "isAtomic".to_string(),
            ],
        }
    }
}

impl HasherConfig {
    pub fn validate(&self) -> TwidResult<()> {
        if self.prefix.is_empty() {
            return Err(TwidError::invalid_prefix(&self.prefix, "must not be empty"));
        }

        let first = self.prefix.chars().next().unwrap_or('_');
        if !(first.is_ascii_alphabetic() || first == '_') {
            return Err(TwidError::invalid_prefix(
                &self.prefix,
                "must start with a letter or underscore",
            ));
        }

        if !self
            .prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(TwidError::invalid_prefix(
                &self.prefix,
                "may only contain ASCII letters, digits and underscores",
            ));
        }

        if !(MIN_DIGEST_BYTES..=MAX_DIGEST_BYTES).contains(&self.digest_bytes) {
            return Err(TwidError::DigestLength {
                len: self.digest_bytes,
                min: MIN_DIGEST_BYTES,
                max: MAX_DIGEST_BYTES,
            });
        }

        Ok(())
    }

    /// Digest length clamped into the supported range
    pub fn effective_digest_bytes(&self) -> usize {
        self.digest_bytes.clamp(MIN_DIGEST_BYTES, MAX_DIGEST_BYTES)
    }
}
