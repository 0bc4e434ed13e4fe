//! IdentityHasher: content-addressed and unique ids over canonical JSON.
//!
//! Ids match `[A-Za-z_][A-Za-z0-9_-]*`: the configured prefix followed by
//! URL-safe base64 (no padding) of a truncated SHA-256 digest.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{trace, warn};

use crate::canonical::canonical_json;
use crate::config::HasherConfig;
use crate::generator::{AtomicIdGenerator, IdGenerator};

/// How an id relates to the content it was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdMode {
    /// Same content, same id. Used as a cache key.
    ContentAddressed,

    /// Every call yields a fresh id. Used to track repeated occurrences of
    /// one variable in a single view.
    Unique,
}

#[derive(Debug, Clone)]
pub struct IdentityHasher {
    config: HasherConfig,
    generator: Arc<dyn IdGenerator>,
}

impl Default for IdentityHasher {
    fn default() -> Self {
        Self::new(HasherConfig::default())
    }
}

impl IdentityHasher {
    pub fn new(config: HasherConfig) -> Self {
        Self::with_generator(config, Arc::new(AtomicIdGenerator::new()))
    }

    pub fn with_generator(config: HasherConfig, generator: Arc<dyn IdGenerator>) -> Self {
        Self { config, generator }
    }

    pub fn config(&self) -> &HasherConfig {
        &self.config
    }

    /// Same content always maps to the same id.
    pub fn content_id<T: Serialize + ?Sized>(&self, content: &T) -> String {
        self.id_for(content, IdMode::ContentAddressed)
    }

    /// Fresh id on every call, even for equal content.
    pub fn unique_id<T: Serialize + ?Sized>(&self, content: &T) -> String {
        self.id_for(content, IdMode::Unique)
    }

    /// Compute an id for `content`. Never fails.
    pub fn id_for<T: Serialize + ?Sized>(&self, content: &T, mode: IdMode) -> String {
        let mut text = match canonical_json(content, &self.config.volatile_keys) {
            Ok(text) => text,
            Err(e) => {
                let fallback = self.fallback_id();
                warn!(
                    marker = "ID_FALLBACK",
                    error = %e,
                    id = %fallback,
                    "Canonical serialization failed, using counter id"
                );
                return fallback;
            }
        };

        if mode == IdMode::Unique {
            text.push('#');
            text.push_str(&self.generator.next_id().to_string());
        }

        let digest = Sha256::digest(text.as_bytes());
        let kept = &digest[..self.config.effective_digest_bytes()];

        let id = format!("{}{}", self.config.prefix, URL_SAFE_NO_PAD.encode(kept));
        trace!(id = %id, ?mode, "Computed term wrapper id");
        id
    }

    fn fallback_id(&self) -> String {
        format!("{}{}", self.config.prefix, self.generator.next_id())
    }
}
