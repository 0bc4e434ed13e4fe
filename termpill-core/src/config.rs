//! src/config.rs
//! ============================================================================
//! # Config: Configuration Loader and Saver
//!
//! Loads and saves settings as TOML from the platform config path using the
//! [`directories`](https://docs.rs/directories) crate, or from an explicit
//! path.
//!
//! ## Example
//! ```rust,ignore
//! let config = Config::load().await?;
//! let defaults = config.default_q_table()?;
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tokio::fs as TokioFs;
use tracing::info;
use twid::HasherConfig;

use crate::error::{PillError, PillResult};
use crate::handlers::{DefaultQ, HandlerKind, NameOptions};
use crate::model::q::Q;

/// Term vocabulary cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabCacheConfig {
    /// Maximum number of cached terms
    pub max_capacity: u64,

    /// Time-to-live for entries
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,

    /// Time-to-idle (evict if not accessed)
    #[serde(with = "humantime_serde")]
    pub tti: Duration,
}

impl Default for VocabCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 4_096,
            ttl: Duration::from_secs(1800), // 30 minutes
            tti: Duration::from_secs(600),  // 10 minutes
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Never,
    #[default]
    Daily,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_dir: PathBuf,
    pub log_file_prefix: String,
    /// `EnvFilter` directive; `RUST_LOG` wins when set
    pub log_level: String,
    pub rotation: LogRotation,
    pub max_log_files: usize,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("./logs"),
            log_file_prefix: "termpill".to_string(),
            log_level: "info".to_string(),
            rotation: LogRotation::Daily,
            max_log_files: 10,
            json: true,
        }
    }
}

/// How the term picker is presented on placeholder click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PickerMode {
    #[default]
    Tree,
    Prompt,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptOption {
    pub label: String,
    pub term_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PickerConfig {
    pub mode: PickerMode,
    pub prompt_options: Vec<PromptOption>,
}

/// Main configuration struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub naming: NameOptions,

    pub hasher: HasherConfig,

    pub vocab_cache: VocabCacheConfig,

    pub logging: LoggingConfig,

    pub picker: PickerConfig,

    /// Default q per handler kind, keyed by kind name ("numeric", ...)
    pub default_q: BTreeMap<String, Q>,
}

impl Config {
    /// Loads config from the platform config dir, writing defaults if absent.
    ///
    /// The config is expected at `$XDG_CONFIG_HOME/termpill/config.toml`
    /// (Linux), or equivalent on Windows/macOS.
    pub async fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            Ok(Self::load_from(&path).await?)
        } else {
            info!(
                "No config file found at {}, using default configuration. Creating it now.",
                path.display()
            );

            let default_config = Self::default();
            default_config.save_to(&path).await?;

            Ok(default_config)
        }
    }

    pub async fn load_from<P: AsRef<Path>>(path: P) -> PillResult<Self> {
        let path = path.as_ref();
        info!("Loading config from {}", path.display());

        let text = TokioFs::read_to_string(path)
            .await
            .map_err(|e| PillError::Config(format!("{}: {e}", path.display()).into()))?;
        let cfg: Self = toml::from_str(&text)?;
        cfg.validate()?;

        Ok(cfg)
    }

    pub async fn save_to<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        info!("Saving config to {}", path.display());

        if let Some(parent) = path.parent() {
            TokioFs::create_dir_all(parent).await?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        TokioFs::write(path, toml_str).await?;

        Ok(())
    }

    pub fn validate(&self) -> PillResult<()> {
        self.hasher.validate()?;
        self.default_q_table()?;
        Ok(())
    }

    /// Default q table keyed by handler kind.
    pub fn default_q_table(&self) -> PillResult<DefaultQ> {
        let mut table = DefaultQ::default();
        for (name, q) in &self.default_q {
            let kind = HandlerKind::from_str(name).map_err(|_| {
                PillError::Config(format!("default_q: unknown handler kind '{name}'").into())
            })?;
            table[kind] = Some(q.clone());
        }
        Ok(table)
    }

    /// Returns the canonical config file path using `directories::ProjectDirs`.
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "termpill", "termpill")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory."))?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }
}
