//! Tracing setup: `EnvFilter` + fmt layer over a non-blocking rolling file.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogRotation, LoggingConfig};

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Logger already initialized")]
    AlreadyInitialized,

    #[error("Invalid log directory: {0}")]
    InvalidLogDirectory(String),

    #[error("Failed to create log directory: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

fn validate_config(config: &LoggingConfig) -> Result<(), LoggingError> {
    if config.log_file_prefix.is_empty() {
        return Err(LoggingError::ConfigError(
            "log_file_prefix must not be empty".into(),
        ));
    }
    if config.max_log_files == 0 {
        return Err(LoggingError::ConfigError(
            "max_log_files must be at least 1".into(),
        ));
    }
    Ok(())
}

fn setup_log_directory(dir: &Path) -> Result<(), LoggingError> {
    if dir.exists() && !dir.is_dir() {
        return Err(LoggingError::InvalidLogDirectory(
            dir.display().to_string(),
        ));
    }
    std::fs::create_dir_all(dir)?;
    Ok(())
}

/// Filter from `RUST_LOG`, falling back to the configured level.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| LoggingError::ConfigError(e.to_string()))
}

/// Install the global subscriber. Keep the guard alive until shutdown so
/// buffered lines are flushed.
pub fn init(config: &LoggingConfig) -> Result<WorkerGuard> {
    validate_config(config)?;
    setup_log_directory(&config.log_dir)?;

    let rotation = match config.rotation {
        LogRotation::Never => Rotation::NEVER,
        LogRotation::Daily => Rotation::DAILY,
    };

    let file_appender = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(config.log_file_prefix.as_str())
        .filename_suffix(if config.json { "jsonl" } else { "log" })
        .max_log_files(config.max_log_files)
        .build(&config.log_dir)
        .context("Failed to create file appender")?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let filter = build_filter(config)?;

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if config.json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true)
                    .with_writer(non_blocking),
            )
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .try_init()
    };
    installed.map_err(|_| LoggingError::AlreadyInitialized)?;

    info!(
        log_dir = %config.log_dir.display(),
        level = %config.log_level,
        "Logging initialized"
    );
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_rejects_empty_prefix() {
        let cfg = LoggingConfig {
            log_file_prefix: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            validate_config(&cfg),
            Err(LoggingError::ConfigError(_))
        ));
    }

    #[test]
    fn test_log_dir_must_be_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("not_a_dir");
        std::fs::write(&file, b"x").unwrap();

        assert!(matches!(
            setup_log_directory(&file),
            Err(LoggingError::InvalidLogDirectory(_))
        ));
        assert!(setup_log_directory(&dir.path().join("logs")).is_ok());
    }

    #[test]
    fn test_filter_from_config_level() {
        let cfg = LoggingConfig {
            log_level: "termpill_core=debug,warn".into(),
            ..Default::default()
        };
        assert!(build_filter(&cfg).is_ok());
    }
}
