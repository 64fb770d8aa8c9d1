//! src/logging.rs
//! ============================================================================
//! # Logging: tracing subscriber setup
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` (honouring
//! `RUST_LOG`) and a rolling file appender. The returned `WorkerGuard` must be
//! kept alive by the caller for the lifetime of the process, otherwise buffered
//! log lines are dropped on exit.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    pub log_dir: PathBuf,
    pub log_file_prefix: String,
    pub log_level: String,
    pub rotation: LogRotation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LogRotation {
    Never,
    Daily,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            log_file_prefix: "tfm.log".into(),
            log_level: "info".into(),
            rotation: LogRotation::Daily,
        }
    }
}

/// Initialize the global subscriber. Call once, early in `main`.
pub fn init(config: &LoggerConfig) -> Result<WorkerGuard, AppError> {
    let appender = match config.rotation {
        LogRotation::Daily => rolling::daily(&config.log_dir, &config.log_file_prefix),
        LogRotation::Never => rolling::never(&config.log_dir, &config.log_file_prefix),
    };

    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter: EnvFilter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()
        .map_err(|e| AppError::Other(format!("Logger init failed: {e}")))?;

    Ok(guard)
}
