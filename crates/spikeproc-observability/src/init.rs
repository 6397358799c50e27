// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization for the spike-processing tools
//!
//! Console output always; a timestamped log file as well when the `file-logging` feature
//! is enabled and `logging.log_file` is set.

use std::path::PathBuf;

use anyhow::{Context, Result};
use spikeproc_config::LoggingConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;

/// Keeps file writers alive; logs are flushed when it is dropped
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
    log_file: Option<PathBuf>,
}

impl LoggingGuard {
    /// Path of the log file, if one is being written
    pub fn log_file(&self) -> Option<&std::path::Path> {
        self.log_file.as_deref()
    }
}

/// Build the filter for the configured level plus per-crate debug flags
pub fn build_filter(debug_flags: &CrateDebugFlags, config: &LoggingConfig) -> Result<EnvFilter> {
    let directives = debug_flags.to_filter_string(&config.global_log_level);
    EnvFilter::try_new(&directives)
        .with_context(|| format!("Invalid log filter: {}", directives))
}

/// Install the global subscriber
///
/// # Errors
///
/// Fails if the filter is invalid, the log file cannot be created, or a subscriber is
/// already installed.
pub fn init_logging(debug_flags: &CrateDebugFlags, config: &LoggingConfig) -> Result<LoggingGuard> {
    let env_filter = build_filter(debug_flags, config)?;

    let mut layers = Vec::new();
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_filter(env_filter)
        .boxed();
    layers.push(console_layer);

    #[cfg(feature = "file-logging")]
    let (file_guard, log_file) = if config.log_file.is_empty() {
        (None, None)
    } else {
        let path = timestamped_path(&config.log_file);
        let directory = path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        std::fs::create_dir_all(&directory)
            .with_context(|| format!("Failed to create log directory: {}", directory.display()))?;
        let file_name = path
            .file_name()
            .context("Log file path has no file name")?
            .to_owned();

        let appender = tracing_appender::rolling::never(&directory, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_filter(build_filter(debug_flags, config)?)
            .boxed();
        layers.push(file_layer);
        (Some(guard), Some(path))
    };

    #[cfg(not(feature = "file-logging"))]
    let log_file: Option<PathBuf> = None;

    Registry::default()
        .with(layers)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    #[cfg(not(feature = "file-logging"))]
    if !config.log_file.is_empty() {
        tracing::warn!(
            log_file = %config.log_file,
            "File logging requested but the file-logging feature is disabled"
        );
    }

    Ok(LoggingGuard {
        #[cfg(feature = "file-logging")]
        _file_guard: file_guard,
        log_file,
    })
}

/// `logs/replay.log` becomes `logs/replay_20250101_120000.log`
#[cfg(feature = "file-logging")]
fn timestamped_path(log_file: &str) -> PathBuf {
    let path = PathBuf::from(log_file);
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("spikeproc");
    let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("log");
    path.with_file_name(format!("{}_{}.{}", stem, timestamp, extension))
}
