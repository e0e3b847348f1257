// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization
//!
//! Installs a `tracing` registry with a console layer (text or JSON). With the
//! `file-logging` feature and `LoggingConfig::file_logging` set, a JSON file
//! layer is added under a timestamped run folder:
//! ```text
//! ./logs/
//!   └── run_20250101_120000/
//!       └── leabra.log
//! ```

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;
use crate::config::{LogFormat, LoggingConfig};

const RUN_PREFIX: &str = "run_";
const RUN_TIMESTAMP: &str = "%Y%m%d_%H%M%S";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Keeps file writers alive; logs are flushed when this is dropped
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
    log_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// Run folder receiving log files, if file logging is active
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

/// Initialize the global subscriber
///
/// # Errors
/// Fails if the run folder cannot be created or a global subscriber is
/// already installed.
pub fn init_logging(debug_flags: &CrateDebugFlags, config: &LoggingConfig) -> Result<LoggingGuard> {
    let filter = debug_flags.to_filter_string();
    let env_filter = EnvFilter::try_new(&filter)
        .with_context(|| format!("Invalid log filter: {}", filter))?;

    let mut layers: Vec<BoxedLayer> = Vec::new();

    let console_layer = match config.format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .with_filter(env_filter.clone())
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_filter(env_filter.clone())
            .boxed(),
    };
    layers.push(console_layer);

    #[cfg(feature = "file-logging")]
    let (log_dir, file_guards) = if config.file_logging {
        let (file_layer, guard, run_folder) = file_layer(config, env_filter.clone())?;
        layers.push(file_layer);
        (Some(run_folder), vec![guard])
    } else {
        (None, Vec::new())
    };
    #[cfg(not(feature = "file-logging"))]
    let log_dir: Option<PathBuf> = None;

    Registry::default()
        .with(layers)
        .try_init()
        .context("Failed to install global tracing subscriber")?;

    if config.file_logging && cfg!(not(feature = "file-logging")) {
        tracing::warn!("File logging requested but this build lacks the file-logging feature");
    }
    if let Some(dir) = &log_dir {
        tracing::info!("Writing logs to {}", dir.display());
    }

    Ok(LoggingGuard {
        #[cfg(feature = "file-logging")]
        _file_guards: file_guards,
        log_dir,
    })
}

#[cfg(feature = "file-logging")]
fn file_layer(
    config: &LoggingConfig,
    env_filter: EnvFilter,
) -> Result<(BoxedLayer, tracing_appender::non_blocking::WorkerGuard, PathBuf)> {
    let base = config
        .log_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("./logs"));
    let run_folder = prepare_run_folder(&base, config.retention_days, config.retention_runs)?;

    let appender = tracing_appender::rolling::daily(&run_folder, "leabra.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .json()
        .with_filter(env_filter)
        .boxed();
    Ok((layer, guard, run_folder))
}

/// Initialize console-only text logging at the flags' levels
pub fn init_logging_default(debug_flags: &CrateDebugFlags) -> Result<LoggingGuard> {
    init_logging(debug_flags, &LoggingConfig::default())
}

/// Create a timestamped run folder under `base` and apply the retention policy
pub fn prepare_run_folder(base: &Path, retention_days: u64, retention_runs: usize) -> Result<PathBuf> {
    let timestamp = Utc::now().format(RUN_TIMESTAMP);
    let run_folder = base.join(format!("{}{}", RUN_PREFIX, timestamp));
    std::fs::create_dir_all(&run_folder)
        .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;

    cleanup_old_logs(base, retention_days, retention_runs.max(1))?;
    Ok(run_folder)
}

/// Remove run folders older than `retention_days`, then all but the newest `retention_runs`
///
/// Returns the number of folders removed.
pub fn cleanup_old_logs(base: &Path, retention_days: u64, retention_runs: usize) -> Result<usize> {
    if !base.exists() {
        return Ok(0);
    }

    let cutoff = Utc::now().naive_utc() - chrono::Duration::days(retention_days as i64);

    let mut runs: Vec<(PathBuf, NaiveDateTime)> = Vec::new();
    for entry in std::fs::read_dir(base)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let stamp = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix(RUN_PREFIX))
            .and_then(|ts| NaiveDateTime::parse_from_str(ts, RUN_TIMESTAMP).ok());
        if let Some(dt) = stamp {
            runs.push((path, dt));
        }
    }

    // Newest first
    runs.sort_by(|a, b| b.1.cmp(&a.1));

    let mut removed = 0;
    for (i, (path, dt)) in runs.iter().enumerate() {
        if i >= retention_runs || *dt < cutoff {
            match std::fs::remove_dir_all(path) {
                Ok(()) => removed += 1,
                Err(e) => eprintln!(
                    "Warning: Failed to remove old log directory {}: {}",
                    path.display(),
                    e
                ),
            }
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_run(base: &Path, stamp: &str) -> PathBuf {
        let p = base.join(format!("{}{}", RUN_PREFIX, stamp));
        std::fs::create_dir_all(&p).unwrap();
        p
    }

    #[test]
    fn test_cleanup_keeps_newest_runs() {
        let dir = tempdir().unwrap();
        let now = Utc::now().naive_utc();
        let stamps: Vec<String> = (0..4)
            .map(|h| (now - chrono::Duration::hours(h)).format(RUN_TIMESTAMP).to_string())
            .collect();
        let paths: Vec<PathBuf> = stamps.iter().map(|s| make_run(dir.path(), s)).collect();
        std::fs::create_dir_all(dir.path().join("not_a_run")).unwrap();

        let removed = cleanup_old_logs(dir.path(), 30, 2).unwrap();
        assert_eq!(removed, 2);
        assert!(paths[0].exists());
        assert!(paths[1].exists());
        assert!(!paths[2].exists());
        assert!(!paths[3].exists());
        assert!(dir.path().join("not_a_run").exists());
    }

    #[test]
    fn test_cleanup_removes_expired_runs() {
        let dir = tempdir().unwrap();
        let old = make_run(dir.path(), "20000101_000000");
        let fresh_stamp = Utc::now().format(RUN_TIMESTAMP).to_string();
        let fresh = make_run(dir.path(), &fresh_stamp);

        assert_eq!(cleanup_old_logs(dir.path(), 30, 10).unwrap(), 1);
        assert!(!old.exists());
        assert!(fresh.exists());
    }

    #[test]
    fn test_prepare_run_folder_creates_dir() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("logs");
        let run = prepare_run_folder(&base, 30, 10).unwrap();
        assert!(run.is_dir());
        assert!(run
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(RUN_PREFIX)));
    }

    #[test]
    fn test_missing_base_is_ok() {
        let dir = tempdir().unwrap();
        assert_eq!(cleanup_old_logs(&dir.path().join("absent"), 30, 10).unwrap(), 0);
    }
}
