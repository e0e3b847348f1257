// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Three tiers, later wins:
//! 1. TOML file (base values)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{ConfigError, ConfigResult, LeabraConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "leabra_configuration.toml";

/// Find the Leabra configuration file
///
/// Search order:
/// 1. `LEABRA_CONFIG_PATH` environment variable
/// 2. Current working directory: `./leabra_configuration.toml`
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("LEABRA_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by LEABRA_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.as_path();
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent;
                }
                None => break,
            }
        }
    }

    if let Some(found) = search_paths.iter().find(|p| p.exists()) {
        return Ok(found.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "Leabra configuration file '{}' not found in any of these locations:\n{}\n\nSet LEABRA_CONFIG_PATH environment variable to specify custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from a TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if the config file is not found, cannot be read, or contains invalid TOML.
/// Bounds are checked separately by [`crate::validate_config`].
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<LeabraConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: LeabraConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);

    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `LEABRA_THREADS` -> `system.threads`
/// - `LEABRA_SEED` -> `system.seed`
/// - `LEABRA_LOG_LEVEL` -> `system.log_level`
/// - `LEABRA_CYCLES_PER_QUARTER` -> `schedule.cycles_per_quarter`
/// - `LEABRA_WT_BAL_INTERVAL` -> `schedule.wt_bal_interval`
/// - `LEABRA_EPOCHS` -> `training.epochs`
///
/// Values that fail to parse are ignored.
pub fn apply_environment_overrides(config: &mut LeabraConfig) {
    let vars: HashMap<String, String> = [
        ("LEABRA_THREADS", "threads"),
        ("LEABRA_SEED", "seed"),
        ("LEABRA_LOG_LEVEL", "log_level"),
        ("LEABRA_CYCLES_PER_QUARTER", "cycles_per_quarter"),
        ("LEABRA_WT_BAL_INTERVAL", "wt_bal_interval"),
        ("LEABRA_EPOCHS", "epochs"),
    ]
    .iter()
    .filter_map(|(var, key)| env::var(var).ok().map(|v| (key.to_string(), v)))
    .collect();
    apply_overrides(config, &vars);
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - HashMap of CLI arguments (e.g., `{"threads": "4", "epochs": "100"}`)
pub fn apply_cli_overrides(config: &mut LeabraConfig, cli_args: &HashMap<String, String>) {
    apply_overrides(config, cli_args);
}

fn apply_overrides(config: &mut LeabraConfig, values: &HashMap<String, String>) {
    if let Some(threads) = values.get("threads").and_then(|v| v.parse::<usize>().ok()) {
        config.system.threads = threads;
    }
    if let Some(seed) = values.get("seed").and_then(|v| v.parse::<u64>().ok()) {
        config.system.seed = seed;
    }
    if let Some(value) = values.get("log_level") {
        config.system.log_level = value.clone();
    }
    if let Some(cycles) = values
        .get("cycles_per_quarter")
        .and_then(|v| v.parse::<usize>().ok())
    {
        config.schedule.cycles_per_quarter = cycles;
    }
    if let Some(interval) = values
        .get("wt_bal_interval")
        .and_then(|v| v.parse::<usize>().ok())
    {
        config.schedule.wt_bal_interval = interval;
    }
    if let Some(epochs) = values.get("epochs").and_then(|v| v.parse::<usize>().ok()) {
        config.training.epochs = epochs;
    }
}
