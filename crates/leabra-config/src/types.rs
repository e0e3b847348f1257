// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `leabra_configuration.toml`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LeabraConfig {
    pub system: SystemConfig,
    pub schedule: ScheduleConfig,
    pub training: TrainingConfig,
    pub logging: LoggingConfig,
    /// Parameter sheet rules, applied in file order
    pub params: Vec<ParamRuleConfig>,
}

/// System-level configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Worker threads for the phase scheduler (0 = use each layer's own thread assignment)
    pub threads: usize,
    /// Root seed for weight init and noise streams
    pub seed: u64,
    pub log_level: String,
    /// A phase slower than this is logged at warn level
    pub slow_phase_warn_ms: u64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            seed: 1,
            log_level: "info".to_string(),
            slow_phase_warn_ms: 20,
        }
    }
}

/// Trial timing
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub cycles_per_quarter: usize,
    pub quarters: usize,
    /// WtBalFmWt runs every N weight updates
    pub wt_bal_interval: usize,
    /// Seconds of simulated time per cycle
    pub time_per_cycle: f32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cycles_per_quarter: 25,
            quarters: 4,
            wt_bal_interval: 10,
            time_per_cycle: 0.001,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    /// Per-unit error below this counts as zero in SSE
    pub sse_tolerance: f32,
    pub stop_on_zero_sse: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 50,
            sse_tolerance: 0.5,
            stop_on_zero_sse: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// "text" or "json"
    pub format: String,
    /// Base directory for run folders (file logging only)
    pub log_dir: Option<String>,
    pub file_logging: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            log_dir: None,
            file_logging: false,
        }
    }
}

/// One `[[params]]` rule: a selector plus dotted-path values
///
/// ```toml
/// [[params]]
/// selector = "#Hidden"
/// values = { "Layer.Inhib.Layer.Gi" = 1.5 }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ParamRuleConfig {
    pub selector: String,
    pub values: BTreeMap<String, f32>,
}
