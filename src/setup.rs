// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Glue from a loaded [`LeabraConfig`] to the engine and logging setup

use crate::config::LeabraConfig;
use crate::engine::{EngineResult, Network, ParamRule, ParamSheet, Time};
use crate::observability::{LogFormat, LoggingConfig};
use std::path::PathBuf;
use std::time::Duration;

/// The `[[params]]` rules as an engine parameter sheet, in file order
pub fn param_sheet(config: &LeabraConfig, name: &str) -> ParamSheet {
    let mut sheet = ParamSheet::new(name);
    for rule in &config.params {
        sheet.push(ParamRule {
            selector: rule.selector.clone(),
            values: rule.values.clone(),
        });
    }
    sheet
}

/// Apply system and schedule settings to a network; call before `build`
/// or after, the thread override rebuilds the scheduler when needed.
pub fn configure_network(net: &mut Network, config: &LeabraConfig) -> EngineResult<()> {
    net.set_seed(config.system.seed);
    net.set_slow_phase_warn(Duration::from_millis(config.system.slow_phase_warn_ms));
    net.wt_bal_interval = config.schedule.wt_bal_interval.max(1);
    net.set_threads(config.system.threads)
}

pub fn trial_time(config: &LeabraConfig) -> Time {
    Time::new(config.schedule.cycles_per_quarter, config.schedule.time_per_cycle)
}

/// Observability settings from the `[logging]` section
///
/// Unknown format names fall back to text; `validate_config` rejects them
/// before this is reached.
pub fn logging_config(config: &LeabraConfig) -> LoggingConfig {
    LoggingConfig {
        format: LogFormat::from_name(&config.logging.format).unwrap_or(LogFormat::Text),
        file_logging: config.logging.file_logging,
        log_dir: config.logging.log_dir.as_ref().map(PathBuf::from),
        ..LoggingConfig::default()
    }
}
