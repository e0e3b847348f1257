// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! CLI argument parsing for per-crate debug flags
//!
//! Supports flags like `--debug-leabra-npu-engine` to raise one crate to
//! debug level, and `--debug-all` for every known crate.

use std::collections::BTreeSet;
use std::env;

use crate::{crate_target, KNOWN_CRATES};

/// Per-crate debug switches
///
/// # Example
/// ```rust
/// use leabra_observability::CrateDebugFlags;
///
/// let flags = CrateDebugFlags::from_args(vec!["--debug-leabra-npu-engine".to_string()]);
/// assert!(flags.is_enabled("leabra-npu-engine"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrateDebugFlags {
    pub enabled_crates: BTreeSet<String>,
    /// Level for everything not raised to debug
    pub base_level: String,
}

impl CrateDebugFlags {
    /// Parse debug flags from command-line arguments
    ///
    /// Looks for arguments matching `--debug-{crate-name}`, plus `--debug-all`.
    /// Other arguments are ignored.
    pub fn from_args<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut flags = CrateDebugFlags::default();
        for arg in args {
            if arg == "--debug-all" {
                flags.enable_all();
            } else if let Some(crate_name) = arg.strip_prefix("--debug-") {
                flags.enable(crate_name);
            }
        }
        flags
    }

    /// Enable a comma-separated list, as given in `LEABRA_DEBUG`; `all` enables every crate
    pub fn enable_list(&mut self, list: &str) {
        for crate_name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if crate_name == "all" {
                self.enable_all();
            } else {
                self.enable(crate_name);
            }
        }
    }

    pub fn enable(&mut self, crate_name: &str) {
        self.enabled_crates.insert(crate_name.to_string());
    }

    pub fn enable_all(&mut self) {
        for crate_name in KNOWN_CRATES {
            self.enable(crate_name);
        }
    }

    /// Set the level used for crates without a debug flag
    pub fn with_base_level(mut self, level: &str) -> Self {
        self.base_level = level.to_string();
        self
    }

    /// Check if debug is enabled for a specific crate
    pub fn is_enabled(&self, crate_name: &str) -> bool {
        self.enabled_crates.contains(crate_name)
    }

    /// Check if debug is enabled for any crate
    pub fn any_enabled(&self) -> bool {
        !self.enabled_crates.is_empty()
    }

    /// Returns `tracing::Level::DEBUG` if enabled, `tracing::Level::INFO` otherwise.
    pub fn log_level(&self, crate_name: &str) -> tracing::Level {
        if self.is_enabled(crate_name) {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Create a filter string for `EnvFilter`
    ///
    /// Format: `leabra_npu_engine=debug,info`, or just the base level if none enabled.
    pub fn to_filter_string(&self) -> String {
        let base = if self.base_level.is_empty() {
            "info"
        } else {
            self.base_level.as_str()
        };
        let mut filters: Vec<String> = self
            .enabled_crates
            .iter()
            .map(|c| format!("{}=debug", crate_target(c)))
            .collect();
        filters.push(base.to_lowercase());
        filters.join(",")
    }
}

/// Parse debug flags from the process arguments and the environment
///
/// `LEABRA_DEBUG` takes comma-separated crate names, e.g.
/// `leabra-npu-engine,leabra-config`, or `all`.
pub fn parse_debug_flags() -> CrateDebugFlags {
    let mut flags = CrateDebugFlags::from_args(env::args());
    if let Ok(env_var) = env::var("LEABRA_DEBUG") {
        flags.enable_list(&env_var);
    }
    flags
}

/// Generate help text for debug flags
pub fn debug_flags_help() -> String {
    format!(
        r#"Debug Flags:
  --debug-all                    Enable debug logging for all crates
  --debug-{{crate-name}}          Enable debug logging for specific crate

Available crates:
  {}

Environment Variable:
  LEABRA_DEBUG={{crate-name}}[,{{crate-name}}]  Enable debug for crates (comma-separated)
  LEABRA_DEBUG=all                               Enable debug for all crates
"#,
        KNOWN_CRATES.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_crate_flag() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-leabra-npu-engine".to_string()]);
        assert!(flags.is_enabled("leabra-npu-engine"));
        assert!(!flags.is_enabled("leabra-config"));
    }

    #[test]
    fn test_other_args_ignored() {
        let flags = CrateDebugFlags::from_args(vec![
            "leabra-sim".to_string(),
            "--epochs".to_string(),
            "10".to_string(),
        ]);
        assert!(!flags.any_enabled());
    }

    #[test]
    fn test_debug_all() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-all".to_string()]);
        for crate_name in KNOWN_CRATES {
            assert!(flags.is_enabled(crate_name), "{} should be enabled", crate_name);
        }
    }

    #[test]
    fn test_enable_list() {
        let mut flags = CrateDebugFlags::default();
        flags.enable_list(" leabra-config, ,leabra-npu-neural");
        assert!(flags.is_enabled("leabra-config"));
        assert!(flags.is_enabled("leabra-npu-neural"));
        assert_eq!(flags.enabled_crates.len(), 2);
    }

    #[test]
    fn test_filter_string_uses_module_paths() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-leabra-npu-engine".to_string()]);
        assert_eq!(flags.to_filter_string(), "leabra_npu_engine=debug,info");

        let quiet = CrateDebugFlags::default().with_base_level("WARN");
        assert_eq!(quiet.to_filter_string(), "warn");
    }

    #[test]
    fn test_log_level() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-leabra-config".to_string()]);
        assert_eq!(flags.log_level("leabra-config"), tracing::Level::DEBUG);
        assert_eq!(flags.log_level("leabra-npu-engine"), tracing::Level::INFO);
    }
}
