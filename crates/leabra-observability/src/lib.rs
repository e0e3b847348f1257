// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # leabra-observability
//!
//! Logging setup shared by the Leabra binaries, with per-crate debug flag
//! support.
//!
//! ## Features
//! - `file-logging`: rolling JSON log files under a timestamped run folder

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Known Leabra crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "leabra",
    "leabra-config",
    "leabra-npu-neural",
    "leabra-npu-engine",
    "leabra-observability",
];

/// Module-path form of a crate name, as `tracing` targets and `EnvFilter` directives see it
pub fn crate_target(crate_name: &str) -> String {
    crate_name.replace('-', "_")
}
