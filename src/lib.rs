// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Leabra - rate-coded neural simulation
//!
//! Umbrella crate over the Leabra workspace:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  leabra-npu-neural                                      │
//! │  (Neuron, Synapse, activation / inhibition / learning)  │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  leabra-npu-engine                                      │
//! │  (Layers, projections, phase-barrier network)           │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  leabra-config, leabra-observability                    │
//! │  (TOML config + overrides, logging setup)               │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use leabra::prelude::*;
//!
//! let mut net = Network::new("PatAssoc");
//! net.add_layer("Input", &[4], LayerType::Input)?;
//! net.add_layer("Output", &[4], LayerType::Target)?;
//! net.connect_layer_names("Input", "Output", "Full", "Forward")?;
//! net.build()?;
//! net.init_wts();
//!
//! let input: &[f32] = &[1.0, 0.0, 0.0, 0.0];
//! let target: &[f32] = &[0.0, 1.0, 0.0, 0.0];
//! let mut time = Time::new(25, 0.001);
//! net.run_trial(&mut time, &[("Input", input), ("Output", target)], true)?;
//! # Ok::<(), leabra::engine::EngineError>(())
//! ```

pub use leabra_config as config;
pub use leabra_npu_engine as engine;
pub use leabra_npu_neural as neural;
pub use leabra_observability as observability;

pub mod setup;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::engine::{
        EngineError, EngineResult, LayerType, Network, NetWeights, ParamRule, ParamSheet, PrjnType,
        Time,
    };
    pub use crate::neural::{ActivationFunction, Neuron, Synapse, XX1Params};
    pub use crate::config::{load_config, validate_config, LeabraConfig};
}
