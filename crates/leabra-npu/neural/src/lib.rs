// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Leabra Neural Computation (Platform-Agnostic)
//!
//! ALL per-unit and per-synapse computation in one place:
//! - **Types**: Neuron and synapse records, avg/max statistics, errors
//! - **Activation**: conductance integration, membrane potential, NoisyXX1 rate code
//! - **Inhibition**: feedforward/feedback (FFFB) pool inhibition, self inhibition
//! - **Learn**: running averages, XCAL check-mark function, weight contrast and balance
//!
//! Nothing in this crate knows about layers, projections or threads. The engine
//! crate owns those and calls into the parameter blocks defined here.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Core type definitions
pub mod types;

// Unit-level dynamics
pub mod activation;
pub mod inhib;

// Learning rules (neuron-side averages, synapse-side weight changes)
pub mod learn;

// Re-export types
pub use types::{
    AvgMax, MinMax, NeuralError, Neuron, NeuronFlags, ParamSet, RandDist, RandParams, Result,
    Synapse, NEURON_VARS, SYNAPSE_VARS,
};

// Re-export parameter blocks
pub use activation::{ActParams, ActivationFunction, NoiseType, XX1Params};
pub use inhib::{ActAvgParams, FFFBInhib, FFFBParams, InhibParams, SelfInhibParams};
pub use learn::{
    CosDiffStats, LearnNeurParams, LearnSynParams, WtBalParams, WtBalRecv, WtInitParams,
    WtSigParams, XCalParams,
};
