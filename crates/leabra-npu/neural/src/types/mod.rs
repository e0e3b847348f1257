// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Core type definitions shared by the numeric core and the engine

pub mod avgmax;
pub mod error;
pub mod neuron;
pub mod params;
pub mod rnd;
pub mod synapse;

pub use avgmax::{AvgMax, MinMax};
pub use error::{NeuralError, Result};
pub use neuron::{Neuron, NeuronFlags, NEURON_VARS};
pub use params::ParamSet;
pub use rnd::{RandDist, RandParams};
pub use synapse::{Synapse, SYNAPSE_VARS};
