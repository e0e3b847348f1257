// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Learning rules
//!
//! - **neuron**: cascaded running averages (SS → S → M), the long-term
//!   BCM threshold AvgL, and the minus/plus cosine difference statistic
//! - **synapse**: the XCAL check-mark function, sigmoidal weight contrast,
//!   DWt normalization, momentum, and weight balance

pub mod neuron;
pub mod synapse;

pub use neuron::{AvgLParams, CosDiffParams, CosDiffStats, LearnNeurParams, LrnActAvgParams};
pub use synapse::{
    DWtNormParams, LearnSynParams, MomentumParams, WtBalParams, WtBalRecv, WtInitParams,
    WtSigParams, XCalParams,
};
