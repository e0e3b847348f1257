// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Unit-level activation dynamics
//!
//! Conductance integration, membrane potential and the rate-code output
//! function. See [`ActParams`] for the per-cycle update sequence.

pub mod act;
pub mod xx1;

pub use act::{ActInitParams, ActNoiseParams, ActParams, Chans, ClampParams, DtParams, NoiseType, OptThreshParams};
pub use xx1::{ActivationFunction, XX1Params};
