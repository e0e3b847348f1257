// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Neuron (unit) state record
//!
//! One record per unit, stored contiguously in its layer and addressed by
//! layer-local index. Every state variable is an `f32` so that variables can be
//! read and written by name for recording and weight/metadata exchange.

use super::error::{NeuralError, Result};

#[cfg(feature = "std")]
use serde::{Deserialize, Serialize};

/// Bit flags for binary neuron state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct NeuronFlags(u8);

impl NeuronFlags {
    /// Neuron is excluded from all computation
    pub const OFF: NeuronFlags = NeuronFlags(1 << 0);
    /// `Ext` holds a valid external input
    pub const HAS_EXT: NeuronFlags = NeuronFlags(1 << 1);
    /// `Targ` holds a valid target value
    pub const HAS_TARG: NeuronFlags = NeuronFlags(1 << 2);
    /// `Targ` holds a comparison value that does not drive learning
    pub const HAS_CMPR: NeuronFlags = NeuronFlags(1 << 3);

    /// Mask of all external-input flags
    pub const EXT_MASK: NeuronFlags = NeuronFlags((1 << 1) | (1 << 2) | (1 << 3));

    #[inline]
    pub fn contains(self, other: NeuronFlags) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub fn insert(&mut self, other: NeuronFlags) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn remove(&mut self, other: NeuronFlags) {
        self.0 &= !other.0;
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

/// Rate-code neuron state
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct Neuron {
    pub flags: NeuronFlags,

    /// Rate-coded activation, typically 0-1, sent to other neurons
    pub act: f32,
    /// Total excitatory conductance, not including Gbar.E
    pub ge: f32,
    /// Total inhibitory conductance, not including Gbar.I
    pub gi: f32,
    /// Net current from all channels, drives Vm
    pub inet: f32,
    /// Membrane potential
    pub vm: f32,

    pub targ: f32,
    pub ext: f32,

    /// Super-short average: lowest level of time integration
    pub avg_ss: f32,
    /// Short average, plus-phase proxy for XCAL
    pub avg_s: f32,
    /// Medium average, minus-phase proxy for XCAL
    pub avg_m: f32,
    /// Long average of AvgM: floating BCM threshold
    pub avg_l: f32,
    /// Hebbian learning rate factor derived from AvgL
    pub avg_l_lrn: f32,
    /// Short average actually used for learning (mostly AvgS with some AvgM)
    pub avg_s_lrn: f32,

    pub act_m: f32,
    pub act_p: f32,
    /// ActP - ActM
    pub act_dif: f32,
    /// Change in Act from the previous cycle
    pub act_del: f32,
    /// Long-run average of plus-phase activation
    pub act_avg: f32,

    pub noise: f32,
    /// Time-integrated self inhibition
    pub gi_self: f32,

    /// Last activation value sent to receivers
    pub act_sent: f32,
    /// Raw excitatory conductance accumulated from sent deltas
    pub ge_raw: f32,
    /// Excitatory delta received since the last integration
    pub ge_inc: f32,
    /// Raw inhibitory conductance accumulated from sent deltas
    pub gi_raw: f32,
    /// Inhibitory delta received since the last integration
    pub gi_inc: f32,
    /// Time-integrated synaptic inhibition from inhibitory projections
    pub gi_syn: f32,
}

/// Generates the name table and the by-name accessors from one list so the
/// two can never drift apart.
macro_rules! neuron_vars {
    ($($name:literal => $field:ident),* $(,)?) => {
        /// Names of the variables addressable through [`Neuron::var_by_name`]
        pub const NEURON_VARS: &[&str] = &[$($name),*];

        impl Neuron {
            /// Read a state variable by its canonical name (see [`NEURON_VARS`])
            pub fn var_by_name(&self, name: &str) -> Result<f32> {
                match name {
                    $($name => Ok(self.$field),)*
                    _ => Err(NeuralError::UnknownVariable(name.to_string())),
                }
            }

            /// Write a state variable by its canonical name
            pub fn set_var_by_name(&mut self, name: &str, value: f32) -> Result<()> {
                match name {
                    $($name => self.$field = value,)*
                    _ => return Err(NeuralError::UnknownVariable(name.to_string())),
                }
                Ok(())
            }
        }
    };
}

neuron_vars! {
    "Act" => act,
    "Ge" => ge,
    "Gi" => gi,
    "Inet" => inet,
    "Vm" => vm,
    "Targ" => targ,
    "Ext" => ext,
    "AvgSS" => avg_ss,
    "AvgS" => avg_s,
    "AvgM" => avg_m,
    "AvgL" => avg_l,
    "AvgLLrn" => avg_l_lrn,
    "AvgSLrn" => avg_s_lrn,
    "ActM" => act_m,
    "ActP" => act_p,
    "ActDif" => act_dif,
    "ActDel" => act_del,
    "ActAvg" => act_avg,
    "Noise" => noise,
    "GiSelf" => gi_self,
    "ActSent" => act_sent,
    "GeRaw" => ge_raw,
    "GeInc" => ge_inc,
    "GiRaw" => gi_raw,
    "GiInc" => gi_inc,
    "GiSyn" => gi_syn,
}

impl Neuron {
    #[inline]
    pub fn is_off(&self) -> bool {
        self.flags.contains(NeuronFlags::OFF)
    }

    #[inline]
    pub fn has_flag(&self, flag: NeuronFlags) -> bool {
        self.flags.contains(flag)
    }

    #[inline]
    pub fn set_flag(&mut self, flag: NeuronFlags) {
        self.flags.insert(flag);
    }

    #[inline]
    pub fn clear_flag(&mut self, flag: NeuronFlags) {
        self.flags.remove(flag);
    }
}
