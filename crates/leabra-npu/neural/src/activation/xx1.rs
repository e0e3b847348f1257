// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Noisy x/(x+1) rate-code function
//!
//! Directly computes a close approximation of x/(x+1) convolved with a
//! Gaussian noise kernel of variance `nvar`, without a lookup table:
//! a sigmoid below zero, a linear interpolation just above zero, and a
//! gain-corrected x/(x+1) above that.

use crate::types::params::{positive, split_path, unknown};
use crate::types::{ParamSet, Result};

#[cfg(feature = "std")]
use serde::{Deserialize, Serialize};

/// Maps drive above threshold to a rate-code activation.
///
/// Implementations must be monotone non-decreasing in `x`.
pub trait ActivationFunction: Send + Sync {
    fn activation(&self, x: f32) -> f32;
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct XX1Params {
    /// Firing threshold (Theta)
    pub thr: f32,
    /// Gain (gamma) of the activation function
    pub gain: f32,
    /// Variance of the Gaussian noise kernel
    pub nvar: f32,
    /// Below this activation the Vm - Thr drive is used instead of Ge - GeThr
    pub vm_act_thr: f32,
    pub sig_mult: f32,
    pub sig_mult_pow: f32,
    pub sig_gain: f32,
    pub interp_range: f32,
    /// Range in units of nvar over which gain correction applies
    pub gain_cor_range: f32,
    pub gain_cor: f32,

    // derived
    pub sig_gain_nvar: f32,
    pub sig_mult_eff: f32,
    pub sig_val_at_0: f32,
    pub interp_val: f32,
}

impl Default for XX1Params {
    fn default() -> Self {
        let mut p = Self {
            thr: 0.5,
            gain: 100.0,
            nvar: 0.005,
            vm_act_thr: 0.01,
            sig_mult: 0.33,
            sig_mult_pow: 0.8,
            sig_gain: 3.0,
            interp_range: 0.01,
            gain_cor_range: 10.0,
            gain_cor: 0.1,
            sig_gain_nvar: 0.0,
            sig_mult_eff: 0.0,
            sig_val_at_0: 0.0,
            interp_val: 0.0,
        };
        p.update();
        p
    }
}

impl XX1Params {
    #[inline]
    pub fn xx1(&self, x: f32) -> f32 {
        x / (x + 1.0)
    }

    /// x/(x+1) with gain correction within `gain_cor_range`
    #[inline]
    pub fn xx1_gain_cor(&self, x: f32) -> f32 {
        let gain_cor_fact = (self.gain_cor_range - (x / self.nvar)) / self.gain_cor_range;
        if gain_cor_fact < 0.0 {
            return self.xx1(self.gain * x);
        }
        let new_gain = self.gain * (1.0 - self.gain_cor * gain_cor_fact);
        self.xx1(new_gain * x)
    }

    #[inline]
    pub fn noisy_xx1(&self, x: f32) -> f32 {
        if x < 0.0 {
            self.sig_mult_eff / (1.0 + (-(x * self.sig_gain_nvar)).exp())
        } else if x < self.interp_range {
            let interp = 1.0 - ((self.interp_range - x) / self.interp_range);
            self.sig_val_at_0 + interp * self.interp_val
        } else {
            self.xx1_gain_cor(x)
        }
    }
}

impl ActivationFunction for XX1Params {
    #[inline]
    fn activation(&self, x: f32) -> f32 {
        self.noisy_xx1(x)
    }
}

impl ParamSet for XX1Params {
    fn set_param(&mut self, path: &str, value: f32) -> Result<()> {
        let (field, rest) = split_path(path);
        if !rest.is_empty() {
            return Err(unknown(field, rest));
        }
        match field {
            "Thr" => self.thr = value,
            "Gain" => self.gain = positive(path, value)?,
            "NVar" => self.nvar = positive(path, value)?,
            "VmActThr" => self.vm_act_thr = value,
            "SigMult" => self.sig_mult = value,
            "SigMultPow" => self.sig_mult_pow = value,
            "SigGain" => self.sig_gain = value,
            "InterpRange" => self.interp_range = positive(path, value)?,
            "GainCorRange" => self.gain_cor_range = positive(path, value)?,
            "GainCor" => self.gain_cor = value,
            _ => return Err(unknown(field, rest)),
        }
        Ok(())
    }

    fn update(&mut self) {
        self.sig_gain_nvar = self.sig_gain / self.nvar;
        self.sig_mult_eff = self.sig_mult * (self.gain * self.nvar).powf(self.sig_mult_pow);
        self.sig_val_at_0 = 0.5 * self.sig_mult_eff;
        self.interp_val = self.xx1_gain_cor(self.interp_range) - self.sig_val_at_0;
    }
}
