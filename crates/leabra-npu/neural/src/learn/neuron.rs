// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Neuron-level learning averages

use crate::types::params::{as_bool, positive, scoped, split_path, unknown};
use crate::types::{Neuron, ParamSet, Result};

#[cfg(feature = "std")]
use serde::{Deserialize, Serialize};

/// Rate constants for the cascaded short / medium activation averages
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct LrnActAvgParams {
    /// Super-short time constant (cycles), pre-integration for AvgS
    pub ss_tau: f32,
    /// Short time constant: AvgS is the plus-phase learning signal
    pub s_tau: f32,
    /// Medium time constant: AvgM is the minus-phase expectation
    pub m_tau: f32,
    /// Proportion of AvgM mixed into AvgSLrn
    pub lrn_m: f32,
    pub init: f32,

    pub ss_dt: f32,
    pub s_dt: f32,
    pub m_dt: f32,
    pub lrn_s: f32,
}

impl Default for LrnActAvgParams {
    fn default() -> Self {
        let mut p = Self {
            ss_tau: 2.0,
            s_tau: 2.0,
            m_tau: 10.0,
            lrn_m: 0.1,
            init: 0.15,
            ss_dt: 0.0,
            s_dt: 0.0,
            m_dt: 0.0,
            lrn_s: 0.0,
        };
        p.update();
        p
    }
}

impl LrnActAvgParams {
    pub fn avgs_fm_act(&self, nrn: &mut Neuron) {
        nrn.avg_ss += self.ss_dt * (nrn.act - nrn.avg_ss);
        nrn.avg_s += self.s_dt * (nrn.avg_ss - nrn.avg_s);
        nrn.avg_m += self.m_dt * (nrn.avg_s - nrn.avg_m);
        nrn.avg_s_lrn = self.lrn_s * nrn.avg_s + self.lrn_m * nrn.avg_m;
    }
}

impl ParamSet for LrnActAvgParams {
    fn set_param(&mut self, path: &str, value: f32) -> Result<()> {
        match path {
            "SSTau" => self.ss_tau = positive(path, value)?,
            "STau" => self.s_tau = positive(path, value)?,
            "MTau" => self.m_tau = positive(path, value)?,
            "LrnM" => self.lrn_m = value,
            "Init" => self.init = value,
            _ => return Err(unknown(path, "")),
        }
        Ok(())
    }

    fn update(&mut self) {
        self.ss_dt = 1.0 / self.ss_tau;
        self.s_dt = 1.0 / self.s_tau;
        self.m_dt = 1.0 / self.m_tau;
        self.lrn_s = 1.0 - self.lrn_m;
    }
}

/// Long-term running average AvgL, the floating BCM threshold
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct AvgLParams {
    pub init: f32,
    /// Gain on AvgM when integrating AvgL
    pub gain: f32,
    /// Floor for AvgL
    pub min: f32,
    /// Time constant in trials
    pub tau: f32,
    /// AvgLLrn when AvgL is at its maximum (gain)
    pub lrn_max: f32,
    /// AvgLLrn when AvgL is at its minimum
    pub lrn_min: f32,
    /// Modulate AvgLLrn by the layer's error level
    pub err_mod: bool,
    /// Floor on the error modulation
    pub mod_min: f32,

    pub dt: f32,
    pub lrn_fact: f32,
}

impl Default for AvgLParams {
    fn default() -> Self {
        let mut p = Self {
            init: 0.4,
            gain: 2.5,
            min: 0.2,
            tau: 10.0,
            lrn_max: 0.5,
            lrn_min: 0.0001,
            err_mod: true,
            mod_min: 0.01,
            dt: 0.0,
            lrn_fact: 0.0,
        };
        p.update();
        p
    }
}

impl AvgLParams {
    pub fn avg_l_fm_avg_m(&self, nrn: &mut Neuron) {
        nrn.avg_l += self.dt * (self.gain * nrn.avg_m - nrn.avg_l);
        if nrn.avg_l < self.min {
            nrn.avg_l = self.min;
        }
        nrn.avg_l_lrn = self.lrn_fact * (nrn.avg_l - self.min);
    }

    /// Error modulation factor from the layer's cosine-derived learning average
    pub fn err_mod_fm_lay_err(&self, lay_cos_diff_avg: f32) -> f32 {
        if !self.err_mod {
            return 1.0;
        }
        lay_cos_diff_avg.max(self.mod_min)
    }
}

impl ParamSet for AvgLParams {
    fn set_param(&mut self, path: &str, value: f32) -> Result<()> {
        match path {
            "Init" => self.init = value,
            "Gain" => self.gain = value,
            "Min" => self.min = value,
            "Tau" => self.tau = positive(path, value)?,
            "LrnMax" => self.lrn_max = value,
            "LrnMin" => self.lrn_min = value,
            "ErrMod" => self.err_mod = as_bool(value),
            "ModMin" => self.mod_min = value,
            _ => return Err(unknown(path, "")),
        }
        Ok(())
    }

    fn update(&mut self) {
        self.dt = 1.0 / self.tau;
        let span = self.gain - self.min;
        self.lrn_fact = if span != 0.0 {
            (self.lrn_max - self.lrn_min) / span
        } else {
            0.0
        };
    }
}

/// Smoothing of the per-trial cosine difference between minus and plus phases
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct CosDiffParams {
    /// Time constant in trials
    pub tau: f32,
    pub dt: f32,
    pub dt_c: f32,
}

impl Default for CosDiffParams {
    fn default() -> Self {
        let mut p = Self {
            tau: 100.0,
            dt: 0.0,
            dt_c: 0.0,
        };
        p.update();
        p
    }
}

impl CosDiffParams {
    /// Update running average and variance; the first value seeds the average
    pub fn avg_var_fm_cos(&self, avg: &mut f32, var: &mut f32, cos: f32) {
        if *avg == 0.0 {
            *avg = cos;
            *var = 0.0;
        } else {
            let del = cos - *avg;
            let incr = self.dt * del;
            *avg += incr;
            if *var == 0.0 {
                *var = 2.0 * self.dt_c * del * incr;
            } else {
                *var = self.dt_c * (*var + del * incr);
            }
        }
    }
}

impl ParamSet for CosDiffParams {
    fn set_param(&mut self, path: &str, value: f32) -> Result<()> {
        match path {
            "Tau" => self.tau = positive(path, value)?,
            _ => return Err(unknown(path, "")),
        }
        Ok(())
    }

    fn update(&mut self) {
        self.dt = 1.0 / self.tau;
        self.dt_c = 1.0 - self.dt;
    }
}

/// Layer-level cosine difference statistics
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct CosDiffStats {
    /// Cosine between zero-meaned ActM and ActP on the current trial
    pub cos: f32,
    pub avg: f32,
    pub var: f32,
    /// 1 - avg for hidden layers, 0 otherwise
    pub avg_lrn: f32,
    /// Error modulation applied to AvgLLrn
    pub mod_avg_l_lrn: f32,
}

impl CosDiffStats {
    pub fn init(&mut self) {
        *self = Self::default();
    }
}

/// Neuron-level learning parameters for a layer
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct LearnNeurParams {
    pub act_avg: LrnActAvgParams,
    pub avg_l: AvgLParams,
    pub cos_diff: CosDiffParams,
}

impl LearnNeurParams {
    pub fn init_act_avg(&self, nrn: &mut Neuron) {
        nrn.avg_ss = self.act_avg.init;
        nrn.avg_s = self.act_avg.init;
        nrn.avg_m = self.act_avg.init;
        nrn.avg_l = self.avg_l.init;
        nrn.avg_s_lrn = 0.0;
    }

    #[inline]
    pub fn avgs_fm_act(&self, nrn: &mut Neuron) {
        self.act_avg.avgs_fm_act(nrn);
    }

    #[inline]
    pub fn avg_l_fm_avg_m(&self, nrn: &mut Neuron) {
        self.avg_l.avg_l_fm_avg_m(nrn);
    }
}

impl ParamSet for LearnNeurParams {
    fn set_param(&mut self, path: &str, value: f32) -> Result<()> {
        let (block, rest) = split_path(path);
        let res = match block {
            "ActAvg" => self.act_avg.set_param(rest, value),
            "AvgL" => self.avg_l.set_param(rest, value),
            "CosDiff" => self.cos_diff.set_param(rest, value),
            _ => return Err(unknown(block, rest)),
        };
        res.map_err(|e| scoped(block, e))
    }

    fn update(&mut self) {
        self.act_avg.update();
        self.avg_l.update();
        self.cos_diff.update();
    }
}
