// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Inhibition: feedforward / feedback (FFFB) pool inhibition, self inhibition,
//! and the running-average activity used for netinput scaling.

use crate::types::params::{as_bool, positive, scoped, split_path, unknown};
use crate::types::{ParamSet, Result};

#[cfg(feature = "std")]
use serde::{Deserialize, Serialize};

/// Feedforward + feedback inhibition for one pool
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct FFFBParams {
    pub on: bool,
    /// Overall inhibition gain
    pub gi: f32,
    /// Feedforward gain on average Ge
    pub ff: f32,
    /// Feedback gain on average Act
    pub fb: f32,
    /// Feedback time constant in cycles
    pub fb_tau: f32,
    /// 0 = use the average Ge, 1 = use the max Ge, in between interpolates
    pub max_vs_avg: f32,
    /// Feedforward zero point: Ge below this produces no FF inhibition
    pub ff0: f32,

    pub fb_dt: f32,
}

impl Default for FFFBParams {
    fn default() -> Self {
        let mut p = Self {
            on: true,
            gi: 1.8,
            ff: 1.0,
            fb: 1.0,
            fb_tau: 1.4,
            max_vs_avg: 0.0,
            ff0: 0.1,
            fb_dt: 0.0,
        };
        p.update();
        p
    }
}

impl FFFBParams {
    pub fn ff_inhib(&self, avg_ge: f32, max_ge: f32) -> f32 {
        let ff_netin = avg_ge + self.max_vs_avg * (max_ge - avg_ge);
        if ff_netin > self.ff0 {
            self.ff * (ff_netin - self.ff0)
        } else {
            0.0
        }
    }

    #[inline]
    pub fn fb_inhib(&self, avg_act: f32) -> f32 {
        self.fb * avg_act
    }

    /// Integrate feedback inhibition toward its new value
    #[inline]
    pub fn fb_updt(&self, fbi: &mut f32, new_fbi: f32) {
        *fbi += self.fb_dt * (new_fbi - *fbi);
    }

    /// Compute pool inhibition from Ge and Act statistics
    pub fn inhib(&self, avg_ge: f32, max_ge: f32, avg_act: f32, inh: &mut FFFBInhib) {
        if !self.on {
            inh.init();
            return;
        }
        let ffi = self.ff_inhib(avg_ge, max_ge);
        let fbi = self.fb_inhib(avg_act);
        inh.ffi = ffi;
        self.fb_updt(&mut inh.fbi, fbi);
        inh.gi = self.gi * (ffi + inh.fbi);
        inh.gi_orig = inh.gi;
    }
}

impl ParamSet for FFFBParams {
    fn set_param(&mut self, path: &str, value: f32) -> Result<()> {
        match path {
            "On" => self.on = as_bool(value),
            "Gi" => self.gi = value,
            "FF" => self.ff = value,
            "FB" => self.fb = value,
            "FBTau" => self.fb_tau = positive(path, value)?,
            "MaxVsAvg" => self.max_vs_avg = value,
            "FF0" => self.ff0 = value,
            _ => return Err(unknown(path, "")),
        }
        Ok(())
    }

    fn update(&mut self) {
        self.fb_dt = 1.0 / self.fb_tau;
    }
}

/// Computed inhibition state for one pool
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct FFFBInhib {
    pub ffi: f32,
    pub fbi: f32,
    /// Net inhibition added into each neuron's Gi
    pub gi: f32,
    /// Gi before any layer floor was applied
    pub gi_orig: f32,
    /// For sub-pools, the layer-level Gi used as floor
    pub lay_gi: f32,
}

impl FFFBInhib {
    pub fn init(&mut self) {
        *self = Self::default();
    }

    pub fn decay(&mut self, decay: f32) {
        self.ffi -= decay * self.ffi;
        self.fbi -= decay * self.fbi;
        self.gi -= decay * self.gi;
    }
}

/// Leaky integrator of each neuron's own activation
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct SelfInhibParams {
    pub on: bool,
    pub gi: f32,
    pub tau: f32,
    pub dt: f32,
}

impl Default for SelfInhibParams {
    fn default() -> Self {
        let mut p = Self {
            on: false,
            gi: 0.4,
            tau: 1.4,
            dt: 0.0,
        };
        p.update();
        p
    }
}

impl SelfInhibParams {
    pub fn inhib(&self, self_gi: &mut f32, act: f32) {
        if self.on {
            *self_gi += self.dt * (self.gi * act - *self_gi);
        } else {
            *self_gi = 0.0;
        }
    }
}

impl ParamSet for SelfInhibParams {
    fn set_param(&mut self, path: &str, value: f32) -> Result<()> {
        match path {
            "On" => self.on = as_bool(value),
            "Gi" => self.gi = value,
            "Tau" => self.tau = positive(path, value)?,
            _ => return Err(unknown(path, "")),
        }
        Ok(())
    }

    fn update(&mut self) {
        self.dt = 1.0 / self.tau;
    }
}

/// Running-average layer activity, used for netinput scaling
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct ActAvgParams {
    /// Expected average activity level
    pub init: f32,
    /// Always use `init` instead of the running average
    pub fixed: bool,
    /// Move halfway to the first observed value instead of starting from `init`
    pub use_first: bool,
    /// Time constant in trials
    pub tau: f32,
    /// Multiplier on the running average for the effective value
    pub adjust: f32,
    pub dt: f32,
}

impl Default for ActAvgParams {
    fn default() -> Self {
        let mut p = Self {
            init: 0.15,
            fixed: false,
            use_first: true,
            tau: 100.0,
            adjust: 1.0,
            dt: 0.0,
        };
        p.update();
        p
    }
}

impl ActAvgParams {
    pub fn eff_init(&self) -> f32 {
        if self.fixed {
            self.init
        } else {
            self.adjust * self.init
        }
    }

    pub fn avg_fm_act(&self, avg: &mut f32, act: f32) {
        if self.fixed {
            return;
        }
        if self.use_first && *avg == self.init {
            *avg += 0.5 * (act - *avg);
        } else {
            *avg += self.dt * (act - *avg);
        }
    }

    pub fn eff_fm_avg(&self, eff: &mut f32, avg: f32) {
        if self.fixed {
            *eff = self.init;
        } else {
            *eff = self.adjust * avg;
        }
    }
}

impl ParamSet for ActAvgParams {
    fn set_param(&mut self, path: &str, value: f32) -> Result<()> {
        match path {
            "Init" => self.init = value,
            "Fixed" => self.fixed = as_bool(value),
            "UseFirst" => self.use_first = as_bool(value),
            "Tau" => self.tau = positive(path, value)?,
            "Adjust" => self.adjust = value,
            _ => return Err(unknown(path, "")),
        }
        Ok(())
    }

    fn update(&mut self) {
        self.dt = 1.0 / self.tau;
    }
}

/// All inhibition parameters for a layer
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct InhibParams {
    /// Whole-layer inhibition
    pub layer: FFFBParams,
    /// Sub-pool inhibition (4-D layers only)
    pub pool: FFFBParams,
    pub self_inhib: SelfInhibParams,
    pub act_avg: ActAvgParams,
}

impl Default for InhibParams {
    fn default() -> Self {
        Self {
            layer: FFFBParams::default(),
            pool: FFFBParams {
                on: false,
                ..FFFBParams::default()
            },
            self_inhib: SelfInhibParams::default(),
            act_avg: ActAvgParams::default(),
        }
    }
}

impl ParamSet for InhibParams {
    fn set_param(&mut self, path: &str, value: f32) -> Result<()> {
        let (block, rest) = split_path(path);
        let res = match block {
            "Layer" => self.layer.set_param(rest, value),
            "Pool" => self.pool.set_param(rest, value),
            "Self" => self.self_inhib.set_param(rest, value),
            "ActAvg" => self.act_avg.set_param(rest, value),
            _ => return Err(unknown(block, rest)),
        };
        res.map_err(|e| scoped(block, e))
    }

    fn update(&mut self) {
        self.layer.update();
        self.pool.update();
        self.self_inhib.update();
        self.act_avg.update();
    }
}
