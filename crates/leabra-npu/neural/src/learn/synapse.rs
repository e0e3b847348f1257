// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Synapse-level learning: XCAL weight changes and weight application

use crate::types::params::{as_bool, positive, scoped, split_path, unknown};
use crate::types::{ParamSet, RandDist, RandParams, Result, Synapse};
use rand::Rng;

#[cfg(feature = "std")]
use serde::{Deserialize, Serialize};

/// XCAL check-mark function parameters
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct XCalParams {
    /// Multiplier on the error-driven (medium threshold) term
    pub m_lrn: f32,
    /// Use the fixed `l_lrn` instead of the receiver's AvgLLrn
    pub set_l_lrn: bool,
    pub l_lrn: f32,
    /// Point within the LTD range where the function reverses back to zero
    pub d_rev: f32,
    /// Coincidence below this produces no weight change
    pub d_thr: f32,
    /// Senders below this in both AvgS and AvgM do not learn
    pub lrn_thr: f32,

    /// -(1 - d_rev) / d_rev
    pub d_rev_ratio: f32,
}

impl Default for XCalParams {
    fn default() -> Self {
        let mut p = Self {
            m_lrn: 1.0,
            set_l_lrn: false,
            l_lrn: 1.0,
            d_rev: 0.1,
            d_thr: 0.0001,
            lrn_thr: 0.01,
            d_rev_ratio: 0.0,
        };
        p.update();
        p
    }
}

impl XCalParams {
    /// The check-mark: zero below `d_thr`, a negative ramp up to
    /// `thr_p * d_rev`, then linear `srval - thr_p`
    pub fn dwt(&self, srval: f32, thr_p: f32) -> f32 {
        if srval < self.d_thr {
            0.0
        } else if srval > thr_p * self.d_rev {
            srval - thr_p
        } else {
            srval * self.d_rev_ratio
        }
    }

    pub fn long_lrate(&self, avg_l_lrn: f32) -> f32 {
        if self.set_l_lrn {
            self.l_lrn
        } else {
            avg_l_lrn
        }
    }
}

impl ParamSet for XCalParams {
    fn set_param(&mut self, path: &str, value: f32) -> Result<()> {
        match path {
            "MLrn" => self.m_lrn = value,
            "SetLLrn" => self.set_l_lrn = as_bool(value),
            "LLrn" => self.l_lrn = value,
            "DRev" => self.d_rev = value,
            "DThr" => self.d_thr = value,
            "LrnThr" => self.lrn_thr = value,
            _ => return Err(unknown(path, "")),
        }
        Ok(())
    }

    fn update(&mut self) {
        self.d_rev_ratio = if self.d_rev > 0.0 {
            -(1.0 - self.d_rev) / self.d_rev
        } else {
            -1.0
        };
    }
}

/// Sigmoidal weight contrast between linear LWt and effective Wt
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct WtSigParams {
    /// Contrast gain (1 = linear)
    pub gain: f32,
    /// Offset (1 = centered at .5)
    pub off: f32,
    /// Exponential soft bounding of weight changes
    pub soft_bound: bool,
}

impl Default for WtSigParams {
    fn default() -> Self {
        Self {
            gain: 6.0,
            off: 1.0,
            soft_bound: true,
        }
    }
}

impl WtSigParams {
    fn sig_fun(w: f32, gain: f32, off: f32) -> f32 {
        if w <= 0.0 {
            return 0.0;
        }
        if w >= 1.0 {
            return 1.0;
        }
        1.0 / (1.0 + ((off * (1.0 - w)) / w).powf(gain))
    }

    fn sig_fun61(w: f32) -> f32 {
        if w <= 0.0 {
            return 0.0;
        }
        if w >= 1.0 {
            return 1.0;
        }
        let pw = (1.0 - w) / w;
        1.0 / (1.0 + pw * pw * pw * pw * pw * pw)
    }

    fn sig_inv_fun(w: f32, gain: f32, off: f32) -> f32 {
        if w <= 0.0 {
            return 0.0;
        }
        if w >= 1.0 {
            return 1.0;
        }
        1.0 / (1.0 + ((1.0 - w) / w).powf(1.0 / gain) / off)
    }

    /// Effective weight from linear weight
    pub fn sig_fm_lin_wt(&self, lw: f32) -> f32 {
        if self.gain == 1.0 && self.off == 1.0 {
            lw
        } else if self.gain == 6.0 && self.off == 1.0 {
            Self::sig_fun61(lw)
        } else {
            Self::sig_fun(lw, self.gain, self.off)
        }
    }

    /// Linear weight from effective weight
    pub fn lin_fm_sig_wt(&self, sw: f32) -> f32 {
        if self.gain == 1.0 && self.off == 1.0 {
            sw
        } else {
            Self::sig_inv_fun(sw, self.gain, self.off)
        }
    }
}

impl ParamSet for WtSigParams {
    fn set_param(&mut self, path: &str, value: f32) -> Result<()> {
        match path {
            "Gain" => self.gain = positive(path, value)?,
            "Off" => self.off = positive(path, value)?,
            "SoftBound" => self.soft_bound = as_bool(value),
            _ => return Err(unknown(path, "")),
        }
        Ok(())
    }

    fn update(&mut self) {}
}

/// Normalization of weight changes by a decaying running max of |dwt|
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct DWtNormParams {
    pub on: bool,
    pub decay_tau: f32,
    /// Lower bound on the normalization factor
    pub norm_min: f32,
    /// Learning rate compensation for using normalization
    pub lr_comp: f32,

    pub decay_dt: f32,
    pub decay_dt_c: f32,
}

impl Default for DWtNormParams {
    fn default() -> Self {
        let mut p = Self {
            on: true,
            decay_tau: 1000.0,
            norm_min: 0.001,
            lr_comp: 0.15,
            decay_dt: 0.0,
            decay_dt_c: 0.0,
        };
        p.update();
        p
    }
}

impl DWtNormParams {
    /// Update the running max and return the multiplier to apply to dwt
    pub fn norm_fm_abs_dwt(&self, norm: &mut f32, abs_dwt: f32) -> f32 {
        *norm = (self.decay_dt_c * *norm).max(abs_dwt);
        if *norm == 0.0 {
            return 1.0;
        }
        self.lr_comp / norm.max(self.norm_min)
    }
}

impl ParamSet for DWtNormParams {
    fn set_param(&mut self, path: &str, value: f32) -> Result<()> {
        match path {
            "On" => self.on = as_bool(value),
            "DecayTau" => self.decay_tau = positive(path, value)?,
            "NormMin" => self.norm_min = value,
            "LrComp" => self.lr_comp = value,
            _ => return Err(unknown(path, "")),
        }
        Ok(())
    }

    fn update(&mut self) {
        self.decay_dt = 1.0 / self.decay_tau;
        self.decay_dt_c = 1.0 - self.decay_dt;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct MomentumParams {
    pub on: bool,
    pub m_tau: f32,
    /// Learning rate compensation for momentum alone
    pub lr_comp: f32,

    pub m_dt: f32,
    pub m_dt_c: f32,
}

impl Default for MomentumParams {
    fn default() -> Self {
        let mut p = Self {
            on: true,
            m_tau: 10.0,
            lr_comp: 0.1,
            m_dt: 0.0,
            m_dt_c: 0.0,
        };
        p.update();
        p
    }
}

impl MomentumParams {
    pub fn moment_fm_dwt(&self, moment: &mut f32, dwt: f32) -> f32 {
        *moment = self.m_dt_c * *moment + dwt;
        self.lr_comp * *moment
    }
}

impl ParamSet for MomentumParams {
    fn set_param(&mut self, path: &str, value: f32) -> Result<()> {
        match path {
            "On" => self.on = as_bool(value),
            "MTau" => self.m_tau = positive(path, value)?,
            "LrComp" => self.lr_comp = value,
            _ => return Err(unknown(path, "")),
        }
        Ok(())
    }

    fn update(&mut self) {
        self.m_dt = 1.0 / self.m_tau;
        self.m_dt_c = 1.0 - self.m_dt;
    }
}

/// Homeostatic weight balance across a receiver's incoming weights
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct WtBalParams {
    pub on: bool,
    /// Only weights at or above this enter the average
    pub avg_thr: f32,
    pub hi_thr: f32,
    pub hi_gain: f32,
    pub lo_thr: f32,
    pub lo_gain: f32,
    /// Threshold on the receiver's long-run ActAvg
    pub act_thr: f32,
    pub act_gain: f32,
}

impl Default for WtBalParams {
    fn default() -> Self {
        Self {
            on: false,
            avg_thr: 0.25,
            hi_thr: 0.4,
            hi_gain: 4.0,
            lo_thr: 0.4,
            lo_gain: 6.0,
            act_thr: 0.25,
            act_gain: 0.0,
        }
    }
}

impl WtBalParams {
    /// Returns `(fact, inc, dec)` for a receiver's thresholded weight average
    pub fn wt_bal(&self, wb_avg: f32, act_avg: f32) -> (f32, f32, f32) {
        let mut fact = 0.0;
        let mut inc = 1.0;
        let mut dec = 1.0;
        if wb_avg < self.lo_thr {
            let wb_avg = wb_avg.max(self.avg_thr);
            fact = self.lo_gain * (self.lo_thr - wb_avg);
            dec = 1.0 / (1.0 + fact);
            inc = 2.0 - dec;
        } else if wb_avg > self.hi_thr {
            fact += self.hi_gain * (wb_avg - self.hi_thr);
            if act_avg > self.act_thr {
                fact += self.act_gain * (act_avg - self.act_thr);
            }
            inc = 1.0 / (1.0 + fact);
            dec = 2.0 - inc;
        }
        (fact, inc, dec)
    }
}

impl ParamSet for WtBalParams {
    fn set_param(&mut self, path: &str, value: f32) -> Result<()> {
        match path {
            "On" => self.on = as_bool(value),
            "AvgThr" => self.avg_thr = value,
            "HiThr" => self.hi_thr = value,
            "HiGain" => self.hi_gain = value,
            "LoThr" => self.lo_thr = value,
            "LoGain" => self.lo_gain = value,
            "ActThr" => self.act_thr = value,
            "ActGain" => self.act_gain = value,
            _ => return Err(unknown(path, "")),
        }
        Ok(())
    }

    fn update(&mut self) {}
}

/// Weight balance state for one receiving neuron of a projection
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct WtBalRecv {
    pub avg: f32,
    pub fact: f32,
    pub inc: f32,
    pub dec: f32,
}

impl Default for WtBalRecv {
    fn default() -> Self {
        Self {
            avg: 0.0,
            fact: 0.0,
            inc: 1.0,
            dec: 1.0,
        }
    }
}

impl WtBalRecv {
    pub fn init(&mut self) {
        *self = Self::default();
    }
}

/// Initial weight distribution
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct WtInitParams {
    pub rnd: RandParams,
    /// Copy weights into the reciprocal projection after init
    pub sym: bool,
}

impl Default for WtInitParams {
    fn default() -> Self {
        Self {
            rnd: RandParams {
                dist: RandDist::Uniform,
                mean: 0.5,
                var: 0.25,
            },
            sym: true,
        }
    }
}

/// Synapse-level learning parameters for a projection
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct LearnSynParams {
    pub learn: bool,
    pub lrate: f32,
    pub wt_init: WtInitParams,
    pub xcal: XCalParams,
    pub wt_sig: WtSigParams,
    pub norm: DWtNormParams,
    pub momentum: MomentumParams,
    pub wt_bal: WtBalParams,
}

impl Default for LearnSynParams {
    fn default() -> Self {
        Self {
            learn: true,
            lrate: 0.04,
            wt_init: WtInitParams::default(),
            xcal: XCalParams::default(),
            wt_sig: WtSigParams::default(),
            norm: DWtNormParams::default(),
            momentum: MomentumParams::default(),
            wt_bal: WtBalParams::default(),
        }
    }
}

impl LearnSynParams {
    /// Draw an initial weight and derive the linear weight from it
    pub fn init_wts<R: Rng + ?Sized>(&self, syn: &mut Synapse, rng: &mut R) {
        syn.wt = self.wt_init.rnd.gen(rng);
        syn.lwt = self.wt_sig.lin_fm_sig_wt(syn.wt);
        syn.dwt = 0.0;
        syn.norm = 0.0;
        syn.moment = 0.0;
    }

    #[inline]
    pub fn lwt_fm_wt(&self, syn: &mut Synapse) {
        syn.lwt = self.wt_sig.lin_fm_sig_wt(syn.wt);
    }

    #[inline]
    pub fn wt_fm_lwt(&self, syn: &mut Synapse) {
        syn.wt = self.wt_sig.sig_fm_lin_wt(syn.lwt);
    }

    /// Error-driven and BCM terms, returned as `(err, bcm)`
    pub fn chl_dwt(
        &self,
        su_avg_s_lrn: f32,
        su_avg_m: f32,
        ru_avg_s_lrn: f32,
        ru_avg_m: f32,
        ru_avg_l: f32,
    ) -> (f32, f32) {
        let srs = su_avg_s_lrn * ru_avg_s_lrn;
        let srm = su_avg_m * ru_avg_m;
        let bcm = self.xcal.dwt(srs, ru_avg_l);
        let err = self.xcal.dwt(srs, srm);
        (err, bcm)
    }

    /// Apply the pending delta to the linear weight with soft bounding,
    /// re-derive the effective weight and clear the delta
    pub fn wt_fm_dwt(&self, wb_inc: f32, wb_dec: f32, syn: &mut Synapse) {
        if syn.dwt == 0.0 {
            return;
        }
        if self.wt_sig.soft_bound {
            if syn.dwt > 0.0 {
                syn.dwt *= wb_inc * (1.0 - syn.lwt);
            } else {
                syn.dwt *= wb_dec * syn.lwt;
            }
        } else if syn.dwt > 0.0 {
            syn.dwt *= wb_inc;
        } else {
            syn.dwt *= wb_dec;
        }
        syn.lwt = (syn.lwt + syn.dwt).clamp(0.0, 1.0);
        syn.wt = self.wt_sig.sig_fm_lin_wt(syn.lwt);
        syn.dwt = 0.0;
    }
}

impl ParamSet for LearnSynParams {
    fn set_param(&mut self, path: &str, value: f32) -> Result<()> {
        let (block, rest) = split_path(path);
        let res = match (block, rest) {
            ("Learn", "") => {
                self.learn = as_bool(value);
                Ok(())
            }
            ("Lrate", "") => {
                self.lrate = value;
                Ok(())
            }
            ("WtInit", "Mean") => {
                self.wt_init.rnd.mean = value;
                Ok(())
            }
            ("WtInit", "Var") => {
                self.wt_init.rnd.var = value;
                Ok(())
            }
            ("WtInit", "Dist") => match RandDist::from_code(value) {
                Some(d) => {
                    self.wt_init.rnd.dist = d;
                    Ok(())
                }
                None => return Err(unknown(block, rest)),
            },
            ("WtInit", "Sym") => {
                self.wt_init.sym = as_bool(value);
                Ok(())
            }
            ("XCal", _) => self.xcal.set_param(rest, value),
            ("WtSig", _) => self.wt_sig.set_param(rest, value),
            ("Norm", _) => self.norm.set_param(rest, value),
            ("Momentum", _) => self.momentum.set_param(rest, value),
            ("WtBal", _) => self.wt_bal.set_param(rest, value),
            _ => return Err(unknown(block, rest)),
        };
        res.map_err(|e| scoped(block, e))
    }

    fn update(&mut self) {
        self.xcal.update();
        self.wt_sig.update();
        self.norm.update();
        self.momentum.update();
        self.wt_bal.update();
    }
}
