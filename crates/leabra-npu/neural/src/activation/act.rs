// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Activation parameters and the per-neuron update functions
//!
//! ## Per-cycle sequence (per neuron)
//! 1. [`ActParams::ge_gi_fm_inc`]: fold received increments into raw conductances
//!    and integrate Ge / GiSyn toward them
//! 2. inhibition is computed by the layer and written to `Gi`
//! 3. [`ActParams::vm_fm_g`]: membrane potential from net current
//! 4. [`ActParams::act_fm_g`]: rate-code activation from Ge relative to the
//!    threshold conductance (or Vm relative to threshold while still silent)

use super::xx1::{ActivationFunction, XX1Params};
use crate::types::params::{as_bool, positive, scoped, split_path, unknown};
use crate::types::{MinMax, Neuron, NeuronFlags, ParamSet, RandParams, Result};
use rand::Rng;

#[cfg(feature = "std")]
use serde::{Deserialize, Serialize};

/// Thresholds below which sending is skipped
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct OptThreshParams {
    /// Don't send activation when act <= send
    pub send: f32,
    /// Don't send activation changes until they exceed this threshold
    pub delta: f32,
}

impl Default for OptThreshParams {
    fn default() -> Self {
        Self {
            send: 0.1,
            delta: 0.005,
        }
    }
}

/// Initial values for state variables, applied by InitActs and DecayState
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct ActInitParams {
    /// Proportion to decay toward initial values at the start of each trial
    pub decay: f32,
    pub vm: f32,
    pub act: f32,
    /// Baseline excitatory conductance
    pub ge: f32,
}

impl Default for ActInitParams {
    fn default() -> Self {
        Self {
            decay: 1.0,
            vm: 0.4,
            act: 0.0,
            ge: 0.0,
        }
    }
}

/// Time constants (in cycles) and their rates
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct DtParams {
    /// Overall integration rate multiplier
    pub integ: f32,
    /// Membrane potential and rate-code activation time constant
    pub vm_tau: f32,
    /// Net input time constant
    pub net_tau: f32,
    /// Time constant in trials for the long-run ActAvg
    pub avg_tau: f32,

    pub vm_dt: f32,
    pub net_dt: f32,
    pub avg_dt: f32,
}

impl Default for DtParams {
    fn default() -> Self {
        let mut p = Self {
            integ: 1.0,
            vm_tau: 3.3,
            net_tau: 1.4,
            avg_tau: 200.0,
            vm_dt: 0.0,
            net_dt: 0.0,
            avg_dt: 0.0,
        };
        p.update_dt();
        p
    }
}

impl DtParams {
    fn update_dt(&mut self) {
        self.vm_dt = 1.0 / self.vm_tau;
        self.net_dt = 1.0 / self.net_tau;
        self.avg_dt = 1.0 / self.avg_tau;
    }
}

/// Per-channel values: excitatory, leak, inhibitory, potassium
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct Chans {
    pub e: f32,
    pub l: f32,
    pub i: f32,
    pub k: f32,
}

impl Chans {
    pub const fn new(e: f32, l: f32, i: f32, k: f32) -> Self {
        Self { e, l, i, k }
    }

    /// Each channel minus a constant
    pub fn minus(&self, v: f32) -> Self {
        Self::new(self.e - v, self.l - v, self.i - v, self.k - v)
    }

    /// A constant minus each channel
    pub fn from_minus(v: f32, oth: &Chans) -> Self {
        Self::new(v - oth.e, v - oth.l, v - oth.i, v - oth.k)
    }

    fn set(&mut self, path: &str, value: f32) -> Result<()> {
        match path {
            "E" => self.e = value,
            "L" => self.l = value,
            "I" => self.i = value,
            "K" => self.k = value,
            _ => return Err(unknown(path, "")),
        }
        Ok(())
    }
}

/// External input clamping
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct ClampParams {
    /// Clamp Act directly to Ext instead of driving Ge
    pub hard: bool,
    /// Range of allowed clamped activation values
    pub range: MinMax,
    /// Soft clamp gain: Ext * gain is added to GeRaw
    pub gain: f32,
}

impl Default for ClampParams {
    fn default() -> Self {
        Self {
            hard: true,
            range: MinMax::new(0.0, 0.95),
            gain: 0.2,
        }
    }
}

/// Where activation noise is added
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub enum NoiseType {
    #[default]
    None,
    /// Added to the membrane potential
    Vm,
    /// Added to the excitatory conductance
    Ge,
    /// Added to the final activation
    Act,
    /// Multiplies the excitatory conductance
    GeMult,
}

impl NoiseType {
    pub fn from_code(code: f32) -> Option<Self> {
        match code as i32 {
            0 => Some(NoiseType::None),
            1 => Some(NoiseType::Vm),
            2 => Some(NoiseType::Ge),
            3 => Some(NoiseType::Act),
            4 => Some(NoiseType::GeMult),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct ActNoiseParams {
    pub kind: NoiseType,
    pub rnd: RandParams,
    /// Draw one noise value per neuron per trial instead of every cycle
    pub trial_fixed: bool,
}

impl Default for ActNoiseParams {
    fn default() -> Self {
        Self {
            kind: NoiseType::None,
            rnd: RandParams {
                mean: 0.0,
                var: 0.0,
                ..RandParams::default()
            },
            trial_fixed: false,
        }
    }
}

impl ActNoiseParams {
    pub fn is_on(&self) -> bool {
        self.kind != NoiseType::None && self.rnd.var > 0.0
    }

    pub fn gen<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        self.rnd.gen(rng)
    }
}

/// Rate-code activation parameters
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct ActParams {
    pub xx1: XX1Params,
    pub opt_thresh: OptThreshParams,
    pub init: ActInitParams,
    pub dt: DtParams,
    /// Maximal conductances per channel
    pub gbar: Chans,
    /// Reversal potentials per channel
    pub erev: Chans,
    pub clamp: ClampParams,
    pub noise: ActNoiseParams,
    pub vm_range: MinMax,

    // derived
    pub erev_sub_thr: Chans,
    pub thr_sub_erev: Chans,
}

impl Default for ActParams {
    fn default() -> Self {
        let mut p = Self {
            xx1: XX1Params::default(),
            opt_thresh: OptThreshParams::default(),
            init: ActInitParams::default(),
            dt: DtParams::default(),
            gbar: Chans::new(1.0, 0.2, 1.0, 1.0),
            erev: Chans::new(1.0, 0.3, 0.25, 0.1),
            clamp: ClampParams::default(),
            noise: ActNoiseParams::default(),
            vm_range: MinMax::new(0.0, 2.0),
            erev_sub_thr: Chans::new(0.0, 0.0, 0.0, 0.0),
            thr_sub_erev: Chans::new(0.0, 0.0, 0.0, 0.0),
        };
        p.update();
        p
    }
}

impl ActParams {
    /// Full initialization of activation state
    pub fn init_acts(&self, nrn: &mut Neuron) {
        nrn.act = self.init.act;
        nrn.ge = self.init.ge;
        nrn.gi = 0.0;
        nrn.inet = 0.0;
        nrn.vm = self.init.vm;
        nrn.targ = 0.0;
        nrn.ext = 0.0;
        nrn.act_del = 0.0;
        nrn.noise = 0.0;
        nrn.gi_self = 0.0;
        nrn.act_sent = 0.0;
        nrn.ge_raw = 0.0;
        nrn.ge_inc = 0.0;
        nrn.gi_raw = 0.0;
        nrn.gi_inc = 0.0;
        nrn.gi_syn = 0.0;
        nrn.act_m = 0.0;
        nrn.act_p = 0.0;
        nrn.act_dif = 0.0;
    }

    /// Decay state toward initial values by the given proportion
    pub fn decay_state(&self, nrn: &mut Neuron, decay: f32) {
        if decay <= 0.0 {
            return;
        }
        nrn.act -= decay * (nrn.act - self.init.act);
        nrn.ge -= decay * (nrn.ge - self.init.ge);
        nrn.gi -= decay * nrn.gi;
        nrn.gi_self -= decay * nrn.gi_self;
        nrn.vm -= decay * (nrn.vm - self.init.vm);
        nrn.act_del = 0.0;
        nrn.inet = 0.0;
        // GeRaw must stay the sum of ActSent * GScale * Wt over senders, and
        // weights may have changed since those values were sent
        if decay >= 1.0 {
            nrn.act_sent = 0.0;
            nrn.ge_raw = 0.0;
            nrn.gi_raw = 0.0;
            nrn.gi_syn = 0.0;
        } else {
            nrn.act_sent -= decay * nrn.act_sent;
            nrn.ge_raw -= decay * nrn.ge_raw;
            nrn.gi_raw -= decay * nrn.gi_raw;
            nrn.gi_syn -= decay * nrn.gi_syn;
        }
    }

    #[inline]
    pub fn has_hard_clamp(&self, nrn: &Neuron) -> bool {
        self.clamp.hard && nrn.has_flag(NeuronFlags::HAS_EXT)
    }

    /// Clamp activation directly to the external input
    pub fn hard_clamp(&self, nrn: &mut Neuron) {
        if !nrn.has_flag(NeuronFlags::HAS_EXT) {
            return;
        }
        let clamped = self.clamp.range.clip(nrn.ext);
        nrn.act = clamped;
        nrn.act_del = 0.0;
        nrn.vm = self.xx1.thr + nrn.act / self.xx1.gain;
        nrn.inet = 0.0;
    }

    /// Fold received increments into raw conductances and integrate
    pub fn ge_gi_fm_inc(&self, nrn: &mut Neuron) {
        nrn.ge_raw += nrn.ge_inc;
        nrn.ge_inc = 0.0;
        let mut ge_raw = nrn.ge_raw;
        if !self.clamp.hard && nrn.has_flag(NeuronFlags::HAS_EXT) {
            ge_raw += nrn.ext * self.clamp.gain;
        }
        nrn.ge += self.dt.integ * self.dt.net_dt * (ge_raw - nrn.ge);
        match self.noise.kind {
            NoiseType::Ge => nrn.ge += nrn.noise,
            NoiseType::GeMult => nrn.ge *= nrn.noise,
            _ => {}
        }

        nrn.gi_raw += nrn.gi_inc;
        nrn.gi_inc = 0.0;
        nrn.gi_syn += self.dt.integ * self.dt.net_dt * (nrn.gi_raw - nrn.gi_syn);
        nrn.gi_syn = nrn.gi_syn.max(0.0);
    }

    /// Membrane potential from net current, using the potential from the
    /// previous cycle to compute the current
    pub fn vm_fm_g(&self, nrn: &mut Neuron) {
        if self.has_hard_clamp(nrn) {
            self.hard_clamp(nrn);
            return;
        }
        let ge = nrn.ge * self.gbar.e;
        let gi = nrn.gi * self.gbar.i;
        nrn.inet = ge * (self.erev.e - nrn.vm)
            + self.gbar.l * (self.erev.l - nrn.vm)
            + gi * (self.erev.i - nrn.vm);
        let mut vm = nrn.vm + self.dt.integ * self.dt.vm_dt * nrn.inet;
        if self.noise.kind == NoiseType::Vm {
            vm += nrn.noise;
        }
        nrn.vm = self.vm_range.clip(vm);
    }

    /// Excitatory conductance at which the neuron sits exactly at threshold
    #[inline]
    pub fn ge_thr_fm_g(&self, nrn: &Neuron) -> f32 {
        (self.gbar.i * nrn.gi * self.erev_sub_thr.i + self.gbar.l * self.erev_sub_thr.l)
            / self.thr_sub_erev.e
    }

    /// Rate-code activation using the default NoisyXX1 function
    pub fn act_fm_g(&self, nrn: &mut Neuron) {
        self.act_fm_g_with(nrn, &self.xx1);
    }

    /// Rate-code activation using a caller-supplied activation function
    pub fn act_fm_g_with(&self, nrn: &mut Neuron, act_fn: &dyn ActivationFunction) {
        if self.has_hard_clamp(nrn) {
            return;
        }
        let cur = nrn.act;
        let mut new_act = if cur < self.xx1.vm_act_thr && nrn.vm <= self.xx1.thr {
            act_fn.activation(nrn.vm - self.xx1.thr)
        } else {
            let ge_thr = self.ge_thr_fm_g(nrn);
            act_fn.activation(nrn.ge * self.gbar.e - ge_thr)
        };
        new_act = cur + self.dt.integ * self.dt.vm_dt * (new_act - cur);
        if self.noise.kind == NoiseType::Act {
            new_act += nrn.noise;
        }
        nrn.act_del = new_act - cur;
        nrn.act = new_act;
    }
}

impl ParamSet for ActParams {
    fn set_param(&mut self, path: &str, value: f32) -> Result<()> {
        let (block, rest) = split_path(path);
        match (block, rest) {
            ("XX1", _) => self.xx1.set_param(rest, value).map_err(|e| scoped(block, e))?,
            ("OptThresh", "Send") => self.opt_thresh.send = value,
            ("OptThresh", "Delta") => self.opt_thresh.delta = value,
            ("Init", "Decay") => self.init.decay = value,
            ("Init", "Vm") => self.init.vm = value,
            ("Init", "Act") => self.init.act = value,
            ("Init", "Ge") => self.init.ge = value,
            ("Dt", "Integ") => self.dt.integ = positive(path, value)?,
            ("Dt", "VmTau") => self.dt.vm_tau = positive(path, value)?,
            ("Dt", "NetTau") => self.dt.net_tau = positive(path, value)?,
            ("Dt", "AvgTau") => self.dt.avg_tau = positive(path, value)?,
            ("Gbar", ch) => self.gbar.set(ch, value).map_err(|_| unknown(block, rest))?,
            ("Erev", ch) => self.erev.set(ch, value).map_err(|_| unknown(block, rest))?,
            ("Clamp", "Hard") => self.clamp.hard = as_bool(value),
            ("Clamp", "Gain") => self.clamp.gain = value,
            ("Clamp", "Range.Min") => self.clamp.range.min = value,
            ("Clamp", "Range.Max") => self.clamp.range.max = value,
            ("Noise", "Type") => {
                self.noise.kind = NoiseType::from_code(value).ok_or_else(|| unknown(block, rest))?
            }
            ("Noise", "Mean") => self.noise.rnd.mean = value,
            ("Noise", "Var") => self.noise.rnd.var = value,
            ("Noise", "Dist") => {
                self.noise.rnd.dist = crate::types::RandDist::from_code(value)
                    .ok_or_else(|| unknown(block, rest))?
            }
            ("Noise", "TrialFixed") => self.noise.trial_fixed = as_bool(value),
            ("VmRange", "Min") => self.vm_range.min = value,
            ("VmRange", "Max") => self.vm_range.max = value,
            _ => return Err(unknown(block, rest)),
        }
        Ok(())
    }

    fn update(&mut self) {
        self.xx1.update();
        self.dt.update_dt();
        self.erev_sub_thr = self.erev.minus(self.xx1.thr);
        self.thr_sub_erev = Chans::from_minus(self.xx1.thr, &self.erev);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f32 = 1.0e-5;

    fn assert_close(got: f32, want: f32, what: &str, step: usize) {
        assert!(
            (got - want).abs() < TOL,
            "{} at step {}: got {}, expected {}",
            what,
            step,
            got,
            want
        );
    }

    #[test]
    fn test_act_update_reference_sequence() {
        let ac = ActParams::default();
        let mut nrn = Neuron::default();
        ac.init_acts(&mut nrn);

        let ge_inc = [0.01f32, 0.02, 0.03, 0.04, 0.05, 0.1, 0.2, 0.3];
        let want_ge = [
            0.007142857f32, 0.023469387, 0.049562685, 0.085589334, 0.13159695, 0.21617055,
            0.3831916, 0.64519763,
        ];
        let want_inet = [
            -0.015714284f32, -0.0048542274, 0.011293108, 0.032156322, 0.056659013, 0.09967137,
            0.1782439, 0.275567,
        ];
        let want_vm = [
            0.3952381f32, 0.39376712, 0.39718926, 0.4069336, 0.424103, 0.45430642, 0.50831974,
            0.5918249,
        ];
        let want_act = [
            2.8884673e-29f32, 3.2081596e-29, 1.1549086e-28, 3.2309342e-26, 9.598328e-22,
            7.120265e-14, 0.29335475, 0.5022214,
        ];

        let mut prev_act = 0.0f32;
        for i in 0..ge_inc.len() {
            nrn.ge_inc = ge_inc[i];
            ac.ge_gi_fm_inc(&mut nrn);
            ac.vm_fm_g(&mut nrn);
            ac.act_fm_g(&mut nrn);
            assert_close(nrn.ge, want_ge[i], "ge", i);
            assert_close(nrn.inet, want_inet[i], "inet", i);
            assert_close(nrn.vm, want_vm[i], "vm", i);
            assert_close(nrn.act, want_act[i], "act", i);
            assert!(nrn.act >= prev_act, "act must not decrease with rising drive");
            prev_act = nrn.act;
        }
    }

    #[test]
    fn test_hard_clamp_sets_act_and_skips_integration() {
        let ac = ActParams::default();
        let mut nrn = Neuron::default();
        ac.init_acts(&mut nrn);
        nrn.ext = 1.0;
        nrn.set_flag(NeuronFlags::HAS_EXT);
        nrn.ge = 5.0;
        ac.vm_fm_g(&mut nrn);
        ac.act_fm_g(&mut nrn);
        assert_eq!(nrn.act, 0.95, "clamped to the top of the clamp range");
        assert!((nrn.vm - (0.5 + 0.95 / 100.0)).abs() < 1e-6);
    }

    #[test]
    fn test_decay_state_full_resets_to_init() {
        let ac = ActParams::default();
        let mut nrn = Neuron {
            act: 0.8,
            ge: 0.6,
            gi: 0.4,
            vm: 0.9,
            ..Default::default()
        };
        ac.decay_state(&mut nrn, 1.0);
        assert_eq!(nrn.act, 0.0);
        assert_eq!(nrn.ge, 0.0);
        assert_eq!(nrn.gi, 0.0);
        assert!((nrn.vm - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_decay_state_clears_sent_and_raw_conductances() {
        let ac = ActParams::default();
        let sent = Neuron {
            act_sent: 0.7,
            ge_raw: 0.3,
            gi_raw: 0.2,
            gi_syn: 0.1,
            ..Default::default()
        };

        let mut full = sent.clone();
        ac.decay_state(&mut full, 1.0);
        assert_eq!(full.act_sent, 0.0);
        assert_eq!(full.ge_raw, 0.0);
        assert_eq!(full.gi_raw, 0.0);
        assert_eq!(full.gi_syn, 0.0);

        let mut half = sent;
        ac.decay_state(&mut half, 0.5);
        assert!((half.act_sent - 0.35).abs() < 1e-6);
        assert!((half.ge_raw - 0.15).abs() < 1e-6);
        assert!((half.gi_raw - 0.1).abs() < 1e-6);
        assert!((half.gi_syn - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_set_param_paths() {
        let mut ac = ActParams::default();
        ac.set_param("Gbar.L", 0.1).unwrap();
        ac.set_param("Dt.VmTau", 2.81).unwrap();
        ac.set_param("Clamp.Hard", 0.0).unwrap();
        ac.update();
        assert_eq!(ac.gbar.l, 0.1);
        assert!((ac.dt.vm_dt - 1.0 / 2.81).abs() < 1e-7);
        assert!(!ac.clamp.hard);
        assert!(ac.set_param("Gbar.Q", 1.0).is_err());
        assert!(ac.set_param("Nope.Thing", 1.0).is_err());
    }
}
