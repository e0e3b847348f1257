// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Trial start, end-of-quarter snapshots and layer statistics

use super::Layer;
use crate::kinds::LayerType;
use crate::time::{Time, MINUS_PHASE_QUARTER, PLUS_PHASE_QUARTER};
use leabra_npu_neural::{NeuronFlags, NoiseType, RandDist};

impl Layer {
    /// First part of trial init: long-term averages and pool activity
    /// averages. Runs before the network recomputes projection scales.
    pub fn trial_init_avgs(&mut self) {
        self.avg_l_fm_avg_m();
        let aa = self.inhib.act_avg;
        for pl in self.pools.iter_mut() {
            aa.avg_fm_act(&mut pl.act_avg.act_m_avg, pl.act_m.avg);
            aa.avg_fm_act(&mut pl.act_avg.act_p_avg, pl.act_p.avg);
            aa.eff_fm_avg(&mut pl.act_avg.act_p_avg_eff, pl.act_avg.act_p_avg);
        }
    }

    /// Second part of trial init: fixed noise, state decay and hard clamping
    pub fn trial_init_state(&mut self) {
        let noise = self.act.noise;
        if noise.kind != NoiseType::None && noise.trial_fixed && noise.rnd.dist != RandDist::None {
            self.gen_noise();
        }
        self.decay_state(self.act.init.decay);
        if self.act.clamp.hard && self.kind == LayerType::Input {
            self.hard_clamp();
        }
    }

    /// Update AvgL and its learning factor, modulated by layer error when on
    pub fn avg_l_fm_avg_m(&mut self) {
        let err_mod = self.learn.avg_l.err_mod;
        let mod_lrn = self.cos_diff.mod_avg_l_lrn;
        for nrn in self.neurons.iter_mut() {
            self.learn.avg_l_fm_avg_m(nrn);
            if err_mod {
                nrn.avg_l_lrn *= mod_lrn;
            }
        }
    }

    pub fn gen_noise(&mut self) {
        for nrn in self.neurons.iter_mut() {
            nrn.noise = self.act.noise.gen(&mut self.rng);
        }
    }

    /// Decay neuron state and pool activity / inhibition by `decay`
    pub fn decay_state(&mut self, decay: f32) {
        for nrn in self.neurons.iter_mut() {
            self.act.decay_state(nrn, decay);
        }
        // pool activity has to decay along with the neurons for inhibition
        for pl in self.pools.iter_mut() {
            pl.act.max -= decay * pl.act.max;
            pl.act.avg -= decay * pl.act.avg;
            pl.inhib.decay(decay);
        }
    }

    pub fn hard_clamp(&mut self) {
        for nrn in self.neurons.iter_mut() {
            self.act.hard_clamp(nrn);
        }
    }

    /// Capture phase activations at the end of quarters 2 and 3
    pub fn quarter_final(&mut self, time: &Time) {
        match time.quarter {
            MINUS_PHASE_QUARTER => {
                for pl in self.pools.iter_mut() {
                    pl.act_m = pl.act;
                }
                for nrn in self.neurons.iter_mut() {
                    nrn.act_m = nrn.act;
                    // targets are clamped during the plus phase
                    if nrn.has_flag(NeuronFlags::HAS_TARG) {
                        nrn.ext = nrn.targ;
                        nrn.set_flag(NeuronFlags::HAS_EXT);
                    }
                }
            }
            PLUS_PHASE_QUARTER => {
                for pl in self.pools.iter_mut() {
                    pl.act_p = pl.act;
                }
                let avg_dt = self.act.dt.avg_dt;
                for nrn in self.neurons.iter_mut() {
                    nrn.act_p = nrn.act;
                    nrn.act_dif = nrn.act_p - nrn.act_m;
                    nrn.act_avg += avg_dt * (nrn.act - nrn.act_avg);
                }
                self.cos_diff_fm_acts();
            }
            _ => {}
        }
    }

    /// Cosine between zero-meaned minus and plus phase activations,
    /// feeding the running error estimate that scales BCM learning
    pub fn cos_diff_fm_acts(&mut self) {
        let avg_m = self.pools[0].act_m.avg;
        let avg_p = self.pools[0].act_p.avg;
        let mut cosv = 0.0f32;
        let mut ssm = 0.0f32;
        let mut ssp = 0.0f32;
        for nrn in self.neurons.iter() {
            let ap = nrn.act_p - avg_p;
            let am = nrn.act_m - avg_m;
            cosv += ap * am;
            ssm += am * am;
            ssp += ap * ap;
        }
        let dist = (ssm * ssp).sqrt();
        if dist != 0.0 {
            cosv /= dist;
        }
        let cd = &mut self.cos_diff;
        cd.cos = cosv;
        self.learn
            .cos_diff
            .avg_var_fm_cos(&mut cd.avg, &mut cd.var, cd.cos);

        if self.kind == LayerType::Hidden {
            cd.avg_lrn = 1.0 - cd.avg;
            cd.mod_avg_l_lrn = self.learn.avg_l.err_mod_fm_lay_err(cd.avg_lrn);
        } else {
            cd.avg_lrn = 0.0;
            cd.mod_avg_l_lrn = 0.0;
        }
    }

    /// Sum and mean of squared ActP - ActM, counting only units whose
    /// difference reaches `tol`
    pub fn sse(&self, tol: f32) -> (f32, f32) {
        let nn = self.neurons.len();
        if nn == 0 {
            return (0.0, 0.0);
        }
        let sse: f32 = self
            .neurons
            .iter()
            .map(|n| n.act_p - n.act_m)
            .filter(|d| d.abs() >= tol)
            .map(|d| d * d)
            .sum();
        (sse, sse / nn as f32)
    }
}
