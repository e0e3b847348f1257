// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Conductance transfer from senders to receivers
//!
//! Senders only push activation *changes*. Each delta is scaled by the
//! projection's `gscale`, weighted per synapse and accumulated in `g_inc`;
//! the receiving layer folds `g_inc` into GeInc or GiInc once per cycle.

use super::Projection;
use crate::kinds::Channel;
use crate::layer::Layer;
use leabra_npu_neural::types::params::unknown;
use leabra_npu_neural::{Neuron, ParamSet, Result};
use serde::{Deserialize, Serialize};

/// Netinput scaling: absolute and relative strength of a projection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WtScaleParams {
    /// Absolute multiplier, not normalized across projections
    pub abs: f32,
    /// Relative share, normalized by the sum over all projections of the
    /// same channel into a layer
    pub rel: f32,
}

impl Default for WtScaleParams {
    fn default() -> Self {
        Self { abs: 1.0, rel: 1.0 }
    }
}

impl WtScaleParams {
    /// Scale that normalizes by the expected number of active senders,
    /// given the sending layer's average activity and this unit's fan-in
    pub fn slay_act_scale(&self, savg: f32, snu: f32, ncon: f32) -> f32 {
        if ncon < 1.0 {
            return 1.0;
        }
        let slay_act_n = (savg * snu).round().max(1.0);
        if ncon == snu {
            return 1.0 / slay_act_n;
        }
        let max_act_n = ncon.min(slay_act_n).trunc();
        let avg_act_n = (savg * ncon).round().max(1.0);
        let exp_act_n = (avg_act_n + 2.0).min(max_act_n);
        1.0 / exp_act_n
    }

    /// Abs * Rel times the sender activity scale
    pub fn full_scale(&self, savg: f32, snu: f32, ncon: f32) -> f32 {
        self.abs * self.rel * self.slay_act_scale(savg, snu, ncon)
    }
}

impl ParamSet for WtScaleParams {
    fn set_param(&mut self, path: &str, value: f32) -> Result<()> {
        match path {
            "Abs" => self.abs = value,
            "Rel" => self.rel = value,
            _ => return Err(unknown(path, "")),
        }
        Ok(())
    }

    fn update(&mut self) {}
}

impl Projection {
    /// Push one sender's activation delta to all its receivers
    #[inline]
    pub fn send_g_delta(&mut self, si: usize, delta: f32) {
        let scdel = delta * self.gscale;
        let st = self.s_con_idx_st[si] as usize;
        let nc = self.s_con_n[si] as usize;
        let syns = &self.syns[st..st + nc];
        let ris = &self.s_con_idx[st..st + nc];
        for (syn, &ri) in syns.iter().zip(ris) {
            self.g_inc[ri as usize] += scdel * syn.wt;
        }
    }

    /// Fold accumulated increments into the receivers and clear them
    pub fn recv_g_inc(&mut self, neurons: &mut [Neuron]) {
        match self.channel {
            Channel::Excitatory => {
                for (nrn, g) in neurons.iter_mut().zip(self.g_inc.iter_mut()) {
                    nrn.ge_inc += *g;
                    *g = 0.0;
                }
            }
            Channel::Inhibitory => {
                for (nrn, g) in neurons.iter_mut().zip(self.g_inc.iter_mut()) {
                    nrn.gi_inc += *g;
                    *g = 0.0;
                }
            }
        }
    }
}

/// Recompute `gscale` for all projections into one receiving layer.
///
/// `prjns` must be exactly the active projections whose receiver is the same
/// layer. Relative scales are normalized per channel so that the Rel values of
/// the excitatory inputs (and separately the inhibitory inputs) sum to one.
pub(crate) fn gscale_fm_avg_act(prjns: &mut [&mut Projection], layers: &[Layer]) {
    let mut tot_exc_rel = 0.0f32;
    let mut tot_inh_rel = 0.0f32;
    for pj in prjns.iter_mut() {
        let slay = &layers[pj.send];
        let savg = slay.pools[0].act_avg.act_p_avg_eff;
        let snu = slay.neurons.len() as f32;
        let ncon = pj.r_con_n_avg_max.avg;
        pj.gscale = pj.wt_scale.full_scale(savg, snu, ncon);
        match pj.channel {
            Channel::Excitatory => tot_exc_rel += pj.wt_scale.rel,
            Channel::Inhibitory => tot_inh_rel += pj.wt_scale.rel,
        }
    }
    for pj in prjns.iter_mut() {
        let tot = match pj.channel {
            Channel::Excitatory => tot_exc_rel,
            Channel::Inhibitory => tot_inh_rel,
        };
        if tot > 0.0 {
            pj.gscale /= tot;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slay_act_scale_full_connectivity() {
        let ws = WtScaleParams::default();
        // 10 senders at 20% activity, fully connected: 1 / round(2)
        assert!((ws.slay_act_scale(0.2, 10.0, 10.0) - 0.5).abs() < 1e-6);
        // no connections
        assert_eq!(ws.slay_act_scale(0.2, 10.0, 0.0), 1.0);
        // activity rounds to zero: floor of one active sender
        assert_eq!(ws.slay_act_scale(0.01, 10.0, 10.0), 1.0);
    }

    #[test]
    fn test_slay_act_scale_partial_connectivity() {
        let ws = WtScaleParams::default();
        // 100 senders at 15%, 20 cons: slayActN 15, maxActN 15, avgActN 3, expActN 5
        assert!((ws.slay_act_scale(0.15, 100.0, 20.0) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_full_scale_multiplies_abs_rel() {
        let ws = WtScaleParams { abs: 2.0, rel: 0.5 };
        assert!((ws.full_scale(0.5, 2.0, 2.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_params() {
        let mut ws = WtScaleParams::default();
        ws.set_param("Rel", 0.3).unwrap();
        assert_eq!(ws.rel, 0.3);
        assert!(ws.set_param("Bogus", 1.0).is_err());
    }
}
