// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Weight changes: XCAL delta computation, weight update, weight balance and
//! symmetric initialization. All of these run on the sending side of the
//! synapse array except weight balance, which walks the receiver index.

use super::Projection;
use crate::kinds::LayerType;
use leabra_npu_neural::{Neuron, NeuronFlags, Synapse};

impl Projection {
    /// Accumulate weight changes from the current sender/receiver averages
    pub fn dwt(&mut self, send: &[Neuron], recv: &[Neuron]) {
        if !self.learn.learn {
            return;
        }
        let lp = &self.learn;
        for (si, sn) in send.iter().enumerate().take(self.s_con_n.len()) {
            if sn.avg_s < lp.xcal.lrn_thr && sn.avg_m < lp.xcal.lrn_thr {
                continue;
            }
            let st = self.s_con_idx_st[si] as usize;
            let nc = self.s_con_n[si] as usize;
            let syns = &mut self.syns[st..st + nc];
            let ris = &self.s_con_idx[st..st + nc];
            for (sy, &ri) in syns.iter_mut().zip(ris) {
                let rn = &recv[ri as usize];
                let (mut err, mut bcm) =
                    lp.chl_dwt(sn.avg_s_lrn, sn.avg_m, rn.avg_s_lrn, rn.avg_m, rn.avg_l);
                bcm *= lp.xcal.long_lrate(rn.avg_l_lrn);
                err *= lp.xcal.m_lrn;
                let mut dwt = bcm + err;
                let norm = if lp.norm.on {
                    lp.norm.norm_fm_abs_dwt(&mut sy.norm, dwt.abs())
                } else {
                    1.0
                };
                if lp.momentum.on {
                    dwt = norm * lp.momentum.moment_fm_dwt(&mut sy.moment, dwt);
                } else {
                    dwt *= norm;
                }
                sy.dwt += lp.lrate * dwt;
            }
            // all of a sender's synapses share the max norm
            if lp.norm.on {
                let max_norm = syns.iter().fold(0.0f32, |m, sy| m.max(sy.norm));
                syns.iter_mut().for_each(|sy| sy.norm = max_norm);
            }
        }
    }

    /// Apply pending weight changes, scaled by the weight balance factors of
    /// each synapse's receiver when balance is on
    pub fn wt_fm_dwt(&mut self) {
        if !self.learn.learn {
            return;
        }
        let lp = &self.learn;
        if lp.wt_bal.on {
            for (sy, &ri) in self.syns.iter_mut().zip(self.s_con_idx.iter()) {
                let wb = &self.wb_recv[ri as usize];
                lp.wt_fm_dwt(wb.inc, wb.dec, sy);
            }
        } else {
            for sy in self.syns.iter_mut() {
                lp.wt_fm_dwt(1.0, 1.0, sy);
            }
        }
    }

    /// Recompute per-receiver balance factors from the average of the
    /// receiver's strong weights
    pub fn wt_bal_fm_wt(&mut self, recv_kind: LayerType, recv: &[Neuron]) {
        let lp = &self.learn;
        if !lp.learn || !lp.wt_bal.on || recv_kind == LayerType::Target {
            return;
        }
        for (ri, rn) in recv.iter().enumerate().take(self.r_con_n.len()) {
            let nc = self.r_con_n[ri] as usize;
            if nc <= 1 || rn.has_flag(NeuronFlags::HAS_TARG) {
                continue;
            }
            let st = self.r_con_idx_st[ri] as usize;
            let mut sum_wt = 0.0f32;
            let mut sum_n = 0usize;
            for &rsi in &self.r_syn_idx[st..st + nc] {
                let wt = self.syns[rsi as usize].wt;
                if wt >= lp.wt_bal.avg_thr {
                    sum_wt += wt;
                    sum_n += 1;
                }
            }
            let avg = if sum_n > 0 { sum_wt / sum_n as f32 } else { 0.0 };
            let wb = &mut self.wb_recv[ri];
            wb.avg = avg;
            (wb.fact, wb.inc, wb.dec) = lp.wt_bal.wt_bal(avg, rn.act_avg);
        }
    }

    /// Copy weights into the reciprocal projection, whose sender is this
    /// projection's receiver and vice versa
    pub fn init_wt_sym(&self, rpj: &mut Projection) {
        for si in 0..self.s_con_n.len() {
            let st = self.s_con_idx_st[si] as usize;
            let nc = self.s_con_n[si] as usize;
            for ci in 0..nc {
                let sy = &self.syns[st + ci];
                let rsi = self.s_con_idx[st + ci] as usize;
                if rsi >= rpj.s_con_n.len() {
                    continue;
                }
                let rsst = rpj.s_con_idx_st[rsi] as usize;
                let rsnc = rpj.s_con_n[rsi] as usize;
                for rci in 0..rsnc {
                    if rpj.s_con_idx[rsst + rci] as usize == si {
                        let rsy = &mut rpj.syns[rsst + rci];
                        rsy.wt = sy.wt;
                        rsy.lwt = sy.lwt;
                    }
                }
            }
        }
    }

    /// Symmetrize a projection from a layer onto itself. Pairs are visited
    /// in sender order, so the lower sender's weight wins.
    pub fn init_wt_sym_self(&mut self) {
        for si in 0..self.s_con_n.len() {
            let st = self.s_con_idx_st[si] as usize;
            let nc = self.s_con_n[si] as usize;
            for ci in 0..nc {
                let Synapse { wt, lwt, .. } = self.syns[st + ci];
                let ri = self.s_con_idx[st + ci] as usize;
                let rsst = self.s_con_idx_st[ri] as usize;
                let rsnc = self.s_con_n[ri] as usize;
                for rci in 0..rsnc {
                    if self.s_con_idx[rsst + rci] as usize == si {
                        let rsy = &mut self.syns[rsst + rci];
                        rsy.wt = wt;
                        rsy.lwt = lwt;
                    }
                }
            }
        }
    }
}
