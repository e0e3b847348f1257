// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Projections
//!
//! A projection connects a sending layer to a receiving layer and owns the
//! synapses between them, stored in sender-major order. The same edge set is
//! indexed twice:
//!
//! - sender-major: `s_con_n`, `s_con_idx_st`, `s_con_idx` (receiver ids)
//! - receiver-major: `r_con_n`, `r_con_idx_st`, `r_con_idx` (sender ids) and
//!   `r_syn_idx`, the offset of each receiver-side slot in `syns`
//!
//! so both directions are O(1) without duplicating synapse state.

pub mod learning;
pub mod transfer;

pub use transfer::WtScaleParams;

use crate::error::{EngineError, EngineResult};
use crate::kinds::{Channel, PrjnType};
use crate::pattern::ConnectivityPattern;
use crate::shape::Shape;
use leabra_npu_neural::types::params::{scoped, split_path, unknown};
use leabra_npu_neural::{AvgMax, LearnSynParams, ParamSet, Synapse, WtBalRecv, SYNAPSE_VARS};
use rand::Rng;
use std::sync::Arc;
use tracing::error;

pub struct Projection {
    /// `"{Send}To{Recv}"`
    pub name: String,
    /// Sending layer index
    pub send: usize,
    /// Receiving layer index
    pub recv: usize,
    pub kind: PrjnType,
    /// Resolved once from the kind at creation
    pub channel: Channel,
    /// Space-separated classes for parameter selectors
    pub class: String,
    pub off: bool,
    pub pattern: Option<Arc<dyn ConnectivityPattern>>,

    pub wt_scale: WtScaleParams,
    pub learn: LearnSynParams,

    pub r_con_n: Vec<u32>,
    pub r_con_n_avg_max: AvgMax,
    pub r_con_idx_st: Vec<u32>,
    pub r_con_idx: Vec<u32>,
    pub r_syn_idx: Vec<u32>,
    pub s_con_n: Vec<u32>,
    pub s_con_n_avg_max: AvgMax,
    pub s_con_idx_st: Vec<u32>,
    pub s_con_idx: Vec<u32>,

    /// Synapse state, one-to-one with `s_con_idx`
    pub syns: Vec<Synapse>,
    /// Conductance scale, computed at trial start from sender activity
    pub gscale: f32,
    /// Conductance increments per receiving unit, written by the sender
    pub(crate) g_inc: Vec<f32>,
    /// Weight balance state per receiving unit
    pub wb_recv: Vec<WtBalRecv>,

    built: bool,
}

impl Projection {
    pub fn new(
        name: String,
        send: usize,
        recv: usize,
        kind: PrjnType,
        channel: Channel,
        pattern: Option<Arc<dyn ConnectivityPattern>>,
    ) -> Self {
        Self {
            name,
            send,
            recv,
            kind,
            channel,
            class: String::new(),
            off: false,
            pattern,
            wt_scale: WtScaleParams::default(),
            learn: LearnSynParams::default(),
            r_con_n: Vec::new(),
            r_con_n_avg_max: AvgMax::default(),
            r_con_idx_st: Vec::new(),
            r_con_idx: Vec::new(),
            r_syn_idx: Vec::new(),
            s_con_n: Vec::new(),
            s_con_n_avg_max: AvgMax::default(),
            s_con_idx_st: Vec::new(),
            s_con_idx: Vec::new(),
            syns: Vec::new(),
            gscale: 1.0,
            g_inc: Vec::new(),
            wb_recv: Vec::new(),
            built: false,
        }
    }

    pub fn defaults(&mut self) {
        self.wt_scale = WtScaleParams::default();
        self.learn = LearnSynParams::default();
        self.gscale = 1.0;
    }

    pub fn update_params(&mut self) {
        self.wt_scale.update();
        self.learn.update();
    }

    /// Set a parameter by path relative to the projection, e.g. `"Learn.Lrate"`
    pub fn set_param(&mut self, path: &str, value: f32) -> EngineResult<()> {
        let (block, rest) = split_path(path);
        let res = match block {
            "WtScale" => self.wt_scale.set_param(rest, value),
            "Learn" => self.learn.set_param(rest, value),
            _ => return Err(scoped("Prjn", unknown(block, rest)).into()),
        };
        res.map_err(|e| scoped("Prjn", scoped(block, e)).into())
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Built and not switched off; phases only touch active projections
    pub fn is_active(&self) -> bool {
        self.built && !self.off
    }

    pub fn n_send(&self) -> usize {
        self.s_con_n.len()
    }

    pub fn n_recv(&self) -> usize {
        self.r_con_n.len()
    }

    /// Check everything needed for build is present
    pub fn validate(&self, send: Option<&Shape>, recv: Option<&Shape>) -> Result<(), String> {
        let mut emsg = String::new();
        if self.pattern.is_none() {
            emsg += "Pat is nil; ";
        }
        if recv.is_none() {
            emsg += "Recv is nil; ";
        }
        if send.is_none() {
            emsg += "Send is nil; ";
        }
        if emsg.is_empty() {
            Ok(())
        } else {
            Err(emsg)
        }
    }

    /// Build both index structures and allocate synapse state.
    ///
    /// A projection that is off builds nothing and stays inactive.
    pub fn build(&mut self, send: Option<&Shape>, recv: Option<&Shape>) -> Result<(), String> {
        self.built = false;
        if self.off {
            return Ok(());
        }
        self.validate(send, recv)
            .map_err(|e| format!("{}: {}", self.name, e))?;
        let (Some(ssh), Some(rsh), Some(pat)) = (send, recv, self.pattern.clone()) else {
            return Err(format!("{}: incomplete projection", self.name));
        };
        self.build_stru(ssh, rsh, pat.as_ref())?;

        let rlen = rsh.len();
        self.syns = vec![Synapse::default(); self.s_con_idx.len()];
        self.g_inc = vec![0.0; rlen];
        self.wb_recv = vec![WtBalRecv::default(); rlen];
        self.built = true;
        Ok(())
    }

    fn build_stru(
        &mut self,
        ssh: &Shape,
        rsh: &Shape,
        pat: &dyn ConnectivityPattern,
    ) -> Result<(), String> {
        let slen = ssh.len();
        let rlen = rsh.len();
        let cons = pat.connect(ssh, rsh, self.send == self.recv);
        if cons.send_n.len() != slen
            || cons.recv_n.len() != rlen
            || cons.bits.len() != slen * rlen
        {
            return Err(format!(
                "{}: pattern {} produced {}x{} connectivity for {}x{} layers",
                self.name,
                pat.name(),
                cons.send_n.len(),
                cons.recv_n.len(),
                slen,
                rlen
            ));
        }

        let tcons = set_n_idx_st(
            &cons.send_n,
            &mut self.s_con_n,
            &mut self.s_con_n_avg_max,
            &mut self.s_con_idx_st,
        );
        let tconr = set_n_idx_st(
            &cons.recv_n,
            &mut self.r_con_n,
            &mut self.r_con_n_avg_max,
            &mut self.r_con_idx_st,
        );
        if tconr != tcons {
            error!(
                "[LEABRA-BUILD] {} programmer error: total recv cons {} != total send cons {}",
                self.name, tconr, tcons
            );
        }

        self.r_con_idx = vec![0; tconr as usize];
        self.r_syn_idx = vec![0; tconr as usize];
        self.s_con_idx = vec![0; tcons as usize];
        // running count of filled sending slots per sender
        let mut s_con_fill = vec![0u32; slen];

        for ri in 0..rlen {
            let rtcn = self.r_con_n[ri];
            let rst = self.r_con_idx_st[ri];
            let mut rci = 0u32;
            for si in 0..slen {
                if !cons.is_connected(si, ri) {
                    continue;
                }
                if rci >= rtcn {
                    error!(
                        "[LEABRA-BUILD] {} programmer error: recv target total con number {} exceeded at recv idx {}, send idx {}",
                        self.name, rtcn, ri, si
                    );
                    break;
                }
                let sci = s_con_fill[si];
                let stcn = self.s_con_n[si];
                if sci >= stcn {
                    error!(
                        "[LEABRA-BUILD] {} programmer error: send target total con number {} exceeded at recv idx {}, send idx {}",
                        self.name, stcn, ri, si
                    );
                    break;
                }
                let sst = self.s_con_idx_st[si];
                self.r_con_idx[(rst + rci) as usize] = si as u32;
                self.s_con_idx[(sst + sci) as usize] = ri as u32;
                self.r_syn_idx[(rst + rci) as usize] = sst + sci;
                s_con_fill[si] += 1;
                rci += 1;
            }
        }
        Ok(())
    }

    /// Draw initial weights and reset learning / balance state
    pub fn init_wts<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for syn in self.syns.iter_mut() {
            self.learn.init_wts(syn, rng);
        }
        for wb in self.wb_recv.iter_mut() {
            wb.init();
        }
        self.init_g_inc();
    }

    pub fn init_g_inc(&mut self) {
        self.g_inc.iter_mut().for_each(|g| *g = 0.0);
    }

    /// Position in `syns` of the synapse from `si` to `ri`
    pub fn syn_index(&self, si: usize, ri: usize) -> EngineResult<usize> {
        if ri >= self.n_recv() {
            return Err(EngineError::IndexOutOfRange {
                what: "recv unit",
                index: ri,
                len: self.n_recv(),
            });
        }
        if si >= self.n_send() {
            return Err(EngineError::IndexOutOfRange {
                what: "send unit",
                index: si,
                len: self.n_send(),
            });
        }
        let st = self.r_con_idx_st[ri] as usize;
        let nc = self.r_con_n[ri] as usize;
        self.r_con_idx[st..st + nc]
            .iter()
            .position(|&s| s as usize == si)
            .map(|ci| self.r_syn_idx[st + ci] as usize)
            .ok_or(EngineError::SynapseNotFound { send: si, recv: ri })
    }

    pub fn syn_val(&self, var: &str, si: usize, ri: usize) -> EngineResult<f32> {
        let idx = self.syn_index(si, ri)?;
        Ok(self.syns[idx].var_by_name(var)?)
    }

    /// Set a synapse variable; setting `Wt` re-derives `LWt`
    pub fn set_syn_val(&mut self, var: &str, si: usize, ri: usize, value: f32) -> EngineResult<()> {
        let idx = self.syn_index(si, ri)?;
        let syn = &mut self.syns[idx];
        syn.set_var_by_name(var, value)?;
        if var == "Wt" {
            self.learn.lwt_fm_wt(syn);
        }
        Ok(())
    }

    /// One variable across all synapses, in sender-major order
    pub fn syn_vals(&self, var: &str) -> EngineResult<Vec<f32>> {
        if !SYNAPSE_VARS.contains(&var) {
            return Err(leabra_npu_neural::NeuralError::UnknownVariable(var.to_string()).into());
        }
        self.syns
            .iter()
            .map(|s| s.var_by_name(var).map_err(EngineError::from))
            .collect()
    }
}

/// Fill counts and start offsets from a count list; returns the total
fn set_n_idx_st(counts: &[u32], n: &mut Vec<u32>, avg_max: &mut AvgMax, idx_st: &mut Vec<u32>) -> u32 {
    n.clear();
    idx_st.clear();
    avg_max.init();
    let mut idx = 0u32;
    for (i, &nv) in counts.iter().enumerate() {
        n.push(nv);
        idx_st.push(idx);
        idx += nv;
        avg_max.update_val(nv as f32, i);
    }
    avg_max.calc_avg();
    idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{Full, OneToOne};

    fn built(pat: Arc<dyn ConnectivityPattern>, ns: usize, nr: usize) -> Projection {
        let mut pj = Projection::new(
            "AToB".into(),
            0,
            1,
            PrjnType::Forward,
            Channel::Excitatory,
            Some(pat),
        );
        pj.build(Some(&Shape::new(&[ns])), Some(&Shape::new(&[nr])))
            .unwrap();
        pj
    }

    #[test]
    fn test_build_indexes_agree() {
        let pj = built(Arc::new(Full::default()), 3, 2);
        assert_eq!(pj.syns.len(), 6);
        assert_eq!(pj.r_con_n, vec![3, 3]);
        assert_eq!(pj.s_con_n, vec![2, 2, 2]);
        for ri in 0..2 {
            let st = pj.r_con_idx_st[ri] as usize;
            for ci in 0..pj.r_con_n[ri] as usize {
                let si = pj.r_con_idx[st + ci] as usize;
                let syn = pj.r_syn_idx[st + ci] as usize;
                assert_eq!(pj.s_con_idx[syn] as usize, ri);
                let sst = pj.s_con_idx_st[si] as usize;
                assert!(syn >= sst && syn < sst + pj.s_con_n[si] as usize);
            }
        }
    }

    #[test]
    fn test_validate_reports_every_missing_piece() {
        let pj = Projection::new(
            "AToB".into(),
            0,
            1,
            PrjnType::Forward,
            Channel::Excitatory,
            None,
        );
        assert_eq!(
            pj.validate(None, None).unwrap_err(),
            "Pat is nil; Recv is nil; Send is nil; "
        );
    }

    #[test]
    fn test_off_projection_stays_inactive() {
        let mut pj = Projection::new(
            "AToB".into(),
            0,
            1,
            PrjnType::Forward,
            Channel::Excitatory,
            Some(Arc::new(Full::default())),
        );
        pj.off = true;
        let sh = Shape::new(&[2]);
        assert!(pj.build(Some(&sh), Some(&sh)).is_ok());
        assert!(!pj.is_active());
    }

    #[test]
    fn test_syn_val_lookup_and_errors() {
        let mut pj = built(Arc::new(OneToOne), 3, 3);
        pj.set_syn_val("Wt", 1, 1, 0.7).unwrap();
        assert_eq!(pj.syn_val("Wt", 1, 1).unwrap(), 0.7);
        assert!(pj.syn_val("LWt", 1, 1).unwrap() < 0.7);
        assert!(matches!(
            pj.syn_val("Wt", 0, 1),
            Err(EngineError::SynapseNotFound { send: 0, recv: 1 })
        ));
        assert!(matches!(
            pj.syn_val("Wt", 0, 5),
            Err(EngineError::IndexOutOfRange { .. })
        ));
        assert!(pj.syn_val("Bogus", 1, 1).is_err());
    }
}
