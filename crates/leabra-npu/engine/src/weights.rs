// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Weights Value Tables
//!
//! Learned state in a plain nested structure that any serde format can carry:
//!
//! ```text
//! NetWeights
//! └── LayerWeights  meta: ActMAvg, ActPAvg   units: ActAvg
//!     └── PrjnWeights  meta: GScale
//!         └── RecvWeights { ri, n, si[], wt[] }
//! ```
//!
//! Decoding is strict: every count must match the built network. A
//! projection or layer is validated in full before anything is written, so a
//! failed decode leaves that piece untouched.

use crate::error::{EngineError, EngineResult};
use crate::layer::Layer;
use crate::network::Network;
use crate::projection::Projection;
use leabra_npu_neural::NeuralError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

pub const META_ACT_M_AVG: &str = "ActMAvg";
pub const META_ACT_P_AVG: &str = "ActPAvg";
pub const META_GSCALE: &str = "GScale";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NetWeights {
    pub network: String,
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
    pub layers: Vec<LayerWeights>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayerWeights {
    pub layer: String,
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
    /// Per-unit variables by name, one value per neuron
    #[serde(default)]
    pub units: BTreeMap<String, Vec<f32>>,
    #[serde(default)]
    pub prjns: Vec<PrjnWeights>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PrjnWeights {
    /// Sending layer name
    pub from: String,
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
    pub rs: Vec<RecvWeights>,
}

/// Incoming weights of one receiving unit
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecvWeights {
    pub ri: usize,
    pub n: usize,
    pub si: Vec<usize>,
    pub wt: Vec<f32>,
}

fn meta_f32(meta: &BTreeMap<String, String>, key: &str) -> EngineResult<Option<f32>> {
    meta.get(key)
        .map(|v| {
            v.trim().parse::<f32>().map_err(|e| {
                EngineError::Param(NeuralError::InvalidParam {
                    path: key.to_string(),
                    reason: format!("{:?}: {}", v, e),
                })
            })
        })
        .transpose()
}

fn mismatch(what: String, expected: usize, actual: usize) -> EngineError {
    EngineError::LengthMismatch {
        what,
        expected,
        actual,
    }
}

impl Projection {
    /// Encode the weights, receiver by receiver; `from` names the sender
    pub fn weights(&self, from: &str) -> PrjnWeights {
        let mut meta = BTreeMap::new();
        meta.insert(META_GSCALE.to_string(), self.gscale.to_string());
        let rs = (0..self.n_recv())
            .map(|ri| {
                let st = self.r_con_idx_st[ri] as usize;
                let nc = self.r_con_n[ri] as usize;
                RecvWeights {
                    ri,
                    n: nc,
                    si: self.r_con_idx[st..st + nc].iter().map(|&s| s as usize).collect(),
                    wt: self.r_syn_idx[st..st + nc]
                        .iter()
                        .map(|&i| self.syns[i as usize].wt)
                        .collect(),
                }
            })
            .collect();
        PrjnWeights {
            from: from.to_string(),
            meta,
            rs,
        }
    }

    /// Decode weights into `Wt`, re-deriving `LWt`
    pub fn set_weights(&mut self, pw: &PrjnWeights) -> EngineResult<()> {
        if pw.rs.len() != self.n_recv() {
            return Err(mismatch(
                format!("{} recv units", self.name),
                self.n_recv(),
                pw.rs.len(),
            ));
        }
        let gscale = meta_f32(&pw.meta, META_GSCALE)?;

        let mut writes = Vec::with_capacity(self.syns.len());
        for rw in &pw.rs {
            if rw.ri >= self.n_recv() {
                return Err(EngineError::IndexOutOfRange {
                    what: "recv unit",
                    index: rw.ri,
                    len: self.n_recv(),
                });
            }
            if rw.si.len() != rw.wt.len() {
                return Err(mismatch(
                    format!("{} recv {} si/wt", self.name, rw.ri),
                    rw.si.len(),
                    rw.wt.len(),
                ));
            }
            let nc = self.r_con_n[rw.ri] as usize;
            if rw.n != nc || rw.si.len() != nc {
                return Err(mismatch(
                    format!("{} recv {} connections", self.name, rw.ri),
                    nc,
                    rw.si.len(),
                ));
            }
            for (&si, &wt) in rw.si.iter().zip(&rw.wt) {
                writes.push((self.syn_index(si, rw.ri)?, wt));
            }
        }

        for (idx, wt) in writes {
            let syn = &mut self.syns[idx];
            syn.wt = wt;
            self.learn.lwt_fm_wt(syn);
        }
        if let Some(g) = gscale {
            self.gscale = g;
        }
        debug!("[LEABRA-WTS] Loaded {} synapses into {}", self.syns.len(), self.name);
        Ok(())
    }
}

impl Layer {
    /// Encode the pool-level averages and per-unit `ActAvg`; projections
    /// are added by [`Network::weights`]
    pub fn weights(&self) -> LayerWeights {
        let mut meta = BTreeMap::new();
        if let Some(pl) = self.pools.first() {
            meta.insert(META_ACT_M_AVG.to_string(), pl.act_avg.act_m_avg.to_string());
            meta.insert(META_ACT_P_AVG.to_string(), pl.act_avg.act_p_avg.to_string());
        }
        let mut units = BTreeMap::new();
        units.insert(
            "ActAvg".to_string(),
            self.neurons.iter().map(|n| n.act_avg).collect(),
        );
        LayerWeights {
            layer: self.name.clone(),
            meta,
            units,
            prjns: Vec::new(),
        }
    }

    /// Decode layer meta and unit variables; `prjns` is ignored here
    pub fn set_weights(&mut self, lw: &LayerWeights) -> EngineResult<()> {
        let act_m = meta_f32(&lw.meta, META_ACT_M_AVG)?;
        let act_p = meta_f32(&lw.meta, META_ACT_P_AVG)?;
        for (var, vals) in &lw.units {
            if vals.len() != self.neurons.len() {
                return Err(mismatch(
                    format!("{} unit {}", self.name, var),
                    self.neurons.len(),
                    vals.len(),
                ));
            }
            // resolve the name before writing anything
            if let Some(nrn) = self.neurons.first() {
                nrn.var_by_name(var)?;
            }
        }

        for (var, vals) in &lw.units {
            for (nrn, &v) in self.neurons.iter_mut().zip(vals) {
                nrn.set_var_by_name(var, v)?;
            }
        }
        if let Some(pl) = self.pools.first_mut() {
            if let Some(m) = act_m {
                pl.act_avg.act_m_avg = m;
            }
            if let Some(p) = act_p {
                pl.act_avg.act_p_avg = p;
                self.inhib
                    .act_avg
                    .eff_fm_avg(&mut pl.act_avg.act_p_avg_eff, p);
            }
        }
        Ok(())
    }
}

impl Network {
    /// Encode every layer with its receiving projections
    pub fn weights(&self) -> NetWeights {
        let layers = self
            .layers
            .iter()
            .map(|ly| {
                let mut lw = ly.weights();
                lw.prjns = ly
                    .recv_prjns
                    .iter()
                    .map(|&pi| &self.prjns[pi])
                    .filter(|pj| pj.is_built())
                    .map(|pj| pj.weights(&self.layers[pj.send].name))
                    .collect();
                lw
            })
            .collect();
        NetWeights {
            network: self.name.clone(),
            meta: BTreeMap::new(),
            layers,
        }
    }

    /// Decode weights layer by layer.
    ///
    /// Layers and projections are matched by name. Layers absent from
    /// `nw` keep their current weights.
    pub fn set_weights(&mut self, nw: &NetWeights) -> EngineResult<()> {
        if !self.is_built() {
            return Err(EngineError::NotBuilt);
        }
        let mut n_prjns = 0;
        for lw in &nw.layers {
            let li = self.layer_index(&lw.layer)?;
            self.layers[li].set_weights(lw)?;
            for pw in &lw.prjns {
                let pi = self.layers[li]
                    .recv_prjns
                    .iter()
                    .copied()
                    .find(|&pi| self.layers[self.prjns[pi].send].name == pw.from)
                    .ok_or_else(|| EngineError::PrjnNotFound(format!("{}To{}", pw.from, lw.layer)))?;
                self.prjns[pi].set_weights(pw)?;
                n_prjns += 1;
            }
        }
        info!(
            "[LEABRA-WTS] Loaded weights for {}: {} layers, {} projections",
            self.name,
            nw.layers.len(),
            n_prjns
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::LayerType;

    fn net(seed: u64, hid: usize) -> Network {
        let mut net = Network::new("W");
        net.set_seed(seed);
        net.add_layer("In", &[3], LayerType::Input).unwrap();
        net.add_layer("Hid", &[hid], LayerType::Hidden).unwrap();
        net.connect_layer_names("In", "Hid", "Full", "Forward")
            .unwrap();
        net.build().unwrap();
        net.init_wts();
        net
    }

    #[test]
    fn test_prjn_weights_layout() {
        let n = net(1, 2);
        let pj = n.prjn_between("In", "Hid").unwrap();
        let pw = pj.weights("In");
        assert_eq!(pw.from, "In");
        assert_eq!(pw.rs.len(), 2);
        for rw in &pw.rs {
            assert_eq!(rw.n, 3);
            assert_eq!(rw.si, vec![0, 1, 2]);
            for (&si, &wt) in rw.si.iter().zip(&rw.wt) {
                assert_eq!(wt, pj.syn_val("Wt", si, rw.ri).unwrap());
            }
        }
        assert_eq!(pw.meta.get(META_GSCALE).map(String::as_str), Some("1"));
    }

    #[test]
    fn test_prjn_set_weights_rederives_lwt() {
        let mut n = net(1, 2);
        let mut pw = n.prjn_between("In", "Hid").unwrap().weights("In");
        pw.rs[1].wt[2] = 0.5;
        let pj = n.prjn_between_mut("In", "Hid").unwrap();
        pj.set_weights(&pw).unwrap();
        assert_eq!(pj.syn_val("Wt", 2, 1).unwrap(), 0.5);
        // sigmoid contrast is symmetric around 0.5
        assert!((pj.syn_val("LWt", 2, 1).unwrap() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_mismatch_leaves_weights_untouched() {
        let mut n = net(1, 2);
        let before = n.prjn_between("In", "Hid").unwrap().syn_vals("Wt").unwrap();
        let mut pw = n.prjn_between("In", "Hid").unwrap().weights("In");
        pw.rs[0].wt = vec![0.9; 3];
        pw.rs[1].si.pop();
        pw.rs[1].wt.pop();
        let pj = n.prjn_between_mut("In", "Hid").unwrap();
        assert!(matches!(
            pj.set_weights(&pw),
            Err(EngineError::LengthMismatch { expected: 3, actual: 2, .. })
        ));
        assert_eq!(pj.syn_vals("Wt").unwrap(), before);
    }

    #[test]
    fn test_unknown_sender_is_synapse_error() {
        let mut n = net(1, 2);
        let mut pw = n.prjn_between("In", "Hid").unwrap().weights("In");
        pw.rs[0].si[0] = 7;
        let pj = n.prjn_between_mut("In", "Hid").unwrap();
        assert!(matches!(
            pj.set_weights(&pw),
            Err(EngineError::IndexOutOfRange { what: "send unit", .. })
        ));
    }

    #[test]
    fn test_layer_meta_round_trip() {
        let mut n = net(1, 2);
        let ly = n.layer_by_name_mut("Hid").unwrap();
        ly.pools[0].act_avg.act_m_avg = 0.21;
        ly.pools[0].act_avg.act_p_avg = 0.3;
        ly.neurons[1].act_avg = 0.4;
        let lw = ly.weights();

        let mut fresh = net(2, 2);
        let fl = fresh.layer_by_name_mut("Hid").unwrap();
        fl.set_weights(&lw).unwrap();
        assert_eq!(fl.pools[0].act_avg.act_m_avg, 0.21);
        assert_eq!(fl.pools[0].act_avg.act_p_avg, 0.3);
        assert!((fl.pools[0].act_avg.act_p_avg_eff - 0.3).abs() < 1e-6);
        assert_eq!(fl.neurons[1].act_avg, 0.4);
    }

    #[test]
    fn test_layer_rejects_bad_units() {
        let mut n = net(1, 2);
        let ly = n.layer_by_name_mut("Hid").unwrap();
        let mut lw = ly.weights();
        lw.units.insert("Bogus".into(), vec![0.0; 2]);
        assert!(matches!(
            ly.set_weights(&lw),
            Err(EngineError::Param(NeuralError::UnknownVariable(_)))
        ));
        lw.units.remove("Bogus");
        lw.units.insert("ActAvg".into(), vec![0.0; 5]);
        assert!(matches!(ly.set_weights(&lw), Err(EngineError::LengthMismatch { .. })));
    }

    #[test]
    fn test_network_set_weights_checks_names() {
        let mut n = net(1, 2);
        let mut nw = n.weights();
        nw.layers[1].prjns[0].from = "Nowhere".into();
        assert!(matches!(n.set_weights(&nw), Err(EngineError::PrjnNotFound(_))));
        nw.layers[1].layer = "Gone".into();
        assert!(matches!(n.set_weights(&nw), Err(EngineError::LayerNotFound(_))));
    }

    #[test]
    fn test_net_weights_serialize() {
        let n = net(1, 2);
        let nw = n.weights();
        let json = serde_json::to_string(&nw).unwrap();
        let back: NetWeights = serde_json::from_str(&json).unwrap();
        assert_eq!(back, nw);
    }
}
