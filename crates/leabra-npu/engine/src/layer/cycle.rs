// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-cycle layer computation
//!
//! One network cycle runs these in order, each behind a barrier:
//! 1. `send_g_delta` (senders write into their projections' `g_inc`)
//! 2. `g_fm_inc` (receivers fold `g_inc` into conductances)
//! 3. `avg_max_ge`
//! 4. `inhib_fm_ge_act`
//! 5. `act_fm_g`
//! 6. `avg_max_act`
//!
//! None of these can fail and none allocate.

use super::Layer;
use crate::projection::Projection;
use leabra_npu_neural::{NoiseType, RandDist};
use std::sync::OnceLock;
use tracing::trace;

/// Runtime-gated tracing config for pool statistics.
/// Enable with:
/// - LEABRA_TRACE_CYCLE=1
/// Optional filter:
/// - LEABRA_TRACE_LAYER=<layer name>
struct CycleTraceCfg {
    enabled: bool,
    layer_filter: Option<String>,
}

fn cycle_trace_cfg() -> &'static CycleTraceCfg {
    static CFG: OnceLock<CycleTraceCfg> = OnceLock::new();
    CFG.get_or_init(|| {
        let enabled = std::env::var("LEABRA_TRACE_CYCLE")
            .ok()
            .as_deref()
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let layer_filter = std::env::var("LEABRA_TRACE_LAYER")
            .ok()
            .filter(|v| !v.is_empty());

        CycleTraceCfg {
            enabled,
            layer_filter,
        }
    })
}

impl Layer {
    /// Send activation changes above threshold to all sending projections.
    /// A neuron dropping below the send threshold un-sends its last value.
    pub fn send_g_delta(&mut self, send: &mut [&mut Projection]) {
        let opt = self.act.opt_thresh;
        for (ni, nrn) in self.neurons.iter_mut().enumerate() {
            if nrn.act > opt.send {
                let delta = nrn.act - nrn.act_sent;
                if delta.abs() > opt.delta {
                    for pj in send.iter_mut() {
                        pj.send_g_delta(ni, delta);
                    }
                    nrn.act_sent = nrn.act;
                }
            } else if nrn.act_sent > opt.send {
                let delta = -nrn.act_sent;
                for pj in send.iter_mut() {
                    pj.send_g_delta(ni, delta);
                }
                nrn.act_sent = 0.0;
            }
        }
    }

    /// Collect increments from all receiving projections and integrate
    /// the conductances
    pub fn g_fm_inc(&mut self, recv: &mut [&mut Projection]) {
        for pj in recv.iter_mut() {
            pj.recv_g_inc(&mut self.neurons);
        }
        let noise = self.act.noise;
        if noise.kind != NoiseType::None && !noise.trial_fixed && noise.rnd.dist != RandDist::None
        {
            for nrn in self.neurons.iter_mut() {
                nrn.noise = noise.gen(&mut self.rng);
            }
        }
        for nrn in self.neurons.iter_mut() {
            self.act.ge_gi_fm_inc(nrn);
        }
    }

    pub fn avg_max_ge(&mut self) {
        for pl in self.pools.iter_mut() {
            pl.ge.init();
            for ni in pl.range() {
                pl.ge.update_val(self.neurons[ni].ge, ni);
            }
            pl.ge.calc_avg();
        }
    }

    /// Pool-level FFFB inhibition plus each neuron's self and synaptic
    /// inhibition. Sub-pools never go below the layer-level value.
    pub fn inhib_fm_ge_act(&mut self) {
        let Some((lpl, sub)) = self.pools.split_first_mut() else {
            return;
        };
        self.inhib
            .layer
            .inhib(lpl.ge.avg, lpl.ge.max, lpl.act.avg, &mut lpl.inhib);
        if sub.is_empty() {
            for nrn in self.neurons[lpl.range()].iter_mut() {
                self.inhib.self_inhib.inhib(&mut nrn.gi_self, nrn.act);
                nrn.gi = lpl.inhib.gi + nrn.gi_self + nrn.gi_syn;
            }
            return;
        }
        let lay_gi = lpl.inhib.gi;
        for pl in sub.iter_mut() {
            self.inhib
                .pool
                .inhib(pl.ge.avg, pl.ge.max, pl.act.avg, &mut pl.inhib);
            pl.inhib.lay_gi = lay_gi;
            pl.inhib.gi = pl.inhib.gi.max(lay_gi);
            for nrn in self.neurons[pl.range()].iter_mut() {
                self.inhib.self_inhib.inhib(&mut nrn.gi_self, nrn.act);
                nrn.gi = pl.inhib.gi + nrn.gi_self + nrn.gi_syn;
            }
        }
    }

    /// Membrane potential, rate-code activation and learning averages
    pub fn act_fm_g(&mut self) {
        match &self.act_fn {
            Some(f) => {
                for nrn in self.neurons.iter_mut() {
                    self.act.vm_fm_g(nrn);
                    self.act.act_fm_g_with(nrn, f.as_ref());
                    self.learn.avgs_fm_act(nrn);
                }
            }
            None => {
                for nrn in self.neurons.iter_mut() {
                    self.act.vm_fm_g(nrn);
                    self.act.act_fm_g(nrn);
                    self.learn.avgs_fm_act(nrn);
                }
            }
        }
    }

    pub fn avg_max_act(&mut self) {
        for pl in self.pools.iter_mut() {
            pl.act.init();
            for ni in pl.range() {
                pl.act.update_val(self.neurons[ni].act, ni);
            }
            pl.act.calc_avg();
        }

        let cfg = cycle_trace_cfg();
        if cfg.enabled && cfg.layer_filter.as_deref().map_or(true, |n| n == self.name) {
            for (pi, pl) in self.pools.iter().enumerate() {
                trace!(
                    "[LEABRA-CYCLE] {} pool {}: ge avg={:.4} max={:.4} act avg={:.4} max={:.4} gi={:.4}",
                    self.name,
                    pi,
                    pl.ge.avg,
                    pl.ge.max,
                    pl.act.avg,
                    pl.act.max,
                    pl.inhib.gi
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::kinds::{Channel, LayerType, PrjnType};
    use crate::layer::Layer;
    use crate::pattern::OneToOne;
    use crate::projection::Projection;
    use crate::shape::Shape;
    use leabra_npu_neural::ActivationFunction;
    use std::sync::Arc;

    fn layer(n: usize) -> Layer {
        let mut ly = Layer::new("L", Shape::new(&[n]), LayerType::Hidden);
        ly.build().unwrap();
        ly.init_wts();
        ly
    }

    fn one_to_one(n: usize) -> Projection {
        let mut pj = Projection::new(
            "AToB".into(),
            0,
            1,
            PrjnType::Forward,
            Channel::Excitatory,
            Some(Arc::new(OneToOne)),
        );
        let sh = Shape::new(&[n]);
        pj.build(Some(&sh), Some(&sh)).unwrap();
        for s in pj.syns.iter_mut() {
            s.wt = 0.5;
        }
        pj
    }

    #[test]
    fn test_send_only_above_threshold_and_unsend() {
        let mut ly = layer(2);
        let mut pj = one_to_one(2);
        ly.neurons[0].act = 0.6;
        ly.neurons[1].act = 0.05;
        ly.send_g_delta(&mut [&mut pj]);
        assert!((pj.g_inc[0] - 0.3).abs() < 1e-6);
        assert_eq!(pj.g_inc[1], 0.0);
        assert_eq!(ly.neurons[0].act_sent, 0.6);

        // drop below threshold: the last sent value is withdrawn
        pj.init_g_inc();
        ly.neurons[0].act = 0.0;
        ly.send_g_delta(&mut [&mut pj]);
        assert!((pj.g_inc[0] + 0.3).abs() < 1e-6);
        assert_eq!(ly.neurons[0].act_sent, 0.0);
    }

    #[test]
    fn test_g_fm_inc_moves_increment_into_ge() {
        let mut ly = layer(1);
        let mut pj = one_to_one(1);
        pj.g_inc[0] = 0.4;
        ly.g_fm_inc(&mut [&mut pj]);
        assert_eq!(pj.g_inc[0], 0.0);
        assert_eq!(ly.neurons[0].ge_raw, 0.4);
        assert!(ly.neurons[0].ge > 0.0);
    }

    #[test]
    fn test_inhibitory_channel_goes_to_gi() {
        let mut ly = layer(1);
        let mut pj = one_to_one(1);
        pj.channel = Channel::Inhibitory;
        pj.g_inc[0] = 0.4;
        ly.g_fm_inc(&mut [&mut pj]);
        assert_eq!(ly.neurons[0].ge_raw, 0.0);
        assert_eq!(ly.neurons[0].gi_raw, 0.4);
        assert!(ly.neurons[0].gi_syn > 0.0);
    }

    #[test]
    fn test_sub_pool_inhibition_floors_at_layer() {
        let mut ly = Layer::new("P", Shape::new(&[1, 2, 1, 2]), LayerType::Hidden);
        ly.inhib.pool.on = true;
        ly.build().unwrap();
        ly.init_wts();
        for (i, nrn) in ly.neurons.iter_mut().enumerate() {
            nrn.ge = if i < 2 { 0.8 } else { 0.0 };
        }
        ly.avg_max_ge();
        ly.inhib_fm_ge_act();
        let lay_gi = ly.pools[0].inhib.gi;
        assert!(lay_gi > 0.0);
        assert!(ly.pools[1].inhib.gi >= lay_gi);
        assert_eq!(ly.pools[2].inhib.gi, lay_gi);
        assert_eq!(ly.neurons[3].gi, lay_gi);
    }

    struct Step;

    impl ActivationFunction for Step {
        fn activation(&self, x: f32) -> f32 {
            if x > 0.0 {
                1.0
            } else {
                0.0
            }
        }
    }

    #[test]
    fn test_custom_activation_function() {
        let mut ly = layer(1);
        ly.set_activation_fn(Arc::new(Step));
        ly.neurons[0].ge = 1.0;
        ly.neurons[0].vm = 0.9;
        ly.act_fm_g();
        // first-order approach toward the step output
        let expect = ly.act.dt.integ * ly.act.dt.vm_dt;
        assert!((ly.neurons[0].act - expect).abs() < 1e-6);
    }
}
