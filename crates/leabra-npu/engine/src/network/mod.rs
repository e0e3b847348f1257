// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Network
//!
//! Owns the layer list, the projection arena and the phase scheduler.
//!
//! ## Trial sequence
//! ```text
//! init_ext → apply_ext → trial_init
//! 4 × quarter { cyc_per_qtr × cycle; quarter_final }
//! dwt → wt_fm_dwt
//! ```
//! Every step is one or more barrier-separated phases; see [`scheduler`].

pub mod scheduler;

pub use scheduler::PhaseTiming;

use crate::error::{EngineError, EngineResult};
use crate::kinds::{KindRegistry, LayerType, PrjnType};
use crate::layer::Layer;
use crate::pattern::{ConnectivityPattern, PatternRegistry};
use crate::projection::transfer::gscale_fm_avg_act;
use crate::projection::Projection;
use crate::shape::Shape;
use crate::time::{Time, QUARTERS_PER_TRIAL};
use ahash::AHashMap;
use rand::rngs::StdRng;
use rand::SeedableRng;
use scheduler::{PrjnOwner, Scheduler};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default number of `wt_fm_dwt` calls between weight balance updates
pub const DEFAULT_WT_BAL_INTERVAL: usize = 10;

/// Offset separating projection RNG streams from layer streams
const PRJN_STREAM_BASE: u64 = 1 << 32;

pub struct Network {
    pub name: String,
    pub(crate) layers: Vec<Layer>,
    pub(crate) prjns: Vec<Projection>,
    layer_map: AHashMap<String, usize>,
    pub(crate) kinds: KindRegistry,
    patterns: PatternRegistry,

    /// Number of `wt_fm_dwt` calls between `wt_bal_fm_wt` updates
    pub wt_bal_interval: usize,
    wt_bal_ctr: usize,

    seed: u64,
    /// 0 keeps each layer's own thread assignment
    threads: usize,
    slow_phase_warn: Duration,
    scheduler: Option<Scheduler>,
}

impl Network {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            layers: Vec::new(),
            prjns: Vec::new(),
            layer_map: AHashMap::new(),
            kinds: KindRegistry::new(),
            patterns: PatternRegistry::new(),
            wt_bal_interval: DEFAULT_WT_BAL_INTERVAL,
            wt_bal_ctr: 0,
            seed: 1,
            threads: 0,
            slow_phase_warn: Duration::ZERO,
            scheduler: None,
        }
    }

    // ---------------------------------------------------------------------
    // Configuration
    // ---------------------------------------------------------------------

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Seed for weight init and noise; takes effect at the next `init_wts`
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
    }

    /// Worker thread override; 0 uses each layer's `thread` field.
    /// Rebuilds the scheduler if the network is already built.
    pub fn set_threads(&mut self, threads: usize) -> EngineResult<()> {
        self.threads = threads;
        if self.scheduler.is_some() {
            self.scheduler = Some(Scheduler::new(
                &self.layers,
                self.threads,
                self.slow_phase_warn,
            )?);
        }
        Ok(())
    }

    /// Phases slower than this are logged as warnings; zero disables
    pub fn set_slow_phase_warn(&mut self, slow: Duration) {
        self.slow_phase_warn = slow;
        if let Some(sched) = self.scheduler.as_mut() {
            sched.set_slow_warn(slow);
        }
    }

    pub fn n_threads(&self) -> usize {
        self.scheduler.as_ref().map_or(0, |s| s.n_threads())
    }

    pub fn kinds(&self) -> &KindRegistry {
        &self.kinds
    }

    /// Register extension projection kinds here before connecting
    pub fn kinds_mut(&mut self) -> &mut KindRegistry {
        &mut self.kinds
    }

    pub fn patterns(&self) -> &PatternRegistry {
        &self.patterns
    }

    pub fn patterns_mut(&mut self) -> &mut PatternRegistry {
        &mut self.patterns
    }

    /// Reset every layer and projection to default parameters
    pub fn defaults(&mut self) {
        self.wt_bal_interval = DEFAULT_WT_BAL_INTERVAL;
        self.wt_bal_ctr = 0;
        for (li, ly) in self.layers.iter_mut().enumerate() {
            ly.defaults();
            ly.index = li;
        }
        for pj in self.prjns.iter_mut() {
            pj.defaults();
        }
    }

    /// Recompute derived parameters everywhere
    pub fn update_params(&mut self) {
        for ly in self.layers.iter_mut() {
            ly.update_params();
        }
        for pj in self.prjns.iter_mut() {
            pj.update_params();
        }
    }

    // ---------------------------------------------------------------------
    // Construction
    // ---------------------------------------------------------------------

    pub fn add_layer(&mut self, name: &str, shape: &[usize], kind: LayerType) -> EngineResult<usize> {
        if self.layer_map.contains_key(name) {
            return Err(EngineError::DuplicateLayer(name.to_string()));
        }
        let li = self.layers.len();
        let mut ly = Layer::new(name, Shape::new(shape), kind);
        ly.index = li;
        self.layers.push(ly);
        self.layer_map.insert(name.to_string(), li);
        self.scheduler = None;
        Ok(li)
    }

    pub fn add_layer_2d(&mut self, name: &str, y: usize, x: usize, kind: LayerType) -> EngineResult<usize> {
        self.add_layer(name, &[y, x], kind)
    }

    /// 4-D layer of `pool_y × pool_x` unit groups, each `nrn_y × nrn_x`
    pub fn add_layer_4d(
        &mut self,
        name: &str,
        pool_y: usize,
        pool_x: usize,
        nrn_y: usize,
        nrn_x: usize,
        kind: LayerType,
    ) -> EngineResult<usize> {
        self.add_layer(name, &[pool_y, pool_x, nrn_y, nrn_x], kind)
    }

    /// Connect two layers by index; returns the projection's arena index
    pub fn connect_layers(
        &mut self,
        send: usize,
        recv: usize,
        pattern: Arc<dyn ConnectivityPattern>,
        kind: PrjnType,
    ) -> EngineResult<usize> {
        let n = self.layers.len();
        if send >= n {
            return Err(EngineError::LayerNotFound(format!("index {}", send)));
        }
        if recv >= n {
            return Err(EngineError::LayerNotFound(format!("index {}", recv)));
        }
        let name = format!("{}To{}", self.layers[send].name, self.layers[recv].name);
        let channel = self.kinds.channel_of(kind);
        let pi = self.prjns.len();
        self.prjns
            .push(Projection::new(name, send, recv, kind, channel, Some(pattern)));
        self.layers[send].send_prjns.push(pi);
        self.layers[recv].recv_prjns.push(pi);
        self.scheduler = None;
        Ok(pi)
    }

    /// Connect by layer, pattern and kind names
    pub fn connect_layer_names(
        &mut self,
        send: &str,
        recv: &str,
        pattern: &str,
        kind: &str,
    ) -> EngineResult<usize> {
        let si = self.layer_index(send)?;
        let ri = self.layer_index(recv)?;
        let pat = self.patterns.create(pattern)?;
        let kind = PrjnType::from_name(kind, &self.kinds)?;
        self.connect_layers(si, ri, pat, kind)
    }

    /// Forward projection plus a back projection in the other direction
    pub fn bidir_connect_layer_names(
        &mut self,
        low: &str,
        high: &str,
        pattern: &str,
    ) -> EngineResult<(usize, usize)> {
        let fwd = self.connect_layer_names(low, high, pattern, "Forward")?;
        let back = self.connect_layer_names(high, low, pattern, "Back")?;
        Ok((fwd, back))
    }

    // ---------------------------------------------------------------------
    // Lookup
    // ---------------------------------------------------------------------

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn prjns(&self) -> &[Projection] {
        &self.prjns
    }

    pub fn layer_index(&self, name: &str) -> EngineResult<usize> {
        self.layer_map
            .get(name)
            .copied()
            .ok_or_else(|| EngineError::LayerNotFound(name.to_string()))
    }

    pub fn layer(&self, li: usize) -> EngineResult<&Layer> {
        self.layers
            .get(li)
            .ok_or_else(|| EngineError::LayerNotFound(format!("index {}", li)))
    }

    pub fn layer_mut(&mut self, li: usize) -> EngineResult<&mut Layer> {
        self.layers
            .get_mut(li)
            .ok_or_else(|| EngineError::LayerNotFound(format!("index {}", li)))
    }

    pub fn layer_by_name(&self, name: &str) -> EngineResult<&Layer> {
        let li = self.layer_index(name)?;
        Ok(&self.layers[li])
    }

    pub fn layer_by_name_mut(&mut self, name: &str) -> EngineResult<&mut Layer> {
        let li = self.layer_index(name)?;
        Ok(&mut self.layers[li])
    }

    pub fn prjn(&self, pi: usize) -> EngineResult<&Projection> {
        self.prjns
            .get(pi)
            .ok_or_else(|| EngineError::PrjnNotFound(format!("index {}", pi)))
    }

    pub fn prjn_mut(&mut self, pi: usize) -> EngineResult<&mut Projection> {
        self.prjns
            .get_mut(pi)
            .ok_or_else(|| EngineError::PrjnNotFound(format!("index {}", pi)))
    }

    /// Projection into `recv` from `send`, by layer names
    pub fn prjn_between(&self, send: &str, recv: &str) -> EngineResult<&Projection> {
        let pi = self.prjn_index_between(send, recv)?;
        Ok(&self.prjns[pi])
    }

    pub fn prjn_between_mut(&mut self, send: &str, recv: &str) -> EngineResult<&mut Projection> {
        let pi = self.prjn_index_between(send, recv)?;
        Ok(&mut self.prjns[pi])
    }

    fn prjn_index_between(&self, send: &str, recv: &str) -> EngineResult<usize> {
        let si = self.layer_index(send)?;
        let ri = self.layer_index(recv)?;
        self.layers[ri]
            .recv_prjns
            .iter()
            .copied()
            .find(|&pi| self.prjns[pi].send == si)
            .ok_or_else(|| EngineError::PrjnNotFound(format!("{}To{}", send, recv)))
    }

    pub fn is_built(&self) -> bool {
        self.scheduler.is_some()
    }

    // ---------------------------------------------------------------------
    // Build and init
    // ---------------------------------------------------------------------

    /// Allocate all layers and projections and set up the thread buckets.
    ///
    /// Every failure is collected; the network is still usable afterwards
    /// with the failing pieces skipped.
    pub fn build(&mut self) -> EngineResult<()> {
        let mut errs: Vec<String> = Vec::new();
        for (li, ly) in self.layers.iter_mut().enumerate() {
            ly.index = li;
            if ly.off {
                continue;
            }
            if let Err(e) = ly.build() {
                errs.push(e);
            }
        }
        for pj in self.prjns.iter_mut() {
            let send = self.layers.get(pj.send).map(|ly| &ly.shape);
            let recv = self.layers.get(pj.recv).map(|ly| &ly.shape);
            if let Err(e) = pj.build(send, recv) {
                errs.push(e);
            }
        }

        let n_syns: usize = self.prjns.iter().map(|pj| pj.syns.len()).sum();
        let n_units: usize = self.layers.iter().map(|ly| ly.neurons.len()).sum();
        info!(
            "[LEABRA-BUILD] Built network {}: {} layers, {} units, {} projections, {} synapses",
            self.name,
            self.layers.len(),
            n_units,
            self.prjns.len(),
            n_syns
        );
        for pj in self.prjns.iter().filter(|pj| pj.is_built()) {
            debug!(
                "[LEABRA-BUILD] {}: {} synapses, recv fan-in avg {:.1} max {}",
                pj.name,
                pj.syns.len(),
                pj.r_con_n_avg_max.avg,
                pj.r_con_n_avg_max.max
            );
        }

        self.scheduler = Some(Scheduler::new(
            &self.layers,
            self.threads,
            self.slow_phase_warn,
        )?);

        if errs.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Build(errs))
        }
    }

    /// Initialize weights and all long-term state, then enforce weight
    /// symmetry between reciprocal projections
    pub fn init_wts(&mut self) {
        if !self.is_built() {
            warn!("[LEABRA-WTS] init_wts called before build on {}", self.name);
            return;
        }
        self.wt_bal_ctr = 0;
        for (pi, pj) in self.prjns.iter_mut().enumerate() {
            if !pj.is_active() || self.layers[pj.send].off || self.layers[pj.recv].off {
                continue;
            }
            let mut rng = StdRng::seed_from_u64(stream_seed(self.seed, PRJN_STREAM_BASE + pi as u64));
            pj.init_wts(&mut rng);
        }
        for (li, ly) in self.layers.iter_mut().enumerate() {
            if ly.off {
                continue;
            }
            ly.seed_rng(stream_seed(self.seed, li as u64));
            ly.init_wts();
        }
        self.init_wt_sym();
    }

    /// Copy weights from lower to higher layers' reciprocal projections
    fn init_wt_sym(&mut self) {
        for pi in 0..self.prjns.len() {
            let pj = &self.prjns[pi];
            if !pj.is_active() || !pj.learn.wt_init.sym {
                continue;
            }
            let (send, recv) = (pj.send, pj.recv);
            if self.layers[send].off || self.layers[recv].off || recv < send {
                continue;
            }
            // reciprocal: received by our sender, sent by our receiver
            let Some(rpi) = self.layers[send]
                .recv_prjns
                .iter()
                .copied()
                .find(|&r| {
                    let rp = &self.prjns[r];
                    rp.send == recv && rp.is_active() && rp.learn.wt_init.sym
                })
            else {
                continue;
            };
            if rpi == pi {
                self.prjns[pi].init_wt_sym_self();
            } else {
                let (pj, rpj) = pair_mut(&mut self.prjns, pi, rpi);
                pj.init_wt_sym(rpj);
            }
            debug!(
                "[LEABRA-WTS] symmetric weights {} -> {}",
                self.prjns[pi].name, self.prjns[rpi].name
            );
        }
    }

    pub fn init_acts(&mut self) {
        for ly in self.layers.iter_mut().filter(|ly| !ly.off) {
            ly.init_acts();
        }
    }

    pub fn init_ext(&mut self) {
        for ly in self.layers.iter_mut().filter(|ly| !ly.off) {
            ly.init_ext();
        }
    }

    // ---------------------------------------------------------------------
    // Phases
    // ---------------------------------------------------------------------

    /// Start-of-trial updates: running averages, conductance scales,
    /// state decay and hard clamping of inputs
    pub fn trial_init(&mut self) {
        let Some(sched) = self.scheduler.as_mut() else {
            return;
        };
        sched.layer_phase("TrialInitAvgs", &mut self.layers, |ly| ly.trial_init_avgs());
        sched.prjn_group_phase(
            "GScaleFmAvgAct",
            &self.layers,
            &mut self.prjns,
            PrjnOwner::Recv,
            gscale_fm_avg_act,
        );
        sched.layer_phase("TrialInitState", &mut self.layers, |ly| ly.trial_init_state());
    }

    /// One cycle of activation updating
    pub fn cycle(&mut self) {
        let Some(sched) = self.scheduler.as_mut() else {
            return;
        };
        sched.layer_prjn_phase(
            "SendGDelta",
            &mut self.layers,
            &mut self.prjns,
            PrjnOwner::Send,
            |ly, pjs| ly.send_g_delta(pjs),
        );
        sched.layer_prjn_phase(
            "GFmInc",
            &mut self.layers,
            &mut self.prjns,
            PrjnOwner::Recv,
            |ly, pjs| ly.g_fm_inc(pjs),
        );
        sched.layer_phase("AvgMaxGe", &mut self.layers, |ly| ly.avg_max_ge());
        sched.layer_phase("InhibFmGeAct", &mut self.layers, |ly| ly.inhib_fm_ge_act());
        sched.layer_phase("ActFmG", &mut self.layers, |ly| ly.act_fm_g());
        sched.layer_phase("AvgMaxAct", &mut self.layers, |ly| ly.avg_max_act());
    }

    pub fn quarter_final(&mut self, time: &Time) {
        let Some(sched) = self.scheduler.as_mut() else {
            return;
        };
        sched.layer_phase("QuarterFinal", &mut self.layers, |ly| ly.quarter_final(time));
    }

    /// Compute weight changes on every sending projection
    pub fn dwt(&mut self) {
        let Some(sched) = self.scheduler.as_mut() else {
            return;
        };
        sched.prjn_group_phase(
            "DWt",
            &self.layers,
            &mut self.prjns,
            PrjnOwner::Send,
            |pjs, layers| {
                for pj in pjs.iter_mut() {
                    let (s, r) = (pj.send, pj.recv);
                    pj.dwt(&layers[s].neurons, &layers[r].neurons);
                }
            },
        );
    }

    /// Apply weight changes; every `wt_bal_interval` calls also updates
    /// the weight balance factors
    pub fn wt_fm_dwt(&mut self) {
        let Some(sched) = self.scheduler.as_mut() else {
            return;
        };
        sched.prjn_group_phase(
            "WtFmDWt",
            &self.layers,
            &mut self.prjns,
            PrjnOwner::Send,
            |pjs, _| {
                for pj in pjs.iter_mut() {
                    pj.wt_fm_dwt();
                }
            },
        );
        self.wt_bal_ctr += 1;
        if self.wt_bal_ctr >= self.wt_bal_interval {
            self.wt_bal_ctr = 0;
            self.wt_bal_fm_wt();
        }
    }

    pub fn wt_bal_fm_wt(&mut self) {
        let Some(sched) = self.scheduler.as_mut() else {
            return;
        };
        sched.prjn_group_phase(
            "WtBalFmWt",
            &self.layers,
            &mut self.prjns,
            PrjnOwner::Recv,
            |pjs, layers| {
                for pj in pjs.iter_mut() {
                    let rl = &layers[pj.recv];
                    pj.wt_bal_fm_wt(rl.kind, &rl.neurons);
                }
            },
        );
    }

    /// Run one full trial: apply inputs, four quarters of cycles and,
    /// when `train` is set, learning.
    ///
    /// `inputs` pairs layer names with one value per unit.
    pub fn run_trial(&mut self, time: &mut Time, inputs: &[(&str, &[f32])], train: bool) -> EngineResult<()> {
        if !self.is_built() {
            return Err(EngineError::NotBuilt);
        }
        self.init_ext();
        for (name, values) in inputs {
            self.layer_by_name_mut(name)?.apply_ext(values)?;
        }
        self.trial_init();
        time.trial_start();
        for _ in 0..QUARTERS_PER_TRIAL {
            for _ in 0..time.cyc_per_qtr {
                self.cycle();
                time.cycle_inc();
            }
            self.quarter_final(time);
            time.quarter_inc();
        }
        if train {
            self.dwt();
            self.wt_fm_dwt();
        }
        Ok(())
    }

    /// Sum of per-layer SSE over the named layers
    pub fn sse(&self, layers: &[&str], tol: f32) -> EngineResult<f32> {
        let mut sum = 0.0;
        for name in layers {
            sum += self.layer_by_name(name)?.sse(tol).0;
        }
        Ok(sum)
    }

    // ---------------------------------------------------------------------
    // Timing
    // ---------------------------------------------------------------------

    pub fn timer_report(&self) -> Vec<PhaseTiming> {
        self.scheduler
            .as_ref()
            .map(|s| s.timer_report())
            .unwrap_or_default()
    }

    pub fn reset_timers(&mut self) {
        if let Some(sched) = self.scheduler.as_mut() {
            sched.reset_timers();
        }
    }

    /// Log the phase timers at info level
    pub fn log_timer_report(&self) {
        for t in self.timer_report() {
            info!(
                "[LEABRA-SCHED] {:<16} calls={:<8} total={:.3}ms avg={:.1}us",
                t.name,
                t.calls,
                t.total.as_secs_f64() * 1000.0,
                t.avg().as_secs_f64() * 1e6
            );
        }
    }
}

/// Independent RNG stream per layer / projection so that thread count and
/// visiting order never change the random draws
fn stream_seed(seed: u64, stream: u64) -> u64 {
    seed ^ stream.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Shared borrow of `a` alongside a mutable borrow of `b`; `a != b`
fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> (&T, &mut T) {
    if a < b {
        let (lo, hi) = items.split_at_mut(b);
        (&lo[a], &mut hi[0])
    } else {
        let (lo, hi) = items.split_at_mut(a);
        (&hi[0], &mut lo[b])
    }
}
