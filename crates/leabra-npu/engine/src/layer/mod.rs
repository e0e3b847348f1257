// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Layers
//!
//! A layer owns a contiguous neuron array and its pools. Pool 0 always spans
//! the whole layer; 4-D layers with pool inhibition on add one pool per
//! (Y, X) unit group. Projections live in the network arena and are referred
//! to here only by index.

pub mod cycle;
pub mod quarter;

use crate::error::{EngineError, EngineResult};
use crate::kinds::LayerType;
use crate::pool::Pool;
use crate::shape::Shape;
use leabra_npu_neural::types::params::{scoped, split_path, unknown};
use leabra_npu_neural::{
    ActParams, ActivationFunction, CosDiffStats, InhibParams, LearnNeurParams, NeuralError,
    Neuron, NeuronFlags, ParamSet, NEURON_VARS,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt;
use std::sync::Arc;

pub struct Layer {
    pub name: String,
    /// Position in the network's layer list
    pub index: usize,
    pub shape: Shape,
    pub kind: LayerType,
    /// Space-separated classes for parameter selectors
    pub class: String,
    pub off: bool,
    /// Worker thread this layer is assigned to
    pub thread: usize,

    pub act: ActParams,
    pub inhib: InhibParams,
    pub learn: LearnNeurParams,

    pub neurons: Vec<Neuron>,
    pub pools: Vec<Pool>,
    pub cos_diff: CosDiffStats,

    /// Arena indexes of projections received / sent, in creation order
    pub(crate) recv_prjns: Vec<usize>,
    pub(crate) send_prjns: Vec<usize>,

    act_fn: Option<Arc<dyn ActivationFunction>>,
    rng: StdRng,
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("shape", &self.shape)
            .field("thread", &self.thread)
            .field("off", &self.off)
            .field("custom_act_fn", &self.act_fn.is_some())
            .finish()
    }
}

impl Layer {
    pub fn new(name: &str, shape: Shape, kind: LayerType) -> Self {
        let mut ly = Self {
            name: name.to_string(),
            index: 0,
            shape,
            kind,
            class: String::new(),
            off: false,
            thread: 0,
            act: ActParams::default(),
            inhib: InhibParams::default(),
            learn: LearnNeurParams::default(),
            neurons: Vec::new(),
            pools: Vec::new(),
            cos_diff: CosDiffStats::default(),
            recv_prjns: Vec::new(),
            send_prjns: Vec::new(),
            act_fn: None,
            rng: StdRng::seed_from_u64(0),
        };
        ly.defaults();
        ly
    }

    pub fn defaults(&mut self) {
        self.act = ActParams::default();
        self.inhib = InhibParams::default();
        self.learn = LearnNeurParams::default();
        self.inhib.layer.on = true;
        for pl in self.pools.iter_mut() {
            pl.act_avg.act_m_avg = self.inhib.act_avg.init;
            pl.act_avg.act_p_avg = self.inhib.act_avg.init;
            pl.act_avg.act_p_avg_eff = self.inhib.act_avg.eff_init();
        }
    }

    /// Recompute derived parameter values
    pub fn update_params(&mut self) {
        self.act.update();
        self.inhib.update();
        self.learn.update();
    }

    /// Set a parameter by path relative to the layer, e.g. `"Inhib.Layer.Gi"`
    pub fn set_param(&mut self, path: &str, value: f32) -> EngineResult<()> {
        let (block, rest) = split_path(path);
        let res = match block {
            "Act" => self.act.set_param(rest, value),
            "Inhib" => self.inhib.set_param(rest, value),
            "Learn" => self.learn.set_param(rest, value),
            _ => return Err(scoped("Layer", unknown(block, rest)).into()),
        };
        res.map_err(|e| scoped("Layer", scoped(block, e)).into())
    }

    /// Replace the rate-code function used by `act_fm_g`
    pub fn set_activation_fn(&mut self, act_fn: Arc<dyn ActivationFunction>) {
        self.act_fn = Some(act_fn);
    }

    /// Go back to the default NoisyXX1 function
    pub fn clear_activation_fn(&mut self) {
        self.act_fn = None;
    }

    /// Reseed the noise stream; the network derives layer seeds from its own
    pub fn seed_rng(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn recv_prjns(&self) -> &[usize] {
        &self.recv_prjns
    }

    pub fn send_prjns(&self) -> &[usize] {
        &self.send_prjns
    }

    pub fn is_input(&self) -> bool {
        self.kind == LayerType::Input
    }

    /// Allocate neurons and pools
    pub fn build(&mut self) -> Result<(), String> {
        let nu = self.shape.len();
        if nu == 0 {
            // keep the whole-layer pool so later phases see an empty layer
            self.neurons.clear();
            self.pools = vec![Pool::new(0, 0)];
            return Err(format!(
                "Build Layer {}: no units specified in Shape",
                self.name
            ));
        }
        self.neurons = vec![Neuron::default(); nu];
        self.build_pools(nu);
        Ok(())
    }

    fn build_pools(&mut self, nu: usize) {
        let np = if self.inhib.pool.on && self.shape.num_dims() == 4 {
            self.shape.num_pools()
        } else {
            0
        };
        self.pools = Vec::with_capacity(np + 1);
        self.pools.push(Pool::new(0, nu));
        let ps = self.shape.pool_size();
        for pi in 0..np {
            self.pools.push(Pool::new(pi * ps, (pi + 1) * ps));
        }
    }

    pub fn has_sub_pools(&self) -> bool {
        self.pools.len() > 1
    }

    /// Layer part of weight initialization: running averages and activation
    /// state. Projection weights are initialized by the network.
    pub fn init_wts(&mut self) {
        let init = self.inhib.act_avg.init;
        let eff = self.inhib.act_avg.eff_init();
        for pl in self.pools.iter_mut() {
            pl.act_avg.act_m_avg = init;
            pl.act_avg.act_p_avg = init;
            pl.act_avg.act_p_avg_eff = eff;
        }
        self.init_act_avg();
        self.init_acts();
        self.cos_diff.init();
    }

    pub fn init_act_avg(&mut self) {
        for nrn in self.neurons.iter_mut() {
            self.learn.init_act_avg(nrn);
        }
    }

    pub fn init_acts(&mut self) {
        for nrn in self.neurons.iter_mut() {
            self.act.init_acts(nrn);
        }
        for pl in self.pools.iter_mut() {
            pl.init();
        }
    }

    /// Clear external inputs and targets
    pub fn init_ext(&mut self) {
        for nrn in self.neurons.iter_mut() {
            nrn.ext = 0.0;
            nrn.targ = 0.0;
            nrn.clear_flag(NeuronFlags::EXT_MASK);
        }
    }

    /// Apply one external value per neuron. Target layers receive targets,
    /// Compare layers comparison values, all others clamped input.
    pub fn apply_ext(&mut self, values: &[f32]) -> EngineResult<()> {
        if values.len() != self.neurons.len() {
            return Err(EngineError::LengthMismatch {
                what: format!("{} external input", self.name),
                expected: self.neurons.len(),
                actual: values.len(),
            });
        }
        let (flag, to_targ) = match self.kind {
            LayerType::Target => (NeuronFlags::HAS_TARG, true),
            LayerType::Compare => (NeuronFlags::HAS_CMPR, true),
            _ => (NeuronFlags::HAS_EXT, false),
        };
        for (nrn, &vl) in self.neurons.iter_mut().zip(values) {
            if to_targ {
                nrn.targ = vl;
            } else {
                nrn.ext = vl;
            }
            nrn.clear_flag(NeuronFlags::EXT_MASK);
            nrn.set_flag(flag);
        }
        Ok(())
    }

    /// One variable for every neuron, in layer order
    pub fn unit_vals(&self, var: &str) -> EngineResult<Vec<f32>> {
        if !NEURON_VARS.contains(&var) {
            return Err(NeuralError::UnknownVariable(var.to_string()).into());
        }
        self.neurons
            .iter()
            .map(|n| n.var_by_name(var).map_err(EngineError::from))
            .collect()
    }

    /// One variable at a shape-based index
    pub fn unit_val(&self, var: &str, idx: &[usize]) -> EngineResult<f32> {
        match self.shape.offset(idx) {
            Some(fidx) => self.unit_val_1d(var, fidx),
            None => Err(EngineError::IndexOutOfRange {
                what: "unit shape index",
                index: idx.first().copied().unwrap_or(0),
                len: self.shape.dims().first().copied().unwrap_or(0),
            }),
        }
    }

    pub fn unit_val_1d(&self, var: &str, idx: usize) -> EngineResult<f32> {
        let nrn = self.neurons.get(idx).ok_or(EngineError::IndexOutOfRange {
            what: "unit",
            index: idx,
            len: self.neurons.len(),
        })?;
        Ok(nrn.var_by_name(var)?)
    }

    pub fn set_unit_val_1d(&mut self, var: &str, idx: usize, value: f32) -> EngineResult<()> {
        let len = self.neurons.len();
        let nrn = self.neurons.get_mut(idx).ok_or(EngineError::IndexOutOfRange {
            what: "unit",
            index: idx,
            len,
        })?;
        Ok(nrn.set_var_by_name(var, value)?)
    }
}
