// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Pooled aggregate state for a layer or a 4-D sub-group

use leabra_npu_neural::{AvgMax, FFFBInhib};
use serde::{Deserialize, Serialize};

/// Running-average activity of a pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActAvg {
    /// Minus-phase running average
    pub act_m_avg: f32,
    /// Plus-phase running average
    pub act_p_avg: f32,
    /// `act_p_avg * Adjust`, used for netinput scaling
    pub act_p_avg_eff: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    /// First neuron index
    pub st_idx: usize,
    /// One past the last neuron index
    pub ed_idx: usize,
    pub inhib: FFFBInhib,
    pub ge: AvgMax,
    pub act: AvgMax,
    /// `act` captured at the end of the minus phase
    pub act_m: AvgMax,
    /// `act` captured at the end of the plus phase
    pub act_p: AvgMax,
    pub act_avg: ActAvg,
}

impl Pool {
    pub fn new(st_idx: usize, ed_idx: usize) -> Self {
        Self {
            st_idx,
            ed_idx,
            inhib: FFFBInhib::default(),
            ge: AvgMax::default(),
            act: AvgMax::default(),
            act_m: AvgMax::default(),
            act_p: AvgMax::default(),
            act_avg: ActAvg::default(),
        }
    }

    /// Clear inhibition and the per-cycle statistics
    pub fn init(&mut self) {
        self.inhib.init();
        self.ge = AvgMax::default();
        self.act = AvgMax::default();
    }

    pub fn len(&self) -> usize {
        self.ed_idx - self.st_idx
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Neuron index range covered by this pool
    pub fn range(&self) -> std::ops::Range<usize> {
        self.st_idx..self.ed_idx
    }
}
