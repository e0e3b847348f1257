// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Row-major layer geometry
//!
//! 2-D layers are `[Y, X]`. 4-D layers are `[PoolY, PoolX, UnitY, UnitX]`,
//! so each sub-pool occupies one contiguous block of `UnitY * UnitX` neurons.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    pub fn new(dims: &[usize]) -> Self {
        Self {
            dims: dims.to_vec(),
        }
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn num_dims(&self) -> usize {
        self.dims.len()
    }

    /// Total number of units; an empty shape has none
    pub fn len(&self) -> usize {
        if self.dims.is_empty() {
            0
        } else {
            self.dims.iter().product()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat offset of a full index, or None if any coordinate is out of range
    pub fn offset(&self, idx: &[usize]) -> Option<usize> {
        if idx.len() != self.dims.len() {
            return None;
        }
        let mut off = 0;
        for (&i, &d) in idx.iter().zip(&self.dims) {
            if i >= d {
                return None;
            }
            off = off * d + i;
        }
        Some(off)
    }

    /// Number of sub-pools: `PoolY * PoolX` for 4-D shapes, else 0
    pub fn num_pools(&self) -> usize {
        if self.dims.len() == 4 {
            self.dims[0] * self.dims[1]
        } else {
            0
        }
    }

    /// Units per sub-pool for 4-D shapes
    pub fn pool_size(&self) -> usize {
        if self.dims.len() == 4 {
            self.dims[2] * self.dims[3]
        } else {
            self.len()
        }
    }
}
