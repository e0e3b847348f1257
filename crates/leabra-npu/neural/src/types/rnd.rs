// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Random-number parameters for weight initialization and activation noise

use rand::Rng;

#[cfg(feature = "std")]
use serde::{Deserialize, Serialize};

/// Random number distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub enum RandDist {
    /// Always returns the mean
    None,
    /// Uniform over `mean ± var`
    #[default]
    Uniform,
    /// Gaussian with the given mean and variance
    Gaussian,
}

impl RandDist {
    /// Numeric code used by parameter sheets (0 = None, 1 = Uniform, 2 = Gaussian)
    pub fn from_code(code: f32) -> Option<Self> {
        match code as i32 {
            0 => Some(RandDist::None),
            1 => Some(RandDist::Uniform),
            2 => Some(RandDist::Gaussian),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct RandParams {
    pub dist: RandDist,
    pub mean: f32,
    pub var: f32,
}

impl Default for RandParams {
    fn default() -> Self {
        Self {
            dist: RandDist::Uniform,
            mean: 0.0,
            var: 1.0,
        }
    }
}

impl RandParams {
    pub fn gen<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        match self.dist {
            RandDist::None => self.mean,
            RandDist::Uniform => self.mean + self.var * (2.0 * rng.gen::<f32>() - 1.0),
            RandDist::Gaussian => {
                // Box-Muller; u1 is kept away from zero for the log
                let u1: f32 = rng.gen::<f32>().max(f32::MIN_POSITIVE);
                let u2: f32 = rng.gen::<f32>();
                let z = (-2.0 * u1.ln()).sqrt() * (2.0 * core::f32::consts::PI * u2).cos();
                self.mean + self.var.sqrt() * z
            }
        }
    }
}
