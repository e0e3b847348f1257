// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Running aggregate statistics

#[cfg(feature = "std")]
use serde::{Deserialize, Serialize};

/// Average, max and argmax over a set of values.
///
/// Lifecycle per use: [`AvgMax::init`], then [`AvgMax::update_val`] for every
/// value, then [`AvgMax::calc_avg`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct AvgMax {
    pub avg: f32,
    pub max: f32,
    /// Index of the max value, -1 when no value has been seen
    pub max_idx: i32,
    pub sum: f32,
    pub n: i32,
}

impl Default for AvgMax {
    fn default() -> Self {
        Self {
            avg: 0.0,
            max: 0.0,
            max_idx: -1,
            sum: 0.0,
            n: 0,
        }
    }
}

impl AvgMax {
    /// Reset for a new round of updates
    #[inline]
    pub fn init(&mut self) {
        self.avg = 0.0;
        self.sum = 0.0;
        self.n = 0;
        self.max = f32::MIN;
        self.max_idx = -1;
    }

    #[inline]
    pub fn update_val(&mut self, val: f32, idx: usize) {
        self.sum += val;
        self.n += 1;
        if val > self.max {
            self.max = val;
            self.max_idx = idx as i32;
        }
    }

    /// Compute the average from the accumulated sum.
    ///
    /// An empty set yields avg = max = 0.
    #[inline]
    pub fn calc_avg(&mut self) {
        if self.n > 0 {
            self.avg = self.sum / self.n as f32;
        } else {
            self.avg = 0.0;
            self.max = 0.0;
        }
    }
}

/// Closed value range used for clipping
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct MinMax {
    pub min: f32,
    pub max: f32,
}

impl MinMax {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn clip(&self, val: f32) -> f32 {
        val.max(self.min).min(self.max)
    }

    pub fn range(&self) -> f32 {
        self.max - self.min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_avg_max_accumulates() {
        let mut am = AvgMax::default();
        am.init();
        for (i, v) in [0.2f32, 0.8, 0.5].iter().enumerate() {
            am.update_val(*v, i);
        }
        am.calc_avg();
        assert_eq!(am.max, 0.8);
        assert_eq!(am.max_idx, 1);
        assert!((am.avg - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_avg_max_empty_is_zero() {
        let mut am = AvgMax::default();
        am.init();
        am.calc_avg();
        assert_eq!(am.avg, 0.0);
        assert_eq!(am.max, 0.0);
        assert_eq!(am.max_idx, -1);
    }

    #[test]
    fn test_min_max_clip() {
        let r = MinMax::new(0.0, 0.95);
        assert_eq!(r.clip(1.0), 0.95);
        assert_eq!(r.clip(-0.1), 0.0);
        assert_eq!(r.clip(0.3), 0.3);
    }
}
