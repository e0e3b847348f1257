// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Trial / quarter / cycle counters

use serde::{Deserialize, Serialize};

/// Quarter index at the end of which the minus phase is captured
pub const MINUS_PHASE_QUARTER: usize = 2;

/// Quarter index at the end of which the plus phase is captured
pub const PLUS_PHASE_QUARTER: usize = 3;

/// Quarters in one alpha-cycle trial
pub const QUARTERS_PER_TRIAL: usize = 4;

/// Simulation time within and across alpha-cycle trials
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Time {
    /// Accumulated simulation time in seconds
    pub time: f32,
    /// Cycle within the current trial
    pub cycle: usize,
    /// Total cycles since the last reset
    pub cycle_tot: usize,
    /// Current quarter, 0..=3
    pub quarter: usize,
    pub plus_phase: bool,
    pub time_per_cyc: f32,
    pub cyc_per_qtr: usize,
}

impl Default for Time {
    fn default() -> Self {
        Self {
            time: 0.0,
            cycle: 0,
            cycle_tot: 0,
            quarter: 0,
            plus_phase: false,
            time_per_cyc: 0.001,
            cyc_per_qtr: 25,
        }
    }
}

impl Time {
    pub fn new(cyc_per_qtr: usize, time_per_cyc: f32) -> Self {
        Self {
            cyc_per_qtr,
            time_per_cyc,
            ..Self::default()
        }
    }

    pub fn reset(&mut self) {
        self.time = 0.0;
        self.cycle = 0;
        self.cycle_tot = 0;
        self.quarter = 0;
        self.plus_phase = false;
        if self.cyc_per_qtr == 0 {
            let d = Self::default();
            self.cyc_per_qtr = d.cyc_per_qtr;
            self.time_per_cyc = d.time_per_cyc;
        }
    }

    pub fn trial_start(&mut self) {
        self.cycle = 0;
        self.quarter = 0;
        self.plus_phase = false;
    }

    pub fn cycle_inc(&mut self) {
        self.cycle += 1;
        self.cycle_tot += 1;
        self.time += self.time_per_cyc;
    }

    pub fn quarter_inc(&mut self) {
        self.quarter += 1;
        self.plus_phase = self.quarter == PLUS_PHASE_QUARTER;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quarter_inc_sets_plus_phase_only_at_three() {
        let mut t = Time::default();
        t.trial_start();
        for q in 1..=3 {
            t.quarter_inc();
            assert_eq!(t.plus_phase, q == 3, "quarter {}", q);
        }
    }

    #[test]
    fn test_cycle_inc_accumulates_time() {
        let mut t = Time::new(10, 0.5);
        t.cycle_inc();
        t.cycle_inc();
        assert_eq!(t.cycle, 2);
        assert_eq!(t.cycle_tot, 2);
        assert_eq!(t.time, 1.0);
        t.trial_start();
        assert_eq!(t.cycle, 0);
        assert_eq!(t.cycle_tot, 2);
    }

    #[test]
    fn test_reset_restores_missing_cycles_per_quarter() {
        let mut t = Time::new(0, 0.0);
        t.reset();
        assert_eq!(t.cyc_per_qtr, 25);
    }
}
