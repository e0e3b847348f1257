// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Synapse state record
//!
//! Synapses live in flat per-projection arrays owned by the sending side. The
//! receiving side only ever holds indexes into that array.

use super::error::{NeuralError, Result};

#[cfg(feature = "std")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct Synapse {
    /// Effective weight after sigmoidal contrast enhancement
    pub wt: f32,
    /// Linear weight underlying `wt`; learning operates here
    pub lwt: f32,
    /// Pending weight change, applied and cleared by WtFmDWt
    pub dwt: f32,
    /// Running max of |dwt| for learning-rate normalization
    pub norm: f32,
    /// Momentum-filtered weight change
    pub moment: f32,
}

/// Names of the variables addressable through [`Synapse::var_by_name`]
pub const SYNAPSE_VARS: &[&str] = &["Wt", "LWt", "DWt", "Norm", "Moment"];

impl Synapse {
    pub fn var_by_name(&self, name: &str) -> Result<f32> {
        match name {
            "Wt" => Ok(self.wt),
            "LWt" => Ok(self.lwt),
            "DWt" => Ok(self.dwt),
            "Norm" => Ok(self.norm),
            "Moment" => Ok(self.moment),
            _ => Err(NeuralError::UnknownVariable(name.to_string())),
        }
    }

    pub fn set_var_by_name(&mut self, name: &str, value: f32) -> Result<()> {
        match name {
            "Wt" => self.wt = value,
            "LWt" => self.lwt = value,
            "DWt" => self.dwt = value,
            "Norm" => self.norm = value,
            "Moment" => self.moment = value,
            _ => return Err(NeuralError::UnknownVariable(name.to_string())),
        }
        Ok(())
    }
}
