// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for parameter and variable access

use core::fmt;

/// Error types for parameter application and state access.
///
/// Per-cycle computation never produces these; they only arise when a caller
/// addresses a parameter, a unit variable or an array by name or size.
#[derive(Debug, Clone, PartialEq)]
pub enum NeuralError {
    /// Parameter path does not name any field of the target
    UnknownParam(String),

    /// Parameter path is valid but the value is not acceptable
    InvalidParam { path: String, reason: String },

    /// Neuron or synapse variable name is not recognized
    UnknownVariable(String),

    ArraySizeMismatch { expected: usize, actual: usize },
}

impl fmt::Display for NeuralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NeuralError::UnknownParam(path) => write!(f, "Unknown parameter path: {}", path),
            NeuralError::InvalidParam { path, reason } => {
                write!(f, "Invalid value for parameter {}: {}", path, reason)
            }
            NeuralError::UnknownVariable(name) => write!(f, "Unknown variable: {}", name),
            NeuralError::ArraySizeMismatch { expected, actual } => {
                write!(f, "Array size mismatch: expected {}, got {}", expected, actual)
            }
        }
    }
}

impl std::error::Error for NeuralError {}

pub type Result<T> = core::result::Result<T, NeuralError>;
