// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Engine error types

use leabra_npu_neural::NeuralError;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by build, lookup, parameter and weights operations.
///
/// Per-cycle functions never return errors; they assume a successful build.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Aggregated build messages, one per failing layer or projection
    #[error("Build failed:\n{}", .0.join("\n"))]
    Build(Vec<String>),

    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    #[error("Layer name already in use: {0}")]
    DuplicateLayer(String),

    #[error("Projection not found: {0}")]
    PrjnNotFound(String),

    #[error("Network has not been built")]
    NotBuilt,

    #[error("Length mismatch in {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("Recv unit {recv} does not receive from send unit {send}")]
    SynapseNotFound { send: usize, recv: usize },

    #[error("{what} index {index} out of range, N = {len}")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Unknown connectivity pattern: {0}")]
    UnknownPattern(String),

    #[error("Unknown layer or projection kind: {0}")]
    UnknownKind(String),

    #[error("Parameter error: {0}")]
    Param(#[from] NeuralError),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_error_renders_one_line_per_message() {
        let err = EngineError::Build(vec!["Hidden: no units".into(), "Pat is nil; ".into()]);
        assert_eq!(err.to_string(), "Build failed:\nHidden: no units\nPat is nil; ");
    }

    #[test]
    fn test_neural_error_converts() {
        let err: EngineError = NeuralError::UnknownParam("Act.Bogus".into()).into();
        assert!(matches!(err, EngineError::Param(_)));
    }
}
