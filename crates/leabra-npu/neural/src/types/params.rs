// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Parameter addressing by dotted path
//!
//! Parameter sheets address fields with paths such as `"XX1.Gain"` or
//! `"Layer.Gi"`. Each parameter block strips its own leading segment and hands
//! the remainder to the block that owns it.

use super::error::{NeuralError, Result};

/// A block of parameters that can be set by path and has derived values
pub trait ParamSet {
    /// Set one parameter addressed relative to this block
    fn set_param(&mut self, path: &str, value: f32) -> Result<()>;

    /// Recompute derived values after parameters change
    fn update(&mut self);
}

/// Split `"Head.Rest.Of.Path"` into `("Head", "Rest.Of.Path")`
pub fn split_path(path: &str) -> (&str, &str) {
    match path.split_once('.') {
        Some((head, rest)) => (head, rest),
        None => (path, ""),
    }
}

/// Error for a path that does not resolve, keeping the full path for context
pub fn unknown(prefix: &str, rest: &str) -> NeuralError {
    if rest.is_empty() {
        NeuralError::UnknownParam(prefix.to_string())
    } else {
        NeuralError::UnknownParam(format!("{}.{}", prefix, rest))
    }
}

/// Prefix a nested block's error path with the block name
pub fn scoped(block: &str, err: NeuralError) -> NeuralError {
    match err {
        NeuralError::UnknownParam(p) => unknown(block, &p),
        NeuralError::InvalidParam { path, reason } => NeuralError::InvalidParam {
            path: format!("{}.{}", block, path),
            reason,
        },
        other => other,
    }
}

/// Boolean parameters are carried as floats: any non-zero value is true
#[inline]
pub fn as_bool(value: f32) -> bool {
    value != 0.0
}

/// Reject values that must be strictly positive (time constants, gains used as divisors)
pub fn positive(path: &str, value: f32) -> Result<f32> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(NeuralError::InvalidParam {
            path: path.to_string(),
            reason: format!("must be > 0, got {}", value),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("Layer.Gi"), ("Layer", "Gi"));
        assert_eq!(split_path("XX1.Gain.Extra"), ("XX1", "Gain.Extra"));
        assert_eq!(split_path("Gi"), ("Gi", ""));
    }

    #[test]
    fn test_scoped_prefixes_path() {
        let err = scoped("XX1", NeuralError::UnknownParam("Bogus".into()));
        assert_eq!(err, NeuralError::UnknownParam("XX1.Bogus".into()));
    }

    #[test]
    fn test_positive_rejects_zero() {
        assert!(positive("Dt.VmTau", 0.0).is_err());
        assert_eq!(positive("Dt.VmTau", 3.3).unwrap(), 3.3);
    }
}
