// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Connectivity patterns
//!
//! A pattern turns two layer shapes into per-sender fan-out counts,
//! per-receiver fan-in counts and a dense receiver-major connection matrix.
//! Projections consume the result once, at build.

use crate::error::{EngineError, EngineResult};
use crate::shape::Shape;
use ahash::AHashMap;
use std::sync::Arc;

/// Dense connectivity produced by a pattern
#[derive(Debug, Clone, PartialEq)]
pub struct Connectivity {
    /// Fan-out per sending unit
    pub send_n: Vec<u32>,
    /// Fan-in per receiving unit
    pub recv_n: Vec<u32>,
    /// `bits[ri * n_send + si]` is true when `si` connects to `ri`
    pub bits: Vec<bool>,
}

impl Connectivity {
    /// Empty matrix for the given sizes
    pub fn new(n_send: usize, n_recv: usize) -> Self {
        Self {
            send_n: vec![0; n_send],
            recv_n: vec![0; n_recv],
            bits: vec![false; n_send * n_recv],
        }
    }

    /// Mark a connection and update both counts
    pub fn connect(&mut self, si: usize, ri: usize) {
        let n_send = self.send_n.len();
        let bit = &mut self.bits[ri * n_send + si];
        if !*bit {
            *bit = true;
            self.send_n[si] += 1;
            self.recv_n[ri] += 1;
        }
    }

    #[inline]
    pub fn is_connected(&self, si: usize, ri: usize) -> bool {
        self.bits[ri * self.send_n.len() + si]
    }
}

pub trait ConnectivityPattern: Send + Sync {
    fn name(&self) -> &str;

    /// `same_layer` is true when sender and receiver are the same layer
    fn connect(&self, send: &Shape, recv: &Shape, same_layer: bool) -> Connectivity;
}

/// Every sender to every receiver
#[derive(Debug, Clone, Copy, Default)]
pub struct Full {
    /// Connect a unit to itself in same-layer projections
    pub self_con: bool,
}

impl ConnectivityPattern for Full {
    fn name(&self) -> &str {
        "Full"
    }

    fn connect(&self, send: &Shape, recv: &Shape, same_layer: bool) -> Connectivity {
        let (ns, nr) = (send.len(), recv.len());
        let mut cons = Connectivity::new(ns, nr);
        for ri in 0..nr {
            for si in 0..ns {
                if same_layer && !self.self_con && si == ri {
                    continue;
                }
                cons.connect(si, ri);
            }
        }
        cons
    }
}

/// Unit `i` to unit `i`, over the shorter of the two layers
#[derive(Debug, Clone, Copy, Default)]
pub struct OneToOne;

impl ConnectivityPattern for OneToOne {
    fn name(&self) -> &str {
        "OneToOne"
    }

    fn connect(&self, send: &Shape, recv: &Shape, _same_layer: bool) -> Connectivity {
        let (ns, nr) = (send.len(), recv.len());
        let mut cons = Connectivity::new(ns, nr);
        for i in 0..ns.min(nr) {
            cons.connect(i, i);
        }
        cons
    }
}

type PatternCtor = Arc<dyn Fn() -> Arc<dyn ConnectivityPattern> + Send + Sync>;

/// Name → constructor lookup for connectivity patterns
#[derive(Clone)]
pub struct PatternRegistry {
    ctors: AHashMap<String, PatternCtor>,
}

impl Default for PatternRegistry {
    fn default() -> Self {
        let mut reg = Self {
            ctors: AHashMap::new(),
        };
        reg.register("Full", || Arc::new(Full::default()));
        reg.register("FullSelf", || Arc::new(Full { self_con: true }));
        reg.register("OneToOne", || Arc::new(OneToOne));
        reg
    }
}

impl PatternRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a named pattern constructor
    pub fn register<F>(&mut self, name: &str, ctor: F)
    where
        F: Fn() -> Arc<dyn ConnectivityPattern> + Send + Sync + 'static,
    {
        self.ctors.insert(name.to_string(), Arc::new(ctor));
    }

    pub fn create(&self, name: &str) -> EngineResult<Arc<dyn ConnectivityPattern>> {
        self.ctors
            .get(name)
            .map(|ctor| ctor())
            .ok_or_else(|| EngineError::UnknownPattern(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.ctors.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_counts() {
        let cons = Full::default().connect(&Shape::new(&[3]), &Shape::new(&[2]), false);
        assert_eq!(cons.send_n, vec![2, 2, 2]);
        assert_eq!(cons.recv_n, vec![3, 3]);
        assert!(cons.bits.iter().all(|&b| b));
    }

    #[test]
    fn test_full_same_layer_skips_self_unless_requested() {
        let sh = Shape::new(&[3]);
        let cons = Full::default().connect(&sh, &sh, true);
        assert_eq!(cons.recv_n, vec![2, 2, 2]);
        assert!(!cons.is_connected(1, 1));
        let cons = Full { self_con: true }.connect(&sh, &sh, true);
        assert_eq!(cons.recv_n, vec![3, 3, 3]);
    }

    #[test]
    fn test_one_to_one_uses_shorter_layer() {
        let cons = OneToOne.connect(&Shape::new(&[4]), &Shape::new(&[2]), false);
        assert_eq!(cons.send_n, vec![1, 1, 0, 0]);
        assert_eq!(cons.recv_n, vec![1, 1]);
        assert!(cons.is_connected(1, 1));
        assert!(!cons.is_connected(1, 0));
    }

    #[test]
    fn test_registry_custom_pattern() {
        struct Nothing;
        impl ConnectivityPattern for Nothing {
            fn name(&self) -> &str {
                "Nothing"
            }
            fn connect(&self, send: &Shape, recv: &Shape, _same: bool) -> Connectivity {
                Connectivity::new(send.len(), recv.len())
            }
        }
        let mut reg = PatternRegistry::new();
        reg.register("Nothing", || Arc::new(Nothing));
        assert_eq!(reg.create("Nothing").unwrap().name(), "Nothing");
        assert!(matches!(reg.create("Bogus"), Err(EngineError::UnknownPattern(_))));
        assert!(reg.names().contains(&"OneToOne".to_string()));
    }
}
