// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Phase Scheduler
//!
//! Layers are assigned to worker threads once at build. Every phase hands
//! each worker exclusive `&mut` access to the layers (and the projections
//! those layers own for the phase) in its bucket, runs all buckets inside a
//! single `rayon` scope, and returns only when every bucket finished. The
//! scope join is the barrier between phases.
//!
//! Within a bucket, layers and projections are visited in index order, and
//! every reduction is local to one layer, so results do not depend on the
//! number of threads.

use crate::error::{EngineError, EngineResult};
use crate::layer::Layer;
use crate::projection::Projection;
use rayon::ThreadPool;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Which end of a projection owns it for a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PrjnOwner {
    Send,
    Recv,
}

/// Cumulative timing for one phase or one worker thread
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseTiming {
    pub name: String,
    pub calls: u64,
    pub total: Duration,
}

impl PhaseTiming {
    pub fn avg(&self) -> Duration {
        if self.calls == 0 {
            Duration::ZERO
        } else {
            self.total / self.calls as u32
        }
    }
}

pub struct Scheduler {
    pool: Option<ThreadPool>,
    n_threads: usize,
    /// Bucket index for each layer
    layer_thread: Vec<usize>,
    slow_warn: Duration,
    fn_timers: Vec<PhaseTiming>,
    thread_nanos: Vec<AtomicU64>,
}

impl Scheduler {
    /// Partition layers into thread buckets.
    ///
    /// With `threads_override == 0` each layer keeps its own `thread` and the
    /// pool gets `max(thread) + 1` workers. Otherwise layers are dealt
    /// round-robin over `threads_override` workers.
    pub fn new(layers: &[Layer], threads_override: usize, slow_warn: Duration) -> EngineResult<Self> {
        let n_threads = if threads_override > 0 {
            threads_override
        } else {
            layers.iter().map(|ly| ly.thread).max().unwrap_or(0) + 1
        };
        let layer_thread: Vec<usize> = layers
            .iter()
            .enumerate()
            .map(|(li, ly)| {
                if threads_override > 0 {
                    li % n_threads
                } else {
                    ly.thread
                }
            })
            .collect();

        for th in 0..n_threads {
            let names: Vec<&str> = layers
                .iter()
                .zip(&layer_thread)
                .filter(|(_, t)| **t == th)
                .map(|(ly, _)| ly.name.as_str())
                .collect();
            if names.is_empty() {
                warn!("[LEABRA-SCHED] no layers for thread {}", th);
            } else {
                debug!("[LEABRA-SCHED] thread {}: {}", th, names.join(", "));
            }
        }

        let pool = if n_threads > 1 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n_threads)
                    .thread_name(|i| format!("leabra-worker-{}", i))
                    .build()
                    .map_err(|e| EngineError::ThreadPool(e.to_string()))?,
            )
        } else {
            None
        };

        Ok(Self {
            pool,
            n_threads,
            layer_thread,
            slow_warn,
            fn_timers: Vec::new(),
            thread_nanos: (0..n_threads).map(|_| AtomicU64::new(0)).collect(),
        })
    }

    pub fn n_threads(&self) -> usize {
        self.n_threads
    }

    pub fn layer_thread(&self, li: usize) -> usize {
        self.layer_thread[li]
    }

    pub fn set_slow_warn(&mut self, slow_warn: Duration) {
        self.slow_warn = slow_warn;
    }

    /// Run `f` on every layer that is not off
    pub(crate) fn layer_phase<F>(&mut self, name: &'static str, layers: &mut [Layer], f: F)
    where
        F: Fn(&mut Layer) + Sync,
    {
        let mut buckets: Vec<Vec<&mut Layer>> = (0..self.n_threads).map(|_| Vec::new()).collect();
        for (li, ly) in layers.iter_mut().enumerate() {
            if !ly.off {
                buckets[self.layer_thread[li]].push(ly);
            }
        }
        self.run(name, buckets, |bucket| {
            for ly in bucket {
                f(ly);
            }
        });
    }

    /// Run `f` on every layer together with the active projections it owns
    /// at the given end
    pub(crate) fn layer_prjn_phase<F>(
        &mut self,
        name: &'static str,
        layers: &mut [Layer],
        prjns: &mut [Projection],
        owner: PrjnOwner,
        f: F,
    ) where
        F: Fn(&mut Layer, &mut [&mut Projection]) + Sync,
    {
        let off: Vec<bool> = layers.iter().map(|ly| ly.off).collect();
        let mut owned: Vec<Vec<&mut Projection>> = (0..layers.len()).map(|_| Vec::new()).collect();
        for pj in prjns.iter_mut() {
            if pj.is_active() && !off[pj.send] && !off[pj.recv] {
                let li = owner_of(pj, owner);
                owned[li].push(pj);
            }
        }
        let mut buckets: Vec<Vec<(&mut Layer, Vec<&mut Projection>)>> =
            (0..self.n_threads).map(|_| Vec::new()).collect();
        for (li, (ly, pjs)) in layers.iter_mut().zip(owned).enumerate() {
            if !ly.off {
                buckets[self.layer_thread[li]].push((ly, pjs));
            }
        }
        self.run(name, buckets, |bucket| {
            for (ly, mut pjs) in bucket {
                f(ly, pjs.as_mut_slice());
            }
        });
    }

    /// Run `f` on each owning layer's group of active projections, with
    /// shared read access to all layers
    pub(crate) fn prjn_group_phase<F>(
        &mut self,
        name: &'static str,
        layers: &[Layer],
        prjns: &mut [Projection],
        owner: PrjnOwner,
        f: F,
    ) where
        F: Fn(&mut [&mut Projection], &[Layer]) + Sync,
    {
        let mut owned: Vec<Vec<&mut Projection>> = (0..layers.len()).map(|_| Vec::new()).collect();
        for pj in prjns.iter_mut() {
            if pj.is_active() && !layers[pj.send].off && !layers[pj.recv].off {
                let li = owner_of(pj, owner);
                owned[li].push(pj);
            }
        }
        let mut buckets: Vec<Vec<Vec<&mut Projection>>> =
            (0..self.n_threads).map(|_| Vec::new()).collect();
        for (li, group) in owned.into_iter().enumerate() {
            if !group.is_empty() {
                buckets[self.layer_thread[li]].push(group);
            }
        }
        self.run(name, buckets, |bucket| {
            for mut group in bucket {
                f(group.as_mut_slice(), layers);
            }
        });
    }

    /// One barrier-separated phase: one task per bucket
    fn run<T, W>(&mut self, name: &'static str, buckets: Vec<T>, work: W)
    where
        T: Send,
        W: Fn(T) + Sync,
    {
        let start = Instant::now();
        let thread_nanos = &self.thread_nanos;
        match &self.pool {
            Some(pool) => {
                let work = &work;
                pool.scope(|s| {
                    for (ti, bucket) in buckets.into_iter().enumerate() {
                        s.spawn(move |_| {
                            let t0 = Instant::now();
                            work(bucket);
                            thread_nanos[ti].fetch_add(t0.elapsed().as_nanos() as u64, Ordering::Relaxed);
                        });
                    }
                });
            }
            None => {
                for (ti, bucket) in buckets.into_iter().enumerate() {
                    let t0 = Instant::now();
                    work(bucket);
                    thread_nanos[ti].fetch_add(t0.elapsed().as_nanos() as u64, Ordering::Relaxed);
                }
            }
        }
        self.record(name, start.elapsed());
    }

    fn record(&mut self, name: &'static str, elapsed: Duration) {
        if !self.slow_warn.is_zero() && elapsed > self.slow_warn {
            warn!(
                "[LEABRA-SCHED] Slow phase {}: {:.2}ms across {} threads",
                name,
                elapsed.as_secs_f64() * 1000.0,
                self.n_threads
            );
        }
        match self.fn_timers.iter_mut().find(|t| t.name == name) {
            Some(t) => {
                t.calls += 1;
                t.total += elapsed;
            }
            None => self.fn_timers.push(PhaseTiming {
                name: name.to_string(),
                calls: 1,
                total: elapsed,
            }),
        }
    }

    /// Phase timers in first-run order, followed by one entry per thread
    pub fn timer_report(&self) -> Vec<PhaseTiming> {
        let phase_calls: u64 = self.fn_timers.iter().map(|t| t.calls).sum();
        let mut report = self.fn_timers.clone();
        for (ti, nanos) in self.thread_nanos.iter().enumerate() {
            report.push(PhaseTiming {
                name: format!("thread {}", ti),
                calls: phase_calls,
                total: Duration::from_nanos(nanos.load(Ordering::Relaxed)),
            });
        }
        report
    }

    pub fn reset_timers(&mut self) {
        self.fn_timers.clear();
        for t in &self.thread_nanos {
            t.store(0, Ordering::Relaxed);
        }
    }
}

fn owner_of(pj: &Projection, owner: PrjnOwner) -> usize {
    match owner {
        PrjnOwner::Send => pj.send,
        PrjnOwner::Recv => pj.recv,
    }
}
