// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for error-driven learning
//!
//! A two-unit competitive output layer learns to follow alternating one-hot
//! input/target pairs over 100 trials.

use leabra_npu_engine::{LayerType, Network, Time};

const TRIALS: usize = 100;
/// Trials of each category before rises are held to the tolerance
const WARMUP: usize = 5;
/// Largest per-trial SSE rise allowed within a category after warm-up
const SSE_RISE_TOL: f32 = 5e-2;

struct TrialStats {
    sse: f32,
    act_m: Vec<f32>,
    target: usize,
}

fn two_category_net(seed: u64) -> Network {
    let mut net = Network::new("TwoCat");
    net.add_layer("In", &[2], LayerType::Input).unwrap();
    net.add_layer("Out", &[2], LayerType::Target).unwrap();
    net.connect_layer_names("In", "Out", "Full", "Forward")
        .unwrap();
    net.set_seed(seed);
    net.build().unwrap();
    net.init_wts();
    net
}

fn train(net: &mut Network) -> Vec<TrialStats> {
    let mut time = Time::default();
    let pats: [[f32; 2]; 2] = [[1.0, 0.0], [0.0, 1.0]];
    (0..TRIALS)
        .map(|i| {
            let target = i % 2;
            let pat = &pats[target][..];
            net.run_trial(&mut time, &[("In", pat), ("Out", pat)], true)
                .unwrap();
            let out = net.layer_by_name("Out").unwrap();
            TrialStats {
                sse: out.sse(0.0).0,
                act_m: out.unit_vals("ActM").unwrap(),
                target,
            }
        })
        .collect()
}

/// SSE of each category's trials, in presentation order
fn per_category(stats: &[TrialStats]) -> [Vec<f32>; 2] {
    let mut cats = [Vec::new(), Vec::new()];
    for s in stats {
        cats[s.target].push(s.sse);
    }
    cats
}

/// Test: within each category SSE never climbs back after a short warm-up,
/// and each category ends below where it started
#[test]
fn test_sse_non_increasing() {
    for seed in [1, 7, 42] {
        let mut net = two_category_net(seed);
        let stats = train(&mut net);
        for (cat, sse) in per_category(&stats).iter().enumerate() {
            let rises: Vec<(usize, f32)> = sse
                .windows(2)
                .enumerate()
                .filter(|(_, w)| w[1] > w[0] + 1e-6)
                .map(|(i, w)| (i + 1, w[1] - w[0]))
                .collect();
            for &(i, rise) in rises.iter().filter(|(i, _)| *i > WARMUP) {
                assert!(
                    rise <= SSE_RISE_TOL,
                    "seed {} category {}: trial {} SSE rose by {} (rises {:?}, sse {:?})",
                    seed,
                    cat,
                    i,
                    rise,
                    rises,
                    sse
                );
            }
            assert!(
                sse[sse.len() - 1] < sse[0],
                "seed {} category {}: no improvement: {:?}",
                seed,
                cat,
                sse
            );
        }
    }
}

/// Test: between trials, GeRaw is exactly what the senders last sent through
/// the current weights, even after learning has changed them
#[test]
fn test_ge_raw_matches_current_weights() {
    let mut net = two_category_net(42);
    train(&mut net);
    let mut time = Time::default();
    let pat: &[f32] = &[1.0, 0.0];
    net.run_trial(&mut time, &[("In", pat), ("Out", pat)], false)
        .unwrap();

    let sent = net.layer_by_name("In").unwrap().unit_vals("ActSent").unwrap();
    let ge_raw = net.layer_by_name("Out").unwrap().unit_vals("GeRaw").unwrap();
    let pj = net.prjn_between("In", "Out").unwrap();
    for (ri, &got) in ge_raw.iter().enumerate() {
        let want: f32 = sent
            .iter()
            .enumerate()
            .map(|(si, &a)| a * pj.gscale * pj.syn_val("Wt", si, ri).unwrap())
            .sum();
        assert!(
            (got - want).abs() < 1e-5,
            "Out[{}] GeRaw {} but senders account for {}",
            ri,
            got,
            want
        );
    }
}

/// Test: the target unit wins the minus phase once learned
#[test]
fn test_correct_category_wins() {
    let mut net = two_category_net(1);
    let stats = train(&mut net);
    for (i, s) in stats.iter().enumerate().skip(40) {
        let other = 1 - s.target;
        assert!(
            s.act_m[s.target] > s.act_m[other],
            "trial {}: target {} ActM {:?}",
            i,
            s.target,
            s.act_m
        );
    }
}

/// Test: without learning nothing changes between identical trials
#[test]
fn test_no_learning_keeps_weights() {
    let mut net = two_category_net(3);
    let before = net.prjn_between("In", "Out").unwrap().syn_vals("Wt").unwrap();
    let mut time = Time::default();
    let pat: &[f32] = &[1.0, 0.0];
    for _ in 0..5 {
        net.run_trial(&mut time, &[("In", pat), ("Out", pat)], false)
            .unwrap();
    }
    let after = net.prjn_between("In", "Out").unwrap().syn_vals("Wt").unwrap();
    assert_eq!(before, after);
}
