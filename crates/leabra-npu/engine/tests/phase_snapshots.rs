// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for the quarter loop and phase snapshots

use leabra_npu_engine::{LayerType, Network, Time};

const INPUT: &[f32] = &[1.0, 0.0, 0.0, 1.0];
const TARGET: &[f32] = &[0.0, 1.0, 0.0];

fn net() -> Network {
    let mut net = Network::new("Phases");
    net.set_seed(5);
    net.add_layer("In", &[4], LayerType::Input).unwrap();
    net.add_layer("Hid", &[2, 3], LayerType::Hidden).unwrap();
    net.add_layer("Out", &[3], LayerType::Target).unwrap();
    net.connect_layer_names("In", "Hid", "Full", "Forward")
        .unwrap();
    net.bidir_connect_layer_names("Hid", "Out", "Full").unwrap();
    net.build().unwrap();
    net.init_wts();
    net
}

struct Captured {
    q2: Vec<Vec<f32>>,
    q3: Vec<Vec<f32>>,
}

/// Same steps as `run_trial` without learning, capturing `Act` of every
/// layer at the end of quarters 2 and 3
fn manual_trial(net: &mut Network, time: &mut Time) -> Captured {
    net.init_ext();
    net.layer_by_name_mut("In").unwrap().apply_ext(INPUT).unwrap();
    net.layer_by_name_mut("Out").unwrap().apply_ext(TARGET).unwrap();
    net.trial_init();
    time.trial_start();

    let acts = |net: &Network| -> Vec<Vec<f32>> {
        net.layers()
            .iter()
            .map(|ly| ly.unit_vals("Act").unwrap())
            .collect()
    };
    let mut cap = Captured {
        q2: Vec::new(),
        q3: Vec::new(),
    };
    for q in 0..4 {
        assert_eq!(time.quarter, q);
        assert_eq!(time.plus_phase, q == 3);
        for _ in 0..time.cyc_per_qtr {
            net.cycle();
            time.cycle_inc();
        }
        net.quarter_final(time);
        match q {
            2 => cap.q2 = acts(net),
            3 => cap.q3 = acts(net),
            _ => {}
        }
        time.quarter_inc();
    }
    cap
}

/// Test: ActM and ActP are the activations at the end of quarters 2 and 3
#[test]
fn test_minus_and_plus_snapshots() {
    let mut net = net();
    let mut time = Time::default();
    let cap = manual_trial(&mut net, &mut time);
    assert_eq!(time.cycle, 4 * time.cyc_per_qtr);

    for (li, ly) in net.layers().iter().enumerate() {
        let act_m = ly.unit_vals("ActM").unwrap();
        let act_p = ly.unit_vals("ActP").unwrap();
        let act_dif = ly.unit_vals("ActDif").unwrap();
        assert_eq!(act_m, cap.q2[li], "{} ActM", ly.name);
        assert_eq!(act_p, cap.q3[li], "{} ActP", ly.name);
        for i in 0..act_m.len() {
            assert_eq!(act_dif[i], act_p[i] - act_m[i], "{} ActDif[{}]", ly.name, i);
        }
    }
}

/// Test: the clamped target shapes the output plus phase
#[test]
fn test_plus_phase_follows_target() {
    let mut net = net();
    let mut time = Time::default();
    manual_trial(&mut net, &mut time);
    let out = net.layer_by_name("Out").unwrap();
    let act_p = out.unit_vals("ActP").unwrap();
    assert!(act_p[1] > act_p[0], "{:?}", act_p);
    assert!(act_p[1] > act_p[2], "{:?}", act_p);
    // plus minus difference is what SSE measures
    let (sse, _) = out.sse(0.0);
    let expected: f32 = out
        .unit_vals("ActDif")
        .unwrap()
        .iter()
        .map(|d| d * d)
        .sum();
    assert!((sse - expected).abs() < 1e-6);
}

/// Test: the manual loop and `run_trial` step the network identically
#[test]
fn test_manual_loop_matches_run_trial() {
    let mut a = net();
    let mut b = net();
    let mut ta = Time::default();
    let mut tb = Time::default();
    manual_trial(&mut a, &mut ta);
    b.run_trial(&mut tb, &[("In", INPUT), ("Out", TARGET)], false)
        .unwrap();
    for (la, lb) in a.layers().iter().zip(b.layers()) {
        for var in ["Act", "ActM", "ActP", "Ge", "Vm"] {
            assert_eq!(la.unit_vals(var).unwrap(), lb.unit_vals(var).unwrap(), "{} {}", la.name, var);
        }
    }
    assert_eq!(ta, tb);
}
