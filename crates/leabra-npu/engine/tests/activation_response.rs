// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for rate-code activation inside a running network
//!
//! Drive rises monotonically across the input units; with one-to-one
//! uniform weights and shared layer inhibition the receiving activations
//! must rise with it.

use leabra_npu_engine::{LayerType, Network, ParamRule, ParamSheet, Time};
use leabra_npu_neural::{ActParams, ActivationFunction, Neuron, XX1Params};
use std::sync::Arc;

const DRIVE: [f32; 6] = [0.05, 0.2, 0.35, 0.5, 0.7, 0.9];

fn drive_net() -> Network {
    let mut net = Network::new("Drive");
    net.add_layer("In", &[DRIVE.len()], LayerType::Input).unwrap();
    net.add_layer("Out", &[DRIVE.len()], LayerType::Hidden).unwrap();
    net.connect_layer_names("In", "Out", "OneToOne", "Forward")
        .unwrap();
    let mut sheet = ParamSheet::new("Uniform");
    sheet.push(ParamRule::new("Prjn").with("Prjn.Learn.WtInit.Var", 0.0));
    sheet.push(ParamRule::new("#Out").with("Layer.Inhib.Layer.Gi", 1.0));
    net.apply_params(&sheet).unwrap();
    net.build().unwrap();
    net.init_wts();
    net
}

fn settle(net: &mut Network, quarters: usize) {
    let mut time = Time::default();
    net.init_ext();
    net.layer_by_name_mut("In").unwrap().apply_ext(&DRIVE).unwrap();
    net.trial_init();
    for _ in 0..quarters {
        for _ in 0..time.cyc_per_qtr {
            net.cycle();
            time.cycle_inc();
        }
        net.quarter_final(&time);
        time.quarter_inc();
    }
}

fn assert_non_decreasing(vals: &[f32], what: &str) {
    for w in vals.windows(2) {
        assert!(w[1] >= w[0], "{} decreased: {:?}", what, vals);
    }
}

/// Test: XX1 is monotone across its three regions
#[test]
fn test_noisy_xx1_monotone() {
    let xx1 = XX1Params::default();
    let mut prev = xx1.activation(-0.1);
    for i in 1..=600 {
        let x = -0.1 + i as f32 * 0.001;
        let y = xx1.activation(x);
        assert!(y >= prev, "noisy_xx1 fell at x={}: {} < {}", x, y, prev);
        prev = y;
    }
}

/// Test: a fresh neuron driven by rising conductance follows the reference
/// Vm / Act sequence and never loses activation
#[test]
fn test_neuron_act_rises_with_ge_inc() {
    const GE_INC: [f32; 8] = [0.01, 0.02, 0.03, 0.04, 0.05, 0.1, 0.2, 0.3];
    const WANT_VM: [f32; 8] = [
        0.3952381, 0.39376712, 0.39718926, 0.4069336, 0.424103, 0.45430642, 0.50831974,
        0.5918249,
    ];
    const WANT_ACT: [f32; 8] = [
        2.8884673e-29, 3.2081596e-29, 1.1549086e-28, 3.2309342e-26, 9.598328e-22,
        7.120265e-14, 0.29335475, 0.5022214,
    ];

    let ac = ActParams::default();
    let mut nrn = Neuron::default();
    ac.init_acts(&mut nrn);
    let mut acts = Vec::new();
    for (i, &ge_inc) in GE_INC.iter().enumerate() {
        nrn.ge_inc = ge_inc;
        ac.ge_gi_fm_inc(&mut nrn);
        ac.vm_fm_g(&mut nrn);
        ac.act_fm_g(&mut nrn);
        assert!(
            (nrn.vm - WANT_VM[i]).abs() < 1e-5,
            "Vm at step {}: {} vs {}",
            i,
            nrn.vm,
            WANT_VM[i]
        );
        assert!(
            (nrn.act - WANT_ACT[i]).abs() < 1e-5,
            "Act at step {}: {} vs {}",
            i,
            nrn.act,
            WANT_ACT[i]
        );
        acts.push(nrn.act);
    }
    assert_non_decreasing(&acts, "Act");
}

/// Test: receiving activations follow input drive order
#[test]
fn test_layer_acts_follow_drive() {
    let mut net = drive_net();
    settle(&mut net, 2);
    let out = net.layer_by_name("Out").unwrap();
    let acts = out.unit_vals("Act").unwrap();
    assert_non_decreasing(&acts, "Out Act");
    assert!(acts[DRIVE.len() - 1] > acts[0], "strongest drive must win: {:?}", acts);

    let ge = out.unit_vals("Ge").unwrap();
    assert_non_decreasing(&ge, "Out Ge");
}

/// Step function at zero drive
struct Step;

impl ActivationFunction for Step {
    fn activation(&self, x: f32) -> f32 {
        if x > 0.0 {
            1.0
        } else {
            0.0
        }
    }
}

/// Test: an installed activation function replaces XX1 for that layer only
#[test]
fn test_custom_activation_function() {
    let mut net = drive_net();
    net.layer_by_name_mut("Out")
        .unwrap()
        .set_activation_fn(Arc::new(Step));
    settle(&mut net, 2);
    let acts = net.layer_by_name("Out").unwrap().unit_vals("Act").unwrap();
    assert_non_decreasing(&acts, "step Act");
    for a in &acts {
        assert!((0.0..=1.0).contains(a), "act out of range: {}", a);
    }
}
