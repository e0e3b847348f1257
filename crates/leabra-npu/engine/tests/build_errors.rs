// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for aggregated build failures

use leabra_npu_engine::{
    Connectivity, ConnectivityPattern, EngineError, LayerType, Network, PrjnType, Shape, Time,
};
use std::sync::Arc;

/// Always reports a 1x1 matrix regardless of the layer sizes
struct WrongSize;

impl ConnectivityPattern for WrongSize {
    fn name(&self) -> &str {
        "WrongSize"
    }

    fn connect(&self, _send: &Shape, _recv: &Shape, _same_layer: bool) -> Connectivity {
        Connectivity::new(1, 1)
    }
}

fn broken_net() -> Network {
    let mut net = Network::new("Broken");
    net.add_layer("In", &[3], LayerType::Input).unwrap();
    net.add_layer("Hid", &[4], LayerType::Hidden).unwrap();
    net.add_layer("Empty", &[0], LayerType::Hidden).unwrap();
    net.add_layer("Out", &[2], LayerType::Target).unwrap();
    net.connect_layer_names("In", "Hid", "Full", "Forward")
        .unwrap();
    net.connect_layer_names("Hid", "Out", "Full", "Forward")
        .unwrap();
    let (hid, out) = (
        net.layer_index("Hid").unwrap(),
        net.layer_index("Out").unwrap(),
    );
    net.connect_layers(out, hid, Arc::new(WrongSize), PrjnType::Back)
        .unwrap();
    net
}

/// Test: every failing piece reports, one message per line
#[test]
fn test_all_failures_are_collected() {
    let mut net = broken_net();
    let err = net.build().unwrap_err();
    let msgs = match &err {
        EngineError::Build(msgs) => msgs.clone(),
        other => panic!("expected build error, got {:?}", other),
    };
    assert!(msgs.len() >= 2, "{:?}", msgs);
    assert!(msgs.iter().any(|m| m.contains("Empty")), "{:?}", msgs);
    assert!(msgs.iter().any(|m| m.contains("OutToHid")), "{:?}", msgs);

    let text = err.to_string();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("Build failed:"));
    assert_eq!(lines.count(), msgs.len());
}

/// Test: the healthy part of a partly failed build still runs
#[test]
fn test_partial_build_still_runs() {
    let mut net = broken_net();
    assert!(net.build().is_err());
    assert!(net.is_built());
    assert!(!net.prjn_between("Out", "Hid").unwrap().is_built());
    assert!(net.prjn_between("In", "Hid").unwrap().is_built());

    net.init_wts();
    let mut time = Time::default();
    net.run_trial(
        &mut time,
        &[("In", &[1.0, 0.0, 1.0][..]), ("Out", &[1.0, 0.0][..])],
        true,
    )
    .unwrap();

    let hid = net.layer_by_name("Hid").unwrap();
    assert!(hid.unit_vals("ActM").unwrap().iter().all(|a| a.is_finite()));
    // unbuilt projections are left out of the weight tables
    let nw = net.weights();
    let hid_w = nw.layers.iter().find(|l| l.layer == "Hid").unwrap();
    assert_eq!(hid_w.prjns.len(), 1);
    assert_eq!(hid_w.prjns[0].from, "In");
}
