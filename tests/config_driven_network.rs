// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end: TOML configuration file to a trained network

use leabra::prelude::*;
use leabra::setup::{configure_network, param_sheet, trial_time};
use std::collections::HashMap;
use std::fs;
use tempfile::TempDir;

const CONFIG: &str = r##"
[system]
threads = 2
seed = 9

[schedule]
cycles_per_quarter = 15
wt_bal_interval = 4

[training]
epochs = 3

[[params]]
selector = "Layer"
values = { "Layer.Inhib.Layer.Gi" = 1.6 }

[[params]]
selector = "#Out"
values = { "Layer.Inhib.Layer.Gi" = 1.3 }

[[params]]
selector = "Prjn"
values = { "Prjn.Learn.Lrate" = 0.08 }
"##;

fn network_from(config: &LeabraConfig) -> Network {
    let mut net = Network::new("FromConfig");
    net.add_layer("In", &[3], LayerType::Input).unwrap();
    net.add_layer("Hid", &[5], LayerType::Hidden).unwrap();
    net.add_layer("Out", &[3], LayerType::Target).unwrap();
    net.connect_layer_names("In", "Hid", "Full", "Forward")
        .unwrap();
    net.bidir_connect_layer_names("Hid", "Out", "Full").unwrap();
    configure_network(&mut net, config).unwrap();
    net.apply_params(&param_sheet(config, "Config")).unwrap();
    net.build().unwrap();
    net.init_wts();
    net
}

fn load(dir: &TempDir) -> LeabraConfig {
    let path = dir.path().join("leabra_configuration.toml");
    fs::write(&path, CONFIG).unwrap();
    let mut cli = HashMap::new();
    cli.insert("epochs".to_string(), "2".to_string());
    let config = load_config(Some(&path), Some(&cli)).unwrap();
    validate_config(&config).unwrap();
    config
}

#[test]
fn test_config_file_drives_network() {
    let dir = TempDir::new().unwrap();
    let config = load(&dir);
    assert_eq!(config.training.epochs, 2);

    let mut net = network_from(&config);
    assert_eq!(net.seed(), 9);
    assert_eq!(net.n_threads(), 2);
    assert_eq!(net.wt_bal_interval, 4);
    assert_eq!(net.layer_by_name("Hid").unwrap().inhib.layer.gi, 1.6);
    assert_eq!(net.layer_by_name("Out").unwrap().inhib.layer.gi, 1.3);

    let mut time = trial_time(&config);
    assert_eq!(time.cyc_per_qtr, 15);
    for _ in 0..config.training.epochs {
        net.run_trial(
            &mut time,
            &[("In", &[1.0, 0.0, 0.0][..]), ("Out", &[0.0, 0.0, 1.0][..])],
            true,
        )
        .unwrap();
    }
    assert_eq!(time.cycle_tot, 2 * 4 * 15);
    assert!(net.sse(&["Out"], 0.0).unwrap().is_finite());
}

#[test]
fn test_same_config_same_weights() {
    let dir = TempDir::new().unwrap();
    let config = load(&dir);
    let a = network_from(&config);
    let b = network_from(&config);
    assert_eq!(a.weights(), b.weights());
}
