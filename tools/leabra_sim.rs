// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! leabra-sim: trains a small pattern-association network
//!
//! Input(4) → Hidden(4x4) → Output(4), with a top-down Back projection from
//! Output to Hidden. Each epoch presents every pattern once with learning on;
//! training stops when the epoch's summed Output SSE reaches zero or the
//! epoch limit is hit.

use anyhow::{Context, Result};
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{info, warn};

use leabra::config::{
    apply_cli_overrides, apply_environment_overrides, find_config_file, load_config,
    validate_config, LeabraConfig,
};
use leabra::engine::{LayerType, Network, ParamRule, ParamSheet};
use leabra::observability::{debug_flags_help, init_logging, CrateDebugFlags};
use leabra::setup::{configure_network, logging_config, param_sheet, trial_time};

/// Leabra simulator - pattern association with error-driven and Hebbian learning
#[derive(Parser, Debug)]
#[command(name = "leabra-sim", version, long_about = None, after_help = debug_flags_help())]
struct Args {
    /// Path to a leabra_configuration.toml (searched for if omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Worker threads (0 = one per layer thread assignment)
    #[arg(long)]
    threads: Option<usize>,

    /// Maximum training epochs
    #[arg(long)]
    epochs: Option<usize>,

    /// Root random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Write the trained weights as JSON to this path
    #[arg(long)]
    save_weights: Option<PathBuf>,
}

const PATTERNS: [([f32; 4], [f32; 4]); 4] = [
    ([1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]),
    ([0.0, 1.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0]),
    ([0.0, 0.0, 1.0, 0.0], [0.0, 0.0, 0.0, 1.0]),
    ([0.0, 0.0, 0.0, 1.0], [1.0, 0.0, 0.0, 0.0]),
];

fn main() -> Result<()> {
    // `--debug-*` flags are handled here, everything else goes to clap
    let mut debug_args = Vec::new();
    let mut clap_args = Vec::new();
    for (i, arg) in std::env::args().enumerate() {
        if i > 0 && arg.starts_with("--debug-") {
            debug_args.push(arg);
        } else {
            clap_args.push(arg);
        }
    }
    let args = Args::parse_from(clap_args);

    let config = resolve_config(&args)?;

    let mut debug_flags =
        CrateDebugFlags::from_args(debug_args).with_base_level(&config.system.log_level);
    if let Ok(list) = std::env::var("LEABRA_DEBUG") {
        debug_flags.enable_list(&list);
    }
    let _log_guard = init_logging(&debug_flags, &logging_config(&config))?;

    let mut net = build_network(&config)?;
    net.init_wts();

    let mut time = trial_time(&config);
    let tol = config.training.sse_tolerance;
    let mut converged_at = None;

    for epoch in 0..config.training.epochs {
        let mut epoch_sse = 0.0;
        for (input, target) in PATTERNS.iter() {
            net.run_trial(
                &mut time,
                &[("Input", &input[..]), ("Output", &target[..])],
                true,
            )?;
            epoch_sse += net.sse(&["Output"], tol)?;
        }
        info!("[LEABRA-NET] epoch {:>3}: sse={:.4}", epoch, epoch_sse);
        if epoch_sse == 0.0 {
            converged_at.get_or_insert(epoch);
            if config.training.stop_on_zero_sse {
                break;
            }
        }
    }

    match converged_at {
        Some(epoch) => info!("[LEABRA-NET] reached zero SSE at epoch {}", epoch),
        None => warn!(
            "[LEABRA-NET] SSE still above zero after {} epochs",
            config.training.epochs
        ),
    }
    net.log_timer_report();

    if let Some(path) = &args.save_weights {
        let json = serde_json::to_string_pretty(&net.weights())
            .context("Failed to serialize weights")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write weights to {}", path.display()))?;
        info!("[LEABRA-WTS] saved weights to {}", path.display());
    }

    Ok(())
}

/// File (explicit or discovered) or defaults, then env and CLI overrides
fn resolve_config(args: &Args) -> Result<LeabraConfig> {
    let mut cli = HashMap::new();
    if let Some(threads) = args.threads {
        cli.insert("threads".to_string(), threads.to_string());
    }
    if let Some(epochs) = args.epochs {
        cli.insert("epochs".to_string(), epochs.to_string());
    }
    if let Some(seed) = args.seed {
        cli.insert("seed".to_string(), seed.to_string());
    }

    let path = match &args.config {
        Some(path) => Some(path.clone()),
        None => find_config_file().ok(),
    };
    let config = match path {
        Some(path) => load_config(Some(&path), Some(&cli))
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => {
            let mut config = LeabraConfig::default();
            apply_environment_overrides(&mut config);
            apply_cli_overrides(&mut config, &cli);
            config
        }
    };
    validate_config(&config)?;
    Ok(config)
}

fn build_network(config: &LeabraConfig) -> Result<Network> {
    let mut net = Network::new("PatAssoc");
    net.add_layer("Input", &[4], LayerType::Input)?;
    net.add_layer_2d("Hidden", 4, 4, LayerType::Hidden)?;
    net.add_layer("Output", &[4], LayerType::Target)?;
    for (li, ly) in ["Input", "Hidden", "Output"].iter().enumerate() {
        net.layer_by_name_mut(ly)?.thread = li;
    }

    net.connect_layer_names("Input", "Hidden", "Full", "Forward")?;
    net.bidir_connect_layer_names("Hidden", "Output", "Full")?;

    // Top-down input is weaker than bottom-up
    let mut base = ParamSheet::new("Base");
    base.push(ParamRule::new("Back").with("Prjn.WtScale.Rel", 0.3));
    net.apply_params(&base)?;
    net.apply_params(&param_sheet(config, "Config"))?;

    configure_network(&mut net, config)?;
    net.build()?;
    Ok(net)
}
