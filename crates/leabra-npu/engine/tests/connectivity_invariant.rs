// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for the bidirectional synapse index
//!
//! Every built projection must index the same edge set from both sides:
//! equal connection totals, and each receiver-side slot pointing at the
//! sender-owned synapse of the right sender.

use leabra_npu_engine::{
    Connectivity, ConnectivityPattern, EngineError, LayerType, Network, Projection, Shape,
};
use std::sync::Arc;

/// Sender `si` connects to receiver `ri` when `(si + ri) % 3 != 0`
struct Sparse;

impl ConnectivityPattern for Sparse {
    fn name(&self) -> &str {
        "Sparse"
    }

    fn connect(&self, send: &Shape, recv: &Shape, _same_layer: bool) -> Connectivity {
        let mut cons = Connectivity::new(send.len(), recv.len());
        for ri in 0..recv.len() {
            for si in 0..send.len() {
                if (si + ri) % 3 != 0 {
                    cons.connect(si, ri);
                }
            }
        }
        cons
    }
}

fn assert_index_consistent(pj: &Projection) {
    let send_total: u32 = pj.s_con_n.iter().sum();
    let recv_total: u32 = pj.r_con_n.iter().sum();
    assert_eq!(send_total, recv_total, "{}: send/recv totals differ", pj.name);
    assert_eq!(pj.syns.len(), send_total as usize, "{}: synapse count", pj.name);

    for ri in 0..pj.n_recv() {
        let st = pj.r_con_idx_st[ri] as usize;
        for k in st..st + pj.r_con_n[ri] as usize {
            let si = pj.r_con_idx[k] as usize;
            let syn = pj.r_syn_idx[k];
            let sst = pj.s_con_idx_st[si];
            assert!(
                syn >= sst && syn < sst + pj.s_con_n[si],
                "{}: recv {} slot {} points outside sender {}'s synapses",
                pj.name,
                ri,
                k,
                si
            );
            assert_eq!(
                pj.s_con_idx[syn as usize] as usize, ri,
                "{}: synapse {} does not lead back to recv {}",
                pj.name, syn, ri
            );
            assert_eq!(pj.syn_index(si, ri).unwrap(), syn as usize);
        }
    }
}

fn build_net() -> Network {
    let mut net = Network::new("Conn");
    net.add_layer("A", &[5], LayerType::Input).unwrap();
    net.add_layer_2d("B", 3, 4, LayerType::Hidden).unwrap();
    net.add_layer("C", &[7], LayerType::Target).unwrap();
    net.patterns_mut().register("Sparse", || Arc::new(Sparse));

    net.connect_layer_names("A", "B", "Full", "Forward").unwrap();
    net.connect_layer_names("B", "B", "Full", "Lateral").unwrap();
    net.connect_layer_names("B", "C", "Sparse", "Forward").unwrap();
    net.connect_layer_names("C", "B", "Sparse", "Back").unwrap();
    net.connect_layer_names("A", "C", "OneToOne", "Forward").unwrap();
    net.build().unwrap();
    net
}

/// Test: both index directions agree for every pattern
#[test]
fn test_all_projections_index_consistently() {
    let net = build_net();
    assert_eq!(net.prjns().len(), 5);
    for pj in net.prjns() {
        assert!(pj.is_built(), "{} should be built", pj.name);
        assert_index_consistent(pj);
    }
}

/// Test: connection counts match what each pattern generates
#[test]
fn test_pattern_connection_counts() {
    let net = build_net();
    let full = net.prjn_between("A", "B").unwrap();
    assert_eq!(full.syns.len(), 5 * 12);
    assert!(full.r_con_n.iter().all(|&n| n == 5));

    let lateral = net.prjn_between("B", "B").unwrap();
    assert_eq!(lateral.syns.len(), 12 * 11, "no self connections by default");
    assert!(lateral.syn_index(3, 3).is_err());

    let one = net.prjn_between("A", "C").unwrap();
    assert_eq!(one.syns.len(), 5);
    assert!(one.r_con_n[5..].iter().all(|&n| n == 0));
}

/// Test: unconnected and out-of-range pairs are errors, not panics
#[test]
fn test_synapse_lookup_errors() {
    let net = build_net();
    let sparse = net.prjn_between("B", "C").unwrap();
    assert!(matches!(
        sparse.syn_index(0, 0),
        Err(EngineError::SynapseNotFound { send: 0, recv: 0 })
    ));
    assert!(matches!(
        sparse.syn_index(0, 99),
        Err(EngineError::IndexOutOfRange { .. })
    ));
    assert!(matches!(
        sparse.syn_index(99, 1),
        Err(EngineError::IndexOutOfRange { .. })
    ));
}
