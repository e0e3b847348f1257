// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Parameter Sheets
//!
//! An ordered list of rules, each pairing a selector with parameter values.
//! Rules apply in order, so a later rule overrides an earlier one on any
//! target both select.
//!
//! Selectors:
//! - `Layer` / `Prjn`: every layer / every projection
//! - `#Name`: the layer or projection with that name
//! - `.Class`: targets whose class list contains `Class` (projections also
//!   match their kind name)
//! - anything else: a layer or projection kind name, e.g. `Hidden`, `Back`
//!
//! Value paths start with the target: `Layer.Inhib.Layer.Gi`,
//! `Prjn.Learn.Lrate`.

use crate::error::EngineResult;
use crate::kinds::KindRegistry;
use crate::layer::Layer;
use crate::network::Network;
use crate::projection::Projection;
use leabra_npu_neural::types::params::split_path;
use leabra_npu_neural::NeuralError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParamRule {
    pub selector: String,
    #[serde(default)]
    pub values: BTreeMap<String, f32>,
}

impl ParamRule {
    pub fn new(selector: &str) -> Self {
        Self {
            selector: selector.to_string(),
            values: BTreeMap::new(),
        }
    }

    /// Builder-style value insert
    pub fn with(mut self, path: &str, value: f32) -> Self {
        self.values.insert(path.to_string(), value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParamSheet {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub rules: Vec<ParamRule>,
}

enum Selector<'a> {
    AllLayers,
    AllPrjns,
    Name(&'a str),
    Class(&'a str),
    Kind(&'a str),
}

impl<'a> Selector<'a> {
    fn parse(sel: &'a str) -> Self {
        let sel = sel.trim();
        if sel == "Layer" {
            Selector::AllLayers
        } else if sel == "Prjn" {
            Selector::AllPrjns
        } else if let Some(name) = sel.strip_prefix('#') {
            Selector::Name(name)
        } else if let Some(cls) = sel.strip_prefix('.') {
            Selector::Class(cls)
        } else {
            Selector::Kind(sel)
        }
    }

    fn matches_layer(&self, ly: &Layer) -> bool {
        match self {
            Selector::AllLayers => true,
            Selector::AllPrjns => false,
            Selector::Name(n) => ly.name == *n,
            Selector::Class(c) => ly.class.split_whitespace().any(|lc| lc == *c),
            Selector::Kind(k) => ly.kind.name() == *k,
        }
    }

    fn matches_prjn(&self, pj: &Projection, kinds: &KindRegistry) -> bool {
        match self {
            Selector::AllLayers => false,
            Selector::AllPrjns => true,
            Selector::Name(n) => pj.name == *n,
            Selector::Class(c) => {
                pj.class.split_whitespace().any(|pc| pc == *c) || kinds.name_of(pj.kind) == *c
            }
            Selector::Kind(k) => kinds.name_of(pj.kind) == *k,
        }
    }
}

impl ParamSheet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rules: Vec::new(),
        }
    }

    pub fn push(&mut self, rule: ParamRule) {
        self.rules.push(rule);
    }

    /// Apply every rule in order; returns the number of values set.
    ///
    /// Stops at the first path that does not resolve.
    pub fn apply(&self, net: &mut Network) -> EngineResult<usize> {
        let mut applied = 0;
        for rule in &self.rules {
            let sel = Selector::parse(&rule.selector);
            let mut hits = 0;
            for (path, &value) in &rule.values {
                let (head, rest) = split_path(path);
                match head {
                    "Layer" => {
                        for ly in net.layers.iter_mut().filter(|ly| sel.matches_layer(ly)) {
                            ly.set_param(rest, value)?;
                            hits += 1;
                        }
                    }
                    "Prjn" => {
                        let kinds = &net.kinds;
                        for pj in net
                            .prjns
                            .iter_mut()
                            .filter(|pj| sel.matches_prjn(pj, kinds))
                        {
                            pj.set_param(rest, value)?;
                            hits += 1;
                        }
                    }
                    _ => return Err(NeuralError::UnknownParam(path.clone()).into()),
                }
            }
            for ly in net.layers.iter_mut().filter(|ly| sel.matches_layer(ly)) {
                ly.update_params();
            }
            let kinds = &net.kinds;
            for pj in net.prjns.iter_mut().filter(|pj| sel.matches_prjn(pj, kinds)) {
                pj.update_params();
            }
            if hits == 0 {
                debug!(
                    "[LEABRA-PARAMS] {}: rule {} matched no layers or projections",
                    self.name, rule.selector
                );
            }
            applied += hits;
        }
        info!(
            "[LEABRA-PARAMS] Applied sheet {}: {} rules, {} values set",
            self.name,
            self.rules.len(),
            applied
        );
        Ok(applied)
    }
}

impl Network {
    /// Apply a parameter sheet; see [`ParamSheet::apply`]
    pub fn apply_params(&mut self, sheet: &ParamSheet) -> EngineResult<usize> {
        sheet.apply(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::kinds::LayerType;

    fn net() -> Network {
        let mut net = Network::new("P");
        net.add_layer("In", &[2], LayerType::Input).unwrap();
        net.add_layer("Hid", &[2], LayerType::Hidden).unwrap();
        net.add_layer("Out", &[2], LayerType::Target).unwrap();
        net.connect_layer_names("In", "Hid", "Full", "Forward")
            .unwrap();
        net.bidir_connect_layer_names("Hid", "Out", "Full").unwrap();
        net.layer_by_name_mut("Hid").unwrap().class = "Inner Wide".into();
        net
    }

    #[test]
    fn test_later_rules_override() {
        let mut n = net();
        let mut sheet = ParamSheet::new("Base");
        sheet.push(ParamRule::new("Layer").with("Layer.Inhib.Layer.Gi", 2.0));
        sheet.push(ParamRule::new("#Hid").with("Layer.Inhib.Layer.Gi", 1.5));
        assert_eq!(sheet.apply(&mut n).unwrap(), 4);
        assert_eq!(n.layer_by_name("In").unwrap().inhib.layer.gi, 2.0);
        assert_eq!(n.layer_by_name("Hid").unwrap().inhib.layer.gi, 1.5);
    }

    #[test]
    fn test_class_and_kind_selectors() {
        let mut n = net();
        let mut sheet = ParamSheet::new("Sel");
        sheet.push(ParamRule::new(".Wide").with("Layer.Act.Init.Decay", 0.0));
        sheet.push(ParamRule::new(".Back").with("Prjn.WtScale.Rel", 0.2));
        sheet.push(ParamRule::new("Target").with("Layer.Act.Clamp.Gain", 0.5));
        sheet.apply(&mut n).unwrap();
        assert_eq!(n.layer_by_name("Hid").unwrap().act.init.decay, 0.0);
        assert_eq!(n.layer_by_name("In").unwrap().act.init.decay, 1.0);
        assert_eq!(n.prjn_between("Out", "Hid").unwrap().wt_scale.rel, 0.2);
        assert_eq!(n.prjn_between("Hid", "Out").unwrap().wt_scale.rel, 1.0);
        assert_eq!(n.layer_by_name("Out").unwrap().act.clamp.gain, 0.5);
    }

    #[test]
    fn test_update_hook_runs() {
        let mut n = net();
        let mut sheet = ParamSheet::new("Dt");
        sheet.push(ParamRule::new("#Hid").with("Layer.Act.Dt.VmTau", 4.0));
        sheet.apply(&mut n).unwrap();
        assert!((n.layer_by_name("Hid").unwrap().act.dt.vm_dt - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_path_surfaces() {
        let mut n = net();
        let mut sheet = ParamSheet::new("Bad");
        sheet.push(ParamRule::new("Prjn").with("Prjn.Learn.Bogus", 1.0));
        match sheet.apply(&mut n) {
            Err(EngineError::Param(NeuralError::UnknownParam(p))) => {
                assert_eq!(p, "Prjn.Learn.Bogus")
            }
            other => panic!("unexpected {:?}", other),
        }
        let mut sheet = ParamSheet::new("BadHead");
        sheet.push(ParamRule::new("Layer").with("Net.Gi", 1.0));
        assert!(sheet.apply(&mut n).is_err());
    }
}
