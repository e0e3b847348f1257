// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Layer and projection kinds
//!
//! Kinds are closed enums. Projection kinds carry one extension variant,
//! [`PrjnType::Ext`], whose name and conductance channel are looked up in a
//! [`KindRegistry`] once, when the projection is created.

use crate::error::{EngineError, EngineResult};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LayerType {
    #[default]
    Hidden,
    /// Clamped to external input for the whole trial
    Input,
    /// Clamped to the target in the plus phase
    Target,
    /// Target values recorded for comparison only, never clamped
    Compare,
}

impl LayerType {
    pub fn name(&self) -> &'static str {
        match self {
            LayerType::Hidden => "Hidden",
            LayerType::Input => "Input",
            LayerType::Target => "Target",
            LayerType::Compare => "Compare",
        }
    }

    pub fn from_name(name: &str) -> EngineResult<Self> {
        match name {
            "Hidden" => Ok(LayerType::Hidden),
            "Input" => Ok(LayerType::Input),
            "Target" => Ok(LayerType::Target),
            "Compare" => Ok(LayerType::Compare),
            _ => Err(EngineError::UnknownKind(name.to_string())),
        }
    }
}

/// Conductance channel a projection feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Excitatory,
    Inhibitory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PrjnType {
    #[default]
    Forward,
    /// Top-down feedback
    Back,
    Lateral,
    /// Feeds GiInc instead of GeInc
    Inhib,
    /// Registered extension kind
    Ext(u16),
}

impl PrjnType {
    /// Name of a built-in kind; extension kinds need the registry
    pub fn builtin_name(&self) -> Option<&'static str> {
        match self {
            PrjnType::Forward => Some("Forward"),
            PrjnType::Back => Some("Back"),
            PrjnType::Lateral => Some("Lateral"),
            PrjnType::Inhib => Some("Inhib"),
            PrjnType::Ext(_) => None,
        }
    }

    pub fn from_name(name: &str, registry: &KindRegistry) -> EngineResult<Self> {
        match name {
            "Forward" => Ok(PrjnType::Forward),
            "Back" => Ok(PrjnType::Back),
            "Lateral" => Ok(PrjnType::Lateral),
            "Inhib" => Ok(PrjnType::Inhib),
            _ => registry
                .lookup(name)
                .ok_or_else(|| EngineError::UnknownKind(name.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
struct ExtKind {
    name: String,
    channel: Channel,
}

/// Extension point for projection kinds beyond the built-in four
#[derive(Debug, Clone, Default)]
pub struct KindRegistry {
    kinds: Vec<ExtKind>,
    by_name: AHashMap<String, u16>,
}

impl KindRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an extension kind, returning its handle. Re-registering a
    /// name returns the existing handle.
    pub fn register(&mut self, name: &str, channel: Channel) -> EngineResult<PrjnType> {
        if PrjnType::from_name(name, &KindRegistry::default()).is_ok() {
            return Err(EngineError::UnknownKind(format!(
                "{} is a built-in projection kind",
                name
            )));
        }
        if let Some(&id) = self.by_name.get(name) {
            return Ok(PrjnType::Ext(id));
        }
        let id = u16::try_from(self.kinds.len())
            .map_err(|_| EngineError::UnknownKind(format!("too many kinds registering {}", name)))?;
        self.kinds.push(ExtKind {
            name: name.to_string(),
            channel,
        });
        self.by_name.insert(name.to_string(), id);
        Ok(PrjnType::Ext(id))
    }

    pub fn lookup(&self, name: &str) -> Option<PrjnType> {
        self.by_name.get(name).map(|&id| PrjnType::Ext(id))
    }

    /// Display name of any kind
    pub fn name_of(&self, kind: PrjnType) -> String {
        match kind {
            PrjnType::Ext(id) => self
                .kinds
                .get(id as usize)
                .map(|k| k.name.clone())
                .unwrap_or_else(|| format!("Ext({})", id)),
            other => other.builtin_name().unwrap_or_default().to_string(),
        }
    }

    /// Conductance channel of any kind; unregistered extensions are excitatory
    pub fn channel_of(&self, kind: PrjnType) -> Channel {
        match kind {
            PrjnType::Inhib => Channel::Inhibitory,
            PrjnType::Ext(id) => self
                .kinds
                .get(id as usize)
                .map(|k| k.channel)
                .unwrap_or(Channel::Excitatory),
            _ => Channel::Excitatory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_type_names_round_trip() {
        for lt in [
            LayerType::Hidden,
            LayerType::Input,
            LayerType::Target,
            LayerType::Compare,
        ] {
            assert_eq!(LayerType::from_name(lt.name()).unwrap(), lt);
        }
        assert!(LayerType::from_name("Output").is_err());
    }

    #[test]
    fn test_registered_kind_resolves_with_channel() {
        let mut reg = KindRegistry::new();
        let ctxt = reg.register("CTCtxt", Channel::Excitatory).unwrap();
        let gaba = reg.register("GABA", Channel::Inhibitory).unwrap();
        assert_ne!(ctxt, gaba);
        assert_eq!(PrjnType::from_name("GABA", &reg).unwrap(), gaba);
        assert_eq!(reg.channel_of(gaba), Channel::Inhibitory);
        assert_eq!(reg.name_of(ctxt), "CTCtxt");
        assert_eq!(reg.register("CTCtxt", Channel::Excitatory).unwrap(), ctxt);
    }

    #[test]
    fn test_builtin_names_cannot_be_registered() {
        let mut reg = KindRegistry::new();
        assert!(reg.register("Inhib", Channel::Inhibitory).is_err());
        assert_eq!(reg.channel_of(PrjnType::Inhib), Channel::Inhibitory);
        assert_eq!(reg.channel_of(PrjnType::Back), Channel::Excitatory);
    }
}
