// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! # Leabra Engine
//!
//! Layers, projections and the network that runs them.
//!
//! ## Architecture
//! - Layers own their neurons and pools
//! - Projections live in a network-level arena and index their send / recv layers
//! - Each phase is a barrier: a rayon scope with one task per thread bucket
//! - Projection state written during a phase belongs to exactly one layer's
//!   bucket, so no phase needs a lock
//!
//! Results are identical for any thread count.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod error;
pub mod kinds;
pub mod pattern;
pub mod pool;
pub mod shape;
pub mod time;

pub mod layer;
pub mod network;
pub mod projection;

pub mod params;
pub mod weights;

pub use error::{EngineError, EngineResult};
pub use kinds::{Channel, KindRegistry, LayerType, PrjnType};
pub use layer::Layer;
pub use network::{Network, PhaseTiming, DEFAULT_WT_BAL_INTERVAL};
pub use params::{ParamRule, ParamSheet};
pub use pattern::{Connectivity, ConnectivityPattern, Full, OneToOne, PatternRegistry};
pub use pool::{ActAvg, Pool};
pub use projection::{Projection, WtScaleParams};
pub use shape::Shape;
pub use time::Time;
pub use weights::{LayerWeights, NetWeights, PrjnWeights, RecvWeights};
