// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! # Lane Traffic
//!
//! The simulation core of an endless-lane driving game, built on a small
//! chunked ECS and a dependency-tracked job scheduler.
//!
//! ## Features
//!
//! - **Chunked Store**: archetype chunks with per-column read/write views
//! - **Deferred Commands**: spawns and despawns applied between ticks
//! - **Job Scheduling**: declared access, dependency handles, Rayon workers
//! - **Traffic Systems**: car recycling into generation slots and wheel sync
//!
//! ## Example
//!
//! ```rust
//! use lane_traffic::{SimConfig, Simulation};
//! use lane_traffic::traffic::CarId;
//!
//! let mut sim = Simulation::new(SimConfig::default()).unwrap();
//! sim.disable_car(CarId(0));
//! for step in 1..=10 {
//!     sim.tick(step as f64 * 0.02);
//! }
//! sim.complete();
//! assert!(sim.hero_status().is_some());
//! ```

#![warn(missing_docs)]

/// Simulation configuration
pub mod config;

/// Entity Component System implementation
pub mod ecs;

/// Error types
pub mod error;

/// Job handles, access declarations and the worker-pool scheduler
pub mod jobs;

/// Traffic components, systems and the tick driver
pub mod traffic;

pub use config::SimConfig;
pub use ecs::{Entity, World};
pub use error::{TrafficError, TrafficResult};
pub use traffic::Simulation;
