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
//! Lane traffic on top of the ECS and job scheduler
//!
//! - [`components`]: cars, wheels and generation slots
//! - [`index`]: car lookup by id
//! - [`random`]: per-tick, per-slot random streams
//! - [`wheel_sync`]: wheels follow their cars
//! - [`spawn`]: disabled cars are recycled into free slots
//! - [`setup`]: initial entities from prefab descriptions
//! - [`driver`]: the per-tick [`Simulation`]

pub mod components;
pub mod driver;
pub mod index;
pub mod random;
pub mod setup;
pub mod spawn;
pub mod wheel_sync;

pub use components::{Car, CarId, GenerationSlot, Hero, Wheel, WheelRotation, WheelSet};
pub use driver::{HeroStatus, PauseReason, RunState, Simulation};
pub use setup::{populate, Prefab, SetupSummary, TrackLayout};
pub use spawn::{SpawnParams, SpawnSystem};
pub use wheel_sync::{LinearRotation, RotationRate, WheelSyncSystem};
