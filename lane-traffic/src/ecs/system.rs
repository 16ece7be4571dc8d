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
//! System execution framework
//!
//! A system does not touch component data itself. Each tick it inspects the
//! world, schedules jobs that capture the chunks they need, and returns the
//! handle of its last job so later systems can depend on it.

use crate::ecs::World;
use crate::jobs::{JobHandle, JobScheduler};

/// Simulation clock as seen by systems
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickTime {
    /// Elapsed simulation time in seconds
    pub now: f64,
    /// Tick index, starting at 0
    pub tick: u64,
}

/// Everything a system may use while scheduling
pub struct SystemContext<'a> {
    /// World to query; structural changes must go through its command buffer
    pub world: &'a World,
    /// Job scheduler
    pub jobs: &'a JobScheduler,
    /// Current tick time
    pub time: TickTime,
}

/// Trait for systems that schedule work on the ECS world
pub trait System: Send {
    /// Schedule this tick's jobs after `input_deps` and return a handle
    /// covering all of them
    ///
    /// A system that cannot schedule logs the reason and returns its input.
    fn update(&mut self, ctx: &SystemContext<'_>, input_deps: JobHandle) -> JobHandle;

    /// Get the name of this system for debugging
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
