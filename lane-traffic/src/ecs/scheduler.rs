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
//! Staged system scheduler
//!
//! Systems are organized into stages. Every system of a stage receives the
//! combined handle of the previous stage as its input dependency, so its
//! jobs start only after everything earlier has finished. Systems within a
//! stage share the same input and their jobs may overlap on the pool.

use crate::ecs::system::{System, SystemContext};
use crate::jobs::JobHandle;

/// Stage identifier for grouping systems
///
/// Stages execute in ascending order; systems in one stage run side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StageId(pub usize);

impl StageId {
    /// Create a new stage ID
    pub fn new(id: usize) -> Self {
        StageId(id)
    }
}

/// Stages of the traffic tick
pub mod stages {
    use super::StageId;

    /// Slot occupancy and car recycling
    pub const SPAWN: StageId = StageId(0);

    /// Wheel speed and rotation follow their cars
    pub const WHEEL_SYNC: StageId = StageId(1);
}

/// A system with metadata for scheduling
struct ScheduledSystem {
    system: Box<dyn System>,
    stage: StageId,
}

/// System scheduler with staged dependency chaining
///
/// # Examples
///
/// ```
/// use lane_traffic::ecs::scheduler::{Scheduler, stages};
/// use lane_traffic::ecs::{System, SystemContext};
/// use lane_traffic::jobs::JobHandle;
///
/// struct Idle;
/// impl System for Idle {
///     fn update(&mut self, _ctx: &SystemContext<'_>, input: JobHandle) -> JobHandle {
///         input
///     }
/// }
///
/// let mut scheduler = Scheduler::new();
/// scheduler.add_system(Idle, stages::WHEEL_SYNC);
/// assert_eq!(scheduler.stage_count(), 2);
/// ```
pub struct Scheduler {
    systems: Vec<ScheduledSystem>,
}

impl Scheduler {
    /// Create a new scheduler
    pub fn new() -> Self {
        Scheduler { systems: Vec::new() }
    }

    /// Add a system to a specific stage
    ///
    /// Systems of the same stage keep their insertion order.
    pub fn add_system<S: System + 'static>(&mut self, system: S, stage: StageId) {
        self.systems.push(ScheduledSystem {
            system: Box::new(system),
            stage,
        });
        self.systems.sort_by_key(|s| s.stage);
    }

    /// Get the number of registered systems
    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Get the number of stages in use
    pub fn stage_count(&self) -> usize {
        self.systems.iter().map(|s| s.stage.0 + 1).max().unwrap_or(0)
    }

    /// Names of the registered systems in execution order
    pub fn system_names(&self) -> Vec<&str> {
        self.systems.iter().map(|s| s.system.name()).collect()
    }

    /// Schedule every system for one tick, chaining stages after `input`
    ///
    /// Returns the handle of the last stage.
    pub fn run(&mut self, ctx: &SystemContext<'_>, input: JobHandle) -> JobHandle {
        let mut stage_input = input;
        let mut index = 0;

        while index < self.systems.len() {
            let stage = self.systems[index].stage;
            let mut outputs = Vec::new();
            while index < self.systems.len() && self.systems[index].stage == stage {
                let scheduled = &mut self.systems[index];
                outputs.push(scheduled.system.update(ctx, stage_input.clone()));
                index += 1;
            }
            stage_input = JobHandle::combine_all(&outputs);
        }

        stage_input
    }

    /// Clear all systems from the scheduler
    pub fn clear(&mut self) {
        self.systems.clear();
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
