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
//! Wheel synchronization
//!
//! Every wheel copies its owning car's speed and spins by an increment
//! derived from that speed. One job is scheduled per wheel chunk; within a
//! job the unit of work is one wheel.

use crate::ecs::{Chunk, Query, System, SystemContext};
use crate::jobs::{Access, JobHandle};
use crate::traffic::components::{Car, Wheel, WheelRotation};
use crate::traffic::index::{CarIndex, CarIndexCache};
use std::sync::Arc;

/// Rotation applied per tick as a function of wheel speed
pub trait RotationRate: Send + Sync {
    /// Angle increment in radians for one tick at `speed`
    fn increment(&self, speed: f64) -> f64;
}

/// Increment proportional to speed
///
/// With a factor of 1.0 the wheel turns one radian per unit of speed per
/// tick, independent of wheel radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearRotation {
    /// Radians per tick per unit of speed
    pub factor: f64,
}

impl Default for LinearRotation {
    fn default() -> Self {
        LinearRotation { factor: 1.0 }
    }
}

impl RotationRate for LinearRotation {
    fn increment(&self, speed: f64) -> f64 {
        speed * self.factor
    }
}

impl<F> RotationRate for F
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    fn increment(&self, speed: f64) -> f64 {
        self(speed)
    }
}

/// Sync every wheel of one chunk with its car; returns how many found one
///
/// A wheel whose owner is not indexed keeps its previous speed.
pub fn sync_chunk(chunk: &Chunk, cars: &CarIndex, rate: &dyn RotationRate) -> usize {
    let (Some(mut wheels), Some(mut rotations)) = (chunk.write::<Wheel>(), chunk.write::<WheelRotation>()) else {
        return 0;
    };

    let mut matched = 0;
    for (wheel, rotation) in wheels.iter_mut().zip(rotations.iter_mut()) {
        match cars.get(wheel.owner).and_then(|slot| slot.speed()) {
            Some(speed) => {
                wheel.speed = speed;
                matched += 1;
            }
            None => log::trace!("wheel owner {} not found", wheel.owner),
        }
        rotation.advance(rate.increment(wheel.speed));
    }
    matched
}

/// Schedules [`sync_chunk`] over all wheel chunks
pub struct WheelSyncSystem {
    rate: Arc<dyn RotationRate>,
    cars: CarIndexCache,
    wheels: Query,
}

impl WheelSyncSystem {
    /// Create the system with a rotation model
    pub fn new(rate: impl RotationRate + 'static) -> Self {
        WheelSyncSystem {
            rate: Arc::new(rate),
            cars: CarIndexCache::new(),
            wheels: Query::new().with::<Wheel>().with::<WheelRotation>(),
        }
    }

    fn access(chunk: &Chunk) -> Access {
        Access::new()
            .read_any::<Car>()
            .write::<Wheel>()
            .write::<WheelRotation>()
            .scoped(chunk)
    }
}

impl Default for WheelSyncSystem {
    fn default() -> Self {
        WheelSyncSystem::new(LinearRotation::default())
    }
}

impl System for WheelSyncSystem {
    fn update(&mut self, ctx: &SystemContext<'_>, input_deps: JobHandle) -> JobHandle {
        let chunks = ctx.world.query(&self.wheels);
        if chunks.is_empty() {
            return input_deps;
        }

        let cars = self.cars.get(ctx.world.store());
        let mut handles = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let access = Self::access(&chunk);
            let cars = Arc::clone(&cars);
            let rate = Arc::clone(&self.rate);
            let job = ctx.jobs.schedule("wheel_sync", access, &input_deps, move || {
                sync_chunk(&chunk, &cars, rate.as_ref());
            });
            match job {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    log::error!("{}: {}", self.name(), err);
                    handles.push(input_deps.clone());
                    return JobHandle::combine_all(&handles);
                }
            }
        }
        JobHandle::combine_all(&handles)
    }

    fn name(&self) -> &str {
        "WheelSyncSystem"
    }
}
