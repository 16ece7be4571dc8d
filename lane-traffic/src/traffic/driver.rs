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
//! Per-tick simulation driver
//!
//! [`Simulation::tick`] waits for the previous tick, applies deferred
//! structural commands, checks the hero and then schedules the stage chain
//! `SPAWN -> WHEEL_SYNC` without blocking. The returned handle is kept until
//! the next tick or an explicit [`Simulation::complete`].

use crate::config::SimConfig;
use crate::ecs::scheduler::{stages, Scheduler};
use crate::ecs::{Entity, SystemContext, TickTime, World};
use crate::error::{SetupError, TrafficError};
use crate::jobs::{JobHandle, JobScheduler};
use crate::traffic::components::{Car, CarId};
use crate::traffic::setup::{populate, TrackLayout};
use crate::traffic::spawn::{SpawnParams, SpawnSystem};
use crate::traffic::wheel_sync::{LinearRotation, WheelSyncSystem};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Why the simulation stopped scheduling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseReason {
    /// The hero's collided flag was set
    HeroCollided,
}

/// Whether ticks schedule work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    /// Systems run every tick
    #[default]
    Running,
    /// Ticks only apply pending commands
    Paused(PauseReason),
}

impl RunState {
    /// Check whether the simulation is paused
    pub fn is_paused(&self) -> bool {
        matches!(self, RunState::Paused(_))
    }
}

/// Hero readout for the presentation layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeroStatus {
    /// Exact speed
    pub speed: f64,
    /// Speed rounded for display
    pub display_speed: i64,
    /// Hit by another car
    pub collided: bool,
}

/// Owns the world, the worker pool and the registered systems
pub struct Simulation {
    world: World,
    jobs: JobScheduler,
    systems: Scheduler,
    pending: JobHandle,
    state: RunState,
    tick: u64,
    hero: Option<(Entity, CarId)>,
    cars: HashMap<CarId, Entity>,
    recycled: Arc<AtomicU64>,
    diagnostics: Vec<SetupError>,
}

impl Simulation {
    /// Build a simulation on the default track
    pub fn new(config: SimConfig) -> Result<Self, TrafficError> {
        Self::setup(config, &TrackLayout::default())
    }

    /// Validate the configuration, populate the world and register systems
    pub fn setup(config: SimConfig, layout: &TrackLayout) -> Result<Self, TrafficError> {
        config.validate()?;

        let mut world = World::with_chunk_capacity(config.chunk_capacity);
        let summary = populate(&mut world, layout, &config)?;
        let jobs = JobScheduler::new(config.worker_threads)?;

        let spawn = SpawnSystem::new(SpawnParams::from_config(&config), config.seed);
        let recycled = spawn.recycle_counter();
        let mut systems = Scheduler::new();
        systems.add_system(spawn, stages::SPAWN);
        systems.add_system(
            WheelSyncSystem::new(LinearRotation {
                factor: config.wheel_rotation_factor,
            }),
            stages::WHEEL_SYNC,
        );

        let mut cars: HashMap<CarId, Entity> = summary.street_cars.iter().map(|(e, id)| (*id, *e)).collect();
        if let Some((entity, id)) = summary.hero {
            cars.insert(id, entity);
        }

        log::info!(
            "simulation ready: {} systems on {} worker threads",
            systems.system_count(),
            jobs.thread_count()
        );

        Ok(Simulation {
            world,
            jobs,
            systems,
            pending: JobHandle::completed(),
            state: RunState::Running,
            tick: 0,
            hero: summary.hero,
            cars,
            recycled,
            diagnostics: summary.diagnostics,
        })
    }

    /// Advance to simulation time `now`
    ///
    /// Waits for the previous tick, flushes commands, then schedules this
    /// tick's jobs unless paused. Returns the state after the check.
    pub fn tick(&mut self, now: f64) -> RunState {
        self.pending.wait();
        self.world.flush();

        if self.state.is_paused() {
            return self.state;
        }
        if self.hero_status().map_or(false, |status| status.collided) {
            log::info!("hero collided at t={:.2}, pausing", now);
            self.state = RunState::Paused(PauseReason::HeroCollided);
            return self.state;
        }

        let time = TickTime { now, tick: self.tick };
        let ctx = SystemContext {
            world: &self.world,
            jobs: &self.jobs,
            time,
        };
        self.pending = self.systems.run(&ctx, self.pending.clone());
        self.tick += 1;
        self.state
    }

    /// Block until the outstanding tick has finished
    pub fn complete(&self) {
        self.pending.wait();
    }

    /// Resume scheduling; the hero is checked again on the next tick
    pub fn resume(&mut self) {
        if self.state.is_paused() {
            log::info!("resuming simulation");
        }
        self.state = RunState::Running;
    }

    /// Current run state
    pub fn run_state(&self) -> RunState {
        self.state
    }

    /// Speed and collision state of the hero, if it exists
    pub fn hero_status(&self) -> Option<HeroStatus> {
        let (entity, _) = self.hero?;
        let car = self.world.get::<Car>(entity)?;
        Some(HeroStatus {
            speed: car.speed,
            display_speed: car.speed.round() as i64,
            collided: car.collided,
        })
    }

    /// Mutate a car between ticks
    ///
    /// Waits for the outstanding tick first.
    pub fn with_car_mut<R>(&mut self, id: CarId, f: impl FnOnce(&mut Car) -> R) -> Option<R> {
        self.complete();
        let entity = *self.cars.get(&id)?;
        self.world.store().with_mut::<Car, R>(entity, f)
    }

    /// Mark a car as scrolled off-screen; returns false for unknown ids
    pub fn disable_car(&mut self, id: CarId) -> bool {
        self.with_car_mut(id, |car| car.disabled = true).is_some()
    }

    /// Despawn a car and its wheels at the next tick
    pub fn despawn_car(&mut self, id: CarId) -> bool {
        let Some(entity) = self.cars.remove(&id) else {
            return false;
        };
        if self.hero.map(|(hero, _)| hero) == Some(entity) {
            self.hero = None;
        }
        self.world.despawn(entity);
        true
    }

    /// Id of the hero, if it exists
    pub fn hero_id(&self) -> Option<CarId> {
        self.hero.map(|(_, id)| id)
    }

    /// Copy of a car's state
    pub fn car(&self, id: CarId) -> Option<Car> {
        self.world.get::<Car>(*self.cars.get(&id)?)
    }

    /// Entity of a car
    pub fn car_entity(&self, id: CarId) -> Option<Entity> {
        self.cars.get(&id).copied()
    }

    /// Ids of all live cars, sorted
    pub fn car_ids(&self) -> Vec<CarId> {
        let mut ids: Vec<CarId> = self.cars.keys().copied().collect();
        ids.sort();
        ids
    }

    /// The world
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Number of ticks that scheduled work
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Cars recycled since setup
    ///
    /// Only counts ticks that have completed.
    pub fn recycled_total(&self) -> u64 {
        self.recycled.load(Ordering::Relaxed)
    }

    /// Prefabs skipped during setup
    pub fn diagnostics(&self) -> &[SetupError] {
        &self.diagnostics
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        self.pending.wait();
    }
}
