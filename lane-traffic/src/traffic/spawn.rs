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
//! Recycling of disabled street cars into generation slots
//!
//! # Per-slot decision
//!
//! 1. Throttle: a slot that recycled less than `min_spawn_interval` ago is
//!    left untouched.
//! 2. Occupancy is computed over every street car before anything else: the
//!    slot is occupied if some car lies closer than one car length along the
//!    track. The car length is the first queried car's `extents.z`.
//! 3. A free slot draws `selected` uniformly from `[0, slot_count)` on its
//!    own random stream. If the draw names this slot, it rolls a speed in
//!    `[speed_min, speed_max)` and claims the first disabled car it can.
//!
//! # Execution
//!
//! ```text
//!   input ──┬─ decide(slot 0) ─┐
//!           ├─ decide(slot 1) ─┼─ apply ── output
//!           └─ decide(slot n) ─┘
//! ```
//!
//! Decide jobs only read components. They compete for cars through a per-tick
//! [`ClaimTable`], so a car is claimed at most once. The apply job is the
//! only writer of cars and slots in the tick.

use crate::config::SimConfig;
use crate::ecs::components::Position;
use crate::ecs::{Chunk, Query, System, SystemContext};
use crate::jobs::{Access, JobHandle};
use crate::traffic::components::{Car, CarId, GenerationSlot, Hero};
use crate::traffic::random::TickRandom;
use parking_lot::Mutex;
use rand::Rng;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Tunables of the spawn decision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnParams {
    /// Minimum seconds between two recycles into one slot
    pub min_spawn_interval: f64,
    /// Lower bound (inclusive) of recycled speed
    pub speed_min: f64,
    /// Upper bound (exclusive) of recycled speed
    pub speed_max: f64,
    /// Range of the slot draw
    pub slot_count: usize,
}

impl SpawnParams {
    /// Take the spawn tunables from a configuration
    pub fn from_config(config: &SimConfig) -> Self {
        SpawnParams {
            min_spawn_interval: config.min_spawn_interval,
            speed_min: config.spawn_speed_min,
            speed_max: config.spawn_speed_max,
            slot_count: config.slot_count,
        }
    }
}

impl Default for SpawnParams {
    fn default() -> Self {
        SpawnParams::from_config(&SimConfig::default())
    }
}

/// One claim flag per queried car, valid for a single tick
#[derive(Debug)]
pub struct ClaimTable {
    claims: Vec<AtomicBool>,
}

impl ClaimTable {
    /// Create `len` unclaimed flags
    pub fn new(len: usize) -> Self {
        ClaimTable {
            claims: (0..len).map(|_| AtomicBool::new(false)).collect(),
        }
    }

    /// Claim car `index`; true only for the first caller
    pub fn try_claim(&self, index: usize) -> bool {
        self.claims.get(index).map_or(false, |flag| {
            flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        })
    }

    /// Check whether car `index` has been claimed
    pub fn is_claimed(&self, index: usize) -> bool {
        self.claims.get(index).map_or(false, |flag| flag.load(Ordering::Acquire))
    }

    /// Number of flags
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    /// True when there are no cars
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

/// Car selected for recycling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Recycle {
    /// Position of the car's chunk in the queried chunk list
    pub chunk: usize,
    /// Row inside that chunk
    pub row: usize,
    /// Index in the claim table
    pub claim: usize,
    /// Speed to assign
    pub speed: f64,
}

/// Outcome of one slot's decision
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlotDecision {
    /// Recycled too recently; the slot is not touched
    Throttled,
    /// A car is within one car length
    Occupied,
    /// Free, but nothing was recycled this tick
    Free,
    /// Free, and this car is recycled into it
    Recycle(Recycle),
}

/// Decide what happens to one slot this tick
///
/// Reads the car chunks and claims at most one car.
pub fn decide_slot<R: Rng>(
    slot_index: usize,
    slot: &GenerationSlot,
    now: f64,
    params: &SpawnParams,
    cars: &[Arc<Chunk>],
    claims: &ClaimTable,
    rng: &mut R,
) -> SlotDecision {
    if now - slot.last_spawn_time < params.min_spawn_interval {
        return SlotDecision::Throttled;
    }

    if is_occupied(slot, cars) {
        return SlotDecision::Occupied;
    }

    if params.slot_count == 0 || rng.gen_range(0..params.slot_count) != slot_index {
        return SlotDecision::Free;
    }

    // Drawn before claiming so a claimed car always gets applied
    let speed = rng.gen_range(params.speed_min..params.speed_max);
    let mut offset = 0;
    for (chunk_pos, chunk) in cars.iter().enumerate() {
        let Some(column) = chunk.read::<Car>() else {
            continue;
        };
        for (row, car) in column.iter().enumerate() {
            let claim = offset + row;
            if car.is_disabled() && claims.try_claim(claim) {
                return SlotDecision::Recycle(Recycle {
                    chunk: chunk_pos,
                    row,
                    claim,
                    speed,
                });
            }
        }
        offset += column.len();
    }
    SlotDecision::Free
}

fn is_occupied(slot: &GenerationSlot, cars: &[Arc<Chunk>]) -> bool {
    let reference = cars
        .iter()
        .find_map(|chunk| chunk.read::<Car>().and_then(|column| column.first().map(|car| car.extents.length())));
    let Some(car_length) = reference else {
        return false;
    };

    cars.iter().any(|chunk| {
        chunk.read::<Position>().map_or(false, |positions| {
            positions
                .iter()
                .any(|position| position.track_distance(&slot.position) < car_length)
        })
    })
}

/// Write the decisions of one tick; returns the recycled car ids
///
/// `slots` and `decisions` are aligned by slot index.
pub fn apply_decisions(
    now: f64,
    cars: &[Arc<Chunk>],
    slots: &[(Arc<Chunk>, usize)],
    decisions: &[SlotDecision],
) -> Vec<CarId> {
    let mut recycled = Vec::new();

    for (slot_index, ((slot_chunk, slot_row), decision)) in slots.iter().zip(decisions).enumerate() {
        let Some(mut slot_column) = slot_chunk.write::<GenerationSlot>() else {
            continue;
        };
        let Some(slot) = slot_column.get_mut(*slot_row) else {
            continue;
        };

        match decision {
            SlotDecision::Throttled => {}
            SlotDecision::Occupied => slot.occupied = true,
            SlotDecision::Free => slot.occupied = false,
            SlotDecision::Recycle(recycle) => {
                let Some(chunk) = cars.get(recycle.chunk) else {
                    continue;
                };
                let (Some(mut car_column), Some(mut positions)) = (chunk.write::<Car>(), chunk.write::<Position>())
                else {
                    continue;
                };
                let (Some(car), Some(position)) = (car_column.get_mut(recycle.row), positions.get_mut(recycle.row))
                else {
                    continue;
                };

                car.disabled = false;
                car.speed = recycle.speed;
                *position = slot.position;
                slot.occupied = true;
                slot.last_spawn_time = now;

                log::debug!(
                    "recycled {} into slot {} at speed {:.1}",
                    car.id(),
                    slot_index,
                    recycle.speed
                );
                recycled.push(car.id());
            }
        }
    }
    recycled
}

/// Per-slot decisions collected by the decide jobs
struct DecisionBoard {
    entries: Vec<Mutex<Option<SlotDecision>>>,
}

impl DecisionBoard {
    fn new(len: usize) -> Self {
        DecisionBoard {
            entries: (0..len).map(|_| Mutex::new(None)).collect(),
        }
    }

    fn set(&self, index: usize, decision: SlotDecision) {
        if let Some(entry) = self.entries.get(index) {
            *entry.lock() = Some(decision);
        }
    }

    /// Slots without a decision are treated as throttled
    fn take(&self) -> Vec<SlotDecision> {
        self.entries
            .iter()
            .map(|entry| entry.lock().take().unwrap_or(SlotDecision::Throttled))
            .collect()
    }
}

/// Schedules the decide and apply jobs every tick
pub struct SpawnSystem {
    params: SpawnParams,
    seed: u64,
    cars: Query,
    slots: Query,
    recycled: Arc<AtomicU64>,
}

impl SpawnSystem {
    /// Create the system
    pub fn new(params: SpawnParams, seed: u64) -> Self {
        SpawnSystem {
            params,
            seed,
            cars: Query::new().with::<Car>().with::<Position>().without::<Hero>(),
            slots: Query::new().with::<GenerationSlot>(),
            recycled: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Running total of recycled cars
    pub fn recycle_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.recycled)
    }

    fn decide_access() -> Access {
        Access::new()
            .read::<Car>()
            .read::<Position>()
            .read::<GenerationSlot>()
    }

    fn apply_access() -> Access {
        Access::new()
            .write::<Car>()
            .write::<Position>()
            .write::<GenerationSlot>()
    }
}

impl System for SpawnSystem {
    fn update(&mut self, ctx: &SystemContext<'_>, input_deps: JobHandle) -> JobHandle {
        let slot_chunks = ctx.world.query(&self.slots);
        let slots: Arc<[(Arc<Chunk>, usize)]> = slot_chunks
            .iter()
            .flat_map(|chunk| (0..chunk.len()).map(move |row| (Arc::clone(chunk), row)))
            .collect();
        if slots.is_empty() {
            return input_deps;
        }

        let cars: Arc<[Arc<Chunk>]> = ctx.world.query(&self.cars).into();
        let car_count = cars.iter().map(|chunk| chunk.len()).sum();
        let claims = Arc::new(ClaimTable::new(car_count));
        let board = Arc::new(DecisionBoard::new(slots.len()));
        let params = SpawnParams {
            slot_count: slots.len(),
            ..self.params
        };
        let random = TickRandom::new(self.seed, ctx.time.tick);
        let now = ctx.time.now;

        let mut decided = Vec::with_capacity(slots.len());
        for slot_index in 0..slots.len() {
            let slots = Arc::clone(&slots);
            let cars = Arc::clone(&cars);
            let claims = Arc::clone(&claims);
            let board = Arc::clone(&board);
            let job = ctx
                .jobs
                .schedule("spawn_decide", Self::decide_access(), &input_deps, move || {
                    let (chunk, row) = &slots[slot_index];
                    let Some(slot) = chunk.read::<GenerationSlot>().and_then(|column| column.get(*row).copied())
                    else {
                        return;
                    };
                    let mut rng = random.slot_stream(slot_index);
                    let decision = decide_slot(slot_index, &slot, now, &params, &cars, &claims, &mut rng);
                    board.set(slot_index, decision);
                });
            match job {
                Ok(handle) => decided.push(handle),
                Err(err) => {
                    log::error!("{}: {}", self.name(), err);
                    decided.push(input_deps.clone());
                    return JobHandle::combine_all(&decided);
                }
            }
        }

        let decided = JobHandle::combine_all(&decided);
        let recycled = Arc::clone(&self.recycled);
        let job = ctx
            .jobs
            .schedule("spawn_apply", Self::apply_access(), &decided, move || {
                let decisions = board.take();
                let ids = apply_decisions(now, &cars, &slots, &decisions);
                recycled.fetch_add(ids.len() as u64, Ordering::Relaxed);
            });
        match job {
            Ok(handle) => handle,
            Err(err) => {
                log::error!("{}: {}", self.name(), err);
                decided
            }
        }
    }

    fn name(&self) -> &str {
        "SpawnSystem"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{Bundle, World};
    use crate::traffic::components::Extents;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn car(id: u64, disabled: bool) -> Car {
        let mut car = Car::new(CarId(id), Extents::new(2.0, 1.5, 4.0)).with_speed(20.0);
        car.disabled = disabled;
        car
    }

    fn world_with_cars(cars: &[(Car, f64)]) -> World {
        let mut world = World::new();
        for (car, z) in cars {
            world.spawn(Bundle::new().with(car.clone()).with(Position::new(0.0, 0.0, *z)));
        }
        world.flush();
        world
    }

    fn street_cars(world: &World) -> Vec<Arc<Chunk>> {
        world.query(&Query::new().with::<Car>().with::<Position>().without::<Hero>())
    }

    fn params(slot_count: usize) -> SpawnParams {
        SpawnParams {
            slot_count,
            ..SpawnParams::default()
        }
    }

    #[test]
    fn test_throttled_slot_is_untouched() {
        let world = world_with_cars(&[(car(1, true), 50.0)]);
        let cars = street_cars(&world);
        let slot = GenerationSlot::new(Position::zero());
        let claims = ClaimTable::new(1);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let decision = decide_slot(0, &slot, 0.1, &params(1), &cars, &claims, &mut rng);
        assert_eq!(decision, SlotDecision::Throttled);
        assert!(!claims.is_claimed(0));
    }

    #[test]
    fn test_nearby_car_blocks_slot() {
        let world = world_with_cars(&[(car(1, true), 50.0), (car(2, false), 3.0)]);
        let cars = street_cars(&world);
        let slot = GenerationSlot::new(Position::zero());
        let claims = ClaimTable::new(2);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let decision = decide_slot(0, &slot, 1.0, &params(1), &cars, &claims, &mut rng);
        assert_eq!(decision, SlotDecision::Occupied);
        assert!(!claims.is_claimed(0));
    }

    #[test]
    fn test_car_one_length_away_does_not_block() {
        let world = world_with_cars(&[(car(1, true), 50.0), (car(2, false), 4.0)]);
        let cars = street_cars(&world);
        let slot = GenerationSlot::new(Position::zero());
        let claims = ClaimTable::new(2);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let SlotDecision::Recycle(recycle) = decide_slot(0, &slot, 1.0, &params(1), &cars, &claims, &mut rng) else {
            panic!("expected a recycle");
        };
        assert_eq!(recycle.row, 0);
        assert!(claims.is_claimed(0));
    }

    #[test]
    fn test_first_disabled_car_is_claimed() {
        let world = world_with_cars(&[(car(1, false), 40.0), (car(2, true), 50.0), (car(3, true), 60.0)]);
        let cars = street_cars(&world);
        let slot = GenerationSlot::new(Position::zero());
        let claims = ClaimTable::new(3);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let SlotDecision::Recycle(recycle) = decide_slot(0, &slot, 1.0, &params(1), &cars, &claims, &mut rng) else {
            panic!("expected a recycle");
        };
        assert_eq!(recycle.row, 1);
        assert!(recycle.speed >= 5.0 && recycle.speed < 100.0);
        assert!(claims.is_claimed(1));
    }

    #[test]
    fn test_claimed_car_is_skipped() {
        let world = world_with_cars(&[(car(1, true), 50.0), (car(2, true), 60.0)]);
        let cars = street_cars(&world);
        let slot = GenerationSlot::new(Position::zero());
        let claims = ClaimTable::new(2);
        assert!(claims.try_claim(0));
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let SlotDecision::Recycle(recycle) = decide_slot(0, &slot, 1.0, &params(1), &cars, &claims, &mut rng) else {
            panic!("expected a recycle");
        };
        assert_eq!(recycle.claim, 1);
    }

    #[test]
    fn test_claim_table_single_winner() {
        let claims = ClaimTable::new(2);
        assert!(claims.try_claim(1));
        assert!(!claims.try_claim(1));
        assert!(!claims.try_claim(7));
        assert_eq!(claims.len(), 2);
    }

    #[test]
    fn test_apply_writes_car_and_slot() {
        let mut world = world_with_cars(&[(car(1, true), 50.0)]);
        world.spawn(Bundle::new().with(GenerationSlot::new(Position::new(-2.0, 0.0, 0.0))));
        world.flush();

        let cars = street_cars(&world);
        let slot_chunk = world.query(&Query::new().with::<GenerationSlot>()).remove(0);
        let decision = SlotDecision::Recycle(Recycle {
            chunk: 0,
            row: 0,
            claim: 0,
            speed: 42.0,
        });

        let ids = apply_decisions(0.3, &cars, &[(Arc::clone(&slot_chunk), 0)], &[decision]);
        assert_eq!(ids, vec![CarId(1)]);

        let recycled = cars[0].read::<Car>().unwrap()[0].clone();
        assert!(!recycled.disabled);
        assert_eq!(recycled.speed, 42.0);
        assert_eq!(cars[0].read::<Position>().unwrap()[0], Position::new(-2.0, 0.0, 0.0));

        let slot = slot_chunk.read::<GenerationSlot>().unwrap()[0];
        assert!(slot.occupied);
        assert_eq!(slot.last_spawn_time, 0.3);
    }
}
