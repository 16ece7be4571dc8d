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
//! Car id to chunk-and-row index
//!
//! Car ids never change, and a car only moves between rows on a structural
//! change, which bumps the store version. The index is therefore rebuilt
//! only when the version moves and shared read-only with jobs otherwise.

use crate::ecs::components::Position;
use crate::ecs::{Chunk, ComponentStore, Query};
use crate::traffic::components::{Car, CarId};
use std::collections::HashMap;
use std::sync::Arc;

/// Location of one car
#[derive(Debug, Clone)]
pub struct CarSlot {
    /// Chunk holding the car
    pub chunk: Arc<Chunk>,
    /// Row inside the chunk
    pub row: usize,
}

impl CarSlot {
    /// Current speed of the car
    pub fn speed(&self) -> Option<f64> {
        let cars = self.chunk.read::<Car>()?;
        cars.get(self.row).map(|car| car.speed)
    }
}

/// O(1) lookup from car id to storage location
#[derive(Debug, Default)]
pub struct CarIndex {
    slots: HashMap<CarId, CarSlot>,
    version: u64,
}

impl CarIndex {
    /// Index every car in the store
    pub fn build(store: &ComponentStore) -> Self {
        let mut slots = HashMap::new();
        for chunk in store.query(&Query::new().with::<Car>().with::<Position>()) {
            let Some(cars) = chunk.read::<Car>() else {
                continue;
            };
            for (row, car) in cars.iter().enumerate() {
                let previous = slots.insert(
                    car.id(),
                    CarSlot {
                        chunk: Arc::clone(&chunk),
                        row,
                    },
                );
                if previous.is_some() {
                    log::warn!("duplicate car id {} in store", car.id());
                }
            }
        }
        CarIndex {
            slots,
            version: store.version(),
        }
    }

    /// Store version this index was built from
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Locate a car
    pub fn get(&self, id: CarId) -> Option<&CarSlot> {
        self.slots.get(&id)
    }

    /// Number of indexed cars
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when no car is indexed
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Keeps a [`CarIndex`] in step with the store version
#[derive(Debug, Default)]
pub struct CarIndexCache {
    current: Option<Arc<CarIndex>>,
}

impl CarIndexCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Index valid for the store's current version
    pub fn get(&mut self, store: &ComponentStore) -> Arc<CarIndex> {
        match &self.current {
            Some(index) if index.version() == store.version() => Arc::clone(index),
            _ => {
                let index = Arc::new(CarIndex::build(store));
                log::debug!("rebuilt car index: {} cars at version {}", index.len(), index.version());
                self.current = Some(Arc::clone(&index));
                index
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{Bundle, World};
    use crate::traffic::components::Extents;

    fn spawn_car(world: &World, id: u64, speed: f64) {
        world.spawn(
            Bundle::new()
                .with(Car::new(CarId(id), Extents::new(2.0, 1.5, 4.0)).with_speed(speed))
                .with(Position::zero()),
        );
    }

    #[test]
    fn test_lookup_by_id() {
        let mut world = World::with_chunk_capacity(2);
        for id in 0..5 {
            spawn_car(&world, id, id as f64 * 10.0);
        }
        world.flush();

        let index = CarIndex::build(world.store());
        assert_eq!(index.len(), 5);
        assert_eq!(index.get(CarId(3)).unwrap().speed(), Some(30.0));
        assert!(index.get(CarId(42)).is_none());
    }

    #[test]
    fn test_cache_rebuilds_on_structural_change() {
        let mut world = World::new();
        spawn_car(&world, 1, 5.0);
        world.flush();

        let mut cache = CarIndexCache::new();
        let first = cache.get(world.store());
        let again = cache.get(world.store());
        assert!(Arc::ptr_eq(&first, &again));

        spawn_car(&world, 2, 6.0);
        world.flush();
        let rebuilt = cache.get(world.store());
        assert!(!Arc::ptr_eq(&first, &rebuilt));
        assert_eq!(rebuilt.len(), 2);
    }
}
