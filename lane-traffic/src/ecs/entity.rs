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
//! Entity management
//!
//! Entities are lightweight generational handles. The allocator recycles
//! slots of destroyed entities and bumps their generation so that stale
//! handles are never mistaken for the new occupant.

use std::fmt;

/// Unique identifier for an entity slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(u64);

impl EntityId {
    /// Create a new EntityId from a raw u64 value
    pub fn new(id: u64) -> Self {
        EntityId(id)
    }

    /// Get the raw u64 value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Entity handle with generational index support for safe references
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Entity {
    id: EntityId,
    generation: u32,
}

impl Entity {
    /// Create a new entity with the given ID and generation
    pub fn new(id: u64, generation: u32) -> Self {
        Entity {
            id: EntityId::new(id),
            generation,
        }
    }

    /// Get the entity ID
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Get the generation number
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}, gen: {})", self.id.0, self.generation)
    }
}

/// Hands out entity handles and tracks which ones are alive.
///
/// Slots released by [`EntityAllocator::release`] are reused in LIFO order
/// with an incremented generation.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    generations: Vec<u32>,
    alive: Vec<bool>,
    free: Vec<u64>,
    live_count: usize,
}

impl EntityAllocator {
    /// Create an empty allocator
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh handle
    pub fn allocate(&mut self) -> Entity {
        self.live_count += 1;
        if let Some(id) = self.free.pop() {
            let slot = id as usize;
            self.alive[slot] = true;
            return Entity::new(id, self.generations[slot]);
        }

        let id = self.generations.len() as u64;
        self.generations.push(0);
        self.alive.push(true);
        Entity::new(id, 0)
    }

    /// Release a handle. Returns false if it was already dead or stale.
    pub fn release(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        let slot = entity.id().raw() as usize;
        self.alive[slot] = false;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.free.push(entity.id().raw());
        self.live_count -= 1;
        true
    }

    /// Check whether the handle refers to a live entity
    pub fn is_alive(&self, entity: Entity) -> bool {
        let slot = entity.id().raw() as usize;
        slot < self.generations.len()
            && self.alive[slot]
            && self.generations[slot] == entity.generation()
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.live_count
    }

    /// True when no entity is alive
    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }

    /// Iterate over all live handles in slot order
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.alive
            .iter()
            .enumerate()
            .filter(|(_, alive)| **alive)
            .map(|(slot, _)| Entity::new(slot as u64, self.generations[slot]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_creation() {
        let entity = Entity::new(42, 1);
        assert_eq!(entity.id().raw(), 42);
        assert_eq!(entity.generation(), 1);
    }

    #[test]
    fn test_entity_equality() {
        let e1 = Entity::new(1, 0);
        let e2 = Entity::new(1, 0);
        let e3 = Entity::new(1, 1);
        assert_eq!(e1, e2);
        assert_ne!(e1, e3);
    }

    #[test]
    fn test_allocator_reuses_slots_with_new_generation() {
        let mut allocator = EntityAllocator::new();
        let first = allocator.allocate();
        assert!(allocator.release(first));
        assert!(!allocator.is_alive(first));

        let second = allocator.allocate();
        assert_eq!(second.id(), first.id());
        assert_ne!(second.generation(), first.generation());
        assert!(allocator.is_alive(second));
        assert!(!allocator.release(first));
    }

    #[test]
    fn test_allocator_counts() {
        let mut allocator = EntityAllocator::new();
        let a = allocator.allocate();
        let _b = allocator.allocate();
        assert_eq!(allocator.len(), 2);
        allocator.release(a);
        assert_eq!(allocator.len(), 1);
        assert_eq!(allocator.iter().count(), 1);
    }
}
