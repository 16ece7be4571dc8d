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
//! World management
//!
//! The World is the central container for all ECS data: it owns the entity
//! allocator, the chunked component store and the deferred command buffer.
//!
//! Handles are reserved immediately by [`World::spawn`], but components only
//! become visible to queries after the next [`World::flush`].

use crate::ecs::chunk::Chunk;
use crate::ecs::commands::{Command, CommandBuffer, CommandReport};
use crate::ecs::component::{Bundle, Component, ComponentKind, ComponentValue};
use crate::ecs::store::ComponentStore;
use crate::ecs::{Entity, EntityAllocator, Query};
use parking_lot::Mutex;
use std::sync::Arc;

/// The main ECS world container
pub struct World {
    allocator: Mutex<EntityAllocator>,
    store: ComponentStore,
    commands: CommandBuffer,
}

impl World {
    /// Create a new empty world with the default chunk capacity
    pub fn new() -> Self {
        Self::with_chunk_capacity(ComponentStore::DEFAULT_CHUNK_CAPACITY)
    }

    /// Create a new empty world with the given chunk capacity
    pub fn with_chunk_capacity(chunk_capacity: usize) -> Self {
        World {
            allocator: Mutex::new(EntityAllocator::new()),
            store: ComponentStore::new(chunk_capacity),
            commands: CommandBuffer::new(),
        }
    }

    /// Reserve a handle and record its spawn
    pub fn spawn(&self, bundle: Bundle) -> Entity {
        let entity = self.allocator.lock().allocate();
        self.commands.push(Command::Spawn { entity, bundle });
        entity
    }

    /// Record the removal of an entity and its linked group
    pub fn despawn(&self, entity: Entity) {
        self.commands.push(Command::Despawn { entity });
    }

    /// Record adding (or overwriting) a component
    pub fn insert<T: Component>(&self, entity: Entity, component: T) {
        self.commands.push(Command::Insert {
            entity,
            value: ComponentValue::new(component),
        });
    }

    /// Record removing a component
    pub fn remove<T: Component>(&self, entity: Entity) {
        self.commands.push(Command::Remove {
            entity,
            kind: ComponentKind::of::<T>(),
        });
    }

    /// Number of structural commands waiting for the next flush
    pub fn pending_commands(&self) -> usize {
        self.commands.len()
    }

    /// Apply every recorded structural command
    pub fn flush(&mut self) -> CommandReport {
        let allocator = self.allocator.get_mut();
        self.commands.apply(&mut self.store, allocator)
    }

    /// Check if an entity is alive
    pub fn is_entity_alive(&self, entity: Entity) -> bool {
        self.allocator.lock().is_alive(entity)
    }

    /// Get the number of alive entities, including ones awaiting their spawn
    pub fn entity_count(&self) -> usize {
        self.allocator.lock().len()
    }

    /// Component storage
    pub fn store(&self) -> &ComponentStore {
        &self.store
    }

    /// Non-empty chunks matching a query, in insertion order
    pub fn query(&self, query: &Query) -> Vec<Arc<Chunk>> {
        self.store.query(query)
    }

    /// Copy of one component of an entity
    pub fn get<T: Component + Clone>(&self, entity: Entity) -> Option<T> {
        self.store.get(entity)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::Position;

    #[test]
    fn test_world_entity_lifecycle() {
        let mut world = World::new();

        let e1 = world.spawn(Bundle::new().with(Position::zero()));
        let e2 = world.spawn(Bundle::new().with(Position::zero()));

        assert_eq!(world.entity_count(), 2);
        assert!(world.is_entity_alive(e1));
        assert!(world.is_entity_alive(e2));
        assert!(world.store().is_empty());

        world.flush();
        assert_eq!(world.store().len(), 2);

        world.despawn(e1);
        world.flush();
        assert_eq!(world.entity_count(), 1);
        assert!(!world.is_entity_alive(e1));
        assert!(world.is_entity_alive(e2));
        assert_eq!(world.get::<Position>(e1), None);
    }

    #[test]
    fn test_entity_generation() {
        let mut world = World::new();

        let e1 = world.spawn(Bundle::new());
        world.flush();
        world.despawn(e1);
        world.flush();
        let e2 = world.spawn(Bundle::new());

        assert_eq!(e2.id(), e1.id());
        assert_ne!(e2.generation(), e1.generation());
    }

    #[test]
    fn test_stale_handle_rejected() {
        let mut world = World::new();
        let e1 = world.spawn(Bundle::new().with(Position::zero()));
        world.flush();
        world.despawn(e1);
        world.flush();

        world.insert(e1, Position::new(1.0, 1.0, 1.0));
        let report = world.flush();
        assert_eq!(report.failed.len(), 1);
    }

    #[test]
    fn test_insert_and_remove() {
        let mut world = World::new();
        let e = world.spawn(Bundle::new().with(Position::zero()));
        world.insert(e, Position::new(0.0, 0.0, 4.0));
        assert_eq!(world.pending_commands(), 2);
        world.flush();
        assert_eq!(world.get::<Position>(e).unwrap().z(), 4.0);

        world.remove::<Position>(e);
        world.flush();
        assert!(world.query(&Query::new().with::<Position>()).is_empty());
    }
}
