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
//! Archetype-partitioned component store
//!
//! Entities with identical signatures share an archetype, whose data is
//! split into fixed-capacity [`Chunk`]s. The store maintains an index from
//! entity handle to `(archetype, chunk, row)` that is updated incrementally
//! on every structural change, so locating an entity is O(1).
//!
//! # Memory Layout
//!
//! ```text
//! archetype 0 [Car, Position]        chunk 0: rows 0..128  chunk 1: rows 0..n
//! archetype 1 [Car, Hero, Position]  chunk 0: rows 0..1
//! archetype 2 [Parent, Position, Wheel, WheelRotation]  ...
//! ```
//!
//! Structural mutation requires `&mut ComponentStore`; it is only reachable
//! through the deferred command buffer applied by the world between ticks.

use crate::ecs::chunk::{ArchetypeId, Chunk};
use crate::ecs::component::{Bundle, ColumnFactory, Component, ComponentKind, ComponentValue, Signature};
use crate::ecs::{Entity, Query};
use crate::error::StoreError;
use std::collections::HashMap;
use std::sync::Arc;

/// Where an entity's components live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityLocation {
    /// Archetype index
    pub archetype: ArchetypeId,
    /// Chunk index inside the archetype
    pub chunk: usize,
    /// Row inside the chunk
    pub row: usize,
}

struct Archetype {
    signature: Signature,
    factories: Vec<ColumnFactory>,
    chunks: Vec<Arc<Chunk>>,
}

/// Chunked storage for every entity's components
pub struct ComponentStore {
    chunk_capacity: usize,
    archetypes: Vec<Archetype>,
    by_signature: HashMap<Signature, ArchetypeId>,
    locations: HashMap<Entity, EntityLocation>,
    version: u64,
}

impl ComponentStore {
    /// Default number of entities per chunk
    pub const DEFAULT_CHUNK_CAPACITY: usize = 128;

    /// Create an empty store with the given chunk capacity (at least 1)
    pub fn new(chunk_capacity: usize) -> Self {
        ComponentStore {
            chunk_capacity: chunk_capacity.max(1),
            archetypes: Vec::new(),
            by_signature: HashMap::new(),
            locations: HashMap::new(),
            version: 0,
        }
    }

    /// Entities per chunk
    pub fn chunk_capacity(&self) -> usize {
        self.chunk_capacity
    }

    /// Counter bumped on every structural change; caches derived from
    /// entity locations are valid while it is unchanged
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of stored entities
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// True when no entity is stored
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Number of archetypes created so far
    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    /// Number of chunks across all archetypes
    pub fn chunk_count(&self) -> usize {
        self.archetypes.iter().map(|a| a.chunks.len()).sum()
    }

    /// Check whether the entity has stored components
    pub fn contains(&self, entity: Entity) -> bool {
        self.locations.contains_key(&entity)
    }

    /// Current location of an entity
    pub fn location(&self, entity: Entity) -> Option<EntityLocation> {
        self.locations.get(&entity).copied()
    }

    /// Chunk addressed by a location
    pub fn chunk(&self, location: EntityLocation) -> Option<&Arc<Chunk>> {
        self.archetypes.get(location.archetype)?.chunks.get(location.chunk)
    }

    /// Chunk and row holding an entity
    pub fn chunk_of(&self, entity: Entity) -> Option<(Arc<Chunk>, usize)> {
        let location = self.location(entity)?;
        self.chunk(location).map(|chunk| (Arc::clone(chunk), location.row))
    }

    /// Signature of an entity
    pub fn signature_of(&self, entity: Entity) -> Option<&Signature> {
        let location = self.location(entity)?;
        self.archetypes.get(location.archetype).map(|a| &a.signature)
    }

    /// Non-empty chunks matching the query, in insertion order: archetypes
    /// by creation, then chunks within each archetype
    pub fn query(&self, query: &Query) -> Vec<Arc<Chunk>> {
        self.archetypes
            .iter()
            .filter(|archetype| query.matches(&archetype.signature))
            .flat_map(|archetype| archetype.chunks.iter().filter(|chunk| !chunk.is_empty()).cloned())
            .collect()
    }

    /// Check whether an entity carries component `T`
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.signature_of(entity)
            .map_or(false, |signature| signature.contains(ComponentKind::of::<T>()))
    }

    /// Copy of one component of an entity
    pub fn get<T: Component + Clone>(&self, entity: Entity) -> Option<T> {
        if !self.has::<T>(entity) {
            return None;
        }
        let (chunk, row) = self.chunk_of(entity)?;
        let column = chunk.read::<T>()?;
        column.get(row).cloned()
    }

    /// Mutate one component of an entity in place
    pub fn with_mut<T: Component, R>(&self, entity: Entity, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        if !self.has::<T>(entity) {
            return None;
        }
        let (chunk, row) = self.chunk_of(entity)?;
        let mut column = chunk.write::<T>()?;
        column.get_mut(row).map(f)
    }

    pub(crate) fn insert_bundle(&mut self, entity: Entity, bundle: Bundle) -> Result<EntityLocation, StoreError> {
        if self.locations.contains_key(&entity) {
            return Err(StoreError::AlreadyStored(entity));
        }

        let mut values = bundle.into_values();
        values.sort_by_key(|v| v.kind);
        let signature = Signature::from_kinds(values.iter().map(|v| v.kind));
        let factories = values.iter().map(|v| v.factory).collect();

        let archetype = self.archetype_id(signature, factories);
        let chunk = self.chunk_with_space(archetype);
        let row = chunk
            .push(entity, values)
            .map_err(|kind| StoreError::ComponentMismatch { entity, kind: kind.name() })?;

        let location = EntityLocation { archetype, chunk: chunk.index(), row };
        self.locations.insert(entity, location);
        self.version += 1;
        Ok(location)
    }

    pub(crate) fn remove_entity(&mut self, entity: Entity) -> Result<(), StoreError> {
        let location = self.locations.remove(&entity).ok_or(StoreError::UnknownEntity(entity))?;
        let chunk = Arc::clone(&self.archetypes[location.archetype].chunks[location.chunk]);
        if let Some(moved) = chunk.swap_remove(location.row) {
            if let Some(moved_location) = self.locations.get_mut(&moved) {
                moved_location.row = location.row;
            }
        }
        self.version += 1;
        Ok(())
    }

    /// Add a component, or overwrite it in place if the entity already has
    /// one of that kind
    pub(crate) fn insert_component(&mut self, entity: Entity, value: ComponentValue) -> Result<(), StoreError> {
        let location = self.location(entity).ok_or(StoreError::UnknownEntity(entity))?;
        let kind = value.kind;
        let source = &self.archetypes[location.archetype];

        if source.signature.contains(kind) {
            let chunk = Arc::clone(&source.chunks[location.chunk]);
            return chunk
                .replace(location.row, value)
                .map_err(|kind| StoreError::ComponentMismatch { entity, kind: kind.name() });
        }

        let signature = source.signature.with(kind);
        let factories = signature
            .kinds()
            .iter()
            .map(|k| match source.signature.position(*k) {
                Some(pos) => source.factories[pos],
                None => value.factory,
            })
            .collect();

        let destination = self.archetype_id(signature, factories);
        self.move_entity(entity, location, destination, Some(value))
    }

    pub(crate) fn remove_component(&mut self, entity: Entity, kind: ComponentKind) -> Result<(), StoreError> {
        let location = self.location(entity).ok_or(StoreError::UnknownEntity(entity))?;
        let source = &self.archetypes[location.archetype];
        let Some(removed) = source.signature.position(kind) else {
            return Err(StoreError::MissingComponent { entity, kind: kind.name() });
        };

        let signature = source.signature.without(kind);
        let factories = source
            .factories
            .iter()
            .enumerate()
            .filter(|(pos, _)| *pos != removed)
            .map(|(_, factory)| *factory)
            .collect();

        let destination = self.archetype_id(signature, factories);
        self.move_entity(entity, location, destination, None)
    }

    fn move_entity(
        &mut self,
        entity: Entity,
        location: EntityLocation,
        destination: ArchetypeId,
        extra: Option<ComponentValue>,
    ) -> Result<(), StoreError> {
        let source_chunk = Arc::clone(&self.archetypes[location.archetype].chunks[location.chunk]);
        let target_chunk = self.chunk_with_space(destination);

        let (row, moved) = source_chunk.move_row_to(location.row, &target_chunk);
        if let Some(moved) = moved {
            if let Some(moved_location) = self.locations.get_mut(&moved) {
                moved_location.row = location.row;
            }
        }
        self.locations.insert(
            entity,
            EntityLocation {
                archetype: destination,
                chunk: target_chunk.index(),
                row,
            },
        );
        self.version += 1;

        match extra {
            Some(value) => target_chunk
                .push_value(value)
                .map_err(|kind| StoreError::ComponentMismatch { entity, kind: kind.name() }),
            None => Ok(()),
        }
    }

    fn archetype_id(&mut self, signature: Signature, factories: Vec<ColumnFactory>) -> ArchetypeId {
        if let Some(id) = self.by_signature.get(&signature) {
            return *id;
        }

        let id = self.archetypes.len();
        log::debug!("created archetype {} with {:?}", id, signature.kinds());
        self.by_signature.insert(signature.clone(), id);
        self.archetypes.push(Archetype {
            signature,
            factories,
            chunks: Vec::new(),
        });
        id
    }

    fn chunk_with_space(&mut self, archetype: ArchetypeId) -> Arc<Chunk> {
        let capacity = self.chunk_capacity;
        let entry = &mut self.archetypes[archetype];
        if let Some(chunk) = entry.chunks.iter().find(|chunk| !chunk.is_full()) {
            return Arc::clone(chunk);
        }

        let chunk = Arc::new(Chunk::new(
            archetype,
            entry.chunks.len(),
            capacity,
            entry.signature.clone(),
            &entry.factories,
        ));
        entry.chunks.push(Arc::clone(&chunk));
        chunk
    }
}

impl Default for ComponentStore {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CHUNK_CAPACITY)
    }
}
