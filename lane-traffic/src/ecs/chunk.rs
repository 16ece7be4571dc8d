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
//! Fixed-capacity chunks of entities sharing one signature
//!
//! A chunk stores its entities' components in one dense column per kind
//! (structure-of-arrays). Each column sits behind its own reader/writer
//! lock, so tasks holding views of different columns of the same chunk
//! never contend, and a view can never observe a half-applied structural
//! change.

use crate::ecs::component::{Column, ColumnFactory, Component, ComponentKind, ComponentValue, Signature, TypedColumn};
use crate::ecs::Entity;
use parking_lot::{MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Index of an archetype inside the store, in creation order
pub type ArchetypeId = usize;

/// Shared read-only view over one column of a chunk
pub type ColumnRef<'a, T> = MappedRwLockReadGuard<'a, [T]>;

/// Exclusive view over one column of a chunk
pub type ColumnMut<'a, T> = MappedRwLockWriteGuard<'a, [T]>;

/// Contiguous block of up to `capacity` entities with the same signature
pub struct Chunk {
    archetype: ArchetypeId,
    index: usize,
    capacity: usize,
    signature: Signature,
    entities: RwLock<Vec<Entity>>,
    /// One column per kind, in signature order
    columns: Vec<RwLock<Box<dyn Column>>>,
}

impl Chunk {
    pub(crate) fn new(
        archetype: ArchetypeId,
        index: usize,
        capacity: usize,
        signature: Signature,
        factories: &[ColumnFactory],
    ) -> Self {
        debug_assert_eq!(signature.len(), factories.len());
        Chunk {
            archetype,
            index,
            capacity,
            signature,
            entities: RwLock::new(Vec::with_capacity(capacity)),
            columns: factories.iter().map(|make| RwLock::new(make(capacity))).collect(),
        }
    }

    /// Archetype this chunk belongs to
    pub fn archetype(&self) -> ArchetypeId {
        self.archetype
    }

    /// Position of this chunk inside its archetype
    pub fn index(&self) -> usize {
        self.index
    }

    /// Maximum number of entities
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of entities
    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    /// True when the chunk holds no entity
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when no more entities fit
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    /// Component kinds stored in this chunk
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Check whether the chunk stores component `T`
    pub fn has<T: Component>(&self) -> bool {
        self.signature.contains(ComponentKind::of::<T>())
    }

    /// Entity handles, row-aligned with every column
    pub fn entities(&self) -> RwLockReadGuard<'_, Vec<Entity>> {
        self.entities.read()
    }

    /// Shared view over the `T` column
    ///
    /// Asking for a kind the chunk does not store is a programming error:
    /// it trips a debug assertion, and yields `None` in release builds.
    pub fn read<T: Component>(&self) -> Option<ColumnRef<'_, T>> {
        let column = self.column(ComponentKind::of::<T>())?;
        RwLockReadGuard::try_map(column.read(), |c| {
            c.as_any()
                .downcast_ref::<TypedColumn<T>>()
                .map(|typed| typed.items.as_slice())
        })
        .ok()
    }

    /// Exclusive view over the `T` column
    ///
    /// Same contract as [`Chunk::read`] for missing kinds.
    pub fn write<T: Component>(&self) -> Option<ColumnMut<'_, T>> {
        let column = self.column(ComponentKind::of::<T>())?;
        RwLockWriteGuard::try_map(column.write(), |c| {
            c.as_any_mut()
                .downcast_mut::<TypedColumn<T>>()
                .map(|typed| typed.items.as_mut_slice())
        })
        .ok()
    }

    fn column(&self, kind: ComponentKind) -> Option<&RwLock<Box<dyn Column>>> {
        match self.signature.position(kind) {
            Some(pos) => self.columns.get(pos),
            None => {
                debug_assert!(
                    false,
                    "chunk {}/{} has no {} column",
                    self.archetype,
                    self.index,
                    kind.short_name()
                );
                None
            }
        }
    }

    /// Append an entity. `values` must cover the signature exactly.
    ///
    /// Returns the row on success, or the kind whose value did not fit.
    pub(crate) fn push(&self, entity: Entity, values: Vec<ComponentValue>) -> Result<usize, ComponentKind> {
        debug_assert!(!self.is_full());
        debug_assert_eq!(values.len(), self.signature.len());

        let mut entities = self.entities.write();
        let row = entities.len();
        for value in values {
            let kind = value.kind;
            let pos = self.signature.position(kind).ok_or(kind)?;
            self.columns[pos].write().push_boxed(value.value).map_err(|_| kind)?;
        }
        entities.push(entity);
        Ok(row)
    }

    /// Overwrite one component of an existing row
    pub(crate) fn replace(&self, row: usize, value: ComponentValue) -> Result<(), ComponentKind> {
        let kind = value.kind;
        let pos = self.signature.position(kind).ok_or(kind)?;
        self.columns[pos].write().replace_boxed(row, value.value).map_err(|_| kind)
    }

    /// Remove `row`; the last entity moves into it and is returned
    pub(crate) fn swap_remove(&self, row: usize) -> Option<Entity> {
        let mut entities = self.entities.write();
        for column in &self.columns {
            column.write().swap_remove(row);
        }
        entities.swap_remove(row);
        entities.get(row).copied()
    }

    /// Move `row` into `dst`, carrying every kind both chunks share and
    /// dropping the rest. Returns the destination row and the entity that
    /// was swapped into `row` here, if any.
    ///
    /// Kinds present only in `dst` are not written; the caller must push
    /// them right after, before any view is taken.
    pub(crate) fn move_row_to(&self, row: usize, dst: &Chunk) -> (usize, Option<Entity>) {
        let mut src_entities = self.entities.write();
        let mut dst_entities = dst.entities.write();

        for (pos, kind) in self.signature.kinds().iter().enumerate() {
            let mut src_column = self.columns[pos].write();
            match dst.signature.position(*kind) {
                Some(dst_pos) => {
                    let mut dst_column = dst.columns[dst_pos].write();
                    src_column.move_row(row, &mut **dst_column);
                }
                None => src_column.swap_remove(row),
            }
        }

        let entity = src_entities.swap_remove(row);
        let dst_row = dst_entities.len();
        dst_entities.push(entity);
        (dst_row, src_entities.get(row).copied())
    }

    /// Append a single value to the column for its kind, used to complete a
    /// row started by [`Chunk::move_row_to`]
    pub(crate) fn push_value(&self, value: ComponentValue) -> Result<(), ComponentKind> {
        let kind = value.kind;
        let pos = self.signature.position(kind).ok_or(kind)?;
        self.columns[pos].write().push_boxed(value.value).map_err(|_| kind)
    }
}

impl std::fmt::Debug for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunk")
            .field("archetype", &self.archetype)
            .field("index", &self.index)
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("signature", &self.signature)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::component::Bundle;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Speed(f64);
    impl Component for Speed {}

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Lane(u8);
    impl Component for Lane {}

    fn speed_lane_chunk(capacity: usize) -> Chunk {
        let bundle = Bundle::new().with(Speed(0.0)).with(Lane(0));
        let signature = bundle.signature();
        let mut values = bundle.into_values();
        values.sort_by_key(|v| v.kind);
        let factories: Vec<ColumnFactory> = values.into_iter().map(|v| v.factory).collect();
        Chunk::new(0, 0, capacity, signature, &factories)
    }

    fn push(chunk: &Chunk, id: u64, speed: f64, lane: u8) -> usize {
        let values = Bundle::new().with(Speed(speed)).with(Lane(lane)).into_values();
        chunk.push(Entity::new(id, 0), values).unwrap()
    }

    #[test]
    fn test_push_and_read() {
        let chunk = speed_lane_chunk(4);
        assert_eq!(push(&chunk, 1, 10.0, 1), 0);
        assert_eq!(push(&chunk, 2, 20.0, 2), 1);

        let speeds = chunk.read::<Speed>().unwrap();
        assert_eq!(&*speeds, &[Speed(10.0), Speed(20.0)]);
        assert_eq!(chunk.entities().as_slice(), &[Entity::new(1, 0), Entity::new(2, 0)]);
    }

    #[test]
    fn test_write_view_mutates_column() {
        let chunk = speed_lane_chunk(4);
        push(&chunk, 1, 10.0, 1);
        chunk.write::<Speed>().unwrap()[0] = Speed(55.0);
        assert_eq!(chunk.read::<Speed>().unwrap()[0], Speed(55.0));
    }

    #[test]
    fn test_swap_remove_reports_moved_entity() {
        let chunk = speed_lane_chunk(4);
        push(&chunk, 1, 10.0, 1);
        push(&chunk, 2, 20.0, 2);
        push(&chunk, 3, 30.0, 3);

        let moved = chunk.swap_remove(0);
        assert_eq!(moved, Some(Entity::new(3, 0)));
        assert_eq!(chunk.read::<Speed>().unwrap()[0], Speed(30.0));
        assert_eq!(chunk.read::<Lane>().unwrap()[0], Lane(3));
        assert_eq!(chunk.len(), 2);
    }

    #[test]
    fn test_is_full() {
        let chunk = speed_lane_chunk(2);
        push(&chunk, 1, 1.0, 1);
        assert!(!chunk.is_full());
        push(&chunk, 2, 2.0, 2);
        assert!(chunk.is_full());
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Missing;
    impl Component for Missing {}

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "has no Missing column")]
    fn test_missing_view_is_fatal_in_debug() {
        let chunk = speed_lane_chunk(2);
        let _ = chunk.read::<Missing>();
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn test_missing_view_is_absent_in_release() {
        let chunk = speed_lane_chunk(2);
        assert!(chunk.read::<Missing>().is_none());
    }
}
