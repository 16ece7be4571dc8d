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
//! Deferred structural commands
//!
//! Spawning, despawning and adding or removing components change which chunk
//! an entity lives in. Those changes are recorded here and applied in
//! recording order between ticks, when no task holds a column view.

use crate::ecs::component::{Bundle, ComponentKind, ComponentValue};
use crate::ecs::components::LinkedGroup;
use crate::ecs::store::ComponentStore;
use crate::ecs::{Entity, EntityAllocator};
use crate::error::StoreError;
use parking_lot::Mutex;

/// A recorded structural change
#[derive(Debug)]
pub enum Command {
    /// Insert a reserved entity with its components
    Spawn {
        /// Handle reserved when the command was recorded
        entity: Entity,
        /// Initial components
        bundle: Bundle,
    },
    /// Remove an entity and every member of its [`LinkedGroup`]
    Despawn {
        /// Entity to remove
        entity: Entity,
    },
    /// Add a component, or overwrite the existing one of the same kind
    Insert {
        /// Target entity
        entity: Entity,
        /// Component value
        value: ComponentValue,
    },
    /// Remove one component kind
    Remove {
        /// Target entity
        entity: Entity,
        /// Kind to drop
        kind: ComponentKind,
    },
}

/// Outcome of applying a batch of commands
#[derive(Debug, Default)]
pub struct CommandReport {
    /// Commands applied successfully
    pub applied: usize,
    /// Commands that failed, in recording order
    pub failed: Vec<StoreError>,
}

impl CommandReport {
    /// True when every command applied
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Thread-safe queue of structural commands
#[derive(Debug, Default)]
pub struct CommandBuffer {
    queue: Mutex<Vec<Command>>,
}

impl CommandBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a command
    pub fn push(&self, command: Command) {
        self.queue.lock().push(command);
    }

    /// Number of pending commands
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// True when nothing is pending
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Apply every pending command in recording order
    ///
    /// A failing command is logged and skipped; later commands still run.
    pub fn apply(&self, store: &mut ComponentStore, allocator: &mut EntityAllocator) -> CommandReport {
        let commands = std::mem::take(&mut *self.queue.lock());
        let mut report = CommandReport::default();

        for command in commands {
            match apply_one(command, store, allocator) {
                Ok(()) => report.applied += 1,
                Err(err) => {
                    log::warn!("structural command failed: {}", err);
                    report.failed.push(err);
                }
            }
        }

        if report.applied > 0 || !report.failed.is_empty() {
            log::debug!(
                "applied {} structural commands ({} failed)",
                report.applied,
                report.failed.len()
            );
        }
        report
    }
}

fn apply_one(command: Command, store: &mut ComponentStore, allocator: &mut EntityAllocator) -> Result<(), StoreError> {
    match command {
        Command::Spawn { entity, bundle } => {
            ensure_alive(allocator, entity)?;
            store.insert_bundle(entity, bundle).map(|_| ())
        }
        Command::Despawn { entity } => {
            ensure_alive(allocator, entity)?;
            despawn_group(entity, store, allocator)
        }
        Command::Insert { entity, value } => {
            ensure_alive(allocator, entity)?;
            store.insert_component(entity, value)
        }
        Command::Remove { entity, kind } => {
            ensure_alive(allocator, entity)?;
            store.remove_component(entity, kind)
        }
    }
}

fn ensure_alive(allocator: &EntityAllocator, entity: Entity) -> Result<(), StoreError> {
    if allocator.is_alive(entity) {
        Ok(())
    } else {
        Err(StoreError::StaleEntity(entity))
    }
}

fn despawn_group(root: Entity, store: &mut ComponentStore, allocator: &mut EntityAllocator) -> Result<(), StoreError> {
    let mut pending = vec![root];
    while let Some(entity) = pending.pop() {
        if !allocator.is_alive(entity) {
            continue;
        }
        if let Some(group) = store.get::<LinkedGroup>(entity) {
            pending.extend(group.members().iter().copied().filter(|member| *member != entity));
        }
        // A reserved entity whose spawn never landed has nothing stored
        match store.remove_entity(entity) {
            Ok(()) | Err(StoreError::UnknownEntity(_)) => {}
            Err(err) => return Err(err),
        }
        allocator.release(entity);
    }
    Ok(())
}
