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
//! Declared component access of a job

use crate::ecs::{ArchetypeId, Chunk, Component, ComponentKind, Signature};

/// Component kinds a job reads and writes
///
/// Two accesses conflict when either writes a kind the other touches.
/// An access scoped to one chunk only conflicts with unscoped accesses and
/// with accesses scoped to the same chunk. Reads declared with
/// [`Access::read_any`] ignore the scope and conflict with every writer of
/// that kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Access {
    reads: Signature,
    writes: Signature,
    any_reads: Signature,
    scope: Option<(ArchetypeId, usize)>,
}

impl Access {
    /// Access touching nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a shared read of `T`
    pub fn read<T: Component>(mut self) -> Self {
        self.reads.insert(ComponentKind::of::<T>());
        self
    }

    /// Declare an exclusive write of `T`
    pub fn write<T: Component>(mut self) -> Self {
        self.writes.insert(ComponentKind::of::<T>());
        self
    }

    /// Declare a shared read of `T` in chunks other than the scoped one
    pub fn read_any<T: Component>(mut self) -> Self {
        self.any_reads.insert(ComponentKind::of::<T>());
        self
    }

    /// Restrict reads and writes to a single chunk
    pub fn scoped(mut self, chunk: &Chunk) -> Self {
        self.scope = Some((chunk.archetype(), chunk.index()));
        self
    }

    /// Kinds read
    pub fn reads(&self) -> &Signature {
        &self.reads
    }

    /// Kinds written
    pub fn writes(&self) -> &Signature {
        &self.writes
    }

    /// Kinds read regardless of scope
    pub fn any_reads(&self) -> &Signature {
        &self.any_reads
    }

    /// First kind on which the two accesses conflict (W∩W, W∩R or R∩W)
    pub fn conflicts_with(&self, other: &Access) -> Option<ComponentKind> {
        let same_chunk = match (self.scope, other.scope) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        };
        let local = if same_chunk {
            self.writes
                .kinds()
                .iter()
                .find(|k| other.writes.contains(**k) || other.reads.contains(**k))
                .or_else(|| self.reads.kinds().iter().find(|k| other.writes.contains(**k)))
        } else {
            None
        };
        local
            .or_else(|| self.any_reads.kinds().iter().find(|k| other.writes.contains(**k)))
            .or_else(|| self.writes.kinds().iter().find(|k| other.any_reads.contains(**k)))
            .copied()
    }
}
