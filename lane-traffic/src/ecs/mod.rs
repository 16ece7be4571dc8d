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
//! Entity Component System (ECS) core implementation
//!
//! This module provides:
//! - Generational entity handles
//! - Chunked, archetype-partitioned component storage with per-column locks
//! - Filtered chunk queries
//! - Deferred structural commands
//! - Systems and the staged scheduler that chains them

mod chunk;
mod commands;
mod component;
mod entity;
mod query;
mod store;
mod system;
mod world;

/// Generic spatial and hierarchy components
pub mod components;

/// Staged system scheduler
pub mod scheduler;

pub use chunk::{ArchetypeId, Chunk, ColumnMut, ColumnRef};
pub use commands::{Command, CommandBuffer, CommandReport};
pub use component::{Bundle, Component, ComponentKind, ComponentValue, Signature};
pub use entity::{Entity, EntityAllocator, EntityId};
pub use query::Query;
pub use store::{ComponentStore, EntityLocation};
pub use system::{System, SystemContext, TickTime};
pub use world::World;
