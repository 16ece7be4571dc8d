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
//! Error types for the traffic core

use crate::ecs::Entity;
use thiserror::Error;

/// Errors raised while applying structural changes to the component store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The entity has no stored components (never spawned or already despawned)
    #[error("unknown entity: {0}")]
    UnknownEntity(Entity),

    /// The entity was already inserted into the store
    #[error("entity already stored: {0}")]
    AlreadyStored(Entity),

    /// The entity handle is stale or was never allocated
    #[error("stale entity handle: {0}")]
    StaleEntity(Entity),

    /// A value could not be written to the column of its kind
    #[error("component {kind} does not match its column on {entity}")]
    ComponentMismatch {
        /// Entity being written
        entity: Entity,
        /// Component type name
        kind: &'static str,
    },

    /// Removing a component the entity does not carry
    #[error("{entity} has no {kind} component")]
    MissingComponent {
        /// Entity being modified
        entity: Entity,
        /// Component type name
        kind: &'static str,
    },
}

/// Errors raised by the job scheduler
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// The job's access conflicts with an in-flight job its dependency does
    /// not cover
    #[error("job '{job}' conflicts with in-flight job '{conflicting}' on {kind} without a declared dependency")]
    MissingDependency {
        /// Job being scheduled
        job: &'static str,
        /// In-flight job it conflicts with
        conflicting: &'static str,
        /// Component type name both touch
        kind: &'static str,
    },

    /// The worker pool could not be created
    #[error("failed to build worker pool: {0}")]
    PoolBuild(String),
}

/// Errors raised while converting prefabs into entities
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    /// A prefab lacks geometry needed to size its collider
    #[error("prefab '{prefab}' has no {shape} geometry")]
    MissingGeometry {
        /// Prefab name
        prefab: String,
        /// Missing shape ("box" or "capsule")
        shape: &'static str,
    },

    /// A structural command failed while building the initial world
    #[error("setup command failed: {0}")]
    Store(#[from] StoreError),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// A value is outside its allowed range
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Any error surfaced by the traffic core
#[derive(Error, Debug)]
pub enum TrafficError {
    /// Component store error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Scheduler error
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    /// Setup error
    #[error(transparent)]
    Setup(#[from] SetupError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for traffic core operations
pub type TrafficResult<T> = Result<T, TrafficError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = StoreError::UnknownEntity(Entity::new(3, 1));
        assert_eq!(err.to_string(), "unknown entity: Entity(3, gen: 1)");

        let err = SetupError::MissingGeometry {
            prefab: "StreetCar".to_string(),
            shape: "box",
        };
        assert_eq!(err.to_string(), "prefab 'StreetCar' has no box geometry");
    }

    #[test]
    fn test_conversion_into_traffic_error() {
        let err: TrafficError = ConfigError::Invalid("slot_count must be at least 1".into()).into();
        assert!(matches!(err, TrafficError::Config(ConfigError::Invalid(_))));
        assert_eq!(err.to_string(), "invalid configuration: slot_count must be at least 1");
    }
}
