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
//! Simulation configuration
//!
//! Every field has a default, so a TOML file only needs the values it
//! overrides:
//!
//! ```toml
//! slot_count = 8
//! seed = 1234
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables of the traffic core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Number of generation slots created at setup
    pub slot_count: usize,
    /// Minimum seconds between two recycles into the same slot
    pub min_spawn_interval: f64,
    /// Lower bound (inclusive) of a recycled car's speed
    pub spawn_speed_min: f64,
    /// Upper bound (exclusive) of a recycled car's speed
    pub spawn_speed_max: f64,
    /// Number of street cars created at setup
    pub street_car_count: usize,
    /// Initial speed of street cars
    pub street_car_speed: f64,
    /// Entities per store chunk
    pub chunk_capacity: usize,
    /// Worker threads; 0 lets rayon pick
    pub worker_threads: usize,
    /// Seed of the per-tick random streams
    pub seed: u64,
    /// Wheel rotation per tick per unit of speed
    pub wheel_rotation_factor: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            slot_count: 5,
            min_spawn_interval: 0.2,
            spawn_speed_min: 5.0,
            spawn_speed_max: 100.0,
            street_car_count: 2,
            street_car_speed: 20.0,
            chunk_capacity: 128,
            worker_threads: 0,
            seed: 0x5EED_CA75,
            wheel_rotation_factor: 1.0,
        }
    }
}

impl SimConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Serialize to pretty TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slot_count == 0 {
            return Err(ConfigError::Invalid("slot_count must be at least 1".into()));
        }
        if self.chunk_capacity == 0 {
            return Err(ConfigError::Invalid("chunk_capacity must be at least 1".into()));
        }
        if !(self.spawn_speed_min.is_finite() && self.spawn_speed_max.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "spawn speed bounds must be finite, got [{}, {})",
                self.spawn_speed_min, self.spawn_speed_max
            )));
        }
        if !(self.spawn_speed_min < self.spawn_speed_max) {
            return Err(ConfigError::Invalid(format!(
                "spawn speed range [{}, {}) is empty",
                self.spawn_speed_min, self.spawn_speed_max
            )));
        }
        if !(self.min_spawn_interval >= 0.0 && self.min_spawn_interval.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "min_spawn_interval must be finite and non-negative, got {}",
                self.min_spawn_interval
            )));
        }
        Ok(())
    }
}
