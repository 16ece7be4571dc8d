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
//! Generic spatial and hierarchy components
//!
//! The track runs along the z axis; x is lateral and y is vertical.

use crate::ecs::{Component, Entity};

/// 3D position component with double-precision coordinates
///
/// # Examples
///
/// ```
/// use lane_traffic::ecs::components::Position;
///
/// let pos = Position::new(1.0, 2.0, 3.0);
/// assert_eq!(pos.x(), 1.0);
/// assert_eq!(pos.offset(0.0, 0.0, -2.0).z(), 1.0);
/// assert!(pos.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    x: f64,
    y: f64,
    z: f64,
}

impl Position {
    /// Create a new position with the given coordinates
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Position { x, y, z }
    }

    /// Create a position at the origin (0, 0, 0)
    pub fn zero() -> Self {
        Position::new(0.0, 0.0, 0.0)
    }

    /// Get the x coordinate
    pub fn x(&self) -> f64 {
        self.x
    }

    /// Get the y coordinate
    pub fn y(&self) -> f64 {
        self.y
    }

    /// Get the z coordinate
    pub fn z(&self) -> f64 {
        self.z
    }

    /// Set the x coordinate
    pub fn set_x(&mut self, x: f64) {
        self.x = x;
    }

    /// Set the y coordinate
    pub fn set_y(&mut self, y: f64) {
        self.y = y;
    }

    /// Set the z coordinate
    pub fn set_z(&mut self, z: f64) {
        self.z = z;
    }

    /// Copy of this position shifted by the given deltas
    pub fn offset(&self, dx: f64, dy: f64, dz: f64) -> Position {
        Position::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Absolute distance to `other` along the track axis
    pub fn track_distance(&self, other: &Position) -> f64 {
        (self.z - other.z).abs()
    }

    /// Check if all coordinates are finite (not NaN or infinite)
    pub fn is_valid(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Component for Position {}

impl Default for Position {
    fn default() -> Self {
        Position::zero()
    }
}

/// Structural link from a child entity to its parent
///
/// Used for hierarchy only; no system resolves through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parent(pub Entity);

impl Component for Parent {}

/// Entities that live and die with the entity carrying this component
///
/// Despawning the owner despawns every member of the group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkedGroup(pub Vec<Entity>);

impl LinkedGroup {
    /// Members of the group
    pub fn members(&self) -> &[Entity] {
        &self.0
    }
}

impl Component for LinkedGroup {}
