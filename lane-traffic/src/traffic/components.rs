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
//! Traffic components
//!
//! Cars are `Car + Position` (the player's car additionally carries
//! [`Hero`]); wheels are `Wheel + WheelRotation + Parent + Position`;
//! generation slots are `GenerationSlot + Position`.

use crate::ecs::components::LinkedGroup;
use crate::ecs::Component;
use crate::ecs::components::Position;
use std::fmt;

pub use crate::ecs::components::Parent;

/// Wheels owned by a car; despawning the car despawns them
pub type WheelSet = LinkedGroup;

/// Session-unique car identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CarId(pub u64);

impl fmt::Display for CarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Car#{}", self.0)
    }
}

/// Travel direction of a car relative to the track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LaneDirection {
    /// Same direction as the hero
    #[default]
    Forward,
    /// Oncoming traffic
    Oncoming,
}

/// Axis-aligned bounding box size
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Extents {
    /// Width (lateral)
    pub x: f64,
    /// Height
    pub y: f64,
    /// Length along the track
    pub z: f64,
}

impl Extents {
    /// Create extents from the three sizes
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Extents { x, y, z }
    }

    /// Longitudinal size, used as the car length
    pub fn length(&self) -> f64 {
        self.z
    }
}

/// Bounding capsule
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Capsule {
    /// Capsule height
    pub height: f64,
    /// Capsule radius
    pub radius: f64,
}

/// Car state
///
/// The id is fixed at construction. The remaining fields are written by
/// the spawn system (`speed`, `disabled`) or by collaborators outside the
/// core between ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct Car {
    id: CarId,
    /// Current speed
    pub speed: f64,
    /// Steering angle
    pub steering: f64,
    /// Braking flag
    pub braking: bool,
    /// Bounding box size
    pub extents: Extents,
    /// Bounding capsule
    pub capsule: Capsule,
    /// Scrolled off-screen and waiting to be recycled
    pub disabled: bool,
    /// Hit by another car
    pub collided: bool,
    /// Car currently in a near miss with this one
    pub close_call: Option<CarId>,
    /// Lane direction
    pub direction: LaneDirection,
}

impl Car {
    /// Create an enabled, stationary car
    pub fn new(id: CarId, extents: Extents) -> Self {
        Car {
            id,
            speed: 0.0,
            steering: 0.0,
            braking: false,
            extents,
            capsule: Capsule::default(),
            disabled: false,
            collided: false,
            close_call: None,
            direction: LaneDirection::default(),
        }
    }

    /// Set the initial speed
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    /// Set the bounding capsule
    pub fn with_capsule(mut self, capsule: Capsule) -> Self {
        self.capsule = capsule;
        self
    }

    /// Identifier
    pub fn id(&self) -> CarId {
        self.id
    }

    /// Check whether the car can be recycled
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }
}

impl Component for Car {}

/// Tag of the player's car
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Hero;

impl Component for Hero {}

/// Wheel following a car
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wheel {
    /// Owning car, used for lookup only
    pub owner: CarId,
    /// Speed copied from the owner on the last sync
    pub speed: f64,
}

impl Wheel {
    /// Create a stationary wheel of `owner`
    pub fn new(owner: CarId) -> Self {
        Wheel { owner, speed: 0.0 }
    }
}

impl Component for Wheel {}

/// Wheel spin about the negative X axis, in radians within `[0, 2π)`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelRotation {
    /// Current angle
    pub angle: f64,
}

impl WheelRotation {
    /// Fixed rotation axis
    pub const AXIS: [f64; 3] = [-1.0, 0.0, 0.0];

    /// Advance by `increment` radians
    pub fn advance(&mut self, increment: f64) {
        self.angle = (self.angle + increment).rem_euclid(std::f64::consts::TAU);
    }
}

impl Component for WheelRotation {}

/// Fixed track position where a disabled car may be recycled
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSlot {
    /// Where recycled cars are placed
    pub position: Position,
    /// Time of the last recycle into this slot
    pub last_spawn_time: f64,
    /// A car is within one car length of the slot
    pub occupied: bool,
}

impl GenerationSlot {
    /// Create a free slot that has never spawned
    pub fn new(position: Position) -> Self {
        GenerationSlot {
            position,
            last_spawn_time: 0.0,
            occupied: false,
        }
    }
}

impl Component for GenerationSlot {}
