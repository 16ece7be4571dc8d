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
//! Initial world construction from prefab descriptions
//!
//! A [`Prefab`] stands in for a converted scene model: a spawn position,
//! the collider geometry measured on the model, and the local offsets of its
//! wheels. [`populate`] turns a [`TrackLayout`] into entities:
//!
//! - street car `i` at the street car prefab shifted by `(-4·i, 0, +1)`
//! - slot `i` at the slot prefab shifted by `(-2·i, 0, 0)`
//! - the hero at the hero prefab shifted by `(0, -0.2, -2)`
//!
//! A prefab lacking the geometry its role needs is reported and skipped;
//! the rest of the layout is still built.

use crate::config::SimConfig;
use crate::ecs::components::{LinkedGroup, Parent, Position};
use crate::ecs::{Bundle, Entity, World};
use crate::error::SetupError;
use crate::traffic::components::{Capsule, Car, CarId, Extents, GenerationSlot, Hero, Wheel, WheelRotation};

/// Model description supplied by the asset side
#[derive(Debug, Clone, PartialEq)]
pub struct Prefab {
    /// Name used in diagnostics
    pub name: String,
    /// World position of the model
    pub position: Position,
    /// Box collider size, if the model has one
    pub box_extents: Option<Extents>,
    /// Capsule collider, if the model has one
    pub capsule: Option<Capsule>,
    /// Wheel positions relative to the model
    pub wheel_offsets: Vec<Position>,
}

impl Prefab {
    /// Create a prefab without geometry or wheels
    pub fn new(name: impl Into<String>, position: Position) -> Self {
        Prefab {
            name: name.into(),
            position,
            box_extents: None,
            capsule: None,
            wheel_offsets: Vec::new(),
        }
    }

    /// Attach a box collider size
    pub fn with_box(mut self, extents: Extents) -> Self {
        self.box_extents = Some(extents);
        self
    }

    /// Attach a capsule collider
    pub fn with_capsule(mut self, capsule: Capsule) -> Self {
        self.capsule = Some(capsule);
        self
    }

    /// Attach wheels at the given local offsets
    pub fn with_wheels(mut self, offsets: Vec<Position>) -> Self {
        self.wheel_offsets = offsets;
        self
    }

    fn box_extents(&self) -> Result<Extents, SetupError> {
        self.box_extents.ok_or_else(|| self.missing("box"))
    }

    fn capsule(&self) -> Result<Capsule, SetupError> {
        self.capsule.ok_or_else(|| self.missing("capsule"))
    }

    fn missing(&self, shape: &'static str) -> SetupError {
        SetupError::MissingGeometry {
            prefab: self.name.clone(),
            shape,
        }
    }
}

/// Prefabs of one track
#[derive(Debug, Clone, PartialEq)]
pub struct TrackLayout {
    /// Obstacle car model
    pub street_car: Prefab,
    /// Player car model
    pub hero: Prefab,
    /// Generation slot marker
    pub slot: Prefab,
}

impl Default for TrackLayout {
    fn default() -> Self {
        let wheels = vec![
            Position::new(-0.9, -0.4, 1.3),
            Position::new(0.9, -0.4, 1.3),
            Position::new(-0.9, -0.4, -1.3),
            Position::new(0.9, -0.4, -1.3),
        ];
        TrackLayout {
            street_car: Prefab::new("StreetCar", Position::new(2.0, 0.0, 12.0))
                .with_box(Extents::new(2.0, 1.5, 4.0))
                .with_capsule(Capsule { height: 4.0, radius: 1.0 })
                .with_wheels(wheels.clone()),
            hero: Prefab::new("HeroCar", Position::new(0.0, 0.2, 0.0))
                .with_box(Extents::new(2.0, 1.4, 4.2))
                .with_wheels(wheels),
            slot: Prefab::new("StartSlot", Position::new(4.0, 0.0, 30.0)),
        }
    }
}

/// Entities created by [`populate`]
#[derive(Debug, Default)]
pub struct SetupSummary {
    /// Street cars with their ids, in creation order
    pub street_cars: Vec<(Entity, CarId)>,
    /// The hero, unless its prefab was rejected
    pub hero: Option<(Entity, CarId)>,
    /// Generation slots in creation order
    pub slots: Vec<Entity>,
    /// Number of wheel entities
    pub wheels: usize,
    /// Prefabs that were skipped
    pub diagnostics: Vec<SetupError>,
}

/// Build cars, wheels and slots, then apply the commands
///
/// Geometry problems are logged and collected in the summary. A failed
/// structural command aborts setup.
pub fn populate(world: &mut World, layout: &TrackLayout, config: &SimConfig) -> Result<SetupSummary, SetupError> {
    let mut summary = SetupSummary::default();
    let mut next_id = 0u64;

    match street_car_geometry(&layout.street_car) {
        Ok((extents, capsule)) => {
            for i in 0..config.street_car_count {
                let id = CarId(next_id);
                next_id += 1;
                let position = layout.street_car.position.offset(-4.0 * i as f64, 0.0, 1.0);
                let car = Car::new(id, extents)
                    .with_speed(config.street_car_speed)
                    .with_capsule(capsule);
                let entity = spawn_car(world, &layout.street_car, car, position, false, &mut summary);
                summary.street_cars.push((entity, id));
            }
        }
        Err(err) => reject(err, &mut summary),
    }

    for i in 0..config.slot_count {
        let position = layout.slot.position.offset(-2.0 * i as f64, 0.0, 0.0);
        let slot = world.spawn(Bundle::new().with(GenerationSlot::new(position)).with(position));
        summary.slots.push(slot);
    }

    match layout.hero.box_extents() {
        Ok(extents) => {
            let id = CarId(next_id);
            let position = layout.hero.position.offset(0.0, -0.2, -2.0);
            let mut car = Car::new(id, extents);
            if let Some(capsule) = layout.hero.capsule {
                car = car.with_capsule(capsule);
            }
            let entity = spawn_car(world, &layout.hero, car, position, true, &mut summary);
            summary.hero = Some((entity, id));
        }
        Err(err) => reject(err, &mut summary),
    }

    let report = world.flush();
    if let Some(err) = report.failed.into_iter().next() {
        return Err(SetupError::Store(err));
    }

    log::info!(
        "setup complete: {} street cars, {} slots, {} wheels, hero {}",
        summary.street_cars.len(),
        summary.slots.len(),
        summary.wheels,
        if summary.hero.is_some() { "present" } else { "missing" }
    );
    Ok(summary)
}

fn street_car_geometry(prefab: &Prefab) -> Result<(Extents, Capsule), SetupError> {
    Ok((prefab.box_extents()?, prefab.capsule()?))
}

fn reject(err: SetupError, summary: &mut SetupSummary) {
    log::error!("{}", err);
    summary.diagnostics.push(err);
}

fn spawn_car(
    world: &World,
    prefab: &Prefab,
    car: Car,
    position: Position,
    hero: bool,
    summary: &mut SetupSummary,
) -> Entity {
    let owner = car.id();
    let mut bundle = Bundle::new().with(car).with(position);
    if hero {
        bundle = bundle.with(Hero);
    }
    let entity = world.spawn(bundle);

    let wheels: Vec<Entity> = prefab
        .wheel_offsets
        .iter()
        .map(|offset| {
            world.spawn(
                Bundle::new()
                    .with(Wheel::new(owner))
                    .with(WheelRotation::default())
                    .with(Parent(entity))
                    .with(position.offset(offset.x(), offset.y(), offset.z())),
            )
        })
        .collect();

    if !wheels.is_empty() {
        summary.wheels += wheels.len();
        world.insert(entity, LinkedGroup(wheels));
    }
    entity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::Query;
    use crate::traffic::components::WheelSet;

    #[test]
    fn test_default_layout() {
        let mut world = World::new();
        let config = SimConfig::default();
        let summary = populate(&mut world, &TrackLayout::default(), &config).unwrap();

        assert_eq!(summary.street_cars.len(), 2);
        assert_eq!(summary.slots.len(), 5);
        assert_eq!(summary.wheels, 12);
        assert!(summary.diagnostics.is_empty());

        let (first, _) = summary.street_cars[0];
        let (second, _) = summary.street_cars[1];
        let a = world.get::<Position>(first).unwrap();
        let b = world.get::<Position>(second).unwrap();
        assert_eq!(a, Position::new(2.0, 0.0, 13.0));
        assert_eq!(b, Position::new(-2.0, 0.0, 13.0));
        assert_eq!(world.get::<Car>(first).unwrap().speed, 20.0);

        let (hero, hero_id) = summary.hero.unwrap();
        let hero_position = world.get::<Position>(hero).unwrap();
        assert_eq!(hero_position.z(), -2.0);
        assert!((hero_position.y() - 0.0).abs() < 1e-12);
        assert_eq!(hero_id, CarId(2));

        let slot = world.get::<GenerationSlot>(summary.slots[4]).unwrap();
        assert_eq!(slot.position, Position::new(-4.0, 0.0, 30.0));
        assert_eq!(slot.last_spawn_time, 0.0);
    }

    #[test]
    fn test_missing_capsule_skips_street_cars() {
        let mut world = World::new();
        let mut layout = TrackLayout::default();
        layout.street_car.capsule = None;

        let summary = populate(&mut world, &layout, &SimConfig::default()).unwrap();
        assert!(summary.street_cars.is_empty());
        assert!(summary.hero.is_some());
        assert_eq!(
            summary.diagnostics,
            vec![SetupError::MissingGeometry {
                prefab: "StreetCar".to_string(),
                shape: "capsule",
            }]
        );
        let street = world.query(&Query::new().with::<Car>().without::<Hero>());
        assert!(street.is_empty());
    }

    #[test]
    fn test_missing_box_skips_hero() {
        let mut world = World::new();
        let mut layout = TrackLayout::default();
        layout.hero.box_extents = None;

        let summary = populate(&mut world, &layout, &SimConfig::default()).unwrap();
        assert!(summary.hero.is_none());
        assert_eq!(summary.street_cars.len(), 2);
        assert_eq!(summary.diagnostics.len(), 1);
    }

    #[test]
    fn test_wheels_follow_car_and_link_back() {
        let mut world = World::new();
        let summary = populate(&mut world, &TrackLayout::default(), &SimConfig::default()).unwrap();
        let (car, id) = summary.street_cars[0];

        let wheels = world.get::<WheelSet>(car).unwrap();
        assert_eq!(wheels.members().len(), 4);
        for wheel in wheels.members() {
            assert_eq!(world.get::<Wheel>(*wheel).unwrap().owner, id);
            assert_eq!(world.get::<Parent>(*wheel), Some(Parent(car)));
        }
    }
}
