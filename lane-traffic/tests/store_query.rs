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
//! Component store and query behavior through the public World API
//!
//! Covers chunk splitting, archetype moves, despawn cascades and stale
//! handles.

use lane_traffic::ecs::components::{LinkedGroup, Parent, Position};
use lane_traffic::ecs::{Bundle, Query, World};
use lane_traffic::error::StoreError;
use lane_traffic::traffic::components::{Car, CarId, Extents, Hero};

fn car(id: u64) -> Car {
    Car::new(CarId(id), Extents::new(2.0, 1.5, 4.0))
}

#[test]
fn test_entities_split_across_chunks() {
    let mut world = World::with_chunk_capacity(4);
    for i in 0..10 {
        world.spawn(Bundle::new().with(car(i)).with(Position::new(0.0, 0.0, i as f64)));
    }
    assert_eq!(world.query(&Query::new().with::<Car>()).len(), 0);

    let report = world.flush();
    assert!(report.is_ok());
    assert_eq!(report.applied, 10);

    let chunks = world.query(&Query::new().with::<Car>().with::<Position>());
    assert_eq!(chunks.iter().map(|c| c.len()).collect::<Vec<_>>(), vec![4, 4, 2]);

    let mut seen = Vec::new();
    for chunk in &chunks {
        let cars = chunk.read::<Car>().unwrap();
        let positions = chunk.read::<Position>().unwrap();
        for (car, position) in cars.iter().zip(positions.iter()) {
            assert_eq!(car.id().0 as f64, position.z());
            seen.push(car.id().0);
        }
    }
    assert_eq!(seen, (0..10).collect::<Vec<_>>());
}

#[test]
fn test_exclusion_filters_archetypes() {
    let mut world = World::new();
    world.spawn(Bundle::new().with(car(0)).with(Position::zero()));
    world.spawn(Bundle::new().with(car(1)).with(Position::zero()).with(Hero));
    world.flush();

    let street = world.query(&Query::new().with::<Car>().without::<Hero>());
    assert_eq!(street.len(), 1);
    assert_eq!(street[0].read::<Car>().unwrap()[0].id(), CarId(0));

    let all = world.query(&Query::new().with::<Car>());
    assert_eq!(all.iter().map(|c| c.len()).sum::<usize>(), 2);
}

#[test]
fn test_insert_moves_entity_and_keeps_values() {
    let mut world = World::new();
    let entity = world.spawn(Bundle::new().with(car(5)).with(Position::new(1.0, 2.0, 3.0)));
    world.flush();
    let version = world.store().version();

    world.insert(entity, Hero);
    world.flush();

    assert!(world.store().version() > version);
    assert!(world.store().has::<Hero>(entity));
    assert_eq!(world.get::<Position>(entity), Some(Position::new(1.0, 2.0, 3.0)));
    assert_eq!(world.get::<Car>(entity).map(|c| c.id()), Some(CarId(5)));
    assert!(world.query(&Query::new().with::<Car>().without::<Hero>()).is_empty());
}

#[test]
fn test_in_place_write_keeps_version() {
    let mut world = World::new();
    let entity = world.spawn(Bundle::new().with(car(1)).with(Position::zero()));
    world.flush();
    let version = world.store().version();

    world.store().with_mut::<Car, _>(entity, |car| car.speed = 12.0);
    world.insert(entity, Position::new(0.0, 0.0, 9.0));
    world.flush();

    assert_eq!(world.store().version(), version);
    assert_eq!(world.get::<Car>(entity).unwrap().speed, 12.0);
    assert_eq!(world.get::<Position>(entity).unwrap().z(), 9.0);
}

#[test]
fn test_despawn_cascades_through_linked_group() {
    let mut world = World::new();
    let owner = world.spawn(Bundle::new().with(car(1)).with(Position::zero()));
    let children: Vec<_> = (0..3)
        .map(|_| world.spawn(Bundle::new().with(Parent(owner)).with(Position::zero())))
        .collect();
    world.insert(owner, LinkedGroup(children.clone()));
    let bystander = world.spawn(Bundle::new().with(Position::zero()));
    world.flush();
    assert_eq!(world.store().len(), 5);

    world.despawn(owner);
    let report = world.flush();
    assert!(report.is_ok());

    assert_eq!(world.store().len(), 1);
    assert!(!world.is_entity_alive(owner));
    assert!(children.iter().all(|child| !world.is_entity_alive(*child)));
    assert!(world.is_entity_alive(bystander));
    assert_eq!(world.get::<Position>(bystander), Some(Position::zero()));
}

#[test]
fn test_stale_handle_is_reported() {
    let mut world = World::new();
    let entity = world.spawn(Bundle::new().with(Position::zero()));
    world.flush();
    world.despawn(entity);
    world.flush();

    world.insert(entity, Position::new(1.0, 0.0, 0.0));
    let report = world.flush();
    assert!(!report.is_ok());
    assert_eq!(report.failed, vec![StoreError::StaleEntity(entity)]);

    let reused = world.spawn(Bundle::new().with(Position::zero()));
    world.flush();
    assert_eq!(reused.id(), entity.id());
    assert_ne!(reused.generation(), entity.generation());
    assert!(world.get::<Position>(entity).is_none());
}

#[test]
fn test_despawn_fills_hole_in_chunk() {
    let mut world = World::with_chunk_capacity(8);
    let entities: Vec<_> = (0..4)
        .map(|i| world.spawn(Bundle::new().with(car(i)).with(Position::new(0.0, 0.0, i as f64))))
        .collect();
    world.flush();

    world.despawn(entities[1]);
    world.flush();

    let chunks = world.query(&Query::new().with::<Car>());
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].len(), 3);
    for (i, entity) in entities.iter().enumerate() {
        if i == 1 {
            continue;
        }
        let position = world.get::<Position>(*entity).unwrap();
        assert_eq!(world.get::<Car>(*entity).unwrap().id().0 as f64, position.z());
    }
}
