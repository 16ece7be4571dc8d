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
//! End-to-end ticks through the simulation driver

use lane_traffic::ecs::components::Position;
use lane_traffic::ecs::Query;
use lane_traffic::traffic::components::{Car, CarId, GenerationSlot, Wheel, WheelRotation, WheelSet};
use lane_traffic::traffic::{PauseReason, RunState, Simulation, TrackLayout};
use lane_traffic::SimConfig;
use std::collections::HashSet;

const STEP: f64 = 0.02;

fn config(seed: u64) -> SimConfig {
    SimConfig {
        seed,
        worker_threads: 4,
        ..SimConfig::default()
    }
}

fn slot_positions(sim: &Simulation) -> Vec<Position> {
    sim.world()
        .query(&Query::new().with::<GenerationSlot>())
        .iter()
        .flat_map(|chunk| {
            chunk
                .read::<GenerationSlot>()
                .map(|slots| slots.iter().map(|s| s.position).collect::<Vec<_>>())
                .unwrap_or_default()
        })
        .collect()
}

#[test]
fn test_wheels_converge_to_car_speed() {
    let mut sim = Simulation::new(config(1)).unwrap();
    sim.with_car_mut(CarId(0), |car| car.speed = 12.5).unwrap();
    sim.with_car_mut(CarId(2), |car| car.speed = 3.0).unwrap();

    sim.tick(STEP);
    sim.complete();

    for id in sim.car_ids() {
        let car = sim.car(id).unwrap();
        let entity = sim.car_entity(id).unwrap();
        let wheels = sim.world().get::<WheelSet>(entity).unwrap();
        for wheel in wheels.members() {
            let wheel_state = sim.world().get::<Wheel>(*wheel).unwrap();
            assert_eq!(wheel_state.owner, id);
            assert_eq!(wheel_state.speed, car.speed, "{}", id);
            let rotation = sim.world().get::<WheelRotation>(*wheel).unwrap();
            assert!(rotation.angle >= 0.0 && rotation.angle < std::f64::consts::TAU);
        }
    }
}

#[test]
fn test_wheel_speed_lags_at_most_one_tick() {
    let mut sim = Simulation::new(config(2)).unwrap();
    let entity = sim.car_entity(CarId(1)).unwrap();
    let wheel = sim.world().get::<WheelSet>(entity).unwrap().members()[0];

    for step in 1..=20 {
        let speed = step as f64;
        sim.with_car_mut(CarId(1), |car| car.speed = speed).unwrap();
        sim.tick(step as f64 * STEP);
        sim.complete();
        assert_eq!(sim.world().get::<Wheel>(wheel).unwrap().speed, speed);
    }
}

#[test]
fn test_no_car_recycled_twice_across_seeds() {
    for seed in 0..24 {
        let mut sim = Simulation::new(config(seed)).unwrap();
        assert!(sim.disable_car(CarId(0)));
        assert!(sim.disable_car(CarId(1)));

        let mut now = 0.0;
        for _ in 0..30 {
            now += STEP;
            sim.tick(now);
        }
        sim.complete();

        let slots = slot_positions(&sim);
        let enabled: Vec<Position> = [CarId(0), CarId(1)]
            .iter()
            .filter(|id| !sim.car(**id).unwrap().disabled)
            .map(|id| sim.world().get::<Position>(sim.car_entity(*id).unwrap()).unwrap())
            .collect();

        assert_eq!(sim.recycled_total(), enabled.len() as u64, "seed {}", seed);
        assert!(enabled.iter().all(|p| slots.contains(p)), "seed {}", seed);
        let distinct: HashSet<(i64, i64)> = enabled.iter().map(|p| (p.x() as i64, p.z() as i64)).collect();
        assert_eq!(distinct.len(), enabled.len(), "seed {}", seed);
    }
}

#[test]
fn test_recycle_happens_with_default_track() {
    let mut sim = Simulation::new(config(7)).unwrap();
    sim.disable_car(CarId(0));

    let mut now = 0.0;
    while sim.car(CarId(0)).unwrap().disabled && now < 10.0 {
        now += STEP;
        sim.tick(now);
        sim.complete();
    }

    let car = sim.car(CarId(0)).unwrap();
    assert!(!car.disabled);
    assert!(car.speed >= 5.0 && car.speed < 100.0);
    assert!(now >= 0.2);
    assert_eq!(sim.recycled_total(), 1);
}

#[test]
fn test_hero_collision_stops_recycling() {
    let mut sim = Simulation::new(config(3)).unwrap();
    sim.tick(STEP);
    sim.with_car_mut(CarId(2), |car| car.collided = true).unwrap();
    sim.disable_car(CarId(0));

    let mut now = STEP;
    for _ in 0..50 {
        now += STEP;
        assert_eq!(sim.tick(now), RunState::Paused(PauseReason::HeroCollided));
    }
    assert!(sim.car(CarId(0)).unwrap().disabled);
    assert_eq!(sim.recycled_total(), 0);
    assert!(sim.hero_status().unwrap().collided);

    sim.with_car_mut(CarId(2), |car| car.collided = false).unwrap();
    sim.resume();
    assert_eq!(sim.tick(now + STEP), RunState::Running);
}

#[test]
fn test_despawned_car_takes_its_wheels() {
    let mut sim = Simulation::new(config(4)).unwrap();
    let wheel_query = Query::new().with::<Wheel>();
    let count = |sim: &Simulation| sim.world().query(&wheel_query).iter().map(|c| c.len()).sum::<usize>();
    assert_eq!(count(&sim), 12);

    sim.despawn_car(CarId(0));
    sim.tick(STEP);
    sim.complete();

    assert_eq!(count(&sim), 8);
    assert_eq!(sim.car_ids(), vec![CarId(1), CarId(2)]);
    let cars = sim.world().query(&Query::new().with::<Car>());
    assert_eq!(cars.iter().map(|c| c.len()).sum::<usize>(), 2);
}

#[test]
fn test_config_from_toml_drives_layout() {
    let config = SimConfig::from_toml_str("slot_count = 3\nstreet_car_count = 4\nworker_threads = 2\n").unwrap();
    let sim = Simulation::setup(config, &TrackLayout::default()).unwrap();

    assert_eq!(slot_positions(&sim).len(), 3);
    assert_eq!(sim.car_ids().len(), 5);
}
