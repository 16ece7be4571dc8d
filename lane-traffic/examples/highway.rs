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
//! Drive the traffic core for a few simulated seconds
//!
//! Street cars scroll towards the camera; once past it they are disabled and
//! wait to be recycled into a generation slot. Run with
//! `RUST_LOG=debug cargo run --example highway [config.toml]` to see the
//! spawn decisions.

use lane_traffic::ecs::components::Position;
use lane_traffic::traffic::CarId;
use lane_traffic::{SimConfig, Simulation, TrafficResult};

const STEP: f64 = 0.02;
const DESPAWN_Z: f64 = -20.0;

fn main() -> TrafficResult<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };

    println!("Lane Traffic - Highway Example");
    println!("==============================\n");

    let mut sim = Simulation::new(config)?;
    let hero = sim.hero_id();
    if let Some(id) = hero {
        sim.with_car_mut(id, |car| car.speed = 55.0);
    }
    let street: Vec<CarId> = sim.car_ids().into_iter().filter(|id| Some(*id) != hero).collect();

    let mut now = 0.0;
    for step in 1..=500 {
        now += STEP;
        sim.tick(now);
        sim.complete();
        scroll(&mut sim, &street);

        if step % 50 == 0 {
            let hero = sim.hero_status();
            println!(
                "t={:5.2}s  recycled={:3}  hero speed={}",
                now,
                sim.recycled_total(),
                hero.map_or(0, |h| h.display_speed)
            );
        }
    }

    println!("\nFinal street cars:");
    for id in &street {
        if let (Some(car), Some(entity)) = (sim.car(*id), sim.car_entity(*id)) {
            let z = sim.world().get::<Position>(entity).map_or(f64::NAN, |p| p.z());
            println!("  {}: speed {:6.2}  z {:7.2}  disabled {}", id, car.speed, z, car.disabled);
        }
    }
    Ok(())
}

/// Stand-in for the game's movement system
fn scroll(sim: &mut Simulation, street: &[CarId]) {
    for id in street {
        let (Some(car), Some(entity)) = (sim.car(*id), sim.car_entity(*id)) else {
            continue;
        };
        if car.disabled {
            continue;
        }
        let passed = sim
            .world()
            .store()
            .with_mut::<Position, _>(entity, |p| {
                p.set_z(p.z() - car.speed * STEP * 0.1);
                p.z() < DESPAWN_Z
            })
            .unwrap_or(false);
        if passed {
            sim.disable_car(*id);
        }
    }
}
