use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};

use gunplay::core::fixed::to_fixed;
use gunplay::core::vec3::FixedVec3;
use gunplay::game::arena::Arena;
use gunplay::game::context::SimRole;
use gunplay::game::definition::{RawWeaponDefinition, WeaponDefinition};
use gunplay::game::entity::EntityId;
use gunplay::game::input::{Button, InputFrame};
use gunplay::game::spread::shot_directions;
use gunplay::game::tick::{Simulation, SimulationConfig};

const PLAYERS: u8 = 8;

fn rifle() -> WeaponDefinition {
    let raw: RawWeaponDefinition = serde_json::from_str(
        r#"{ "name": "rifle", "clip_size": 30, "reserve_ammo": 900, "fire_mode": "automatic",
             "primary_rate": 10.0, "reload_time": 2.0, "damage": 5.0, "spread": 0.03,
             "vertical_recoil": 3.0, "horizontal_recoil_range": 1.0 }"#,
    )
    .expect("valid definition");
    WeaponDefinition::from_raw(&raw).expect("valid definition")
}

fn lobby() -> Simulation {
    let mut arena = Arena::with_floor(64);
    arena.add_solid("wall", FixedVec3::from_ints(-2, 10, 0), FixedVec3::from_ints(2, 11, 3));
    let mut sim = Simulation::new(SimRole::Authoritative, SimulationConfig::default(), arena);
    for i in 0..PLAYERS {
        let id = EntityId::new([i + 1; 16]);
        let angle = i as i32 * 5;
        sim.add_combatant(id, FixedVec3::from_ints(angle - 20, (i as i32 % 3) * 6, 0));
        sim.give_weapon(id, EntityId::new([i + 101; 16]), rifle());
    }
    sim
}

fn random_inputs(rng: &mut StdRng) -> BTreeMap<EntityId, InputFrame> {
    (0..PLAYERS)
        .map(|i| {
            let aim = FixedVec3::new(
                rng.gen_range(-65536..65536),
                rng.gen_range(-65536..65536),
                rng.gen_range(-8192..8192),
            )
            .normalize();
            let mut buttons = Vec::new();
            if rng.gen_bool(0.6) {
                buttons.push(Button::PrimaryAttack);
            }
            if rng.gen_bool(0.02) {
                buttons.push(Button::Reload);
            }
            (EntityId::new([i + 1; 16]), InputFrame::aiming(aim, &buttons))
        })
        .collect()
}

fn bench_spread(c: &mut Criterion) {
    let spread = to_fixed(0.18);
    c.bench_function("shot_directions_8_pellets", |b| {
        let mut tick = 0u32;
        b.iter(|| {
            tick = tick.wrapping_add(1);
            black_box(shot_directions(tick, FixedVec3::FORWARD, spread, 8))
        })
    });
}

fn bench_tick(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let frames: Vec<_> = (0..600).map(|_| random_inputs(&mut rng)).collect();

    c.bench_function("simulation_tick_8_players", |b| {
        let mut sim = lobby();
        let mut i = 0;
        b.iter(|| {
            let result = sim.tick(&frames[i % frames.len()]);
            i += 1;
            black_box(result.events.len())
        })
    });

    c.bench_function("state_hash_8_players", |b| {
        let mut sim = lobby();
        for frame in frames.iter().take(120) {
            sim.tick(frame);
        }
        b.iter(|| black_box(sim.compute_hash()))
    });
}

criterion_group!(benches, bench_spread, bench_tick);
criterion_main!(benches);
