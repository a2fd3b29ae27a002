//! Gunplay Simulation Demo
//!
//! Runs a scripted skirmish twice, once as the server (authoritative) and
//! once as a client (predicted), and checks that the replicated weapon
//! state agrees. Then replays the server run from its recorded inputs and
//! checks the full state hash.

use std::collections::BTreeMap;
use std::fs;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use gunplay::{
    TICK_RATE, VERSION,
    core::vec3::FixedVec3,
    game::{
        ammo::AmmoType,
        arena::{Arena, EYE_HEIGHT},
        context::SimRole,
        definition::{parse_definitions, WeaponDefinition},
        entity::EntityId,
        events::CombatEventData,
        input::{Button, InputFrame, InputRecording},
        tick::{replay, Simulation, SimulationConfig},
    },
};

const DEFAULT_DEFINITIONS: &str = "assets/weapons.json";

/// Ticks to simulate (20 seconds).
const DEMO_TICKS: u32 = 20 * TICK_RATE;

/// Simulated client latency in ticks.
const CLIENT_LATENCY: u32 = 4;

/// One scripted player.
struct Spawn {
    id: EntityId,
    weapon_id: EntityId,
    weapon: &'static str,
    position: (i32, i32),
    target: usize,
    fire_every: u32,
}

fn roster() -> Vec<Spawn> {
    vec![
        Spawn { id: EntityId::new([1; 16]), weapon_id: EntityId::new([101; 16]), weapon: "smg", position: (0, 0), target: 1, fire_every: 1 },
        Spawn { id: EntityId::new([2; 16]), weapon_id: EntityId::new([102; 16]), weapon: "shotgun", position: (12, 0), target: 0, fire_every: 50 },
        Spawn { id: EntityId::new([3; 16]), weapon_id: EntityId::new([103; 16]), weapon: "revolver", position: (0, 9), target: 3, fire_every: 40 },
        Spawn { id: EntityId::new([4; 16]), weapon_id: EntityId::new([104; 16]), weapon: "pistol", position: (-14, 4), target: 2, fire_every: 20 },
    ]
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    info!("Gunplay Simulation v{}", VERSION);
    info!("Tick Rate: {} Hz", TICK_RATE);

    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_DEFINITIONS.to_string());
    let json = fs::read_to_string(&path).with_context(|| format!("reading {}", path))?;
    let definitions = parse_definitions(&json).with_context(|| format!("loading {}", path))?;
    info!("Loaded {} weapon definitions from {}", definitions.len(), path);

    demo_skirmish(&definitions)
}

/// Build one copy of the skirmish.
fn setup(role: SimRole, definitions: &BTreeMap<String, WeaponDefinition>) -> Result<Simulation> {
    let mut arena = Arena::with_floor(60);
    arena.add_solid("crate", FixedVec3::from_ints(5, -1, 0), FixedVec3::from_ints(6, 1, 1));
    arena.add_water("pond", FixedVec3::from_ints(-30, -30, -1), FixedVec3::from_ints(-20, -20, 0));
    // Player 4 spawns half inside this pillar and has to be pushed out
    arena.add_solid(
        "pillar",
        FixedVec3::new(-14 * 65536 - 16384, 4 * 65536 - 16384, 0),
        FixedVec3::new(-14 * 65536 + 16384, 4 * 65536 + 16384, 3 * 65536),
    );

    let mut sim = Simulation::new(role, SimulationConfig::default(), arena);
    for spawn in roster() {
        let (x, y) = spawn.position;
        let combatant = sim.add_combatant(spawn.id, FixedVec3::from_ints(x, y, 0));
        combatant.ammo.give(AmmoType::Pistol, 120);
        combatant.ammo.give(AmmoType::Buckshot, 24);

        let definition = definitions
            .get(spawn.weapon)
            .with_context(|| format!("no weapon named '{}'", spawn.weapon))?
            .clone();
        if !sim.give_weapon(spawn.id, spawn.weapon_id, definition) {
            bail!("could not give {} to {}", spawn.weapon, spawn.id.short());
        }
    }
    Ok(sim)
}

/// Scripted input for one player on one tick.
fn scripted_input(tick: u32, spawn: &Spawn, spawns: &[Spawn]) -> InputFrame {
    let (x, y) = spawn.position;
    let (tx, ty) = spawns[spawn.target].position;
    let eye = FixedVec3::new(x * 65536, y * 65536, EYE_HEIGHT);
    let target = FixedVec3::new(tx * 65536, ty * 65536, EYE_HEIGHT - 6554);
    let aim = (target - eye).normalize();

    let mut buttons = Vec::new();
    let warmed_up = tick >= TICK_RATE * 2;
    if warmed_up {
        if spawn.fire_every == 1 {
            // Hold the trigger in bursts of one second
            if (tick / TICK_RATE) % 2 == 0 {
                buttons.push(Button::PrimaryAttack);
            }
        } else if tick % spawn.fire_every == 0 {
            buttons.push(Button::PrimaryAttack);
        }
    }
    if tick % (TICK_RATE * 7) == TICK_RATE * 7 - 1 {
        buttons.push(Button::Reload);
    }

    InputFrame::aiming(aim, &buttons).with_ack_tick(tick.saturating_sub(CLIENT_LATENCY))
}

fn demo_skirmish(definitions: &BTreeMap<String, WeaponDefinition>) -> Result<()> {
    info!("=== Starting Demo Skirmish ===");

    let spawns = roster();
    let mut server = setup(SimRole::Authoritative, definitions)?;
    let mut client = setup(SimRole::Predicted, definitions)?;
    let initial = server.clone();

    let mut recordings: BTreeMap<EntityId, InputRecording> = BTreeMap::new();
    let mut total_events = 0;
    let mut corrections = 0;

    info!("Running {} ticks...", DEMO_TICKS);

    for t in 0..DEMO_TICKS {
        let mut inputs = BTreeMap::new();
        for spawn in &spawns {
            let frame = scripted_input(t, spawn, &spawns);
            recordings.entry(spawn.id).or_default().record(t, frame);
            inputs.insert(spawn.id, frame);
        }

        let result = server.tick(&inputs);
        client.tick(&inputs);
        total_events += result.events.len();

        for event in &result.events {
            match &event.data {
                CombatEventData::Damage(damage) => {
                    info!(
                        "Tick {}: {} hit {} for {:.1} at {:.1} m",
                        t,
                        damage.attacker.short(),
                        damage.victim.short(),
                        damage.amount as f32 / 65536.0,
                        damage.distance_to_attacker as f32 / 65536.0
                    );
                }
                CombatEventData::Unstuck { entity, to, tries, .. } => {
                    info!("Tick {}: {} unstuck to {} after {} tries", t, entity.short(), to, tries);
                }
                CombatEventData::ReloadFinished { shooter, ammo_in_clip, .. } => {
                    info!("Tick {}: {} reloaded ({} in clip)", t, shooter.short(), ammo_in_clip);
                }
                _ => {}
            }
        }

        // Clients hear from the server once a second
        if t % TICK_RATE == TICK_RATE - 1 {
            if server.weapon_state_hash() != client.weapon_state_hash() {
                warn!("Tick {}: predicted weapon state diverged", t);
            }
            let snapshots = server.weapon_snapshots();
            corrections += client.reconcile(&snapshots)?;
        }
    }

    info!("=== Skirmish Results ===");
    for body in server.arena().bodies() {
        info!(
            "Player {}: health {:.1}, {}",
            body.id.short(),
            body.health as f32 / 65536.0,
            if body.alive { "alive" } else { "down" }
        );
    }
    info!("Total events: {}", total_events);
    info!("Predicted fields corrected: {}", corrections);

    let server_weapons = server.weapon_state_hash();
    let client_weapons = client.weapon_state_hash();
    info!("Server weapon hash: {}", hex::encode(server_weapons));
    info!("Client weapon hash: {}", hex::encode(client_weapons));
    if server_weapons != client_weapons {
        bail!("predicted weapon state does not match the server");
    }
    info!("PREDICTION VERIFIED: weapon hashes match");

    info!("=== Verifying Determinism ===");
    let hash = server.compute_hash();
    let (replayed, _) = replay(initial, &recordings, DEMO_TICKS);
    let replay_hash = replayed.compute_hash();
    info!("Final State Hash:  {}", hex::encode(hash));
    info!("Replay State Hash: {}", hex::encode(replay_hash));

    if hash != replay_hash {
        bail!("replay diverged from the live run");
    }
    info!("DETERMINISM VERIFIED: Hashes match!");
    Ok(())
}
