//! Simulation Tick
//!
//! Drives every combatant through one tick: unstuck check, then the
//! loadout (swap, drop, active weapon). The same driver runs on the server
//! (authoritative) and on the client (predicted); only the role differs.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::TICK_RATE;
use crate::core::fixed::Fixed;
use crate::core::hash::{compute_state_hash, StateHash, StateHasher};
use crate::core::vec3::FixedVec3;
use crate::game::ammo::AmmoPool;
use crate::game::arena::Arena;
use crate::game::context::{SimRole, TickContext};
use crate::game::definition::WeaponDefinition;
use crate::game::entity::EntityId;
use crate::game::events::CombatEvent;
use crate::game::input::{InputBuilder, InputFrame, InputRecording, InputSnapshot};
use crate::game::lag_comp::{LagCompensationConfig, LagHistory};
use crate::game::loadout::Loadout;
use crate::game::movement::WalkController;
use crate::game::sync::{reconcile, SyncError, WeaponSnapshot};
use crate::game::weapon::Weapon;

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Tick that was simulated
    pub tick: u32,
    /// Events generated this tick, in processing order
    pub events: Vec<CombatEvent>,
}

/// Configuration for a simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimulationConfig {
    /// Ticks per second
    pub tick_rate: u32,
    /// Pose history window
    pub lag_compensation: LagCompensationConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_rate: TICK_RATE,
            lag_compensation: LagCompensationConfig::default(),
        }
    }
}

/// Per-player simulation state.
#[derive(Clone, Debug)]
pub struct Combatant {
    /// Carried weapons
    pub loadout: Loadout,
    /// Carried ammunition
    pub ammo: AmmoPool,
    /// Movement component
    pub walk: WalkController,
    previous_buttons: u8,
}

impl Combatant {
    fn new(id: EntityId) -> Self {
        Self {
            loadout: Loadout::new(id),
            ammo: AmmoPool::new(),
            walk: WalkController::default(),
            previous_buttons: 0,
        }
    }
}

/// A running simulation.
#[derive(Clone, Debug)]
pub struct Simulation {
    role: SimRole,
    config: SimulationConfig,
    tick: u32,
    arena: Arena,
    lag: LagHistory,
    combatants: BTreeMap<EntityId, Combatant>,
}

impl Simulation {
    /// New simulation over an arena, starting at tick 0.
    pub fn new(role: SimRole, config: SimulationConfig, arena: Arena) -> Self {
        Self {
            role,
            config,
            tick: 0,
            arena,
            lag: LagHistory::new(config.lag_compensation),
            combatants: BTreeMap::new(),
        }
    }

    /// Which copy this is.
    pub fn role(&self) -> SimRole {
        self.role
    }

    /// Next tick to simulate.
    pub fn current_tick(&self) -> u32 {
        self.tick
    }

    /// World.
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// World, mutably.
    pub fn arena_mut(&mut self) -> &mut Arena {
        &mut self.arena
    }

    /// Recorded pose history.
    pub fn lag_history(&self) -> &LagHistory {
        &self.lag
    }

    /// Spawn a player.
    pub fn add_combatant(&mut self, id: EntityId, position: FixedVec3) -> &mut Combatant {
        self.arena.spawn_body(id, position);
        info!("Added combatant {} at {}", id.short(), position);
        self.combatants.entry(id).or_insert_with(|| Combatant::new(id))
    }

    /// A player.
    pub fn combatant(&self, id: EntityId) -> Option<&Combatant> {
        self.combatants.get(&id)
    }

    /// A player, mutably.
    pub fn combatant_mut(&mut self, id: EntityId) -> Option<&mut Combatant> {
        self.combatants.get_mut(&id)
    }

    /// Give a player a weapon and make it active.
    pub fn give_weapon(&mut self, owner: EntityId, weapon: EntityId, definition: WeaponDefinition) -> bool {
        let tick = self.tick;
        let Some(combatant) = self.combatants.get_mut(&owner) else {
            return false;
        };
        combatant.loadout.add(Weapon::new(weapon, definition)) && combatant.loadout.equip(tick, weapon)
    }

    /// Run one tick.
    ///
    /// `inputs` is a BTreeMap so combatants are processed in id order.
    /// Players without input this tick are idle.
    pub fn tick(&mut self, inputs: &BTreeMap<EntityId, InputFrame>) -> TickResult {
        let mut ctx = TickContext::with_tick_rate(self.tick, self.role, self.config.tick_rate);

        for (id, combatant) in self.combatants.iter_mut() {
            let frame = inputs.get(id).copied().unwrap_or_default();
            let previous = std::mem::replace(&mut combatant.previous_buttons, frame.buttons);

            combatant.walk.simulate(&mut ctx, *id, &mut self.arena);

            let Some(body) = self.arena.body(*id).filter(|b| b.alive) else {
                continue;
            };
            let input = InputSnapshot::new(frame, previous, body.eye());
            combatant
                .loadout
                .simulate(&mut ctx, &mut combatant.ammo, &input, &mut self.arena, &self.lag);
        }

        if ctx.is_authoritative() {
            self.lag.record(self.tick, &self.arena);
        }

        let result = TickResult {
            tick: self.tick,
            events: ctx.take_events(),
        };
        self.tick += 1;
        result
    }

    /// Client side: let a player's active weapon shape the outgoing input.
    pub fn build_input(&mut self, id: EntityId, builder: &mut InputBuilder, dt: Fixed) {
        if let Some(combatant) = self.combatants.get_mut(&id) {
            combatant.loadout.build_input(builder, dt);
        }
    }

    /// Snapshots of every carried weapon.
    pub fn weapon_snapshots(&self) -> Vec<WeaponSnapshot> {
        self.combatants
            .values()
            .flat_map(|c| c.loadout.weapons())
            .map(|w| WeaponSnapshot::capture(self.tick, w))
            .collect()
    }

    /// Apply authoritative snapshots. Returns how many fields were corrected.
    ///
    /// Snapshots for weapons this copy does not carry are skipped.
    pub fn reconcile(&mut self, snapshots: &[WeaponSnapshot]) -> Result<usize, SyncError> {
        let mut corrected = 0;
        for snapshot in snapshots {
            let weapon = self
                .combatants
                .values_mut()
                .find_map(|c| c.loadout.weapon_mut(snapshot.weapon));
            if let Some(weapon) = weapon {
                corrected += reconcile(weapon, snapshot)?.len();
            }
        }
        if corrected > 0 {
            debug!("Reconciled {} weapon fields at tick {}", corrected, self.tick);
        }
        Ok(corrected)
    }

    /// Hash of replicated weapon state and ammo only. Predicted and
    /// authoritative copies agree on this.
    pub fn weapon_state_hash(&self) -> StateHash {
        compute_state_hash(StateHasher::for_weapon_state(), self.tick, |h| {
            h.update_u32(self.combatants.len() as u32);
            for (id, combatant) in &self.combatants {
                h.update_uuid(id.as_bytes());
                combatant.loadout.hash_into(h);
                combatant.ammo.hash_into(h);
            }
        })
    }

    /// Hash of the whole simulation, including world state.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(StateHasher::for_arena_state(), self.tick, |h| {
            self.arena.hash_into(h);
            h.update_bytes(&self.weapon_state_hash());
        })
    }
}

/// Replay recorded inputs from an initial simulation.
///
/// Returns the final simulation and every event emitted.
pub fn replay(
    initial: Simulation,
    recordings: &BTreeMap<EntityId, InputRecording>,
    tick_count: u32,
) -> (Simulation, Vec<CombatEvent>) {
    let mut sim = initial;
    let mut all_events = Vec::new();

    for _ in 0..tick_count {
        let tick = sim.current_tick();
        let inputs: BTreeMap<EntityId, InputFrame> = recordings
            .iter()
            .map(|(id, recording)| (*id, recording.get_input_at(tick)))
            .collect();
        all_events.extend(sim.tick(&inputs).events);
    }

    (sim, all_events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::FIXED_ONE;
    use crate::game::definition::RawWeaponDefinition;
    use crate::game::events::CombatEventData;
    use crate::game::input::Button;

    const ALICE: EntityId = EntityId::new([1; 16]);
    const BOB: EntityId = EntityId::new([2; 16]);
    const ALICE_GUN: EntityId = EntityId::new([11; 16]);
    const BOB_GUN: EntityId = EntityId::new([12; 16]);

    fn pistol() -> WeaponDefinition {
        let raw: RawWeaponDefinition = serde_json::from_str(
            r#"{ "name": "pistol", "clip_size": 12, "reserve_ammo": 24, "primary_rate": 6.0,
                 "reload_time": 1.0, "deploy_time": 0.5, "damage": 25.0, "spread": 0.01,
                 "vertical_recoil": 4.0 }"#,
        )
        .unwrap();
        WeaponDefinition::from_raw(&raw).unwrap()
    }

    /// Alice at the origin facing Bob 10 m down +X.
    fn duel(role: SimRole) -> Simulation {
        let mut sim = Simulation::new(role, SimulationConfig::default(), Arena::with_floor(50));
        sim.add_combatant(ALICE, FixedVec3::ZERO);
        sim.add_combatant(BOB, FixedVec3::from_ints(10, 0, 0));
        assert!(sim.give_weapon(ALICE, ALICE_GUN, pistol()));
        assert!(sim.give_weapon(BOB, BOB_GUN, pistol()));
        sim
    }

    /// Alice taps the trigger every 15 ticks after deploying, reloads at 200.
    fn alice_input(tick: u32) -> InputFrame {
        let mut buttons = Vec::new();
        if tick >= 40 && tick % 15 == 0 {
            buttons.push(Button::PrimaryAttack);
        }
        if tick == 200 {
            buttons.push(Button::Reload);
        }
        InputFrame::aiming(FixedVec3::FORWARD, &buttons).with_ack_tick(tick.saturating_sub(3))
    }

    fn run(sim: &mut Simulation, ticks: u32) -> Vec<CombatEvent> {
        let mut events = Vec::new();
        for _ in 0..ticks {
            let tick = sim.current_tick();
            let mut inputs = BTreeMap::new();
            inputs.insert(ALICE, alice_input(tick));
            events.extend(sim.tick(&inputs).events);
        }
        events
    }

    #[test]
    fn test_tick_determinism() {
        let mut a = duel(SimRole::Authoritative);
        let mut b = duel(SimRole::Authoritative);
        run(&mut a, 120);
        run(&mut b, 120);
        assert_eq!(a.current_tick(), 120);
        assert_eq!(a.compute_hash(), b.compute_hash());
    }

    #[test]
    fn test_authoritative_shots_kill() {
        let mut sim = duel(SimRole::Authoritative);
        let events = run(&mut sim, 120);

        let damage = events
            .iter()
            .filter(|e| matches!(e.data, CombatEventData::Damage(_)))
            .count();
        assert_eq!(damage, 4);
        assert!(!sim.arena().body(BOB).unwrap().alive);
        assert_eq!(sim.lag_history().tracked(), 1);
    }

    #[test]
    fn test_predicted_matches_authoritative_weapons() {
        let mut server = duel(SimRole::Authoritative);
        let mut client = duel(SimRole::Predicted);
        run(&mut server, 260);
        run(&mut client, 260);

        assert_eq!(server.weapon_state_hash(), client.weapon_state_hash());
        // Only the server applied damage
        assert_eq!(client.arena().body(BOB).unwrap().health, 100 * FIXED_ONE);
        assert_ne!(server.compute_hash(), client.compute_hash());
        assert_eq!(client.reconcile(&server.weapon_snapshots()).unwrap(), 0);
    }

    #[test]
    fn test_reconcile_fixes_divergence() {
        let mut server = duel(SimRole::Authoritative);
        let mut client = duel(SimRole::Predicted);
        run(&mut server, 50);
        run(&mut client, 50);

        let weapon = client.combatant_mut(ALICE).unwrap().loadout.weapon_mut(ALICE_GUN).unwrap();
        let mut state = *weapon.state();
        state.ammo_in_clip = 3;
        weapon.set_state(state);
        assert_ne!(server.weapon_state_hash(), client.weapon_state_hash());

        assert_eq!(client.reconcile(&server.weapon_snapshots()).unwrap(), 1);
        assert_eq!(server.weapon_state_hash(), client.weapon_state_hash());
    }

    #[test]
    fn test_replay_matches_live_run() {
        let mut live = duel(SimRole::Authoritative);
        let live_events = run(&mut live, 150);

        let mut recording = InputRecording::new();
        for tick in 0..150 {
            recording.record(tick, alice_input(tick));
        }
        let mut recordings = BTreeMap::new();
        recordings.insert(ALICE, recording);

        let (replayed, events) = replay(duel(SimRole::Authoritative), &recordings, 150);
        assert_eq!(replayed.compute_hash(), live.compute_hash());
        assert_eq!(events.len(), live_events.len());
    }

    #[test]
    fn test_build_input_reaches_active_weapon() {
        let mut sim = duel(SimRole::Predicted);
        run(&mut sim, 46);

        let mut builder = InputBuilder::new(Default::default());
        sim.build_input(ALICE, &mut builder, FIXED_ONE / 60);
        assert!(builder.view.pitch < 0);

        let mut idle = InputBuilder::new(Default::default());
        sim.build_input(BOB, &mut idle, FIXED_ONE / 60);
        assert_eq!(idle.view.pitch, 0);
    }
}
