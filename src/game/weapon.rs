//! Weapon State Machine
//!
//! One weapon instance: ammo counters, the reload lifecycle, fire-rate
//! gating and the bullet attack. `simulate` runs once per tick for the
//! active weapon, on both the predicted and the authoritative copy.
//!
//! Rules, highest priority first:
//! 1. Reload when asked (or when an auto-reload weapon runs dry), the clip
//!    is not full and there is ammo to load. Nothing else happens that tick.
//! 2. While not reloading, primary and secondary attacks are gated by
//!    their trigger and their rate. Each attack runs inside a
//!    lag-compensation scope.
//! 3. While reloading, the reload completes once `reload_time` has passed.

use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::core::fixed::{Fixed, MAX_TRACE_DISTANCE, TRACER_MIN_DISTANCE};
use crate::core::hash::StateHasher;
use crate::core::rng::{DeterministicRng, RngStream};
use crate::game::ammo::{AmmoPool, AmmoType};
use crate::game::context::TickContext;
use crate::game::damage::{resolve_damage, DamageEvent, EntityDirectory};
use crate::game::definition::{FireMode, WeaponDefinition};
use crate::game::entity::EntityId;
use crate::game::events::CombatEventData;
use crate::game::input::{Button, InputBuilder, InputSnapshot};
use crate::game::lag_comp::{LagCompensationScope, LagHistory, PoseStore};
use crate::game::recoil::Recoil;
use crate::game::spread::spread_direction;
use crate::game::timer::TimeSince;
use crate::game::trace::{trace_bullet, TraceResult, WorldQuery};

/// Everything an attack needs from the world.
pub trait CombatWorld: WorldQuery + EntityDirectory + PoseStore {}

impl<T: WorldQuery + EntityDirectory + PoseStore + ?Sized> CombatWorld for T {}

// =============================================================================
// STATE
// =============================================================================

/// Replicated weapon state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponState {
    /// Rounds loaded
    pub ammo_in_clip: u32,
    /// Rounds carried by the weapon itself (weapons without an ammo type)
    pub reserve_ammo: u32,
    /// Reload in progress
    pub is_reloading: bool,
    /// Last primary attack
    pub time_since_primary_attack: TimeSince,
    /// Last secondary attack
    pub time_since_secondary_attack: TimeSince,
    /// Last reload start
    pub time_since_reload_start: TimeSince,
    /// Last equip
    pub time_since_deployed: TimeSince,
}

impl WeaponState {
    /// Fold into a state hasher.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u32(self.ammo_in_clip);
        hasher.update_u32(self.reserve_ammo);
        hasher.update_bool(self.is_reloading);
        hasher.update_opt_u32(self.time_since_primary_attack.anchor());
        hasher.update_opt_u32(self.time_since_secondary_attack.anchor());
        hasher.update_opt_u32(self.time_since_reload_start.anchor());
        hasher.update_opt_u32(self.time_since_deployed.anchor());
    }
}

// =============================================================================
// HOOKS
// =============================================================================

/// Per-weapon behaviour on top of the shared state machine.
pub trait WeaponHooks {
    /// Secondary attack. Does nothing unless overridden.
    fn attack_secondary<W: CombatWorld + ?Sized>(
        &mut self,
        _ctx: &mut TickContext,
        _owner: EntityId,
        _state: &mut WeaponState,
        _world: &mut W,
    ) {
    }

    /// A bullet hit a valid entity. Runs on the authoritative side with
    /// prediction off, before damage is applied.
    fn on_hit(&mut self, _ctx: &mut TickContext, _trace: &TraceResult) {}
}

/// Plain gun: no secondary attack, no hit callback.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoHooks;

impl WeaponHooks for NoHooks {}

/// The entity holding a weapon, as the weapon sees it.
#[derive(Debug)]
pub struct Shooter<'a> {
    /// Holder's id
    pub id: EntityId,
    /// Holder's ammunition
    pub ammo: &'a mut AmmoPool,
}

// =============================================================================
// WEAPON
// =============================================================================

/// A weapon instance.
#[derive(Clone, Debug)]
pub struct Weapon<H = NoHooks> {
    id: EntityId,
    definition: WeaponDefinition,
    state: WeaponState,
    recoil: Recoil,
    hooks: H,
}

impl Weapon<NoHooks> {
    /// Spawn a plain weapon.
    pub fn new(id: EntityId, definition: WeaponDefinition) -> Self {
        Self::with_hooks(id, definition, NoHooks)
    }
}

impl<H: WeaponHooks> Weapon<H> {
    /// Spawn with custom hooks. The clip starts full; weapons without an
    /// ammo type carry their reserve themselves.
    pub fn with_hooks(id: EntityId, definition: WeaponDefinition, hooks: H) -> Self {
        let reserve_ammo = if definition.ammo_type == AmmoType::None {
            definition.reserve_ammo
        } else {
            0
        };
        let state = WeaponState {
            ammo_in_clip: definition.clip_size,
            reserve_ammo,
            ..WeaponState::default()
        };
        Self {
            id,
            definition,
            state,
            recoil: Recoil::default(),
            hooks,
        }
    }

    /// Weapon entity id.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Static metadata.
    pub fn definition(&self) -> &WeaponDefinition {
        &self.definition
    }

    /// Replicated state.
    pub fn state(&self) -> &WeaponState {
        &self.state
    }

    /// Overwrite the replicated state (reconciliation).
    pub fn set_state(&mut self, state: WeaponState) {
        self.state = state;
    }

    /// Accumulated recoil.
    pub fn recoil(&self) -> Recoil {
        self.recoil
    }

    /// Weapon-specific hooks.
    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    /// Rounds loaded.
    pub fn ammo_in_clip(&self) -> u32 {
        self.state.ammo_in_clip
    }

    /// Rounds in the weapon's own reserve.
    pub fn reserve_ammo(&self) -> u32 {
        self.state.reserve_ammo
    }

    /// Reload in progress.
    pub fn is_reloading(&self) -> bool {
        self.state.is_reloading
    }

    /// Rounds that could be loaded: own reserve plus the holder's pool.
    pub fn available_ammo(&self, pool: &AmmoPool) -> u32 {
        if self.definition.unlimited_reserve {
            return u32::MAX;
        }
        self.state
            .reserve_ammo
            .saturating_add(pool.count(self.definition.ammo_type))
    }

    /// HUD text: `"{clip} + {reserve}"`.
    pub fn slot_text(&self, pool: &AmmoPool) -> String {
        let reserve = self
            .state
            .reserve_ammo
            .saturating_add(pool.count(self.definition.ammo_type));
        format!("{} + {}", self.state.ammo_in_clip, reserve)
    }

    /// Weapon became active: cancel any reload and start deploying.
    pub fn active_start(&mut self, tick: u32) {
        self.state.is_reloading = false;
        self.state.time_since_reload_start.reset(tick);
        self.state.time_since_deployed.reset(tick);
    }

    /// Deploy time has passed since the last `active_start`.
    pub fn is_deployed(&self, ctx: &TickContext) -> bool {
        ctx.has_elapsed(&self.state.time_since_deployed, self.definition.deploy_time)
    }

    /// Run one tick of the state machine.
    pub fn simulate<W: CombatWorld + ?Sized>(
        &mut self,
        ctx: &mut TickContext,
        shooter: Shooter<'_>,
        input: &InputSnapshot,
        world: &mut W,
        lag: &LagHistory,
    ) {
        if self.can_reload(input, &*shooter.ammo) {
            self.reload(ctx, shooter.id);
            return;
        }

        if !self.state.is_reloading {
            if self.can_primary_attack(ctx, input) {
                let mut scope = LagCompensationScope::begin(ctx, &mut *world, lag, shooter.id, input.ack_tick());
                self.state.time_since_primary_attack.reset(ctx.tick());
                self.attack_primary(ctx, shooter.id, input, &mut *scope);
            }

            if self.can_secondary_attack(ctx, input) {
                let mut scope = LagCompensationScope::begin(ctx, &mut *world, lag, shooter.id, input.ack_tick());
                self.state.time_since_secondary_attack.reset(ctx.tick());
                self.hooks.attack_secondary(ctx, shooter.id, &mut self.state, &mut *scope);
            }
        } else if ctx.has_elapsed(&self.state.time_since_reload_start, self.definition.reload_time) {
            self.finish_reload(ctx, shooter);
        }
    }

    /// Apply recoil to the outgoing view before the input is sampled.
    pub fn build_input(&mut self, builder: &mut InputBuilder, dt: Fixed) {
        self.recoil
            .apply(&mut builder.view, dt, self.definition.recoil_recovery_scale);
    }

    /// Remove up to `wanted` rounds, own reserve first, then the pool.
    pub fn take_ammo(&mut self, pool: &mut AmmoPool, wanted: u32) -> u32 {
        if self.definition.unlimited_reserve {
            return wanted;
        }
        let from_reserve = wanted.min(self.state.reserve_ammo);
        self.state.reserve_ammo -= from_reserve;
        from_reserve + pool.take(self.definition.ammo_type, wanted - from_reserve)
    }

    fn can_reload(&self, input: &InputSnapshot, pool: &AmmoPool) -> bool {
        if self.state.is_reloading {
            return false;
        }

        let asked = input.pressed(Button::Reload)
            || (self.definition.auto_reload && self.state.ammo_in_clip == 0);
        if !asked {
            return false;
        }

        self.state.ammo_in_clip < self.definition.clip_size && self.available_ammo(pool) > 0
    }

    fn reload(&mut self, ctx: &mut TickContext, owner: EntityId) {
        self.state.time_since_reload_start.reset(ctx.tick());
        self.state.is_reloading = true;
        debug!(
            "{} reloading {} ({} in clip)",
            owner.short(),
            self.definition.name,
            self.state.ammo_in_clip
        );
        ctx.emit(CombatEventData::ReloadStarted { shooter: owner, weapon: self.id });
    }

    fn finish_reload(&mut self, ctx: &mut TickContext, shooter: Shooter<'_>) {
        self.state.is_reloading = false;
        let space = self.definition.clip_size.saturating_sub(self.state.ammo_in_clip);
        let loaded = self.take_ammo(shooter.ammo, space);
        self.state.ammo_in_clip += loaded;

        debug!(
            "{} reloaded {} (+{} -> {})",
            shooter.id.short(),
            self.definition.name,
            loaded,
            self.state.ammo_in_clip
        );
        ctx.emit(CombatEventData::ReloadFinished {
            shooter: shooter.id,
            weapon: self.id,
            ammo_in_clip: self.state.ammo_in_clip,
        });
    }

    fn can_primary_attack(&self, ctx: &TickContext, input: &InputSnapshot) -> bool {
        let triggered = match self.definition.fire_mode {
            FireMode::Semi => input.pressed(Button::PrimaryAttack),
            FireMode::Automatic => input.down(Button::PrimaryAttack),
        };
        triggered && rate_allows(ctx, &self.state.time_since_primary_attack, self.definition.primary_interval())
    }

    fn can_secondary_attack(&self, ctx: &TickContext, input: &InputSnapshot) -> bool {
        input.pressed(Button::SecondaryAttack)
            && rate_allows(ctx, &self.state.time_since_secondary_attack, self.definition.secondary_interval())
    }

    fn attack_primary<W: CombatWorld + ?Sized>(
        &mut self,
        ctx: &mut TickContext,
        owner: EntityId,
        input: &InputSnapshot,
        world: &mut W,
    ) {
        if self.state.ammo_in_clip == 0 {
            ctx.emit(CombatEventData::DryFire { shooter: owner, weapon: self.id });
            return;
        }

        self.state.ammo_in_clip -= 1;
        ctx.emit(CombatEventData::Fired { shooter: owner, weapon: self.id });

        let mut rng = DeterministicRng::for_tick_stream(ctx.tick(), RngStream::Recoil, owner.rng_salt());
        self.recoil.kick(
            &mut rng,
            self.definition.horizontal_recoil_range,
            self.definition.vertical_recoil,
        );

        self.shoot_bullets(ctx, owner, input, world);
    }

    fn shoot_bullets<W: CombatWorld + ?Sized>(
        &mut self,
        ctx: &mut TickContext,
        owner: EntityId,
        input: &InputSnapshot,
        world: &mut W,
    ) {
        let definition = &self.definition;
        let hooks = &mut self.hooks;
        let origin = input.eye_position();

        // Reseeded per shot so both copies draw the same cone
        let mut rng = DeterministicRng::for_tick(ctx.tick());

        for _ in 0..definition.bullets_per_fire {
            let direction = spread_direction(&mut rng, input.aim_forward(), definition.spread);
            let hits = trace_bullet(&*world, owner, origin, direction, MAX_TRACE_DISTANCE, definition.bullet_radius);

            for trace in hits {
                ctx.emit(CombatEventData::BulletImpact {
                    position: trace.hit_position,
                    normal: trace.normal,
                    surface: trace.surface,
                    entity: trace.entity,
                });
                if definition.tracer && trace.distance > TRACER_MIN_DISTANCE {
                    ctx.emit(CombatEventData::Tracer { start: trace.start, end: trace.hit_position });
                }

                if !ctx.is_authoritative() {
                    continue;
                }
                let Some(victim) = trace.entity.filter(|id| world.is_valid(*id)) else {
                    continue;
                };

                let mut unpredicted = ctx.prediction_off();
                hooks.on_hit(&mut unpredicted, &trace);

                if definition.damage <= 0 {
                    continue;
                }

                let amount = resolve_damage(
                    definition.damage,
                    trace.distance,
                    definition.damage_falloff_start,
                    definition.damage_falloff_end,
                );
                let Some(event) = DamageEvent::from_bullet(&trace, owner, self.id, amount, definition.force) else {
                    continue;
                };
                let distance = match (world.position(owner), world.position(victim)) {
                    (Some(a), Some(b)) => a.distance(b),
                    _ => 0,
                };
                let event = event.with_distance_to_attacker(distance);

                debug!(
                    "{} hit {} with {} for {} at {}",
                    owner.short(),
                    victim.short(),
                    definition.name,
                    amount,
                    trace.distance
                );
                world.take_damage(victim, &event);
                unpredicted.emit(CombatEventData::Damage(event));
            }
        }
    }
}

/// No interval, or strictly more than one interval since the last attack.
fn rate_allows(ctx: &TickContext, last: &TimeSince, interval: Option<Fixed>) -> bool {
    match interval {
        None => true,
        Some(interval) => ctx.has_elapsed(last, interval),
    }
}

// =============================================================================
// TESTS
// =============================================================================
