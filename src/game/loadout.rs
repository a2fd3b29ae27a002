//! Loadout
//!
//! The weapons a player carries: which one is active, which one was active
//! before it (the menu button swaps back), deploy gating, and dropping.

use std::collections::BTreeMap;

use tracing::debug;

use crate::core::fixed::Fixed;
use crate::core::hash::StateHasher;
use crate::game::ammo::AmmoPool;
use crate::game::context::TickContext;
use crate::game::entity::EntityId;
use crate::game::events::CombatEventData;
use crate::game::input::{Button, InputBuilder, InputSnapshot};
use crate::game::lag_comp::LagHistory;
use crate::game::weapon::{CombatWorld, NoHooks, Shooter, Weapon, WeaponHooks};

/// Weapons carried by one player.
#[derive(Clone, Debug)]
pub struct Loadout<H = NoHooks> {
    owner: EntityId,
    weapons: BTreeMap<EntityId, Weapon<H>>,
    active: Option<EntityId>,
    last_known: Option<EntityId>,
}

impl<H: WeaponHooks> Loadout<H> {
    /// Empty loadout.
    pub fn new(owner: EntityId) -> Self {
        Self {
            owner,
            weapons: BTreeMap::new(),
            active: None,
            last_known: None,
        }
    }

    /// Carrying player.
    pub fn owner(&self) -> EntityId {
        self.owner
    }

    /// Pick up a weapon. Returns false if it is already carried.
    pub fn add(&mut self, weapon: Weapon<H>) -> bool {
        if self.weapons.contains_key(&weapon.id()) {
            return false;
        }
        self.weapons.insert(weapon.id(), weapon);
        true
    }

    /// Make a carried weapon active. The previous one becomes the last-known weapon.
    pub fn equip(&mut self, tick: u32, id: EntityId) -> bool {
        if self.active == Some(id) {
            return true;
        }
        let Some(weapon) = self.weapons.get_mut(&id) else {
            return false;
        };
        weapon.active_start(tick);
        self.last_known = self.active;
        self.active = Some(id);
        true
    }

    /// Active weapon.
    pub fn active(&self) -> Option<&Weapon<H>> {
        self.active.and_then(|id| self.weapons.get(&id))
    }

    /// Active weapon, mutably.
    pub fn active_mut(&mut self) -> Option<&mut Weapon<H>> {
        let id = self.active?;
        self.weapons.get_mut(&id)
    }

    /// Previously active weapon.
    pub fn last_known(&self) -> Option<EntityId> {
        self.last_known
    }

    /// A carried weapon.
    pub fn weapon(&self, id: EntityId) -> Option<&Weapon<H>> {
        self.weapons.get(&id)
    }

    /// A carried weapon, mutably.
    pub fn weapon_mut(&mut self, id: EntityId) -> Option<&mut Weapon<H>> {
        self.weapons.get_mut(&id)
    }

    /// Carried weapons in id order.
    pub fn weapons(&self) -> impl Iterator<Item = &Weapon<H>> {
        self.weapons.values()
    }

    /// Run one tick: swap, simulate the active weapon once deployed, then drop.
    pub fn simulate<W: CombatWorld + ?Sized>(
        &mut self,
        ctx: &mut TickContext,
        ammo: &mut AmmoPool,
        input: &InputSnapshot,
        world: &mut W,
        lag: &LagHistory,
    ) {
        if input.pressed(Button::Menu) && self.active.is_some() {
            if let Some(previous) = self.last_known.filter(|id| self.weapons.contains_key(id)) {
                self.equip(ctx.tick(), previous);
                ctx.emit(CombatEventData::WeaponSwapped { owner: self.owner, weapon: previous });
            }
        }

        let Some(active) = self.active else {
            return;
        };

        if let Some(weapon) = self.weapons.get_mut(&active) {
            if weapon.is_deployed(ctx) {
                let shooter = Shooter { id: self.owner, ammo };
                weapon.simulate(ctx, shooter, input, world, lag);
            }
        }

        if ctx.is_authoritative() && input.pressed(Button::Drop) && !input.down(Button::Run) {
            self.drop_active(ctx, active);
        }
    }

    /// Let the active weapon shape the outgoing input.
    pub fn build_input(&mut self, builder: &mut InputBuilder, dt: Fixed) {
        if builder.stop_processing {
            return;
        }
        if let Some(weapon) = self.active_mut() {
            weapon.build_input(builder, dt);
        }
    }

    /// Fold carried weapon state into a hasher.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u32(self.weapons.len() as u32);
        for (id, weapon) in &self.weapons {
            hasher.update_uuid(id.as_bytes());
            weapon.state().hash_into(hasher);
        }
        hasher.update_bool(self.active.is_some());
        if let Some(active) = self.active {
            hasher.update_uuid(active.as_bytes());
        }
    }

    fn drop_active(&mut self, ctx: &mut TickContext, id: EntityId) {
        self.weapons.remove(&id);
        self.active = None;
        if self.last_known == Some(id) {
            self.last_known = None;
        }
        debug!("{} dropped {}", self.owner.short(), id.short());
        ctx.emit(CombatEventData::WeaponDropped { owner: self.owner, weapon: id });
    }
}
