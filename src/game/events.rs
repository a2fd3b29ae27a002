//! Combat Events
//!
//! Everything the core wants the outside world to see (effects, sounds,
//! damage) leaves through an ordered event queue. Delivery is someone
//! else's problem: the simulation never waits on it.

use serde::{Serialize, Deserialize};
use crate::core::vec3::FixedVec3;
use crate::game::damage::DamageEvent;
use crate::game::entity::EntityId;
use crate::game::trace::SurfaceTags;

/// Priority for event processing order.
///
/// Lower value = processed first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventPriority {
    /// Damage applied to entities
    Damage = 0,
    /// Weapon and movement state changes
    State = 1,
    /// Cosmetic effects (particles, sounds, animations)
    Effect = 2,
}

/// Event payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatEventData {
    /// A round was fired: attack animation, muzzle flash and fire sound.
    Fired {
        shooter: EntityId,
        weapon: EntityId,
    },

    /// Trigger pulled on an empty clip: dry-fire animation and sound.
    DryFire {
        shooter: EntityId,
        weapon: EntityId,
    },

    /// Reload animation started.
    ReloadStarted {
        shooter: EntityId,
        weapon: EntityId,
    },

    /// Reload completed and the clip was refilled.
    ReloadFinished {
        shooter: EntityId,
        weapon: EntityId,
        ammo_in_clip: u32,
    },

    /// Bullet impact decal and particles.
    BulletImpact {
        position: FixedVec3,
        normal: FixedVec3,
        surface: SurfaceTags,
        entity: Option<EntityId>,
    },

    /// Tracer particle between two points.
    Tracer {
        start: FixedVec3,
        end: FixedVec3,
    },

    /// Damage applied to an entity.
    Damage(DamageEvent),

    /// Active weapon swapped with the last-known one.
    WeaponSwapped {
        owner: EntityId,
        weapon: EntityId,
    },

    /// Active weapon dropped.
    WeaponDropped {
        owner: EntityId,
        weapon: EntityId,
    },

    /// Entity moved out of solid geometry.
    Unstuck {
        entity: EntityId,
        from: FixedVec3,
        to: FixedVec3,
        tries: u32,
    },
}

impl CombatEventData {
    /// Default priority for this payload.
    pub fn priority(&self) -> EventPriority {
        match self {
            CombatEventData::Damage(_) => EventPriority::Damage,
            CombatEventData::ReloadStarted { .. }
            | CombatEventData::ReloadFinished { .. }
            | CombatEventData::WeaponSwapped { .. }
            | CombatEventData::WeaponDropped { .. }
            | CombatEventData::Unstuck { .. } => EventPriority::State,
            CombatEventData::Fired { .. }
            | CombatEventData::DryFire { .. }
            | CombatEventData::BulletImpact { .. }
            | CombatEventData::Tracer { .. } => EventPriority::Effect,
        }
    }

    /// Entity the event is about, for tie-breaking.
    pub fn entity(&self) -> Option<EntityId> {
        match self {
            CombatEventData::Fired { shooter, .. }
            | CombatEventData::DryFire { shooter, .. }
            | CombatEventData::ReloadStarted { shooter, .. }
            | CombatEventData::ReloadFinished { shooter, .. } => Some(*shooter),
            CombatEventData::BulletImpact { entity, .. } => *entity,
            CombatEventData::Tracer { .. } => None,
            CombatEventData::Damage(event) => Some(event.victim),
            CombatEventData::WeaponSwapped { owner, .. }
            | CombatEventData::WeaponDropped { owner, .. } => Some(*owner),
            CombatEventData::Unstuck { entity, .. } => Some(*entity),
        }
    }
}

/// A combat event with timing and priority.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CombatEvent {
    /// Tick when event occurred
    pub tick: u32,

    /// Processing priority
    pub priority: EventPriority,

    /// Entity involved (for tie-breaking)
    pub entity: Option<EntityId>,

    /// Emitted while prediction was on. Clients that already predicted it
    /// should not play it again when the authoritative copy arrives.
    pub predictable: bool,

    /// Emission order within the tick
    pub sequence: u32,

    /// Event data
    pub data: CombatEventData,
}

impl CombatEvent {
    /// Create a new event.
    pub fn new(tick: u32, data: CombatEventData, predictable: bool) -> Self {
        Self {
            tick,
            priority: data.priority(),
            entity: data.entity(),
            predictable,
            sequence: 0,
            data,
        }
    }

    /// Purely cosmetic (safe to drop).
    pub fn is_cosmetic(&self) -> bool {
        self.priority == EventPriority::Effect
    }
}

impl PartialEq for CombatEvent {
    fn eq(&self, other: &Self) -> bool {
        self.tick == other.tick
            && self.priority == other.priority
            && self.entity == other.entity
            && self.sequence == other.sequence
    }
}

impl Eq for CombatEvent {}

impl PartialOrd for CombatEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CombatEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Sort by: tick, then priority, then entity, then emission order
        self.tick
            .cmp(&other.tick)
            .then(self.priority.cmp(&other.priority))
            .then(self.entity.cmp(&other.entity))
            .then(self.sequence.cmp(&other.sequence))
    }
}

/// Outbound event queue.
#[derive(Clone, Debug, Default)]
pub struct EventQueue {
    events: Vec<CombatEvent>,
    next_sequence: u32,
}

impl EventQueue {
    /// Empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, stamping its emission order.
    pub fn push(&mut self, mut event: CombatEvent) {
        event.sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        self.events.push(event);
    }

    /// Pending events in emission order.
    pub fn iter(&self) -> impl Iterator<Item = &CombatEvent> {
        self.events.iter()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// No pending events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Take pending events in processing order (consumes them).
    pub fn take(&mut self) -> Vec<CombatEvent> {
        let mut events = std::mem::take(&mut self.events);
        events.sort();
        self.next_sequence = 0;
        events
    }
}
