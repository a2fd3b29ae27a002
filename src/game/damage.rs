//! Damage Model
//!
//! Distance falloff and the damage record handed to the victim.

use serde::{Serialize, Deserialize};

use crate::core::fixed::{Fixed, DAMAGE_FORCE_SCALE, fixed_mul, fixed_mul_div};
use crate::core::vec3::FixedVec3;
use crate::game::entity::EntityId;
use crate::game::trace::{SurfaceTags, TraceResult};

/// Entities that can be looked up and damaged.
pub trait EntityDirectory {
    /// Entity exists and can take damage.
    fn is_valid(&self, id: EntityId) -> bool;

    /// Current (possibly rewound) position.
    fn position(&self, id: EntityId) -> Option<FixedVec3>;

    /// Apply a damage event to an entity.
    fn take_damage(&mut self, id: EntityId, event: &DamageEvent);
}

/// Damage after distance falloff.
///
/// - `falloff_end <= 0`: no falloff, `base` at any distance.
/// - `falloff_start <= 0`: linear from `base` at 0 to 0 at `falloff_end`.
/// - otherwise: `base` below `falloff_start`, linear down to 0 at
///   `falloff_end`, 0 beyond.
///
/// Never negative when falloff applies. Non-increasing in `distance`.
pub fn resolve_damage(base: Fixed, distance: Fixed, falloff_start: Fixed, falloff_end: Fixed) -> Fixed {
    if falloff_end <= 0 {
        return base;
    }

    if falloff_start > 0 {
        if distance < falloff_start {
            return base;
        }
        if distance >= falloff_end {
            return 0;
        }
        let range = falloff_end - falloff_start;
        let into = distance - falloff_start;
        return (base - fixed_mul_div(base, into, range)).max(0);
    }

    if distance >= falloff_end {
        return 0;
    }
    (base - fixed_mul_div(base, distance.max(0), falloff_end)).max(0)
}

/// Damage dealt by one bullet to one entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageEvent {
    /// Entity that fired
    pub attacker: EntityId,
    /// Weapon that fired
    pub weapon: EntityId,
    /// Entity hit
    pub victim: EntityId,
    /// Falloff-adjusted damage
    pub amount: Fixed,
    /// Impulse applied to the victim
    pub force: FixedVec3,
    /// Impact point
    pub position: FixedVec3,
    /// Trace distance used for falloff
    pub trace_distance: Fixed,
    /// Surface hit
    pub surface: SurfaceTags,
    /// Attacker to victim distance in meters
    pub distance_to_attacker: Fixed,
}

impl DamageEvent {
    /// Build from a bullet trace.
    ///
    /// The force is `direction * 100 * force_scale`. Returns `None` when
    /// the trace did not hit an entity.
    pub fn from_bullet(
        trace: &TraceResult,
        attacker: EntityId,
        weapon: EntityId,
        amount: Fixed,
        force_scale: Fixed,
    ) -> Option<Self> {
        let victim = trace.entity?;
        Some(Self {
            attacker,
            weapon,
            victim,
            amount,
            force: trace.direction.scale(fixed_mul(DAMAGE_FORCE_SCALE, force_scale)),
            position: trace.hit_position,
            trace_distance: trace.distance,
            surface: trace.surface,
            distance_to_attacker: 0,
        })
    }

    /// Record the attacker-to-victim distance.
    pub fn with_distance_to_attacker(mut self, distance: Fixed) -> Self {
        self.distance_to_attacker = distance;
        self
    }
}

// =============================================================================
// TESTS
// =============================================================================
