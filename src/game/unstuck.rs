//! Unstuck Resolver
//!
//! Once per movement tick the player hull is tested at its current
//! position. If it overlaps solid geometry the server tries a handful of
//! nearby spots: first a small nudge straight up (moving platforms), then
//! random points on a sphere whose radius grows with every tick the entity
//! stays stuck. Clients never move themselves; they wait for the server's
//! correction.

use serde::{Serialize, Deserialize};
use tracing::debug;
#[cfg(feature = "debug-tracing")]
use tracing::trace;

use crate::core::fixed::{Fixed, UNSTUCK_RADIUS_PER_TRY, UNSTUCK_UP_NUDGE};
use crate::core::rng::{DeterministicRng, RngStream};
use crate::core::vec3::FixedVec3;
use crate::game::context::TickContext;
use crate::game::entity::EntityId;
use crate::game::events::CombatEventData;
use crate::game::trace::SurfaceTags;

/// Candidate positions tested per tick.
pub const ATTEMPTS_PER_TICK: u32 = 20;

/// Axis-aligned hull relative to the entity's feet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hull {
    /// Lower corner offset
    pub mins: FixedVec3,
    /// Upper corner offset
    pub maxs: FixedVec3,
}

impl Hull {
    /// Standing player: 0.8 m x 0.8 m x 1.83 m.
    pub const PLAYER: Self = Self {
        mins: FixedVec3::new(-26214, -26214, 0),
        maxs: FixedVec3::new(26214, 26214, 119931),
    };

    /// World-space bounds at a position.
    #[inline]
    pub fn bounds_at(&self, position: FixedVec3) -> (FixedVec3, FixedVec3) {
        (position + self.mins, position + self.maxs)
    }
}

/// What a hull is stuck in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blocker {
    /// Human-readable name of the geometry
    pub label: String,
    /// Surface tags of the geometry
    pub tags: SurfaceTags,
}

/// Hull overlap tests.
pub trait HullQuery {
    /// Geometry the hull overlaps at `position`, if any. Touching is not overlapping.
    fn hull_blocker(&self, position: FixedVec3, hull: &Hull) -> Option<Blocker>;
}

/// Result of one unstuck pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnstuckOutcome {
    /// Hull is free where it stands
    NotStuck,
    /// Hull was moved to a free spot
    Resolved {
        /// Stuck position
        from: FixedVec3,
        /// Free position
        to: FixedVec3,
    },
    /// Still stuck (or predicted, waiting for the server)
    StillStuck,
}

impl UnstuckOutcome {
    /// The entity is still inside geometry.
    pub fn is_stuck(&self) -> bool {
        matches!(self, UnstuckOutcome::StillStuck)
    }
}

/// Per-entity unstuck session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unstuck {
    stuck_tries: u32,
}

impl Unstuck {
    /// Fresh session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consecutive ticks spent stuck.
    pub fn stuck_tries(&self) -> u32 {
        self.stuck_tries
    }

    /// Test the hull at `position` and try to fix it.
    ///
    /// On the authoritative run a free candidate is written to `position`.
    /// A predicted run never moves the entity.
    pub fn test_and_fix<W: HullQuery + ?Sized>(
        &mut self,
        ctx: &mut TickContext,
        entity: EntityId,
        position: &mut FixedVec3,
        hull: &Hull,
        world: &W,
    ) -> UnstuckOutcome {
        let Some(_blocker) = world.hull_blocker(*position, hull) else {
            self.stuck_tries = 0;
            return UnstuckOutcome::NotStuck;
        };

        #[cfg(feature = "debug-tracing")]
        trace!("[{} stuck in {}] at {}", entity.short(), _blocker.label, position);

        if !ctx.is_authoritative() {
            return UnstuckOutcome::StillStuck;
        }

        let origin = *position;
        let radius: Fixed = (self.stuck_tries as i64 * UNSTUCK_RADIUS_PER_TRY as i64)
            .min(i32::MAX as i64) as Fixed;
        let mut rng = DeterministicRng::for_tick_stream(ctx.tick(), RngStream::Unstuck, entity.rng_salt());

        for attempt in 0..ATTEMPTS_PER_TICK {
            let candidate = if attempt == 0 {
                origin + FixedVec3::UP.scale(UNSTUCK_UP_NUDGE)
            } else {
                origin + rng.random_unit_vector().scale(radius)
            };

            if world.hull_blocker(candidate, hull).is_none() {
                debug!(
                    "Unstuck {} after {} tries ({} tests)",
                    entity.short(),
                    self.stuck_tries,
                    self.stuck_tries * ATTEMPTS_PER_TICK
                );
                ctx.emit(CombatEventData::Unstuck {
                    entity,
                    from: origin,
                    to: candidate,
                    tries: self.stuck_tries,
                });
                *position = candidate;
                return UnstuckOutcome::Resolved { from: origin, to: candidate };
            }

            #[cfg(feature = "debug-tracing")]
            trace!("Unstuck candidate {} for {} blocked", candidate, entity.short());
        }

        self.stuck_tries = self.stuck_tries.saturating_add(1);
        UnstuckOutcome::StillStuck
    }
}

// =============================================================================
// TESTS
// =============================================================================
