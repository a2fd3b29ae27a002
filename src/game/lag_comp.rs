//! Lag Compensation
//!
//! The server keeps a short pose history per entity. When a shot is
//! validated, every other entity is moved back to where the shooter saw it
//! (the shooter's acknowledged tick), the shot is traced, and the live
//! poses are put back.
//!
//! Restoring is tied to the scope guard's `Drop`, so an early return or a
//! panic while tracing cannot leave the world rewound.

use std::collections::{BTreeMap, VecDeque};
use std::ops::{Deref, DerefMut};

use tracing::trace;

use crate::game::context::TickContext;
use crate::game::entity::{EntityId, Pose};

/// Read and write entity poses.
pub trait PoseStore {
    /// Entities that take part in lag compensation, in sorted order.
    fn lag_compensated(&self) -> Vec<EntityId>;

    /// Current pose.
    fn pose(&self, id: EntityId) -> Option<Pose>;

    /// Overwrite the current pose.
    fn set_pose(&mut self, id: EntityId, pose: Pose);
}

/// History window configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LagCompensationConfig {
    /// Furthest a shot may rewind (12 ticks = 200 ms at 60 Hz)
    pub max_rewind_ticks: u32,
    /// Samples kept per entity
    pub history_len: usize,
}

impl Default for LagCompensationConfig {
    fn default() -> Self {
        Self {
            max_rewind_ticks: 12,
            history_len: 16,
        }
    }
}

/// Per-entity ring buffers of `(tick, pose)`.
#[derive(Clone, Debug, Default)]
pub struct LagHistory {
    config: LagCompensationConfig,
    tracks: BTreeMap<EntityId, VecDeque<(u32, Pose)>>,
}

impl LagHistory {
    /// Empty history.
    pub fn new(config: LagCompensationConfig) -> Self {
        Self {
            config,
            tracks: BTreeMap::new(),
        }
    }

    /// Window configuration.
    pub fn config(&self) -> &LagCompensationConfig {
        &self.config
    }

    /// Record every lag-compensated entity's pose for `tick`.
    ///
    /// Tracks of entities no longer compensated are dropped.
    pub fn record<W: PoseStore + ?Sized>(&mut self, tick: u32, world: &W) {
        let ids = world.lag_compensated();
        self.tracks.retain(|id, _| ids.contains(id));

        for id in ids {
            let Some(pose) = world.pose(id) else {
                continue;
            };
            let track = self.tracks.entry(id).or_default();
            // Re-recording a tick replaces it and anything after it
            while track.back().is_some_and(|(t, _)| *t >= tick) {
                track.pop_back();
            }
            track.push_back((tick, pose));
            while track.len() > self.config.history_len.max(1) {
                track.pop_front();
            }
        }
    }

    /// Latest recorded pose at or before `tick`.
    pub fn pose_at(&self, id: EntityId, tick: u32) -> Option<Pose> {
        let track = self.tracks.get(&id)?;
        track
            .iter()
            .rev()
            .find(|(t, _)| *t <= tick)
            .map(|(_, pose)| *pose)
    }

    /// Tick a shot at `now` from a client that acknowledged `ack_tick` rewinds to.
    pub fn rewind_target(&self, now: u32, ack_tick: u32) -> u32 {
        let floor = now.saturating_sub(self.config.max_rewind_ticks);
        ack_tick.clamp(floor, now)
    }

    /// Number of tracked entities.
    pub fn tracked(&self) -> usize {
        self.tracks.len()
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.tracks.clear();
    }
}

/// Rewound view of the world for the lifetime of one attack.
///
/// Holds the only mutable borrow of the world while alive and derefs to it.
/// Live poses are restored on drop.
pub struct LagCompensationScope<'w, W: PoseStore + ?Sized> {
    world: &'w mut W,
    saved: Vec<(EntityId, Pose)>,
    target_tick: u32,
}

impl<'w, W: PoseStore + ?Sized> LagCompensationScope<'w, W> {
    /// Rewind every compensated entity except `shooter` to what the shooter saw.
    ///
    /// On a predicted run the scope is empty: the client already sees the
    /// past. Entities with no sample at or before the target stay live.
    pub fn begin(
        ctx: &TickContext,
        world: &'w mut W,
        history: &LagHistory,
        shooter: EntityId,
        ack_tick: u32,
    ) -> Self {
        let now = ctx.tick();
        let target_tick = history.rewind_target(now, ack_tick);
        let mut saved = Vec::new();

        if ctx.is_authoritative() && target_tick < now {
            for id in world.lag_compensated() {
                if id == shooter {
                    continue;
                }
                let (Some(live), Some(past)) = (world.pose(id), history.pose_at(id, target_tick)) else {
                    continue;
                };
                saved.push((id, live));
                world.set_pose(id, past);
            }
            trace!(
                "Rewound {} entities to tick {} (now {})",
                saved.len(),
                target_tick,
                now
            );
        }

        Self {
            world,
            saved,
            target_tick,
        }
    }

    /// Number of entities moved.
    pub fn rewound(&self) -> usize {
        self.saved.len()
    }

    /// Tick the world was rewound to.
    pub fn target_tick(&self) -> u32 {
        self.target_tick
    }
}

impl<W: PoseStore + ?Sized> Deref for LagCompensationScope<'_, W> {
    type Target = W;

    fn deref(&self) -> &W {
        self.world
    }
}

impl<W: PoseStore + ?Sized> DerefMut for LagCompensationScope<'_, W> {
    fn deref_mut(&mut self) -> &mut W {
        self.world
    }
}

impl<W: PoseStore + ?Sized> Drop for LagCompensationScope<'_, W> {
    fn drop(&mut self) {
        for (id, pose) in self.saved.drain(..).rev() {
            self.world.set_pose(id, pose);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::FIXED_ONE;
    use crate::core::vec3::FixedVec3;
    use crate::game::context::SimRole;

    #[derive(Default)]
    struct Poses(BTreeMap<EntityId, Pose>);

    impl PoseStore for Poses {
        fn lag_compensated(&self) -> Vec<EntityId> {
            self.0.keys().copied().collect()
        }
        fn pose(&self, id: EntityId) -> Option<Pose> {
            self.0.get(&id).copied()
        }
        fn set_pose(&mut self, id: EntityId, pose: Pose) {
            self.0.insert(id, pose);
        }
    }

    const SHOOTER: EntityId = EntityId::new([1; 16]);
    const TARGET: EntityId = EntityId::new([2; 16]);

    fn at_x(x: i32) -> Pose {
        Pose::at(FixedVec3::from_ints(x, 0, 0))
    }

    /// Target walks one meter per tick for ticks 0..=20.
    fn walking_world() -> (Poses, LagHistory) {
        let mut world = Poses::default();
        let mut history = LagHistory::new(LagCompensationConfig::default());
        for tick in 0..=20 {
            world.set_pose(SHOOTER, at_x(0));
            world.set_pose(TARGET, at_x(tick as i32));
            history.record(tick, &world);
        }
        (world, history)
    }

    #[test]
    fn test_history_is_bounded() {
        let (_, history) = walking_world();
        // Oldest samples fell out of the 16-entry ring
        assert_eq!(history.pose_at(TARGET, 4), None);
        assert_eq!(history.pose_at(TARGET, 5), Some(at_x(5)));
        assert_eq!(history.tracked(), 2);
    }

    #[test]
    fn test_rewind_target_clamped() {
        let history = LagHistory::new(LagCompensationConfig::default());
        assert_eq!(history.rewind_target(100, 95), 95);
        assert_eq!(history.rewind_target(100, 10), 88);
        // Acks from the future are treated as "now"
        assert_eq!(history.rewind_target(100, 150), 100);
    }

    #[test]
    fn test_scope_rewinds_and_restores() {
        let (mut world, history) = walking_world();
        let ctx = TickContext::new(20, SimRole::Authoritative);
        {
            let scope = LagCompensationScope::begin(&ctx, &mut world, &history, SHOOTER, 15);
            assert_eq!(scope.rewound(), 1);
            assert_eq!(scope.target_tick(), 15);
            assert_eq!(scope.pose(TARGET), Some(at_x(15)));
            // The shooter is never moved
            assert_eq!(scope.pose(SHOOTER), Some(at_x(0)));
        }
        assert_eq!(world.pose(TARGET), Some(at_x(20)));
    }

    #[test]
    fn test_scope_restores_on_early_return() {
        fn shoot(ctx: &TickContext, world: &mut Poses, history: &LagHistory) -> Option<Pose> {
            let scope = LagCompensationScope::begin(ctx, world, history, SHOOTER, 10);
            let seen = scope.pose(TARGET)?;
            if seen.position.x < 100 * FIXED_ONE {
                return None;
            }
            Some(seen)
        }

        let (mut world, history) = walking_world();
        let ctx = TickContext::new(20, SimRole::Authoritative);
        assert_eq!(shoot(&ctx, &mut world, &history), None);
        assert_eq!(world.pose(TARGET), Some(at_x(20)));
    }

    #[test]
    fn test_predicted_scope_is_empty() {
        let (mut world, history) = walking_world();
        let ctx = TickContext::new(20, SimRole::Predicted);
        let scope = LagCompensationScope::begin(&ctx, &mut world, &history, SHOOTER, 10);
        assert_eq!(scope.rewound(), 0);
        assert_eq!(scope.pose(TARGET), Some(at_x(20)));
    }

    #[test]
    fn test_entity_without_history_stays_live() {
        let (mut world, history) = walking_world();
        let late = EntityId::new([3; 16]);
        world.set_pose(late, at_x(50));

        let ctx = TickContext::new(20, SimRole::Authoritative);
        let scope = LagCompensationScope::begin(&ctx, &mut world, &history, SHOOTER, 12);
        assert_eq!(scope.pose(late), Some(at_x(50)));
        assert_eq!(scope.rewound(), 1);
    }
}
