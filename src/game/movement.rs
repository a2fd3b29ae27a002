//! Walk controller.
//!
//! Movement itself is driven elsewhere; this component owns the player hull
//! and the unstuck session and runs the overlap check once per tick.

use crate::game::context::TickContext;
use crate::game::entity::{EntityId, Pose};
use crate::game::lag_comp::PoseStore;
use crate::game::unstuck::{Hull, HullQuery, Unstuck, UnstuckOutcome};

/// Per-entity movement component.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WalkController {
    hull: Hull,
    unstuck: Unstuck,
}

impl Default for WalkController {
    fn default() -> Self {
        Self::new(Hull::PLAYER)
    }
}

impl WalkController {
    /// Controller for a hull.
    pub fn new(hull: Hull) -> Self {
        Self {
            hull,
            unstuck: Unstuck::new(),
        }
    }

    /// Collision hull.
    pub fn hull(&self) -> &Hull {
        &self.hull
    }

    /// Unstuck session.
    pub fn unstuck(&self) -> &Unstuck {
        &self.unstuck
    }

    /// Run the unstuck check for `entity`, committing a corrected pose.
    ///
    /// Entities the world does not know are left alone.
    pub fn simulate<W: HullQuery + PoseStore + ?Sized>(
        &mut self,
        ctx: &mut TickContext,
        entity: EntityId,
        world: &mut W,
    ) -> UnstuckOutcome {
        let Some(pose) = world.pose(entity) else {
            return UnstuckOutcome::NotStuck;
        };

        let mut position = pose.position;
        let outcome = self
            .unstuck
            .test_and_fix(ctx, entity, &mut position, &self.hull, &*world);

        if let UnstuckOutcome::Resolved { .. } = outcome {
            world.set_pose(entity, Pose::at(position));
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::FIXED_ONE;
    use crate::core::vec3::FixedVec3;
    use crate::game::arena::Arena;
    use crate::game::context::SimRole;
    use crate::game::events::CombatEventData;

    const PLAYER: EntityId = EntityId::new([4; 16]);

    #[test]
    fn test_commits_resolved_pose() {
        let mut arena = Arena::with_floor(20);
        let sunk = FixedVec3::new(0, 0, -FIXED_ONE / 10);
        arena.spawn_body(PLAYER, sunk);

        let mut walk = WalkController::default();
        let mut ctx = TickContext::new(3, SimRole::Authoritative);
        let outcome = walk.simulate(&mut ctx, PLAYER, &mut arena);

        assert!(matches!(outcome, UnstuckOutcome::Resolved { .. }));
        let pos = arena.pose(PLAYER).unwrap().position;
        assert!(pos.z > sunk.z);
        assert!(arena.hull_blocker(pos, walk.hull()).is_none());

        let events = ctx.take_events();
        assert!(matches!(events[0].data, CombatEventData::Unstuck { entity: PLAYER, .. }));
    }

    #[test]
    fn test_predicted_leaves_pose() {
        let mut arena = Arena::with_floor(20);
        let sunk = FixedVec3::new(0, 0, -FIXED_ONE / 10);
        arena.spawn_body(PLAYER, sunk);

        let mut walk = WalkController::default();
        let mut ctx = TickContext::new(3, SimRole::Predicted);
        assert!(walk.simulate(&mut ctx, PLAYER, &mut arena).is_stuck());
        assert_eq!(arena.pose(PLAYER).unwrap().position, sunk);
    }

    #[test]
    fn test_unknown_entity() {
        let mut arena = Arena::with_floor(20);
        let mut walk = WalkController::default();
        let mut ctx = TickContext::new(0, SimRole::Authoritative);
        assert_eq!(walk.simulate(&mut ctx, PLAYER, &mut arena), UnstuckOutcome::NotStuck);
        assert_eq!(walk.unstuck().stuck_tries(), 0);
    }
}
