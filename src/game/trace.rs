//! Ballistic Tracing
//!
//! Bullets are swept spheres cast through the world. The world itself is
//! behind the [`WorldQuery`] trait; this module decides what a bullet is
//! allowed to hit and packages the result as a one-shot sequence.

use std::ops::BitOr;
use serde::{Serialize, Deserialize};

use crate::core::fixed::Fixed;
use crate::core::vec3::FixedVec3;
use crate::game::entity::EntityId;

// =============================================================================
// SURFACE TAGS
// =============================================================================

/// Set of surface tags a trace can match.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceTags(u8);

impl SurfaceTags {
    /// No tags
    pub const NONE: Self = Self(0);
    /// World geometry
    pub const SOLID: Self = Self(0x01);
    /// Player hitboxes
    pub const PLAYER: Self = Self(0x02);
    /// Breakable glass
    pub const GLASS: Self = Self(0x04);
    /// Props and buttons
    pub const INTERACTABLE: Self = Self(0x08);
    /// Water volumes
    pub const WATER: Self = Self(0x10);

    /// Everything a bullet can hit regardless of where it starts.
    pub const BULLET: Self = Self(0x01 | 0x02 | 0x04 | 0x08);

    /// Tags that block a player hull.
    pub const HULL_BLOCKING: Self = Self(0x01 | 0x04 | 0x08);

    /// Raw bits.
    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Every tag in `other` is set.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// At least one tag is shared.
    #[inline]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Union of two sets.
    #[inline]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl BitOr for SurfaceTags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        self.with(rhs)
    }
}

// =============================================================================
// QUERIES
// =============================================================================

/// A swept-sphere query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VolumeCast {
    /// Start point
    pub origin: FixedVec3,
    /// Unit direction
    pub direction: FixedVec3,
    /// Maximum travel
    pub max_distance: Fixed,
    /// Sphere radius (0 = ray)
    pub radius: Fixed,
    /// Surfaces that stop the cast
    pub tags: SurfaceTags,
    /// Entity whose hitboxes are skipped
    pub ignore: Option<EntityId>,
}

impl VolumeCast {
    /// Requested end point.
    #[inline]
    pub fn end(&self) -> FixedVec3 {
        self.origin + self.direction.scale(self.max_distance)
    }
}

/// One intersection along a cast.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceResult {
    /// Cast origin
    pub start: FixedVec3,
    /// Requested end point
    pub end: FixedVec3,
    /// Where the sphere centre stopped
    pub hit_position: FixedVec3,
    /// Surface normal at the hit
    pub normal: FixedVec3,
    /// Tags of the surface hit
    pub surface: SurfaceTags,
    /// Entity hit, if any. Not owned: may be gone by the time it is used.
    pub entity: Option<EntityId>,
    /// Distance travelled to the hit
    pub distance: Fixed,
    /// Unit cast direction
    pub direction: FixedVec3,
    /// `distance / max_distance`
    pub fraction: Fixed,
    /// Cast began inside the surface
    pub started_solid: bool,
    /// Material travelled through before this hit (always 0, no penetration)
    pub penetration: Fixed,
}

/// World geometry and hitboxes, as seen by bullets.
pub trait WorldQuery {
    /// Nearest intersection of a swept sphere, if any.
    fn cast_volume(&self, cast: &VolumeCast) -> Option<TraceResult>;

    /// Whether a point lies inside any volume carrying one of `tags`.
    fn test_point(&self, point: FixedVec3, tags: SurfaceTags) -> bool;
}

// =============================================================================
// BULLET TRACE
// =============================================================================

/// Hits produced by one bullet trace, nearest first.
///
/// Consumed once: it is not `Clone` and cannot be restarted.
#[must_use = "trace hits are lazy results and do nothing unless consumed"]
#[derive(Debug)]
pub struct TraceHits {
    inner: std::vec::IntoIter<TraceResult>,
}

impl TraceHits {
    fn from_hits(hits: Vec<TraceResult>) -> Self {
        Self { inner: hits.into_iter() }
    }
}

impl Iterator for TraceHits {
    type Item = TraceResult;

    fn next(&mut self) -> Option<TraceResult> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for TraceHits {}

/// Trace a bullet from `origin` along `direction`.
///
/// Matches solid, player, glass and interactable surfaces, plus water when
/// the origin is not already under water. Hitboxes of `shooter` are
/// skipped. Yields at most one result: the first hit.
pub fn trace_bullet<W: WorldQuery + ?Sized>(
    world: &W,
    shooter: EntityId,
    origin: FixedVec3,
    direction: FixedVec3,
    max_distance: Fixed,
    radius: Fixed,
) -> TraceHits {
    let under_water = world.test_point(origin, SurfaceTags::WATER);

    let mut tags = SurfaceTags::BULLET;
    if !under_water {
        tags = tags | SurfaceTags::WATER;
    }

    let cast = VolumeCast {
        origin,
        direction,
        max_distance,
        radius,
        tags,
        ignore: Some(shooter),
    };

    let hits = world.cast_volume(&cast).into_iter().collect();
    TraceHits::from_hits(hits)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use crate::core::fixed::{to_fixed, FIXED_ONE};

    /// Records every cast and reports a hit 10 m out when allowed to.
    struct RecordingWorld {
        water_at_origin: bool,
        casts: RefCell<Vec<VolumeCast>>,
    }

    impl WorldQuery for RecordingWorld {
        fn cast_volume(&self, cast: &VolumeCast) -> Option<TraceResult> {
            self.casts.borrow_mut().push(*cast);
            let distance = to_fixed(10.0);
            Some(TraceResult {
                start: cast.origin,
                end: cast.end(),
                hit_position: cast.origin + cast.direction.scale(distance),
                normal: -cast.direction,
                surface: SurfaceTags::SOLID,
                entity: None,
                distance,
                direction: cast.direction,
                fraction: 0,
                started_solid: false,
                penetration: 0,
            })
        }

        fn test_point(&self, _point: FixedVec3, tags: SurfaceTags) -> bool {
            self.water_at_origin && tags.contains(SurfaceTags::WATER)
        }
    }

    fn world(water_at_origin: bool) -> RecordingWorld {
        RecordingWorld {
            water_at_origin,
            casts: RefCell::new(Vec::new()),
        }
    }

    #[test]
    fn test_tags() {
        assert!(SurfaceTags::BULLET.contains(SurfaceTags::PLAYER));
        assert!(!SurfaceTags::BULLET.intersects(SurfaceTags::WATER));
        assert!(SurfaceTags::HULL_BLOCKING.contains(SurfaceTags::SOLID));
        assert!(!SurfaceTags::HULL_BLOCKING.intersects(SurfaceTags::PLAYER));
        assert_eq!((SurfaceTags::SOLID | SurfaceTags::GLASS).bits(), 0x05);
    }

    #[test]
    fn test_water_matched_from_dry_origin() {
        let w = world(false);
        let shooter = EntityId::new([1; 16]);
        let hits: Vec<_> = trace_bullet(&w, shooter, FixedVec3::ZERO, FixedVec3::FORWARD, FIXED_ONE * 100, 0).collect();

        assert_eq!(hits.len(), 1);
        let cast = w.casts.borrow()[0];
        assert!(cast.tags.contains(SurfaceTags::WATER));
        assert!(cast.tags.contains(SurfaceTags::BULLET));
        assert_eq!(cast.ignore, Some(shooter));
    }

    #[test]
    fn test_water_ignored_from_submerged_origin() {
        let w = world(true);
        let _ = trace_bullet(&w, EntityId::default(), FixedVec3::ZERO, FixedVec3::FORWARD, FIXED_ONE, 0).count();
        assert!(!w.casts.borrow()[0].tags.intersects(SurfaceTags::WATER));
    }

    #[test]
    fn test_hits_consumed_once() {
        let w = world(false);
        let mut hits = trace_bullet(&w, EntityId::default(), FixedVec3::ZERO, FixedVec3::FORWARD, FIXED_ONE * 100, 0);
        assert_eq!(hits.len(), 1);
        assert!(hits.next().is_some());
        assert!(hits.next().is_none());
    }
}
