//! Reference Arena
//!
//! A small deterministic world: axis-aligned brushes for geometry and
//! sphere hitboxes for bodies. It implements every world seam the weapon,
//! lag compensation and unstuck code need, and backs the simulation, the
//! server binary and the tests.
//!
//! All casts run in integer math. Box hits use the slab method with the box
//! grown by the cast radius; hitbox hits solve the ray/sphere quadratic in
//! Q32.32. Ties between equally distant candidates go to the one tested
//! first (brushes in insertion order, then bodies in id order).

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::core::fixed::{Fixed, FIXED_ONE, FIXED_SCALE, fixed_div, narrow, wide_mul, wide_sqrt};
use crate::core::hash::{compute_state_hash, StateHash, StateHasher};
use crate::core::vec3::FixedVec3;
use crate::game::damage::{DamageEvent, EntityDirectory};
use crate::game::entity::{EntityId, Pose};
use crate::game::lag_comp::PoseStore;
use crate::game::trace::{SurfaceTags, TraceResult, VolumeCast, WorldQuery};
use crate::game::unstuck::{Blocker, Hull, HullQuery};

/// Eye height above the feet (1.64 m).
pub const EYE_HEIGHT: Fixed = 107479;

/// Starting health.
pub const DEFAULT_HEALTH: Fixed = 100 * FIXED_ONE;

// =============================================================================
// GEOMETRY
// =============================================================================

/// Axis-aligned box of world geometry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Brush {
    /// Name used in logs
    pub label: String,
    /// Lower corner
    pub min: FixedVec3,
    /// Upper corner
    pub max: FixedVec3,
    /// Surface tags
    pub tags: SurfaceTags,
}

impl Brush {
    /// Create a brush. Corners are sorted per axis.
    pub fn new(label: impl Into<String>, a: FixedVec3, b: FixedVec3, tags: SurfaceTags) -> Self {
        Self {
            label: label.into(),
            min: FixedVec3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: FixedVec3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
            tags,
        }
    }

    /// Point inside or on the boundary.
    pub fn contains(&self, p: FixedVec3) -> bool {
        (0..3).all(|i| p.axis(i) >= self.min.axis(i) && p.axis(i) <= self.max.axis(i))
    }

    /// Strict overlap with another box; shared faces do not count.
    pub fn overlaps(&self, min: FixedVec3, max: FixedVec3) -> bool {
        (0..3).all(|i| min.axis(i) < self.max.axis(i) && max.axis(i) > self.min.axis(i))
    }
}

/// Sphere hitbox relative to a body's feet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hitbox {
    /// Centre offset from the feet
    pub offset: FixedVec3,
    /// Sphere radius
    pub radius: Fixed,
}

/// Torso (1.0 m up, 0.45 m) and head (1.6 m up, 0.2 m).
pub const DEFAULT_HITBOXES: [Hitbox; 2] = [
    Hitbox { offset: FixedVec3::new(0, 0, FIXED_ONE), radius: 29491 },
    Hitbox { offset: FixedVec3::new(0, 0, 104857), radius: 13107 },
];

/// A damageable entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Body {
    /// Entity id
    pub id: EntityId,
    /// Feet position
    pub position: FixedVec3,
    /// Remaining health
    pub health: Fixed,
    /// False once health reaches zero
    pub alive: bool,
    /// Attacker distance of the last damage taken
    pub distance_to_attacker: Fixed,
    /// Who dealt the last damage
    pub last_attacker: Option<EntityId>,
    /// Hit volumes
    pub hitboxes: Vec<Hitbox>,
}

impl Body {
    fn new(id: EntityId, position: FixedVec3) -> Self {
        Self {
            id,
            position,
            health: DEFAULT_HEALTH,
            alive: true,
            distance_to_attacker: 0,
            last_attacker: None,
            hitboxes: DEFAULT_HITBOXES.to_vec(),
        }
    }

    /// Eye position.
    pub fn eye(&self) -> FixedVec3 {
        self.position + FixedVec3::new(0, 0, EYE_HEIGHT)
    }
}

// =============================================================================
// ARENA
// =============================================================================

/// Brushes plus bodies.
#[derive(Clone, Debug, Default)]
pub struct Arena {
    brushes: Vec<Brush>,
    bodies: BTreeMap<EntityId, Body>,
}

/// Candidate intersection, `t` in meters along the cast.
#[derive(Clone, Copy, Debug)]
struct Hit {
    t: Fixed,
    normal: FixedVec3,
    started_solid: bool,
}

impl Arena {
    /// Empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arena with a solid floor whose top face is z = 0, `half_extent`
    /// meters in each horizontal direction.
    pub fn with_floor(half_extent: i32) -> Self {
        let mut arena = Self::new();
        arena.add_brush(Brush::new(
            "floor",
            FixedVec3::from_ints(-half_extent, -half_extent, -1),
            FixedVec3::from_ints(half_extent, half_extent, 0),
            SurfaceTags::SOLID,
        ));
        arena
    }

    /// Add geometry.
    pub fn add_brush(&mut self, brush: Brush) {
        self.brushes.push(brush);
    }

    /// Add a solid box.
    pub fn add_solid(&mut self, label: &str, a: FixedVec3, b: FixedVec3) {
        self.add_brush(Brush::new(label, a, b, SurfaceTags::SOLID));
    }

    /// Add a water volume.
    pub fn add_water(&mut self, label: &str, a: FixedVec3, b: FixedVec3) {
        self.add_brush(Brush::new(label, a, b, SurfaceTags::WATER));
    }

    /// Geometry in insertion order.
    pub fn brushes(&self) -> &[Brush] {
        &self.brushes
    }

    /// Spawn (or respawn) a body at full health.
    pub fn spawn_body(&mut self, id: EntityId, position: FixedVec3) -> &mut Body {
        match self.bodies.entry(id) {
            Entry::Occupied(mut slot) => {
                slot.insert(Body::new(id, position));
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(Body::new(id, position)),
        }
    }

    /// Remove a body.
    pub fn remove_body(&mut self, id: EntityId) -> Option<Body> {
        self.bodies.remove(&id)
    }

    /// Body by id.
    pub fn body(&self, id: EntityId) -> Option<&Body> {
        self.bodies.get(&id)
    }

    /// Mutable body by id.
    pub fn body_mut(&mut self, id: EntityId) -> Option<&mut Body> {
        self.bodies.get_mut(&id)
    }

    /// Bodies in id order.
    pub fn bodies(&self) -> impl Iterator<Item = &Body> {
        self.bodies.values()
    }

    /// Eye position of a body.
    pub fn eye_position(&self, id: EntityId) -> Option<FixedVec3> {
        self.bodies.get(&id).map(Body::eye)
    }

    /// Fold body state into a hasher.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u32(self.bodies.len() as u32);
        for body in self.bodies.values() {
            hasher.update_uuid(body.id.as_bytes());
            hasher.update_vec3(body.position);
            hasher.update_fixed(body.health);
            hasher.update_bool(body.alive);
        }
    }

    /// Hash of the arena at a tick.
    pub fn compute_hash(&self, tick: u32) -> StateHash {
        compute_state_hash(StateHasher::for_arena_state(), tick, |h| self.hash_into(h))
    }

    fn nearest_hit(&self, cast: &VolumeCast) -> Option<(Hit, SurfaceTags, Option<EntityId>)> {
        let mut best: Option<(Hit, SurfaceTags, Option<EntityId>)> = None;
        let mut consider = |hit: Hit, tags: SurfaceTags, entity: Option<EntityId>| {
            if best.as_ref().map_or(true, |(b, _, _)| hit.t < b.t) {
                best = Some((hit, tags, entity));
            }
        };

        for brush in &self.brushes {
            if !brush.tags.intersects(cast.tags) {
                continue;
            }
            let grow = FixedVec3::new(cast.radius, cast.radius, cast.radius);
            if let Some(hit) = cast_box(cast, brush.min - grow, brush.max + grow) {
                consider(hit, brush.tags, None);
            }
        }

        if cast.tags.contains(SurfaceTags::PLAYER) {
            for body in self.bodies.values() {
                if !body.alive || cast.ignore == Some(body.id) {
                    continue;
                }
                for hitbox in &body.hitboxes {
                    let center = body.position + hitbox.offset;
                    let radius = hitbox.radius.saturating_add(cast.radius);
                    if let Some(hit) = cast_sphere(cast, center, radius) {
                        consider(hit, SurfaceTags::PLAYER, Some(body.id));
                    }
                }
            }
        }

        best
    }
}

/// Slab test against an axis-aligned box.
fn cast_box(cast: &VolumeCast, min: FixedVec3, max: FixedVec3) -> Option<Hit> {
    let mut t_enter = i64::MIN;
    let mut t_exit = i64::MAX;
    let mut normal = -cast.direction;

    for axis in 0..3 {
        let o = cast.origin.axis(axis) as i64;
        let d = cast.direction.axis(axis) as i64;
        let lo = min.axis(axis) as i64;
        let hi = max.axis(axis) as i64;

        if d == 0 {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }

        let t1 = ((lo - o) << FIXED_SCALE) / d;
        let t2 = ((hi - o) << FIXED_SCALE) / d;
        let (near, far) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
        if near > t_enter {
            t_enter = near;
            normal = FixedVec3::axis_unit(axis, d < 0);
        }
        t_exit = t_exit.min(far);
    }

    if t_enter > t_exit || t_exit < 0 {
        return None;
    }
    if t_enter <= 0 {
        return Some(Hit { t: 0, normal: -cast.direction, started_solid: true });
    }
    if t_enter > cast.max_distance as i64 {
        return None;
    }
    Some(Hit { t: t_enter as Fixed, normal, started_solid: false })
}

/// Ray against a sphere: `|o + t*d - c|^2 = r^2`, nearest root.
fn cast_sphere(cast: &VolumeCast, center: FixedVec3, radius: Fixed) -> Option<Hit> {
    let m = cast.origin - center;
    let c = m.length_squared_wide() - wide_mul(radius, radius);
    if c <= 0 {
        let normal = m.normalize();
        let normal = if normal == FixedVec3::ZERO { -cast.direction } else { normal };
        return Some(Hit { t: 0, normal, started_solid: true });
    }

    let b = narrow(m.dot_wide(cast.direction));
    if b > 0 {
        return None;
    }

    let disc = wide_mul(b, b) - c;
    if disc < 0 {
        return None;
    }

    let t = (-(b as i64) - wide_sqrt(disc) as i64).max(0);
    if t > cast.max_distance as i64 {
        return None;
    }
    let t = t as Fixed;
    let point = cast.origin + cast.direction.scale(t);
    Some(Hit { t, normal: (point - center).normalize(), started_solid: false })
}

impl WorldQuery for Arena {
    fn cast_volume(&self, cast: &VolumeCast) -> Option<TraceResult> {
        let (hit, surface, entity) = self.nearest_hit(cast)?;
        let fraction = if cast.max_distance > 0 {
            fixed_div(hit.t, cast.max_distance)
        } else {
            0
        };
        Some(TraceResult {
            start: cast.origin,
            end: cast.end(),
            hit_position: cast.origin + cast.direction.scale(hit.t),
            normal: hit.normal,
            surface,
            entity,
            distance: hit.t,
            direction: cast.direction,
            fraction,
            started_solid: hit.started_solid,
            penetration: 0,
        })
    }

    fn test_point(&self, point: FixedVec3, tags: SurfaceTags) -> bool {
        self.brushes
            .iter()
            .any(|b| b.tags.intersects(tags) && b.contains(point))
    }
}

impl EntityDirectory for Arena {
    fn is_valid(&self, id: EntityId) -> bool {
        self.bodies.get(&id).is_some_and(|b| b.alive)
    }

    fn position(&self, id: EntityId) -> Option<FixedVec3> {
        self.bodies.get(&id).map(|b| b.position)
    }

    fn take_damage(&mut self, id: EntityId, event: &DamageEvent) {
        let Some(body) = self.bodies.get_mut(&id) else {
            return;
        };
        if !body.alive {
            return;
        }
        body.health = (body.health - event.amount).max(0);
        body.distance_to_attacker = event.distance_to_attacker;
        body.last_attacker = Some(event.attacker);
        if body.health == 0 {
            body.alive = false;
        }
    }
}

impl PoseStore for Arena {
    fn lag_compensated(&self) -> Vec<EntityId> {
        self.bodies
            .values()
            .filter(|b| b.alive)
            .map(|b| b.id)
            .collect()
    }

    fn pose(&self, id: EntityId) -> Option<Pose> {
        self.bodies.get(&id).map(|b| Pose::at(b.position))
    }

    fn set_pose(&mut self, id: EntityId, pose: Pose) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.position = pose.position;
        }
    }
}

impl HullQuery for Arena {
    fn hull_blocker(&self, position: FixedVec3, hull: &Hull) -> Option<Blocker> {
        let (min, max) = hull.bounds_at(position);
        self.brushes
            .iter()
            .find(|b| b.tags.intersects(SurfaceTags::HULL_BLOCKING) && b.overlaps(min, max))
            .map(|b| Blocker { label: b.label.clone(), tags: b.tags })
    }
}

// =============================================================================
// TESTS
// =============================================================================
