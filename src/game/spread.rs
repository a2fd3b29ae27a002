//! Bullet spread.
//!
//! Each pellet perturbs the aim direction by the average of four random
//! points in the unit ball, scaled by the weapon's spread. Averaging four
//! samples pulls shots towards the centre of the cone.
//!
//! The generator is reseeded from the tick right before the first pellet,
//! so the client's predicted cone and the server's replayed cone match.

use crate::core::fixed::{Fixed, SPREAD_SAMPLE_WEIGHT, fixed_mul};
use crate::core::rng::DeterministicRng;
use crate::core::vec3::FixedVec3;

/// Perturb `forward` by `spread` using the next draws from `rng`.
///
/// Falls back to `forward` if the perturbed vector degenerates to zero.
pub fn spread_direction(rng: &mut DeterministicRng, forward: FixedVec3, spread: Fixed) -> FixedVec3 {
    let sum = rng.random_in_unit_sphere()
        + rng.random_in_unit_sphere()
        + rng.random_in_unit_sphere()
        + rng.random_in_unit_sphere();

    let offset = sum.scale(fixed_mul(spread, SPREAD_SAMPLE_WEIGHT));
    let direction = (forward + offset).normalize();
    if direction == FixedVec3::ZERO {
        forward
    } else {
        direction
    }
}

/// Directions for every pellet of one shot fired on `tick`.
pub fn shot_directions(tick: u32, forward: FixedVec3, spread: Fixed, pellets: u32) -> Vec<FixedVec3> {
    let mut rng = DeterministicRng::for_tick(tick);
    (0..pellets)
        .map(|_| spread_direction(&mut rng, forward, spread))
        .collect()
}
