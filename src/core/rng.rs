//! Deterministic Random Number Generator
//!
//! Uses Xorshift128+ algorithm for fast, high-quality, deterministic randomness.
//! Given the same seed, produces identical sequence on all platforms.
//!
//! Every random decision in a shot is drawn from a generator reseeded
//! from the simulation tick, so a client predicting tick `N` and the
//! server replaying tick `N` draw the same numbers.

use serde::{Serialize, Deserialize};

use super::fixed::{Fixed, FIXED_ONE, wide_mul};
use super::vec3::FixedVec3;

/// Independent random streams derived from the same tick.
///
/// Keeping spread and recoil on separate streams means adding a recoil
/// draw never shifts the spread pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum RngStream {
    /// Bullet spread perturbation
    Spread = 0,
    /// Horizontal recoil kick
    Recoil = 1,
    /// Unstuck candidate directions
    Unstuck = 2,
}

/// Deterministic PRNG using Xorshift128+ algorithm.
///
/// # Determinism Guarantee
///
/// Given the same seed, this RNG will produce the exact same sequence
/// of random numbers on any platform.
///
/// # Example
///
/// ```
/// use gunplay::core::rng::DeterministicRng;
///
/// let mut a = DeterministicRng::for_tick(1200);
/// let mut b = DeterministicRng::for_tick(1200);
/// assert_eq!(a.next_u64(), b.next_u64());
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeterministicRng {
    state: [u64; 2],
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeterministicRng {
    /// Create a new RNG from a 64-bit seed.
    ///
    /// Uses SplitMix64 to initialize the internal state, ensuring
    /// good distribution even from weak seeds such as tick indices.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // Ensure state is never all zeros
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
    }

    /// Reseed from the simulation tick (spread stream).
    pub fn for_tick(tick: u32) -> Self {
        Self::new(derive_tick_seed(tick, RngStream::Spread, 0))
    }

    /// Reseed from the simulation tick on a specific stream.
    ///
    /// `salt` separates entities sharing a stream in the same tick.
    pub fn for_tick_stream(tick: u32, stream: RngStream, salt: u16) -> Self {
        Self::new(derive_tick_seed(tick, stream, salt))
    }

    /// Generate the next 64-bit random value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }

    /// Generate a random Fixed in range [0, max).
    #[inline]
    pub fn next_fixed(&mut self, max: Fixed) -> Fixed {
        if max <= 0 {
            return 0;
        }
        // Use upper 32 bits to avoid overflow in multiplication
        let raw = (self.next_u64() >> 32) as u32;
        // Scale to [0, max) range: (raw * max) / 2^32
        ((raw as i64 * max as i64) >> 32) as Fixed
    }

    /// Generate a random Fixed in range [min, max).
    #[inline]
    pub fn next_fixed_range(&mut self, min: Fixed, max: Fixed) -> Fixed {
        if min >= max {
            return min;
        }
        let range = max.wrapping_sub(min);
        min.wrapping_add(self.next_fixed(range))
    }

    /// Generate a random point inside the unit ball.
    ///
    /// Uses rejection sampling for uniform distribution.
    pub fn random_in_unit_sphere(&mut self) -> FixedVec3 {
        let limit = wide_mul(FIXED_ONE, FIXED_ONE);
        loop {
            let x = self.next_fixed_range(-FIXED_ONE, FIXED_ONE);
            let y = self.next_fixed_range(-FIXED_ONE, FIXED_ONE);
            let z = self.next_fixed_range(-FIXED_ONE, FIXED_ONE);
            let point = FixedVec3::new(x, y, z);

            // Check if within ball (use squared to avoid sqrt)
            if point.length_squared_wide() <= limit {
                return point;
            }
        }
    }

    /// Generate a random unit direction.
    ///
    /// Points too close to the centre are rejected so normalisation
    /// keeps its precision.
    pub fn random_unit_vector(&mut self) -> FixedVec3 {
        let min_len = FIXED_ONE / 16;
        let min_sq = wide_mul(min_len, min_len);
        loop {
            let point = self.random_in_unit_sphere();
            if point.length_squared_wide() >= min_sq {
                return point.normalize();
            }
        }
    }

}

/// SplitMix64 for seed initialization.
/// Produces well-distributed values from sequential seeds.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Derive a seed from the tick index, stream and salt.
///
/// The spread stream with salt 0 is the bare tick, so two machines only
/// need to agree on the tick number.
pub fn derive_tick_seed(tick: u32, stream: RngStream, salt: u16) -> u64 {
    ((stream as u64) << 48) | ((salt as u64) << 32) | tick as u64
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_determinism() {
        let mut rng1 = DeterministicRng::new(12345);
        let mut rng2 = DeterministicRng::new(12345);

        for _ in 0..1000 {
            assert_eq!(rng1.next_u64(), rng2.next_u64());
        }
    }

    #[test]
    fn test_rng_different_seeds() {
        let mut rng1 = DeterministicRng::new(12345);
        let mut rng2 = DeterministicRng::new(54321);

        // Very unlikely to match
        assert_ne!(rng1.next_u64(), rng2.next_u64());
    }

    #[test]
    fn test_rng_known_values() {
        // These values must never change!
        // If they do, recorded ticks replay with different spread.
        let mut rng = DeterministicRng::new(42);
        assert_eq!(rng.next_u64(), 16629283624882167704);
        assert_eq!(rng.next_u64(), 1420492921613871959);
        assert_eq!(rng.next_u64(), 9768315062676884790);
    }

    #[test]
    fn test_for_tick_matches_bare_seed() {
        let mut a = DeterministicRng::for_tick(42);
        let mut b = DeterministicRng::new(42);
        assert_eq!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn test_streams_are_independent() {
        let mut spread = DeterministicRng::for_tick_stream(100, RngStream::Spread, 0);
        let mut recoil = DeterministicRng::for_tick_stream(100, RngStream::Recoil, 0);
        let mut salted = DeterministicRng::for_tick_stream(100, RngStream::Spread, 7);

        let first = spread.next_u64();
        assert_ne!(first, recoil.next_u64());
        assert_ne!(first, salted.next_u64());
    }

    #[test]
    fn test_next_fixed_range() {
        let mut rng = DeterministicRng::new(9999);
        let (lo, hi) = (-FIXED_ONE * 3, FIXED_ONE * 2);

        for _ in 0..1000 {
            let val = rng.next_fixed_range(lo, hi);
            assert!(val >= lo && val < hi);
        }

        // Empty range returns min
        assert_eq!(rng.next_fixed_range(FIXED_ONE, FIXED_ONE), FIXED_ONE);
    }

    #[test]
    fn test_random_in_unit_sphere() {
        let mut rng = DeterministicRng::new(7777);
        let limit = wide_mul(FIXED_ONE, FIXED_ONE);

        for _ in 0..500 {
            let p = rng.random_in_unit_sphere();
            assert!(p.length_squared_wide() <= limit);
        }
    }

    #[test]
    fn test_random_unit_vector_is_unit() {
        let mut rng = DeterministicRng::new(31337);

        for _ in 0..500 {
            let v = rng.random_unit_vector();
            assert!((v.length() - FIXED_ONE).abs() < 16, "got {:?}", v);
        }
    }
}
