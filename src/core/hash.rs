//! State Hashing for Verification
//!
//! Provides deterministic hashing of simulation state for:
//! - Comparing a predicted copy against the authoritative copy
//! - Detecting divergence between two replays of the same ticks

use sha2::{Sha256, Digest};
use super::fixed::Fixed;
use super::vec3::FixedVec3;

/// Hash output type (256 bits / 32 bytes)
pub type StateHash = [u8; 32];

/// Deterministic hasher for simulation state.
///
/// Wraps SHA-256 with helpers for fixed-point types.
/// Order of updates is critical for determinism.
pub struct StateHasher {
    hasher: Sha256,
}

impl StateHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Create hasher for replicated weapon state.
    pub fn for_weapon_state() -> Self {
        Self::new(b"GUNPLAY_WEAPON_V1")
    }

    /// Create hasher for arena (world + entities) state.
    pub fn for_arena_state() -> Self {
        Self::new(b"GUNPLAY_ARENA_V1")
    }

    /// Update with raw bytes.
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Update with a u8 value.
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.hasher.update([value]);
    }

    /// Update with a u32 value (little-endian).
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with an i32 value (little-endian).
    #[inline]
    pub fn update_i32(&mut self, value: i32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a Fixed value.
    #[inline]
    pub fn update_fixed(&mut self, value: Fixed) {
        self.update_i32(value);
    }

    /// Update with a FixedVec3.
    #[inline]
    pub fn update_vec3(&mut self, value: FixedVec3) {
        self.update_fixed(value.x);
        self.update_fixed(value.y);
        self.update_fixed(value.z);
    }

    /// Update with a boolean.
    #[inline]
    pub fn update_bool(&mut self, value: bool) {
        self.update_u8(value as u8);
    }

    /// Update with an optional tick (None hashes differently from any tick).
    #[inline]
    pub fn update_opt_u32(&mut self, value: Option<u32>) {
        match value {
            Some(v) => {
                self.update_u8(1);
                self.update_u32(v);
            }
            None => self.update_u8(0),
        }
    }

    /// Update with a UUID (16 bytes).
    #[inline]
    pub fn update_uuid(&mut self, uuid: &[u8; 16]) {
        self.hasher.update(uuid);
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> StateHash {
        self.hasher.finalize().into()
    }
}

/// Compute a state hash anchored to a tick.
///
/// The closure adds the state-specific data after the tick.
pub fn compute_state_hash<F>(mut hasher: StateHasher, tick: u32, add_state: F) -> StateHash
where
    F: FnOnce(&mut StateHasher),
{
    // Always hash tick first
    hasher.update_u32(tick);

    add_state(&mut hasher);

    hasher.finalize()
}

// =============================================================================
// TESTS
// =============================================================================
