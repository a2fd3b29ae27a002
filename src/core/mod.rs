//! Core deterministic primitives.
//!
//! All types in this module are designed for perfect cross-platform determinism.
//! Client prediction and server replay agree because both run on these.

pub mod fixed;
pub mod vec3;
pub mod rng;
pub mod hash;

// Re-export core types
pub use fixed::{Fixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use vec3::FixedVec3;
pub use rng::{DeterministicRng, RngStream};
pub use hash::{StateHash, StateHasher, compute_state_hash};
