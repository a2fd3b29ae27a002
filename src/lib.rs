//! # Gunplay Simulation
//!
//! Deterministic combat simulation shared by an authoritative server and
//! predicting clients.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    GUNPLAY SIMULATION                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── fixed.rs    - Q16.16 fixed-point arithmetic             │
//! │  ├── vec3.rs     - 3D vector with fixed-point                │
//! │  ├── rng.rs      - Tick-seeded Xorshift128+ PRNG             │
//! │  └── hash.rs     - State hashing for verification            │
//! │                                                              │
//! │  game/           - Combat logic (deterministic)              │
//! │  ├── weapon.rs   - Weapon state machine                      │
//! │  ├── spread.rs   - Bullet spread                             │
//! │  ├── trace.rs    - Bullet tracing                            │
//! │  ├── damage.rs   - Damage falloff                            │
//! │  ├── recoil.rs   - View recoil                               │
//! │  ├── lag_comp.rs - Lag compensation                          │
//! │  ├── unstuck.rs  - Unstuck resolver                          │
//! │  ├── tick.rs     - Simulation driver and replay              │
//! │  └── sync.rs     - Snapshot reconciliation                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `game/` modules are **100% deterministic**:
//! - No floating-point arithmetic in simulation logic
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time dependencies
//! - All randomness from Xorshift128+ seeded by the tick number
//!
//! A client predicting tick N and the server simulating tick N draw the
//! same spread, the same recoil kick and the same unstuck candidates.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;

// Re-export commonly used types
pub use core::fixed::{Fixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use core::vec3::FixedVec3;
pub use core::rng::DeterministicRng;
pub use game::input::{InputFrame, InputRecording};
pub use game::tick::Simulation;
pub use game::weapon::{Weapon, WeaponState};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz)
pub const TICK_RATE: u32 = 60;
