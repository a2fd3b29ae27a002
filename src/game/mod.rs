//! Game Logic Module
//!
//! All combat simulation code. 100% deterministic.
//!
//! ## Module Structure
//!
//! - `context`: Tick context, simulation role, event sink
//! - `timer`: Tick-anchored "time since" timers
//! - `definition`: Weapon definitions loaded from JSON
//! - `weapon`: Weapon state machine (attack, reload, deploy)
//! - `spread`: Tick-seeded bullet spread
//! - `trace`: Bullet tracing and impact classification
//! - `damage`: Distance falloff and damage events
//! - `recoil`: View kick and recovery
//! - `lag_comp`: Pose history and lag compensation scope
//! - `unstuck`: Push entities out of solid geometry
//! - `arena`: Brush-and-body world used by the simulation
//! - `tick`: Simulation driver and replay
//! - `sync`: Weapon snapshots and client reconciliation
//! - `events`: Combat events for effects and verification

pub mod ammo;
pub mod arena;
pub mod context;
pub mod damage;
pub mod definition;
pub mod entity;
pub mod events;
pub mod input;
pub mod lag_comp;
pub mod loadout;
pub mod movement;
pub mod recoil;
pub mod spread;
pub mod sync;
pub mod tick;
pub mod timer;
pub mod trace;
pub mod unstuck;
pub mod weapon;

// Re-export key types
pub use context::{SimRole, TickContext};
pub use definition::{parse_definitions, WeaponDefinition};
pub use entity::EntityId;
pub use events::{CombatEvent, CombatEventData};
pub use input::{Button, InputFrame, InputRecording};
pub use tick::{Simulation, SimulationConfig, TickResult};
pub use weapon::{Weapon, WeaponState};
