//! Weapon state replication.
//!
//! The server sends a `WeaponSnapshot` of each weapon's replicated fields;
//! the client compares it against its predicted copy and overwrites
//! whatever disagrees.

use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::debug;

use crate::core::hash::{compute_state_hash, StateHash, StateHasher};
use crate::game::entity::EntityId;
use crate::game::weapon::{Weapon, WeaponHooks, WeaponState};

/// Snapshot encoding and reconciliation errors.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Snapshot could not be encoded.
    #[error("failed to encode snapshot: {0}")]
    Encode(#[source] bincode::Error),
    /// Bytes are not a valid snapshot.
    #[error("failed to decode snapshot: {0}")]
    Decode(#[source] bincode::Error),
    /// Snapshot belongs to another weapon.
    #[error("snapshot for weapon {expected} applied to {actual}")]
    WeaponMismatch {
        /// Weapon the snapshot describes
        expected: String,
        /// Weapon it was applied to
        actual: String,
    },
}

/// Replicated fields of one weapon at one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponSnapshot {
    /// Tick the state was captured after
    pub tick: u32,
    /// Weapon entity
    pub weapon: EntityId,
    /// Replicated state
    pub state: WeaponState,
}

impl WeaponSnapshot {
    /// Capture a weapon's replicated state.
    pub fn capture<H: WeaponHooks>(tick: u32, weapon: &Weapon<H>) -> Self {
        Self {
            tick,
            weapon: weapon.id(),
            state: *weapon.state(),
        }
    }

    /// Serialize to binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SyncError> {
        bincode::serialize(self).map_err(SyncError::Encode)
    }

    /// Deserialize from binary.
    pub fn from_bytes(data: &[u8]) -> Result<Self, SyncError> {
        bincode::deserialize(data).map_err(SyncError::Decode)
    }

    /// State hash, comparable between predicted and authoritative copies.
    pub fn hash(&self) -> StateHash {
        compute_state_hash(StateHasher::for_weapon_state(), self.tick, |h| {
            h.update_uuid(self.weapon.as_bytes());
            self.state.hash_into(h);
        })
    }
}

/// Fields that differ between two states.
pub fn diff(predicted: &WeaponState, authoritative: &WeaponState) -> Vec<&'static str> {
    let mut fields = Vec::new();
    if predicted.ammo_in_clip != authoritative.ammo_in_clip {
        fields.push("ammo_in_clip");
    }
    if predicted.reserve_ammo != authoritative.reserve_ammo {
        fields.push("reserve_ammo");
    }
    if predicted.is_reloading != authoritative.is_reloading {
        fields.push("is_reloading");
    }
    if predicted.time_since_primary_attack != authoritative.time_since_primary_attack {
        fields.push("time_since_primary_attack");
    }
    if predicted.time_since_secondary_attack != authoritative.time_since_secondary_attack {
        fields.push("time_since_secondary_attack");
    }
    if predicted.time_since_reload_start != authoritative.time_since_reload_start {
        fields.push("time_since_reload_start");
    }
    if predicted.time_since_deployed != authoritative.time_since_deployed {
        fields.push("time_since_deployed");
    }
    fields
}

/// Overwrite a predicted weapon with the authoritative snapshot.
///
/// Returns the names of the corrected fields (empty when prediction was right).
pub fn reconcile<H: WeaponHooks>(
    weapon: &mut Weapon<H>,
    snapshot: &WeaponSnapshot,
) -> Result<Vec<&'static str>, SyncError> {
    if weapon.id() != snapshot.weapon {
        return Err(SyncError::WeaponMismatch {
            expected: snapshot.weapon.short(),
            actual: weapon.id().short(),
        });
    }

    let corrected = diff(weapon.state(), &snapshot.state);
    if !corrected.is_empty() {
        debug!(
            "Mispredicted {} at tick {}: {:?}",
            snapshot.weapon.short(),
            snapshot.tick,
            corrected
        );
        weapon.set_state(snapshot.state);
    }
    Ok(corrected)
}
