//! Per-player ammunition pool.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};

use crate::core::hash::StateHasher;

/// Ammunition kinds. `None` means the weapon keeps its own reserve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum AmmoType {
    /// Weapon-owned reserve
    #[default]
    None = 0,
    /// Pistol rounds
    Pistol = 1,
    /// Rifle rounds
    Rifle = 2,
    /// Shotgun shells
    Buckshot = 3,
    /// Revolver rounds
    Magnum = 4,
}

/// Ammunition carried by one player, by type.
///
/// BTreeMap keeps hashing order deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmmoPool {
    counts: BTreeMap<AmmoType, u32>,
}

impl AmmoPool {
    /// Empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rounds of a type. Always 0 for `AmmoType::None`.
    pub fn count(&self, ammo: AmmoType) -> u32 {
        self.counts.get(&ammo).copied().unwrap_or(0)
    }

    /// Add rounds, returning the new count. `AmmoType::None` is ignored.
    pub fn give(&mut self, ammo: AmmoType, amount: u32) -> u32 {
        if ammo == AmmoType::None {
            return 0;
        }
        let count = self.counts.entry(ammo).or_insert(0);
        *count = count.saturating_add(amount);
        *count
    }

    /// Remove up to `amount` rounds, returning how many were taken.
    pub fn take(&mut self, ammo: AmmoType, amount: u32) -> u32 {
        let Some(count) = self.counts.get_mut(&ammo) else {
            return 0;
        };
        let taken = (*count).min(amount);
        *count -= taken;
        if *count == 0 {
            self.counts.remove(&ammo);
        }
        taken
    }

    /// Hash pool contents.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u32(self.counts.len() as u32);
        for (ammo, count) in &self.counts {
            hasher.update_u8(*ammo as u8);
            hasher.update_u32(*count);
        }
    }
}
