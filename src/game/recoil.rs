//! Recoil accumulation and recovery.
//!
//! Firing adds a kick to a 2D recoil vector (degrees per second). Every
//! input step the view is pulled by `recoil * dt` and the recoil shrinks by
//! the angle actually applied times the weapon's recovery scale.

use serde::{Serialize, Deserialize};

use crate::core::fixed::{Fixed, fixed_mul};
use crate::core::rng::DeterministicRng;
use crate::game::input::ViewAngles;

/// Accumulated recoil.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recoil {
    /// Horizontal component (deg/s)
    pub yaw: Fixed,
    /// Vertical component (deg/s)
    pub pitch: Fixed,
}

impl Recoil {
    /// Add one shot's kick: a random yaw in `[-horizontal, horizontal)` and
    /// the full `vertical`.
    pub fn kick(&mut self, rng: &mut DeterministicRng, horizontal: Fixed, vertical: Fixed) {
        let yaw = rng.next_fixed_range(-horizontal, horizontal);
        self.yaw = self.yaw.saturating_add(yaw);
        self.pitch = self.pitch.saturating_add(vertical);
    }

    /// Pull the view and recover.
    pub fn apply(&mut self, view: &mut ViewAngles, dt: Fixed, recovery_scale: Fixed) {
        let old_pitch = view.pitch;
        let old_yaw = view.yaw;

        view.pitch = view.pitch.wrapping_sub(fixed_mul(self.pitch, dt));
        view.yaw = view.yaw.wrapping_sub(fixed_mul(self.yaw, dt));

        let applied_pitch = old_pitch.wrapping_sub(view.pitch);
        let applied_yaw = old_yaw.wrapping_sub(view.yaw);

        self.pitch = recover(self.pitch, fixed_mul(applied_pitch, recovery_scale));
        self.yaw = recover(self.yaw, fixed_mul(applied_yaw, recovery_scale));
    }
}

/// Shrink `value` by `amount` without crossing zero.
fn recover(value: Fixed, amount: Fixed) -> Fixed {
    let next = value.saturating_sub(amount);
    if (value > 0 && next < 0) || (value < 0 && next > 0) {
        0
    } else {
        next
    }
}
