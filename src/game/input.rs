//! Input Capture
//!
//! `InputFrame` is the per-tick command a client sends: held buttons, the
//! aim direction and the last tick the client has acknowledged from the
//! server. The simulation never sees view angles, only the fixed-point
//! aim vector, so the client and the server trace identical rays.
//!
//! `InputSnapshot` pairs a frame with the previous tick's buttons to give
//! edge (`pressed`) and level (`down`) queries. `InputBuilder` is the
//! client-side stage where weapons adjust view angles (recoil) before the
//! frame is produced.

use serde::{Serialize, Deserialize};
use crate::core::fixed::{Fixed, to_fixed, to_float};
use crate::core::vec3::FixedVec3;

// =============================================================================
// BUTTONS
// =============================================================================

/// Input buttons consumed by the combat core.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Button {
    /// Primary attack
    PrimaryAttack = 0x01,
    /// Secondary attack
    SecondaryAttack = 0x02,
    /// Reload
    Reload = 0x04,
    /// Drop the active weapon
    Drop = 0x08,
    /// Swap to the last-known weapon
    Menu = 0x10,
    /// Run modifier
    Run = 0x20,
}

impl Button {
    /// Bit mask for this button.
    #[inline]
    pub const fn bit(self) -> u8 {
        self as u8
    }
}

// =============================================================================
// INPUT FRAME
// =============================================================================

/// Raw input for a single tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFrame {
    /// Held buttons (packed `Button` bits)
    pub buttons: u8,

    /// Unit aim direction in world space
    pub aim_forward: FixedVec3,

    /// Last server tick the client had received when sampling this input.
    /// Lag compensation rewinds other entities to this tick.
    pub ack_tick: u32,
}

impl Default for InputFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl InputFrame {
    /// Idle frame aiming forward.
    pub const fn new() -> Self {
        Self {
            buttons: 0,
            aim_forward: FixedVec3::FORWARD,
            ack_tick: 0,
        }
    }

    /// Frame aiming along `aim_forward` with the given buttons held.
    pub fn aiming(aim_forward: FixedVec3, buttons: &[Button]) -> Self {
        let mut frame = Self {
            aim_forward,
            ..Self::new()
        };
        for button in buttons {
            frame.set(*button, true);
        }
        frame
    }

    /// Set the acknowledged tick.
    pub fn with_ack_tick(mut self, ack_tick: u32) -> Self {
        self.ack_tick = ack_tick;
        self
    }

    /// Check if a button is held.
    #[inline]
    pub fn is_down(&self, button: Button) -> bool {
        self.buttons & button.bit() != 0
    }

    /// Set or clear a button.
    #[inline]
    pub fn set(&mut self, button: Button, down: bool) {
        if down {
            self.buttons |= button.bit();
        } else {
            self.buttons &= !button.bit();
        }
    }

    /// Check if this is an idle frame (no buttons).
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.buttons == 0
    }
}

// =============================================================================
// INPUT SNAPSHOT
// =============================================================================

/// Input as seen by the simulation for one entity on one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputSnapshot {
    frame: InputFrame,
    previous_buttons: u8,
    eye_position: FixedVec3,
}

impl InputSnapshot {
    /// Build from this tick's frame and the buttons held on the previous tick.
    pub fn new(frame: InputFrame, previous_buttons: u8, eye_position: FixedVec3) -> Self {
        Self {
            frame,
            previous_buttons,
            eye_position,
        }
    }

    /// Button went down this tick.
    #[inline]
    pub fn pressed(&self, button: Button) -> bool {
        self.frame.is_down(button) && self.previous_buttons & button.bit() == 0
    }

    /// Button is held this tick.
    #[inline]
    pub fn down(&self, button: Button) -> bool {
        self.frame.is_down(button)
    }

    /// Aim direction.
    #[inline]
    pub fn aim_forward(&self) -> FixedVec3 {
        self.frame.aim_forward
    }

    /// Eye position of the entity this input belongs to.
    #[inline]
    pub fn eye_position(&self) -> FixedVec3 {
        self.eye_position
    }

    /// Tick the client had acknowledged.
    #[inline]
    pub fn ack_tick(&self) -> u32 {
        self.frame.ack_tick
    }

    /// Underlying frame.
    #[inline]
    pub fn frame(&self) -> &InputFrame {
        &self.frame
    }
}

// =============================================================================
// INPUT BUILDER (client side)
// =============================================================================

/// View angles in degrees. Positive pitch looks down.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewAngles {
    /// Pitch in degrees
    pub pitch: Fixed,
    /// Yaw in degrees
    pub yaw: Fixed,
}

impl ViewAngles {
    /// Create from fixed-point degrees.
    pub const fn new(pitch: Fixed, yaw: Fixed) -> Self {
        Self { pitch, yaw }
    }

    /// Unit forward vector for these angles.
    ///
    /// Runs on the client while sampling input, outside the tick loop. The
    /// resulting fixed-point vector is what gets sent and simulated.
    pub fn forward(&self) -> FixedVec3 {
        let pitch = (to_float(self.pitch) as f64).to_radians();
        let yaw = (to_float(self.yaw) as f64).to_radians();
        FixedVec3::new(
            to_fixed(pitch.cos() * yaw.cos()),
            to_fixed(pitch.cos() * yaw.sin()),
            to_fixed(-pitch.sin()),
        )
        .normalize()
    }
}

/// Client-side input under construction.
///
/// Each stage of the build chain may edit the view angles or set
/// `stop_processing` to keep later stages from running.
#[derive(Clone, Debug, Default)]
pub struct InputBuilder {
    /// Current view angles
    pub view: ViewAngles,
    /// Held buttons
    pub buttons: u8,
    /// Later build stages must not run
    pub stop_processing: bool,
}

impl InputBuilder {
    /// Start building from view angles.
    pub fn new(view: ViewAngles) -> Self {
        Self {
            view,
            buttons: 0,
            stop_processing: false,
        }
    }

    /// Hold a button.
    pub fn press(&mut self, button: Button) {
        self.buttons |= button.bit();
    }

    /// Produce the frame to send.
    pub fn finish(&self, ack_tick: u32) -> InputFrame {
        InputFrame {
            buttons: self.buttons,
            aim_forward: self.view.forward(),
            ack_tick,
        }
    }
}

// =============================================================================
// INPUT RECORDING
// =============================================================================

/// Delta-compressed input history for one entity.
///
/// Only stores ticks where the input changed. Used to replay a run and
/// reproduce its state hash.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InputRecording {
    deltas: Vec<(u32, InputFrame)>,
    end_tick: u32,
}

impl InputRecording {
    /// Empty recording.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record input for a tick. Ticks must be recorded in order.
    pub fn record(&mut self, tick: u32, frame: InputFrame) {
        self.end_tick = tick;
        if self.deltas.last().map(|(_, last)| *last) != Some(frame) {
            self.deltas.push((tick, frame));
        }
    }

    /// Input in effect at a tick (idle before the first record).
    pub fn get_input_at(&self, tick: u32) -> InputFrame {
        let idx = self.deltas.partition_point(|(t, _)| *t <= tick);
        if idx == 0 {
            InputFrame::new()
        } else {
            self.deltas[idx - 1].1
        }
    }

    /// Number of stored changes.
    pub fn delta_count(&self) -> usize {
        self.deltas.len()
    }

    /// Last recorded tick.
    pub fn end_tick(&self) -> u32 {
        self.end_tick
    }
}

// =============================================================================
// TESTS
// =============================================================================
