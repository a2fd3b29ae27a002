//! Tick-anchored durations.
//!
//! A `TimeSince` stores the tick at which it was last reset instead of an
//! accumulating float, so the predicted and the authoritative copy of a
//! weapon agree on elapsed time as long as they agree on the tick.

use serde::{Serialize, Deserialize};
use crate::core::fixed::{Fixed, FIXED_MAX, ticks_to_seconds};

/// Seconds elapsed since the last reset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSince {
    anchor: Option<u32>,
}

impl TimeSince {
    /// A timer that was never reset ("infinitely long ago").
    pub const NEVER: Self = Self { anchor: None };

    /// A timer reset at `tick`.
    pub const fn at(tick: u32) -> Self {
        Self { anchor: Some(tick) }
    }

    /// Reset to zero at `tick`.
    #[inline]
    pub fn reset(&mut self, tick: u32) {
        self.anchor = Some(tick);
    }

    /// Tick of the last reset, if any.
    #[inline]
    pub fn anchor(&self) -> Option<u32> {
        self.anchor
    }

    /// Elapsed seconds at `now`.
    ///
    /// A never-reset timer reports `FIXED_MAX`. A `now` before the anchor
    /// (replaying an older tick) reports zero.
    pub fn elapsed(&self, now: u32, tick_rate: u32) -> Fixed {
        match self.anchor {
            None => FIXED_MAX,
            Some(anchor) => ticks_to_seconds(now.saturating_sub(anchor), tick_rate),
        }
    }

    /// Strictly more than `seconds` have passed.
    #[inline]
    pub fn exceeds(&self, now: u32, tick_rate: u32, seconds: Fixed) -> bool {
        self.elapsed(now, tick_rate) > seconds
    }
}
