//! Q16.16 Fixed-Point Arithmetic
//!
//! This module provides deterministic fixed-point math for the combat simulation.
//! All operations use integer arithmetic only - no floats in gameplay logic.
//!
//! ## Format: Q16.16
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Bit Layout: Q16.16 (32-bit signed integer)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  [S][IIIIIIIIIIIIIIII][FFFFFFFFFFFFFFFF]                    │
//! │   │  └──── 16 bits ────┘└──── 16 bits ────┘                 │
//! │   └─ Sign bit                                               │
//! │                                                             │
//! │  Range: -32768.0 to +32767.99998 (approx)                   │
//! │  Precision: 1/65536 ≈ 0.000015 units                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! World units are meters, angles are degrees, durations are seconds.
//!
//! ## Wide values
//!
//! Products of two Q16.16 values (squared lengths, dot products of
//! world-space vectors) are kept in a widened Q32.32 `i64` so a 500 m
//! bullet trace never overflows. [`wide_sqrt`] turns a Q32.32 value back
//! into Q16.16 with an exact integer square root.

/// Q16.16 fixed-point number stored as i32.
/// 16 bits integer, 16 bits fractional.
pub type Fixed = i32;

/// Q32.32 intermediate produced by multiplying two `Fixed` values.
pub type Wide = i64;

/// Number of fractional bits (16)
pub const FIXED_SCALE: i32 = 16;

/// 1.0 in fixed-point (65536)
pub const FIXED_ONE: Fixed = 1 << FIXED_SCALE; // 65536

/// 0.5 in fixed-point (32768)
pub const FIXED_HALF: Fixed = FIXED_ONE >> 1; // 32768

/// Maximum positive value
pub const FIXED_MAX: Fixed = i32::MAX;

/// Minimum negative value
pub const FIXED_MIN: Fixed = i32::MIN;

// =============================================================================
// SIMULATION CONSTANTS (All as integer literals - NO float conversion!)
// =============================================================================

/// Tick duration: 1/60 second = round(65536/60) = 1092
pub const TICK_DURATION: Fixed = 1092;

/// Maximum bullet trace distance: 508.0 m = 508 * 65536 = 33292288
pub const MAX_TRACE_DISTANCE: Fixed = 33292288;

/// Tracers are only drawn for hits farther than 5.08 m (332922)
pub const TRACER_MIN_DISTANCE: Fixed = 332922;

/// Damage force scale applied to the shot direction: 100.0
pub const DAMAGE_FORCE_SCALE: Fixed = 6553600;

/// Spread contribution per random vector (four are summed): 0.25
pub const SPREAD_SAMPLE_WEIGHT: Fixed = 16384;

/// Unstuck: first candidate is this far straight up: 0.125 m
pub const UNSTUCK_UP_NUDGE: Fixed = 8192;

/// Unstuck: search radius added per failed tick: 0.0125 m
pub const UNSTUCK_RADIUS_PER_TRY: Fixed = 819;

// =============================================================================
// CORE OPERATIONS (All deterministic, wrapping semantics)
// =============================================================================

/// Convert a compile-time float to fixed-point.
///
/// # Warning
/// Only use at compile-time or definition load. NEVER in tick loop.
///
/// # Example
/// ```
/// use gunplay::core::fixed::{to_fixed, FIXED_ONE};
/// const MY_VALUE: i32 = to_fixed(2.5);
/// assert_eq!(MY_VALUE, FIXED_ONE * 2 + FIXED_ONE / 2);
/// ```
#[inline]
pub const fn to_fixed(f: f64) -> Fixed {
    (f * (FIXED_ONE as f64)) as Fixed
}

/// Convert fixed-point to float for display/rendering.
///
/// # Warning
/// Only use for visual output. NEVER use result in game logic.
#[inline]
pub fn to_float(f: Fixed) -> f32 {
    f as f32 / FIXED_ONE as f32
}

/// Multiply two fixed-point numbers.
///
/// Uses i64 intermediate to prevent overflow, then truncates.
#[inline]
pub fn fixed_mul(a: Fixed, b: Fixed) -> Fixed {
    let wide = (a as i64) * (b as i64);
    (wide >> FIXED_SCALE) as Fixed
}

/// Divide two fixed-point numbers.
///
/// Pre-shifts numerator to maintain precision.
/// Returns 0 on divide-by-zero.
#[inline]
pub fn fixed_div(a: Fixed, b: Fixed) -> Fixed {
    if b == 0 {
        return 0; // Deterministic: don't panic
    }
    let wide = (a as i64) << FIXED_SCALE;
    (wide / b as i64) as Fixed
}

/// Compute `a * b / c` with a single widened intermediate.
///
/// Used where `a * b` would leave the Q16.16 range but the quotient
/// does not (e.g. damage falloff over long distances).
/// Returns 0 when `c` is zero.
#[inline]
pub fn fixed_mul_div(a: Fixed, b: Fixed, c: Fixed) -> Fixed {
    if c == 0 {
        return 0;
    }
    ((a as i64) * (b as i64) / (c as i64)) as Fixed
}

/// Widened product of two fixed-point numbers (Q32.32).
#[inline]
pub fn wide_mul(a: Fixed, b: Fixed) -> Wide {
    (a as i64) * (b as i64)
}

/// Narrow a Q32.32 value back to Q16.16, saturating at the Fixed range.
#[inline]
pub fn narrow(wide: Wide) -> Fixed {
    (wide >> FIXED_SCALE).clamp(FIXED_MIN as i64, FIXED_MAX as i64) as Fixed
}

/// Exact integer square root of a Q32.32 value, returned as Q16.16.
///
/// `sqrt(x * 2^32) = sqrt(x) * 2^16`, so the integer root of the raw
/// wide value is already in Q16.16. Returns 0 for non-positive inputs.
/// Bit-by-bit method: fixed 32 iterations, identical on every platform.
pub fn wide_sqrt(x: Wide) -> Fixed {
    if x <= 0 {
        return 0;
    }

    let mut value = x as u64;
    let mut result: u64 = 0;
    let mut bit: u64 = 1 << 62;

    while bit > value {
        bit >>= 2;
    }

    while bit != 0 {
        if value >= result + bit {
            value -= result + bit;
            result = (result >> 1) + bit;
        } else {
            result >>= 1;
        }
        bit >>= 2;
    }

    result.min(FIXED_MAX as u64) as Fixed
}

/// Convert a tick count to seconds at the given tick rate.
///
/// Exact division instead of accumulating `TICK_DURATION`, so
/// 60 ticks at 60 Hz is exactly `FIXED_ONE`.
#[inline]
pub fn ticks_to_seconds(ticks: u32, tick_rate: u32) -> Fixed {
    if tick_rate == 0 {
        return 0;
    }
    let wide = ((ticks as i64) << FIXED_SCALE) / tick_rate as i64;
    wide.min(FIXED_MAX as i64) as Fixed
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_constants() {
        assert_eq!(FIXED_ONE, 65536);
        assert_eq!(FIXED_HALF, 32768);
        assert_eq!(FIXED_SCALE, 16);
    }

    #[test]
    fn test_to_fixed() {
        assert_eq!(to_fixed(1.0), FIXED_ONE);
        assert_eq!(to_fixed(0.5), FIXED_HALF);
        assert_eq!(to_fixed(2.0), FIXED_ONE * 2);
        assert_eq!(to_fixed(-1.0), -FIXED_ONE);
    }

    #[test]
    fn test_fixed_mul() {
        assert_eq!(fixed_mul(to_fixed(2.0), to_fixed(3.0)), to_fixed(6.0));
        assert_eq!(fixed_mul(FIXED_HALF, FIXED_HALF), to_fixed(0.25));
        assert_eq!(fixed_mul(to_fixed(-2.0), to_fixed(3.0)), to_fixed(-6.0));
    }

    #[test]
    fn test_fixed_div() {
        assert_eq!(fixed_div(to_fixed(6.0), to_fixed(2.0)), to_fixed(3.0));
        assert_eq!(fixed_div(FIXED_ONE, to_fixed(4.0)), to_fixed(0.25));

        // Divide by zero returns 0
        assert_eq!(fixed_div(FIXED_ONE, 0), 0);
    }

    #[test]
    fn test_fixed_mul_div_avoids_overflow() {
        // 200 * 400 overflows Q16.16 on its own, the quotient does not
        let result = fixed_mul_div(to_fixed(200.0), to_fixed(400.0), to_fixed(800.0));
        assert_eq!(result, to_fixed(100.0));
        assert_eq!(fixed_mul_div(FIXED_ONE, FIXED_ONE, 0), 0);
    }

    #[test]
    fn test_wide_sqrt() {
        assert_eq!(wide_sqrt(wide_mul(to_fixed(2.0), to_fixed(2.0))), to_fixed(2.0));
        assert_eq!(wide_sqrt(wide_mul(FIXED_HALF, FIXED_HALF)), FIXED_HALF);
        assert_eq!(wide_sqrt(0), 0);
        assert_eq!(wide_sqrt(-1), 0);
    }

    #[test]
    fn test_wide_sqrt_large_values() {
        // 500^2 does not fit Q16.16 but does fit Q32.32
        let squared = wide_mul(to_fixed(500.0), to_fixed(500.0));
        assert_eq!(wide_sqrt(squared), to_fixed(500.0));
    }

    #[test]
    fn test_ticks_to_seconds() {
        assert_eq!(ticks_to_seconds(60, 60), FIXED_ONE);
        assert_eq!(ticks_to_seconds(6, 60), 6553); // 0.1 s
        assert_eq!(ticks_to_seconds(0, 60), 0);
        assert_eq!(ticks_to_seconds(10, 0), 0);
    }

    #[test]
    fn test_simulation_constants() {
        assert_eq!(TICK_DURATION, 1092); // round(65536/60)
        assert_eq!(MAX_TRACE_DISTANCE, 508 * FIXED_ONE);
        assert_eq!(DAMAGE_FORCE_SCALE, 100 * FIXED_ONE);
        assert_eq!(SPREAD_SAMPLE_WEIGHT, FIXED_ONE / 4);
        assert_eq!(UNSTUCK_UP_NUDGE, FIXED_ONE / 8);
    }

    #[test]
    fn test_fixed_determinism() {
        for _ in 0..1000 {
            let a = 12345678;
            let b = 87654321;

            assert_eq!(fixed_mul(a, b), fixed_mul(a, b));
            assert_eq!(fixed_div(a, b), fixed_div(a, b));
            assert_eq!(wide_sqrt(wide_mul(a, b)), wide_sqrt(wide_mul(a, b)));
        }
    }
}
