//! Fixed-Point 3D Vector
//!
//! Deterministic 3D vector operations for ballistics and movement.
//! All operations use fixed-point arithmetic.
//!
//! Lengths and dot products go through the widened Q32.32 domain so
//! world-space vectors hundreds of meters long stay exact.

use std::fmt;
use std::ops::{Add, Sub, Neg};
use serde::{Serialize, Deserialize};

use super::fixed::{
    Fixed, Wide, FIXED_ONE, FIXED_SCALE,
    fixed_mul, fixed_div, narrow, wide_sqrt,
};

/// 3D vector with fixed-point components. `z` is up.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FixedVec3 {
    /// X component (Q16.16 fixed-point)
    pub x: Fixed,
    /// Y component (Q16.16 fixed-point)
    pub y: Fixed,
    /// Z component (Q16.16 fixed-point)
    pub z: Fixed,
}

impl FixedVec3 {
    /// Zero vector
    pub const ZERO: Self = Self { x: 0, y: 0, z: 0 };

    /// Unit vector pointing forward (+X)
    pub const FORWARD: Self = Self { x: FIXED_ONE, y: 0, z: 0 };

    /// Unit vector pointing left (+Y)
    pub const LEFT: Self = Self { x: 0, y: FIXED_ONE, z: 0 };

    /// Unit vector pointing up (+Z)
    pub const UP: Self = Self { x: 0, y: 0, z: FIXED_ONE };

    /// Create a new vector from fixed-point components.
    #[inline]
    pub const fn new(x: Fixed, y: Fixed, z: Fixed) -> Self {
        Self { x, y, z }
    }

    /// Create a vector from integer components.
    #[inline]
    pub const fn from_ints(x: i32, y: i32, z: i32) -> Self {
        Self {
            x: x << FIXED_SCALE,
            y: y << FIXED_SCALE,
            z: z << FIXED_SCALE,
        }
    }

    /// Add another vector.
    #[inline]
    pub fn add(self, other: Self) -> Self {
        Self {
            x: self.x.wrapping_add(other.x),
            y: self.y.wrapping_add(other.y),
            z: self.z.wrapping_add(other.z),
        }
    }

    /// Subtract another vector.
    #[inline]
    pub fn sub(self, other: Self) -> Self {
        Self {
            x: self.x.wrapping_sub(other.x),
            y: self.y.wrapping_sub(other.y),
            z: self.z.wrapping_sub(other.z),
        }
    }

    /// Scale by a fixed-point scalar.
    #[inline]
    pub fn scale(self, scalar: Fixed) -> Self {
        Self {
            x: fixed_mul(self.x, scalar),
            y: fixed_mul(self.y, scalar),
            z: fixed_mul(self.z, scalar),
        }
    }

    /// Divide by a fixed-point scalar.
    #[inline]
    pub fn div_scalar(self, scalar: Fixed) -> Self {
        Self {
            x: fixed_div(self.x, scalar),
            y: fixed_div(self.y, scalar),
            z: fixed_div(self.z, scalar),
        }
    }

    /// Widened dot product (Q32.32).
    #[inline]
    pub fn dot_wide(self, other: Self) -> Wide {
        (self.x as i64) * (other.x as i64)
            + (self.y as i64) * (other.y as i64)
            + (self.z as i64) * (other.z as i64)
    }

    /// Dot product, narrowed (saturating) to Q16.16.
    #[inline]
    pub fn dot(self, other: Self) -> Fixed {
        narrow(self.dot_wide(other))
    }

    /// Squared length in Q32.32 (prefer this for comparisons).
    #[inline]
    pub fn length_squared_wide(self) -> Wide {
        self.dot_wide(self)
    }

    /// Length (magnitude).
    #[inline]
    pub fn length(self) -> Fixed {
        wide_sqrt(self.length_squared_wide())
    }

    /// Squared distance to another point in Q32.32.
    #[inline]
    pub fn distance_squared_wide(self, other: Self) -> Wide {
        self.sub(other).length_squared_wide()
    }

    /// Distance to another point.
    #[inline]
    pub fn distance(self, other: Self) -> Fixed {
        wide_sqrt(self.distance_squared_wide(other))
    }

    /// Normalize to unit length.
    /// Returns ZERO if length is zero.
    #[inline]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == 0 {
            return Self::ZERO;
        }
        self.div_scalar(len)
    }

    /// Negate all components.
    #[inline]
    pub fn negate(self) -> Self {
        Self {
            x: self.x.wrapping_neg(),
            y: self.y.wrapping_neg(),
            z: self.z.wrapping_neg(),
        }
    }

    /// Component by axis index (0 = x, 1 = y, 2 = z).
    #[inline]
    pub fn axis(self, index: usize) -> Fixed {
        match index {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    /// Unit vector along an axis with the given sign.
    #[inline]
    pub fn axis_unit(index: usize, positive: bool) -> Self {
        let v = if positive { FIXED_ONE } else { -FIXED_ONE };
        match index {
            0 => Self::new(v, 0, 0),
            1 => Self::new(0, v, 0),
            _ => Self::new(0, 0, v),
        }
    }

    /// Convert to float tuple for rendering.
    #[inline]
    pub fn to_floats(self) -> (f32, f32, f32) {
        (
            self.x as f32 / FIXED_ONE as f32,
            self.y as f32 / FIXED_ONE as f32,
            self.z as f32 / FIXED_ONE as f32,
        )
    }
}

// Operator overloads for ergonomics
impl Add for FixedVec3 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        FixedVec3::add(self, rhs)
    }
}

impl Sub for FixedVec3 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        FixedVec3::sub(self, rhs)
    }
}

impl Neg for FixedVec3 {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        self.negate()
    }
}

impl fmt::Debug for FixedVec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (fx, fy, fz) = self.to_floats();
        write!(f, "Vec3({:.3}, {:.3}, {:.3})", fx, fy, fz)
    }
}

impl fmt::Display for FixedVec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (fx, fy, fz) = self.to_floats();
        write!(f, "({:.3}, {:.3}, {:.3})", fx, fy, fz)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::{to_fixed, wide_mul};

    #[test]
    fn test_vec3_constants() {
        assert_eq!(FixedVec3::ZERO, FixedVec3::new(0, 0, 0));
        assert_eq!(FixedVec3::FORWARD.x, FIXED_ONE);
        assert_eq!(FixedVec3::UP.z, FIXED_ONE);
    }

    #[test]
    fn test_vec3_add_sub() {
        let a = FixedVec3::from_ints(3, 4, 5);
        let b = FixedVec3::from_ints(1, 2, 3);
        assert_eq!(a + b, FixedVec3::from_ints(4, 6, 8));
        assert_eq!(a - b, FixedVec3::from_ints(2, 2, 2));
        assert_eq!(-b, FixedVec3::from_ints(-1, -2, -3));
    }

    #[test]
    fn test_vec3_scale() {
        let v = FixedVec3::from_ints(2, 3, -1);
        assert_eq!(v.scale(to_fixed(2.0)), FixedVec3::from_ints(4, 6, -2));
    }

    #[test]
    fn test_vec3_length() {
        // 2-3-6-7 quadruple
        let v = FixedVec3::from_ints(2, 3, 6);
        assert_eq!(v.length_squared_wide(), wide_mul(to_fixed(49.0), FIXED_ONE));
        assert_eq!(v.length(), to_fixed(7.0));
    }

    #[test]
    fn test_vec3_long_distance() {
        // Would overflow a Q16.16 squared length
        let a = FixedVec3::ZERO;
        let b = FixedVec3::from_ints(300, 400, 0);
        assert_eq!(a.distance(b), to_fixed(500.0));
    }

    #[test]
    fn test_vec3_normalize() {
        let v = FixedVec3::from_ints(0, 3, 4);
        let norm = v.normalize();
        assert!((norm.length() - FIXED_ONE).abs() < 4, "Normalized length should be ~1.0");
        assert_eq!(norm.y, to_fixed(0.6));
        assert_eq!(norm.z, to_fixed(0.8));
        assert_eq!(FixedVec3::ZERO.normalize(), FixedVec3::ZERO);
    }

    #[test]
    fn test_vec3_dot() {
        let a = FixedVec3::from_ints(1, 2, 3);
        let b = FixedVec3::from_ints(4, -5, 6);
        // 4 - 10 + 18 = 12
        assert_eq!(a.dot(b), to_fixed(12.0));
    }

    #[test]
    fn test_vec3_axis_helpers() {
        let v = FixedVec3::from_ints(1, 2, 3);
        assert_eq!(v.axis(0), FIXED_ONE);
        assert_eq!(v.axis(2), 3 * FIXED_ONE);
        assert_eq!(FixedVec3::axis_unit(1, false), FixedVec3::new(0, -FIXED_ONE, 0));
    }

    #[test]
    fn test_vec3_determinism() {
        let a = FixedVec3::new(12345678, 87654321, -4444444);
        for _ in 0..1000 {
            assert_eq!(a.normalize(), a.normalize());
            assert_eq!(a.length(), a.length());
        }
    }
}
