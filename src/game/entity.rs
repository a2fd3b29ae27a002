//! Entity identity and pose.

use serde::{Serialize, Deserialize};
use crate::core::vec3::FixedVec3;

/// Unique entity identifier (UUID as bytes).
///
/// Used for players and for the weapons they carry. Implements Ord for
/// deterministic BTreeMap ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct EntityId(pub [u8; 16]);

impl EntityId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Create from UUID string.
    pub fn from_uuid_str(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s)
            .ok()
            .map(|u| Self(*u.as_bytes()))
    }

    /// Convert to UUID string.
    pub fn to_uuid_string(&self) -> String {
        uuid::Uuid::from_bytes(self.0).to_string()
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Salt separating this entity's random streams from others in the same tick.
    #[inline]
    pub fn rng_salt(&self) -> u16 {
        u16::from_le_bytes([self.0[0], self.0[1]])
    }

    /// Short hex prefix for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

/// Positional state of an entity as seen by hit detection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pose {
    /// Feet position in world space
    pub position: FixedVec3,
}

impl Pose {
    /// Pose at a position.
    pub const fn at(position: FixedVec3) -> Self {
        Self { position }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_round_trip() {
        let id = EntityId::from_uuid_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(id.to_uuid_string(), "67e55044-10b1-426f-9247-bb680e5fe0c8");
        assert_eq!(id.short(), "67e55044");
        assert!(EntityId::from_uuid_str("not-a-uuid").is_none());
    }

    #[test]
    fn test_rng_salt_uses_leading_bytes() {
        assert_eq!(EntityId::new([1; 16]).rng_salt(), 0x0101);
        assert_ne!(EntityId::new([1; 16]).rng_salt(), EntityId::new([2; 16]).rng_salt());
    }
}
