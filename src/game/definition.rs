//! Weapon Definitions
//!
//! Static weapon metadata, loaded from JSON and validated once. Floats only
//! exist in the raw form; everything the simulation reads is fixed-point.
//!
//! ```json
//! { "weapons": [ { "name": "pistol", "clip_size": 12, "ammo_type": "pistol",
//!                  "primary_rate": 8.0, "damage": 25.0 } ] }
//! ```

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::fixed::{Fixed, FIXED_ONE, to_fixed, fixed_div};
use crate::game::ammo::AmmoType;

/// Largest magnitude a fixed-point field may hold.
const FIELD_LIMIT: f64 = 32767.0;

/// Slowest non-zero attack rate. Its interval still fits in fixed-point.
const MIN_RATE: f64 = 1.0 / 16384.0;

/// Trigger behaviour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FireMode {
    /// One shot per press
    #[default]
    Semi,
    /// Fires while held
    Automatic,
}

fn default_bullets_per_fire() -> u32 {
    1
}

fn default_force() -> f64 {
    1.5
}

fn default_bullet_radius() -> f64 {
    0.0762
}

/// Weapon definition as written in the definition file.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawWeaponDefinition {
    /// Unique name
    pub name: String,
    /// Rounds per clip
    pub clip_size: u32,
    /// Starting reserve for weapons without an ammo type
    #[serde(default)]
    pub reserve_ammo: u32,
    /// Ammo drawn from the carrier's pool
    #[serde(default)]
    pub ammo_type: AmmoType,
    /// Trigger behaviour
    #[serde(default)]
    pub fire_mode: FireMode,
    /// Primary shots per second (0 = unlimited)
    #[serde(default)]
    pub primary_rate: f64,
    /// Secondary uses per second (0 = unlimited)
    #[serde(default)]
    pub secondary_rate: f64,
    /// Reload duration in seconds
    #[serde(default)]
    pub reload_time: f64,
    /// Equip duration in seconds
    #[serde(default)]
    pub deploy_time: f64,
    /// Damage per pellet
    #[serde(default)]
    pub damage: f64,
    /// Falloff start in meters
    #[serde(default)]
    pub damage_falloff_start: f64,
    /// Falloff end in meters (0 = no falloff)
    #[serde(default)]
    pub damage_falloff_end: f64,
    /// Impulse multiplier
    #[serde(default = "default_force")]
    pub force: f64,
    /// Cone spread
    #[serde(default)]
    pub spread: f64,
    /// Pellets per shot
    #[serde(default = "default_bullets_per_fire")]
    pub bullets_per_fire: u32,
    /// Bullet radius in meters
    #[serde(default = "default_bullet_radius")]
    pub bullet_radius: f64,
    /// Horizontal kick range in degrees/second
    #[serde(default)]
    pub horizontal_recoil_range: f64,
    /// Vertical kick in degrees/second
    #[serde(default)]
    pub vertical_recoil: f64,
    /// How fast recoil recovers
    #[serde(default)]
    pub recoil_recovery_scale: f64,
    /// Reload on its own when the clip runs dry
    #[serde(default)]
    pub auto_reload: bool,
    /// Reloading never consumes ammo
    #[serde(default)]
    pub unlimited_reserve: bool,
    /// Draw tracers
    #[serde(default)]
    pub tracer: bool,
}

/// Validated weapon definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeaponDefinition {
    /// Unique name
    pub name: String,
    /// Rounds per clip
    pub clip_size: u32,
    /// Starting reserve for `AmmoType::None`
    pub reserve_ammo: u32,
    /// Ammo drawn from the carrier's pool
    pub ammo_type: AmmoType,
    /// Trigger behaviour
    pub fire_mode: FireMode,
    /// Primary shots per second
    pub primary_rate: Fixed,
    /// Secondary uses per second
    pub secondary_rate: Fixed,
    /// Reload seconds
    pub reload_time: Fixed,
    /// Deploy seconds
    pub deploy_time: Fixed,
    /// Damage per pellet
    pub damage: Fixed,
    /// Falloff start (m)
    pub damage_falloff_start: Fixed,
    /// Falloff end (m)
    pub damage_falloff_end: Fixed,
    /// Impulse multiplier
    pub force: Fixed,
    /// Cone spread
    pub spread: Fixed,
    /// Pellets per shot
    pub bullets_per_fire: u32,
    /// Bullet radius (m)
    pub bullet_radius: Fixed,
    /// Horizontal kick range (deg/s)
    pub horizontal_recoil_range: Fixed,
    /// Vertical kick (deg/s)
    pub vertical_recoil: Fixed,
    /// Recoil recovery multiplier
    pub recoil_recovery_scale: Fixed,
    /// Reloads itself when empty
    pub auto_reload: bool,
    /// Reload never consumes ammo
    pub unlimited_reserve: bool,
    /// Draws tracers
    pub tracer: bool,
}

/// Definition loading errors.
#[derive(Debug, Error)]
pub enum DefinitionError {
    /// File is not valid JSON for the definition schema.
    #[error("invalid definition file: {0}")]
    Parse(#[from] serde_json::Error),
    /// Weapon has an empty name.
    #[error("weapon with empty name")]
    EmptyName,
    /// Two weapons share a name.
    #[error("duplicate weapon '{0}'")]
    Duplicate(String),
    /// Clip size is zero.
    #[error("weapon '{0}': clip_size must be at least 1")]
    ZeroClip(String),
    /// Shot fires no pellets.
    #[error("weapon '{0}': bullets_per_fire must be at least 1")]
    ZeroPellets(String),
    /// Field is negative, NaN or too large for fixed-point.
    #[error("weapon '{weapon}': {field} = {value} is out of range")]
    OutOfRange {
        /// Weapon name
        weapon: String,
        /// Field name
        field: &'static str,
        /// Offending value
        value: f64,
    },
    /// Falloff window is inverted.
    #[error("weapon '{weapon}': damage_falloff_start ({start}) is past damage_falloff_end ({end})")]
    FalloffOrder {
        /// Weapon name
        weapon: String,
        /// Falloff start
        start: f64,
        /// Falloff end
        end: f64,
    },
}

fn non_negative(weapon: &str, field: &'static str, value: f64) -> Result<Fixed, DefinitionError> {
    if !value.is_finite() || !(0.0..=FIELD_LIMIT).contains(&value) {
        return Err(DefinitionError::OutOfRange {
            weapon: weapon.to_string(),
            field,
            value,
        });
    }
    Ok(to_fixed(value))
}

/// Zero disables rate limiting. Positive rates below `MIN_RATE` are rejected.
fn attack_rate(weapon: &str, field: &'static str, value: f64) -> Result<Fixed, DefinitionError> {
    let rate = non_negative(weapon, field, value)?;
    if value > 0.0 && value < MIN_RATE {
        return Err(DefinitionError::OutOfRange {
            weapon: weapon.to_string(),
            field,
            value,
        });
    }
    Ok(rate)
}

impl WeaponDefinition {
    /// Validate a raw definition.
    pub fn from_raw(raw: &RawWeaponDefinition) -> Result<Self, DefinitionError> {
        let name = raw.name.trim();
        if name.is_empty() {
            return Err(DefinitionError::EmptyName);
        }
        if raw.clip_size == 0 {
            return Err(DefinitionError::ZeroClip(name.to_string()));
        }
        if raw.bullets_per_fire == 0 {
            return Err(DefinitionError::ZeroPellets(name.to_string()));
        }
        if raw.damage_falloff_end > 0.0 && raw.damage_falloff_start > raw.damage_falloff_end {
            return Err(DefinitionError::FalloffOrder {
                weapon: name.to_string(),
                start: raw.damage_falloff_start,
                end: raw.damage_falloff_end,
            });
        }

        Ok(Self {
            name: name.to_string(),
            clip_size: raw.clip_size,
            reserve_ammo: raw.reserve_ammo,
            ammo_type: raw.ammo_type,
            fire_mode: raw.fire_mode,
            primary_rate: attack_rate(name, "primary_rate", raw.primary_rate)?,
            secondary_rate: attack_rate(name, "secondary_rate", raw.secondary_rate)?,
            reload_time: non_negative(name, "reload_time", raw.reload_time)?,
            deploy_time: non_negative(name, "deploy_time", raw.deploy_time)?,
            damage: non_negative(name, "damage", raw.damage)?,
            damage_falloff_start: non_negative(name, "damage_falloff_start", raw.damage_falloff_start)?,
            damage_falloff_end: non_negative(name, "damage_falloff_end", raw.damage_falloff_end)?,
            force: non_negative(name, "force", raw.force)?,
            spread: non_negative(name, "spread", raw.spread)?,
            bullets_per_fire: raw.bullets_per_fire,
            bullet_radius: non_negative(name, "bullet_radius", raw.bullet_radius)?,
            horizontal_recoil_range: non_negative(name, "horizontal_recoil_range", raw.horizontal_recoil_range)?,
            vertical_recoil: non_negative(name, "vertical_recoil", raw.vertical_recoil)?,
            recoil_recovery_scale: non_negative(name, "recoil_recovery_scale", raw.recoil_recovery_scale)?,
            auto_reload: raw.auto_reload,
            unlimited_reserve: raw.unlimited_reserve,
            tracer: raw.tracer,
        })
    }

    /// Minimum seconds between primary attacks, if rate limited.
    pub fn primary_interval(&self) -> Option<Fixed> {
        rate_interval(self.primary_rate)
    }

    /// Minimum seconds between secondary attacks, if rate limited.
    pub fn secondary_interval(&self) -> Option<Fixed> {
        rate_interval(self.secondary_rate)
    }
}

fn rate_interval(rate: Fixed) -> Option<Fixed> {
    if rate <= 0 {
        None
    } else {
        Some(fixed_div(FIXED_ONE, rate))
    }
}

#[derive(Deserialize)]
struct DefinitionFile {
    weapons: Vec<RawWeaponDefinition>,
}

/// Parse and validate a definition file, keyed by weapon name.
pub fn parse_definitions(json: &str) -> Result<BTreeMap<String, WeaponDefinition>, DefinitionError> {
    let file: DefinitionFile = serde_json::from_str(json)?;
    let mut definitions = BTreeMap::new();
    for raw in &file.weapons {
        let definition = WeaponDefinition::from_raw(raw)?;
        if definitions.contains_key(&definition.name) {
            return Err(DefinitionError::Duplicate(definition.name));
        }
        definitions.insert(definition.name.clone(), definition);
    }
    Ok(definitions)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: &str) -> RawWeaponDefinition {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_defaults() {
        let def = WeaponDefinition::from_raw(&raw(r#"{ "name": "pistol", "clip_size": 12 }"#)).unwrap();
        assert_eq!(def.fire_mode, FireMode::Semi);
        assert_eq!(def.ammo_type, AmmoType::None);
        assert_eq!(def.bullets_per_fire, 1);
        assert_eq!(def.force, to_fixed(1.5));
        assert_eq!(def.bullet_radius, to_fixed(0.0762));
        assert_eq!(def.primary_interval(), None);
    }

    #[test]
    fn test_rate_interval() {
        let def = WeaponDefinition::from_raw(&raw(
            r#"{ "name": "smg", "clip_size": 30, "fire_mode": "automatic", "primary_rate": 5.0 }"#,
        ))
        .unwrap();
        assert_eq!(def.fire_mode, FireMode::Automatic);
        assert_eq!(def.primary_interval(), Some(fixed_div(FIXED_ONE, to_fixed(5.0))));
    }

    #[test]
    fn test_rejects_inverted_falloff() {
        let err = WeaponDefinition::from_raw(&raw(
            r#"{ "name": "bad", "clip_size": 1, "damage_falloff_start": 30.0, "damage_falloff_end": 10.0 }"#,
        ))
        .unwrap_err();
        assert!(matches!(err, DefinitionError::FalloffOrder { .. }));
    }

    #[test]
    fn test_start_without_end_is_no_falloff() {
        // end <= 0 disables falloff, so the start is irrelevant
        let def = WeaponDefinition::from_raw(&raw(
            r#"{ "name": "ok", "clip_size": 1, "damage_falloff_start": 30.0 }"#,
        ));
        assert!(def.is_ok());
    }

    #[test]
    fn test_rejects_degenerate_values() {
        assert!(matches!(
            WeaponDefinition::from_raw(&raw(r#"{ "name": "x", "clip_size": 0 }"#)),
            Err(DefinitionError::ZeroClip(_))
        ));
        assert!(matches!(
            WeaponDefinition::from_raw(&raw(r#"{ "name": "x", "clip_size": 1, "bullets_per_fire": 0 }"#)),
            Err(DefinitionError::ZeroPellets(_))
        ));
        assert!(matches!(
            WeaponDefinition::from_raw(&raw(r#"{ "name": "x", "clip_size": 1, "damage": -5.0 }"#)),
            Err(DefinitionError::OutOfRange { field: "damage", .. })
        ));
        assert!(matches!(
            WeaponDefinition::from_raw(&raw(r#"{ "name": "x", "clip_size": 1, "reload_time": 1e9 }"#)),
            Err(DefinitionError::OutOfRange { field: "reload_time", .. })
        ));
        assert!(matches!(
            WeaponDefinition::from_raw(&raw(r#"{ "name": "  ", "clip_size": 1 }"#)),
            Err(DefinitionError::EmptyName)
        ));
    }

    #[test]
    fn test_rejects_unrepresentable_rates() {
        for rate in ["1e-6", "1.52587890625e-5", "3e-5"] {
            let json = format!(r#"{{ "name": "x", "clip_size": 1, "primary_rate": {rate} }}"#);
            assert!(matches!(
                WeaponDefinition::from_raw(&raw(&json)),
                Err(DefinitionError::OutOfRange { field: "primary_rate", .. })
            ));
        }
        assert!(matches!(
            WeaponDefinition::from_raw(&raw(r#"{ "name": "x", "clip_size": 1, "secondary_rate": 1e-9 }"#)),
            Err(DefinitionError::OutOfRange { field: "secondary_rate", .. })
        ));

        let slowest = WeaponDefinition::from_raw(&raw(
            r#"{ "name": "x", "clip_size": 1, "primary_rate": 6.103515625e-5 }"#,
        ))
        .unwrap();
        assert_eq!(slowest.primary_interval(), Some(16384 * FIXED_ONE));

        let unlimited = WeaponDefinition::from_raw(&raw(r#"{ "name": "x", "clip_size": 1 }"#)).unwrap();
        assert_eq!(unlimited.primary_interval(), None);
    }

    #[test]
    fn test_parse_file() {
        let json = r#"{ "weapons": [
            { "name": "pistol", "clip_size": 12, "ammo_type": "pistol" },
            { "name": "revolver", "clip_size": 1, "auto_reload": true, "unlimited_reserve": true }
        ] }"#;
        let defs = parse_definitions(json).unwrap();
        assert_eq!(defs.len(), 2);
        assert!(defs["revolver"].auto_reload);
        assert_eq!(defs["pistol"].ammo_type, AmmoType::Pistol);
    }

    #[test]
    fn test_parse_rejects_duplicates_and_unknown_fields() {
        let dup = r#"{ "weapons": [ { "name": "a", "clip_size": 1 }, { "name": "a", "clip_size": 2 } ] }"#;
        assert!(matches!(parse_definitions(dup), Err(DefinitionError::Duplicate(_))));

        let typo = r#"{ "weapons": [ { "name": "a", "clip_sise": 1 } ] }"#;
        assert!(matches!(parse_definitions(typo), Err(DefinitionError::Parse(_))));
    }

    #[test]
    fn test_shipped_definitions_load() {
        let defs = parse_definitions(include_str!("../../assets/weapons.json")).unwrap();
        assert!(defs.contains_key("revolver"));
        assert!(defs.values().all(|d| d.clip_size > 0));
    }
}
