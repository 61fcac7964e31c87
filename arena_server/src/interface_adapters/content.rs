// JSON weapon content loading. The resulting table is immutable for the process lifetime.

use crate::domain::tuning::weapons::ContentError;
use crate::domain::tuning::{RecoilSpec, WeaponKind, WeaponSpec, WeaponTable};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ContentLoadError {
    #[error("failed to read weapon config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("weapon config is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] ContentError),
}

/// Top-level weapon config document.
#[derive(Debug, Deserialize)]
struct WeaponConfigFile {
    #[serde(default)]
    version: Option<String>,
    // Keyed by weapon name, matched case-insensitively.
    weapons: BTreeMap<String, WeaponConfigDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecoilDto {
    vertical_per_shot: f32,
    horizontal_per_shot: f32,
    recovery_time: f32,
    max_accumulation: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WeaponConfigDto {
    damage: i32,
    fire_rate: f32,
    magazine_size: u32,
    #[serde(default)]
    reload_time_ms: u64,
    #[serde(default)]
    projectile_speed: f32,
    range: f32,
    #[serde(default)]
    arc_degrees: f32,
    #[serde(default)]
    knockback_distance: f32,
    #[serde(default)]
    spread_degrees: f32,
    #[serde(default = "default_pellets")]
    pellets: u32,
    #[serde(default)]
    hitscan: bool,
    #[serde(default)]
    recoil: Option<RecoilDto>,
}

fn default_pellets() -> u32 {
    1
}

impl WeaponConfigDto {
    fn into_spec(self, kind: WeaponKind) -> WeaponSpec {
        WeaponSpec {
            kind,
            damage: self.damage,
            fire_rate: self.fire_rate,
            magazine_size: self.magazine_size,
            reload_time: Duration::from_millis(self.reload_time_ms),
            projectile_speed: self.projectile_speed,
            range: self.range,
            arc_degrees: self.arc_degrees,
            knockback_distance: self.knockback_distance,
            spread_degrees: self.spread_degrees,
            pellets: self.pellets,
            hitscan: self.hitscan,
            recoil: self.recoil.map(|r| RecoilSpec {
                vertical_per_shot: r.vertical_per_shot,
                horizontal_per_shot: r.horizontal_per_shot,
                recovery_time: r.recovery_time,
                max_accumulation: r.max_accumulation,
            }),
        }
    }
}

/// Parses and validates a weapon table. Every weapon kind must appear exactly once.
pub fn parse_weapon_table(json: &str) -> Result<WeaponTable, ContentLoadError> {
    let file: WeaponConfigFile = serde_json::from_str(json)?;
    let specs = file
        .weapons
        .into_iter()
        .map(|(name, dto)| {
            WeaponKind::parse(&name)
                .map(|kind| dto.into_spec(kind))
                .ok_or(ContentError::UnknownWeapon(name))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let table = WeaponTable::from_specs(specs)?;
    tracing::debug!(version = file.version.as_deref().unwrap_or("unversioned"), "weapon table parsed");
    Ok(table)
}

pub fn load_weapon_table(path: &Path) -> Result<WeaponTable, ContentLoadError> {
    let json = std::fs::read_to_string(path).map_err(|source| ContentLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_weapon_table(&json)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{
        "version": "1.0.0",
        "weapons": {
            "Pistol":  { "damage": 25, "fireRate": 3.0, "magazineSize": 15, "reloadTimeMs": 1500, "projectileSpeed": 800, "range": 800, "visuals": { "muzzleFlashColor": "0xffdd00" } },
            "Uzi":     { "damage": 8, "fireRate": 10.0, "magazineSize": 30, "reloadTimeMs": 1500, "projectileSpeed": 800, "range": 600, "spreadDegrees": 5,
                         "recoil": { "verticalPerShot": 2, "horizontalPerShot": 0, "recoveryTime": 0.5, "maxAccumulation": 20 } },
            "AK47":    { "damage": 20, "fireRate": 6.0, "magazineSize": 30, "reloadTimeMs": 2000, "range": 800, "hitscan": true },
            "Shotgun": { "damage": 60, "fireRate": 1.0, "magazineSize": 6, "reloadTimeMs": 2500, "projectileSpeed": 800, "range": 300, "arcDegrees": 15, "pellets": 8 },
            "Katana":  { "damage": 45, "fireRate": 1.25, "magazineSize": 0, "range": 80, "arcDegrees": 90 },
            "Bat":     { "damage": 25, "fireRate": 2.0, "magazineSize": 0, "range": 64, "arcDegrees": 90, "knockbackDistance": 40 }
        }
    }"#;

    #[test]
    fn parses_a_complete_table() {
        let table = parse_weapon_table(FULL).expect("valid table");
        let uzi = table.get(WeaponKind::Uzi);
        assert_eq!(uzi.magazine_size, 30);
        assert_eq!(uzi.recoil.map(|r| r.max_accumulation), Some(20.0));
        assert!(table.get(WeaponKind::Ak47).hitscan);
        assert_eq!(table.get(WeaponKind::Shotgun).pellets, 8);
        assert_eq!(table.get(WeaponKind::Pistol).pellets, 1);
        assert_eq!(table.get(WeaponKind::Bat).knockback_distance, 40.0);
    }

    #[test]
    fn rejects_unknown_and_missing_weapons() {
        let unknown = FULL.replace("\"Bat\"", "\"Rocket\"");
        assert!(matches!(
            parse_weapon_table(&unknown),
            Err(ContentLoadError::Invalid(ContentError::UnknownWeapon(name))) if name == "Rocket"
        ));

        let missing = r#"{ "weapons": { "Pistol": { "damage": 25, "fireRate": 3.0, "magazineSize": 15, "projectileSpeed": 800, "range": 800 } } }"#;
        assert!(matches!(
            parse_weapon_table(missing),
            Err(ContentLoadError::Invalid(ContentError::MissingWeapon(_)))
        ));
    }

    #[test]
    fn rejects_invalid_values_and_bad_json() {
        let zero_rate = FULL.replace("\"fireRate\": 3.0", "\"fireRate\": 0");
        assert!(matches!(
            parse_weapon_table(&zero_rate),
            Err(ContentLoadError::Invalid(ContentError::InvalidWeapon { kind: WeaponKind::Pistol, .. }))
        ));
        assert!(matches!(parse_weapon_table("{"), Err(ContentLoadError::Parse(_))));
    }

    #[test]
    fn rejects_fire_rates_too_small_for_a_cooldown() {
        let tiny = FULL.replace("\"fireRate\": 3.0", "\"fireRate\": 1e-30");
        assert!(matches!(
            parse_weapon_table(&tiny),
            Err(ContentLoadError::Invalid(ContentError::InvalidWeapon { kind: WeaponKind::Pistol, .. }))
        ));

        let slowest = FULL.replace("\"fireRate\": 3.0", "\"fireRate\": 0.01");
        let table = parse_weapon_table(&slowest).expect("minimum rate is accepted");
        assert!(table.get(WeaponKind::Pistol).cooldown() >= Duration::from_secs(99));
    }

    #[test]
    fn missing_file_reports_the_path() {
        let err = load_weapon_table(Path::new("/nonexistent/weapons.json")).expect_err("missing file");
        assert!(err.to_string().contains("/nonexistent/weapons.json"));
    }
}
