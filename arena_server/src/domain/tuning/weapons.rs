// Weapon content table. Immutable after construction.

use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WeaponKind {
    Pistol,
    Uzi,
    Ak47,
    Shotgun,
    Katana,
    Bat,
}

impl WeaponKind {
    pub const ALL: [WeaponKind; 6] = [
        WeaponKind::Pistol,
        WeaponKind::Uzi,
        WeaponKind::Ak47,
        WeaponKind::Shotgun,
        WeaponKind::Katana,
        WeaponKind::Bat,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WeaponKind::Pistol => "pistol",
            WeaponKind::Uzi => "uzi",
            WeaponKind::Ak47 => "ak47",
            WeaponKind::Shotgun => "shotgun",
            WeaponKind::Katana => "katana",
            WeaponKind::Bat => "bat",
        }
    }

    /// Case-insensitive lookup by wire/content name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(name.trim()))
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for WeaponKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aim kick applied per shot, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecoilSpec {
    pub vertical_per_shot: f32,
    pub horizontal_per_shot: f32,
    /// Seconds without firing before accumulated recoil resets.
    pub recovery_time: f32,
    pub max_accumulation: f32,
}

/// Slowest accepted weapon: one shot every 100 s.
pub const MIN_FIRE_RATE: f32 = 0.01;

#[derive(Debug, Clone, PartialEq)]
pub struct WeaponSpec {
    pub kind: WeaponKind,
    /// Damage per shot (shared across pellets) or per melee swing.
    pub damage: i32,
    /// Shots or swings per second.
    pub fire_rate: f32,
    /// Rounds per magazine; zero marks a melee weapon.
    pub magazine_size: u32,
    pub reload_time: Duration,
    pub projectile_speed: f32,
    pub range: f32,
    /// Melee swing arc, or the pellet cone for multi-pellet weapons.
    pub arc_degrees: f32,
    pub knockback_distance: f32,
    /// Random +/- aim deviation applied while moving.
    pub spread_degrees: f32,
    pub pellets: u32,
    /// Resolved instantly against rewound positions instead of spawning projectiles.
    pub hitscan: bool,
    pub recoil: Option<RecoilSpec>,
}

impl WeaponSpec {
    pub fn is_melee(&self) -> bool {
        self.magazine_size == 0
    }

    /// Minimum time between two shots or swings.
    pub fn cooldown(&self) -> Duration {
        Duration::try_from_secs_f32(1.0 / self.fire_rate).unwrap_or(Duration::MAX)
    }

    /// Damage carried by each pellet of one shot.
    pub fn pellet_damage(&self) -> i32 {
        let pellets = self.pellets.max(1) as f32;
        ((self.damage as f32) / pellets).round().max(1.0) as i32
    }

    fn validate(&self) -> Result<(), ContentError> {
        let invalid = |reason: &'static str| ContentError::InvalidWeapon {
            kind: self.kind,
            reason,
        };
        if self.damage <= 0 {
            return Err(invalid("damage must be positive"));
        }
        if !(self.fire_rate.is_finite() && self.fire_rate > 0.0) {
            return Err(invalid("fire rate must be positive"));
        }
        if self.fire_rate < MIN_FIRE_RATE {
            return Err(invalid("fire rate is below the minimum of 0.01 per second"));
        }
        if !(self.range.is_finite() && self.range > 0.0) {
            return Err(invalid("range must be positive"));
        }
        if !self.is_melee() && !self.hitscan && self.projectile_speed <= 0.0 {
            return Err(invalid("ranged weapon needs a positive projectile speed"));
        }
        if self.is_melee() && self.arc_degrees <= 0.0 {
            return Err(invalid("melee weapon needs a positive arc"));
        }
        if self.pellets == 0 {
            return Err(invalid("pellet count must be at least one"));
        }
        if let Some(recoil) = self.recoil
            && (recoil.recovery_time <= 0.0 || recoil.max_accumulation <= 0.0)
        {
            return Err(invalid("recoil recovery and accumulation must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("weapon table is missing an entry for {0}")]
    MissingWeapon(WeaponKind),
    #[error("weapon table lists {0} more than once")]
    DuplicateWeapon(WeaponKind),
    #[error("unknown weapon name {0:?}")]
    UnknownWeapon(String),
    #[error("invalid {kind} entry: {reason}")]
    InvalidWeapon {
        kind: WeaponKind,
        reason: &'static str,
    },
}

/// Lookup table holding exactly one validated spec per `WeaponKind`.
#[derive(Debug, Clone)]
pub struct WeaponTable {
    specs: Vec<WeaponSpec>,
}

impl WeaponTable {
    /// Builds a table from an unordered list, requiring every kind exactly once.
    pub fn from_specs(specs: Vec<WeaponSpec>) -> Result<Self, ContentError> {
        let mut slots: Vec<Option<WeaponSpec>> = vec![None; WeaponKind::ALL.len()];
        for spec in specs {
            spec.validate()?;
            let slot = &mut slots[spec.kind.index()];
            if slot.is_some() {
                return Err(ContentError::DuplicateWeapon(spec.kind));
            }
            *slot = Some(spec);
        }

        let specs = WeaponKind::ALL
            .into_iter()
            .zip(slots)
            .map(|(kind, slot)| slot.ok_or(ContentError::MissingWeapon(kind)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { specs })
    }

    pub fn get(&self, kind: WeaponKind) -> &WeaponSpec {
        &self.specs[kind.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &WeaponSpec> {
        self.specs.iter()
    }
}

impl Default for WeaponTable {
    fn default() -> Self {
        Self {
            specs: builtin_specs(),
        }
    }
}

fn builtin_specs() -> Vec<WeaponSpec> {
    let ranged = |kind, damage, fire_rate, magazine_size, reload_ms, range| WeaponSpec {
        kind,
        damage,
        fire_rate,
        magazine_size,
        reload_time: Duration::from_millis(reload_ms),
        projectile_speed: 800.0,
        range,
        arc_degrees: 0.0,
        knockback_distance: 0.0,
        spread_degrees: 0.0,
        pellets: 1,
        hitscan: false,
        recoil: None,
    };
    let melee = |kind, damage, fire_rate, range, knockback_distance| WeaponSpec {
        kind,
        damage,
        fire_rate,
        magazine_size: 0,
        reload_time: Duration::ZERO,
        projectile_speed: 0.0,
        range,
        arc_degrees: 90.0,
        knockback_distance,
        spread_degrees: 0.0,
        pellets: 1,
        hitscan: false,
        recoil: None,
    };

    // Ordered like WeaponKind::ALL.
    vec![
        ranged(WeaponKind::Pistol, 25, 3.0, 15, 1500, 800.0),
        WeaponSpec {
            spread_degrees: 5.0,
            recoil: Some(RecoilSpec {
                vertical_per_shot: 2.0,
                horizontal_per_shot: 0.0,
                recovery_time: 0.5,
                max_accumulation: 20.0,
            }),
            ..ranged(WeaponKind::Uzi, 8, 10.0, 30, 1500, 600.0)
        },
        WeaponSpec {
            spread_degrees: 3.0,
            hitscan: true,
            recoil: Some(RecoilSpec {
                vertical_per_shot: 1.5,
                horizontal_per_shot: 3.0,
                recovery_time: 0.6,
                max_accumulation: 15.0,
            }),
            ..ranged(WeaponKind::Ak47, 20, 6.0, 30, 2000, 800.0)
        },
        WeaponSpec {
            arc_degrees: 15.0,
            pellets: 8,
            ..ranged(WeaponKind::Shotgun, 60, 1.0, 6, 2500, 300.0)
        },
        melee(WeaponKind::Katana, 45, 1.25, 80.0, 0.0),
        melee(WeaponKind::Bat, 25, 2.0, 64.0, 40.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_saturates_instead_of_overflowing() {
        let mut spec = WeaponTable::default().get(WeaponKind::Pistol).clone();
        spec.fire_rate = 1e-30;
        assert_eq!(spec.cooldown(), Duration::MAX);
        assert!(spec.validate().is_err());
    }

    #[test]
    fn builtin_table_is_valid_and_complete() {
        let table = WeaponTable::from_specs(builtin_specs()).expect("builtin table valid");
        for kind in WeaponKind::ALL {
            assert_eq!(table.get(kind).kind, kind);
        }
        assert!(table.get(WeaponKind::Bat).is_melee());
        assert!(!table.get(WeaponKind::Pistol).is_melee());
        assert_eq!(table.get(WeaponKind::Pistol).magazine_size, 15);
    }

    #[test]
    fn missing_and_duplicate_entries_are_rejected() {
        let mut specs = builtin_specs();
        specs.pop();
        assert!(matches!(
            WeaponTable::from_specs(specs),
            Err(ContentError::MissingWeapon(WeaponKind::Bat))
        ));

        let mut specs = builtin_specs();
        specs.push(specs[0].clone());
        assert!(matches!(
            WeaponTable::from_specs(specs),
            Err(ContentError::DuplicateWeapon(WeaponKind::Pistol))
        ));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut specs = builtin_specs();
        specs[0].fire_rate = 0.0;
        assert!(matches!(
            WeaponTable::from_specs(specs),
            Err(ContentError::InvalidWeapon { kind: WeaponKind::Pistol, .. })
        ));
    }

    #[test]
    fn shotgun_splits_damage_across_pellets() {
        let table = WeaponTable::default();
        assert_eq!(table.get(WeaponKind::Shotgun).pellet_damage(), 8);
        assert_eq!(table.get(WeaponKind::Pistol).pellet_damage(), 25);
    }

    #[test]
    fn kind_parse_is_case_insensitive() {
        assert_eq!(WeaponKind::parse("AK47"), Some(WeaponKind::Ak47));
        assert_eq!(WeaponKind::parse("laser"), None);
    }
}
