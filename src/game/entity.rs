//! Entity model - vehicles, pickups, derived stats

use glam::Vec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::math::Aabb;

use super::combat::WeaponKind;
use super::ControlIntent;

/// Vehicle hull half extents. All classes share a hull; the class only
/// changes the stat quadruple.
pub const VEHICLE_HALF_EXTENTS: Vec3 = Vec3::new(1.6, 1.0, 2.4);

/// Vehicle classes available to players
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleClass {
    /// Fast but fragile
    Scorcher,
    /// Slow but heavily armored
    Bulwark,
    /// Balanced stats
    Raider,
    /// High damage, middling everything else
    Tempest,
}

impl Default for VehicleClass {
    fn default() -> Self {
        Self::Raider
    }
}

impl TryFrom<&str> for VehicleClass {
    type Error = EntityError;

    fn try_from(raw: &str) -> Result<Self, Self::Error> {
        match raw {
            "scorcher" => Ok(Self::Scorcher),
            "bulwark" => Ok(Self::Bulwark),
            "raider" => Ok(Self::Raider),
            "tempest" => Ok(Self::Tempest),
            _ => Err(EntityError::UnknownVehicleClass(raw.to_string())),
        }
    }
}

/// Base stat quadruple per class. Values are on a 1-5 scale.
#[derive(Debug, Clone, Copy)]
pub struct ClassStats {
    pub speed: f32,
    pub armor: f32,
    pub damage: f32,
    pub handling: f32,
}

impl ClassStats {
    pub fn for_class(class: VehicleClass) -> Self {
        match class {
            VehicleClass::Scorcher => Self {
                speed: 5.0,
                armor: 1.0,
                damage: 2.0,
                handling: 4.0,
            },
            VehicleClass::Bulwark => Self {
                speed: 2.0,
                armor: 5.0,
                damage: 3.0,
                handling: 2.0,
            },
            VehicleClass::Raider => Self {
                speed: 3.0,
                armor: 3.0,
                damage: 3.0,
                handling: 3.0,
            },
            VehicleClass::Tempest => Self {
                speed: 3.0,
                armor: 2.0,
                damage: 5.0,
                handling: 3.0,
            },
        }
    }

    /// Derived maximum health: 100 plus 20 per armor point.
    pub fn max_health(&self) -> f32 {
        100.0 + self.armor * 20.0
    }

    /// Derived top speed in map units per second.
    pub fn max_speed(&self) -> f32 {
        10.0 + self.speed * 2.0
    }

    /// Derived acceleration in units per second squared.
    pub fn acceleration(&self) -> f32 {
        8.0 + self.speed * 2.0
    }

    /// Derived turn rate in radians per second.
    pub fn turn_rate(&self) -> f32 {
        1.5 + self.handling * 0.4
    }

    /// Fraction of incoming damage absorbed by armor, capped below 1
    /// so damage always lands.
    pub fn damage_reduction(&self) -> f32 {
        (self.armor * 0.06).min(0.95)
    }

    /// Outgoing damage multiplier from the damage stat.
    pub fn damage_multiplier(&self) -> f32 {
        0.7 + self.damage * 0.1
    }
}

/// A carried weapon and its remaining ammunition.
/// `ammo == None` means unlimited (the machine gun).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WeaponSlot {
    pub kind: WeaponKind,
    pub ammo: Option<u32>,
}

/// A player- or AI-controlled vehicle (authoritative state)
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: Uuid,
    /// Owning player, or None for an AI drone
    pub owner: Option<Uuid>,
    pub class: VehicleClass,

    pub position: Vec3,
    pub rotation_y: f32,
    /// Velocity in units per second; y is unused for driving
    pub velocity: Vec3,
    /// Bounding volume, recomputed from position each tick
    pub bounds: Aabb,

    pub health: f32,

    pub weapons: Vec<WeaponSlot>,
    pub selected_weapon: usize,
    /// Earliest time (unix ms) the selected weapon may fire again
    pub weapon_ready_at: u64,

    /// Freeze/slow effect: velocity factor applied until the deadline
    pub slow_factor: f32,
    pub slow_until: u64,

    pub intent: ControlIntent,
    pub last_input_seq: u32,
}

impl Vehicle {
    pub fn new(
        id: Uuid,
        owner: Option<Uuid>,
        class: VehicleClass,
        position: Vec3,
        rotation_y: f32,
    ) -> Self {
        let stats = ClassStats::for_class(class);
        Self {
            id,
            owner,
            class,
            position,
            rotation_y,
            velocity: Vec3::ZERO,
            bounds: Aabb::from_center_half_extents(position, VEHICLE_HALF_EXTENTS),
            health: stats.max_health(),
            weapons: vec![WeaponSlot {
                kind: WeaponKind::MachineGun,
                ammo: None,
            }],
            selected_weapon: 0,
            weapon_ready_at: 0,
            slow_factor: 1.0,
            slow_until: 0,
            intent: ControlIntent::default(),
            last_input_seq: 0,
        }
    }

    pub fn stats(&self) -> ClassStats {
        ClassStats::for_class(self.class)
    }

    pub fn max_health(&self) -> f32 {
        self.stats().max_health()
    }

    pub fn is_destroyed(&self) -> bool {
        self.health <= 0.0
    }

    /// Apply incoming damage after armor reduction. Health is clamped to
    /// [0, max_health] at the point of mutation. Returns true if this
    /// damage destroyed the vehicle.
    pub fn apply_damage(&mut self, amount: f32) -> bool {
        let reduction = self.stats().damage_reduction();
        let taken = amount.max(0.0) * (1.0 - reduction.min(1.0));
        self.health = (self.health - taken).clamp(0.0, self.max_health());
        self.health <= 0.0
    }

    pub fn heal_full(&mut self) {
        self.health = self.max_health();
    }

    pub fn heal(&mut self, amount: f32) {
        self.health = (self.health + amount.max(0.0)).clamp(0.0, self.max_health());
    }

    /// Grant a weapon, merging ammo into an existing slot of the same kind.
    pub fn grant_weapon(&mut self, kind: WeaponKind, ammo: u32) {
        if let Some(slot) = self.weapons.iter_mut().find(|s| s.kind == kind) {
            if let Some(count) = slot.ammo.as_mut() {
                *count += ammo;
            }
            return;
        }
        self.weapons.push(WeaponSlot {
            kind,
            ammo: Some(ammo),
        });
    }

    /// Cycle to the next weapon slot that still has ammunition.
    pub fn switch_weapon(&mut self) {
        let slots = self.weapons.len();
        for step in 1..=slots {
            let idx = (self.selected_weapon + step) % slots;
            if self.weapons[idx].ammo.map_or(true, |a| a > 0) {
                self.selected_weapon = idx;
                return;
            }
        }
    }

    pub fn selected_kind(&self) -> WeaponKind {
        self.weapons[self.selected_weapon].kind
    }

    /// Spend one round from the selected weapon. Returns false when the
    /// magazine is empty; ammo never goes below zero.
    pub fn consume_ammo(&mut self) -> bool {
        match self.weapons[self.selected_weapon].ammo.as_mut() {
            None => true,
            Some(0) => false,
            Some(count) => {
                *count -= 1;
                true
            }
        }
    }

    pub fn apply_slow(&mut self, factor: f32, until: u64) {
        self.slow_factor = factor.clamp(0.05, 1.0);
        self.slow_until = until;
    }

    pub fn is_slowed(&self, now: u64) -> bool {
        now < self.slow_until
    }

    /// Top speed with any active freeze effect applied.
    pub fn effective_max_speed(&self, now: u64) -> f32 {
        let base = self.stats().max_speed();
        if self.is_slowed(now) {
            base * self.slow_factor
        } else {
            base
        }
    }

    pub fn refresh_bounds(&mut self) {
        self.bounds = Aabb::from_center_half_extents(self.position, VEHICLE_HALF_EXTENTS);
    }
}

/// Pickup kinds spawned around the map and as boss-defeat rewards
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PickupKind {
    WeaponGrant { weapon: WeaponKind, ammo: u32 },
    FullHeal,
}

/// A collectible pickup on the arena floor
#[derive(Debug, Clone)]
pub struct Pickup {
    pub id: Uuid,
    pub kind: PickupKind,
    pub position: Vec3,
    pub spawned_at: u64,
    /// Lifetime in milliseconds before the pickup despawns
    pub lifetime_ms: u64,
}

impl Pickup {
    pub fn new(kind: PickupKind, position: Vec3, now: u64, lifetime_ms: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            position,
            spawned_at: now,
            lifetime_ms,
        }
    }

    pub fn is_expired(&self, now: u64) -> bool {
        now.saturating_sub(self.spawned_at) >= self.lifetime_ms
    }
}

/// Effect applied to a vehicle on pickup collection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum AppliedEffect {
    WeaponGranted { weapon: WeaponKind, ammo: u32 },
    Healed,
}

/// Construction-time errors for wire-supplied kinds. These are fatal to
/// the requesting operation, never to the simulation.
#[derive(Debug, thiserror::Error)]
pub enum EntityError {
    #[error("unknown vehicle class: {0:?}")]
    UnknownVehicleClass(String),

    #[error("unknown weapon kind: {0:?}")]
    UnknownWeaponKind(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicle(class: VehicleClass) -> Vehicle {
        Vehicle::new(Uuid::new_v4(), Some(Uuid::new_v4()), class, Vec3::ZERO, 0.0)
    }

    #[test]
    fn max_health_derives_from_armor() {
        assert_eq!(ClassStats::for_class(VehicleClass::Scorcher).max_health(), 120.0);
        assert_eq!(ClassStats::for_class(VehicleClass::Bulwark).max_health(), 200.0);
    }

    #[test]
    fn health_is_clamped_at_mutation() {
        let mut v = vehicle(VehicleClass::Raider);
        v.apply_damage(1e9);
        assert_eq!(v.health, 0.0);
        v.heal(1e9);
        assert_eq!(v.health, v.max_health());
        // Negative damage must not heal.
        let before = v.health;
        v.apply_damage(-50.0);
        assert_eq!(v.health, before);
    }

    #[test]
    fn armor_reduction_is_monotonic() {
        let mut light = vehicle(VehicleClass::Scorcher);
        let mut heavy = vehicle(VehicleClass::Bulwark);
        let light_full = light.max_health();
        let heavy_full = heavy.max_health();

        light.apply_damage(40.0);
        heavy.apply_damage(40.0);

        let light_delta = light_full - light.health;
        let heavy_delta = heavy_full - heavy.health;
        assert!(heavy_delta <= light_delta);
        assert!(heavy_delta > 0.0);
    }

    #[test]
    fn switch_weapon_skips_empty_slots() {
        let mut v = vehicle(VehicleClass::Raider);
        v.grant_weapon(WeaponKind::HomingMissile, 0);
        v.grant_weapon(WeaponKind::Mortar, 2);

        v.switch_weapon();
        // Missile slot is empty, lands on the mortar.
        assert_eq!(v.selected_kind(), WeaponKind::Mortar);

        assert!(v.consume_ammo());
        assert!(v.consume_ammo());
        assert!(!v.consume_ammo());
        assert_eq!(v.weapons[v.selected_weapon].ammo, Some(0));
    }

    #[test]
    fn machine_gun_never_runs_dry() {
        let mut v = vehicle(VehicleClass::Raider);
        for _ in 0..1000 {
            assert!(v.consume_ammo());
        }
    }

    #[test]
    fn slow_effect_expires() {
        let mut v = vehicle(VehicleClass::Raider);
        let base = v.stats().max_speed();
        v.apply_slow(0.5, 1_000);
        assert_eq!(v.effective_max_speed(500), base * 0.5);
        assert_eq!(v.effective_max_speed(1_000), base);
    }

    #[test]
    fn unknown_class_is_a_construction_error() {
        assert!(VehicleClass::try_from("hovercraft").is_err());
        assert!(matches!(
            VehicleClass::try_from("bulwark"),
            Ok(VehicleClass::Bulwark)
        ));
    }
}
