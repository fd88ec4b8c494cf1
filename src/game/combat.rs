//! Combat system - weapons, projectiles, area damage

use glam::Vec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::math::{flatten, EPSILON_SQ};

use super::entity::EntityError;

/// Hard cap on how far any projectile may travel before retirement.
pub const MAX_TRAVEL_DISTANCE: f32 = 220.0;
/// Downward acceleration during a ballistic shell's guidance phase.
pub const BALLISTIC_GRAVITY: f32 = 22.0;
/// Altitude below which a ballistic shell detonates.
pub const BALLISTIC_GROUND_EPS: f32 = 0.6;
/// Horizontal speed the weakening guidance blends the shell toward.
pub const BALLISTIC_GUIDANCE_SPEED: f32 = 14.0;
/// Guidance blend rate per second at full strength.
pub const BALLISTIC_GUIDANCE_RATE: f32 = 2.5;
/// Seconds over which ballistic guidance decays to zero.
pub const BALLISTIC_GUIDANCE_DECAY_SECS: f32 = 3.0;
/// Proximity threshold for direct and homing projectile hits.
pub const HIT_RADIUS: f32 = 1.8;
/// Freeze effect applied by homing missile hits.
pub const FREEZE_FACTOR: f32 = 0.45;
pub const FREEZE_DURATION_MS: u64 = 2_500;

/// Weapon kinds carried by vehicles and the boss
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponKind {
    /// Unlimited-ammo direct fire
    MachineGun,
    /// Curves toward a live target, freezes on hit
    HomingMissile,
    /// Ballistic shell with area damage and burning ground
    Mortar,
    /// Short-range direct-fire cone, boss mid-range weapon
    Flamethrower,
    /// Boss contact charge; no projectile, resolved as direct damage
    Ram,
}

impl TryFrom<&str> for WeaponKind {
    type Error = EntityError;

    fn try_from(raw: &str) -> Result<Self, Self::Error> {
        match raw {
            "machine_gun" => Ok(Self::MachineGun),
            "homing_missile" => Ok(Self::HomingMissile),
            "mortar" => Ok(Self::Mortar),
            "flamethrower" => Ok(Self::Flamethrower),
            "ram" => Ok(Self::Ram),
            _ => Err(EntityError::UnknownWeaponKind(raw.to_string())),
        }
    }
}

/// Weapon tuning per kind
#[derive(Debug, Clone, Copy)]
pub struct WeaponStats {
    /// Damage per hit (for mortars, damage at blast center)
    pub damage: f32,
    /// Projectile speed
    pub projectile_speed: f32,
    /// Cooldown between shots (milliseconds)
    pub cooldown_ms: u64,
    /// Projectile lifetime (seconds)
    pub lifetime: f32,
    /// Homing turn rate (direction lerp per second)
    pub turn_rate: f32,
    /// Area-of-effect radius (mortar only)
    pub blast_radius: f32,
    /// Launch phase duration before guidance kicks in (mortar only)
    pub launch_duration_ms: u64,
}

impl WeaponStats {
    pub fn for_kind(kind: WeaponKind) -> Self {
        match kind {
            WeaponKind::MachineGun => Self {
                damage: 6.0,
                projectile_speed: 40.0,
                cooldown_ms: 180,
                lifetime: 1.2,
                turn_rate: 0.0,
                blast_radius: 0.0,
                launch_duration_ms: 0,
            },
            WeaponKind::HomingMissile => Self {
                damage: 25.0,
                projectile_speed: 22.0,
                cooldown_ms: 1_500,
                lifetime: 5.0,
                turn_rate: 3.5,
                blast_radius: 0.0,
                launch_duration_ms: 0,
            },
            WeaponKind::Mortar => Self {
                damage: 100.0,
                projectile_speed: 26.0,
                cooldown_ms: 3_000,
                lifetime: 8.0,
                turn_rate: 0.0,
                blast_radius: 15.0,
                launch_duration_ms: 500,
            },
            WeaponKind::Flamethrower => Self {
                damage: 4.0,
                projectile_speed: 18.0,
                cooldown_ms: 120,
                lifetime: 0.35,
                turn_rate: 0.0,
                blast_radius: 0.0,
                launch_duration_ms: 0,
            },
            WeaponKind::Ram => Self {
                damage: 30.0,
                projectile_speed: 0.0,
                cooldown_ms: 4_000,
                lifetime: 0.0,
                turn_rate: 0.0,
                blast_radius: 0.0,
                launch_duration_ms: 0,
            },
        }
    }
}

/// Kind-specific projectile behavior
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectileKind {
    /// Straight-line constant-speed travel
    Direct,
    /// Velocity lerped toward the target each tick, speed preserved
    Homing { target: Uuid, turn_rate: f32 },
    /// Launch phase, then gravity plus weakening guidance to impact point
    Ballistic {
        impact_point: Vec3,
        launch_until: u64,
        blast_radius: f32,
    },
}

/// Outcome of advancing a projectile by one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectileStep {
    Flying,
    /// Retired without impact (lifetime, travel cap, degenerate motion)
    Expired,
    /// Ballistic shell crossed the ground threshold
    Detonate,
}

/// Active projectile in the arena
#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: Uuid,
    pub owner: Uuid,
    pub kind: ProjectileKind,
    pub position: Vec3,
    pub velocity: Vec3,
    pub damage: f32,
    pub spawn_time: u64,
    pub lifetime: f32,
    pub traveled: f32,
}

impl Projectile {
    /// Straight-line projectile. Returns None for a degenerate direction.
    pub fn direct(owner: Uuid, origin: Vec3, dir: Vec3, damage: f32, stats: &WeaponStats, now: u64) -> Option<Self> {
        if dir.length_squared() < EPSILON_SQ {
            return None;
        }
        let dir = dir.normalize();
        Some(Self {
            id: Uuid::new_v4(),
            owner,
            kind: ProjectileKind::Direct,
            position: origin,
            velocity: dir * stats.projectile_speed,
            damage,
            spawn_time: now,
            lifetime: stats.lifetime,
            traveled: 0.0,
        })
    }

    /// Homing projectile locked to `target` at spawn time. The target is a
    /// weak reference: the arena re-resolves it each tick and a stale id
    /// simply means the missile flies straight until it expires.
    pub fn homing(owner: Uuid, origin: Vec3, dir: Vec3, target: Uuid, damage: f32, stats: &WeaponStats, now: u64) -> Option<Self> {
        let mut p = Self::direct(owner, origin, dir, damage, stats, now)?;
        p.kind = ProjectileKind::Homing {
            target,
            turn_rate: stats.turn_rate,
        };
        Some(p)
    }

    /// Ballistic shell launched toward a precomputed impact point.
    pub fn ballistic(owner: Uuid, origin: Vec3, impact_point: Vec3, damage: f32, stats: &WeaponStats, now: u64) -> Self {
        let toward = flatten(impact_point - origin);
        let lateral = if toward.length_squared() < EPSILON_SQ {
            Vec3::ZERO
        } else {
            toward.normalize() * (stats.projectile_speed * 0.25)
        };
        // Mostly-vertical launch; guidance takes over after launch_until.
        let velocity = Vec3::new(lateral.x, stats.projectile_speed, lateral.z);
        Self {
            id: Uuid::new_v4(),
            owner,
            kind: ProjectileKind::Ballistic {
                impact_point,
                launch_until: now + stats.launch_duration_ms,
                blast_radius: stats.blast_radius,
            },
            position: origin,
            velocity,
            damage,
            spawn_time: now,
            lifetime: stats.lifetime,
            traveled: 0.0,
        }
    }

    /// Advance the projectile one tick. `target_pos` is the resolved
    /// position of the homing target, if it still exists.
    pub fn advance(&mut self, dt: f32, now: u64, target_pos: Option<Vec3>) -> ProjectileStep {
        if (now.saturating_sub(self.spawn_time)) as f32 / 1000.0 > self.lifetime {
            return ProjectileStep::Expired;
        }

        match self.kind {
            ProjectileKind::Direct => {}
            ProjectileKind::Homing { turn_rate, .. } => {
                if let Some(tp) = target_pos {
                    let desired = tp - self.position;
                    if desired.length_squared() >= EPSILON_SQ {
                        let speed = self.velocity.length();
                        if speed * speed >= EPSILON_SQ {
                            // Blend direction, preserve speed: the missile
                            // curves instead of snap-aiming.
                            let t = (turn_rate * dt).min(1.0);
                            let current = self.velocity / speed;
                            let blended = current.lerp(desired.normalize(), t);
                            if blended.length_squared() >= EPSILON_SQ {
                                self.velocity = blended.normalize() * speed;
                            }
                        }
                    }
                }
            }
            ProjectileKind::Ballistic {
                impact_point,
                launch_until,
                ..
            } => {
                if now >= launch_until {
                    self.velocity.y -= BALLISTIC_GRAVITY * dt;

                    // Weakening homing blend toward the impact point: the
                    // horizontal velocity is lerped toward the aim direction
                    // with a weight that decays to zero.
                    let elapsed = (now - launch_until) as f32 / 1000.0;
                    let decay = (1.0 - elapsed / BALLISTIC_GUIDANCE_DECAY_SECS).clamp(0.0, 1.0);
                    let steer = flatten(impact_point - self.position);
                    if steer.length_squared() >= EPSILON_SQ {
                        let desired = steer.normalize() * BALLISTIC_GUIDANCE_SPEED;
                        let w = (BALLISTIC_GUIDANCE_RATE * decay * dt).min(1.0);
                        let horizontal = flatten(self.velocity).lerp(desired, w);
                        self.velocity.x = horizontal.x;
                        self.velocity.z = horizontal.z;
                    }

                    if self.position.y <= BALLISTIC_GROUND_EPS && self.velocity.y < 0.0 {
                        return ProjectileStep::Detonate;
                    }
                }
            }
        }

        let step = self.velocity * dt;
        let step_len_sq = step.length_squared();
        // Degenerate direction guard: near-zero net displacement retires
        // the projectile instead of letting it idle forever.
        if step_len_sq < EPSILON_SQ {
            return ProjectileStep::Expired;
        }

        self.position += step;
        self.traveled += step_len_sq.sqrt();
        if self.traveled > MAX_TRAVEL_DISTANCE {
            return ProjectileStep::Expired;
        }

        ProjectileStep::Flying
    }

    /// Proximity hit test against a body center.
    pub fn check_hit(&self, target: Vec3, target_radius: f32) -> bool {
        let combined = HIT_RADIUS + target_radius;
        (target - self.position).length_squared() <= combined * combined
    }

    pub fn blast_radius(&self) -> f32 {
        match self.kind {
            ProjectileKind::Ballistic { blast_radius, .. } => blast_radius,
            _ => 0.0,
        }
    }
}

/// Area damage with linear distance falloff: full at the center, zero at
/// the blast edge.
pub fn falloff_damage(damage: f32, dist: f32, radius: f32) -> f32 {
    if radius <= 0.0 || dist >= radius {
        return 0.0;
    }
    damage * (1.0 - dist / radius)
}

/// A burning patch left behind by a mortar detonation. Reapplies a
/// fraction of the original damage at a fixed interval to anyone inside.
#[derive(Debug, Clone)]
pub struct GroundZone {
    pub id: Uuid,
    pub center: Vec3,
    pub radius: f32,
    pub damage_per_tick: f32,
    pub interval_ms: u64,
    pub next_apply_at: u64,
    pub expires_at: u64,
}

/// Fraction of the detonation damage each burn tick reapplies.
const BURN_FRACTION: f32 = 0.2;
const BURN_INTERVAL_MS: u64 = 1_000;
const BURN_DURATION_MS: u64 = 5_000;

impl GroundZone {
    pub fn new(center: Vec3, radius: f32, base_damage: f32, now: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            center,
            radius,
            damage_per_tick: base_damage * BURN_FRACTION,
            interval_ms: BURN_INTERVAL_MS,
            next_apply_at: now + BURN_INTERVAL_MS,
            expires_at: now + BURN_DURATION_MS,
        }
    }

    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at
    }

    /// Returns the damage to apply this tick, advancing the interval gate.
    pub fn poll_damage(&mut self, now: u64) -> Option<f32> {
        if now >= self.next_apply_at && !self.is_expired(now) {
            self.next_apply_at += self.interval_ms;
            Some(self.damage_per_tick)
        } else {
            None
        }
    }

    pub fn contains(&self, p: Vec3) -> bool {
        flatten(p - self.center).length_squared() <= self.radius * self.radius
    }
}
