//! Arena simulation context and per-tick orchestration.
//!
//! `ArenaState` owns every entity and is passed explicitly into each
//! component - there is no ambient global state. One `update` runs the
//! full tick in fixed order: vehicle driving -> wall/obstacle/pair
//! resolution -> boss AI -> projectile advance -> area/burn damage ->
//! pickups.

use std::collections::HashMap;

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::math::{flatten, yaw_to_dir, Aabb};
use crate::net::protocol::GameEvent;

use super::boss::{
    AiPolicy, Boss, BossAttack, BossState, BOSS_CONTACT_DAMAGE_MULT, BOSS_HALF_EXTENTS, BOSS_MASS,
};
use super::combat::{
    falloff_damage, GroundZone, Projectile, ProjectileKind, ProjectileStep, WeaponKind,
    WeaponStats, FREEZE_DURATION_MS, FREEZE_FACTOR,
};
use super::entity::{
    AppliedEffect, Pickup, PickupKind, Vehicle, VehicleClass, VEHICLE_HALF_EXTENTS,
};
use super::physics::{
    self, resolve_pair, Body, MapBounds, CONTACT_DAMAGE_COOLDOWN_MS,
};
use super::ControlIntent;

/// Interval between pickup spawn-point refreshes.
const PICKUP_REFRESH_MS: u64 = 15_000;
/// Lifetime of a map pickup before it despawns.
const PICKUP_LIFETIME_MS: u64 = 30_000;
/// Collection range between a vehicle and a pickup.
const PICKUP_COLLECT_RADIUS: f32 = 2.5;
/// How far ahead of the muzzle a projectile spawns.
const MUZZLE_OFFSET: f32 = 3.0;
/// Player mortar aim distance along the facing direction.
const MORTAR_AIM_DISTANCE: f32 = 30.0;

/// The authoritative simulation state for one arena
pub struct ArenaState {
    pub id: Uuid,
    pub seed: u64,
    pub tick: u64,
    pub bounds: MapBounds,
    pub obstacles: Vec<Aabb>,
    pub ai_policy: AiPolicy,

    pub vehicles: HashMap<Uuid, Vehicle>,
    pub boss: Option<Boss>,
    pub projectiles: Vec<Projectile>,
    pub pickups: Vec<Pickup>,
    pub ground_zones: Vec<GroundZone>,

    /// Single injectable randomness source for the whole simulation
    pub rng: ChaCha8Rng,

    /// Last contact-damage timestamp per colliding pair
    contact_cooldowns: HashMap<(Uuid, Uuid), u64>,
    pickup_spawn_points: Vec<Vec3>,
    next_pickup_refresh_at: u64,
    events: Vec<GameEvent>,
}

impl ArenaState {
    pub fn new(id: Uuid, seed: u64, bounds: MapBounds, ai_policy: AiPolicy) -> Self {
        let spread = bounds.half_extent * 0.5;
        Self {
            id,
            seed,
            tick: 0,
            bounds,
            obstacles: vec![
                Aabb::from_center_half_extents(Vec3::new(spread, 1.0, -spread), Vec3::new(4.0, 2.0, 4.0)),
                Aabb::from_center_half_extents(Vec3::new(-spread, 1.0, spread), Vec3::new(4.0, 2.0, 4.0)),
            ],
            ai_policy,
            vehicles: HashMap::new(),
            boss: None,
            projectiles: Vec::new(),
            pickups: Vec::new(),
            ground_zones: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            contact_cooldowns: HashMap::new(),
            pickup_spawn_points: vec![
                Vec3::new(spread, 0.0, spread),
                Vec3::new(-spread, 0.0, -spread),
                Vec3::new(spread * 0.4, 0.0, -spread),
                Vec3::new(-spread * 0.4, 0.0, spread),
            ],
            next_pickup_refresh_at: 0,
            events: Vec::new(),
        }
    }

    // ---- host command interface ----

    /// Create a vehicle at a random spawn position. Returns its id.
    pub fn spawn_vehicle(&mut self, owner: Option<Uuid>, class: VehicleClass) -> Uuid {
        let position = self.bounds.random_point(&mut self.rng);
        let rotation = self.rng.gen_range(0.0..std::f32::consts::TAU);
        let vehicle = Vehicle::new(Uuid::new_v4(), owner, class, position, rotation);
        let id = vehicle.id;
        self.vehicles.insert(id, vehicle);
        id
    }

    pub fn remove_vehicle(&mut self, id: Uuid) -> bool {
        self.vehicles.remove(&id).is_some()
    }

    /// Store a control intent to be consumed by the next tick. Out-of-order
    /// packets (stale seq) are dropped.
    pub fn apply_intent(&mut self, id: Uuid, seq: u32, intent: ControlIntent) {
        if let Some(v) = self.vehicles.get_mut(&id) {
            if seq > v.last_input_seq {
                v.last_input_seq = seq;
                v.intent = intent;
            }
        }
    }

    pub fn switch_weapon(&mut self, id: Uuid) {
        if let Some(v) = self.vehicles.get_mut(&id) {
            v.switch_weapon();
        }
    }

    /// Fire the vehicle's selected weapon. Returns the projectile handle,
    /// or None when the weapon is on cooldown, out of ammo, or the vehicle
    /// is unknown - all expected steady-state outcomes.
    pub fn fire_selected(&mut self, id: Uuid, now: u64) -> Option<Uuid> {
        let (kind, origin, dir, damage) = {
            let v = self.vehicles.get_mut(&id)?;
            let kind = v.selected_kind();
            // Ram is a boss contact attack, not a projectile; refuse before
            // ammo or cooldown are touched.
            if matches!(kind, WeaponKind::Ram) {
                return None;
            }
            let stats = WeaponStats::for_kind(kind);
            if now < v.weapon_ready_at {
                return None;
            }
            if !v.consume_ammo() {
                return None;
            }
            v.weapon_ready_at = now + stats.cooldown_ms;
            let dir = yaw_to_dir(v.rotation_y);
            let origin = v.position + dir * MUZZLE_OFFSET;
            let damage = stats.damage * v.stats().damage_multiplier();
            (kind, origin, dir, damage)
        };

        let stats = WeaponStats::for_kind(kind);
        let projectile = match kind {
            WeaponKind::MachineGun | WeaponKind::Flamethrower => {
                Projectile::direct(id, origin, dir, damage, &stats, now)
            }
            WeaponKind::HomingMissile => match self.homing_target_for(id) {
                Some(target) => Projectile::homing(id, origin, dir, target, damage, &stats, now),
                None => Projectile::direct(id, origin, dir, damage, &stats, now),
            },
            WeaponKind::Mortar => {
                let impact = self
                    .bounds
                    .clamp_point(origin + dir * MORTAR_AIM_DISTANCE);
                Some(Projectile::ballistic(id, origin, impact, damage, &stats, now))
            }
            // Rejected above.
            WeaponKind::Ram => None,
        }?;

        let handle = projectile.id;
        self.events.push(GameEvent::ProjectileSpawned {
            id: handle,
            owner: id,
            weapon: kind,
            x: projectile.position.x,
            y: projectile.position.y,
            z: projectile.position.z,
        });
        self.projectiles.push(projectile);
        Some(handle)
    }

    /// Damage a vehicle through the single damage-application entry point.
    /// Returns true if the vehicle was destroyed (and removed).
    pub fn damage_vehicle(&mut self, id: Uuid, amount: f32, attacker: Option<Uuid>) -> bool {
        let Some(v) = self.vehicles.get_mut(&id) else {
            // Stale reference: the vehicle disconnected mid-attack.
            return false;
        };
        let destroyed = v.apply_damage(amount);
        self.events.push(GameEvent::VehicleDamaged {
            id,
            amount,
            attacker,
        });
        if destroyed {
            self.vehicles.remove(&id);
            self.events.push(GameEvent::VehicleDestroyed { id, attacker });
        }
        destroyed
    }

    /// Damage the boss. Returns true on defeat; the boss is removed and a
    /// defeat event carrying the corpse position is emitted for the
    /// coordinator to act on.
    pub fn damage_boss(&mut self, amount: f32, attacker: Option<Uuid>) -> bool {
        let Some(boss) = self.boss.as_mut() else {
            return false;
        };
        let defeated = boss.take_damage(amount);
        self.events.push(GameEvent::BossDamaged { amount, attacker });
        if defeated {
            let position = boss.position;
            self.boss = None;
            self.events.push(GameEvent::BossDefeated {
                x: position.x,
                z: position.z,
                // The coordinator owns the streak; it rewrites this field.
                kill_streak: 0,
            });
        }
        defeated
    }

    /// Spawn the boss if none exists. A live boss wins over a respawn.
    pub fn spawn_boss(&mut self, difficulty: f32, now: u64) -> bool {
        if self.boss.is_some() {
            return false;
        }
        let position = Vec3::new(0.0, 0.0, self.bounds.half_extent * 0.5);
        self.boss = Some(Boss::new(difficulty, position, self.ai_policy, &self.bounds, now));
        self.events.push(GameEvent::BossSpawned { difficulty });
        true
    }

    pub fn set_difficulty(&mut self, value: f32) {
        if let Some(boss) = self.boss.as_mut() {
            boss.set_difficulty(value);
        }
    }

    /// Collect a pickup for a vehicle, applying its effect. Returns None
    /// when either id is stale or the vehicle is out of range.
    pub fn collect_pickup(&mut self, vehicle_id: Uuid, pickup_id: Uuid) -> Option<AppliedEffect> {
        let idx = self.pickups.iter().position(|p| p.id == pickup_id)?;
        let in_range = {
            let v = self.vehicles.get(&vehicle_id)?;
            flatten(v.position - self.pickups[idx].position).length() <= PICKUP_COLLECT_RADIUS
        };
        if !in_range {
            return None;
        }

        let pickup = self.pickups.swap_remove(idx);
        let v = self.vehicles.get_mut(&vehicle_id)?;
        let effect = match pickup.kind {
            PickupKind::WeaponGrant { weapon, ammo } => {
                v.grant_weapon(weapon, ammo);
                AppliedEffect::WeaponGranted { weapon, ammo }
            }
            PickupKind::FullHeal => {
                v.heal_full();
                AppliedEffect::Healed
            }
        };
        self.events.push(GameEvent::PickupCollected {
            pickup_id,
            vehicle_id,
            effect,
        });
        Some(effect)
    }

    /// Spawn reward pickups in a ring around a defeat location.
    pub fn spawn_reward_pickups(&mut self, center: Vec3, count: usize, now: u64) {
        for i in 0..count {
            let angle = std::f32::consts::TAU * i as f32 / count.max(1) as f32;
            let offset = Vec3::new(angle.cos(), 0.0, angle.sin()) * 6.0;
            let position = self.bounds.clamp_point(center + offset);
            let kind = if self.rng.gen::<f32>() < 0.3 {
                PickupKind::FullHeal
            } else {
                let weapon = match self.rng.gen_range(0..3u8) {
                    0 => WeaponKind::HomingMissile,
                    1 => WeaponKind::Mortar,
                    _ => WeaponKind::Flamethrower,
                };
                PickupKind::WeaponGrant { weapon, ammo: 5 }
            };
            self.spawn_pickup(kind, position, now);
        }
    }

    fn spawn_pickup(&mut self, kind: PickupKind, position: Vec3, now: u64) {
        let pickup = Pickup::new(kind, position, now, PICKUP_LIFETIME_MS);
        self.events.push(GameEvent::PickupSpawned {
            id: pickup.id,
            x: position.x,
            z: position.z,
        });
        self.pickups.push(pickup);
    }

    // ---- per-tick update ----

    /// Run one simulation tick. Fixed order; delta-time scaled throughout.
    pub fn update(&mut self, dt: f32, now: u64) -> Vec<GameEvent> {
        self.tick += 1;

        self.update_vehicles(dt, now);
        self.resolve_contacts(now);
        self.update_boss(dt, now);
        self.update_projectiles(dt, now);
        self.update_ground_zones(now);
        self.update_pickups(now);

        std::mem::take(&mut self.events)
    }

    fn update_vehicles(&mut self, dt: f32, now: u64) {
        let radius = VEHICLE_HALF_EXTENTS.x.max(VEHICLE_HALF_EXTENTS.z);
        let mut firing = Vec::new();

        for v in self.vehicles.values_mut() {
            physics::drive_vehicle(v, dt, now);
            physics::resolve_wall(&mut v.position, &mut v.velocity, radius, &self.bounds);
            physics::resolve_obstacles(&mut v.position, radius, &self.obstacles);
            v.refresh_bounds();
            if v.intent.fire {
                firing.push(v.id);
            }
        }

        for id in firing {
            let _ = self.fire_selected(id, now);
        }
    }

    /// Vehicle/vehicle and vehicle/boss interpenetration, one resolver for
    /// both. Contact damage is gated per pair by a cooldown so sustained
    /// overlap doesn't spam damage.
    fn resolve_contacts(&mut self, now: u64) {
        let mut bodies: Vec<Body> = self
            .vehicles
            .values()
            .map(|v| Body {
                id: v.id,
                position: v.position,
                velocity: v.velocity,
                half_extents: VEHICLE_HALF_EXTENTS,
                mass: 80.0 + v.stats().armor * 20.0,
                contact_damage_mult: 1.0,
            })
            .collect();
        if let Some(boss) = &self.boss {
            bodies.push(Body {
                id: boss.id,
                position: boss.position,
                velocity: boss.velocity,
                half_extents: BOSS_HALF_EXTENTS,
                mass: BOSS_MASS,
                contact_damage_mult: BOSS_CONTACT_DAMAGE_MULT * boss.damage_multiplier(),
            });
        }

        for i in 0..bodies.len() {
            for j in (i + 1)..bodies.len() {
                let Some(impact) = resolve_pair(&bodies[i], &bodies[j]) else {
                    continue;
                };

                bodies[i].position = impact.pos_a;
                bodies[i].velocity = impact.vel_a;
                bodies[j].position = impact.pos_b;
                bodies[j].velocity = impact.vel_b;
                let (id_a, id_b) = (bodies[i].id, bodies[j].id);
                self.write_body(id_a, impact.pos_a, impact.vel_a);
                self.write_body(id_b, impact.pos_b, impact.vel_b);

                if impact.damage_to_a <= 0.0 && impact.damage_to_b <= 0.0 {
                    continue;
                }
                let key = if id_a < id_b { (id_a, id_b) } else { (id_b, id_a) };
                let last = self.contact_cooldowns.get(&key).copied().unwrap_or(0);
                if now.saturating_sub(last) < CONTACT_DAMAGE_COOLDOWN_MS && last != 0 {
                    continue;
                }
                self.contact_cooldowns.insert(key, now);

                self.events.push(GameEvent::ContactDamage {
                    a: id_a,
                    b: id_b,
                    amount: impact.damage_to_a.max(impact.damage_to_b),
                });
                self.apply_contact_damage(id_a, impact.damage_to_a, id_b);
                self.apply_contact_damage(id_b, impact.damage_to_b, id_a);
            }
        }

        // Drop stale cooldown entries so the map doesn't grow unbounded.
        self.contact_cooldowns
            .retain(|_, last| now.saturating_sub(*last) < CONTACT_DAMAGE_COOLDOWN_MS * 4);
    }

    fn write_body(&mut self, id: Uuid, position: Vec3, velocity: Vec3) {
        if let Some(v) = self.vehicles.get_mut(&id) {
            v.position = position;
            v.velocity = velocity;
            v.refresh_bounds();
        } else if let Some(boss) = self.boss.as_mut() {
            if boss.id == id {
                boss.position = position;
                boss.velocity = velocity;
            }
        }
    }

    fn apply_contact_damage(&mut self, victim: Uuid, amount: f32, source: Uuid) {
        if amount <= 0.0 {
            return;
        }
        if self.boss.as_ref().is_some_and(|b| b.id == victim) {
            self.damage_boss(amount, Some(source));
        } else {
            self.damage_vehicle(victim, amount, Some(source));
        }
    }

    fn update_boss(&mut self, dt: f32, now: u64) {
        let Some(boss) = self.boss.as_mut() else {
            return;
        };

        let state_before = boss.state;
        let attacks = boss.update(&self.vehicles, &self.bounds, &mut self.rng, dt, now);

        let radius = BOSS_HALF_EXTENTS.x.max(BOSS_HALF_EXTENTS.z);
        physics::resolve_wall(&mut boss.position, &mut boss.velocity, radius, &self.bounds);

        let boss_id = boss.id;
        let boss_pos = boss.position;
        let damage_mult = boss.damage_multiplier();
        if boss.state != state_before {
            let state = boss.state;
            self.events.push(GameEvent::BossStateChanged { state });
        }

        for attack in attacks {
            self.execute_boss_attack(attack, boss_id, boss_pos, damage_mult, now);
        }
    }

    fn execute_boss_attack(
        &mut self,
        attack: BossAttack,
        boss_id: Uuid,
        boss_pos: Vec3,
        damage_mult: f32,
        now: u64,
    ) {
        match attack {
            BossAttack::Ram { target } => {
                let stats = WeaponStats::for_kind(WeaponKind::Ram);
                self.damage_vehicle(target, stats.damage * damage_mult, Some(boss_id));
            }
            BossAttack::Flame { target } => {
                let stats = WeaponStats::for_kind(WeaponKind::Flamethrower);
                if let Some(dir) = self.direction_to_vehicle(boss_pos, target) {
                    let origin = boss_pos + dir * (BOSS_HALF_EXTENTS.z + 1.0);
                    if let Some(p) = Projectile::direct(
                        boss_id,
                        origin,
                        dir,
                        stats.damage * damage_mult,
                        &stats,
                        now,
                    ) {
                        self.push_projectile(p, WeaponKind::Flamethrower);
                    }
                }
            }
            BossAttack::Missile { target } => {
                let stats = WeaponStats::for_kind(WeaponKind::HomingMissile);
                if let Some(dir) = self.direction_to_vehicle(boss_pos, target) {
                    let origin = boss_pos + dir * (BOSS_HALF_EXTENTS.z + 1.0);
                    if let Some(p) = Projectile::homing(
                        boss_id,
                        origin,
                        dir,
                        target,
                        stats.damage * damage_mult,
                        &stats,
                        now,
                    ) {
                        self.push_projectile(p, WeaponKind::HomingMissile);
                    }
                }
            }
            BossAttack::Barrage { impact_points } => {
                let stats = WeaponStats::for_kind(WeaponKind::Mortar);
                let origin = boss_pos + Vec3::new(0.0, BOSS_HALF_EXTENTS.y, 0.0);
                for impact in impact_points {
                    let p = Projectile::ballistic(
                        boss_id,
                        origin,
                        impact,
                        stats.damage * damage_mult,
                        &stats,
                        now,
                    );
                    self.push_projectile(p, WeaponKind::Mortar);
                }
            }
        }
    }

    fn direction_to_vehicle(&self, from: Vec3, target: Uuid) -> Option<Vec3> {
        let v = self.vehicles.get(&target)?;
        let dir = flatten(v.position - from);
        if dir.length_squared() < crate::math::EPSILON_SQ {
            return None;
        }
        Some(dir.normalize())
    }

    fn push_projectile(&mut self, p: Projectile, weapon: WeaponKind) {
        self.events.push(GameEvent::ProjectileSpawned {
            id: p.id,
            owner: p.owner,
            weapon,
            x: p.position.x,
            y: p.position.y,
            z: p.position.z,
        });
        self.projectiles.push(p);
    }

    fn homing_target_for(&self, shooter: Uuid) -> Option<Uuid> {
        if let Some(boss) = &self.boss {
            return Some(boss.id);
        }
        let origin = self.vehicles.get(&shooter)?.position;
        self.vehicles
            .values()
            .filter(|v| v.id != shooter)
            .min_by(|a, b| {
                let da = (a.position - origin).length_squared();
                let db = (b.position - origin).length_squared();
                da.total_cmp(&db)
            })
            .map(|v| v.id)
    }

    /// Advance every projectile one tick and resolve impacts. Projectiles
    /// are drained and only survivors are put back, so a retired
    /// projectile can never re-enter the loop or impact twice.
    fn update_projectiles(&mut self, dt: f32, now: u64) {
        let projectiles = std::mem::take(&mut self.projectiles);
        let mut survivors = Vec::with_capacity(projectiles.len());

        for mut p in projectiles {
            let target_pos = match p.kind {
                ProjectileKind::Homing { target, .. } => self.resolve_position(target),
                _ => None,
            };

            match p.advance(dt, now, target_pos) {
                ProjectileStep::Expired => {}
                ProjectileStep::Detonate => self.detonate(&p, now),
                ProjectileStep::Flying => {
                    if let Some(victim) = self.find_projectile_hit(&p) {
                        self.events.push(GameEvent::ProjectileImpact {
                            id: p.id,
                            x: p.position.x,
                            z: p.position.z,
                            damage: p.damage,
                        });
                        self.apply_projectile_hit(&p, victim, now);
                    } else {
                        survivors.push(p);
                    }
                }
            }
        }

        self.projectiles = survivors;
    }

    fn resolve_position(&self, id: Uuid) -> Option<Vec3> {
        if let Some(v) = self.vehicles.get(&id) {
            return Some(v.position);
        }
        self.boss
            .as_ref()
            .filter(|b| b.id == id)
            .map(|b| b.position)
    }

    fn find_projectile_hit(&self, p: &Projectile) -> Option<Uuid> {
        // Ballistic shells only ever damage through altitude detonation;
        // a shell descending onto its aim point must not convert into a
        // point hit on whoever stands there.
        if matches!(p.kind, ProjectileKind::Ballistic { .. }) {
            return None;
        }
        let vehicle_radius = VEHICLE_HALF_EXTENTS.x;
        for v in self.vehicles.values() {
            if v.id == p.owner {
                continue;
            }
            if p.check_hit(v.position, vehicle_radius) {
                return Some(v.id);
            }
        }
        if let Some(boss) = &self.boss {
            let boss_radius = (BOSS_HALF_EXTENTS.x + BOSS_HALF_EXTENTS.z) * 0.5;
            if boss.id != p.owner && p.check_hit(boss.position, boss_radius) {
                return Some(boss.id);
            }
        }
        None
    }

    fn apply_projectile_hit(&mut self, p: &Projectile, victim: Uuid, now: u64) {
        let is_boss = self.boss.as_ref().is_some_and(|b| b.id == victim);
        if is_boss {
            self.damage_boss(p.damage, Some(p.owner));
        } else {
            self.damage_vehicle(victim, p.damage, Some(p.owner));
            // Homing hits freeze the victim for a moment.
            if matches!(p.kind, ProjectileKind::Homing { .. }) {
                if let Some(v) = self.vehicles.get_mut(&victim) {
                    v.apply_slow(FREEZE_FACTOR, now + FREEZE_DURATION_MS);
                }
            }
        }
    }

    /// Area damage with linear falloff to everything in the blast radius,
    /// plus a burning-ground zone at the impact point.
    fn detonate(&mut self, p: &Projectile, now: u64) {
        let radius = p.blast_radius();
        self.events.push(GameEvent::ProjectileImpact {
            id: p.id,
            x: p.position.x,
            z: p.position.z,
            damage: p.damage,
        });

        let victims: Vec<(Uuid, f32)> = self
            .vehicles
            .values()
            .map(|v| (v.id, flatten(v.position - p.position).length()))
            .filter(|(_, dist)| *dist < radius)
            .collect();
        for (id, dist) in victims {
            let damage = falloff_damage(p.damage, dist, radius);
            if damage > 0.0 {
                self.damage_vehicle(id, damage, Some(p.owner));
            }
        }

        if let Some(boss) = &self.boss {
            if boss.id != p.owner {
                let dist = flatten(boss.position - p.position).length();
                let damage = falloff_damage(p.damage, dist, radius);
                if damage > 0.0 {
                    self.damage_boss(damage, Some(p.owner));
                }
            }
        }

        self.ground_zones
            .push(GroundZone::new(p.position, radius, p.damage, now));
    }

    fn update_ground_zones(&mut self, now: u64) {
        let mut burns: Vec<(Uuid, f32)> = Vec::new();
        for zone in &mut self.ground_zones {
            if let Some(damage) = zone.poll_damage(now) {
                for v in self.vehicles.values() {
                    if zone.contains(v.position) {
                        burns.push((v.id, damage));
                    }
                }
            }
        }
        for (id, damage) in burns {
            self.damage_vehicle(id, damage, None);
        }
        self.ground_zones.retain(|z| !z.is_expired(now));
    }

    fn update_pickups(&mut self, now: u64) {
        let expired: Vec<Uuid> = self
            .pickups
            .iter()
            .filter(|p| p.is_expired(now))
            .map(|p| p.id)
            .collect();
        for pickup_id in expired {
            self.pickups.retain(|p| p.id != pickup_id);
            self.events.push(GameEvent::PickupExpired { pickup_id });
        }

        // Auto-collect for vehicles driving over a pickup.
        let collectible: Vec<(Uuid, Uuid)> = self
            .pickups
            .iter()
            .filter_map(|p| {
                self.vehicles
                    .values()
                    .find(|v| flatten(v.position - p.position).length() <= PICKUP_COLLECT_RADIUS)
                    .map(|v| (v.id, p.id))
            })
            .collect();
        for (vehicle_id, pickup_id) in collectible {
            let _ = self.collect_pickup(vehicle_id, pickup_id);
        }

        // Repopulate fixed spawn points on a period.
        if now >= self.next_pickup_refresh_at {
            self.next_pickup_refresh_at = now + PICKUP_REFRESH_MS;
            let points: Vec<Vec3> = self
                .pickup_spawn_points
                .iter()
                .copied()
                .filter(|point| {
                    !self
                        .pickups
                        .iter()
                        .any(|p| flatten(p.position - *point).length() < 1.0)
                })
                .collect();
            for point in points {
                let kind = if self.rng.gen::<f32>() < 0.25 {
                    PickupKind::FullHeal
                } else {
                    let weapon = match self.rng.gen_range(0..3u8) {
                        0 => WeaponKind::HomingMissile,
                        1 => WeaponKind::Mortar,
                        _ => WeaponKind::Flamethrower,
                    };
                    PickupKind::WeaponGrant { weapon, ammo: 5 }
                };
                self.spawn_pickup(kind, point, now);
            }
        }
    }

    // ---- read-only view for the renderer ----

    pub fn render_view(&self) -> ArenaView {
        ArenaView {
            tick: self.tick,
            vehicles: self
                .vehicles
                .values()
                .map(|v| VehicleView {
                    id: v.id,
                    class: v.class,
                    position: v.position,
                    rotation: v.rotation_y,
                    health: v.health,
                    max_health: v.max_health(),
                    selected_weapon: v.selected_kind(),
                })
                .collect(),
            boss: self.boss.as_ref().map(|b| BossView {
                id: b.id,
                state: b.state,
                position: b.position,
                rotation: b.rotation_y,
                health: b.health,
                max_health: b.max_health,
            }),
            projectiles: self
                .projectiles
                .iter()
                .map(|p| ProjectileView {
                    id: p.id,
                    position: p.position,
                })
                .collect(),
            pickups: self
                .pickups
                .iter()
                .map(|p| PickupView {
                    id: p.id,
                    kind: p.kind,
                    position: p.position,
                })
                .collect(),
        }
    }
}

/// Read-only state for the rendering collaborator: enough to draw meshes
/// and HUD without any simulation logic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArenaView {
    pub tick: u64,
    pub vehicles: Vec<VehicleView>,
    pub boss: Option<BossView>,
    pub projectiles: Vec<ProjectileView>,
    pub pickups: Vec<PickupView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleView {
    pub id: Uuid,
    pub class: VehicleClass,
    pub position: Vec3,
    pub rotation: f32,
    pub health: f32,
    pub max_health: f32,
    pub selected_weapon: WeaponKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BossView {
    pub id: Uuid,
    pub state: BossState,
    pub position: Vec3,
    pub rotation: f32,
    pub health: f32,
    pub max_health: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectileView {
    pub id: Uuid,
    pub position: Vec3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickupView {
    pub id: Uuid,
    pub kind: PickupKind,
    pub position: Vec3,
}
