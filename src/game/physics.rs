//! Collision and physics resolution - walls, obstacles, body pairs

use glam::Vec3;
use uuid::Uuid;

use crate::math::{flatten, yaw_to_dir, Aabb, EPSILON_SQ};

use super::entity::Vehicle;

/// Velocity kept after bouncing off an arena wall.
pub const WALL_RESTITUTION: f32 = 0.5;
/// Restitution for vehicle/vehicle and vehicle/boss contact.
pub const PAIR_RESTITUTION: f32 = 0.05;
/// Fraction of bounding size used as the contact radius, to avoid
/// false positives on near-misses.
pub const EFFECTIVE_RADIUS_FRACTION: f32 = 0.3;
/// Penetration below this is treated as jitter and ignored.
pub const MIN_PENETRATION: f32 = 0.2;
/// Post-impact velocity damping applied to both bodies.
pub const CONTACT_DAMPING: f32 = 0.65;
/// Closing speed along the contact normal above which contact damage lands.
pub const IMPACT_DAMAGE_THRESHOLD: f32 = 6.0;
/// Damage per unit of closing speed above the threshold.
pub const IMPACT_DAMAGE_SCALE: f32 = 2.5;
/// Per-pair cooldown between contact damage applications, in milliseconds.
pub const CONTACT_DAMAGE_COOLDOWN_MS: u64 = 1_200;

/// Velocity drag per second while driving.
const DRAG_PER_SEC: f32 = 1.4;
/// Additional drag per second while the handbrake intent is held.
const BRAKE_DRAG_PER_SEC: f32 = 6.0;

/// The arena is an axis-aligned square centered on the origin.
#[derive(Debug, Clone, Copy)]
pub struct MapBounds {
    pub half_extent: f32,
}

impl MapBounds {
    pub fn new(half_extent: f32) -> Self {
        Self { half_extent }
    }

    pub fn clamp_point(&self, p: Vec3) -> Vec3 {
        Vec3::new(
            p.x.clamp(-self.half_extent, self.half_extent),
            p.y,
            p.z.clamp(-self.half_extent, self.half_extent),
        )
    }

    pub fn random_point(&self, rng: &mut impl rand::Rng) -> Vec3 {
        let margin = self.half_extent * 0.9;
        Vec3::new(
            rng.gen_range(-margin..margin),
            0.0,
            rng.gen_range(-margin..margin),
        )
    }
}

/// Integrate one vehicle's driving intent for this tick: steer, thrust,
/// drag, speed clamp, position update.
pub fn drive_vehicle(vehicle: &mut Vehicle, dt: f32, now: u64) {
    let stats = vehicle.stats();
    let intent = vehicle.intent;

    let steer = (intent.left as i8 - intent.right as i8) as f32;
    vehicle.rotation_y += steer * stats.turn_rate() * dt;
    vehicle.rotation_y = vehicle.rotation_y.rem_euclid(std::f32::consts::TAU);

    let throttle = (intent.forward as i8 - intent.backward as i8) as f32;
    // Reverse is slower.
    let thrust = if throttle >= 0.0 {
        throttle * stats.acceleration()
    } else {
        throttle * stats.acceleration() * 0.5
    };

    let dir = yaw_to_dir(vehicle.rotation_y);
    vehicle.velocity += dir * thrust * dt;

    // Drag, delta-scaled so behavior is framerate-independent.
    vehicle.velocity *= 1.0 / (1.0 + DRAG_PER_SEC * dt);

    // Handbrake: extra drag while held.
    if intent.special {
        vehicle.velocity *= 1.0 / (1.0 + BRAKE_DRAG_PER_SEC * dt);
    }

    let max_speed = vehicle.effective_max_speed(now);
    let speed_sq = flatten(vehicle.velocity).length_squared();
    if speed_sq > max_speed * max_speed {
        let scale = max_speed / speed_sq.sqrt();
        vehicle.velocity.x *= scale;
        vehicle.velocity.z *= scale;
    }

    vehicle.position += flatten(vehicle.velocity) * dt;
}

/// Clamp a body to the arena walls, reflecting and damping the velocity
/// component into the wall. Returns true if any wall was hit.
pub fn resolve_wall(position: &mut Vec3, velocity: &mut Vec3, radius: f32, bounds: &MapBounds) -> bool {
    let limit = bounds.half_extent;
    let mut hit = false;

    if position.x - radius <= -limit {
        position.x = -limit + radius;
        if velocity.x < 0.0 {
            velocity.x = -velocity.x * WALL_RESTITUTION;
        }
        hit = true;
    } else if position.x + radius >= limit {
        position.x = limit - radius;
        if velocity.x > 0.0 {
            velocity.x = -velocity.x * WALL_RESTITUTION;
        }
        hit = true;
    }

    if position.z - radius <= -limit {
        position.z = -limit + radius;
        if velocity.z < 0.0 {
            velocity.z = -velocity.z * WALL_RESTITUTION;
        }
        hit = true;
    } else if position.z + radius >= limit {
        position.z = limit - radius;
        if velocity.z > 0.0 {
            velocity.z = -velocity.z * WALL_RESTITUTION;
        }
        hit = true;
    }

    hit
}

/// Push a body out of any static obstacle it penetrates. Uses the closest
/// point on each box to the body center; a degenerate normal (center exactly
/// on the closest point) skips that obstacle for this tick.
pub fn resolve_obstacles(position: &mut Vec3, radius: f32, obstacles: &[Aabb]) {
    for obstacle in obstacles {
        let closest = obstacle.closest_point(*position);
        let away = flatten(*position - closest);
        let dist_sq = away.length_squared();

        if dist_sq >= radius * radius {
            continue;
        }
        if dist_sq < EPSILON_SQ {
            continue;
        }

        let dist = dist_sq.sqrt();
        let normal = away / dist;
        *position += normal * (radius - dist);
    }
}

/// Immutable physical view of a colliding body. Vehicles and the boss both
/// reduce to this, so one resolver covers vehicle/vehicle and vehicle/boss.
#[derive(Debug, Clone, Copy)]
pub struct Body {
    pub id: Uuid,
    pub position: Vec3,
    pub velocity: Vec3,
    pub half_extents: Vec3,
    pub mass: f32,
    /// Multiplier on the contact damage this body deals to the other
    pub contact_damage_mult: f32,
}

impl Body {
    pub fn bounds(&self) -> Aabb {
        Aabb::from_center_half_extents(self.position, self.half_extents)
    }

    /// Reduced contact radius, a fraction of the planar bounding size.
    pub fn effective_radius(&self) -> f32 {
        (self.half_extents.x + self.half_extents.z) * EFFECTIVE_RADIUS_FRACTION
    }
}

/// Resolved outcome for a colliding pair. The caller writes positions and
/// velocities back and gates the damage on the per-pair cooldown.
#[derive(Debug, Clone, Copy)]
pub struct PairImpact {
    pub pos_a: Vec3,
    pub pos_b: Vec3,
    pub vel_a: Vec3,
    pub vel_b: Vec3,
    /// Closing speed along the contact normal at impact
    pub impact_speed: f32,
    pub damage_to_a: f32,
    pub damage_to_b: f32,
}

/// Detect and resolve interpenetration between two bodies.
///
/// Broad phase is a bounding-volume test; contact is confirmed with the
/// reduced effective radii and a minimum-penetration threshold. Separation
/// is split by inverse mass, a low-restitution impulse applies only while
/// the bodies are closing, and both get damped hard afterwards.
pub fn resolve_pair(a: &Body, b: &Body) -> Option<PairImpact> {
    if !a.bounds().intersects(&b.bounds()) {
        return None;
    }

    let delta = flatten(b.position - a.position);
    let dist_sq = delta.length_squared();
    // Coincident centers: skip this tick rather than produce NaN.
    if dist_sq < EPSILON_SQ {
        return None;
    }

    let dist = dist_sq.sqrt();
    let contact_dist = a.effective_radius() + b.effective_radius();
    let penetration = contact_dist - dist;
    if penetration < MIN_PENETRATION {
        return None;
    }

    let normal = delta / dist;
    let inv_a = 1.0 / a.mass;
    let inv_b = 1.0 / b.mass;
    let inv_sum = inv_a + inv_b;

    // Separate proportionally to inverse mass: the heavy boss barely moves.
    let pos_a = a.position - normal * (penetration * inv_a / inv_sum);
    let pos_b = b.position + normal * (penetration * inv_b / inv_sum);

    let mut vel_a = a.velocity;
    let mut vel_b = b.velocity;
    let closing = (vel_b - vel_a).dot(normal);
    let mut impact_speed = 0.0;
    if closing < 0.0 {
        impact_speed = -closing;
        let impulse = -(1.0 + PAIR_RESTITUTION) * closing / inv_sum;
        vel_a -= normal * impulse * inv_a;
        vel_b += normal * impulse * inv_b;
    }

    vel_a *= CONTACT_DAMPING;
    vel_b *= CONTACT_DAMPING;

    let base = if impact_speed > IMPACT_DAMAGE_THRESHOLD {
        (impact_speed - IMPACT_DAMAGE_THRESHOLD) * IMPACT_DAMAGE_SCALE
    } else {
        0.0
    };

    Some(PairImpact {
        pos_a,
        pos_b,
        vel_a,
        vel_b,
        impact_speed,
        damage_to_a: base * b.contact_damage_mult,
        damage_to_b: base * a.contact_damage_mult,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::VehicleClass;

    fn body(x: f32, z: f32, vel: Vec3, mass: f32) -> Body {
        Body {
            id: Uuid::new_v4(),
            position: Vec3::new(x, 0.0, z),
            velocity: vel,
            half_extents: Vec3::new(1.6, 1.0, 2.4),
            mass,
            contact_damage_mult: 1.0,
        }
    }

    #[test]
    fn handbrake_bleeds_speed_faster_than_coasting() {
        let mut coasting =
            Vehicle::new(Uuid::new_v4(), None, VehicleClass::Raider, Vec3::ZERO, 0.0);
        coasting.velocity = Vec3::new(0.0, 0.0, 8.0);
        let mut braking = coasting.clone();
        braking.intent.special = true;

        for _ in 0..10 {
            drive_vehicle(&mut coasting, 1.0 / 30.0, 0);
            drive_vehicle(&mut braking, 1.0 / 30.0, 0);
        }

        assert!(coasting.velocity.length() < 8.0);
        assert!(braking.velocity.length() < coasting.velocity.length() * 0.5);
    }

    #[test]
    fn south_wall_clamps_and_reflects() {
        // Vehicle at (0,0,-79) heading into the wall at z=-80 with radius 1.
        let bounds = MapBounds::new(80.0);
        let mut pos = Vec3::new(0.0, 0.0, -79.0);
        let mut vel = Vec3::new(0.0, 0.0, -5.0);

        assert!(resolve_wall(&mut pos, &mut vel, 1.0, &bounds));
        assert_eq!(pos.z, -79.0);
        assert!(vel.z > 0.0);
        assert!(vel.z.abs() < 5.0);
    }

    #[test]
    fn wall_reflection_loses_energy() {
        let bounds = MapBounds::new(80.0);
        for speed in [1.0_f32, 7.5, 40.0] {
            let mut pos = Vec3::new(81.0, 0.0, 0.0);
            let mut vel = Vec3::new(speed, 0.0, 3.0);
            let before = vel.length();
            resolve_wall(&mut pos, &mut vel, 1.0, &bounds);
            assert!(vel.length() <= before);
            assert!(pos.x <= 80.0 - 1.0);
        }
    }

    #[test]
    fn obstacle_pushes_body_out_along_normal() {
        let obstacles = [Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(2.0))];
        let mut pos = Vec3::new(2.5, 0.0, 0.0);
        resolve_obstacles(&mut pos, 1.0, &obstacles);
        assert!((pos.x - 3.0).abs() < 1e-4);

        // Body center exactly on the box surface: degenerate normal, skipped.
        let mut stuck = Vec3::new(2.0, 0.0, 0.0);
        resolve_obstacles(&mut stuck, 1.0, &obstacles);
        assert_eq!(stuck, Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn near_miss_below_min_penetration_is_ignored() {
        let a = body(0.0, 0.0, Vec3::ZERO, 100.0);
        // Effective radius is (1.6 + 2.4) * 0.3 = 1.2 per body; contact at 2.4.
        let b = body(0.0, 2.3, Vec3::ZERO, 100.0);
        assert!(resolve_pair(&a, &b).is_none());
    }

    #[test]
    fn head_on_collision_damages_both_equally() {
        let a = body(0.0, -1.0, Vec3::new(0.0, 0.0, 8.0), 100.0);
        let b = body(0.0, 1.0, Vec3::new(0.0, 0.0, -8.0), 100.0);

        let impact = resolve_pair(&a, &b).expect("bodies overlap");
        assert!(impact.impact_speed > IMPACT_DAMAGE_THRESHOLD);
        assert!(impact.damage_to_a > 0.0);
        assert!((impact.damage_to_a - impact.damage_to_b).abs() < 1e-4);

        // Separation is symmetric for equal masses.
        assert!((impact.pos_a.z + impact.pos_b.z).abs() < 1e-4);

        // Impulse plus damping slows both bodies.
        assert!(impact.vel_a.length() < 8.0);
        assert!(impact.vel_b.length() < 8.0);
    }

    #[test]
    fn heavy_body_barely_moves() {
        let vehicle = body(0.0, -1.0, Vec3::new(0.0, 0.0, 10.0), 100.0);
        let boss = Body {
            mass: 1200.0,
            contact_damage_mult: 4.0,
            half_extents: Vec3::new(4.0, 3.0, 5.0),
            ..body(0.0, 1.0, Vec3::ZERO, 1200.0)
        };

        let impact = resolve_pair(&vehicle, &boss).expect("overlap");
        let vehicle_shift = (impact.pos_a - vehicle.position).length();
        let boss_shift = (impact.pos_b - boss.position).length();
        assert!(boss_shift < vehicle_shift * 0.2);
        // The boss deals disproportionately more contact damage.
        assert!(impact.damage_to_a > impact.damage_to_b);
    }

    #[test]
    fn coincident_centers_skip_resolution() {
        let a = body(0.0, 0.0, Vec3::ZERO, 100.0);
        let b = body(0.0, 0.0, Vec3::ZERO, 100.0);
        assert!(resolve_pair(&a, &b).is_none());
    }

    #[test]
    fn separating_bodies_get_no_impulse_damage() {
        let a = body(0.0, -0.5, Vec3::new(0.0, 0.0, -5.0), 100.0);
        let b = body(0.0, 0.5, Vec3::new(0.0, 0.0, 5.0), 100.0);
        let impact = resolve_pair(&a, &b).expect("still interpenetrating");
        assert_eq!(impact.impact_speed, 0.0);
        assert_eq!(impact.damage_to_a, 0.0);
    }
}
