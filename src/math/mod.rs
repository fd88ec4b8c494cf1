//! Vector and geometry utilities shared by every simulation module.
//!
//! Movement happens in the XZ plane with `rotation_y` as the yaw angle;
//! the y axis only matters for ballistic arcs.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Squared-length threshold below which a direction is treated as degenerate.
pub const EPSILON_SQ: f32 = 1e-6;

/// Convert a yaw angle to a unit direction in the XZ plane.
pub fn yaw_to_dir(yaw: f32) -> Vec3 {
    Vec3::new(yaw.sin(), 0.0, yaw.cos())
}

/// Yaw angle of a direction vector projected onto the XZ plane.
pub fn dir_to_yaw(dir: Vec3) -> f32 {
    dir.x.atan2(dir.z)
}

/// Project a vector onto the XZ plane.
pub fn flatten(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Interpolate `current` toward `target` by fraction `t`, taking the short
/// way around the circle. The angular error is normalized into (-PI, PI]
/// before interpolating so a facing of 0.1 chasing a target at TAU - 0.1
/// turns through zero, not through PI.
pub fn lerp_angle(current: f32, target: f32, t: f32) -> f32 {
    let mut error = target - current;
    while error > std::f32::consts::PI {
        error -= std::f32::consts::TAU;
    }
    while error < -std::f32::consts::PI {
        error += std::f32::consts::TAU;
    }
    current + error * t.clamp(0.0, 1.0)
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_center_half_extents(center: Vec3, half: Vec3) -> Self {
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Box/box overlap test.
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Closest point on (or inside) the box to `p`, clamped per axis.
    pub fn closest_point(&self, p: Vec3) -> Vec3 {
        p.clamp(self.min, self.max)
    }

    /// Slab-method ray/box intersection. Returns the entry distance along
    /// `dir` if the ray hits, `None` otherwise. `dir` need not be normalized
    /// but must not be degenerate.
    pub fn ray_intersect(&self, origin: Vec3, dir: Vec3) -> Option<f32> {
        if dir.length_squared() < EPSILON_SQ {
            return None;
        }

        let inv = dir.recip();
        let t1 = (self.min - origin) * inv;
        let t2 = (self.max - origin) * inv;

        let t_min = t1.min(t2);
        let t_max = t1.max(t2);

        let near = t_min.max_element();
        let far = t_max.min_element();

        if near <= far && far >= 0.0 {
            Some(near.max(0.0))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{PI, TAU};

    #[test]
    fn yaw_round_trips_through_dir() {
        for yaw in [0.0, 0.5, PI - 0.1, -1.2] {
            let dir = yaw_to_dir(yaw);
            assert!((dir_to_yaw(dir) - yaw).abs() < 1e-5);
        }
    }

    #[test]
    fn lerp_angle_takes_short_way_around() {
        // 0.1 chasing TAU - 0.1: error is -0.2 after wrap, not TAU - 0.2.
        let next = lerp_angle(0.1, TAU - 0.1, 0.5);
        assert!((next - 0.0).abs() < 1e-5);

        let next = lerp_angle(-PI + 0.1, PI - 0.1, 0.1);
        assert!(next < -PI + 0.1);
    }

    #[test]
    fn aabb_closest_point_clamps_per_axis() {
        let b = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        assert_eq!(b.closest_point(Vec3::new(5.0, 0.0, -3.0)), Vec3::new(1.0, 0.0, -1.0));
        // Points inside map to themselves.
        let inside = Vec3::new(0.3, -0.2, 0.9);
        assert_eq!(b.closest_point(inside), inside);
    }

    #[test]
    fn aabb_intersections() {
        let a = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(1.0));
        let b = Aabb::from_center_half_extents(Vec3::new(1.5, 0.0, 0.0), Vec3::splat(1.0));
        let c = Aabb::from_center_half_extents(Vec3::new(5.0, 0.0, 0.0), Vec3::splat(1.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn ray_hits_box_front_face() {
        let b = Aabb::from_center_half_extents(Vec3::new(0.0, 0.0, 10.0), Vec3::splat(1.0));
        let t = b
            .ray_intersect(Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0))
            .unwrap();
        assert!((t - 9.0).abs() < 1e-5);
        assert!(b.ray_intersect(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0)).is_none());
        assert!(b.ray_intersect(Vec3::ZERO, Vec3::ZERO).is_none());
    }
}
