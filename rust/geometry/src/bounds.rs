// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Axis-aligned bounding boxes.

use nalgebra::{Matrix4, Point3, Vector3};

/// Axis-aligned bounding box in f64.
///
/// An empty box has `min > max` on every axis so that the first
/// [`Aabb::expand`] snaps it to the point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

impl Aabb {
    /// Box containing nothing
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    /// Bounds of a flat position buffer
    pub fn from_positions(positions: &[f32]) -> Self {
        let mut aabb = Self::empty();
        positions.chunks_exact(3).for_each(|c| {
            aabb.expand(&Point3::new(c[0] as f64, c[1] as f64, c[2] as f64));
        });
        aabb
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    #[inline]
    pub fn expand(&mut self, p: &Point3<f64>) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        if other.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return *other;
        }
        Aabb::new(self.min.inf(&other.min), self.max.sup(&other.max))
    }

    /// Extent along each axis (zero for an empty box)
    pub fn size(&self) -> Vector3<f64> {
        if self.is_empty() {
            return Vector3::zeros();
        }
        self.max - self.min
    }

    pub fn center(&self) -> Point3<f64> {
        if self.is_empty() {
            return Point3::origin();
        }
        nalgebra::center(&self.min, &self.max)
    }

    /// Largest of the three extents
    pub fn largest_extent(&self) -> f64 {
        self.size().max()
    }

    pub fn diagonal(&self) -> f64 {
        self.size().norm()
    }

    /// Bounds of this box after an affine transform (all eight corners)
    pub fn transformed(&self, m: &Matrix4<f64>) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        let mut out = Aabb::empty();
        for i in 0..8 {
            let corner = Point3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            out.expand(&m.transform_point(&corner));
        }
        out
    }

    /// Slab test: entry distance along the ray if it hits the box
    pub fn ray_entry(&self, origin: &Point3<f64>, direction: &Vector3<f64>) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        let mut t_min = 0.0f64;
        let mut t_max = f64::INFINITY;
        for axis in 0..3 {
            let inv = 1.0 / direction[axis];
            let mut t0 = (self.min[axis] - origin[axis]) * inv;
            let mut t1 = (self.max[axis] - origin[axis]) * inv;
            if inv < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }
            // NaN (origin on a slab plane with zero direction) keeps the previous bound
            if t0 > t_min {
                t_min = t0;
            }
            if t1 < t_max {
                t_max = t1;
            }
            if t_max < t_min {
                return None;
            }
        }
        Some(t_min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn empty_box() {
        let b = Aabb::empty();
        assert!(b.is_empty());
        assert_eq!(b.size(), Vector3::zeros());
        assert_eq!(b.union(&b), b);
    }

    #[test]
    fn transformed_box_covers_rotated_corners() {
        let b = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));
        // 90 degrees about Z
        let rot = Matrix4::new_rotation(Vector3::new(0.0, 0.0, std::f64::consts::FRAC_PI_2));
        let t = b.transformed(&rot);
        assert_relative_eq!(t.min.x, -1.0, epsilon = 1e-9);
        assert_relative_eq!(t.max.y, 2.0, epsilon = 1e-9);
        assert_relative_eq!(t.largest_extent(), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn ray_slab_hits_and_misses() {
        let b = Aabb::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        let origin = Point3::new(0.0, 0.0, 5.0);
        let down = Vector3::new(0.0, 0.0, -1.0);
        assert_relative_eq!(b.ray_entry(&origin, &down).unwrap(), 4.0);
        assert!(b.ray_entry(&origin, &-down).is_none());
        let offset = Point3::new(3.0, 0.0, 5.0);
        assert!(b.ray_entry(&offset, &down).is_none());
    }
}
