// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Picking against merged batches
//!
//! Rays are tested against every triangle of every batch (no BVH). A hit
//! reports a face index into the merged buffer; the owning [`BatchObject`]
//! is found from the batch's face ranges. Filtered-out and ignored elements
//! neither get returned nor occlude what lies behind them.

use nalgebra::{Isometry3, Perspective3, Point3, Vector3};

use crate::batch::{BatchId, BatchObject, MeshBatch};
use crate::batcher::Batcher;
use crate::material::Side;

/// Minimum hit distance
const EPSILON: f64 = 1e-12;
/// Parallel tolerance, relative to the product of the edge lengths
const PARALLEL_EPSILON: f64 = 1e-9;

/// Half-line with unit direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3<f64>,
    pub direction: Vector3<f64>,
}

impl Ray {
    /// Ray from `origin` along `direction`; `None` for a zero direction.
    pub fn new(origin: Point3<f64>, direction: Vector3<f64>) -> Option<Self> {
        let direction = direction.try_normalize(EPSILON)?;
        Some(Self { origin, direction })
    }

    #[inline]
    pub fn at(&self, t: f64) -> Point3<f64> {
        self.origin + self.direction * t
    }
}

/// Perspective camera for turning pointer positions into rays
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub eye: Point3<f64>,
    pub view: Isometry3<f64>,
    pub projection: Perspective3<f64>,
}

impl Camera {
    /// Right-handed camera at `eye` looking at `target`. `fovy` in radians.
    pub fn look_at(
        eye: Point3<f64>,
        target: Point3<f64>,
        up: Vector3<f64>,
        fovy: f64,
        aspect: f64,
        znear: f64,
        zfar: f64,
    ) -> Self {
        Self {
            eye,
            view: Isometry3::look_at_rh(&eye, &target, &up),
            projection: Perspective3::new(aspect, fovy, znear, zfar),
        }
    }

    /// World-space ray through a pointer position in normalized device
    /// coordinates (`[-1, 1]` on both axes, +y up).
    pub fn ray_from_ndc(&self, x: f64, y: f64) -> Option<Ray> {
        let near = self.projection.unproject_point(&Point3::new(x, y, -1.0));
        let far = self.projection.unproject_point(&Point3::new(x, y, 1.0));
        let near = self.view.inverse_transform_point(&near);
        let far = self.view.inverse_transform_point(&far);
        Ray::new(self.eye, far - near)
    }
}

/// Closest eligible intersection
#[derive(Debug, Clone, Copy)]
pub struct Hit<'a> {
    pub batch_id: BatchId,
    pub object: &'a BatchObject,
    pub point: Point3<f64>,
    pub distance: f64,
    /// Triangle index within the batch's merged buffer
    pub face_index: u32,
}

impl Hit<'_> {
    pub fn element_id(&self) -> &str {
        &self.object.element_id
    }
}

/// Möller–Trumbore; returns distance along the ray and whether the front face was hit.
#[inline]
fn intersect_triangle(
    ray: &Ray,
    v0: &Point3<f64>,
    v1: &Point3<f64>,
    v2: &Point3<f64>,
) -> Option<(f64, bool)> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let h = ray.direction.cross(&edge2);
    let a = edge1.dot(&h);
    if a.abs() <= PARALLEL_EPSILON * edge1.norm() * edge2.norm() {
        return None; // parallel
    }

    let f = 1.0 / a;
    let s = ray.origin - v0;
    let u = f * s.dot(&h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(&edge1);
    let v = f * ray.direction.dot(&q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(&q);
    // a > 0 means the ray runs against the triangle normal
    (t > EPSILON).then_some((t, a > 0.0))
}

/// Ray picker over a batcher's batches
#[derive(Debug, Clone, Copy, Default)]
pub struct Raycaster {
    /// Skip batches whose bounds the ray misses or enters beyond the best hit
    pub use_bounds_test: bool,
}

impl Raycaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bounds_test(mut self, enabled: bool) -> Self {
        self.use_bounds_test = enabled;
        self
    }

    /// Pick at a pointer position in normalized device coordinates.
    pub fn intersect<'a>(&self, camera: &Camera, ndc: (f64, f64), batcher: &'a Batcher) -> Option<Hit<'a>> {
        let ray = camera.ray_from_ndc(ndc.0, ndc.1)?;
        self.intersect_ray(&ray, batcher)
    }

    /// Closest hit on a visible, non-ignored element across all batches.
    pub fn intersect_ray<'a>(&self, ray: &Ray, batcher: &'a Batcher) -> Option<Hit<'a>> {
        let mut best: Option<Hit<'a>> = None;

        for batch in batcher.batches() {
            let limit = best.as_ref().map_or(f64::INFINITY, |h| h.distance);
            if self.use_bounds_test {
                match batch.bounds().ray_entry(&ray.origin, &ray.direction) {
                    Some(entry) if entry < limit => {}
                    _ => continue,
                }
            }
            if let Some(hit) = intersect_batch(ray, batch, batcher, limit) {
                best = Some(hit);
            }
        }
        best
    }
}

fn intersect_batch<'a>(ray: &Ray, batch: &'a MeshBatch, batcher: &Batcher, limit: f64) -> Option<Hit<'a>> {
    let mesh = batch.geometry();
    let side = batch.base_material().map_or(Side::Double, |m| m.side);
    let vertex_count = mesh.vertex_count();
    let mut best: Option<Hit<'a>> = None;

    for face in 0..mesh.triangle_count() {
        let [i0, i1, i2] = mesh.triangle(face);
        if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
            continue;
        }

        let Some((t, front)) = intersect_triangle(ray, &mesh.position(i0), &mesh.position(i1), &mesh.position(i2))
        else {
            continue;
        };
        let closest = best.as_ref().map_or(limit, |h| h.distance);
        if t >= closest || !side.accepts(front) {
            continue;
        }

        let face_index = face as u32;
        let Some(object) = batch.object_at_face(face_index) else {
            tracing::debug!(batch = %batch.id(), face = face_index, "Hit face has no owning object");
            continue;
        };
        if !object.visible || batcher.is_raycast_ignored(&object.element_id) {
            continue;
        }

        best = Some(Hit {
            batch_id: batch.id(),
            object,
            point: ray.at(t),
            distance: t,
            face_index,
        });
    }
    best
}
