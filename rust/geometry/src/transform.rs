// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared transform utilities for render view placement
//!
//! World transforms are plain `Matrix4<f64>` affine matrices. Normals need the
//! inverse-transpose of the linear part whenever the transform is not a
//! rigid motion with uniform scale.

use nalgebra::{Matrix3, Matrix4, Point3, Vector3};

/// Relative tolerance for scale comparisons
const SCALE_EPSILON: f64 = 1e-6;

/// Build a matrix from 16 row-major entries (scene tree convention)
pub fn from_row_major(values: &[f64; 16]) -> Matrix4<f64> {
    Matrix4::from_row_slice(values)
}

/// Upper-left 3x3 block
#[inline]
pub fn linear_part(m: &Matrix4<f64>) -> Matrix3<f64> {
    m.fixed_view::<3, 3>(0, 0).into_owned()
}

/// Matrix for transforming normals: inverse-transpose of the linear part.
///
/// Falls back to the linear part itself for singular matrices; normals get
/// re-normalized by the caller anyway.
pub fn normal_matrix(m: &Matrix4<f64>) -> Matrix3<f64> {
    let linear = linear_part(m);
    linear
        .try_inverse()
        .map(|inv| inv.transpose())
        .unwrap_or(linear)
}

/// Whether the transform flips handedness (negative determinant).
///
/// Triangle winding must be reversed when merging such geometry so that
/// recomputed normals keep facing outward.
#[inline]
pub fn is_mirroring(m: &Matrix4<f64>) -> bool {
    linear_part(m).determinant() < 0.0
}

/// Per-axis scale factors (column lengths of the linear part)
pub fn axis_scales(m: &Matrix4<f64>) -> Vector3<f64> {
    let linear = linear_part(m);
    Vector3::new(
        linear.column(0).norm(),
        linear.column(1).norm(),
        linear.column(2).norm(),
    )
}

/// Whether the linear part is a rotation times a single scale factor.
///
/// Checks equal column lengths and mutually orthogonal columns.
pub fn is_uniform_scale(m: &Matrix4<f64>) -> bool {
    let linear = linear_part(m);
    let scales = axis_scales(m);
    let reference = scales.max().max(f64::MIN_POSITIVE);

    if (scales.max() - scales.min()) / reference > SCALE_EPSILON {
        return false;
    }

    let c0 = linear.column(0);
    let c1 = linear.column(1);
    let c2 = linear.column(2);
    let tol = SCALE_EPSILON * reference * reference;
    c0.dot(&c1).abs() <= tol && c1.dot(&c2).abs() <= tol && c0.dot(&c2).abs() <= tol
}

/// Transform a flat position triple
#[inline]
pub fn transform_position(m: &Matrix4<f64>, x: f32, y: f32, z: f32) -> Point3<f64> {
    m.transform_point(&Point3::new(x as f64, y as f64, z as f64))
}

/// Transform a flat normal triple with a precomputed normal matrix and re-normalize
#[inline]
pub fn transform_normal(normal_matrix: &Matrix3<f64>, x: f32, y: f32, z: f32) -> Vector3<f64> {
    let n = normal_matrix * Vector3::new(x as f64, y as f64, z as f64);
    n.try_normalize(f64::EPSILON).unwrap_or_else(Vector3::zeros)
}
