// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Box (tri-planar) UV projection
//!
//! Source meshes come from many authoring tools with inconsistent or missing
//! texture coordinates. After merging, every vertex is given UVs by projecting
//! its world position onto the plane picked by the dominant axis of its
//! normal, so textures line up across elements.

use nalgebra::Vector3;

use crate::bounds::Aabb;
use crate::mesh::Mesh;

/// Projection plane selected for a vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionAxis {
    /// Normal mostly along X: project onto the YZ plane
    X,
    /// Normal mostly along Y: project onto the XZ plane
    Y,
    /// Normal mostly along Z: project onto the XY plane
    Z,
}

impl ProjectionAxis {
    /// Dominant axis of a normal. Ties resolve X, then Y, then Z; a zero
    /// normal falls through to Z.
    pub fn dominant(normal: &Vector3<f64>) -> Self {
        let (ax, ay, az) = (normal.x.abs(), normal.y.abs(), normal.z.abs());
        if ax > 0.0 && ax >= ay && ax >= az {
            ProjectionAxis::X
        } else if ay > 0.0 && ay >= az {
            ProjectionAxis::Y
        } else {
            ProjectionAxis::Z
        }
    }

    /// Planar coordinates of a position on this axis' plane
    #[inline]
    pub fn project(self, x: f64, y: f64, z: f64) -> (f64, f64) {
        match self {
            ProjectionAxis::X => (y, z),
            ProjectionAxis::Y => (x, z),
            ProjectionAxis::Z => (x, y),
        }
    }
}

/// UV scale for a model given one representative bounding box.
///
/// Source data whose largest extent exceeds `threshold` is assumed to be in
/// millimetres and gets `millimeter_scale`; anything else keeps 1.0.
pub fn unit_uv_scale(representative: &Aabb, threshold: f64, millimeter_scale: f64) -> f64 {
    if representative.largest_extent() > threshold {
        millimeter_scale
    } else {
        1.0
    }
}

/// Overwrite the mesh UVs with a box projection.
///
/// Requires per-vertex normals; a mesh without them gets Z-plane projection.
pub fn project_box_uvs(mesh: &mut Mesh, scale: f64) {
    let vertex_count = mesh.vertex_count();
    let has_normals = mesh.has_normals();

    mesh.uvs.clear();
    mesh.uvs.reserve(vertex_count * 2);

    for i in 0..vertex_count {
        let axis = if has_normals {
            let n = Vector3::new(
                mesh.normals[i * 3] as f64,
                mesh.normals[i * 3 + 1] as f64,
                mesh.normals[i * 3 + 2] as f64,
            );
            ProjectionAxis::dominant(&n)
        } else {
            ProjectionAxis::Z
        };

        let p = mesh.position(i);
        let (u, v) = axis.project(p.x, p.y, p.z);
        mesh.uvs.push((u * scale) as f32);
        mesh.uvs.push((v * scale) as f32);
    }
}
