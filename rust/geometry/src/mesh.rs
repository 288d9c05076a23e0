// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh data structures

use nalgebra::Point3;

use crate::bounds::Aabb;

/// Triangle mesh
///
/// Flat buffers in the layout GPUs consume. `normals` and `uvs` are either
/// empty or hold one entry per vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    /// Vertex positions (x, y, z)
    pub positions: Vec<f32>,
    /// Vertex normals (nx, ny, nz)
    pub normals: Vec<f32>,
    /// Texture coordinates (u, v)
    pub uvs: Vec<f32>,
    /// Triangle indices (i0, i1, i2)
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            positions: Vec::new(),
            normals: Vec::new(),
            uvs: Vec::new(),
            indices: Vec::new(),
        }
    }

    /// Create a mesh with capacity
    pub fn with_capacity(vertex_count: usize, index_count: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertex_count * 3),
            normals: Vec::with_capacity(vertex_count * 3),
            uvs: Vec::new(),
            indices: Vec::with_capacity(index_count),
        }
    }

    /// Merge another mesh into this one
    ///
    /// UVs survive only if both sides carry them.
    #[inline]
    pub fn merge(&mut self, other: &Mesh) {
        if other.is_empty() {
            return;
        }

        let keep_uvs = (self.is_empty() || self.has_uvs()) && other.has_uvs();
        let vertex_offset = (self.positions.len() / 3) as u32;

        self.positions.reserve(other.positions.len());
        self.normals.reserve(other.normals.len());
        self.indices.reserve(other.indices.len());

        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        if keep_uvs {
            self.uvs.extend_from_slice(&other.uvs);
        } else {
            self.uvs.clear();
        }

        self.indices
            .extend(other.indices.iter().map(|&i| i + vertex_offset));
    }

    /// Get vertex count
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Get triangle count
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check if mesh is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Whether every vertex has a normal
    #[inline]
    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty() && self.normals.len() == self.positions.len()
    }

    /// Whether every vertex has a texture coordinate
    #[inline]
    pub fn has_uvs(&self) -> bool {
        !self.uvs.is_empty() && self.uvs.len() / 2 == self.vertex_count()
    }

    /// Position of vertex `i`
    #[inline]
    pub fn position(&self, i: usize) -> Point3<f64> {
        Point3::new(
            self.positions[i * 3] as f64,
            self.positions[i * 3 + 1] as f64,
            self.positions[i * 3 + 2] as f64,
        )
    }

    /// Vertex indices of triangle `face`
    #[inline]
    pub fn triangle(&self, face: usize) -> [usize; 3] {
        [
            self.indices[face * 3] as usize,
            self.indices[face * 3 + 1] as usize,
            self.indices[face * 3 + 2] as usize,
        ]
    }

    /// Axis-aligned bounds of all positions
    #[inline]
    pub fn bounds(&self) -> Aabb {
        Aabb::from_positions(&self.positions)
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}
