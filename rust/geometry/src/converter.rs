// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry Converter - scene tree to render views
//!
//! Walks the scene-object tree, composes node transforms, decodes every raw
//! mesh payload into a triangle [`Mesh`] with computed normals and emits one
//! [`RenderView`] per surviving payload. Broken payloads are logged and
//! skipped without affecting siblings.

use std::sync::Arc;

use nalgebra::Matrix4;
use retrofit_core::{RawMesh, SceneNode};

use crate::error::{Error, Result};
use crate::faces::decode_faces;
use crate::mesh::Mesh;
use crate::normals::calculate_normals;
use crate::render_view::RenderView;
use crate::transform::from_row_major;

/// Counters from the last conversion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionStats {
    pub nodes: usize,
    pub meshes: usize,
    pub views: usize,
    pub skipped_meshes: usize,
    pub skipped_faces: usize,
}

/// Converts scene trees into flat render view lists
#[derive(Debug, Default)]
pub struct GeometryConverter {
    stats: ConversionStats,
}

impl GeometryConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statistics of the most recent [`GeometryConverter::convert`] call
    pub fn stats(&self) -> &ConversionStats {
        &self.stats
    }

    /// Flatten a scene tree into render views, in depth-first order.
    pub fn convert(&mut self, root: &SceneNode) -> Vec<RenderView> {
        self.stats = ConversionStats::default();
        let mut views = Vec::new();
        self.visit(root, &Matrix4::identity(), &mut views);

        tracing::info!(
            nodes = self.stats.nodes,
            meshes = self.stats.meshes,
            views = self.stats.views,
            skipped_meshes = self.stats.skipped_meshes,
            skipped_faces = self.stats.skipped_faces,
            "Scene conversion complete"
        );
        views
    }

    fn visit(&mut self, node: &SceneNode, parent: &Matrix4<f64>, views: &mut Vec<RenderView>) {
        self.stats.nodes += 1;

        let world = match node.local_transform() {
            Ok(Some(local)) => parent * from_row_major(&local),
            Ok(None) => *parent,
            Err(e) => {
                tracing::warn!(node = %node.id, error = %e, "Ignoring invalid node transform");
                *parent
            }
        };

        if !node.display_values.is_empty() {
            let properties = Arc::new(node.properties.clone());
            for raw in &node.display_values {
                self.stats.meshes += 1;
                match self.convert_raw(raw) {
                    Ok(mesh) => {
                        let mut view = RenderView::new(node.id.clone(), mesh)
                            .with_type(node.speckle_type.clone())
                            .with_properties(Arc::clone(&properties))
                            .with_transform(world);
                        view.mesh_id = raw.id.clone();
                        view.render_material = raw.render_material.clone();
                        views.push(view);
                        self.stats.views += 1;
                    }
                    Err(e) => {
                        self.stats.skipped_meshes += 1;
                        tracing::warn!(
                            node = %node.id,
                            mesh = raw.id.as_deref().unwrap_or("<anonymous>"),
                            error = %e,
                            "Skipping mesh"
                        );
                    }
                }
            }
        }

        for child in &node.children {
            self.visit(child, &world, views);
        }
    }

    fn convert_raw(&mut self, raw: &RawMesh) -> Result<Mesh> {
        let decoded = decode_faces(&raw.faces, raw.vertex_count());
        for problem in &decoded.skipped {
            tracing::warn!(
                mesh = raw.id.as_deref().unwrap_or("<anonymous>"),
                error = %problem,
                "Skipping face"
            );
        }
        self.stats.skipped_faces += decoded.skipped.len();
        build_mesh(raw, &decoded.to_triangle_indices())
    }
}

/// Convert one raw payload into a triangle mesh.
///
/// Authored normals are kept when there is one per vertex; otherwise they
/// are computed from the triangles.
///
/// Fails with [`Error::EmptyMesh`] when no valid triangle survives decoding.
pub fn convert_mesh(raw: &RawMesh) -> Result<Mesh> {
    let decoded = decode_faces(&raw.faces, raw.vertex_count());
    build_mesh(raw, &decoded.to_triangle_indices())
}

fn build_mesh(raw: &RawMesh, indices: &[u32]) -> Result<Mesh> {
    if raw.vertices.len() % 3 != 0 {
        return Err(Error::InvalidVertexBuffer(raw.vertices.len()));
    }
    let id = || raw.id.clone().unwrap_or_else(|| "<anonymous>".to_string());
    if indices.is_empty() {
        return Err(Error::EmptyMesh(id()));
    }

    let vertex_count = raw.vertex_count();
    let mut mesh = Mesh::with_capacity(vertex_count, indices.len());
    mesh.positions
        .extend(raw.vertices.iter().map(|&v| v as f32));
    mesh.indices.extend_from_slice(indices);

    if raw.texture_coordinates.len() == vertex_count * 2 {
        mesh.uvs
            .extend(raw.texture_coordinates.iter().map(|&v| v as f32));
    }

    if raw.vertex_normals.len() == vertex_count * 3 {
        mesh.normals
            .extend(raw.vertex_normals.iter().map(|&v| v as f32));
    } else {
        calculate_normals(&mut mesh);
    }
    Ok(mesh)
}
