// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Render views: one convertible leaf geometry plus its element identity

use std::sync::Arc;

use nalgebra::Matrix4;
use retrofit_core::{ElementId, MaterialProps, Properties};

use crate::bounds::Aabb;
use crate::mesh::Mesh;

/// One leaf geometry extracted from the scene tree, ready for batching.
///
/// The geometry is shared and never mutated after creation; batching copies
/// it into merged buffers.
#[derive(Debug, Clone)]
pub struct RenderView {
    /// Owning building element (shared by all parts of one element)
    pub element_id: ElementId,
    /// Type tag of the owning element
    pub speckle_type: String,
    pub properties: Arc<Properties>,
    /// Local-space geometry
    pub geometry: Arc<Mesh>,
    /// Local to world placement
    pub transform: Matrix4<f64>,
    /// Key for the external mesh -> material name lookup
    pub mesh_id: Option<String>,
    /// Local-space bounds of `geometry`
    pub aabb: Option<Aabb>,
    /// Render material declared by the source mesh
    pub render_material: Option<MaterialProps>,
}

impl RenderView {
    /// View with identity transform and empty properties
    pub fn new(element_id: impl Into<ElementId>, geometry: Mesh) -> Self {
        let aabb = geometry.bounds();
        Self {
            element_id: element_id.into(),
            speckle_type: String::new(),
            properties: Arc::new(Properties::default()),
            geometry: Arc::new(geometry),
            transform: Matrix4::identity(),
            mesh_id: None,
            aabb: (!aabb.is_empty()).then_some(aabb),
            render_material: None,
        }
    }

    pub fn with_transform(mut self, transform: Matrix4<f64>) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_mesh_id(mut self, mesh_id: impl Into<String>) -> Self {
        self.mesh_id = Some(mesh_id.into());
        self
    }

    pub fn with_type(mut self, speckle_type: impl Into<String>) -> Self {
        self.speckle_type = speckle_type.into();
        self
    }

    pub fn with_properties(mut self, properties: Arc<Properties>) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_render_material(mut self, material: MaterialProps) -> Self {
        self.render_material = Some(material);
        self
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.geometry.vertex_count()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.geometry.triangle_count()
    }

    /// Local bounds, computed from the geometry when not cached
    pub fn local_bounds(&self) -> Aabb {
        self.aabb.unwrap_or_else(|| self.geometry.bounds())
    }

    /// World-space bounds (transformed local box)
    pub fn world_bounds(&self) -> Aabb {
        self.local_bounds().transformed(&self.transform)
    }
}
