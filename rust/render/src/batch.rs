// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Merged mesh batches
//!
//! A [`MeshBatch`] is one drawable unit: a single merged vertex/index buffer,
//! the ordered [`BatchObject`] records that say which triangles belong to
//! which element, the seven-entry material palette and the draw groups that
//! map index ranges onto that palette.

use std::fmt;
use std::sync::Arc;

use retrofit_core::{ElementId, Properties};
use retrofit_geometry::transform::{
    is_mirroring, is_uniform_scale, linear_part, normal_matrix, transform_normal, transform_position,
};
use retrofit_geometry::{calculate_normals, flip_winding, project_box_uvs, Aabb, Mesh, RenderView};

use crate::config::NormalMode;
use crate::draw_ranges::{coalesce, integrate_ranges, DrawGroup, DrawRange};
use crate::error::{Error, Result};
use crate::material::Material;
use crate::palette::MaterialSlot;

/// Unique id of a batch within one batcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchId(pub u32);

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch-{}", self.0)
    }
}

/// One element's record inside a batch.
///
/// `[start_face_index, end_face_index)` counts triangles in the merged index
/// buffer.
#[derive(Debug, Clone)]
pub struct BatchObject {
    pub element_id: ElementId,
    pub speckle_type: String,
    pub properties: Arc<Properties>,
    pub material_name: Option<String>,
    pub start_face_index: u32,
    pub end_face_index: u32,
    /// False while the element is filtered out
    pub visible: bool,
}

impl BatchObject {
    #[inline]
    pub fn face_count(&self) -> u32 {
        self.end_face_index - self.start_face_index
    }

    #[inline]
    pub fn contains_face(&self, face: u32) -> bool {
        face >= self.start_face_index && face < self.end_face_index
    }

    /// Draw group covering this object's triangles
    #[inline]
    pub fn draw_group(&self, slot: MaterialSlot) -> DrawGroup {
        DrawGroup::new(self.start_face_index * 3, self.face_count() * 3, slot.index())
    }
}

/// Merged geometry for one material chunk
#[derive(Debug, Clone)]
pub struct MeshBatch {
    id: BatchId,
    material_name: String,
    geometry: Mesh,
    objects: Vec<BatchObject>,
    materials: Vec<Arc<Material>>,
    groups: Vec<DrawGroup>,
    bounds: Aabb,
}

impl MeshBatch {
    /// Merge render views into one batch.
    ///
    /// Every member is placed by its own world transform; indices are offset
    /// into the merged buffer and the member's triangle range is recorded in
    /// insertion order. Normals are produced per `normal_mode`, then box UVs
    /// are projected over the whole merged buffer.
    pub fn build(
        id: BatchId,
        material_name: &str,
        views: &[&RenderView],
        materials: Vec<Arc<Material>>,
        uv_scale: f64,
        normal_mode: NormalMode,
    ) -> Result<Self> {
        let total_vertices: usize = views.iter().map(|v| v.vertex_count()).sum();
        let total_indices: usize = views.iter().map(|v| v.triangle_count() * 3).sum();
        if total_vertices > u32::MAX as usize || total_indices > u32::MAX as usize {
            return Err(Error::VertexOverflow(total_vertices));
        }

        let mut geometry = Mesh::with_capacity(total_vertices, total_indices);
        let mut objects = Vec::with_capacity(views.len());

        for view in views {
            let start_face_index = geometry.triangle_count() as u32;
            let member = place_member(view, normal_mode)?;
            geometry.merge(&member);

            objects.push(BatchObject {
                element_id: view.element_id.clone(),
                speckle_type: view.speckle_type.clone(),
                properties: Arc::clone(&view.properties),
                material_name: Some(material_name.to_string()),
                start_face_index,
                end_face_index: geometry.triangle_count() as u32,
                visible: true,
            });
        }

        if normal_mode == NormalMode::Recompute || !geometry.has_normals() {
            calculate_normals(&mut geometry);
        }
        project_box_uvs(&mut geometry, uv_scale);

        let bounds = geometry.bounds();
        let index_count = geometry.indices.len() as u32;

        tracing::debug!(
            batch = %id,
            material = material_name,
            objects = objects.len(),
            vertices = geometry.vertex_count(),
            triangles = geometry.triangle_count(),
            "Built batch"
        );

        Ok(Self {
            id,
            material_name: material_name.to_string(),
            geometry,
            objects,
            materials,
            groups: vec![DrawGroup::new(0, index_count, MaterialSlot::Base.index())],
            bounds,
        })
    }

    pub fn id(&self) -> BatchId {
        self.id
    }

    pub fn material_name(&self) -> &str {
        &self.material_name
    }

    /// Merged world-space buffers
    pub fn geometry(&self) -> &Mesh {
        &self.geometry
    }

    pub fn objects(&self) -> &[BatchObject] {
        &self.objects
    }

    /// Material palette; draw groups index into this
    pub fn materials(&self) -> &[Arc<Material>] {
        &self.materials
    }

    /// The batch's own material (palette slot 0)
    pub fn base_material(&self) -> Option<&Material> {
        self.materials.first().map(|m| m.as_ref())
    }

    pub fn groups(&self) -> &[DrawGroup] {
        &self.groups
    }

    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.geometry.vertex_count()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.geometry.triangle_count()
    }

    #[inline]
    pub fn index_count(&self) -> u32 {
        self.geometry.indices.len() as u32
    }

    /// Object owning triangle `face`, by binary search over the face ranges.
    pub fn object_at_face(&self, face: u32) -> Option<&BatchObject> {
        let i = self.objects.partition_point(|o| o.end_face_index <= face);
        self.objects.get(i).filter(|o| o.contains_face(face))
    }

    /// Objects of one element (an element may contribute several parts)
    pub fn objects_for<'a>(&'a self, element_id: &'a str) -> impl Iterator<Item = &'a BatchObject> + 'a {
        self.objects.iter().filter(move |o| o.element_id == element_id)
    }

    /// Draw ranges that paint every part of `element_id` with `slot`
    pub fn element_ranges(&self, element_id: &str, slot: MaterialSlot) -> Vec<DrawRange<MaterialSlot>> {
        self.objects_for(element_id)
            .filter(|o| o.face_count() > 0)
            .map(|o| DrawRange::new(o.start_face_index * 3, o.face_count() * 3, slot))
            .collect()
    }

    /// Rebuild all draw groups from per-object slots.
    ///
    /// Objects resolved to the hidden slot become invisible. Groups are built per object,
    /// zero-length ranges skipped, and contiguous equal-slot groups merged.
    /// An empty result falls back to one full-range base group.
    pub(crate) fn rebuild_groups<F>(&mut self, mut slot_for: F)
    where
        F: FnMut(&BatchObject) -> MaterialSlot,
    {
        let mut raw = Vec::with_capacity(self.objects.len());
        for object in &mut self.objects {
            let slot = slot_for(object);
            object.visible = slot != MaterialSlot::Hidden;
            raw.push(object.draw_group(slot));
        }

        let groups = coalesce(raw);
        self.groups = if groups.is_empty() {
            vec![DrawGroup::new(0, self.index_count(), MaterialSlot::Base.index())]
        } else {
            groups
        };
    }

    /// Compose slot overrides onto the current draw groups.
    ///
    /// This is the incremental path: groups outside `ranges` are untouched.
    /// Object visibility is not changed.
    pub fn apply_draw_ranges(&mut self, ranges: &[DrawRange<MaterialSlot>]) -> Result<()> {
        self.groups = integrate_ranges(&self.groups, &MaterialSlot::ALL, ranges)?;
        Ok(())
    }

    /// Slot currently drawn at triangle `face`
    pub fn slot_at_face(&self, face: u32) -> Option<MaterialSlot> {
        let index = face * 3;
        let i = self.groups.partition_point(|g| g.end() <= index);
        self.groups
            .get(i)
            .filter(|g| g.contains(index))
            .and_then(|g| MaterialSlot::from_index(g.material_index))
    }
}

/// Copy one render view into world space, ready to merge.
fn place_member(view: &RenderView, normal_mode: NormalMode) -> Result<Mesh> {
    let source = &view.geometry;
    let vertex_count = source.vertex_count();
    let index_count = source.triangle_count() * 3;

    let mut member = Mesh::with_capacity(vertex_count, index_count);
    for p in source.positions.chunks_exact(3) {
        let w = transform_position(&view.transform, p[0], p[1], p[2]);
        member.positions.extend_from_slice(&[w.x as f32, w.y as f32, w.z as f32]);
    }

    for &index in &source.indices[..index_count] {
        if index as usize >= vertex_count {
            return Err(retrofit_geometry::Error::IndexOutOfRange {
                index: index as i64,
                vertex_count,
            }
            .into());
        }
        member.indices.push(index);
    }

    if is_mirroring(&view.transform) {
        flip_winding(&mut member.indices);
    }

    if normal_mode == NormalMode::TransformSource {
        if source.has_normals() {
            // Rotation times uniform scale maps normals like points
            let nm = if is_uniform_scale(&view.transform) {
                linear_part(&view.transform)
            } else {
                tracing::trace!(element = %view.element_id, "Non-uniform scale, using inverse-transpose normals");
                normal_matrix(&view.transform)
            };
            for n in source.normals.chunks_exact(3) {
                let w = transform_normal(&nm, n[0], n[1], n[2]);
                member.normals.extend_from_slice(&[w.x as f32, w.y as f32, w.z as f32]);
            }
        } else {
            calculate_normals(&mut member);
        }
    }

    Ok(member)
}
