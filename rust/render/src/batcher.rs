// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Batcher - render views to material batches, plus per-element visual state
//!
//! One `Batcher` exists per loaded model (and per pass, e.g. elements and
//! rooms). [`Batcher::make_batches`] groups render views by material name,
//! packs each group into vertex-budgeted chunks and merges every chunk into a
//! [`MeshBatch`]. Filter, highlight, hover and phase state live here and are
//! expressed by rebuilding each batch's draw groups.

use std::ops::Range;
use std::rc::Rc;

use retrofit_core::{ElementId, PhaseStatus};
use retrofit_geometry::{unit_uv_scale, Aabb, RenderView};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::batch::{BatchId, BatchObject, MeshBatch};
use crate::config::BatcherConfig;
use crate::error::{Error, Result};
use crate::material::{MaterialResolver, Side};
use crate::palette::{build_palette, resolve_slot, MaterialSlot, VisualFlags};

/// Split a sequence of vertex counts into consecutive chunks.
///
/// Greedy and order preserving: a chunk is flushed before the view that
/// would push it over `ceiling`. A view larger than `ceiling` on its own
/// still gets a chunk of its own.
pub fn pack_by_vertex_budget(vertex_counts: &[usize], ceiling: usize) -> Vec<Range<usize>> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut running = 0usize;

    for (i, &count) in vertex_counts.iter().enumerate() {
        if i > start && running + count > ceiling {
            chunks.push(start..i);
            start = i;
            running = 0;
        }
        running += count;
    }
    if start < vertex_counts.len() {
        chunks.push(start..vertex_counts.len());
    }
    chunks
}

/// Borrowed view of the state sets, used while batches are mutated
struct VisualState<'a> {
    filter: Option<&'a FxHashSet<ElementId>>,
    highlighted: &'a FxHashSet<ElementId>,
    hovered: &'a FxHashSet<ElementId>,
    phase_status: &'a FxHashMap<ElementId, PhaseStatus>,
}

impl VisualState<'_> {
    fn flags(&self, element_id: &str) -> VisualFlags {
        VisualFlags {
            filtered_out: self.filter.is_some_and(|visible| !visible.contains(element_id)),
            highlighted: self.highlighted.contains(element_id),
            hovered: self.hovered.contains(element_id),
            phase: self.phase_status.get(element_id).copied(),
        }
    }
}

/// Owner of one model's batches and per-element visual state
#[derive(Debug)]
pub struct Batcher {
    config: BatcherConfig,
    resolver: Rc<MaterialResolver>,
    /// mesh id (or element id) -> material name
    material_lookup: FxHashMap<String, String>,
    batches: Vec<MeshBatch>,
    next_batch_id: u32,
    render_back_faces: bool,
    uv_scale: f64,

    /// `None` shows everything
    visible_filter: Option<FxHashSet<ElementId>>,
    highlighted: FxHashSet<ElementId>,
    hovered: FxHashSet<ElementId>,
    phase_status: FxHashMap<ElementId, PhaseStatus>,
    raycast_ignore: FxHashSet<ElementId>,
}

impl Batcher {
    /// Create a batcher with its own material resolver.
    pub fn new(config: BatcherConfig) -> Result<Self> {
        let resolver = Rc::new(MaterialResolver::new(config.texture_size));
        Self::with_resolver(config, resolver)
    }

    /// Create a batcher sharing an existing resolver (and its texture cache).
    pub fn with_resolver(config: BatcherConfig, resolver: Rc<MaterialResolver>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            resolver,
            material_lookup: FxHashMap::default(),
            batches: Vec::new(),
            next_batch_id: 0,
            render_back_faces: false,
            uv_scale: 1.0,
            visible_filter: None,
            highlighted: FxHashSet::default(),
            hovered: FxHashSet::default(),
            phase_status: FxHashMap::default(),
            raycast_ignore: FxHashSet::default(),
        })
    }

    pub fn config(&self) -> &BatcherConfig {
        &self.config
    }

    pub fn resolver(&self) -> &Rc<MaterialResolver> {
        &self.resolver
    }

    /// Install the mesh id -> material name map used by the next
    /// [`Batcher::make_batches`]. Element ids are accepted as keys too.
    pub fn set_material_lookup<I, K, V>(&mut self, lookup: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.material_lookup = lookup
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
    }

    /// Material name assigned to a render view
    pub fn material_name_for<'a>(&'a self, view: &'a RenderView) -> &'a str {
        view.mesh_id
            .as_deref()
            .and_then(|id| self.material_lookup.get(id))
            .or_else(|| self.material_lookup.get(view.element_id.as_str()))
            .map(String::as_str)
            .unwrap_or(&self.config.default_material)
    }

    /// Replace all batches with a fresh set built from `views`.
    ///
    /// State sets survive; the visual state is recomputed once at the end.
    /// A failing material group is logged and skipped.
    pub fn make_batches(&mut self, views: &[RenderView], render_back_faces: bool) {
        self.batches.clear();
        self.render_back_faces = render_back_faces;

        // First view with real bounds decides the unit scale
        self.uv_scale = views
            .iter()
            .map(RenderView::local_bounds)
            .find(|b| !b.is_empty())
            .map_or(1.0, |b| {
                unit_uv_scale(&b, self.config.millimeter_threshold, self.config.millimeter_uv_scale)
            });

        // Group by material name in order of first appearance
        let mut group_index: FxHashMap<&str, usize> = FxHashMap::default();
        let mut groups: Vec<(&str, Vec<&RenderView>)> = Vec::new();
        for view in views {
            let name = self.material_name_for(view);
            let slot = *group_index.entry(name).or_insert_with(|| {
                groups.push((name, Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(view);
        }

        let mut built = Vec::new();
        let mut failed = 0usize;
        let mut next_id = self.next_batch_id;

        for (name, members) in &groups {
            let counts: Vec<usize> = members.iter().map(|v| v.vertex_count()).collect();
            for chunk in pack_by_vertex_budget(&counts, self.config.vertex_ceiling) {
                let chunk_views = &members[chunk];
                let mut material = self
                    .resolver
                    .resolve(name, chunk_views.iter().find_map(|v| v.render_material.as_ref()));
                if render_back_faces {
                    material.side = Side::Back;
                }
                let palette = build_palette(material, &self.config.palette, render_back_faces);

                let id = BatchId(next_id);
                next_id += 1;
                match MeshBatch::build(id, name, chunk_views, palette, self.uv_scale, self.config.normal_mode) {
                    Ok(batch) => built.push(batch),
                    Err(e) => {
                        failed += 1;
                        let e = Error::BatchConstruction {
                            material: name.to_string(),
                            reason: e.to_string(),
                        };
                        tracing::warn!(views = chunk_views.len(), error = %e, "Skipping material group");
                    }
                }
            }
        }

        let material_count = groups.len();
        self.next_batch_id = next_id;
        self.batches = built;

        tracing::info!(
            views = views.len(),
            materials = material_count,
            batch_count = self.batches.len(),
            failed,
            object_count = self.batches.iter().map(|b| b.objects().len()).sum::<usize>(),
            triangles = self.batches.iter().map(MeshBatch::triangle_count).sum::<usize>(),
            uv_scale = self.uv_scale,
            "Batches built"
        );

        self.update_visual_state();
    }

    /// Recompute every batch's draw groups from the current state sets.
    pub fn update_visual_state(&mut self) {
        let state = VisualState {
            filter: self.visible_filter.as_ref(),
            highlighted: &self.highlighted,
            hovered: &self.hovered,
            phase_status: &self.phase_status,
        };
        let back_faces = self.render_back_faces;

        for batch in &mut self.batches {
            batch.rebuild_groups(|object| resolve_slot(&state.flags(&object.element_id), back_faces));
        }

        tracing::trace!(batches = self.batches.len(), "Visual state updated");
    }

    /// Show only `visible` elements; `None` shows everything.
    pub fn set_filter(&mut self, visible: Option<&FxHashSet<ElementId>>) {
        self.visible_filter = visible.cloned();
        self.update_visual_state();
    }

    pub fn highlight<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<ElementId>,
    {
        self.highlighted = ids.into_iter().map(Into::into).collect();
        self.update_visual_state();
    }

    pub fn clear_highlight(&mut self) {
        self.highlighted.clear();
        self.update_visual_state();
    }

    pub fn hover<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<ElementId>,
    {
        self.hovered = ids.into_iter().map(Into::into).collect();
        self.update_visual_state();
    }

    pub fn clear_hover(&mut self) {
        self.hovered.clear();
        self.update_visual_state();
    }

    /// Colour elements by lifecycle status (replaces any previous map).
    pub fn apply_phase_colors(&mut self, statuses: FxHashMap<ElementId, PhaseStatus>) {
        self.phase_status = statuses;
        self.update_visual_state();
    }

    pub fn clear_phase_colors(&mut self) {
        self.phase_status.clear();
        self.update_visual_state();
    }

    /// Elements the raycaster skips. Does not affect rendering.
    pub fn set_raycast_ignore<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<ElementId>,
    {
        self.raycast_ignore = ids.into_iter().map(Into::into).collect();
    }

    pub fn is_raycast_ignored(&self, element_id: &str) -> bool {
        self.raycast_ignore.contains(element_id)
    }

    pub fn is_filtered_out(&self, element_id: &str) -> bool {
        self.visual_state().flags(element_id).filtered_out
    }

    /// Palette slot an element currently resolves to
    pub fn resolved_slot(&self, element_id: &str) -> MaterialSlot {
        resolve_slot(&self.visual_state().flags(element_id), self.render_back_faces)
    }

    /// Paint an element with `slot` through the incremental draw-range path.
    ///
    /// Other elements' groups are left alone. The overlay lasts until the
    /// next visual-state recompute.
    pub fn apply_overlay(&mut self, element_id: &str, slot: MaterialSlot) -> Result<()> {
        for batch in &mut self.batches {
            let ranges = batch.element_ranges(element_id, slot);
            if !ranges.is_empty() {
                batch.apply_draw_ranges(&ranges)?;
            }
        }
        Ok(())
    }

    fn visual_state(&self) -> VisualState<'_> {
        VisualState {
            filter: self.visible_filter.as_ref(),
            highlighted: &self.highlighted,
            hovered: &self.hovered,
            phase_status: &self.phase_status,
        }
    }

    /// Current batches; valid until the next [`Batcher::make_batches`]
    pub fn batches(&self) -> &[MeshBatch] {
        &self.batches
    }

    pub fn batch(&self, id: BatchId) -> Option<&MeshBatch> {
        self.batches.iter().find(|b| b.id() == id)
    }

    pub fn render_back_faces(&self) -> bool {
        self.render_back_faces
    }

    /// UV scale chosen by the last [`Batcher::make_batches`]
    pub fn uv_scale(&self) -> f64 {
        self.uv_scale
    }

    /// Distinct element ids across all batches, in batch order
    pub fn element_ids(&self) -> Vec<&str> {
        let mut seen = FxHashSet::default();
        self.batches
            .iter()
            .flat_map(|b| b.objects())
            .map(|o| o.element_id.as_str())
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Every batch object of one element
    pub fn objects_for(&self, element_id: &str) -> Vec<(BatchId, &BatchObject)> {
        self.batches
            .iter()
            .flat_map(|b| {
                b.objects()
                    .iter()
                    .filter(move |o| o.element_id == element_id)
                    .map(move |o| (b.id(), o))
            })
            .collect()
    }

    /// World bounds of all batches
    pub fn bounds(&self) -> Aabb {
        self.batches
            .iter()
            .fold(Aabb::empty(), |acc, b| acc.union(b.bounds()))
    }

    /// Drop all batches and state.
    pub fn clear(&mut self) {
        self.batches.clear();
        self.visible_filter = None;
        self.highlighted.clear();
        self.hovered.clear();
        self.phase_status.clear();
        self.raycast_ignore.clear();
    }
}
