// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::rc::Rc;

use nalgebra::{Matrix4, Vector3};
use retrofit_core::{ElementId, PhaseStatus, SceneNode};
use retrofit_geometry::{calculate_normals, GeometryConverter, Mesh, RenderView};
use retrofit_render::{
    is_canonical_partition, Batcher, BatcherConfig, DrawGroup, MaterialResolver, MaterialSlot, MeshBatch, NormalMode,
    Side,
};
use rustc_hash::{FxHashMap, FxHashSet};

/// Unit quad in the XY plane facing +Z
fn quad() -> Mesh {
    let mut mesh = Mesh::new();
    mesh.positions = vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0];
    mesh.indices = vec![0, 1, 2, 0, 2, 3];
    calculate_normals(&mut mesh);
    mesh
}

/// Strip of `n` quads: 2n + 2 vertices, 2n triangles
fn strip(n: usize) -> Mesh {
    let mut mesh = Mesh::new();
    for i in 0..=n {
        mesh.positions.extend_from_slice(&[i as f32, 0.0, 0.0, i as f32, 1.0, 0.0]);
    }
    for i in 0..n as u32 {
        let a = i * 2;
        mesh.indices.extend_from_slice(&[a, a + 2, a + 3, a, a + 3, a + 1]);
    }
    calculate_normals(&mut mesh);
    mesh
}

fn quad_view(id: &str, x: f64) -> RenderView {
    RenderView::new(id, quad()).with_transform(Matrix4::new_translation(&Vector3::new(x, 0.0, 0.0)))
}

fn batcher() -> Batcher {
    Batcher::new(BatcherConfig {
        texture_size: 16,
        ..Default::default()
    })
    .unwrap()
}

fn ids(list: &[&str]) -> FxHashSet<ElementId> {
    list.iter().map(|s| s.to_string()).collect()
}

fn assert_coverage(batch: &MeshBatch) {
    let mut cursor = 0;
    for object in batch.objects() {
        assert_eq!(object.start_face_index, cursor, "gap or overlap in {}", batch.id());
        assert!(object.end_face_index >= object.start_face_index);
        cursor = object.end_face_index;
    }
    assert_eq!(cursor as usize, batch.triangle_count());
}

#[test]
fn three_quads_filter_scenario() {
    let views = vec![quad_view("v0", 0.0), quad_view("v1", 2.0), quad_view("v2", 4.0)];
    let mut batcher = batcher();
    batcher.make_batches(&views, false);

    assert_eq!(batcher.batches().len(), 1);
    let batch = &batcher.batches()[0];
    assert_eq!(batch.triangle_count(), 6);
    let ranges: Vec<(u32, u32)> = batch
        .objects()
        .iter()
        .map(|o| (o.start_face_index, o.end_face_index))
        .collect();
    assert_eq!(ranges, vec![(0, 2), (2, 4), (4, 6)]);
    assert_eq!(batch.groups(), &[DrawGroup::new(0, 18, 0)]);

    batcher.set_filter(Some(&ids(&["v0", "v2"])));
    let batch = &batcher.batches()[0];
    assert_eq!(batcher.resolved_slot("v1"), MaterialSlot::Hidden);
    assert!(!batch.objects()[1].visible);
    assert!(batch.objects()[0].visible);
    // The hidden group sits between two base groups that are not merged across it
    assert_eq!(
        batch.groups(),
        &[DrawGroup::new(0, 6, 0), DrawGroup::new(6, 6, 5), DrawGroup::new(12, 6, 0)]
    );

    batcher.set_filter(None);
    assert_eq!(batcher.batches()[0].groups(), &[DrawGroup::new(0, 18, 0)]);
    assert!(batcher.batches()[0].objects().iter().all(|o| o.visible));
}

#[test]
fn face_ranges_cover_every_batch() {
    let views: Vec<RenderView> = (0..20)
        .map(|i| RenderView::new(format!("e{}", i % 7), strip(1 + i % 5)))
        .collect();
    let mut batcher = Batcher::new(BatcherConfig {
        vertex_ceiling: 24,
        ..Default::default()
    })
    .unwrap();
    batcher.make_batches(&views, false);

    assert!(batcher.batches().len() > 1);
    let total: usize = batcher.batches().iter().map(|b| b.triangle_count()).sum();
    assert_eq!(total, views.iter().map(|v| v.triangle_count()).sum::<usize>());
    for batch in batcher.batches() {
        assert_coverage(batch);
    }
}

#[test]
fn vertex_ceiling_is_respected() {
    // 4 vertices per quad, one 22-vertex strip in the middle
    let mut views: Vec<RenderView> = (0..5).map(|i| quad_view(&format!("q{i}"), i as f64 * 2.0)).collect();
    views.insert(2, RenderView::new("big", strip(10)));

    let mut batcher = Batcher::new(BatcherConfig {
        vertex_ceiling: 8,
        ..Default::default()
    })
    .unwrap();
    batcher.make_batches(&views, false);

    let members: Vec<Vec<&str>> = batcher
        .batches()
        .iter()
        .map(|b| b.objects().iter().map(|o| o.element_id.as_str()).collect())
        .collect();
    assert_eq!(
        members,
        vec![vec!["q0", "q1"], vec!["big"], vec!["q2", "q3"], vec!["q4"]]
    );

    for batch in batcher.batches() {
        assert!(batch.vertex_count() <= 8 || batch.objects().len() == 1);
    }
    assert_eq!(batcher.batches()[1].vertex_count(), 22);
}

#[test]
fn precedence_over_all_flag_combinations() {
    // Bit 0 filtered, bit 1 highlighted, bit 2 hovered, bit 3 phase
    let names: Vec<String> = (0..16).map(|i| format!("e{i}")).collect();
    let views: Vec<RenderView> = names
        .iter()
        .enumerate()
        .map(|(i, n)| quad_view(n, i as f64 * 2.0))
        .collect();

    let mut batcher = batcher();
    batcher.make_batches(&views, false);

    let visible: FxHashSet<ElementId> = names
        .iter()
        .enumerate()
        .filter(|(i, _)| i & 1 == 0)
        .map(|(_, n)| n.clone())
        .collect();
    let pick = |bit: usize| {
        names
            .iter()
            .enumerate()
            .filter(move |(i, _)| i & bit != 0)
            .map(|(_, n)| n.clone())
            .collect::<Vec<_>>()
    };
    let phases: FxHashMap<ElementId, PhaseStatus> =
        pick(8).into_iter().map(|n| (n, PhaseStatus::Created)).collect();

    batcher.set_filter(Some(&visible));
    batcher.highlight(pick(2));
    batcher.hover(pick(4));
    batcher.apply_phase_colors(phases);

    let batch = &batcher.batches()[0];
    for (i, name) in names.iter().enumerate() {
        let expected = if i & 1 != 0 {
            MaterialSlot::Hidden
        } else if i & 2 != 0 {
            MaterialSlot::Highlight
        } else if i & 4 != 0 {
            MaterialSlot::Hover
        } else if i & 8 != 0 {
            MaterialSlot::PhaseCreated
        } else {
            MaterialSlot::Base
        };
        assert_eq!(batcher.resolved_slot(name), expected, "flags {i:04b}");

        let object = &batch.objects()[i];
        assert_eq!(batch.slot_at_face(object.start_face_index), Some(expected), "flags {i:04b}");
        assert_eq!(object.visible, i & 1 == 0);
    }
    assert!(is_canonical_partition(batch.groups(), batch.index_count()));
}

#[test]
fn draw_groups_stay_a_canonical_partition() {
    let views: Vec<RenderView> = (0..12)
        .map(|i| RenderView::new(format!("e{i}"), strip(1 + i % 3)))
        .collect();
    let mut batcher = Batcher::new(BatcherConfig {
        vertex_ceiling: 20,
        ..Default::default()
    })
    .unwrap();
    batcher.make_batches(&views, false);

    let check = |batcher: &Batcher| {
        for batch in batcher.batches() {
            assert!(
                is_canonical_partition(batch.groups(), batch.index_count()),
                "{:?}",
                batch.groups()
            );
        }
    };

    check(&batcher);
    batcher.highlight(["e1", "e2", "e7"]);
    check(&batcher);
    batcher.set_filter(Some(&ids(&["e0", "e1", "e5", "e6", "e11"])));
    check(&batcher);
    batcher.hover(["e3"]);
    batcher.apply_phase_colors(
        [("e4".to_string(), PhaseStatus::Demolished), ("e5".to_string(), PhaseStatus::Existing)]
            .into_iter()
            .collect(),
    );
    check(&batcher);
    batcher.clear_highlight();
    batcher.clear_hover();
    batcher.clear_phase_colors();
    batcher.set_filter(None);
    check(&batcher);
    assert!(batcher.batches().iter().all(|b| b.groups().len() == 1));
}

#[test]
fn lookup_groups_by_material_in_first_appearance_order() {
    let views = vec![
        quad_view("w1", 0.0).with_mesh_id("m-wall-1"),
        quad_view("g1", 2.0).with_mesh_id("m-glass"),
        quad_view("w2", 4.0).with_mesh_id("m-wall-2"),
        quad_view("x", 6.0),
        quad_view("slab", 8.0),
    ];
    let mut batcher = batcher();
    batcher.set_material_lookup([
        ("m-wall-1", "Brick"),
        ("m-wall-2", "Brick"),
        ("m-glass", "Glass"),
        ("slab", "Concrete"),
    ]);
    batcher.make_batches(&views, false);

    let names: Vec<&str> = batcher.batches().iter().map(|b| b.material_name()).collect();
    assert_eq!(names, vec!["Brick", "Glass", "default", "Concrete"]);

    let brick = &batcher.batches()[0];
    let members: Vec<&str> = brick.objects().iter().map(|o| o.element_id.as_str()).collect();
    assert_eq!(members, vec!["w1", "w2"]);
    assert_eq!(brick.objects()[0].material_name.as_deref(), Some("Brick"));
    assert_eq!(brick.materials().len(), MaterialSlot::COUNT);
    assert!(brick.base_material().unwrap().has_maps());
    assert!(!batcher.batches()[1].base_material().unwrap().has_maps());
}

#[test]
fn failing_group_does_not_stop_others() {
    let mut broken = quad();
    broken.indices[4] = 42;
    let views = vec![
        quad_view("ok-1", 0.0).with_mesh_id("a"),
        RenderView::new("bad", broken).with_mesh_id("b"),
        quad_view("ok-2", 4.0).with_mesh_id("c"),
    ];
    let mut batcher = batcher();
    batcher.set_material_lookup([("a", "Oak"), ("b", "Broken"), ("c", "Steel")]);
    batcher.make_batches(&views, false);

    let names: Vec<&str> = batcher.batches().iter().map(|b| b.material_name()).collect();
    assert_eq!(names, vec!["Oak", "Steel"]);
    assert_eq!(batcher.element_ids(), vec!["ok-1", "ok-2"]);
}

#[test]
fn texture_maps_are_generated_once_across_batchers() {
    let resolver = Rc::new(MaterialResolver::new(16));
    let config = BatcherConfig {
        vertex_ceiling: 4,
        texture_size: 16,
        ..Default::default()
    };
    let views = vec![quad_view("a", 0.0), quad_view("b", 2.0)];

    let mut elements = Batcher::with_resolver(config.clone(), Rc::clone(&resolver)).unwrap();
    elements.set_material_lookup([("a", "Brick"), ("b", "Brick")]);
    elements.make_batches(&views, false);

    let mut again = Batcher::with_resolver(config, Rc::clone(&resolver)).unwrap();
    again.set_material_lookup([("a", "Brick")]);
    again.make_batches(&views, false);

    // Two Brick batches in the first batcher, one in the second
    assert_eq!(elements.batches().len(), 2);
    assert_eq!(resolver.generation_count(), 1);
    assert_eq!(resolver.cached_textures(), 1);

    let first = elements.batches()[0].base_material().unwrap().maps.clone().unwrap();
    let second = again.batches()[0].base_material().unwrap().maps.clone().unwrap();
    assert!(Rc::ptr_eq(&resolver, again.resolver()));
    assert!(std::sync::Arc::ptr_eq(&first, &second));
}

#[test]
fn millimetre_model_scales_uvs() {
    let mut big = quad();
    for p in big.positions.iter_mut() {
        *p *= 4000.0;
    }
    calculate_normals(&mut big);
    let views = vec![RenderView::new("slab", big), quad_view("small", 0.0)];

    let mut millimetres = batcher();
    millimetres.make_batches(&views, false);
    assert_eq!(millimetres.uv_scale(), 0.001);

    let uvs = &millimetres.batches()[0].geometry().uvs;
    // Vertex 2 of the big slab sits at (4000, 4000, 0)
    assert!((uvs[4] - 4.0).abs() < 1e-4);
    assert!((uvs[5] - 4.0).abs() < 1e-4);

    let mut metres = batcher();
    metres.make_batches(&[quad_view("small", 0.0)], false);
    assert_eq!(metres.uv_scale(), 1.0);
}

#[test]
fn rebatching_replaces_batches_and_keeps_state() {
    let mut batcher = batcher();
    batcher.make_batches(&[quad_view("a", 0.0)], false);
    let first_id = batcher.batches()[0].id();

    batcher.highlight(["b"]);
    batcher.make_batches(&[quad_view("b", 0.0), quad_view("c", 2.0)], false);

    assert_eq!(batcher.batches().len(), 1);
    assert_ne!(batcher.batches()[0].id(), first_id);
    assert!(batcher.batch(first_id).is_none());
    assert_eq!(batcher.batches()[0].slot_at_face(0), Some(MaterialSlot::Highlight));
    assert_eq!(batcher.objects_for("c").len(), 1);
    assert_eq!(batcher.bounds().max.x, 3.0);

    batcher.clear();
    assert!(batcher.batches().is_empty());
    assert_eq!(batcher.resolved_slot("b"), MaterialSlot::Base);
}

#[test]
fn rooms_pass_uses_back_faces_and_ignores_phases() {
    let mut rooms = batcher();
    rooms.make_batches(&[quad_view("room-1", 0.0)], true);
    rooms.apply_phase_colors([("room-1".to_string(), PhaseStatus::Created)].into_iter().collect());

    let batch = &rooms.batches()[0];
    assert_eq!(batch.base_material().unwrap().side, Side::Back);
    assert_eq!(batch.materials()[MaterialSlot::Highlight.index() as usize].side, Side::Back);
    assert_eq!(batch.groups(), &[DrawGroup::new(0, 6, 0)]);

    rooms.highlight(["room-1"]);
    assert_eq!(rooms.batches()[0].groups(), &[DrawGroup::new(0, 6, 1)]);
}

#[test]
fn overlays_use_the_incremental_path() {
    let views = vec![quad_view("v0", 0.0), quad_view("v1", 2.0), quad_view("v2", 4.0)];
    let mut batcher = batcher();
    batcher.make_batches(&views, false);
    batcher.highlight(["v0"]);

    batcher.apply_overlay("v2", MaterialSlot::Hover).unwrap();
    assert_eq!(
        batcher.batches()[0].groups(),
        &[DrawGroup::new(0, 6, 1), DrawGroup::new(6, 6, 0), DrawGroup::new(12, 6, 6)]
    );

    // The next full recompute drops the overlay
    batcher.update_visual_state();
    assert_eq!(
        batcher.batches()[0].groups(),
        &[DrawGroup::new(0, 6, 1), DrawGroup::new(6, 12, 0)]
    );
}

#[test]
fn shared_resolver_with_zero_texture_size_still_batches() {
    let resolver = Rc::new(MaterialResolver::new(0));
    let mut batcher = Batcher::with_resolver(BatcherConfig::default(), resolver).unwrap();
    batcher.set_material_lookup([("w", "Brick")]);
    batcher.make_batches(&[quad_view("w", 0.0)], false);

    assert_eq!(batcher.batches().len(), 1);
    let base = batcher.batches()[0].base_material().unwrap();
    assert_eq!(base.name, "Brick");
    assert!(!base.has_maps());
}

#[test]
fn authored_normals_survive_into_transform_source_batches() {
    // Flat triangle in XY whose authored normals lean along +Y;
    // the node turns it a quarter around Z
    let root = SceneNode::from_value(serde_json::json!({
        "id": "root",
        "children": [{
            "id": "panel",
            "transform": [0.0, -1.0, 0.0, 0.0,
                          1.0,  0.0, 0.0, 0.0,
                          0.0,  0.0, 1.0, 0.0,
                          0.0,  0.0, 0.0, 1.0],
            "displayValues": [{
                "id": "panel-mesh",
                "vertices": [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
                "faces": [3, 0, 1, 2],
                "vertexNormals": [0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0]
            }]
        }]
    }))
    .unwrap();
    let views = GeometryConverter::new().convert(&root);
    assert_eq!(views.len(), 1);

    let mut carried = Batcher::new(BatcherConfig {
        texture_size: 16,
        normal_mode: NormalMode::TransformSource,
        ..Default::default()
    })
    .unwrap();
    carried.make_batches(&views, false);
    for n in carried.batches()[0].geometry().normals.chunks_exact(3) {
        assert!((n[0] + 1.0).abs() < 1e-6, "authored normal lost: {n:?}");
        assert!(n[1].abs() < 1e-6 && n[2].abs() < 1e-6);
    }

    // Recompute ignores them and follows the triangle
    let mut recomputed = batcher();
    recomputed.make_batches(&views, false);
    for n in recomputed.batches()[0].geometry().normals.chunks_exact(3) {
        assert!((n[2] - 1.0).abs() < 1e-6);
    }
}
