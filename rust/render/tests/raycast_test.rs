// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use approx::assert_relative_eq;
use nalgebra::{Matrix4, Point3, Vector3};
use retrofit_core::ElementId;
use retrofit_geometry::{calculate_normals, Mesh, RenderView};
use retrofit_render::{Batcher, BatcherConfig, Camera, Ray, Raycaster};
use rustc_hash::FxHashSet;

/// Unit quad in the XY plane facing +Z
fn quad() -> Mesh {
    let mut mesh = Mesh::new();
    mesh.positions = vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0];
    mesh.indices = vec![0, 1, 2, 0, 2, 3];
    calculate_normals(&mut mesh);
    mesh
}

fn quad_at(id: &str, x: f64, z: f64) -> RenderView {
    RenderView::new(id, quad()).with_transform(Matrix4::new_translation(&Vector3::new(x, 0.0, z)))
}

fn down_from(x: f64, y: f64) -> Ray {
    Ray::new(Point3::new(x, y, 10.0), -Vector3::z()).unwrap()
}

fn batched(views: &[RenderView], lookup: &[(&str, &str)]) -> Batcher {
    let mut batcher = Batcher::new(BatcherConfig {
        texture_size: 16,
        ..Default::default()
    })
    .unwrap();
    batcher.set_material_lookup(lookup.iter().copied());
    batcher.make_batches(views, false);
    batcher
}

#[test]
fn nearest_element_is_returned() {
    let batcher = batched(&[quad_at("bottom", 0.0, 0.0), quad_at("top", 0.0, 2.0)], &[]);
    let hit = Raycaster::new().intersect_ray(&down_from(0.25, 0.6), &batcher).unwrap();

    assert_eq!(hit.element_id(), "top");
    assert_relative_eq!(hit.distance, 8.0, epsilon = 1e-9);
    assert_relative_eq!(hit.point, Point3::new(0.25, 0.6, 2.0), epsilon = 1e-9);
    assert!(hit.face_index == 2 || hit.face_index == 3);
}

#[test]
fn ignored_elements_do_not_occlude() {
    let mut batcher = batched(&[quad_at("bottom", 0.0, 0.0), quad_at("top", 0.0, 2.0)], &[]);
    let ray = down_from(0.25, 0.6);

    batcher.set_raycast_ignore(["top"]);
    assert!(batcher.is_raycast_ignored("top"));
    let hit = Raycaster::new().intersect_ray(&ray, &batcher).unwrap();
    assert_eq!(hit.element_id(), "bottom");

    batcher.set_raycast_ignore(["top", "bottom"]);
    assert!(Raycaster::new().intersect_ray(&ray, &batcher).is_none());

    // Ignoring does not hide anything
    assert!(batcher.batches()[0].objects().iter().all(|o| o.visible));
}

#[test]
fn filtered_elements_do_not_occlude() {
    let mut batcher = batched(&[quad_at("bottom", 0.0, 0.0), quad_at("top", 0.0, 2.0)], &[]);
    let ray = down_from(0.25, 0.6);

    let visible: FxHashSet<ElementId> = ["bottom".to_string()].into_iter().collect();
    batcher.set_filter(Some(&visible));
    let hit = Raycaster::new().intersect_ray(&ray, &batcher).unwrap();
    assert_eq!(hit.element_id(), "bottom");

    batcher.set_filter(Some(&FxHashSet::default()));
    assert!(Raycaster::new().intersect_ray(&ray, &batcher).is_none());
}

#[test]
fn closest_hit_may_live_in_a_later_batch() {
    let views = [quad_at("far", 0.0, 0.0), quad_at("near", 0.0, 5.0)];
    let batcher = batched(&views, &[("far", "First"), ("near", "Second")]);
    assert_eq!(batcher.batches().len(), 2);
    assert_eq!(batcher.batches()[0].material_name(), "First");

    for raycaster in [Raycaster::new(), Raycaster::new().with_bounds_test(true)] {
        let hit = raycaster.intersect_ray(&down_from(0.25, 0.6), &batcher).unwrap();
        assert_eq!(hit.element_id(), "near");
        assert_eq!(hit.batch_id, batcher.batches()[1].id());
        assert_relative_eq!(hit.distance, 5.0, epsilon = 1e-9);
    }
}

#[test]
fn pointer_at_ignored_quad_centre_returns_nothing() {
    let views = [quad_at("v0", 0.0, 0.0), quad_at("v1", 2.0, 0.0), quad_at("v2", 4.0, 0.0)];
    let mut batcher = batched(&views, &[]);

    let camera = Camera::look_at(
        Point3::new(2.3, 0.6, 10.0),
        Point3::new(2.3, 0.6, 0.0),
        Vector3::y(),
        std::f64::consts::FRAC_PI_4,
        16.0 / 9.0,
        0.1,
        100.0,
    );
    let raycaster = Raycaster::new();

    let hit = raycaster.intersect(&camera, (0.0, 0.0), &batcher).unwrap();
    assert_eq!(hit.element_id(), "v1");
    assert_relative_eq!(hit.point, Point3::new(2.3, 0.6, 0.0), epsilon = 1e-6);

    batcher.set_raycast_ignore(["v1"]);
    assert!(raycaster.intersect(&camera, (0.0, 0.0), &batcher).is_none());
}

#[test]
fn empty_space_returns_nothing() {
    let batcher = batched(&[quad_at("v0", 0.0, 0.0)], &[]);
    assert!(Raycaster::new().intersect_ray(&down_from(5.0, 5.0), &batcher).is_none());

    let nothing = batched(&[], &[]);
    assert!(Raycaster::new().intersect_ray(&down_from(0.25, 0.6), &nothing).is_none());
}

#[test]
fn back_face_batches_are_picked_from_behind_only() {
    let mut rooms = Batcher::new(BatcherConfig::default()).unwrap();
    rooms.make_batches(&[quad_at("room", 0.0, 0.0)], true);

    // The quad faces +Z; from above the ray sees its front
    assert!(Raycaster::new().intersect_ray(&down_from(0.25, 0.6), &rooms).is_none());

    let from_below = Ray::new(Point3::new(0.25, 0.6, -10.0), Vector3::z()).unwrap();
    let hit = Raycaster::new().intersect_ray(&from_below, &rooms).unwrap();
    assert_eq!(hit.element_id(), "room");
}
