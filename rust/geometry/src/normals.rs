// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Vertex normal computation

use nalgebra::Vector3;

use crate::mesh::Mesh;

/// Recompute smooth vertex normals from triangle topology.
///
/// Face normals are area weighted (unnormalized cross products) and summed per
/// vertex. Vertices that belong to no triangle, or only to degenerate ones,
/// get a zero normal instead of NaN.
pub fn calculate_normals(mesh: &mut Mesh) {
    let vertex_count = mesh.vertex_count();
    if vertex_count == 0 {
        mesh.normals.clear();
        return;
    }

    let mut normals = vec![Vector3::<f64>::zeros(); vertex_count];

    for face in 0..mesh.triangle_count() {
        let [i0, i1, i2] = mesh.triangle(face);
        if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
            continue;
        }

        let v0 = mesh.position(i0);
        let v1 = mesh.position(i1);
        let v2 = mesh.position(i2);

        let normal = (v1 - v0).cross(&(v2 - v0));

        normals[i0] += normal;
        normals[i1] += normal;
        normals[i2] += normal;
    }

    mesh.normals.clear();
    mesh.normals.reserve(vertex_count * 3);

    for normal in normals {
        let n = normal
            .try_normalize(f64::EPSILON)
            .unwrap_or_else(Vector3::zeros);
        mesh.normals.push(n.x as f32);
        mesh.normals.push(n.y as f32);
        mesh.normals.push(n.z as f32);
    }
}

/// Reverse the winding of every triangle in place
pub fn flip_winding(indices: &mut [u32]) {
    indices.chunks_exact_mut(3).for_each(|tri| tri.swap(1, 2));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.positions = vec![
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            1.0, 1.0, 0.0, //
            0.0, 1.0, 0.0,
        ];
        mesh.indices = vec![0, 1, 2, 0, 2, 3];
        mesh
    }

    #[test]
    fn flat_quad_faces_up() {
        let mut mesh = quad();
        calculate_normals(&mut mesh);
        assert!(mesh.has_normals());
        for n in mesh.normals.chunks_exact(3) {
            assert_eq!(n, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn flipped_quad_faces_down() {
        let mut mesh = quad();
        flip_winding(&mut mesh.indices);
        calculate_normals(&mut mesh);
        assert_eq!(&mesh.normals[0..3], &[0.0, 0.0, -1.0]);
    }

    #[test]
    fn unused_vertex_gets_zero_normal() {
        let mut mesh = quad();
        mesh.positions.extend_from_slice(&[5.0, 5.0, 5.0]);
        calculate_normals(&mut mesh);
        assert_eq!(&mesh.normals[12..15], &[0.0, 0.0, 0.0]);
        assert!(mesh.normals.iter().all(|v| v.is_finite()));
    }
}
