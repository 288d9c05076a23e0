// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Face run decoding
//!
//! Raw meshes encode faces as a flat list of runs: an arity followed by that
//! many vertex indices. Legacy writers use `0` for a triangle and `1` for a
//! quad. Runs are decoded once into [`Face`] values; everything downstream
//! works on the tagged form.

use smallvec::SmallVec;

use crate::error::Error;

/// One decoded polygon face
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Face {
    Triangle([u32; 3]),
    Quad([u32; 4]),
    /// Five or more vertices
    Polygon(SmallVec<[u32; 8]>),
}

impl Face {
    /// Build a face from vertex indices, picking the variant by arity.
    ///
    /// Returns `None` for fewer than three vertices.
    pub fn from_indices(indices: &[u32]) -> Option<Face> {
        match indices {
            &[a, b, c] => Some(Face::Triangle([a, b, c])),
            &[a, b, c, d] => Some(Face::Quad([a, b, c, d])),
            _ if indices.len() > 4 => Some(Face::Polygon(SmallVec::from_slice(indices))),
            _ => None,
        }
    }

    /// Vertex indices of the face
    pub fn vertices(&self) -> &[u32] {
        match self {
            Face::Triangle(v) => v.as_slice(),
            Face::Quad(v) => v.as_slice(),
            Face::Polygon(v) => v.as_slice(),
        }
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.vertices().len()
    }

    /// Triangles produced by fan triangulation
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.arity() - 2
    }

    /// Append fan triangles (anchored at vertex 0) to an index buffer
    pub fn triangulate_into(&self, out: &mut Vec<u32>) {
        let v = self.vertices();
        for i in 1..v.len() - 1 {
            out.push(v[0]);
            out.push(v[i]);
            out.push(v[i + 1]);
        }
    }
}

/// Result of decoding a face run list
#[derive(Debug, Default)]
pub struct DecodedFaces {
    pub faces: Vec<Face>,
    /// Diagnostics for runs that were skipped
    pub skipped: Vec<Error>,
}

impl DecodedFaces {
    pub fn triangle_count(&self) -> usize {
        self.faces.iter().map(Face::triangle_count).sum()
    }

    /// Fan-triangulated index buffer
    pub fn to_triangle_indices(&self) -> Vec<u32> {
        let mut out = Vec::with_capacity(self.triangle_count() * 3);
        for face in &self.faces {
            face.triangulate_into(&mut out);
        }
        out
    }
}

/// Map legacy arity markers onto real vertex counts
#[inline]
fn normalize_arity(raw: i64) -> i64 {
    match raw {
        0 => 3,
        1 => 4,
        n => n,
    }
}

/// Decode a flat face run list.
///
/// Invalid faces are skipped and reported in [`DecodedFaces::skipped`]. A run
/// whose arity is negative or runs past the end of the list makes the rest of
/// the list unreadable, so decoding stops there.
pub fn decode_faces(runs: &[i64], vertex_count: usize) -> DecodedFaces {
    let mut decoded = DecodedFaces::default();
    let mut offset = 0;

    while offset < runs.len() {
        let arity = normalize_arity(runs[offset]);

        if arity < 0 {
            decoded.skipped.push(Error::MalformedFace {
                offset,
                reason: format!("negative arity {}", arity),
            });
            break;
        }

        let arity = arity as usize;
        let start = offset + 1;
        let end = start + arity;
        if end > runs.len() {
            decoded.skipped.push(Error::MalformedFace {
                offset,
                reason: format!(
                    "face of arity {} truncated after {} indices",
                    arity,
                    runs.len() - start
                ),
            });
            break;
        }
        offset = end;

        if arity < 3 {
            decoded.skipped.push(Error::MalformedFace {
                offset: start - 1,
                reason: format!("arity {} is below 3", arity),
            });
            continue;
        }

        let run = &runs[start..end];
        let mut indices: SmallVec<[u32; 8]> = SmallVec::with_capacity(arity);
        let mut valid = true;
        for &index in run {
            if index < 0 || index as usize >= vertex_count {
                decoded.skipped.push(Error::IndexOutOfRange {
                    index,
                    vertex_count,
                });
                valid = false;
                break;
            }
            indices.push(index as u32);
        }

        if valid {
            if let Some(face) = Face::from_indices(&indices) {
                decoded.faces.push(face);
            }
        }
    }

    decoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_markers_are_normalized() {
        let decoded = decode_faces(&[0, 0, 1, 2, 1, 0, 1, 2, 3], 4);
        assert!(decoded.skipped.is_empty());
        assert_eq!(decoded.faces, vec![
            Face::Triangle([0, 1, 2]),
            Face::Quad([0, 1, 2, 3]),
        ]);
        assert_eq!(decoded.triangle_count(), 3);
    }

    #[test]
    fn explicit_arities_and_ngon_fan() {
        let decoded = decode_faces(&[3, 0, 1, 2, 5, 0, 1, 2, 3, 4], 5);
        assert_eq!(decoded.faces.len(), 2);
        assert_eq!(decoded.faces[1].arity(), 5);
        assert_eq!(
            decoded.to_triangle_indices(),
            vec![0, 1, 2, 0, 1, 2, 0, 2, 3, 0, 3, 4]
        );
    }

    #[test]
    fn degenerate_arity_is_skipped_and_decoding_continues() {
        let decoded = decode_faces(&[2, 0, 1, 3, 0, 1, 2], 3);
        assert_eq!(decoded.faces, vec![Face::Triangle([0, 1, 2])]);
        assert_eq!(decoded.skipped.len(), 1);
        assert!(matches!(decoded.skipped[0], Error::MalformedFace { offset: 0, .. }));
    }

    #[test]
    fn out_of_range_index_drops_only_that_face() {
        let decoded = decode_faces(&[3, 0, 1, 9, 3, 0, 1, 2], 3);
        assert_eq!(decoded.faces.len(), 1);
        assert!(matches!(
            decoded.skipped[0],
            Error::IndexOutOfRange { index: 9, vertex_count: 3 }
        ));
    }

    #[test]
    fn truncated_run_stops_decoding() {
        let decoded = decode_faces(&[3, 0, 1, 2, 4, 0, 1], 3);
        assert_eq!(decoded.faces.len(), 1);
        assert_eq!(decoded.skipped.len(), 1);
    }

    #[test]
    fn negative_arity_stops_decoding() {
        let decoded = decode_faces(&[-3, 0, 1, 2], 3);
        assert!(decoded.faces.is_empty());
        assert_eq!(decoded.skipped.len(), 1);
    }
}
