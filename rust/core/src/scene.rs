// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hierarchical scene-object tree as produced by the model loader.
//!
//! Each node is a building element (or a container such as a level) that may
//! carry raw mesh payloads in `displayValues` plus nested children. Loading is
//! the caller's business; this module only decodes the in-memory JSON.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::properties::Properties;

fn default_diffuse() -> i64 {
    // Opaque mid grey
    0xFF_7F_7F_7F
}

fn default_opacity() -> f64 {
    1.0
}

fn default_roughness() -> f64 {
    1.0
}

/// Render material attached to a raw mesh by the authoring tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialProps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Packed ARGB colour (may arrive sign-extended from a 32-bit int)
    #[serde(default = "default_diffuse")]
    pub diffuse: i64,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default = "default_roughness")]
    pub roughness: f64,
    #[serde(default)]
    pub metalness: f64,
    /// Packed ARGB emissive colour
    #[serde(default)]
    pub emissive: i64,
}

impl Default for MaterialProps {
    fn default() -> Self {
        Self {
            name: None,
            diffuse: default_diffuse(),
            opacity: default_opacity(),
            roughness: default_roughness(),
            metalness: 0.0,
            emissive: 0,
        }
    }
}

impl MaterialProps {
    /// Unpack the diffuse colour into `[a, r, g, b]` bytes.
    #[inline]
    pub fn diffuse_argb(&self) -> [u8; 4] {
        unpack_argb(self.diffuse)
    }

    /// Unpack the emissive colour into `[a, r, g, b]` bytes.
    #[inline]
    pub fn emissive_argb(&self) -> [u8; 4] {
        unpack_argb(self.emissive)
    }
}

#[inline]
fn unpack_argb(packed: i64) -> [u8; 4] {
    (packed as u32).to_be_bytes()
}

/// One raw mesh payload in source encoding.
///
/// `faces` is a flat run list `[arity, v0, .., v(arity-1), arity, ..]`; legacy
/// writers use `0` for triangles and `1` for quads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMesh {
    /// Identity used for the external mesh -> material lookup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Flat position triples
    #[serde(default)]
    pub vertices: Vec<f64>,
    /// Flat face runs
    #[serde(default)]
    pub faces: Vec<i64>,
    /// Optional flat normal triples, one per vertex
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vertex_normals: Vec<f64>,
    /// Optional flat UV pairs, one per vertex
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub texture_coordinates: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_material: Option<MaterialProps>,
}

impl RawMesh {
    /// Number of complete position triples.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }
}

/// Node of the scene-object tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneNode {
    pub id: String,
    /// Type tag of the source object (e.g. "Objects.BuiltElements.Wall")
    #[serde(default)]
    pub speckle_type: String,
    #[serde(default)]
    pub properties: Properties,
    /// Row-major 4x4 local transform relative to the parent node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Vec<f64>>,
    #[serde(default)]
    pub display_values: Vec<RawMesh>,
    #[serde(default)]
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    /// Decode a scene tree from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Decode a scene tree from an already parsed JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Local transform as 16 row-major entries, validated.
    pub fn local_transform(&self) -> Result<Option<[f64; 16]>> {
        match &self.transform {
            None => Ok(None),
            Some(values) => {
                let matrix: [f64; 16] = values.as_slice().try_into().map_err(|_| {
                    Error::InvalidTransform {
                        node: self.id.clone(),
                        len: values.len(),
                    }
                })?;
                Ok(Some(matrix))
            }
        }
    }

    /// Depth-first pre-order iterator over this node and all descendants.
    pub fn iter(&self) -> SceneIter<'_> {
        SceneIter { stack: vec![self] }
    }

    /// Total number of raw mesh payloads in the subtree.
    pub fn mesh_count(&self) -> usize {
        self.iter().map(|n| n.display_values.len()).sum()
    }
}

/// Depth-first iterator returned by [`SceneNode::iter`].
pub struct SceneIter<'a> {
    stack: Vec<&'a SceneNode>,
}

impl<'a> Iterator for SceneIter<'a> {
    type Item = &'a SceneNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // Reverse so children come out in declaration order
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}
