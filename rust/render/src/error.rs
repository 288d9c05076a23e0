// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for batching and material resolution.

/// Result type alias for render operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised inside the render core.
///
/// None of these reach the UI: the batcher logs them and degrades to a
/// partial result.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Merging one material group failed.
    #[error("batch for material {material} failed: {reason}")]
    BatchConstruction { material: String, reason: String },

    /// Merged vertex count does not fit 32-bit indices.
    #[error("merged vertex count {0} exceeds 32-bit index range")]
    VertexOverflow(usize),

    /// A draw range references a material that is not in the material list.
    #[error("draw range references a material outside the material list")]
    UnknownMaterial,

    /// Procedural texture generation failed.
    #[error("texture generation failed for {material}: {reason}")]
    Texture { material: String, reason: String },

    /// Configuration values are out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("geometry error: {0}")]
    Geometry(#[from] retrofit_geometry::Error),
}
