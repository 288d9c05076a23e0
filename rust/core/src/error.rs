// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the building element model.

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading the scene tree or phase data.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The scene tree JSON could not be decoded.
    #[error("scene JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A node transform does not hold exactly 16 matrix entries.
    #[error("transform on node {node} must have 16 entries, got {len}")]
    InvalidTransform { node: String, len: usize },

    /// The requested phase is not part of the timeline.
    #[error("unknown phase: {0}")]
    UnknownPhase(String),
}
