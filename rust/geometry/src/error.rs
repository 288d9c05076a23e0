use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during geometry conversion
#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed face at offset {offset}: {reason}")]
    MalformedFace { offset: usize, reason: String },

    #[error("Empty mesh: {0}")]
    EmptyMesh(String),

    #[error("Vertex index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: i64, vertex_count: usize },

    #[error("Vertex buffer length {0} is not a multiple of 3")]
    InvalidVertexBuffer(usize),

    #[error("Core model error: {0}")]
    Core(#[from] retrofit_core::Error),
}
