//! Retrofit Geometry Processing
//!
//! Turns the scene-object tree into flat, batch-ready render views, and
//! provides the mesh buffers, transforms, normals and UV projection the
//! batcher builds on. Math via nalgebra.

pub mod bounds;
pub mod converter;
pub mod error;
pub mod faces;
pub mod mesh;
pub mod normals;
pub mod render_view;
pub mod transform;
pub mod uv;

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix3, Matrix4, Point2, Point3, Vector3};

pub use bounds::Aabb;
pub use converter::{convert_mesh, ConversionStats, GeometryConverter};
pub use error::{Error, Result};
pub use faces::{decode_faces, DecodedFaces, Face};
pub use mesh::Mesh;
pub use normals::{calculate_normals, flip_winding};
pub use render_view::RenderView;
pub use uv::{project_box_uvs, unit_uv_scale, ProjectionAxis};
