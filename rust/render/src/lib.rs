// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Retrofit Render
//!
//! Render batching and selection core for the retrofit viewer.
//!
//! ## Overview
//!
//! - **Batching**: render views are grouped by material name and merged into
//!   vertex-budgeted [`MeshBatch`]es with per-element face ranges
//! - **Visual state**: filter, highlight, hover and phase colours are applied
//!   by rebuilding draw groups over a fixed seven-slot material palette
//! - **Draw-Range Merger**: [`integrate_ranges`] composes material overrides
//!   onto an existing draw-group partition
//! - **Materials**: standard decode of source render materials plus cached
//!   procedural brick and render maps
//! - **Picking**: [`Raycaster`] maps ray hits in merged buffers back to
//!   elements, skipping filtered and ignored ones
//!
//! Everything here is synchronous and single-threaded. Only procedural
//! texture generation fans out internally with rayon.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use retrofit_geometry::GeometryConverter;
//! use retrofit_render::{Batcher, BatcherConfig, Raycaster};
//!
//! let views = GeometryConverter::new().convert(&root);
//! let mut batcher = Batcher::new(BatcherConfig::default())?;
//! batcher.set_material_lookup(material_map);
//! batcher.make_batches(&views, false);
//!
//! batcher.highlight(["wall-17"]);
//! if let Some(hit) = Raycaster::new().intersect(&camera, (x, y), &batcher) {
//!     println!("picked {}", hit.element_id());
//! }
//! ```

pub mod batch;
pub mod batcher;
pub mod config;
pub mod draw_ranges;
pub mod error;
pub mod material;
pub mod palette;
pub mod raycast;
pub mod texture;

pub use batch::{BatchId, BatchObject, MeshBatch};
pub use batcher::{pack_by_vertex_budget, Batcher};
pub use config::{BatcherConfig, NormalMode, PaletteConfig};
pub use draw_ranges::{coalesce, integrate_ranges, is_canonical_partition, DrawGroup, DrawRange};
pub use error::{Error, Result};
pub use material::{Material, MaterialResolver, Side, ROOM_BACKFACE_MATERIAL};
pub use palette::{build_palette, resolve_slot, MaterialSlot, VisualFlags};
pub use raycast::{Camera, Hit, Ray, Raycaster};
pub use texture::{BrickPattern, ProceduralKind, TextureSet};
