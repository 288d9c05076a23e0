// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Retrofit Core
//!
//! Building element model shared by the retrofit viewer crates.
//!
//! ## Overview
//!
//! - **Scene tree**: the hierarchical scene-object graph as delivered by the
//!   model loader, deserialized with [serde](https://docs.rs/serde)
//! - **Typed properties**: the subset of the element property bag the render
//!   core reads (category, group, phases, material quantities), with unknown
//!   keys kept as raw JSON
//! - **Phase status**: created / demolished / existing classification of
//!   elements for a selected construction phase
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use retrofit_core::{PhaseTimeline, SceneNode};
//!
//! let root = SceneNode::from_json(&json_text)?;
//! let timeline = PhaseTimeline::new(["Existing", "Phase 1", "Phase 2"]);
//! let statuses = timeline.statuses_for_tree(&root, "Phase 1")?;
//! ```

pub mod error;
pub mod phase;
pub mod properties;
pub mod scene;

pub use error::{Error, Result};
pub use phase::{PhaseStatus, PhaseTimeline};
pub use properties::{MaterialQuantity, Properties};
pub use scene::{MaterialProps, RawMesh, SceneNode};

/// Stable identity of a building element.
///
/// Not unique per render view: an element with several mesh parts yields
/// several render views sharing one id.
pub type ElementId = String;
