// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Batcher configuration.
//!
//! Defaults suit typical building models. Hosts can deserialize overrides
//! from their own settings file or read them from `RETROFIT_*` environment
//! variables.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How merged geometry gets its vertex normals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalMode {
    /// Rebuild smooth normals from the merged, world-space topology
    #[default]
    Recompute,
    /// Carry source normals through the inverse-transpose of each transform;
    /// views without source normals are recomputed
    TransformSource,
}

/// Colours of the auxiliary state materials, as `0xRRGGBB` sRGB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaletteConfig {
    pub highlight: u32,
    pub hover: u32,
    pub phase_created: u32,
    pub phase_demolished: u32,
    pub phase_existing: u32,
    /// Opacity of filtered-out geometry (0 hides it completely)
    pub hidden_opacity: f32,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            highlight: 0x3B82F6,
            hover: 0x93C5FD,
            phase_created: 0x22C55E,
            phase_demolished: 0xEF4444,
            phase_existing: 0x9CA3AF,
            hidden_opacity: 0.0,
        }
    }
}

/// Batcher configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatcherConfig {
    /// Maximum merged vertex count per batch
    pub vertex_ceiling: usize,
    /// Largest bbox extent above which source data is treated as millimetres
    pub millimeter_threshold: f64,
    /// UV scale applied to millimetre data
    pub millimeter_uv_scale: f64,
    /// Material name for render views without a lookup entry
    pub default_material: String,
    pub normal_mode: NormalMode,
    pub palette: PaletteConfig,
    /// Edge length in pixels of procedural texture maps
    pub texture_size: u32,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            vertex_ceiling: 500_000,
            millimeter_threshold: 1000.0,
            millimeter_uv_scale: 0.001,
            default_material: "default".to_string(),
            normal_mode: NormalMode::Recompute,
            palette: PaletteConfig::default(),
            texture_size: 512,
        }
    }
}

impl BatcherConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            vertex_ceiling: std::env::var("RETROFIT_VERTEX_CEILING")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.vertex_ceiling),
            millimeter_threshold: std::env::var("RETROFIT_MILLIMETER_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.millimeter_threshold),
            millimeter_uv_scale: std::env::var("RETROFIT_MILLIMETER_UV_SCALE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.millimeter_uv_scale),
            default_material: std::env::var("RETROFIT_DEFAULT_MATERIAL")
                .unwrap_or(defaults.default_material),
            normal_mode: match std::env::var("RETROFIT_NORMAL_MODE").as_deref() {
                Ok("transform_source") => NormalMode::TransformSource,
                Ok("recompute") => NormalMode::Recompute,
                _ => defaults.normal_mode,
            },
            palette: defaults.palette,
            texture_size: std::env::var("RETROFIT_TEXTURE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.texture_size),
        }
    }

    /// Reject values the batcher cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.vertex_ceiling == 0 {
            return Err(Error::InvalidConfig("vertex_ceiling must be positive".into()));
        }
        if self.texture_size < 8 {
            return Err(Error::InvalidConfig(format!(
                "texture_size {} is below 8 pixels",
                self.texture_size
            )));
        }
        if !(self.millimeter_uv_scale > 0.0) {
            return Err(Error::InvalidConfig("millimeter_uv_scale must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.palette.hidden_opacity) {
            return Err(Error::InvalidConfig("hidden_opacity must be within [0, 1]".into()));
        }
        Ok(())
    }
}
