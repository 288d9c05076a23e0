// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Materials and the Material Resolver
//!
//! A [`Material`] is the renderer-independent description of one GPU
//! material: linear colour, PBR scalars, face side and optional procedural
//! maps. The [`MaterialResolver`] turns a material name plus the source
//! render-material properties into a `Material`, generating procedural maps
//! at most once per name.

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use retrofit_core::MaterialProps;
use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::texture::{ProceduralKind, TextureSet};

/// Reserved material name for the back faces of room volumes
pub const ROOM_BACKFACE_MATERIAL: &str = "room-backface";

/// Which triangle faces a material renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Side {
    Front,
    Back,
    #[default]
    Double,
}

impl Side {
    /// Whether a triangle seen from the given side is drawn.
    #[inline]
    pub fn accepts(self, front_facing: bool) -> bool {
        match self {
            Side::Front => front_facing,
            Side::Back => !front_facing,
            Side::Double => true,
        }
    }
}

/// Renderer-independent material description
#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    /// Linear RGB
    pub color: [f32; 3],
    pub opacity: f32,
    pub transparent: bool,
    pub roughness: f32,
    pub metalness: f32,
    /// Linear RGB
    pub emissive: [f32; 3],
    pub side: Side,
    pub visible: bool,
    pub depth_write: bool,
    /// Procedural maps shared with every material of the same name
    pub maps: Option<Arc<TextureSet>>,
}

impl PartialEq for Material {
    fn eq(&self, other: &Self) -> bool {
        let same_maps = match (&self.maps, &other.maps) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        same_maps
            && self.name == other.name
            && self.color == other.color
            && self.opacity == other.opacity
            && self.transparent == other.transparent
            && self.roughness == other.roughness
            && self.metalness == other.metalness
            && self.emissive == other.emissive
            && self.side == other.side
            && self.visible == other.visible
            && self.depth_write == other.depth_write
    }
}

impl Material {
    /// Opaque double-sided material with a flat colour.
    pub fn flat(name: impl Into<String>, rgb: u32) -> Self {
        Self {
            name: name.into(),
            color: rgb_to_linear(rgb),
            opacity: 1.0,
            transparent: false,
            roughness: 1.0,
            metalness: 0.0,
            emissive: [0.0; 3],
            side: Side::Double,
            visible: true,
            depth_write: true,
            maps: None,
        }
    }

    /// Standard decode of source render-material properties.
    pub fn from_props(name: impl Into<String>, props: &MaterialProps) -> Self {
        let [_, r, g, b] = props.diffuse_argb();
        let [_, er, eg, eb] = props.emissive_argb();
        let opacity = props.opacity.clamp(0.0, 1.0) as f32;
        Self {
            name: name.into(),
            color: [r, g, b].map(srgb_to_linear),
            opacity,
            transparent: opacity < 1.0,
            roughness: props.roughness.clamp(0.0, 1.0) as f32,
            metalness: props.metalness.clamp(0.0, 1.0) as f32,
            emissive: [er, eg, eb].map(srgb_to_linear),
            side: Side::Double,
            visible: true,
            depth_write: true,
            maps: None,
        }
    }

    pub fn has_maps(&self) -> bool {
        self.maps.is_some()
    }
}

/// sRGB byte to linear channel value
#[inline]
pub fn srgb_to_linear(c: u8) -> f32 {
    let c = c as f32 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// `0xRRGGBB` to linear RGB
#[inline]
pub fn rgb_to_linear(rgb: u32) -> [f32; 3] {
    let [_, r, g, b] = rgb.to_be_bytes();
    [r, g, b].map(srgb_to_linear)
}

/// Resolves material names to [`Material`]s.
///
/// Procedural texture maps are cached per name for the lifetime of the
/// resolver. Share one resolver between batchers (e.g. through `Rc`) to
/// share the cache.
#[derive(Debug)]
pub struct MaterialResolver {
    texture_size: u32,
    textures: RefCell<FxHashMap<String, Arc<TextureSet>>>,
    generated: Cell<usize>,
}

impl Default for MaterialResolver {
    fn default() -> Self {
        Self::new(512)
    }
}

impl MaterialResolver {
    pub fn new(texture_size: u32) -> Self {
        Self {
            texture_size,
            textures: RefCell::new(FxHashMap::default()),
            generated: Cell::new(0),
        }
    }

    /// Resolve a material name.
    ///
    /// Never fails: a texture generation error is logged and the standard
    /// decode is used instead.
    pub fn resolve(&self, name: &str, props: Option<&MaterialProps>) -> Material {
        let mut material = match props {
            Some(props) => Material::from_props(name, props),
            None => Material::from_props(name, &MaterialProps::default()),
        };

        if name == ROOM_BACKFACE_MATERIAL {
            material.opacity = 1.0;
            material.transparent = false;
            material.side = Side::Back;
            return material;
        }

        match self.textures_for(name) {
            Ok(Some(maps)) => {
                // Maps carry the albedo
                material.color = [1.0; 3];
                material.maps = Some(maps);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(material = name, error = %e, "Falling back to flat material");
            }
        }
        material
    }

    /// Procedural maps for a material name, generated on first request.
    ///
    /// Returns `Ok(None)` when no procedural kind applies to the name.
    pub fn textures_for(&self, name: &str) -> Result<Option<Arc<TextureSet>>> {
        {
            let cache = self.textures.borrow();
            if let Some(cached) = cache.get(name) {
                return Ok(Some(Arc::clone(cached)));
            }
        }

        let Some(kind) = ProceduralKind::for_material(name) else {
            return Ok(None);
        };

        let set = Arc::new(kind.generate(name, self.texture_size)?);
        self.generated.set(self.generated.get() + 1);
        tracing::debug!(material = name, size = self.texture_size, "Generated procedural maps");

        self.textures
            .borrow_mut()
            .insert(name.to_string(), Arc::clone(&set));
        Ok(Some(set))
    }

    /// Number of distinct names with cached maps
    pub fn cached_textures(&self) -> usize {
        self.textures.borrow().len()
    }

    /// Number of texture generations performed so far
    pub fn generation_count(&self) -> usize {
        self.generated.get()
    }
}
