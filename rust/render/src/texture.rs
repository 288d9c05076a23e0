// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Procedural texture generation
//!
//! Some facade and wall materials get generated maps instead of flat colour:
//! a coursed brick pattern with mortar joints, or a noise-only render for
//! plaster and concrete. Every kind produces the same four maps:
//!
//! - colour (RGBA, sRGB)
//! - bump (height, grey)
//! - roughness (grey)
//! - normal (tangent space, RGBA)
//!
//! Generation is deterministic for a given name and size. Rows are filled in
//! parallel with rayon; callers see a plain synchronous function.

use std::hash::{Hash, Hasher};

use image::{GrayImage, RgbaImage};
use noise::{NoiseFn, Perlin};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rustc_hash::FxHasher;

use crate::error::{Error, Result};

/// Generated maps for one material name
#[derive(Debug, Clone)]
pub struct TextureSet {
    pub color: RgbaImage,
    pub bump: GrayImage,
    pub roughness: GrayImage,
    pub normal: RgbaImage,
    /// World size covered by one texture tile, in metres
    pub tile_size: f32,
}

impl TextureSet {
    pub fn size(&self) -> u32 {
        self.color.width()
    }
}

/// Brick bond parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrickPattern {
    /// Bricks per row in one tile
    pub bricks_per_row: u32,
    /// Courses in one tile
    pub courses: u32,
    /// Mortar joint width as a fraction of the tile
    pub mortar: f32,
    /// Bevel width as a multiple of the mortar width
    pub bevel: f32,
    /// Base brick colour (sRGB bytes)
    pub brick_color: [u8; 3],
    pub mortar_color: [u8; 3],
    /// Max relative brightness change per brick
    pub color_variance: f32,
}

impl Default for BrickPattern {
    fn default() -> Self {
        Self {
            bricks_per_row: 2,
            courses: 8,
            mortar: 1.0 / 64.0,
            bevel: 1.5,
            brick_color: [150, 70, 50],
            mortar_color: [200, 195, 185],
            color_variance: 0.12,
        }
    }
}

/// Kind of procedural texture a material name maps to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProceduralKind {
    Brick(BrickPattern),
    /// Fine-grained noise render (plaster, concrete)
    Render { base_color: [u8; 3], amplitude: f32 },
}

impl ProceduralKind {
    /// Pick a procedural kind from a material name, if any applies.
    pub fn for_material(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

        if has(&["brick", "masonry", "clinker", "klinker", "ziegel", "mauerwerk"]) {
            Some(ProceduralKind::Brick(BrickPattern::default()))
        } else if has(&["concrete", "beton"]) {
            Some(ProceduralKind::Render {
                base_color: [170, 168, 162],
                amplitude: 0.10,
            })
        } else if has(&["plaster", "putz", "stucco", "render"]) {
            Some(ProceduralKind::Render {
                base_color: [226, 222, 212],
                amplitude: 0.05,
            })
        } else {
            None
        }
    }

    /// Generate the maps for this kind. `seed_name` makes output deterministic.
    pub fn generate(&self, seed_name: &str, size: u32) -> Result<TextureSet> {
        if size == 0 {
            return Err(Error::Texture {
                material: seed_name.to_string(),
                reason: "texture size must be positive".into(),
            });
        }
        let seed = seed_for(seed_name);
        let (height, albedo, roughness, tile_size) = match self {
            ProceduralKind::Brick(pattern) => brick_fields(pattern, size, seed),
            ProceduralKind::Render {
                base_color,
                amplitude,
            } => render_fields(*base_color, *amplitude, size, seed),
        };
        assemble(seed_name, size, &height, &albedo, &roughness, tile_size)
    }
}

/// Stable seed derived from a material name
fn seed_for(name: &str) -> u64 {
    let mut hasher = FxHasher::default();
    name.hash(&mut hasher);
    hasher.finish()
}

#[inline]
fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Height, albedo (RGB bytes) and roughness fields for a brick tile
fn brick_fields(p: &BrickPattern, size: u32, seed: u64) -> (Vec<f32>, Vec<[u8; 3]>, Vec<f32>, f32) {
    let s = size as usize;
    let rows = p.courses.max(1) as usize;
    let cols = p.bricks_per_row.max(1) as usize;
    let brick_w = (s / cols).max(1);
    let course_h = (s / rows).max(1);
    let mortar = (p.mortar * size as f32).max(1.0);
    let bevel = (mortar * p.bevel).max(1.0);

    // One brightness offset per brick; an extra column absorbs the half-brick shift
    let mut rng = StdRng::seed_from_u64(seed);
    let variance: Vec<f32> = (0..rows * (cols + 1))
        .map(|_| rng.gen_range(-p.color_variance..=p.color_variance))
        .collect();
    let perlin = Perlin::new(seed as u32);

    let mut height = vec![0.0f32; s * s];
    let mut albedo = vec![[0u8; 3]; s * s];
    let mut roughness = vec![0.0f32; s * s];

    height
        .par_chunks_mut(s)
        .zip(albedo.par_chunks_mut(s))
        .zip(roughness.par_chunks_mut(s))
        .enumerate()
        .for_each(|(y, ((h_row, a_row), r_row))| {
            let course = (y / course_h).min(rows - 1);
            let shift = if course % 2 == 1 { brick_w / 2 } else { 0 };
            let v = (y % course_h) as f32;

            for x in 0..s {
                let shifted = x + shift;
                let col = (shifted / brick_w) % (cols + 1);
                let u = (shifted % brick_w) as f32;

                // Distance into the brick face; the joint sits on the low edges
                let edge = (u - mortar)
                    .min(v - mortar)
                    .min(brick_w as f32 - 1.0 - u)
                    .min(course_h as f32 - 1.0 - v);

                let grain = perlin.get([x as f64 * 0.08, y as f64 * 0.08]) as f32;
                let fine = perlin.get([x as f64 * 0.5 + 31.7, y as f64 * 0.5 - 12.3]) as f32;

                if edge < 0.0 {
                    h_row[x] = 0.0;
                    a_row[x] = shade(p.mortar_color, 0.06 * fine);
                    r_row[x] = 0.95;
                } else {
                    let brick = variance[course * (cols + 1) + col];
                    h_row[x] = 0.35 + 0.65 * smoothstep(0.0, bevel, edge);
                    a_row[x] = shade(p.brick_color, brick + 0.08 * grain + 0.04 * fine);
                    r_row[x] = (0.82 + 0.1 * grain).clamp(0.0, 1.0);
                }
            }
        });

    // Eight courses cover roughly 0.6 m of wall
    let tile_size = 0.075 * rows as f32;
    (height, albedo, roughness, tile_size)
}

/// Height, albedo and roughness fields for a noise-only render
fn render_fields(base: [u8; 3], amplitude: f32, size: u32, seed: u64) -> (Vec<f32>, Vec<[u8; 3]>, Vec<f32>, f32) {
    let s = size as usize;
    let perlin = Perlin::new(seed as u32);

    let mut height = vec![0.0f32; s * s];
    let mut albedo = vec![[0u8; 3]; s * s];
    let mut roughness = vec![0.0f32; s * s];

    height
        .par_chunks_mut(s)
        .zip(albedo.par_chunks_mut(s))
        .zip(roughness.par_chunks_mut(s))
        .enumerate()
        .for_each(|(y, ((h_row, a_row), r_row))| {
            for x in 0..s {
                let mut n = 0.0f32;
                let mut freq = 0.02f64;
                let mut weight = 0.5f32;
                for _ in 0..4 {
                    n += weight * perlin.get([x as f64 * freq, y as f64 * freq]) as f32;
                    freq *= 2.0;
                    weight *= 0.5;
                }
                h_row[x] = 0.5 + 0.5 * n;
                a_row[x] = shade(base, amplitude * n);
                r_row[x] = (0.9 + 0.08 * n).clamp(0.0, 1.0);
            }
        });

    (height, albedo, roughness, 1.0)
}

#[inline]
fn shade(color: [u8; 3], delta: f32) -> [u8; 3] {
    let f = 1.0 + delta;
    color.map(|c| (c as f32 * f).round().clamp(0.0, 255.0) as u8)
}

#[inline]
fn to_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Turn scalar fields into image maps, deriving the normal map from height
fn assemble(
    name: &str,
    size: u32,
    height: &[f32],
    albedo: &[[u8; 3]],
    roughness: &[f32],
    tile_size: f32,
) -> Result<TextureSet> {
    let s = size as usize;
    let texture_error = |reason: &str| Error::Texture {
        material: name.to_string(),
        reason: reason.to_string(),
    };

    let color_raw: Vec<u8> = albedo
        .iter()
        .flat_map(|&[r, g, b]| [r, g, b, 255])
        .collect();
    let bump_raw: Vec<u8> = height.iter().map(|&h| to_byte(h)).collect();
    let rough_raw: Vec<u8> = roughness.iter().map(|&r| to_byte(r)).collect();

    // Central differences with wrap-around so the tile stays seamless
    const STRENGTH: f32 = 4.0;
    let mut normal_raw = vec![0u8; s * s * 4];
    normal_raw
        .par_chunks_mut(s * 4)
        .enumerate()
        .for_each(|(y, row)| {
            let up = (y + s - 1) % s;
            let down = (y + 1) % s;
            for x in 0..s {
                let left = (x + s - 1) % s;
                let right = (x + 1) % s;
                let dx = height[y * s + right] - height[y * s + left];
                let dy = height[down * s + x] - height[up * s + x];
                let (nx, ny, nz) = (-dx * STRENGTH, -dy * STRENGTH, 1.0f32);
                let len = (nx * nx + ny * ny + nz * nz).sqrt();
                let px = &mut row[x * 4..x * 4 + 4];
                px[0] = to_byte(nx / len * 0.5 + 0.5);
                px[1] = to_byte(ny / len * 0.5 + 0.5);
                px[2] = to_byte(nz / len * 0.5 + 0.5);
                px[3] = 255;
            }
        });

    Ok(TextureSet {
        color: RgbaImage::from_raw(size, size, color_raw)
            .ok_or_else(|| texture_error("colour buffer size mismatch"))?,
        bump: GrayImage::from_raw(size, size, bump_raw)
            .ok_or_else(|| texture_error("bump buffer size mismatch"))?,
        roughness: GrayImage::from_raw(size, size, rough_raw)
            .ok_or_else(|| texture_error("roughness buffer size mismatch"))?,
        normal: RgbaImage::from_raw(size, size, normal_raw)
            .ok_or_else(|| texture_error("normal buffer size mismatch"))?,
        tile_size,
    })
}
