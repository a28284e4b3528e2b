//! Atlas packer
//!
//! Packs the textures of a renderer's materials into shared atlas layers
//! and rewrites the mesh to address them:
//!
//! 1. per-material UV bounds (V flipped to image row order) → pixel bounds
//!    on the main texture, clamped to a minimum tile size
//! 2. crop one tile per material through the scratch surface
//! 3. rectangle-pack tiles into a power-of-two square
//! 4. composite every layer's crops into the shared rectangles
//! 5. remap mesh UVs from source rects to destination rects
//! 6. repartition submeshes by destination group and rebuild materials

use crate::config::{AtlasConfig, ShaderPropertyDefaults};
use crate::rect_pack::{pack_into_square, PackedRect};
use crate::scratch::ScratchSurface;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use modelpress_core::{
    Error, Material, MaterialId, Model, Result, Rgba, TextureRef, Vector2f,
};
use modelpress_io::AssetSink;
use std::collections::HashSet;

/// Packer knobs
#[derive(Debug, Clone, Copy)]
pub struct PackSettings {
    /// Tiles smaller than this in both dimensions are clamped up to it
    pub min_tile: u32,
    /// Upper bound on the atlas square dimension
    pub max_atlas_size: u32,
    /// Pixels of spacing between packed tiles
    pub padding: u32,
}

impl Default for PackSettings {
    fn default() -> Self {
        Self {
            min_tile: 32,
            max_atlas_size: 8192,
            padding: 0,
        }
    }
}

/// An axis-aligned rectangle in normalized UV space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvRect {
    pub min: Vector2f,
    pub max: Vector2f,
}

impl UvRect {
    pub fn zero() -> UvRect {
        UvRect {
            min: Vector2f::zeros(),
            max: Vector2f::zeros(),
        }
    }

    pub fn size(&self) -> Vector2f {
        self.max - self.min
    }
}

struct Slot {
    material: MaterialId,
    /// UV bounds of the material's triangles, V flipped
    flipped: UvRect,
    /// Crop size against the main texture, min-tile clamped
    tile_size: (u32, u32),
}

/// Packs one renderer's materials into shared atlas layers
pub struct AtlasPacker<'a> {
    pub config: &'a AtlasConfig,
    pub defaults: &'a ShaderPropertyDefaults,
    pub settings: PackSettings,
}

impl<'a> AtlasPacker<'a> {
    pub fn new(config: &'a AtlasConfig, defaults: &'a ShaderPropertyDefaults) -> Self {
        Self {
            config,
            defaults,
            settings: PackSettings::default(),
        }
    }

    /// Pack all materials of `model.renderers[renderer]`, mutating the
    /// mesh's UVs and submesh partition and replacing its material list
    /// with one material per group.
    pub fn pack_renderer(
        &self,
        model: &mut Model,
        renderer: usize,
        sink: &mut dyn AssetSink,
    ) -> Result<()> {
        let materials: Vec<MaterialId> = model
            .renderers
            .get(renderer)
            .ok_or_else(|| Error::InvalidData(format!("no renderer {}", renderer)))?
            .materials
            .clone();
        if materials.is_empty() {
            log::warn!("renderer {} has no materials; nothing to pack", renderer);
            return Ok(());
        }
        if materials.len() != model.renderers[renderer].mesh.submesh_count() {
            return Err(Error::InvalidData(format!(
                "{} materials for {} submeshes",
                materials.len(),
                model.renderers[renderer].mesh.submesh_count()
            )));
        }

        let colors: Vec<Rgba> = materials
            .iter()
            .map(|&m| model.material(m).map_or(Rgba::WHITE, |mat| mat.color))
            .collect();
        let names: Vec<String> = materials
            .iter()
            .map(|&m| model.material_name(m).to_string())
            .collect();

        let mesh = &model.renderers[renderer].mesh;
        let slots: Vec<Slot> = materials
            .iter()
            .enumerate()
            .map(|(i, &material)| {
                let flipped = flipped_uv_bounds(&mesh.uvs, &mesh.submeshes[i]);
                let tile_size = match self.config.main_texture(material) {
                    Some(tex) => {
                        clamped_tile_size(&flipped, tex.width(), tex.height(), self.settings.min_tile)
                    }
                    None => (self.settings.min_tile, self.settings.min_tile),
                };
                Slot {
                    material,
                    flipped,
                    tile_size,
                }
            })
            .collect();

        let mut scratch = ScratchSurface::new();
        let mut tiles: Vec<RgbaImage> = Vec::with_capacity(slots.len());
        for (slot, color) in slots.iter().zip(&colors) {
            let (w, h) = slot.tile_size;
            let tile = match self.config.main_texture(slot.material) {
                Some(tex) => {
                    let mut surface = scratch.acquire(w, h);
                    render_region(&mut surface, &tex.image, &slot.flipped);
                    surface.read_back()
                }
                None => solid_tile(w, h, *color),
            };
            tiles.push(tile);
        }

        let (atlas_size, rects, tiles) = self.pack_tiles(tiles)?;

        // Composite and export every layer into the shared rectangles
        let mut generated: Vec<(String, TextureRef)> = Vec::new();
        let main_property = self.config.main_layer().property.clone();
        log::info!(
            "generating {} atlas ({}x{})",
            main_property,
            atlas_size,
            atlas_size
        );
        let mut atlas_image = RgbaImage::new(atlas_size, atlas_size);
        for (tile, rect) in tiles.iter().zip(&rects) {
            imageops::replace(&mut atlas_image, tile, rect.x as i64, rect.y as i64);
        }
        generated.push((
            main_property.clone(),
            sink.export_texture(&main_property, &atlas_image)?,
        ));

        for layer in &self.config.layers[1..] {
            log::info!("generating {} atlas", layer.property);
            let mut layer_image = RgbaImage::new(atlas_size, atlas_size);
            for (slot, rect) in slots.iter().zip(&rects) {
                let tile = match self.config.texture(&layer.property, slot.material) {
                    Some(tex) => {
                        let mut surface = scratch.acquire(rect.width, rect.height);
                        render_region(&mut surface, &tex.image, &slot.flipped);
                        surface.read_back()
                    }
                    None => solid_tile(
                        rect.width,
                        rect.height,
                        self.defaults.color_for(&layer.property),
                    ),
                };
                imageops::replace(&mut layer_image, &tile, rect.x as i64, rect.y as i64);
            }
            generated.push((
                layer.property.clone(),
                sink.export_texture(&layer.property, &layer_image)?,
            ));
        }

        // Rewrite UVs and repartition submeshes by destination group
        {
            let mesh = &mut model.renderers[renderer].mesh;
            for (i, (slot, rect)) in slots.iter().zip(&rects).enumerate() {
                let src = unflip(&slot.flipped);
                let dst = destination_uv_rect(rect, atlas_size);
                let unique: HashSet<u32> = mesh.submeshes[i].iter().copied().collect();
                for index in unique {
                    let uv = mesh.uvs[index as usize];
                    mesh.uvs[index as usize] = remap_uv(uv, &src, &dst);
                }
            }

            let mut grouped: Vec<Vec<u32>> = vec![Vec::new(); self.config.groups.len()];
            for (i, slot) in slots.iter().enumerate() {
                let group = self.config.find_group(slot.material).ok_or_else(|| {
                    Error::GroupIndex(format!(
                        "material '{}' is not assigned to any group",
                        names[i]
                    ))
                })?;
                grouped[group].extend_from_slice(&mesh.submeshes[i]);
            }
            mesh.submeshes = grouped;
            mesh.recompute_bounds();
        }

        // One destination material per group, carrying the generated layers
        let mut new_ids = Vec::with_capacity(self.config.groups.len());
        for group in &self.config.groups {
            let mut material = match group
                .reference_material
                .and_then(|id| model.material(id))
                .cloned()
            {
                Some(mut m) => {
                    m.name = group.name.clone();
                    m
                }
                None => {
                    let shader = group
                        .reference_shader
                        .clone()
                        .unwrap_or_else(|| "standard".to_string());
                    Material::new(&group.name, &shader)
                }
            };
            for (property, texture) in &generated {
                material.set_texture(property, texture.clone());
            }
            sink.export_material(&material, &group.name)?;
            new_ids.push(model.add_material(material));
        }
        model.renderers[renderer].materials = new_ids;
        model.renderers[renderer].mesh.validate()
    }

    /// Pack tiles, halving them (with a warning) when even the maximum
    /// atlas dimension cannot hold them.
    fn pack_tiles(
        &self,
        mut tiles: Vec<RgbaImage>,
    ) -> Result<(u32, Vec<PackedRect>, Vec<RgbaImage>)> {
        let mut sizes: Vec<(u32, u32)> = tiles.iter().map(|t| t.dimensions()).collect();
        let mut halvings = 0u32;
        loop {
            match pack_into_square(&sizes, self.settings.padding, self.settings.max_atlas_size) {
                Ok((atlas_size, rects)) => {
                    if halvings > 0 {
                        log::warn!(
                            "tiles exceeded the {}px maximum atlas size; halved {} time(s)",
                            self.settings.max_atlas_size,
                            halvings
                        );
                        for (tile, &(w, h)) in tiles.iter_mut().zip(&sizes) {
                            if tile.dimensions() != (w, h) {
                                *tile = imageops::resize(tile, w, h, FilterType::Triangle);
                            }
                        }
                    }
                    return Ok((atlas_size, rects, tiles));
                }
                Err(e) => {
                    if halvings >= 14 || sizes.iter().all(|&(w, h)| w <= 1 && h <= 1) {
                        return Err(e);
                    }
                    for size in &mut sizes {
                        size.0 = (size.0 / 2).max(1);
                        size.1 = (size.1 / 2).max(1);
                    }
                    halvings += 1;
                }
            }
        }
    }
}

/// UV bounds of the indexed vertices, with V flipped to image row order
fn flipped_uv_bounds(uvs: &[Vector2f], indices: &[u32]) -> UvRect {
    let mut min = Vector2f::new(f32::INFINITY, f32::INFINITY);
    let mut max = Vector2f::new(f32::NEG_INFINITY, f32::NEG_INFINITY);
    for &index in indices {
        if let Some(uv) = uvs.get(index as usize) {
            let flipped = Vector2f::new(uv.x, 1.0 - uv.y);
            min.x = min.x.min(flipped.x);
            min.y = min.y.min(flipped.y);
            max.x = max.x.max(flipped.x);
            max.y = max.y.max(flipped.y);
        }
    }
    if min.x.is_finite() {
        UvRect { min, max }
    } else {
        UvRect::zero()
    }
}

/// Pixel rectangle of a flipped UV region on a `width`×`height` image,
/// edges floored/ceiled outward and clamped inside the image, never empty
fn pixel_region(flipped: &UvRect, width: u32, height: u32) -> PackedRect {
    let w = width as f32;
    let h = height as f32;
    let x0 = ((flipped.min.x * w).floor() as i64).clamp(0, width as i64 - 1);
    let x1 = ((flipped.max.x * w).ceil() as i64).clamp(x0 + 1, width as i64);
    let y0 = ((flipped.min.y * h).floor() as i64).clamp(0, height as i64 - 1);
    let y1 = ((flipped.max.y * h).ceil() as i64).clamp(y0 + 1, height as i64);
    PackedRect {
        x: x0 as u32,
        y: y0 as u32,
        width: (x1 - x0) as u32,
        height: (y1 - y0) as u32,
    }
}

/// Tile size for a material region: its pixel bounds, clamped up to the
/// minimum tile size when degenerate in both dimensions
fn clamped_tile_size(flipped: &UvRect, width: u32, height: u32, min_tile: u32) -> (u32, u32) {
    let region = pixel_region(flipped, width, height);
    if region.width < min_tile && region.height < min_tile {
        (min_tile, min_tile)
    } else {
        (region.width, region.height)
    }
}

/// Crop the flipped UV region out of `source` at the source's own
/// resolution and scale it to fill `surface`
fn render_region(surface: &mut RgbaImage, source: &RgbaImage, flipped: &UvRect) {
    let (sw, sh) = source.dimensions();
    let region = pixel_region(flipped, sw, sh);
    let cropped =
        imageops::crop_imm(source, region.x, region.y, region.width, region.height).to_image();
    let (tw, th) = surface.dimensions();
    if cropped.dimensions() == (tw, th) {
        imageops::replace(surface, &cropped, 0, 0);
    } else {
        let resized = imageops::resize(&cropped, tw, th, FilterType::Triangle);
        imageops::replace(surface, &resized, 0, 0);
    }
}

fn solid_tile(width: u32, height: u32, color: Rgba) -> RgbaImage {
    RgbaImage::from_pixel(width.max(1), height.max(1), image::Rgba(color.to_bytes()))
}

/// Flip a V-flipped rect back into UV space
fn unflip(flipped: &UvRect) -> UvRect {
    UvRect {
        min: Vector2f::new(flipped.min.x, 1.0 - flipped.max.y),
        max: Vector2f::new(flipped.max.x, 1.0 - flipped.min.y),
    }
}

/// Normalized UV-space rectangle of a packed pixel rect inside the atlas
fn destination_uv_rect(rect: &PackedRect, atlas_size: u32) -> UvRect {
    let s = atlas_size as f32;
    UvRect {
        min: Vector2f::new(rect.x as f32 / s, 1.0 - rect.bottom() as f32 / s),
        max: Vector2f::new(rect.right() as f32 / s, 1.0 - rect.y as f32 / s),
    }
}

/// Per-axis linear remap from `src` to `dst`; a degenerate source axis
/// collapses onto the destination minimum
fn remap_uv(uv: Vector2f, src: &UvRect, dst: &UvRect) -> Vector2f {
    let tx = safe_ratio(uv.x - src.min.x, src.max.x - src.min.x);
    let ty = safe_ratio(uv.y - src.min.y, src.max.y - src.min.y);
    Vector2f::new(
        tx * (dst.max.x - dst.min.x) + dst.min.x,
        ty * (dst.max.y - dst.min.y) + dst.min.y,
    )
}

fn safe_ratio(numerator: f32, denominator: f32) -> f32 {
    if denominator.abs() <= f32::EPSILON {
        0.0
    } else {
        numerator / denominator
    }
}
