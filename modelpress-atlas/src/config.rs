//! Atlas configuration: texture layers, material groups, and discovery
//!
//! The configuration is a plain mutable data model owned by the pipeline.
//! Presentation layers may display and edit it, but nothing here knows
//! about being observed.

use modelpress_core::{texture_properties, Error, MaterialId, Model, Result, Rgba, TextureRef};
use std::collections::HashMap;

/// Per-material override inside one atlas layer
#[derive(Debug, Clone)]
pub struct MapEntry {
    pub texture: Option<TextureRef>,
    pub color: Rgba,
}

impl Default for MapEntry {
    fn default() -> Self {
        Self {
            texture: None,
            color: Rgba::WHITE,
        }
    }
}

/// One shader-texture-property slot to be packed (e.g. the diffuse or
/// normal map channel), mapping each source material to its override.
#[derive(Debug, Clone)]
pub struct AtlasLayer {
    pub property: String,
    pub default_color: Rgba,
    pub mapping: HashMap<MaterialId, MapEntry>,
}

impl AtlasLayer {
    pub fn new(property: &str) -> Self {
        Self {
            property: property.to_string(),
            default_color: Rgba::BLACK,
            mapping: HashMap::new(),
        }
    }
}

/// A named output partition of source materials sharing one destination
/// material/shader
#[derive(Debug, Clone)]
pub struct MaterialGroup {
    pub name: String,
    pub materials: Vec<MaterialId>,
    pub reference_material: Option<MaterialId>,
    pub reference_shader: Option<String>,
}

impl Default for MaterialGroup {
    fn default() -> Self {
        Self {
            name: "Atlas".to_string(),
            materials: Vec::new(),
            reference_material: None,
            reference_shader: None,
        }
    }
}

/// The full atlas configuration: output groups plus one layer per packed
/// shader texture property. The first layer is the main (diffuse) slot and
/// always exists.
#[derive(Debug, Clone)]
pub struct AtlasConfig {
    pub groups: Vec<MaterialGroup>,
    pub layers: Vec<AtlasLayer>,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AtlasConfig {
    pub fn new() -> Self {
        Self {
            groups: vec![MaterialGroup::default()],
            layers: vec![AtlasLayer::new(texture_properties::MAIN)],
        }
    }

    /// Reset to a single empty group and the main layer
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    pub fn main_layer(&self) -> &AtlasLayer {
        &self.layers[0]
    }

    pub fn layer(&self, property: &str) -> Option<&AtlasLayer> {
        self.layers.iter().find(|l| l.property == property)
    }

    /// Add a layer for `property`, pre-filled with an empty override for
    /// every known material
    pub fn add_layer(&mut self, property: &str) -> &mut AtlasLayer {
        let mut layer = AtlasLayer::new(property);
        for material in self.all_materials() {
            layer.mapping.insert(material, MapEntry::default());
        }
        self.layers.push(layer);
        self.layers.last_mut().unwrap()
    }

    /// Every material in every group, in group order
    pub fn all_materials(&self) -> Vec<MaterialId> {
        self.groups
            .iter()
            .flat_map(|g| g.materials.iter().copied())
            .collect()
    }

    pub fn find_group(&self, material: MaterialId) -> Option<usize> {
        self.groups
            .iter()
            .position(|g| g.materials.contains(&material))
    }

    /// Move a material to `target_group`, creating a new trailing group when
    /// the index is beyond the current group count and deleting the source
    /// group if it becomes empty.
    ///
    /// A material that belongs to no group indicates broken bookkeeping and
    /// is a fatal indexing error.
    pub fn move_material(&mut self, material: MaterialId, target_group: usize) -> Result<()> {
        let old_group = self.find_group(material).ok_or_else(|| {
            Error::GroupIndex("material is not assigned to any group".to_string())
        })?;

        self.groups[old_group].materials.retain(|&m| m != material);

        if target_group < self.groups.len() {
            self.groups[target_group].materials.push(material);
        } else {
            self.groups.push(MaterialGroup {
                name: format!("Atlas {}", target_group),
                materials: vec![material],
                ..MaterialGroup::default()
            });
        }

        if self.groups[old_group].materials.is_empty() {
            self.groups.remove(old_group);
        }
        Ok(())
    }

    /// Resynchronize groups and layer mappings against the materials
    /// actually present on `model`'s renderers: vanished materials are
    /// dropped everywhere, newly found ones join the default group and
    /// every layer's mapping.
    pub fn discover(&mut self, model: &Model) {
        let mut detected: Vec<MaterialId> = Vec::new();
        for renderer in &model.renderers {
            for &material in &renderer.materials {
                if !detected.contains(&material) {
                    detected.push(material);
                }
            }
        }

        for group in &mut self.groups {
            group.materials.retain(|m| detected.contains(m));
        }
        let known = self.all_materials();
        for &material in &detected {
            if !known.contains(&material) {
                self.groups[0].materials.push(material);
            }
        }
        log::info!("discovered {} materials", detected.len());

        for layer in &mut self.layers {
            layer.mapping.retain(|m, _| detected.contains(m));
            for &material in &detected {
                layer.mapping.entry(material).or_default();
            }
        }

        for group in &mut self.groups {
            if group.reference_shader.is_none() {
                group.reference_shader = common_shader(model, &group.materials);
            }
        }
    }

    /// Fill every layer's override from each material's own texture
    /// property of the same name
    pub fn auto_fill(&mut self, model: &Model) {
        let properties = common_texture_properties(model, &self.all_materials());
        for property in properties {
            if self.layer(&property).is_none() {
                self.add_layer(&property);
            }
            self.auto_fill_property(model, &property);
        }
        // Drop secondary layers that picked up no textures at all
        self.layers.retain(|layer| {
            layer.property == texture_properties::MAIN
                || layer.mapping.values().any(|e| e.texture.is_some())
        });
    }

    /// Fill one layer's overrides from the materials' own properties
    pub fn auto_fill_property(&mut self, model: &Model, property: &str) {
        let layer = match self.layers.iter_mut().find(|l| l.property == property) {
            Some(l) => l,
            None => {
                log::warn!("no atlas layer named {:?} to auto-fill", property);
                return;
            }
        };
        for (&material, entry) in layer.mapping.iter_mut() {
            if let Some(m) = model.material(material) {
                if let Some(texture) = m.texture(property) {
                    entry.texture = Some(texture.clone());
                    entry.color = Rgba::WHITE;
                }
            }
        }
    }

    /// The main-layer override texture of a material
    pub fn main_texture(&self, material: MaterialId) -> Option<&TextureRef> {
        self.texture(texture_properties::MAIN, material)
    }

    /// A layer's override texture of a material
    pub fn texture(&self, property: &str, material: MaterialId) -> Option<&TextureRef> {
        self.layer(property)
            .and_then(|l| l.mapping.get(&material))
            .and_then(|e| e.texture.as_ref())
    }
}

/// Fallback solid colors for known shader texture properties, substituted
/// whenever a material lacks the property. Passed into the packer
/// explicitly so tests can swap alternate tables.
#[derive(Debug, Clone)]
pub struct ShaderPropertyDefaults {
    colors: HashMap<String, Rgba>,
}

impl Default for ShaderPropertyDefaults {
    fn default() -> Self {
        let mut colors = HashMap::new();
        colors.insert(texture_properties::MAIN.to_string(), Rgba::WHITE);
        colors.insert(texture_properties::NORMAL.to_string(), Rgba::FLAT_NORMAL);
        colors.insert(texture_properties::METALLIC_GLOSS.to_string(), Rgba::BLACK);
        colors.insert(texture_properties::OCCLUSION.to_string(), Rgba::WHITE);
        colors.insert(texture_properties::EMISSION.to_string(), Rgba::BLACK);
        Self { colors }
    }
}

impl ShaderPropertyDefaults {
    /// The fallback color for a property; black for unknown properties
    pub fn color_for(&self, property: &str) -> Rgba {
        self.colors.get(property).copied().unwrap_or(Rgba::BLACK)
    }

    pub fn insert(&mut self, property: &str, color: Rgba) {
        self.colors.insert(property.to_string(), color);
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.colors.keys().map(String::as_str)
    }
}

/// Texture property names that never belong in an atlas (lookup tables,
/// ramps, cube maps and the like)
const IGNORED_TEXTURE_PROPERTIES: &[&str] = &[
    "ramp", "cube", "noise", "curve", "distortion", "detail", "decal", "lut", "matcap",
    "fallback",
];

/// The most frequent shader name among `materials`
pub fn common_shader(model: &Model, materials: &[MaterialId]) -> Option<String> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for &id in materials {
        let shader = match model.material(id) {
            Some(m) => m.shader.clone(),
            None => continue,
        };
        match counts.iter_mut().find(|(name, _)| *name == shader) {
            Some((_, count)) => *count += 1,
            None => counts.push((shader, 1)),
        }
    }
    counts
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|(name, _)| name)
}

/// Texture property names used by any of `materials`, skipping the ignore
/// list
pub fn common_texture_properties(model: &Model, materials: &[MaterialId]) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();
    for &id in materials {
        let material = match model.material(id) {
            Some(m) => m,
            None => continue,
        };
        for property in material.texture_property_names() {
            let lower = property.to_lowercase();
            if IGNORED_TEXTURE_PROPERTIES.iter().any(|i| lower.contains(i)) {
                continue;
            }
            if !result.iter().any(|p| p == property) {
                result.push(property.to_string());
            }
        }
    }
    result
}
