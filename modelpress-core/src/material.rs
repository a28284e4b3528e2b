//! Materials and textures
//!
//! Material identity is a slotmap key owned by the `Model`; grouping and
//! atlas configuration always refer to materials by that handle, never by
//! name. Textures are shared behind `TextureRef` handles so "same texture"
//! checks are identity checks.

use crate::color::Rgba;
use image::RgbaImage;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use slotmap::new_key_type;
use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::Arc;

new_key_type! {
    /// Opaque identity handle for a material
    pub struct MaterialId;
}

/// Well-known shader texture property names
pub mod texture_properties {
    pub const MAIN: &str = "main";
    pub const NORMAL: &str = "normal";
    pub const METALLIC_GLOSS: &str = "metallic_gloss";
    pub const OCCLUSION: &str = "occlusion";
    pub const EMISSION: &str = "emission";
}

/// A named pixel buffer
#[derive(Debug, Clone)]
pub struct Texture {
    pub name: String,
    pub image: RgbaImage,
}

impl Texture {
    pub fn new(name: &str, image: RgbaImage) -> Self {
        Self {
            name: name.to_string(),
            image,
        }
    }

    /// A `size`×`size` single-color texture
    pub fn solid(name: &str, size: u32, color: Rgba) -> Self {
        let pixel = image::Rgba(color.to_bytes());
        Self {
            name: name.to_string(),
            image: RgbaImage::from_pixel(size, size, pixel),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

#[derive(Serialize, Deserialize)]
struct TextureData {
    name: String,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Serialize for Texture {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        TextureData {
            name: self.name.clone(),
            width: self.image.width(),
            height: self.image.height(),
            pixels: self.image.as_raw().clone(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Texture {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let data = TextureData::deserialize(deserializer)?;
        let image = RgbaImage::from_raw(data.width, data.height, data.pixels)
            .ok_or_else(|| D::Error::custom("texture pixel buffer does not match dimensions"))?;
        Ok(Texture {
            name: data.name,
            image,
        })
    }
}

/// Shared handle to a texture. Equality is handle identity, matching the
/// "same underlying texture" semantics used when merging duplicate
/// materials.
#[derive(Debug, Clone)]
pub struct TextureRef(pub Arc<Texture>);

impl TextureRef {
    pub fn new(texture: Texture) -> Self {
        Self(Arc::new(texture))
    }
}

impl Deref for TextureRef {
    type Target = Texture;

    fn deref(&self) -> &Texture {
        &self.0
    }
}

impl PartialEq for TextureRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Serialize for TextureRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.as_ref().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TextureRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(TextureRef(Arc::new(Texture::deserialize(deserializer)?)))
    }
}

/// A surface description: shader name, base color, and named texture
/// properties
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub shader: String,
    pub color: Rgba,
    pub textures: BTreeMap<String, TextureRef>,
}

impl Material {
    pub fn new(name: &str, shader: &str) -> Self {
        Self {
            name: name.to_string(),
            shader: shader.to_string(),
            color: Rgba::WHITE,
            textures: BTreeMap::new(),
        }
    }

    pub fn texture(&self, property: &str) -> Option<&TextureRef> {
        self.textures.get(property)
    }

    pub fn main_texture(&self) -> Option<&TextureRef> {
        self.texture(texture_properties::MAIN)
    }

    pub fn set_texture(&mut self, property: &str, texture: TextureRef) {
        self.textures.insert(property.to_string(), texture);
    }

    pub fn texture_property_names(&self) -> impl Iterator<Item = &str> {
        self.textures.keys().map(String::as_str)
    }
}
