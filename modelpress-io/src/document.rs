//! Interchange documents
//!
//! Material assets are persisted as small JSON documents referencing their
//! textures by name; the pixel data itself is persisted separately (PNG on
//! disk, or embedded in the model interchange document).

use modelpress_core::{Material, Rgba};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Serializable description of a material asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialDocument {
    pub name: String,
    pub shader: String,
    pub color: Rgba,
    /// Texture property name → texture asset name
    pub textures: BTreeMap<String, String>,
}

impl From<&Material> for MaterialDocument {
    fn from(material: &Material) -> Self {
        Self {
            name: material.name.clone(),
            shader: material.shader.clone(),
            color: material.color,
            textures: material
                .textures
                .iter()
                .map(|(prop, tex)| (prop.clone(), tex.name.clone()))
                .collect(),
        }
    }
}
