//! In-memory asset sink for tests

use crate::document::MaterialDocument;
use crate::AssetSink;
use image::RgbaImage;
use modelpress_core::{Error, Material, Model, Result, Texture, TextureRef};

/// Captures every export in memory. `export_model` still round-trips the
/// model through the JSON interchange format so tests exercise the same
/// serialization path as the filesystem sink.
#[derive(Default)]
pub struct MemoryAssetSink {
    pub textures: Vec<(String, RgbaImage)>,
    pub materials: Vec<(String, MaterialDocument)>,
    pub model_documents: Vec<String>,
}

impl MemoryAssetSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texture(&self, id: &str) -> Option<&RgbaImage> {
        self.textures
            .iter()
            .find(|(name, _)| name == id)
            .map(|(_, image)| image)
    }
}

impl AssetSink for MemoryAssetSink {
    fn export_texture(&mut self, id: &str, image: &RgbaImage) -> Result<TextureRef> {
        self.textures.push((id.to_string(), image.clone()));
        Ok(TextureRef::new(Texture::new(id, image.clone())))
    }

    fn export_material(&mut self, material: &Material, id: &str) -> Result<()> {
        self.materials
            .push((id.to_string(), MaterialDocument::from(material)));
        Ok(())
    }

    fn export_model(&mut self, model: &Model) -> Result<Model> {
        let document =
            serde_json::to_string(model).map_err(|e| Error::Serialization(e.to_string()))?;
        let imported =
            serde_json::from_str(&document).map_err(|e| Error::Serialization(e.to_string()))?;
        self.model_documents.push(document);
        Ok(imported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captures_exports() {
        let mut sink = MemoryAssetSink::new();
        let image = RgbaImage::new(4, 4);
        sink.export_texture("main", &image).unwrap();
        sink.export_material(&Material::new("m", "standard"), "group0")
            .unwrap();
        assert!(sink.texture("main").is_some());
        assert_eq!(sink.materials.len(), 1);
    }
}
