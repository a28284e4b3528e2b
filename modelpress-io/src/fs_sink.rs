//! Filesystem asset sink
//!
//! Writes textures as PNG files, materials as JSON documents, and whole
//! models as a single JSON interchange file, all prefixed with the asset
//! name under one output directory. Exported models are read back from
//! disk so the caller receives a freshly imported copy, exactly like a
//! host re-importing an interchange file.

use crate::document::MaterialDocument;
use crate::AssetSink;
use image::RgbaImage;
use modelpress_core::{Error, Material, Model, Result, Texture, TextureRef};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

pub struct FsAssetSink {
    directory: PathBuf,
    asset_name: String,
}

impl FsAssetSink {
    /// Create the sink, ensuring the output directory exists
    pub fn new(directory: impl AsRef<Path>, asset_name: &str) -> Result<Self> {
        std::fs::create_dir_all(directory.as_ref())?;
        Ok(Self {
            directory: directory.as_ref().to_path_buf(),
            asset_name: asset_name.to_string(),
        })
    }

    fn asset_path(&self, id: &str, extension: &str) -> PathBuf {
        self.directory
            .join(format!("{}_{}.{}", self.asset_name, id, extension))
    }
}

impl AssetSink for FsAssetSink {
    fn export_texture(&mut self, id: &str, image: &RgbaImage) -> Result<TextureRef> {
        let path = self.asset_path(id, "png");
        image
            .save(&path)
            .map_err(|e| Error::InvalidData(format!("failed to write {}: {}", path.display(), e)))?;
        log::info!("exported texture {}", path.display());
        let name = format!("{}_{}", self.asset_name, id);
        Ok(TextureRef::new(Texture::new(&name, image.clone())))
    }

    fn export_material(&mut self, material: &Material, id: &str) -> Result<()> {
        let path = self.asset_path(id, "mat.json");
        let file = File::create(&path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), &MaterialDocument::from(material))
            .map_err(|e| Error::Serialization(e.to_string()))?;
        log::info!("exported material {}", path.display());
        Ok(())
    }

    fn export_model(&mut self, model: &Model) -> Result<Model> {
        let path = self.directory.join(format!("{}.model.json", self.asset_name));
        let file = File::create(&path)?;
        serde_json::to_writer(BufWriter::new(file), model)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        log::info!("exported model {}", path.display());

        let file = File::open(&path)?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelpress_core::{texture_properties, Rgba};

    #[test]
    fn test_texture_export_creates_png() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FsAssetSink::new(dir.path(), "avatar").unwrap();
        let image = RgbaImage::from_pixel(8, 8, image::Rgba([10, 20, 30, 255]));
        let handle = sink.export_texture("main", &image).unwrap();
        assert_eq!(handle.name, "avatar_main");
        assert!(dir.path().join("avatar_main.png").exists());
    }

    #[test]
    fn test_model_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FsAssetSink::new(dir.path(), "avatar").unwrap();

        let mut model = Model::new("avatar");
        let mut material = Material::new("skin", "standard");
        material.set_texture(
            texture_properties::MAIN,
            TextureRef::new(Texture::solid("base", 2, Rgba::WHITE)),
        );
        model.add_material(material);

        let imported = sink.export_model(&model).unwrap();
        assert_eq!(imported.name, "avatar");
        assert_eq!(imported.materials.len(), 1);
        let (_, mat) = imported.materials.iter().next().unwrap();
        assert_eq!(
            mat.main_texture().unwrap().image.dimensions(),
            (2, 2),
            "texture pixels survive the interchange document"
        );
    }
}
