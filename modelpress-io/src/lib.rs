//! Asset persistence for modelpress
//!
//! Defines the `AssetSink` collaborator contract used by the pipeline to
//! persist generated textures, materials, and whole models, plus a
//! filesystem implementation and an in-memory implementation for tests.

pub mod document;
pub mod fs_sink;
pub mod memory_sink;

pub use document::*;
pub use fs_sink::*;
pub use memory_sink::*;

use image::RgbaImage;
use modelpress_core::{Material, Model, Result, TextureRef};

/// Persistence collaborator for generated assets.
///
/// Implementations write assets as named, loadable entities under some
/// caller-defined location and hand back handles for re-assignment.
pub trait AssetSink {
    /// Persist a generated image under `id`, returning a handle usable for
    /// assignment to a material texture property
    fn export_texture(&mut self, id: &str, image: &RgbaImage) -> Result<TextureRef>;

    /// Persist a generated material under `id`
    fn export_material(&mut self, material: &Material, id: &str) -> Result<()>;

    /// Serialize a full model to the interchange format and return a
    /// freshly imported copy of it
    fn export_model(&mut self, model: &Model) -> Result<Model>;
}
