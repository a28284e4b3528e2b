//! Atlas stage
//!
//! Merges duplicate materials, then packs each renderer's materials into
//! shared atlas textures and rewrites the mesh to address them.

use crate::context::Context;
use crate::flow::Stage;
use modelpress_atlas::{merge_duplicate_materials, AtlasConfig, AtlasPacker, PackSettings};
use modelpress_core::{Model, Result};

#[derive(Default)]
pub struct AtlasStage {
    pub config: AtlasConfig,
    pub settings: PackSettings,
}

impl AtlasStage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AtlasConfig) -> Self {
        Self {
            config,
            settings: PackSettings::default(),
        }
    }
}

impl Stage for AtlasStage {
    fn name(&self) -> &str {
        "atlas"
    }

    fn run(&mut self, ctx: &mut Context, mut model: Model, _source: &Model) -> Result<Model> {
        if self.config.all_materials().is_empty() {
            log::info!("atlas config is empty; discovering materials");
            self.config.discover(&model);
            self.config.auto_fill(&model);
        }

        for renderer in 0..model.renderers.len() {
            merge_duplicate_materials(&mut model, renderer)?;
            let packer = AtlasPacker {
                config: &self.config,
                defaults: &ctx.defaults,
                settings: self.settings,
            };
            packer.pack_renderer(&mut model, renderer, &mut *ctx.sink)?;
        }
        Ok(model)
    }
}
