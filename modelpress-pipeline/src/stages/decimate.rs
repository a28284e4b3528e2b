//! Decimation stage
//!
//! Delegates triangle reduction to a `MeshSimplifier` collaborator. A
//! triangle target is converted to a quality ratio against the model's
//! total triangle count; a target at or above the current count skips
//! decimation entirely.

use crate::context::Context;
use crate::flow::Stage;
use modelpress_core::{Model, Result};
use modelpress_simplification::{
    decimate, DecimationMode, DecimationSettings, GridClusteringSimplifier, MeshSimplifier,
};

pub struct DecimateStage {
    pub settings: DecimationSettings,
    pub simplifier: Box<dyn MeshSimplifier>,
}

impl Default for DecimateStage {
    fn default() -> Self {
        Self {
            settings: DecimationSettings::default(),
            simplifier: Box::new(GridClusteringSimplifier::new()),
        }
    }
}

impl DecimateStage {
    pub fn new(settings: DecimationSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }
}

impl Stage for DecimateStage {
    fn name(&self) -> &str {
        "decimate"
    }

    fn run(&mut self, _ctx: &mut Context, mut model: Model, _source: &Model) -> Result<Model> {
        if self.settings.mode == DecimationMode::Disabled {
            return Ok(model);
        }

        // One global quality ratio derived from the whole model's count
        let total = model.total_triangles();
        let mut effective = self.settings;
        if let Some(target) = effective.target_triangles {
            if target >= total {
                log::info!(
                    "target {} >= current {} triangles; skipping decimation",
                    target,
                    total
                );
                return Ok(model);
            }
            effective.quality = target as f32 / total.max(1) as f32;
            effective.target_triangles = None;
        }

        for renderer in &mut model.renderers {
            if renderer.mesh.is_empty() {
                continue;
            }
            renderer.mesh = decimate(&renderer.mesh, &effective, self.simplifier.as_ref())?;
        }
        Ok(model)
    }
}
