//! The optimization flow
//!
//! An ordered list of stages sharing one capability interface. The flow
//! clones the source model before the first stage runs, so source models
//! are never mutated, and finishes by exporting the result through the
//! sink, handing back the freshly imported copy.

use crate::context::Context;
use modelpress_core::{Model, Result};

/// One optimization stage
pub trait Stage {
    fn name(&self) -> &str;

    /// Transform `model`; `source` is the original, untouched input (used
    /// for proxy-path lookups into the pre-optimization hierarchy)
    fn run(&mut self, ctx: &mut Context, model: Model, source: &Model) -> Result<Model>;
}

/// Runs stages in order over a working copy of the source model
pub struct OptimizeFlow {
    stages: Vec<Box<dyn Stage>>,
}

impl OptimizeFlow {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &[Box<dyn Stage>] {
        &self.stages
    }

    /// Run every stage over a copy of `source`, export the result, and
    /// return the imported copy renamed to mark it optimized.
    pub fn optimize(&mut self, ctx: &mut Context, source: &Model) -> Result<Model> {
        let mut result = source.clone();
        for stage in &mut self.stages {
            log::info!("### stage {}", stage.name());
            result = stage.run(ctx, result, source)?;
        }
        let mut exported = ctx.sink.export_model(&result)?;
        exported.name = format!("{} (Optimized)", source.name);
        Ok(exported)
    }
}
