//! Optimization pipeline for modelpress
//!
//! Wires the combine, atlas, shape-clean, and decimate stages into an
//! ordered flow over a scene model, exporting the result through an
//! `AssetSink` when the last stage finishes.

pub mod context;
pub mod flow;
pub mod stages;

pub use context::*;
pub use flow::*;
pub use stages::*;

/// The standard stage order: combine, atlas, shape clean, decimate
pub fn standard_flow() -> OptimizeFlow {
    OptimizeFlow::new(vec![
        Box::new(CombineStage::new()),
        Box::new(AtlasStage::new()),
        Box::new(ShapeCleanStage::new()),
        Box::new(DecimateStage::default()),
    ])
}
