//! # modelpress
//!
//! A content-optimization pipeline for skinned 3D character models: merge
//! multiple skinned meshes into one, re-bucket their materials into fewer
//! texture atlases, and optionally decimate triangle count.
//!
//! This is the umbrella crate providing convenient access to the whole
//! workspace; the individual crates can be used for more granular control
//! over dependencies:
//!
//! - **core**: shared data model (scene graph, skinned meshes, materials)
//! - **combine**: mesh combining and bone remapping
//! - **atlas**: texture-atlas packing and UV remapping
//! - **simplification**: decimation contract and baseline simplifier
//! - **io**: asset persistence (PNG textures, JSON interchange documents)
//! - **pipeline**: the stage-based optimization flow
//!
//! ## Quick start
//!
//! ```no_run
//! use modelpress::prelude::*;
//!
//! # fn run(model: &modelpress::Model) -> modelpress::Result<()> {
//! let mut sink = FsAssetSink::new("out", &model.name)?;
//! let mut ctx = Context::new(&mut sink);
//! let optimized = standard_flow().optimize(&mut ctx, model)?;
//! # let _ = optimized;
//! # Ok(()) }
//! ```

pub use modelpress_core::*;

pub use modelpress_atlas as atlas;
pub use modelpress_combine as combine;
pub use modelpress_io as io;
pub use modelpress_pipeline as pipeline;
pub use modelpress_simplification as simplification;

/// Convenient imports for common use cases
pub mod prelude {
    pub use modelpress_atlas::*;
    pub use modelpress_combine::*;
    pub use modelpress_core::*;
    pub use modelpress_io::*;
    pub use modelpress_pipeline::*;
    pub use modelpress_simplification::*;
}
