//! Mesh combining and bone remapping
//!
//! This crate merges multiple skinned (and rigid) meshes into a single
//! skinned mesh:
//! - Bone table: deduplicates skeleton bones by identity across inputs
//! - Vertex merger: streams per-unit attributes into one buffer
//! - Blend-shape transfer: re-indexes morph deltas onto the merged buffer
//! - Bone-merge builder: collapses bones into their parents afterwards

pub mod blend_shapes;
pub mod bone_merge;
pub mod bone_table;
pub mod combiner;

pub use blend_shapes::*;
pub use bone_merge::*;
pub use bone_table::*;
pub use combiner::*;
