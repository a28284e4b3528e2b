//! Core data structures for modelpress
//!
//! This crate provides the shared data model for the optimization pipeline:
//! the scene graph with identity handles, skinned meshes with bone weights
//! and blend shapes, materials and textures, transforms, bounds, and the
//! workspace-wide error type.

pub mod bounds;
pub mod color;
pub mod error;
pub mod material;
pub mod model;
pub mod scene;
pub mod skin;
pub mod transform;

pub use bounds::*;
pub use color::*;
pub use error::*;
pub use material::*;
pub use model::*;
pub use scene::*;
pub use skin::*;
pub use transform::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Matrix4, Point3, Vector2, Vector3, Vector4};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 2D vector with floating point components
pub type Vector2f = Vector2<f32>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// A 4D vector with floating point components
pub type Vector4f = Vector4<f32>;

/// A 4×4 matrix with floating point components
pub type Matrix4f = Matrix4<f32>;
