//! Mesh simplification for modelpress
//!
//! The pipeline delegates decimation to a `MeshSimplifier` collaborator;
//! this crate defines that contract, the decimation settings and driver,
//! and ships a baseline grid-clustering simplifier.

pub mod clustering;

pub use clustering::*;

use modelpress_core::{Error, Result, SkinnedMesh};

/// Reduce a mesh's triangle count while preserving its attributes
pub trait MeshSimplifier {
    /// Lossy simplification toward `quality` ∈ (0, 1] of the original
    /// complexity
    fn simplify(&self, mesh: &SkinnedMesh, quality: f32) -> Result<SkinnedMesh>;

    /// Remove only redundant geometry without visible change
    fn simplify_lossless(&self, mesh: &SkinnedMesh) -> Result<SkinnedMesh>;
}

/// Lossless and lossy modes are mutually exclusive configuration states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecimationMode {
    #[default]
    Disabled,
    Lossless,
    Lossy,
}

#[derive(Debug, Clone, Copy)]
pub struct DecimationSettings {
    pub mode: DecimationMode,
    /// Quality ratio in (0, 1]; ignored when `target_triangles` is set
    pub quality: f32,
    /// When set, quality is derived from this triangle target
    pub target_triangles: Option<usize>,
}

impl Default for DecimationSettings {
    fn default() -> Self {
        Self {
            mode: DecimationMode::Disabled,
            quality: 1.0,
            target_triangles: None,
        }
    }
}

/// Run the configured decimation over one mesh.
///
/// A triangle target at or above the current count skips simplification
/// and returns the mesh unchanged.
pub fn decimate(
    mesh: &SkinnedMesh,
    settings: &DecimationSettings,
    simplifier: &dyn MeshSimplifier,
) -> Result<SkinnedMesh> {
    match settings.mode {
        DecimationMode::Disabled => Ok(mesh.clone()),
        DecimationMode::Lossless => simplifier.simplify_lossless(mesh),
        DecimationMode::Lossy => {
            let total = mesh.triangle_count();
            let mut quality = settings.quality;
            if let Some(target) = settings.target_triangles {
                if target >= total {
                    log::info!(
                        "target {} >= current {} triangles; skipping decimation",
                        target,
                        total
                    );
                    return Ok(mesh.clone());
                }
                quality = target as f32 / total.max(1) as f32;
            }
            if quality >= 1.0 {
                return Ok(mesh.clone());
            }
            if quality <= 0.0 {
                return Err(Error::InvalidData(
                    "decimation quality must be in (0, 1]".to_string(),
                ));
            }
            simplifier.simplify(mesh, quality)
        }
    }
}
