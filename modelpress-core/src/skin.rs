//! Skinned mesh data structures: bone weights, blend shapes, and the
//! combined mesh representation produced by the merge pipeline.

use crate::bounds::Aabb;
use crate::error::{Error, Result};
use crate::color::Rgba;
use crate::scene::NodeId;
use nalgebra::{Matrix4, Point3, Vector2, Vector3, Vector4};
use serde::{Deserialize, Serialize};

/// Maximum number of bone influences per vertex
pub const MAX_INFLUENCES: usize = 4;

/// Up to four (bone index, weight) influence pairs for one vertex.
///
/// Unused slots carry index `-1` and weight `0.0`. Two used slots must never
/// reference the same bone index; `merge_duplicate_slots` restores that
/// invariant after a remap collapses indices together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoneWeight {
    pub indices: [i32; MAX_INFLUENCES],
    pub weights: [f32; MAX_INFLUENCES],
}

impl Default for BoneWeight {
    fn default() -> Self {
        Self {
            indices: [-1; MAX_INFLUENCES],
            weights: [0.0; MAX_INFLUENCES],
        }
    }
}

impl BoneWeight {
    /// A vertex fully bound to a single bone
    pub fn rigid(bone: usize) -> Self {
        let mut w = Self::default();
        w.indices[0] = bone as i32;
        w.weights[0] = 1.0;
        w
    }

    /// Rewrite every used slot's bone index through `map`
    pub fn remap(mut self, map: impl Fn(i32) -> i32) -> Self {
        for slot in 0..MAX_INFLUENCES {
            if self.indices[slot] >= 0 {
                self.indices[slot] = map(self.indices[slot]);
            }
        }
        self
    }

    /// Combine slots referencing the same bone index by summing their
    /// weights into the first occurrence and vacating the rest.
    pub fn merge_duplicate_slots(mut self) -> Self {
        for i in 0..MAX_INFLUENCES {
            if self.indices[i] < 0 {
                continue;
            }
            for j in (i + 1)..MAX_INFLUENCES {
                if self.indices[j] == self.indices[i] {
                    self.weights[i] += self.weights[j];
                    self.indices[j] = -1;
                    self.weights[j] = 0.0;
                }
            }
        }
        self
    }

    pub fn total_weight(&self) -> f32 {
        self.weights.iter().sum()
    }

    pub fn max_index(&self) -> i32 {
        *self.indices.iter().max().unwrap_or(&-1)
    }
}

/// One weighted frame of per-vertex deltas for a blend shape.
/// Delta arrays are sized to the owning mesh's vertex count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlendShapeFrame {
    /// Frame weight on the 0–100 scale
    pub weight: f32,
    pub delta_positions: Vec<Vector3<f32>>,
    pub delta_normals: Vec<Vector3<f32>>,
    pub delta_tangents: Vec<Vector3<f32>>,
}

impl BlendShapeFrame {
    /// An all-zero frame for a mesh with `vertex_count` vertices
    pub fn zeroed(weight: f32, vertex_count: usize) -> Self {
        Self {
            weight,
            delta_positions: vec![Vector3::zeros(); vertex_count],
            delta_normals: vec![Vector3::zeros(); vertex_count],
            delta_tangents: vec![Vector3::zeros(); vertex_count],
        }
    }
}

/// A named morph target with one or more weighted frames
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlendShape {
    pub name: String,
    pub frames: Vec<BlendShapeFrame>,
}

impl BlendShape {
    /// Order frames by ascending weight, as required by skinned-mesh
    /// formats with monotonically increasing frame weights.
    pub fn sort_frames(&mut self) {
        self.frames
            .sort_by(|a, b| a.weight.total_cmp(&b.weight));
    }
}

/// A skinned triangle mesh with deduplicated vertex attribute arrays,
/// an identity-unique bone list, and one index list per submesh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkinnedMesh {
    pub name: String,
    pub positions: Vec<Point3<f32>>,
    pub normals: Vec<Vector3<f32>>,
    /// xyz direction plus w handedness
    pub tangents: Vec<Vector4<f32>>,
    pub uvs: Vec<Vector2<f32>>,
    pub colors: Vec<Rgba>,
    pub bone_weights: Vec<BoneWeight>,
    /// Bones by scene-node identity; no node appears twice
    pub bones: Vec<NodeId>,
    /// One bind-pose matrix per bone
    pub bind_poses: Vec<Matrix4<f32>>,
    /// Triangle index lists, one per submesh
    pub submeshes: Vec<Vec<u32>>,
    pub blend_shapes: Vec<BlendShape>,
    pub bounds: Option<Aabb>,
}

impl SkinnedMesh {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            positions: Vec::new(),
            normals: Vec::new(),
            tangents: Vec::new(),
            uvs: Vec::new(),
            colors: Vec::new(),
            bone_weights: Vec::new(),
            bones: Vec::new(),
            bind_poses: Vec::new(),
            submeshes: Vec::new(),
            blend_shapes: Vec::new(),
            bounds: None,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn submesh_count(&self) -> usize {
        self.submeshes.len()
    }

    /// Total triangle count across all submeshes
    pub fn triangle_count(&self) -> usize {
        self.submeshes.iter().map(|s| s.len() / 3).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Attach a blend shape, enforcing frame ordering and delta sizing
    pub fn add_blend_shape(&mut self, mut shape: BlendShape) -> Result<()> {
        for frame in &shape.frames {
            if frame.delta_positions.len() != self.vertex_count()
                || frame.delta_normals.len() != self.vertex_count()
                || frame.delta_tangents.len() != self.vertex_count()
            {
                return Err(Error::InvalidMesh(format!(
                    "blend shape '{}' frame deltas not sized to vertex count {}",
                    shape.name,
                    self.vertex_count()
                )));
            }
        }
        shape.sort_frames();
        self.blend_shapes.push(shape);
        Ok(())
    }

    /// Recompute `bounds` from the position buffer
    pub fn recompute_bounds(&mut self) {
        self.bounds = Aabb::from_points(self.positions.iter());
    }

    /// Check the structural invariants: attribute arrays sized alike, every
    /// submesh index addressing a valid vertex, every bone-weight index
    /// addressing a valid bone, bind poses parallel to the bone list.
    pub fn validate(&self) -> Result<()> {
        let n = self.positions.len();
        let attrs = [
            ("normals", self.normals.len()),
            ("tangents", self.tangents.len()),
            ("uvs", self.uvs.len()),
            ("colors", self.colors.len()),
            ("bone_weights", self.bone_weights.len()),
        ];
        for (name, len) in attrs {
            if len != n {
                return Err(Error::InvalidMesh(format!(
                    "attribute '{}' has {} entries for {} vertices",
                    name, len, n
                )));
            }
        }
        if self.bind_poses.len() != self.bones.len() {
            return Err(Error::InvalidMesh(format!(
                "{} bind poses for {} bones",
                self.bind_poses.len(),
                self.bones.len()
            )));
        }
        for (s, submesh) in self.submeshes.iter().enumerate() {
            if submesh.len() % 3 != 0 {
                return Err(Error::InvalidMesh(format!(
                    "submesh {} index count {} is not a triangle list",
                    s,
                    submesh.len()
                )));
            }
            if let Some(&bad) = submesh.iter().find(|&&i| i as usize >= n) {
                return Err(Error::InvalidMesh(format!(
                    "submesh {} references vertex {} of {}",
                    s, bad, n
                )));
            }
        }
        let bone_count = self.bones.len() as i32;
        for (v, w) in self.bone_weights.iter().enumerate() {
            if w.max_index() >= bone_count {
                return Err(Error::InvalidMesh(format!(
                    "vertex {} weight references bone {} of {}",
                    v,
                    w.max_index(),
                    bone_count
                )));
            }
        }
        for shape in &self.blend_shapes {
            for frame in &shape.frames {
                if frame.delta_positions.len() != n {
                    return Err(Error::InvalidMesh(format!(
                        "blend shape '{}' frame not sized to vertex count",
                        shape.name
                    )));
                }
            }
            if shape
                .frames
                .windows(2)
                .any(|f| f[0].weight > f[1].weight)
            {
                return Err(Error::InvalidMesh(format!(
                    "blend shape '{}' frames not ordered by ascending weight",
                    shape.name
                )));
            }
        }
        Ok(())
    }
}
