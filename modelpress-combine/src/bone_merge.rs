//! Bone-merge builder
//!
//! Collapses a bone into another (typically its parent), rewriting every
//! bone-weight reference, keeping indices dense, and compacting the bone
//! list. Multiple merges compose; apply them descendants-first so a chain
//! of bones folds into its ancestor correctly.

use modelpress_core::{BoneWeight, Matrix4f, NodeId, SceneGraph, SkinnedMesh};

/// Stateful builder over one mesh's bone list, bind poses, and weights.
/// Changes accumulate in working copies until `apply()` commits them.
pub struct BoneMergeBuilder<'a> {
    mesh: &'a mut SkinnedMesh,
    graph: &'a SceneGraph,
    bones: Vec<NodeId>,
    bind_poses: Vec<Matrix4f>,
    weights: Vec<BoneWeight>,
}

impl<'a> BoneMergeBuilder<'a> {
    pub fn new(mesh: &'a mut SkinnedMesh, graph: &'a SceneGraph) -> Self {
        let bones = mesh.bones.clone();
        let bind_poses = mesh.bind_poses.clone();
        let weights = mesh.bone_weights.clone();
        Self {
            mesh,
            graph,
            bones,
            bind_poses,
            weights,
        }
    }

    /// Merge bone `from` into bone `to`.
    ///
    /// A bone missing from the current list is a non-fatal condition: merge
    /// requests may reference bones already removed by an earlier merge in
    /// the same batch, so the request is logged and skipped.
    pub fn merge(&mut self, from: NodeId, to: NodeId) -> &mut Self {
        let to_idx = match self.bones.iter().position(|&b| b == to) {
            Some(i) => i as i32,
            None => {
                log::warn!("could not find bone {}", self.graph.name_of(to));
                return self;
            }
        };
        let from_idx = match self.bones.iter().position(|&b| b == from) {
            Some(i) => i as i32,
            None => {
                log::warn!("could not find bone {}", self.graph.name_of(from));
                return self;
            }
        };

        for weight in &mut self.weights {
            *weight = weight
                .remap(|idx| {
                    // redirect, then compact past the removed slot
                    let idx = if idx == from_idx { to_idx } else { idx };
                    if idx > from_idx {
                        idx - 1
                    } else {
                        idx
                    }
                })
                .merge_duplicate_slots();
        }

        self.bones.remove(from_idx as usize);
        self.bind_poses.remove(from_idx as usize);
        self
    }

    /// Number of bones currently in the working list
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    /// Commit the working copies back to the mesh
    pub fn apply(self) {
        self.mesh.bones = self.bones;
        self.mesh.bind_poses = self.bind_poses;
        self.mesh.bone_weights = self.weights;
    }
}
