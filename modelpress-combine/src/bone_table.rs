//! Bone deduplication table
//!
//! Collects (bone, bind-pose) pairs from every source mesh into a single
//! bone list. Two bones are the same entity when they are the same scene
//! node — identity, never name. The first-seen bind pose wins; later
//! occurrences with a different bind pose get a per-occurrence adjustment
//! matrix used to correct vertices weighted to that occurrence.

use modelpress_core::{Matrix4f, NodeId};
use std::collections::HashMap;

/// Bind poses closer than this are treated as identical
const BIND_POSE_EPSILON: f32 = 1e-5;

/// The table's answer for one inserted (bone, bind-pose) pair
#[derive(Debug, Clone, Copy)]
pub struct BoneSlot {
    /// Global bone index in the merged bone list
    pub index: usize,
    /// `inverse(first bind pose) * this bind pose`, present only when this
    /// occurrence's bind pose differs from the first-seen one
    pub adjustment: Option<Matrix4f>,
}

/// Deduplicating registry of bones across all combine inputs
#[derive(Debug, Default)]
pub struct BoneTable {
    bones: Vec<NodeId>,
    bind_poses: Vec<Matrix4f>,
    index_of: HashMap<NodeId, usize>,
}

impl BoneTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one (bone, bind-pose) occurrence and return its global slot
    pub fn insert(&mut self, bone: NodeId, bind_pose: Matrix4f) -> BoneSlot {
        if let Some(&index) = self.index_of.get(&bone) {
            let first = self.bind_poses[index];
            let adjustment = if (first - bind_pose).norm() > BIND_POSE_EPSILON {
                match first.try_inverse() {
                    Some(inverse) => Some(inverse * bind_pose),
                    None => {
                        log::warn!(
                            "first-seen bind pose for bone {:?} is singular; \
                             skipping adjustment",
                            bone
                        );
                        None
                    }
                }
            } else {
                None
            };
            return BoneSlot { index, adjustment };
        }

        let index = self.bones.len();
        self.bones.push(bone);
        self.bind_poses.push(bind_pose);
        self.index_of.insert(bone, index);
        BoneSlot {
            index,
            adjustment: None,
        }
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Consume the table into the merged bone list and bind poses
    pub fn into_parts(self) -> (Vec<NodeId>, Vec<Matrix4f>) {
        (self.bones, self.bind_poses)
    }
}
