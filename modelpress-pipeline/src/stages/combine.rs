//! Combine stage
//!
//! Discovers combineable renderers and the bone forest of their skeletons,
//! merges every enabled renderer's submeshes into one skinned mesh on the
//! first target renderer, and then collapses bones marked for merging into
//! their parents. Bone selections are made against the source model and
//! projected onto the working copy by relative path.

use crate::context::Context;
use crate::flow::Stage;
use modelpress_combine::{combine_meshes, BoneMergeBuilder, MeshInstance};
use modelpress_core::{Model, NodeId, Result, SceneGraph, Transform3D};
use std::collections::HashSet;

/// What to do with a bone when the combine stage finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoneMergeMode {
    #[default]
    Keep,
    ToParent,
}

/// One bone in the discovered skeleton forest
#[derive(Debug, Clone)]
pub struct MergeableBone {
    pub node: NodeId,
    pub children: Vec<MergeableBone>,
    pub mode: BoneMergeMode,
}

impl MergeableBone {
    fn new(node: NodeId) -> Self {
        Self {
            node,
            children: Vec::new(),
            mode: BoneMergeMode::Keep,
        }
    }

    /// Apply `f` to this bone and every descendant
    pub fn for_each_mut(&mut self, f: &mut impl FnMut(&mut MergeableBone)) {
        f(self);
        for child in &mut self.children {
            child.for_each_mut(f);
        }
    }

    /// Recurse children first, then merge this bone into its parent when
    /// marked. Bones are resolved in the working model by their path
    /// relative to the source root.
    fn merge_as_proxy(
        &self,
        source_graph: &SceneGraph,
        proxy_root: NodeId,
        target_graph: &SceneGraph,
        target_root: NodeId,
        builder: &mut BoneMergeBuilder,
        parent: Option<NodeId>,
    ) {
        let true_bone = source_graph.project(self.node, proxy_root, target_graph, target_root);

        for child in &self.children {
            child.merge_as_proxy(
                source_graph,
                proxy_root,
                target_graph,
                target_root,
                builder,
                true_bone.or(parent),
            );
        }

        if let (Some(parent), Some(bone)) = (parent, true_bone) {
            if self.mode == BoneMergeMode::ToParent {
                log::info!(
                    "merging {} into {}",
                    target_graph.name_of(bone),
                    target_graph.name_of(parent)
                );
                builder.merge(bone, parent);
            }
        }
    }
}

/// A renderer eligible for combining
#[derive(Debug, Clone, Copy)]
pub struct Combineable {
    pub renderer: usize,
    pub combine: bool,
}

/// Stage merging all enabled renderers into one skinned mesh
#[derive(Default)]
pub struct CombineStage {
    pub combineables: Vec<Combineable>,
    pub armatures: Vec<MergeableBone>,
    source_root: Option<NodeId>,
}

impl CombineStage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resynchronize against the renderers and bones of `model`. Skinned
    /// renderers default to combining, rigid ones to staying out.
    pub fn discover(&mut self, model: &Model) {
        self.source_root = Some(model.root);
        self.combineables = model
            .renderers
            .iter()
            .enumerate()
            .map(|(renderer, r)| Combineable {
                renderer,
                combine: r.skinned,
            })
            .collect();

        let mut bones: Vec<NodeId> = Vec::new();
        for renderer in model.skinned_renderers() {
            for &bone in &renderer.mesh.bones {
                if !bones.contains(&bone) {
                    bones.push(bone);
                }
            }
        }
        log::info!("detected {} bones", bones.len());

        // Nest each bone under its nearest ancestor that is also a bone
        let bone_set: HashSet<NodeId> = bones.iter().copied().collect();
        let parent_of: Vec<Option<NodeId>> = bones
            .iter()
            .map(|&bone| {
                model
                    .graph
                    .ancestors(bone)
                    .into_iter()
                    .find(|a| bone_set.contains(a))
            })
            .collect();

        self.armatures = bones
            .iter()
            .enumerate()
            .filter(|&(i, _)| parent_of[i].is_none())
            .map(|(_, &root)| build_subtree(root, &bones, &parent_of))
            .collect();
    }

    /// Set the merge mode of every bone used by one renderer's skeleton
    pub fn set_bone_merge_mode(&mut self, model: &Model, renderer: usize, mode: BoneMergeMode) {
        let bones: HashSet<NodeId> = match model.renderers.get(renderer) {
            Some(r) => r.mesh.bones.iter().copied().collect(),
            None => return,
        };
        for armature in &mut self.armatures {
            armature.for_each_mut(&mut |bone| {
                if bones.contains(&bone.node) {
                    bone.mode = mode;
                }
            });
        }
    }
}

fn build_subtree(node: NodeId, bones: &[NodeId], parent_of: &[Option<NodeId>]) -> MergeableBone {
    let mut result = MergeableBone::new(node);
    for (i, &bone) in bones.iter().enumerate() {
        if parent_of[i] == Some(node) {
            result.children.push(build_subtree(bone, bones, parent_of));
        }
    }
    result
}

impl Stage for CombineStage {
    fn name(&self) -> &str {
        "combine"
    }

    fn run(&mut self, _ctx: &mut Context, mut model: Model, source: &Model) -> Result<Model> {
        let targets: Vec<usize> = if self.combineables.is_empty() {
            model
                .renderers
                .iter()
                .enumerate()
                .filter(|(_, r)| r.skinned)
                .map(|(i, _)| i)
                .collect()
        } else {
            self.combineables
                .iter()
                .filter(|c| c.combine)
                .map(|c| c.renderer)
                .filter(|&i| i < model.renderers.len())
                .collect()
        };
        if targets.is_empty() {
            log::warn!("no renderers to combine");
            return Ok(model);
        }

        let output = {
            let mut instances = Vec::new();
            for &index in &targets {
                let renderer = &model.renderers[index];
                let (rigid_node, transform) = if renderer.skinned {
                    (None, Transform3D::identity())
                } else {
                    (
                        Some(renderer.node),
                        model.graph.world_transform(renderer.node),
                    )
                };
                for submesh in 0..renderer.mesh.submesh_count() {
                    instances.push(MeshInstance {
                        mesh: &renderer.mesh,
                        submesh,
                        rigid_node,
                        transform,
                        material: renderer.materials[submesh],
                    });
                }
            }
            combine_meshes(&model.name, &instances)?
        };

        // The first target keeps the combined result; the rest vanish
        let first = targets[0];
        let mesh_name = model
            .graph
            .name_of(model.renderers[first].node)
            .to_string();
        {
            let renderer = &mut model.renderers[first];
            let shape_count = output.mesh.blend_shapes.len();
            renderer.mesh = output.mesh;
            renderer.mesh.name = mesh_name;
            renderer.materials = output.materials;
            renderer.skinned = true;
            renderer.blend_shape_weights = vec![0.0; shape_count];
        }
        let dropped: HashSet<usize> = targets[1..].iter().copied().collect();
        let renderers = std::mem::take(&mut model.renderers);
        model.renderers = renderers
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !dropped.contains(i))
            .map(|(_, r)| r)
            .collect();

        // Collapse marked bones, resolving them by path from the source
        let proxy_root = self.source_root.unwrap_or(source.root);
        {
            let graph = &model.graph;
            let mesh = &mut model.renderers[first].mesh;
            let mut builder = BoneMergeBuilder::new(mesh, graph);
            for armature in &self.armatures {
                armature.merge_as_proxy(
                    &source.graph,
                    proxy_root,
                    graph,
                    model.root,
                    &mut builder,
                    None,
                );
            }
            builder.apply();
        }

        Ok(model)
    }
}
