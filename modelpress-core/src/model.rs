//! The scene object processed by the optimization pipeline

use crate::material::{Material, MaterialId};
use crate::scene::{NodeId, SceneGraph};
use crate::skin::SkinnedMesh;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

/// A mesh attached to a scene node, with one material slot per submesh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshRenderer {
    pub node: NodeId,
    pub mesh: SkinnedMesh,
    /// One material per submesh
    pub materials: Vec<MaterialId>,
    /// `false` for rigid meshes that carry no skeleton of their own
    pub skinned: bool,
    /// Current weight of each blend shape, parallel to `mesh.blend_shapes`
    pub blend_shape_weights: Vec<f32>,
}

impl MeshRenderer {
    pub fn new(node: NodeId, mesh: SkinnedMesh, materials: Vec<MaterialId>) -> Self {
        let shape_count = mesh.blend_shapes.len();
        Self {
            node,
            mesh,
            materials,
            skinned: true,
            blend_shape_weights: vec![0.0; shape_count],
        }
    }

    pub fn rigid(node: NodeId, mesh: SkinnedMesh, materials: Vec<MaterialId>) -> Self {
        Self {
            skinned: false,
            ..Self::new(node, mesh, materials)
        }
    }
}

/// A self-contained scene-graph object: hierarchy, materials, and renderers.
///
/// The pipeline never mutates its input model; stages operate on a clone
/// produced by the flow, so `Model` is `Clone` and handles stay valid in
/// the copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    pub name: String,
    pub graph: SceneGraph,
    pub root: NodeId,
    pub materials: SlotMap<MaterialId, Material>,
    pub renderers: Vec<MeshRenderer>,
}

impl Model {
    pub fn new(name: &str) -> Self {
        let mut graph = SceneGraph::new();
        let root = graph.add_node(name, None);
        Self {
            name: name.to_string(),
            graph,
            root,
            materials: SlotMap::with_key(),
            renderers: Vec::new(),
        }
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.insert(material)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id)
    }

    pub fn material_name(&self, id: MaterialId) -> &str {
        self.materials.get(id).map_or("<missing>", |m| m.name.as_str())
    }

    /// Total triangle count over all renderers
    pub fn total_triangles(&self) -> usize {
        self.renderers.iter().map(|r| r.mesh.triangle_count()).sum()
    }

    pub fn skinned_renderers(&self) -> impl Iterator<Item = &MeshRenderer> {
        self.renderers.iter().filter(|r| r.skinned)
    }
}
