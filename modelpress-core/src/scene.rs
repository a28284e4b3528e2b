//! Scene graph with stable identity handles
//!
//! Bones and attachment points are scene nodes. Node identity is the slotmap
//! key, never the node's name or transform value; two nodes with the same
//! name are still distinct entities, and a node keeps its identity while its
//! transform changes.

use crate::transform::Transform3D;
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Opaque identity handle for a scene node
    pub struct NodeId;
}

/// A single node in the scene hierarchy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub local: Transform3D,
}

/// Hierarchy of named, transformable nodes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneGraph {
    nodes: SlotMap<NodeId, Node>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node. A node without a parent is a hierarchy root.
    pub fn add_node(&mut self, name: &str, parent: Option<NodeId>) -> NodeId {
        let id = self.nodes.insert(Node {
            name: name.to_string(),
            parent,
            children: Vec::new(),
            local: Transform3D::identity(),
        });
        if let Some(parent) = parent {
            if let Some(node) = self.nodes.get_mut(parent) {
                node.children.push(id);
            }
        }
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn name_of(&self, id: NodeId) -> &str {
        self.nodes.get(id).map_or("<missing>", |n| n.name.as_str())
    }

    /// Local-to-world transform, composed root-down
    pub fn world_transform(&self, id: NodeId) -> Transform3D {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(c) = current {
            let node = match self.nodes.get(c) {
                Some(n) => n,
                None => break,
            };
            chain.push(node.local);
            current = node.parent;
        }
        chain
            .into_iter()
            .rev()
            .fold(Transform3D::identity(), Transform3D::compose)
    }

    /// Pre-order traversal of `root` and all its descendants
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(id) {
                result.push(id);
                for &child in node.children.iter().rev() {
                    stack.push(child);
                }
            }
        }
        result
    }

    /// Walk up from `id` yielding ancestors, closest first
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = self.nodes.get(id).and_then(|n| n.parent);
        while let Some(c) = current {
            result.push(c);
            current = self.nodes.get(c).and_then(|n| n.parent);
        }
        result
    }

    /// Slash-separated name path from `ancestor` down to `node`.
    /// Empty string when `node == ancestor`, `None` when `node` is not in
    /// `ancestor`'s subtree.
    pub fn path_from(&self, node: NodeId, ancestor: NodeId) -> Option<String> {
        if node == ancestor {
            return Some(String::new());
        }
        let mut names = Vec::new();
        let mut current = node;
        loop {
            let n = self.nodes.get(current)?;
            names.push(n.name.clone());
            match n.parent {
                Some(p) if p == ancestor => break,
                Some(p) => current = p,
                None => return None,
            }
        }
        names.reverse();
        Some(names.join("/"))
    }

    /// Resolve a slash-separated name path below `root`
    pub fn find_by_path(&self, root: NodeId, path: &str) -> Option<NodeId> {
        if path.is_empty() {
            return Some(root);
        }
        let mut current = root;
        for segment in path.split('/') {
            let node = self.nodes.get(current)?;
            current = *node
                .children
                .iter()
                .find(|&&c| self.nodes.get(c).map(|n| n.name.as_str()) == Some(segment))?;
        }
        Some(current)
    }

    /// Locate the node in `target`'s hierarchy corresponding to `node` in
    /// this graph, by matching its relative path from `proxy_root` against
    /// `target_root`. A missing path is a logged warning, not an error.
    pub fn project(
        &self,
        node: NodeId,
        proxy_root: NodeId,
        target: &SceneGraph,
        target_root: NodeId,
    ) -> Option<NodeId> {
        let path = self.path_from(node, proxy_root)?;
        let found = target.find_by_path(target_root, &path);
        if found.is_none() {
            log::warn!(
                "could not find path {:?} below {} (derived from {})",
                path,
                target.name_of(target_root),
                self.name_of(proxy_root)
            );
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3};

    fn make_chain() -> (SceneGraph, NodeId, NodeId, NodeId) {
        let mut g = SceneGraph::new();
        let root = g.add_node("root", None);
        let hips = g.add_node("hips", Some(root));
        let spine = g.add_node("spine", Some(hips));
        (g, root, hips, spine)
    }

    #[test]
    fn test_path_round_trip() {
        let (g, root, _hips, spine) = make_chain();
        let path = g.path_from(spine, root).unwrap();
        assert_eq!(path, "hips/spine");
        assert_eq!(g.find_by_path(root, &path), Some(spine));
    }

    #[test]
    fn test_path_to_self_is_empty() {
        let (g, root, ..) = make_chain();
        assert_eq!(g.path_from(root, root).unwrap(), "");
        assert_eq!(g.find_by_path(root, ""), Some(root));
    }

    #[test]
    fn test_path_outside_subtree() {
        let mut g = SceneGraph::new();
        let a = g.add_node("a", None);
        let b = g.add_node("b", None);
        assert!(g.path_from(a, b).is_none());
    }

    #[test]
    fn test_world_transform_composes() {
        let (mut g, _root, hips, spine) = make_chain();
        g.get_mut(hips).unwrap().local = Transform3D::translation(Vector3::new(0.0, 1.0, 0.0));
        g.get_mut(spine).unwrap().local = Transform3D::translation(Vector3::new(0.0, 0.5, 0.0));
        let world = g.world_transform(spine);
        let p = world.transform_point(&Point3::origin());
        assert_relative_eq!(p.y, 1.5);
    }

    #[test]
    fn test_project_onto_duplicate() {
        let (g, root, _hips, spine) = make_chain();
        let copy = g.clone();
        // Same keys exist in a clone, but projection must go through paths
        let projected = g.project(spine, root, &copy, root).unwrap();
        assert_eq!(copy.name_of(projected), "spine");
    }

    #[test]
    fn test_project_missing_path() {
        let (g, root, _hips, spine) = make_chain();
        let mut other = SceneGraph::new();
        let other_root = other.add_node("root", None);
        other.add_node("unrelated", Some(other_root));
        assert!(g.project(spine, root, &other, other_root).is_none());
    }

    #[test]
    fn test_descendants_preorder() {
        let (g, root, hips, spine) = make_chain();
        assert_eq!(g.descendants(root), vec![root, hips, spine]);
    }
}
