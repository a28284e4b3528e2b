//! Grid-clustering simplification for skinned meshes
//!
//! Uniform-grid vertex clustering: vertices falling into the same grid
//! cell collapse onto the cell's first-seen vertex, which keeps every
//! per-vertex attribute (UVs, colors, bone weights, blend-shape deltas)
//! exact for the surviving vertices. Degenerate triangles are dropped.
//! Submesh partitioning and the bone list are preserved.

use crate::MeshSimplifier;
use modelpress_core::{Aabb, BlendShape, BlendShapeFrame, Error, Result, SkinnedMesh, Vector2f, Vector3f, Vector4f};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct GridClusteringSimplifier;

impl GridClusteringSimplifier {
    pub fn new() -> Self {
        Self
    }
}

impl MeshSimplifier for GridClusteringSimplifier {
    fn simplify(&self, mesh: &SkinnedMesh, quality: f32) -> Result<SkinnedMesh> {
        if mesh.is_empty() {
            return Err(Error::InvalidData("mesh is empty".to_string()));
        }
        if !(0.0..=1.0).contains(&quality) || quality == 0.0 {
            return Err(Error::InvalidData(
                "quality must be in (0, 1]".to_string(),
            ));
        }
        if quality >= 1.0 {
            return Ok(mesh.clone());
        }

        let bounds = match Aabb::from_points(mesh.positions.iter()) {
            Some(b) => b,
            None => return Ok(mesh.clone()),
        };
        let size = bounds.size();
        let extent = size.x.max(size.y).max(size.z);
        if extent <= f32::EPSILON {
            return Ok(mesh.clone());
        }

        // Grid resolution from the target vertex count
        let target = (mesh.vertex_count() as f32 * quality).ceil().max(1.0);
        let resolution = target.cbrt().ceil().max(1.0);
        let cell = extent / resolution;

        let mut cell_to_new: HashMap<(i64, i64, i64), u32> = HashMap::new();
        let mut map = Vec::with_capacity(mesh.vertex_count());
        let mut new_count = 0u32;
        for p in &mesh.positions {
            let key = (
                ((p.x - bounds.min.x) / cell).floor() as i64,
                ((p.y - bounds.min.y) / cell).floor() as i64,
                ((p.z - bounds.min.z) / cell).floor() as i64,
            );
            let new = *cell_to_new.entry(key).or_insert_with(|| {
                let n = new_count;
                new_count += 1;
                n
            });
            map.push(new);
        }

        rebuild_from_map(mesh, &map, new_count as usize)
    }

    fn simplify_lossless(&self, mesh: &SkinnedMesh) -> Result<SkinnedMesh> {
        if mesh.is_empty() {
            return Err(Error::InvalidData("mesh is empty".to_string()));
        }

        // Weld only vertices whose position, normal, and UV agree exactly
        let mut seen: HashMap<[u32; 8], u32> = HashMap::new();
        let mut map = Vec::with_capacity(mesh.vertex_count());
        let mut new_count = 0u32;
        for v in 0..mesh.vertex_count() {
            let p = mesh.positions[v];
            let n = mesh
                .normals
                .get(v)
                .copied()
                .unwrap_or_else(Vector3f::zeros);
            let uv = mesh
                .uvs
                .get(v)
                .copied()
                .unwrap_or_else(Vector2f::zeros);
            let key = [
                p.x.to_bits(),
                p.y.to_bits(),
                p.z.to_bits(),
                n.x.to_bits(),
                n.y.to_bits(),
                n.z.to_bits(),
                uv.x.to_bits(),
                uv.y.to_bits(),
            ];
            let new = *seen.entry(key).or_insert_with(|| {
                let n = new_count;
                new_count += 1;
                n
            });
            map.push(new);
        }

        rebuild_from_map(mesh, &map, new_count as usize)
    }
}

/// Rebuild a mesh through an old→new vertex map, taking attributes from
/// each new vertex's first-seen source and dropping degenerate triangles
fn rebuild_from_map(mesh: &SkinnedMesh, map: &[u32], new_count: usize) -> Result<SkinnedMesh> {
    let mut first_old = vec![u32::MAX; new_count];
    for (old, &new) in map.iter().enumerate() {
        if first_old[new as usize] == u32::MAX {
            first_old[new as usize] = old as u32;
        }
    }

    let mut out = SkinnedMesh::new(&mesh.name);
    out.bones = mesh.bones.clone();
    out.bind_poses = mesh.bind_poses.clone();
    for &old in &first_old {
        let old = old as usize;
        out.positions.push(mesh.positions[old]);
        out.normals.push(
            mesh.normals
                .get(old)
                .copied()
                .unwrap_or_else(Vector3f::zeros),
        );
        out.tangents.push(
            mesh.tangents
                .get(old)
                .copied()
                .unwrap_or_else(Vector4f::zeros),
        );
        out.uvs.push(
            mesh.uvs
                .get(old)
                .copied()
                .unwrap_or_else(Vector2f::zeros),
        );
        out.colors
            .push(mesh.colors.get(old).copied().unwrap_or_default());
        out.bone_weights
            .push(mesh.bone_weights.get(old).copied().unwrap_or_default());
    }

    for submesh in &mesh.submeshes {
        let mut indices = Vec::with_capacity(submesh.len());
        for triangle in submesh.chunks_exact(3) {
            let a = map[triangle[0] as usize];
            let b = map[triangle[1] as usize];
            let c = map[triangle[2] as usize];
            if a != b && b != c && c != a {
                indices.extend_from_slice(&[a, b, c]);
            }
        }
        out.submeshes.push(indices);
    }

    for shape in &mesh.blend_shapes {
        let frames = shape
            .frames
            .iter()
            .map(|frame| {
                let pick =
                    |deltas: &[Vector3f]| -> Vec<Vector3f> {
                        first_old
                            .iter()
                            .map(|&old| {
                                deltas
                                    .get(old as usize)
                                    .copied()
                                    .unwrap_or_else(Vector3f::zeros)
                            })
                            .collect()
                    };
                BlendShapeFrame {
                    weight: frame.weight,
                    delta_positions: pick(&frame.delta_positions),
                    delta_normals: pick(&frame.delta_normals),
                    delta_tangents: pick(&frame.delta_tangents),
                }
            })
            .collect();
        out.blend_shapes.push(BlendShape {
            name: shape.name.clone(),
            frames,
        });
    }

    out.recompute_bounds();
    out.validate()?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelpress_core::{BoneWeight, Point3f, Rgba, Vector2f, Vector3f, Vector4f};

    fn make_grid_mesh(size: usize) -> SkinnedMesh {
        let mut mesh = SkinnedMesh::new("grid");
        for y in 0..size {
            for x in 0..size {
                mesh.positions
                    .push(Point3f::new(x as f32, y as f32, 0.0));
                mesh.normals.push(Vector3f::z());
                mesh.tangents.push(Vector4f::x());
                mesh.uvs.push(Vector2f::new(
                    x as f32 / (size - 1) as f32,
                    y as f32 / (size - 1) as f32,
                ));
                mesh.colors.push(Rgba::WHITE);
                mesh.bone_weights.push(BoneWeight::default());
            }
        }
        let mut indices = Vec::new();
        for y in 0..(size - 1) {
            for x in 0..(size - 1) {
                let tl = (y * size + x) as u32;
                let tr = tl + 1;
                let bl = tl + size as u32;
                let br = bl + 1;
                indices.extend_from_slice(&[tl, bl, tr, tr, bl, br]);
            }
        }
        mesh.submeshes.push(indices);
        mesh
    }

    #[test]
    fn test_clustering_reduces_complexity() {
        let mesh = make_grid_mesh(10);
        let simplified = GridClusteringSimplifier::new()
            .simplify(&mesh, 0.25)
            .unwrap();
        assert!(simplified.vertex_count() < mesh.vertex_count());
        assert!(simplified.triangle_count() < mesh.triangle_count());
        assert!(simplified.triangle_count() > 0);
        assert!(simplified.validate().is_ok());
    }

    #[test]
    fn test_full_quality_is_identity() {
        let mesh = make_grid_mesh(4);
        let out = GridClusteringSimplifier::new().simplify(&mesh, 1.0).unwrap();
        assert_eq!(out.vertex_count(), mesh.vertex_count());
        assert_eq!(out.triangle_count(), mesh.triangle_count());
    }

    #[test]
    fn test_invalid_quality_is_error() {
        let mesh = make_grid_mesh(4);
        let s = GridClusteringSimplifier::new();
        assert!(s.simplify(&mesh, 0.0).is_err());
        assert!(s.simplify(&mesh, 1.5).is_err());
    }

    #[test]
    fn test_lossless_welds_exact_duplicates() {
        let mut mesh = make_grid_mesh(3);
        // duplicate every vertex and reference the copies from a second
        // submesh; lossless welding folds them back
        let n = mesh.vertex_count() as u32;
        let clones: Vec<_> = (0..n).collect();
        for i in clones {
            let i = i as usize;
            mesh.positions.push(mesh.positions[i]);
            mesh.normals.push(mesh.normals[i]);
            mesh.tangents.push(mesh.tangents[i]);
            mesh.uvs.push(mesh.uvs[i]);
            mesh.colors.push(mesh.colors[i]);
            mesh.bone_weights.push(mesh.bone_weights[i]);
        }
        mesh.submeshes.push(vec![n, n + 1, n + 3]);

        let out = GridClusteringSimplifier::new()
            .simplify_lossless(&mesh)
            .unwrap();
        assert_eq!(out.vertex_count(), n as usize);
        assert_eq!(out.submesh_count(), 2);
        assert_eq!(out.submeshes[1], vec![0, 1, 3]);
    }

    #[test]
    fn test_blend_shapes_follow_representatives() {
        let mut mesh = make_grid_mesh(4);
        let mut frame = BlendShapeFrame::zeroed(100.0, mesh.vertex_count());
        frame.delta_positions[0] = Vector3f::new(0.0, 0.0, 2.0);
        mesh.add_blend_shape(BlendShape {
            name: "bulge".into(),
            frames: vec![frame],
        })
        .unwrap();

        let out = GridClusteringSimplifier::new()
            .simplify(&mesh, 0.25)
            .unwrap();
        assert_eq!(out.blend_shapes.len(), 1);
        let frame = &out.blend_shapes[0].frames[0];
        assert_eq!(frame.delta_positions.len(), out.vertex_count());
        // vertex 0 survives as a representative and keeps its delta
        assert_eq!(frame.delta_positions[0], Vector3f::new(0.0, 0.0, 2.0));
    }
}
