//! Blend-shape transfer onto the merged vertex buffer
//!
//! For every distinct shape name across all sources, and every distinct
//! frame weight under that name, one merged frame is built sized to the
//! full merged vertex count. Unmapped vertices keep a zero delta.

use crate::combiner::{MeshInstance, UNASSIGNED};
use modelpress_core::{BlendShape, BlendShapeFrame};

/// Re-index all source blend shapes through the per-unit local→merged maps.
/// Shapes come out in first-seen order; frames ascending by weight.
pub fn transfer_blend_shapes(
    instances: &[MeshInstance],
    index_maps: &[Vec<u32>],
    merged_vertex_count: usize,
) -> Vec<BlendShape> {
    let mut names: Vec<&str> = Vec::new();
    for inst in instances {
        for shape in &inst.mesh.blend_shapes {
            if !names.contains(&shape.name.as_str()) {
                names.push(&shape.name);
            }
        }
    }

    names
        .into_iter()
        .map(|name| build_shape(name, instances, index_maps, merged_vertex_count))
        .collect()
}

fn build_shape(
    name: &str,
    instances: &[MeshInstance],
    index_maps: &[Vec<u32>],
    merged_vertex_count: usize,
) -> BlendShape {
    // Distinct frame weights under this name, across every source
    let mut weights: Vec<f32> = instances
        .iter()
        .flat_map(|inst| &inst.mesh.blend_shapes)
        .filter(|shape| shape.name == name)
        .flat_map(|shape| shape.frames.iter().map(|f| f.weight))
        .collect();
    weights.sort_by(f32::total_cmp);
    weights.dedup();

    let frames = weights
        .into_iter()
        .map(|weight| {
            let mut frame = BlendShapeFrame::zeroed(weight, merged_vertex_count);
            for (inst, map) in instances.iter().zip(index_maps) {
                let source = inst
                    .mesh
                    .blend_shapes
                    .iter()
                    .find(|shape| shape.name == name)
                    .and_then(|shape| shape.frames.iter().find(|f| f.weight == weight));
                let source = match source {
                    Some(f) => f,
                    None => continue,
                };
                for (local, &merged) in map.iter().enumerate() {
                    if merged == UNASSIGNED {
                        continue;
                    }
                    let merged = merged as usize;
                    if let Some(&d) = source.delta_positions.get(local) {
                        frame.delta_positions[merged] = d;
                    }
                    if let Some(&d) = source.delta_normals.get(local) {
                        frame.delta_normals[merged] = d;
                    }
                    if let Some(&d) = source.delta_tangents.get(local) {
                        frame.delta_tangents[merged] = d;
                    }
                }
            }
            frame
        })
        .collect();

    BlendShape {
        name: name.to_string(),
        frames,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelpress_core::{
        BoneWeight, Material, MaterialId, Point3f, Rgba, SkinnedMesh, Transform3D, Vector2f,
        Vector3f, Vector4f,
    };
    use slotmap::SlotMap;

    fn make_triangle(name: &str) -> SkinnedMesh {
        let mut mesh = SkinnedMesh::new(name);
        for i in 0..3 {
            mesh.positions.push(Point3f::new(i as f32, 0.0, 0.0));
            mesh.normals.push(Vector3f::z());
            mesh.tangents.push(Vector4f::x());
            mesh.uvs.push(Vector2f::zeros());
            mesh.colors.push(Rgba::WHITE);
            mesh.bone_weights.push(BoneWeight::default());
        }
        mesh.submeshes.push(vec![0, 1, 2]);
        mesh
    }

    fn add_shape(mesh: &mut SkinnedMesh, name: &str, weights: &[f32]) {
        let n = mesh.vertex_count();
        let frames = weights
            .iter()
            .map(|&w| {
                let mut f = BlendShapeFrame::zeroed(w, n);
                f.delta_positions[0] = Vector3f::new(w, 0.0, 0.0);
                f
            })
            .collect();
        mesh.add_blend_shape(BlendShape {
            name: name.into(),
            frames,
        })
        .unwrap();
    }

    fn make_instance<'a>(mesh: &'a SkinnedMesh, material: MaterialId) -> MeshInstance<'a> {
        MeshInstance {
            mesh,
            submesh: 0,
            rigid_node: None,
            transform: Transform3D::identity(),
            material,
        }
    }

    #[test]
    fn test_frames_ascend_across_sources() {
        let mut materials: SlotMap<MaterialId, Material> = SlotMap::with_key();
        let mat = materials.insert(Material::new("m", "standard"));

        let mut a = make_triangle("a");
        add_shape(&mut a, "wide", &[100.0]);
        let mut b = make_triangle("b");
        add_shape(&mut b, "wide", &[50.0]);

        let instances = [make_instance(&a, mat), make_instance(&b, mat)];
        let maps = vec![vec![0, 1, 2], vec![3, 4, 5]];
        let shapes = transfer_blend_shapes(&instances, &maps, 6);

        assert_eq!(shapes.len(), 1);
        let weights: Vec<f32> = shapes[0].frames.iter().map(|f| f.weight).collect();
        assert_eq!(weights, vec![50.0, 100.0]);
        // The 50-weight frame only carries deltas from mesh b's range
        assert_eq!(shapes[0].frames[0].delta_positions[0], Vector3f::zeros());
        assert_eq!(
            shapes[0].frames[0].delta_positions[3],
            Vector3f::new(50.0, 0.0, 0.0)
        );
    }

    #[test]
    fn test_shapes_in_first_seen_order() {
        let mut materials: SlotMap<MaterialId, Material> = SlotMap::with_key();
        let mat = materials.insert(Material::new("m", "standard"));

        let mut a = make_triangle("a");
        add_shape(&mut a, "blink", &[100.0]);
        let mut b = make_triangle("b");
        add_shape(&mut b, "smile", &[100.0]);
        add_shape(&mut b, "blink", &[100.0]);

        let instances = [make_instance(&a, mat), make_instance(&b, mat)];
        let maps = vec![vec![0, 1, 2], vec![3, 4, 5]];
        let shapes = transfer_blend_shapes(&instances, &maps, 6);
        let names: Vec<&str> = shapes.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["blink", "smile"]);
    }

    #[test]
    fn test_unmapped_vertices_stay_zero() {
        let mut materials: SlotMap<MaterialId, Material> = SlotMap::with_key();
        let mat = materials.insert(Material::new("m", "standard"));

        let mut a = make_triangle("a");
        add_shape(&mut a, "s", &[100.0]);
        let instances = [make_instance(&a, mat)];
        // vertex 1 never referenced by the unit
        let maps = vec![vec![0, UNASSIGNED, 1]];
        let shapes = transfer_blend_shapes(&instances, &maps, 4);
        let frame = &shapes[0].frames[0];
        assert_eq!(frame.delta_positions[0], Vector3f::new(100.0, 0.0, 0.0));
        assert_eq!(frame.delta_positions[2], Vector3f::zeros());
        assert_eq!(frame.delta_positions[3], Vector3f::zeros());
    }
}
