//! Vertex merger
//!
//! Streams per-source-mesh vertex attributes into a single deduplicated
//! output buffer, rewriting submesh index lists through a local→merged map.
//! Deduplication is scoped to one (mesh, submesh) unit: coincident vertices
//! from different units are never unified, preserving each source's skinning
//! continuity exactly.

use crate::blend_shapes::transfer_blend_shapes;
use crate::bone_table::BoneTable;
use modelpress_core::{
    BoneWeight, Error, MaterialId, Matrix4f, NodeId, Result, Rgba, SkinnedMesh, Transform3D,
    Vector2f, Vector3f, Vector4f,
};

/// Sentinel for "local vertex not yet copied into the merged buffer"
pub(crate) const UNASSIGNED: u32 = u32::MAX;

/// One unit of work for the merger: a single submesh of a source mesh,
/// placed into the merged result under a transform.
#[derive(Debug, Clone, Copy)]
pub struct MeshInstance<'a> {
    pub mesh: &'a SkinnedMesh,
    /// Index of the submesh to consume
    pub submesh: usize,
    /// For meshes without a skeleton: the scene node the mesh is attached
    /// to. The unit is then treated as bound 100% to that node.
    pub rigid_node: Option<NodeId>,
    /// Local-to-merged transform for this unit
    pub transform: Transform3D,
    pub material: MaterialId,
}

/// Result of a combine operation
#[derive(Debug)]
pub struct CombineOutput {
    pub mesh: SkinnedMesh,
    /// One material per output submesh, in unit order
    pub materials: Vec<MaterialId>,
}

/// Merge all instances into one skinned mesh with one submesh per unit.
///
/// Source meshes are read-only and never mutated. The output carries the
/// deduplicated bone list, re-indexed blend shapes, and recomputed bounds.
pub fn combine_meshes(name: &str, instances: &[MeshInstance]) -> Result<CombineOutput> {
    if instances.is_empty() {
        return Err(Error::InvalidData("no mesh instances to combine".into()));
    }

    let mut table = BoneTable::new();
    let mut out = SkinnedMesh::new(name);
    let mut materials = Vec::with_capacity(instances.len());
    let mut index_maps: Vec<Vec<u32>> = Vec::with_capacity(instances.len());

    for inst in instances {
        let (remap, adjustments) = remap_unit_bones(&mut table, inst)?;

        let submesh = inst.mesh.submeshes.get(inst.submesh).ok_or_else(|| {
            Error::InvalidData(format!(
                "mesh '{}' has no submesh {}",
                inst.mesh.name, inst.submesh
            ))
        })?;

        let mut map = vec![UNASSIGNED; inst.mesh.vertex_count()];
        let mut out_indices = Vec::with_capacity(submesh.len());

        for &index in submesh {
            let local = index as usize;
            if local >= map.len() {
                return Err(Error::InvalidMesh(format!(
                    "mesh '{}' submesh {} references vertex {} of {}",
                    inst.mesh.name,
                    inst.submesh,
                    local,
                    map.len()
                )));
            }
            if map[local] == UNASSIGNED {
                map[local] = out.positions.len() as u32;
                append_vertex(&mut out, inst, local, &remap, &adjustments);
            }
            out_indices.push(map[local]);
        }

        out.submeshes.push(out_indices);
        materials.push(inst.material);
        index_maps.push(map);
    }

    for shape in transfer_blend_shapes(instances, &index_maps, out.positions.len()) {
        out.add_blend_shape(shape)?;
    }

    let (bones, bind_poses) = table.into_parts();
    out.bones = bones;
    out.bind_poses = bind_poses;
    out.recompute_bounds();
    out.validate()?;

    Ok(CombineOutput {
        mesh: out,
        materials,
    })
}

/// Register the unit's bones with the table, returning the local→global
/// index map and the per-local-bone adjustment matrices.
fn remap_unit_bones(
    table: &mut BoneTable,
    inst: &MeshInstance,
) -> Result<(Vec<i32>, Vec<Option<Matrix4f>>)> {
    if let Some(node) = inst.rigid_node {
        // A rigid mesh is implicitly skinned to its own transform node.
        // With bind = inverse(unit transform), the node at its current
        // world pose reproduces the merged vertex positions exactly.
        let bind = inst
            .transform
            .inverse()
            .ok_or_else(|| {
                Error::InvalidData(format!(
                    "rigid mesh '{}' has a non-invertible transform",
                    inst.mesh.name
                ))
            })?
            .matrix;
        let slot = table.insert(node, bind);
        return Ok((vec![slot.index as i32], vec![slot.adjustment]));
    }

    let mut remap = Vec::with_capacity(inst.mesh.bones.len());
    let mut adjustments = Vec::with_capacity(inst.mesh.bones.len());
    for (&bone, &bind) in inst.mesh.bones.iter().zip(&inst.mesh.bind_poses) {
        let slot = table.insert(bone, bind);
        remap.push(slot.index as i32);
        adjustments.push(slot.adjustment);
    }
    Ok((remap, adjustments))
}

fn append_vertex(
    out: &mut SkinnedMesh,
    inst: &MeshInstance,
    local: usize,
    remap: &[i32],
    adjustments: &[Option<Matrix4f>],
) {
    let local_weight = if inst.rigid_node.is_some() {
        BoneWeight::rigid(0)
    } else {
        inst.mesh
            .bone_weights
            .get(local)
            .copied()
            .unwrap_or_default()
    };

    let adjust = blended_adjustment(&local_weight, adjustments);

    let mut position = inst.mesh.positions[local];
    let mut normal = inst
        .mesh
        .normals
        .get(local)
        .copied()
        .unwrap_or_else(Vector3f::z);
    let mut tangent = inst
        .mesh
        .tangents
        .get(local)
        .copied()
        .unwrap_or_else(Vector4f::x);

    if let Some(adjust) = adjust {
        position = adjust.transform_point(&position);
        normal = adjust.transform_direction(&normal);
        let t = adjust.transform_direction(&tangent.xyz());
        tangent = Vector4f::new(t.x, t.y, t.z, tangent.w);
    }

    position = inst.transform.transform_point(&position);
    normal = inst.transform.transform_direction(&normal);
    let t = inst.transform.transform_direction(&tangent.xyz());
    tangent = Vector4f::new(t.x, t.y, t.z, tangent.w);

    out.positions.push(position);
    out.normals.push(normal);
    out.tangents.push(tangent);
    out.uvs.push(
        inst.mesh
            .uvs
            .get(local)
            .copied()
            .unwrap_or_else(Vector2f::zeros),
    );
    // Opaque white when the source carries no vertex colors
    out.colors.push(
        inst.mesh
            .colors
            .get(local)
            .copied()
            .unwrap_or(Rgba::WHITE),
    );
    out.bone_weights.push(
        local_weight
            .remap(|i| remap.get(i as usize).copied().unwrap_or(-1))
            .merge_duplicate_slots(),
    );
}

/// Weighted blend of the adjustment matrices referenced by a vertex's
/// influence slots; `None` when no referenced occurrence needs adjusting.
fn blended_adjustment(
    weight: &BoneWeight,
    adjustments: &[Option<Matrix4f>],
) -> Option<Transform3D> {
    let mut any = false;
    for slot in 0..weight.indices.len() {
        let idx = weight.indices[slot];
        if idx >= 0 && weight.weights[slot] > 0.0 {
            if adjustments.get(idx as usize).copied().flatten().is_some() {
                any = true;
            }
        }
    }
    if !any {
        return None;
    }

    let mut blended = Matrix4f::zeros();
    let mut total = 0.0f32;
    for slot in 0..weight.indices.len() {
        let idx = weight.indices[slot];
        let w = weight.weights[slot];
        if idx < 0 || w <= 0.0 {
            continue;
        }
        let m = adjustments
            .get(idx as usize)
            .copied()
            .flatten()
            .unwrap_or_else(Matrix4f::identity);
        blended += m * w;
        total += w;
    }
    if total <= f32::EPSILON {
        return None;
    }
    Some(Transform3D::from(blended / total))
}
