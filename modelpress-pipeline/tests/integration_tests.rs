//! End-to-end pipeline scenarios

use image::RgbaImage;
use modelpress_core::{
    texture_properties, BoneWeight, Material, MaterialId, MeshRenderer, Model, NodeId, Point3f,
    Rgba, SkinnedMesh, Texture, TextureRef, Vector2f, Vector3f, Vector4f,
};
use modelpress_io::MemoryAssetSink;
use modelpress_pipeline::{
    AtlasStage, CombineStage, Context, DecimateStage, OptimizeFlow, ShapeCleanStage,
};
use modelpress_simplification::{DecimationMode, DecimationSettings};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A 10×10 vertex grid (100 vertices) fully bound to `bones[0]`
fn make_grid_mesh(name: &str, bones: Vec<NodeId>) -> SkinnedMesh {
    let mut mesh = SkinnedMesh::new(name);
    for y in 0..10 {
        for x in 0..10 {
            mesh.positions
                .push(Point3f::new(x as f32 * 0.1, y as f32 * 0.1, 0.0));
            mesh.normals.push(Vector3f::z());
            mesh.tangents.push(Vector4f::new(1.0, 0.0, 0.0, 1.0));
            mesh.uvs
                .push(Vector2f::new(x as f32 / 9.0, y as f32 / 9.0));
            mesh.colors.push(Rgba::WHITE);
            mesh.bone_weights.push(BoneWeight::rigid(0));
        }
    }
    let mut indices = Vec::new();
    for y in 0..9u32 {
        for x in 0..9u32 {
            let tl = y * 10 + x;
            indices.extend_from_slice(&[tl, tl + 10, tl + 1, tl + 1, tl + 10, tl + 11]);
        }
    }
    mesh.submeshes.push(indices);
    mesh.bind_poses = vec![modelpress_core::Matrix4f::identity(); bones.len()];
    mesh.bones = bones;
    mesh
}

fn add_textured_material(model: &mut Model, name: &str, pixel: [u8; 4]) -> MaterialId {
    let mut material = Material::new(name, "standard");
    material.set_texture(
        texture_properties::MAIN,
        TextureRef::new(Texture::new(
            &format!("{}_diffuse", name),
            RgbaImage::from_pixel(256, 256, image::Rgba(pixel)),
        )),
    );
    model.add_material(material)
}

/// Two skinned grid meshes sharing one bone, each with its own material
fn make_two_mesh_model() -> Model {
    let mut model = Model::new("avatar");
    let armature = model.graph.add_node("armature", Some(model.root));
    let shared = model.graph.add_node("hips", Some(armature));
    let arm_a = model.graph.add_node("arm_a", Some(shared));
    let arm_b = model.graph.add_node("arm_b", Some(shared));

    let mat_a = add_textured_material(&mut model, "skin", [255, 0, 0, 255]);
    let mat_b = add_textured_material(&mut model, "cloth", [0, 0, 255, 255]);

    let node_a = model.graph.add_node("body", Some(model.root));
    let node_b = model.graph.add_node("outfit", Some(model.root));
    model.renderers.push(MeshRenderer::new(
        node_a,
        make_grid_mesh("body", vec![shared, arm_a]),
        vec![mat_a],
    ));
    model.renderers.push(MeshRenderer::new(
        node_b,
        make_grid_mesh("outfit", vec![shared, arm_b]),
        vec![mat_b],
    ));
    model
}

#[test]
fn test_combine_two_skinned_meshes() {
    init_logging();
    let source = make_two_mesh_model();
    let mut sink = MemoryAssetSink::new();
    let mut ctx = Context::new(&mut sink);

    let mut combine = CombineStage::new();
    combine.discover(&source);
    let mut flow = OptimizeFlow::new(vec![Box::new(combine)]);
    let optimized = flow.optimize(&mut ctx, &source).unwrap();

    assert_eq!(optimized.name, "avatar (Optimized)");
    assert_eq!(optimized.renderers.len(), 1);
    let mesh = &optimized.renderers[0].mesh;
    // per-unit dedup: exactly 100 + 100 vertices, never welded
    assert_eq!(mesh.vertex_count(), 200);
    assert_eq!(mesh.submesh_count(), 2);
    // |bonesA ∪ bonesB| by identity: shared, arm_a, arm_b
    assert_eq!(mesh.bones.len(), 3);
    assert!(mesh.validate().is_ok());

    // source model untouched
    assert_eq!(source.renderers.len(), 2);
    assert_eq!(source.renderers[0].mesh.vertex_count(), 100);
}

#[test]
fn test_combine_preserves_index_counts() {
    init_logging();
    let source = make_two_mesh_model();
    let input_indices: usize = source
        .renderers
        .iter()
        .flat_map(|r| r.mesh.submeshes.iter())
        .map(Vec::len)
        .sum();

    let mut sink = MemoryAssetSink::new();
    let mut ctx = Context::new(&mut sink);
    let mut flow = OptimizeFlow::new(vec![Box::new(CombineStage::new())]);
    let optimized = flow.optimize(&mut ctx, &source).unwrap();

    let output_indices: usize = optimized.renderers[0]
        .mesh
        .submeshes
        .iter()
        .map(Vec::len)
        .sum();
    assert_eq!(input_indices, output_indices);
}

#[test]
fn test_combine_then_atlas() {
    init_logging();
    let mut source = make_two_mesh_model();
    // a third renderer so three 256×256 textures land in one atlas
    let mat_c = add_textured_material(&mut source, "trim", [0, 255, 0, 255]);
    let node_c = source.graph.add_node("trim", Some(source.root));
    let hips = source.graph.find_by_path(source.root, "armature/hips").unwrap();
    source.renderers.push(MeshRenderer::new(
        node_c,
        make_grid_mesh("trim", vec![hips]),
        vec![mat_c],
    ));

    let mut sink = MemoryAssetSink::new();
    let mut ctx = Context::new(&mut sink);
    let mut flow = OptimizeFlow::new(vec![
        Box::new(CombineStage::new()),
        Box::new(AtlasStage::new()),
    ]);
    let optimized = flow.optimize(&mut ctx, &source).unwrap();

    // three full-island 256 textures pack into the next viable square
    let atlas = sink.texture(texture_properties::MAIN).unwrap();
    assert!(atlas.width() <= 512 && atlas.height() <= 512);

    // one default group: one submesh, one generated material
    let renderer = &optimized.renderers[0];
    assert_eq!(renderer.mesh.submesh_count(), 1);
    assert_eq!(renderer.materials.len(), 1);
    let group_material = optimized.material(renderer.materials[0]).unwrap();
    assert!(group_material.texture(texture_properties::MAIN).is_some());

    // every UV addresses the packed atlas
    for uv in &renderer.mesh.uvs {
        assert!((0.0..=1.0).contains(&uv.x) && (0.0..=1.0).contains(&uv.y));
    }
}

#[test]
fn test_full_flow_with_decimation() {
    init_logging();
    let source = make_two_mesh_model();
    let before = source.total_triangles();

    let mut sink = MemoryAssetSink::new();
    let mut ctx = Context::new(&mut sink);
    let mut flow = OptimizeFlow::new(vec![
        Box::new(CombineStage::new()),
        Box::new(AtlasStage::new()),
        Box::new(ShapeCleanStage::new()),
        Box::new(DecimateStage::new(DecimationSettings {
            mode: DecimationMode::Lossy,
            quality: 1.0,
            target_triangles: Some(before / 4),
        })),
    ]);
    let optimized = flow.optimize(&mut ctx, &source).unwrap();

    let after = optimized.total_triangles();
    assert!(after < before, "decimation reduced {} -> {}", before, after);
    assert!(optimized.renderers[0].mesh.validate().is_ok());
}

#[test]
fn test_decimation_skips_when_target_exceeds_count() {
    init_logging();
    let source = make_two_mesh_model();
    let before = source.total_triangles();

    let mut sink = MemoryAssetSink::new();
    let mut ctx = Context::new(&mut sink);
    let mut flow = OptimizeFlow::new(vec![Box::new(DecimateStage::new(DecimationSettings {
        mode: DecimationMode::Lossy,
        quality: 1.0,
        target_triangles: Some(before * 10),
    }))]);
    let optimized = flow.optimize(&mut ctx, &source).unwrap();
    assert_eq!(optimized.total_triangles(), before);
}

#[test]
fn test_bone_merge_through_proxy_paths() {
    init_logging();
    use modelpress_pipeline::BoneMergeMode;

    let source = make_two_mesh_model();
    let mut combine = CombineStage::new();
    combine.discover(&source);
    // fold both meshes' skeletons down to the shared hips bone
    combine.set_bone_merge_mode(&source, 0, BoneMergeMode::ToParent);
    combine.set_bone_merge_mode(&source, 1, BoneMergeMode::ToParent);
    // roots have no parent to merge into, so only hips survives
    let mut sink = MemoryAssetSink::new();
    let mut ctx = Context::new(&mut sink);
    let mut flow = OptimizeFlow::new(vec![Box::new(combine)]);
    let optimized = flow.optimize(&mut ctx, &source).unwrap();

    let mesh = &optimized.renderers[0].mesh;
    assert_eq!(mesh.bones.len(), 1, "arm bones folded into hips");
    assert!(mesh.validate().is_ok());
    for w in &mesh.bone_weights {
        assert!(w.max_index() < 1);
    }
}
