//! Blend-shape cleaning stage
//!
//! Bakes shapes with a non-zero current weight into the base vertex data
//! and removes them, and drops shapes with non-ASCII names. Both behaviors
//! are independently switchable.

use crate::context::Context;
use crate::flow::Stage;
use modelpress_core::{Model, Result, Vector4f};

pub struct ShapeCleanStage {
    pub apply_nonzero: bool,
    pub remove_non_ascii: bool,
}

impl Default for ShapeCleanStage {
    fn default() -> Self {
        Self {
            apply_nonzero: true,
            remove_non_ascii: true,
        }
    }
}

impl ShapeCleanStage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Stage for ShapeCleanStage {
    fn name(&self) -> &str {
        "shape clean"
    }

    fn run(&mut self, _ctx: &mut Context, mut model: Model, _source: &Model) -> Result<Model> {
        for renderer in &mut model.renderers {
            let weights = renderer.blend_shape_weights.clone();
            let mesh = &mut renderer.mesh;

            let mut kept_shapes = Vec::new();
            let mut kept_weights = Vec::new();
            for (index, shape) in std::mem::take(&mut mesh.blend_shapes).into_iter().enumerate() {
                let current = weights.get(index).copied().unwrap_or(0.0);

                if self.apply_nonzero && current > 0.0 {
                    // Bake the shape at its current weight into the base
                    // arrays, scaled against the final frame's weight
                    if let Some(frame) = shape.frames.last() {
                        let factor = if frame.weight.abs() > f32::EPSILON {
                            current / frame.weight
                        } else {
                            0.0
                        };
                        let count = mesh
                            .positions
                            .len()
                            .min(frame.delta_positions.len())
                            .min(frame.delta_normals.len())
                            .min(frame.delta_tangents.len());
                        for v in 0..count {
                            mesh.positions[v] += frame.delta_positions[v] * factor;
                            mesh.normals[v] += frame.delta_normals[v] * factor;
                            let dt = frame.delta_tangents[v] * factor;
                            let t = mesh.tangents[v];
                            mesh.tangents[v] =
                                Vector4f::new(t.x + dt.x, t.y + dt.y, t.z + dt.z, t.w);
                        }
                    }
                    log::info!("baked blend shape '{}' at weight {}", shape.name, current);
                    continue;
                }

                if self.remove_non_ascii && !shape.name.is_ascii() {
                    log::info!("dropping blend shape '{}' (non-ASCII name)", shape.name);
                    continue;
                }

                kept_shapes.push(shape);
                kept_weights.push(current);
            }
            mesh.blend_shapes = kept_shapes;
            mesh.recompute_bounds();
            renderer.blend_shape_weights = kept_weights;
        }
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use modelpress_core::{
        BlendShape, BlendShapeFrame, BoneWeight, MeshRenderer, Point3f, Rgba, SkinnedMesh,
        Vector2f, Vector3f,
    };
    use modelpress_io::MemoryAssetSink;

    fn make_model_with_shapes(shapes: &[(&str, f32)]) -> Model {
        let mut model = Model::new("m");
        let node = model.graph.add_node("body", Some(model.root));
        let mut mesh = SkinnedMesh::new("body");
        for i in 0..3 {
            mesh.positions.push(Point3f::new(i as f32, 0.0, 0.0));
            mesh.normals.push(Vector3f::z());
            mesh.tangents.push(Vector4f::new(1.0, 0.0, 0.0, 1.0));
            mesh.uvs.push(Vector2f::zeros());
            mesh.colors.push(Rgba::WHITE);
            mesh.bone_weights.push(BoneWeight::default());
        }
        for (name, _) in shapes {
            let mut frame = BlendShapeFrame::zeroed(100.0, 3);
            frame.delta_positions[0] = Vector3f::new(0.0, 0.0, 1.0);
            mesh.add_blend_shape(BlendShape {
                name: name.to_string(),
                frames: vec![frame],
            })
            .unwrap();
        }
        let mut renderer = MeshRenderer::new(node, mesh, vec![]);
        renderer.blend_shape_weights = shapes.iter().map(|&(_, w)| w).collect();
        model.renderers.push(renderer);
        model
    }

    #[test]
    fn test_bakes_nonzero_shape_and_removes_it() {
        let source = make_model_with_shapes(&[("smile", 50.0), ("blink", 0.0)]);
        let mut sink = MemoryAssetSink::new();
        let mut ctx = Context::new(&mut sink);

        let model = ShapeCleanStage::new()
            .run(&mut ctx, source.clone(), &source)
            .unwrap();

        let renderer = &model.renderers[0];
        let names: Vec<&str> = renderer
            .mesh
            .blend_shapes
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["blink"]);
        assert_eq!(renderer.blend_shape_weights, vec![0.0]);
        // half of the 100-weight frame's delta was applied
        assert_eq!(renderer.mesh.positions[0].z, 0.5);
    }

    #[test]
    fn test_drops_non_ascii_names() {
        let source = make_model_with_shapes(&[("笑顔", 0.0), ("smile", 0.0)]);
        let mut sink = MemoryAssetSink::new();
        let mut ctx = Context::new(&mut sink);

        let model = ShapeCleanStage::new()
            .run(&mut ctx, source.clone(), &source)
            .unwrap();

        let renderer = &model.renderers[0];
        assert_eq!(renderer.mesh.blend_shapes.len(), 1);
        assert_eq!(renderer.mesh.blend_shapes[0].name, "smile");
        assert_eq!(renderer.blend_shape_weights.len(), 1);
    }

    #[test]
    fn test_disabled_options_keep_everything() {
        let source = make_model_with_shapes(&[("笑顔", 50.0)]);
        let mut sink = MemoryAssetSink::new();
        let mut ctx = Context::new(&mut sink);

        let mut stage = ShapeCleanStage {
            apply_nonzero: false,
            remove_non_ascii: false,
        };
        let model = stage.run(&mut ctx, source.clone(), &source).unwrap();
        assert_eq!(model.renderers[0].mesh.blend_shapes.len(), 1);
        assert_eq!(model.renderers[0].mesh.positions[0].z, 0.0);
    }
}
