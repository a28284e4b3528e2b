//! Duplicate-material merging
//!
//! Submeshes whose materials share the same main-texture handle render
//! identically once atlassed, so they are merged into one submesh before
//! packing. The first occurrence keeps its material slot.

use modelpress_core::{Error, Model, Result, TextureRef};

pub fn merge_duplicate_materials(model: &mut Model, renderer: usize) -> Result<()> {
    let materials = model
        .renderers
        .get(renderer)
        .ok_or_else(|| Error::InvalidData(format!("no renderer {}", renderer)))?
        .materials
        .clone();
    let submesh_count = model.renderers[renderer].mesh.submesh_count();
    if materials.len() != submesh_count {
        return Err(Error::InvalidData(format!(
            "{} materials for {} submeshes",
            materials.len(),
            submesh_count
        )));
    }

    let main_textures: Vec<Option<TextureRef>> = materials
        .iter()
        .map(|&m| model.material(m).and_then(|mat| mat.main_texture().cloned()))
        .collect();

    // merge_into[i]: the submeshes folded into slot i; None = already folded
    let mut merge_into: Vec<Option<Vec<usize>>> =
        (0..materials.len()).map(|i| Some(vec![i])).collect();
    for i in 0..materials.len() {
        if merge_into[i].is_none() || main_textures[i].is_none() {
            continue;
        }
        for j in (i + 1)..materials.len() {
            let same = matches!(
                (&main_textures[i], &main_textures[j]),
                (Some(a), Some(b)) if a == b
            );
            if merge_into[j].is_some() && same {
                log::info!("merging material slot {} <- {}", i, j);
                if let Some(list) = merge_into[i].as_mut() {
                    list.push(j);
                }
                merge_into[j] = None;
            }
        }
    }

    let old_submeshes = std::mem::take(&mut model.renderers[renderer].mesh.submeshes);
    let mut new_submeshes = Vec::new();
    let mut new_materials = Vec::new();
    for (slot, merged) in merge_into.into_iter().enumerate() {
        let merged = match merged {
            Some(list) => list,
            None => continue,
        };
        let mut indices = Vec::new();
        for m in merged {
            indices.extend_from_slice(&old_submeshes[m]);
        }
        new_submeshes.push(indices);
        new_materials.push(materials[slot]);
    }

    let renderer = &mut model.renderers[renderer];
    renderer.mesh.submeshes = new_submeshes;
    renderer.materials = new_materials;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;
    use modelpress_core::{Material, MeshRenderer, SkinnedMesh, Texture};
    use modelpress_core::texture_properties::MAIN;

    #[test]
    fn test_same_texture_handle_merges_submeshes() {
        let mut model = Model::new("m");
        let shared = TextureRef::new(Texture::new("t", RgbaImage::new(4, 4)));

        let mut a = Material::new("a", "standard");
        a.set_texture(MAIN, shared.clone());
        let mut b = Material::new("b", "standard");
        b.set_texture(MAIN, shared);
        let mut c = Material::new("c", "standard");
        c.set_texture(MAIN, TextureRef::new(Texture::new("t2", RgbaImage::new(4, 4))));

        let ids = vec![
            model.add_material(a),
            model.add_material(b),
            model.add_material(c),
        ];
        let node = model.graph.add_node("n", Some(model.root));
        let mut mesh = SkinnedMesh::new("mesh");
        mesh.submeshes = vec![vec![0, 1, 2], vec![3, 4, 5], vec![6, 7, 8]];
        model.renderers.push(MeshRenderer::new(node, mesh, ids.clone()));

        merge_duplicate_materials(&mut model, 0).unwrap();

        let renderer = &model.renderers[0];
        assert_eq!(renderer.mesh.submesh_count(), 2);
        assert_eq!(renderer.mesh.submeshes[0], vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(renderer.materials, vec![ids[0], ids[2]]);
    }

    #[test]
    fn test_textureless_materials_never_merge() {
        let mut model = Model::new("m");
        let ids = vec![
            model.add_material(Material::new("a", "standard")),
            model.add_material(Material::new("b", "standard")),
        ];
        let node = model.graph.add_node("n", Some(model.root));
        let mut mesh = SkinnedMesh::new("mesh");
        mesh.submeshes = vec![vec![0, 1, 2], vec![3, 4, 5]];
        model.renderers.push(MeshRenderer::new(node, mesh, ids));

        merge_duplicate_materials(&mut model, 0).unwrap();
        assert_eq!(model.renderers[0].mesh.submesh_count(), 2);
    }
}
