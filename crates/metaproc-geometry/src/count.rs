use gltf::json::validation::Checked;
use gltf::json::{self, Root};
use gltf::mesh::Mode;
use gltf::{Document, Gltf};

use crate::{GeometryError, Result};

/// Decode a `.glb` or `.gltf` body and count its polygons.
///
/// Schema validation is skipped: accessors without a `bufferView` or
/// positions without `min`/`max` still count. Only indices are checked.
pub fn count_polygons(bytes: &[u8]) -> Result<u64> {
    let gltf = Gltf::from_slice_without_validation(bytes)?;
    count_root_polygons(gltf.document.as_json())
}

pub fn count_document_polygons(document: &Document) -> Result<u64> {
    count_root_polygons(document.as_json())
}

/// Count polygons reachable from the active scene.
///
/// The active scene is the document's default scene, else the first one.
/// Children are followed as given: a sub-tree referenced by two parents is
/// counted twice.
pub fn count_root_polygons(root: &Root) -> Result<u64> {
    let scene = root
        .scene
        .and_then(|index| root.scenes.get(index.value()))
        .or_else(|| root.scenes.first())
        .ok_or(GeometryError::NoScene)?;

    let mut ancestors = Vec::new();
    let mut total = 0u64;
    for node in &scene.nodes {
        total = total.saturating_add(count_node(root, node.value(), &mut ancestors)?);
    }
    Ok(total)
}

fn count_node(root: &Root, index: usize, ancestors: &mut Vec<usize>) -> Result<u64> {
    if ancestors.contains(&index) {
        return Err(GeometryError::NodeCycle { node: index });
    }
    let node = lookup(&root.nodes, "node", index)?;

    let mut count = 0u64;
    if let Some(mesh) = node.mesh {
        let mesh = lookup(&root.meshes, "mesh", mesh.value())?;
        for primitive in &mesh.primitives {
            count = count.saturating_add(primitive_polygons(root, primitive)?);
        }
    }

    ancestors.push(index);
    for child in node.children.iter().flatten() {
        count = count.saturating_add(count_node(root, child.value(), ancestors)?);
    }
    ancestors.pop();

    Ok(count)
}

fn primitive_polygons(root: &Root, primitive: &json::mesh::Primitive) -> Result<u64> {
    let Some(indices) = primitive.indices else {
        return Ok(0);
    };
    let accessor = lookup(&root.accessors, "accessor", indices.value())?;
    Ok(match &primitive.mode {
        Checked::Valid(mode) => polygons_for_mode(*mode, accessor.count.0),
        Checked::Invalid => 0,
    })
}

fn lookup<'a, T>(items: &'a [T], what: &'static str, index: usize) -> Result<&'a T> {
    items
        .get(index)
        .ok_or(GeometryError::MissingIndex { what, index })
}

/// Triangles drawn by `index_count` indices in `mode`.
pub fn polygons_for_mode(mode: Mode, index_count: u64) -> u64 {
    match mode {
        Mode::Triangles => index_count / 3,
        Mode::TriangleStrip => index_count.saturating_sub(2),
        Mode::TriangleFan => index_count.saturating_sub(1),
        _ => 0,
    }
}
