//! Scene graph to document export.

use glam::DVec3;
use tracing::info;

use crate::document::{
    Accessor, AccessorType, Asset, Attributes, Buffer, BufferView, COMPONENT_FLOAT,
    COMPONENT_UNSIGNED_INT, Document, MODE_TRIANGLES, MaterialEntry, MeshEntry, Node,
    PbrMetallicRoughness, Primitive, Scene, TARGET_ARRAY_BUFFER, TARGET_ELEMENT_ARRAY_BUFFER,
};
use crate::error::{Error, Result};
use crate::mesh::{Material, Mesh};
use crate::scene::{SceneGraph, SceneNode, Transform};

/// Flatten a scene graph into a glTF document.
///
/// Node 0 is the root and the rest follow depth-first. The root is always
/// written with identity rotation, whatever orientation the graph carries,
/// so previews never leak into exports.
pub fn export_document(graph: &SceneGraph) -> Result<Document> {
    let mut writer = Writer::default();

    let mut nodes = Vec::new();
    let mut mesh_index = 0;
    write_node(&graph.root, true, &mut writer, &mut nodes, &mut mesh_index)?;
    if mesh_index == 0 {
        return Err(Error::Export {
            mesh_index: 0,
            reason: "scene has no meshes".to_string(),
        });
    }

    let materials = if graph.materials.is_empty() {
        vec![material_entry(&Material::default())]
    } else {
        graph.materials.iter().map(material_entry).collect()
    };

    let Writer {
        bytes,
        accessors,
        buffer_views,
        meshes,
    } = writer;

    info!(
        nodes = nodes.len(),
        meshes = meshes.len(),
        bytes = bytes.len(),
        "exported document"
    );

    Ok(Document {
        asset: Asset::default(),
        scene: 0,
        scenes: vec![Scene { nodes: vec![0] }],
        nodes,
        meshes,
        materials,
        accessors,
        buffer_views,
        buffers: vec![Buffer::embedded(&bytes)],
        binary: bytes,
    })
}

/// Append `node` and its subtree, returning its index.
fn write_node(
    node: &SceneNode,
    is_root: bool,
    writer: &mut Writer,
    nodes: &mut Vec<Node>,
    mesh_index: &mut usize,
) -> Result<usize> {
    let index = nodes.len();
    let mut transform = node.transform;
    if is_root {
        transform.rotation = glam::DQuat::IDENTITY;
    }
    nodes.push(Node {
        name: Some(node.name.clone()),
        ..transform_fields(&transform)
    });

    if let Some(mesh) = &node.mesh {
        mesh.validate().map_err(|reason| Error::Export {
            mesh_index: *mesh_index,
            reason,
        })?;
        let entry = writer.push_mesh(&node.name, mesh);
        nodes[index].mesh = Some(entry);
        *mesh_index += 1;
    }

    let mut children = Vec::with_capacity(node.children.len());
    for child in &node.children {
        children.push(write_node(child, false, writer, nodes, mesh_index)?);
    }
    nodes[index].children = children;
    Ok(index)
}

/// Non-default parts of a transform
fn transform_fields(t: &Transform) -> Node {
    let identity = Transform::IDENTITY;
    Node {
        translation: (t.translation != identity.translation).then(|| t.translation.to_array()),
        rotation: (t.rotation != identity.rotation).then(|| t.rotation.to_array()),
        scale: (t.scale != identity.scale).then(|| t.scale.to_array()),
        ..Default::default()
    }
}

fn material_entry(material: &Material) -> MaterialEntry {
    MaterialEntry {
        name: Some(material.name.clone()),
        pbr_metallic_roughness: PbrMetallicRoughness {
            base_color_factor: material.base_color,
            metallic_factor: material.metallic,
            roughness_factor: material.roughness,
        },
        double_sided: material.double_sided,
    }
}

/// Accumulates the shared buffer and the views and accessors into it.
#[derive(Default)]
struct Writer {
    bytes: Vec<u8>,
    accessors: Vec<Accessor>,
    buffer_views: Vec<BufferView>,
    meshes: Vec<MeshEntry>,
}

impl Writer {
    fn push_mesh(&mut self, name: &str, mesh: &Mesh) -> usize {
        let position = self.push_vec3(&mesh.positions);
        let normal = self.push_vec3(&mesh.normals);
        let indices = self.push_indices(&mesh.indices);
        self.meshes.push(MeshEntry {
            name: Some(name.to_string()),
            primitives: vec![Primitive {
                attributes: Attributes { position, normal },
                indices,
                material: mesh.material,
                mode: MODE_TRIANGLES,
            }],
        });
        self.meshes.len() - 1
    }

    /// Write f32 triples; min/max come from the narrowed values.
    fn push_vec3(&mut self, data: &[DVec3]) -> usize {
        let start = self.bytes.len();
        let mut min = [f32::INFINITY; 3];
        let mut max = [f32::NEG_INFINITY; 3];
        for v in data {
            let v = v.as_vec3().to_array();
            for axis in 0..3 {
                min[axis] = min[axis].min(v[axis]);
                max[axis] = max[axis].max(v[axis]);
                self.bytes.extend_from_slice(&v[axis].to_le_bytes());
            }
        }
        let view = self.push_view(start, TARGET_ARRAY_BUFFER);
        let (min, max) = if data.is_empty() {
            (vec![0.0; 3], vec![0.0; 3])
        } else {
            (
                min.iter().map(|&x| x as f64).collect(),
                max.iter().map(|&x| x as f64).collect(),
            )
        };
        self.push_accessor(view, COMPONENT_FLOAT, data.len(), AccessorType::Vec3, min, max)
    }

    fn push_indices(&mut self, triangles: &[[u32; 3]]) -> usize {
        let start = self.bytes.len();
        let mut min = u32::MAX;
        let mut max = 0;
        for &i in triangles.iter().flatten() {
            min = min.min(i);
            max = max.max(i);
            self.bytes.extend_from_slice(&i.to_le_bytes());
        }
        if triangles.is_empty() {
            min = 0;
        }
        let view = self.push_view(start, TARGET_ELEMENT_ARRAY_BUFFER);
        self.push_accessor(
            view,
            COMPONENT_UNSIGNED_INT,
            triangles.len() * 3,
            AccessorType::Scalar,
            vec![min as f64],
            vec![max as f64],
        )
    }

    fn push_view(&mut self, start: usize, target: u32) -> usize {
        self.buffer_views.push(BufferView {
            buffer: 0,
            byte_offset: start,
            byte_length: self.bytes.len() - start,
            target: Some(target),
        });
        self.buffer_views.len() - 1
    }

    fn push_accessor(
        &mut self,
        buffer_view: usize,
        component_type: u32,
        count: usize,
        kind: AccessorType,
        min: Vec<f64>,
        max: Vec<f64>,
    ) -> usize {
        self.accessors.push(Accessor {
            buffer_view,
            component_type,
            count,
            kind,
            min,
            max,
        });
        self.accessors.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::compose;
    use glam::DQuat;

    fn triangle(offset: f64) -> Mesh {
        Mesh {
            positions: vec![
                DVec3::new(offset, 0.0, 0.0),
                DVec3::new(offset + 1.0, 0.0, 0.0),
                DVec3::new(offset, 1.0, 0.5),
            ],
            normals: vec![DVec3::Z; 3],
            indices: vec![[0, 1, 2]],
            material: 0,
        }
    }

    #[test]
    fn test_layout() {
        let graph = compose(vec![triangle(0.0), triangle(3.0)]);
        let doc = export_document(&graph).unwrap();

        assert_eq!(doc.nodes.len(), 3);
        assert_eq!(doc.nodes[0].children, vec![1, 2]);
        assert_eq!(doc.nodes[2].mesh, Some(1));
        assert_eq!(doc.meshes.len(), 2);
        assert_eq!(doc.accessors.len(), 6);
        assert_eq!(doc.buffer_views.len(), 6);
        // 3 positions + 3 normals at 12 bytes, 3 indices at 4 bytes, twice
        assert_eq!(doc.binary.len(), 2 * (36 + 36 + 12));
        assert_eq!(doc.buffers[0].byte_length, doc.binary.len());
        assert_eq!(doc.buffer_views[3].byte_offset, 84);
        assert_eq!(doc.vertex_count(), 6);
    }

    #[test]
    fn test_accessor_bounds() {
        let doc = export_document(&compose(vec![triangle(3.0)])).unwrap();
        let position = &doc.accessors[0];
        assert_eq!(position.kind, AccessorType::Vec3);
        assert_eq!(position.min, vec![3.0, 0.0, 0.0]);
        assert_eq!(position.max, vec![4.0, 1.0, 0.5]);

        let index = &doc.accessors[2];
        assert_eq!(index.component_type, COMPONENT_UNSIGNED_INT);
        assert_eq!(index.count, 3);
        assert_eq!(index.min, vec![0.0]);
        assert_eq!(index.max, vec![2.0]);
    }

    #[test]
    fn test_root_rotation_is_dropped() {
        let mut graph = compose(vec![triangle(0.0)]);
        graph.normalize(10.0).unwrap();
        let plain = export_document(&graph).unwrap();

        graph.set_orientation(DQuat::from_rotation_y(1.2));
        let rotated = export_document(&graph).unwrap();

        assert_eq!(rotated.nodes[0].rotation, None);
        assert_eq!(rotated, plain);
        assert!(plain.nodes[0].scale.is_some());
    }

    #[test]
    fn test_bad_mesh_is_rejected() {
        let mut bad = triangle(0.0);
        bad.indices.push([0, 1, 7]);
        let err = export_document(&compose(vec![triangle(0.0), bad])).unwrap_err();
        match err {
            Error::Export { mesh_index, reason } => {
                assert_eq!(mesh_index, 1);
                assert!(reason.contains("vertex 7"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_empty_mesh_is_rejected() {
        let mut empty = triangle(0.0);
        empty.indices.clear();
        match export_document(&compose(vec![triangle(0.0), empty])).unwrap_err() {
            Error::Export { mesh_index, reason } => {
                assert_eq!(mesh_index, 1);
                assert!(reason.contains("no triangles"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_empty_scene_is_rejected() {
        assert!(matches!(
            export_document(&compose(Vec::new())),
            Err(Error::Export { .. })
        ));
    }

    #[test]
    fn test_normal_count_mismatch_is_rejected() {
        let mut bad = triangle(0.0);
        bad.normals.pop();
        assert!(matches!(
            export_document(&compose(vec![bad])),
            Err(Error::Export { mesh_index: 0, .. })
        ));
    }
}
