//! glTF 2.0 document model and its JSON / GLB encodings.
//!
//! The document is a flat, index-based rendition of a scene graph. It owns
//! its binary payload and does not borrow from the scene it came from.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const GLTF_VERSION: &str = "2.0";
pub const GENERATOR: &str = concat!("svg-extrude ", env!("CARGO_PKG_VERSION"));

pub const COMPONENT_FLOAT: u32 = 5126;
pub const COMPONENT_UNSIGNED_INT: u32 = 5125;
pub const TARGET_ARRAY_BUFFER: u32 = 34962;
pub const TARGET_ELEMENT_ARRAY_BUFFER: u32 = 34963;
pub const MODE_TRIANGLES: u32 = 4;

const DATA_URI_PREFIX: &str = "data:application/octet-stream;base64,";

const GLB_MAGIC: u32 = 0x4654_6C67;
const GLB_VERSION: u32 = 2;
const GLB_HEADER_LEN: usize = 12;
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub asset: Asset,
    pub scene: usize,
    pub scenes: Vec<Scene>,
    pub nodes: Vec<Node>,
    pub meshes: Vec<MeshEntry>,
    pub materials: Vec<MaterialEntry>,
    pub accessors: Vec<Accessor>,
    pub buffer_views: Vec<BufferView>,
    pub buffers: Vec<Buffer>,
    /// Bytes of buffer 0
    #[serde(skip)]
    pub binary: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
}

impl Default for Asset {
    fn default() -> Self {
        Self {
            version: GLTF_VERSION.to_string(),
            generator: Some(GENERATOR.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub nodes: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Node {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<[f64; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<[f64; 3]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub primitives: Vec<Primitive>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Primitive {
    pub attributes: Attributes,
    pub indices: usize,
    pub material: usize,
    pub mode: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct Attributes {
    pub position: usize,
    pub normal: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub pbr_metallic_roughness: PbrMetallicRoughness,
    pub double_sided: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PbrMetallicRoughness {
    pub base_color_factor: [f32; 4],
    pub metallic_factor: f32,
    pub roughness_factor: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccessorType {
    Scalar,
    Vec3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessor {
    pub buffer_view: usize,
    pub component_type: u32,
    pub count: usize,
    #[serde(rename = "type")]
    pub kind: AccessorType,
    pub min: Vec<f64>,
    pub max: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferView {
    pub buffer: usize,
    pub byte_offset: usize,
    pub byte_length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buffer {
    pub byte_length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

impl Buffer {
    /// Buffer whose bytes are inlined as a base64 data URI
    pub fn embedded(bytes: &[u8]) -> Self {
        Self {
            byte_length: bytes.len(),
            uri: Some(format!("{}{}", DATA_URI_PREFIX, STANDARD.encode(bytes))),
        }
    }

    /// Decode an embedded data URI.
    pub fn decode_uri(&self) -> Option<Vec<u8>> {
        let data = self.uri.as_deref()?.strip_prefix(DATA_URI_PREFIX)?;
        STANDARD.decode(data).ok()
    }
}

impl Document {
    /// Pretty-printed glTF JSON with the buffer embedded.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| Error::Export {
            mesh_index: 0,
            reason: format!("failed to serialize document: {}", e),
        })
    }

    /// Parse a glTF JSON document, decoding its embedded buffer.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        let mut doc: Document =
            serde_json::from_slice(bytes).map_err(|e| Error::source_load("glTF document", e))?;
        doc.binary = doc
            .buffers
            .first()
            .and_then(Buffer::decode_uri)
            .unwrap_or_default();
        Ok(doc)
    }

    /// Binary glTF container: header, JSON chunk, BIN chunk.
    pub fn to_glb(&self) -> Result<Vec<u8>> {
        let mut header_doc = self.clone();
        for buffer in &mut header_doc.buffers {
            buffer.uri = None;
        }
        let mut json = serde_json::to_vec(&header_doc).map_err(|e| Error::Export {
            mesh_index: 0,
            reason: format!("failed to serialize document: {}", e),
        })?;
        pad_to_four(&mut json, b' ');

        let mut bin = self.binary.clone();
        pad_to_four(&mut bin, 0);

        let has_bin = !bin.is_empty();
        let total = GLB_HEADER_LEN + 8 + json.len() + if has_bin { 8 + bin.len() } else { 0 };
        let total_u32 = u32::try_from(total).map_err(|_| Error::Export {
            mesh_index: 0,
            reason: format!("document of {} bytes is too large for GLB", total),
        })?;

        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
        out.extend_from_slice(&GLB_VERSION.to_le_bytes());
        out.extend_from_slice(&total_u32.to_le_bytes());
        write_chunk(&mut out, CHUNK_JSON, &json);
        if has_bin {
            write_chunk(&mut out, CHUNK_BIN, &bin);
        }
        Ok(out)
    }

    /// Vertex count summed over every mesh's position accessor.
    pub fn vertex_count(&self) -> usize {
        self.meshes
            .iter()
            .flat_map(|m| &m.primitives)
            .filter_map(|p| self.accessors.get(p.attributes.position))
            .map(|a| a.count)
            .sum()
    }
}

fn pad_to_four(bytes: &mut Vec<u8>, fill: u8) {
    while bytes.len() % 4 != 0 {
        bytes.push(fill);
    }
}

// Chunk lengths are bounded by the total checked in `to_glb`.
fn write_chunk(out: &mut Vec<u8>, kind: u32, data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(&kind.to_le_bytes());
    out.extend_from_slice(data);
}
