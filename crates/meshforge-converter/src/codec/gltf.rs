//! glTF 2.0 writers.
//!
//! One mesh, one primitive, one node. The buffer holds `f32` positions,
//! optional `f32` normals, then `u32` indices; every section is a multiple
//! of four bytes so no view padding is needed. `.gltf` embeds the buffer as
//! a base64 data URI, `.glb` carries it in the BIN chunk.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::{BufMut, Bytes, BytesMut};
use serde_json::{Value, json};

use meshforge_entity::Mesh;

use super::CodecError;

const GLB_MAGIC: u32 = 0x4654_6C67;
const GLB_VERSION: u32 = 2;
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;

const ARRAY_BUFFER: u32 = 34962;
const ELEMENT_ARRAY_BUFFER: u32 = 34963;
const FLOAT: u32 = 5126;
const UNSIGNED_INT: u32 = 5125;
const MODE_TRIANGLES: u32 = 4;

/// Encode as a self-contained `.gltf` JSON document.
pub fn encode_gltf(mesh: &Mesh) -> Result<Bytes, CodecError> {
    let buffer = build_buffer(mesh, "gltf")?;
    let uri = format!(
        "data:application/octet-stream;base64,{}",
        BASE64.encode(&buffer.data)
    );
    let doc = document(mesh, &buffer, Some(uri));
    let json = serde_json::to_vec(&doc)
        .map_err(|e| CodecError::unencodable("gltf", e.to_string()))?;
    Ok(Bytes::from(json))
}

/// Encode as a binary `.glb` container.
pub fn encode_glb(mesh: &Mesh) -> Result<Bytes, CodecError> {
    let buffer = build_buffer(mesh, "glb")?;
    let doc = document(mesh, &buffer, None);
    let mut json =
        serde_json::to_vec(&doc).map_err(|e| CodecError::unencodable("glb", e.to_string()))?;
    pad_to_four(&mut json, b' ');

    let mut bin = buffer.data;
    pad_to_four(&mut bin, 0);

    let total = 12 + 8 + json.len() + 8 + bin.len();
    let total = u32::try_from(total)
        .map_err(|_| CodecError::unencodable("glb", "container exceeds 4 GiB"))?;

    let mut out = BytesMut::with_capacity(total as usize);
    out.put_u32_le(GLB_MAGIC);
    out.put_u32_le(GLB_VERSION);
    out.put_u32_le(total);
    out.put_u32_le(json.len() as u32);
    out.put_u32_le(CHUNK_JSON);
    out.put_slice(&json);
    out.put_u32_le(bin.len() as u32);
    out.put_u32_le(CHUNK_BIN);
    out.put_slice(&bin);

    Ok(out.freeze())
}

struct Buffer {
    data: Vec<u8>,
    positions_len: usize,
    normals_len: usize,
    indices_len: usize,
}

fn build_buffer(mesh: &Mesh, format: &'static str) -> Result<Buffer, CodecError> {
    let with_normals = mesh.has_normals() && mesh.normals.len() == mesh.vertices.len();

    let positions_len = mesh.vertices.len() * 12;
    let normals_len = if with_normals { positions_len } else { 0 };
    let indices_len = mesh.triangles.len() * 12;

    let mut data = Vec::with_capacity(positions_len + normals_len + indices_len);
    for v in &mesh.vertices {
        for c in v {
            data.extend_from_slice(&(*c as f32).to_le_bytes());
        }
    }
    if with_normals {
        for n in &mesh.normals {
            for c in n {
                data.extend_from_slice(&(*c as f32).to_le_bytes());
            }
        }
    }
    for tri in &mesh.triangles {
        for &index in tri {
            let index = u32::try_from(index)
                .map_err(|_| CodecError::unencodable(format, "vertex index exceeds u32"))?;
            data.extend_from_slice(&index.to_le_bytes());
        }
    }

    Ok(Buffer {
        data,
        positions_len,
        normals_len,
        indices_len,
    })
}

fn document(mesh: &Mesh, buffer: &Buffer, uri: Option<String>) -> Value {
    let (min, max) = mesh.bounds().unwrap_or(([0.0; 3], [0.0; 3]));
    let vertex_count = mesh.vertices.len();

    let mut views = vec![json!({
        "buffer": 0,
        "byteOffset": 0,
        "byteLength": buffer.positions_len,
        "target": ARRAY_BUFFER,
    })];
    let mut accessors = vec![json!({
        "bufferView": 0,
        "componentType": FLOAT,
        "count": vertex_count,
        "type": "VEC3",
        "min": min.map(|c| c as f32),
        "max": max.map(|c| c as f32),
    })];
    let mut attributes = json!({ "POSITION": 0 });

    if buffer.normals_len > 0 {
        views.push(json!({
            "buffer": 0,
            "byteOffset": buffer.positions_len,
            "byteLength": buffer.normals_len,
            "target": ARRAY_BUFFER,
        }));
        accessors.push(json!({
            "bufferView": 1,
            "componentType": FLOAT,
            "count": vertex_count,
            "type": "VEC3",
        }));
        attributes["NORMAL"] = json!(1);
    }

    let index_view = views.len();
    views.push(json!({
        "buffer": 0,
        "byteOffset": buffer.positions_len + buffer.normals_len,
        "byteLength": buffer.indices_len,
        "target": ELEMENT_ARRAY_BUFFER,
    }));
    let index_accessor = accessors.len();
    accessors.push(json!({
        "bufferView": index_view,
        "componentType": UNSIGNED_INT,
        "count": mesh.triangles.len() * 3,
        "type": "SCALAR",
    }));

    let mut buffer_entry = json!({ "byteLength": buffer.data.len() });
    if let Some(uri) = uri {
        buffer_entry["uri"] = json!(uri);
    }

    json!({
        "asset": { "version": "2.0", "generator": "meshforge" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0 }],
        "meshes": [{
            "primitives": [{
                "attributes": attributes,
                "indices": index_accessor,
                "mode": MODE_TRIANGLES,
            }]
        }],
        "accessors": accessors,
        "bufferViews": views,
        "buffers": [buffer_entry],
    })
}

fn pad_to_four(data: &mut Vec<u8>, fill: u8) {
    while data.len() % 4 != 0 {
        data.push(fill);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_u32(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
    }

    #[test]
    fn test_gltf_document_shape() {
        let bytes = encode_gltf(&Mesh::unit_cube()).unwrap();
        let doc: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(doc["asset"]["version"], "2.0");
        assert_eq!(doc["accessors"][0]["count"], 8);
        assert_eq!(doc["accessors"][1]["count"], 36);
        assert_eq!(doc["buffers"][0]["byteLength"], 8 * 12 + 36 * 4);

        let uri = doc["buffers"][0]["uri"].as_str().unwrap();
        let payload = uri.strip_prefix("data:application/octet-stream;base64,").unwrap();
        assert_eq!(BASE64.decode(payload).unwrap().len(), 8 * 12 + 36 * 4);
    }

    #[test]
    fn test_gltf_includes_normals_when_present() {
        let mut cube = Mesh::unit_cube();
        cube.normals = cube.vertices.clone();
        let doc: Value = serde_json::from_slice(&encode_gltf(&cube).unwrap()).unwrap();
        assert_eq!(doc["meshes"][0]["primitives"][0]["attributes"]["NORMAL"], 1);
        assert_eq!(doc["meshes"][0]["primitives"][0]["indices"], 2);
        assert_eq!(doc["bufferViews"][2]["byteOffset"], 8 * 24);
    }

    #[test]
    fn test_glb_container() {
        let bytes = encode_glb(&Mesh::unit_cube()).unwrap();
        assert_eq!(read_u32(&bytes, 0), GLB_MAGIC);
        assert_eq!(read_u32(&bytes, 4), 2);
        assert_eq!(read_u32(&bytes, 8) as usize, bytes.len());

        let json_len = read_u32(&bytes, 12) as usize;
        assert_eq!(json_len % 4, 0);
        assert_eq!(read_u32(&bytes, 16), CHUNK_JSON);
        let doc: Value = serde_json::from_slice(&bytes[20..20 + json_len]).unwrap();
        assert!(doc["buffers"][0].get("uri").is_none());

        let bin_header = 20 + json_len;
        assert_eq!(read_u32(&bytes, bin_header + 4), CHUNK_BIN);
        assert_eq!(read_u32(&bytes, bin_header) as usize, 8 * 12 + 36 * 4);
    }
}
