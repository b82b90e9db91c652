//! STL reader and writers.
//!
//! Binary layout: 80-byte header, little-endian `u32` triangle count, then
//! 50 bytes per triangle (normal + three vertices as `f32` triples and a
//! `u16` attribute count). ASCII files are detected by a leading `solid`
//! together with a `facet` keyword, since some binary exporters also start
//! their header with `solid`.

use std::collections::HashMap;
use std::fmt::Write as _;

use bytes::{BufMut, Bytes, BytesMut};

use meshforge_entity::Mesh;

use super::CodecError;

const HEADER_LEN: usize = 80;
const TRIANGLE_LEN: usize = 50;
const HEADER_TEXT: &[u8] = b"meshforge binary STL";

/// Encode as binary STL.
pub fn encode_binary(mesh: &Mesh) -> Result<Bytes, CodecError> {
    let count = u32::try_from(mesh.triangles.len())
        .map_err(|_| CodecError::unencodable("stl", "more than u32::MAX triangles"))?;

    let mut buf = BytesMut::with_capacity(HEADER_LEN + 4 + mesh.triangles.len() * TRIANGLE_LEN);
    let mut header = [0u8; HEADER_LEN];
    header[..HEADER_TEXT.len()].copy_from_slice(HEADER_TEXT);
    buf.put_slice(&header);
    buf.put_u32_le(count);

    for &tri in &mesh.triangles {
        let normal = mesh.face_normal(tri);
        put_vec3(&mut buf, normal);
        for index in tri {
            put_vec3(&mut buf, mesh.vertices[index]);
        }
        buf.put_u16_le(0);
    }

    Ok(buf.freeze())
}

fn put_vec3(buf: &mut BytesMut, v: [f64; 3]) {
    for c in v {
        buf.put_f32_le(c as f32);
    }
}

/// Encode as ASCII STL.
pub fn encode_ascii(mesh: &Mesh) -> Result<Bytes, CodecError> {
    let mut out = String::with_capacity(64 + mesh.triangles.len() * 256);
    out.push_str("solid meshforge\n");
    for &tri in &mesh.triangles {
        let n = mesh.face_normal(tri);
        let _ = writeln!(out, "  facet normal {:e} {:e} {:e}", n[0], n[1], n[2]);
        out.push_str("    outer loop\n");
        for index in tri {
            let v = mesh.vertices[index];
            let _ = writeln!(out, "      vertex {:e} {:e} {:e}", v[0], v[1], v[2]);
        }
        out.push_str("    endloop\n");
        out.push_str("  endfacet\n");
    }
    out.push_str("endsolid meshforge\n");
    Ok(Bytes::from(out))
}

/// Decode ASCII or binary STL, welding identical vertices.
pub fn decode(data: &[u8]) -> Result<Mesh, CodecError> {
    if is_ascii(data) {
        decode_ascii(data)
    } else {
        decode_binary(data)
    }
}

fn is_ascii(data: &[u8]) -> bool {
    let head = &data[..data.len().min(1024)];
    let Ok(text) = std::str::from_utf8(head) else {
        return false;
    };
    text.trim_start().starts_with("solid") && text.contains("facet")
}

fn decode_binary(data: &[u8]) -> Result<Mesh, CodecError> {
    if data.len() < HEADER_LEN + 4 {
        return Err(CodecError::malformed(
            "stl",
            format!("{} bytes is shorter than the binary header", data.len()),
        ));
    }
    let mut count_bytes = [0u8; 4];
    count_bytes.copy_from_slice(&data[HEADER_LEN..HEADER_LEN + 4]);
    let count = u32::from_le_bytes(count_bytes) as usize;

    let expected = count
        .checked_mul(TRIANGLE_LEN)
        .and_then(|body| body.checked_add(HEADER_LEN + 4))
        .ok_or_else(|| CodecError::malformed("stl", "triangle count overflows"))?;
    if data.len() < expected {
        return Err(CodecError::malformed(
            "stl",
            format!(
                "header declares {count} triangles ({expected} bytes) but payload is {} bytes",
                data.len()
            ),
        ));
    }

    let mut welder = Welder::default();
    let body = &data[HEADER_LEN + 4..expected];
    for record in body.chunks_exact(TRIANGLE_LEN) {
        // Skip the stored normal; it is recomputed from winding on encode.
        let mut tri = [0usize; 3];
        for (corner, slot) in tri.iter_mut().enumerate() {
            let offset = 12 + corner * 12;
            *slot = welder.index(read_vec3(&record[offset..offset + 12]));
        }
        welder.triangles.push(tri);
    }

    Ok(welder.finish())
}

fn read_vec3(bytes: &[u8]) -> [f64; 3] {
    let mut v = [0.0; 3];
    for (axis, chunk) in bytes.chunks_exact(4).enumerate().take(3) {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(chunk);
        v[axis] = f64::from(f32::from_le_bytes(raw));
    }
    v
}

fn decode_ascii(data: &[u8]) -> Result<Mesh, CodecError> {
    let text = std::str::from_utf8(data)
        .map_err(|e| CodecError::malformed("stl", format!("invalid UTF-8: {e}")))?;

    let mut welder = Welder::default();
    let mut corners: Vec<usize> = Vec::with_capacity(3);

    for (line_no, line) in text.lines().enumerate() {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("vertex") => {
                let v = parse_coords(&mut parts).ok_or_else(|| {
                    CodecError::malformed("stl", format!("bad vertex on line {}", line_no + 1))
                })?;
                corners.push(welder.index(v));
            }
            Some("endloop") => {
                if corners.len() != 3 {
                    return Err(CodecError::malformed(
                        "stl",
                        format!(
                            "facet ending on line {} has {} vertices",
                            line_no + 1,
                            corners.len()
                        ),
                    ));
                }
                welder.triangles.push([corners[0], corners[1], corners[2]]);
                corners.clear();
            }
            _ => {}
        }
    }

    if !corners.is_empty() {
        return Err(CodecError::malformed("stl", "unterminated facet"));
    }

    Ok(welder.finish())
}

fn parse_coords<'a>(parts: &mut impl Iterator<Item = &'a str>) -> Option<[f64; 3]> {
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    let z = parts.next()?.parse().ok()?;
    Some([x, y, z])
}

/// Merges bit-identical positions so STL triangle soup becomes indexed.
#[derive(Default)]
struct Welder {
    lookup: HashMap<[u64; 3], usize>,
    vertices: Vec<[f64; 3]>,
    triangles: Vec<[usize; 3]>,
}

impl Welder {
    fn index(&mut self, v: [f64; 3]) -> usize {
        let key = v.map(f64::to_bits);
        *self.lookup.entry(key).or_insert_with(|| {
            self.vertices.push(v);
            self.vertices.len() - 1
        })
    }

    fn finish(self) -> Mesh {
        Mesh {
            vertices: self.vertices,
            normals: Vec::new(),
            triangles: self.triangles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_layout() {
        let cube = Mesh::unit_cube();
        let bytes = encode_binary(&cube).unwrap();
        assert_eq!(bytes.len(), HEADER_LEN + 4 + 12 * TRIANGLE_LEN);
        assert_eq!(&bytes[..HEADER_TEXT.len()], HEADER_TEXT);
        assert_eq!(u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]), 12);
    }

    #[test]
    fn test_binary_decode_welds_vertices() {
        let bytes = encode_binary(&Mesh::unit_cube()).unwrap();
        let mesh = decode(&bytes).unwrap();
        assert_eq!(mesh.triangle_count(), 12);
        assert_eq!(mesh.vertices.len(), 8);
        mesh.validate().unwrap();
    }

    #[test]
    fn test_ascii_decode() {
        let text = encode_ascii(&Mesh::unit_cube()).unwrap();
        assert!(text.starts_with(b"solid meshforge"));
        let mesh = decode(&text).unwrap();
        assert_eq!(mesh.triangle_count(), 12);
        assert_eq!(mesh.vertices.len(), 8);
    }

    #[test]
    fn test_binary_header_starting_with_solid_is_binary() {
        let mut bytes = encode_binary(&Mesh::unit_cube()).unwrap().to_vec();
        bytes[..5].copy_from_slice(b"solid");
        let mesh = decode(&bytes).unwrap();
        assert_eq!(mesh.triangle_count(), 12);
    }

    #[test]
    fn test_truncated_binary_rejected() {
        let bytes = encode_binary(&Mesh::unit_cube()).unwrap();
        let err = decode(&bytes[..bytes.len() - 10]).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { format: "stl", .. }));

        assert!(decode(b"garbage").is_err());
    }

    #[test]
    fn test_ascii_bad_vertex_rejected() {
        let text = b"solid x\nfacet normal 0 0 1\nouter loop\nvertex 0 0\nendloop\nendfacet\n";
        assert!(matches!(
            decode(text),
            Err(CodecError::Malformed { .. })
        ));
    }
}
