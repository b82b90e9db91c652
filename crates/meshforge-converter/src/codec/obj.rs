//! Wavefront OBJ reader and writer.
//!
//! Only geometry is handled: `v`, `vn` and `f` records. Texture
//! coordinates, groups and materials are ignored on read and never written.

use std::fmt::Write as _;

use bytes::Bytes;

use meshforge_entity::Mesh;

use super::CodecError;

/// Encode as OBJ. Faces reference normals (`a//a`) when the mesh has them.
pub fn encode(mesh: &Mesh) -> Result<Bytes, CodecError> {
    let mut out = String::with_capacity(32 + mesh.vertices.len() * 48 + mesh.triangles.len() * 24);
    out.push_str("# meshforge\n");
    out.push_str("o mesh\n");

    for v in &mesh.vertices {
        let _ = writeln!(out, "v {} {} {}", v[0], v[1], v[2]);
    }

    let with_normals = mesh.has_normals() && mesh.normals.len() == mesh.vertices.len();
    if with_normals {
        for n in &mesh.normals {
            let _ = writeln!(out, "vn {} {} {}", n[0], n[1], n[2]);
        }
    }

    for tri in &mesh.triangles {
        let [a, b, c] = tri.map(|i| i + 1);
        if with_normals {
            let _ = writeln!(out, "f {a}//{a} {b}//{b} {c}//{c}");
        } else {
            let _ = writeln!(out, "f {a} {b} {c}");
        }
    }

    Ok(Bytes::from(out))
}

/// Decode OBJ, fan-triangulating polygons and resolving negative indices.
///
/// Normals are kept only when there is exactly one per vertex.
pub fn decode(data: &[u8]) -> Result<Mesh, CodecError> {
    let text = std::str::from_utf8(data)
        .map_err(|e| CodecError::malformed("obj", format!("invalid UTF-8: {e}")))?;

    let mut vertices: Vec<[f64; 3]> = Vec::new();
    let mut normals: Vec<[f64; 3]> = Vec::new();
    let mut triangles: Vec<[usize; 3]> = Vec::new();

    for (line_no, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or_default();
        let mut parts = line.split_whitespace();
        let line_no = line_no + 1;

        match parts.next() {
            Some("v") => vertices.push(parse_vec3(&mut parts, line_no)?),
            Some("vn") => normals.push(parse_vec3(&mut parts, line_no)?),
            Some("f") => {
                let corners = parts
                    .map(|token| resolve_index(token, vertices.len(), line_no))
                    .collect::<Result<Vec<_>, _>>()?;
                if corners.len() < 3 {
                    return Err(CodecError::malformed(
                        "obj",
                        format!("face on line {line_no} has {} corners", corners.len()),
                    ));
                }
                for pair in corners[1..].windows(2) {
                    triangles.push([corners[0], pair[0], pair[1]]);
                }
            }
            _ => {}
        }
    }

    if normals.len() != vertices.len() {
        normals.clear();
    }

    Ok(Mesh {
        vertices,
        normals,
        triangles,
    })
}

fn parse_vec3<'a>(
    parts: &mut impl Iterator<Item = &'a str>,
    line_no: usize,
) -> Result<[f64; 3], CodecError> {
    let mut v = [0.0; 3];
    for slot in &mut v {
        *slot = parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| CodecError::malformed("obj", format!("bad coordinate on line {line_no}")))?;
    }
    Ok(v)
}

/// Resolve the vertex part of a `v`, `v/vt`, `v//vn` or `v/vt/vn` token.
fn resolve_index(token: &str, vertex_count: usize, line_no: usize) -> Result<usize, CodecError> {
    let head = token.split('/').next().unwrap_or_default();
    let raw: i64 = head.parse().map_err(|_| {
        CodecError::malformed("obj", format!("bad face index '{token}' on line {line_no}"))
    })?;

    let resolved = if raw > 0 {
        raw - 1
    } else if raw < 0 {
        vertex_count as i64 + raw
    } else {
        -1
    };

    if resolved < 0 || resolved as usize >= vertex_count {
        return Err(CodecError::malformed(
            "obj",
            format!("face index {raw} on line {line_no} is out of range"),
        ));
    }
    Ok(resolved as usize)
}
