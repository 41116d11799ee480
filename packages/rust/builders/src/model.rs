//! Model builder: Wavefront OBJ to an indexed triangle list.
//!
//! Artifact layout: `vertex_bytes: u32, index_bytes: u32`, then
//! interleaved [`Vertex`] data, then `u32` indices, all little-endian.

use std::collections::HashMap;
use std::path::Path;

use joybuild_shared::{AssetKind, BuildRequest};
use tracing::debug;

use crate::registry::{AssetBuilder, BuildFailure, BuildOutcome};
use crate::{push_u32, section_len};

/// Interleaved vertex: position, normal, texture coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    /// Size in bytes of one vertex in the artifact.
    pub const STRIDE: usize = 8 * 4;

    fn write(&self, out: &mut Vec<u8>) {
        for c in self.position.iter().chain(&self.normal).chain(&self.uv) {
            out.extend_from_slice(&c.to_le_bytes());
        }
    }
}

/// Normal source of a face corner, part of the de-duplication key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum NormalKey {
    Index(usize),
    /// Corner without `vn`; carries the bits of the face normal.
    Flat([u32; 3]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CornerKey {
    position: usize,
    uv: Option<usize>,
    normal: NormalKey,
}

/// Parsed mesh plus the material libraries it references.
#[derive(Debug, Default)]
pub(crate) struct ObjMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub material_libs: Vec<String>,
}

impl ObjMesh {
    pub fn parse(text: &str) -> Result<Self, BuildFailure> {
        let mut positions: Vec<[f32; 3]> = Vec::new();
        let mut normals: Vec<[f32; 3]> = Vec::new();
        let mut uvs: Vec<[f32; 2]> = Vec::new();
        let mut corners: HashMap<CornerKey, u32> = HashMap::new();
        let mut mesh = Self::default();

        for (index, line) in text.lines().enumerate() {
            let line_no = index + 1;
            let mut parts = line.split_whitespace();
            let Some(keyword) = parts.next() else {
                continue;
            };

            match keyword {
                "v" => positions.push(parse_floats(parts, line_no)?),
                "vn" => normals.push(parse_floats(parts, line_no)?),
                "vt" => {
                    let [u, v] = parse_texcoord(parts, line_no)?;
                    // Stored with a top-left origin
                    uvs.push([u, 1.0 - v]);
                }
                "f" => {
                    let refs = parts
                        .map(|p| parse_corner(p, &positions, &uvs, &normals, line_no))
                        .collect::<Result<Vec<_>, _>>()?;
                    if refs.len() < 3 {
                        return Err(BuildFailure::malformed(line_no, "face needs at least 3 vertices"));
                    }

                    let flat = face_normal(
                        positions[refs[0].0],
                        positions[refs[1].0],
                        positions[refs[2].0],
                    );
                    let mut face = Vec::with_capacity(refs.len());
                    for (position, uv, normal) in refs {
                        let key = CornerKey {
                            position,
                            uv,
                            normal: normal.map_or(NormalKey::Flat(flat.map(f32::to_bits)), NormalKey::Index),
                        };
                        let next = section_len(mesh.vertices.len(), "vertex count")?;
                        let id = *corners.entry(key).or_insert_with(|| {
                            mesh.vertices.push(Vertex {
                                position: positions[position],
                                normal: normal.map_or(flat, |n| normals[n]),
                                uv: uv.map_or([0.0, 0.0], |t| uvs[t]),
                            });
                            next
                        });
                        face.push(id);
                    }

                    // Fan triangulation
                    for i in 1..face.len() - 1 {
                        mesh.indices.extend_from_slice(&[face[0], face[i], face[i + 1]]);
                    }
                }
                "mtllib" => mesh.material_libs.extend(parts.map(String::from)),
                _ => {}
            }
        }

        if mesh.indices.is_empty() {
            return Err(BuildFailure::Decode("model has no faces".into()));
        }
        Ok(mesh)
    }

    pub fn encode(&self) -> Result<Vec<u8>, BuildFailure> {
        let vertex_bytes = self.vertices.len() * Vertex::STRIDE;
        let index_bytes = self.indices.len() * 4;

        let mut out = Vec::with_capacity(8 + vertex_bytes + index_bytes);
        push_u32(&mut out, section_len(vertex_bytes, "vertex data")?);
        push_u32(&mut out, section_len(index_bytes, "index data")?);
        for vertex in &self.vertices {
            vertex.write(&mut out);
        }
        for index in &self.indices {
            push_u32(&mut out, *index);
        }
        Ok(out)
    }
}

fn parse_floats<'a, const N: usize>(
    parts: impl Iterator<Item = &'a str>,
    line: usize,
) -> Result<[f32; N], BuildFailure> {
    let mut out = [0.0; N];
    let mut parts = parts;
    for slot in &mut out {
        let token = parts
            .next()
            .ok_or_else(|| BuildFailure::malformed(line, format!("expected {N} numbers")))?;
        *slot = token
            .parse()
            .map_err(|_| BuildFailure::malformed(line, format!("invalid number '{token}'")))?;
    }
    Ok(out)
}

/// `vt u [v [w]]`: only `u` is required, `v` defaults to 0 and `w` is ignored.
fn parse_texcoord<'a>(
    mut parts: impl Iterator<Item = &'a str>,
    line: usize,
) -> Result<[f32; 2], BuildFailure> {
    let u: [f32; 1] = parse_floats(&mut parts, line)?;
    let v = match parts.next() {
        Some(token) => token
            .parse()
            .map_err(|_| BuildFailure::malformed(line, format!("invalid number '{token}'")))?,
        None => 0.0,
    };
    Ok([u[0], v])
}

/// Resolve a 1-based (or negative, relative) OBJ index against `len` items.
fn resolve_index(token: &str, len: usize, what: &str, line: usize) -> Result<usize, BuildFailure> {
    let raw: i64 = token
        .parse()
        .map_err(|_| BuildFailure::malformed(line, format!("invalid {what} index '{token}'")))?;
    let resolved = match raw {
        0 => None,
        r if r > 0 => usize::try_from(r - 1).ok(),
        r => usize::try_from(r.unsigned_abs()).ok().and_then(|back| len.checked_sub(back)),
    };
    resolved
        .filter(|i| *i < len)
        .ok_or_else(|| BuildFailure::malformed(line, format!("{what} index {raw} out of range")))
}

/// Parse `v`, `v/vt`, `v//vn` or `v/vt/vn`.
fn parse_corner(
    token: &str,
    positions: &[[f32; 3]],
    uvs: &[[f32; 2]],
    normals: &[[f32; 3]],
    line: usize,
) -> Result<(usize, Option<usize>, Option<usize>), BuildFailure> {
    let mut fields = token.split('/');
    let position = resolve_index(fields.next().unwrap_or(""), positions.len(), "position", line)?;
    let uv = match fields.next() {
        Some(t) if !t.is_empty() => Some(resolve_index(t, uvs.len(), "texcoord", line)?),
        _ => None,
    };
    let normal = match fields.next() {
        Some(t) if !t.is_empty() => Some(resolve_index(t, normals.len(), "normal", line)?),
        _ => None,
    };
    Ok((position, uv, normal))
}

fn face_normal(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> [f32; 3] {
    let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    let n = [
        u[1] * v[2] - u[2] * v[1],
        u[2] * v[0] - u[0] * v[2],
        u[0] * v[1] - u[1] * v[0],
    ];
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if len > f32::EPSILON {
        [n[0] / len, n[1] / len, n[2] / len]
    } else {
        [0.0, 1.0, 0.0]
    }
}

/// Native OBJ model builder.
#[derive(Debug, Default)]
pub struct ModelBuilder {
    built: usize,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `mtllib` must exist under the materials root. Without a
    /// materials root, libraries are looked up beside the model.
    fn check_material_libs(mesh: &ObjMesh, request: &BuildRequest<'_>) -> BuildOutcome {
        let root = request
            .materials_root
            .or_else(|| request.source.parent())
            .unwrap_or(Path::new("."));

        for lib in &mesh.material_libs {
            let candidate = root.join(lib);
            let exists = candidate
                .try_exists()
                .map_err(|e| BuildFailure::io(&candidate, e))?;
            if !exists {
                return Err(BuildFailure::MissingReference {
                    reference: lib.clone(),
                    location: root.display().to_string(),
                });
            }
        }
        Ok(())
    }
}

impl AssetBuilder for ModelBuilder {
    fn name(&self) -> &str {
        "model"
    }

    fn kind(&self) -> AssetKind {
        AssetKind::Model
    }

    fn initialize(&mut self) -> joybuild_shared::Result<()> {
        self.built = 0;
        Ok(())
    }

    fn terminate(&mut self) {
        debug!(built = self.built, "model builder terminated");
    }

    fn build(&mut self, request: &BuildRequest<'_>) -> BuildOutcome {
        let bytes = std::fs::read(request.source).map_err(|e| BuildFailure::io(request.source, e))?;
        let text = String::from_utf8_lossy(&bytes);

        let mesh = ObjMesh::parse(&text)?;
        Self::check_material_libs(&mesh, request)?;

        let output = request.artifact_path();
        std::fs::write(&output, mesh.encode()?).map_err(|e| BuildFailure::io(&output, e))?;

        debug!(
            path = %request.source.display(),
            vertices = mesh.vertices.len(),
            triangles = mesh.indices.len() / 3,
            "model written"
        );
        self.built += 1;
        Ok(())
    }
}
