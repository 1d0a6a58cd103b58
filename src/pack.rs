use std::ops::Range;

use crate::diag::{Diagnostic, Diagnostics};
use crate::format::FormatDescriptor;
use crate::mesh::{LayerSource, MeshError, MeshWorkItem, TriangleVertex};

/// Packed bytes are moved to the completed list once the in-progress
/// buffer grows past this size.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 64 * 1024;

/// Written for every vertex of a mesh without a color layer.
pub const DEFAULT_COLOR: [u8; 4] = [0xff, 0xff, 0xff, 0xff];
/// Written for every vertex of a mesh without a UV layer.
pub const DEFAULT_TEXCOORD: [f32; 2] = [0.0, 0.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PackSettings {
    /// Does not affect the output, only peak buffer size.
    pub flush_threshold: usize,
}

impl Default for PackSettings {
    fn default() -> Self {
        Self {
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error(transparent)]
    Mesh(#[from] MeshError),
    #[error("Mesh {0:?} pushes the vertex count past the u32 range")]
    TooManyVertices(String),
}

/// Convert an RGB color in `[0, 1]` to bytes, truncating.
///
/// Alpha is always 255. Out of range input is not corrected.
pub fn pack_color(rgb: [f32; 3]) -> [u8; 4] {
    [
        (rgb[0] * 255.0) as u8,
        (rgb[1] * 255.0) as u8,
        (rgb[2] * 255.0) as u8,
        0xff,
    ]
}

fn push_f32s(out: &mut Vec<u8>, values: &[f32]) {
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

/// Append one vertex: position, normal, color, texcoord, skipping
/// attributes the format does not have.
pub fn push_vertex(out: &mut Vec<u8>, format: &FormatDescriptor, v: &TriangleVertex) {
    use crate::format::Attribute::*;
    if format.has(Position) {
        push_f32s(out, &v.position);
    }
    if format.has(Normal) {
        push_f32s(out, &v.normal.unwrap_or_default());
    }
    if format.has(Color) {
        let color = v.color.map(pack_color).unwrap_or(DEFAULT_COLOR);
        out.extend_from_slice(&color);
    }
    if format.has(Texcoord) {
        push_f32s(out, &v.texcoord.unwrap_or(DEFAULT_TEXCOORD));
    }
}

/// Raw vertex stream of a whole export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackedVertices {
    pub bytes: Vec<u8>,
    pub n_vertices: u32,
}

/// Packs meshes one after the other into a single vertex stream.
pub struct VertexPacker {
    format: FormatDescriptor,
    settings: PackSettings,
    completed: Vec<Vec<u8>>,
    current: Vec<u8>,
    n_vertices: u32,
}

impl VertexPacker {
    pub fn new(format: FormatDescriptor) -> Self {
        Self::new_with_settings(format, Default::default())
    }

    pub fn new_with_settings(format: FormatDescriptor, settings: PackSettings) -> Self {
        Self {
            format,
            settings,
            completed: vec![],
            current: vec![],
            n_vertices: 0,
        }
    }

    pub fn format(&self) -> &FormatDescriptor {
        &self.format
    }

    pub fn n_vertices(&self) -> u32 {
        self.n_vertices
    }

    /// Append all triangles of a mesh. Returns its range in the vertex
    /// stream.
    ///
    /// The mesh is validated before anything is appended, so on error the
    /// stream is left as it was.
    pub fn pack_mesh(
        &mut self,
        item: &MeshWorkItem<'_>,
        diagnostics: &mut Diagnostics,
    ) -> Result<Range<u32>, PackError> {
        use crate::format::Attribute::*;

        let mut colors = None;
        if self.format.has(Color) {
            let mesh = item.name.to_owned();
            colors = match item.color_source() {
                LayerSource::Missing => {
                    diagnostics.push(Diagnostic::MissingColors { mesh });
                    None
                }
                LayerSource::Layer { layer, n_layers } => {
                    if n_layers > 1 {
                        diagnostics.push(Diagnostic::MultipleColorLayers {
                            mesh,
                            exported: layer.name.clone(),
                        });
                    }
                    Some(layer)
                }
            };
        }
        let mut uvs = None;
        if self.format.has(Texcoord) {
            let mesh = item.name.to_owned();
            uvs = match item.uv_source() {
                LayerSource::Missing => {
                    diagnostics.push(Diagnostic::MissingUvs { mesh });
                    None
                }
                LayerSource::Layer { layer, n_layers } => {
                    if n_layers > 1 {
                        diagnostics.push(Diagnostic::MultipleUvLayers {
                            mesh,
                            exported: layer.name.clone(),
                        });
                    }
                    Some(layer)
                }
            };
        }
        item.validate(colors, uvs, self.format.has(Normal))?;

        let begin = self.n_vertices;
        let end = u32::try_from(item.n_vertices())
            .ok()
            .and_then(|n| begin.checked_add(n))
            .ok_or_else(|| PackError::TooManyVertices(item.name.to_owned()))?;

        tracing::info!("Writing {:?} (via {:?})...", item.name, item.via_object);
        for v in item.triangle_vertices(colors, uvs) {
            push_vertex(&mut self.current, &self.format, &v);
            if self.current.len() > self.settings.flush_threshold {
                self.flush();
            }
        }
        self.n_vertices = end;
        Ok(begin..end)
    }

    fn flush(&mut self) {
        let full = std::mem::take(&mut self.current);
        self.completed.push(full);
    }

    pub fn finish(mut self) -> PackedVertices {
        self.flush();
        PackedVertices {
            bytes: self.completed.concat(),
            n_vertices: self.n_vertices,
        }
    }
}
