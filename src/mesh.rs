use crate::scene::{ColorLayer, Layer, MeshData, MeshId, UvLayer, active_layer};

/// A unique mesh resource selected for export.
#[derive(Debug, Clone, Copy)]
pub struct MeshWorkItem<'s> {
    pub mesh: MeshId,
    /// Written verbatim to the string table. Not guaranteed to be unique.
    pub name: &'s str,
    /// The object through which the mesh was first reached
    pub via_object: &'s str,
    pub data: &'s MeshData,
}

/// Attributes of one triangle corner, as read from the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleVertex {
    pub position: [f32; 3],
    pub normal: Option<[f32; 3]>,
    pub color: Option<[f32; 3]>,
    pub texcoord: Option<[f32; 2]>,
}

#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    #[error("Mesh {mesh:?}: polygon {polygon} has {loops} loops; only triangles can be exported")]
    NotTriangle {
        mesh: String,
        polygon: usize,
        loops: usize,
    },
    #[error("Mesh {mesh:?}: loop index {index} out of range ({len} loops)")]
    LoopOutOfRange { mesh: String, index: u32, len: usize },
    #[error("Mesh {mesh:?}: vertex index {index} out of range ({len} vertices)")]
    VertexOutOfRange { mesh: String, index: u32, len: usize },
    #[error("Mesh {mesh:?}: {kind} layer {layer:?} has {len} entries, expected one per loop ({loops})")]
    LayerLength {
        mesh: String,
        kind: &'static str,
        layer: String,
        len: usize,
        loops: usize,
    },
    #[error("Mesh {mesh:?}: loop {index} has no normal")]
    MissingNormal { mesh: String, index: u32 },
}

/// Which layer of a kind will be read, decided once per mesh.
#[derive(Debug, Clone)]
pub enum LayerSource<'s, L> {
    /// No layer of this kind, defaults will be written
    Missing,
    Layer {
        layer: &'s L,
        /// Total number of layers of this kind on the mesh
        n_layers: usize,
    },
}

impl<'s, L: Layer> LayerSource<'s, L> {
    fn select(layers: &'s [L]) -> Self {
        match active_layer(layers) {
            Some(layer) => Self::Layer {
                layer,
                n_layers: layers.len(),
            },
            None => Self::Missing,
        }
    }

    pub fn layer(&self) -> Option<&'s L> {
        match self {
            Self::Missing => None,
            Self::Layer { layer, .. } => Some(*layer),
        }
    }
}

impl<'s> MeshWorkItem<'s> {
    pub fn n_triangles(&self) -> usize {
        self.data.polygons.len()
    }

    pub fn n_vertices(&self) -> usize {
        self.n_triangles() * 3
    }

    pub fn color_source(&self) -> LayerSource<'s, ColorLayer> {
        LayerSource::select(&self.data.color_layers)
    }

    pub fn uv_source(&self) -> LayerSource<'s, UvLayer> {
        LayerSource::select(&self.data.uv_layers)
    }

    /// Check the triangle-only contract and every index, before any byte of
    /// this mesh is packed.
    pub fn validate(
        &self,
        colors: Option<&ColorLayer>,
        uvs: Option<&UvLayer>,
        need_normals: bool,
    ) -> Result<(), MeshError> {
        let mesh = self.data;
        let n_loops = mesh.loops.len();
        let layer_len = |kind: &'static str, layer: &dyn Layer| {
            if layer.len() != n_loops {
                return Err(MeshError::LayerLength {
                    mesh: self.name.to_owned(),
                    kind,
                    layer: layer.name().to_owned(),
                    len: layer.len(),
                    loops: n_loops,
                });
            }
            Ok(())
        };
        if let Some(layer) = colors {
            layer_len("color", layer as &dyn Layer)?;
        }
        if let Some(layer) = uvs {
            layer_len("uv", layer as &dyn Layer)?;
        }
        for (i, poly) in mesh.polygons.iter().enumerate() {
            if poly.len() != 3 {
                return Err(MeshError::NotTriangle {
                    mesh: self.name.to_owned(),
                    polygon: i,
                    loops: poly.len(),
                });
            }
            for &li in poly.iter() {
                let Some(l) = mesh.loops.get(li as usize) else {
                    return Err(MeshError::LoopOutOfRange {
                        mesh: self.name.to_owned(),
                        index: li,
                        len: n_loops,
                    });
                };
                if l.vertex as usize >= mesh.vertices.len() {
                    return Err(MeshError::VertexOutOfRange {
                        mesh: self.name.to_owned(),
                        index: l.vertex,
                        len: mesh.vertices.len(),
                    });
                }
                if need_normals && l.normal.is_none() {
                    return Err(MeshError::MissingNormal {
                        mesh: self.name.to_owned(),
                        index: li,
                    });
                }
            }
        }
        Ok(())
    }

    /// Corners of every triangle, three per polygon in loop order.
    ///
    /// Call [`Self::validate`] with the same layers first; indices are
    /// not checked here.
    pub fn triangle_vertices<'a>(
        &'a self,
        colors: Option<&'a ColorLayer>,
        uvs: Option<&'a UvLayer>,
    ) -> impl Iterator<Item = TriangleVertex> + 'a {
        let mesh = self.data;
        mesh.polygons.iter().flat_map(move |poly| {
            poly.iter().map(move |&li| {
                let li = li as usize;
                let l = mesh.loops[li];
                TriangleVertex {
                    position: mesh.vertices[l.vertex as usize],
                    normal: l.normal,
                    color: colors.map(|c| c.colors[li]),
                    texcoord: uvs.map(|t| t.uvs[li]),
                }
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Loop;

    fn quad() -> MeshData {
        MeshData {
            name: "Quad".into(),
            vertices: vec![[0.0; 3], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            loops: (0..4).map(|v| Loop { vertex: v, normal: None }).collect(),
            polygons: vec![vec![0, 1, 2, 3]],
            ..Default::default()
        }
    }

    fn item(data: &MeshData) -> MeshWorkItem<'_> {
        MeshWorkItem {
            mesh: MeshId(0),
            name: &data.name,
            via_object: "Obj",
            data,
        }
    }

    #[test]
    fn rejects_non_triangles() {
        let data = quad();
        let err = item(&data).validate(None, None, false).unwrap_err();
        assert!(matches!(err, MeshError::NotTriangle { loops: 4, .. }));
    }

    #[test]
    fn rejects_bad_indices_and_missing_normals() {
        let mut data = quad();
        data.polygons = vec![vec![0, 1, 7]];
        let err = item(&data).validate(None, None, false).unwrap_err();
        assert!(matches!(err, MeshError::LoopOutOfRange { index: 7, .. }));

        data.polygons = vec![vec![0, 1, 2]];
        data.loops[2].vertex = 9;
        let err = item(&data).validate(None, None, false).unwrap_err();
        assert!(matches!(err, MeshError::VertexOutOfRange { index: 9, .. }));

        data.loops[2].vertex = 2;
        item(&data).validate(None, None, false).unwrap();
        let err = item(&data).validate(None, None, true).unwrap_err();
        assert!(matches!(err, MeshError::MissingNormal { index: 0, .. }));
    }

    #[test]
    fn corners_follow_loop_order() {
        let mut data = quad();
        data.polygons = vec![vec![2, 1, 0]];
        let uvs = UvLayer {
            name: "uv".into(),
            active: true,
            uvs: vec![[0.0, 0.0], [0.5, 0.0], [0.5, 0.5], [0.0, 0.5]],
        };
        let it = item(&data);
        it.validate(None, Some(&uvs), false).unwrap();
        let corners: Vec<_> = it.triangle_vertices(None, Some(&uvs)).collect();
        assert_eq!(corners.len(), 3);
        assert_eq!(corners[0].position, [1.0, 1.0, 0.0]);
        assert_eq!(corners[0].texcoord, Some([0.5, 0.5]));
        assert_eq!(corners[2].position, [0.0, 0.0, 0.0]);
        assert_eq!(corners[2].color, None);
    }
}
