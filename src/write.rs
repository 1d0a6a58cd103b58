use std::io::Write;

use crate::collect::{CollectSettings, collect_meshes};
use crate::diag::Diagnostics;
use crate::format::FormatDescriptor;
use crate::header::{ChunkHeader, IndexRecord};
use crate::mesh::MeshWorkItem;
use crate::pack::{PackError, PackSettings, PackedVertices, VertexPacker};
use crate::scene::{CollectionId, Scene};

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Pack(#[from] PackError),
    #[error("Vertex data is {actual} bytes, expected {expected} ({n_vertices} vertices of {stride} bytes)")]
    DataLengthMismatch {
        actual: usize,
        expected: usize,
        n_vertices: u32,
        stride: usize,
    },
    #[error("Chunk {0:?} is too large for a u32 length")]
    ChunkTooLarge(String),
    #[error("Index record for {0:?} has a vertex range that is not whole triangles")]
    PartialTriangles(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ExportSettings {
    pub collect: CollectSettings,
    pub pack: PackSettings,
}

/// The three sections of a blob, before chunk headers are added.
#[derive(Debug, Clone)]
pub struct BlobSections {
    pub format: FormatDescriptor,
    pub vertices: PackedVertices,
    /// Concatenated names, no separators
    pub strings: Vec<u8>,
    pub index: Vec<IndexRecord>,
}

/// A fully assembled blob.
#[derive(Debug, Clone)]
pub struct EncodedBlob {
    pub bytes: Vec<u8>,
    pub n_meshes: usize,
    pub n_vertices: u32,
    pub data_len: usize,
    pub strings_len: usize,
    pub index_len: usize,
}

impl EncodedBlob {
    pub fn write_to(&self, write: &mut dyn Write) -> Result<(), WriteError> {
        write.write_all(&self.bytes)?;
        Ok(())
    }

    pub fn summary(&self) -> String {
        let h = ChunkHeader::encoded_len();
        format!(
            "{} bytes [== {} bytes of data + {} bytes of strings + {} bytes of index]",
            self.bytes.len(),
            self.data_len + h,
            self.strings_len + h,
            self.index_len + h,
        )
    }
}

fn chunk_len(tag: [u8; 4], len: usize) -> Result<u32, WriteError> {
    u32::try_from(len)
        .map_err(|_| WriteError::ChunkTooLarge(String::from_utf8_lossy(&tag).into_owned()))
}

fn write_chunk(out: &mut Vec<u8>, tag: [u8; 4], payload: &[u8]) -> Result<(), WriteError> {
    let header = ChunkHeader::new(tag, chunk_len(tag, payload.len())?).to_le();
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(payload);
    Ok(())
}

impl BlobSections {
    /// Check that the vertex stream holds exactly `n_vertices` vertices of
    /// the format's stride. This is the last chance to catch a packing bug.
    pub fn check(&self) -> Result<(), WriteError> {
        let stride = self.format.vertex_stride();
        let expected = self.vertices.n_vertices as usize * stride;
        if self.vertices.bytes.len() != expected {
            return Err(WriteError::DataLengthMismatch {
                actual: self.vertices.bytes.len(),
                expected,
                n_vertices: self.vertices.n_vertices,
                stride,
            });
        }
        for rec in self.index.iter() {
            if rec.vertex_count() % 3 != 0 {
                let name = self
                    .strings
                    .get(rec.name_begin as usize..rec.name_end as usize)
                    .map(|b| String::from_utf8_lossy(b).into_owned())
                    .unwrap_or_default();
                return Err(WriteError::PartialTriangles(name));
            }
        }
        Ok(())
    }

    /// Assemble the data, `str0` and `idx0` chunks, in that order.
    pub fn encode(&self) -> Result<EncodedBlob, WriteError> {
        self.check()?;
        let mut index_bytes =
            Vec::with_capacity(self.index.len() * IndexRecord::encoded_len());
        for rec in self.index.iter() {
            index_bytes.extend_from_slice(rec.to_le().as_bytes());
        }
        let h = ChunkHeader::encoded_len();
        let mut bytes = Vec::with_capacity(
            3 * h + self.vertices.bytes.len() + self.strings.len() + index_bytes.len(),
        );
        write_chunk(&mut bytes, self.format.magic(), &self.vertices.bytes)?;
        write_chunk(&mut bytes, crate::STRINGS_TAG, &self.strings)?;
        write_chunk(&mut bytes, crate::INDEX_TAG, &index_bytes)?;
        Ok(EncodedBlob {
            bytes,
            n_meshes: self.index.len(),
            n_vertices: self.vertices.n_vertices,
            data_len: self.vertices.bytes.len(),
            strings_len: self.strings.len(),
            index_len: index_bytes.len(),
        })
    }
}

/// Accumulates meshes into the three sections of a blob.
pub struct MeshBlobWriter {
    packer: VertexPacker,
    strings: Vec<u8>,
    index: Vec<IndexRecord>,
    diagnostics: Diagnostics,
}

impl MeshBlobWriter {
    pub fn new(format: FormatDescriptor) -> Self {
        Self::new_with_settings(format, Default::default())
    }

    pub fn new_with_settings(format: FormatDescriptor, settings: PackSettings) -> Self {
        Self {
            packer: VertexPacker::new_with_settings(format, settings),
            strings: vec![],
            index: vec![],
            diagnostics: Diagnostics::default(),
        }
    }

    /// Pack a mesh and record its name and vertex range.
    pub fn add_mesh(&mut self, item: &MeshWorkItem<'_>) -> Result<IndexRecord, WriteError> {
        let name_begin = chunk_len(crate::STRINGS_TAG, self.strings.len())?;
        let name_end =
            chunk_len(crate::STRINGS_TAG, self.strings.len() + item.name.len())?;
        let vertices = self.packer.pack_mesh(item, &mut self.diagnostics)?;
        self.strings.extend_from_slice(item.name.as_bytes());
        let rec = IndexRecord {
            name_begin,
            name_end,
            vertex_begin: vertices.start,
            vertex_end: vertices.end,
        };
        self.index.push(rec);
        Ok(rec)
    }

    pub fn with_mesh(mut self, item: &MeshWorkItem<'_>) -> Result<Self, WriteError> {
        self.add_mesh(item)?;
        Ok(self)
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn into_sections(self) -> (BlobSections, Diagnostics) {
        let format = *self.packer.format();
        (
            BlobSections {
                format,
                vertices: self.packer.finish(),
                strings: self.strings,
                index: self.index,
            },
            self.diagnostics,
        )
    }

    /// Encode the blob in memory and write it out in one piece.
    pub fn write_to(self, write: &mut dyn Write) -> Result<Export, WriteError> {
        let (sections, diagnostics) = self.into_sections();
        let blob = sections.encode()?;
        blob.write_to(write)?;
        Ok(Export { blob, diagnostics })
    }
}

/// Result of exporting a scene.
#[derive(Debug, Clone)]
pub struct Export {
    pub blob: EncodedBlob,
    pub diagnostics: Diagnostics,
}

/// Run the whole pipeline: collect meshes reachable from `root`, pack them
/// in traversal order, and assemble the blob in memory.
pub fn export_scene(
    scene: &Scene,
    root: CollectionId,
    format: FormatDescriptor,
    settings: ExportSettings,
) -> Result<Export, WriteError> {
    let collected = collect_meshes(scene, root, settings.collect);
    let mut writer = MeshBlobWriter::new_with_settings(format, settings.pack);
    for item in collected.items.iter() {
        writer.add_mesh(item)?;
    }
    let (sections, pack_diagnostics) = writer.into_sections();
    let blob = sections.encode()?;
    let mut diagnostics = collected.diagnostics;
    diagnostics.extend(pack_diagnostics);
    Ok(Export { blob, diagnostics })
}
