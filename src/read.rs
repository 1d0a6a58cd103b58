use std::io::Read;
use std::ops::Range;

use crate::HashMap;
use crate::format::{Attribute, FormatDescriptor, FormatError, FormatTable};
use crate::header::{ChunkHeader, HeaderParseError, IndexRecord};

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("Format table: {0}")]
    Format(#[from] FormatError),
    #[error("Cannot decode chunk header: {0}")]
    Header(#[from] HeaderParseError),
    #[error("Data ends too early, in {0}")]
    NotEnoughData(&'static str),
    #[error("Unexpected chunk {found:?}, expected {expected:?}")]
    UnexpectedTag { expected: String, found: String },
    #[error("Data chunk has unknown vertex format {0:?}")]
    UnknownMagic(String),
    #[error("Data chunk is {len} bytes, not a multiple of the {stride} byte vertex stride")]
    RaggedData { len: usize, stride: usize },
    #[error("Index chunk is {0} bytes, not a multiple of the record size")]
    RaggedIndex(usize),
    #[error("Index entry {0} has out-of-range name begin/end")]
    NameRange(usize),
    #[error("Index entry {0} has out-of-range vertex begin/end")]
    VertexRange(usize),
    #[error("Index entry {0} names a string that is not valid UTF-8")]
    Utf8(usize),
}

fn tag_str(tag: [u8; 4]) -> String {
    String::from_utf8_lossy(&tag).into_owned()
}

fn take_chunk<'b>(
    data_remain: &mut &'b [u8],
    what: &'static str,
) -> Result<([u8; 4], &'b [u8]), ReadError> {
    let h = ChunkHeader::encoded_len();
    if data_remain.len() < h {
        return Err(ReadError::NotEnoughData(what));
    }
    let header = ChunkHeader::from_bytes(&data_remain[..h])?;
    let len = header.len as usize;
    if data_remain.len() - h < len {
        return Err(ReadError::NotEnoughData(what));
    }
    let payload = &data_remain[h..h + len];
    *data_remain = &data_remain[h + len..];
    Ok((header.tag, payload))
}

fn expect_tag(found: [u8; 4], expected: [u8; 4]) -> Result<(), ReadError> {
    if found != expected {
        return Err(ReadError::UnexpectedTag {
            expected: tag_str(expected),
            found: tag_str(found),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshEntry {
    pub name: String,
    /// In vertices, not bytes
    pub vertices: Range<u32>,
}

/// One decoded vertex. Attributes absent from the format are `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Option<[f32; 3]>,
    pub normal: Option<[f32; 3]>,
    pub color: Option<[u8; 4]>,
    pub texcoord: Option<[f32; 2]>,
}

fn f32s<const N: usize>(bytes: &[u8]) -> [f32; N] {
    let mut r = [0.0; N];
    for (v, b) in r.iter_mut().zip(bytes.chunks_exact(4)) {
        *v = f32::from_le_bytes([b[0], b[1], b[2], b[3]]);
    }
    r
}

impl Vertex {
    pub fn decode(format: &FormatDescriptor, bytes: &[u8]) -> Self {
        let field = |attr: Attribute| {
            format
                .offset_of(attr)
                .map(|o| &bytes[o..o + attr.size()])
        };
        Self {
            position: field(Attribute::Position).map(f32s::<3>),
            normal: field(Attribute::Normal).map(f32s::<3>),
            color: field(Attribute::Color).map(|b| [b[0], b[1], b[2], b[3]]),
            texcoord: field(Attribute::Texcoord).map(f32s::<2>),
        }
    }
}

/// A decoded blob: vertex data plus the name index.
#[derive(Debug, Clone)]
pub struct MeshBlob {
    format: FormatDescriptor,
    data: Vec<u8>,
    strings: Vec<u8>,
    index: Vec<IndexRecord>,
    entries: Vec<MeshEntry>,
    by_name: HashMap<String, usize>,
}

impl MeshBlob {
    pub fn from_bytes(buf: &[u8]) -> Result<Self, ReadError> {
        Self::from_bytes_with_table(buf, &FormatTable::builtin()?)
    }

    pub fn read_from(read: &mut dyn Read) -> Result<Self, ReadError> {
        let mut buf = vec![];
        read.read_to_end(&mut buf)?;
        Self::from_bytes(&buf)
    }

    pub fn from_bytes_with_table(buf: &[u8], table: &FormatTable) -> Result<Self, ReadError> {
        let mut data_remain = buf;

        let (magic, data) = take_chunk(&mut data_remain, "data chunk")?;
        let format = table
            .by_magic(magic)
            .ok_or_else(|| ReadError::UnknownMagic(tag_str(magic)))?;
        let stride = format.vertex_stride();
        if data.len() % stride != 0 {
            return Err(ReadError::RaggedData {
                len: data.len(),
                stride,
            });
        }
        let n_vertices = data.len() / stride;

        let (tag, strings) = take_chunk(&mut data_remain, "strings chunk")?;
        expect_tag(tag, crate::STRINGS_TAG)?;

        let (tag, index_bytes) = take_chunk(&mut data_remain, "index chunk")?;
        expect_tag(tag, crate::INDEX_TAG)?;
        if index_bytes.len() % IndexRecord::encoded_len() != 0 {
            return Err(ReadError::RaggedIndex(index_bytes.len()));
        }
        let index = index_bytes
            .chunks_exact(IndexRecord::encoded_len())
            .map(IndexRecord::from_bytes)
            .collect::<Result<Vec<_>, _>>()?;

        let mut entries = Vec::with_capacity(index.len());
        let mut by_name = HashMap::default();
        for (i, rec) in index.iter().enumerate() {
            if !(rec.name_begin <= rec.name_end && rec.name_end as usize <= strings.len()) {
                return Err(ReadError::NameRange(i));
            }
            // begin == end is a mesh without polygons
            if !(rec.vertex_begin <= rec.vertex_end && rec.vertex_end as usize <= n_vertices) {
                return Err(ReadError::VertexRange(i));
            }
            let name = std::str::from_utf8(
                &strings[rec.name_begin as usize..rec.name_end as usize],
            )
            .map_err(|_| ReadError::Utf8(i))?;
            if by_name.contains_key(name) {
                tracing::warn!("Mesh name {name:?} appears more than once in the index");
            } else {
                by_name.insert(name.to_owned(), i);
            }
            entries.push(MeshEntry {
                name: name.to_owned(),
                vertices: rec.vertex_begin..rec.vertex_end,
            });
        }

        if !data_remain.is_empty() {
            tracing::warn!("{} bytes of trailing data after the index chunk", data_remain.len());
        }

        Ok(Self {
            format,
            data: data.to_vec(),
            strings: strings.to_vec(),
            index,
            entries,
            by_name,
        })
    }

    pub fn format(&self) -> &FormatDescriptor {
        &self.format
    }

    pub fn n_vertices(&self) -> usize {
        self.data.len() / self.format.vertex_stride()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn strings(&self) -> &[u8] {
        &self.strings
    }

    pub fn index(&self) -> &[IndexRecord] {
        &self.index
    }

    pub fn entries(&self) -> &[MeshEntry] {
        &self.entries
    }

    /// First entry with this name.
    pub fn lookup(&self, name: &str) -> Option<&MeshEntry> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    /// Raw vertex bytes of one mesh.
    ///
    /// `None` if the entry's range does not fit this blob.
    pub fn mesh_bytes(&self, entry: &MeshEntry) -> Option<&[u8]> {
        let stride = self.format.vertex_stride();
        let begin = (entry.vertices.start as usize).checked_mul(stride)?;
        let end = (entry.vertices.end as usize).checked_mul(stride)?;
        self.data.get(begin..end)
    }

    pub fn mesh_vertices<'a>(
        &'a self,
        entry: &MeshEntry,
    ) -> Option<impl Iterator<Item = Vertex> + 'a> {
        let format = self.format;
        let bytes = self.mesh_bytes(entry)?;
        Some(
            bytes
                .chunks_exact(format.vertex_stride())
                .map(move |b| Vertex::decode(&format, b)),
        )
    }
}

/// Check whether the bytes start with the data chunk of a known format.
pub fn is_mesh_blob(buf: &[u8]) -> bool {
    let Some(magic) = buf.get(..4) else {
        return false;
    };
    let Ok(table) = FormatTable::builtin() else {
        return false;
    };
    table.by_magic([magic[0], magic[1], magic[2], magic[3]]).is_some()
}
