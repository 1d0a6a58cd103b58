/// Header preceding every chunk: a 4-byte tag and the payload length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C, packed)]
pub struct ChunkHeader {
    pub tag: [u8; 4],
    /// Byte count of the payload, not including this header
    pub len: u32,
}

/// One entry of the `idx0` chunk.
///
/// Both ranges are half-open. Names index bytes of the `str0` chunk,
/// vertices index whole vertices of the data chunk.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct IndexRecord {
    pub name_begin: u32,
    pub name_end: u32,
    pub vertex_begin: u32,
    pub vertex_end: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum HeaderParseError {
    #[error("Bytes array cannot be reinterpreted/cast: {0}")]
    Bytemuck(bytemuck::PodCastError),
}

impl ChunkHeader {
    pub const fn encoded_len() -> usize {
        std::mem::size_of::<Self>()
    }

    pub fn new(tag: [u8; 4], len: u32) -> Self {
        Self { tag, len }
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, HeaderParseError> {
        let raw: &ChunkHeader =
            bytemuck::try_from_bytes(buf).map_err(HeaderParseError::Bytemuck)?;
        Ok(raw.to_le())
    }

    pub fn to_le(&self) -> Self {
        Self {
            tag: self.tag,
            len: self.len.to_le(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

impl IndexRecord {
    pub const fn encoded_len() -> usize {
        std::mem::size_of::<Self>()
    }

    /// Decode one record from exactly [`Self::encoded_len`] bytes.
    ///
    /// The input does not need to be aligned.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, HeaderParseError> {
        if buf.len() != Self::encoded_len() {
            return Err(HeaderParseError::Bytemuck(
                bytemuck::PodCastError::SizeMismatch,
            ));
        }
        let raw: IndexRecord = bytemuck::pod_read_unaligned(buf);
        Ok(raw.to_le())
    }

    pub fn to_le(&self) -> Self {
        Self {
            name_begin: self.name_begin.to_le(),
            name_end: self.name_end.to_le(),
            vertex_begin: self.vertex_begin.to_le(),
            vertex_end: self.vertex_end.to_le(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_end.saturating_sub(self.vertex_begin)
    }
}
