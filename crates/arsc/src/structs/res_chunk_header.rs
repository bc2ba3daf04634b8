use winnow::binary::{le_u16, le_u32};
use winnow::prelude::*;

use crate::errors::ArscError;

/// Chunk type identifiers used by the resource-table format.
///
/// Only the table family of chunks is listed; anything else comes out as
/// [`ChunkType::Unknown`] and is skipped by the walkers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u16)]
pub enum ChunkType {
    #[default]
    Null = 0x0000,
    StringPool = 0x0001,
    Table = 0x0002,

    TablePackage = 0x0200,
    TableType = 0x0201,
    TableTypeSpec = 0x0202,
    TableLibrary = 0x0203,

    Unknown(u16),
}

impl From<u16> for ChunkType {
    fn from(value: u16) -> Self {
        match value {
            0x0000 => ChunkType::Null,
            0x0001 => ChunkType::StringPool,
            0x0002 => ChunkType::Table,
            0x0200 => ChunkType::TablePackage,
            0x0201 => ChunkType::TableType,
            0x0202 => ChunkType::TableTypeSpec,
            0x0203 => ChunkType::TableLibrary,
            other => ChunkType::Unknown(other),
        }
    }
}

/// Header that appears at the front of every data chunk
#[derive(Debug, Default, Clone, Copy)]
pub struct ResChunkHeader {
    /// Type identifier for this chunk. The meaning of this value depends on the containing chunk.
    pub type_: ChunkType,

    /// Size of the chunk header (in bytes). Adding this value to
    /// the start of the chunk gives the first byte of its payload.
    pub header_size: u16,

    /// Total size of this chunk (in bytes), header and payload together.
    /// Adding this value to the chunk start skips it completely,
    /// including any child chunks.
    pub size: u32,
}

impl ResChunkHeader {
    #[inline]
    pub fn parse(input: &mut &[u8]) -> ModalResult<ResChunkHeader> {
        (le_u16, le_u16, le_u32)
            .map(|(type_, header_size, size)| ResChunkHeader {
                type_: ChunkType::from(type_),
                header_size,
                size,
            })
            .parse_next(input)
    }

    /// Get the size of this structure in bytes
    #[inline(always)]
    pub const fn size_of() -> usize {
        // 2 bytes - type_
        // 2 bytes - header_size
        // 4 bytes - size
        2 + 2 + 4
    }
}

/// A validated chunk: header plus the raw bytes it spans.
///
/// `data` covers the whole chunk, header included, so offsets declared
/// relative to the chunk start (`stringsStart`, `entriesStart`) can be
/// resolved against it directly.
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a> {
    pub header: ResChunkHeader,
    data: &'a [u8],
}

impl<'a> Chunk<'a> {
    /// Validate and split off the chunk starting at `input`, leaving
    /// `input` positioned at the next sibling.
    pub fn next(input: &mut &'a [u8]) -> Result<Chunk<'a>, ArscError> {
        let full = *input;
        if full.len() < ResChunkHeader::size_of() {
            return Err(ArscError::CorruptChunk("truncated chunk header"));
        }

        let mut cursor = full;
        let header = ResChunkHeader::parse(&mut cursor)
            .map_err(|_| ArscError::CorruptChunk("unreadable chunk header"))?;

        let header_size = header.header_size as usize;
        let size = header.size as usize;
        if header_size < ResChunkHeader::size_of() {
            return Err(ArscError::CorruptChunk("declared header smaller than base header"));
        }
        if size < header_size {
            return Err(ArscError::CorruptChunk("chunk size smaller than its header"));
        }
        if size > full.len() {
            return Err(ArscError::CorruptChunk("chunk extends past end of buffer"));
        }

        *input = &full[size..];
        Ok(Chunk {
            header,
            data: &full[..size],
        })
    }

    #[inline(always)]
    pub fn type_(&self) -> ChunkType {
        self.header.type_
    }

    /// The whole chunk, header included
    #[inline(always)]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Chunk-specific header fields after the base header
    #[inline(always)]
    pub fn header_ext(&self) -> &'a [u8] {
        &self.data[ResChunkHeader::size_of()..self.header.header_size as usize]
    }

    /// Everything after the declared header
    #[inline(always)]
    pub fn payload(&self) -> &'a [u8] {
        &self.data[self.header.header_size as usize..]
    }

    /// Bounds-checked slice from a chunk-relative offset to the chunk end
    pub fn slice_from(&self, offset: u32) -> Result<&'a [u8], ArscError> {
        let offset = offset as usize;
        if offset < ResChunkHeader::size_of() || offset > self.data.len() {
            return Err(ArscError::CorruptChunk("chunk-relative offset out of bounds"));
        }
        Ok(&self.data[offset..])
    }
}

/// Walks sibling chunks inside a parent payload by advancing over each
/// chunk's declared size.
pub struct ChunkIter<'a> {
    rest: &'a [u8],
}

impl<'a> ChunkIter<'a> {
    pub fn new(payload: &'a [u8]) -> ChunkIter<'a> {
        ChunkIter { rest: payload }
    }
}

impl<'a> Iterator for ChunkIter<'a> {
    type Item = Result<Chunk<'a>, ArscError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }

        match Chunk::next(&mut self.rest) {
            Ok(chunk) => Some(Ok(chunk)),
            Err(e) => {
                // the stream past a corrupt header cannot be trusted
                self.rest = &[];
                Some(Err(e))
            }
        }
    }
}
