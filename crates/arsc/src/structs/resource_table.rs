use std::fmt;

use bitflags::bitflags;
use log::warn;
use winnow::binary::{le_u8, le_u16, le_u32};
use winnow::combinator::repeat;
use winnow::prelude::*;
use winnow::token::take;

use crate::errors::ArscError;
use crate::structs::res_chunk_header::Chunk;
use crate::structs::res_table_config::ResTableConfig;
use crate::structs::res_value::ResValue;

/// Sentinel in a type chunk's offset table: the entry is not present in
/// this configuration variant
pub const NO_ENTRY: u32 = 0xFFFF_FFFF;

/// Header for the top-level resource table chunk
#[derive(Debug)]
pub struct ResTableHeader {
    /// The number of `ResTable_package` chunks that follow
    pub package_count: u32,
}

impl ResTableHeader {
    pub fn parse(chunk: &Chunk) -> Result<ResTableHeader, ArscError> {
        let mut ext = chunk.header_ext();
        let package_count = le_u32::<_, winnow::error::ContextError>(&mut ext)
            .map_err(|_| ArscError::MalformedTable("truncated table header"))?;
        Ok(ResTableHeader { package_count })
    }
}

/// A collection of resource data types within a package
///
/// Followed by one or more type and type-spec chunks containing the entry
/// values for each resource type.
pub struct ResTablePackageHeader {
    /// Package ID; corresponds to the package bits of a resource
    /// identifier. IDs start at 1, 0 means "not a base package".
    pub id: u32,

    /// Actual name of this package, \0-terminated UTF-16
    pub name: [u8; 256],

    /// Chunk-relative offset to the string pool defining the resource
    /// type symbol table
    pub type_strings: u32,

    /// Last index into `type_strings` that is for public use by others
    pub last_public_type: u32,

    /// Chunk-relative offset to the string pool defining the resource
    /// key symbol table
    pub key_strings: u32,

    /// Last index into `key_strings` that is for public use by others
    pub last_public_key: u32,
}

impl ResTablePackageHeader {
    pub fn parse(chunk: &Chunk) -> Result<ResTablePackageHeader, ArscError> {
        let mut ext = chunk.header_ext();
        Self::parse_inner(&mut ext)
            .map_err(|_| ArscError::MalformedTable("truncated package header"))
    }

    fn parse_inner(input: &mut &[u8]) -> ModalResult<ResTablePackageHeader> {
        let (id, name, type_strings, last_public_type, key_strings, last_public_key) =
            (le_u32, take(256usize), le_u32, le_u32, le_u32, le_u32).parse_next(input)?;

        Ok(ResTablePackageHeader {
            id,
            name: name.try_into().expect("expected 256 bytes for name field"),
            type_strings,
            last_public_type,
            key_strings,
            last_public_key,
        })
    }

    /// Get the real package name from the `name` field
    pub fn name(&self) -> String {
        let utf16_str: Vec<u16> = self
            .name
            .chunks_exact(2)
            .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
            .take_while(|&c| c != 0)
            .collect();

        String::from_utf16(&utf16_str).unwrap_or_default()
    }
}

impl fmt::Debug for ResTablePackageHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResTablePackageHeader")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("type_strings", &self.type_strings)
            .field("last_public_type", &self.last_public_type)
            .field("key_strings", &self.key_strings)
            .field("last_public_key", &self.last_public_key)
            .finish()
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SpecFlags: u32 {
        /// The entry has been declared public and may be referenced from
        /// other packages
        const SPEC_PUBLIC = 0x4000_0000;
    }
}

/// A specification of the resources defined by a particular type
///
/// There is one of these chunks per resource type; the flag words record
/// which configuration dimensions each entry varies by.
#[derive(Debug, Clone)]
pub struct ResTableTypeSpec {
    /// The type identifier this chunk is holding. Type IDs start at 1;
    /// 0 is invalid.
    pub id: u8,

    /// Number of configuration flag words that follow
    pub entry_count: u32,

    /// Per-entry configuration masks (plus SPEC_PUBLIC)
    pub flags: Vec<u32>,
}

impl ResTableTypeSpec {
    pub fn parse(chunk: &Chunk) -> Result<ResTableTypeSpec, ArscError> {
        let mut ext = chunk.header_ext();
        let (id, _res0, _res1, entry_count) =
            (le_u8, le_u8, le_u16, le_u32)
                .parse_next(&mut ext)
                .map_err(|_: winnow::error::ErrMode<winnow::error::ContextError>| {
                    ArscError::MalformedTable("truncated type spec header")
                })?;

        if id == 0 {
            return Err(ArscError::MalformedTable("type spec with id 0"));
        }

        let mut payload = chunk.payload();
        let flags: Vec<u32> = repeat(entry_count as usize, le_u32)
            .parse_next(&mut payload)
            .map_err(|_: winnow::error::ErrMode<winnow::error::ContextError>| {
                ArscError::MalformedTable("type spec flags extend past chunk")
            })?;

        Ok(ResTableTypeSpec {
            id,
            entry_count,
            flags,
        })
    }

    #[inline]
    pub fn is_public(&self, entry: u16) -> bool {
        self.flags
            .get(entry as usize)
            .map(|f| SpecFlags::from_bits_truncate(*f).contains(SpecFlags::SPEC_PUBLIC))
            .unwrap_or(false)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EntryFlags: u16 {
        /// If set, this is a complex entry, holding a set of name/value mappings.
        const FLAG_COMPLEX = 0x0001;

        /// If set, this resource has been declared public, so libraries are allowed to reference it.
        const FLAG_PUBLIC = 0x0002;
    }
}

/// A single name/value pair inside a complex entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResTableMap {
    /// The resource identifier defining this mapping's name
    pub name: u32,

    pub value: ResValue,
}

impl ResTableMap {
    #[inline(always)]
    pub fn parse(input: &mut &[u8]) -> ModalResult<ResTableMap> {
        (le_u32, ResValue::parse)
            .map(|(name, value)| ResTableMap { name, value })
            .parse_next(input)
    }
}

/// A complex entry: an ordered set of name/value pairs, optionally
/// inheriting from a parent entry
#[derive(Debug, Clone)]
pub struct ResTableMapEntry {
    pub flags: EntryFlags,

    /// Reference into the package's key string pool
    pub key_index: u32,

    /// Resource identifier of the parent mapping, or 0 if there is none
    pub parent: u32,

    /// The pairs, in file order
    pub entries: Vec<ResTableMap>,
}

/// A plain entry holding one typed value
#[derive(Debug, Clone, Copy)]
pub struct ResTableValueEntry {
    pub flags: EntryFlags,

    /// Reference into the package's key string pool
    pub key_index: u32,

    pub value: ResValue,
}

/// An entry in a type chunk's entry region
#[derive(Debug, Clone)]
pub enum ResTableEntry {
    /// Offset table said NO_ENTRY for this configuration
    None,
    Value(ResTableValueEntry),
    Complex(ResTableMapEntry),
}

impl ResTableEntry {
    pub fn parse(input: &mut &[u8]) -> ModalResult<ResTableEntry> {
        let (_size, flags, key_index) = (le_u16, le_u16, le_u32).parse_next(input)?;
        let flags = EntryFlags::from_bits_truncate(flags);

        if flags.contains(EntryFlags::FLAG_COMPLEX) {
            let (parent, count) = (le_u32, le_u32).parse_next(input)?;
            let entries = repeat(count as usize, ResTableMap::parse).parse_next(input)?;
            Ok(ResTableEntry::Complex(ResTableMapEntry {
                flags,
                key_index,
                parent,
                entries,
            }))
        } else {
            Ok(ResTableEntry::Value(ResTableValueEntry {
                flags,
                key_index,
                value: ResValue::parse(input)?,
            }))
        }
    }

    #[inline]
    pub fn key_index(&self) -> Option<u32> {
        match self {
            ResTableEntry::None => None,
            ResTableEntry::Value(e) => Some(e.key_index),
            ResTableEntry::Complex(e) => Some(e.key_index),
        }
    }

    #[inline]
    pub fn is_present(&self) -> bool {
        !matches!(self, ResTableEntry::None)
    }
}

/// A collection of resource entries for one resource type under one
/// configuration. A type usually has several of these chunks, one per
/// packaged configuration variant.
#[derive(Debug, Clone)]
pub struct ResTableType {
    /// The type identifier this chunk is holding. Type IDs start at 1;
    /// 0 is invalid.
    pub id: u8,

    /// Configuration this collection of entries is designed for
    pub config: ResTableConfig,

    /// Entries indexed by entry id, NO_ENTRY slots included
    pub entries: Vec<ResTableEntry>,
}

impl ResTableType {
    pub fn parse(chunk: &Chunk) -> Result<ResTableType, ArscError> {
        let mut ext = chunk.header_ext();
        let (id, _res0, _res1, entry_count, entries_start) =
            (le_u8, le_u8, le_u16, le_u32, le_u32)
                .parse_next(&mut ext)
                .map_err(|_: winnow::error::ErrMode<winnow::error::ContextError>| {
                    ArscError::MalformedTable("truncated type header")
                })?;

        if id == 0 {
            return Err(ArscError::MalformedTable("type chunk with id 0"));
        }

        let config = ResTableConfig::decode(&mut ext)?;

        let mut offset_table = chunk.payload();
        let entry_offsets: Vec<u32> = repeat(entry_count as usize, le_u32)
            .parse_next(&mut offset_table)
            .map_err(|_: winnow::error::ErrMode<winnow::error::ContextError>| {
                ArscError::MalformedTable("entry offset table extends past chunk")
            })?;

        // entry data is addressed relative to entriesStart, which may sit
        // past the offset table with padding in between
        let entry_region = chunk.slice_from(entries_start)?;

        let mut entries = Vec::with_capacity(entry_offsets.len());
        for &offset in &entry_offsets {
            if offset == NO_ENTRY {
                entries.push(ResTableEntry::None);
                continue;
            }

            let offset = offset as usize;
            if offset >= entry_region.len() {
                return Err(ArscError::MalformedTable("entry offset outside entry region"));
            }
            let entry = ResTableEntry::parse(&mut &entry_region[offset..])
                .map_err(|_| ArscError::MalformedTable("entry data extends past chunk"))?;
            entries.push(entry);
        }

        Ok(ResTableType {
            id,
            config,
            entries,
        })
    }

    /// Entry for `index`, skipping NO_ENTRY slots
    pub fn entry(&self, index: u16) -> Option<&ResTableEntry> {
        match self.entries.get(index as usize) {
            Some(e) if e.is_present() => Some(e),
            _ => None,
        }
    }
}

/// A shared-library mapping chunk: pairs of (package id, package name)
/// recording which build-time package ids need runtime rewriting.
///
/// Parsed so the chunk walk stays in sync, then ignored; dynamic
/// reference rewriting is not performed.
#[derive(Debug)]
pub struct ResTableLibrary {
    pub entries: Vec<(u32, String)>,
}

impl ResTableLibrary {
    pub fn parse(chunk: &Chunk) -> Result<ResTableLibrary, ArscError> {
        let mut ext = chunk.header_ext();
        let count = le_u32::<_, winnow::error::ContextError>(&mut ext)
            .map_err(|_| ArscError::MalformedTable("truncated library header"))?;

        let mut payload = chunk.payload();
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let (id, name) = (le_u32, take(256usize))
                .parse_next(&mut payload)
                .map_err(|_: winnow::error::ErrMode<winnow::error::ContextError>| {
                    ArscError::MalformedTable("library entries extend past chunk")
                })?;

            let utf16: Vec<u16> = name
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .take_while(|&c| c != 0)
                .collect();
            entries.push((id, String::from_utf16(&utf16).unwrap_or_default()));
        }

        Ok(ResTableLibrary { entries })
    }
}

/// Log and skip a chunk type the table walk does not interpret
pub fn skip_unhandled_chunk(chunk: &Chunk) {
    warn!(
        "skipping unhandled chunk {:?} ({} bytes)",
        chunk.type_(),
        chunk.header.size
    );
}
