use winnow::binary::le_u32;
use winnow::combinator::repeat;
use winnow::prelude::*;

use crate::errors::ArscError;
use crate::table::ResourceId;

/// Identity/metadata header of an idmap file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdmapInfo {
    pub target_crc: u32,
    pub overlay_crc: u32,
}

/// A precomputed redirection table mapping a target package's resource
/// IDs onto an overlay package's renumbered ID space.
///
/// Wire layout: three u32 words (magic, target CRC, overlay CRC), then a
/// block of u32s: a type count, one chunk-relative index per type (0 =
/// type absent), and per referenced type an entry count, the first
/// covered entry id, and the substitute resource identifiers.
#[derive(Debug)]
pub struct Idmap {
    pub info: IdmapInfo,
    types: Vec<Option<TypeMap>>,
}

#[derive(Debug)]
struct TypeMap {
    entry_offset: u32,
    entries: Vec<u32>,
}

impl Idmap {
    pub const MAGIC: u32 = 0x706d_6469; // 'idmp'
    pub const HEADER_SIZE_BYTES: usize = 3 * 4;

    /// Read only the header; valid on any buffer holding at least the
    /// first [`Self::HEADER_SIZE_BYTES`] bytes
    pub fn info(bytes: &[u8]) -> Result<IdmapInfo, ArscError> {
        let mut input = bytes;
        let (magic, target_crc, overlay_crc) = (le_u32, le_u32, le_u32)
            .parse_next(&mut input)
            .map_err(|_: winnow::error::ErrMode<winnow::error::ContextError>| {
                ArscError::TooSmall
            })?;

        if magic != Self::MAGIC {
            return Err(ArscError::MalformedTable("bad idmap magic"));
        }
        Ok(IdmapInfo {
            target_crc,
            overlay_crc,
        })
    }

    pub fn parse(bytes: &[u8]) -> Result<Idmap, ArscError> {
        let info = Self::info(bytes)?;

        let body = &bytes[Self::HEADER_SIZE_BYTES..];
        if body.len() % 4 != 0 {
            return Err(ArscError::MalformedTable("idmap body not word aligned"));
        }
        let words: Vec<u32> = {
            let mut input = body;
            repeat(body.len() / 4, le_u32)
                .parse_next(&mut input)
                .map_err(|_: winnow::error::ErrMode<winnow::error::ContextError>| {
                    ArscError::MalformedTable("truncated idmap body")
                })?
        };

        if words.is_empty() {
            return Err(ArscError::MalformedTable("idmap with no type table"));
        }

        let type_count = words[0] as usize;
        if type_count + 1 > words.len() {
            return Err(ArscError::MalformedTable("idmap type table extends past file"));
        }

        let mut types = Vec::with_capacity(type_count);
        for type_slot in 0..type_count {
            let index = words[1 + type_slot] as usize;
            if index == 0 {
                types.push(None);
                continue;
            }
            if index + 2 > words.len() {
                return Err(ArscError::MalformedTable("idmap type block out of bounds"));
            }

            let entry_count = words[index] as usize;
            let entry_offset = words[index + 1];
            if index + 2 + entry_count > words.len() {
                return Err(ArscError::MalformedTable("idmap entry block out of bounds"));
            }

            types.push(Some(TypeMap {
                entry_offset,
                entries: words[index + 2..index + 2 + entry_count].to_vec(),
            }));
        }

        Ok(Idmap { info, types })
    }

    /// Translate a target resource identifier into the overlay's ID
    /// space; `None` when the overlay does not cover it
    pub fn lookup(&self, target: ResourceId) -> Option<ResourceId> {
        if !target.is_valid() {
            return None;
        }

        let type_map = self
            .types
            .get((target.type_id() - 1) as usize)?
            .as_ref()?;

        let entry = target.entry() as u32;
        if entry < type_map.entry_offset {
            return None;
        }
        let value = *type_map
            .entries
            .get((entry - type_map.entry_offset) as usize)?;
        if value == 0 {
            return None;
        }
        Some(ResourceId(value))
    }

    /// Number of type slots covered by this idmap
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// All (target, overlay) pairs recorded in the map, in type/entry order
    pub fn mappings(&self, target_package: u8) -> Vec<(ResourceId, ResourceId)> {
        let mut out = Vec::new();
        for (type_slot, type_map) in self.types.iter().enumerate() {
            let Some(type_map) = type_map else { continue };
            for (i, &value) in type_map.entries.iter().enumerate() {
                if value == 0 {
                    continue;
                }
                let target = ResourceId::make(
                    target_package,
                    (type_slot + 1) as u8,
                    (type_map.entry_offset + i as u32) as u16,
                );
                out.push((target, ResourceId(value)));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One type with two entries starting at entry 1
    fn sample_idmap() -> Vec<u8> {
        let words: Vec<u32> = vec![
            Idmap::MAGIC,
            0xAAAA_AAAA, // target crc
            0xBBBB_BBBB, // overlay crc
            2,           // type count
            0,           // type 1 absent
            3,           // type 2 block index (word offset within body)
            2,           // entry count
            1,           // entry offset
            0x0a02_0000,
            0x0a02_0001,
        ];
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    #[test]
    fn header_only_info() {
        let bytes = sample_idmap();
        let info = Idmap::info(&bytes[..Idmap::HEADER_SIZE_BYTES]).unwrap();
        assert_eq!(info.target_crc, 0xAAAA_AAAA);
        assert_eq!(info.overlay_crc, 0xBBBB_BBBB);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = sample_idmap();
        bytes[0] = 0;
        assert!(Idmap::info(&bytes).is_err());
    }

    #[test]
    fn lookup_translates_covered_entries() {
        let idmap = Idmap::parse(&sample_idmap()).unwrap();

        assert_eq!(
            idmap.lookup(ResourceId(0x7f02_0001)),
            Some(ResourceId(0x0a02_0000))
        );
        assert_eq!(
            idmap.lookup(ResourceId(0x7f02_0002)),
            Some(ResourceId(0x0a02_0001))
        );
        // below the entry offset
        assert_eq!(idmap.lookup(ResourceId(0x7f02_0000)), None);
        // uncovered type
        assert_eq!(idmap.lookup(ResourceId(0x7f01_0000)), None);
    }

    #[test]
    fn mappings_enumerates_pairs() {
        let idmap = Idmap::parse(&sample_idmap()).unwrap();
        let pairs = idmap.mappings(0x7f);
        assert_eq!(
            pairs,
            vec![
                (ResourceId(0x7f02_0001), ResourceId(0x0a02_0000)),
                (ResourceId(0x7f02_0002), ResourceId(0x0a02_0001)),
            ]
        );
    }
}
