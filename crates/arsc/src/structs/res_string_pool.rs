use bitflags::bitflags;
use log::warn;
use winnow::binary::{le_u8, le_u16, le_u32};
use winnow::combinator::repeat;
use winnow::prelude::*;
use winnow::token::take;

use crate::errors::ArscError;
use crate::structs::res_chunk_header::Chunk;

bitflags! {
    #[derive(Debug, Clone, Copy)]
    pub struct StringPoolFlags: u32 {
        /// String indices are sorted by value; `index_of` may binary search
        const SORTED = 1 << 0;

        /// Strings are encoded as UTF-8 instead of UTF-16
        const UTF8 = 1 << 8;
    }
}

/// A styled range inside a pooled string. `name` is a back-reference into
/// the same pool naming the span (e.g. an XML tag), `first_char` and
/// `last_char` bound the styled characters inclusively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResStringPoolSpan {
    pub name: u32,
    pub first_char: u32,
    pub last_char: u32,
}

impl ResStringPoolSpan {
    /// Terminates the span list of a style entry
    pub const END: u32 = 0xFFFF_FFFF;
}

/// An immutable pool of strings, decoded once at parse time.
///
/// Both encodings resolve to owned `String`s up front, so `string_at` is
/// O(1) and the pool can be shared across threads without any interior
/// mutability.
#[derive(Debug, Clone)]
pub struct StringPool {
    flags: StringPoolFlags,
    strings: Vec<String>,
    styles: Vec<Vec<ResStringPoolSpan>>,
}

impl StringPool {
    pub fn parse(chunk: &Chunk) -> Result<StringPool, ArscError> {
        let mut ext = chunk.header_ext();
        let (string_count, style_count, flags, strings_start, styles_start) =
            (le_u32, le_u32, le_u32, le_u32, le_u32)
                .parse_next(&mut ext)
                .map_err(|_: winnow::error::ErrMode<winnow::error::ContextError>| {
                    ArscError::CorruptPool("truncated pool header")
                })?;

        let flags = StringPoolFlags::from_bits_truncate(flags);
        let data = chunk.data();
        let size = chunk.header.size as usize;

        let strings_start = strings_start as usize;
        let styles_start = styles_start as usize;
        if strings_start > size || (styles_start != 0 && styles_start > size) {
            return Err(ArscError::CorruptPool("pool data start beyond chunk end"));
        }

        let mut offsets = chunk.payload();
        let string_offsets: Vec<u32> = repeat(string_count as usize, le_u32)
            .parse_next(&mut offsets)
            .map_err(|_: winnow::error::ErrMode<winnow::error::ContextError>| {
                ArscError::CorruptPool("string offset table extends past chunk")
            })?;
        let style_offsets: Vec<u32> = repeat(style_count as usize, le_u32)
            .parse_next(&mut offsets)
            .map_err(|_: winnow::error::ErrMode<winnow::error::ContextError>| {
                ArscError::CorruptPool("style offset table extends past chunk")
            })?;

        // string payload ends where styles begin (or at the chunk end)
        let strings_end = if styles_start != 0 { styles_start } else { size };
        if strings_end < strings_start {
            return Err(ArscError::CorruptPool("style data precedes string data"));
        }
        let string_region = &data[strings_start..strings_end];

        let is_utf8 = flags.contains(StringPoolFlags::UTF8);
        let mut strings = Vec::with_capacity(string_offsets.len());
        for &offset in &string_offsets {
            let offset = offset as usize;
            if offset >= string_region.len() {
                return Err(ArscError::CorruptPool("string offset outside pool payload"));
            }
            strings.push(Self::parse_string(&mut &string_region[offset..], is_utf8)?);
        }

        let mut styles = Vec::with_capacity(style_offsets.len());
        if !style_offsets.is_empty() {
            let style_region = &data[styles_start..size];
            for &offset in &style_offsets {
                let offset = offset as usize;
                if offset >= style_region.len() {
                    return Err(ArscError::CorruptPool("style offset outside pool payload"));
                }
                styles.push(Self::parse_style(&mut &style_region[offset..])?);
            }
        }

        Ok(StringPool {
            flags,
            strings,
            styles,
        })
    }

    /// An empty pool, for packages that declare no key or type strings
    pub fn empty() -> StringPool {
        StringPool {
            flags: StringPoolFlags::empty(),
            strings: Vec::new(),
            styles: Vec::new(),
        }
    }

    fn parse_string(input: &mut &[u8], is_utf8: bool) -> Result<String, ArscError> {
        Self::parse_string_inner(input, is_utf8)
            .map_err(|_| ArscError::CorruptPool("string data extends past pool payload"))
    }

    fn parse_string_inner(input: &mut &[u8], is_utf8: bool) -> ModalResult<String> {
        if !is_utf8 {
            // 2-byte length in UTF-16 code units; high bit signals a
            // second word carrying the low 16 bits of an extended length
            let len = le_u16(input)?;
            let real_len = if len & 0x8000 != 0 {
                let low: u16 = le_u16(input)?;
                (((len & 0x7FFF) as u32) << 16 | low as u32) as usize
            } else {
                len as usize
            };

            let content = take(real_len * 2).parse_next(input)?;
            // NUL terminator
            let _ = le_u16(input)?;

            Ok(Self::read_utf16(content, real_len))
        } else {
            // UTF-8 entries carry two lengths: the UTF-16 code-unit count
            // (unused here) and the byte length of the encoded data
            let _utf16_len = Self::parse_utf8_length(input)?;
            let byte_len = Self::parse_utf8_length(input)?;

            let content = take(byte_len).parse_next(input)?;
            // NUL terminator
            let _ = le_u8(input)?;

            Ok(String::from_utf8_lossy(content).to_string())
        }
    }

    fn parse_utf8_length(input: &mut &[u8]) -> ModalResult<u32> {
        let first = le_u8(input)?;
        if first & 0x80 != 0 {
            let second = le_u8(input)?;
            Ok((((first & 0x7F) as u32) << 8) | second as u32)
        } else {
            Ok(first as u32)
        }
    }

    fn read_utf16(slice: &[u8], size: usize) -> String {
        std::char::decode_utf16(
            slice
                .chunks_exact(2)
                .take(size)
                .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]])),
        )
        .collect::<Result<String, _>>()
        .unwrap_or_default()
    }

    fn parse_style(input: &mut &[u8]) -> Result<Vec<ResStringPoolSpan>, ArscError> {
        let mut spans = Vec::new();
        loop {
            let mut cursor = *input;
            let name = le_u32::<_, winnow::error::ContextError>(&mut cursor)
                .map_err(|_| ArscError::CorruptPool("style spans extend past pool payload"))?;
            if name == ResStringPoolSpan::END {
                break;
            }

            let (first_char, last_char) = (le_u32, le_u32)
                .parse_next(&mut cursor)
                .map_err(|_: winnow::error::ErrMode<winnow::error::ContextError>| {
                    ArscError::CorruptPool("style spans extend past pool payload")
                })?;
            spans.push(ResStringPoolSpan {
                name,
                first_char,
                last_char,
            });
            *input = cursor;
        }
        Ok(spans)
    }

    pub fn string_at(&self, index: u32) -> Option<&str> {
        self.strings.get(index as usize).map(String::as_str)
    }

    pub fn style_at(&self, index: u32) -> Option<&[ResStringPoolSpan]> {
        self.styles.get(index as usize).map(Vec::as_slice)
    }

    /// Find the index of `needle`. Binary search is only valid when the
    /// pool carries the SORTED flag; otherwise this degrades to a linear
    /// scan and callers must not rely on its speed.
    pub fn index_of(&self, needle: &str) -> Option<u32> {
        if self.is_sorted() {
            match self.strings.binary_search_by(|s| s.as_str().cmp(needle)) {
                Ok(idx) => Some(idx as u32),
                Err(_) => None,
            }
        } else {
            self.strings
                .iter()
                .position(|s| s == needle)
                .map(|idx| idx as u32)
        }
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    #[inline]
    pub fn is_sorted(&self) -> bool {
        self.flags.contains(StringPoolFlags::SORTED)
    }

    #[inline]
    pub fn is_utf8(&self) -> bool {
        self.flags.contains(StringPoolFlags::UTF8)
    }
}

/// Parse the pool chunk if it is one, warning on anything else
pub fn expect_string_pool(chunk: &Chunk) -> Result<StringPool, ArscError> {
    if chunk.type_() != crate::structs::res_chunk_header::ChunkType::StringPool {
        warn!("expected string pool chunk, got {:?}", chunk.type_());
        return Err(ArscError::CorruptPool("missing string pool chunk"));
    }
    StringPool::parse(chunk)
}
