pub mod res_chunk_header;
pub mod res_string_pool;
pub mod res_table_config;
pub mod res_value;
pub mod resource_table;

pub use res_chunk_header::{Chunk, ChunkIter, ChunkType, ResChunkHeader};
pub use res_string_pool::{ResStringPoolSpan, StringPool, StringPoolFlags, expect_string_pool};
pub use res_table_config::{ConfigFlags, ResTableConfig};
pub use res_value::{ResValue, ValueType};
pub use resource_table::{
    EntryFlags, NO_ENTRY, ResTableEntry, ResTableHeader, ResTableLibrary, ResTableMap,
    ResTableMapEntry, ResTablePackageHeader, ResTableType, ResTableTypeSpec, ResTableValueEntry,
    SpecFlags, skip_unhandled_chunk,
};
