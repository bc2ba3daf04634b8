pub mod errors;
pub mod idmap;
pub mod redirection;
pub mod structs;
pub mod table;

pub use errors::ArscError;
pub use idmap::{Idmap, IdmapInfo};
pub use redirection::PackageRedirectionMap;
pub use structs::{ConfigFlags, ResTableConfig, ResValue, StringPool, ValueType};
pub use table::{
    Bag, BagEntry, MAX_REFERENCE_DEPTH, Package, PackageGroup, ResolvedValue, ResourceId,
    ResourceTable,
};
