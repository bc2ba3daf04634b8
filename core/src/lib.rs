pub mod errors;
pub mod manager;
pub mod provider;
pub mod registry;

pub use errors::ManagerError;
pub use manager::ResourceManager;
pub use provider::{AssetProvider, DirAssetProvider, MemAssetProvider};

// the whole parsing/lookup surface, re-exported for callers that only
// depend on this crate
pub use restable_arsc as arsc;
