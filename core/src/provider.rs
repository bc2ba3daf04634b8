use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use log::debug;

/// Source of raw asset bytes for a [`ResourceManager`].
///
/// The manager never touches the filesystem itself; everything it loads
/// comes through one of these.
///
/// [`ResourceManager`]: crate::manager::ResourceManager
pub trait AssetProvider {
    /// Raw bytes of the resource table stored under `path`
    fn open_package_stream(&self, path: &Path) -> Option<Vec<u8>>;

    /// Raw bytes of an idmap file
    fn open_idmap(&self, path: &Path) -> Option<Vec<u8>>;

    /// Modification stamp for `path`, used to invalidate shared parses.
    /// 0 means unknown; unknown stamps never match a cached one.
    fn mod_when(&self, path: &Path) -> u64;
}

/// Assets as plain files under a root directory
pub struct DirAssetProvider {
    root: PathBuf,
}

impl DirAssetProvider {
    pub fn new(root: impl Into<PathBuf>) -> DirAssetProvider {
        DirAssetProvider { root: root.into() }
    }

    fn read(&self, path: &Path) -> Option<Vec<u8>> {
        let full = self.root.join(path);
        match fs::read(&full) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                debug!("cannot read {full:?}: {err}");
                None
            }
        }
    }
}

impl AssetProvider for DirAssetProvider {
    fn open_package_stream(&self, path: &Path) -> Option<Vec<u8>> {
        self.read(path)
    }

    fn open_idmap(&self, path: &Path) -> Option<Vec<u8>> {
        self.read(path)
    }

    fn mod_when(&self, path: &Path) -> u64 {
        fs::metadata(self.root.join(path))
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// In-memory assets, keyed by path
#[derive(Default)]
pub struct MemAssetProvider {
    files: HashMap<PathBuf, Vec<u8>, ahash::RandomState>,
    stamps: HashMap<PathBuf, u64, ahash::RandomState>,
}

impl MemAssetProvider {
    pub fn new() -> MemAssetProvider {
        MemAssetProvider::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, bytes: Vec<u8>) {
        let path = path.into();
        self.stamps.insert(path.clone(), 1);
        self.files.insert(path, bytes);
    }

    /// Bump the modification stamp without changing the bytes
    pub fn touch(&mut self, path: &Path) {
        if let Some(stamp) = self.stamps.get_mut(path) {
            *stamp += 1;
        }
    }
}

impl AssetProvider for MemAssetProvider {
    fn open_package_stream(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.get(path).cloned()
    }

    fn open_idmap(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.get(path).cloned()
    }

    fn mod_when(&self, path: &Path) -> u64 {
        self.stamps.get(path).copied().unwrap_or(0)
    }
}
