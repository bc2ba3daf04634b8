//! Process-wide cache of parsed resource tables, one per asset path.
//!
//! Several managers loading the same package share one parsed snapshot
//! instead of each paying for the parse. The parse itself runs outside
//! the registry lock; when two threads race, the first to publish wins
//! and the loser discards its own result.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::debug;
use once_cell::sync::Lazy;
use restable_arsc::ResourceTable;

use crate::errors::ManagerError;

struct CacheEntry {
    mod_when: u64,
    table: Arc<ResourceTable>,
}

static OPEN_TABLES: Lazy<Mutex<HashMap<PathBuf, CacheEntry, ahash::RandomState>>> =
    Lazy::new(|| Mutex::new(HashMap::default()));

fn lock() -> std::sync::MutexGuard<'static, HashMap<PathBuf, CacheEntry, ahash::RandomState>> {
    OPEN_TABLES.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Fetch the shared table for `path`, parsing with `parse` when the
/// cache has no entry or the cached one's stamp no longer matches
/// `mod_when`.
pub fn get_or_publish<F>(
    path: &Path,
    mod_when: u64,
    parse: F,
) -> Result<Arc<ResourceTable>, ManagerError>
where
    F: FnOnce() -> Result<ResourceTable, ManagerError>,
{
    if let Some(entry) = lock().get(path) {
        if mod_when != 0 && entry.mod_when == mod_when {
            return Ok(Arc::clone(&entry.table));
        }
        debug!("cached table for {path:?} is stale");
    }

    // parse without holding the registry lock
    let table = Arc::new(parse()?);

    let mut cache = lock();
    match cache.get(path) {
        // somebody else published a fresh entry while we parsed;
        // discard ours and use theirs
        Some(entry) if mod_when != 0 && entry.mod_when == mod_when => Ok(Arc::clone(&entry.table)),
        _ => {
            debug!("publishing table for {path:?} (stamp {mod_when})");
            cache.insert(
                path.to_path_buf(),
                CacheEntry {
                    mod_when,
                    table: Arc::clone(&table),
                },
            );
            Ok(table)
        }
    }
}

/// Drop the cached table for `path`, if any
pub fn evict(path: &Path) {
    lock().remove(path);
}
