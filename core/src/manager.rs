use std::path::{Path, PathBuf};

use log::{debug, info};
use restable_arsc::structs::ResTableConfig;
use restable_arsc::{Bag, ResolvedValue, ResourceId, ResourceTable, ResValue};

use crate::errors::ManagerError;
use crate::provider::AssetProvider;
use crate::registry;

/// Facade composing resource packages loaded through an
/// [`AssetProvider`] into one queryable [`ResourceTable`].
///
/// Packages are added in load order; overlays for an already-added
/// package go through [`add_overlay_path`](Self::add_overlay_path) with
/// the idmap that renumbers them back into the target's ID space.
pub struct ResourceManager<P: AssetProvider> {
    provider: P,
    table: ResourceTable,
    paths: Vec<PathBuf>,
}

impl<P: AssetProvider> ResourceManager<P> {
    pub fn new(provider: P) -> ResourceManager<P> {
        ResourceManager {
            provider,
            table: ResourceTable::new(),
            paths: Vec::new(),
        }
    }

    /// Load the resource table at `path` and merge it in. Returns the
    /// cookie identifying this source in lookups.
    pub fn add_asset_path(&mut self, path: &Path) -> Result<u32, ManagerError> {
        let bytes = self
            .provider
            .open_package_stream(path)
            .ok_or_else(|| ManagerError::MissingAsset(path.to_path_buf()))?;

        // publish (or reuse) the shared per-path parse, then graft the
        // snapshot in under this manager's cookie; the bytes are parsed
        // once per process regardless of how many managers load them
        let shared = registry::get_or_publish(path, self.provider.mod_when(path), || {
            let mut table = ResourceTable::new();
            table.add(&bytes, 0, None)?;
            Ok(table)
        })?;
        if shared.is_empty() {
            return Err(ManagerError::NoResources(path.to_path_buf()));
        }

        let cookie = self.paths.len() as u32;
        self.table.add_table(&shared, cookie);
        info!("added {path:?} as cookie {cookie}");
        self.paths.push(path.to_path_buf());
        Ok(cookie)
    }

    /// Load an overlay package and remap it over its target using the
    /// idmap at `idmap_path`. The target package must already be added.
    pub fn add_overlay_path(&mut self, path: &Path, idmap_path: &Path) -> Result<u32, ManagerError> {
        let bytes = self
            .provider
            .open_package_stream(path)
            .ok_or_else(|| ManagerError::MissingAsset(path.to_path_buf()))?;
        let idmap = self
            .provider
            .open_idmap(idmap_path)
            .ok_or_else(|| ManagerError::MissingAsset(idmap_path.to_path_buf()))?;

        self.merge(path, &bytes, &idmap)
    }

    fn merge(&mut self, path: &Path, bytes: &[u8], idmap: &[u8]) -> Result<u32, ManagerError> {
        let cookie = self.paths.len() as u32;
        let before_empty = self.table.is_empty();
        self.table.add(bytes, cookie, Some(idmap))?;
        if before_empty && self.table.is_empty() {
            return Err(ManagerError::NoResources(path.to_path_buf()));
        }

        info!("added {path:?} as cookie {cookie}");
        self.paths.push(path.to_path_buf());
        Ok(cookie)
    }

    /// Path that was loaded under `cookie`
    pub fn asset_path(&self, cookie: u32) -> Option<&Path> {
        self.paths.get(cookie as usize).map(PathBuf::as_path)
    }

    /// At least one package has been loaded
    pub fn has_resources(&self) -> bool {
        !self.table.is_empty()
    }

    pub fn set_configuration(&mut self, config: ResTableConfig) {
        debug!("configuration set to {}", config.to_qualifier_string());
        self.table.set_parameters(config);
    }

    pub fn configuration(&self) -> &ResTableConfig {
        self.table.parameters()
    }

    pub fn get_resource(&self, id: ResourceId) -> Option<ResolvedValue> {
        self.table.get_resource(id)
    }

    pub fn get_resource_with_density(&self, id: ResourceId, density: u16) -> Option<ResolvedValue> {
        self.table.get_resource_with_density(id, density)
    }

    pub fn resolve_reference(
        &self,
        value: ResValue,
        cookie: u32,
    ) -> Result<ResolvedValue, ManagerError> {
        Ok(self.table.resolve_reference(value, cookie)?)
    }

    pub fn get_bag(&self, id: ResourceId) -> Result<Option<Bag>, ManagerError> {
        Ok(self.table.get_bag(id)?)
    }

    pub fn identifier_for_name(
        &self,
        name: &str,
        def_type: Option<&str>,
        def_package: Option<&str>,
    ) -> Option<ResourceId> {
        self.table.identifier_for_name(name, def_type, def_package)
    }

    pub fn get_locales(&self) -> Vec<String> {
        self.table.get_locales()
    }

    pub fn value_string(&self, resolved: &ResolvedValue) -> Option<&str> {
        self.table.value_string(resolved)
    }

    /// The composed table, for callers needing the full lookup surface
    pub fn table(&self) -> &ResourceTable {
        &self.table
    }
}
