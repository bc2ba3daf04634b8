use std::collections::BTreeSet;
use std::fmt;

use log::{debug, info, warn};
use smallvec::SmallVec;

use crate::errors::ArscError;
use crate::idmap::Idmap;
use crate::redirection::PackageRedirectionMap;
use crate::structs::{
    Chunk, ChunkIter, ChunkType, ResTableConfig, ResTableEntry, ResTableHeader, ResTableLibrary,
    ResTablePackageHeader, ResTableType, ResTableTypeSpec, ResValue, StringPool,
    expect_string_pool, skip_unhandled_chunk,
};

/// Reference and bag-parent chains longer than this are reported as
/// cycles instead of being followed further
pub const MAX_REFERENCE_DEPTH: u32 = 20;

/// A resource identifier in `0xPPTTEEEE` form: package, type, entry
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(pub u32);

impl ResourceId {
    #[inline(always)]
    pub fn make(package: u8, type_id: u8, entry: u16) -> ResourceId {
        ResourceId(((package as u32) << 24) | ((type_id as u32) << 16) | entry as u32)
    }

    #[inline(always)]
    pub fn raw(self) -> u32 {
        self.0
    }

    #[inline(always)]
    pub fn package(self) -> u8 {
        (self.0 >> 24) as u8
    }

    #[inline(always)]
    pub fn type_id(self) -> u8 {
        ((self.0 >> 16) & 0xff) as u8
    }

    #[inline(always)]
    pub fn entry(self) -> u16 {
        (self.0 & 0xffff) as u16
    }

    /// A usable identifier has non-zero package and type bytes
    #[inline(always)]
    pub fn is_valid(self) -> bool {
        self.package() != 0 && self.type_id() != 0
    }
}

impl fmt::Debug for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceId(0x{:08x})", self.0)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// One parsed package chunk: symbol pools plus entry data grouped by
/// type id and configuration variant
#[derive(Clone)]
pub struct Package {
    pub id: u8,
    pub name: String,

    /// Which `add` call this package came from
    pub cookie: u32,

    pub type_strings: StringPool,
    pub key_strings: StringPool,

    /// Indexed by type id - 1
    specs: Vec<Option<ResTableTypeSpec>>,

    /// Indexed by type id - 1; one inner element per configuration
    /// variant, in file order
    types: Vec<Vec<ResTableType>>,
}

impl Package {
    fn type_slot_mut(types: &mut Vec<Vec<ResTableType>>, id: u8) -> &mut Vec<ResTableType> {
        let slot = (id - 1) as usize;
        if slot >= types.len() {
            types.resize_with(slot + 1, Vec::new);
        }
        &mut types[slot]
    }

    /// Configuration variants packaged for `type_id`
    pub fn type_variants(&self, type_id: u8) -> &[ResTableType] {
        if type_id == 0 {
            return &[];
        }
        self.types
            .get((type_id - 1) as usize)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Whether the given entry was declared public in its type spec
    pub fn is_public(&self, id: ResourceId) -> bool {
        if id.type_id() == 0 {
            return false;
        }
        self.specs
            .get((id.type_id() - 1) as usize)
            .and_then(|s| s.as_ref())
            .map(|s| s.is_public(id.entry()))
            .unwrap_or(false)
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }
}

impl fmt::Debug for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Package")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("cookie", &self.cookie)
            .field("types", &self.types.len())
            .finish()
    }
}

/// All packages sharing one package id: the base first, overlays after
/// it in load order
#[derive(Debug)]
pub struct PackageGroup {
    pub id: u8,
    pub name: String,
    pub packages: Vec<Package>,
}

/// The global value string pool of one added table chunk
#[derive(Clone)]
struct TableSource {
    cookie: u32,
    values: StringPool,
}

/// A value picked out of the table, together with where it came from
#[derive(Debug, Clone, Copy)]
pub struct ResolvedValue {
    pub value: ResValue,

    /// Cookie of the `add` call whose data holds the value; string
    /// values index that source's value pool
    pub cookie: u32,

    /// Configuration of the variant the value was taken from
    pub config: ResTableConfig,
}

/// One name/value pair of a flattened bag. Each pair remembers the
/// source its value came from: an inherited pair keeps the parent's
/// cookie, so string values resolve against the right value pool.
#[derive(Debug, Clone, Copy)]
pub struct BagEntry {
    pub name: u32,
    pub value: ResValue,
    pub cookie: u32,
}

pub type BagEntries = SmallVec<[BagEntry; 16]>;

/// A flattened complex entry: the parent chain merged into one ordered
/// pair list, child values shadowing parent values of the same name
#[derive(Debug, Clone)]
pub struct Bag {
    /// Resource identifier of the immediate parent, 0 if none
    pub parent: u32,

    /// Cookie of the child entry itself
    pub cookie: u32,
    pub entries: BagEntries,
}

struct EntryMatch<'a> {
    entry: &'a ResTableEntry,
    config: ResTableConfig,
    cookie: u32,
}

/// Resource entries composed from one or more table chunks, queried
/// against a device configuration.
///
/// Reads take `&self`; `add`, `set_parameters` and the redirection
/// setters take `&mut self`. Callers sharing a table across threads
/// serialize mutation through that distinction.
pub struct ResourceTable {
    sources: Vec<TableSource>,
    package_groups: Vec<PackageGroup>,

    /// Package id -> package group index + 1; 0 means unused
    package_map: [u8; 256],

    parameters: ResTableConfig,
    redirections: Vec<PackageRedirectionMap>,
}

impl Default for ResourceTable {
    fn default() -> ResourceTable {
        ResourceTable {
            sources: Vec::new(),
            package_groups: Vec::new(),
            package_map: [0; 256],
            parameters: ResTableConfig::default(),
            redirections: Vec::new(),
        }
    }
}

impl ResourceTable {
    pub fn new() -> ResourceTable {
        ResourceTable::default()
    }

    /// Merge an already-parsed table in, retagging everything under
    /// `cookie`. This is how a shared per-path parse is reused: the
    /// registry parses once, every composer copies the packages instead
    /// of paying for the parse again.
    pub fn add_table(&mut self, other: &ResourceTable, cookie: u32) {
        for source in &other.sources {
            self.sources.push(TableSource {
                cookie,
                values: source.values.clone(),
            });
        }
        for group in &other.package_groups {
            for pkg in &group.packages {
                let mut pkg = pkg.clone();
                pkg.cookie = cookie;
                self.register_package(pkg);
            }
        }
    }

    /// Parse a resource table chunk and merge its packages in.
    ///
    /// `cookie` tags every value taken from this data so string lookups
    /// can find the right value pool. An overlay whose entries were
    /// renumbered at build time passes its `idmap` so they are remapped
    /// back into the target package's ID space.
    ///
    /// A package that fails to parse is logged and skipped; the rest of
    /// the chunk is still used. Callers that need "nothing was loaded"
    /// to be fatal check [`is_empty`](Self::is_empty) afterwards.
    pub fn add(&mut self, data: &[u8], cookie: u32, idmap: Option<&[u8]>) -> Result<(), ArscError> {
        if data.len() < 12 {
            return Err(ArscError::TooSmall);
        }

        let idmap = match idmap {
            Some(bytes) => Some(Idmap::parse(bytes)?),
            None => None,
        };

        let mut input = data;
        let table = Chunk::next(&mut input)?;
        if table.type_() != ChunkType::Table {
            return Err(ArscError::MalformedTable("top-level chunk is not a table"));
        }

        let header = ResTableHeader::parse(&table)?;
        debug!(
            "adding table (cookie {}): {} package(s) declared",
            cookie, header.package_count
        );

        let mut values = None;
        let mut added = 0u32;
        for item in ChunkIter::new(table.payload()) {
            let chunk = item?;
            match chunk.type_() {
                ChunkType::StringPool if values.is_none() => {
                    values = Some(expect_string_pool(&chunk)?);
                }
                ChunkType::TablePackage => {
                    match self.parse_package(&chunk, cookie, idmap.as_ref()) {
                        Ok(pkg) => {
                            self.register_package(pkg);
                            added += 1;
                        }
                        Err(err) => warn!("skipping unusable package: {err}"),
                    }
                }
                _ => skip_unhandled_chunk(&chunk),
            }
        }

        if added != header.package_count {
            warn!(
                "table declared {} package(s) but {} were loaded",
                header.package_count, added
            );
        }

        self.sources.push(TableSource {
            cookie,
            values: values.unwrap_or_else(StringPool::empty),
        });
        Ok(())
    }

    /// No package has been successfully added
    pub fn is_empty(&self) -> bool {
        self.package_groups.is_empty()
    }

    pub fn set_parameters(&mut self, config: ResTableConfig) {
        self.parameters = config;
    }

    pub fn parameters(&self) -> &ResTableConfig {
        &self.parameters
    }

    /// Value pool of the table data added under `cookie`
    pub fn string_pool(&self, cookie: u32) -> Option<&StringPool> {
        self.sources
            .iter()
            .find(|s| s.cookie == cookie)
            .map(|s| &s.values)
    }

    /// The string a string-typed value refers to
    pub fn value_string(&self, resolved: &ResolvedValue) -> Option<&str> {
        self.string_pool(resolved.cookie)?
            .string_at(resolved.value.data)
    }

    /// Same as [`value_string`](Self::value_string) for a bag pair,
    /// resolving against the pool of the source the pair came from
    pub fn bag_value_string(&self, entry: &BagEntry) -> Option<&str> {
        self.string_pool(entry.cookie)?.string_at(entry.value.data)
    }

    fn parse_package(
        &self,
        chunk: &Chunk,
        cookie: u32,
        idmap: Option<&Idmap>,
    ) -> Result<Package, ArscError> {
        let header = ResTablePackageHeader::parse(chunk)?;
        if header.id == 0 || header.id > 255 {
            return Err(ArscError::MalformedTable("package id out of range"));
        }

        let type_strings = Self::pool_at(chunk, header.type_strings)?;
        let key_strings = Self::pool_at(chunk, header.key_strings)?;

        let mut specs: Vec<Option<ResTableTypeSpec>> = Vec::new();
        let mut types: Vec<Vec<ResTableType>> = Vec::new();

        for item in ChunkIter::new(chunk.payload()) {
            let child = item?;
            match child.type_() {
                // symbol pools were already resolved through the
                // header's chunk-relative offsets
                ChunkType::StringPool => {}
                ChunkType::TableTypeSpec => {
                    let spec = ResTableTypeSpec::parse(&child)?;
                    let slot = (spec.id - 1) as usize;
                    if slot >= specs.len() {
                        specs.resize_with(slot + 1, || None);
                    }
                    specs[slot] = Some(spec);
                }
                ChunkType::TableType => {
                    let variant = ResTableType::parse(&child)?;
                    Package::type_slot_mut(&mut types, variant.id).push(variant);
                }
                ChunkType::TableLibrary => {
                    let library = ResTableLibrary::parse(&child)?;
                    for (id, name) in &library.entries {
                        debug!("shared library reference: 0x{id:02x} {name}");
                    }
                }
                _ => skip_unhandled_chunk(&child),
            }
        }

        let pkg = Package {
            id: header.id as u8,
            name: header.name(),
            cookie,
            type_strings,
            key_strings,
            specs,
            types,
        };

        match idmap {
            Some(idmap) => self.remap_package(pkg, idmap),
            None => Ok(pkg),
        }
    }

    fn pool_at(chunk: &Chunk, offset: u32) -> Result<StringPool, ArscError> {
        if offset == 0 {
            return Ok(StringPool::empty());
        }
        let mut at = chunk.slice_from(offset)?;
        let pool_chunk = Chunk::next(&mut at)?;
        expect_string_pool(&pool_chunk)
    }

    /// Rewrite a renumbered overlay package into the target package's
    /// ID space using its idmap. The target package id is taken from
    /// the first loaded group, so the base package must be added first.
    fn remap_package(&self, pkg: Package, idmap: &Idmap) -> Result<Package, ArscError> {
        let Some(target_id) = self.package_groups.first().map(|g| g.id) else {
            return Err(ArscError::MalformedTable(
                "overlay with idmap added before its target package",
            ));
        };

        let mut types: Vec<Vec<ResTableType>> = Vec::new();
        let mut remapped = 0usize;
        for (target, overlay) in idmap.mappings(target_id) {
            for variant in pkg.type_variants(overlay.type_id()) {
                let Some(entry) = variant.entry(overlay.entry()) else {
                    continue;
                };

                let slot = Package::type_slot_mut(&mut types, target.type_id());
                let at = match slot.iter().position(|t| t.config == variant.config) {
                    Some(at) => at,
                    None => {
                        slot.push(ResTableType {
                            id: target.type_id(),
                            config: variant.config,
                            entries: Vec::new(),
                        });
                        slot.len() - 1
                    }
                };
                let out = &mut slot[at];

                let index = target.entry() as usize;
                if index >= out.entries.len() {
                    out.entries.resize(index + 1, ResTableEntry::None);
                }
                out.entries[index] = entry.clone();
                remapped += 1;
            }
        }

        info!(
            "remapped {} overlay entrie(s) from package 0x{:02x} into 0x{:02x}",
            remapped, pkg.id, target_id
        );

        Ok(Package {
            id: target_id,
            name: pkg.name,
            cookie: pkg.cookie,
            type_strings: pkg.type_strings,
            key_strings: pkg.key_strings,
            // spec flags describe the overlay's own numbering; they do
            // not survive the remap
            specs: Vec::new(),
            types,
        })
    }

    fn register_package(&mut self, pkg: Package) {
        let slot = self.package_map[pkg.id as usize];
        if slot != 0 {
            let group = &mut self.package_groups[(slot - 1) as usize];
            debug!(
                "package 0x{:02x} '{}' joins group '{}' as overlay #{}",
                pkg.id,
                pkg.name,
                group.name,
                group.packages.len()
            );
            group.packages.push(pkg);
            return;
        }

        info!("registering package 0x{:02x} '{}'", pkg.id, pkg.name);
        let id = pkg.id;
        self.package_groups.push(PackageGroup {
            id,
            name: pkg.name.clone(),
            packages: vec![pkg],
        });
        self.package_map[id as usize] = self.package_groups.len() as u8;
    }

    /// Install a theme redirection map; consulted by every lookup until
    /// cleared
    pub fn add_redirections(&mut self, map: PackageRedirectionMap) {
        self.redirections.push(map);
    }

    pub fn clear_redirections(&mut self) {
        self.redirections.clear();
    }

    /// Apply at most one redirection hop to `id`
    fn redirect(&self, id: ResourceId) -> ResourceId {
        for map in &self.redirections {
            let to = map.lookup_redirection(id);
            if to != 0 {
                debug!("redirecting {} -> 0x{to:08x}", id);
                return ResourceId(to);
            }
        }
        id
    }

    /// Best-matching plain value for `id` under the current parameters
    pub fn get_resource(&self, id: ResourceId) -> Option<ResolvedValue> {
        self.get_resource_for(id, &self.parameters)
    }

    /// Like [`get_resource`](Self::get_resource) but with the requested
    /// density overridden; 0 keeps the configured density
    pub fn get_resource_with_density(&self, id: ResourceId, density: u16) -> Option<ResolvedValue> {
        let mut requested = self.parameters;
        if density != 0 {
            requested.density = density;
        }
        self.get_resource_for(id, &requested)
    }

    fn get_resource_for(&self, id: ResourceId, requested: &ResTableConfig) -> Option<ResolvedValue> {
        let id = self.redirect(id);
        let found = self.best_entry(id, requested)?;

        match found.entry {
            ResTableEntry::Value(e) => Some(ResolvedValue {
                value: e.value,
                cookie: found.cookie,
                config: found.config,
            }),
            ResTableEntry::Complex(_) => {
                debug!("{} is a bag, not a plain value", id);
                None
            }
            ResTableEntry::None => None,
        }
    }

    /// Select the best present entry for `id` across every package of
    /// its group: configurations must match the request, better-than
    /// ordering picks the winner, and on an exact tie the later package
    /// wins so overlays shadow their base.
    fn best_entry(&self, id: ResourceId, requested: &ResTableConfig) -> Option<EntryMatch<'_>> {
        if !id.is_valid() {
            return None;
        }
        let slot = self.package_map[id.package() as usize];
        if slot == 0 {
            return None;
        }
        let group = &self.package_groups[(slot - 1) as usize];

        let mut best: Option<EntryMatch<'_>> = None;
        for pkg in &group.packages {
            for variant in pkg.type_variants(id.type_id()) {
                let Some(entry) = variant.entry(id.entry()) else {
                    continue;
                };
                if !variant.config.matches(requested) {
                    continue;
                }

                let take = match &best {
                    None => true,
                    Some(current) => {
                        variant.config == current.config
                            || variant.config.is_better_than(&current.config, Some(requested))
                    }
                };
                if take {
                    best = Some(EntryMatch {
                        entry,
                        config: variant.config,
                        cookie: pkg.cookie,
                    });
                }
            }
        }
        best
    }

    /// Follow a chain of reference values until a concrete value is
    /// reached. A dangling reference stops the walk and yields the
    /// reference itself; a chain longer than [`MAX_REFERENCE_DEPTH`] is
    /// a cycle.
    pub fn resolve_reference(
        &self,
        value: ResValue,
        cookie: u32,
    ) -> Result<ResolvedValue, ArscError> {
        let mut current = ResolvedValue {
            value,
            cookie,
            config: ResTableConfig::ANY,
        };

        for _ in 0..MAX_REFERENCE_DEPTH {
            if !current.value.is_reference() || current.value.data == 0 {
                return Ok(current);
            }
            match self.get_resource(ResourceId(current.value.data)) {
                Some(next) => current = next,
                None => {
                    debug!("reference 0x{:08x} has no target", current.value.data);
                    return Ok(current);
                }
            }
        }

        Err(ArscError::CyclicReference(current.value.data))
    }

    /// Flattened bag for a complex entry, parent chain merged in.
    /// `Ok(None)` when the id does not name a complex entry.
    pub fn get_bag(&self, id: ResourceId) -> Result<Option<Bag>, ArscError> {
        self.bag_at_depth(id, 0)
    }

    fn bag_at_depth(&self, id: ResourceId, depth: u32) -> Result<Option<Bag>, ArscError> {
        if depth >= MAX_REFERENCE_DEPTH {
            return Err(ArscError::CyclicReference(id.raw()));
        }

        let id = self.redirect(id);
        let Some(found) = self.best_entry(id, &self.parameters) else {
            return Ok(None);
        };
        let ResTableEntry::Complex(map_entry) = found.entry else {
            return Ok(None);
        };

        let mut entries: BagEntries = match map_entry.parent {
            0 => SmallVec::new(),
            parent => match self.bag_at_depth(ResourceId(parent), depth + 1)? {
                Some(parent_bag) => parent_bag.entries,
                None => {
                    warn!("bag {} inherits from missing parent 0x{:08x}", id, map_entry.parent);
                    SmallVec::new()
                }
            },
        };

        // child pairs override inherited pairs of the same name and
        // append otherwise; inherited pairs keep their own cookie
        for pair in &map_entry.entries {
            let entry = BagEntry {
                name: pair.name,
                value: pair.value,
                cookie: found.cookie,
            };
            match entries.iter_mut().find(|e| e.name == pair.name) {
                Some(existing) => *existing = entry,
                None => entries.push(entry),
            }
        }

        Ok(Some(Bag {
            parent: map_entry.parent,
            cookie: found.cookie,
            entries,
        }))
    }

    /// Resolve `"[package:][type/]entry"` (an optional leading `@` is
    /// accepted) to a resource identifier. Packages are searched in
    /// load order and the first key match wins.
    pub fn identifier_for_name(
        &self,
        name: &str,
        def_type: Option<&str>,
        def_package: Option<&str>,
    ) -> Option<ResourceId> {
        let name = name.strip_prefix('@').unwrap_or(name);

        let (package_filter, rest) = match name.split_once(':') {
            Some((pkg, rest)) => (Some(pkg), rest),
            None => (def_package, name),
        };
        let (type_filter, entry_name) = match rest.split_once('/') {
            Some((t, e)) => (Some(t), e),
            None => (def_type, rest),
        };
        if entry_name.is_empty() {
            return None;
        }

        for group in &self.package_groups {
            if package_filter.is_some_and(|filter| group.name != filter) {
                continue;
            }

            for pkg in &group.packages {
                let Some(key_index) = pkg.key_strings.index_of(entry_name) else {
                    continue;
                };

                let type_ids: Vec<u8> = match type_filter {
                    Some(t) => match pkg.type_strings.index_of(t) {
                        Some(idx) => vec![(idx + 1) as u8],
                        None => continue,
                    },
                    None => (1..=pkg.type_count() as u8).collect(),
                };

                for type_id in type_ids {
                    for variant in pkg.type_variants(type_id) {
                        for (entry_index, entry) in variant.entries.iter().enumerate() {
                            if entry.key_index() == Some(key_index) {
                                return Some(ResourceId::make(
                                    group.id,
                                    type_id,
                                    entry_index as u16,
                                ));
                            }
                        }
                    }
                }
            }
        }
        None
    }

    /// Locales any packaged configuration targets, sorted and deduped
    pub fn get_locales(&self) -> Vec<String> {
        let mut locales = BTreeSet::new();
        for config in self.all_configs() {
            if let Some(locale) = config.locale_string() {
                locales.insert(locale);
            }
        }
        locales.into_iter().collect()
    }

    /// Every distinct configuration any entry is packaged for
    pub fn get_configurations(&self) -> Vec<ResTableConfig> {
        let mut configs = Vec::new();
        for config in self.all_configs() {
            if !configs.contains(config) {
                configs.push(*config);
            }
        }
        configs
    }

    fn all_configs(&self) -> impl Iterator<Item = &ResTableConfig> {
        self.package_groups
            .iter()
            .flat_map(|g| &g.packages)
            .flat_map(|p| &p.types)
            .flatten()
            .map(|t| &t.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_id_split_and_join() {
        let id = ResourceId::make(0x7f, 0x02, 0x0013);
        assert_eq!(id.raw(), 0x7f02_0013);
        assert_eq!(id.package(), 0x7f);
        assert_eq!(id.type_id(), 0x02);
        assert_eq!(id.entry(), 0x13);
        assert!(id.is_valid());

        assert!(!ResourceId(0).is_valid());
        assert!(!ResourceId(0x7f00_0001).is_valid());
        assert!(!ResourceId(0x0002_0001).is_valid());
    }

    #[test]
    fn empty_table_reports_empty() {
        let table = ResourceTable::new();
        assert!(table.is_empty());
        assert!(table.get_resource(ResourceId(0x7f02_0000)).is_none());
        assert!(table.get_locales().is_empty());
    }

    #[test]
    fn add_rejects_tiny_buffers() {
        let mut table = ResourceTable::new();
        assert!(matches!(
            table.add(&[0u8; 8], 0, None),
            Err(ArscError::TooSmall)
        ));
    }
}
