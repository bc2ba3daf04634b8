use log::warn;

use crate::table::ResourceId;

/// Per-overlay remapping from original resource IDs to a theme's
/// substituted resource IDs.
///
/// One map instance handles exactly one source package; the package byte
/// is pinned by the first successful [`add_redirection`]. Written once
/// when a theme is applied, then read-only.
#[derive(Debug, Default)]
pub struct PackageRedirectionMap {
    package: Option<u8>,

    /// Indexed by type id - 1; each slot, once sized, holds substitute
    /// resource identifiers indexed by entry id (0 = no redirection)
    entries_by_type: Vec<Option<Vec<u32>>>,
}

impl PackageRedirectionMap {
    pub fn new() -> PackageRedirectionMap {
        PackageRedirectionMap::default()
    }

    /// The package this map applies to, once established
    pub fn package(&self) -> Option<u8> {
        self.package
    }

    /// Record `from -> to`. Returns `false` when `from` is invalid or
    /// belongs to a different package than previously recorded.
    pub fn add_redirection(&mut self, from: ResourceId, to: ResourceId) -> bool {
        if !from.is_valid() {
            return false;
        }

        match self.package {
            None => self.package = Some(from.package()),
            Some(package) if package != from.package() => {
                warn!(
                    "redirection source 0x{:08x} does not belong to package 0x{:02x}",
                    from.raw(),
                    package
                );
                return false;
            }
            Some(_) => {}
        }

        let type_slot = (from.type_id() - 1) as usize;
        if type_slot >= self.entries_by_type.len() {
            self.entries_by_type.resize(type_slot + 1, None);
        }

        let entries = self.entries_by_type[type_slot].get_or_insert_with(Vec::new);
        let entry = from.entry() as usize;
        if entry >= entries.len() {
            // grow to the next power of two so repeated single-entry
            // inserts stay amortized O(1)
            let capacity = (entry + 1).next_power_of_two();
            entries.resize(capacity, 0);
        }
        entries[entry] = to.raw();

        true
    }

    /// Substitute resource identifier for `from`, or 0 meaning "no
    /// redirection, use the original". O(1).
    pub fn lookup_redirection(&self, from: ResourceId) -> u32 {
        let Some(package) = self.package else {
            return 0;
        };
        if !from.is_valid() || from.package() != package {
            return 0;
        }

        let type_slot = (from.type_id() - 1) as usize;
        self.entries_by_type
            .get(type_slot)
            .and_then(|slot| slot.as_ref())
            .and_then(|entries| entries.get(from.entry() as usize))
            .copied()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecorded_ids_default_to_zero() {
        let mut map = PackageRedirectionMap::new();
        assert_eq!(map.lookup_redirection(ResourceId(0x7f02_0001)), 0);

        assert!(map.add_redirection(ResourceId(0x7f02_0001), ResourceId(0x0a02_0001)));
        assert_eq!(map.lookup_redirection(ResourceId(0x7f02_0001)), 0x0a02_0001);

        // same type, different entry
        assert_eq!(map.lookup_redirection(ResourceId(0x7f02_0002)), 0);
        // different type
        assert_eq!(map.lookup_redirection(ResourceId(0x7f03_0001)), 0);
        // different package entirely
        assert_eq!(map.lookup_redirection(ResourceId(0x0102_0001)), 0);
    }

    #[test]
    fn rejects_foreign_package() {
        let mut map = PackageRedirectionMap::new();
        assert!(map.add_redirection(ResourceId(0x7f01_0000), ResourceId(0x0a01_0000)));
        assert_eq!(map.package(), Some(0x7f));

        assert!(!map.add_redirection(ResourceId(0x0101_0000), ResourceId(0x0a01_0001)));
        assert_eq!(map.lookup_redirection(ResourceId(0x0101_0000)), 0);
    }

    #[test]
    fn rejects_invalid_source() {
        let mut map = PackageRedirectionMap::new();
        assert!(!map.add_redirection(ResourceId(0), ResourceId(0x0a01_0000)));
        assert!(!map.add_redirection(ResourceId(0x7f00_0001), ResourceId(0x0a01_0000)));
    }

    #[test]
    fn entry_arrays_grow_geometrically() {
        let mut map = PackageRedirectionMap::new();
        assert!(map.add_redirection(ResourceId(0x7f01_0300), ResourceId(0x0a01_0300)));
        assert_eq!(map.lookup_redirection(ResourceId(0x7f01_0300)), 0x0a01_0300);
        // slots below the grown high-water mark read as "no redirection"
        assert_eq!(map.lookup_redirection(ResourceId(0x7f01_00ff)), 0);
    }
}
