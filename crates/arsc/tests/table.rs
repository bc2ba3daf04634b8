//! End-to-end lookups against synthesized resource-table binaries.

use restable_arsc::structs::ResTableConfig;
use restable_arsc::{ArscError, PackageRedirectionMap, ResourceId, ResourceTable, ValueType};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Byte-level builders for the table chunk family
mod builder {
    use restable_arsc::structs::ResTableConfig;

    pub const NO_ENTRY: u32 = 0xFFFF_FFFF;

    pub fn chunk(type_: u16, ext: &[u8], payload: &[u8]) -> Vec<u8> {
        let header_size = (8 + ext.len()) as u16;
        let size = header_size as u32 + payload.len() as u32;

        let mut out = Vec::with_capacity(size as usize);
        out.extend_from_slice(&type_.to_le_bytes());
        out.extend_from_slice(&header_size.to_le_bytes());
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(ext);
        out.extend_from_slice(payload);
        out
    }

    /// UTF-8, unsorted pool
    pub fn string_pool(strings: &[&str]) -> Vec<u8> {
        let mut offsets = Vec::new();
        let mut data = Vec::new();
        for s in strings {
            offsets.push(data.len() as u32);
            data.push(s.chars().count() as u8);
            data.push(s.len() as u8);
            data.extend_from_slice(s.as_bytes());
            data.push(0);
        }
        while data.len() % 4 != 0 {
            data.push(0);
        }

        let strings_start = 28 + offsets.len() as u32 * 4;
        let mut ext = Vec::new();
        ext.extend_from_slice(&(strings.len() as u32).to_le_bytes());
        ext.extend_from_slice(&0u32.to_le_bytes()); // style count
        ext.extend_from_slice(&(1u32 << 8).to_le_bytes()); // UTF8
        ext.extend_from_slice(&strings_start.to_le_bytes());
        ext.extend_from_slice(&0u32.to_le_bytes()); // styles start

        let mut payload = Vec::new();
        for o in &offsets {
            payload.extend_from_slice(&o.to_le_bytes());
        }
        payload.extend_from_slice(&data);

        chunk(0x0001, &ext, &payload)
    }

    fn res_value(data_type: u8, data: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&8u16.to_le_bytes());
        out.push(0);
        out.push(data_type);
        out.extend_from_slice(&data.to_le_bytes());
        out
    }

    pub fn value_entry(key: u32, data_type: u8, data: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&8u16.to_le_bytes()); // entry size
        out.extend_from_slice(&0u16.to_le_bytes()); // flags
        out.extend_from_slice(&key.to_le_bytes());
        out.extend_from_slice(&res_value(data_type, data));
        out
    }

    pub fn complex_entry(key: u32, parent: u32, pairs: &[(u32, u8, u32)]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&16u16.to_le_bytes()); // entry size
        out.extend_from_slice(&0x0001u16.to_le_bytes()); // FLAG_COMPLEX
        out.extend_from_slice(&key.to_le_bytes());
        out.extend_from_slice(&parent.to_le_bytes());
        out.extend_from_slice(&(pairs.len() as u32).to_le_bytes());
        for (name, data_type, data) in pairs {
            out.extend_from_slice(&name.to_le_bytes());
            out.extend_from_slice(&res_value(*data_type, *data));
        }
        out
    }

    pub fn type_spec(id: u8, entry_count: u32) -> Vec<u8> {
        let mut ext = Vec::new();
        ext.push(id);
        ext.push(0);
        ext.extend_from_slice(&0u16.to_le_bytes());
        ext.extend_from_slice(&entry_count.to_le_bytes());

        let mut payload = Vec::new();
        for _ in 0..entry_count {
            payload.extend_from_slice(&0u32.to_le_bytes());
        }
        chunk(0x0202, &ext, &payload)
    }

    /// One configuration variant; `None` slots become NO_ENTRY
    pub fn type_chunk(id: u8, config: &ResTableConfig, entries: &[Option<Vec<u8>>]) -> Vec<u8> {
        let config_bytes = config.encode();
        let entries_start = 8 + 12 + config_bytes.len() as u32 + entries.len() as u32 * 4;

        let mut ext = Vec::new();
        ext.push(id);
        ext.push(0);
        ext.extend_from_slice(&0u16.to_le_bytes());
        ext.extend_from_slice(&(entries.len() as u32).to_le_bytes());
        ext.extend_from_slice(&entries_start.to_le_bytes());
        ext.extend_from_slice(&config_bytes);

        let mut offsets = Vec::new();
        let mut data = Vec::new();
        for entry in entries {
            match entry {
                Some(bytes) => {
                    offsets.extend_from_slice(&(data.len() as u32).to_le_bytes());
                    data.extend_from_slice(bytes);
                }
                None => offsets.extend_from_slice(&NO_ENTRY.to_le_bytes()),
            }
        }
        let mut payload = offsets;
        payload.extend_from_slice(&data);

        chunk(0x0201, &ext, &payload)
    }

    pub fn package(
        id: u32,
        name: &str,
        type_names: &[&str],
        key_names: &[&str],
        body: &[Vec<u8>],
    ) -> Vec<u8> {
        let type_pool = string_pool(type_names);
        let key_pool = string_pool(key_names);

        let mut name_bytes = [0u8; 256];
        for (i, unit) in name.encode_utf16().take(127).enumerate() {
            name_bytes[i * 2..i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
        }

        let header_size = 8 + 4 + 256 + 16;
        let mut ext = Vec::new();
        ext.extend_from_slice(&id.to_le_bytes());
        ext.extend_from_slice(&name_bytes);
        ext.extend_from_slice(&(header_size as u32).to_le_bytes()); // type strings
        ext.extend_from_slice(&(type_names.len() as u32).to_le_bytes());
        ext.extend_from_slice(&(header_size as u32 + type_pool.len() as u32).to_le_bytes());
        ext.extend_from_slice(&(key_names.len() as u32).to_le_bytes());

        let mut payload = Vec::new();
        payload.extend_from_slice(&type_pool);
        payload.extend_from_slice(&key_pool);
        for item in body {
            payload.extend_from_slice(item);
        }
        chunk(0x0200, &ext, &payload)
    }

    pub fn table(global_strings: &[&str], packages: &[Vec<u8>]) -> Vec<u8> {
        let ext = (packages.len() as u32).to_le_bytes();

        let mut payload = string_pool(global_strings);
        for pkg in packages {
            payload.extend_from_slice(pkg);
        }
        chunk(0x0002, &ext, &payload)
    }

    pub fn idmap(mappings: &[u32]) -> Vec<u8> {
        let mut words = vec![0x706d_6469, 0, 0];
        words.extend_from_slice(mappings);
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }
}

fn config_for_language(language: [u8; 2]) -> ResTableConfig {
    ResTableConfig {
        language,
        ..ResTableConfig::default()
    }
}

const TYPE_STRING: u8 = 0x03;
const TYPE_INT_DEC: u8 = 0x10;
const TYPE_REFERENCE: u8 = 0x01;

/// One package, type `string` (id 1), key `greeting` (index 0), with a
/// default and a French variant pointing at the global value pool
fn localized_table() -> Vec<u8> {
    let default_variant = builder::type_chunk(
        1,
        &ResTableConfig::default(),
        &[Some(builder::value_entry(0, TYPE_STRING, 0))],
    );
    let fr_variant = builder::type_chunk(
        1,
        &config_for_language(*b"fr"),
        &[Some(builder::value_entry(0, TYPE_STRING, 1))],
    );

    let pkg = builder::package(
        0x7f,
        "com.example.app",
        &["string"],
        &["greeting"],
        &[
            builder::type_spec(1, 1),
            default_variant,
            fr_variant,
        ],
    );
    builder::table(&["Default", "Bonjour"], &[pkg])
}

#[test]
fn configuration_selects_localized_value() {
    init_logs();
    let mut table = ResourceTable::new();
    table.add(&localized_table(), 0, None).unwrap();
    assert!(!table.is_empty());

    let id = ResourceId(0x7f01_0000);

    let resolved = table.get_resource(id).unwrap();
    assert_eq!(resolved.value.data_type, ValueType::String);
    assert_eq!(table.value_string(&resolved), Some("Default"));

    table.set_parameters(config_for_language(*b"fr"));
    let resolved = table.get_resource(id).unwrap();
    assert_eq!(table.value_string(&resolved), Some("Bonjour"));

    // German falls back to the default variant
    table.set_parameters(config_for_language(*b"de"));
    let resolved = table.get_resource(id).unwrap();
    assert_eq!(table.value_string(&resolved), Some("Default"));
}

#[test]
fn missing_entry_and_missing_package_are_not_errors() {
    init_logs();
    let mut table = ResourceTable::new();
    table.add(&localized_table(), 0, None).unwrap();

    assert!(table.get_resource(ResourceId(0x7f01_0063)).is_none());
    assert!(table.get_resource(ResourceId(0x0101_0000)).is_none());
    assert!(table.get_resource(ResourceId(0x7f7f_0000)).is_none());
}

#[test]
fn density_override_prefers_downscale_candidate() {
    init_logs();
    // 120 and 240 dpi variants of the same integer resource
    let low = ResTableConfig {
        density: 120,
        ..ResTableConfig::default()
    };
    let high = ResTableConfig {
        density: 240,
        ..ResTableConfig::default()
    };

    let pkg = builder::package(
        0x7f,
        "com.example.app",
        &["drawable"],
        &["icon"],
        &[
            builder::type_spec(1, 1),
            builder::type_chunk(1, &low, &[Some(builder::value_entry(0, TYPE_INT_DEC, 120))]),
            builder::type_chunk(1, &high, &[Some(builder::value_entry(0, TYPE_INT_DEC, 240))]),
        ],
    );
    let data = builder::table(&[], &[pkg]);

    let mut table = ResourceTable::new();
    table.add(&data, 0, None).unwrap();

    let resolved = table
        .get_resource_with_density(ResourceId(0x7f01_0000), 160)
        .unwrap();
    assert_eq!(resolved.value.data, 120);

    let resolved = table
        .get_resource_with_density(ResourceId(0x7f01_0000), 240)
        .unwrap();
    assert_eq!(resolved.value.data, 240);
}

#[test]
fn bag_inherits_and_overrides_parent_pairs() {
    init_logs();
    const ATTR_A: u32 = 0x0101_0001;
    const ATTR_B: u32 = 0x0101_0002;
    const ATTR_C: u32 = 0x0101_0003;

    let parent_id = 0x7f01_0000u32;
    let styles = builder::type_chunk(
        1,
        &ResTableConfig::default(),
        &[
            Some(builder::complex_entry(
                0,
                0,
                &[(ATTR_A, TYPE_INT_DEC, 1), (ATTR_B, TYPE_INT_DEC, 2)],
            )),
            Some(builder::complex_entry(
                1,
                parent_id,
                &[(ATTR_A, TYPE_INT_DEC, 5), (ATTR_C, TYPE_INT_DEC, 9)],
            )),
        ],
    );
    let pkg = builder::package(
        0x7f,
        "com.example.app",
        &["style"],
        &["Base", "Child"],
        &[builder::type_spec(1, 2), styles],
    );
    let data = builder::table(&[], &[pkg]);

    let mut table = ResourceTable::new();
    table.add(&data, 0, None).unwrap();

    let bag = table.get_bag(ResourceId(0x7f01_0001)).unwrap().unwrap();
    assert_eq!(bag.parent, parent_id);

    let pairs: Vec<(u32, u32)> = bag.entries.iter().map(|e| (e.name, e.value.data)).collect();
    assert_eq!(pairs, vec![(ATTR_A, 5), (ATTR_B, 2), (ATTR_C, 9)]);

    // a plain value is not a bag
    assert!(table.get_bag(ResourceId(0x7f01_0063)).unwrap().is_none());
}

#[test]
fn reference_chains_resolve_and_cycles_are_reported() {
    init_logs();
    let strings = builder::type_chunk(
        1,
        &ResTableConfig::default(),
        &[
            Some(builder::value_entry(0, TYPE_REFERENCE, 0x7f01_0001)),
            Some(builder::value_entry(1, TYPE_REFERENCE, 0x7f01_0000)),
            Some(builder::value_entry(2, TYPE_INT_DEC, 42)),
            Some(builder::value_entry(3, TYPE_REFERENCE, 0x7f01_0002)),
            Some(builder::value_entry(4, TYPE_REFERENCE, 0x7f01_0063)),
        ],
    );
    let pkg = builder::package(
        0x7f,
        "com.example.app",
        &["string"],
        &["a", "b", "leaf", "indirect", "dangling"],
        &[builder::type_spec(1, 5), strings],
    );
    let data = builder::table(&[], &[pkg]);

    let mut table = ResourceTable::new();
    table.add(&data, 0, None).unwrap();

    // indirect -> leaf
    let start = table.get_resource(ResourceId(0x7f01_0003)).unwrap();
    let resolved = table.resolve_reference(start.value, start.cookie).unwrap();
    assert_eq!(resolved.value.data_type, ValueType::IntDec);
    assert_eq!(resolved.value.data, 42);

    // a -> b -> a -> ...
    let start = table.get_resource(ResourceId(0x7f01_0000)).unwrap();
    assert!(matches!(
        table.resolve_reference(start.value, start.cookie),
        Err(ArscError::CyclicReference(_))
    ));

    // a dangling reference stops the walk and comes back as-is
    let start = table.get_resource(ResourceId(0x7f01_0004)).unwrap();
    let resolved = table.resolve_reference(start.value, start.cookie).unwrap();
    assert_eq!(resolved.value.data_type, ValueType::Reference);
    assert_eq!(resolved.value.data, 0x7f01_0063);
}

#[test]
fn later_package_shadows_earlier_on_equal_config() {
    init_logs();
    let base = localized_table();

    let overlay_pkg = builder::package(
        0x7f,
        "com.example.app",
        &["string"],
        &["greeting"],
        &[
            builder::type_spec(1, 1),
            builder::type_chunk(
                1,
                &ResTableConfig::default(),
                &[Some(builder::value_entry(0, TYPE_STRING, 0))],
            ),
        ],
    );
    let overlay = builder::table(&["Overlayed"], &[overlay_pkg]);

    let mut table = ResourceTable::new();
    table.add(&base, 0, None).unwrap();
    table.add(&overlay, 1, None).unwrap();

    let resolved = table.get_resource(ResourceId(0x7f01_0000)).unwrap();
    assert_eq!(resolved.cookie, 1);
    assert_eq!(table.value_string(&resolved), Some("Overlayed"));

    // a more specific base variant still beats the overlay's default
    table.set_parameters(config_for_language(*b"fr"));
    let resolved = table.get_resource(ResourceId(0x7f01_0000)).unwrap();
    assert_eq!(table.value_string(&resolved), Some("Bonjour"));
}

#[test]
fn idmap_overlay_remaps_into_target_id_space() {
    init_logs();
    let base = localized_table();

    // overlay renumbered under package 0x0a, type 1, entry 0
    let overlay_pkg = builder::package(
        0x0a,
        "com.example.theme",
        &["string"],
        &["greeting"],
        &[
            builder::type_spec(1, 1),
            builder::type_chunk(
                1,
                &ResTableConfig::default(),
                &[Some(builder::value_entry(0, TYPE_STRING, 0))],
            ),
        ],
    );
    let overlay = builder::table(&["Salut"], &[overlay_pkg]);

    // target type 1 entry 0 -> overlay 0x0a010000
    let idmap = builder::idmap(&[1, 2, 1, 0, 0x0a01_0000]);

    let mut table = ResourceTable::new();
    table.add(&base, 0, None).unwrap();
    table.add(&overlay, 1, Some(&idmap)).unwrap();

    let resolved = table.get_resource(ResourceId(0x7f01_0000)).unwrap();
    assert_eq!(resolved.cookie, 1);
    assert_eq!(table.value_string(&resolved), Some("Salut"));
}

#[test]
fn identifier_for_name_finds_first_match_in_load_order() {
    init_logs();
    let mut table = ResourceTable::new();
    table.add(&localized_table(), 0, None).unwrap();

    assert_eq!(
        table.identifier_for_name("greeting", Some("string"), None),
        Some(ResourceId(0x7f01_0000))
    );
    assert_eq!(
        table.identifier_for_name("@com.example.app:string/greeting", None, None),
        Some(ResourceId(0x7f01_0000))
    );
    assert_eq!(table.identifier_for_name("greeting", Some("color"), None), None);
    assert_eq!(
        table.identifier_for_name("greeting", Some("string"), Some("com.other")),
        None
    );
    assert_eq!(table.identifier_for_name("absent", None, None), None);
}

#[test]
fn locales_and_configurations_are_deduped() {
    init_logs();
    let mut table = ResourceTable::new();
    table.add(&localized_table(), 0, None).unwrap();
    table.add(&localized_table(), 1, None).unwrap();

    assert_eq!(table.get_locales(), vec!["fr".to_string()]);

    let configs = table.get_configurations();
    assert_eq!(configs.len(), 2);
    assert!(configs.contains(&ResTableConfig::default()));
    assert!(configs.contains(&config_for_language(*b"fr")));
}

#[test]
fn redirections_rewrite_lookups_until_cleared() {
    init_logs();
    let strings = builder::type_chunk(
        1,
        &ResTableConfig::default(),
        &[
            Some(builder::value_entry(0, TYPE_INT_DEC, 10)),
            Some(builder::value_entry(1, TYPE_INT_DEC, 20)),
        ],
    );
    let pkg = builder::package(
        0x7f,
        "com.example.app",
        &["string"],
        &["plain", "themed"],
        &[builder::type_spec(1, 2), strings],
    );
    let data = builder::table(&[], &[pkg]);

    let mut table = ResourceTable::new();
    table.add(&data, 0, None).unwrap();

    let mut map = PackageRedirectionMap::new();
    assert!(map.add_redirection(ResourceId(0x7f01_0000), ResourceId(0x7f01_0001)));
    table.add_redirections(map);

    assert_eq!(table.get_resource(ResourceId(0x7f01_0000)).unwrap().value.data, 20);

    table.clear_redirections();
    assert_eq!(table.get_resource(ResourceId(0x7f01_0000)).unwrap().value.data, 10);
}

#[test]
fn unusable_package_is_skipped_but_good_one_loads() {
    init_logs();
    let good = builder::package(
        0x7f,
        "com.example.app",
        &["string"],
        &["greeting"],
        &[
            builder::type_spec(1, 1),
            builder::type_chunk(
                1,
                &ResTableConfig::default(),
                &[Some(builder::value_entry(0, TYPE_INT_DEC, 7))],
            ),
        ],
    );
    // type spec with id 0 violates the format
    let bad = builder::package(0x71, "broken", &[], &[], &[builder::type_spec(0, 1)]);
    let data = builder::table(&[], &[bad, good]);

    let mut table = ResourceTable::new();
    table.add(&data, 0, None).unwrap();

    assert!(!table.is_empty());
    assert_eq!(table.get_resource(ResourceId(0x7f01_0000)).unwrap().value.data, 7);
    assert!(table.get_resource(ResourceId(0x7101_0000)).is_none());
}

#[test]
fn inherited_bag_pairs_keep_their_source_pool() {
    init_logs();
    const ATTR_A: u32 = 0x0101_0001;
    const ATTR_B: u32 = 0x0101_0002;

    // parent style in the first source, string value in its pool
    let base_pkg = builder::package(
        0x7f,
        "com.example.app",
        &["style"],
        &["Base"],
        &[
            builder::type_spec(1, 1),
            builder::type_chunk(
                1,
                &ResTableConfig::default(),
                &[Some(builder::complex_entry(
                    0,
                    0,
                    &[(ATTR_A, TYPE_STRING, 0)],
                ))],
            ),
        ],
    );
    let base = builder::table(&["ParentValue"], &[base_pkg]);

    // child style in a second source, inheriting from the first
    let child_pkg = builder::package(
        0x7f,
        "com.example.app",
        &["style"],
        &["Child"],
        &[
            builder::type_spec(1, 2),
            builder::type_chunk(
                1,
                &ResTableConfig::default(),
                &[
                    None,
                    Some(builder::complex_entry(
                        0,
                        0x7f01_0000,
                        &[(ATTR_B, TYPE_STRING, 0)],
                    )),
                ],
            ),
        ],
    );
    let child = builder::table(&["ChildValue"], &[child_pkg]);

    let mut table = ResourceTable::new();
    table.add(&base, 0, None).unwrap();
    table.add(&child, 1, None).unwrap();

    let bag = table.get_bag(ResourceId(0x7f01_0001)).unwrap().unwrap();
    assert_eq!(bag.cookie, 1);

    let inherited = bag.entries.iter().find(|e| e.name == ATTR_A).unwrap();
    assert_eq!(inherited.cookie, 0);
    assert_eq!(table.bag_value_string(inherited), Some("ParentValue"));

    let own = bag.entries.iter().find(|e| e.name == ATTR_B).unwrap();
    assert_eq!(own.cookie, 1);
    assert_eq!(table.bag_value_string(own), Some("ChildValue"));
}

#[test]
fn add_table_reuses_a_parsed_snapshot() {
    init_logs();
    let mut parsed = ResourceTable::new();
    parsed.add(&localized_table(), 0, None).unwrap();

    let mut composed = ResourceTable::new();
    composed.add_table(&parsed, 5);
    assert!(!composed.is_empty());

    let resolved = composed.get_resource(ResourceId(0x7f01_0000)).unwrap();
    assert_eq!(resolved.cookie, 5);
    assert_eq!(composed.value_string(&resolved), Some("Default"));

    composed.set_parameters(config_for_language(*b"fr"));
    let resolved = composed.get_resource(ResourceId(0x7f01_0000)).unwrap();
    assert_eq!(composed.value_string(&resolved), Some("Bonjour"));
}
