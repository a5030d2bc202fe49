use vdisk_core::catalog::Catalog;
use vdisk_core::disk::{validate_disk_name, DiskRegistry};
use vdisk_core::metadata::{JsonMetadataStore, MemoryMetadataStore, MetadataStore};
use vdisk_core::{Storage, StorageConfig, StoreError};

#[test]
fn add_then_list_shows_disk_once() {
    let td = tempfile::tempdir().unwrap();
    let root = td.path().join("vd");
    let mut st = Storage::open(StorageConfig::new(&root)).unwrap();
    st.add_disk("disk1", 10_485_760).unwrap();

    let disks = st.list_disks().unwrap();
    assert_eq!(disks.iter().filter(|d| d.name == "disk1").count(), 1);
    assert_eq!(disks[0].size, 10_485_760);
    assert!(root.join("disk1").is_dir());
}

#[test]
fn duplicate_add_fails_and_leaves_registry_unchanged() {
    let td = tempfile::tempdir().unwrap();
    let mut st = Storage::open(StorageConfig::new(td.path().join("vd"))).unwrap();
    st.add_disk("disk1", 100).unwrap();
    let before = st.list_disks().unwrap();

    let err = st.add_disk("disk1", 999).unwrap_err();
    assert!(matches!(err, StoreError::DiskAlreadyExists(n) if n == "disk1"));
    assert_eq!(st.list_disks().unwrap(), before);
}

#[test]
fn invalid_size_and_names_are_rejected() {
    let mut reg = DiskRegistry::default();
    assert!(matches!(reg.add("d", 0), Err(StoreError::InvalidDiskSize { size: 0, .. })));
    assert!(matches!(reg.add("d", -5), Err(StoreError::InvalidDiskSize { .. })));
    for bad in ["", "..", ".", "a/b", "/abs", "a\\b"] {
        assert!(
            matches!(validate_disk_name(bad), Err(StoreError::InvalidDiskName(_))),
            "accepted {bad:?}"
        );
    }
    validate_disk_name("disk-01.v2").unwrap();
    assert!(reg.is_empty());
}

#[test]
fn init_disks_skips_existing_names() {
    let td = tempfile::tempdir().unwrap();
    let root = td.path().join("vd");
    let mut st = Storage::open(StorageConfig::new(&root)).unwrap();
    st.add_disk("d1", 100).unwrap();

    let added = st
        .init_disks(&[("d1".into(), 5), ("d2".into(), 200), ("d3".into(), 300)])
        .unwrap();
    let names: Vec<&str> = added.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["d2", "d3"]);
    let all: Vec<String> = st.list_disks().unwrap().into_iter().map(|d| d.name).collect();
    assert_eq!(all, vec!["d1", "d2", "d3"]);
    assert!(root.join("d3").is_dir());
}

#[test]
fn init_disks_is_all_or_nothing_on_bad_input() {
    let td = tempfile::tempdir().unwrap();
    let root = td.path().join("vd");
    let mut st = Storage::open(StorageConfig::new(&root)).unwrap();
    let err = st.init_disks(&[("ok".into(), 10), ("bad".into(), 0)]).unwrap_err();
    assert!(matches!(err, StoreError::InvalidDiskSize { .. }));
    assert!(st.list_disks().unwrap().is_empty());
    assert!(!root.join("ok").exists());
}

#[test]
fn registry_document_shape() {
    let td = tempfile::tempdir().unwrap();
    let mut store = JsonMetadataStore::new(td.path());
    let mut reg = store.load_registry().unwrap();
    assert!(reg.is_empty());
    reg.add("disk1", 4096).unwrap();
    store.save_registry(&reg).unwrap();

    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(store.registry_path()).unwrap()).unwrap();
    assert_eq!(raw, serde_json::json!({ "disks": [ { "name": "disk1", "size": 4096 } ] }));
    assert!(!td.path().join("metadata.json.tmp").exists());
}

#[test]
fn memory_store_appends_records() {
    let td = tempfile::tempdir().unwrap();
    let mut st = Storage::with_parts(
        StorageConfig::new(td.path()),
        MemoryMetadataStore::default(),
        vdisk_core::fs::LocalFs,
    )
    .unwrap();
    st.add_disk("d1", 1).unwrap();
    st.store("x", b"abc", vdisk_core::Method::Stripe).unwrap();
    st.store("y", b"def", vdisk_core::Method::Mirror).unwrap();
    let catalog = st.metadata().load_catalog().unwrap();
    let ids: Vec<u64> = catalog.records.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn metadata_document_names_are_not_disk_names() {
    let td = tempfile::tempdir().unwrap();
    let root = td.path().join("vd");
    let mut st = Storage::open(StorageConfig::new(&root)).unwrap();
    st.add_disk("d1", 100).unwrap();

    for name in ["metadata.json", "files_metadata.json", "metadata.json.tmp", "FILES_METADATA.JSON"] {
        let err = st.add_disk(name, 100).unwrap_err();
        assert!(matches!(err, StoreError::InvalidDiskName(n) if n == name), "accepted {name:?}");
    }
    let err = st.init_disks(&[("files_metadata.json".into(), 10)]).unwrap_err();
    assert!(matches!(err, StoreError::InvalidDiskName(_)));

    // The store keeps working afterwards.
    assert!(!root.join("files_metadata.json").is_dir());
    st.store("x", b"abc", vdisk_core::Method::Stripe).unwrap();
    assert_eq!(st.list_files().unwrap().len(), 1);
    assert_eq!(st.list_disks().unwrap().len(), 1);
    st.remove_disk("d1").unwrap();
}

#[derive(Default)]
struct ReadOnlyRegistry {
    inner: MemoryMetadataStore,
}

impl MetadataStore for ReadOnlyRegistry {
    fn load_registry(&self) -> vdisk_core::Result<DiskRegistry> {
        self.inner.load_registry()
    }

    fn save_registry(&mut self, _: &DiskRegistry) -> vdisk_core::Result<()> {
        Err(StoreError::Io {
            op: "write",
            path: "metadata.json".into(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "read-only"),
        })
    }

    fn load_catalog(&self) -> vdisk_core::Result<Catalog> {
        self.inner.load_catalog()
    }

    fn save_catalog(&mut self, catalog: &Catalog) -> vdisk_core::Result<()> {
        self.inner.save_catalog(catalog)
    }
}

#[test]
fn failed_registry_save_removes_new_disk_directories() {
    let td = tempfile::tempdir().unwrap();
    let root = td.path().join("vd");
    std::fs::create_dir_all(root.join("kept")).unwrap();
    std::fs::write(root.join("kept").join("note"), b"user data").unwrap();
    let mut st = Storage::with_parts(
        StorageConfig::new(&root),
        ReadOnlyRegistry::default(),
        vdisk_core::fs::LocalFs,
    )
    .unwrap();

    assert!(matches!(st.add_disk("d1", 100), Err(StoreError::Io { .. })));
    assert!(!root.join("d1").exists());

    let err = st.init_disks(&[("d2".into(), 10), ("kept".into(), 10)]).unwrap_err();
    assert!(matches!(err, StoreError::Io { .. }));
    assert!(!root.join("d2").exists());
    // A directory that was already there is left alone.
    assert!(root.join("kept").join("note").exists());
    assert!(st.list_disks().unwrap().is_empty());
}

#[test]
fn registry_listing_bare_names_loads_with_unknown_size() {
    let td = tempfile::tempdir().unwrap();
    let root = td.path().join("vd");
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("metadata.json"), r#"{ "disks": ["d1", "d2"] }"#).unwrap();

    let mut st = Storage::open(StorageConfig::new(&root)).unwrap();
    let disks = st.list_disks().unwrap();
    let names: Vec<&str> = disks.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["d1", "d2"]);
    assert!(disks.iter().all(|d| d.size == 0));

    st.add_disk("d3", 64).unwrap();
    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(root.join("metadata.json")).unwrap()).unwrap();
    assert_eq!(raw["disks"][0], serde_json::json!({ "name": "d1", "size": 0 }));
    assert_eq!(raw["disks"][2], serde_json::json!({ "name": "d3", "size": 64 }));
}
