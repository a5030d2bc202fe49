use proptest::prelude::*;
use std::fs;
use vdisk_core::{Method, ReadPolicy, Storage, StorageConfig};

fn storage(root: &std::path::Path, chunk_size: usize, disks: &[&str]) -> Storage {
    let mut st = Storage::open(StorageConfig::new(root).with_chunk_size(chunk_size)).unwrap();
    for d in disks {
        st.add_disk(d, 1 << 20).unwrap();
    }
    st
}

fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
    fastrand::seed(seed);
    (0..len).map(|_| fastrand::u8(..)).collect()
}

fn chunk_files(root: &std::path::Path, disk: &str) -> usize {
    fs::read_dir(root.join(disk)).unwrap().count()
}

#[test]
fn stripe_counts_match_chunking() {
    let td = tempfile::tempdir().unwrap();
    let root = td.path().join("vd");
    let mut st = storage(&root, 1024, &["d1", "d2", "d3"]);
    let data = random_bytes(10 * 1024 + 17, 1);

    let rec = st.store("a.bin", &data, Method::Stripe).unwrap();
    assert_eq!(rec.chunk_count, 11);
    assert_eq!(rec.chunks.len(), 11);
    assert_eq!(rec.size, data.len() as u64);
    for (i, c) in rec.chunks.iter().enumerate() {
        assert_eq!(c.disk(), ["d1", "d2", "d3"][i % 3]);
    }
    assert_eq!(chunk_files(&root, "d1"), 4);
    assert_eq!(chunk_files(&root, "d2"), 4);
    assert_eq!(chunk_files(&root, "d3"), 3);

    let out = st.reconstruct(&rec).unwrap();
    assert!(out.is_complete());
    assert_eq!(out.data, data);
}

#[test]
fn mirror_two_chunks_two_disks() {
    let td = tempfile::tempdir().unwrap();
    let root = td.path().join("vd");
    let mut st = storage(&root, 4096, &["d1", "d2"]);
    let data = random_bytes(8000, 2);

    let rec = st.store("m.bin", &data, Method::Mirror).unwrap();
    assert_eq!(rec.chunk_count, 2);
    assert_eq!(rec.chunks.len(), 4);
    assert_eq!(chunk_files(&root, "d1") + chunk_files(&root, "d2"), 4);

    // One copy per logical chunk: no duplicated bytes.
    let out = st.reconstruct(&rec).unwrap();
    assert_eq!(out.data, data);
}

#[test]
fn record_is_persisted_and_reloaded() {
    let td = tempfile::tempdir().unwrap();
    let root = td.path().join("vd");
    let data = random_bytes(3000, 3);
    let id = {
        let mut st = storage(&root, 1000, &["d1", "d2"]);
        st.store("p.bin", &data, Method::Stripe).unwrap().id
    };

    let st = Storage::open(StorageConfig::new(&root)).unwrap();
    let files = st.list_files().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].id, id);
    assert_eq!(files[0].disks, vec!["d1".to_string(), "d2".to_string()]);
    // Chunking is fixed at write time; a different configured chunk size does not matter.
    assert_eq!(st.reconstruct(&files[0]).unwrap().data, data);
}

#[test]
fn duplicate_names_get_distinct_ids() {
    let td = tempfile::tempdir().unwrap();
    let mut st = storage(&td.path().join("vd"), 64, &["d1"]);
    let a = st.store("same.txt", b"first", Method::Stripe).unwrap();
    let b = st.store("same.txt", b"second", Method::Mirror).unwrap();
    assert_ne!(a.id, b.id);
    assert_eq!(st.find("same.txt").unwrap().id, b.id);
    assert_eq!(st.file(a.id).unwrap().name, "same.txt");
    assert_eq!(st.reconstruct(&st.find(&a.id.to_string()).unwrap()).unwrap().data, b"first");
}

#[test]
fn identical_chunks_share_a_file_and_still_round_trip() {
    let td = tempfile::tempdir().unwrap();
    let root = td.path().join("vd");
    let mut st = storage(&root, 512, &["d1", "d2"]);
    let data = vec![0u8; 512 * 4];
    let rec = st.store("zeros.bin", &data, Method::Mirror).unwrap();
    assert_eq!(rec.chunk_count, 4);
    assert_eq!(rec.chunks.len(), 8);
    assert_eq!(chunk_files(&root, "d1"), 1);
    let out = st.reconstruct_with(&rec, ReadPolicy::Strict).unwrap();
    assert_eq!(out.data, data);
}

#[test]
fn empty_file_round_trips() {
    let td = tempfile::tempdir().unwrap();
    let mut st = storage(&td.path().join("vd"), 64, &["d1", "d2"]);
    let rec = st.store("empty", b"", Method::Stripe).unwrap();
    assert_eq!(rec.chunk_count, 0);
    assert!(rec.chunks.is_empty());
    assert!(st.reconstruct(&rec).unwrap().data.is_empty());
}

#[test]
fn store_on_subset_uses_given_order() {
    let td = tempfile::tempdir().unwrap();
    let mut st = storage(&td.path().join("vd"), 4, &["d1", "d2", "d3"]);
    let disks = vec!["d3".to_string(), "d1".to_string()];
    let rec = st.store_on("s", b"abcdefghij", &disks, Method::Stripe).unwrap();
    assert_eq!(rec.disks, disks);
    let placed: Vec<&str> = rec.chunks.iter().map(|c| c.disk()).collect();
    assert_eq!(placed, vec!["d3", "d1", "d3"]);

    let err = st.store_on("s", b"x", &["nope".to_string()], Method::Stripe).unwrap_err();
    assert!(matches!(err, vdisk_core::StoreError::DiskNotFound(n) if n == "nope"));
}

#[test]
fn store_without_disks_fails() {
    let td = tempfile::tempdir().unwrap();
    let mut st = storage(&td.path().join("vd"), 64, &[]);
    let err = st.store("f", b"data", Method::Stripe).unwrap_err();
    assert!(matches!(err, vdisk_core::StoreError::NoDisksAvailable));
    assert!(st.list_files().unwrap().is_empty());
}

#[test]
fn store_path_and_retrieve_to_directory() {
    let td = tempfile::tempdir().unwrap();
    let mut st = storage(&td.path().join("vd"), 1000, &["d1", "d2"]);
    let src = td.path().join("input.bin");
    let data = random_bytes(4321, 4);
    fs::write(&src, &data).unwrap();

    let rec = st.store_path(&src, None, Method::Mirror).unwrap();
    assert_eq!(rec.name, "input.bin");

    let out_dir = td.path().join("output");
    let (path, gaps) = st.retrieve_to(&rec, &out_dir, ReadPolicy::Strict).unwrap();
    assert!(gaps.is_empty());
    assert_eq!(path, out_dir.join("input.bin"));
    assert_eq!(fs::read(path).unwrap(), data);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn reconstruct_of_store_is_identity(
        data in proptest::collection::vec(any::<u8>(), 0..5000),
        chunk_size in 1usize..1500,
        disk_count in 1usize..5,
        mirror in any::<bool>(),
    ) {
        let td = tempfile::tempdir().unwrap();
        let names: Vec<String> = (0..disk_count).map(|i| format!("d{i}")).collect();
        let refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
        let mut st = storage(&td.path().join("vd"), chunk_size, &refs);
        let method = if mirror { Method::Mirror } else { Method::Stripe };

        let rec = st.store("p", &data, method).unwrap();
        let expected_chunks = data.len().div_ceil(chunk_size);
        prop_assert_eq!(rec.chunk_count as usize, expected_chunks);
        let per = if mirror { disk_count } else { 1 };
        prop_assert_eq!(rec.chunks.len(), expected_chunks * per);

        let out = st.reconstruct(&rec).unwrap();
        prop_assert!(out.is_complete());
        prop_assert_eq!(out.data, data);
    }
}

#[test]
fn numeric_names_shadowed_by_ids_stay_reachable_by_name() {
    let td = tempfile::tempdir().unwrap();
    let mut st = storage(&td.path().join("vd"), 64, &["d1"]);
    let first = st.store("notes", b"first", Method::Stripe).unwrap();
    st.store("1", b"named one", Method::Stripe).unwrap();

    assert_eq!(st.find("1").unwrap().id, first.id);
    let by_name = st.find_by_name("1").unwrap();
    assert_eq!(by_name.name, "1");
    assert_eq!(st.reconstruct(&by_name).unwrap().data, b"named one");
    assert!(st.find_by_name("2").is_err());
}
