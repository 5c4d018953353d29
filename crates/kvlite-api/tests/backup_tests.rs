// Integration tests for whole-database backup and restore

mod common;

use common::StoreFixture;
use kvlite::{BackupConfig, ErrorKind, KvStore, StoreConfig, Value};
use std::fs;

#[test]
fn test_backup_and_restore_in_memory() {
    let fixture = StoreFixture::new();
    let image = fixture.path("snapshot.db");

    let source = KvStore::in_memory().unwrap();
    source.set("a", 1, None).unwrap();
    source.set("b", Value::Bytes(vec![9, 9]), None).unwrap();
    let meta = source.backup(&image).unwrap();
    assert!(meta.size > 0);

    let mut target = KvStore::in_memory().unwrap();
    target.set("stale", true, None).unwrap();
    target.restore(&image).unwrap();

    assert_eq!(target.keys(None).unwrap(), vec!["a", "b"]);
    assert_eq!(target.get("b").unwrap(), Some(Value::Bytes(vec![9, 9])));
    assert!(!target.exists("stale").unwrap());
}

#[test]
fn test_backup_opens_as_file_store() {
    let fixture = StoreFixture::new();
    let image = fixture.path("copy.db");

    let source = KvStore::in_memory().unwrap();
    source.set("k", "v", None).unwrap();
    source.backup(&image).unwrap();

    let copy = KvStore::open(&image).unwrap();
    assert_eq!(copy.get("k").unwrap(), Some(Value::from("v")));
}

#[test]
fn test_restore_corrupted_image_fails() {
    let fixture = StoreFixture::new();
    let image = fixture.path("bad.db");

    let source = fixture.open();
    source.set("k", 1, None).unwrap();
    source.backup(&image).unwrap();

    let mut bytes = fs::read(&image).unwrap();
    bytes.truncate(bytes.len() / 2);
    fs::write(&image, &bytes).unwrap();

    let mut target = KvStore::in_memory().unwrap();
    target.set("live", 1, None).unwrap();
    let err = target.restore(&image).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Backend);
    assert!(target.exists("live").unwrap());
}

#[test]
fn test_restore_into_custom_table_recreates_schema() {
    let fixture = StoreFixture::new();
    let image = fixture.path("default.db");

    let source = KvStore::in_memory().unwrap();
    source.set("k", 1, None).unwrap();
    source.backup(&image).unwrap();

    let config = StoreConfig::default()
        .with_table("other")
        .with_backup(BackupConfig {
            verify_checksums: false,
            ..Default::default()
        });
    let mut target = KvStore::in_memory_with_config(config).unwrap();
    target.restore(&image).unwrap();

    // The image has no "other" table; it is created empty
    assert_eq!(target.count(None).unwrap(), 0);
    target.set("fresh", 1, None).unwrap();
    assert_eq!(target.count(None).unwrap(), 1);
}

#[test]
fn test_restore_missing_file() {
    let fixture = StoreFixture::new();
    let mut store = KvStore::in_memory().unwrap();
    let err = store.restore(fixture.path("absent.db")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Backend);
}
