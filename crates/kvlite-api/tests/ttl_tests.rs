// Integration tests for expiration: lazy reclamation on read and bulk cleanup

mod common;

use common::StoreFixture;
use kvlite::{now_millis, KvStore, StoreConfig, StoreStats, Value};
use std::thread;
use std::time::Duration;

#[test]
fn test_past_expiry_is_invisible_and_reclaimed_on_get() {
    let store = KvStore::in_memory().unwrap();
    store.set("k", "v", Some(now_millis() - 10)).unwrap();

    // Raw views still see the row
    assert!(store.exists("k").unwrap());
    assert_eq!(store.keys(None).unwrap(), vec!["k"]);
    assert_eq!(store.count_expired(None).unwrap(), 1);

    assert_eq!(store.get("k").unwrap(), None);
    assert!(!store.exists("k").unwrap());
    assert_eq!(store.count(None).unwrap(), 0);
}

#[test]
fn test_future_expiry_visible_until_it_passes() {
    let store = KvStore::in_memory().unwrap();
    store
        .set_with_ttl("k", Value::from("v"), Duration::from_millis(150))
        .unwrap();
    assert_eq!(store.get("k").unwrap(), Some(Value::from("v")));

    thread::sleep(Duration::from_millis(250));
    assert_eq!(store.get("k").unwrap(), None);
}

#[test]
fn test_cleanup_removes_only_expired() {
    let store = KvStore::in_memory().unwrap();
    let now = now_millis();
    store.set("session:1", 1, Some(now - 1_000)).unwrap();
    store.set("session:2", 2, Some(now - 1)).unwrap();
    store.set("session:3", 3, Some(now + 60_000)).unwrap();
    store.set("user:1", 4, None).unwrap();

    assert_eq!(
        store.stats().unwrap(),
        StoreStats {
            total: 4,
            expired: 2
        }
    );
    assert_eq!(store.count_expired(Some("user:%")).unwrap(), 0);

    assert_eq!(store.cleanup().unwrap(), 2);
    assert_eq!(store.keys(None).unwrap(), vec!["session:3", "user:1"]);
}

#[test]
fn test_repeated_cleanup_is_idempotent() {
    let store = KvStore::in_memory().unwrap();
    store.set("a", 1, Some(now_millis() - 5)).unwrap();
    store.set("b", 2, None).unwrap();

    store.cleanup().unwrap();
    let count = store.count(None).unwrap();
    assert_eq!(store.cleanup().unwrap(), 0);
    assert_eq!(store.cleanup().unwrap(), 0);
    assert_eq!(store.count(None).unwrap(), count);
}

#[test]
fn test_close_runs_cleanup() {
    let fixture = StoreFixture::new();
    {
        let mut store = fixture.open();
        store.set("expired", 1, Some(now_millis() - 5)).unwrap();
        store.set("live", 2, None).unwrap();
        store.close().unwrap();
    }

    let store = fixture.open();
    assert_eq!(store.keys(None).unwrap(), vec!["live"]);
}

#[test]
fn test_close_without_cleanup_keeps_expired_rows() {
    let fixture = StoreFixture::new();
    let config = StoreConfig::default().with_cleanup_on_close(false);
    {
        let mut store = KvStore::open_with_config(&fixture.db_path, config.clone()).unwrap();
        store.set("expired", 1, Some(now_millis() - 5)).unwrap();
        store.close().unwrap();
    }

    let store = KvStore::open_with_config(&fixture.db_path, config).unwrap();
    assert_eq!(store.count_expired(None).unwrap(), 1);
    assert_eq!(store.get("expired").unwrap(), None);
    assert_eq!(store.count(None).unwrap(), 0);
}

#[test]
fn test_set_expire_into_past_hides_entry() {
    let store = KvStore::in_memory().unwrap();
    store.set("k", 1, None).unwrap();
    assert!(store.set_expire("k", Some(now_millis() - 1)).unwrap());
    assert_eq!(store.get("k").unwrap(), None);
}
