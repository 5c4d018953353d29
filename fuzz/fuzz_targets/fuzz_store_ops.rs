#![no_main]

use arbitrary::Arbitrary;
use kvlite::{Entry, KvStore, Value};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum StoreOp {
    Set { key: String, value: Vec<u8>, expires_at: Option<i64> },
    Get { key: String },
    Delete { key: String },
    Rename { from: String, to: String },
    SetExpire { key: String, expires_at: Option<i64> },
    Keys { pattern: String },
    Page { limit: u8, page: u8 },
    MultiSet { keys: Vec<String> },
    Cleanup,
}

fuzz_target!(|ops: Vec<StoreOp>| {
    let Ok(store) = KvStore::in_memory() else {
        return;
    };

    for op in ops.iter().take(100) {
        match op {
            StoreOp::Set { key, value, expires_at } => {
                if value.len() <= 1024 {
                    let _ = store.set(key, Value::Bytes(value.clone()), *expires_at);
                }
            }
            StoreOp::Get { key } => {
                let _ = store.get(key);
            }
            StoreOp::Delete { key } => {
                let _ = store.delete(key);
            }
            StoreOp::Rename { from, to } => {
                let _ = store.rename(from, to);
            }
            StoreOp::SetExpire { key, expires_at } => {
                let _ = store.set_expire(key, *expires_at);
            }
            StoreOp::Keys { pattern } => {
                let _ = store.keys(Some(pattern));
            }
            StoreOp::Page { limit, page } => {
                let _ = store.pagination(*limit as usize, *page as usize, None);
            }
            StoreOp::MultiSet { keys } => {
                let entries: Vec<Entry> = keys.iter().take(16).map(|k| Entry::new(k.as_str(), true)).collect();
                let _ = store.multi_set(&entries);
            }
            StoreOp::Cleanup => {
                let _ = store.cleanup();
            }
        }
    }

    // Raw counters must agree with each other whatever happened above
    if let (Ok(total), Ok(expired)) = (store.count(None), store.count_expired(None)) {
        assert!(expired <= total);
    }
});
