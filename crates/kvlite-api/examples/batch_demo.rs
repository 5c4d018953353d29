//! Atomic multi-key operations.
//!
//! Run with: cargo run -p kvlite --example batch_demo

use kvlite::{Entry, KvStore, Value};
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== kvlite Batch Demo ===\n");

    let store = KvStore::in_memory()?;

    // Demo 1: multi_set and multi_get
    println!("1. multi_set / multi_get:");
    store.multi_set(&[
        Entry::new("account:alice", 100),
        Entry::new("account:bob", 50),
        Entry::new("otp:alice", "482913").ttl(Duration::from_secs(30)),
    ])?;
    let found = store.multi_get(&["account:alice", "account:bob", "account:carol"])?;
    let mut keys: Vec<_> = found.keys().collect();
    keys.sort();
    for key in keys {
        println!("   {} = {:?}", key, found[key]);
    }

    // Demo 2: a failing batch leaves nothing behind
    println!("\n2. Atomic failure:");
    let result = store.multi_set(&[
        Entry::new("account:carol", 10),
        Entry::new("account:dave", f64::NAN),
    ]);
    println!("   multi_set error: {}", result.unwrap_err());
    println!("   account:carol exists? {}", store.exists("account:carol")?);

    // Demo 3: transfer inside a transaction
    println!("\n3. Transfer 30 from alice to bob:");
    store.transaction(|s| {
        let alice = s.get("account:alice")?.and_then(|v| v.as_i64()).unwrap_or(0);
        let bob = s.get("account:bob")?.and_then(|v| v.as_i64()).unwrap_or(0);
        s.set("account:alice", Value::Int(alice - 30), None)?;
        s.set("account:bob", Value::Int(bob + 30), None)
    })?;
    println!("   alice = {:?}", store.get("account:alice")?);
    println!("   bob   = {:?}", store.get("account:bob")?);

    // Demo 4: multi_delete
    let removed = store.multi_delete(&["account:alice", "account:bob", "account:zed"])?;
    println!("\n4. multi_delete removed {} keys", removed);

    println!("\n=== Demo Complete ===");
    Ok(())
}
