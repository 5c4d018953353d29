//! Per-key expiration, lazy reclamation and cleanup.
//!
//! Run with: cargo run -p kvlite --example ttl_demo

use kvlite::{now_millis, Expiry, KvStore};
use std::thread;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== kvlite TTL Demo ===\n");

    let store = KvStore::in_memory()?;

    store.set_with_ttl("session:short", "expires soon", Duration::from_millis(200))?;
    store.set("session:long", "expires later", Some(now_millis() + 60_000))?;
    store.set("config:theme", "dark", None)?;
    store.set("session:stale", "already gone", Some(now_millis() - 1))?;

    println!("1. Expiry states:");
    for key in ["session:short", "session:long", "config:theme", "missing"] {
        match store.expiry(key)? {
            Expiry::Missing => println!("   {:<14} missing", key),
            Expiry::Never => println!("   {:<14} never expires", key),
            Expiry::At(at) => println!("   {:<14} expires in {} ms", key, at - now_millis()),
        }
    }

    println!("\n2. Stats before cleanup: {:?}", store.stats()?);

    println!("\n3. Waiting for session:short to expire...");
    thread::sleep(Duration::from_millis(300));
    println!("   get(session:short) = {:?}", store.get("session:short")?);

    let removed = store.cleanup()?;
    println!("\n4. cleanup() removed {} expired entries", removed);
    println!("   remaining keys: {:?}", store.keys(None)?);

    store.set_expire("config:theme", Some(now_millis() + 5_000))?;
    println!("\n5. config:theme now expires at {:?}", store.get_expire("config:theme")?);

    println!("\n=== Demo Complete ===");
    Ok(())
}
