//! Shows the tracing output of store operations.
//!
//! Run with: cargo run -p kvlite --example logging_demo
//! Override the filter with KVLITE_LOG, e.g. KVLITE_LOG=kvlite=trace

use kvlite::logging::LogConfig;
use kvlite::{Entry, KvStore};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _guard = LogConfig::debug().init()?;

    println!("=== kvlite Logging Demo ===\n");

    // Logs "kv store ready"
    let mut store = KvStore::in_memory()?;

    println!("\n1. Writing data...");
    store.set("user:1", "Alice", None)?;
    store.set("user:2", "Bob", Some(kvlite::now_millis() - 1))?;

    println!("\n2. Reading data (user:2 is reclaimed)...");
    store.get("user:1")?;
    store.get("user:2")?;

    println!("\n3. Batch write...");
    store.multi_set(&[Entry::new("a", 1), Entry::new("b", 2)])?;

    println!("\n4. Flush and close...");
    store.flush()?;
    store.close()?;

    println!("\n=== Demo Complete ===");
    Ok(())
}
