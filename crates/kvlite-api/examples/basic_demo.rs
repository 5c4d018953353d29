//! Demonstrates the basic store operations on a persistent database.
//!
//! Run with: cargo run -p kvlite --example basic_demo

use kvlite::{KvStore, Value};
use std::collections::BTreeMap;
use std::path::Path;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let db_path = "./demo_data/basic.db";

    println!("=== kvlite Basic Demo ===\n");

    if Path::new("./demo_data").exists() {
        std::fs::remove_dir_all("./demo_data")?;
    }

    // PART 1: Write typed values
    println!("PART 1: Writing data...");
    {
        let mut store = KvStore::open(db_path)?;

        let mut alice = BTreeMap::new();
        alice.insert("name".to_string(), Value::from("Alice"));
        alice.insert("admin".to_string(), Value::Bool(true));
        alice.insert("logins".to_string(), Value::Int(17));

        store.set("user:1", Value::Object(alice), None)?;
        store.set("user:2", "Bob", None)?;
        store.set("stats:total_users", 2, None)?;
        store.set("avatar:1", vec![0x89u8, 0x50, 0x4E, 0x47], None)?;

        println!("   Stored {} keys in {}", store.count(None)?, db_path);
        store.close()?;
    }

    // PART 2: Reopen and read back
    println!("\nPART 2: Reopening...");
    {
        let store = KvStore::open(db_path)?;

        if let Some(Value::Object(user)) = store.get("user:1")? {
            println!("   user:1 = {:?}", user);
        }
        println!("   user:2 = {:?}", store.get("user:2")?);
        println!("   avatar:1 kind = {:?}", store.get("avatar:1")?.map(|v| v.kind()));
        println!("   user keys = {:?}", store.keys(Some("user:%"))?);

        // PART 3: Rename and delete
        println!("\nPART 3: Rename and delete...");
        store.rename("user:2", "user:bob")?;
        store.delete("avatar:1")?;
        println!("   keys now = {:?}", store.keys(None)?);

        // PART 4: Paging
        for i in 0..25 {
            store.set(&format!("item:{:03}", i), i, None)?;
        }
        println!("\nPART 4: Page 2 of items (10 per page):");
        println!("   {:?}", store.pagination(10, 2, Some("item:%"))?);
    }

    std::fs::remove_dir_all("./demo_data")?;
    println!("\n=== Demo Complete ===");
    Ok(())
}
