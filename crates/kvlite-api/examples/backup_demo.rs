//! Backing up an in-memory store and restoring it elsewhere.
//!
//! Run with: cargo run -p kvlite --example backup_demo

use kvlite::KvStore;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== kvlite Backup Demo ===\n");

    let dir = std::env::temp_dir().join("kvlite_backup_demo");
    let image = dir.join("snapshot.db");

    let source = KvStore::in_memory()?;
    for i in 0..100 {
        source.set(&format!("metric:{}", i), i * 10, None)?;
    }

    let meta = source.backup(&image)?;
    println!("1. Backup written to {}", image.display());
    println!("   size = {} bytes, crc32 = {:08x}", meta.size, meta.checksum);

    let mut restored = KvStore::in_memory()?;
    restored.set("scratch", true, None)?;
    restored.restore(&image)?;
    println!("\n2. Restored into a fresh store: {} keys", restored.count(None)?);
    println!("   scratch survived? {}", restored.exists("scratch")?);

    let on_disk = KvStore::open(&image)?;
    println!("\n3. Opened the image directly: metric:7 = {:?}", on_disk.get("metric:7")?);
    drop(on_disk);

    std::fs::remove_dir_all(&dir)?;
    println!("\n=== Demo Complete ===");
    Ok(())
}
