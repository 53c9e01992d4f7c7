use anyhow::Result;
use std::path::PathBuf;
use storekit_publisher::StoreRepository;

use super::open_store;

/// Clear a store's publish metadata. The remote deployment stays live until
/// the provider garbage-collects it; only the local record is dropped.
pub fn run(path: PathBuf) -> Result<()> {
    let (repo, store) = open_store(&path)?;
    repo.clear_publish(&store.id)?;
    println!("✅ Publish metadata cleared for {}", store.store_name);
    Ok(())
}
