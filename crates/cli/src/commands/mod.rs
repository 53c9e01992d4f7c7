pub mod configure;
pub mod init;
pub mod publish;
pub mod serve;
pub mod status;
pub mod unpublish;
pub mod validate;

use anyhow::{Context, Result};
use std::path::Path;
use storekit_core::types::StoreRecord;
use storekit_publisher::{FsStoreRepository, StoreRepository};

/// Open the repository for a store directory and load its record.
///
/// CLI commands address a store by its directory; the repository root is the
/// parent and the store id is the directory name.
pub(crate) fn open_store(path: &Path) -> Result<(FsStoreRepository, StoreRecord)> {
    let canonical = path
        .canonicalize()
        .with_context(|| format!("store directory not found: {}", path.display()))?;
    let id = canonical
        .file_name()
        .and_then(|n| n.to_str())
        .context("store directory has no usable name")?
        .to_string();
    let root = canonical
        .parent()
        .context("store directory has no parent")?
        .to_path_buf();

    if !canonical.join("store.toml").exists() {
        anyhow::bail!(
            "store.toml not found in {}\nRun 'storekit init {}' first",
            path.display(),
            path.display()
        );
    }

    let repo = FsStoreRepository::new(root);
    let store = repo.get(&id)?;
    Ok((repo, store))
}
