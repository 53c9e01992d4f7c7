use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use storekit_core::error::{Error, Result};
use storekit_core::types::{PublishReceipt, StoreRecord};

/// Publish metadata as persisted alongside a store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_published: Option<DateTime<Utc>>,
}

impl PublishState {
    pub fn is_published(&self) -> bool {
        self.published_url.is_some()
    }
}

/// Durable owner of store records and their publish metadata. The publish
/// pipeline only reads stores; writing happens after it returns.
pub trait StoreRepository: Send + Sync {
    fn get(&self, store_id: &str) -> Result<StoreRecord>;
    fn put_layout(&self, store_id: &str, layout: &str) -> Result<()>;
    fn publish_state(&self, store_id: &str) -> Result<PublishState>;
    fn record_publish(&self, store_id: &str, receipt: &PublishReceipt) -> Result<()>;
    fn clear_publish(&self, store_id: &str) -> Result<()>;
}

/// Raw `store.toml` shape.
#[derive(Debug, Deserialize)]
struct RawStore {
    store_name: String,
    domain: Option<String>,
    custom_domain: Option<String>,
}

/// Directory-per-store repository: `<root>/<id>/store.toml` for identity,
/// `layout.json` for the pending layout, `published.toml` for publish
/// metadata.
pub struct FsStoreRepository {
    root: PathBuf,
}

impl FsStoreRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn store_dir(&self, store_id: &str) -> Result<PathBuf> {
        // Store ids become path components; refuse anything that could
        // escape the root.
        if store_id.is_empty()
            || store_id.contains('/')
            || store_id.contains('\\')
            || store_id.contains("..")
        {
            return Err(Error::NotFound(format!("store {}", store_id)));
        }
        let dir = self.root.join(store_id);
        if !dir.is_dir() {
            return Err(Error::NotFound(format!("store {}", store_id)));
        }
        Ok(dir)
    }

    fn published_path(dir: &Path) -> PathBuf {
        dir.join("published.toml")
    }
}

impl StoreRepository for FsStoreRepository {
    fn get(&self, store_id: &str) -> Result<StoreRecord> {
        let dir = self.store_dir(store_id)?;
        let raw: RawStore = toml::from_str(&fs::read_to_string(dir.join("store.toml"))?)?;
        let layout_path = dir.join("layout.json");
        let layout = if layout_path.exists() {
            Some(fs::read_to_string(&layout_path)?)
        } else {
            None
        };
        Ok(StoreRecord {
            id: store_id.to_string(),
            store_name: raw.store_name,
            domain: raw.domain,
            custom_domain: raw.custom_domain,
            layout,
        })
    }

    fn put_layout(&self, store_id: &str, layout: &str) -> Result<()> {
        let dir = self.store_dir(store_id)?;
        fs::write(dir.join("layout.json"), layout)?;
        Ok(())
    }

    fn publish_state(&self, store_id: &str) -> Result<PublishState> {
        let dir = self.store_dir(store_id)?;
        let path = Self::published_path(&dir);
        if !path.exists() {
            return Ok(PublishState::default());
        }
        Ok(toml::from_str(&fs::read_to_string(path)?)?)
    }

    fn record_publish(&self, store_id: &str, receipt: &PublishReceipt) -> Result<()> {
        let dir = self.store_dir(store_id)?;
        let state = PublishState {
            published_url: Some(receipt.url.clone()),
            deployment_id: Some(receipt.deployment_id.clone()),
            last_published: Some(receipt.published_at),
        };
        let contents = toml::to_string_pretty(&state)
            .map_err(|e| Error::Config(format!("failed to serialize publish state: {}", e)))?;
        fs::write(Self::published_path(&dir), contents)?;
        Ok(())
    }

    fn clear_publish(&self, store_id: &str) -> Result<()> {
        let dir = self.store_dir(store_id)?;
        let path = Self::published_path(&dir);
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo_with_store(id: &str) -> (TempDir, FsStoreRepository) {
        let root = TempDir::new().unwrap();
        let dir = root.path().join(id);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("store.toml"),
            "store_name = \"Test Store\"\ndomain = \"test.example.com\"\n",
        )
        .unwrap();
        let repo = FsStoreRepository::new(root.path());
        (root, repo)
    }

    #[test]
    fn test_get_reads_store_and_layout() {
        let (root, repo) = repo_with_store("s1");
        fs::write(root.path().join("s1/layout.json"), r#"{"pages":[]}"#).unwrap();
        let store = repo.get("s1").unwrap();
        assert_eq!(store.store_name, "Test Store");
        assert_eq!(store.layout.as_deref(), Some(r#"{"pages":[]}"#));
    }

    #[test]
    fn test_missing_store_is_not_found() {
        let (_root, repo) = repo_with_store("s1");
        assert!(matches!(repo.get("nope"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_traversal_ids_rejected() {
        let (_root, repo) = repo_with_store("s1");
        assert!(matches!(repo.get("../s1"), Err(Error::NotFound(_))));
        assert!(matches!(repo.get("a/b"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_publish_state_round_trip() {
        let (_root, repo) = repo_with_store("s1");
        assert!(!repo.publish_state("s1").unwrap().is_published());

        let receipt = PublishReceipt {
            url: "https://test.sites.test".into(),
            deployment_id: "dep-1".into(),
            published_at: Utc::now(),
        };
        repo.record_publish("s1", &receipt).unwrap();
        let state = repo.publish_state("s1").unwrap();
        assert!(state.is_published());
        assert_eq!(state.deployment_id.as_deref(), Some("dep-1"));

        repo.clear_publish("s1").unwrap();
        assert!(!repo.publish_state("s1").unwrap().is_published());
        // Clearing twice is fine.
        repo.clear_publish("s1").unwrap();
    }

    #[test]
    fn test_put_layout_overwrites() {
        let (root, repo) = repo_with_store("s1");
        repo.put_layout("s1", "{}").unwrap();
        repo.put_layout("s1", r#"{"pages":[]}"#).unwrap();
        let contents = fs::read_to_string(root.path().join("s1/layout.json")).unwrap();
        assert_eq!(contents, r#"{"pages":[]}"#);
    }
}
