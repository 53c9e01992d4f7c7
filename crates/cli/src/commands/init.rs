use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Create a new store directory with a starter layout.
pub fn run(path: PathBuf, name: Option<String>) -> Result<()> {
    if path.join("store.toml").exists() {
        anyhow::bail!("{} already contains a store", path.display());
    }
    fs::create_dir_all(&path)
        .with_context(|| format!("failed to create {}", path.display()))?;

    let display_name = name.unwrap_or_else(|| {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "My Store".to_string())
    });

    let store_toml = format!(
        "# Store identity. The domain (when set) derives the hosting project name.\n\
         store_name = \"{}\"\n\
         # domain = \"shop.example.com\"\n\
         # custom_domain = \"shop.example.com\"\n",
        toml_escape(&display_name)
    );
    fs::write(path.join("store.toml"), store_toml)?;

    let layout = serde_json::json!({
        "pages": [
            {
                "name": "Home",
                "path": "/",
                "sections": [
                    { "type": "hero", "title": display_name, "subtitle": "Welcome to our store" },
                    { "type": "products", "title": "Featured", "items": [] }
                ]
            }
        ]
    });
    fs::write(
        path.join("layout.json"),
        serde_json::to_string_pretty(&layout)?,
    )?;

    println!("✅ Store initialized at {}", path.display());
    println!("   Edit layout.json, then run: storekit publish {}", path.display());
    Ok(())
}

/// Escape for a TOML basic string.
fn toml_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_store_files() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("corner-shop");
        run(dir.clone(), None).unwrap();
        assert!(dir.join("store.toml").exists());
        assert!(dir.join("layout.json").exists());
        let toml = fs::read_to_string(dir.join("store.toml")).unwrap();
        assert!(toml.contains("store_name = \"corner-shop\""));
    }

    #[test]
    fn test_init_refuses_existing_store() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("shop");
        run(dir.clone(), Some("Shop".into())).unwrap();
        assert!(run(dir, None).is_err());
    }
}
