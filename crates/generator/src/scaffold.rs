use serde_json::json;
use std::fs;
use std::path::Path;
use storekit_core::error::{Error, Result};
use storekit_core::types::StoreRecord;

/// Write the minimal static-site project skeleton into a fresh workspace.
///
/// Filesystem writes only; no network. The skeleton is a plain Node project:
/// a manifest with a `build` script, the build entry point, a base stylesheet,
/// and the source directories the synthesizer fills in.
pub fn scaffold(workspace: &Path, store: &StoreRecord) -> Result<()> {
    let write = |rel: &str, contents: &str| -> Result<()> {
        let path = workspace.join(rel);
        fs::write(&path, contents)
            .map_err(|e| Error::Scaffold(format!("writing {}: {}", path.display(), e)))
    };

    for dir in ["src", "src/pages", "src/components"] {
        let path = workspace.join(dir);
        fs::create_dir_all(&path)
            .map_err(|e| Error::Scaffold(format!("creating {}: {}", path.display(), e)))?;
    }

    let manifest = json!({
        "name": store.project_name(),
        "private": true,
        "scripts": { "build": "node build.js" },
    });
    write(
        "package.json",
        &serde_json::to_string_pretty(&manifest)
            .map_err(|e| Error::Scaffold(e.to_string()))?,
    )?;

    let site_config = json!({
        "storeId": store.id,
        "storeName": store.store_name,
    });
    write(
        "site.config.json",
        &serde_json::to_string_pretty(&site_config)
            .map_err(|e| Error::Scaffold(e.to_string()))?,
    )?;

    write("build.js", BUILD_ENTRY)?;
    write("src/styles.css", BASE_STYLES)?;

    tracing::debug!(workspace = %workspace.display(), "workspace scaffolded");
    Ok(())
}

/// Build entry point: renders every page module into `dist/` and copies the
/// stylesheet. Kept dependency-free so `npm install` is a no-op in the common
/// case.
const BUILD_ENTRY: &str = r#"const fs = require("fs");
const path = require("path");

const pagesDir = path.join(__dirname, "src", "pages");
const dist = path.join(__dirname, "dist");

fs.rmSync(dist, { recursive: true, force: true });
fs.mkdirSync(dist, { recursive: true });

for (const file of fs.readdirSync(pagesDir).sort()) {
  if (!file.endsWith(".js")) continue;
  const page = require(path.join(pagesDir, file));
  const rel =
    page.path === "/"
      ? "index.html"
      : path.join(page.path.replace(/^\//, ""), "index.html");
  const out = path.join(dist, rel);
  fs.mkdirSync(path.dirname(out), { recursive: true });
  fs.writeFileSync(out, page.render());
}

fs.copyFileSync(
  path.join(__dirname, "src", "styles.css"),
  path.join(dist, "styles.css")
);
"#;

const BASE_STYLES: &str = r#"* { box-sizing: border-box; }
body { margin: 0; font-family: system-ui, sans-serif; color: #1a1a1a; }
nav { display: flex; gap: 1rem; padding: 1rem 2rem; border-bottom: 1px solid #eee; }
nav a { color: inherit; text-decoration: none; }
main section { padding: 2rem; max-width: 64rem; margin: 0 auto; }
.hero { text-align: center; padding: 4rem 2rem; }
.grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(14rem, 1fr)); gap: 1rem; }
footer { padding: 2rem; border-top: 1px solid #eee; font-size: 0.875rem; color: #666; }
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> StoreRecord {
        StoreRecord {
            id: "s1".into(),
            store_name: "Test Store".into(),
            domain: None,
            custom_domain: None,
            layout: None,
        }
    }

    #[test]
    fn test_scaffold_writes_skeleton() {
        let dir = TempDir::new().unwrap();
        scaffold(dir.path(), &store()).unwrap();

        for rel in [
            "package.json",
            "site.config.json",
            "build.js",
            "src/styles.css",
            "src/pages",
            "src/components",
        ] {
            assert!(dir.path().join(rel).exists(), "missing {rel}");
        }
    }

    #[test]
    fn test_manifest_has_build_script() {
        let dir = TempDir::new().unwrap();
        scaffold(dir.path(), &store()).unwrap();
        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("package.json")).unwrap())
                .unwrap();
        assert_eq!(manifest["name"], "test-store");
        assert_eq!(manifest["scripts"]["build"], "node build.js");
    }

    #[test]
    fn test_scaffold_over_a_file_fails() {
        let dir = TempDir::new().unwrap();
        let clash = dir.path().join("ws");
        fs::write(&clash, "not a directory").unwrap();
        let err = scaffold(&clash, &store()).unwrap_err();
        assert!(matches!(err, Error::Scaffold(_)));
    }
}
