use anyhow::Result;
use std::path::PathBuf;

use super::open_store;

/// Parse and normalize the store's layout, reporting what a publish would
/// actually render.
pub fn run(path: PathBuf) -> Result<()> {
    let (_repo, store) = open_store(&path)?;

    println!("🔍 Validating layout for: {}", store.store_name);
    let site = storekit_layout::parse_layout(store.layout.as_deref(), &store.store_name)?;

    println!("✓ Layout is publishable");
    println!("  Pages: {}", site.pages.len());
    for page in &site.pages {
        let unknown = page
            .sections
            .iter()
            .filter(|s| !s.kind.is_known())
            .count();
        print!("    {} ({} sections)", page.path, page.sections.len());
        if unknown > 0 {
            print!("  ⚠ {} unrecognized section type(s), will render as empty", unknown);
        }
        println!();
    }
    Ok(())
}
