use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use storekit_core::ProviderConfig;
use storekit_deployer::HttpProvider;
use storekit_publisher::{Publisher, StoreRepository};

use super::open_store;

/// Publish a store to the hosting provider.
pub async fn run(path: PathBuf, force: bool) -> Result<()> {
    println!("🚀 Publishing store...\n");

    let (repo, store) = open_store(&path)?;
    let config = ProviderConfig::load().context(
        "No provider configuration found.\nRun 'storekit configure' first",
    )?;

    println!("📋 Publish Plan:");
    println!("   Store: {}", store.store_name);
    println!("   Project: {}", store.project_name());
    println!("   URL: https://{}", config.stable_alias(&store.project_name()));
    if let Some(domain) = &store.custom_domain {
        println!("   Custom domain: {}", domain);
    }
    println!();

    if !force {
        print!("❓ Publish now? (y/N): ");
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("❌ Publish cancelled");
            return Ok(());
        }
        println!();
    }

    let provider = HttpProvider::new(&config)?;
    let publisher = Publisher::new(Arc::new(provider), config);

    println!("📦 Building and deploying (this can take a while)...");
    let receipt = publisher.publish(&store).await?;
    repo.record_publish(&store.id, &receipt)?;

    println!();
    println!("✅ Publish complete!");
    println!("   Live URL: {}", receipt.url);
    println!("   Deployment: {}", receipt.deployment_id);
    Ok(())
}
