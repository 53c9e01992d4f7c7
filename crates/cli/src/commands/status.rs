use anyhow::Result;
use std::path::PathBuf;
use storekit_core::ProviderConfig;
use storekit_deployer::{HostingProvider, HttpProvider};
use storekit_publisher::StoreRepository;

use super::open_store;

/// Show local publish metadata and, when credentials are configured, the
/// provider's view of the project.
pub async fn run(path: Option<PathBuf>) -> Result<()> {
    let path = path.unwrap_or_else(|| PathBuf::from("."));
    let (repo, store) = open_store(&path)?;

    println!("📊 Publish status\n");
    println!("📋 Store:");
    println!("   Name: {}", store.store_name);
    println!("   Project: {}", store.project_name());
    println!();

    let state = repo.publish_state(&store.id)?;
    if state.is_published() {
        println!("   ✅ Published");
        if let Some(url) = &state.published_url {
            println!("   URL: {}", url);
        }
        if let Some(id) = &state.deployment_id {
            println!("   Deployment: {}", id);
        }
        if let Some(at) = &state.last_published {
            println!("   Last published: {}", at.to_rfc3339());
        }
    } else {
        println!("   ❌ Not published");
        println!("   Run 'storekit publish {}' to publish", path.display());
    }
    println!();

    match ProviderConfig::load() {
        Ok(config) => {
            let provider = HttpProvider::new(&config)?;
            match provider.get_project(&store.project_name()).await? {
                Some(project) => {
                    println!("☁️  Provider project: {}", project.name);
                    if !project.domains.is_empty() {
                        println!("   Domains:");
                        for domain in &project.domains {
                            println!("     - https://{}", domain);
                        }
                    }
                }
                None => println!("☁️  No project on the provider yet"),
            }
        }
        Err(_) => {
            println!("☁️  Provider not configured (run 'storekit configure' to query it)");
        }
    }
    Ok(())
}
