use anyhow::Result;
use std::io::{self, Write};
use storekit_core::config::{PollSchedule, ProviderConfig, save_config};

/// Helper to read user input.
fn read_input(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Interactively configure hosting provider credentials.
pub fn run() -> Result<()> {
    println!("🔧 Configuring hosting provider...\n");
    println!("📋 You'll need:");
    println!("   1. Provider API base URL");
    println!("   2. API token with project + deployment permissions");
    println!("   3. Account ID");
    println!("   4. Base domain for stable store URLs (e.g. sites.example.com)");
    println!();

    let api_url = read_input("API URL: ")?;
    if api_url.is_empty() {
        anyhow::bail!("API URL is required");
    }
    let api_token = read_input("API Token: ")?;
    if api_token.is_empty() {
        anyhow::bail!("API token is required");
    }
    let account_id = read_input("Account ID: ")?;
    if account_id.is_empty() {
        anyhow::bail!("Account ID is required");
    }
    let base_domain = read_input("Base Domain: ")?;
    if base_domain.is_empty() {
        anyhow::bail!("Base domain is required");
    }

    let config = ProviderConfig {
        api_url,
        api_token,
        account_id,
        base_domain,
        poll: PollSchedule::default(),
        deadline_secs: 600,
    };
    config.validate()?;
    let path = save_config(&config)?;

    println!();
    println!("✅ Configuration saved to: {}", path.display());
    println!("   Stores will publish to: <store>.{}", config.base_domain);
    println!("🚀 Ready! Try: storekit publish <store-path>");
    Ok(())
}
