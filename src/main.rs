//! Example binary demonstrating the linode_api library.
//!
//! Lists every instance on the account, optionally filtered.
//!
//! ## Usage
//!
//! 1. Create a `.env` file with `LINODE_TOKEN=...`
//! 2. Run: `cargo run -- '{"region":"us-east"}'`

#![allow(clippy::print_stdout)] // Allow println! in the binary example

use linode_api::{Client, ClientConfig, ListOptions};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration from environment
    let cfg = ClientConfig::from_env()?;
    println!("Configuration loaded:");
    println!("  API: {}/{}", cfg.base_url, cfg.api_version);

    let client = Client::new(cfg)?;

    // First CLI argument, if any, is sent as the X-Filter header
    let filter = std::env::args().nth(1).unwrap_or_default();
    let mut opts = ListOptions::new(0, filter);
    println!("  Cache key: {}", opts.hash()?);

    let instances = client.list_instances(Some(&mut opts)).await?;

    println!(
        "\n{} instance(s) across {} page(s):",
        opts.results(),
        opts.pages()
    );
    for instance in &instances {
        println!(
            "  {:>10}  {:<24} {:<12} {}",
            instance.id, instance.label, instance.region, instance.status
        );
    }

    Ok(())
}
