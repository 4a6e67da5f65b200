//! `promptmaster status`: show configuration and knowledge base state.

use promptmaster_config::AppConfig;
use tracing::info;

use super::{KeySource, open_engine, open_store, resolve_credential};

pub async fn run(check: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (config, store) = open_store().await?;
    let (_, key_source) = resolve_credential(&config, &store).await;
    let history = store.version_history().await;

    println!("🎬 PromptMaster Status");
    println!("======================");
    println!("  Config dir:     {}", AppConfig::config_dir().display());
    println!("  Data dir:       {}", config.data_dir().display());
    println!("  Remote model:   {}", config.remote_model);
    println!("  Default target: {}", config.default_target);
    println!("  Temperature:    {}", config.temperature);
    println!("  API key:        {}", key_source.describe());
    println!("  Corpus:         {} chars", store.corpus().await.chars().count());
    println!("  Learned docs:   {}", history.len());
    if let Some(latest) = history.first() {
        println!(
            "  Last learned:   {} ({})",
            latest.source_name,
            latest.timestamp.format("%Y-%m-%d %H:%M")
        );
    }

    if key_source == KeySource::Missing {
        println!("\n  ⚠️  No API key: run `promptmaster key <KEY>`");
    }

    if check {
        drop(store);
        let (_, engine) = open_engine().await?;
        info!("Checking connection to the remote model");
        match engine.check_connection().await {
            Ok(true) => println!("\n  ✅ Remote model reachable, API key accepted"),
            Ok(false) => println!("\n  ⚠️  Remote model answered but is not available right now"),
            Err(e) => println!("\n  ❌ {e}"),
        }
    }

    Ok(())
}
