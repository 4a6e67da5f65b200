//! `promptmaster key`: validate and store the API key.

use promptmaster_core::state::validate_credential;

use super::open_store;

pub async fn run(value: String) -> Result<(), Box<dyn std::error::Error>> {
    let key = validate_credential(Some(&value))?;
    let (config, store) = open_store().await?;

    store
        .save_credential(key)
        .await
        .map_err(|e| format!("Failed to save API key: {e}"))?;

    println!("✅ API key saved to {}", config.data_dir().display());
    if config.has_api_key() {
        println!("   Note: an API key from config.toml or the environment takes precedence.");
    }
    Ok(())
}
