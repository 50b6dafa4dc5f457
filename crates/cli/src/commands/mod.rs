//! Subcommand implementations and shared wiring

pub mod config;
pub mod doctor;
pub mod run;
pub mod subscribers;

use alfred_brief_adapters::store::{InMemoryStore, SqliteStore, SupabaseStore};
use alfred_brief_domain::Store;
use anyhow::{Context, Result, bail};
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;

/// Read a secret from the env var named in config
pub(crate) fn load_api_key(env_var: &str, purpose: &str) -> Result<SecretString> {
    if env_var.trim().is_empty() {
        bail!("No API key env var configured for {}", purpose);
    }

    let key = std::env::var(env_var)
        .with_context(|| format!("Missing API key env var {} for {}", env_var, purpose))?;

    if key.trim().is_empty() {
        bail!("API key env var {} is empty for {}", env_var, purpose);
    }

    Ok(SecretString::new(key.into()))
}

/// Build the configured store backend
pub(crate) async fn build_store(config: &AppConfig) -> Result<Arc<dyn Store>> {
    let store: Arc<dyn Store> = match config.store.backend.trim() {
        "sqlite" => Arc::new(
            SqliteStore::new(&config.store.sqlite_path)
                .await
                .with_context(|| {
                    format!(
                        "Failed to open SQLite store at {}",
                        config.store.sqlite_path.display()
                    )
                })?,
        ),
        "supabase" => {
            let url = config.store.supabase_url.trim();
            if url.is_empty() {
                bail!("store.supabase_url is required for the supabase backend");
            }
            let key = load_api_key(&config.store.supabase_key_env, "supabase")?;
            Arc::new(SupabaseStore::with_timeout(
                url,
                key,
                Duration::from_secs(config.sources.timeout_secs),
            ))
        }
        "memory" => Arc::new(InMemoryStore::new()),
        other => bail!("Unknown store backend: {}", other),
    };

    Ok(store)
}

/// Build the store and fail fast if it cannot be reached
pub(crate) async fn connect_store(config: &AppConfig) -> Result<Arc<dyn Store>> {
    let store = build_store(config).await?;
    store
        .ping()
        .await
        .with_context(|| format!("Store connectivity check failed ({})", store.backend()))?;
    tracing::info!(backend = store.backend(), "Store connected");
    Ok(store)
}
