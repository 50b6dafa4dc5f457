//! Configuration loading and management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default)]
    pub mail: MailConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// "text" or "json"
    #[serde(default = "default_log_format")]
    pub log_format: String,

    #[serde(default = "default_true")]
    pub dry_run: bool,

    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// sqlite, supabase or memory
    #[serde(default = "default_store_backend")]
    pub backend: String,

    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: PathBuf,

    #[serde(default)]
    pub supabase_url: String,

    #[serde(default = "default_supabase_key_env")]
    pub supabase_key_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_source_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_gov_uk_url")]
    pub gov_uk_url: String,

    #[serde(default = "default_immigration_sections")]
    pub immigration_sections: usize,

    #[serde(default = "default_bbc_feed_url")]
    pub bbc_feed_url: String,

    #[serde(default = "default_tech_limit")]
    pub tech_limit: usize,

    #[serde(default = "default_exchange_rate_url")]
    pub exchange_rate_url: String,

    #[serde(default = "default_exchange_rate_reference_url")]
    pub exchange_rate_reference_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default = "default_mail_provider")]
    pub provider: String,

    #[serde(default = "default_mail_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_mail_base_url")]
    pub base_url: String,

    #[serde(default = "default_mail_from")]
    pub from: String,

    #[serde(default = "default_mail_subject")]
    pub subject: String,

    /// Base URL of the preferences page; the management token is appended
    #[serde(default)]
    pub preferences_url: Option<String>,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_concurrent() -> usize {
    1
}

fn default_store_backend() -> String {
    "sqlite".to_string()
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./alfred-brief.sqlite")
}

fn default_supabase_key_env() -> String {
    "SUPABASE_KEY".to_string()
}

fn default_source_timeout() -> u64 {
    30
}

fn default_gov_uk_url() -> String {
    "https://www.gov.uk/guidance/immigration-rules".to_string()
}

fn default_immigration_sections() -> usize {
    5
}

fn default_bbc_feed_url() -> String {
    "https://feeds.bbci.co.uk/news/technology/rss.xml".to_string()
}

fn default_tech_limit() -> usize {
    3
}

fn default_exchange_rate_url() -> String {
    "https://open.er-api.com/v6/latest/GBP".to_string()
}

fn default_exchange_rate_reference_url() -> String {
    "https://www.xe.com/currencyconverter/convert/?Amount=1&From=GBP&To=USD".to_string()
}

fn default_mail_provider() -> String {
    "resend".to_string()
}

fn default_mail_api_key_env() -> String {
    "RESEND_API_KEY".to_string()
}

fn default_mail_base_url() -> String {
    "https://api.resend.com".to_string()
}

fn default_mail_from() -> String {
    "Alfred <onboarding@resend.dev>".to_string()
}

fn default_mail_subject() -> String {
    "Your Daily Brief from Alfred".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            dry_run: default_true(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            sqlite_path: default_sqlite_path(),
            supabase_url: String::new(),
            supabase_key_env: default_supabase_key_env(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_source_timeout(),
            gov_uk_url: default_gov_uk_url(),
            immigration_sections: default_immigration_sections(),
            bbc_feed_url: default_bbc_feed_url(),
            tech_limit: default_tech_limit(),
            exchange_rate_url: default_exchange_rate_url(),
            exchange_rate_reference_url: default_exchange_rate_reference_url(),
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            provider: default_mail_provider(),
            api_key_env: default_mail_api_key_env(),
            base_url: default_mail_base_url(),
            from: default_mail_from(),
            subject: default_mail_subject(),
            preferences_url: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Try default config path if none specified
        let default_path = PathBuf::from("./config.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            // User specified a path that doesn't exist
            anyhow::bail!("Config file not found: {}", path.display());
        }

        // Add environment variable overrides
        builder = builder.add_source(
            config::Environment::with_prefix("ALFRED_BRIEF")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r#"# alfred-brief configuration

[general]
log_level = "info"
log_format = "text"  # text, json
# Set to false (or ALFRED_BRIEF__GENERAL__DRY_RUN=false) to actually send email
dry_run = true
# Digests in flight at once; 1 sends sequentially
max_concurrent = 1

[store]
backend = "sqlite"  # sqlite, supabase, memory
sqlite_path = "./alfred-brief.sqlite"
# supabase_url = "https://your-project.supabase.co"
supabase_key_env = "SUPABASE_KEY"

[sources]
timeout_secs = 30
gov_uk_url = "https://www.gov.uk/guidance/immigration-rules"
immigration_sections = 5
bbc_feed_url = "https://feeds.bbci.co.uk/news/technology/rss.xml"
tech_limit = 3
exchange_rate_url = "https://open.er-api.com/v6/latest/GBP"
exchange_rate_reference_url = "https://www.xe.com/currencyconverter/convert/?Amount=1&From=GBP&To=USD"

[mail]
provider = "resend"
api_key_env = "RESEND_API_KEY"
base_url = "https://api.resend.com"
from = "Alfred <onboarding@resend.dev>"
subject = "Your Daily Brief from Alfred"
# preferences_url = "https://example.com/preferences"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_toml_matches_defaults() {
        let parsed: AppConfig = toml::from_str(&AppConfig::example_toml()).unwrap();
        let defaults = AppConfig::default();

        assert_eq!(parsed.general.dry_run, defaults.general.dry_run);
        assert_eq!(parsed.general.max_concurrent, defaults.general.max_concurrent);
        assert_eq!(parsed.store.backend, defaults.store.backend);
        assert_eq!(parsed.store.sqlite_path, defaults.store.sqlite_path);
        assert_eq!(parsed.sources.tech_limit, defaults.sources.tech_limit);
        assert_eq!(parsed.sources.gov_uk_url, defaults.sources.gov_uk_url);
        assert_eq!(parsed.mail.from, defaults.mail.from);
        assert!(parsed.mail.preferences_url.is_none());
    }

    #[test]
    fn missing_sections_use_defaults() {
        let parsed: AppConfig = toml::from_str("[store]\nbackend = \"memory\"\n").unwrap();

        assert_eq!(parsed.store.backend, "memory");
        assert_eq!(parsed.store.supabase_key_env, "SUPABASE_KEY");
        assert_eq!(parsed.sources.timeout_secs, 30);
        assert_eq!(parsed.mail.api_key_env, "RESEND_API_KEY");
    }
}
