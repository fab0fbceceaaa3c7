// Service settings loaded from config/dashboard.toml with DASHBOARD__* overrides
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub realtime: RealtimeSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub feeds: FeedSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Rest,
    #[default]
    Memory,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StoreSettings {
    #[serde(default)]
    pub kind: StoreKind,
    pub url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RealtimeSettings {
    /// Accepted live credentials. Empty accepts any non-empty credential.
    #[serde(default)]
    pub credentials: Vec<String>,
    /// Bearer token the row-change hook must present to publish. Publishing
    /// is refused while unset.
    pub publish_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheSettings {
    /// Directory for persisted entries; in-memory when unset.
    pub dir: Option<PathBuf>,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            dir: None,
            ttl_secs: default_ttl_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedSettings {
    #[serde(default = "default_sleeper_base_url")]
    pub sleeper_base_url: String,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            sleeper_base_url: default_sleeper_base_url(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_ttl_secs() -> u64 {
    3 * 60 * 60
}

fn default_sleeper_base_url() -> String {
    "https://api.sleeper.app/v1".to_string()
}

pub fn load_settings() -> anyhow::Result<Settings> {
    load_settings_from("config/dashboard")
}

/// Load settings from `name` (extension optional; the file may be absent),
/// then apply `DASHBOARD__SECTION__KEY` environment overrides.
pub fn load_settings_from(name: &str) -> anyhow::Result<Settings> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name(name).required(false))
        .add_source(
            config::Environment::with_prefix("DASHBOARD")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("realtime.credentials")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
