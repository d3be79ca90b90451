use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// API keys for third-party embed intermediaries and provider APIs.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProviderKeys {
    pub embedly: Option<String>,
    pub iframely: Option<String>,
    pub google: Option<String>,
    pub soundcloud: Option<String>,
    pub facebook: Option<String>,
}

impl std::fmt::Debug for ProviderKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "[redacted]");
        f.debug_struct("ProviderKeys")
            .field("embedly", &redact(&self.embedly))
            .field("iframely", &redact(&self.iframely))
            .field("google", &redact(&self.google))
            .field("soundcloud", &redact(&self.soundcloud))
            .field("facebook", &redact(&self.facebook))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub settings_path: Option<PathBuf>,
    pub storage_path: PathBuf,
    pub cache_ttl_secs: u64,
    pub min_image_size: u32,
    pub max_file_name_length: usize,
    pub max_asset_name_length: usize,
    pub fetch_timeout_secs: u64,
    pub user_agent: String,
    pub fetch_max_retries: u32,
    pub fetch_retry_backoff_base_secs: u64,
    pub provider_keys: ProviderKeys,
}
