use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub counter_store: CounterStoreConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub sites: SitesConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Take the client address from `X-Forwarded-For` (only behind a trusted proxy).
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub pool_size: usize,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CounterBackend {
    Memory,
    Redis,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CounterStoreConfig {
    #[serde(default = "default_backend")]
    pub backend: CounterBackend,
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default = "default_key_ttl")]
    pub key_ttl_secs: u64,
    #[serde(default = "default_op_timeout")]
    pub op_timeout_ms: u64,
    #[serde(default = "default_max_keys")]
    pub max_keys: u64,
}

impl Default for CounterStoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            redis_url: None,
            key_ttl_secs: default_key_ttl(),
            op_timeout_ms: default_op_timeout(),
            max_keys: default_max_keys(),
        }
    }
}

fn default_backend() -> CounterBackend {
    CounterBackend::Memory
}
fn default_key_ttl() -> u64 {
    172800 // 48 hours
}
fn default_op_timeout() -> u64 {
    250
}
fn default_max_keys() -> u64 {
    1_000_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    #[serde(default = "default_flush_interval")]
    pub flush_interval_secs: u64,
    #[serde(default = "default_shutdown_flush_timeout")]
    pub shutdown_flush_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            flush_interval_secs: default_flush_interval(),
            shutdown_flush_timeout_secs: default_shutdown_flush_timeout(),
        }
    }
}

fn default_flush_interval() -> u64 {
    300
}
fn default_shutdown_flush_timeout() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct SitesConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub secure_cookies: bool,
    /// Literal substitutions applied in order to served HTML/CSS/JS.
    #[serde(default)]
    pub replacements: Vec<ReplacementRule>,
}

impl Default for SitesConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            secure_cookies: false,
            replacements: Vec::new(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data/projects")
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ReplacementRule {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub cookie_secret: String,
    /// Bearer token for the analytics read API. Unset disables the API.
    #[serde(default)]
    pub api_token: Option<String>,
}

impl AppConfig {
    /// Validate configuration for security and durability requirements.
    pub fn validate(&self) -> Result<(), String> {
        if self.auth.cookie_secret.is_empty()
            || self.auth.cookie_secret == "change-me-in-production"
        {
            return Err("auth.cookie_secret must be set to a strong, unique value. \
                 Set it in config.toml or via STATICHOST__AUTH__COOKIE_SECRET env var."
                .to_string());
        }
        if self.auth.cookie_secret.len() < 32 {
            return Err("auth.cookie_secret must be at least 32 characters.".to_string());
        }
        if let Some(token) = &self.auth.api_token {
            if token.len() < 16 {
                return Err("auth.api_token must be at least 16 characters when set.".to_string());
            }
        }
        if self.pipeline.flush_interval_secs == 0 {
            return Err("pipeline.flush_interval_secs must be greater than zero.".to_string());
        }
        // A delayed flush must never find its counters already expired.
        if self.counter_store.key_ttl_secs < 2 * self.pipeline.flush_interval_secs {
            return Err(format!(
                "counter_store.key_ttl_secs ({}) must be at least twice \
                 pipeline.flush_interval_secs ({}).",
                self.counter_store.key_ttl_secs, self.pipeline.flush_interval_secs
            ));
        }
        if self.counter_store.backend == CounterBackend::Redis
            && self.counter_store.redis_url.as_deref().unwrap_or("").is_empty()
        {
            return Err("counter_store.redis_url is required for the redis backend.".to_string());
        }
        Ok(())
    }

    pub fn load(config_path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder();

        let path = config_path.unwrap_or("config.toml");
        builder = builder.add_source(File::with_name(path).required(false));

        // Overlay with environment variables (STATICHOST__SERVER__PORT=3001, etc.)
        builder = builder.add_source(
            Environment::with_prefix("STATICHOST")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
