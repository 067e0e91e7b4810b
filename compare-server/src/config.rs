//! Configuration for the comparison server.

use std::env;
use std::time::Duration;

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

/// Environment variable holding the inference access token.
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Remote model catalog settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_url")]
    pub url: String,
    /// How long a fetched (or fallback) catalog is served before refetching.
    #[serde(default = "default_catalog_ttl")]
    pub ttl_secs: u64,
    /// HTTP timeout for a single catalog fetch.
    #[serde(default = "default_catalog_timeout")]
    pub timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: default_catalog_url(),
            ttl_secs: default_catalog_ttl(),
            timeout_secs: default_catalog_timeout(),
        }
    }
}

impl CatalogConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Hosted inference endpoint settings.
#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_inference_endpoint")]
    pub endpoint: String,
    /// Access token. Falls back to `GITHUB_TOKEN` when unset.
    #[serde(default)]
    pub token: Option<String>,
    /// Per-model call timeout. 0 disables it.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_inference_endpoint(),
            token: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl InferenceConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory saved comparisons are confined to.
    #[serde(default = "default_output_dir")]
    pub dir: String,
    /// File name used when the caller names none.
    #[serde(default = "default_output_file")]
    pub default_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            default_file: default_output_file(),
        }
    }
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_catalog_url() -> String {
    "https://api.catalog.azureml.ms/asset-gallery/v1.0/models".to_string()
}
fn default_catalog_ttl() -> u64 {
    600
}
fn default_catalog_timeout() -> u64 {
    30
}
fn default_inference_endpoint() -> String {
    "https://models.inference.ai.azure.com".to_string()
}
fn default_request_timeout() -> u64 {
    300
}
fn default_output_dir() -> String {
    ".".to_string()
}
fn default_output_file() -> String {
    "model_comparison_results.json".to_string()
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (COMPARE__SECTION__KEY format)
    /// 2. config.toml file (if present)
    /// 3. Built-in defaults
    ///
    /// The inference token additionally falls back to `GITHUB_TOKEN`.
    pub fn load() -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            .set_default("api.host", default_host())?
            .set_default("api.port", default_port() as i64)?
            .set_default("catalog.ttl_secs", default_catalog_ttl() as i64)?
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("COMPARE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: Config = config.try_deserialize()?;
        config.inference.token = resolve_token(
            config.inference.token.take(),
            env::var(TOKEN_ENV_VAR).ok(),
        );
        Ok(config)
    }
}

/// Explicit token wins; blank values count as missing.
fn resolve_token(configured: Option<String>, from_env: Option<String>) -> Option<String> {
    configured
        .filter(|t| !t.trim().is_empty())
        .or_else(|| from_env.filter(|t| !t.trim().is_empty()))
}
