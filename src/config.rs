//! Configuration file support for npm-risk-report.
//!
//! Provides YAML-based configuration through `npm-risk-report.config.yml`
//! files, including data structures, file loading, validation and the
//! conversion into the settings each component takes.

use anyhow::{bail, Context};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::adapters::outbound::network::{
    OpenAiCompatibleClient, OsvClient, OsvOptions, RetryPolicy,
};
use crate::application::use_cases::{ResolverOptions, SummaryJobSettings};
use crate::risk_analysis::domain::{AiProvider, ApiKey, ProviderProfile};
use crate::shared::security::validate_https_base_url;
use crate::shared::Result;

pub const CONFIG_FILENAME: &str = "npm-risk-report.config.yml";

/// Environment variable overriding `server.listen`
pub const LISTEN_ENV: &str = "NPM_RISK_REPORT_LISTEN";

const LOG_FORMATS: [&str; 3] = ["compact", "pretty", "json"];

/// Top-level configuration file schema.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ConfigFile {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub http: HttpConfig,
    pub registry: RegistryConfig,
    pub osv: OsvConfig,
    pub cache: CacheConfig,
    pub resolver: ResolverConfig,
    pub ai: AiConfig,
    /// Captures unknown fields for warnings.
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_yaml_ng::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive; `RUST_LOG` takes precedence
    pub level: String,
    /// `compact`, `pretty` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_ms: u64,
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_attempts: 3,
            base_backoff_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub base_url: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: "https://registry.npmjs.org".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OsvConfig {
    pub base_url: String,
    pub batch_size: usize,
    pub hydrate_details: bool,
}

impl Default for OsvConfig {
    fn default() -> Self {
        let options = OsvOptions::default();
        Self {
            base_url: options.base_url,
            batch_size: options.batch_size,
            hydrate_details: options.hydrate_details,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 3600 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub max_depth: usize,
    pub max_concurrency: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        let options = ResolverOptions::default();
        Self {
            max_depth: options.max_depth,
            max_concurrency: options.max_concurrency,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub default_provider: String,
    pub execution_timeout_secs: u64,
    pub job_ttl_secs: i64,
    pub queue_capacity: usize,
    pub max_concurrent_jobs: usize,
    pub temperature: f32,
    pub max_tokens: u32,
    pub groq: ProviderConfig,
    pub openrouter: ProviderConfig,
}

impl Default for AiConfig {
    fn default() -> Self {
        let settings = SummaryJobSettings::default();
        Self {
            default_provider: settings.default_provider.to_string(),
            execution_timeout_secs: settings.execution_timeout.as_secs(),
            job_ttl_secs: settings.job_ttl.num_seconds(),
            queue_capacity: settings.queue_capacity,
            max_concurrent_jobs: settings.max_concurrent_jobs,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            groq: ProviderConfig::default(),
            openrouter: ProviderConfig::default(),
        }
    }
}

/// Per-provider overrides. Unset fields fall back to the built-in profile.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: Option<String>,
    pub default_model: Option<String>,
    pub allowed_models: Option<Vec<String>>,
    pub api_key_env: Option<String>,
}

impl AiConfig {
    fn provider_config(&self, provider: AiProvider) -> &ProviderConfig {
        match provider {
            AiProvider::Groq => &self.groq,
            AiProvider::OpenRouter => &self.openrouter,
        }
    }

    pub fn base_url(&self, provider: AiProvider) -> String {
        self.provider_config(provider)
            .base_url
            .clone()
            .unwrap_or_else(|| OpenAiCompatibleClient::default_base_url(provider).to_string())
    }

    pub fn api_key_env(&self, provider: AiProvider) -> String {
        self.provider_config(provider)
            .api_key_env
            .clone()
            .unwrap_or_else(|| match provider {
                AiProvider::Groq => "GROQ_API_KEY".to_string(),
                AiProvider::OpenRouter => "OPENROUTER_API_KEY".to_string(),
            })
    }

    fn profile(&self, provider: AiProvider, builtin: &ProviderProfile) -> ProviderProfile {
        let overrides = self.provider_config(provider);
        ProviderProfile {
            provider,
            default_model: overrides
                .default_model
                .clone()
                .unwrap_or_else(|| builtin.default_model.clone()),
            allowed_models: overrides
                .allowed_models
                .clone()
                .unwrap_or_else(|| builtin.allowed_models.clone()),
        }
    }
}

impl ConfigFile {
    /// Applies environment overrides. `lookup` is `std::env::var` in production.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(listen) = lookup(LISTEN_ENV).filter(|v| !v.trim().is_empty()) {
            self.server.listen = listen.trim().to_string();
        }
    }

    /// Warning lines for unknown top-level keys, logged once tracing is up
    pub fn unknown_field_warnings(&self) -> Vec<String> {
        let mut keys: Vec<&String> = self.unknown_fields.keys().collect();
        keys.sort();
        keys.into_iter()
            .map(|key| format!("Unknown config field '{}' will be ignored", key))
            .collect()
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.server.listen.parse().with_context(|| {
            format!(
                "Invalid listen address '{}'\n\n💡 Hint: Use host:port, e.g. 127.0.0.1:8080",
                self.server.listen
            )
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.http.max_attempts,
            base_backoff: Duration::from_millis(self.http.base_backoff_ms),
            timeout: Duration::from_millis(self.http.timeout_ms),
        }
    }

    /// Retry policy for AI calls: same attempts, but the whole execution
    /// budget as the per-request timeout
    pub fn ai_retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_secs(self.ai.execution_timeout_secs),
            ..self.retry_policy()
        }
    }

    pub fn osv_options(&self) -> OsvOptions {
        OsvOptions {
            base_url: self.osv.base_url.clone(),
            batch_size: self.osv.batch_size,
            hydrate_details: self.osv.hydrate_details,
        }
    }

    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            max_depth: self.resolver.max_depth,
            max_concurrency: self.resolver.max_concurrency,
        }
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.cache.ttl_secs).unwrap_or(i64::MAX))
    }

    /// Builds the job settings, reading credentials through `lookup`
    pub fn summary_job_settings(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<SummaryJobSettings> {
        let builtin = SummaryJobSettings::default();
        let default_provider: AiProvider = self.ai.default_provider.parse()?;

        let profiles = builtin
            .profiles
            .iter()
            .map(|profile| self.ai.profile(profile.provider, profile))
            .collect();

        let credentials = AiProvider::ALL
            .iter()
            .filter_map(|provider| {
                let raw = lookup(&self.ai.api_key_env(*provider))?;
                ApiKey::new(raw).ok().map(|key| (*provider, key))
            })
            .collect();

        Ok(SummaryJobSettings {
            default_provider,
            profiles,
            credentials,
            job_ttl: chrono::Duration::seconds(self.ai.job_ttl_secs),
            execution_timeout: Duration::from_secs(self.ai.execution_timeout_secs),
            queue_capacity: self.ai.queue_capacity,
            max_concurrent_jobs: self.ai.max_concurrent_jobs,
            temperature: self.ai.temperature,
            max_tokens: self.ai.max_tokens,
        })
    }
}

/// Load config from an explicit path. Returns an error if the file is not found.
pub fn load_config_from_path(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path).with_context(|| {
        format!(
            "Failed to read config file: {}\n\n💡 Hint: Check that the file exists and is readable.",
            path.display()
        )
    })?;

    let config: ConfigFile = if content.trim().is_empty() {
        ConfigFile::default()
    } else {
        serde_yaml_ng::from_str(&content).with_context(|| {
            format!(
                "Failed to parse config file: {}\n\n💡 Hint: Ensure the file contains valid YAML syntax.",
                path.display()
            )
        })?
    };

    validate_config(&config)?;

    Ok(config)
}

/// Auto-discover config in a directory. Returns `None` silently if not found.
pub fn discover_config(dir: &Path) -> Result<Option<ConfigFile>> {
    let config_path = dir.join(CONFIG_FILENAME);

    if !config_path.exists() {
        return Ok(None);
    }

    let config = load_config_from_path(&config_path)?;
    Ok(Some(config))
}

/// Validate the loaded configuration.
pub fn validate_config(config: &ConfigFile) -> Result<()> {
    config.listen_addr()?;

    if !LOG_FORMATS.contains(&config.logging.format.as_str()) {
        bail!(
            "Invalid config: logging.format '{}' is not supported.\n\n\
             💡 Hint: Use one of: {}",
            config.logging.format,
            LOG_FORMATS.join(", ")
        );
    }

    if config.http.max_attempts == 0 || config.http.timeout_ms == 0 {
        bail!(
            "Invalid config: http.max_attempts and http.timeout_ms must be greater than 0.\n\n\
             💡 Hint: The defaults are 3 attempts and 10000 ms."
        );
    }

    validate_https_base_url(&config.registry.base_url, "registry")?;
    validate_https_base_url(&config.osv.base_url, "OSV")?;

    if !(1..=OsvClient::MAX_BATCH_SIZE).contains(&config.osv.batch_size) {
        bail!(
            "Invalid config: osv.batch_size must be between 1 and {} (got {}).",
            OsvClient::MAX_BATCH_SIZE,
            config.osv.batch_size
        );
    }

    if config.resolver.max_depth == 0 || config.resolver.max_concurrency == 0 {
        bail!("Invalid config: resolver.max_depth and resolver.max_concurrency must be at least 1.");
    }

    let provider: AiProvider = config.ai.default_provider.parse()?;
    validate_https_base_url(&config.ai.base_url(provider), provider.as_str())?;

    if !(0.0..=2.0).contains(&config.ai.temperature) {
        bail!(
            "Invalid config: ai.temperature must be between 0.0 and 2.0 (got {}).",
            config.ai.temperature
        );
    }

    if config.ai.job_ttl_secs <= 0
        || config.ai.execution_timeout_secs == 0
        || config.ai.queue_capacity == 0
        || config.ai.max_concurrent_jobs == 0
    {
        bail!(
            "Invalid config: ai.job_ttl_secs, ai.execution_timeout_secs, ai.queue_capacity and \
             ai.max_concurrent_jobs must be greater than 0."
        );
    }

    Ok(())
}
