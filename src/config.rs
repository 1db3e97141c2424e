//! Configuration management for execfinder
//!
//! All configuration is loaded from `./config/execfinder.toml`.
//! No hardcoded defaults exist in source code - all defaults are in the
//! config template. Tuned constants (confidence gate, batch size, timeouts)
//! are configuration, not load-bearing literals.

use serde::Deserialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration file path relative to working directory
pub const CONFIG_PATH: &str = "./config/execfinder.toml";

/// Default configuration file content - this is the ONLY place defaults exist
pub const DEFAULT_CONFIG: &str = include_str!("../config/execfinder.toml");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found at {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Configuration field '{field}' cannot be empty")]
    EmptyRequired { field: String },

    #[error("Configuration field '{field}' has invalid value {value}: {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid URL in '{field}': {url}")]
    InvalidUrl { field: String, url: String },
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub pipeline: PipelineConfig,
    pub scheduler: SchedulerConfig,
    pub cache: CacheConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub user_agent: String,
    pub request_timeout_secs: u64,
}

/// Decision-pipeline tuning
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Candidates below this confidence never reach contact enrichment
    pub confidence_gate: u8,
    /// Parent executives only replace subsidiary ones when their confidence
    /// exceeds the subsidiary's by this margin
    pub parent_replacement_margin: u8,
    /// Minimum strict-pass classifier score before the fallback pass runs
    pub classifier_score_floor: i32,
}

/// Batch scheduling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    pub batch_size: usize,
    pub checkpoint_interval: usize,
    pub inter_batch_delay_ms: u64,
    pub per_company_timeout_secs: u64,
}

impl SchedulerConfig {
    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_millis(self.inter_batch_delay_ms)
    }

    pub fn per_company_timeout(&self) -> Duration {
        Duration::from_secs(self.per_company_timeout_secs)
    }
}

/// Provider response cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub dir: String,
    pub ttl_days: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_days * 24 * 60 * 60)
    }
}

/// A single external provider endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderEndpoint {
    pub name: String,
    pub url: String,
    /// Environment variable holding the API key
    #[serde(default)]
    pub api_key_env: String,
    pub timeout_secs: u64,
}

/// External provider configuration. Providers are optional; a missing
/// section means that stage yields no data.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub research: Vec<ProviderEndpoint>,
    /// Queried in order; earlier entries win field conflicts in the merge
    #[serde(default)]
    pub contact: Vec<ProviderEndpoint>,
    #[serde(default)]
    pub validation: Option<ProviderEndpoint>,
}

impl AppConfig {
    /// Load configuration from the default path
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(Path::new(CONFIG_PATH))
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.user_agent.is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "http.user_agent".to_string(),
            });
        }
        if self.http.request_timeout_secs == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "http.request_timeout_secs".to_string(),
            });
        }

        if self.pipeline.confidence_gate > 100 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.confidence_gate".to_string(),
                value: self.pipeline.confidence_gate.to_string(),
                reason: "must be 0-100".to_string(),
            });
        }
        if self.pipeline.parent_replacement_margin > 100 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.parent_replacement_margin".to_string(),
                value: self.pipeline.parent_replacement_margin.to_string(),
                reason: "must be 0-100".to_string(),
            });
        }

        if self.scheduler.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scheduler.batch_size".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.scheduler.checkpoint_interval == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scheduler.checkpoint_interval".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.scheduler.per_company_timeout_secs == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "scheduler.per_company_timeout_secs".to_string(),
            });
        }

        if self.cache.dir.is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "cache.dir".to_string(),
            });
        }
        if self.cache.ttl_days == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache.ttl_days".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        for (i, provider) in self.providers.research.iter().enumerate() {
            Self::validate_endpoint(provider, &format!("providers.research[{}]", i))?;
        }
        for (i, provider) in self.providers.contact.iter().enumerate() {
            Self::validate_endpoint(provider, &format!("providers.contact[{}]", i))?;
        }
        if let Some(provider) = &self.providers.validation {
            Self::validate_endpoint(provider, "providers.validation")?;
        }

        Ok(())
    }

    fn validate_endpoint(provider: &ProviderEndpoint, field: &str) -> Result<(), ConfigError> {
        if provider.name.is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: format!("{}.name", field),
            });
        }
        if !provider.url.starts_with("https://") && !provider.url.starts_with("http://") {
            return Err(ConfigError::InvalidUrl {
                field: format!("{}.url", field),
                url: provider.url.clone(),
            });
        }
        if provider.timeout_secs == 0 {
            return Err(ConfigError::EmptyRequired {
                field: format!("{}.timeout_secs", field),
            });
        }
        Ok(())
    }

    /// Create default configuration file at the standard location
    pub fn create_default_config() -> Result<PathBuf, ConfigError> {
        let path = Path::new(CONFIG_PATH);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::File::create(path)?;
        file.write_all(DEFAULT_CONFIG.as_bytes())?;

        Ok(path.to_path_buf())
    }

    /// Check if stdin is a TTY (interactive terminal)
    pub fn is_interactive() -> bool {
        atty::is(atty::Stream::Stdin)
    }

    /// Prompt user to create default config (only in interactive mode)
    pub fn prompt_create_config() -> Result<Option<PathBuf>, ConfigError> {
        if !Self::is_interactive() {
            return Ok(None);
        }

        print!("Configuration file not found. Create default config? [Y/n] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim().to_lowercase();

        if input.is_empty() || input == "y" || input == "yes" {
            let path = Self::create_default_config()?;
            Ok(Some(path))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let config: Result<AppConfig, _> = toml::from_str(DEFAULT_CONFIG);
        assert!(config.is_ok(), "Default config should parse: {:?}", config.err());
    }

    #[test]
    fn test_default_config_validates() {
        let config: AppConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert!(config.validate().is_ok(), "Default config should validate");
    }

    #[test]
    fn test_default_config_values() {
        let config: AppConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.pipeline.confidence_gate, 90);
        assert_eq!(config.pipeline.parent_replacement_margin, 20);
        assert_eq!(config.scheduler.batch_size, 25);
        assert_eq!(config.scheduler.checkpoint_interval, 10);
        assert_eq!(config.cache.ttl_days, 30);
    }

    #[test]
    fn test_invalid_confidence_gate() {
        let mut config: AppConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        config.pipeline.confidence_gate = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut config: AppConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        config.scheduler.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_provider_url_validation() {
        let mut config: AppConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        config.providers.research[0].url = "not-a-url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cache_ttl_duration() {
        let config: AppConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.cache.ttl(), Duration::from_secs(30 * 24 * 60 * 60));
    }
}
