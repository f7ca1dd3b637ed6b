use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub importer: ImporterConfig,
    #[serde(default)]
    pub parser: ParserConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub max_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImporterConfig {
    /// Root URL of the storage API receiving `POST /api/channels`
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub policy: ImportPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub progress_log_interval: usize,
}

/// What an import does when one submission fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportPolicy {
    /// Keep submitting the remaining records, then clear the session
    #[default]
    BestEffort,
    /// Stop at the first failure and keep the staged playlist
    FailFast,
}

impl fmt::Display for ImportPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportPolicy::BestEffort => write!(f, "best_effort"),
            ImportPolicy::FailFast => write!(f, "fail_fast"),
        }
    }
}

impl FromStr for ImportPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "best_effort" => Ok(ImportPolicy::BestEffort),
            "fail_fast" => Ok(ImportPolicy::FailFast),
            _ => Err(format!("Invalid import policy: {}", s)),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: format!("m3u-importer/{}", env!("CARGO_PKG_VERSION")),
            max_bytes: 64 * 1024 * 1024,
        }
    }
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000".to_string(),
            request_timeout_secs: 10,
            policy: ImportPolicy::BestEffort,
        }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            progress_log_interval: 1000,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());

        if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(&config_file)?;
            Ok(toml::from_str(&contents)?)
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(&config_file, contents)?;
            Ok(default_config)
        }
    }

    /// Reject values that would only fail later, at fetch or import time
    pub fn validate(&self) -> AppResult<()> {
        let base = url::Url::parse(&self.importer.api_base_url).map_err(|e| {
            AppError::configuration(format!(
                "importer.api_base_url '{}': {}",
                self.importer.api_base_url, e
            ))
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(AppError::configuration(format!(
                "importer.api_base_url must be http or https, got '{}'",
                base.scheme()
            )));
        }

        if self.fetch.max_bytes == 0 {
            return Err(AppError::configuration("fetch.max_bytes must be greater than 0"));
        }
        if self.fetch.timeout_secs == 0 || self.importer.request_timeout_secs == 0 {
            return Err(AppError::configuration("timeouts must be at least one second"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [importer]
            api_base_url = "http://storage:5000"
            request_timeout_secs = 5
            policy = "fail_fast"
            "#,
        )
        .unwrap();

        assert_eq!(config.importer.api_base_url, "http://storage:5000");
        assert_eq!(config.importer.policy, ImportPolicy::FailFast);
        assert_eq!(config.web.port, 8080);
        assert_eq!(config.fetch.timeout_secs, 30);
    }

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let contents = toml::to_string_pretty(&Config::default()).unwrap();
        let config: Config = toml::from_str(&contents).unwrap();

        assert_eq!(config.importer.policy, ImportPolicy::BestEffort);
        assert_eq!(config.parser.progress_log_interval, 1000);
    }

    #[test]
    fn test_validate() {
        assert!(Config::default().validate().is_ok());

        let mut config = Config::default();
        config.importer.api_base_url = "storage:5000".to_string();
        assert!(matches!(
            config.validate(),
            Err(AppError::Configuration { .. })
        ));

        let mut config = Config::default();
        config.importer.api_base_url = "localhost".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.fetch.max_bytes = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.fetch.timeout_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(AppError::Configuration { .. })
        ));

        let mut config = Config::default();
        config.importer.request_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_section_keeps_field_defaults() {
        let config: Config = toml::from_str(
            r#"
            [fetch]
            timeout_secs = 10

            [importer]
            policy = "fail_fast"
            "#,
        )
        .unwrap();

        assert_eq!(config.fetch.timeout_secs, 10);
        assert_eq!(config.fetch.max_bytes, 64 * 1024 * 1024);
        assert!(config.fetch.user_agent.starts_with("m3u-importer/"));
        assert_eq!(config.importer.api_base_url, "http://localhost:5000");
        assert_eq!(config.importer.request_timeout_secs, 10);
        assert_eq!(config.importer.policy, ImportPolicy::FailFast);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_policy_from_cli_spelling() {
        assert_eq!("fail-fast".parse::<ImportPolicy>().unwrap(), ImportPolicy::FailFast);
        assert_eq!("BEST_EFFORT".parse::<ImportPolicy>().unwrap(), ImportPolicy::BestEffort);
        assert!("retry".parse::<ImportPolicy>().is_err());
    }
}
