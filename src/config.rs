//! Command-line and environment configuration

use std::time::Duration;

use clap::Parser;

use crate::catalog::{EntityDefaults, OutputFormat};
use crate::telemetry::LogFormat;

/// Normalize KServe deployments and model-registry records into catalog entities
#[derive(Parser, Debug, Clone)]
#[command(name = "model-normalizer", version, about, long_about = None)]
pub struct Config {
    /// Model registry base URL; without it only deployments are catalogued
    #[arg(long, env = "MR_ROUTE")]
    pub registry_url: Option<String>,

    /// Bearer token for the model registry
    #[arg(long, env = "KFMR_TOKEN", hide_env_values = true)]
    pub registry_token: Option<String>,

    /// Storage tier base URL
    #[arg(long, env = "BRIDGE_URL", default_value = "http://localhost:9090")]
    pub storage_url: String,

    /// Catalog base URL
    #[arg(long, env = "BKSTG_URL", default_value = "http://localhost:7007")]
    pub catalog_url: String,

    /// Bearer token for the catalog
    #[arg(long, env = "RHDH_TOKEN", hide_env_values = true)]
    pub catalog_token: Option<String>,

    /// Shape of published documents
    #[arg(long, env = "NORMALIZER_FORMAT", value_enum, default_value_t = OutputFormat::CatalogInfoYaml)]
    pub format: OutputFormat,

    /// Seconds between background sweeps of the registry
    #[arg(long, env = "POLLING_INTERVAL", default_value = "120")]
    pub sweep_interval_secs: u64,

    /// Owner used when the registry names none
    #[arg(long, env = "DEFAULT_OWNER", default_value = "rhdh-rhoai-bridge")]
    pub default_owner: String,

    /// Lifecycle used when the registry names none
    #[arg(long, env = "DEFAULT_LIFECYCLE", default_value = "development")]
    pub default_lifecycle: String,

    /// Maximum concurrent reconciliations
    #[arg(long, env = "RECONCILE_CONCURRENCY", default_value = "32")]
    pub concurrency: u16,

    /// Deadline for one reconciliation, in seconds
    #[arg(long, env = "RECONCILE_TIMEOUT_SECS", default_value = "60")]
    pub reconcile_timeout_secs: u64,

    /// Timeout for every outbound HTTP request, in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value = "30")]
    pub http_timeout_secs: u64,

    /// Log line encoding
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,
}

/// Runtime settings shared by reconciles and the sweep
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizerSettings {
    /// Output shape
    pub format: OutputFormat,
    /// Owner and lifecycle fallbacks
    pub defaults: EntityDefaults,
    /// Per-reconcile deadline
    pub reconcile_timeout: Duration,
}

impl Default for NormalizerSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            defaults: EntityDefaults::default(),
            reconcile_timeout: Duration::from_secs(60),
        }
    }
}

impl Config {
    /// Settings consumed by the controller
    pub fn normalizer_settings(&self) -> NormalizerSettings {
        NormalizerSettings {
            format: self.format,
            defaults: EntityDefaults {
                owner: self.default_owner.clone(),
                lifecycle: self.default_lifecycle.clone(),
            },
            reconcile_timeout: Duration::from_secs(self.reconcile_timeout_secs),
        }
    }

    /// Registry URL, treating an empty value as unset
    pub fn registry_url(&self) -> Option<&str> {
        self.registry_url.as_deref().filter(|u| !u.trim().is_empty())
    }

    /// Outbound HTTP timeout
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Background sweep period
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["model-normalizer"]).unwrap();
        assert_eq!(config.storage_url, "http://localhost:9090");
        assert_eq!(config.catalog_url, "http://localhost:7007");
        assert_eq!(config.concurrency, 32);
        assert_eq!(config.sweep_interval(), Duration::from_secs(120));
        assert_eq!(config.normalizer_settings(), NormalizerSettings::default());
    }

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "model-normalizer",
            "--registry-url",
            "https://registry.example.com",
            "--format",
            "json-array",
            "--default-owner",
            "ml-team",
            "--reconcile-timeout-secs",
            "5",
            "--log-format",
            "text",
        ])
        .unwrap();
        let settings = config.normalizer_settings();
        assert_eq!(config.registry_url(), Some("https://registry.example.com"));
        assert_eq!(settings.format, OutputFormat::JsonArray);
        assert_eq!(settings.defaults.owner, "ml-team");
        assert_eq!(settings.reconcile_timeout, Duration::from_secs(5));
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn blank_registry_url_is_unset() {
        let config =
            Config::try_parse_from(["model-normalizer", "--registry-url", " "]).unwrap();
        assert!(config.registry_url().is_none());
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert!(Config::try_parse_from(["model-normalizer", "--format", "xml"]).is_err());
    }
}
