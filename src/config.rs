use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILE: &str = "pagepulse.toml";
const ENV_PREFIX: &str = "PAGEPULSE";

/// Main configuration structure for PagePulse
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PagePulseConfig {
    /// Graph API proxy settings
    pub api: ApiConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
    /// Demographic breakdown settings
    pub demographics: DemographicsConfig,
    /// PDF report settings
    pub report: ReportConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Base url of the Graph API proxy
    pub base_url: String,
    /// Per-request timeout
    pub timeout_seconds: u64,
    /// Page size for feed requests
    pub feed_limit: u32,
    /// Page size for the account list
    pub accounts_limit: u32,
    pub rate_limit: RateLimitConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RateLimitConfig {
    pub requests_per_second: u32,
    pub burst_capacity: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Maximum cached responses
    pub max_capacity: u64,
    /// Freshness window for ranges ending in the current month
    pub current_month_ttl_seconds: u64,
    /// Freshness window for ranges that ended before this month
    pub past_month_ttl_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Default filter directive when RUST_LOG is unset
    pub log_level: String,
    /// Emit JSON lines instead of compact text
    pub json_logs: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DemographicsConfig {
    /// Country suffixes stripped from city labels
    pub city_suffixes: Vec<String>,
    /// How many cities the city chart keeps
    pub top_cities: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReportConfig {
    pub output_path: String,
    pub title: String,
    /// Pixel ratio used when rasterizing charts
    pub snapshot_scale: f32,
}

impl Default for PagePulseConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:5000".to_string(),
                timeout_seconds: 30,
                feed_limit: 5,
                accounts_limit: 11,
                rate_limit: RateLimitConfig {
                    requests_per_second: 5,
                    burst_capacity: 10,
                },
                cache: CacheConfig {
                    max_capacity: 1000,
                    current_month_ttl_seconds: 300, // 5 minutes
                    past_month_ttl_seconds: 3000,   // 50 minutes
                },
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                json_logs: false,
            },
            demographics: DemographicsConfig {
                city_suffixes: vec![
                    "Morocco".to_string(),
                    "Maroc".to_string(),
                    "المغرب".to_string(),
                ],
                top_cities: 10,
            },
            report: ReportConfig {
                output_path: "feed.pdf".to_string(),
                title: "Social Media Report".to_string(),
                snapshot_scale: 3.0,
            },
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl CacheConfig {
    pub fn current_month_ttl(&self) -> Duration {
        Duration::from_secs(self.current_month_ttl_seconds)
    }

    pub fn past_month_ttl(&self) -> Duration {
        Duration::from_secs(self.past_month_ttl_seconds)
    }
}

impl PagePulseConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (pagepulse.toml in the working directory)
    /// 3. Environment variables (PAGEPULSE__API__BASE_URL and friends)
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Same as [`load`](Self::load) with an explicit file path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if path.exists() {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::debug!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_round_trip_through_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        PagePulseConfig::default().save_to_file(&path).unwrap();
        let loaded = PagePulseConfig::load_from(&path).unwrap();

        assert_eq!(loaded.api.base_url, "http://localhost:5000");
        assert_eq!(loaded.api.cache.past_month_ttl(), Duration::from_secs(3000));
        assert_eq!(loaded.demographics.city_suffixes.len(), 3);
        assert_eq!(loaded.report.output_path, "feed.pdf");
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            "[api]\nbase_url = \"http://proxy.internal:8080\"\nfeed_limit = 25\n\n[demographics]\ntop_cities = 3\n",
        )
        .unwrap();

        let loaded = PagePulseConfig::load_from(&path).unwrap();

        assert_eq!(loaded.api.base_url, "http://proxy.internal:8080");
        assert_eq!(loaded.api.feed_limit, 25);
        assert_eq!(loaded.api.accounts_limit, 11);
        assert_eq!(loaded.demographics.top_cities, 3);
        assert_eq!(loaded.observability.log_level, "info");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let loaded = PagePulseConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded.api, PagePulseConfig::default().api);
    }
}
