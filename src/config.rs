//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every section carries defaults so a partial file still loads.
//! Overrides (the database URL) are referenced by env-var name in the
//! config and resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub sec: SecConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cik_matcher: CikMatcherConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub health_check: HealthCheckConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SecConfig {
    /// SEC requires a declared identity ("Name email@example.com").
    pub user_agent: String,
    pub request_delay_ms: u64,
    pub timeout_secs: u64,
    pub ticker_map_url: String,
}

impl Default for SecConfig {
    fn default() -> Self {
        Self {
            user_agent: "ALTMAN pipeline (user.email@example.com)".to_string(),
            request_delay_ms: 100,
            timeout_secs: 10,
            ticker_map_url: "https://www.sec.gov/include/ticker.txt".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PathsConfig {
    /// Quarterly FSDS directories used by the bulk run (`data/2023q4`, ...).
    pub data_dir: PathBuf,
    /// Quarterly FSDS directories used by verification and tag ingest.
    pub raw_data_dir: PathBuf,
    pub processed_data_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            raw_data_dir: PathBuf::from("data/raw"),
            processed_data_dir: PathBuf::from("data/processed"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    /// If set and present in the environment, overrides `url`.
    pub url_env: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://financial.db".to_string(),
            url_env: Some("DATABASE_URL".to_string()),
            max_connections: 5,
        }
    }
}

impl DatabaseConfig {
    /// The effective connection URL after env-var resolution.
    pub fn resolved_url(&self) -> String {
        self.url_env
            .as_deref()
            .and_then(|env| AppConfig::resolve_env(env).ok())
            .unwrap_or_else(|| self.url.clone())
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CikMatcherConfig {
    pub output_file_name: String,
    /// Browser-like agent; Wikipedia rejects some bare clients.
    pub user_agent: String,
    pub index_urls: HashMap<String, String>,
}

impl Default for CikMatcherConfig {
    fn default() -> Self {
        let mut index_urls = HashMap::new();
        index_urls.insert(
            "NDX".to_string(),
            "https://en.wikipedia.org/wiki/Nasdaq-100".to_string(),
        );
        index_urls.insert(
            "SP500".to_string(),
            "https://en.wikipedia.org/wiki/List_of_S%26P_500_companies".to_string(),
        );
        Self {
            output_file_name: "cik_mapping.csv".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
                .to_string(),
            index_urls,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SettingsConfig {
    pub target_index: String,
    /// Fiscal year checked by filing verification.
    pub target_fy: i32,
    /// Fiscal year analysed by the bulk run when `--year` is not given.
    #[serde(default)]
    pub target_year: Option<i32>,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            target_index: "NDX".to_string(),
            target_fy: 2024,
            target_year: Some(2023),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HealthCheckConfig {
    pub concurrency: usize,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self { concurrency: 4 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }

    /// Path of the ticker → CIK mapping CSV written by the CIK matcher.
    pub fn cik_mapping_path(&self) -> PathBuf {
        self.paths
            .processed_data_dir
            .join(&self.cik_matcher.output_file_name)
    }
}
