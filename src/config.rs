//! TOML configuration.
//!
//! ```toml
//! [db]
//! path = "./data/docport.sqlite"
//!
//! [storage]
//! files_dir = "./files"
//!
//! [pagination]
//! owner_page_size = 10
//! global_page_size = 7
//! max_page_size = 100
//!
//! [server]
//! bind = "127.0.0.1:5001"
//! max_upload_bytes = 52428800
//!
//! [client]
//! base_url = "http://127.0.0.1:5001"
//! max_pages = 1000
//! timeout_secs = 30
//!
//! [metrics]
//! new_users_window_days = 7
//! ```
//!
//! Only `[db]` and `[server]` are required; every other section falls back
//! to the defaults shown.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use docport_core::query::{DEFAULT_GLOBAL_PAGE_SIZE, DEFAULT_OWNER_PAGE_SIZE};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_files_dir")]
    pub files_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            files_dir: default_files_dir(),
        }
    }
}

fn default_files_dir() -> PathBuf {
    PathBuf::from("./files")
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaginationConfig {
    #[serde(default = "default_owner_page_size")]
    pub owner_page_size: u32,
    #[serde(default = "default_global_page_size")]
    pub global_page_size: u32,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            owner_page_size: default_owner_page_size(),
            global_page_size: default_global_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_owner_page_size() -> u32 {
    DEFAULT_OWNER_PAGE_SIZE
}
fn default_global_page_size() -> u32 {
    DEFAULT_GLOBAL_PAGE_SIZE
}
fn default_max_page_size() -> u32 {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    /// Largest accepted request body, uploads included.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            max_pages: default_max_pages(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:5001".to_string()
}
fn default_max_pages() -> u32 {
    1000
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    #[serde(default = "default_new_users_window_days")]
    pub new_users_window_days: u32,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            new_users_window_days: default_new_users_window_days(),
        }
    }
}

fn default_new_users_window_days() -> u32 {
    7
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    let p = &config.pagination;
    if p.max_page_size == 0 {
        anyhow::bail!("pagination.max_page_size must be >= 1");
    }
    if p.owner_page_size == 0 || p.owner_page_size > p.max_page_size {
        anyhow::bail!(
            "pagination.owner_page_size must be in [1, {}]",
            p.max_page_size
        );
    }
    if p.global_page_size == 0 || p.global_page_size > p.max_page_size {
        anyhow::bail!(
            "pagination.global_page_size must be in [1, {}]",
            p.max_page_size
        );
    }

    if config.server.max_upload_bytes == 0 {
        anyhow::bail!("server.max_upload_bytes must be > 0");
    }

    if config.client.max_pages == 0 {
        anyhow::bail!("client.max_pages must be >= 1");
    }
    if !(config.client.base_url.starts_with("http://")
        || config.client.base_url.starts_with("https://"))
    {
        anyhow::bail!(
            "client.base_url must start with http:// or https://, got '{}'",
            config.client.base_url
        );
    }

    if config.metrics.new_users_window_days == 0 {
        anyhow::bail!("metrics.new_users_window_days must be >= 1");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[db]
path = "./data/docport.sqlite"

[server]
bind = "127.0.0.1:5001"
"#;

    #[test]
    fn test_minimal_config_takes_defaults() {
        let cfg: Config = toml::from_str(MINIMAL).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.pagination.owner_page_size, 10);
        assert_eq!(cfg.pagination.global_page_size, 7);
        assert_eq!(cfg.storage.files_dir, PathBuf::from("./files"));
        assert_eq!(cfg.metrics.new_users_window_days, 7);
        assert_eq!(cfg.client.max_pages, 1000);
    }

    #[test]
    fn test_page_size_above_max_rejected() {
        let raw = format!("{MINIMAL}\n[pagination]\nowner_page_size = 50\nmax_page_size = 20\n");
        let cfg: Config = toml::from_str(&raw).unwrap();
        let err = validate(&cfg).unwrap_err();
        assert!(err.to_string().contains("owner_page_size"));
    }

    #[test]
    fn test_zero_max_pages_rejected() {
        let raw = format!("{MINIMAL}\n[client]\nmax_pages = 0\n");
        let cfg: Config = toml::from_str(&raw).unwrap();
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }
}
