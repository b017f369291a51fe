use crate::error::AppError;
use photo_store::{PhotoStoreConfig, DEFAULT_CONCURRENCY};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "./decoy-camera.toml";

/// Application configuration, read from a TOML file.
///
/// Every key is optional; missing keys fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_path: PathBuf,
    /// `env_logger` filter used when `RUST_LOG` is not set
    pub log_filter: String,
    pub upload_concurrency: usize,
    pub thumbnail_size: u32,
    pub scan_ceiling: usize,
    pub cache_ttl_secs: u64,
    pub jpeg_quality: u8,
}

impl Default for AppConfig {
    fn default() -> Self {
        let store = PhotoStoreConfig::default();
        Self {
            database_path: PathBuf::from("./data/decoy-camera.db"),
            log_filter: "info".to_string(),
            upload_concurrency: DEFAULT_CONCURRENCY,
            thumbnail_size: store.thumbnail_size,
            scan_ceiling: store.scan_ceiling,
            cache_ttl_secs: store.cache_ttl.as_secs(),
            jpeg_quality: store.jpeg_quality,
        }
    }
}

impl AppConfig {
    /// Load the configuration. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No configuration at {:?}, using defaults", path);
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn parse(text: &str) -> Result<Self, AppError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.thumbnail_size == 0 {
            return Err(AppError::Validation(
                "thumbnail_size must be greater than 0".to_string(),
            ));
        }
        if self.scan_ceiling == 0 {
            return Err(AppError::Validation(
                "scan_ceiling must be greater than 0".to_string(),
            ));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(AppError::Validation(
                "jpeg_quality must be between 1 and 100".to_string(),
            ));
        }
        Ok(())
    }

    pub fn store_config(&self) -> PhotoStoreConfig {
        PhotoStoreConfig {
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            scan_ceiling: self.scan_ceiling,
            thumbnail_size: self.thumbnail_size,
            jpeg_quality: self.jpeg_quality,
        }
    }
}
