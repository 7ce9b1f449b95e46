use crate::error::AppError;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Checkout holding the images and their descriptors.
    pub content_root: PathBuf,
    /// Remote cloned into `content_root` when the checkout is missing.
    #[serde(default)]
    pub repo_url: Option<String>,
    pub cache_directory: PathBuf,
    /// Recognized image suffixes, leading dot included. Matching is case-sensitive.
    pub allowed_extensions: Vec<String>,
    /// Number of directories between the content root and the category directory.
    pub category_depth: usize,
    #[serde(default)]
    pub skip_invalid_descriptors: bool,
    pub bind_address: String,
    pub web_port: u16,
    pub log_level: String,
    pub default_search_limit: usize,
    pub max_search_limit: usize,
    pub cache_max_age_secs: u64,
    pub preview_max_dimension: u32,
    /// Seconds between background sync + rebuild cycles; 0 turns it off.
    #[serde(default)]
    pub refresh_interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            content_root: PathBuf::from("./assets/repo"),
            repo_url: None,
            cache_directory: PathBuf::from("./assets/cache"),
            allowed_extensions: [".png", ".jpg", ".jpeg", ".webp"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
            category_depth: 0,
            skip_invalid_descriptors: false,
            bind_address: "0.0.0.0".to_string(),
            web_port: 8000,
            log_level: "info".to_string(),
            default_search_limit: 10,
            max_search_limit: 100,
            cache_max_age_secs: 300,
            preview_max_dimension: 1920,
            refresh_interval_secs: 0,
        }
    }
}

impl AppConfig {
    pub fn load(config_dir: &str) -> Result<Self, AppError> {
        let env = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name(&format!("{}/default", config_dir)))
            .add_source(File::with_name(&format!("{}/{}", config_dir, env)).required(false))
            .add_source(File::with_name(&format!("{}/local", config_dir)).required(false))
            .add_source(Environment::with_prefix("IMAGE_CATALOG").try_parsing(true))
            .build()?;

        let config: AppConfig = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.allowed_extensions.is_empty() {
            return Err(ConfigError::Message(
                "allowed_extensions must name at least one extension".into(),
            ));
        }
        if let Some(bad) = self.allowed_extensions.iter().find(|e| !e.starts_with('.') || e.len() < 2) {
            return Err(ConfigError::Message(format!(
                "extension {:?} must start with a dot, e.g. \".png\"",
                bad
            )));
        }
        if self.max_search_limit == 0 {
            return Err(ConfigError::Message("max_search_limit must be positive".into()));
        }
        Ok(())
    }

    /// Clamps a caller-supplied limit into `1..=max_search_limit`.
    pub fn search_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_search_limit)
            .clamp(1, self.max_search_limit)
    }
}
