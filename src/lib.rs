//! Clinic prescription service core library
//!
//! This module exports the core functionality of the clinic record service.

pub mod api;
pub mod db;
pub mod models;
pub mod pdf;

/// Application configuration
pub mod config {
    use serde::Deserialize;
    use std::path::PathBuf;

    #[derive(Debug, Clone, Deserialize)]
    pub struct Config {
        pub server: ServerConfig,
        pub database: DatabaseConfig,
        pub clinic: ClinicConfig,
        pub storage: StorageConfig,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct ServerConfig {
        pub host: String,
        pub port: u16,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct DatabaseConfig {
        pub url: String,
    }

    /// Identity printed on generated prescription documents.
    #[derive(Debug, Clone, Deserialize)]
    pub struct ClinicConfig {
        pub name: String,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct StorageConfig {
        pub uploads_dir: String,
        pub pdf_timeout_secs: u64,
    }

    impl StorageConfig {
        pub fn uploads_path(&self) -> PathBuf {
            PathBuf::from(&self.uploads_dir)
        }
    }

    /// Load configuration from file
    pub fn load_config() -> Result<Config, config::ConfigError> {
        // Environment-specific settings override the defaults, environment
        // variables override both.
        let env = std::env::var("RXCLINIC_ENV").unwrap_or_else(|_| "development".into());

        config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix("RXCLINIC"))
            .build()?
            .try_deserialize()
    }
}
