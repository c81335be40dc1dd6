//! HelloMolar emergency dental clinic core library
//!
//! This module exports triage scoring, emergency-queue filtering, contact-log
//! aggregation and the clinic service facade that drives them against a
//! pluggable data store.

pub mod auth;
pub mod clinic;
pub mod core;
pub mod db;
pub mod error;
pub mod models;

pub use crate::clinic::Clinic;
pub use crate::error::{ClinicError, StoreError, TriageError};

/// Application configuration
pub mod config {
    use serde::Deserialize;
    use uuid::Uuid;

    #[derive(Debug, Clone, Deserialize)]
    pub struct Config {
        pub database: DatabaseConfig,
        pub logging: LoggingConfig,
        #[serde(default)]
        pub staff: StaffConfig,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct DatabaseConfig {
        pub url: String,
        pub max_connections: u32,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct LoggingConfig {
        pub filter: String,
        pub json: bool,
    }

    /// Signed-in staff identity used to stamp preset ownership.
    #[derive(Debug, Clone, Default, Deserialize)]
    pub struct StaffConfig {
        pub user_id: Option<Uuid>,
        pub email: Option<String>,
    }

    /// Load configuration from file
    pub fn load_config() -> Result<Config, ::config::ConfigError> {
        let env = std::env::var("HELLOMOLAR_ENV").unwrap_or_else(|_| "development".into());

        ::config::Config::builder()
            .set_default("database.url", "sqlite://hellomolar.db")?
            .set_default("database.max_connections", 5)?
            .set_default("logging.filter", "info")?
            .set_default("logging.json", false)?
            // Start with default settings
            .add_source(::config::File::with_name("config/default").required(false))
            // Override with environment-specific settings
            .add_source(::config::File::with_name(&format!("config/{}", env)).required(false))
            // Override with environment variables
            .add_source(::config::Environment::with_prefix("HELLOMOLAR").separator("__"))
            .build()?
            .try_deserialize()
    }
}
