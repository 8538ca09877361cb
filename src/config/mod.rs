//! Application configuration.
//!
//! Loaded from an optional `config.yaml` plus environment variables
//! (`PORT`, `MONGO_URI`, `MONGO_DB`, `REDIS_ADDR`, `REDIS_DB`,
//! `JWT_SECRET`, `LOG_LEVEL`, `WORKERS`, `QUEUE_CAPACITY`), with the
//! environment taking precedence.

use serde::Deserialize;

/// Main application configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listen port.
    pub port: u16,
    /// MongoDB connection URI.
    pub mongo_uri: String,
    /// MongoDB database name.
    pub mongo_db: String,
    /// Redis address (`host:port`).
    pub redis_addr: String,
    /// Redis logical database.
    pub redis_db: i64,
    /// HS256 secret for bearer tokens.
    pub jwt_secret: String,
    /// Minimum log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Number of dispatcher workers.
    pub workers: usize,
    /// Bounded queue capacity per worker.
    pub queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            mongo_uri: "mongodb://localhost:27017".to_string(),
            mongo_db: "shiptrace".to_string(),
            redis_addr: "localhost:6379".to_string(),
            redis_db: 0,
            jwt_secret: String::new(),
            log_level: "info".to_string(),
            workers: 8,
            queue_capacity: 256,
        }
    }
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Sources, later overrides earlier:
    /// 1. `config.yaml` in the current directory (if present)
    /// 2. Environment variables
    pub fn load() -> Result<Self, config::ConfigError> {
        use config::{Config as ConfigLib, Environment, File, FileFormat};

        let loaded = ConfigLib::builder()
            .add_source(File::new("config", FileFormat::Yaml).required(false))
            .add_source(Environment::default().try_parsing(true))
            .build()?;

        loaded.try_deserialize()
    }

    /// Configuration for tests.
    pub fn for_test() -> Self {
        Self {
            jwt_secret: "test-secret".to_string(),
            ..Self::default()
        }
    }
}
