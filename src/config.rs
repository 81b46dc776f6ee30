//! Runtime configuration, read from the environment once at startup.

use std::env;
use std::path::PathBuf;

use tracing::warn;

/// Default port if not specified via environment variable.
pub const DEFAULT_PORT: u16 = 5000;

/// Default database path if not specified via environment variable.
pub const DEFAULT_DB_URL: &str = "sqlite:snakesafe.db?mode=rwc";

/// Default location of the exported classifier.
pub const DEFAULT_MODEL_PATH: &str = "models/efficientv2sv2.onnx";

/// Used when no secret is configured. Fine for local development only.
const DEVELOPMENT_SECRET: &str = "snakesafe-development-secret-change-me";

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub model_path: PathBuf,

    /// Secret the session cookie signing key is derived from.
    pub secret_key: String,

    /// Operator account created by the seeder.
    pub admin_username: String,
    pub admin_password: String,
}

impl Config {
    /// Load configuration from `SNAKESAFE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = lookup("SNAKESAFE_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let secret_key = lookup("SNAKESAFE_SECRET_KEY")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| {
                warn!("SNAKESAFE_SECRET_KEY is not set; using the development secret");
                DEVELOPMENT_SECRET.to_string()
            });

        Self {
            port,
            database_url: lookup("SNAKESAFE_DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DB_URL.to_string()),
            model_path: lookup("SNAKESAFE_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
            secret_key,
            admin_username: lookup("SNAKESAFE_ADMIN_USERNAME")
                .unwrap_or_else(|| DEFAULT_ADMIN_USERNAME.to_string()),
            admin_password: lookup("SNAKESAFE_ADMIN_PASSWORD")
                .unwrap_or_else(|| DEFAULT_ADMIN_PASSWORD.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.database_url, DEFAULT_DB_URL);
        assert_eq!(config.model_path, PathBuf::from(DEFAULT_MODEL_PATH));
        assert_eq!(config.secret_key, DEVELOPMENT_SECRET);
        assert_eq!(config.admin_username, "admin");
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("SNAKESAFE_PORT", "8080"),
            ("SNAKESAFE_DATABASE_URL", "sqlite::memory:"),
            ("SNAKESAFE_SECRET_KEY", "s3cret"),
        ]);
        let config = Config::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.secret_key, "s3cret");
    }

    #[test]
    fn test_bad_port_falls_back() {
        let config = Config::from_lookup(|k| (k == "SNAKESAFE_PORT").then(|| "http".to_string()));
        assert_eq!(config.port, DEFAULT_PORT);
    }
}
