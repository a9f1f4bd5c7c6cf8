//! Configuration module for the Engage backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key the trusted auth proxy presents (required in production)
    pub api_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Mark the workspace selection cookie as `Secure`
    pub secure_cookies: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AddrParseError> {
        dotenvy::dotenv().ok();

        let api_psk = env::var("ENGAGE_API_PSK").ok().filter(|k| !k.is_empty());

        let db_path = env::var("ENGAGE_DB_PATH")
            .unwrap_or_else(|_| "./data/engage.sqlite".to_string())
            .into();

        let bind_addr = env::var("ENGAGE_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()?;

        let log_level = env::var("ENGAGE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let secure_cookies = env::var("ENGAGE_SECURE_COOKIES")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            api_psk,
            db_path,
            bind_addr,
            log_level,
            secure_cookies,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        env::remove_var("ENGAGE_API_PSK");
        env::remove_var("ENGAGE_DB_PATH");
        env::remove_var("ENGAGE_BIND_ADDR");
        env::remove_var("ENGAGE_LOG_LEVEL");
        env::remove_var("ENGAGE_SECURE_COOKIES");

        let config = Config::from_env().unwrap();

        assert!(config.api_psk.is_none());
        assert_eq!(config.db_path, PathBuf::from("./data/engage.sqlite"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
        assert!(!config.secure_cookies);
    }
}
