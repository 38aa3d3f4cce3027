//! Application configuration loaded from environment variables.
//!
//! # Configuration Hierarchy
//!
//! All configuration is loaded from environment variables with sensible defaults
//! for development. In production, configure via environment variables or a `.env` file.
//!
//! # Runtime Mode
//!
//! `APP_ENV=production` selects [`RuntimeMode::Production`], which:
//!
//! - enables strict origin checks
//! - enables the `Strict-Transport-Security` header
//! - marks the session cookie `Secure`
//! - suppresses verbose (info-level) request logs
//! - suppresses fault details in error bodies
//!
//! The mode is resolved once here and handed to every component constructor.
//!
//! # Edge Configuration
//!
//! - `BACKEND_URL`: Base URL of the backend service (default: `http://localhost:3001`)
//! - `BACKEND_TIMEOUT_MS`: Timeout for each relayed call (default: 5000)
//! - `ALLOWED_ORIGINS`: Comma-separated origin allow-list
//! - `RATE_LIMIT_SWEEP_INTERVAL_SECS`: Expired counter sweep period (default: 60)
//!
//! # Backend Configuration
//!
//! - `BACKEND_HOST` / `BACKEND_PORT`: Bind address of the backend binary
//! - `JWT_SECRET`: Session token signing secret (required in production)
//! - `FRONTEND_URL`: Origin allowed by the backend CORS policy

use std::env;
use std::fmt;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Signing secret used when `JWT_SECRET` is not set. Rejected in production.
pub const DEV_JWT_SECRET: &str = "dev-secret-change-in-production";

/// Process-wide runtime mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeMode {
    #[default]
    Development,
    Production,
}

impl RuntimeMode {
    /// Resolve the mode from `APP_ENV` without loading the rest of the config.
    ///
    /// Used by the binaries to pick a log format before configuration errors
    /// can be reported.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::parse(&env::var("APP_ENV").unwrap_or_default())
    }

    fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("production") {
            RuntimeMode::Production
        } else {
            RuntimeMode::Development
        }
    }

    pub fn is_production(self) -> bool {
        self == RuntimeMode::Production
    }
}

impl fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeMode::Development => write!(f, "development"),
            RuntimeMode::Production => write!(f, "production"),
        }
    }
}

/// Application configuration loaded from environment variables.
///
/// Both binaries load the same struct; each reads the fields it needs.
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Edge host address (default: "0.0.0.0")
    pub host: String,

    /// Edge port (default: 3000)
    pub port: u16,

    /// Development or production
    pub mode: RuntimeMode,

    // =========================================================================
    // Session Relay Configuration
    // =========================================================================
    /// Base URL of the backend service, without trailing slash
    pub backend_url: String,

    /// Upper bound for each relayed backend call
    pub backend_timeout: Duration,

    // =========================================================================
    // Middleware Configuration
    // =========================================================================
    /// Origins accepted by the origin validator
    pub allowed_origins: Vec<String>,

    /// Force the request logger on in production
    pub enable_api_logging: bool,

    /// Force the performance monitor on in production
    pub enable_performance_monitor: bool,

    /// Requests slower than this are logged as warnings
    pub slow_request_threshold: Duration,

    /// Period of the expired rate-limit record sweep
    pub rate_limit_sweep_interval: Duration,

    // =========================================================================
    // Backend Service Configuration
    // =========================================================================
    /// Backend host address (default: "0.0.0.0")
    pub backend_host: String,

    /// Backend port (default: 3001)
    pub backend_port: u16,

    /// Session token signing secret
    pub jwt_secret: String,

    /// Origin allowed by the backend CORS layer
    pub frontend_url: String,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Log level (e.g., "info", "debug", "trace")
    pub log_level: String,

    /// Port for Prometheus metrics endpoint (0 = disabled)
    pub metrics_port: u16,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if any value fails to parse or the
    /// resulting configuration is inconsistent.
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let config = Self {
            // Server
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_env("PORT", 3000)?,
            mode: RuntimeMode::parse(&env::var("APP_ENV").unwrap_or_default()),

            // Session relay
            backend_url: env::var("BACKEND_URL")
                .unwrap_or_else(|_| "http://localhost:3001".to_string())
                .trim_end_matches('/')
                .to_string(),
            backend_timeout: Duration::from_millis(Self::parse_env("BACKEND_TIMEOUT_MS", 5000)?),

            // Middleware
            allowed_origins: Self::parse_allowed_origins(),
            enable_api_logging: Self::parse_env("ENABLE_API_LOGGING", false)?,
            enable_performance_monitor: Self::parse_env("ENABLE_PERFORMANCE_MONITOR", false)?,
            slow_request_threshold: Duration::from_millis(Self::parse_env(
                "SLOW_REQUEST_THRESHOLD_MS",
                1000,
            )?),
            rate_limit_sweep_interval: Duration::from_secs(Self::parse_env(
                "RATE_LIMIT_SWEEP_INTERVAL_SECS",
                60,
            )?),

            // Backend
            backend_host: env::var("BACKEND_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            backend_port: Self::parse_env("BACKEND_PORT", 3001)?,
            jwt_secret: env::var("JWT_SECRET")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEV_JWT_SECRET.to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),

            // Observability
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            metrics_port: Self::parse_env("METRICS_PORT", 0)?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    fn validate(&self) -> AppResult<()> {
        if self.backend_timeout.is_zero() {
            return Err(AppError::ConfigError(
                "BACKEND_TIMEOUT_MS must be greater than 0".to_string(),
            ));
        }

        if self.rate_limit_sweep_interval.is_zero() {
            return Err(AppError::ConfigError(
                "RATE_LIMIT_SWEEP_INTERVAL_SECS must be greater than 0".to_string(),
            ));
        }

        if url::Url::parse(&self.backend_url).is_err() {
            return Err(AppError::ConfigError(format!(
                "BACKEND_URL is not a valid URL: {}",
                self.backend_url
            )));
        }

        if self.mode.is_production() && self.jwt_secret == DEV_JWT_SECRET {
            return Err(AppError::ConfigError(
                "JWT_SECRET must be set when APP_ENV=production".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the edge address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the backend address for binding.
    pub fn backend_addr(&self) -> String {
        format!("{}:{}", self.backend_host, self.backend_port)
    }

    /// Whether the request logger runs by default.
    pub fn logging_enabled(&self) -> bool {
        !self.mode.is_production() || self.enable_api_logging
    }

    /// Whether the performance monitor runs by default.
    pub fn performance_monitor_enabled(&self) -> bool {
        !self.mode.is_production() || self.enable_performance_monitor
    }

    /// Check if Prometheus metrics export is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Get the metrics endpoint address.
    ///
    /// Returns `None` if metrics are disabled (port = 0).
    pub fn metrics_addr(&self) -> Option<std::net::SocketAddr> {
        if self.metrics_enabled() {
            Some(std::net::SocketAddr::from((
                [0, 0, 0, 0],
                self.metrics_port,
            )))
        } else {
            None
        }
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> AppResult<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .trim()
                .parse()
                .map_err(|e| AppError::ConfigError(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }

    /// Parse the origin allow-list from `ALLOWED_ORIGINS`.
    fn parse_allowed_origins() -> Vec<String> {
        env::var("ALLOWED_ORIGINS")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(|s| split_list(&s))
            .unwrap_or_else(default_allowed_origins)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:3001".to_string(),
    ]
}

/// Default configuration for testing and development.
///
/// Deployments should use `Config::from_env()` instead.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Server
            host: "0.0.0.0".to_string(),
            port: 3000,
            mode: RuntimeMode::Development,
            // Session relay
            backend_url: "http://localhost:3001".to_string(),
            backend_timeout: Duration::from_secs(5),
            // Middleware
            allowed_origins: default_allowed_origins(),
            enable_api_logging: false,
            enable_performance_monitor: false,
            slow_request_threshold: Duration::from_secs(1),
            rate_limit_sweep_interval: Duration::from_secs(60),
            // Backend
            backend_host: "0.0.0.0".to_string(),
            backend_port: 3001,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            // Observability
            log_level: "info".to_string(),
            metrics_port: 0,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = Config::default();

        assert_eq!(config.port, 3000);
        assert_eq!(config.backend_port, 3001);
        assert_eq!(config.mode, RuntimeMode::Development);
        assert_eq!(config.backend_timeout, Duration::from_secs(5));
        assert_eq!(config.rate_limit_sweep_interval, Duration::from_secs(60));
        assert_eq!(config.allowed_origins.len(), 2);
    }

    #[test]
    fn test_runtime_mode_parse() {
        assert_eq!(RuntimeMode::parse("production"), RuntimeMode::Production);
        assert_eq!(RuntimeMode::parse(" Production "), RuntimeMode::Production);
        assert_eq!(RuntimeMode::parse("development"), RuntimeMode::Development);
        assert_eq!(RuntimeMode::parse(""), RuntimeMode::Development);
        assert_eq!(RuntimeMode::parse("staging"), RuntimeMode::Development);
    }

    #[test]
    fn test_server_addr_format() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            backend_host: "10.0.0.2".to_string(),
            backend_port: 9000,
            ..Config::default()
        };

        assert_eq!(config.server_addr(), "127.0.0.1:8080");
        assert_eq!(config.backend_addr(), "10.0.0.2:9000");
    }

    #[test]
    fn test_logging_flags_follow_mode() {
        let dev = Config::default();
        assert!(dev.logging_enabled());
        assert!(dev.performance_monitor_enabled());

        let prod = Config {
            mode: RuntimeMode::Production,
            ..Config::default()
        };
        assert!(!prod.logging_enabled());
        assert!(!prod.performance_monitor_enabled());

        let prod_forced = Config {
            mode: RuntimeMode::Production,
            enable_api_logging: true,
            enable_performance_monitor: true,
            ..Config::default()
        };
        assert!(prod_forced.logging_enabled());
        assert!(prod_forced.performance_monitor_enabled());
    }

    #[test]
    fn test_split_list_trims_and_drops_empty() {
        assert_eq!(
            split_list(" https://a.example , ,https://b.example"),
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn test_validate_zero_timeout() {
        let config = Config {
            backend_timeout: Duration::ZERO,
            ..Config::default()
        };

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("BACKEND_TIMEOUT_MS"));
    }

    #[test]
    fn test_validate_invalid_backend_url() {
        let config = Config {
            backend_url: "not a url".to_string(),
            ..Config::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_production_requires_secret() {
        let config = Config {
            mode: RuntimeMode::Production,
            ..Config::default()
        };
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("JWT_SECRET"));

        let config = Config {
            mode: RuntimeMode::Production,
            jwt_secret: "a-real-secret-value".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }
}
