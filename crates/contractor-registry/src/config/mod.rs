use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::identity::ResolutionConfig;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the registry service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub resolution: ResolutionConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            resolution: load_resolution()?,
        })
    }
}

fn load_resolution() -> Result<ResolutionConfig, ConfigError> {
    let defaults = ResolutionConfig::default();

    let cluster_threshold =
        parse_var("RESOLUTION_CLUSTER_THRESHOLD")?.unwrap_or(defaults.cluster_threshold);
    if !(0.0..=100.0).contains(&cluster_threshold) {
        return Err(ConfigError::OutOfRange {
            key: "RESOLUTION_CLUSTER_THRESHOLD",
        });
    }

    let conflict_threshold =
        parse_var("RESOLUTION_CONFLICT_THRESHOLD")?.unwrap_or(defaults.conflict_threshold);
    if !(0.0..=1.0).contains(&conflict_threshold) {
        return Err(ConfigError::OutOfRange {
            key: "RESOLUTION_CONFLICT_THRESHOLD",
        });
    }

    let conflict_limit =
        parse_var("RESOLUTION_CONFLICT_LIMIT")?.unwrap_or(defaults.conflict_limit);
    if conflict_limit == 0 {
        return Err(ConfigError::OutOfRange {
            key: "RESOLUTION_CONFLICT_LIMIT",
        });
    }

    let defer_days = match env::var("RESOLUTION_DEFER_DAYS") {
        Err(_) => defaults.defer_days,
        Ok(raw) if raw.trim().eq_ignore_ascii_case("never") => None,
        Ok(raw) => match raw.trim().parse::<u32>() {
            Ok(0) => None,
            Ok(days) => Some(days),
            Err(_) => {
                return Err(ConfigError::InvalidNumber {
                    key: "RESOLUTION_DEFER_DAYS",
                    value: raw,
                })
            }
        },
    };

    Ok(ResolutionConfig {
        cluster_threshold,
        conflict_threshold,
        conflict_limit,
        defer_days,
    })
}

fn parse_var<T: std::str::FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Err(_) => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { key, value: raw }),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str, value: String },
    OutOfRange { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be numeric, got '{value}'")
            }
            ConfigError::OutOfRange { key } => write!(f, "{key} is outside its allowed range"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::OutOfRange { .. } => None,
        }
    }
}
