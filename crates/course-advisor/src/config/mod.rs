use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use crate::workflows::advising::PolicyPreset;

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

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub recommender: RecommenderConfig,
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
        let log_format = match env::var("APP_LOG_FORMAT") {
            Ok(raw) => LogFormat::parse(&raw).ok_or(ConfigError::InvalidLogFormat(raw))?,
            Err(_) => LogFormat::Compact,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                log_format,
            },
            recommender: RecommenderConfig::from_env()?,
        })
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
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Full,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Some(Self::Compact),
            "full" => Some(Self::Full),
            _ => None,
        }
    }
}

/// Request defaults and collaborator wiring for the recommendation service.
#[derive(Debug, Clone)]
pub struct RecommenderConfig {
    /// Credit ceiling used when a request does not state one.
    pub default_credit_load: f64,
    pub preset: PolicyPreset,
    /// Maximum number of term-history fetches in flight per request.
    pub history_fan_out: usize,
    pub directory_snapshot: Option<PathBuf>,
    pub identity_map: Option<PathBuf>,
    pub curriculum_rules: Option<PathBuf>,
    /// Course-code prefixes never offered, from a comma-separated list.
    pub excluded_prefixes: Vec<String>,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            default_credit_load: 60.0,
            preset: PolicyPreset::Standard,
            history_fan_out: 4,
            directory_snapshot: None,
            identity_map: None,
            curriculum_rules: None,
            excluded_prefixes: Vec::new(),
        }
    }
}

impl RecommenderConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let default_credit_load = match env::var("APP_DEFAULT_CREDIT_LOAD") {
            Ok(raw) => {
                let value = parse_number::<f64>("APP_DEFAULT_CREDIT_LOAD", &raw)?;
                if !value.is_finite() || value <= 0.0 {
                    return Err(ConfigError::InvalidNumber {
                        key: "APP_DEFAULT_CREDIT_LOAD",
                        value: raw,
                    });
                }
                value
            }
            Err(_) => defaults.default_credit_load,
        };

        let preset = match env::var("APP_RECOMMENDER_PRESET") {
            Ok(raw) => raw
                .parse::<PolicyPreset>()
                .map_err(|_| ConfigError::UnknownPreset(raw))?,
            Err(_) => defaults.preset,
        };

        let history_fan_out = match env::var("APP_HISTORY_FAN_OUT") {
            Ok(raw) => parse_number::<usize>("APP_HISTORY_FAN_OUT", &raw)?.max(1),
            Err(_) => defaults.history_fan_out,
        };

        Ok(Self {
            default_credit_load,
            preset,
            history_fan_out,
            directory_snapshot: optional_path("APP_DIRECTORY_SNAPSHOT"),
            identity_map: optional_path("APP_IDENTITY_MAP"),
            curriculum_rules: optional_path("APP_CURRICULUM_RULES"),
            excluded_prefixes: list("APP_EXCLUDED_PREFIXES"),
        })
    }
}

fn parse_number<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse::<T>().map_err(|_| ConfigError::InvalidNumber {
        key,
        value: raw.to_string(),
    })
}

fn optional_path(key: &str) -> Option<PathBuf> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn list(key: &str) -> Vec<String> {
    env::var(key)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidLogFormat(String),
    InvalidNumber { key: &'static str, value: String },
    UnknownPreset(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidLogFormat(value) => {
                write!(f, "APP_LOG_FORMAT must be 'compact' or 'full' (found '{value}')")
            }
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be a positive number (found '{value}')")
            }
            ConfigError::UnknownPreset(value) => write!(
                f,
                "APP_RECOMMENDER_PRESET must be 'standard' or 'exploration' (found '{value}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
