use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::workflows::cards::DEFAULT_CARD_PREFIX;
use crate::workflows::payments::{Amount, FeeSchedule};

const DEFAULT_API_BASE_URL: &str = "https://api.ndaid.help/api";
const DEFAULT_ASSET_ORIGIN: &str = "https://api.ndaid.help";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

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

/// Top-level configuration for the portal client and the sandbox server.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub remote: RemoteConfig,
    pub fees: FeeSchedule,
    pub card_prefix: String,
    pub admin_token: Option<String>,
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

        let base_url = env::var("PORTAL_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());
        let asset_origin = env::var("PORTAL_ASSET_ORIGIN")
            .unwrap_or_else(|_| DEFAULT_ASSET_ORIGIN.to_string());
        let timeout_secs = parse_u64_var("PORTAL_REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        let defaults = FeeSchedule::default();
        let base_fee = parse_fee_var("PORTAL_BASE_FEE", defaults.base())?;
        let lanyard_fee = parse_fee_var("PORTAL_LANYARD_FEE", defaults.lanyard())?;
        let fees = FeeSchedule::new(base_fee, lanyard_fee).ok_or(ConfigError::InvalidNumber {
            name: "PORTAL_LANYARD_FEE",
        })?;

        let card_prefix =
            env::var("PORTAL_CARD_PREFIX").unwrap_or_else(|_| DEFAULT_CARD_PREFIX.to_string());
        let admin_token = env::var("PORTAL_ADMIN_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());

        let remote = RemoteConfig {
            base_url: normalize_base_url(&base_url)?,
            asset_origin: normalize_base_url(&asset_origin)?,
            request_timeout: Duration::from_secs(timeout_secs),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            remote,
            fees,
            card_prefix,
            admin_token,
        })
    }
}

fn parse_u64_var(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber { name }),
        Err(_) => Ok(default),
    }
}

/// Whole units, rejected when they do not fit in minor units.
fn parse_fee_var(name: &'static str, default: Amount) -> Result<Amount, ConfigError> {
    let units = parse_u64_var(name, default.whole_units())?;
    Amount::checked_from_units(units).ok_or(ConfigError::InvalidNumber { name })
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.to_string())
    } else {
        Err(ConfigError::InvalidBaseUrl {
            value: raw.to_string(),
        })
    }
}

/// Settings controlling the sandbox HTTP server binding.
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

/// Where the remote system of record lives and how long to wait for it.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub base_url: String,
    pub asset_origin: String,
    pub request_timeout: Duration,
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
    InvalidTimeout,
    InvalidNumber { name: &'static str },
    InvalidBaseUrl { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimeout => {
                write!(f, "PORTAL_REQUEST_TIMEOUT_SECS must be greater than zero")
            }
            ConfigError::InvalidNumber { name } => {
                write!(f, "{name} must be a non-negative whole number")
            }
            ConfigError::InvalidBaseUrl { value } => {
                write!(f, "'{value}' is not an http(s) URL")
            }
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
