use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::allocation::{SeatLabel, SeatingGrid, SeatingPolicy, ValidationError};

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
    pub seating: SeatingConfig,
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

        let columns = env::var("SEATING_COLUMNS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|column| !column.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_else(|_| {
                SeatingGrid::REFERENCE_COLUMNS
                    .iter()
                    .map(|column| column.to_string())
                    .collect()
            });
        let rows = match env::var("SEATING_ROWS") {
            Ok(raw) => raw.trim().parse::<u32>().map_err(|_| ConfigError::InvalidRows)?,
            Err(_) => SeatingGrid::REFERENCE_ROWS,
        };
        let stage_label = env::var("SEATING_STAGE_LABEL")
            .unwrap_or_else(|_| SeatLabel::DEFAULT_STAGE.to_string());

        let seating = SeatingConfig {
            columns,
            rows,
            stage_label,
        };
        seating.policy()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            seating,
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
}

/// Hall grid layout and the staff seat label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatingConfig {
    pub columns: Vec<String>,
    pub rows: u32,
    pub stage_label: String,
}

impl SeatingConfig {
    pub fn policy(&self) -> Result<SeatingPolicy, ConfigError> {
        let grid = SeatingGrid::new(&self.columns, self.rows)
            .map_err(|source| ConfigError::InvalidSeating { source })?;
        let stage_label = SeatLabel::parse(&self.stage_label)
            .map_err(|source| ConfigError::InvalidSeating { source })?;
        if stage_label.is_grid_label() {
            return Err(ConfigError::StageLabelOnGrid {
                label: stage_label.to_string(),
            });
        }
        Ok(SeatingPolicy::new(grid, stage_label))
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidRows,
    InvalidSeating { source: ValidationError },
    StageLabelOnGrid { label: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidRows => write!(f, "SEATING_ROWS must be a positive integer"),
            ConfigError::InvalidSeating { source } => {
                write!(f, "seating layout is invalid: {source}")
            }
            ConfigError::StageLabelOnGrid { label } => {
                write!(f, "SEATING_STAGE_LABEL '{label}' collides with grid seat labels")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidSeating { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidRows
            | ConfigError::StageLabelOnGrid { .. } => None,
        }
    }
}
