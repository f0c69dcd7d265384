//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use chrono::FixedOffset;
use geo_presence::{
    admission::SecondFactor,
    db::DatabaseConfig,
    face::{DEFAULT_MATCH_THRESHOLD, DEFAULT_TEMPLATE_CAP, FaceConfig},
};
use std::{net::SocketAddr, time::Duration};

const DEFAULT_BIND: &str = "127.0.0.1:8080";
const DEFAULT_FACE_URL: &str = "http://127.0.0.1:8001";
const DEFAULT_FACE_TIMEOUT_SECS: u64 = 12;

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Admission configuration
    pub admission: AdmissionConfig,
    /// Prometheus listener, disabled when unset
    pub metrics_bind: Option<SocketAddr>,
}

/// Admission-related configuration
#[derive(Debug, Clone)]
pub struct AdmissionConfig {
    /// Second factor applied after the geofence
    pub second_factor: SecondFactor,
    /// Face scoring service root URL
    pub face_service_url: String,
    /// Cosine-distance match threshold
    pub face_match_threshold: f64,
    /// Bound on each scoring call, in seconds
    pub face_timeout_secs: u64,
    /// Most recent templates sent per verification
    pub face_template_cap: usize,
    /// Reference offset deciding the calendar day of a record
    pub utc_offset: FixedOffset,
}

impl AdmissionConfig {
    pub fn face_config(&self) -> FaceConfig {
        FaceConfig {
            threshold: self.face_match_threshold,
            timeout: Duration::from_secs(self.face_timeout_secs),
            template_cap: self.face_template_cap,
        }
    }
}

/// CLI overrides, applied before the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub bind: Option<SocketAddr>,
    pub database_url: Option<String>,
    pub second_factor: Option<SecondFactor>,
    pub face_service_url: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when a set variable cannot be parsed.
    /// Unset variables fall back to their defaults.
    pub fn from_env(overrides: Overrides) -> Result<Self, ConfigError> {
        let bind = match overrides.bind {
            Some(bind) => bind,
            None => parse_env_required_format("SERVER_BIND", DEFAULT_BIND)?,
        };

        let database = DatabaseConfig::from_env(overrides.database_url);

        let second_factor = match overrides.second_factor {
            Some(factor) => factor,
            None => match std::env::var("SECOND_FACTOR") {
                Ok(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                    var: "SECOND_FACTOR".to_string(),
                    reason,
                })?,
                Err(_) => SecondFactor::default(),
            },
        };

        let face_service_url = overrides
            .face_service_url
            .or_else(|| std::env::var("FACE_SERVICE_URL").ok())
            .unwrap_or_else(|| DEFAULT_FACE_URL.to_string());

        let utc_offset = match std::env::var("ATTENDANCE_UTC_OFFSET") {
            Ok(raw) => parse_utc_offset(&raw).ok_or_else(|| ConfigError::Invalid {
                var: "ATTENDANCE_UTC_OFFSET".to_string(),
                reason: format!("Expected ±HH:MM, got {raw:?}"),
            })?,
            Err(_) => FixedOffset::east_opt(0).ok_or_else(|| ConfigError::Invalid {
                var: "ATTENDANCE_UTC_OFFSET".to_string(),
                reason: "UTC offset unavailable".to_string(),
            })?,
        };

        let admission = AdmissionConfig {
            second_factor,
            face_service_url,
            face_match_threshold: parse_env_or("FACE_MATCH_THRESHOLD", DEFAULT_MATCH_THRESHOLD),
            face_timeout_secs: parse_env_or("FACE_TIMEOUT_SECS", DEFAULT_FACE_TIMEOUT_SECS),
            face_template_cap: parse_env_or("FACE_TEMPLATE_CAP", DEFAULT_TEMPLATE_CAP),
            utc_offset,
        };

        let metrics_bind = match std::env::var("METRICS_BIND") {
            Ok(raw) => Some(raw.parse().map_err(|_| ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("Not a socket address: {raw:?}"),
            })?),
            Err(_) => None,
        };

        Ok(ServerConfig {
            bind,
            database,
            admission,
            metrics_bind,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.database
            .validate()
            .map_err(|reason| ConfigError::Invalid {
                var: "DB_MAX_CONNECTIONS".to_string(),
                reason,
            })?;

        let threshold = self.admission.face_match_threshold;
        if !(threshold.is_finite() && threshold > 0.0 && threshold <= 2.0) {
            return Err(ConfigError::Invalid {
                var: "FACE_MATCH_THRESHOLD".to_string(),
                reason: format!("Must be a cosine distance in (0, 2], got {threshold}"),
            });
        }

        if !(1..=60).contains(&self.admission.face_timeout_secs) {
            return Err(ConfigError::Invalid {
                var: "FACE_TIMEOUT_SECS".to_string(),
                reason: "Must be between 1 and 60 seconds".to_string(),
            });
        }

        if self.admission.face_template_cap == 0 {
            return Err(ConfigError::Invalid {
                var: "FACE_TEMPLATE_CAP".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }

        if !(self.admission.face_service_url.starts_with("http://")
            || self.admission.face_service_url.starts_with("https://"))
        {
            return Err(ConfigError::Invalid {
                var: "FACE_SERVICE_URL".to_string(),
                reason: "Must start with http:// or https://".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Like [`parse_env_or`], but a set and unparsable value is an error
fn parse_env_required_format<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse().map_err(|_| ConfigError::Invalid {
        var: key.to_string(),
        reason: format!("Cannot parse {raw:?}"),
    })
}

/// Parse `+HH:MM`, `-HH:MM` or `Z`
pub fn parse_utc_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':')?;
    if hours.len() != 2 || minutes.len() != 2 {
        return None;
    }
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
