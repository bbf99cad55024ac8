//! Configuration for Vitalis.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveTime;

use crate::error::ConfigError;

/// Main configuration for the agent.
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub bot: BotConfig,
    pub reminder: ReminderConfig,
    pub web: WebConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            database: DatabaseConfig::from_env()?,
            bot: BotConfig::from_env()?,
            reminder: ReminderConfig::from_env()?,
            web: WebConfig::from_env()?,
        })
    }
}

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to the libSQL database file.
    pub path: PathBuf,
}

impl DatabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let path = optional_env("DATABASE_PATH")?
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("vitalis.db"));

        Ok(Self { path })
    }
}

/// Conversation flow configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Fixed offset from UTC applied to all date-boundary computations.
    ///
    /// The original deployment assumed one timezone for all users; this is
    /// that assumption made explicit and configurable. No tz database.
    pub utc_offset_hours: i8,

    /// Local time-of-day before which the daily flow cannot be started.
    /// The reminder sweep fires at the same time.
    pub daily_cutoff: NaiveTime,

    /// Idle time after which a session is discarded on next contact.
    pub session_timeout: Duration,

    /// How many recent records the analyzer reads (days).
    pub recent_window: usize,
}

impl BotConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let utc_offset_hours = optional_env("UTC_OFFSET_HOURS")?
            .map(|s| s.parse::<i8>())
            .transpose()
            .map_err(|e| ConfigError::InvalidValue {
                key: "UTC_OFFSET_HOURS".to_string(),
                message: format!("must be an integer between -12 and 14: {e}"),
            })?
            .unwrap_or(5);
        if !(-12..=14).contains(&utc_offset_hours) {
            return Err(ConfigError::InvalidValue {
                key: "UTC_OFFSET_HOURS".to_string(),
                message: "must be between -12 and 14".to_string(),
            });
        }

        let daily_cutoff = match optional_env("DAILY_CUTOFF")? {
            Some(s) => NaiveTime::parse_from_str(&s, "%H:%M").map_err(|e| {
                ConfigError::InvalidValue {
                    key: "DAILY_CUTOFF".to_string(),
                    message: format!("must be HH:MM: {e}"),
                }
            })?,
            None => NaiveTime::from_hms_opt(21, 0, 0).expect("valid constant time"),
        };

        let session_timeout_minutes = optional_env("SESSION_TIMEOUT_MINUTES")?
            .map(|s| s.parse::<u64>())
            .transpose()
            .map_err(|e| ConfigError::InvalidValue {
                key: "SESSION_TIMEOUT_MINUTES".to_string(),
                message: format!("must be a positive integer: {e}"),
            })?
            .unwrap_or(30);

        let recent_window = optional_env("RECENT_WINDOW_DAYS")?
            .map(|s| s.parse::<usize>())
            .transpose()
            .map_err(|e| ConfigError::InvalidValue {
                key: "RECENT_WINDOW_DAYS".to_string(),
                message: format!("must be a positive integer: {e}"),
            })?
            .unwrap_or(30);
        if recent_window == 0 {
            return Err(ConfigError::InvalidValue {
                key: "RECENT_WINDOW_DAYS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            utc_offset_hours,
            daily_cutoff,
            session_timeout: Duration::from_secs(session_timeout_minutes * 60),
            recent_window,
        })
    }
}

/// Reminder sweep configuration.
#[derive(Debug, Clone)]
pub struct ReminderConfig {
    /// Whether the background reminder task runs at all.
    pub enabled: bool,

    /// Delay between outbound sends during a sweep, to respect transport
    /// rate limits.
    pub send_delay: Duration,
}

impl ReminderConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let enabled = parse_bool_env("REMINDER_ENABLED")?.unwrap_or(true);

        let send_delay_ms = optional_env("REMINDER_SEND_DELAY_MS")?
            .map(|s| s.parse::<u64>())
            .transpose()
            .map_err(|e| ConfigError::InvalidValue {
                key: "REMINDER_SEND_DELAY_MS".to_string(),
                message: format!("must be a non-negative integer: {e}"),
            })?
            .unwrap_or(100);

        Ok(Self {
            enabled,
            send_delay: Duration::from_millis(send_delay_ms),
        })
    }
}

/// Web health endpoint configuration.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Whether the health endpoint is served.
    pub enabled: bool,

    /// Bind address for the health endpoint.
    pub bind: SocketAddr,
}

impl WebConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let enabled = parse_bool_env("WEB_ENABLED")?.unwrap_or(true);

        let bind = optional_env("WEB_BIND")?
            .map(|s| s.parse::<SocketAddr>())
            .transpose()
            .map_err(|e| ConfigError::InvalidValue {
                key: "WEB_BIND".to_string(),
                message: format!("must be an address like 127.0.0.1:8080: {e}"),
            })?
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8080)));

        Ok(Self { enabled, bind })
    }
}

/// Read an optional environment variable, treating empty values as unset.
fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(val) if val.trim().is_empty() => Ok(None),
        Ok(val) => Ok(Some(val)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
    }
}

/// Read an optional boolean environment variable ("true"/"1"/"false"/"0").
fn parse_bool_env(key: &str) -> Result<Option<bool>, ConfigError> {
    match optional_env(key)? {
        None => Ok(None),
        Some(val) => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(Some(true)),
            "false" | "0" | "no" => Ok(Some(false)),
            other => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("must be true or false, got '{other}'"),
            }),
        },
    }
}
