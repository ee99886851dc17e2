//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use liars_deck::GameSettings;
use std::{net::SocketAddr, path::PathBuf, time::Duration};

/// Longest reveal pause accepted. Pauses hold the game's lock.
const MAX_REVEAL_DELAY: Duration = Duration::from_secs(30);

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Directory served for every path the API doesn't claim
    pub static_dir: PathBuf,
    /// Pause after penalties and system challenges
    pub reveal_delay: Duration,
    /// Maximum number of concurrent games
    pub max_games: usize,
    /// Whether `/metrics` is served
    pub metrics_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            static_dir: PathBuf::from("static"),
            reveal_delay: Duration::from_millis(2000),
            max_games: 100,
            metrics_enabled: true,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `static_dir_override` - Optional static directory override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but can't be parsed
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        static_dir_override: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_env("SERVER_BIND")?.unwrap_or(defaults.bind),
        };

        let static_dir = static_dir_override
            .or_else(|| std::env::var("STATIC_DIR").ok().map(PathBuf::from))
            .unwrap_or(defaults.static_dir);

        let reveal_delay = parse_env::<u64>("REVEAL_DELAY_MS")?
            .map_or(defaults.reveal_delay, Duration::from_millis);

        Ok(ServerConfig {
            bind,
            static_dir,
            reveal_delay,
            max_games: parse_env_or("MAX_GAMES", defaults.max_games),
            metrics_enabled: parse_env_or("METRICS_ENABLED", defaults.metrics_enabled),
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_games == 0 {
            return Err(ConfigError::Invalid {
                var: "MAX_GAMES".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.reveal_delay > MAX_REVEAL_DELAY {
            return Err(ConfigError::Invalid {
                var: "REVEAL_DELAY_MS".to_string(),
                reason: format!("Must be at most {} ms", MAX_REVEAL_DELAY.as_millis()),
            });
        }

        if self.static_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                var: "STATIC_DIR".to_string(),
                reason: "Must not be empty".to_string(),
            });
        }

        self.game_settings()
            .validate()
            .map_err(|reason| ConfigError::Invalid {
                var: "GAME_SETTINGS".to_string(),
                reason,
            })
    }

    /// Settings every new game is created with
    #[must_use]
    pub fn game_settings(&self) -> GameSettings {
        GameSettings {
            reveal_delay: self.reveal_delay,
            ..GameSettings::default()
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Parse an environment variable, failing loudly if it's set but malformed
fn parse_env<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::Invalid {
                var: key.to_string(),
                reason: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
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
