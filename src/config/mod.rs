//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

/// Application configuration loaded from environment variables
///
/// Every match timing has a default so the server runs with no environment
/// at all; operators override individual knobs per deployment.
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origin for CORS ("*" = any)
    pub client_origin: String,

    /// Minimum connected players before the lobby timer runs
    pub min_players: usize,
    /// Lobby wait once the quorum is met (seconds)
    pub lobby_wait_secs: f32,
    /// Pre-drop countdown length (whole seconds, one broadcast each)
    pub countdown_secs: u32,
    /// Settle window after drop placement (seconds)
    pub drop_settle_secs: f32,
    /// Hard cap on match duration; timeout ends the match with no winner
    pub max_match_secs: f32,
    /// Results display hold after the match ends (seconds)
    pub results_secs: f32,
    /// Intermission before the next lobby opens (seconds)
    pub intermission_secs: f32,

    /// Playable map width; the zone's initial radius is half of this
    pub map_size: f32,
    /// Remaining-delay threshold below which per-second zone warnings fire
    pub zone_warning_secs: u32,
    /// Interval between zone damage sweeps (seconds)
    pub zone_damage_interval_secs: f32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Render provides PORT env var, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            client_origin: env::var("CLIENT_ORIGIN").unwrap_or_else(|_| "*".to_string()),

            min_players: parse_env("MIN_PLAYERS", 2)?,
            lobby_wait_secs: parse_env("LOBBY_WAIT_SECS", 30.0)?,
            countdown_secs: parse_env("COUNTDOWN_SECS", 5)?,
            drop_settle_secs: parse_env("DROP_SETTLE_SECS", 10.0)?,
            max_match_secs: parse_env("MAX_MATCH_SECS", 600.0)?,
            results_secs: parse_env("RESULTS_SECS", 10.0)?,
            intermission_secs: parse_env("INTERMISSION_SECS", 15.0)?,

            map_size: parse_env("MAP_SIZE", 3000.0)?,
            zone_warning_secs: parse_env("ZONE_WARNING_SECS", 10)?,
            zone_damage_interval_secs: parse_env("ZONE_DAMAGE_INTERVAL_SECS", 1.0)?,
        })
    }
}

/// Parse an optional environment variable, falling back to a default
fn parse_env<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid(key)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
