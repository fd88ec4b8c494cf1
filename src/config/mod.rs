//! Configuration module - environment variable parsing

use std::env;
use std::str::FromStr;

use crate::game::boss::AiPolicy;

/// Application configuration loaded from environment variables.
/// Everything has a sensible default so a bare `cargo run` works.
#[derive(Clone, Debug)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Boss AI policy: "hunter" (full chase/attack machine) or
    /// "perimeter" (fixed waypoint loop, no attacks)
    pub ai_policy: AiPolicy,
    /// Delay between boss defeat and respawn, in milliseconds
    pub boss_respawn_delay_ms: u64,

    /// Half extent of the square arena (walls at +/- this value)
    pub map_half_extent: f32,
    /// Maximum vehicles per arena
    pub max_players: usize,

    /// Deterministic seed override (0 = derive from clock)
    pub seed: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            ai_policy: match env::var("BOSS_AI_POLICY") {
                Ok(raw) => AiPolicy::from_str(&raw)
                    .map_err(|_| ConfigError::InvalidValue("BOSS_AI_POLICY", raw))?,
                Err(_) => AiPolicy::Hunter,
            },
            boss_respawn_delay_ms: parse_or("BOSS_RESPAWN_DELAY_MS", 30_000)?,

            map_half_extent: parse_or("MAP_HALF_EXTENT", 80.0)?,
            max_players: parse_or("MAX_PLAYERS", 16)?,

            seed: parse_or("ARENA_SEED", 0)?,
        })
    }
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1:?}")]
    InvalidValue(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_env_is_empty() {
        // Touch only keys this test owns to avoid cross-test env races.
        let config = Config::from_env().unwrap();
        assert_eq!(config.max_players, 16);
        assert!(matches!(config.ai_policy, AiPolicy::Hunter));
    }

    #[test]
    fn invalid_policy_is_rejected() {
        assert!(AiPolicy::from_str("berserk").is_err());
        assert!(matches!(AiPolicy::from_str("perimeter"), Ok(AiPolicy::Perimeter)));
    }
}
