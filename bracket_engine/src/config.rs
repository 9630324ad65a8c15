//! Engine configuration.
//!
//! All settings come from environment variables with documented defaults.
//! Values that are present but malformed are reported as
//! [`ConfigError::Invalid`] rather than silently replaced by the default.

use std::fmt::Display;
use std::str::FromStr;

use crate::events::DEFAULT_EVENT_CAPACITY;
use crate::prize::PrizeSplit;
use crate::tournament::BracketFormat;

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Variable lookup, `std::env::var` in production
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads the process environment
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for std::collections::HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        std::collections::HashMap::get(self, key).cloned()
    }
}

/// Parse an optional variable, failing on a malformed value
pub fn parse_env<T>(env: &impl EnvSource, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match env.get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| ConfigError::Invalid {
                var: key.to_string(),
                reason: format!("'{raw}': {e}"),
            }),
        None => Ok(None),
    }
}

/// Parse a variable with default fallback when unset
pub fn parse_env_or<T>(env: &impl EnvSource, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    Ok(parse_env(env, key)?.unwrap_or(default))
}

/// Bracket engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Prize split per placement in basis points
    pub prize_split_bps: Vec<u32>,
    /// Format used when none is requested explicitly
    pub default_format: BracketFormat,
    /// Fixed seed for shuffled brackets, `None` for OS entropy
    pub rng_seed: Option<u64>,
    /// Capacity of the bracket event channel
    pub event_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            prize_split_bps: PrizeSplit::default().shares_bps().to_vec(),
            default_format: BracketFormat::SingleElimination,
            rng_seed: None,
            event_channel_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `PRIZE_SPLIT`: comma separated basis points (default: 6000,3000,1000)
    /// - `BRACKET_FORMAT`: `single` or `double` (default: single)
    /// - `BRACKET_RNG_SEED`: fixed shuffle seed (default: unset)
    /// - `EVENT_CHANNEL_CAPACITY`: event buffer size (default: 256)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a variable is set but malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&ProcessEnv)
    }

    pub fn from_source(env: &impl EnvSource) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let prize_split_bps = match env.get("PRIZE_SPLIT") {
            Some(raw) => parse_split(&raw)?,
            None => defaults.prize_split_bps,
        };

        Ok(Self {
            prize_split_bps,
            default_format: parse_env_or(env, "BRACKET_FORMAT", defaults.default_format)?,
            rng_seed: parse_env(env, "BRACKET_RNG_SEED")?,
            event_channel_capacity: parse_env_or(
                env,
                "EVENT_CHANNEL_CAPACITY",
                defaults.event_channel_capacity,
            )?,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.prize_split()?;

        if self.event_channel_capacity == 0 {
            return Err(ConfigError::Invalid {
                var: "EVENT_CHANNEL_CAPACITY".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// The configured split, checked to cover the whole pool
    pub fn prize_split(&self) -> Result<PrizeSplit, ConfigError> {
        PrizeSplit::new(self.prize_split_bps.clone()).map_err(|e| ConfigError::Invalid {
            var: "PRIZE_SPLIT".to_string(),
            reason: e.to_string(),
        })
    }
}

fn parse_split(raw: &str) -> Result<Vec<u32>, ConfigError> {
    raw.split(',')
        .map(|share| {
            share.trim().parse::<u32>().map_err(|e| ConfigError::Invalid {
                var: "PRIZE_SPLIT".to_string(),
                reason: format!("'{share}': {e}"),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_source(&env(&[])).unwrap();
        assert_eq!(config.prize_split_bps, vec![6000, 3000, 1000]);
        assert_eq!(config.default_format, BracketFormat::SingleElimination);
        assert_eq!(config.rng_seed, None);
        assert_eq!(config.event_channel_capacity, DEFAULT_EVENT_CAPACITY);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::from_source(&env(&[
            ("PRIZE_SPLIT", "7000, 3000"),
            ("BRACKET_FORMAT", "double"),
            ("BRACKET_RNG_SEED", "42"),
            ("EVENT_CHANNEL_CAPACITY", "16"),
        ]))
        .unwrap();

        assert_eq!(config.prize_split_bps, vec![7000, 3000]);
        assert_eq!(config.default_format, BracketFormat::DoubleElimination);
        assert_eq!(config.rng_seed, Some(42));
        assert_eq!(config.event_channel_capacity, 16);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_malformed_values_are_errors() {
        let err = EngineConfig::from_source(&env(&[("BRACKET_FORMAT", "swiss")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "BRACKET_FORMAT"));

        let err = EngineConfig::from_source(&env(&[("PRIZE_SPLIT", "60,x")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "PRIZE_SPLIT"));

        let err = EngineConfig::from_source(&env(&[("BRACKET_RNG_SEED", "-1")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_split_must_cover_pool() {
        let config = EngineConfig::from_source(&env(&[("PRIZE_SPLIT", "5000,3000")])).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("PRIZE_SPLIT"));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = EngineConfig {
            event_channel_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingRequired {
            var: "DATABASE_URL".to_string(),
            hint: "postgres://user@localhost/brackets".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("DATABASE_URL"));
        assert!(msg.contains("postgres://"));
    }
}
