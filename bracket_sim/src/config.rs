//! Simulator configuration management.
//!
//! Consolidates all environment variable reads and applies command line
//! overrides on top of them.

use bracket_engine::config::{ConfigError, EngineConfig, EnvSource, ProcessEnv, parse_env, parse_env_or};
use bracket_engine::tournament::BracketFormat;

/// Values given on the command line, each overriding its environment variable
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub players: Option<usize>,
    pub format: Option<BracketFormat>,
    pub prize_pool: Option<i64>,
    pub seed: Option<u64>,
    pub seeded: bool,
    pub database_url: Option<String>,
}

/// Complete simulator configuration
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Number of generated participants
    pub players: usize,
    pub format: BracketFormat,
    pub prize_pool: i64,
    /// Seed for bracket shuffling and simulated scores
    pub seed: Option<u64>,
    /// Give participants explicit seeds instead of shuffling
    pub seeded: bool,
    /// PostgreSQL connection string, in-memory storage when unset
    pub database_url: Option<String>,
    /// Engine settings
    pub engine: EngineConfig,
}

impl SimConfig {
    /// Load configuration from environment variables
    ///
    /// Expected environment variables (besides those of [`EngineConfig`]):
    /// - `SIM_PLAYERS`: participant count (default: 8)
    /// - `SIM_PRIZE_POOL`: prize pool in minor units (default: 1000)
    /// - `DATABASE_URL`: run against PostgreSQL (default: in-memory)
    ///
    /// # Errors
    ///
    /// Returns error if a variable is malformed or the result fails
    /// validation
    pub fn from_env(overrides: CliOverrides) -> Result<Self, ConfigError> {
        Self::from_source(&ProcessEnv, overrides)
    }

    pub fn from_source(env: &impl EnvSource, overrides: CliOverrides) -> Result<Self, ConfigError> {
        let engine = EngineConfig::from_source(env)?;

        let players = match overrides.players {
            Some(players) => players,
            None => parse_env_or(env, "SIM_PLAYERS", 8)?,
        };
        let prize_pool = match overrides.prize_pool {
            Some(pool) => pool,
            None => parse_env_or(env, "SIM_PRIZE_POOL", 1000)?,
        };

        let config = Self {
            players,
            format: overrides.format.unwrap_or(engine.default_format),
            prize_pool,
            seed: overrides.seed.or(engine.rng_seed),
            seeded: overrides.seeded,
            database_url: match overrides.database_url {
                Some(url) => Some(url),
                None => parse_env(env, "DATABASE_URL")?,
            },
            engine,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;

        if self.players < 2 {
            return Err(ConfigError::Invalid {
                var: "SIM_PLAYERS".to_string(),
                reason: "Must be at least 2".to_string(),
            });
        }

        if self.prize_pool < 0 {
            return Err(ConfigError::Invalid {
                var: "SIM_PRIZE_POOL".to_string(),
                reason: "Must not be negative".to_string(),
            });
        }

        Ok(())
    }
}
