use crate::core::{RegistryError, Result};
use anyhow::Context;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Registry configuration
///
/// Built with chained setters or loaded from the environment.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// SQLite database file; a fresh connection is opened per operation
    pub database_path: PathBuf,

    /// How long a password reset token stays valid
    pub reset_token_ttl: Duration,

    /// Lifetime of an identity issued at login
    pub session_ttl: Duration,

    /// Requests allowed per visitor per window
    pub rate_limit: u32,

    /// Rate limiter reset interval
    pub rate_window: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::new("school.db")
    }
}

impl RegistryConfig {
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            reset_token_ttl: Duration::from_secs(10 * 60),
            session_ttl: Duration::from_secs(24 * 60 * 60),
            rate_limit: 100,
            rate_window: Duration::from_secs(60),
        }
    }

    pub fn reset_token_ttl(mut self, ttl: Duration) -> Self {
        self.reset_token_ttl = ttl;
        self
    }

    pub fn session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn rate_limit(mut self, limit: u32, window: Duration) -> Self {
        self.rate_limit = limit;
        self.rate_window = window;
        self
    }

    /// Loads `.env` (if present) and reads overrides from the environment.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let database_path = env::var("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.database_path);

        let reset_minutes = env_number("RESET_TOKEN_EXP_DURATION", 10)
            .context("RESET_TOKEN_EXP_DURATION must be a whole number of minutes")?;
        let session_hours = env_number("SESSION_TTL_HOURS", 24)
            .context("SESSION_TTL_HOURS must be a whole number of hours")?;
        let rate_limit = env_number("RATE_LIMIT", 100).context("RATE_LIMIT must be a valid u32")?;
        let window_secs =
            env_number("RATE_WINDOW_SECS", 60).context("RATE_WINDOW_SECS must be a valid u64")?;

        let config = Self {
            database_path,
            reset_token_ttl: Duration::from_secs(reset_minutes * 60),
            session_ttl: Duration::from_secs(session_hours * 60 * 60),
            rate_limit: u32::try_from(rate_limit).context("RATE_LIMIT is out of range")?,
            rate_window: Duration::from_secs(window_secs),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let path = self.database_path.as_os_str();
        if path.is_empty() {
            return Err(RegistryError::invalid_input("database path cannot be empty"));
        }
        if path == ":memory:" {
            return Err(RegistryError::invalid_input(
                "in-memory databases do not survive between connections",
            ));
        }
        if self.reset_token_ttl.is_zero() || self.session_ttl.is_zero() {
            return Err(RegistryError::invalid_input("token lifetimes must be > 0"));
        }
        if self.rate_limit == 0 || self.rate_window.is_zero() {
            return Err(RegistryError::invalid_input("rate limit and window must be > 0"));
        }
        Ok(())
    }
}

fn env_number(key: &str, default: u64) -> anyhow::Result<u64> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("invalid value '{raw}' for {key}")),
        Err(_) => Ok(default),
    }
}
