//! Sync engine configuration
//!
//! Loads configuration from environment variables (and a `.env` file if present).
//! Every value has a default, so an empty environment yields a working config.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// Sync engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SyncConfig {
    /// Number of messages requested by the historical fetch
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Local debounce: silence after the last keystroke before publishing idle
    #[serde(default = "default_typing_idle", with = "millis")]
    pub typing_idle: Duration,
    /// Remote expiry: how long a peer's `typing` flag is trusted without refresh
    #[serde(default = "default_typing_expiry", with = "millis")]
    pub typing_expiry: Duration,
    /// How long a cached profile is served before it is fetched again
    ///
    /// Whole seconds, like `LOBBY_PROFILE_TTL_SECS`.
    #[serde(rename = "profile_ttl_secs", default = "default_profile_ttl", with = "secs")]
    pub profile_ttl: Duration,
    /// Capacity of the update channel towards the UI layer
    #[serde(default = "default_update_buffer")]
    pub update_buffer: usize,
    /// Presence topic joined by every client of the room
    #[serde(default = "default_presence_channel")]
    pub presence_channel: String,
    /// Own display name used until the roster resolves it
    #[serde(default = "default_fallback_display_name")]
    pub fallback_display_name: String,
}

// Default value functions
fn default_history_limit() -> usize {
    100
}

fn default_typing_idle() -> Duration {
    Duration::from_millis(2000)
}

fn default_typing_expiry() -> Duration {
    Duration::from_millis(3000)
}

fn default_profile_ttl() -> Duration {
    Duration::from_secs(60)
}

fn default_update_buffer() -> usize {
    256
}

fn default_presence_channel() -> String {
    "room:lobby".to_string()
}

fn default_fallback_display_name() -> String {
    "User".to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            typing_idle: default_typing_idle(),
            typing_expiry: default_typing_expiry(),
            profile_ttl: default_profile_ttl(),
            update_buffer: default_update_buffer(),
            presence_channel: default_presence_channel(),
            fallback_display_name: default_fallback_display_name(),
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if a variable is set but malformed, or if the
    /// resulting configuration fails [`SyncConfig::validate`].
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            history_limit: parse_or(&lookup, "LOBBY_HISTORY_LIMIT", default_history_limit)?,
            typing_idle: Duration::from_millis(parse_or(&lookup, "LOBBY_TYPING_IDLE_MS", || 2000)?),
            typing_expiry: Duration::from_millis(parse_or(
                &lookup,
                "LOBBY_TYPING_EXPIRY_MS",
                || 3000,
            )?),
            profile_ttl: Duration::from_secs(parse_or(&lookup, "LOBBY_PROFILE_TTL_SECS", || 60)?),
            update_buffer: parse_or(&lookup, "LOBBY_UPDATE_BUFFER", default_update_buffer)?,
            presence_channel: lookup("LOBBY_PRESENCE_CHANNEL")
                .unwrap_or_else(default_presence_channel),
            fallback_display_name: lookup("LOBBY_FALLBACK_NAME")
                .unwrap_or_else(default_fallback_display_name),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    ///
    /// The remote expiry must outlast the local debounce, otherwise a peer's
    /// indicator flickers off between two consecutive refreshes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_limit == 0 {
            return Err(ConfigError::InvalidValue(
                "LOBBY_HISTORY_LIMIT",
                "must be greater than zero".to_string(),
            ));
        }
        if self.update_buffer == 0 {
            return Err(ConfigError::InvalidValue(
                "LOBBY_UPDATE_BUFFER",
                "must be greater than zero".to_string(),
            ));
        }
        if self.typing_idle.is_zero() {
            return Err(ConfigError::InvalidValue(
                "LOBBY_TYPING_IDLE_MS",
                "must be greater than zero".to_string(),
            ));
        }
        if self.typing_expiry <= self.typing_idle {
            return Err(ConfigError::InvalidValue(
                "LOBBY_TYPING_EXPIRY_MS",
                format!(
                    "must exceed the typing idle window ({} ms)",
                    self.typing_idle.as_millis()
                ),
            ));
        }
        if self.presence_channel.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "LOBBY_PRESENCE_CHANNEL",
                "must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_or<F, T, D>(lookup: &F, key: &'static str, default: D) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    D: FnOnce() -> T,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
        None => Ok(default()),
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),

    #[error("Missing collaborator: {0}")]
    MissingCollaborator(&'static str),
}
