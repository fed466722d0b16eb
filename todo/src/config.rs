//! Configuration for the todo client.
//!
//! Loaded from environment variables (optionally via a `.env` file) with
//! defaults that point at the public students API.

use crate::types::UserId;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Default REST API root
pub const DEFAULT_API_URL: &str = "https://mate.academy/students-api";

/// Default session user
pub const DEFAULT_USER_ID: u64 = 854;

/// Client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote API settings
    pub api: ApiConfig,
    /// Presentation settings
    pub ui: UiConfig,
}

/// Remote API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Root URL; the collection lives at `{base_url}/todos`
    pub base_url: String,
    /// User whose todos are shown
    pub user_id: UserId,
    /// Request timeout in seconds
    pub request_timeout: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            user_id: UserId::new(DEFAULT_USER_ID),
            request_timeout: 30,
        }
    }
}

/// Presentation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// How long an error banner stays visible, in milliseconds
    pub error_display_ms: u64,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl UiConfig {
    /// Error banner lifetime as a `Duration`
    #[must_use]
    pub const fn error_display(&self) -> Duration {
        Duration::from_millis(self.error_display_ms)
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            error_display_ms: 3000,
            log_level: "todo_sync=info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Unset or unparsable values fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|value| parse(&value));

        Self {
            api: ApiConfig {
                base_url: lookup("TODO_API_URL")
                    .filter(|url| !url.trim().is_empty())
                    .unwrap_or(defaults.api.base_url),
                user_id: parsed("TODO_USER_ID")
                    .map(UserId::new)
                    .unwrap_or(defaults.api.user_id),
                request_timeout: parsed("TODO_REQUEST_TIMEOUT_SECS")
                    .unwrap_or(defaults.api.request_timeout),
            },
            ui: UiConfig {
                error_display_ms: parsed("TODO_ERROR_DISPLAY_MS")
                    .unwrap_or(defaults.ui.error_display_ms),
                log_level: lookup("RUST_LOG").unwrap_or(defaults.ui.log_level),
            },
        }
    }
}

fn parse<T: FromStr>(value: &str) -> Option<T> {
    let parsed = value.trim().parse().ok();
    if parsed.is_none() {
        tracing::warn!(value, "Ignoring unparsable configuration value");
    }
    parsed
}
