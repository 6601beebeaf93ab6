//! Configuration loader for the greenhouse telemetry client.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). By consolidating configuration logic here, we
//! avoid scattering `env::var` calls throughout the codebase, improving
//!
use std::env;

use anyhow::{anyhow, Result};

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u32 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Backend REST API base URL.
    pub api_url: String,

    /// Event stream endpoint URL.
    pub ws_url: String,

    /// Path of the persisted bearer-token store.
    pub token_path: String,

    /// Base reconnect delay in milliseconds (doubles per attempt).
    pub ws_reconnect_base_ms: u32,

    /// Maximum consecutive reconnect attempts before giving up.
    pub ws_max_reconnects: u32,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `GREENHOUSE_API_URL` – backend REST API base URL
///
/// Optional:
/// - `GREENHOUSE_WS_URL` – event stream URL (default: derived from the API URL)
/// - `GREENHOUSE_TOKEN_PATH` – bearer-token store path (default: `.greenhouse_token.json`)
/// - `WS_RECONNECT_BASE_MS` – base reconnect delay (default: 5000)
/// - `WS_MAX_RECONNECTS` – reconnect attempt cap (default: 6)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let api_url = require_env!("GREENHOUSE_API_URL");
    let ws_url = match env::var("GREENHOUSE_WS_URL") {
        Ok(url) => url,
        Err(_) => derive_ws_url(&api_url),
    };
    let token_path = env::var("GREENHOUSE_TOKEN_PATH")
        .unwrap_or_else(|_| ".greenhouse_token.json".to_string());
    let ws_reconnect_base_ms = parse_env_u32!("WS_RECONNECT_BASE_MS", 5_000);
    let ws_max_reconnects = parse_env_u32!("WS_MAX_RECONNECTS", 6);

    Ok(Config {
        api_url,
        ws_url,
        token_path,
        ws_reconnect_base_ms,
        ws_max_reconnects,
    })
}

/// Derive the stream endpoint from the API base URL (`http` → `ws`,
/// `https` → `wss`, path `/ws/wsinit`).
fn derive_ws_url(api_url: &str) -> String {
    // ---
    let base = api_url.trim_end_matches('/');
    let swapped = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        format!("ws://{base}")
    };
    format!("{swapped}/ws/wsinit")
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  GREENHOUSE_API_URL   : {}", self.api_url);
        tracing::info!("  GREENHOUSE_WS_URL    : {}", self.ws_url);
        tracing::info!("  GREENHOUSE_TOKEN_PATH: {}", self.token_path);
        tracing::info!("  WS_RECONNECT_BASE_MS : {}", self.ws_reconnect_base_ms);
        tracing::info!("  WS_MAX_RECONNECTS    : {}", self.ws_max_reconnects);
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_derive_ws_url() {
        // ---
        assert_eq!(
            derive_ws_url("http://localhost:3000"),
            "ws://localhost:3000/ws/wsinit"
        );
        assert_eq!(
            derive_ws_url("https://greenhouse.example.com/"),
            "wss://greenhouse.example.com/ws/wsinit"
        );
        assert_eq!(
            derive_ws_url("greenhouse.local:8080"),
            "ws://greenhouse.local:8080/ws/wsinit"
        );
    }
}
