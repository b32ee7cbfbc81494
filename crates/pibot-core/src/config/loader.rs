//! Config loader — reads `~/.pibot/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.pibot/config.json`
//! 3. Environment variables `PIBOT_<SECTION>__<FIELD>` (override JSON)
//! 4. `OPENAI_API_KEY` when no provider key is set by 2 or 3
//!
//! Zero turn budgets and zero timeouts are raised to 1 after merging.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::Config;

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    sanitize(apply_env_overrides(load_config_from_path(&config_path)))
}

/// Raise limits that would make every prompt fail to their minimum.
fn sanitize(mut config: Config) -> Config {
    if config.agent.max_turns == 0 {
        warn!("agent.maxTurns is 0, using 1");
        config.agent.max_turns = 1;
    }
    if config.agent.gateway_timeout_secs == 0 {
        warn!("agent.gatewayTimeoutSecs is 0, using 1");
        config.agent.gateway_timeout_secs = 1;
    }
    config
}

/// Load config from a specific file path, without env overrides.
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return Config::default();
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return Config::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to parse config {}: {}", path.display(), e);
            Config::default()
        }
    }
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Env var format: `PIBOT_<SECTION>__<FIELD>` (double underscore as delimiter).
///
/// Supported overrides:
/// - `PIBOT_AGENT__SYSTEM_MESSAGE`, `PIBOT_AGENT__MAX_TURNS`,
///   `PIBOT_AGENT__MAX_REQUESTS`, `PIBOT_AGENT__GATEWAY_TIMEOUT_SECS`,
///   `PIBOT_AGENT__STRICT_HISTORY_REPLACE`
/// - `PIBOT_PROVIDER__API_KEY`, `PIBOT_PROVIDER__API_BASE`, `PIBOT_PROVIDER__MODEL`
/// - `PIBOT_TOOLS__WEB_SEARCH__API_KEY`, `PIBOT_TOOLS__DEFAULT_TIMEZONE`
/// - `PIBOT_SERVER__HOST`, `PIBOT_SERVER__PORT`
fn apply_env_overrides(mut config: Config) -> Config {
    // Agent
    if let Ok(val) = std::env::var("PIBOT_AGENT__SYSTEM_MESSAGE") {
        config.agent.system_message = val;
    }
    if let Some(n) = env_parse::<u32>("PIBOT_AGENT__MAX_TURNS") {
        config.agent.max_turns = n;
    }
    if let Some(n) = env_parse::<u64>("PIBOT_AGENT__MAX_REQUESTS") {
        config.agent.max_requests = n;
    }
    if let Some(n) = env_parse::<u64>("PIBOT_AGENT__GATEWAY_TIMEOUT_SECS") {
        config.agent.gateway_timeout_secs = n;
    }
    if let Ok(val) = std::env::var("PIBOT_AGENT__STRICT_HISTORY_REPLACE") {
        config.agent.strict_history_replace = val == "true" || val == "1";
    }

    // Provider
    if let Ok(val) = std::env::var("PIBOT_PROVIDER__API_KEY") {
        config.provider.api_key = val;
    }
    if let Ok(val) = std::env::var("PIBOT_PROVIDER__API_BASE") {
        config.provider.api_base = val;
    }
    if let Ok(val) = std::env::var("PIBOT_PROVIDER__MODEL") {
        config.provider.model = val;
    }
    if !config.provider.is_configured() {
        if let Ok(val) = std::env::var("OPENAI_API_KEY") {
            config.provider.api_key = val;
        }
    }

    // Tools
    if let Ok(val) = std::env::var("PIBOT_TOOLS__WEB_SEARCH__API_KEY") {
        config.tools.web_search.api_key = val;
    }
    if let Ok(val) = std::env::var("PIBOT_TOOLS__DEFAULT_TIMEZONE") {
        config.tools.default_timezone = val;
    }

    // Server
    if let Ok(val) = std::env::var("PIBOT_SERVER__HOST") {
        config.server.host = val;
    }
    if let Some(p) = env_parse::<u16>("PIBOT_SERVER__PORT") {
        config.server.port = p;
    }

    config
}

/// Read and parse an env var, ignoring unset or malformed values.
fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key = key, value = %raw, "ignoring malformed env override");
            None
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
