//! Server configuration, loaded from environment variables at startup.

use std::path::PathBuf;

use arty_core::GenerationParams;

/// Runtime configuration for arty-server.
///
/// Every field has a default so the server starts without any environment
/// variables set. Empty values count as unset.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// sqlx SQLite URL (default: `"sqlite://arty.db"`).
    pub database_url: String,

    /// When set, every persisted artifact is also written here.
    pub artifacts_dir: Option<PathBuf>,

    /// Base URL of an Ollama-compatible inference server.
    pub backend_url: Option<String>,

    pub max_tokens: u32,
    pub temperature: f32,
    pub stop: Vec<String>,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit console log records as newline-delimited JSON.
    pub log_json: bool,

    /// Directory for daily-rotated log files.
    pub log_dir: Option<PathBuf>,

    /// Comma-separated CORS origins; wildcard when unset.
    pub cors_allowed_origins: Option<String>,

    /// Page size of `GET /history/messages` when no `limit` is given.
    pub history_limit: u32,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = GenerationParams::default();

        Self {
            bind_address: env_or(&get, "ARTY_BIND", "0.0.0.0:3000"),
            database_url: env_or(&get, "ARTY_DATABASE_URL", "sqlite://arty.db"),
            artifacts_dir: get("ARTY_ARTIFACTS_DIR").map(PathBuf::from),
            backend_url: get("ARTY_BACKEND_URL"),
            max_tokens: parse_env(&get, "ARTY_MAX_TOKENS", defaults.max_tokens),
            temperature: parse_env(&get, "ARTY_TEMPERATURE", defaults.temperature),
            stop: get("ARTY_STOP")
                .map(|v| v.split(',').map(str::to_owned).collect())
                .unwrap_or(defaults.stop),
            log_level: env_or(&get, "ARTY_LOG", "info"),
            log_json: get("ARTY_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            log_dir: get("ARTY_LOG_DIR").map(PathBuf::from),
            cors_allowed_origins: get("ARTY_CORS_ORIGINS"),
            history_limit: parse_env(&get, "ARTY_HISTORY_LIMIT", 100),
        }
    }

    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            stop: self.stop.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(get: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    get(key).unwrap_or_else(|| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    get(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}
