use std::env;
use std::fmt;

use crate::timeout::Timeouts;

pub const DEFAULT_MCP_URL: &str = "https://api.vapagent.com/mcp";
pub const DEFAULT_API_BASE_URL: &str = "https://api.vapagent.com";
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Primary and legacy names for each setting. The primary name wins.
const API_KEY: (&str, &str) = ("VAP_API_KEY", "VAPE_API_KEY");
const MCP_URL: (&str, &str) = ("VAP_API_URL", "VAPE_API_URL");
const API_BASE_URL: (&str, &str) = ("VAP_API_BASE_URL", "VAPE_API_BASE_URL");
const DEBUG: (&str, &str) = ("VAP_DEBUG", "VAPE_DEBUG");
const MAX_RETRIES: (&str, &str) = ("VAP_MAX_RETRIES", "VAPE_MAX_RETRIES");

// ── Top-level config ──────────────────────────────────────────

/// Process-wide settings, read once at startup.
#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    /// Base URL of the MCP HTTP endpoints (`/initialize`, `/tools/call`, ...).
    pub mcp_url: String,
    /// Base URL of the REST API (`/v3/...`).
    pub api_base_url: String,
    pub debug: bool,
    pub max_retries: u32,
    pub timeouts: Timeouts,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |(primary, legacy): (&str, &str)| {
            non_empty(lookup(primary)).or_else(|| non_empty(lookup(legacy)))
        };

        Self {
            api_key: read(API_KEY).unwrap_or_default(),
            mcp_url: trim_base(read(MCP_URL).as_deref().unwrap_or(DEFAULT_MCP_URL)),
            api_base_url: trim_base(
                read(API_BASE_URL)
                    .as_deref()
                    .unwrap_or(DEFAULT_API_BASE_URL),
            ),
            debug: read(DEBUG).is_some(),
            max_retries: read(MAX_RETRIES)
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_RETRIES),
            timeouts: Timeouts::default(),
        }
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  mcp url:      {}", self.mcp_url);
        tracing::info!("  api base url: {}", self.api_base_url);
        tracing::info!(
            "  api key:      {}",
            if self.has_api_key() { "configured" } else { "NOT SET" }
        );
        tracing::info!("  max retries:  {}", self.max_retries);
        if !self.has_api_key() {
            tracing::warn!(
                "{} not set! Set it via environment variable ({} also supported)",
                API_KEY.0,
                API_KEY.1
            );
        }
    }

    /// Return a redacted view safe for diagnostics (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "mcp_url": self.mcp_url,
            "api_base_url": self.api_base_url,
            "api_key_configured": self.has_api_key(),
            "debug": self.debug,
            "max_retries": self.max_retries,
            "timeouts_secs": {
                "read": self.timeouts.read.as_secs(),
                "standard": self.timeouts.standard.as_secs(),
                "create": self.timeouts.create.as_secs(),
            },
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &if self.has_api_key() { "<redacted>" } else { "" })
            .field("mcp_url", &self.mcp_url)
            .field("api_base_url", &self.api_base_url)
            .field("debug", &self.debug)
            .field("max_retries", &self.max_retries)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn trim_base(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
