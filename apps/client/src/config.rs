use anyhow::{Context, Result};

/// Default backend address when `API_BASE_URL` is not set.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Application configuration loaded from environment variables.
/// Everything is optional or defaulted: a completely empty environment
/// still yields a usable (demo-mode) configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    /// Identity-provider settings. `None` when the environment carries no
    /// usable Firebase configuration, which selects demo mode.
    pub identity: Option<IdentityConfig>,
    /// How many times a failed token refresh is retried before the error
    /// is surfaced to the caller. Never triggers a demo fallback.
    pub token_retries: u32,
    pub rust_log: String,
}

/// Firebase project settings. Presence of `api_key` and `project_id`
/// together is what selects real mode; the rest is informational.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub api_key: String,
    pub project_id: String,
    pub auth_domain: Option<String>,
    /// `FIREBASE_AUTH_EMULATOR_HOST`, honored the way the official SDKs do:
    /// when set, all identity traffic goes to the emulator instead of
    /// the production Google endpoints.
    pub emulator_host: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let identity = match (opt_env("FIREBASE_API_KEY"), opt_env("FIREBASE_PROJECT_ID")) {
            (Some(api_key), Some(project_id)) => Some(IdentityConfig {
                api_key,
                project_id,
                auth_domain: opt_env("FIREBASE_AUTH_DOMAIN"),
                emulator_host: opt_env("FIREBASE_AUTH_EMULATOR_HOST"),
            }),
            _ => None,
        };

        Ok(Config {
            api_base_url: opt_env("API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            identity,
            token_retries: match opt_env("AUTH_TOKEN_RETRIES") {
                Some(v) => v
                    .parse::<u32>()
                    .context("AUTH_TOKEN_RETRIES must be a non-negative integer")?,
                None => 0,
            },
            rust_log: opt_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

/// Reads an env var, treating empty strings the same as unset.
fn opt_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
