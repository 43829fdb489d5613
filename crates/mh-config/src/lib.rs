//! Runtime configuration, resolved from the environment once at startup.
//!
//! # Contract
//! - Callers invoke [`Config::from_env`] exactly once (after loading any
//!   dotenv file) and pass the result into constructors; never scatter
//!   `std::env::var` calls across the codebase.
//! - `Debug` redacts secret values.
//! - Error messages reference the env var NAME, never the value.

use std::time::Duration;

use anyhow::{bail, Context, Result};

const ENV_API_ADDR: &str = "MH_API_ADDR";
const ENV_DATABASE_URL: &str = "MH_DATABASE_URL";
const ENV_IDENTITY_BASE_URL: &str = "MH_IDENTITY_BASE_URL";
const ENV_IDENTITY_API_KEY: &str = "MH_IDENTITY_API_KEY";
const ENV_MAPBOX_TOKEN: &str = "MH_MAPBOX_ACCESS_TOKEN";
const ENV_OUTBOUND_TIMEOUT_SECS: &str = "MH_OUTBOUND_TIMEOUT_SECS";

const DEFAULT_API_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_OUTBOUND_TIMEOUT_SECS: u64 = 20;

/// Everything the API process needs from its environment.
///
/// **Secret values are redacted in `Debug` output.**
#[derive(Clone)]
pub struct Config {
    /// Socket address the HTTP server binds.
    pub api_addr: String,
    /// Postgres connection string for the hosted database.
    pub database_url: String,
    /// Base URL of the identity provider (token verification endpoint).
    pub identity_base_url: String,
    /// Service key sent alongside bearer tokens to the identity provider.
    pub identity_api_key: String,
    /// Directions-matrix access token.
    pub mapbox_access_token: String,
    /// Timeout applied to every outbound HTTP call.
    pub outbound_timeout: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // database_url carries credentials; tokens are tokens.
        f.debug_struct("Config")
            .field("api_addr", &self.api_addr)
            .field("database_url", &"<REDACTED>")
            .field("identity_base_url", &self.identity_base_url)
            .field("identity_api_key", &"<REDACTED>")
            .field("mapbox_access_token", &"<REDACTED>")
            .field("outbound_timeout", &self.outbound_timeout)
            .finish()
    }
}

impl Config {
    /// Resolve the full configuration from the process environment.
    ///
    /// Returns `Err` naming the first missing required variable. Values are
    /// never mentioned in error messages.
    pub fn from_env() -> Result<Self> {
        let api_addr =
            optional(ENV_API_ADDR).unwrap_or_else(|| DEFAULT_API_ADDR.to_string());
        let database_url = required(ENV_DATABASE_URL)?;
        let identity_base_url = required(ENV_IDENTITY_BASE_URL)?;
        let identity_api_key = required(ENV_IDENTITY_API_KEY)?;
        let mapbox_access_token = required(ENV_MAPBOX_TOKEN)?;

        let outbound_timeout = match optional(ENV_OUTBOUND_TIMEOUT_SECS) {
            Some(raw) => Duration::from_secs(
                raw.parse::<u64>()
                    .with_context(|| format!("{ENV_OUTBOUND_TIMEOUT_SECS} must be an integer"))?,
            ),
            None => Duration::from_secs(DEFAULT_OUTBOUND_TIMEOUT_SECS),
        };

        Ok(Self {
            api_addr,
            database_url,
            identity_base_url,
            identity_api_key,
            mapbox_access_token,
            outbound_timeout,
        })
    }
}

/// `None` if the variable is unset or blank after trimming.
fn optional(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

fn required(var_name: &str) -> Result<String> {
    match optional(var_name) {
        Some(v) => Ok(v),
        None => bail!("required env var '{}' is not set or empty", var_name),
    }
}
