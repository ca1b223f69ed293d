//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast if required vars are missing.
//! Sensitive values wrapped in secrecy::SecretString to prevent log leaks.

pub mod secrets;

use secrecy::SecretString;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::UserId;

/// Default Gemini model for the similarity oracle.
pub const DEFAULT_ORACLE_MODEL: &str = "gemini-2.5-flash-lite";

#[derive(Debug)]
pub struct Config {
    pub database_url: SecretString,
    pub gemini_api_key: SecretString,
    /// The authenticated owner all operations run as. Auth itself is an
    /// external concern; this is the opaque current-user accessor.
    pub user_id: UserId,
    pub oracle_model: String,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    /// In production, systemd EnvironmentFile provides the vars.
    pub fn from_env() -> Result<Self> {
        let user_raw = required_var("SENSEI_USER_ID")?;
        let user_id = Uuid::parse_str(&user_raw)
            .map_err(|e| Error::Config(format!("SENSEI_USER_ID is not a valid UUID: {e}")))?;

        Ok(Self {
            database_url: SecretString::from(required_var("DATABASE_URL")?),
            gemini_api_key: SecretString::from(required_var("GEMINI_API_KEY")?),
            user_id: UserId(user_id),
            oracle_model: std::env::var("ORACLE_MODEL")
                .unwrap_or_else(|_| DEFAULT_ORACLE_MODEL.to_string()),
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| Error::Config(format!("required environment variable {name} is not set")))
}
