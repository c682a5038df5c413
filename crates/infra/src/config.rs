//! Service configuration sourced from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use accessgate_auth::{LocalPolicyTable, PolicyTableError};

use crate::retry::{Backoff, RetryPolicy};
use crate::transport::DEFAULT_TIMEOUT;
use crate::verifier::UnavailablePolicy;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";
const DEFAULT_AUTH_SERVICE_URL: &str = "http://authentication:3001";
const DEFAULT_RBAC_SERVICE_URL: &str = "http://rbac-service:3001";
const DEFAULT_USER_MANAGEMENT_URL: &str = "http://authentication:3001";
const DEFAULT_SESSION_RETRIES: u32 = 3;
const DEFAULT_SESSION_RETRY_DELAY_MS: u64 = 1000;
const DEFAULT_TOKEN_RETRIES: u32 = 1;
const DEFAULT_TOKEN_RETRY_DELAY_MS: u64 = 0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("failed to read roles file {path}: {source}")]
    RolesFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Policy(#[from] PolicyTableError),
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub auth_service_url: String,
    pub rbac_service_url: String,
    pub user_management_url: String,
    /// Sent as `X-Service-Secret` when set.
    pub inter_service_secret: Option<String>,
    pub upstream_timeout: Duration,
    pub on_unavailable: UnavailablePolicy,
    pub session_retry: RetryPolicy,
    pub token_retry: RetryPolicy,
    /// JSON role table replacing the built-in roles.
    pub roles_file: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3001)),
            auth_service_url: DEFAULT_AUTH_SERVICE_URL.to_string(),
            rbac_service_url: DEFAULT_RBAC_SERVICE_URL.to_string(),
            user_management_url: DEFAULT_USER_MANAGEMENT_URL.to_string(),
            inter_service_secret: None,
            upstream_timeout: DEFAULT_TIMEOUT,
            on_unavailable: UnavailablePolicy::FailClosed,
            session_retry: RetryPolicy::new(
                DEFAULT_SESSION_RETRIES,
                Duration::from_millis(DEFAULT_SESSION_RETRY_DELAY_MS),
            ),
            token_retry: RetryPolicy::new(
                DEFAULT_TOKEN_RETRIES,
                Duration::from_millis(DEFAULT_TOKEN_RETRY_DELAY_MS),
            ),
            roles_file: None,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| invalid("BIND_ADDR", e))?;

        let url = |key: &'static str, default: &str| -> Result<String, ConfigError> {
            let value = get(key).unwrap_or_else(|| default.to_string());
            if !(value.starts_with("http://") || value.starts_with("https://")) {
                return Err(invalid(key, "expected an http(s) URL"));
            }
            Ok(value.trim_end_matches('/').to_string())
        };

        let upstream_timeout = match get("UPSTREAM_TIMEOUT_MS") {
            Some(v) => Duration::from_millis(parse_positive("UPSTREAM_TIMEOUT_MS", &v)?),
            None => DEFAULT_TIMEOUT,
        };

        let on_unavailable = match get("ON_UNAVAILABLE") {
            Some(v) => v.parse().map_err(|e| invalid("ON_UNAVAILABLE", e))?,
            None => {
                tracing::warn!("ON_UNAVAILABLE not set; defaulting to fail-closed");
                UnavailablePolicy::FailClosed
            }
        };

        let session_retries = match get("SESSION_VALIDATION_RETRIES") {
            Some(v) => parse_attempts("SESSION_VALIDATION_RETRIES", &v)?,
            None => DEFAULT_SESSION_RETRIES,
        };
        let session_delay = match get("SESSION_VALIDATION_RETRY_DELAY") {
            Some(v) => parse_millis("SESSION_VALIDATION_RETRY_DELAY", &v)?,
            None => DEFAULT_SESSION_RETRY_DELAY_MS,
        };
        let session_backoff = match get("SESSION_VALIDATION_BACKOFF") {
            Some(v) => v
                .parse::<Backoff>()
                .map_err(|e| invalid("SESSION_VALIDATION_BACKOFF", e))?,
            None => Backoff::Fixed,
        };
        let token_retries = match get("TOKEN_VALIDATION_RETRIES") {
            Some(v) => parse_attempts("TOKEN_VALIDATION_RETRIES", &v)?,
            None => DEFAULT_TOKEN_RETRIES,
        };
        let token_delay = match get("TOKEN_VALIDATION_RETRY_DELAY") {
            Some(v) => parse_millis("TOKEN_VALIDATION_RETRY_DELAY", &v)?,
            None => DEFAULT_TOKEN_RETRY_DELAY_MS,
        };

        Ok(Self {
            bind_addr,
            auth_service_url: url("AUTH_SERVICE_URL", DEFAULT_AUTH_SERVICE_URL)?,
            rbac_service_url: url("RBAC_SERVICE_URL", DEFAULT_RBAC_SERVICE_URL)?,
            user_management_url: url("USER_MANAGEMENT_URL", DEFAULT_USER_MANAGEMENT_URL)?,
            inter_service_secret: get("INTER_SERVICE_SECRET"),
            upstream_timeout,
            on_unavailable,
            session_retry: RetryPolicy::new(session_retries, Duration::from_millis(session_delay))
                .with_backoff(session_backoff),
            token_retry: RetryPolicy::new(token_retries, Duration::from_millis(token_delay)),
            roles_file: get("ROLES_FILE").map(PathBuf::from),
        })
    }

    /// The configured role table, or the built-in roles when no file is set.
    pub fn load_policy_table(&self) -> Result<LocalPolicyTable, ConfigError> {
        let Some(path) = &self.roles_file else {
            return Ok(LocalPolicyTable::with_default_roles());
        };
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::RolesFile {
            path: path.clone(),
            source,
        })?;
        let table = LocalPolicyTable::from_json_str(&json)?;
        tracing::info!(path = %path.display(), roles = table.roles().count(), "loaded role table");
        Ok(table)
    }
}

fn invalid(key: &'static str, error: impl core::fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        key,
        message: error.to_string(),
    }
}

fn parse_positive(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    match value.parse::<u64>() {
        Ok(0) => Err(invalid(key, "must be greater than zero")),
        Ok(n) => Ok(n),
        Err(e) => Err(invalid(key, e)),
    }
}

fn parse_millis(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|e| invalid(key, e))
}

fn parse_attempts(key: &'static str, value: &str) -> Result<u32, ConfigError> {
    u32::try_from(parse_positive(key, value)?).map_err(|e| invalid(key, e))
}
