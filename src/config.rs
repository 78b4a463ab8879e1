//! Client configuration parsed from environment variables.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_LOGIN_PATH: &str = "/login";
pub const DEFAULT_HOME_PATH: &str = "/dashboard";
pub const DEFAULT_TOKEN_FILE: &str = ".authgate/token.json";

/// Errors produced while loading [`AuthConfig`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The API base URL is empty or not an http(s) URL.
    #[error("invalid API base URL: {0:?}")]
    InvalidBaseUrl(String),

    /// A navigation path does not start with `/`.
    #[error("invalid {var}: {value:?} (expected an absolute path)")]
    InvalidPath { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Backend base URL without a trailing slash.
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// Location of the login view.
    pub login_path: String,
    /// Where a successful login lands when no guard remembered a return path.
    pub home_path: String,
    /// File the bearer token is persisted to between runs.
    pub token_file: PathBuf,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            login_path: DEFAULT_LOGIN_PATH.to_owned(),
            home_path: DEFAULT_HOME_PATH.to_owned(),
            token_file: PathBuf::from(DEFAULT_TOKEN_FILE),
        }
    }
}

impl AuthConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `AUTH_API_BASE_URL`: default `http://localhost:5000/api`
    /// - `AUTH_REQUEST_TIMEOUT_SECS`: default 10
    /// - `AUTH_CONNECT_TIMEOUT_SECS`: default 5
    /// - `AUTH_LOGIN_PATH`: default `/login`
    /// - `AUTH_HOME_PATH`: default `/dashboard`
    /// - `AUTH_TOKEN_FILE`: default `.authgate/token.json`
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not http(s) or a navigation path is
    /// not absolute. Unparseable timeouts fall back to their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_base_url =
            parse_base_url(&std::env::var("AUTH_API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.into()))?;
        let login_path = parse_path(
            "AUTH_LOGIN_PATH",
            std::env::var("AUTH_LOGIN_PATH").unwrap_or_else(|_| DEFAULT_LOGIN_PATH.into()),
        )?;
        let home_path = parse_path(
            "AUTH_HOME_PATH",
            std::env::var("AUTH_HOME_PATH").unwrap_or_else(|_| DEFAULT_HOME_PATH.into()),
        )?;
        let token_file = std::env::var("AUTH_TOKEN_FILE").map_or_else(|_| PathBuf::from(DEFAULT_TOKEN_FILE), PathBuf::from);

        Ok(Self {
            api_base_url,
            request_timeout: Duration::from_secs(env_parse("AUTH_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)),
            connect_timeout: Duration::from_secs(env_parse("AUTH_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)),
            login_path,
            home_path,
            token_file,
        })
    }

    /// Same as the default config but pointed at `api_base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if `api_base_url` is not an http(s) URL.
    pub fn with_base_url(api_base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self { api_base_url: parse_base_url(api_base_url)?, ..Self::default() })
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}

fn parse_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let scheme_ok = trimmed.starts_with("http://") || trimmed.starts_with("https://");
    if !scheme_ok || trimmed.ends_with("://") {
        return Err(ConfigError::InvalidBaseUrl(raw.to_owned()));
    }
    Ok(trimmed.to_owned())
}

fn parse_path(var: &'static str, raw: String) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    if !trimmed.starts_with('/') {
        return Err(ConfigError::InvalidPath { var, value: raw });
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
