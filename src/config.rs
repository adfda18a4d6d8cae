//! Client configuration parsed from environment variables.

use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_API_PREFIX: &str = "api/";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_TOKEN_FILE: &str = ".cms/tokens.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for ClientTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server origin without trailing slash, e.g. `http://127.0.0.1:8000`.
    pub base_url: String,
    /// Path prefix for API calls, normalized to end with `/`.
    pub api_prefix: String,
    /// Where native front ends persist the token pair.
    pub token_file: PathBuf,
    pub timeouts: ClientTimeouts,
}

impl ClientConfig {
    /// Build config for `base_url` with every other value defaulted.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] if `base_url` is not http(s).
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            api_prefix: normalize_prefix(DEFAULT_API_PREFIX),
            token_file: default_token_file(None),
            timeouts: ClientTimeouts::default(),
        })
    }

    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `CMS_BASE_URL`: default `http://127.0.0.1:8000`
    /// - `CMS_API_PREFIX`: default `api/`
    /// - `CMS_TOKEN_FILE`: default `$HOME/.cms/tokens.json`
    /// - `CMS_REQUEST_TIMEOUT_SECS`: default 30
    /// - `CMS_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a variable is present but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] with an injectable variable source.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a variable is present but malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = normalize_base_url(lookup("CMS_BASE_URL").as_deref().unwrap_or(DEFAULT_BASE_URL))?;
        let api_prefix = normalize_prefix(lookup("CMS_API_PREFIX").as_deref().unwrap_or(DEFAULT_API_PREFIX));
        let token_file = lookup("CMS_TOKEN_FILE").map_or_else(|| default_token_file(lookup("HOME")), PathBuf::from);
        let timeouts = ClientTimeouts {
            request_secs: parse_secs(&lookup, "CMS_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
            connect_secs: parse_secs(&lookup, "CMS_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?,
        };
        Ok(Self { base_url, api_prefix, token_file, timeouts })
    }

    /// Absolute URL for an API path such as `posts/featured/`.
    #[must_use]
    pub fn api_url(&self, path: &str) -> String {
        format!("{}/{}{}", self.base_url, self.api_prefix, path.trim_start_matches('/'))
    }

    /// Resolve a server-relative media path (featured image, avatar) to a
    /// full URL. Absolute URLs are returned unchanged.
    #[must_use]
    pub fn media_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_owned();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidBaseUrl(raw.to_owned()));
    }
    Ok(trimmed.to_owned())
}

fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() { String::new() } else { format!("{trimmed}/") }
}

fn default_token_file(home: Option<String>) -> PathBuf {
    match home {
        Some(home) => PathBuf::from(home).join(DEFAULT_TOKEN_FILE),
        None => PathBuf::from(DEFAULT_TOKEN_FILE),
    }
}

fn parse_secs(lookup: &impl Fn(&str) -> Option<String>, var: &'static str, default: u64) -> Result<u64, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
