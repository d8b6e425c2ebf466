//! Store connection settings parsed from environment variables.

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5601";
pub const DEFAULT_API_ROOT: &str = "/api/kibana-comments-plugin";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Segment that marks a production page path (`/app/...`).
const PRODUCTION_SEGMENT: &str = "app";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardConfig {
    /// Scheme, host and port of the store.
    pub base_url: String,
    /// Cache-busting segment in development, empty in production.
    pub api_prefix: String,
    /// Path under which the comment endpoints live.
    pub api_root: String,
    pub timeouts: StoreTimeouts,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            api_prefix: String::new(),
            api_root: DEFAULT_API_ROOT.to_owned(),
            timeouts: StoreTimeouts {
                request_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
                connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            },
        }
    }
}

impl BoardConfig {
    /// Build typed board config from environment variables.
    ///
    /// Optional:
    /// - `COMMENTS_BASE_URL`: default `http://127.0.0.1:5601`
    /// - `COMMENTS_API_PREFIX`: default empty
    /// - `COMMENTS_API_ROOT`: default `/api/kibana-comments-plugin`
    /// - `COMMENTS_REQUEST_TIMEOUT_SECS`: default 30
    /// - `COMMENTS_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = std::env::var("COMMENTS_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned());
        let api_prefix = std::env::var("COMMENTS_API_PREFIX").unwrap_or_default();
        let api_root = std::env::var("COMMENTS_API_ROOT").unwrap_or_else(|_| DEFAULT_API_ROOT.to_owned());
        let timeouts = StoreTimeouts {
            request_secs: env_parse("COMMENTS_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse("COMMENTS_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Self { base_url, api_prefix, api_root, timeouts }.normalized()
    }

    /// Trim trailing slashes and check that the base URL parses.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse.
    pub fn normalized(mut self) -> Result<Self, ConfigError> {
        self.base_url = self.base_url.trim_end_matches('/').to_owned();
        self.api_prefix = self.api_prefix.trim_end_matches('/').to_owned();
        self.api_root = self.api_root.trim_end_matches('/').to_owned();

        reqwest::Url::parse(&self.base_url)
            .map_err(|e| ConfigError::InvalidBaseUrl { url: self.base_url.clone(), reason: e.to_string() })?;
        Ok(self)
    }
}

/// API prefix for a page served at `page_path`.
///
/// Production pages live under `/app/...` and need no prefix. Development
/// builds serve from `/<tag>/app/...`, where `<tag>` forces cache reloads,
/// and every API call has to carry that tag.
#[must_use]
pub fn api_prefix_for_path(page_path: &str) -> String {
    let first = page_path.trim_start_matches('/').split('/').next().unwrap_or_default();
    if first == PRODUCTION_SEGMENT {
        String::new()
    } else {
        format!("/{first}")
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
