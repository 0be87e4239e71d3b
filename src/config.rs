//! Upstream connection settings, read from the environment.
//!
//! | Variable                   | Default                            |
//! |----------------------------|------------------------------------|
//! | `SRT_API_KEY`              | unset (requests fail with 500)     |
//! | `SRT_API_ENDPOINT`         | `https://apis.data.go.kr/B553912`  |
//! | `SRT_PAGE_SIZE`            | `1000`                             |
//! | `SRT_MAX_PAGES`            | `50`                               |
//! | `SRT_PAGE_DELAY_MS`        | `100`                              |
//! | `SRT_REQUEST_TIMEOUT_SECS` | `30`                               |

use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, SalesError};

pub const DEFAULT_BASE_URL: &str = "https://apis.data.go.kr/B553912";
pub const DEFAULT_PAGE_SIZE: u32 = 1000;
pub const DEFAULT_MAX_PAGES: u32 = 50;
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(100);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct SrtConfig {
    /// Data-portal service key. `None` is allowed at startup so the server can
    /// still answer with a configuration error per request.
    pub api_key: Option<String>,
    pub base_url: String,
    pub page_size: u32,
    /// Hard ceiling on pages fetched for one request.
    pub max_pages: u32,
    /// Pause between consecutive page requests.
    pub page_delay: Duration,
    /// Bound on each single page request, body included.
    pub request_timeout: Duration,
}

impl Default for SrtConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            page_delay: DEFAULT_PAGE_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl SrtConfig {
    /// Reads the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_key = lookup("SRT_API_KEY").filter(|k| !k.trim().is_empty());
        let base_url = lookup("SRT_API_ENDPOINT")
            .filter(|u| !u.trim().is_empty())
            .unwrap_or(defaults.base_url);

        let page_size = parse_var(&lookup, "SRT_PAGE_SIZE")?.unwrap_or(defaults.page_size);
        let max_pages = parse_var(&lookup, "SRT_MAX_PAGES")?.unwrap_or(defaults.max_pages);
        let page_delay = parse_var(&lookup, "SRT_PAGE_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.page_delay);
        let request_timeout = parse_var(&lookup, "SRT_REQUEST_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        if page_size == 0 {
            return Err(SalesError::Configuration(
                "SRT_PAGE_SIZE must be greater than zero".to_string(),
            ));
        }
        if max_pages == 0 {
            return Err(SalesError::Configuration(
                "SRT_MAX_PAGES must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            api_key,
            base_url,
            page_size,
            max_pages,
            page_delay,
            request_timeout,
        })
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

fn parse_var<F, T>(lookup: &F, name: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            SalesError::Configuration(format!("{name} has an invalid value '{raw}'"))
        }),
    }
}
