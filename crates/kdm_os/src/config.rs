#![forbid(unsafe_code)]

use std::env;

use kdm_engines::manageable::MANAGEABLE_SETTLE_MS_DEFAULT;

pub const API_URL_DEFAULT: &str = "http://127.0.0.1:8013/";
pub const WEBAPP_URL_DEFAULT: &str = "http://127.0.0.1:8012/";
pub const CONNECT_TIMEOUT_MS_DEFAULT: u64 = 3_000;
pub const REQUEST_TIMEOUT_MS_DEFAULT: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base of the JSON API (`settlement/...`, `new_settlement`, `{collection}/{action}/{id}`).
    pub api_url: String,
    /// Base of the legacy webapp whose root accepts `modify=` form posts.
    pub webapp_url: String,
    pub bearer_token: Option<String>,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub manageable_settle_ms: u64,
}

impl ClientConfig {
    pub fn mvp_v1() -> Self {
        Self {
            api_url: API_URL_DEFAULT.to_string(),
            webapp_url: WEBAPP_URL_DEFAULT.to_string(),
            bearer_token: None,
            connect_timeout_ms: CONNECT_TIMEOUT_MS_DEFAULT,
            request_timeout_ms: REQUEST_TIMEOUT_MS_DEFAULT,
            manageable_settle_ms: MANAGEABLE_SETTLE_MS_DEFAULT,
        }
    }

    pub fn from_env() -> Self {
        let defaults = Self::mvp_v1();
        Self {
            api_url: non_empty_var("KDM_API_URL")
                .map(|v| normalize_base_url(&v))
                .unwrap_or(defaults.api_url),
            webapp_url: non_empty_var("KDM_WEBAPP_URL")
                .map(|v| normalize_base_url(&v))
                .unwrap_or(defaults.webapp_url),
            bearer_token: non_empty_var("KDM_API_BEARER"),
            connect_timeout_ms: bounded_var("KDM_CONNECT_TIMEOUT_MS", 100, 60_000)
                .unwrap_or(defaults.connect_timeout_ms),
            request_timeout_ms: bounded_var("KDM_REQUEST_TIMEOUT_MS", 100, 120_000)
                .unwrap_or(defaults.request_timeout_ms),
            manageable_settle_ms: bounded_var("KDM_MANAGEABLE_SETTLE_MS", 0, 60_000)
                .unwrap_or(defaults.manageable_settle_ms),
        }
    }
}

/// Bases are joined with relative paths, so they must end in `/`.
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|v| {
        let s = v.trim().to_string();
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    })
}

fn bounded_var(key: &str, min: u64, max: u64) -> Option<u64> {
    parse_bounded(env::var(key).ok().as_deref(), min, max)
}

fn parse_bounded(raw: Option<&str>, min: u64, max: u64) -> Option<u64> {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| (min..=max).contains(v))
}
