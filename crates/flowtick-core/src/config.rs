use std::fmt::{Debug, Formatter};
use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://api.blackboxstocks.com/api/v2";
pub const DEFAULT_ORIGIN: &str = "https://members.blackboxstocks.com";
pub const DEFAULT_REFERER: &str = "https://members.blackboxstocks.com/";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36";

/// Upstream endpoints, login identity, and transport timings.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub device: String,
    pub origin: String,
    pub referer: String,
    pub user_agent: String,
    pub request_timeout_ms: u64,
    pub auth_backoff_ms: u64,
}

impl UpstreamConfig {
    pub fn login_url(&self) -> String {
        format!("{}/account/login", self.base_url.trim_end_matches('/'))
    }

    pub fn flow_url(&self) -> String {
        format!("{}/options/getFlowMobile", self.base_url.trim_end_matches('/'))
    }

    pub fn auth_backoff(&self) -> Duration {
        Duration::from_millis(self.auth_backoff_ms)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: String::from(DEFAULT_BASE_URL),
            username: String::new(),
            password: String::new(),
            device: String::from("web"),
            origin: String::from(DEFAULT_ORIGIN),
            referer: String::from(DEFAULT_REFERER),
            user_agent: String::from(DEFAULT_USER_AGENT),
            request_timeout_ms: 30_000,
            auth_backoff_ms: 10_000,
        }
    }
}

impl Debug for UpstreamConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("device", &self.device)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("auth_backoff_ms", &self.auth_backoff_ms)
            .finish_non_exhaustive()
    }
}

/// What to do with a record whose expiration does not parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpirationPolicy {
    /// Store the record with no expiration.
    #[default]
    Tolerate,
    /// Reject the record like a bad creation date.
    Drop,
}

/// Poll loop settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    pub interval_ms: u64,
    pub expiration_policy: ExpirationPolicy,
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 10_000,
            expiration_policy: ExpirationPolicy::Tolerate,
        }
    }
}
