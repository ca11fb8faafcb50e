//! Session Configuration (spec.md §3 "Session Configuration"). Builder +
//! `resolve_*` pattern grounded in the teacher's `ShadowDeepResearchConfig`
//! (`core/config.rs`): a field set with per-field env-var fallbacks for the
//! operational knobs (lockout/heartbeat timing), while the behavioral
//! collaborators (login/logout callbacks) are pure builder fields with no
//! ambient default.

use super::login::{LoginCallback, LogoutCallback};
use crate::cookie::Cookie;
use crate::support::Logger;
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

pub const ENV_LOCKOUT_TIME_MS: &str = "SHADOW_SESSION_LOCKOUT_MS";
pub const ENV_HEARTBEAT_INTERVAL_MS: &str = "SHADOW_SESSION_HEARTBEAT_INTERVAL_MS";

const DEFAULT_LOCKOUT_TIME_MS: i64 = 24 * 60 * 60 * 1000;
const DEFAULT_HEARTBEAT_INTERVAL_MS: i64 = 60_000;

/// Configuration for one [`super::HttpSession`] (spec.md §3 "Session
/// Configuration").
#[derive(Clone, Default)]
pub struct SessionConfig {
    pub name: String,
    pub login: Option<Arc<dyn LoginCallback>>,
    pub logout: Option<Arc<dyn LogoutCallback>>,
    /// Opaque caller state, shallow-merged by `setState` (spec.md §9: state
    /// is caller-opaque; represented here as a JSON object so `setState`'s
    /// shallow merge is a plain key-insert rather than needing a generic
    /// merge trait threaded through the whole module tree).
    pub initial_state: serde_json::Map<String, serde_json::Value>,
    pub default_headers: HashMap<String, Vec<String>>,
    pub seed_cookies: Vec<Cookie>,
    pub always_renew: bool,
    pub lockout_time_ms: Option<i64>,
    pub heartbeat_url: Option<Url>,
    pub heartbeat_interval_ms: Option<i64>,
    pub allow_multiple_requests: bool,
    /// Shared connection pool; built fresh if absent (spec.md §5 "Shared
    /// resources").
    pub client: Option<reqwest::Client>,
    pub logger: Option<Arc<dyn Logger>>,
    /// Supplementary fields merged onto the login method object (spec.md
    /// §4.3 "Login method object" — rendered here as an opaque JSON value
    /// rather than trait-object mixin composition, which isn't idiomatic
    /// Rust; read back via `LoginMethods::extensions`).
    pub enhance_login_methods: Option<Arc<dyn Fn(uuid::Uuid) -> serde_json::Value + Send + Sync>>,
    pub enhance_logout_methods: Option<Arc<dyn Fn(uuid::Uuid) -> serde_json::Value + Send + Sync>>,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_login(mut self, login: Arc<dyn LoginCallback>) -> Self {
        self.login = Some(login);
        self
    }

    pub fn with_logout(mut self, logout: Arc<dyn LogoutCallback>) -> Self {
        self.logout = Some(logout);
        self
    }

    pub fn with_always_renew(mut self, always_renew: bool) -> Self {
        self.always_renew = always_renew;
        self
    }

    pub fn with_allow_multiple_requests(mut self, allow: bool) -> Self {
        self.allow_multiple_requests = allow;
        self
    }

    pub fn with_lockout_time_ms(mut self, ms: i64) -> Self {
        self.lockout_time_ms = Some(ms);
        self
    }

    pub fn with_heartbeat_url(mut self, url: Url) -> Self {
        self.heartbeat_url = Some(url);
        self
    }

    pub fn with_heartbeat_interval_ms(mut self, ms: i64) -> Self {
        self.heartbeat_interval_ms = Some(ms);
        self
    }

    pub fn with_default_headers(mut self, headers: HashMap<String, Vec<String>>) -> Self {
        self.default_headers = headers;
        self
    }

    pub fn with_seed_cookies(mut self, cookies: Vec<Cookie>) -> Self {
        self.seed_cookies = cookies;
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Lockout cooldown: builder field → `SHADOW_SESSION_LOCKOUT_MS` → 24h.
    pub fn resolve_lockout_time_ms(&self) -> i64 {
        if let Some(ms) = self.lockout_time_ms {
            return ms;
        }
        std::env::var(ENV_LOCKOUT_TIME_MS)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_LOCKOUT_TIME_MS)
    }

    /// Heartbeat period: builder field → `SHADOW_SESSION_HEARTBEAT_INTERVAL_MS` → 60s.
    pub fn resolve_heartbeat_interval_ms(&self) -> i64 {
        if let Some(ms) = self.heartbeat_interval_ms {
            return ms;
        }
        std::env::var(ENV_HEARTBEAT_INTERVAL_MS)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_HEARTBEAT_INTERVAL_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_lockout_defaults_to_24_hours() {
        let config = SessionConfig::new();
        assert_eq!(config.resolve_lockout_time_ms(), 24 * 60 * 60 * 1000);
    }

    #[test]
    fn builder_field_overrides_default() {
        let config = SessionConfig::new().with_lockout_time_ms(100);
        assert_eq!(config.resolve_lockout_time_ms(), 100);
    }

    #[test]
    fn resolve_heartbeat_interval_defaults_to_60s() {
        let config = SessionConfig::new();
        assert_eq!(config.resolve_heartbeat_interval_ms(), 60_000);
    }
}
