//! Login/logout callbacks and the method object passed to them (spec.md
//! §4.3 "Login method object"). Modeled as `async_trait` collaborators,
//! matching [`crate::transport::Transport`], rather than the two-phase
//! promise style of the original.

use super::HttpSession;
use crate::cookie::{Cookie, CookieFilter};
use crate::error::Result;
use crate::http::{RequestDescriptor, Response};
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

#[async_trait]
pub trait LoginCallback: Send + Sync {
    async fn login(&self, methods: LoginMethods) -> Result<()>;
}

#[async_trait]
pub trait LogoutCallback: Send + Sync {
    async fn logout(&self, methods: LogoutMethods) -> Result<()>;
}

/// Wraps an `async` closure as a [`LoginCallback`], so callers can pass
/// `FnLogin(|methods| async move { ... })` instead of implementing the
/// trait by hand.
pub struct FnLogin<F>(pub F);

#[async_trait]
impl<F, Fut> LoginCallback for FnLogin<F>
where
    F: Fn(LoginMethods) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn login(&self, methods: LoginMethods) -> Result<()> {
        (self.0)(methods).await
    }
}

pub struct FnLogout<F>(pub F);

#[async_trait]
impl<F, Fut> LogoutCallback for FnLogout<F>
where
    F: Fn(LogoutMethods) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn logout(&self, methods: LogoutMethods) -> Result<()> {
        (self.0)(methods).await
    }
}

/// The object passed to the configured login callback (spec.md §4.3 "Login
/// method object"). `ref_token` threads through `beforeRequest`,
/// `enhanceLoginMethods`, and `onRelease` for the one lease that triggered
/// this login.
pub struct LoginMethods {
    pub(super) session: Arc<HttpSession>,
    pub(super) ref_token: Uuid,
    pub(super) extensions: serde_json::Value,
}

impl LoginMethods {
    pub fn ref_token(&self) -> Uuid {
        self.ref_token
    }

    /// Supplementary fields from `enhanceLoginMethods`, if configured.
    pub fn extensions(&self) -> &serde_json::Value {
        &self.extensions
    }

    pub fn get_credentials(&self) -> serde_json::Value {
        self.session.get_credentials()
    }

    pub fn set_state(&self, partial: serde_json::Map<String, serde_json::Value>) {
        self.session.merge_state(partial);
    }

    /// Available during login only — preserved asymmetry (spec.md §9 open
    /// questions).
    pub fn set_heartbeat_url(&self, url: Option<Url>) {
        self.session.set_heartbeat_url(url);
    }

    /// The session's internal request, bypassing the gate.
    pub async fn request(&self, descriptor: RequestDescriptor) -> Result<Response> {
        self.session.raw_request(descriptor).await
    }

    pub fn set_default_headers(&self, headers: HashMap<String, Vec<String>>) {
        self.session.set_default_headers(headers);
    }

    pub fn add_cookies(&self, cookies: Vec<Cookie>) {
        self.session.cookie_jar().add_cookies(cookies);
    }

    pub fn remove_cookies(&self, filter: CookieFilter) {
        self.session.cookie_jar().remove_cookies(filter);
    }
}

/// The object passed to the configured logout callback — the same surface
/// as [`LoginMethods`] minus `setHeartbeatUrl` (spec.md §4.3: "The logout
/// callback receives an analogous object").
pub struct LogoutMethods {
    pub(super) session: Arc<HttpSession>,
    pub(super) ref_token: Uuid,
    pub(super) extensions: serde_json::Value,
}

impl LogoutMethods {
    pub fn ref_token(&self) -> Uuid {
        self.ref_token
    }

    pub fn extensions(&self) -> &serde_json::Value {
        &self.extensions
    }

    pub fn get_credentials(&self) -> serde_json::Value {
        self.session.get_credentials()
    }

    pub fn set_state(&self, partial: serde_json::Map<String, serde_json::Value>) {
        self.session.merge_state(partial);
    }

    pub async fn request(&self, descriptor: RequestDescriptor) -> Result<Response> {
        self.session.raw_request(descriptor).await
    }

    pub fn set_default_headers(&self, headers: HashMap<String, Vec<String>>) {
        self.session.set_default_headers(headers);
    }

    pub fn add_cookies(&self, cookies: Vec<Cookie>) {
        self.session.cookie_jar().add_cookies(cookies);
    }

    pub fn remove_cookies(&self, filter: CookieFilter) {
        self.session.cookie_jar().remove_cookies(filter);
    }
}
