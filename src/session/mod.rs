//! HTTP Session (spec.md §3 "Session Status"/"Session Configuration"/
//! "Queued Request"/"Session Handle", §4.3, §5, §6) — the session state
//! machine and request gate. Ties together the `config`, `handle`,
//! `heartbeat`, `login`, `queue`, and `state` submodules around one
//! `HttpSession` that owns credentials, cookie jar, connection pool, the
//! login/logout lifecycle, a FIFO request queue, and the lockout clock.

mod config;
mod handle;
mod heartbeat;
mod login;
mod queue;
mod state;

pub use config::SessionConfig;
pub use handle::{SerializedSession, SessionHandle};
pub use login::{FnLogin, FnLogout, LoginCallback, LoginMethods, LogoutCallback, LogoutMethods};
pub use queue::RequestSessionOptions;
pub use state::{SessionState, SessionStatus, StatusListener};

use crate::cookie::CookieJar;
use crate::error::{Error, Result};
use crate::http::{self, RequestDescriptor, Response};
use crate::support::{Logger, NoopLogger};
use crate::transport::{default_client, ReqwestTransport};
use queue::QueuedRequest;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use url::Url;
use uuid::Uuid;

use futures::future::{BoxFuture, FutureExt, Shared};

struct Inner {
    state: SessionState,
    name: String,
    uptime_since: Option<i64>,
    last_error: Option<i64>,
    error: Option<String>,
    in_queue: usize,
    is_logged_in: bool,
    app_state: serde_json::Map<String, serde_json::Value>,
    default_headers: HashMap<String, Vec<String>>,
}

type SharedOutcome = Shared<BoxFuture<'static, Result<()>>>;

/// The session state machine and request gate (spec.md §4.3). Always lives
/// behind an `Arc` — callers obtain one via [`HttpSession::new`] and lease
/// [`SessionHandle`]s from it via [`HttpSession::request_session`].
pub struct HttpSession {
    config: SessionConfig,
    client: reqwest::Client,
    logger: Arc<dyn Logger>,
    cookie_jar: Arc<CookieJar>,
    credentials: Mutex<serde_json::Value>,
    heartbeat_url: Mutex<Option<Url>>,
    heartbeat_task: Mutex<Option<JoinHandle<()>>>,
    login_inflight: Mutex<Option<SharedOutcome>>,
    logout_inflight: Mutex<Option<SharedOutcome>>,
    queue: Mutex<VecDeque<QueuedRequest>>,
    active_handles: AtomicUsize,
    status_listeners: Mutex<Vec<(u64, StatusListener)>>,
    next_listener_id: AtomicU64,
    shutdown_notify: Arc<Notify>,
    inner: Mutex<Inner>,
}

impl HttpSession {
    /// Construct a new session. Initial state is `Logged Out` if a login
    /// callback was configured, else `Ready` (spec.md §4.3 "Lifecycle
    /// states and transitions").
    pub fn new(config: SessionConfig) -> Arc<Self> {
        let client = config.client.clone().unwrap_or_else(default_client);
        let logger: Arc<dyn Logger> = config.logger.clone().unwrap_or_else(|| Arc::new(NoopLogger));
        let cookie_jar = Arc::new(CookieJar::from_cookies(config.seed_cookies.clone()));
        let is_logged_in = config.login.is_none();
        let initial_state = if is_logged_in { SessionState::Ready } else { SessionState::LoggedOut };
        let name = config.name.clone();
        let default_headers = config.default_headers.clone();
        let app_state = config.initial_state.clone();
        let heartbeat_url = config.heartbeat_url.clone();

        Arc::new(Self {
            config,
            client,
            logger,
            cookie_jar,
            credentials: Mutex::new(serde_json::Value::Null),
            heartbeat_url: Mutex::new(heartbeat_url),
            heartbeat_task: Mutex::new(None),
            login_inflight: Mutex::new(None),
            logout_inflight: Mutex::new(None),
            queue: Mutex::new(VecDeque::new()),
            active_handles: AtomicUsize::new(0),
            status_listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(0),
            shutdown_notify: Arc::new(Notify::new()),
            inner: Mutex::new(Inner {
                state: initial_state,
                name,
                uptime_since: is_logged_in.then(|| chrono::Utc::now().timestamp_millis()),
                last_error: None,
                error: None,
                in_queue: 0,
                is_logged_in,
                app_state,
                default_headers,
            }),
        })
    }

    // ---- plain accessors (visible to submodules as private-to-ancestor) ----

    fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn cookie_jar(&self) -> &CookieJar {
        &self.cookie_jar
    }

    fn current_state(&self) -> SessionState {
        self.inner.lock().unwrap().state
    }

    fn is_logged_in(&self) -> bool {
        self.inner.lock().unwrap().is_logged_in
    }

    fn get_credentials(&self) -> serde_json::Value {
        self.credentials.lock().unwrap().clone()
    }

    fn get_state(&self) -> serde_json::Map<String, serde_json::Value> {
        self.inner.lock().unwrap().app_state.clone()
    }

    /// Shallow-merge `partial` into the caller-opaque state (spec.md §4.3
    /// "Login method object" — `setState(partial)`).
    fn merge_state(&self, partial: serde_json::Map<String, serde_json::Value>) {
        let mut inner = self.inner.lock().unwrap();
        for (k, v) in partial {
            inner.app_state.insert(k, v);
        }
    }

    fn set_default_headers_inner(&self, headers: HashMap<String, Vec<String>>) {
        self.inner.lock().unwrap().default_headers = headers;
    }

    fn heartbeat_url(&self) -> Option<Url> {
        self.heartbeat_url.lock().unwrap().clone()
    }

    /// Available during login only — preserved asymmetry (spec.md §9 open
    /// questions: some source variants expose `setHeartbeatUrl` during
    /// login but not logout).
    fn set_heartbeat_url(&self, url: Option<Url>) {
        *self.heartbeat_url.lock().unwrap() = url;
    }

    fn set_heartbeat_task(&self, task: JoinHandle<()>) {
        let mut slot = self.heartbeat_task.lock().unwrap();
        if let Some(old) = slot.replace(task) {
            old.abort();
        }
    }

    fn clear_heartbeat_task(&self) {
        if let Some(task) = self.heartbeat_task.lock().unwrap().take() {
            task.abort();
        }
    }

    fn serialize(&self) -> SerializedSession {
        let inner = self.inner.lock().unwrap();
        SerializedSession {
            state: inner.app_state.clone(),
            default_headers: inner.default_headers.clone(),
            cookies: self.cookie_jar.to_json(),
        }
    }

    fn set_state_enum(&self, state: SessionState) {
        self.inner.lock().unwrap().state = state;
        self.notify_listeners();
    }

    fn inc_in_queue(&self) {
        self.inner.lock().unwrap().in_queue += 1;
        self.notify_listeners();
    }

    fn dec_in_queue(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.in_queue = inner.in_queue.saturating_sub(1);
        drop(inner);
        self.notify_listeners();
    }

    fn notify_listeners(&self) {
        let status = self.status();
        let listeners = self.status_listeners.lock().unwrap();
        for (_, listener) in listeners.iter() {
            listener(&status);
        }
    }

    /// A point-in-time observable snapshot (spec.md §3 "Session Status").
    pub fn status(&self) -> SessionStatus {
        let inner = self.inner.lock().unwrap();
        SessionStatus {
            name: inner.name.clone(),
            state: inner.state,
            uptime_since: inner.uptime_since,
            last_error: inner.last_error,
            error: inner.error.clone(),
            in_queue: inner.in_queue,
            is_logged_in: inner.is_logged_in,
        }
    }

    /// Subscribe to status changes; the returned closure unsubscribes.
    pub fn on_status(self: &Arc<Self>, listener: StatusListener) -> impl FnOnce() + Send + Sync {
        let id = self.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.status_listeners.lock().unwrap().push((id, listener));
        let weak = Arc::downgrade(self);
        move || {
            if let Some(session) = weak.upgrade() {
                session.status_listeners.lock().unwrap().retain(|(i, _)| *i != id);
            }
        }
    }

    pub fn set_state(&self, partial: serde_json::Map<String, serde_json::Value>) {
        self.merge_state(partial);
    }

    pub fn set_default_headers(&self, headers: HashMap<String, Vec<String>>) {
        self.set_default_headers_inner(headers);
    }

    pub fn set_credentials(&self, credentials: serde_json::Value) {
        *self.credentials.lock().unwrap() = credentials;
    }

    /// The session's internal request, bypassing the queue gate (spec.md
    /// §4.3 "Login method object" — `request(options)`). Any outgoing
    /// request cancels the pending heartbeat timer for its duration (spec.md
    /// §4.3 "Heartbeat"), restarting it once the call completes.
    async fn raw_request(self: &Arc<Self>, mut descriptor: RequestDescriptor) -> Result<Response> {
        if descriptor.cookie_jar.is_none() {
            descriptor.cookie_jar = Some(Arc::clone(&self.cookie_jar));
        }
        if descriptor.logger.is_none() {
            descriptor.logger = Some(Arc::clone(&self.logger));
        }
        {
            let inner = self.inner.lock().unwrap();
            for (k, v) in inner.default_headers.iter() {
                descriptor.headers.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }

        heartbeat::stop(self);
        let transport = ReqwestTransport::new(self.client.clone());
        let result = http::execute(&transport, descriptor).await;
        heartbeat::start(self);
        result
    }

    /// Dispatched by a [`SessionHandle::request`]; identical to
    /// [`Self::raw_request`] since the handle's own guard already enforces
    /// "session is `In Use`".
    async fn guarded_request(self: &Arc<Self>, descriptor: RequestDescriptor) -> Result<Response> {
        self.raw_request(descriptor).await
    }

    // ---- lockout ----

    /// Before starting a login, suspend if the session is `Locked Out` and
    /// the cooldown hasn't elapsed (spec.md §4.3 "Lockout wait"). Cancelable
    /// by shutdown.
    async fn wait_for_lockout(self: &Arc<Self>) -> Result<()> {
        let (locked, last_error) = {
            let inner = self.inner.lock().unwrap();
            (inner.state == SessionState::LockedOut, inner.last_error)
        };
        if !locked {
            return Ok(());
        }
        let lockout_ms = self.config.resolve_lockout_time_ms();
        let last = last_error.unwrap_or(0);
        let now = chrono::Utc::now().timestamp_millis();
        let remaining = last + lockout_ms - now;
        if remaining <= 0 {
            return Ok(());
        }
        self.logger.debug(&format!("waiting {remaining}ms for lockout to clear"));
        tokio::select! {
            biased;
            _ = self.shutdown_notify.notified() => Err(Error::session_lifecycle("Session has shutdown")),
            _ = tokio::time::sleep(std::time::Duration::from_millis(remaining as u64)) => Ok(()),
        }
    }

    // ---- login / logout single-flight ----

    /// Run (or join) the single in-flight login attempt (spec.md §4.3
    /// "Login serialization", §9 "Promise-shared login"). A no-op if
    /// already logged in.
    async fn run_login(self: &Arc<Self>, ref_token: Uuid, extensions: serde_json::Value) -> Result<()> {
        if self.is_logged_in() {
            return Ok(());
        }

        let shared = {
            let mut slot = self.login_inflight.lock().unwrap();
            if let Some(shared) = slot.as_ref() {
                shared.clone()
            } else {
                let session = Arc::clone(self);
                let fut: BoxFuture<'static, Result<()>> = Box::pin(async move {
                    session.wait_for_lockout().await?;
                    session.set_state_enum(SessionState::LoggingIn);
                    session.logger.debug("login starting");
                    let Some(callback) = session.config.login.clone() else {
                        session.transition_after_login_success();
                        return Ok(());
                    };
                    let methods = LoginMethods { session: Arc::clone(&session), ref_token, extensions };
                    match callback.login(methods).await {
                        Ok(()) => {
                            session.logger.debug("login succeeded");
                            session.transition_after_login_success();
                            Ok(())
                        }
                        Err(e) => {
                            session.logger.warn(&format!("login failed: {e}"));
                            session.transition_after_login_failure(&e);
                            Err(e)
                        }
                    }
                });
                let shared = fut.shared();
                *slot = Some(shared.clone());
                shared
            }
        };

        let result = shared.await;
        *self.login_inflight.lock().unwrap() = None;
        result
    }

    fn transition_after_login_success(self: &Arc<Self>) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.is_logged_in = true;
            inner.state = SessionState::Ready;
            inner.error = None;
            if inner.uptime_since.is_none() {
                inner.uptime_since = Some(chrono::Utc::now().timestamp_millis());
            }
        }
        self.notify_listeners();
        heartbeat::start(self);
    }

    fn transition_after_login_failure(self: &Arc<Self>, err: &Error) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.state = SessionState::Error;
            inner.error = Some(err.to_string());
            inner.last_error = Some(chrono::Utc::now().timestamp_millis());
            inner.is_logged_in = false;
        }
        self.notify_listeners();
        heartbeat::stop(self);
    }

    /// Run (or join) the single in-flight logout attempt. A no-op if not
    /// logged in.
    async fn run_logout(self: &Arc<Self>, ref_token: Uuid, extensions: serde_json::Value) -> Result<()> {
        if !self.is_logged_in() {
            return Ok(());
        }

        let shared = {
            let mut slot = self.logout_inflight.lock().unwrap();
            if let Some(shared) = slot.as_ref() {
                shared.clone()
            } else {
                let session = Arc::clone(self);
                let fut: BoxFuture<'static, Result<()>> = Box::pin(async move {
                    session.set_state_enum(SessionState::LoggingOut);
                    heartbeat::stop(&session);
                    session.logger.debug("logout starting");
                    if let Some(callback) = session.config.logout.clone() {
                        let methods = LogoutMethods { session: Arc::clone(&session), ref_token, extensions };
                        callback.logout(methods).await?;
                    }
                    let mut inner = session.inner.lock().unwrap();
                    inner.is_logged_in = false;
                    inner.state = SessionState::LoggedOut;
                    drop(inner);
                    session.notify_listeners();
                    session.logger.debug("logout complete");
                    Ok(())
                });
                let shared = fut.shared();
                *slot = Some(shared.clone());
                shared
            }
        };

        let result = shared.await;
        *self.logout_inflight.lock().unwrap() = None;
        result
    }

    // ---- queueing protocol (spec.md §4.3 "Queueing protocol") ----

    /// Lease a [`SessionHandle`]. FIFO in single-request mode
    /// (`allow_multiple_requests=false`); in multi-request mode several
    /// handles may coexist but only one login runs at a time (spec.md §9
    /// open question, preserved).
    pub async fn request_session(self: &Arc<Self>, opts: RequestSessionOptions) -> Result<SessionHandle> {
        if self.current_state() == SessionState::Shutdown {
            return Err(Error::session_lifecycle("session has shut down"));
        }

        self.inc_in_queue();
        let ref_token = Uuid::new_v4();
        let (responder, waiter) = oneshot::channel();
        {
            let mut queue = self.queue.lock().unwrap();
            queue.push_back(QueuedRequest {
                ref_token,
                before_request: opts.before_request.clone(),
                on_release: opts.on_release.clone(),
                responder,
            });
        }
        self.next();

        match opts.timeout {
            Some(duration) => match tokio::time::timeout(duration, waiter).await {
                Ok(Ok(result)) => result,
                Ok(Err(_)) => {
                    self.dec_in_queue();
                    Err(Error::session_lifecycle("session dropped before a handle was granted"))
                }
                Err(_) => {
                    self.remove_from_queue(ref_token);
                    self.dec_in_queue();
                    self.next();
                    Err(Error::timeout(format!(
                        "requestSession exceeded its {}ms wait budget",
                        duration.as_millis()
                    )))
                }
            },
            None => match waiter.await {
                Ok(result) => result,
                Err(_) => {
                    self.dec_in_queue();
                    Err(Error::session_lifecycle("session dropped before a handle was granted"))
                }
            },
        }
    }

    fn remove_from_queue(&self, ref_token: Uuid) -> bool {
        let mut queue = self.queue.lock().unwrap();
        let before = queue.len();
        queue.retain(|entry| entry.ref_token != ref_token);
        queue.len() != before
    }

    /// Attempt to service the head of the queue (spec.md §4.3 "Queueing
    /// protocol" step 3). In single-request mode this is a no-op while a
    /// handle is already `In Use`; in multi-request mode it recurses to
    /// drain every ready entry.
    fn next(self: &Arc<Self>) {
        let allow_multi = self.config.allow_multiple_requests;

        if !allow_multi {
            // Claim the single slot with one atomic compare-and-swap before
            // ever touching the queue. The old code only checked
            // `active_handles > 0` here and incremented it after the
            // awaited `run_login` resolved, so two concurrent `next()`
            // callers could both pass the check, both pop an entry, and
            // both await the shared login before either incremented the
            // counter — yielding two handles `In Use` at once. Reserving the
            // slot synchronously (no `.await` between the check and the
            // claim) closes that window.
            if self
                .active_handles
                .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                return;
            }
        }

        let entry = {
            let mut queue = self.queue.lock().unwrap();
            queue.pop_front()
        };
        let Some(entry) = entry else {
            if !allow_multi {
                self.active_handles.fetch_sub(1, Ordering::SeqCst);
            }
            if self.is_logged_in() && self.active_handles.load(Ordering::SeqCst) == 0 {
                self.set_state_enum(SessionState::Ready);
            }
            return;
        };

        let session = Arc::clone(self);
        tokio::spawn(async move {
            if let Some(hook) = &entry.before_request {
                hook(entry.ref_token);
            }

            let extensions = session
                .config
                .enhance_login_methods
                .as_ref()
                .map(|f| f(entry.ref_token))
                .unwrap_or(serde_json::Value::Null);

            if let Err(e) = session.run_login(entry.ref_token, extensions).await {
                if !allow_multi {
                    session.active_handles.fetch_sub(1, Ordering::SeqCst);
                }
                let _ = entry.responder.send(Err(e));
                session.dec_in_queue();
                session.next();
                return;
            }

            if allow_multi {
                session.active_handles.fetch_add(1, Ordering::SeqCst);
            }
            session.set_state_enum(SessionState::InUse);
            let handle = SessionHandle::new(Arc::clone(&session), entry.ref_token, entry.on_release.clone());
            if entry.responder.send(Ok(handle)).is_err() {
                // Caller gave up (e.g. timed out) between grant and delivery;
                // release the slot we just claimed for it.
                session.active_handles.fetch_sub(1, Ordering::SeqCst);
                session.dec_in_queue();
            }

            if allow_multi {
                session.next();
            }
        });
    }

    // ---- handle-triggered operations ----

    /// Release a handle back to the session (spec.md §4.3 lifecycle table:
    /// "In Use -> handle released").
    async fn release_handle(self: &Arc<Self>, ref_token: Uuid) -> Result<()> {
        self.dec_in_queue();
        let remaining = self.active_handles.fetch_sub(1, Ordering::SeqCst) - 1;
        if remaining == 0 {
            if self.config.always_renew && !matches!(self.current_state(), SessionState::LockedOut | SessionState::Error) {
                let extensions = self
                    .config
                    .enhance_logout_methods
                    .as_ref()
                    .map(|f| f(ref_token))
                    .unwrap_or(serde_json::Value::Null);
                if let Err(e) = self.run_logout(ref_token, extensions).await {
                    self.logger.warn(&format!("logout-on-release failed: {e}"));
                }
            } else {
                self.set_state_enum(SessionState::Ready);
            }
        }
        self.next();
        Ok(())
    }

    async fn invalidate_from_handle(self: &Arc<Self>, ref_token: Uuid) -> Result<()> {
        self.dec_in_queue();
        self.active_handles.fetch_sub(1, Ordering::SeqCst);
        self.invalidate_session_internal(ref_token, None).await
    }

    fn report_lockout_from_handle(self: &Arc<Self>, ref_token: Uuid) {
        let _ = ref_token;
        self.dec_in_queue();
        self.active_handles.fetch_sub(1, Ordering::SeqCst);
        self.report_lockout_internal();
    }

    fn report_lockout_internal(self: &Arc<Self>) {
        heartbeat::stop(self);
        {
            let mut inner = self.inner.lock().unwrap();
            inner.state = SessionState::LockedOut;
            inner.is_logged_in = false;
            inner.last_error = Some(chrono::Utc::now().timestamp_millis());
        }
        self.notify_listeners();
        self.next();
    }

    /// Public `reportLockout`, for callers that hold no handle (e.g. a
    /// background monitor).
    pub fn report_lockout(self: &Arc<Self>) {
        self.report_lockout_internal();
    }

    async fn invalidate_session_internal(self: &Arc<Self>, ref_token: Uuid, error: Option<String>) -> Result<()> {
        if self.is_logged_in() {
            self.run_logout(ref_token, serde_json::Value::Null).await?;
        }
        {
            let mut inner = self.inner.lock().unwrap();
            inner.state = SessionState::LoggedOut;
            inner.is_logged_in = false;
            if let Some(error) = error {
                inner.error = Some(error);
            }
        }
        self.notify_listeners();
        self.next();
        Ok(())
    }

    /// Force the session back to `Logged Out`, running logout first if
    /// currently logged in (spec.md §4.3 lifecycle table). The next
    /// `requestSession` call re-runs login from scratch (spec.md §9 open
    /// question).
    pub async fn invalidate_session(self: &Arc<Self>, error: Option<String>) -> Result<()> {
        self.invalidate_session_internal(Uuid::nil(), error).await
    }

    /// Clear all timers, log out if logged in, and reject every queued
    /// waiter (spec.md §4.3 "Shutdown").
    pub async fn shutdown(self: &Arc<Self>) {
        self.shutdown_notify.notify_waiters();
        heartbeat::stop(self);
        if self.is_logged_in() {
            let _ = self.run_logout(Uuid::nil(), serde_json::Value::Null).await;
        }

        let waiters: Vec<QueuedRequest> = {
            let mut queue = self.queue.lock().unwrap();
            queue.drain(..).collect()
        };
        for entry in waiters {
            let _ = entry.responder.send(Err(Error::timeout("Session has shutdown")));
            self.dec_in_queue();
        }

        self.set_state_enum(SessionState::Shutdown);
    }
}
