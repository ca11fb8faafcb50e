//! Queued Request (spec.md §3 "Queued Request", §4.3 "Queueing protocol").

use super::handle::SessionHandle;
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use uuid::Uuid;

pub type RefHook = Arc<dyn Fn(Uuid) + Send + Sync>;

/// Options accepted by [`super::HttpSession::request_session`].
#[derive(Clone, Default)]
pub struct RequestSessionOptions {
    pub before_request: Option<RefHook>,
    pub on_release: Option<RefHook>,
    pub timeout: Option<Duration>,
}

/// One caller waiting for a lease (spec.md §3 "Queued Request"): a
/// promise-like latch (the oneshot channel) plus the caller's ref and
/// hooks.
pub struct QueuedRequest {
    pub ref_token: Uuid,
    pub before_request: Option<RefHook>,
    pub on_release: Option<RefHook>,
    pub responder: oneshot::Sender<Result<SessionHandle>>,
}
