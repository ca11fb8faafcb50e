//! Heartbeat (spec.md §4.3 "Heartbeat"): a periodic background GET that
//! keeps the remote session alive while no foreground work is happening.

use super::state::SessionState;
use super::HttpSession;
use crate::http::{Method, RequestDescriptor};
use std::sync::Arc;
use std::time::Duration;

/// (Re)schedule the heartbeat timer. No-op if no `heartbeat_url` is
/// configured, or if the session isn't `Ready`/`In Use`.
pub(super) fn start(session: &Arc<HttpSession>) {
    let Some(url) = session.heartbeat_url() else {
        return;
    };
    let state = session.current_state();
    if !matches!(state, SessionState::Ready | SessionState::InUse) {
        return;
    }

    stop(session);

    let interval_ms = session.config().resolve_heartbeat_interval_ms().max(0) as u64;
    let session = Arc::clone(session);
    let task = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(interval_ms)).await;
        let descriptor = RequestDescriptor {
            method: Method::Get,
            ..RequestDescriptor::new(url)
        };
        let _ = session.raw_request(descriptor).await;
        start(&session);
    });
    session.set_heartbeat_task(task);
}

/// Cancel the pending heartbeat timer, if any (spec.md §4.3: "Any outgoing
/// request cancels the pending heartbeat timer for the duration of that
/// request").
pub(super) fn stop(session: &Arc<HttpSession>) {
    session.clear_heartbeat_task();
}
