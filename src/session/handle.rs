//! Session Handle (spec.md §3 "Session Handle (leased)", §4.3 "Session
//! Handle wrapping").

use super::queue::RefHook;
use super::state::SessionState;
use super::HttpSession;
use crate::error::{Error, Result};
use crate::http::{RequestDescriptor, Response};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// A pure snapshot of session state, safe to persist and restore (spec.md
/// §4.3 "Serialization").
#[derive(Debug, Clone, serde::Serialize)]
pub struct SerializedSession {
    pub state: serde_json::Map<String, serde_json::Value>,
    pub default_headers: std::collections::HashMap<String, Vec<String>>,
    pub cookies: Vec<crate::cookie::Cookie>,
}

/// A short-lived leased object bound to one `ref` (spec.md §3 "Session
/// Handle"). Every operation is guarded: a handle used after `release`
/// fails without touching the session; a handle used while the session is
/// not `In Use` fails and fires `on_release` once.
pub struct SessionHandle {
    session: Arc<HttpSession>,
    ref_token: Uuid,
    on_release: Option<RefHook>,
    was_released: Arc<AtomicBool>,
    on_release_fired: Arc<AtomicBool>,
}

impl SessionHandle {
    pub(super) fn new(session: Arc<HttpSession>, ref_token: Uuid, on_release: Option<RefHook>) -> Self {
        Self {
            session,
            ref_token,
            on_release,
            was_released: Arc::new(AtomicBool::new(false)),
            on_release_fired: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn ref_token(&self) -> Uuid {
        self.ref_token
    }

    pub fn was_released(&self) -> bool {
        self.was_released.load(Ordering::SeqCst)
    }

    /// The guard all operations share (spec.md §4.3 "Session Handle
    /// wrapping"). `op` names the failing operation in the error message.
    fn guard(&self, op: &str) -> Result<()> {
        if self.was_released.load(Ordering::SeqCst) {
            return Err(Error::session_lifecycle(format!(
                "calling {op} failed because session has already been released"
            )));
        }
        let state = self.session.current_state();
        if state != SessionState::InUse {
            if !self.on_release_fired.swap(true, Ordering::SeqCst) {
                if let Some(hook) = &self.on_release {
                    hook(self.ref_token);
                }
            }
            return Err(Error::session_lifecycle(format!(
                "calling {op} failed because session is in status {state}"
            )));
        }
        Ok(())
    }

    /// Atomically mark this handle released before dispatching to the
    /// session (spec.md §4.3: "Operations flagged as release-terminal ...
    /// atomically set wasReleased=true before dispatching").
    fn begin_release_terminal(&self, op: &str) -> Result<()> {
        self.guard(op)?;
        self.was_released.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub fn get_state(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        self.guard("getState")?;
        Ok(self.session.get_state())
    }

    pub fn set_state(&self, partial: serde_json::Map<String, serde_json::Value>) -> Result<()> {
        self.guard("setState")?;
        self.session.merge_state(partial);
        Ok(())
    }

    pub async fn request(&self, descriptor: RequestDescriptor) -> Result<Response> {
        self.guard("request")?;
        self.session.guarded_request(descriptor).await
    }

    pub fn serialize(&self) -> Result<SerializedSession> {
        self.guard("serialize")?;
        Ok(self.session.serialize())
    }

    pub async fn release(&self) -> Result<()> {
        self.begin_release_terminal("release")?;
        self.session.release_handle(self.ref_token).await
    }

    pub async fn invalidate(&self) -> Result<()> {
        self.begin_release_terminal("invalidate")?;
        self.session.invalidate_from_handle(self.ref_token).await
    }

    pub fn report_lockout(&self) -> Result<()> {
        self.begin_release_terminal("reportLockout")?;
        self.session.report_lockout_from_handle(self.ref_token);
        Ok(())
    }
}
