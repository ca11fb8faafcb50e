//! Session status vocabulary (spec.md §3 "Session Status", §4.3 "Lifecycle
//! states and transitions").

use std::sync::Arc;

/// `state` ∈ {Logged Out, Logging In, Ready, In Use, Logging Out, Error,
/// Locked Out, Shutdown} (spec.md §6 "Status vocabulary").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    LoggingIn,
    Ready,
    InUse,
    LoggingOut,
    Error,
    LockedOut,
    Shutdown,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionState::LoggedOut => "Logged Out",
            SessionState::LoggingIn => "Logging In",
            SessionState::Ready => "Ready",
            SessionState::InUse => "In Use",
            SessionState::LoggingOut => "Logging Out",
            SessionState::Error => "Error",
            SessionState::LockedOut => "Locked Out",
            SessionState::Shutdown => "Shutdown",
        };
        f.write_str(s)
    }
}

/// A point-in-time observable snapshot (spec.md §3 "Session Status").
#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub name: String,
    pub state: SessionState,
    pub uptime_since: Option<i64>,
    pub last_error: Option<i64>,
    pub error: Option<String>,
    pub in_queue: usize,
    pub is_logged_in: bool,
}

/// Subscriber for [`super::HttpSession::on_status`]; returns an
/// unsubscribe guard.
pub type StatusListener = Arc<dyn Fn(&SessionStatus) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_status_vocabulary() {
        assert_eq!(SessionState::LoggedOut.to_string(), "Logged Out");
        assert_eq!(SessionState::InUse.to_string(), "In Use");
        assert_eq!(SessionState::LockedOut.to_string(), "Locked Out");
    }
}
