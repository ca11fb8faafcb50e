//! Crate-wide error type.
//!
//! Every failure path in the executor and the session exits through one of
//! these variants, each carrying whatever sanitized request/response
//! snapshot was available at the point of failure (see
//! [`crate::http::secrets`] for how that snapshot gets its secrets redacted
//! before it is attached here).

use crate::http::{RequestSnapshot, ResponseSnapshot};
use thiserror::Error;

/// The crate's error taxonomy (spec.md §7). `Clone` so a single login/logout
/// failure can be fanned out to every waiter sharing that attempt (spec.md
/// §4.3 "Login serialization" — "on failure every waiter observes the same
/// error").
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Malformed URL, unknown data type, incompatible data for the data
    /// type, or a missing required descriptor field.
    #[error("invalid input: {message}")]
    InvalidInput {
        message: String,
        request: Option<Box<RequestSnapshot>>,
    },

    /// The transport raised before or during the exchange.
    #[error("transport failure: {message}")]
    TransportFailure {
        message: String,
        request: Option<Box<RequestSnapshot>>,
    },

    /// Redirect to an invalid URL, max redirects exceeded, or an
    /// unrecognized `Content-Encoding`.
    #[error("protocol failure: {message}")]
    ProtocolFailure {
        message: String,
        request: Option<Box<RequestSnapshot>>,
        response: Option<Box<ResponseSnapshot>>,
    },

    /// Status mismatch, empty-response assertion failed, JSON parse
    /// failed, or a caller-supplied JSON validator returned `false`.
    #[error("validation failure: {message}")]
    ValidationFailure {
        message: String,
        request: Option<Box<RequestSnapshot>>,
        response: Option<Box<ResponseSnapshot>>,
    },

    /// A handle operation after release, an operation invoked while the
    /// session is not `In Use`, a shutdown during a wait, or a login/logout
    /// callback that returned an error.
    #[error("session lifecycle error: {message}")]
    SessionLifecycle { message: String },

    /// A queued `requestSession` call exceeded its wait budget.
    #[error("timeout: {message}")]
    Timeout { message: String },
}

impl Error {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Error::InvalidInput {
            message: message.into(),
            request: None,
        }
    }

    pub fn session_lifecycle(message: impl Into<String>) -> Self {
        Error::SessionLifecycle {
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Error::Timeout {
            message: message.into(),
        }
    }

    /// Attach (or replace) the sanitized request snapshot carried by this
    /// error, for variants that carry one.
    pub fn with_request(mut self, request: RequestSnapshot) -> Self {
        match &mut self {
            Error::InvalidInput { request: r, .. }
            | Error::TransportFailure { request: r, .. }
            | Error::ProtocolFailure { request: r, .. }
            | Error::ValidationFailure { request: r, .. } => {
                *r = Some(Box::new(request));
            }
            Error::SessionLifecycle { .. } | Error::Timeout { .. } => {}
        }
        self
    }

    /// Attach (or replace) the accumulated response snapshot, for variants
    /// that carry one.
    pub fn with_response(mut self, response: ResponseSnapshot) -> Self {
        match &mut self {
            Error::ProtocolFailure { response: r, .. } | Error::ValidationFailure { response: r, .. } => {
                *r = Some(Box::new(response));
            }
            _ => {}
        }
        self
    }
}

pub type Result<T> = std::result::Result<T, Error>;
