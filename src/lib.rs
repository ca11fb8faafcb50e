//! A stateful HTTP session client: a login/logout-gated request pipeline
//! (cookie jar, connection pool, concurrency gate, heartbeat, lockout
//! backoff) wrapping a redirect-aware HTTP request executor and an
//! RFC 6265-like cookie jar.

pub mod cookie;
pub mod error;
pub mod http;
pub mod session;
pub mod support;
pub mod transport;

pub use cookie::{match_domain, parse_cookie, validate_cookie, Cookie, CookieFilter, CookieJar, SameSite};
pub use error::{Error, Result};
pub use http::{http_request, DataType, FormValue, Method, RequestBody, RequestDescriptor, RequestSnapshot, Response, ResponseData, ResponseSnapshot, ResponseType};
pub use session::{
    FnLogin, FnLogout, HttpSession, LoginCallback, LoginMethods, LogoutCallback, LogoutMethods,
    RequestSessionOptions, SerializedSession, SessionConfig, SessionHandle, SessionState,
    SessionStatus, StatusListener,
};
pub use support::{Logger, NoopLogger, TracingLogger};
pub use transport::{default_client, ReqwestTransport, Transport, TransportRequest, TransportResponse};
