//! Cookie Jar (spec.md §4.1) — parses Set-Cookie strings, validates them
//! against the host URL, stores them keyed by identity tuple, expires them
//! lazily, and selects the subset applicable to an outgoing request.

mod jar;
mod model;
mod parse;
mod select;
mod validate;

pub use jar::{CookieFilter, CookieJar};
pub use model::{Cookie, SameSite};
pub use parse::parse_cookie;
pub use select::match_domain;
pub use validate::validate_cookie;
