use serde::{Deserialize, Serialize};

/// `SameSite` ∈ {Strict, Lax, None} (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl Default for SameSite {
    fn default() -> Self {
        SameSite::Lax
    }
}

impl SameSite {
    /// Parse the `SameSite` attribute value. Accepts exactly
    /// `Strict`/`Lax`/`None`, case-insensitively; anything else is
    /// rejected by the caller (marked `has_invalid_attributes`).
    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("strict") {
            Some(SameSite::Strict)
        } else if value.eq_ignore_ascii_case("lax") {
            Some(SameSite::Lax)
        } else if value.eq_ignore_ascii_case("none") {
            Some(SameSite::None)
        } else {
            None
        }
    }
}

/// A single cookie (spec.md §3 "Cookie"). Identity for jar replacement is
/// the 4-tuple `(name, domain, path, is_https)`. Created by the parser,
/// never mutated after validation, destroyed on expiry or explicit
/// removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    /// Scheme of the site that set this cookie.
    pub is_https: bool,
    /// `true` iff the Set-Cookie string carried a `Domain` attribute.
    pub allow_sub_domains: bool,
    pub same_site: SameSite,
    pub secure: bool,
    /// Absolute epoch-millisecond expiry, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<i64>,
    /// Parser-set flag consumed by [`super::validate_cookie`]; never
    /// serialized into the session payload since a cookie that reaches
    /// storage has already been validated.
    #[serde(skip)]
    pub has_invalid_attributes: bool,
}

impl Cookie {
    /// The 4-tuple identity used for jar upsert and lookup.
    pub fn identity(&self) -> (&str, &str, &str, bool) {
        (&self.name, &self.domain, &self.path, self.is_https)
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        matches!(self.expires, Some(exp) if exp < now_ms)
    }
}
