use super::model::{Cookie, SameSite};
use super::parse::parse_cookie;
use super::select::domain_in_scope;
use super::validate::validate_cookie;
use std::sync::Mutex;
use url::Url;

/// Filter for [`CookieJar::remove_cookies`]; an omitted field is a
/// wildcard, an all-omitted filter removes everything.
#[derive(Debug, Default, Clone)]
pub struct CookieFilter {
    pub name: Option<String>,
    pub domain: Option<String>,
    pub path: Option<String>,
}

impl CookieFilter {
    fn matches(&self, cookie: &Cookie) -> bool {
        self.name.as_deref().is_none_or(|n| n == cookie.name)
            && self.domain.as_deref().is_none_or(|d| d == cookie.domain)
            && self.path.as_deref().is_none_or(|p| p == cookie.path)
    }
}

/// An ordered collection of cookies (spec.md §3 "Cookie Jar"). No two
/// cookies share the identity tuple `(name, domain, path, is_https)`;
/// expired cookies are purged the next time the jar is consulted for
/// outgoing cookies. Interior-mutable so it can be shared behind an `Arc`
/// the way the session shares it across concurrently-issued requests.
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: Mutex<Vec<Cookie>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cookies(cookies: Vec<Cookie>) -> Self {
        let jar = Self::new();
        jar.add_cookies(cookies);
        jar
    }

    /// Replace a cookie sharing `cookie`'s identity tuple, or append it.
    pub fn add_cookie(&self, cookie: Cookie) {
        let mut cookies = self.cookies.lock().unwrap();
        let identity = cookie.identity();
        if let Some(existing) = cookies
            .iter_mut()
            .find(|c| c.identity() == identity)
        {
            *existing = cookie;
        } else {
            cookies.push(cookie);
        }
    }

    pub fn add_cookies(&self, cookies: impl IntoIterator<Item = Cookie>) {
        for cookie in cookies {
            self.add_cookie(cookie);
        }
    }

    /// Remove all cookies matching `filter`, returning the count removed.
    pub fn remove_cookies(&self, filter: CookieFilter) -> usize {
        let mut cookies = self.cookies.lock().unwrap();
        let before = cookies.len();
        cookies.retain(|c| !filter.matches(c));
        before - cookies.len()
    }

    pub fn get_cookie(&self, name: &str, domain: Option<&str>, path: Option<&str>) -> Option<Cookie> {
        let cookies = self.cookies.lock().unwrap();
        cookies
            .iter()
            .find(|c| {
                c.name == name
                    && domain.is_none_or(|d| d == c.domain)
                    && path.is_none_or(|p| p == c.path)
            })
            .cloned()
    }

    /// Parse and validate every `Set-Cookie` header value against `url`,
    /// storing the ones that pass. Returns the count added.
    pub fn collect_cookies_from_response<I, S>(&self, url: &Url, set_cookie_headers: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = 0;
        for raw in set_cookie_headers {
            let cookie = parse_cookie(url, raw.as_ref());
            if validate_cookie(url, &cookie) {
                self.add_cookie(cookie);
                added += 1;
            }
        }
        added
    }

    fn expire_stale(&self, now_ms: i64) {
        let mut cookies = self.cookies.lock().unwrap();
        cookies.retain(|c| !c.is_expired(now_ms));
    }

    /// Whether `cookie` applies to an outgoing request to `url`, where
    /// `host_domain` is the domain the navigation originated from (used for
    /// SameSite scoping across redirects — spec.md §4.1 `selectCookieFactory`).
    fn cookie_applies(cookie: &Cookie, url: &Url, host_domain: &str) -> bool {
        let is_secure_request = url.scheme() == "https";
        let request_path = url.path();

        let path_matches = request_path.starts_with(&cookie.path);
        if !path_matches {
            return false;
        }
        if cookie.secure && !is_secure_request {
            return false;
        }

        let request_host = url.host_str().unwrap_or_default();
        match cookie.same_site {
            SameSite::None => domain_in_scope(host_domain, &cookie.domain, cookie.allow_sub_domains),
            SameSite::Strict => {
                domain_in_scope(host_domain, &cookie.domain, cookie.allow_sub_domains)
                    && domain_in_scope(request_host, &cookie.domain, cookie.allow_sub_domains)
            }
            SameSite::Lax => domain_in_scope(request_host, &cookie.domain, cookie.allow_sub_domains),
        }
    }

    /// Expire stale cookies, then return the cookies applicable to a
    /// request against `url` (navigated from `host_domain`), serialized as
    /// `"name=value"` pairs in storage order.
    pub fn get_request_cookies(&self, url: &Url, host_domain: &str) -> Vec<String> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        self.expire_stale(now_ms);

        let cookies = self.cookies.lock().unwrap();
        cookies
            .iter()
            .filter(|c| Self::cookie_applies(c, url, host_domain))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect()
    }

    pub fn to_json(&self) -> Vec<Cookie> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        self.expire_stale(now_ms);
        self.cookies.lock().unwrap().clone()
    }
}
