use super::model::{Cookie, SameSite};
use super::select::match_domain;
use url::Url;

const FORBIDDEN_NAME_CHARS: &[char] = &[
    ' ', '\t', '(', ')', '<', '>', '@', ',', ';', ':', '\\', '"', '/', '[', ']', '?', '=', '{', '}',
];

fn in_printable_ascii_range(c: char) -> bool {
    let code = c as u32;
    (33..=126).contains(&code)
}

fn is_valid_name(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    name.chars()
        .all(|c| !FORBIDDEN_NAME_CHARS.contains(&c) && in_printable_ascii_range(c))
}

fn is_valid_value(value: &str) -> bool {
    value.chars().all(|c| {
        !c.is_whitespace() && c != '"' && c != ',' && c != ';' && c != '\\' && in_printable_ascii_range(c)
    })
}

/// Validate a parsed cookie against the host URL it was received from
/// (spec.md §4.1 `validateCookie`). Pure predicate — never mutates the
/// cookie.
pub fn validate_cookie(host_url: &Url, cookie: &Cookie) -> bool {
    if cookie.has_invalid_attributes {
        return false;
    }

    if !is_valid_name(&cookie.name) {
        return false;
    }
    if !is_valid_value(&cookie.value) {
        return false;
    }

    if cookie.name.starts_with("__Secure-") && !(cookie.is_https && cookie.secure) {
        return false;
    }

    if cookie.name.starts_with("__Host-")
        && !(cookie.is_https && cookie.secure && !cookie.allow_sub_domains && cookie.path == "/")
    {
        return false;
    }

    let host = host_url.host_str().unwrap_or_default();
    if cookie.domain != host {
        if !cookie.allow_sub_domains || !match_domain(host, &cookie.domain) {
            return false;
        }
    }

    if cookie.secure && host_url.scheme() != "https" && host != "localhost" {
        return false;
    }

    if cookie.same_site == SameSite::None && !cookie.secure {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookie::parse_cookie;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn valid_cookie_passes() {
        let u = url("https://example.com/");
        let c = parse_cookie(&u, "foo=bar");
        assert!(validate_cookie(&u, &c));
    }

    #[test]
    fn invalid_attributes_reject() {
        let u = url("https://example.com/");
        let c = parse_cookie(&u, "foo=bar; Weird=Thing");
        assert!(!validate_cookie(&u, &c));
    }

    #[test]
    fn empty_name_rejects() {
        let u = url("https://example.com/");
        let mut c = parse_cookie(&u, "foo=bar");
        c.name = String::new();
        assert!(!validate_cookie(&u, &c));
    }

    #[test]
    fn name_with_forbidden_char_rejects() {
        let u = url("https://example.com/");
        let mut c = parse_cookie(&u, "foo=bar");
        c.name = "fo o".to_string();
        assert!(!validate_cookie(&u, &c));
    }

    #[test]
    fn value_with_semicolon_rejects() {
        let u = url("https://example.com/");
        let mut c = parse_cookie(&u, "foo=bar");
        c.value = "a;b".to_string();
        assert!(!validate_cookie(&u, &c));
    }

    #[test]
    fn secure_prefix_requires_https_and_secure_flag() {
        let u = url("https://example.com/");
        let mut c = parse_cookie(&u, "__Secure-x=y");
        assert!(!validate_cookie(&u, &c));
        c.secure = true;
        assert!(validate_cookie(&u, &c));
    }

    #[test]
    fn host_prefix_requires_no_domain_root_path_https_secure() {
        let u = url("https://example.com/");
        let mut c = parse_cookie(&u, "__Host-x=y; Secure");
        assert!(validate_cookie(&u, &c));

        c.allow_sub_domains = true;
        c.domain = "example.com".to_string();
        assert!(!validate_cookie(&u, &c));
    }

    #[test]
    fn domain_mismatch_without_subdomain_flag_rejects() {
        let u = url("https://example.com/");
        let mut c = parse_cookie(&u, "foo=bar");
        c.domain = "other.com".to_string();
        assert!(!validate_cookie(&u, &c));
    }

    #[test]
    fn domain_mismatch_with_subdomain_flag_requires_subdomain_match() {
        let u = url("https://www.example.com/");
        let mut c = parse_cookie(&u, "foo=bar; Domain=example.com");
        assert!(validate_cookie(&u, &c));

        c.domain = "other.com".to_string();
        assert!(!validate_cookie(&u, &c));
    }

    #[test]
    fn secure_over_http_rejects_unless_localhost() {
        let u = url("http://example.com/");
        let mut c = parse_cookie(&u, "foo=bar");
        c.secure = true;
        assert!(!validate_cookie(&u, &c));

        let u_local = url("http://localhost/");
        let mut c_local = parse_cookie(&u_local, "foo=bar");
        c_local.secure = true;
        assert!(validate_cookie(&u_local, &c_local));
    }

    #[test]
    fn samesite_none_requires_secure() {
        let u = url("https://example.com/");
        let mut c = parse_cookie(&u, "foo=bar; SameSite=None");
        assert!(!validate_cookie(&u, &c));
        c.secure = true;
        assert!(validate_cookie(&u, &c));
    }
}
