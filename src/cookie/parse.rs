use super::model::{Cookie, SameSite};
use chrome_like_dates::parse_http_date;
use url::Url;

/// Strip a single matched pair of leading/trailing `"` from `s`, if present
/// on both ends.
fn strip_matched_quotes(s: &str) -> &str {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Parse one Set-Cookie header value against the URL of the host that sent
/// it (spec.md §4.1 `parseCookie`). Parsing is total: it always returns a
/// `Cookie`, possibly with `has_invalid_attributes` set, for
/// [`super::validate_cookie`] to reject.
pub fn parse_cookie(host_url: &Url, raw: &str) -> Cookie {
    let mut cookie = Cookie {
        name: String::new(),
        value: String::new(),
        domain: host_url.host_str().unwrap_or_default().to_string(),
        path: "/".to_string(),
        is_https: host_url.scheme() == "https",
        allow_sub_domains: false,
        same_site: SameSite::Lax,
        secure: false,
        expires: None,
        has_invalid_attributes: false,
    };

    let now_ms = chrono::Utc::now().timestamp_millis();
    let mut name_value_assigned = false;
    let mut max_age_set = false;

    for token in raw.split("; ") {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        if token.eq_ignore_ascii_case("secure") && !token.contains('=') {
            cookie.secure = true;
            continue;
        }
        if token.eq_ignore_ascii_case("httponly") && !token.contains('=') {
            continue;
        }

        let Some((left, right)) = token.split_once('=') else {
            cookie.has_invalid_attributes = true;
            continue;
        };
        let left_lower = left.trim().to_ascii_lowercase();
        let right = right.trim();

        match left_lower.as_str() {
            "expires" => {
                if max_age_set || cookie.expires.is_some() {
                    // Max-Age wins regardless of order; a prior Expires
                    // attribute also wins over a later duplicate.
                    continue;
                }
                match parse_http_date(right) {
                    Some(ms) => cookie.expires = Some(ms),
                    None => cookie.has_invalid_attributes = true,
                }
            }
            "max-age" => match right.parse::<i64>() {
                Ok(seconds) => {
                    cookie.expires = Some(now_ms + seconds * 1000);
                    max_age_set = true;
                }
                Err(_) => cookie.has_invalid_attributes = true,
            },
            "domain" => {
                let stripped = right.strip_prefix('.').unwrap_or(right);
                cookie.domain = stripped.to_string();
                cookie.allow_sub_domains = true;
            }
            "path" => cookie.path = right.to_string(),
            "samesite" => match SameSite::parse(right) {
                Some(s) => cookie.same_site = s,
                None => cookie.has_invalid_attributes = true,
            },
            _ => {
                if !name_value_assigned {
                    cookie.name = strip_matched_quotes(left.trim()).to_string();
                    cookie.value = strip_matched_quotes(right).to_string();
                    name_value_assigned = true;
                } else {
                    cookie.has_invalid_attributes = true;
                }
            }
        }
    }

    cookie
}

/// Minimal HTTP-date parsing (RFC 1123 / RFC 850 / asctime), just enough to
/// resolve a Set-Cookie `Expires` attribute to an epoch-millisecond
/// timestamp. Kept as an inline sibling module rather than a new dependency
/// since the format space Set-Cookie actually uses in practice is narrow.
mod chrome_like_dates {
    use chrono::DateTime;

    pub fn parse_http_date(s: &str) -> Option<i64> {
        if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
            return Some(dt.timestamp_millis());
        }
        // RFC 850 / asctime fallbacks seen in the wild, e.g.
        // "Wednesday, 21-Oct-15 07:28:00 GMT".
        for fmt in [
            "%A, %d-%b-%y %H:%M:%S GMT",
            "%a, %d-%b-%Y %H:%M:%S GMT",
            "%a %b %e %H:%M:%S %Y",
        ] {
            if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, fmt) {
                return Some(dt.and_utc().timestamp_millis());
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn parses_basic_name_value() {
        let c = parse_cookie(&url("https://example.com/"), "foo=bar");
        assert_eq!(c.name, "foo");
        assert_eq!(c.value, "bar");
        assert_eq!(c.domain, "example.com");
        assert_eq!(c.path, "/");
        assert!(c.is_https);
        assert!(!c.has_invalid_attributes);
    }

    #[test]
    fn secure_flag_with_no_equals() {
        let c = parse_cookie(&url("https://example.com/"), "foo=bar; Secure");
        assert!(c.secure);
    }

    #[test]
    fn httponly_is_ignored() {
        let c = parse_cookie(&url("https://example.com/"), "foo=bar; HttpOnly");
        assert!(!c.has_invalid_attributes);
    }

    #[test]
    fn domain_strips_leading_dot_and_sets_subdomain_flag() {
        let c = parse_cookie(&url("https://example.com/"), "foo=bar; Domain=.example.com");
        assert_eq!(c.domain, "example.com");
        assert!(c.allow_sub_domains);
    }

    #[test]
    fn unknown_attribute_marks_invalid() {
        let c = parse_cookie(&url("https://example.com/"), "foo=bar; Wizz=bang");
        assert!(c.has_invalid_attributes);
    }

    #[test]
    fn token_without_equals_marks_invalid() {
        let c = parse_cookie(&url("https://example.com/"), "foo=bar; weird");
        assert!(c.has_invalid_attributes);
    }

    #[test]
    fn max_age_wins_over_expires_seen_first() {
        let c = parse_cookie(
            &url("https://example.com/"),
            "foo=bar; Expires=Wed, 21 Oct 2015 07:28:00 GMT; Max-Age=60",
        );
        let now = chrono::Utc::now().timestamp_millis();
        assert!(c.expires.unwrap() > now);
    }

    #[test]
    fn max_age_wins_over_expires_seen_second() {
        let c = parse_cookie(
            &url("https://example.com/"),
            "foo=bar; Max-Age=60; Expires=Wed, 21 Oct 2015 07:28:00 GMT",
        );
        let now = chrono::Utc::now().timestamp_millis();
        assert!(c.expires.unwrap() > now);
    }

    #[test]
    fn bad_max_age_marks_invalid() {
        let c = parse_cookie(&url("https://example.com/"), "foo=bar; Max-Age=notanumber");
        assert!(c.has_invalid_attributes);
    }

    #[test]
    fn samesite_accepts_only_known_values() {
        let c = parse_cookie(&url("https://example.com/"), "foo=bar; SameSite=Strict");
        assert_eq!(c.same_site, SameSite::Strict);
        let c = parse_cookie(&url("https://example.com/"), "foo=bar; SameSite=Weird");
        assert!(c.has_invalid_attributes);
    }

    #[test]
    fn quoted_name_and_value_are_stripped() {
        let c = parse_cookie(&url("https://example.com/"), "\"foo\"=\"bar\"");
        assert_eq!(c.name, "foo");
        assert_eq!(c.value, "bar");
    }

    #[test]
    fn second_name_value_pair_is_invalid() {
        let c = parse_cookie(&url("https://example.com/"), "foo=bar; baz=qux");
        assert!(c.has_invalid_attributes);
    }
}
