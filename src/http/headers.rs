use super::descriptor::{DataType, Method, ResponseType};
use std::collections::HashMap;
use url::Url;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:100.0) Gecko/20100101 Firefox/100.0";
pub const DEFAULT_ACCEPT_ENCODING: &str = "gzip, deflate, br";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-GB,en;q=0.5";
pub const DEFAULT_ACCEPT_JSON: &str = "application/json";
pub const DEFAULT_ACCEPT_HTML: &str = "text/html, application/xhtml+xml, application/xml;q=0.9, */*;q=0.8";

fn has_header(headers: &HashMap<String, Vec<String>>, name: &str) -> bool {
    headers.keys().any(|k| k.eq_ignore_ascii_case(name))
}

fn set_header_if_absent(headers: &mut HashMap<String, Vec<String>>, name: &str, value: impl Into<String>) {
    if !has_header(headers, name) {
        headers.insert(name.to_string(), vec![value.into()]);
    }
}

fn set_header(headers: &mut HashMap<String, Vec<String>>, name: &str, value: impl Into<String>) {
    headers.insert(name.to_string(), vec![value.into()]);
}

/// `scheme://host[:port]`, with no trailing path.
fn origin(url: &Url) -> String {
    let mut s = format!("{}://{}", url.scheme(), url.host_str().unwrap_or_default());
    if let Some(port) = url.port() {
        s.push(':');
        s.push_str(&port.to_string());
    }
    s
}

fn host_with_port(url: &Url) -> String {
    let mut s = url.host_str().unwrap_or_default().to_string();
    if let Some(port) = url.port() {
        s.push(':');
        s.push_str(&port.to_string());
    }
    s
}

/// strict-origin-when-cross-origin (spec.md §4.2, glossary): full
/// path+query on same-origin, bare origin cross-origin, nothing on a
/// security downgrade (https → http).
fn apply_referer_policy(headers: &mut HashMap<String, Vec<String>>, previous_url: &Url, current_url: &Url) {
    if has_header(headers, "Referer") {
        return;
    }
    if previous_url.scheme() == "https" && current_url.scheme() == "http" {
        return;
    }
    if origin(previous_url) == origin(current_url) {
        let mut referer = format!("{}{}", origin(previous_url), previous_url.path());
        if let Some(query) = previous_url.query() {
            referer.push('?');
            referer.push_str(query);
        }
        set_header(headers, "Referer", referer);
    } else {
        set_header(headers, "Referer", origin(previous_url));
    }
}

/// Build the full outgoing header set for one hop (spec.md §4.2 "Header
/// construction"). `outgoing_cookies` is whatever the caller already
/// decided to send — jar selection or explicit override — appended to any
/// `Cookie` header the caller already set.
#[allow(clippy::too_many_arguments)]
pub fn build_headers(
    caller_headers: &HashMap<String, Vec<String>>,
    method: Method,
    data_type: Option<DataType>,
    content_type_override: Option<&'static str>,
    body_len: Option<usize>,
    previous_url: Option<&Url>,
    current_url: &Url,
    response_type: ResponseType,
    outgoing_cookies: Vec<String>,
) -> HashMap<String, Vec<String>> {
    let mut headers = caller_headers.clone();

    if method != Method::Get
        && body_len.is_some()
        && !has_header(&headers, "Content-Type")
        && !has_header(&headers, "Content-Length")
    {
        if let Some(ct) = content_type_override {
            set_header(&mut headers, "Content-Type", ct);
        } else if let Some(dt) = data_type {
            let implied = match dt {
                DataType::Form => Some("application/x-www-form-urlencoded"),
                DataType::Binary => Some("application/octet-stream"),
                DataType::Json => Some("application/json"),
                DataType::Raw | DataType::Stream => None,
            };
            if let Some(ct) = implied {
                set_header(&mut headers, "Content-Type", ct);
            }
        }
        if let Some(len) = body_len {
            set_header(&mut headers, "Content-Length", len.to_string());
        }
    }

    if let Some(prev) = previous_url {
        apply_referer_policy(&mut headers, prev, current_url);
    }

    set_header_if_absent(
        &mut headers,
        "Origin",
        origin(previous_url.unwrap_or(current_url)),
    );
    set_header_if_absent(
        &mut headers,
        "Host",
        host_with_port(previous_url.unwrap_or(current_url)),
    );
    set_header_if_absent(&mut headers, "User-Agent", DEFAULT_USER_AGENT);
    set_header_if_absent(
        &mut headers,
        "Accept",
        match response_type {
            ResponseType::Json => DEFAULT_ACCEPT_JSON,
            _ => DEFAULT_ACCEPT_HTML,
        },
    );
    set_header_if_absent(&mut headers, "Accept-Encoding", DEFAULT_ACCEPT_ENCODING);
    set_header_if_absent(&mut headers, "Accept-Language", DEFAULT_ACCEPT_LANGUAGE);

    if !outgoing_cookies.is_empty() {
        headers
            .entry("Cookie".to_string())
            .or_default()
            .extend(outgoing_cookies);
    }

    headers
}

/// Update headers for a redirect hop (spec.md §4.2 "Redirect loop" — "Set
/// Host=new host, Origin=new origin, replace Cookie ..., reapply Referer
/// policy against the previous URL"). `downgrading_to_get` is true whenever
/// the redirect status is anything other than 307/308: per spec.md's
/// "keepMethodAndData" step ("if !keepMethodAndData, set method to GET,
/// zero out Content-Length, drop Content-Type"), the body-describing
/// headers from the prior hop must not survive onto the now-bodyless GET.
pub fn update_headers_for_redirect(
    headers: &mut HashMap<String, Vec<String>>,
    previous_url: &Url,
    new_url: &Url,
    new_cookies: Vec<String>,
    downgrading_to_get: bool,
) {
    headers.remove("Referer");
    set_header(headers, "Host", host_with_port(new_url));
    set_header(headers, "Origin", origin(new_url));
    headers.remove("Cookie");
    if !new_cookies.is_empty() {
        headers.insert("Cookie".to_string(), new_cookies);
    }
    if downgrading_to_get {
        headers.remove("Content-Type");
        headers.remove("Content-Length");
    }
    apply_referer_policy(headers, previous_url, new_url);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn sets_defaults_when_absent() {
        let headers = build_headers(
            &HashMap::new(),
            Method::Get,
            None,
            None,
            None,
            None,
            &url("https://example.com/"),
            ResponseType::String,
            Vec::new(),
        );
        assert_eq!(headers.get("User-Agent").unwrap()[0], super::DEFAULT_USER_AGENT);
        assert_eq!(headers.get("Accept-Encoding").unwrap()[0], "gzip, deflate, br");
        assert_eq!(headers.get("Accept-Language").unwrap()[0], "en-GB,en;q=0.5");
        assert_eq!(headers.get("Accept").unwrap()[0], DEFAULT_ACCEPT_HTML);
    }

    #[test]
    fn json_response_type_sets_json_accept() {
        let headers = build_headers(
            &HashMap::new(),
            Method::Get,
            None,
            None,
            None,
            None,
            &url("https://example.com/"),
            ResponseType::Json,
            Vec::new(),
        );
        assert_eq!(headers.get("Accept").unwrap()[0], "application/json");
    }

    #[test]
    fn derives_content_type_and_length_for_post_with_body() {
        let headers = build_headers(
            &HashMap::new(),
            Method::Post,
            Some(DataType::Json),
            None,
            Some(13),
            None,
            &url("https://example.com/"),
            ResponseType::String,
            Vec::new(),
        );
        assert_eq!(headers.get("Content-Type").unwrap()[0], "application/json");
        assert_eq!(headers.get("Content-Length").unwrap()[0], "13");
    }

    #[test]
    fn does_not_override_explicit_content_type() {
        let mut caller = HashMap::new();
        caller.insert("Content-Type".to_string(), vec!["text/plain".to_string()]);
        let headers = build_headers(
            &caller,
            Method::Post,
            Some(DataType::Json),
            None,
            Some(13),
            None,
            &url("https://example.com/"),
            ResponseType::String,
            Vec::new(),
        );
        assert_eq!(headers.get("Content-Type").unwrap()[0], "text/plain");
        assert!(!headers.contains_key("Content-Length"));
    }

    #[test]
    fn referer_same_origin_includes_path_and_query() {
        let headers = build_headers(
            &HashMap::new(),
            Method::Get,
            None,
            None,
            None,
            Some(&url("https://example.com/foo?x=1")),
            &url("https://example.com/bar"),
            ResponseType::String,
            Vec::new(),
        );
        assert_eq!(headers.get("Referer").unwrap()[0], "https://example.com/foo?x=1");
    }

    #[test]
    fn referer_cross_origin_is_bare_origin() {
        let headers = build_headers(
            &HashMap::new(),
            Method::Get,
            None,
            None,
            None,
            Some(&url("https://example.com/foo")),
            &url("https://other.com/bar"),
            ResponseType::String,
            Vec::new(),
        );
        assert_eq!(headers.get("Referer").unwrap()[0], "https://example.com");
    }

    #[test]
    fn referer_downgrade_to_http_is_omitted() {
        let headers = build_headers(
            &HashMap::new(),
            Method::Get,
            None,
            None,
            None,
            Some(&url("https://example.com/foo")),
            &url("http://example.com/bar"),
            ResponseType::String,
            Vec::new(),
        );
        assert!(!headers.contains_key("Referer"));
    }

    #[test]
    fn cookie_header_concatenates_existing_and_jar_cookies() {
        let mut caller = HashMap::new();
        caller.insert("Cookie".to_string(), vec!["a=1".to_string()]);
        let headers = build_headers(
            &caller,
            Method::Get,
            None,
            None,
            None,
            None,
            &url("https://example.com/"),
            ResponseType::String,
            vec!["b=2".to_string()],
        );
        assert_eq!(headers.get("Cookie").unwrap(), &vec!["a=1".to_string(), "b=2".to_string()]);
    }
}
