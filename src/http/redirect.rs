//! Redirect loop (spec.md §4.2 "Redirect loop"). One call to [`follow`] may
//! perform several transport exchanges, rebuilding headers and re-selecting
//! cookies on every hop, before returning the terminal (non-redirect)
//! response.

use super::descriptor::{DataType, Method, ResponseType};
use super::headers;
use crate::cookie::CookieJar;
use crate::error::Error;
use crate::transport::{Transport, TransportRequest, TransportResponse};
use bytes::Bytes;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Any status in `[300, 400)` carrying a `Location` header is followed as a
/// redirect (spec.md §4.2 "Redirect loop" — "If status not in [300,400),
/// break"); statuses outside that range, or a 3xx with no `Location`, fall
/// through to the success path.
fn is_redirect_status(status: u16) -> bool {
    (300..400).contains(&status)
}

/// 307/308 preserve method and body; every other redirect status downgrades
/// to a bodyless GET (spec.md §4.2 "Redirect loop" — "keepMethodAndData").
fn keeps_method_and_data(status: u16) -> bool {
    matches!(status, 307 | 308)
}

pub struct RedirectOutcome {
    pub response: TransportResponse,
    pub final_url: Url,
    pub final_headers: HashMap<String, Vec<String>>,
    pub redirect_urls: Vec<String>,
    pub redirect_count: u32,
}

/// Perform one logical request, following redirects up to `max_redirects`
/// hops. `host_domain` tracking for cookie selection follows the referring
/// URL of each hop rather than the original navigation's origin, matching
/// how `headers::update_headers_for_redirect` recomputes Referer per hop
/// (documented as a deliberate per-hop model in DESIGN.md).
#[allow(clippy::too_many_arguments)]
pub async fn follow(
    transport: &dyn Transport,
    cookie_jar: Option<&CookieJar>,
    initial_url: Url,
    initial_previous_url: Option<Url>,
    mut method: Method,
    mut body: Bytes,
    data_type: Option<DataType>,
    content_type_override: Option<&'static str>,
    caller_headers: &HashMap<String, Vec<String>>,
    response_type: ResponseType,
    max_redirects: u32,
    timeout: Option<Duration>,
    explicit_cookies: Option<Vec<String>>,
) -> Result<RedirectOutcome, Error> {
    let mut url = initial_url;
    let mut previous_url = initial_previous_url;
    let mut headers = caller_headers.clone();
    let mut redirect_urls = Vec::new();
    let mut redirect_count = 0u32;
    let mut hop = 0u32;
    // Whether the hop about to be built downgraded from the prior one's
    // method/body (set from the previous iteration's status, consumed when
    // building this iteration's headers below).
    let mut downgrading_to_get = false;

    loop {
        let host_domain = previous_url
            .as_ref()
            .and_then(|u| u.host_str())
            .unwrap_or_else(|| url.host_str().unwrap_or_default())
            .to_string();
        let outgoing_cookies = match &explicit_cookies {
            Some(cookies) => cookies.clone(),
            None => cookie_jar
                .map(|jar| jar.get_request_cookies(&url, &host_domain))
                .unwrap_or_default(),
        };

        let hop_headers = if hop == 0 {
            headers::build_headers(
                &headers,
                method,
                data_type,
                content_type_override,
                Some(body.len()),
                previous_url.as_ref(),
                &url,
                response_type,
                outgoing_cookies,
            )
        } else {
            let mut h = headers.clone();
            headers::update_headers_for_redirect(
                &mut h,
                previous_url
                    .as_ref()
                    .expect("previous_url is set on every hop after the first"),
                &url,
                outgoing_cookies,
                downgrading_to_get,
            );
            h
        };

        let transport_request = TransportRequest {
            method: method.as_str().to_string(),
            url: url.clone(),
            headers: hop_headers.clone(),
            body: body.clone(),
            timeout,
        };

        let transport_response = transport
            .send(transport_request)
            .await
            .map_err(|e| Error::TransportFailure {
                message: e.to_string(),
                request: None,
            })?;

        if let Some(jar) = cookie_jar {
            if let Some(set_cookies) = transport_response.headers.get("set-cookie") {
                jar.collect_cookies_from_response(&url, set_cookies.iter());
            }
        }

        let status = transport_response.status;
        let location = transport_response
            .headers
            .get("location")
            .and_then(|v| v.first())
            .cloned();

        let Some(location) = location.filter(|_| is_redirect_status(status)) else {
            return Ok(RedirectOutcome {
                response: transport_response,
                final_url: url,
                final_headers: hop_headers,
                redirect_urls,
                redirect_count,
            });
        };

        if redirect_count >= max_redirects {
            return Err(Error::ProtocolFailure {
                message: format!("exceeded maximum of {max_redirects} redirects"),
                request: None,
                response: None,
            });
        }

        let next_url = url.join(&location).map_err(|e| Error::ProtocolFailure {
            message: format!("invalid redirect location {location:?}: {e}"),
            request: None,
            response: None,
        })?;

        redirect_count += 1;
        redirect_urls.push(next_url.to_string());

        downgrading_to_get = !keeps_method_and_data(status);
        if downgrading_to_get {
            method = Method::Get;
            body = Bytes::new();
        }

        headers = hop_headers;
        previous_url = Some(url);
        url = next_url;
        hop += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookie::CookieJar;
    use async_trait::async_trait;
    use futures::stream;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedTransport {
        responses: Mutex<Vec<(u16, HashMap<String, Vec<String>>)>>,
        calls: AtomicUsize,
        seen_methods: Mutex<Vec<String>>,
        seen_bodies: Mutex<Vec<Bytes>>,
        seen_headers: Mutex<Vec<HashMap<String, Vec<String>>>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<(u16, HashMap<String, Vec<String>>)>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: AtomicUsize::new(0),
                seen_methods: Mutex::new(Vec::new()),
                seen_bodies: Mutex::new(Vec::new()),
                seen_headers: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: TransportRequest) -> std::io::Result<TransportResponse> {
            let idx = self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_methods.lock().unwrap().push(request.method.clone());
            self.seen_bodies.lock().unwrap().push(request.body.clone());
            self.seen_headers.lock().unwrap().push(request.headers.clone());
            let (status, headers) = self.responses.lock().unwrap()[idx].clone();
            Ok(TransportResponse {
                status,
                status_message: String::new(),
                headers,
                body: Box::pin(stream::iter(Vec::<std::io::Result<Bytes>>::new())),
            })
        }
    }

    fn location_headers(url: &str) -> HashMap<String, Vec<String>> {
        let mut h = HashMap::new();
        h.insert("location".to_string(), vec![url.to_string()]);
        h
    }

    #[tokio::test]
    async fn follows_302_downgrading_to_get() {
        let transport = ScriptedTransport::new(vec![
            (302, location_headers("https://example.com/next")),
            (200, HashMap::new()),
        ]);
        let jar = CookieJar::new();
        let outcome = follow(
            &transport,
            Some(&jar),
            Url::parse("https://example.com/start").unwrap(),
            None,
            Method::Post,
            Bytes::from_static(b"payload"),
            Some(DataType::Json),
            None,
            &HashMap::new(),
            ResponseType::String,
            5,
            None,
            None,
        )
        .await
        .unwrap();

        assert_eq!(outcome.response.status, 200);
        assert_eq!(outcome.redirect_count, 1);
        assert_eq!(outcome.redirect_urls, vec!["https://example.com/next".to_string()]);
        assert_eq!(*transport.seen_methods.lock().unwrap(), vec!["POST", "GET"]);
        assert_eq!(
            *transport.seen_bodies.lock().unwrap(),
            vec![Bytes::from_static(b"payload"), Bytes::new()]
        );
        let seen_headers = transport.seen_headers.lock().unwrap();
        assert_eq!(seen_headers[0].get("Content-Type").unwrap()[0], "application/json");
        assert_eq!(seen_headers[0].get("Content-Length").unwrap()[0], "7");
        assert!(!seen_headers[1].contains_key("Content-Type"));
        assert!(!seen_headers[1].contains_key("Content-Length"));
    }

    #[tokio::test]
    async fn follows_307_preserving_method_and_body() {
        let transport = ScriptedTransport::new(vec![
            (307, location_headers("https://example.com/next")),
            (200, HashMap::new()),
        ]);
        let jar = CookieJar::new();
        let outcome = follow(
            &transport,
            Some(&jar),
            Url::parse("https://example.com/start").unwrap(),
            None,
            Method::Post,
            Bytes::from_static(b"payload"),
            Some(DataType::Raw),
            None,
            &HashMap::new(),
            ResponseType::String,
            5,
            None,
            None,
        )
        .await
        .unwrap();

        assert_eq!(outcome.response.status, 200);
        assert_eq!(*transport.seen_methods.lock().unwrap(), vec!["POST", "POST"]);
        assert_eq!(
            *transport.seen_bodies.lock().unwrap(),
            vec![Bytes::from_static(b"payload"), Bytes::from_static(b"payload")]
        );
    }

    #[tokio::test]
    async fn exceeding_max_redirects_fails() {
        let transport = ScriptedTransport::new(vec![
            (302, location_headers("https://example.com/a")),
            (302, location_headers("https://example.com/b")),
        ]);
        let jar = CookieJar::new();
        let err = follow(
            &transport,
            Some(&jar),
            Url::parse("https://example.com/start").unwrap(),
            None,
            Method::Get,
            Bytes::new(),
            None,
            None,
            &HashMap::new(),
            ResponseType::String,
            1,
            None,
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::ProtocolFailure { .. }));
    }

    #[tokio::test]
    async fn relative_location_resolves_against_current_url() {
        let transport = ScriptedTransport::new(vec![
            (302, location_headers("/next")),
            (200, HashMap::new()),
        ]);
        let jar = CookieJar::new();
        let outcome = follow(
            &transport,
            Some(&jar),
            Url::parse("https://example.com/start").unwrap(),
            None,
            Method::Get,
            Bytes::new(),
            None,
            None,
            &HashMap::new(),
            ResponseType::String,
            5,
            None,
            None,
        )
        .await
        .unwrap();
        assert_eq!(outcome.final_url.as_str(), "https://example.com/next");
    }

    #[tokio::test]
    async fn follows_a_long_mixed_status_chain_including_399() {
        // spec.md §8 scenario 3: 307 -> 308 -> 301 -> 302 -> 303 -> 399 -> 200.
        // 399 is not in the conventional redirect allowlist but is still in
        // [300,400) and must be followed when it carries a Location header.
        let transport = ScriptedTransport::new(vec![
            (307, location_headers("https://abc.com/foo")),
            (308, location_headers("https://abc.com/foo/bar")),
            (301, location_headers("https://another.com?boo=hoo")),
            (302, location_headers("https://another.com/foo")),
            (303, location_headers("https://another.com/foo/bar")),
            (399, location_headers("https://another.com/foo/bar/baz?boo=hoo")),
            (200, HashMap::new()),
        ]);
        let jar = CookieJar::new();
        let outcome = follow(
            &transport,
            Some(&jar),
            Url::parse("https://abc.com/").unwrap(),
            None,
            Method::Post,
            Bytes::from_static(b"abc"),
            Some(DataType::Raw),
            None,
            &HashMap::new(),
            ResponseType::String,
            10,
            None,
            None,
        )
        .await
        .unwrap();

        assert_eq!(outcome.response.status, 200);
        assert_eq!(outcome.redirect_count, 6);
        assert_eq!(
            *transport.seen_methods.lock().unwrap(),
            vec!["POST", "POST", "GET", "GET", "GET", "GET", "GET"]
        );

        // A max_redirects of 3 cannot complete the same six-hop chain.
        let transport2 = ScriptedTransport::new(vec![
            (307, location_headers("https://abc.com/foo")),
            (308, location_headers("https://abc.com/foo/bar")),
            (301, location_headers("https://another.com?boo=hoo")),
            (302, location_headers("https://another.com/foo")),
        ]);
        let jar2 = CookieJar::new();
        let err = follow(
            &transport2,
            Some(&jar2),
            Url::parse("https://abc.com/").unwrap(),
            None,
            Method::Post,
            Bytes::from_static(b"abc"),
            Some(DataType::Raw),
            None,
            &HashMap::new(),
            ResponseType::String,
            3,
            None,
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::ProtocolFailure { .. }));
    }

    #[tokio::test]
    async fn collects_cookies_from_each_hop_before_following() {
        let mut first_headers = location_headers("https://example.com/next");
        first_headers.insert("set-cookie".to_string(), vec!["a=1".to_string()]);
        let transport = ScriptedTransport::new(vec![(302, first_headers), (200, HashMap::new())]);
        let jar = CookieJar::new();
        follow(
            &transport,
            Some(&jar),
            Url::parse("https://example.com/start").unwrap(),
            None,
            Method::Get,
            Bytes::new(),
            None,
            None,
            &HashMap::new(),
            ResponseType::String,
            5,
            None,
            None,
        )
        .await
        .unwrap();

        assert_eq!(
            jar.get_request_cookies(&Url::parse("https://example.com/next").unwrap(), "example.com"),
            vec!["a=1".to_string()]
        );
    }
}
