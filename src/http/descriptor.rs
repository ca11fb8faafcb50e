use super::body::RequestBody;
use crate::cookie::CookieJar;
use crate::support::Logger;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// HTTP method (spec.md §3 "Request Descriptor"); default `Get`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Default for Method {
    fn default() -> Self {
        Method::Get
    }
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

/// Data type ∈ {raw, json, form, binary, stream} (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Raw,
    Json,
    Form,
    Binary,
    Stream,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Raw => "raw",
            DataType::Json => "json",
            DataType::Form => "form",
            DataType::Binary => "binary",
            DataType::Stream => "stream",
        }
    }
}

/// Response type ∈ {string, binary, json, stream} (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    String,
    Binary,
    Json,
    Stream,
}

impl Default for ResponseType {
    fn default() -> Self {
        ResponseType::String
    }
}

/// One logical HTTP call (spec.md §3 "Request Descriptor").
pub struct RequestDescriptor {
    pub url: url::Url,
    /// Previous URL, used to derive Referer/Origin on the first hop.
    pub previous_url: Option<url::Url>,
    pub method: Method,
    pub data: Option<RequestBody>,
    pub response_type: ResponseType,
    pub headers: HashMap<String, Vec<String>>,
    /// Explicit cookies to send, bypassing jar selection.
    pub explicit_cookies: Option<Vec<String>>,
    pub cookie_jar: Option<Arc<CookieJar>>,
    pub timeout: Option<Duration>,
    pub abort: Option<CancellationToken>,
    pub max_redirects: u32,
    pub logger: Option<Arc<dyn Logger>>,
    /// Secret strings to redact from logged/errored request snapshots.
    pub hide_secrets: Vec<String>,
    pub validate_status: Option<Arc<dyn Fn(u16) -> bool + Send + Sync>>,
    pub validate_json: Option<Arc<dyn Fn(&serde_json::Value) -> bool + Send + Sync>>,
    pub assert_non_empty_response: bool,
}

impl RequestDescriptor {
    pub fn new(url: url::Url) -> Self {
        Self {
            url,
            previous_url: None,
            method: Method::default(),
            data: None,
            response_type: ResponseType::default(),
            headers: HashMap::new(),
            explicit_cookies: None,
            cookie_jar: None,
            timeout: None,
            abort: None,
            max_redirects: 5,
            logger: None,
            hide_secrets: Vec::new(),
            validate_status: None,
            validate_json: None,
            assert_non_empty_response: false,
        }
    }
}
