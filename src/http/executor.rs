//! The HTTP Request Executor entry point (spec.md §4.2): one call, possibly
//! several redirect hops, ending in a materialized [`super::Response`] or a
//! typed [`Error`] carrying the sanitized request/response snapshots seen so
//! far.

use super::body::{format_body, FormattedBody};
use super::decode::decode_body;
use super::descriptor::{DataType, RequestDescriptor};
use super::redirect::follow;
use super::response::materialize;
use super::secrets::{redact_formatted, redact_original};
use super::{RequestSnapshot, Response, ResponseData, ResponseSnapshot};
use crate::error::{Error, Result};
use crate::transport::{default_client, ReqwestTransport, Transport};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use std::collections::HashMap;
use tokio::io::AsyncReadExt;

/// Fully drain a formatted body into `Bytes`. A `Stream` data type is piped
/// once into the outgoing request; re-sending it across a 307/308 redirect
/// hop would require buffering it anyway, so it is buffered up front here
/// (streaming request uploads with chunked retry are out of scope).
async fn drain_formatted_body(body: FormattedBody) -> Result<Bytes> {
    match body {
        FormattedBody::Bytes(bytes) => Ok(bytes),
        FormattedBody::Stream(mut reader) => {
            let mut buf = Vec::new();
            reader
                .read_to_end(&mut buf)
                .await
                .map_err(|e| Error::invalid_input(format!("failed to read request stream: {e}")))?;
            Ok(Bytes::from(buf))
        }
    }
}

async fn drain_response_body(
    mut body: futures::stream::BoxStream<'static, std::result::Result<Bytes, std::io::Error>>,
) -> Result<Bytes> {
    let mut out = BytesMut::new();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| Error::TransportFailure {
            message: e.to_string(),
            request: None,
        })?;
        out.extend_from_slice(&chunk);
    }
    Ok(out.freeze())
}

fn content_encoding(headers: &HashMap<String, Vec<String>>) -> Option<String> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-encoding"))
        .and_then(|(_, v)| v.first())
        .cloned()
}

/// Perform one logical HTTP request (spec.md §4.2) against `transport`.
/// Consumes the descriptor: the request body may be a single-use stream.
/// Pulled out of [`http_request`] so tests can supply a fake transport
/// without duplicating this orchestration.
pub(crate) async fn execute(transport: &dyn Transport, descriptor: RequestDescriptor) -> Result<Response> {
    let RequestDescriptor {
        url,
        previous_url,
        method,
        data,
        response_type,
        headers: caller_headers,
        explicit_cookies,
        cookie_jar,
        timeout,
        abort,
        max_redirects,
        logger,
        hide_secrets,
        validate_status,
        validate_json,
        assert_non_empty_response,
    } = descriptor;

    let data_type = data.as_ref().map(|d| d.data_type());
    let formatted = format_body(data)?;

    let (body_bytes, content_type_override, original_data, formatted_data) = match formatted {
        Some(f) => {
            let bytes = drain_formatted_body(f.body).await?;
            (bytes, f.content_type, f.original_data, f.formatted_data)
        }
        None => (Bytes::new(), None, String::new(), String::new()),
    };

    let redacted_original = redact_original(&original_data, data_type.unwrap_or(DataType::Raw), &hide_secrets);
    let redacted_formatted = redact_formatted(&formatted_data, data_type.unwrap_or(DataType::Raw), &hide_secrets);

    let snapshot = |headers: &HashMap<String, Vec<String>>, cookies: &[String]| RequestSnapshot {
        method: method.as_str().to_string(),
        url: url.to_string(),
        timeout,
        data_type: data_type.map(|d| d.as_str().to_string()).unwrap_or_default(),
        original_data: redacted_original.clone(),
        formatted_data: redacted_formatted.clone(),
        headers: headers.clone(),
        cookies: cookies.to_vec(),
    };

    if let Some(logger) = &logger {
        logger.debug(&format!("http_request {} {}", method.as_str(), url));
    }

    if let Some(token) = &abort {
        if token.is_cancelled() {
            return Err(Error::TransportFailure {
                message: "request aborted before it was sent".to_string(),
                request: Some(Box::new(snapshot(&caller_headers, &[]))),
            });
        }
    }

    let send = follow(
        transport,
        cookie_jar.as_deref(),
        url.clone(),
        previous_url.clone(),
        method,
        body_bytes,
        data_type,
        content_type_override,
        &caller_headers,
        response_type,
        max_redirects,
        timeout,
        explicit_cookies.clone(),
    );

    let outcome = match &abort {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    return Err(Error::TransportFailure {
                        message: "request aborted".to_string(),
                        request: Some(Box::new(snapshot(&caller_headers, &[]))),
                    });
                }
                result = send => result,
            }
        }
        None => send.await,
    };

    let outcome = outcome.map_err(|e| {
        e.with_request(snapshot(&caller_headers, explicit_cookies.as_deref().unwrap_or_default()))
    })?;

    let response_snapshot = ResponseSnapshot {
        status: Some(outcome.response.status),
        status_message: Some(outcome.response.status_message.clone()),
        final_url: Some(outcome.final_url.to_string()),
        redirect_urls: outcome.redirect_urls.clone(),
        redirect_count: outcome.redirect_count,
        headers: outcome.response.headers.clone(),
    };

    let status = outcome.response.status;
    let status_message = outcome.response.status_message.clone();
    let response_headers = outcome.response.headers.clone();

    let raw_bytes = drain_response_body(outcome.response.body).await.map_err(|e| {
        e.with_request(snapshot(&outcome.final_headers, &[]))
            .with_response(response_snapshot.clone())
    })?;

    let decoded = decode_body(raw_bytes, content_encoding(&response_headers).as_deref()).map_err(|e| {
        e.with_request(snapshot(&outcome.final_headers, &[]))
            .with_response(response_snapshot.clone())
    })?;

    if let Some(validator) = &validate_status {
        if !validator(status) {
            return Err(Error::ValidationFailure {
                message: format!("response status {status} failed validation"),
                request: Some(Box::new(snapshot(&outcome.final_headers, &[]))),
                response: Some(Box::new(response_snapshot)),
            });
        }
    }

    if assert_non_empty_response && decoded.is_empty() {
        return Err(Error::ValidationFailure {
            message: "response body was empty".to_string(),
            request: Some(Box::new(snapshot(&outcome.final_headers, &[]))),
            response: Some(Box::new(response_snapshot)),
        });
    }

    let data = materialize(response_type, decoded).map_err(|e| {
        e.with_request(snapshot(&outcome.final_headers, &[]))
            .with_response(response_snapshot.clone())
    })?;

    if let Some(validator) = &validate_json {
        if let ResponseData::Json(value) = &data {
            if !validator(value) {
                return Err(Error::ValidationFailure {
                    message: "response JSON failed validation".to_string(),
                    request: Some(Box::new(snapshot(&outcome.final_headers, &[]))),
                    response: Some(Box::new(response_snapshot)),
                });
            }
        }
    }

    let response_cookies: HashMap<String, String> = response_headers
        .get("set-cookie")
        .into_iter()
        .flatten()
        .filter_map(|raw| raw.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    Ok(Response {
        status,
        status_message,
        final_url: outcome.final_url.to_string(),
        redirect_urls: outcome.redirect_urls,
        redirect_count: outcome.redirect_count,
        cookies: response_cookies,
        headers: response_headers,
        data,
        request: snapshot(&outcome.final_headers, &[]),
    })
}

/// Perform one logical HTTP request over a shared `reqwest`-backed
/// transport. This is the library's public entry point; [`crate::session`]
/// calls [`execute`] directly against its own pooled transport instead.
pub async fn http_request(descriptor: RequestDescriptor) -> Result<Response> {
    let transport = ReqwestTransport::new(default_client());
    execute(&transport, descriptor).await
}
