use super::descriptor::DataType;
use crate::error::{Error, Result};
use bytes::Bytes;
use percent_encoding::{AsciiSet, CONTROLS};
use std::collections::HashMap;
use std::pin::Pin;
use tokio::io::AsyncRead;

/// A form field's value: a bare string, or repeated values for the same
/// key (spec.md §4.2 "form" body formatting — "repeated keys for list
/// values").
#[derive(Debug, Clone)]
pub enum FormValue {
    Single(String),
    Multiple(Vec<String>),
}

/// The request body, tagged by data type (spec.md §9 — tagged union keyed
/// by data type rather than a type-level conditional type).
pub enum RequestBody {
    Raw(Option<String>),
    Json(serde_json::Value),
    Form(HashMap<String, FormValue>),
    Binary(Bytes),
    Stream(Pin<Box<dyn AsyncRead + Send>>),
}

impl RequestBody {
    pub fn data_type(&self) -> DataType {
        match self {
            RequestBody::Raw(_) => DataType::Raw,
            RequestBody::Json(_) => DataType::Json,
            RequestBody::Form(_) => DataType::Form,
            RequestBody::Binary(_) => DataType::Binary,
            RequestBody::Stream(_) => DataType::Stream,
        }
    }
}

/// The result of formatting a [`RequestBody`] for the wire, plus the
/// loggable representations needed for the echoed request snapshot and
/// secret redaction (spec.md §4.2 "Secret redaction").
pub enum FormattedBody {
    Bytes(Bytes),
    Stream(Pin<Box<dyn AsyncRead + Send>>),
}

pub struct FormattedRequest {
    pub body: FormattedBody,
    /// The content-type implied by the data type, if any.
    pub content_type: Option<&'static str>,
    /// Loggable view of the raw input (`[BINARY]`/`[STREAM]` for opaque
    /// bodies).
    pub original_data: String,
    /// Loggable view of the formatted wire body.
    pub formatted_data: String,
}

const FORM_COMPONENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'?')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'=')
    .add(b'&')
    .add(b'+')
    .add(b'%');

pub(crate) fn urlencode(s: &str) -> String {
    percent_encoding::utf8_percent_encode(s, FORM_COMPONENT)
        .to_string()
        .replace("%20", "+")
}

fn encode_form(fields: &HashMap<String, FormValue>) -> String {
    let mut pairs = Vec::new();
    for (key, value) in fields {
        match value {
            FormValue::Single(v) => pairs.push(format!("{}={}", urlencode(key), urlencode(v))),
            FormValue::Multiple(values) => {
                for v in values {
                    pairs.push(format!("{}={}", urlencode(key), urlencode(v)));
                }
            }
        }
    }
    pairs.join("&")
}

/// Format a request body for the wire (spec.md §4.2 "Body formatting by
/// data type"). Consumes the body since a stream cannot be cloned.
pub fn format_body(data: Option<RequestBody>) -> Result<Option<FormattedRequest>> {
    let Some(data) = data else {
        return Ok(None);
    };

    let formatted = match data {
        RequestBody::Stream(stream) => FormattedRequest {
            body: FormattedBody::Stream(stream),
            content_type: None,
            original_data: "[STREAM]".to_string(),
            formatted_data: "[STREAM]".to_string(),
        },
        RequestBody::Binary(bytes) => {
            let rendered = "[BINARY]".to_string();
            FormattedRequest {
                body: FormattedBody::Bytes(bytes),
                content_type: Some("application/octet-stream"),
                original_data: rendered.clone(),
                formatted_data: rendered,
            }
        }
        RequestBody::Raw(raw) => {
            let s = raw.unwrap_or_default();
            FormattedRequest {
                body: FormattedBody::Bytes(Bytes::from(s.clone().into_bytes())),
                content_type: None,
                original_data: s.clone(),
                formatted_data: s,
            }
        }
        RequestBody::Json(value) => {
            if value.is_null() {
                FormattedRequest {
                    body: FormattedBody::Bytes(Bytes::new()),
                    content_type: Some("application/json"),
                    original_data: String::new(),
                    formatted_data: String::new(),
                }
            } else {
                let encoded = serde_json::to_string(&value).map_err(|e| {
                    Error::invalid_input(format!("failed to encode JSON body: {e}"))
                })?;
                FormattedRequest {
                    body: FormattedBody::Bytes(Bytes::from(encoded.clone().into_bytes())),
                    content_type: Some("application/json"),
                    original_data: encoded.clone(),
                    formatted_data: encoded,
                }
            }
        }
        RequestBody::Form(fields) => {
            let encoded = encode_form(&fields);
            let original = fields
                .iter()
                .map(|(k, v)| match v {
                    FormValue::Single(s) => format!("{k}={s}"),
                    FormValue::Multiple(vs) => format!("{k}={}", vs.join(",")),
                })
                .collect::<Vec<_>>()
                .join("&");
            FormattedRequest {
                body: FormattedBody::Bytes(Bytes::from(encoded.clone().into_bytes())),
                content_type: Some("application/x-www-form-urlencoded"),
                original_data: original,
                formatted_data: encoded,
            }
        }
    };

    Ok(Some(formatted))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_string_passes_through() {
        let out = format_body(Some(RequestBody::Raw(Some("hello".into()))))
            .unwrap()
            .unwrap();
        assert_eq!(out.formatted_data, "hello");
        assert!(out.content_type.is_none());
    }

    #[test]
    fn raw_undefined_becomes_empty_string() {
        let out = format_body(Some(RequestBody::Raw(None))).unwrap().unwrap();
        assert_eq!(out.formatted_data, "");
    }

    #[test]
    fn json_undefined_becomes_empty_string() {
        let out = format_body(Some(RequestBody::Json(serde_json::Value::Null)))
            .unwrap()
            .unwrap();
        assert_eq!(out.formatted_data, "");
    }

    #[test]
    fn json_encodes_value() {
        let out = format_body(Some(RequestBody::Json(serde_json::json!({"a": 1}))))
            .unwrap()
            .unwrap();
        assert_eq!(out.formatted_data, r#"{"a":1}"#);
        assert_eq!(out.content_type, Some("application/json"));
    }

    #[test]
    fn form_urlencodes_with_repeated_keys() {
        let mut fields = HashMap::new();
        fields.insert(
            "tags".to_string(),
            FormValue::Multiple(vec!["a".into(), "b c".into()]),
        );
        let out = format_body(Some(RequestBody::Form(fields))).unwrap().unwrap();
        assert!(out.formatted_data.contains("tags=a"));
        assert!(out.formatted_data.contains("tags=b+c"));
        assert_eq!(out.content_type, Some("application/x-www-form-urlencoded"));
    }

    #[test]
    fn binary_renders_as_placeholder() {
        let out = format_body(Some(RequestBody::Binary(Bytes::from_static(b"\x00\x01"))))
            .unwrap()
            .unwrap();
        assert_eq!(out.original_data, "[BINARY]");
        assert_eq!(out.formatted_data, "[BINARY]");
    }

    #[test]
    fn no_body_is_none() {
        assert!(format_body(None).unwrap().is_none());
    }
}
