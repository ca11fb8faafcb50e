use super::descriptor::ResponseType;
use crate::error::Error;
use bytes::Bytes;
use futures::stream::{self, BoxStream};

/// Materialized response data, tagged per response type (spec.md §3
/// "response type" / §9 "tagged unions keyed by ... response type").
pub enum ResponseData {
    Text(String),
    Binary(Bytes),
    Json(serde_json::Value),
    Stream(BoxStream<'static, std::result::Result<Bytes, std::io::Error>>),
}

impl std::fmt::Debug for ResponseData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseData::Text(s) => f.debug_tuple("Text").field(s).finish(),
            ResponseData::Binary(b) => f.debug_tuple("Binary").field(&b.len()).finish(),
            ResponseData::Json(v) => f.debug_tuple("Json").field(v).finish(),
            ResponseData::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl ResponseData {
    pub fn is_empty(&self) -> bool {
        match self {
            ResponseData::Text(s) => s.is_empty(),
            ResponseData::Binary(b) => b.is_empty(),
            ResponseData::Json(_) => false,
            ResponseData::Stream(_) => false,
        }
    }
}

/// Turn fully-drained, already-decoded bytes into the response type the
/// caller asked for (spec.md §4.2 "Response materialization"). The stream
/// case wraps the already-drained bytes as a single-chunk stream: the
/// executor needs the whole body in hand anyway to run decompression and
/// the `assertNonEmptyResponse`/`validateJson` checks, so there is no
/// incremental-streaming path to preserve past that point (documented as a
/// deliberate simplification in DESIGN.md).
pub fn materialize(response_type: ResponseType, bytes: Bytes) -> Result<ResponseData, Error> {
    match response_type {
        ResponseType::Binary => Ok(ResponseData::Binary(bytes)),
        ResponseType::Stream => {
            let chunk: std::result::Result<Bytes, std::io::Error> = Ok(bytes);
            Ok(ResponseData::Stream(Box::pin(stream::iter(vec![chunk]))))
        }
        ResponseType::String => {
            let text = String::from_utf8_lossy(&bytes).into_owned();
            Ok(ResponseData::Text(text))
        }
        ResponseType::Json => {
            let text = String::from_utf8_lossy(&bytes).into_owned();
            serde_json::from_str(&text).map(ResponseData::Json).map_err(|_| Error::ValidationFailure {
                message: "Unable to parse response data as JSON".to_string(),
                request: None,
                response: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_materialization() {
        let data = materialize(ResponseType::String, Bytes::from_static(b"hello")).unwrap();
        match data {
            ResponseData::Text(s) => assert_eq!(s, "hello"),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn json_materialization_success() {
        let data = materialize(ResponseType::Json, Bytes::from_static(b"{\"a\":1}")).unwrap();
        match data {
            ResponseData::Json(v) => assert_eq!(v["a"], 1),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn json_materialization_failure() {
        let err = materialize(ResponseType::Json, Bytes::from_static(b"not json")).unwrap_err();
        assert!(matches!(err, Error::ValidationFailure { .. }));
    }

    #[test]
    fn binary_materialization() {
        let data = materialize(ResponseType::Binary, Bytes::from_static(b"\x00\x01")).unwrap();
        match data {
            ResponseData::Binary(b) => assert_eq!(b.as_ref(), b"\x00\x01"),
            _ => panic!("wrong variant"),
        }
    }
}
