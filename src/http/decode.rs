use crate::error::Error;
use bytes::Bytes;
use std::io::Read;

/// Decode a response body per its `Content-Encoding` (spec.md §4.2
/// "Response materialization"). `gzip`, `br`, and `deflate` are decoded
/// through the respective stream decoder; any other non-empty value is a
/// `ProtocolFailure`.
pub fn decode_body(bytes: Bytes, content_encoding: Option<&str>) -> Result<Bytes, Error> {
    match content_encoding {
        None => Ok(bytes),
        Some(enc) => match enc.to_ascii_lowercase().as_str() {
            "gzip" => decode_gzip(bytes),
            "deflate" => decode_deflate(bytes),
            "br" => decode_brotli(bytes),
            other => Err(Error::ProtocolFailure {
                message: format!("unrecognized Content-Encoding: {other}"),
                request: None,
                response: None,
            }),
        },
    }
}

fn protocol_error(context: &str, e: impl std::fmt::Display) -> Error {
    Error::ProtocolFailure {
        message: format!("{context}: {e}"),
        request: None,
        response: None,
    }
}

fn decode_gzip(bytes: Bytes) -> Result<Bytes, Error> {
    let mut decoder = flate2::read::GzDecoder::new(&bytes[..]);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| protocol_error("gzip decode failed", e))?;
    Ok(Bytes::from(out))
}

fn decode_deflate(bytes: Bytes) -> Result<Bytes, Error> {
    let mut decoder = flate2::read::DeflateDecoder::new(&bytes[..]);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| protocol_error("deflate decode failed", e))?;
    Ok(Bytes::from(out))
}

fn decode_brotli(bytes: Bytes) -> Result<Bytes, Error> {
    let mut decoder = brotli_decompressor::Decompressor::new(&bytes[..], 4096);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| protocol_error("brotli decode failed", e))?;
    Ok(Bytes::from(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn gzip_round_trip() {
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"abc123456").unwrap();
        let compressed = encoder.finish().unwrap();
        let out = decode_body(Bytes::from(compressed), Some("gzip")).unwrap();
        assert_eq!(out, Bytes::from_static(b"abc123456"));
    }

    #[test]
    fn deflate_round_trip() {
        let mut encoder = flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"abc123456").unwrap();
        let compressed = encoder.finish().unwrap();
        let out = decode_body(Bytes::from(compressed), Some("deflate")).unwrap();
        assert_eq!(out, Bytes::from_static(b"abc123456"));
    }

    #[test]
    fn no_encoding_passes_through() {
        let out = decode_body(Bytes::from_static(b"plain"), None).unwrap();
        assert_eq!(out, Bytes::from_static(b"plain"));
    }

    #[test]
    fn unknown_encoding_errors() {
        let err = decode_body(Bytes::from_static(b"x"), Some("xyz")).unwrap_err();
        assert!(matches!(err, Error::ProtocolFailure { .. }));
    }
}
