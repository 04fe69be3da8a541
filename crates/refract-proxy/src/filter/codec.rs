//! Transparent gzip transcoding of message bodies.
//!
//! Bodies are decoded before rewriting and re-encoded afterwards with the
//! same `Content-Encoding`, so the rule engine only ever sees plain bytes.
//! The stored `Content-Length` is never trusted once a body has been touched.

use super::FilterError;
use bytes::Bytes;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use hyper::header::{HeaderMap, HeaderValue, CONTENT_ENCODING, CONTENT_LENGTH};
use std::borrow::Cow;
use std::io::{Read, Write};
use tracing::error;

/// Whether the headers declare a gzip-encoded body.
pub fn is_gzip(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().eq_ignore_ascii_case("gzip"))
        .unwrap_or(false)
}

/// Decode a body according to its `Content-Encoding`.
///
/// Non-gzip bodies are borrowed through untouched. A gzip body that fails to
/// decompress is logged and replaced by an empty body instead of failing the
/// whole exchange.
pub fn decode<'a>(body: &'a [u8], headers: &HeaderMap) -> Cow<'a, [u8]> {
    if !is_gzip(headers) {
        return Cow::Borrowed(body);
    }

    let mut decoder = GzDecoder::new(body);
    let mut decoded = Vec::new();
    match decoder.read_to_end(&mut decoded) {
        Ok(_) => Cow::Owned(decoded),
        Err(e) => {
            error!(error = %e, "gzip decompression failed, continuing with empty body");
            Cow::Owned(Vec::new())
        }
    }
}

/// Encode a body according to its `Content-Encoding`.
///
/// The gzip stream is finished before returning so the byte length is final.
pub fn encode(body: Vec<u8>, headers: &HeaderMap) -> Result<Bytes, FilterError> {
    if !is_gzip(headers) {
        return Ok(Bytes::from(body));
    }

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&body)?;
    let compressed = encoder.finish()?;
    Ok(Bytes::from(compressed))
}

/// Overwrite `Content-Length` with the length of the body actually sent.
pub fn set_content_length(headers: &mut HeaderMap, len: usize) {
    headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
}
