//! Errors raised while intercepting a single exchange.
//!
//! None of these are fatal to the process: each one aborts only the
//! exchange it was raised for, and the transport decides what the client sees.

use hyper::http::uri::InvalidUriParts;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FilterError {
    /// The client's remote address is not `ip:port`.
    #[error("remote address '{addr}' is not ip:port")]
    AddressParse { addr: String },

    /// A request or response body could not be buffered.
    #[error("failed to read body: {0}")]
    BodyRead(String),

    /// Re-compressing a rewritten body failed.
    #[error("failed to encode body: {0}")]
    Codec(#[from] std::io::Error),

    /// The request target could not be pointed at the upstream.
    #[error("failed to rewrite request target: {0}")]
    Target(#[from] InvalidUriParts),
}
