//! Proxy transport hosting the filter.
//!
//! # Module Structure
//!
//! - `server` - ProxyServer struct and accept loop
//! - `forwarding` - buffering, interception and upstream forwarding
//! - `client` - pooled upstream HTTP client
//! - `headers` - hop-by-hop header handling
//! - `tls` - TLS termination for the HTTPS listener

mod client;
mod forwarding;
mod headers;
mod server;
mod tls;

pub use client::{create_http_client, HttpClient};
pub use forwarding::{collect_body, error_response, proxy_request};
pub use server::ProxyServer;
