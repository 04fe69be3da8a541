//! Buffer, intercept, forward, intercept, reply.
//!
//! This module hosts the two filter interceptors around a pooled upstream
//! call. Bodies are collected in full before any rewriting happens.

use super::client::HttpClient;
use super::headers::{append_forwarded_for, strip_hop_by_hop};
use crate::filter::access::FORBIDDEN_BODY;
use crate::filter::{ExchangeInfo, Filter, FilterError};
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Request, Response, StatusCode};
use std::net::SocketAddr;
use tracing::{debug, error};

/// Helper function to create an error response.
pub fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let body = format!(r#"{{"error": "{message}"}}"#);
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// The fixed denial sent when the client address cannot be trusted.
fn forbidden_response() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(FORBIDDEN_BODY.as_bytes())));
    *response.status_mut() = StatusCode::FORBIDDEN;
    response
}

/// Buffer a whole body into memory.
pub async fn collect_body<B>(body: B) -> Result<Bytes, FilterError>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    body.collect()
        .await
        .map(|collected| collected.to_bytes())
        .map_err(|e| FilterError::BodyRead(e.to_string()))
}

/// Proxy one client request through the filter to the upstream and back.
pub async fn proxy_request<B>(
    filter: &Filter,
    http_client: &HttpClient,
    req: Request<B>,
    remote_addr: SocketAddr,
) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let (mut parts, body) = req.into_parts();
    let body = match collect_body(body).await {
        Ok(body) => body,
        Err(e) => {
            error!(source = %remote_addr, error = %e, "Failed to read request body");
            return error_response(StatusCode::BAD_REQUEST, "Failed to read request body");
        }
    };

    strip_hop_by_hop(&mut parts.headers);
    append_forwarded_for(&mut parts.headers, remote_addr.ip());

    let remote = remote_addr.to_string();
    let mut req = Request::from_parts(parts, body);
    if let Err(e) = filter.on_request(&mut req, &remote) {
        error!(source = %remote, error = %e, "Failed to rewrite request");
        return error_response(StatusCode::BAD_REQUEST, "Failed to rewrite request");
    }

    let info = ExchangeInfo::new(remote, req.uri().clone());
    debug!(url = %info.url, "Forwarding to upstream");

    let upstream_response = match http_client.request(req.map(Full::new)).await {
        Ok(response) => response,
        Err(e) => {
            error!(url = %info.url, error = %e, "Failed to forward request to upstream");
            return error_response(StatusCode::BAD_GATEWAY, "Bad Gateway");
        }
    };

    let (mut parts, body) = upstream_response.into_parts();
    let body = match collect_body(body).await {
        Ok(body) => body,
        Err(e) => {
            error!(url = %info.url, error = %e, "Failed to collect upstream response body");
            return error_response(StatusCode::BAD_GATEWAY, "Failed to read upstream response");
        }
    };
    strip_hop_by_hop(&mut parts.headers);

    let mut response = Response::from_parts(parts, body);
    match filter.on_response(&info, &mut response) {
        Ok(_) => response.map(Full::new),
        Err(e @ FilterError::AddressParse { .. }) => {
            // Unknown client origin is refused, never let through
            error!(source = %info.remote_addr, error = %e, "Refusing response");
            forbidden_response()
        }
        Err(e) => {
            error!(url = %info.url, error = %e, "Failed to rewrite response");
            error_response(StatusCode::BAD_GATEWAY, "Failed to rewrite upstream response")
        }
    }
}
