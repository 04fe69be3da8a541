//! Outbound request interception.

use super::{codec, headers, Filter, FilterError};
use bytes::Bytes;
use hyper::header::HOST;
use hyper::http::uri::{PathAndQuery, Scheme};
use hyper::{Request, Uri};
use tracing::debug;

impl Filter {
    /// Point a buffered client request at the upstream and rewrite it, in place.
    ///
    /// Mutates the URI (scheme forced to `http`, upstream authority), the
    /// `Host` header, the body and `Content-Length` when a body is present,
    /// and any headers named by the request-side header rules.
    pub fn on_request<'r>(
        &self,
        req: &'r mut Request<Bytes>,
        remote_addr: &str,
    ) -> Result<&'r mut Request<Bytes>, FilterError> {
        debug!(url = %req.uri(), action = "request", source = %remote_addr, "Request");

        let mut parts = req.uri().clone().into_parts();
        parts.scheme = Some(Scheme::HTTP);
        parts.authority = Some(self.upstream.authority.clone());
        if parts.path_and_query.is_none() {
            parts.path_and_query = Some(PathAndQuery::from_static("/"));
        }
        *req.uri_mut() = Uri::from_parts(parts)?;
        req.headers_mut().insert(HOST, self.upstream.host.clone());

        debug!(
            method = %req.method(),
            url = %req.uri(),
            headers = ?req.headers(),
            "Request received"
        );

        if !req.body().is_empty() {
            let relative_url = self.relative_url(req.uri());
            let decoded = codec::decode(req.body(), req.headers());

            if let Some(sink) = self.dump.as_ref().filter(|s| s.accepts(&relative_url)) {
                sink.dump_request(&relative_url, req.headers(), &decoded);
            }

            let body = self.rewrite_text(&relative_url, decoded, &self.request.replace);
            let encoded = codec::encode(body, req.headers())?;
            codec::set_content_length(req.headers_mut(), encoded.len());
            *req.body_mut() = encoded;
        }

        if !self.request.header.is_empty() {
            headers::rewrite(req.headers_mut(), &self.request.header);
        }

        Ok(req)
    }
}
