//! Inbound response interception.
//!
//! The pipeline stops at the first step that says so:
//! authorize, gate, decode, dump, rewrite body, rewrite `Location`, dump,
//! re-encode, rewrite headers. An error leaves the response half-rewritten;
//! callers must not forward it.

use super::{access, codec, gate, headers, location, ExchangeInfo, Filter, FilterError};
use bytes::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::Response;
use tracing::debug;

impl Filter {
    /// Rewrite an upstream response in place before it reaches the client.
    ///
    /// Mutates the status (403 on denial only), the body, `Content-Length`,
    /// `Location`, and any headers named by the response-side header rules.
    pub fn on_response<'r>(
        &self,
        info: &ExchangeInfo,
        res: &'r mut Response<Bytes>,
    ) -> Result<&'r mut Response<Bytes>, FilterError> {
        debug!(
            url = %info.url,
            action = "response",
            status = res.status().as_u16(),
            source = %info.remote_addr,
            "Response"
        );

        if !access::authorize(&info.remote_addr, &self.restricted)? {
            access::deny(res);
            return Ok(res);
        }

        if !self.force {
            let content_type = res
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());
            if !gate::should_filter(res.status(), content_type, &self.content_types) {
                debug!(
                    status = res.status().as_u16(),
                    content_type = content_type.unwrap_or_default(),
                    "... skipping"
                );
                return Ok(res);
            }
        }

        debug!("filtering");

        let relative_url = self.relative_url(&info.url);
        let decoded = codec::decode(res.body(), res.headers());

        let request_id = self
            .dump
            .as_ref()
            .filter(|sink| sink.accepts(&relative_url))
            .map(|sink| sink.dump("", &relative_url, res.headers(), &decoded));

        let body = self.rewrite_text(&relative_url, decoded, &self.response.replace);
        debug!(
            request_id = request_id.as_deref().unwrap_or_default(),
            "will rewrite content"
        );

        location::rewrite_location(res.headers_mut(), &relative_url, &self.response.replace);

        if let (Some(sink), Some(id)) = (&self.dump, &request_id) {
            sink.dump(id, &relative_url, res.headers(), &body);
        }

        let encoded = codec::encode(body, res.headers())?;
        codec::set_content_length(res.headers_mut(), encoded.len());
        *res.body_mut() = encoded;

        if !self.response.header.is_empty() {
            headers::rewrite(res.headers_mut(), &self.response.header);
        }

        Ok(res)
    }
}
