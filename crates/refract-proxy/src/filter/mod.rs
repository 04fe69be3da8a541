//! Request/response interception and rewriting.
//!
//! A [`Filter`] is built once from configuration and shared read-only by
//! every connection. The transport calls [`Filter::on_request`] before
//! forwarding a request upstream and [`Filter::on_response`] before handing
//! the upstream's answer back to the client. Both mutate the message in place.
//!
//! # Module Structure
//!
//! - `codec` - gzip transcoding and `Content-Length` recomputation
//! - `rules` - replace/header rule types and the literal rule engine
//! - `access` - CIDR allow-list with loopback bypass
//! - `gate` - status/content-type eligibility
//! - `headers` - conditional header injection
//! - `location` - redirect `Location` rewriting
//! - `request` - outbound request interceptor
//! - `response` - inbound response interceptor

pub mod access;
pub mod codec;
mod error;
pub mod gate;
pub mod headers;
pub mod location;
mod request;
mod response;
pub mod rules;

pub use error::FilterError;
pub use rules::{HeaderRule, ReplaceRule, RuleSet};

use crate::config::Config;
use crate::dump::{DumpSink, FolderDump};
use anyhow::Context;
use hyper::header::HeaderValue;
use hyper::http::uri::Authority;
use hyper::Uri;
use ipnet::IpNet;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::warn;

/// Per-exchange facts the response side needs that a `Response` does not carry.
#[derive(Debug, Clone)]
pub struct ExchangeInfo {
    /// Client address as `ip:port`.
    pub remote_addr: String,
    /// Request URL as forwarded upstream.
    pub url: Uri,
}

impl ExchangeInfo {
    pub fn new(remote_addr: impl Into<String>, url: Uri) -> Self {
        Self {
            remote_addr: remote_addr.into(),
            url,
        }
    }
}

/// The single upstream a filter points at.
#[derive(Debug, Clone)]
struct Upstream {
    /// Configured base URL without trailing slash, stripped to get relative URLs.
    base: String,
    authority: Authority,
    host: HeaderValue,
}

impl Upstream {
    fn parse(url: &str) -> Result<Self, anyhow::Error> {
        let uri: Uri = url
            .parse()
            .with_context(|| format!("invalid upstream url '{url}'"))?;
        let authority = uri
            .authority()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("upstream url '{url}' has no host"))?;
        if uri.scheme_str() != Some("http") {
            warn!(
                upstream = %url,
                "upstream scheme is not http; requests are always forwarded over plain http"
            );
        }
        let host = HeaderValue::from_str(authority.as_str())
            .with_context(|| format!("invalid upstream host '{authority}'"))?;

        Ok(Self {
            base: url.trim_end_matches('/').to_string(),
            authority,
            host,
        })
    }
}

/// Immutable rewriting configuration for one upstream.
pub struct Filter {
    upstream: Upstream,
    force: bool,
    restricted: Vec<IpNet>,
    content_types: Vec<String>,
    request: RuleSet,
    response: RuleSet,
    dump: Option<Arc<dyn DumpSink>>,
}

impl Filter {
    /// A filter for `upstream_url` with no rules, no restriction and `text/html` gating.
    pub fn new(upstream_url: &str) -> Result<Self, anyhow::Error> {
        Ok(Self {
            upstream: Upstream::parse(upstream_url)?,
            force: false,
            restricted: Vec::new(),
            content_types: vec!["text/html".to_string()],
            request: RuleSet::default(),
            response: RuleSet::default(),
            dump: None,
        })
    }

    /// Build a filter from a validated configuration.
    pub fn from_config(config: &Config) -> Result<Self, anyhow::Error> {
        let request = RuleSet::compile(&config.request).context("invalid request rules")?;
        let response = RuleSet::compile(&config.response).context("invalid response rules")?;

        let mut filter = Self::new(&config.upstream.url)?
            .with_force(config.force)
            .with_restricted(access::parse_networks(&config.restricted)?)
            .with_content_types(config.content_types.clone())
            .with_request_rules(request)
            .with_response_rules(response);

        if let Some(dump) = config.dump.as_ref().filter(|d| d.is_enabled()) {
            let urls = rules::compile_url_patterns(&dump.urls).context("invalid dump urls")?;
            let sink = FolderDump::new(dump.folder_or_default())?.with_urls(urls);
            filter = filter.with_dump(Arc::new(sink));
        }

        Ok(filter)
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_restricted(mut self, restricted: Vec<IpNet>) -> Self {
        self.restricted = restricted;
        self
    }

    pub fn with_content_types(mut self, content_types: Vec<String>) -> Self {
        self.content_types = content_types;
        self
    }

    pub fn with_request_rules(mut self, rules: RuleSet) -> Self {
        self.request = rules;
        self
    }

    pub fn with_response_rules(mut self, rules: RuleSet) -> Self {
        self.response = rules;
        self
    }

    pub fn with_dump(mut self, sink: Arc<dyn DumpSink>) -> Self {
        self.dump = Some(sink);
        self
    }

    pub fn upstream_url(&self) -> &str {
        &self.upstream.base
    }

    /// The request URL with the upstream base stripped, used to scope rules.
    ///
    /// Falls back to the path and query when the URL does not start with the
    /// configured base (e.g. a base with a path prefix the client didn't use).
    pub fn relative_url(&self, url: &Uri) -> String {
        let full = url.to_string();
        match full.strip_prefix(&self.upstream.base) {
            Some(relative) => relative.to_string(),
            None => url
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| "/".to_string()),
        }
    }

    /// Run `rules` over a decoded body as raw bytes.
    fn rewrite_text(
        &self,
        relative_url: &str,
        body: Cow<'_, [u8]>,
        rules: &[ReplaceRule],
    ) -> Vec<u8> {
        if rules.is_empty() {
            return body.into_owned();
        }
        rules::apply_bytes(relative_url, &body, rules)
    }
}

impl std::fmt::Debug for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Filter")
            .field("upstream", &self.upstream.base)
            .field("force", &self.force)
            .field("restricted", &self.restricted)
            .field("content_types", &self.content_types)
            .field("request_rules", &self.request.replace.len())
            .field("response_rules", &self.response.replace.len())
            .field("dump", &self.dump.is_some())
            .finish()
    }
}
