//! Side-channel persistence of bodies for debugging.
//!
//! The filter hands a sink each decoded body together with a request ID.
//! An empty ID asks the sink to generate one; the returned ID correlates the
//! pre-rewrite and post-rewrite calls for the same response. Request bodies
//! go through [`DumpSink::dump_request`] so sinks can keep them apart.

mod folder;

pub use folder::FolderDump;

use hyper::HeaderMap;

pub trait DumpSink: Send + Sync {
    /// Persist one response body and return the request ID to use for a correlated call.
    fn dump(
        &self,
        request_id: &str,
        relative_url: &str,
        headers: &HeaderMap,
        body: &[u8],
    ) -> String;

    /// Persist one request body, before rewriting.
    fn dump_request(&self, relative_url: &str, headers: &HeaderMap, body: &[u8]) -> String {
        self.dump("", relative_url, headers, body)
    }

    /// Whether exchanges for `relative_url` should be dumped at all.
    fn accepts(&self, _relative_url: &str) -> bool {
        true
    }
}

/// Reuse `request_id`, or generate a fresh one when it is empty.
pub fn resolve_request_id(request_id: &str) -> String {
    if request_id.is_empty() {
        uuid::Uuid::new_v4().to_string()
    } else {
        request_id.to_string()
    }
}
