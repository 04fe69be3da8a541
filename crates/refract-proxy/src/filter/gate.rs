//! Status and content-type eligibility for response filtering.

use hyper::StatusCode;

/// Whether a response is eligible for rewriting.
///
/// A 200 needs a `Content-Type` containing one of `allowed` (substring match).
/// Redirects (301, 302) always qualify since only their `Location` is touched.
pub fn should_filter(status: StatusCode, content_type: Option<&str>, allowed: &[String]) -> bool {
    match status {
        StatusCode::OK => {
            let current = content_type.unwrap_or_default();
            allowed.iter().any(|t| current.contains(t.as_str()))
        }
        StatusCode::FOUND | StatusCode::MOVED_PERMANENTLY => true,
        _ => false,
    }
}
