//! Redirect `Location` rewriting.

use super::rules::{apply, ReplaceRule};
use hyper::header::{HeaderValue, LOCATION};
use hyper::HeaderMap;
use tracing::{debug, error};

/// Rewrite a `Location` header with the same rules and scope as the body.
///
/// Scoping uses the relative URL the client asked for, not the redirect
/// target. Missing, empty, or non-text locations are left alone.
pub fn rewrite_location(headers: &mut HeaderMap, relative_url: &str, rules: &[ReplaceRule]) {
    let Some(location) = headers
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
    else {
        return;
    };

    let rewritten = apply(relative_url, &location, rules);
    debug!(
        location = %location,
        rewrited_location = %rewritten,
        "will rewrite location header"
    );

    match HeaderValue::from_str(&rewritten) {
        Ok(value) => {
            headers.insert(LOCATION, value);
        }
        Err(_) => error!(location = %rewritten, "rewritten location is not a valid header value"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_rewrites_location() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LOCATION,
            HeaderValue::from_static("http://old.example.com/login"),
        );
        let rules = [ReplaceRule::new(
            "http://old.example.com",
            "http://new.example.com",
            vec![],
        )
        .unwrap()];

        rewrite_location(&mut headers, "/page", &rules);

        assert_eq!(
            headers.get(LOCATION).unwrap(),
            "http://new.example.com/login"
        );
    }

    #[test]
    fn test_scope_uses_request_url_not_target() {
        let rules = [ReplaceRule::new(
            "old.example.com",
            "new.example.com",
            vec![Regex::new("^/account").unwrap()],
        )
        .unwrap()];

        // Target path matches the pattern, request path does not
        let mut headers = HeaderMap::new();
        headers.insert(
            LOCATION,
            HeaderValue::from_static("http://old.example.com/account"),
        );
        rewrite_location(&mut headers, "/home", &rules);
        assert_eq!(
            headers.get(LOCATION).unwrap(),
            "http://old.example.com/account"
        );

        rewrite_location(&mut headers, "/account/settings", &rules);
        assert_eq!(
            headers.get(LOCATION).unwrap(),
            "http://new.example.com/account"
        );
    }

    #[test]
    fn test_absent_location_untouched() {
        let mut headers = HeaderMap::new();
        let rules = [ReplaceRule::new("a", "b", vec![]).unwrap()];
        rewrite_location(&mut headers, "/", &rules);
        assert!(headers.get(LOCATION).is_none());
    }

    #[test]
    fn test_invalid_rewrite_keeps_original() {
        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, HeaderValue::from_static("/next"));
        let rules = [ReplaceRule::new("next", "bad\nvalue", vec![]).unwrap()];
        rewrite_location(&mut headers, "/", &rules);
        assert_eq!(headers.get(LOCATION).unwrap(), "/next");
    }
}
