//! Conditional header injection.

use super::rules::HeaderRule;
use hyper::HeaderMap;
use tracing::debug;

/// Apply header rules in order, in place, returning the same map.
///
/// A rule sets its header when it is absent or empty; an existing non-empty
/// value is only replaced when the rule is forced.
pub fn rewrite<'a>(headers: &'a mut HeaderMap, rules: &[HeaderRule]) -> &'a mut HeaderMap {
    debug!("Checking if need to replace header");

    for rule in rules {
        let vacant = headers
            .get(&rule.name)
            .map(|v| v.is_empty())
            .unwrap_or(true);

        if vacant || rule.force {
            headers.insert(rule.name.clone(), rule.value.clone());
            debug!(header = %rule.name, value = ?rule.value, "set header");
        }
    }

    headers
}
