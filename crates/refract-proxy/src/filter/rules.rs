//! Ordered, URL-scoped literal find/replace.
//!
//! Scoping uses regular expressions against the relative URL, but the
//! replacement itself is always a literal substitution. Bodies are rewritten
//! as raw bytes, so text in any ASCII-compatible charset is handled.

use crate::config::{HeaderRuleConfig, ReplaceRuleConfig, RuleSetConfig};
use aho_corasick::AhoCorasick;
use anyhow::Context;
use hyper::header::{HeaderName, HeaderValue};
use regex::Regex;

/// A literal substitution, optionally scoped to a set of URL patterns.
#[derive(Debug, Clone)]
pub struct ReplaceRule {
    from: String,
    to: String,
    finder: AhoCorasick,
    urls: Vec<Regex>,
}

impl ReplaceRule {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        urls: Vec<Regex>,
    ) -> Result<Self, anyhow::Error> {
        let from = from.into();
        let finder = AhoCorasick::new([from.as_str()])
            .with_context(|| format!("failed to build matcher for '{from}'"))?;
        Ok(Self {
            from,
            to: to.into(),
            finder,
            urls,
        })
    }

    pub fn compile(config: &ReplaceRuleConfig) -> Result<Self, anyhow::Error> {
        if config.from.is_empty() {
            anyhow::bail!("replace rule 'from' must not be empty (to: '{}')", config.to);
        }
        let urls = compile_url_patterns(&config.urls)?;
        Self::new(config.from.clone(), config.to.clone(), urls)
    }

    /// An unscoped rule applies everywhere; a scoped one needs one matching pattern.
    pub fn applies_to(&self, relative_url: &str) -> bool {
        self.urls.is_empty() || self.urls.iter().any(|re| re.is_match(relative_url))
    }

    fn active_for(&self, relative_url: &str) -> bool {
        !self.from.is_empty() && self.applies_to(relative_url)
    }
}

/// Compile relative-URL patterns, naming the first one that fails.
pub fn compile_url_patterns(patterns: &[String]) -> Result<Vec<Regex>, anyhow::Error> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).with_context(|| format!("invalid url pattern '{pattern}'"))
        })
        .collect()
}

/// A header to inject, overriding an existing non-empty value only when forced.
#[derive(Debug, Clone)]
pub struct HeaderRule {
    pub name: HeaderName,
    pub value: HeaderValue,
    pub force: bool,
}

impl HeaderRule {
    pub fn compile(config: &HeaderRuleConfig) -> Result<Self, anyhow::Error> {
        let name = HeaderName::from_bytes(config.name.as_bytes())
            .with_context(|| format!("invalid header name '{}'", config.name))?;
        let value = HeaderValue::from_str(&config.value)
            .with_context(|| format!("invalid value for header '{}'", config.name))?;
        Ok(Self {
            name,
            value,
            force: config.force,
        })
    }
}

/// Replace and header rules for one direction of the exchange.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub replace: Vec<ReplaceRule>,
    pub header: Vec<HeaderRule>,
}

impl RuleSet {
    pub fn compile(config: &RuleSetConfig) -> Result<Self, anyhow::Error> {
        Ok(Self {
            replace: config
                .replace
                .iter()
                .map(ReplaceRule::compile)
                .collect::<Result<_, _>>()?,
            header: config
                .header
                .iter()
                .map(HeaderRule::compile)
                .collect::<Result<_, _>>()?,
        })
    }
}

/// Run every applicable rule over `text`, in order, each seeing the previous output.
pub fn apply(relative_url: &str, text: &str, rules: &[ReplaceRule]) -> String {
    let mut out = text.to_owned();
    for rule in rules.iter().filter(|r| r.active_for(relative_url)) {
        if rule.finder.is_match(&out) {
            out = rule.finder.replace_all(&out, &[rule.to.as_str()]);
        }
    }
    out
}

/// Byte-level [`apply`] for bodies, whatever their charset.
pub fn apply_bytes(relative_url: &str, body: &[u8], rules: &[ReplaceRule]) -> Vec<u8> {
    let mut out = body.to_vec();
    for rule in rules.iter().filter(|r| r.active_for(relative_url)) {
        if rule.finder.is_match(&out) {
            out = rule.finder.replace_all_bytes(&out, &[rule.to.as_bytes()]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(from: &str, to: &str, urls: &[&str]) -> ReplaceRule {
        ReplaceRule::new(
            from,
            to,
            urls.iter().map(|u| Regex::new(u).unwrap()).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_rule_set_is_identity() {
        let rules = vec![rule("a", "b", &[])];
        let once = apply("/x", "banana", &rules);
        assert_eq!(once, "bbnbnb");
        assert_eq!(apply("/x", &once, &[]), once);
    }

    #[test]
    fn test_replaces_all_occurrences_literally() {
        let rules = vec![rule("a.c", "X", &[])];
        // '.' must not behave like a regex wildcard
        assert_eq!(apply("/", "abc a.c a.c", &rules), "abc X X");
    }

    #[test]
    fn test_rules_apply_in_order() {
        let rules = vec![rule("old", "mid", &[]), rule("mid", "new", &[])];
        assert_eq!(apply("/", "old", &rules), "new");

        let reversed = vec![rule("mid", "new", &[]), rule("old", "mid", &[])];
        assert_eq!(apply("/", "old", &reversed), "mid");
    }

    #[test]
    fn test_unscoped_rule_applies_to_any_url() {
        let rules = vec![rule("foo", "bar", &[])];
        assert_eq!(apply("/a", "foo", &rules), "bar");
        assert_eq!(apply("/b/c?d=1", "foo", &rules), "bar");
        assert_eq!(apply("", "foo", &rules), "bar");
    }

    #[test]
    fn test_scoped_rule_applies_only_on_match() {
        let rules = vec![rule("foo", "bar", &["^/api/", "\\.js$"])];
        assert_eq!(apply("/api/users", "foo", &rules), "bar");
        assert_eq!(apply("/static/app.js", "foo", &rules), "bar");
        assert_eq!(apply("/page", "foo", &rules), "foo");
    }

    #[test]
    fn test_mixed_scoping() {
        let rules = vec![rule("a", "b", &["^/only"]), rule("c", "d", &[])];
        assert_eq!(apply("/only/here", "ac", &rules), "bd");
        assert_eq!(apply("/elsewhere", "ac", &rules), "ad");
    }

    #[test]
    fn test_bytes_rewritten_outside_utf8() {
        let rules = vec![rule("old.example.com", "new.example.com", &[])];
        let latin1 = b"Caf\xe9 <a href=\"http://old.example.com/x\">";
        assert_eq!(
            apply_bytes("/", latin1, &rules),
            b"Caf\xe9 <a href=\"http://new.example.com/x\">".to_vec()
        );
    }

    #[test]
    fn test_bytes_and_text_agree() {
        let rules = vec![rule("aa", "b", &[]), rule("b", "cc", &["^/x"])];
        for url in ["/x", "/y"] {
            let text = apply(url, "aaaab aaa", &rules);
            assert_eq!(apply_bytes(url, b"aaaab aaa", &rules), text.into_bytes());
        }
        assert_eq!(apply("/x", "aaaab aaa", &rules), "cccccc cca");
    }

    #[test]
    fn test_compile_rejects_empty_from() {
        let config = ReplaceRuleConfig {
            from: String::new(),
            to: "x".to_string(),
            urls: vec![],
        };
        assert!(ReplaceRule::compile(&config).is_err());
    }

    #[test]
    fn test_compile_rejects_invalid_pattern() {
        let config = ReplaceRuleConfig {
            from: "a".to_string(),
            to: "b".to_string(),
            urls: vec!["(".to_string()],
        };
        let err = ReplaceRule::compile(&config).unwrap_err();
        assert!(err.to_string().contains("invalid url pattern"));
    }

    #[test]
    fn test_header_rule_compile() {
        let config = HeaderRuleConfig {
            name: "X-Env".to_string(),
            value: "dev".to_string(),
            force: true,
        };
        let rule = HeaderRule::compile(&config).unwrap();
        assert_eq!(rule.name.as_str(), "x-env");
        assert_eq!(rule.value, "dev");
        assert!(rule.force);

        let bad = HeaderRuleConfig {
            name: "bad header".to_string(),
            value: "v".to_string(),
            force: false,
        };
        assert!(HeaderRule::compile(&bad).is_err());
    }
}
