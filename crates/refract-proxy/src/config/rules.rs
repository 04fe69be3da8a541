//! Rewrite rule configuration.

use serde::{Deserialize, Serialize};

/// Replace and header rules for one direction (request or response).
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RuleSetConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replace: Vec<ReplaceRuleConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub header: Vec<HeaderRuleConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReplaceRuleConfig {
    /// Literal text to find
    pub from: String,
    /// Literal replacement
    #[serde(default)]
    pub to: String,
    /// Regexes on the relative URL; the rule applies everywhere when empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HeaderRuleConfig {
    pub name: String,
    pub value: String,
    /// Overwrite an existing non-empty value
    #[serde(default)]
    pub force: bool,
}
