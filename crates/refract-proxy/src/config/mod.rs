//! Configuration types for the Refract proxy.

mod dump;
mod listen;
mod protocol;
mod rules;
mod upstream;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::filter::access::parse_networks;
use crate::filter::rules::compile_url_patterns;
use crate::filter::RuleSet;

pub use dump::DumpConfig;
pub use listen::{ListenConfig, TlsConfig};
pub use protocol::Protocol;
pub use rules::{HeaderRuleConfig, ReplaceRuleConfig, RuleSetConfig};
pub use upstream::{ConnectionPoolConfig, UpstreamConfig};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,

    pub upstream: UpstreamConfig,

    /// Filter every response regardless of status and content type
    #[serde(default)]
    pub force: bool,

    /// CIDR allow-list; empty means every client may see filtered content
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restricted: Vec<String>,

    /// Substrings of `Content-Type` eligible for filtering on a 200
    #[serde(default = "default_content_types")]
    pub content_types: Vec<String>,

    #[serde(default)]
    pub request: RuleSetConfig,
    #[serde(default)]
    pub response: RuleSetConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dump: Option<DumpConfig>,

    #[serde(default)]
    pub connection_pool: ConnectionPoolConfig,
}

fn default_content_types() -> Vec<String> {
    vec!["text/html".to_string()]
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, anyhow::Error> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.listen.protocol == Protocol::Https && self.listen.tls.is_none() {
            anyhow::bail!(
                "TLS configuration is required when listener protocol is 'https'. \
                 Please provide 'listen.tls.cert_path' and 'listen.tls.key_path'"
            );
        }

        let upstream: hyper::Uri = self
            .upstream
            .url
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid upstream url '{}': {e}", self.upstream.url))?;
        if upstream.authority().is_none() {
            anyhow::bail!(
                "Upstream url '{}' must be absolute, e.g. http://localhost:3000",
                self.upstream.url
            );
        }

        parse_networks(&self.restricted)?;

        RuleSet::compile(&self.request)
            .map_err(|e| anyhow::anyhow!("Invalid request rules: {e:#}"))?;
        RuleSet::compile(&self.response)
            .map_err(|e| anyhow::anyhow!("Invalid response rules: {e:#}"))?;

        if let Some(dump) = &self.dump {
            compile_url_patterns(&dump.urls)
                .map_err(|e| anyhow::anyhow!("Invalid dump urls: {e:#}"))?;
        }

        Ok(())
    }
}
