//! Body dump configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DumpConfig {
    /// Folder receiving one file per dumped body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<PathBuf>,

    /// Regexes on the relative URL; only matching exchanges are dumped
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,
}

impl DumpConfig {
    /// Dumping is on once either a folder or a URL list is given.
    pub fn is_enabled(&self) -> bool {
        self.folder.is_some() || !self.urls.is_empty()
    }

    /// The configured folder, or `refract-dumps` under the system temp dir.
    pub fn folder_or_default(&self) -> PathBuf {
        self.folder
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("refract-dumps"))
    }
}
