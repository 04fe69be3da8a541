//! Dump sink writing one text file per call into a folder.

use super::{resolve_request_id, DumpSink};
use anyhow::Context;
use hyper::HeaderMap;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Writes `<id>-original.txt` for the first call of a response,
/// `<id>-rewritten.txt` for the correlated one and `<id>-request.txt` for a
/// request body.
///
/// With URL patterns set, only exchanges whose relative URL matches one of
/// them are dumped.
#[derive(Debug, Clone)]
pub struct FolderDump {
    folder: PathBuf,
    urls: Vec<Regex>,
}

impl FolderDump {
    pub fn new(folder: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let folder = folder.as_ref().to_path_buf();
        fs::create_dir_all(&folder)
            .with_context(|| format!("failed to create dump folder {folder:?}"))?;
        Ok(Self {
            folder,
            urls: Vec::new(),
        })
    }

    pub fn with_urls(mut self, urls: Vec<Regex>) -> Self {
        self.urls = urls;
        self
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    fn render(relative_url: &str, headers: &HeaderMap, body: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(body.len() + 256);
        out.extend_from_slice(relative_url.as_bytes());
        out.push(b'\n');
        for (name, value) in headers {
            out.extend_from_slice(name.as_str().as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.push(b'\n');
        }
        out.push(b'\n');
        out.extend_from_slice(body);
        out
    }

    fn write(
        &self,
        phase: &str,
        request_id: String,
        relative_url: &str,
        headers: &HeaderMap,
        body: &[u8],
    ) -> String {
        let path = self.folder.join(format!("{request_id}-{phase}.txt"));

        // A failed dump never affects the exchange
        match fs::write(&path, Self::render(relative_url, headers, body)) {
            Ok(()) => debug!(request_id = %request_id, path = ?path, "dumped body"),
            Err(e) => {
                error!(request_id = %request_id, path = ?path, error = %e, "failed to dump body")
            }
        }

        request_id
    }
}

impl DumpSink for FolderDump {
    fn dump(
        &self,
        request_id: &str,
        relative_url: &str,
        headers: &HeaderMap,
        body: &[u8],
    ) -> String {
        let phase = if request_id.is_empty() {
            "original"
        } else {
            "rewritten"
        };
        let request_id = resolve_request_id(request_id);
        self.write(phase, request_id, relative_url, headers, body)
    }

    fn dump_request(&self, relative_url: &str, headers: &HeaderMap, body: &[u8]) -> String {
        self.write("request", resolve_request_id(""), relative_url, headers, body)
    }

    fn accepts(&self, relative_url: &str) -> bool {
        self.urls.is_empty() || self.urls.iter().any(|re| re.is_match(relative_url))
    }
}
