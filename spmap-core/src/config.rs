// Classification settings for the navigation processor

use crate::error::{NavError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use url::Url;

/// Navigation headings without a page carry this placeholder url.
pub const LINKLESS_HEADER_URL: &str = "http://linkless.header/";

/// Default nesting limit for the payload decoder.
pub const DEFAULT_MAX_DEPTH: usize = 50;

/// Which parts of a resolved url are ignored when looking for repeated pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrlNormalization {
    pub strip_trailing_slash: bool,
    pub strip_query: bool,
    pub lowercase_path: bool,
}

impl Default for UrlNormalization {
    fn default() -> Self {
        Self {
            strip_trailing_slash: true,
            strip_query: true,
            lowercase_path: false,
        }
    }
}

impl UrlNormalization {
    /// Duplicate-detection key for an absolute url. Scheme and host are
    /// already lowercased by the url parser; the fragment is always dropped.
    pub fn key(&self, url: &Url) -> String {
        let mut path = url.path().to_string();
        if self.lowercase_path {
            path = path.to_lowercase();
        }
        if self.strip_trailing_slash {
            while path.len() > 1 && path.ends_with('/') {
                path.pop();
            }
        }

        let mut key = format!(
            "{}://{}{}",
            url.scheme(),
            url.host_str().unwrap_or(""),
            url.port().map(|p| format!(":{}", p)).unwrap_or_default()
        );
        key.push_str(&path);
        if !self.strip_query
            && let Some(query) = url.query()
        {
            key.push('?');
            key.push_str(query);
        }
        key
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Case-insensitive path fragments marking system or administrative
    /// pages.
    pub admin_path_fragments: Vec<String>,
    /// Urls treated as "no link at all".
    pub linkless_urls: Vec<String>,
    pub normalization: UrlNormalization,
    /// Maximum nesting accepted by the payload decoder.
    pub max_depth: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            admin_path_fragments: [
                "/_layouts/",
                "/_catalogs/",
                "/_vti_bin/",
                "/_api/",
                "allitems.aspx",
                "admin-centre.aspx",
                "news.aspx",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            linkless_urls: vec![LINKLESS_HEADER_URL.to_string()],
            normalization: UrlNormalization::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ProcessorConfig {
    /// Load from a JSON file. Keys missing from the file keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let invalid = |reason: String| NavError::InvalidConfig {
            path: path.display().to_string(),
            reason,
        };
        let content = fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        Self::from_json(&content).map_err(|e| invalid(e.to_string()))
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Whether `path` hits one of the admin fragments.
    pub fn is_admin_path(&self, path: &str) -> bool {
        let path = path.to_lowercase();
        self.admin_path_fragments
            .iter()
            .filter(|fragment| !fragment.is_empty())
            .any(|fragment| path.contains(&fragment.to_lowercase()))
    }

    /// Compared as parsed urls, so `http://linkless.header` matches the
    /// placeholder with its trailing slash.
    pub fn is_linkless(&self, url: &str) -> bool {
        let parsed = Url::parse(url).ok();
        self.linkless_urls.iter().any(|linkless| {
            match (&parsed, Url::parse(linkless)) {
                (Some(parsed), Ok(linkless)) => parsed == &linkless,
                _ => linkless.eq_ignore_ascii_case(url),
            }
        })
    }
}
