use serde::{Deserialize, Serialize};
use std::fmt;

/// One entry of the site's quick launch menu, as found in the page payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationNode {
    pub title: String,
    /// Absolute, site-relative, empty or `#anchor`.
    pub url: String,
    /// SharePoint's own `IsExternal` flag. Informational only.
    pub is_external: Option<bool>,
    /// On-page menu order.
    pub children: Vec<NavigationNode>,
}

impl NavigationNode {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            is_external: None,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<NavigationNode>) -> Self {
        self.children = children;
        self
    }

    /// Number of nodes in this subtree, including itself.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }
}

/// Why a navigation item is not fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExclusionReason {
    AnchorOnly,
    AdminPath,
    ExternalDomain,
    EmptyUrl,
    Duplicate,
}

impl ExclusionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExclusionReason::AnchorOnly => "anchor-only",
            ExclusionReason::AdminPath => "admin-path",
            ExclusionReason::ExternalDomain => "external-domain",
            ExclusionReason::EmptyUrl => "empty-url",
            ExclusionReason::Duplicate => "duplicate",
        }
    }
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A flattened, classified navigation entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedNavigationItem {
    pub title: String,
    pub slug: String,
    /// The url exactly as it appeared in the payload.
    pub source_url: String,
    pub absolute_url: Option<String>,
    /// 0 for top-level entries.
    pub depth: usize,
    /// Index of the parent entry in the same flattened list.
    pub parent: Option<usize>,
    pub should_scrape: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub exclusion_reason: Option<ExclusionReason>,
}

impl ProcessedNavigationItem {
    /// Markdown heading level; top-level entries render as `#`.
    pub fn heading_level(&self) -> usize {
        self.depth + 1
    }
}

/// Identifies a site for url resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteContext {
    pub base_url: String,
    pub site_slug: String,
}

impl SiteContext {
    pub fn new(base_url: impl Into<String>, site_slug: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            site_slug: site_slug.into(),
        }
    }

    /// `<site_root>/sites/<slug>`, the landing page of a SharePoint site.
    pub fn for_site(site_root: &str, site_slug: &str) -> Self {
        let root = site_root.trim_end_matches('/');
        Self::new(format!("{}/sites/{}", root, site_slug), site_slug)
    }
}

/// URL and file safe form of a title: lowercase ascii alphanumerics joined by
/// single hyphens.
pub fn slugify(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
