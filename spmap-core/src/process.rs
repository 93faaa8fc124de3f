//! Flattening and classification of the navigation tree.

use crate::config::ProcessorConfig;
use crate::error::{NavError, Result};
use crate::model::{ExclusionReason, NavigationNode, ProcessedNavigationItem, SiteContext, slugify};
use std::collections::HashSet;
use tracing::{debug, info};
use url::Url;

/// Turns a navigation tree into an ordered, classified list.
///
/// Holds only configuration; every call starts with a fresh duplicate set,
/// so one processor can serve many sites.
#[derive(Debug, Clone, Default)]
pub struct NavListProcessor {
    config: ProcessorConfig,
}

struct Resolution {
    absolute_url: Option<String>,
    exclusion_reason: Option<ExclusionReason>,
}

impl Resolution {
    fn excluded(absolute_url: Option<String>, reason: ExclusionReason) -> Self {
        Self {
            absolute_url,
            exclusion_reason: Some(reason),
        }
    }
}

impl NavListProcessor {
    pub fn new(config: ProcessorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Walk `roots` depth-first in menu order and emit one item per node,
    /// each parent strictly before its descendants.
    pub fn flatten_and_classify(
        &self,
        roots: &[NavigationNode],
        site: &SiteContext,
    ) -> Result<Vec<ProcessedNavigationItem>> {
        let base = site_base(site)?;
        let mut seen: HashSet<String> = HashSet::new();
        let mut items = Vec::new();

        let mut stack: Vec<(&NavigationNode, usize, Option<usize>)> =
            roots.iter().rev().map(|node| (node, 0, None)).collect();

        while let Some((node, depth, parent)) = stack.pop() {
            let resolution = self.classify(&node.url, &base, &mut seen);
            if let Some(reason) = resolution.exclusion_reason {
                debug!("Excluding '{}' ({}): {}", node.title, node.url, reason);
            }

            let index = items.len();
            items.push(ProcessedNavigationItem {
                title: node.title.clone(),
                slug: slugify(&node.title),
                source_url: node.url.clone(),
                absolute_url: resolution.absolute_url,
                depth,
                parent,
                should_scrape: resolution.exclusion_reason.is_none(),
                exclusion_reason: resolution.exclusion_reason,
            });

            for child in node.children.iter().rev() {
                stack.push((child, depth + 1, Some(index)));
            }
        }

        info!(
            "Classified {} navigation items for '{}', {} to scrape",
            items.len(),
            site.site_slug,
            items.iter().filter(|i| i.should_scrape).count()
        );
        Ok(items)
    }

    fn classify(&self, raw_url: &str, base: &Url, seen: &mut HashSet<String>) -> Resolution {
        let raw_url = raw_url.trim();
        if raw_url.is_empty() || self.config.is_linkless(raw_url) {
            return Resolution::excluded(None, ExclusionReason::EmptyUrl);
        }
        if raw_url.starts_with('#') {
            return Resolution::excluded(None, ExclusionReason::AnchorOnly);
        }

        let mut resolved = match base.join(raw_url) {
            Ok(url) => url,
            Err(e) => {
                debug!("Unresolvable url '{}': {}", raw_url, e);
                return Resolution::excluded(None, ExclusionReason::EmptyUrl);
            }
        };
        resolved.set_fragment(None);
        let absolute_url = resolved.to_string();

        if !is_same_site(&resolved, base) {
            return Resolution::excluded(Some(absolute_url), ExclusionReason::ExternalDomain);
        }
        if self.config.is_admin_path(resolved.path()) {
            return Resolution::excluded(Some(absolute_url), ExclusionReason::AdminPath);
        }
        if !seen.insert(self.config.normalization.key(&resolved)) {
            return Resolution::excluded(Some(absolute_url), ExclusionReason::Duplicate);
        }

        Resolution {
            absolute_url: Some(absolute_url),
            exclusion_reason: None,
        }
    }
}

/// Validate the base url and treat it as a directory, so that
/// `Pages/About.aspx` resolves below the site rather than beside it.
fn site_base(site: &SiteContext) -> Result<Url> {
    let mut base = Url::parse(&site.base_url)
        .map_err(|e| NavError::invalid_site(&site.base_url, e.to_string()))?;

    if !matches!(base.scheme(), "http" | "https") {
        return Err(NavError::invalid_site(
            &site.base_url,
            format!("has unsupported scheme `{}`", base.scheme()),
        ));
    }
    if base.host_str().is_none_or(str::is_empty) {
        return Err(NavError::invalid_site(&site.base_url, "has no host"));
    }

    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.set_query(None);
    base.set_fragment(None);
    Ok(base)
}

fn is_same_site(url: &Url, base: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
        && match (url.host_str(), base.host_str()) {
            (Some(host), Some(base_host)) => host.eq_ignore_ascii_case(base_host),
            _ => false,
        }
}

/// Flatten and classify with an explicit configuration.
pub fn flatten_and_classify(
    roots: &[NavigationNode],
    site: &SiteContext,
    config: &ProcessorConfig,
) -> Result<Vec<ProcessedNavigationItem>> {
    NavListProcessor::new(config.clone()).flatten_and_classify(roots, site)
}

/// Items the content fetcher should visit, in navigation order.
pub fn pages_to_scrape(
    items: &[ProcessedNavigationItem],
) -> impl Iterator<Item = &ProcessedNavigationItem> {
    items
        .iter()
        .filter(|item| item.should_scrape && item.absolute_url.is_some())
}

/// The chain of items from the top-level ancestor down to `index`.
pub fn breadcrumbs(items: &[ProcessedNavigationItem], index: usize) -> Vec<&ProcessedNavigationItem> {
    let mut chain = Vec::new();
    let mut current = Some(index);
    while let Some(idx) = current {
        let Some(item) = items.get(idx) else { break };
        chain.push(item);
        // Parents always precede their children; anything else is corrupt.
        current = item.parent.filter(|&parent| parent < idx);
    }
    chain.reverse();
    chain
}
