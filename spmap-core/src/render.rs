// Markdown rendering of pages and whole-site sitemaps

use crate::model::ProcessedNavigationItem;
use serde::{Deserialize, Serialize};
use spmap_scanner::{Header, Link, PageContent};

const MAX_HEADING: usize = 6;

/// A navigation entry on its way into the sitemap document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderItem {
    pub title: String,
    pub slug: String,
    pub url: Option<String>,
    /// Heading level relative to the navigation section.
    pub level: usize,
    pub should_scrape: bool,
    pub page_render: Option<String>,
}

impl RenderItem {
    pub fn from_processed(item: &ProcessedNavigationItem) -> Self {
        Self {
            title: item.title.clone(),
            slug: item.slug.clone(),
            url: item.absolute_url.clone(),
            level: item.heading_level(),
            should_scrape: item.should_scrape,
            page_render: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderData {
    pub site_title: String,
    pub site_slug: String,
    pub site_url: String,
    pub root_page_render: Option<String>,
    pub items: Vec<RenderItem>,
}

fn hashes(level: usize) -> String {
    "#".repeat(level.clamp(1, MAX_HEADING))
}

/// `h2` is the top of the outline; `h1` is folded onto it.
pub fn render_headers(headers: &[Header]) -> String {
    headers
        .iter()
        .map(|header| {
            let indent = "  ".repeat(usize::from(header.level.saturating_sub(2)));
            format!("{}- {}\n", indent, header.text.trim())
        })
        .collect()
}

pub fn render_links(links: &[Link]) -> String {
    links
        .iter()
        .map(|link| format!("- [{}]({})\n", link.text.trim(), link.href))
        .collect()
}

pub fn render_page(title: &str, level: usize, url: Option<&str>, content: &PageContent) -> String {
    let mut page = String::new();
    page.push_str(&format!("{} {}\n\n", hashes(level), title));
    if let Some(url) = url {
        page.push_str(&format!("- url: {}\n\n", url));
    }
    page.push_str("**Sections**\n");
    page.push_str(&render_headers(&content.headers));
    page.push_str("\n**Links**\n");
    page.push_str(&render_links(&content.links));
    page
}

/// The whole-site document: header, home page, then every navigation entry
/// in navigation order.
pub fn render_sitemap(data: &RenderData) -> String {
    let mut doc = String::new();
    doc.push_str(&format!("# {}\n\n", data.site_title));
    doc.push_str(&format!("- Site: {}\n", data.site_url));
    doc.push_str(&format!("- Slug: {}\n\n", data.site_slug));

    doc.push_str("## Home Page\n\n");
    doc.push_str(
        data.root_page_render
            .as_deref()
            .unwrap_or("Home page content not available\n"),
    );

    doc.push_str("\n## Site Navigation\n\n");
    let sections: Vec<String> = data
        .items
        .iter()
        .map(|item| match item.page_render {
            Some(ref render) => render.clone(),
            None => {
                let mut section = format!("{} {}\n", hashes(item.level + 1), item.title);
                if let Some(ref url) = item.url {
                    section.push_str(&format!("\n- url: {}\n", url));
                }
                section
            }
        })
        .collect();
    doc.push_str(&sections.join("\n"));
    doc
}

/// Indented markdown list of the navigation, with exclusion tags.
pub fn render_navigation_outline(items: &[ProcessedNavigationItem]) -> String {
    let mut outline = String::new();
    for item in items {
        let indent = "  ".repeat(item.depth);
        let entry = match item.absolute_url {
            Some(ref url) => format!("[{}]({})", item.title, url),
            None => item.title.clone(),
        };
        match item.exclusion_reason {
            Some(reason) => {
                outline.push_str(&format!("{}- {} _(excluded: {})_\n", indent, entry, reason))
            }
            None => outline.push_str(&format!("{}- {}\n", indent, entry)),
        }
    }
    outline
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content() -> PageContent {
        PageContent {
            headers: vec![
                Header { level: 2, text: "Overview".into() },
                Header { level: 3, text: " Budgets ".into() },
                Header { level: 1, text: "Title".into() },
            ],
            links: vec![Link {
                text: "Claim form".into(),
                href: "https://example.org/form".into(),
            }],
        }
    }

    #[test]
    fn test_headers_indent_from_h2() {
        assert_eq!(
            render_headers(&content().headers),
            "- Overview\n  - Budgets\n- Title\n"
        );
    }

    #[test]
    fn test_render_page_layout() {
        let page = render_page("Finance", 2, Some("https://example.org/f"), &content());
        assert!(page.starts_with("## Finance\n\n- url: https://example.org/f\n\n**Sections**\n"));
        assert!(page.ends_with("**Links**\n- [Claim form](https://example.org/form)\n"));
    }

    #[test]
    fn test_heading_level_is_capped() {
        let page = render_page("Deep", 9, None, &PageContent::default());
        assert!(page.starts_with("###### Deep\n\n**Sections**"));
    }

    #[test]
    fn test_sitemap_uses_fallback_for_unrendered_items() {
        let data = RenderData {
            site_title: "Finance Services".into(),
            site_slug: "finance-services".into(),
            site_url: "https://example.org/sites/finance-services".into(),
            root_page_render: None,
            items: vec![RenderItem {
                title: "Policies".into(),
                slug: "policies".into(),
                url: None,
                level: 1,
                should_scrape: false,
                page_render: None,
            }],
        };
        let doc = render_sitemap(&data);
        assert!(doc.starts_with("# Finance Services\n\n- Site: https://example.org/sites/finance-services\n"));
        assert!(doc.contains("## Home Page\n\nHome page content not available\n"));
        assert!(doc.ends_with("## Site Navigation\n\n## Policies\n"));
    }
}
