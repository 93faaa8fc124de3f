use crate::error::{Result, ScanError};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

const UNKNOWN_SITE: &str = "Unknown Site";

/// A section heading found on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// 1 for `h1` through 4 for `h4`.
    pub level: u8,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub text: String,
    pub href: String,
}

/// The parts of a page that end up in the sitemap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    pub headers: Vec<Header>,
    pub links: Vec<Link>,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ScanError::ParseError(format!("selector {}: {}", css, e)))
}

fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>()
}

/// Pull headings (`h1`-`h4`, whole document) and links (first `<article>`
/// only) out of a page. Links with blank text are heading anchors and are
/// dropped.
pub fn extract_content(html: &str) -> Result<PageContent> {
    let document = Html::parse_document(html);

    let header_selector = selector("h1, h2, h3, h4")?;
    let headers = document
        .select(&header_selector)
        .filter_map(|element| {
            let level = element.value().name().strip_prefix('h')?.parse::<u8>().ok()?;
            Some(Header {
                level,
                text: element_text(&element).trim().to_string(),
            })
        })
        .collect();

    let article_selector = selector("article")?;
    let article = document
        .select(&article_selector)
        .next()
        .ok_or_else(|| ScanError::ParseError("no <article> element in page".to_string()))?;

    let link_selector = selector("a")?;
    let links = article
        .select(&link_selector)
        .filter_map(|element| {
            let text = element_text(&element);
            if text.trim().is_empty() {
                return None;
            }
            Some(Link {
                text,
                href: element.value().attr("href").unwrap_or("").to_string(),
            })
        })
        .collect();

    Ok(PageContent { headers, links })
}

/// Site title from `<title>`, then the first `<h1>`.
pub fn extract_site_title(html: &str) -> String {
    let document = Html::parse_document(html);

    ["title", "h1"]
        .iter()
        .filter_map(|css| Selector::parse(css).ok())
        .find_map(|selector| {
            let text = document
                .select(&selector)
                .next()
                .map(|element| element_text(&element).trim().to_string())?;
            (!text.is_empty()).then_some(text)
        })
        .unwrap_or_else(|| UNKNOWN_SITE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"<html>
        <head><title> Finance Services </title></head>
        <body>
            <nav><a href="/outside">Outside article</a></nav>
            <article>
                <h2>Overview</h2>
                <h3>Budgets</h3>
                <a href="#budgets"> </a>
                <a href="/sites/finance/Pages/Budgets.aspx">Budget guidance</a>
                <h4>Deadlines</h4>
                <a href="https://example.org/form">Claim form</a>
            </article>
        </body>
    </html>"##;

    #[test]
    fn test_headers_keep_document_order() {
        let content = extract_content(PAGE).unwrap();
        let levels: Vec<u8> = content.headers.iter().map(|h| h.level).collect();
        assert_eq!(levels, vec![2, 3, 4]);
        assert_eq!(content.headers[1].text, "Budgets");
    }

    #[test]
    fn test_links_come_from_article_only() {
        let content = extract_content(PAGE).unwrap();
        assert_eq!(content.links.len(), 2);
        assert_eq!(content.links[0].text, "Budget guidance");
        assert_eq!(content.links[0].href, "/sites/finance/Pages/Budgets.aspx");
        assert_eq!(content.links[1].href, "https://example.org/form");
    }

    #[test]
    fn test_missing_article_is_an_error() {
        let err = extract_content("<html><body><h2>x</h2></body></html>").unwrap_err();
        assert!(matches!(err, ScanError::ParseError(_)));
    }

    #[test]
    fn test_site_title_prefers_title_tag() {
        assert_eq!(extract_site_title(PAGE), "Finance Services");
    }

    #[test]
    fn test_site_title_falls_back_to_h1_then_default() {
        assert_eq!(
            extract_site_title("<html><body><h1>Epidemiology Unit</h1></body></html>"),
            "Epidemiology Unit"
        );
        assert_eq!(extract_site_title("<html><body></body></html>"), "Unknown Site");
    }
}
