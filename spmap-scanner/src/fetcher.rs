use crate::error::{Result, ScanError};
use crate::result::FetchResult;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, COOKIE};
use scraper::{Html, Selector};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

const USER_AGENT: &str = "spmap/0.1 (SharePoint navigation mapper)";

/// Hosts that only ever serve sign-in flows.
const AUTH_HOSTS: [&str; 3] = [
    "login.microsoftonline.com",
    "login.windows.net",
    "account.activedirectory.windowsazure.com",
];

/// Path fragments of SharePoint and ADFS sign-in endpoints.
const AUTH_PATHS: [&str; 6] = ["/_forms/", "/_login/", "/adfs/", "/signin", "/login", "/sso"];

/// Elements that only appear on a login form.
const AUTH_SELECTORS: [&str; 6] = [
    r#"input[type="email"]"#,
    r#"input[type="password"]"#,
    r#"[data-testid="i0116"]"#,
    r#"[data-testid="i0118"]"#,
    ".login-form",
    "#loginForm",
];

/// Sequential page fetcher. One request at a time, authenticated with a
/// session cookie copied out of a signed-in browser.
pub struct Fetcher {
    client: Client,
    cookie: Option<String>,
    timeout_secs: u64,
}

impl Fetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(30)
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self {
            client,
            cookie: None,
            timeout_secs,
        })
    }

    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        let cookie = cookie.into();
        self.cookie = if cookie.trim().is_empty() {
            None
        } else {
            Some(cookie)
        };
        self
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// GET a single page. Fails on transport errors, non-2xx statuses and
    /// responses that turn out to be a sign-in wall.
    pub async fn fetch(&self, url: &str) -> Result<FetchResult> {
        Url::parse(url).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", url, e)))?;
        debug!("Fetching {}", url);

        let mut request = self.client.get(url);
        if let Some(ref cookie) = self.cookie {
            request = request.header(COOKIE, cookie);
        }

        let start = Instant::now();
        let response = request.send().await?;
        let response_time = start.elapsed();

        let mut result = FetchResult::new(url.to_string());
        result.final_url = response.url().to_string();
        result.status_code = response.status().as_u16();
        result.content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        result.response_time = response_time;

        if !response.status().is_success() {
            warn!("{} returned {}", url, result.status_code);
            return Err(ScanError::HttpStatus {
                url: url.to_string(),
                status: result.status_code,
            });
        }

        result.body = response.text().await?;

        if is_authentication_page(&result.final_url, &result.body) {
            return Err(ScanError::AuthenticationRequired(url.to_string()));
        }

        info!(
            "Fetched {} ({} bytes in {:?})",
            url,
            result.body.len(),
            result.response_time
        );
        Ok(result)
    }
}

/// Whether a response looks like a sign-in page rather than site content.
pub fn is_authentication_page(final_url: &str, body: &str) -> bool {
    if let Ok(parsed) = Url::parse(final_url) {
        let host = parsed.host_str().unwrap_or("").to_lowercase();
        if AUTH_HOSTS.iter().any(|h| host == *h) {
            return true;
        }
        let path = parsed.path().to_lowercase();
        if AUTH_PATHS.iter().any(|p| path.contains(p)) {
            return true;
        }
    }

    let document = Html::parse_document(body);
    AUTH_SELECTORS.iter().any(|css| {
        Selector::parse(css)
            .map(|selector| document.select(&selector).next().is_some())
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path},
    };

    #[tokio::test]
    async fn test_fetch_returns_body_and_metadata() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sites/demo/SitePages/Home.aspx"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=utf-8")
                    .set_body_bytes(b"<html><body><article>Hi</article></body></html>"),
            )
            .mount(&mock_server)
            .await;

        let fetcher = Fetcher::new().unwrap();
        let url = format!("{}/sites/demo/SitePages/Home.aspx", mock_server.uri());
        let result = fetcher.fetch(&url).await.unwrap();

        assert_eq!(result.status_code, 200);
        assert!(result.is_html());
        assert_eq!(result.final_url, url);
        assert!(result.body.contains("<article>Hi</article>"));
    }

    #[tokio::test]
    async fn test_fetch_sends_session_cookie() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/private"))
            .and(header("cookie", "FedAuth=abc; rtFa=def"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_bytes(b"<html><body>ok</body></html>"),
            )
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/private"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let fetcher = Fetcher::new().unwrap().with_cookie("FedAuth=abc; rtFa=def");
        let result = fetcher
            .fetch(&format!("{}/private", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(result.status_code, 200);
    }

    #[tokio::test]
    async fn test_fetch_rejects_error_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/missing.aspx"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let fetcher = Fetcher::new().unwrap();
        let err = fetcher
            .fetch(&format!("{}/missing.aspx", mock_server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::HttpStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_fetch_detects_sign_in_redirect() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sites/demo"))
            .respond_with(ResponseTemplate::new(302).insert_header(
                "location",
                format!("{}/_forms/default.aspx?ReturnUrl=%2fsites%2fdemo", mock_server.uri()),
            ))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/_forms/default.aspx"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_bytes(b"<html><body>Sign in</body></html>"),
            )
            .mount(&mock_server)
            .await;

        let fetcher = Fetcher::new().unwrap();
        let err = fetcher
            .fetch(&format!("{}/sites/demo", mock_server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::AuthenticationRequired(_)));
    }

    #[tokio::test]
    async fn test_fetch_invalid_url() {
        let fetcher = Fetcher::new().unwrap();
        let err = fetcher.fetch("not a url").await.unwrap_err();
        assert!(matches!(err, ScanError::InvalidUrl(_)));
    }

    #[test]
    fn test_login_form_body_is_authentication_page() {
        let body = r#"<html><body><form><input type="password" name="passwd"></form></body></html>"#;
        assert!(is_authentication_page("https://example.org/sites/demo", body));
    }

    #[test]
    fn test_microsoft_login_host_is_authentication_page() {
        assert!(is_authentication_page(
            "https://login.microsoftonline.com/common/oauth2/authorize",
            ""
        ));
    }

    #[test]
    fn test_regular_page_is_not_authentication_page() {
        let body = r#"<html><body><article><h2>Lessons</h2><input type="search"></article></body></html>"#;
        assert!(!is_authentication_page(
            "https://example.org/sites/demo/SitePages/Lessons.aspx",
            body
        ));
    }
}
