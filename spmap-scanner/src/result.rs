use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResult {
    pub url: String,
    /// Where the request ended up after redirects.
    pub final_url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub response_time: Duration,
    pub body: String,
}

impl FetchResult {
    pub fn new(url: String) -> Self {
        Self {
            final_url: url.clone(),
            url,
            status_code: 0,
            content_type: None,
            response_time: Duration::from_secs(0),
            body: String::new(),
        }
    }

    pub fn is_html(&self) -> bool {
        self.content_type
            .as_ref()
            .map(|ct| ct.contains("text/html"))
            .unwrap_or(false)
    }
}
