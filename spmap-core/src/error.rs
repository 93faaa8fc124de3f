use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavError {
    /// The navigation marker is missing or the payload behind it cannot be
    /// decoded. There is no tree root to recover anything from.
    #[error("Malformed navigation payload: {reason} (near `{excerpt}`)")]
    MalformedNavigationPayload { reason: String, excerpt: String },

    #[error("Invalid site context: base url `{base_url}` {reason}")]
    InvalidSiteContext { base_url: String, reason: String },

    #[error("Invalid config file {path}: {reason}")]
    InvalidConfig { path: String, reason: String },
}

pub type Result<T> = std::result::Result<T, NavError>;

const EXCERPT_LEN: usize = 80;

impl NavError {
    pub(crate) fn malformed(reason: impl Into<String>, fragment: &str) -> Self {
        NavError::MalformedNavigationPayload {
            reason: reason.into(),
            excerpt: excerpt(fragment),
        }
    }

    pub(crate) fn invalid_site(base_url: &str, reason: impl Into<String>) -> Self {
        NavError::InvalidSiteContext {
            base_url: base_url.to_string(),
            reason: reason.into(),
        }
    }
}

fn excerpt(fragment: &str) -> String {
    let trimmed = fragment.trim();
    match trimmed.char_indices().nth(EXCERPT_LEN) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
