pub mod content;
pub mod error;
pub mod fetcher;
pub mod result;

pub use content::{Header, Link, PageContent, extract_content, extract_site_title};
pub use error::ScanError;
pub use fetcher::Fetcher;
pub use result::FetchResult;
