//! Navigation extraction, classification and sitemap rendering for
//! SharePoint sites.
//!
//! The pipeline is `extract` (markup to tree), then `process` (tree to an
//! ordered, classified list), then `render` (list plus fetched pages to
//! markdown). None of these modules perform I/O.

pub mod config;
pub mod error;
pub mod extract;
pub mod model;
pub mod process;
pub mod render;

pub use config::{ProcessorConfig, UrlNormalization};
pub use error::NavError;
pub use extract::{DecodeWarning, Extraction, NavTreeExtractor, extract};
pub use model::{ExclusionReason, NavigationNode, ProcessedNavigationItem, SiteContext};
pub use process::{NavListProcessor, breadcrumbs, flatten_and_classify, pages_to_scrape};
