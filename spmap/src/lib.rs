// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

pub mod commands;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    ForceStep, ScrapeOptions, ScrapeSummary, SiteLayout, Step, classify_markup,
    generate_sitemap, load_sites_from_file, page_filename, parse_site_line, sanitize_site_slug,
    scrape_site, should_process_site,
};

pub use commands::command_argument_builder;
