use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use spmap_core::config::ProcessorConfig;
use spmap_core::extract::{DecodeWarning, NavTreeExtractor};
use spmap_core::model::{ProcessedNavigationItem, SiteContext, slugify};
use spmap_core::process::{NavListProcessor, pages_to_scrape};
use spmap_core::render::{
    RenderData, RenderItem, render_navigation_outline, render_page, render_sitemap,
};
use spmap_scanner::{Fetcher, extract_content, extract_site_title};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use url::Url;

const INDEX_FILE: &str = "index.html";
const NAVIGATION_FILE: &str = "navbar_links.json";
const PAGES_DIR: &str = "pages";
const SITE_DATA_DIR: &str = "site-data";

// Helper functions for the site list

/// Load site slugs from a newline-delimited file, skipping blanks and
/// `#` comments.
pub fn load_sites_from_file(path: &Path) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read sites file {}: {}", path.display(), e))?;

    let sites: Vec<String> = content.lines().filter_map(parse_site_line).collect();

    if sites.is_empty() {
        return Err(format!("No valid sites found in {}", path.display()));
    }

    Ok(sites)
}

pub fn parse_site_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    Some(line.to_string())
}

/// Turn user input into a slug that is safe both in a url and as a
/// directory name.
pub fn sanitize_site_slug(site_slug: &str) -> Result<String, String> {
    let sanitized = slugify(site_slug);
    if sanitized.is_empty() {
        return Err(format!("Invalid site slug: '{}'", site_slug));
    }
    Ok(sanitized)
}

/// File name a fetched page is stored under: the last path segment with
/// `.html` appended.
pub fn page_filename(url: &str) -> String {
    let last_segment = Url::parse(url).ok().and_then(|u| {
        u.path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last().map(String::from))
    });

    let Some(mut filename) = last_segment else {
        return INDEX_FILE.to_string();
    };
    if !filename.ends_with(".html") {
        filename.push_str(".html");
    }
    filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            _ => c,
        })
        .collect()
}

/// Where one site's artifacts live under the output directory.
#[derive(Debug, Clone)]
pub struct SiteLayout {
    pub base: PathBuf,
    pub pages: PathBuf,
    pub index: PathBuf,
    pub navigation: PathBuf,
    pub sitemap: PathBuf,
}

impl SiteLayout {
    pub fn new(output: &Path, site_slug: &str) -> Self {
        let base = output.join(SITE_DATA_DIR).join(site_slug);
        Self {
            pages: base.join(PAGES_DIR),
            index: base.join(INDEX_FILE),
            navigation: base.join(NAVIGATION_FILE),
            sitemap: output.join(format!("{}.md", site_slug)),
            base,
        }
    }

    pub fn has_site_data(&self) -> bool {
        self.base.is_dir() && self.index.is_file()
    }

    pub fn has_sitemap(&self) -> bool {
        self.sitemap.is_file()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Scrape,
    Generate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceStep {
    All,
    Scrape,
    Generate,
}

impl ForceStep {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "all" => Some(ForceStep::All),
            "scrape" => Some(ForceStep::Scrape),
            "generate" => Some(ForceStep::Generate),
            _ => None,
        }
    }

    fn covers(&self, step: Step) -> bool {
        matches!(
            (self, step),
            (ForceStep::All, _)
                | (ForceStep::Scrape, Step::Scrape)
                | (ForceStep::Generate, Step::Generate)
        )
    }
}

/// Skip steps whose output already exists unless forced. Generating needs
/// scraped data and no existing sitemap.
pub fn should_process_site(layout: &SiteLayout, force: Option<ForceStep>, step: Step) -> bool {
    if force.is_some_and(|f| f.covers(step)) {
        return true;
    }
    match step {
        Step::Scrape => !layout.has_site_data(),
        Step::Generate => layout.has_site_data() && !layout.has_sitemap(),
    }
}

/// Expand `~` in a user supplied path.
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

pub fn load_processor_config(path: Option<&PathBuf>) -> Result<ProcessorConfig, String> {
    match path {
        Some(path) => ProcessorConfig::from_file(path).map_err(|e| e.to_string()),
        None => Ok(ProcessorConfig::default()),
    }
}

// Pipeline

/// Extract and classify the navigation contained in `markup`.
pub fn classify_markup(
    markup: &str,
    site: &SiteContext,
    config: &ProcessorConfig,
) -> Result<(Vec<ProcessedNavigationItem>, Vec<DecodeWarning>)> {
    let extraction = NavTreeExtractor::new()
        .with_max_depth(config.max_depth)
        .extract(markup)
        .with_context(|| format!("Failed to extract navigation for '{}'", site.site_slug))?;

    let items = NavListProcessor::new(config.clone())
        .flatten_and_classify(&extraction.roots, site)
        .with_context(|| format!("Failed to classify navigation for '{}'", site.site_slug))?;

    Ok((items, extraction.warnings))
}

pub fn save_navigation(path: &Path, items: &[ProcessedNavigationItem]) -> Result<()> {
    let json = serde_json::to_string_pretty(items)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

pub fn load_navigation(path: &Path) -> Result<Vec<ProcessedNavigationItem>> {
    let json =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Invalid navigation file {}", path.display()))
}

/// Options for scraping one site
pub struct ScrapeOptions {
    pub site_root: Url,
    pub output: PathBuf,
    pub config: ProcessorConfig,
    pub force: bool,
    pub show_progress_bars: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScrapeSummary {
    pub navigation_items: usize,
    pub warnings: usize,
    pub pages_fetched: usize,
    pub pages_skipped: usize,
    pub pages_failed: usize,
}

/// Fetch the landing page, save the classified navigation, then fetch every
/// page the navigation marks for scraping, one after another.
pub async fn scrape_site(
    fetcher: &Fetcher,
    options: &ScrapeOptions,
    site_slug: &str,
) -> Result<ScrapeSummary> {
    let site = SiteContext::for_site(options.site_root.as_str(), site_slug);
    let layout = SiteLayout::new(&options.output, site_slug);

    fs::create_dir_all(&layout.pages)
        .with_context(|| format!("Failed to create {}", layout.pages.display()))?;

    info!("Fetching landing page {}", site.base_url);
    let index = fetcher
        .fetch(&site.base_url)
        .await
        .with_context(|| format!("Failed to fetch landing page of '{}'", site_slug))?;
    if !index.is_html() {
        warn!(
            "Landing page of '{}' is not HTML ({})",
            site_slug,
            index.content_type.as_deref().unwrap_or("no content type")
        );
    }
    fs::write(&layout.index, &index.body)
        .with_context(|| format!("Failed to write {}", layout.index.display()))?;

    let (items, warnings) = classify_markup(&index.body, &site, &options.config)?;
    for warning in &warnings {
        warn!("Skipped navigation entry {}: {}", warning.path, warning.message);
    }
    save_navigation(&layout.navigation, &items)?;

    let mut summary = ScrapeSummary {
        navigation_items: items.len(),
        warnings: warnings.len(),
        ..ScrapeSummary::default()
    };

    let pages: Vec<&ProcessedNavigationItem> = pages_to_scrape(&items).collect();
    let progress_bar = if options.show_progress_bars {
        let pb = ProgressBar::new(pages.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:30}] {pos}/{len} {msg}")?
                .progress_chars("=> "),
        );
        Some(pb)
    } else {
        None
    };

    for item in pages {
        let Some(ref url) = item.absolute_url else {
            continue;
        };
        if let Some(ref pb) = progress_bar {
            pb.set_message(item.title.clone());
        }

        let path = layout.pages.join(page_filename(url));
        if path.exists() && !options.force {
            info!("Skipping {} (already saved)", item.title);
            summary.pages_skipped += 1;
        } else {
            match fetcher.fetch(url).await {
                Ok(page) => {
                    fs::write(&path, &page.body)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    summary.pages_fetched += 1;
                }
                Err(e) => {
                    warn!("Failed to fetch {}: {}", url, e);
                    summary.pages_failed += 1;
                }
            }
        }

        if let Some(ref pb) = progress_bar {
            pb.inc(1);
        }
    }

    if let Some(pb) = progress_bar {
        pb.finish_and_clear();
    }

    Ok(summary)
}

/// Render `<output>/<slug>.md` from a scraped site. Returns the path written.
pub fn generate_sitemap(output: &Path, site_root: &Url, site_slug: &str) -> Result<PathBuf> {
    let layout = SiteLayout::new(output, site_slug);
    validate_site_data(&layout, site_slug)?;

    let items = load_navigation(&layout.navigation)?;
    info!("Loaded {} navigation items for '{}'", items.len(), site_slug);

    let render_items: Vec<RenderItem> = items
        .iter()
        .map(|item| render_item(&layout, item))
        .collect();

    let index_html = fs::read_to_string(&layout.index)
        .with_context(|| format!("Failed to read {}", layout.index.display()))?;
    let root_page_render = match extract_content(&index_html) {
        Ok(content) => Some(render_page("Home", 3, None, &content)),
        Err(e) => {
            warn!("Could not render landing page of '{}': {}", site_slug, e);
            None
        }
    };

    let data = RenderData {
        site_title: extract_site_title(&index_html),
        site_slug: site_slug.to_string(),
        site_url: SiteContext::for_site(site_root.as_str(), site_slug).base_url,
        root_page_render,
        items: render_items,
    };

    fs::write(&layout.sitemap, render_sitemap(&data))
        .with_context(|| format!("Failed to write {}", layout.sitemap.display()))?;
    Ok(layout.sitemap)
}

fn validate_site_data(layout: &SiteLayout, site_slug: &str) -> Result<()> {
    if !layout.base.is_dir() {
        bail!(
            "Input directory not found: {} (run `spmap scrape --site {}` first)",
            layout.base.display(),
            site_slug
        );
    }
    let missing: Vec<&str> = [(&layout.index, INDEX_FILE), (&layout.navigation, NAVIGATION_FILE)]
        .iter()
        .filter(|(path, _)| !path.is_file())
        .map(|(_, name)| *name)
        .collect();
    if !missing.is_empty() {
        bail!(
            "Missing {} in {} (run `spmap scrape --site {}` first)",
            missing.join(", "),
            layout.base.display(),
            site_slug
        );
    }
    Ok(())
}

fn render_item(layout: &SiteLayout, item: &ProcessedNavigationItem) -> RenderItem {
    let mut render = RenderItem::from_processed(item);
    let Some(url) = render.url.clone().filter(|_| render.should_scrape) else {
        return render;
    };

    let path = layout.pages.join(page_filename(&url));
    let html = match fs::read_to_string(&path) {
        Ok(html) => html,
        Err(_) => {
            warn!("No saved page for '{}' ({})", render.title, path.display());
            return render;
        }
    };

    render.page_render = Some(match extract_content(&html) {
        Ok(content) => render_page(&render.title, render.level + 1, Some(&url), &content),
        Err(e) => format!(
            "{} {}\n\n- url: {}\n\nError rendering page: {}\n",
            "#".repeat((render.level + 1).min(6)),
            render.title,
            url,
            e
        ),
    });
    render
}

// Command handlers

struct GlobalOptions {
    site_root: Url,
    output: PathBuf,
    config: ProcessorConfig,
    quiet: bool,
}

fn global_options(args: &ArgMatches) -> GlobalOptions {
    let site_root = args
        .get_one::<Url>("site-root")
        .cloned()
        .unwrap_or_else(|| exit_with("--site-root is required"));
    let output = args
        .get_one::<String>("output")
        .map(|o| expand_path(o))
        .unwrap_or_else(|| PathBuf::from("output"));
    let config = load_processor_config(args.get_one::<PathBuf>("config"))
        .unwrap_or_else(|e| exit_with(&e));

    GlobalOptions {
        site_root,
        output,
        config,
        quiet: args.get_flag("quiet"),
    }
}

fn exit_with(message: &str) -> ! {
    eprintln!("{} {}", "✗".red().bold(), message);
    std::process::exit(1);
}

fn build_fetcher(args: &ArgMatches) -> Fetcher {
    let timeout = *args.get_one::<u64>("timeout").unwrap_or(&30);
    let fetcher = Fetcher::with_timeout(timeout)
        .unwrap_or_else(|e| exit_with(&format!("Failed to create HTTP client: {}", e)));
    match args.get_one::<String>("cookie") {
        Some(cookie) => fetcher.with_cookie(cookie.as_str()),
        None => {
            warn!("No session cookie supplied; protected sites will redirect to sign-in");
            fetcher
        }
    }
}

fn print_summary(site_slug: &str, summary: &ScrapeSummary) {
    println!(
        "{} {}: {} navigation items, {} pages fetched, {} skipped, {} failed",
        "✓".green().bold(),
        site_slug.bright_white(),
        summary.navigation_items.to_string().cyan(),
        summary.pages_fetched.to_string().cyan(),
        summary.pages_skipped,
        summary.pages_failed
    );
    if summary.warnings > 0 {
        println!(
            "  {} {} navigation entries could not be decoded",
            "⚠".yellow(),
            summary.warnings
        );
    }
}

pub async fn handle_scrape(args: &ArgMatches, sub_matches: &ArgMatches) {
    let globals = global_options(args);
    let site_slug = sub_matches
        .get_one::<String>("site")
        .map(|s| sanitize_site_slug(s))
        .unwrap_or_else(|| Err("--site is required".to_string()))
        .unwrap_or_else(|e| exit_with(&e));
    let site = SiteContext::for_site(globals.site_root.as_str(), &site_slug);
    let layout = SiteLayout::new(&globals.output, &site_slug);

    if !globals.quiet {
        println!("{} Scraping site: {}", "→".blue(), site_slug.bright_white());
        println!("{} Site URL: {}", "→".blue(), site.base_url);
    }

    if sub_matches.get_flag("dry-run") {
        println!("DRY RUN - nothing will be fetched or written");
        println!("  Would create: {}", layout.base.display());
        println!("  Would fetch: {}", site.base_url);
        return;
    }

    let fetcher = build_fetcher(sub_matches);
    if !globals.quiet {
        println!("{} Timeout: {}s", "→".blue(), fetcher.timeout_secs());
    }
    let options = ScrapeOptions {
        site_root: globals.site_root,
        output: globals.output,
        config: globals.config,
        force: sub_matches.get_flag("force"),
        show_progress_bars: !globals.quiet,
    };

    match scrape_site(&fetcher, &options, &site_slug).await {
        Ok(summary) => {
            print_summary(&site_slug, &summary);
            println!("  Data saved to: {}", layout.base.display());
        }
        Err(e) => exit_with(&format!("{:#}", e)),
    }
}

pub fn handle_generate(args: &ArgMatches, sub_matches: &ArgMatches) {
    let globals = global_options(args);
    let site_slug = sub_matches
        .get_one::<String>("site")
        .map(|s| sanitize_site_slug(s))
        .unwrap_or_else(|| Err("--site is required".to_string()))
        .unwrap_or_else(|e| exit_with(&e));

    if sub_matches.get_flag("dry-run") {
        let layout = SiteLayout::new(&globals.output, &site_slug);
        println!("DRY RUN - no files will be created");
        println!("  Would process: {}", layout.base.display());
        println!("  Would create: {}", layout.sitemap.display());
        return;
    }

    match generate_sitemap(&globals.output, &globals.site_root, &site_slug) {
        Ok(path) => println!(
            "{} Sitemap written to {}",
            "✓".green().bold(),
            path.display().to_string().bright_white()
        ),
        Err(e) => exit_with(&format!("{:#}", e)),
    }
}

/// Run both steps for every listed site. A failing site is reported and the
/// batch moves on.
pub async fn handle_all(args: &ArgMatches, sub_matches: &ArgMatches) {
    let globals = global_options(args);
    let sites_file = sub_matches
        .get_one::<PathBuf>("sites-file")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("SITES.txt"));
    let sites = load_sites_from_file(&sites_file).unwrap_or_else(|e| exit_with(&e));
    let force = sub_matches
        .get_one::<String>("force")
        .and_then(|s| ForceStep::parse(s));
    let dry_run = sub_matches.get_flag("dry-run");

    println!(
        "{} Loaded {} sites from {}",
        "→".blue(),
        sites.len(),
        sites_file.display()
    );

    let fetcher = (!dry_run).then(|| build_fetcher(sub_matches));
    let options = ScrapeOptions {
        site_root: globals.site_root.clone(),
        output: globals.output.clone(),
        config: globals.config.clone(),
        force: sub_matches.get_flag("scrape-force"),
        show_progress_bars: false,
    };

    let progress_bar = ProgressBar::new(sites.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:30}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    if globals.quiet || dry_run {
        progress_bar.set_draw_target(indicatif::ProgressDrawTarget::hidden());
    }

    let mut failed: Vec<(String, String)> = Vec::new();
    let mut processed = 0usize;

    for raw_slug in &sites {
        let site_slug = match sanitize_site_slug(raw_slug) {
            Ok(slug) => slug,
            Err(e) => {
                failed.push((raw_slug.clone(), e));
                progress_bar.inc(1);
                continue;
            }
        };
        progress_bar.set_message(site_slug.clone());
        let layout = SiteLayout::new(&globals.output, &site_slug);

        if should_process_site(&layout, force, Step::Scrape) {
            if dry_run {
                println!("  [DRY RUN] Would scrape site: {}", site_slug);
            } else if let Some(ref fetcher) = fetcher {
                match scrape_site(fetcher, &options, &site_slug).await {
                    Ok(summary) => progress_bar.suspend(|| print_summary(&site_slug, &summary)),
                    Err(e) => {
                        warn!("Scrape failed for '{}': {:#}", site_slug, e);
                        failed.push((site_slug.clone(), format!("{:#}", e)));
                        progress_bar.inc(1);
                        continue;
                    }
                }
            }
        } else {
            info!("Skipping scrape for '{}' (site data exists)", site_slug);
        }

        if should_process_site(&layout, force, Step::Generate)
            || (dry_run && force.is_some_and(|f| f.covers(Step::Generate)))
        {
            if dry_run {
                println!("  [DRY RUN] Would generate sitemap: {}", layout.sitemap.display());
            } else {
                match generate_sitemap(&globals.output, &globals.site_root, &site_slug) {
                    Ok(path) => progress_bar.suspend(|| {
                        println!("  {} {}", "✓".green(), path.display());
                    }),
                    Err(e) => {
                        warn!("Sitemap generation failed for '{}': {:#}", site_slug, e);
                        failed.push((site_slug.clone(), format!("{:#}", e)));
                        progress_bar.inc(1);
                        continue;
                    }
                }
            }
        } else {
            info!("Skipping generate for '{}'", site_slug);
        }

        processed += 1;
        progress_bar.inc(1);
    }
    progress_bar.finish_and_clear();

    println!();
    println!(
        "{} {} of {} sites processed",
        "✓".green().bold(),
        processed,
        sites.len()
    );
    if !failed.is_empty() {
        println!("{} {} sites failed:", "✗".red().bold(), failed.len());
        for (slug, error) in &failed {
            println!("  {} {}: {}", "•".red(), slug, error);
        }
        std::process::exit(1);
    }
}

pub fn handle_nav(args: &ArgMatches, sub_matches: &ArgMatches) {
    let globals = global_options(args);
    let input = sub_matches
        .get_one::<PathBuf>("input")
        .unwrap_or_else(|| exit_with("--input is required"));
    let site_slug = sub_matches
        .get_one::<String>("site")
        .map(|s| sanitize_site_slug(s))
        .unwrap_or_else(|| Err("--site is required".to_string()))
        .unwrap_or_else(|e| exit_with(&e));
    let format = sub_matches
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("text");

    let markup = fs::read_to_string(input)
        .unwrap_or_else(|e| exit_with(&format!("Failed to read {}: {}", input.display(), e)));
    let site = SiteContext::for_site(globals.site_root.as_str(), &site_slug);

    let (items, warnings) = classify_markup(&markup, &site, &globals.config)
        .unwrap_or_else(|e| exit_with(&format!("{:#}", e)));

    match format {
        "json" => match serde_json::to_string_pretty(&items) {
            Ok(json) => println!("{}", json),
            Err(e) => exit_with(&format!("Failed to serialize navigation: {}", e)),
        },
        _ => {
            print!("{}", render_navigation_outline(&items));
            if !globals.quiet {
                println!();
                println!(
                    "{} {} items, {} to scrape",
                    "→".blue(),
                    items.len(),
                    pages_to_scrape(&items).count()
                );
                for warning in &warnings {
                    println!("{} {}: {}", "⚠".yellow(), warning.path, warning.message);
                }
            }
        }
    }
}
