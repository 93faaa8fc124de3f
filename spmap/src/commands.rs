use clap::{arg, command};

pub const DEFAULT_SITE_ROOT: &str = "https://uob.sharepoint.com";

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("spmap")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("spmap")
        .about("Map SharePoint site navigation and content into markdown")
        .arg(arg!(-q --"quiet" "Suppress non-essential output").required(false).global(true))
        .arg(
            arg!(-v --"verbose" "Enable debug logging")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(--"site-root" <URL>)
                .required(false)
                .global(true)
                .help("Scheme and host that SharePoint sites live under")
                .value_parser(clap::value_parser!(url::Url))
                .default_value(DEFAULT_SITE_ROOT),
        )
        .arg(
            arg!(-o --"output" <PATH>)
                .required(false)
                .global(true)
                .help("Directory for scraped site data and generated sitemaps")
                .default_value("output"),
        )
        .arg(
            arg!(-c --"config" <PATH>)
                .required(false)
                .global(true)
                .help("JSON file overriding navigation classification settings")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .subcommand_required(true)
        .subcommand(
            command!("scrape")
                .about("Fetch a site's landing page, extract its navigation and fetch every page it links to")
                .arg(
                    arg!(-s --"site" <SLUG>)
                        .required(true)
                        .help("SharePoint site slug, e.g. finance-services"),
                )
                .arg(cookie_arg())
                .arg(timeout_arg())
                .arg(
                    arg!(--"force")
                        .required(false)
                        .help("Re-fetch pages even if they were saved by an earlier run")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(dry_run_arg()),
        )
        .subcommand(
            command!("generate")
                .about("Render the markdown sitemap for a previously scraped site")
                .arg(
                    arg!(-s --"site" <SLUG>)
                        .required(true)
                        .help("SharePoint site slug"),
                )
                .arg(dry_run_arg()),
        )
        .subcommand(
            command!("all")
                .about("Scrape and generate every site listed in a sites file")
                .arg(
                    arg!(-f --"sites-file" <PATH>)
                        .required(false)
                        .help("Newline-delimited site slugs; blank lines and # comments are ignored")
                        .value_parser(clap::value_parser!(std::path::PathBuf))
                        .default_value("SITES.txt"),
                )
                .arg(
                    arg!(--"force" <STEP>)
                        .required(false)
                        .help("Redo steps even when their output exists: all, scrape or generate")
                        .value_parser(["all", "scrape", "generate"]),
                )
                .arg(
                    arg!(--"scrape-force")
                        .required(false)
                        .help("Re-fetch individual pages even if they already exist")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(cookie_arg())
                .arg(timeout_arg())
                .arg(dry_run_arg()),
        )
        .subcommand(
            command!("nav")
                .about("Extract and classify the navigation of a saved page without fetching anything")
                .arg(
                    arg!(-i --"input" <PATH>)
                        .required(true)
                        .help("Saved page markup containing the navigation payload")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-s --"site" <SLUG>)
                        .required(true)
                        .help("SharePoint site slug the page belongs to"),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Output format: text or json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                ),
        )
}

fn cookie_arg() -> clap::Arg {
    arg!(--"cookie" <COOKIE>)
        .required(false)
        .env("SPMAP_COOKIE")
        .hide_env_values(true)
        .help("Cookie header of a signed-in browser session (FedAuth/rtFa)")
}

fn timeout_arg() -> clap::Arg {
    arg!(--"timeout" <SECONDS>)
        .required(false)
        .help("Request timeout in seconds")
        .value_parser(clap::value_parser!(u64))
        .default_value("30")
}

fn dry_run_arg() -> clap::Arg {
    arg!(-n --"dry-run")
        .required(false)
        .help("Show what would be done without doing it")
        .action(clap::ArgAction::SetTrue)
}
