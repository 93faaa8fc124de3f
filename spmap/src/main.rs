use spmap::commands::command_argument_builder;
use spmap::handlers::{handle_all, handle_generate, handle_nav, handle_scrape};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();

    // RUST_LOG wins over the verbosity flags
    let default_level = if chosen_command.get_flag("verbose") {
        "debug"
    } else if chosen_command.get_flag("quiet") {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match chosen_command.subcommand() {
        Some(("scrape", primary_command)) => handle_scrape(&chosen_command, primary_command).await,
        Some(("generate", primary_command)) => handle_generate(&chosen_command, primary_command),
        Some(("all", primary_command)) => handle_all(&chosen_command, primary_command).await,
        Some(("nav", primary_command)) => handle_nav(&chosen_command, primary_command),
        _ => unreachable!("clap should ensure we don't get here"),
    }
}
