//! maker CLI entrypoint

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use maker::cli::{Cli, RED, RESET};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let verbose = cli.verbose;
    if let Err(e) = cli.execute().await {
        eprintln!("{}Error: {}{}", RED, e, RESET);
        if verbose {
            for cause in e.chain().skip(1) {
                eprintln!("  caused by: {}", cause);
            }
        }
        std::process::exit(1);
    }
}
