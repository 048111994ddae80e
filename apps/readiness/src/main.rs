mod account;
mod api_client;
mod catalog;
mod cli;
mod config;
mod dashboard;
mod errors;
mod models;
mod onboarding;
mod persistence;
mod quiz;
mod state;
mod store;

#[cfg(test)]
mod test_support;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::Cli;
use crate::config::Config;
use crate::state::AppContext;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Environment first, then command-line overrides
    let config = Config::from_env()?.with_overrides(cli.api_base_url.clone(), cli.data_dir.clone());

    // Logs go to stderr so they never interleave with the quiz on stdout
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting readiness v{}", env!("CARGO_PKG_VERSION"));
    debug!(
        "Backend {} (root {}), data dir {}",
        config.api_base_url,
        config.api_root_url,
        config.data_dir.display()
    );

    let outcome = match AppContext::new(config).await {
        Ok(ctx) => cli::run(cli.command, &ctx).await,
        Err(e) => Err(e),
    };

    if let Err(e) = outcome {
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
    Ok(())
}
