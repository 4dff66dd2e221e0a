//! Keel origin server.
//!
//! Serves the marketing site with render-failure resilience: SEO endpoints,
//! static assets, and server-rendered pages that degrade to a client-only
//! shell whenever rendering cannot complete.

mod serve;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use keel_core::SiteConfig;
use keel_origin::{HealthTracker, OriginHandler, ShellRenderer};

/// Keel origin server for the marketing site.
#[derive(Parser)]
#[command(name = "keel-server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    listen: SocketAddr,

    /// Config file path (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Site root directory override
    #[arg(long)]
    site_root: Option<PathBuf>,

    /// Environment label override
    #[arg(long)]
    environment: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Use JSON log output
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json);

    let mut config = match &cli.config {
        Some(path) => SiteConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => SiteConfig::default(),
    };
    if let Some(root) = cli.site_root {
        config = config.with_site_root(root);
    }
    if let Some(environment) = cli.environment {
        config = config.with_environment(environment);
    }

    let handler = Arc::new(OriginHandler::new(
        config,
        Arc::new(ShellRenderer),
        HealthTracker::new(),
    ));

    info!(listen = %cli.listen, "keel-server starting");
    serve::run(cli.listen, handler).await
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
