// Command-line entry point for resolving quoted source URLs

mod config;

use anyhow::{Context, Result};
use citeit_document::{ResolveOptions, Resolver, SqliteCache};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Resolve quoted sources into canonical URLs and normalized text
#[derive(Parser)]
#[command(name = "citeit", author, version, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve URLs and print one JSON document per URL
    Resolve {
        /// URLs to resolve
        #[arg(required = true)]
        urls: Vec<String>,

        /// Include diagnostic fields such as num_downloads
        #[arg(short, long)]
        verbose: bool,

        /// Archive downloads and text artifacts
        #[arg(long)]
        save_downloads: bool,

        /// Archive root folder
        #[arg(long)]
        downloads_root: Option<PathBuf>,

        /// Simultaneous resolutions
        #[arg(short = 'j', long)]
        concurrency: Option<usize>,

        /// SQLite URL for a persistent document cache (overrides DATABASE_URL)
        #[arg(long)]
        sqlite_cache: Option<String>,

        /// Pretty-print JSON
        #[arg(long)]
        pretty: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,citeit_document=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    match cli.command {
        Commands::Resolve {
            urls,
            verbose,
            save_downloads,
            downloads_root,
            concurrency,
            sqlite_cache,
            pretty,
        } => {
            let mut resolver_config = config.resolver;
            if save_downloads {
                resolver_config = resolver_config.with_save_downloads(true);
            }
            if let Some(root) = downloads_root {
                resolver_config = resolver_config.with_downloads_root(root);
            }
            if let Some(workers) = concurrency {
                resolver_config = resolver_config.with_max_concurrent_downloads(workers);
            }

            let mut builder = Resolver::builder()
                .with_config(resolver_config)
                .with_standard_capabilities();

            if let Some(database_url) = sqlite_cache.or(config.database_url) {
                tracing::info!("Opening document cache at {}", database_url);
                let cache = SqliteCache::new(&database_url)
                    .await
                    .context("Failed to open SQLite cache")?;
                builder = builder.with_document_cache(Arc::new(cache));
            }

            let resolver = builder.build();
            let options = ResolveOptions { verbose };

            for result in resolver.resolve_many(urls, options).await {
                let json = if pretty {
                    serde_json::to_string_pretty(&result)
                } else {
                    serde_json::to_string(&result)
                }
                .context("Failed to serialize result")?;
                println!("{json}");
            }
        }
    }

    Ok(())
}
