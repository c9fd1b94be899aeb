//! Marketplace images CLI
//!
//! Drives the attachment engine against the marketplace REST API.

use std::sync::Arc;

use clap::Parser;
use mp_attachments::{HttpImageApi, MemoryImageApi};
use mp_core::AppConfig;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod args;
mod commands;

use args::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    dotenvy::dotenv().ok();
    let config = AppConfig::from_env().unwrap_or_else(|e| {
        warn!("Failed to load config from env: {}, using defaults", e);
        AppConfig::default()
    });

    let cli = Cli::parse();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        api = %config.api.base_url,
        entity = %cli.target.entity,
        role = %cli.target.role,
        "Starting marketplace-images"
    );

    let output = match cli.command {
        Commands::Validate { files } => commands::validate(&cli.target, &config, &files),
        Commands::Upload { files } => {
            let files = commands::read_files(&files).await?;
            if cli.offline || cli.target.owner.is_none() {
                commands::upload(&cli.target, &config, Arc::new(MemoryImageApi::new()), files).await?
            } else {
                config.require_access_token()?;
                let api = HttpImageApi::new(&config.api)?;
                commands::upload(&cli.target, &config, Arc::new(api), files).await?
            }
        }
        Commands::Reorder { from, to } => commands::reorder(&cli.target, &config, from, to),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,mp_attachments=debug,mp_cli=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}
