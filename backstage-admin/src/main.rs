//! backstage-admin - contact inbox service for the performer site
//!
//! Startup order: tracing, build identification, config, root folder,
//! database, gateway, inbox, HTTP server.

use anyhow::{Context, Result};
use backstage_common::config::{
    config_file_path, RootFolderInitializer, RootFolderResolver, TomlConfig,
};
use backstage_common::db::init_database;
use backstage_admin::gateway::{FileStore, SqliteGateway};
use backstage_admin::inbox::{Inbox, InboxSettings};
use backstage_admin::{build_router, AppState};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "backstage-admin")]
#[command(about = "Contact inbox service for the performer site")]
#[command(version)]
struct Args {
    /// Root folder holding the database and attachment files
    /// (overrides BACKSTAGE_ROOT and the config file)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Config file (defaults to ~/.config/backstage/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Peek at the config for the log level; problems are reported by the
    // full load once tracing is up
    let level = args
        .config
        .clone()
        .or_else(config_file_path)
        .and_then(|p| TomlConfig::load(&p).ok())
        .map(|c| c.logging.level)
        .unwrap_or_else(|| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                level
                    .parse()
                    .unwrap_or_else(|_| tracing::Level::INFO.into()),
            ),
        )
        .init();

    // Build identification immediately after tracing init
    info!(
        "Starting Backstage Admin (backstage-admin) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = TomlConfig::load_or_default(args.config.as_deref());

    let root_folder = RootFolderResolver::new()
        .with_cli_arg(args.root)
        .with_config_root(config.root_folder.clone())
        .resolve();

    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .with_context(|| format!("Cannot create root folder {}", initializer.root().display()))?;
    info!("Root folder: {}", initializer.root().display());

    let db_path = initializer.database_path();
    if !initializer.database_exists() {
        info!("Creating new database: {}", db_path.display());
    }
    let pool = match init_database(&db_path).await {
        Ok(pool) => {
            info!("✓ Database ready: {}", db_path.display());
            pool
        }
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    let files = FileStore::new(initializer.storage_path(), config.server.public_base_url.clone());
    let gateway = Arc::new(SqliteGateway::new(pool, files));
    let inbox = Arc::new(Inbox::new(gateway, InboxSettings::from_config(&config)));

    // A failed first load is not fatal; the admin can retry from the UI
    if let Err(e) = inbox.refresh().await {
        warn!("Initial inbox load failed: {}", e);
    }

    let state = AppState::new(inbox);
    let app = build_router(state);

    let bind_address = &config.server.bind_address;
    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_address))?;
    info!("backstage-admin listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
