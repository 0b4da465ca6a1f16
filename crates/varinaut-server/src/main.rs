//! varinaut-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) plus
//! `VARINAUT_*` environment variables, opens the SQLite store, and serves the
//! prediction API over HTTP.
//!
//! # Schema management
//!
//! ```text
//! varinaut-server migrate status
//! varinaut-server migrate upgrade            # to head
//! varinaut-server migrate downgrade 0006_review_standalone
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;
use varinaut_server::Settings;
use varinaut_store_sqlite::{SqliteStore, Target};

#[derive(Parser)]
#[command(author, version, about = "Varinaut prediction API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (default).
  Serve,
  /// Inspect or move the database schema.
  Migrate {
    #[command(subcommand)]
    action: MigrateAction,
  },
}

#[derive(Subcommand)]
enum MigrateAction {
  /// Show the current and pending revisions.
  Status,
  /// Apply migrations up to TARGET (`head` or a revision id).
  Upgrade {
    #[arg(default_value = "head")]
    target: Target,
  },
  /// Revert migrations down to TARGET (`base` or a revision id).
  Downgrade { target: Target },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();

  let settings = Settings::load(&cli.config)
    .with_context(|| format!("failed to load settings from {:?}", cli.config))?;

  let default_level =
    if settings.debug { LevelFilter::DEBUG } else { LevelFilter::INFO };
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy(),
    )
    .init();

  tracing::debug!(?settings, "loaded settings");

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(settings).await,
    Command::Migrate { action } => migrate(&settings, action).await,
  }
}

async fn open_store(settings: &Settings) -> anyhow::Result<SqliteStore> {
  let location = settings
    .store_location()
    .context("invalid database_url")?;
  SqliteStore::connect(&location)
    .await
    .with_context(|| format!("failed to open store at {location:?}"))
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
  let store = open_store(&settings).await?;

  if settings.debug {
    let applied = store
      .init_schema()
      .await
      .context("failed to initialise schema")?;
    if !applied.is_empty() {
      info!(?applied, "schema initialised");
    }
  } else {
    let status = store
      .migration_status()
      .await
      .context("failed to read schema revision")?;
    if !status.is_current() {
      anyhow::bail!(
        "database is at revision {} but head is {}; run `varinaut-server \
         migrate upgrade` first",
        status.current.unwrap_or("base"),
        status.head,
      );
    }
  }

  let app = varinaut_server::app(&settings, Arc::new(store))?;
  let address = settings.bind_address();

  info!(app = %settings.app_name, "Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  info!("server stopped");
  Ok(())
}

async fn migrate(settings: &Settings, action: MigrateAction) -> anyhow::Result<()> {
  let store = open_store(settings).await?;

  match action {
    MigrateAction::Status => {
      let status = store.migration_status().await?;
      println!("current: {}", status.current.unwrap_or("base"));
      println!("head:    {}", status.head);
      if status.is_current() {
        println!("up to date");
      } else {
        for revision in &status.pending {
          println!("pending: {revision}");
        }
      }
    }
    MigrateAction::Upgrade { target } => {
      let applied = store
        .upgrade(target.clone())
        .await
        .with_context(|| format!("upgrade to {target} failed"))?;
      report("applied", &applied);
    }
    MigrateAction::Downgrade { target } => {
      let reverted = store
        .downgrade(target.clone())
        .await
        .with_context(|| format!("downgrade to {target} failed"))?;
      report("reverted", &reverted);
    }
  }
  Ok(())
}

fn report(verb: &str, revisions: &[&str]) {
  if revisions.is_empty() {
    println!("nothing to do");
  }
  for revision in revisions {
    println!("{verb} {revision}");
  }
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!("failed to listen for shutdown signal: {e}");
    std::future::pending::<()>().await;
  }
  info!("shutdown signal received");
}
