//! tollgate-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite ledger, starts the recurring earnings-release scheduler, and
//! serves the JSON API over HTTP.

use std::{path::PathBuf, sync::Arc, time::Duration as StdDuration};

use anyhow::Context as _;
use chrono::{Duration, Utc};
use clap::Parser;
use serde::Deserialize;
use tokio::net::TcpListener;
use tollgate_core::{policy::LedgerPolicy, release::run_release};
use tollgate_store_sqlite::SqliteStore;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Tollgate ledger server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

/// Runtime server configuration, deserialised from `config.toml` layered
/// with the `TOLLGATE_*` environment.
#[derive(Deserialize, Clone)]
struct ServerConfig {
  host:       String,
  port:       u16,
  store_path: PathBuf,

  /// Days a completed purchase's earnings stay pending.
  #[serde(default = "default_hold_period_days")]
  hold_period_days:      i64,
  /// Buyer-session retention, in days.
  #[serde(default = "default_session_ttl_days")]
  session_ttl_days:      i64,
  /// Seconds between scheduled release runs.
  #[serde(default = "default_release_interval_secs")]
  release_interval_secs: u64,
}

fn default_hold_period_days() -> i64 { 7 }
fn default_session_ttl_days() -> i64 { 90 }
fn default_release_interval_secs() -> u64 { 3_600 }

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("TOLLGATE"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let policy = LedgerPolicy {
    hold_period: Duration::days(server_cfg.hold_period_days),
    session_ttl: Duration::days(server_cfg.session_ttl_days),
    ..LedgerPolicy::default()
  };

  // Open the SQLite ledger.
  let store = SqliteStore::open(&server_cfg.store_path, policy)
    .await
    .with_context(|| {
      format!("failed to open store at {:?}", server_cfg.store_path)
    })?;
  let store = Arc::new(store);

  // Recurring release scheduler. The first tick fires immediately, catching
  // up anything that became due while the server was down.
  let scheduler_store = store.clone();
  let interval = StdDuration::from_secs(server_cfg.release_interval_secs);
  tokio::spawn(async move {
    let mut ticker = tokio::time::interval(interval);
    loop {
      ticker.tick().await;
      match run_release(scheduler_store.as_ref(), Utc::now()).await {
        Ok(summary) => tracing::info!(
          released = summary.released,
          considered = summary.total,
          "release run finished"
        ),
        Err(e) => tracing::error!(error = %e, "release run failed"),
      }
    }
  });

  let app = tollgate_api::api_router(store).layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
