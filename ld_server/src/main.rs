//! Game server for the bluffing card game.
//!
//! Serves the game directory over HTTP, live play over WebSockets, and the
//! browser client from a static directory.

use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Error;
use ld_server::{
    api::{self, AppState},
    config::ServerConfig,
    logging, metrics,
};
use liars_deck::GameManager;
use log::{error, info};
use pico_args::Arguments;

const HELP: &str = "\
Run a bluffing card game server

USAGE:
  ld_server [OPTIONS]

OPTIONS:
  --bind        IP:PORT    Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --static-dir  PATH       Directory of client assets  [default: env STATIC_DIR or ./static]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  STATIC_DIR               Directory of client assets
  REVEAL_DELAY_MS          Pause after penalties, in milliseconds [default: 2000]
  MAX_GAMES                Maximum concurrent games [default: 100]
  METRICS_ENABLED          Serve Prometheus metrics at /metrics [default: true]
  RUST_LOG                 Log filter [default: info]
  (A .env file in the working directory is loaded first)
";

/// How often finished, abandoned games are dropped.
const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

struct Args {
    bind: Option<SocketAddr>,
    static_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        static_dir: pargs.opt_value_from_str("--static-dir")?,
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.static_dir)?;
    config.validate()?;
    info!("Loaded configuration: {:?}", config);

    let metrics_handle = if config.metrics_enabled {
        Some(metrics::install_recorder().map_err(anyhow::Error::msg)?)
    } else {
        None
    };

    let game_manager = Arc::new(GameManager::new(config.game_settings(), config.max_games));

    let pruner = game_manager.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            if pruner.prune_finished().await > 0 {
                metrics::active_games(pruner.game_count().await);
            }
        }
    });

    let state = AppState {
        game_manager,
        metrics_handle,
        static_dir: config.static_dir.clone(),
    };
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
