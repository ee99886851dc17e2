//! Structured logging configuration.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log level comes from `RUST_LOG` and defaults to `info`. Records emitted
/// through the `log` facade (the game engine logs that way) are forwarded
/// to the same subscriber.
///
/// # Example
///
/// ```no_run
/// use ld_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,tower_http=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a WebSocket lifecycle event with structured fields
pub fn log_connection_event(event_type: &str, game_id: &str, player_id: &str) {
    tracing::info!(
        event_type = event_type,
        game_id = game_id,
        player_id = player_id,
        "WebSocket {}",
        event_type
    );
}

/// Log a message dropped by a rate limiter
pub fn log_rate_limited(limiter: &str, game_id: &str, player_id: &str) {
    tracing::warn!(
        limiter = limiter,
        game_id = game_id,
        player_id = player_id,
        "RATE LIMIT: message dropped"
    );
}
