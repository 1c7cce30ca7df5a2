//! # till-server
//!
//! axum HTTP surface over the settlement coordinator.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Server Startup                                  │
//! │                                                                         │
//! │  1. Initialize Logging ───────────────────────────────────────────────► │
//! │     • tracing-subscriber with env filter                                │
//! │     • Default: info,till=debug,sqlx=warn; override with RUST_LOG        │
//! │                                                                         │
//! │  2. Load SettleConfig ────────────────────────────────────────────────► │
//! │     • defaults → till.toml (or $TILL_CONFIG) → TILL_* env               │
//! │                                                                         │
//! │  3. Connect to Database ──────────────────────────────────────────────► │
//! │     • SQLite with WAL mode                                              │
//! │     • Run pending migrations                                            │
//! │                                                                         │
//! │  4. Build AppState + Router, bind, serve until Ctrl-C                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod handlers;
pub mod state;

use axum::routing::{delete, get, post, put};
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use error::StartupError;
use state::AppState;
use till_db::Database;
use till_settle::SettleConfig;

/// Builds the router over `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/invoices/preview", post(handlers::invoice::preview_invoice))
        .route("/invoices/preview/{id}", delete(handlers::invoice::abandon_preview))
        .route("/invoices", post(handlers::invoice::commit_invoice))
        .route("/invoices/{id}", get(handlers::invoice::get_invoice))
        .route("/denominations", get(handlers::denomination::get_stock))
        .route("/denominations/{value}", put(handlers::denomination::restock))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Runs the server until Ctrl-C.
pub async fn run() -> Result<(), StartupError> {
    init_tracing();

    let config_path = std::env::var("TILL_CONFIG").ok().map(PathBuf::from);
    let config = SettleConfig::load(config_path)?;

    if let Some(dir) = config.database.path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    info!(path = ?config.database.path, "Database path determined");

    let db = Arc::new(Database::new(config.db_config()).await?);
    info!("Database connected and migrations applied");

    let state = AppState::new(db.clone(), db.clone(), &config.settlement);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
    info!(addr = %config.server.bind_addr, "Till server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Till server shutting down");
        })
        .await?;

    db.close().await;
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=till=trace` - Show trace for till crates only
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,till=debug,sqlx=warn,tower_http=debug"));

    // Ignore a second init (tests, embedding)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
