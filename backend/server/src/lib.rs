//! Documentation of the Roomify project persistence API.
//!
//! # General Infrastructure
//! - Frontend uploads a floor plan through the upload widget
//! - Widget hands the encoded image back to the page, which saves it as a project
//! - Every route resolves the caller's bearer token to a user before anything else
//! - Each user gets their own namespace inside one shared key-value store
//!
//!
//!
//! # Routes
//!
//! | Route | Success | Failures |
//! | --- | --- | --- |
//! | `POST /api/projects/save` | `{ saved: true, id, project }` | 401, 400, 500 |
//! | `GET /api/projects/list` | `{ projects: [...] }`, each with `isPublic: true` | 401, 500 |
//! | `GET /api/projects/get?id=<id>` | `{ project }` | 401, 400, 404, 500 |
//!
//! Errors are `{ error, ...extra }` with `Access-Control-Allow-Origin: *`. Internal
//! errors add `message` with the underlying cause.
//!
//!
//!
//! # Notes
//!
//! ## No delete
//! Projects can be created, overwritten, read and listed. There is no delete route.
//!
//! ## Body size
//! Save bodies carry the whole image as a data URL, so the body limit is raised well
//! above axum's default. See `MAX_BODY_BYTES`. The limit is enforced while the body
//! is buffered, but the caller is still authenticated first: an oversized save is a
//! JSON `401` without a valid token and a JSON `413 Payload too large` with one.
//!
//!
//!
//! # Setup
//!
//! Run against a local Redis.
//! ```sh
//! REDIS_URL=redis://127.0.0.1:6379 RUST_LOG=info cargo run -p roomify-backend
//! ```
//!
//! Run without Redis.
//! ```sh
//! ROOMIFY_STORE=memory RUST_LOG=debug cargo run -p roomify-backend
//! ```
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod memory;
pub mod project;
pub mod routes;
pub mod state;
pub mod utils;

use config::Config;
use routes::{get_handler, list_handler, save_handler};
use state::State;

pub async fn start_server() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let config = Config::load()?;
    let state = State::new(config).await?;

    info!("Starting server...");

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutting down...");

    Ok(())
}

pub fn build_router(state: Arc<State>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/api/projects/save", post(save_handler))
        .route("/api/projects/list", get(list_handler))
        .route("/api/projects/get", get(get_handler))
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
