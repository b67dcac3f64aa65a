//! Booklist Server — axum HTTP front end for the record store.
//!
//! The server holds no book logic of its own: every route forwards to
//! [`booklist_core::RecordStore`] and maps the result onto a status code.

pub mod api;
pub mod error;

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use booklist_core::{AppConfig, JsonFileStorage, RecordStore, Storage};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use api::{AppState, SharedStore};
pub use error::ApiError;

/// Build the full application: API routes, optional static UI, tracing and CORS.
pub fn router(store: SharedStore, static_dir: Option<&Path>) -> Router {
    let app = api::routes(AppState::new(store));
    let app = match static_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app,
    };
    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Open the configured JSON data file as a shareable store.
pub fn open_store(config: &AppConfig) -> SharedStore {
    let storage: Box<dyn Storage> = Box::new(JsonFileStorage::new(config.data_file()));
    Arc::new(RecordStore::new(storage))
}

/// Bind to the configured address and serve until ctrl-c.
pub async fn serve(config: &AppConfig, store: SharedStore) -> anyhow::Result<()> {
    let static_dir = config.server.static_dir.as_deref().map(Path::new);
    let app = router(store, static_dir);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!(
        addr = %listener.local_addr()?,
        data_file = %config.data_file().display(),
        "server running"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}
