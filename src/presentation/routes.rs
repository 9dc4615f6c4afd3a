// Control surface routing
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    download_zip, index, relay_command, start_collection, status, stop_collection,
};
use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Static routes win over `/:command`, which only carries `RELAY<n>_<action>`
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/START", get(start_collection))
        .route("/STOP", get(stop_collection))
        .route("/STATUS", get(status))
        .route("/DOWNLOAD_ZIP", get(download_zip))
        .route("/:command", get(relay_command))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
