// HTTP request handlers
use crate::application::acquisition_service::LifecycleError;
use crate::application::relay_service::RelayError;
use crate::infrastructure::http_response::{attachment_response, error_response, success_response};
use crate::presentation::app_state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{Response, StatusCode},
    response::{Html, IntoResponse},
};
use bytes::Bytes;
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// Control page
pub async fn index() -> Html<&'static str> {
    Html(include_str!("../../assets/index.html"))
}

/// Start a collection session and the video recording
pub async fn start_collection(State(state): State<Arc<AppState>>) -> Response<Body> {
    let acquisition = &state.acquisition;
    match acquisition.start().await {
        Ok(outcome) => success_response(
            "Started collecting data and recording video.",
            json!({
                "video_file": outcome.video_file,
                "collecting_data": acquisition.is_collecting(),
            }),
        ),
        Err(e) => error_response(
            lifecycle_status(&e),
            &e.to_string(),
            json!({ "collecting_data": acquisition.is_collecting() }),
        ),
    }
}

/// Stop the running session; the logs drain in the background
pub async fn stop_collection(State(state): State<Arc<AppState>>) -> Response<Body> {
    let acquisition = &state.acquisition;
    match acquisition.stop().await {
        Ok(()) => success_response(
            "Stopped collecting data and recording video.",
            json!({ "collecting_data": acquisition.is_collecting() }),
        ),
        Err(e) => error_response(
            lifecycle_status(&e),
            &e.to_string(),
            json!({ "collecting_data": acquisition.is_collecting() }),
        ),
    }
}

fn lifecycle_status(error: &LifecycleError) -> StatusCode {
    match error {
        LifecycleError::AlreadyRunning | LifecycleError::NotRunning => StatusCode::BAD_REQUEST,
        LifecycleError::SessionStart(_) | LifecycleError::RigUnavailable(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// `RELAY<n>_<ON|OFF>`; anything else under the root is unknown
pub async fn relay_command(
    Path(command): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response<Body> {
    let Some((channel, action)) = command
        .strip_prefix("RELAY")
        .and_then(|rest| rest.split_once('_'))
    else {
        return error_response(
            StatusCode::NOT_FOUND,
            &format!("Unknown command: {command}"),
            json!({}),
        );
    };

    match state.relays.set(channel, action).await {
        Ok((channel, relay_state)) => {
            success_response(&format!("Relay {channel} set to {relay_state}"), json!({}))
        }
        Err(e @ RelayError::Actuation(_)) => {
            tracing::error!("Relay command {} failed: {}", command, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string(), json!({}))
        }
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string(), json!({})),
    }
}

/// Collecting flag and last commanded relay states
pub async fn status(State(state): State<Arc<AppState>>) -> Response<Body> {
    let relays: Map<String, Value> = state
        .relays
        .states()
        .into_iter()
        .map(|(channel, relay_state)| (channel.to_string(), json!(relay_state)))
        .collect();

    success_response(
        "Status",
        json!({
            "collecting_data": state.acquisition.is_collecting(),
            "relays": relays,
        }),
    )
}

/// Bundle every channel log and send the archive
pub async fn download_zip(State(state): State<Arc<AppState>>) -> Response<Body> {
    let bundle = match state.archiver.bundle().await {
        Ok(bundle) => bundle,
        Err(e) => {
            tracing::error!("Archive failed: {}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string(), json!({}));
        }
    };
    tracing::info!("Archived {} logs into {}", bundle.entries.len(), bundle.path.display());

    let bytes = match tokio::fs::read(&bundle.path).await {
        Ok(bytes) => Bytes::from(bytes),
        Err(e) => {
            tracing::error!("Reading {} failed: {}", bundle.path.display(), e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string(), json!({}));
        }
    };

    match attachment_response(bytes, state.archiver.archive_name(), "application/zip") {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}
