// HTTP response utilities for JSON status replies and file downloads
use axum::{
    Json,
    body::Body,
    http::{HeaderValue, Response, StatusCode, header},
    response::IntoResponse,
};
use bytes::Bytes;
use serde_json::{Map, Value, json};

/// `{"status": "success", "message": ..., ...extra}`
pub fn success_response(message: &str, extra: Value) -> Response<Body> {
    status_body(StatusCode::OK, "success", message, extra)
}

/// `{"status": "error", "message": ..., ...extra}` with the given status code
pub fn error_response(status: StatusCode, message: &str, extra: Value) -> Response<Body> {
    status_body(status, "error", message, extra)
}

fn status_body(status: StatusCode, outcome: &str, message: &str, extra: Value) -> Response<Body> {
    let mut body = Map::new();
    body.insert("status".to_string(), json!(outcome));
    body.insert("message".to_string(), json!(message));
    if let Value::Object(fields) = extra {
        body.extend(fields);
    }
    (status, Json(Value::Object(body))).into_response()
}

/// Serve `bytes` as a download named `filename`
pub fn attachment_response(
    bytes: Bytes,
    filename: &str,
    content_type: &'static str,
) -> Result<Response<Body>, StatusCode> {
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .map_err(|e| {
            tracing::error!("Invalid attachment name {}: {}", filename, e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::CONTENT_LENGTH, bytes.len())
        .body(Body::from(bytes))
        .map_err(|e| {
            tracing::error!("Response build error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
}
