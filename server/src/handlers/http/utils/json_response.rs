use anyhow::{Context, Result, anyhow};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::{Response, StatusCode, header};
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use tracing::{debug, error};

use crate::auth::AuthError;

pub type HttpResponse = Response<BoxBody<Bytes, Infallible>>;

pub fn full<T: Into<Bytes>>(chunk: T) -> BoxBody<Bytes, Infallible> {
    Full::new(chunk.into()).boxed()
}

/// Serialize any `Serialize` type and deliver it as a JSON response.
pub fn deliver_serialized_json<T: Serialize>(data: &T, status: StatusCode) -> Result<HttpResponse> {
    let json = serde_json::to_string(data).context("Failed to serialize response")?;

    debug!("Delivering serialized JSON response, size: {} bytes", json.len());

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(full(json))
        .map_err(|e| anyhow!("Failed to build JSON response: {}", e))
}

/// `{"status":"error","code":..,"message":..}` with the given status.
pub fn deliver_error_json(
    error_code: &str,
    message: &str,
    status: StatusCode,
) -> Result<HttpResponse> {
    if status.is_server_error() {
        error!("Delivering error JSON: {} - {} ({})", status.as_u16(), error_code, message);
    } else {
        debug!("Delivering error JSON: {} - {} ({})", status.as_u16(), error_code, message);
    }

    let error_json = json!({
        "status": "error",
        "code": error_code,
        "message": message
    });

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(full(error_json.to_string()))
        .map_err(|e: http::Error| anyhow!("Failed to build error JSON response: {}", e))
}

/// `{"status":"success","data":..}`, or just the status when `data` is `None`.
pub fn deliver_success_json<T: Serialize>(data: Option<T>, status: StatusCode) -> Result<HttpResponse> {
    let response_body = match data {
        Some(d) => json!({
            "status": "success",
            "data": d
        }),
        None => json!({
            "status": "success"
        }),
    };

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(full(response_body.to_string()))
        .map_err(|e: http::Error| anyhow!("Failed to build success JSON response: {}", e))
}

/// Render an [`AuthError`] with its own status and code.
pub fn deliver_auth_error(err: &AuthError) -> Result<HttpResponse> {
    deliver_serialized_json(&err.to_error_response(), err.status())
}

pub fn not_found(message: &str) -> Result<HttpResponse> {
    deliver_error_json("NOT_FOUND", message, StatusCode::NOT_FOUND)
}

pub fn bad_request(code: &str, message: &str) -> Result<HttpResponse> {
    deliver_error_json(code, message, StatusCode::BAD_REQUEST)
}
