//! Mapping of transport and HTTP failures onto [`ApiError`] kinds.
use std::time::Duration;

use reqwest::{
    StatusCode,
    header::{HeaderMap, RETRY_AFTER},
};
use serde_json::Value;

use gantry_core::api::ApiError;

/// Upper bound on surfaced error text; api error bodies are far below it.
const MAX_MESSAGE: usize = 64 * 1024;

/// Timeouts and connection failures are transient; anything else the transport
/// reports (redirect loops, invalid requests, decode errors) is not.
pub(crate) fn transport(operation: &'static str, err: &reqwest::Error) -> ApiError {
    let msg = err.to_string();
    if err.is_timeout() || err.is_connect() || err.is_request() {
        ApiError::transient(operation, msg)
    } else {
        ApiError::permanent(operation, msg)
    }
}

/// 408, 429 and 5xx are transient; other non-success statuses are permanent.
pub(crate) fn status(
    operation: &'static str,
    status: StatusCode,
    body: &str,
    retry_after: Option<Duration>,
) -> ApiError {
    let message = message(status, body);
    let transient = status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error();

    let err = if transient {
        ApiError::transient(operation, message)
    } else {
        ApiError::permanent(operation, message)
    };
    let err = err.with_status(status.as_u16());
    match retry_after {
        Some(delay) if transient => err.with_retry_after(delay),
        _ => err,
    }
}

/// `Retry-After` in delta-seconds form. HTTP-date values are ignored.
pub(crate) fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Remote error text: the `error`/`message` field of a JSON body, else the raw body.
fn message(status: StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        ["error", "message", "detail"]
            .iter()
            .find_map(|k| v.get(*k).and_then(Value::as_str).map(str::to_string))
    });

    let text = from_json.unwrap_or_else(|| body.trim().to_string());
    if text.is_empty() {
        return status.to_string();
    }
    if text.len() <= MAX_MESSAGE {
        return text;
    }
    let mut cut = MAX_MESSAGE;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}... (truncated, {} bytes total)", &text[..cut], text.len())
}
