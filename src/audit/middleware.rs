//! Request history middleware.
//!
//! Buffers each response so its body can be recorded, then hands the record
//! to the [`HistoryLogger`] and returns the response unchanged.

use std::collections::BTreeMap;

use axum::{
    body::{self, Body},
    extract::{Query, Request, State},
    http::{StatusCode, Uri},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use super::{HistoryLogger, HistoryRecord};

/// Largest response body the middleware will buffer.
const MAX_RECORDED_BODY: usize = 1024 * 1024;

/// Query string as a JSON object with keys in sorted order.
fn params_json(uri: &Uri) -> String {
    let params = Query::<BTreeMap<String, String>>::try_from_uri(uri)
        .map(|Query(params)| params)
        .unwrap_or_default();
    serde_json::to_string(&params).unwrap_or_else(|_| "{}".to_string())
}

/// `message` field of a JSON error body, else the status reason.
fn error_message(status: StatusCode, body: &[u8]) -> Option<String> {
    if status.is_success() {
        return None;
    }
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message")?.as_str().map(str::to_owned))
        .or_else(|| status.canonical_reason().map(str::to_owned))
}

// == Middleware ==
pub async fn audit_middleware(
    State(logger): State<HistoryLogger>,
    request: Request,
    next: Next,
) -> Response {
    let endpoint = request.uri().path().to_string();
    let params = params_json(request.uri());

    let response = next.run(request).await;
    let (parts, body) = response.into_parts();

    let bytes = match body::to_bytes(body, MAX_RECORDED_BODY).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(endpoint = %endpoint, error = %err, "Could not buffer response body for history");
            logger.log(HistoryRecord::new(
                endpoint,
                params,
                String::new(),
                parts.status.as_u16(),
                error_message(parts.status, &[]),
            ));
            return Response::from_parts(parts, Body::empty());
        }
    };

    logger.log(HistoryRecord::new(
        endpoint,
        params,
        String::from_utf8_lossy(&bytes).into_owned(),
        parts.status.as_u16(),
        error_message(parts.status, &bytes),
    ));

    Response::from_parts(parts, Body::from(bytes))
}
