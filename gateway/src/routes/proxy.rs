use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use luregate_core::request::RequestContext;

use crate::error::GatewayError;
use crate::forward;
use crate::state::AppState;

/// Deception responses carry this header so operators and integration tests
/// can tell them apart from relayed origin traffic.
pub const DECISION_HEADER: &str = "x-luregate-decision";

/// Requests larger than this are rejected with 413 rather than buffered.
pub const MAX_BODY_BYTES: usize = 1_048_576;

/// Fallback handler: every method and path that is not part of the ops
/// surface lands here, runs the pipeline, and is either answered with a
/// deceptive body or forwarded to the origin.
pub async fn handle(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
) -> Response {
    let (parts, body) = req.into_parts();

    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) if is_length_limit(&err) => {
            return GatewayError::PayloadTooLarge.into_response();
        }
        Err(err) => {
            return GatewayError::Internal(format!("request body read failed: {err}"))
                .into_response();
        }
    };

    let query: Vec<(String, String)> = parts
        .uri
        .query()
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default();

    let ctx = RequestContext {
        client_addr: addr.ip().to_string(),
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        query,
        user_agent: parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string(),
        body: String::from_utf8_lossy(&bytes).into_owned(),
        received_at: Utc::now(),
    };

    let outcome = state.pipeline.evaluate(&ctx).await;

    if let Some(fake_body) = outcome.deception_body {
        if outcome.throttle_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(outcome.throttle_delay_ms)).await;
        }
        return Response::builder()
            .status(StatusCode::OK)
            .header(DECISION_HEADER, outcome.decision.as_str().to_lowercase())
            .header(header::CONTENT_TYPE, outcome.deception_content_type)
            .body(Body::from(fake_body))
            .expect("deception response should build");
    }

    forward::forward_to_origin(&state.http, &state.config, &ctx, &parts.headers, bytes).await
}

/// The limit error is nested somewhere in the body-collection error chain;
/// everything else reading a body is a genuine fault.
fn is_length_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if e.downcast_ref::<http_body_util::LengthLimitError>().is_some() {
            return true;
        }
        source = e.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn oversized_bodies_are_detected_as_length_limited() {
        let body = Body::from(vec![0u8; MAX_BODY_BYTES + 1]);
        let err = axum::body::to_bytes(body, MAX_BODY_BYTES)
            .await
            .expect_err("body over the limit must not collect");
        assert!(is_length_limit(&err));
    }
}
