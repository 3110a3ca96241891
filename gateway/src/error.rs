use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Internal error type for the ops surface and unexpected pipeline faults.
/// Analysis failures must be observable: anything unhandled becomes a
/// structured 500 with diagnostic detail, never a silent forward or a silent
/// deception.
#[derive(Debug)]
pub enum GatewayError {
    /// Database error (500)
    Database(sqlx::Error),
    /// Request body exceeded the buffering limit (413)
    PayloadTooLarge,
    /// Anything else unexpected (500)
    Internal(String),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let request_id = uuid::Uuid::now_v7().to_string();

        let (status, error, message, detail) = match self {
            GatewayError::Database(err) => {
                tracing::error!("Database error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "The gateway failed to process this request",
                    format!("database error: {err}"),
                )
            }
            GatewayError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                "Request body is larger than the gateway accepts",
                format!(
                    "limit is {} bytes",
                    crate::routes::proxy::MAX_BODY_BYTES
                ),
            ),
            GatewayError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "The gateway failed to process this request",
                    msg,
                )
            }
        };

        let body = json!({
            "error": error,
            "message": message,
            "detail": detail,
            "request_id": request_id,
        });

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for GatewayError {
    fn from(err: sqlx::Error) -> Self {
        GatewayError::Database(err)
    }
}
