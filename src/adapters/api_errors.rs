use crate::domain::error::GatewayError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Newtype over the domain error so the HTTP mapping lives in the adapter
/// layer. User-visible bodies stay generic; full detail goes to the log.
pub struct ApiError(pub GatewayError);

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self.0 {
            GatewayError::MalformedRequest(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "malformed_request",
                msg.clone(),
            ),
            GatewayError::Signature(msg) => {
                tracing::warn!(reason = %msg, "webhook signature rejected");
                (
                    StatusCode::UNAUTHORIZED,
                    "invalid_signature",
                    "Invalid signature".to_string(),
                )
            }
            GatewayError::OrderNotFound(msg) => {
                tracing::warn!(reason = %msg, "order lookup failed");
                (
                    StatusCode::NOT_FOUND,
                    "order_not_found",
                    "order not found".to_string(),
                )
            }
            GatewayError::Remote(msg) => {
                tracing::error!(reason = %msg, "processor error");
                (
                    StatusCode::BAD_GATEWAY,
                    "processor_error",
                    "payment processor unavailable".to_string(),
                )
            }
            GatewayError::Initiation(msg) => {
                tracing::error!(reason = %msg, "payment initiation aborted");
                (
                    StatusCode::BAD_GATEWAY,
                    "initiation_failed",
                    "payment could not be initiated".to_string(),
                )
            }
            GatewayError::Configuration(msg) => {
                tracing::warn!(reason = %msg, "gateway not configured");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "gateway_disabled",
                    "payment gateway is not available".to_string(),
                )
            }
            GatewayError::Storage(err) => {
                tracing::error!("storage error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal error".to_string(),
                )
            }
            GatewayError::Serialization(err) => {
                tracing::error!("serialization error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal error".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "error_code": error_code,
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}
