//! HTTP-facing errors.
//!
//! Every failure leaves the daemon as `{"code": <status>, "message": "..."}`.

use crate::supabase::UpstreamError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mesh_shared::PayloadError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// HTTP 400
    #[error("{0}")]
    BadRequest(String),

    /// HTTP 401
    #[error("{0}")]
    Unauthorized(String),

    /// HTTP 403
    #[error("{0}")]
    Forbidden(String),

    /// HTTP 404
    #[error("{0}")]
    NotFound(String),

    /// HTTP 413
    #[error("Pedido demasiado grande.")]
    PayloadTooLarge,

    /// Upstream answered with an error status; relayed as-is
    #[error("{message}")]
    Upstream { status: u16, message: String },

    /// HTTP 502
    #[error("{0}")]
    BadGateway(String),

    /// HTTP 504
    #[error("{0}")]
    GatewayTimeout(String),

    /// HTTP 500
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PayloadError> for ApiError {
    fn from(err: PayloadError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Timeout => ApiError::GatewayTimeout("Tempo de resposta do servidor esgotado.".to_string()),
            UpstreamError::Transport(_) => ApiError::BadGateway("Servidor indisponível.".to_string()),
            UpstreamError::Decode(_) => ApiError::BadGateway("Resposta inválida do servidor.".to_string()),
            UpstreamError::Rejected { status, message } if message.is_empty() => {
                let message = StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Erro no servidor.")
                    .to_string();
                ApiError::Upstream { status, message }
            }
            UpstreamError::Rejected { status, message } => ApiError::Upstream { status, message },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "code": status.as_u16(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
