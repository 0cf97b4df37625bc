//! Validated JSON body extractor.

use crate::error::ApiError;
use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use mesh_shared::payload::{self, Validate};
use mesh_shared::PayloadError;
use tracing::warn;

/// Request body parsed as `R` and validated into `R::Output`.
///
/// Rejects with 400 before the handler runs, or 413 when the body is
/// longer than the router's body limit.
pub struct Valid<R: Validate>(pub R::Output);

#[async_trait]
impl<S, R> FromRequest<S> for Valid<R>
where
    S: Send + Sync,
    R: Validate + Send + 'static,
    R::Output: Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let path = req.uri().path().to_string();
        let bytes = Bytes::from_request(req, state).await.map_err(|e| {
            warn!(%path, error = %e.body_text(), "unreadable request body");
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::PayloadTooLarge
            } else {
                ApiError::from(PayloadError::InvalidJson(e.body_text()))
            }
        })?;

        payload::parse::<R>(&bytes).map(Valid).map_err(|e| {
            warn!(%path, kind = e.kind(), "payload rejected");
            ApiError::from(e)
        })
    }
}
