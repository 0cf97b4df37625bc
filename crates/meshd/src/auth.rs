//! Bearer token authentication.
//!
//! Tokens are never trusted as-is: every request carrying one is checked
//! against the identity service before a handler runs.

use crate::error::ApiError;
use crate::server::AppState;
use crate::supabase::UpstreamError;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use mesh_shared::redact::mask_token;
use mesh_shared::{AuthUser, MeshUser};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Extract the token from `Authorization: Bearer <token>`.
///
/// The scheme is matched case-insensitively; blank tokens count as absent.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get("authorization")?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Caller whose token the identity service accepted
#[derive(Clone)]
pub struct Caller {
    pub token: String,
    pub user: AuthUser,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("Missing Bearer JWT".to_string()))?;

        match state.supabase.current_user(&token).await {
            Ok(user) => {
                debug!(user_id = %user.id, token = %mask_token(&token), "token validated");
                Ok(Caller { token, user })
            }
            Err(UpstreamError::Rejected { status, message }) => {
                warn!(status, reason = %message, token = %mask_token(&token), "token rejected");
                Err(ApiError::Unauthorized("JWT inválido ou sessão expirada.".to_string()))
            }
            Err(e) => {
                error!(error = %e, "token validation failed");
                Err(e.into())
            }
        }
    }
}

/// Mesh account of a caller; 404 when the auth user has none
pub async fn require_mesh_user(state: &AppState, caller: &Caller) -> Result<MeshUser, ApiError> {
    match state.supabase.mesh_user_for(&caller.user.id).await {
        Ok(Some(mesh_user)) => Ok(mesh_user),
        Ok(None) => {
            warn!(user_id = %caller.user.id, "no mesh user linked");
            Err(ApiError::NotFound("Utilizador Mesh não encontrado.".to_string()))
        }
        Err(e) => {
            error!(user_id = %caller.user.id, error = %e, "mesh user lookup failed");
            Err(e.into())
        }
    }
}
