//! API routes for meshd

use crate::auth::{require_mesh_user, Caller};
use crate::error::ApiError;
use crate::extract::Valid;
use crate::logging::DebugLogState;
use crate::middleware::client_ip;
use crate::server::AppState;
use crate::supabase::UpstreamError;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use mesh_shared::payload::{LoginRequest, RegisterDeviceRequest, RemoveDeviceRequest};
use mesh_shared::redact::{correlation_id, mask_email};
use mesh_shared::{group_devices, AuthUser, Device, GroupedDevices, MeshUser, VERSION};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

type AppStateArc = Arc<AppState>;

// ============================================================================
// Auth Routes
// ============================================================================

pub fn auth_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/login", post(login))
        .route("/v1/session", get(session))
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

async fn login(
    State(state): State<AppStateArc>,
    headers: HeaderMap,
    Valid(credentials): Valid<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let started = Instant::now();
    let request_id = correlation_id("login");
    let client_ip = client_ip(&headers);
    let email = mask_email(Some(&credentials.email));

    info!(%request_id, %client_ip, email = %email, "Login request received");

    let grant = match state.supabase.password_grant(&credentials).await {
        Ok(grant) => grant,
        Err(UpstreamError::Rejected { status, message }) => {
            warn!(%request_id, status, reason = %message, email = %email, "Login rejected");
            let message = if message.is_empty() {
                "Falha no login".to_string()
            } else {
                message
            };
            return Err(ApiError::Upstream { status, message });
        }
        Err(e) => {
            error!(%request_id, %client_ip, error = %e, "Login failed");
            return Err(e.into());
        }
    };

    let token = match grant.access_token.filter(|t| !t.is_empty()) {
        Some(token) => token,
        None => {
            warn!(%request_id, "Login succeeded without token in response");
            return Err(ApiError::BadGateway("Resposta sem token.".to_string()));
        }
    };

    debug!(
        %request_id,
        duration_ms = started.elapsed().as_millis() as u64,
        "Login request completed"
    );
    Ok(Json(LoginResponse { token }))
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub ok: bool,
    pub user: AuthUser,
    pub mesh_user: Option<MeshUser>,
    pub devices: Vec<Device>,
}

/// Who the caller is, with their mesh account and devices when linked.
/// Lookup failures are logged and degrade to empty values.
async fn session(State(state): State<AppStateArc>, caller: Caller) -> Json<SessionResponse> {
    let mesh_user = state
        .supabase
        .mesh_user_for(&caller.user.id)
        .await
        .unwrap_or_else(|e| {
            error!(user_id = %caller.user.id, error = %e, "mesh_users lookup error");
            None
        });

    let devices = match &mesh_user {
        Some(mesh_user) => state
            .supabase
            .devices_for_owner(&mesh_user.mesh_username)
            .await
            .unwrap_or_else(|e| {
                error!(owner = %mesh_user.mesh_username, error = %e, "devices lookup error");
                Vec::new()
            }),
        None => Vec::new(),
    };

    Json(SessionResponse {
        ok: true,
        user: caller.user,
        mesh_user,
        devices,
    })
}

// ============================================================================
// Device Routes
// ============================================================================

pub fn device_routes() -> Router<AppStateArc> {
    Router::new()
        .route(
            "/v1/devices",
            get(list_devices).post(register_device).delete(remove_device),
        )
        .route("/v1/devices/grouped", get(grouped_devices))
}

/// The caller may only act on devices of their own mesh account.
fn owner_for(claimed: Option<&str>, mesh_user: &MeshUser) -> Result<String, ApiError> {
    match claimed {
        Some(owner) if owner != mesh_user.mesh_username => Err(ApiError::Forbidden(
            "Sem permissão para gerir dispositivos de outro utilizador.".to_string(),
        )),
        _ => Ok(mesh_user.mesh_username.clone()),
    }
}

async fn load_devices(state: &AppState, caller: &Caller, request_id: &str) -> Result<Vec<Device>, ApiError> {
    let mesh_user = require_mesh_user(state, caller).await?;

    state
        .supabase
        .devices_for_owner(&mesh_user.mesh_username)
        .await
        .map_err(|e| {
            error!(%request_id, owner = %mesh_user.mesh_username, error = %e, "get-devices error");
            match e {
                UpstreamError::Rejected { .. } => {
                    ApiError::Internal("Erro a carregar dispositivos.".to_string())
                }
                other => other.into(),
            }
        })
}

async fn list_devices(State(state): State<AppStateArc>, caller: Caller) -> Result<Json<Vec<Device>>, ApiError> {
    let request_id = correlation_id("get-devices");
    let devices = load_devices(&state, &caller, &request_id).await?;
    debug!(%request_id, count = devices.len(), "devices loaded");
    Ok(Json(devices))
}

async fn grouped_devices(
    State(state): State<AppStateArc>,
    caller: Caller,
) -> Result<Json<GroupedDevices>, ApiError> {
    let request_id = correlation_id("get-devices");
    let devices = load_devices(&state, &caller, &request_id).await?;
    let grouped = group_devices(&devices);
    debug!(
        %request_id,
        count = devices.len(),
        groups = grouped.groups().len(),
        "devices grouped"
    );
    Ok(Json(grouped))
}

async fn register_device(
    State(state): State<AppStateArc>,
    caller: Caller,
    Valid(device): Valid<RegisterDeviceRequest>,
) -> Result<(StatusCode, Json<Vec<Device>>), ApiError> {
    let request_id = correlation_id("register-device");
    let mesh_user = require_mesh_user(&state, &caller).await?;
    let owner = owner_for(device.owner.as_deref(), &mesh_user).map_err(|e| {
        warn!(%request_id, user_id = %caller.user.id, "register for foreign owner refused");
        e
    })?;

    let rows = state.supabase.insert_device(&owner, &device).await.map_err(|e| {
        error!(%request_id, device_id = %device.device_id, error = %e, "register-device error");
        ApiError::from(e)
    })?;

    info!(%request_id, device_id = %device.device_id, %owner, "device registered");
    Ok((StatusCode::CREATED, Json(rows)))
}

async fn remove_device(
    State(state): State<AppStateArc>,
    caller: Caller,
    Valid(target): Valid<RemoveDeviceRequest>,
) -> Result<Json<Vec<Device>>, ApiError> {
    let request_id = correlation_id("remove-device");
    let mesh_user = require_mesh_user(&state, &caller).await?;
    let owner = owner_for(target.owner.as_deref(), &mesh_user).map_err(|e| {
        warn!(%request_id, user_id = %caller.user.id, "remove for foreign owner refused");
        e
    })?;

    let rows = state
        .supabase
        .delete_device(&owner, &target.device_id)
        .await
        .map_err(|e| {
            error!(%request_id, device_id = %target.device_id, error = %e, "remove-device error");
            ApiError::from(e)
        })?;

    if rows.is_empty() {
        return Err(ApiError::NotFound("Dispositivo não encontrado.".to_string()));
    }

    info!(%request_id, device_id = %target.device_id, %owner, "device removed");
    Ok(Json(rows))
}

// ============================================================================
// Health Routes
// ============================================================================

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/health", get(health_check))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub debug_log: DebugLogState,
}

async fn health_check(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: VERSION.to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        debug_log: state.debug_log.state(),
    })
}
