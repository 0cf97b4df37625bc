//! HTTP client for the identity service and device registry.
//!
//! Talks to a Supabase project: GoTrue under `/auth/v1` for password grants
//! and token checks, PostgREST under `/rest/v1` for the `mesh_users` and
//! `android_devices` tables. REST calls use the service-role key, which is
//! only ever held by the daemon.

use crate::config::SupabaseConfig;
use mesh_shared::{AuthUser, Credentials, Device, MeshUser, NewDevice, TokenGrant};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const MESH_USERS: &str = "mesh_users";
const DEVICES: &str = "android_devices";

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("upstream request timed out")]
    Timeout,

    #[error("upstream unreachable: {0}")]
    Transport(String),

    #[error("upstream returned {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("unexpected upstream response: {0}")]
    Decode(String),
}

impl UpstreamError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout
        } else if err.is_decode() {
            UpstreamError::Decode(err.to_string())
        } else {
            UpstreamError::Transport(err.to_string())
        }
    }
}

/// Pick the most useful message out of an error body.
///
/// GoTrue uses `msg` / `error_description`, PostgREST uses `message`.
pub fn rejection_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "msg", "error_description", "error"]
        .iter()
        .filter_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|m| !m.is_empty())
        .map(str::to_string)
}

/// Client for one Supabase project
#[derive(Clone)]
pub struct SupabaseClient {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    service_role_key: String,
}

impl SupabaseClient {
    pub fn new(config: &SupabaseConfig) -> Result<Self, UpstreamError> {
        let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_secs));
        if config.bypass_proxy {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            anon_key: config.anon_key.clone(),
            service_role_key: config.service_role_key.clone(),
        })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Request against PostgREST with the service-role key
    fn rest(&self, method: reqwest::Method, table: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.rest_url(table))
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
    }

    /// Send a request and decode a 2xx JSON body, turning anything else
    /// into an `UpstreamError`.
    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, UpstreamError> {
        let response = request.send().await.map_err(UpstreamError::from_reqwest)?;
        let status = response.status();
        let body = response.text().await.map_err(UpstreamError::from_reqwest)?;
        debug!(status = status.as_u16(), bytes = body.len(), "upstream responded");

        if !status.is_success() {
            // Empty when the body carries nothing usable
            let message = rejection_message(&body).unwrap_or_default();
            return Err(UpstreamError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| UpstreamError::Decode(e.to_string()))
    }

    // ========================================================================
    // Auth
    // ========================================================================

    /// Exchange email and password for a session
    pub async fn password_grant(&self, credentials: &Credentials) -> Result<TokenGrant, UpstreamError> {
        let request = self
            .client
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&json!({
                "email": credentials.email,
                "password": credentials.password,
            }));
        self.send(request).await
    }

    /// Resolve the user behind a bearer token
    pub async fn current_user(&self, jwt: &str) -> Result<AuthUser, UpstreamError> {
        let request = self
            .client
            .get(self.auth_url("user"))
            .header("apikey", &self.service_role_key)
            .bearer_auth(jwt);
        self.send(request).await
    }

    // ========================================================================
    // REST
    // ========================================================================

    /// `mesh_users` row linked to an auth user
    pub async fn mesh_user_for(&self, auth_user_id: &str) -> Result<Option<MeshUser>, UpstreamError> {
        let request = self.rest(reqwest::Method::GET, MESH_USERS).query(&[
            ("select", "*".to_string()),
            ("auth_user_id", format!("eq.{}", auth_user_id)),
            ("limit", "1".to_string()),
        ]);
        let rows: Vec<MeshUser> = self.send(request).await?;
        Ok(rows.into_iter().next())
    }

    /// Devices of one owner, oldest first
    pub async fn devices_for_owner(&self, owner: &str) -> Result<Vec<Device>, UpstreamError> {
        let request = self.rest(reqwest::Method::GET, DEVICES).query(&[
            ("select", "*".to_string()),
            ("owner", format!("eq.{}", owner)),
            ("order", "created_at.asc".to_string()),
        ]);
        self.send(request).await
    }

    /// Insert a device; returns the inserted rows
    pub async fn insert_device(&self, owner: &str, device: &NewDevice) -> Result<Vec<Device>, UpstreamError> {
        let request = self
            .rest(reqwest::Method::POST, DEVICES)
            .header("Prefer", "return=representation")
            .json(&json!({
                "device_id": device.device_id,
                "owner": owner,
                "notes": device.notes,
            }));
        self.send(request).await
    }

    /// Delete a device by relay id and owner; returns the deleted rows
    pub async fn delete_device(&self, owner: &str, device_id: &str) -> Result<Vec<Device>, UpstreamError> {
        let request = self
            .rest(reqwest::Method::DELETE, DEVICES)
            .header("Prefer", "return=representation")
            .query(&[
                ("device_id", format!("eq.{}", device_id)),
                ("owner", format!("eq.{}", owner)),
            ]);
        self.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_message_keys() {
        assert_eq!(
            rejection_message(r#"{"message":"duplicate key"}"#).as_deref(),
            Some("duplicate key")
        );
        assert_eq!(rejection_message(r#"{"msg":"invalid JWT"}"#).as_deref(), Some("invalid JWT"));
        assert_eq!(
            rejection_message(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#)
                .as_deref(),
            Some("Invalid login credentials")
        );
        assert_eq!(rejection_message(r#"{"error":"invalid_grant"}"#).as_deref(), Some("invalid_grant"));
    }

    #[test]
    fn test_rejection_message_unusable_body() {
        assert_eq!(rejection_message("<html>bad gateway</html>"), None);
        assert_eq!(rejection_message(r#"{"message":"  "}"#), None);
        assert_eq!(rejection_message(r#"{"code":42}"#), None);
    }

    #[test]
    fn test_urls_strip_trailing_slash() {
        let config = SupabaseConfig {
            url: "https://abc.supabase.co/".into(),
            anon_key: "anon".into(),
            service_role_key: "service".into(),
            ..SupabaseConfig::default()
        };
        let client = SupabaseClient::new(&config).unwrap();
        assert_eq!(client.auth_url("user"), "https://abc.supabase.co/auth/v1/user");
        assert_eq!(client.rest_url(DEVICES), "https://abc.supabase.co/rest/v1/android_devices");
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_transport_error() {
        let config = SupabaseConfig {
            url: "http://127.0.0.1:1".into(),
            anon_key: "anon".into(),
            service_role_key: "service".into(),
            timeout_secs: 2,
            bypass_proxy: true,
        };
        let client = SupabaseClient::new(&config).unwrap();
        let err = client.current_user("token").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Transport(_) | UpstreamError::Timeout));
    }
}
