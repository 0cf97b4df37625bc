//! Records exchanged with the identity service and the device registry.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One Android device registered against the relay.
///
/// Only the columns the backend reasons about are typed; anything else the
/// registry returns is kept in `extra` and written back out unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Store-assigned identifier
    pub id: String,
    /// Relay-facing identifier
    pub device_id: String,
    /// Mesh username of the owning account
    pub owner: String,
    /// Free-text notes, "group | subgroup | ..." by convention
    #[serde(default)]
    pub notes: Option<String>,
    /// Explicit group override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    /// Explicit subgroup override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subgroup_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Device {
    /// Create a device with no notes and no overrides
    pub fn new(id: impl Into<String>, device_id: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            device_id: device_id.into(),
            owner: owner.into(),
            notes: None,
            group_name: None,
            subgroup_name: None,
            extra: Map::new(),
        }
    }

    /// Set the notes
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Set the explicit group override
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group_name = Some(group.into());
        self
    }

    /// Set the explicit subgroup override
    pub fn with_subgroup(mut self, subgroup: impl Into<String>) -> Self {
        self.subgroup_name = Some(subgroup.into());
        self
    }
}

/// User as reported by the identity service for a bearer token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Row of `mesh_users`, linking an auth user to a relay account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshUser {
    pub id: String,
    #[serde(default)]
    pub auth_user_id: Option<String>,
    pub mesh_username: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Successful password grant.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenGrant {
    /// Missing when the identity service answers 2xx without issuing a session
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}
