//! Request payload schemas.
//!
//! Each route accepts a raw shape with every field optional and turns it
//! into a validated value through [`Validate`]. Handlers only ever see the
//! validated value.

use crate::error::PayloadError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Raw payload that can be checked into a typed value.
pub trait Validate: DeserializeOwned {
    type Output;

    fn validate(self) -> Result<Self::Output, PayloadError>;
}

/// Deserialize and validate a request body in one step.
pub fn parse<R: Validate>(body: &[u8]) -> Result<R::Output, PayloadError> {
    let raw: R = serde_json::from_slice(body).map_err(|e| PayloadError::InvalidJson(e.to_string()))?;
    raw.validate()
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ============================================================================
// Login
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Email and password for the password grant.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

// Keeps the password out of logs and panics.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[hidden]")
            .finish()
    }
}

impl Validate for LoginRequest {
    type Output = Credentials;

    fn validate(self) -> Result<Credentials, PayloadError> {
        let email = trimmed(self.email);
        // Passwords are taken verbatim; only emptiness is rejected.
        let password = self.password.filter(|p| !p.is_empty());
        match (email, password) {
            (Some(email), Some(password)) => Ok(Credentials { email, password }),
            _ => Err(PayloadError::MissingCredentials),
        }
    }
}

// ============================================================================
// Device registration / removal
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct RegisterDeviceRequest {
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Device to insert. `owner` is only a claim; the daemon checks it against
/// the caller's mesh account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDevice {
    pub device_id: String,
    pub owner: Option<String>,
    pub notes: Option<String>,
}

impl Validate for RegisterDeviceRequest {
    type Output = NewDevice;

    fn validate(self) -> Result<NewDevice, PayloadError> {
        let device_id = trimmed(self.device_id).ok_or(PayloadError::MissingField("device_id"))?;
        Ok(NewDevice {
            device_id,
            owner: trimmed(self.owner),
            notes: trimmed(self.notes),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RemoveDeviceRequest {
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
}

/// Reference to an existing device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRef {
    pub device_id: String,
    pub owner: Option<String>,
}

impl Validate for RemoveDeviceRequest {
    type Output = DeviceRef;

    fn validate(self) -> Result<DeviceRef, PayloadError> {
        let device_id = trimmed(self.device_id).ok_or(PayloadError::MissingField("device_id"))?;
        Ok(DeviceRef {
            device_id,
            owner: trimmed(self.owner),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials {
            email: "a@b.pt".into(),
            password: "hunter2".into(),
        };
        let shown = format!("{:?}", creds);
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("[hidden]"));
    }

    #[test]
    fn test_password_not_trimmed() {
        let creds = parse::<LoginRequest>(br#"{"email":" a@b.pt ","password":" pw "}"#).unwrap();
        assert_eq!(creds.email, "a@b.pt");
        assert_eq!(creds.password, " pw ");
    }
}
