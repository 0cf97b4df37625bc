//! Shared types and utilities for the mesh support backend.
//!
//! Holds everything that is not tied to the HTTP daemon: the device model,
//! the group/subgroup classifier, request payload schemas and the
//! redaction helpers used when logging.

pub mod device;
pub mod error;
pub mod grouping;
pub mod payload;
pub mod redact;

pub use device::{AuthUser, Device, MeshUser, TokenGrant};
pub use error::PayloadError;
pub use grouping::{group_devices, parse_notes, resolve_grouping, GroupedDevices, GroupingKey, DEFAULT_GROUP};
pub use payload::{Credentials, DeviceRef, NewDevice, Validate};

/// Crate version, reported by the daemon health endpoint.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
