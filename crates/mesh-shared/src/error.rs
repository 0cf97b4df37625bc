//! Error types shared by the backend crates.

use thiserror::Error;

/// Rejection of an incoming JSON payload, raised before any business logic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Pedido inválido")]
    InvalidJson(String),

    #[error("Email e password são obrigatórios.")]
    MissingCredentials,

    #[error("{0} is required")]
    MissingField(&'static str),
}

impl PayloadError {
    /// Stable machine-readable tag
    pub fn kind(&self) -> &'static str {
        match self {
            PayloadError::InvalidJson(_) => "invalid_json",
            PayloadError::MissingCredentials => "missing_fields",
            PayloadError::MissingField(_) => "missing_field",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(PayloadError::InvalidJson("eof".into()).to_string(), "Pedido inválido");
        assert_eq!(
            PayloadError::MissingCredentials.to_string(),
            "Email e password são obrigatórios."
        );
        assert_eq!(PayloadError::MissingField("device_id").to_string(), "device_id is required");
    }

    #[test]
    fn test_kinds() {
        assert_eq!(PayloadError::InvalidJson(String::new()).kind(), "invalid_json");
        assert_eq!(PayloadError::MissingCredentials.kind(), "missing_fields");
        assert_eq!(PayloadError::MissingField("owner").kind(), "missing_field");
    }
}
