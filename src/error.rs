//! # Errors
//!
//! Error taxonomy shared by the codec, the Qualys client, the collaborators
//! and the orchestrator.

use thiserror::Error;

/// Convenience alias used across the library
pub type Result<T, E = ProvisionerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ProvisionerError {
    /// Required environment value missing or unparsable. Fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// The Qualys response does not match the connector schema
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// Creation kept returning an empty connector list
    #[error("connector {name} was created but not returned after {attempts} attempt(s)")]
    EmptyCreateExhausted { name: String, attempts: u32 },

    /// Creation answered with a non-2xx status
    #[error("connector {name} creation was rejected with HTTP status {status}")]
    CreationRejected { name: String, status: u16 },

    /// Non-2xx status on a call that has no success flag
    #[error("unexpected HTTP status {status} from {endpoint}")]
    UnexpectedStatus { endpoint: String, status: u16 },

    #[error("request template error: {0}")]
    Template(String),

    #[error("role setup failed: {0}")]
    RoleSetup(String),

    #[error("notification delivery failed: {0}")]
    Notification(String),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

impl ProvisionerError {
    pub(crate) fn missing_field(field: &str) -> Self {
        Self::ProtocolViolation(format!(
            "required element <{field}> is missing from connector"
        ))
    }
}
