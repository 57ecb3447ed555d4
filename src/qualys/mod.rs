//! # Qualys Connector API
//!
//! Lifecycle operations on the remote AWS EC2 connector resource.
//!
//! [`ConnectorService`] is the seam the orchestrator talks to.
//! [`QualysClient`] implements it over the QPS REST API.

mod client;

pub use client::QualysClient;

use crate::connector::Connector;
use crate::error::Result;
use async_trait::async_trait;

/// Outcome of a create call
///
/// A 2xx with zero connectors is a valid outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateResult {
    pub connectors: Vec<Connector>,
    /// `true` for any 2xx status
    pub succeeded: bool,
    pub status: u16,
}

/// Outcome of an activate or delete call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationResult {
    /// `true` for any 2xx status
    pub succeeded: bool,
    pub status: u16,
}

impl OperationResult {
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        Self {
            succeeded: (200..300).contains(&status),
            status,
        }
    }
}

/// Connector lifecycle operations
#[async_trait]
pub trait ConnectorService: Send + Sync {
    /// Every connector visible to the account, in server order
    ///
    /// # Errors
    ///
    /// Non-2xx responses are errors here, as are transport and parse failures.
    async fn list_connectors(&self) -> Result<Vec<Connector>>;

    /// Create a disabled connector named `name`
    async fn create(&self, name: &str) -> Result<CreateResult>;

    /// Attach `role_arn` to connector `id` and enable it
    async fn activate(&self, id: &str, role_arn: &str) -> Result<OperationResult>;

    /// Delete every connector named `name`
    async fn delete(&self, name: &str) -> Result<OperationResult>;

    /// First connector named `name`, in list order
    async fn find_by_name(&self, name: &str) -> Result<Option<Connector>> {
        Ok(self
            .list_connectors()
            .await?
            .into_iter()
            .find(|c| c.name == name))
    }
}
