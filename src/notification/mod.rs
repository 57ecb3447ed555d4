//! # Notifications
//!
//! Provisioning reports sent at the end of every handled event.

mod slack;

pub use slack::SlackNotifier;

use crate::connector::Connector;
use crate::error::Result;
use async_trait::async_trait;

/// Outcome report for one account
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningNotice {
    Success {
        account_name: String,
        account_id: String,
        connector: Connector,
        creation_succeeded: bool,
        activation_succeeded: bool,
    },
    Failure {
        account_name: String,
        account_id: String,
        error_message: String,
    },
}

impl ProvisioningNotice {
    #[must_use]
    pub fn account_name(&self) -> &str {
        match self {
            Self::Success { account_name, .. } | Self::Failure { account_name, .. } => account_name,
        }
    }

    #[must_use]
    pub fn account_id(&self) -> &str {
        match self {
            Self::Success { account_id, .. } | Self::Failure { account_id, .. } => account_id,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Notification sink
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `notice`
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ProvisionerError::Notification`] when the sink rejects it.
    async fn notify(&self, notice: &ProvisioningNotice) -> Result<()>;
}
