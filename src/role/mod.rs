//! # Connector Role Setup
//!
//! Creates the cross-account IAM role the Qualys connector assumes to read
//! EC2 inventory in a new account.

mod iam;
pub mod policy;

pub use iam::IamRoleProvisioner;

use crate::error::Result;
use async_trait::async_trait;

/// Inputs for one role setup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSetupRequest {
    /// Qualys AWS account allowed to assume the role
    pub qualys_base_account_id: String,
    /// External ID issued by Qualys for this connector
    pub external_id: String,
    /// Account the role is created in
    pub account_id: String,
}

/// Role setup collaborator
#[async_trait]
pub trait RoleSetup: Send + Sync {
    /// Ensure the connector role exists and return its ARN
    ///
    /// A role that already exists counts as success.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ProvisionerError::RoleSetup`] on any other failure.
    async fn setup_role(&self, request: &RoleSetupRequest) -> Result<String>;
}

/// `arn:aws:iam::{account_id}:role/{role_name}`
#[must_use]
pub fn role_arn(account_id: &str, role_name: &str) -> String {
    format!("arn:aws:iam::{account_id}:role/{role_name}")
}

/// `arn:aws:iam::{account_id}:policy/{policy_name}`
#[must_use]
pub fn policy_arn(account_id: &str, policy_name: &str) -> String {
    format!("arn:aws:iam::{account_id}:policy/{policy_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arn_builders() {
        assert_eq!(
            role_arn("111122223333", "Role_For_QualysEC2Connector"),
            "arn:aws:iam::111122223333:role/Role_For_QualysEC2Connector"
        );
        assert_eq!(
            policy_arn("111122223333", "IAM_Policy_For_EC2Connector"),
            "arn:aws:iam::111122223333:policy/IAM_Policy_For_EC2Connector"
        );
    }
}
