//! IAM-backed role setup
//!
//! 1. Assume the bootstrap role in the new account through STS
//! 2. Create the connector role with a trust policy for the Qualys account
//! 3. Create the read-only EC2 policy and attach it to the role
//!
//! Entities that already exist are reused by their reconstructed ARN.
//! Newly created ones report the ARN IAM returned.

use super::{policy, policy_arn, role_arn, RoleSetup, RoleSetupRequest};
use crate::config::ProvisionerConfig;
use crate::error::{ProvisionerError, Result};
use crate::observability::metrics;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_credential_types::Credentials;
use aws_sdk_iam::error::DisplayErrorContext;
use aws_sdk_iam::types::Role;
use aws_sdk_iam::Client as IamClient;
use aws_sdk_sts::Client as StsClient;
use tracing::{info, info_span, warn, Instrument};

const CONNECTOR_ROLE_DESCRIPTION: &str = "Role assumed by Qualys to inventory EC2 assets";

/// Role setup through STS and IAM
pub struct IamRoleProvisioner {
    sdk_config: SdkConfig,
    bootstrap_role_name: String,
    connector_role_name: String,
    connector_policy_name: String,
}

impl std::fmt::Debug for IamRoleProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IamRoleProvisioner")
            .field("region", &self.sdk_config.region())
            .field("bootstrap_role_name", &self.bootstrap_role_name)
            .field("connector_role_name", &self.connector_role_name)
            .field("connector_policy_name", &self.connector_policy_name)
            .finish_non_exhaustive()
    }
}

impl IamRoleProvisioner {
    /// Load the default AWS credential chain for the configured region
    pub async fn from_config(config: &ProvisionerConfig) -> Self {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.aws_region.clone()))
            .load()
            .await;

        Self {
            sdk_config,
            bootstrap_role_name: config.bootstrap_role_name.clone(),
            connector_role_name: config.connector_role_name.clone(),
            connector_policy_name: config.connector_policy_name.clone(),
        }
    }

    /// IAM client acting as the bootstrap role in `account_id`
    async fn assume_bootstrap_role(&self, account_id: &str) -> Result<IamClient> {
        let bootstrap_arn = role_arn(account_id, &self.bootstrap_role_name);
        let session_name = format!("qualys-connector-{}", uuid::Uuid::new_v4().simple());

        let output = StsClient::new(&self.sdk_config)
            .assume_role()
            .role_arn(&bootstrap_arn)
            .role_session_name(session_name)
            .send()
            .await
            .map_err(|e| {
                ProvisionerError::RoleSetup(format!(
                    "failed to assume {bootstrap_arn}: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        let assumed = output.credentials().ok_or_else(|| {
            ProvisionerError::RoleSetup(format!("STS returned no credentials for {bootstrap_arn}"))
        })?;

        let credentials = Credentials::new(
            assumed.access_key_id(),
            assumed.secret_access_key(),
            Some(assumed.session_token().to_owned()),
            None,
            "qualys-connector-bootstrap",
        );

        let iam_config = aws_sdk_iam::config::Builder::from(&self.sdk_config)
            .credentials_provider(credentials)
            .build();

        info!(role.arn = %bootstrap_arn, "Assumed bootstrap role");
        Ok(IamClient::from_conf(iam_config))
    }

    async fn create_role(&self, iam: &IamClient, request: &RoleSetupRequest) -> Result<String> {
        let trust = policy::trust_policy(&request.qualys_base_account_id, &request.external_id);

        match iam
            .create_role()
            .role_name(&self.connector_role_name)
            .assume_role_policy_document(trust.to_string())
            .description(CONNECTOR_ROLE_DESCRIPTION)
            .send()
            .await
        {
            Ok(output) => {
                let arn = created_role_arn(
                    output.role(),
                    &request.account_id,
                    &self.connector_role_name,
                );
                info!(role.arn = %arn, "Created connector role");
                Ok(arn)
            }
            Err(e)
                if e.as_service_error()
                    .is_some_and(aws_sdk_iam::operation::create_role::CreateRoleError::is_entity_already_exists_exception) =>
            {
                let arn = role_arn(&request.account_id, &self.connector_role_name);
                info!(role.arn = %arn, "Connector role already exists");
                Ok(arn)
            }
            Err(e) => Err(ProvisionerError::RoleSetup(format!(
                "failed to create role {}: {}",
                self.connector_role_name,
                DisplayErrorContext(&e)
            ))),
        }
    }

    async fn create_policy(&self, iam: &IamClient, account_id: &str) -> Result<String> {
        match iam
            .create_policy()
            .policy_name(&self.connector_policy_name)
            .policy_document(policy::connector_permissions().to_string())
            .send()
            .await
        {
            Ok(output) => Ok(output
                .policy()
                .and_then(|p| p.arn())
                .map_or_else(
                    || policy_arn(account_id, &self.connector_policy_name),
                    str::to_owned,
                )),
            Err(e)
                if e.as_service_error()
                    .is_some_and(aws_sdk_iam::operation::create_policy::CreatePolicyError::is_entity_already_exists_exception) =>
            {
                info!(policy.name = %self.connector_policy_name, "Connector policy already exists");
                Ok(policy_arn(account_id, &self.connector_policy_name))
            }
            Err(e) => Err(ProvisionerError::RoleSetup(format!(
                "failed to create policy {}: {}",
                self.connector_policy_name,
                DisplayErrorContext(&e)
            ))),
        }
    }
}

/// ARN returned by `CreateRole`, or the one built from the account and name
fn created_role_arn(role: Option<&Role>, account_id: &str, role_name: &str) -> String {
    role.map_or_else(
        || role_arn(account_id, role_name),
        |role| role.arn().to_owned(),
    )
}

#[async_trait]
impl RoleSetup for IamRoleProvisioner {
    async fn setup_role(&self, request: &RoleSetupRequest) -> Result<String> {
        let span = info_span!(
            "iam.connector_role.setup",
            account.id = %request.account_id,
            role.name = %self.connector_role_name
        );

        let result = async {
            let iam = self.assume_bootstrap_role(&request.account_id).await?;
            let arn = self.create_role(&iam, request).await?;
            let permissions_arn = self.create_policy(&iam, &request.account_id).await?;

            if let Err(e) = iam
                .attach_role_policy()
                .role_name(&self.connector_role_name)
                .policy_arn(&permissions_arn)
                .send()
                .await
            {
                warn!(
                    policy.arn = %permissions_arn,
                    error = %DisplayErrorContext(&e),
                    "Failed to attach connector policy, continuing"
                );
            }

            Ok::<_, ProvisionerError>(arn)
        }
        .instrument(span)
        .await;

        metrics::increment_role_setup(result.is_ok());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_iam::primitives::DateTime;

    fn role(arn: &str) -> Role {
        Role::builder()
            .path("/qualys/")
            .role_name("Role_For_QualysEC2Connector")
            .role_id("AROAEXAMPLEID")
            .arn(arn)
            .create_date(DateTime::from_secs(0))
            .build()
            .unwrap()
    }

    #[test]
    fn test_created_role_arn_prefers_returned_arn() {
        let returned = role("arn:aws:iam::111122223333:role/qualys/Role_For_QualysEC2Connector");
        assert_eq!(
            created_role_arn(Some(&returned), "111122223333", "Role_For_QualysEC2Connector"),
            "arn:aws:iam::111122223333:role/qualys/Role_For_QualysEC2Connector"
        );
    }

    #[test]
    fn test_created_role_arn_falls_back_to_built_arn() {
        assert_eq!(
            created_role_arn(None, "111122223333", "Role_For_QualysEC2Connector"),
            "arn:aws:iam::111122223333:role/Role_For_QualysEC2Connector"
        );
    }
}
