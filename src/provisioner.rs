//! # Provisioner
//!
//! Drives one account creation event through the connector lifecycle:
//!
//! ```text
//! create ──(no connector)──> delete, recreate (bounded)
//!   │
//!   └─> role setup ─> activate ─┬─(2xx)──> re-fetch, patch role ARN, report success
//!                               └─(else)─> delete connector, report failure
//! ```
//!
//! Every error is caught once in [`Provisioner::handle_event`], logged and
//! reported as a failure notice prefixed with the stage that failed. Nothing
//! propagates to the caller. A role whose setup fails is left in place; a
//! connector whose activation fails is deleted.

use crate::connector::Connector;
use crate::error::{ProvisionerError, Result};
use crate::event::{connector_name_for, is_production_account, AccountCreationEvent, CreatedAccount};
use crate::notification::{Notifier, ProvisioningNotice};
use crate::observability::metrics;
use crate::qualys::ConnectorService;
use crate::role::{RoleSetup, RoleSetupRequest};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};

/// Lifecycle stage, used to prefix failure reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Create,
    Recreate,
    RoleSetup,
    Activate,
    Refetch,
    Notify,
}

impl Stage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Create => "create",
            Stage::Recreate => "recreate",
            Stage::RoleSetup => "role_setup",
            Stage::Activate => "activate",
            Stage::Refetch => "refetch",
            Stage::Notify => "notify",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an event was not acted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Not a succeeded account creation
    NotApplicable,
    NonProduction,
}

/// Result of handling one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProvisioningOutcome {
    Skipped {
        reason: SkipReason,
    },
    Activated {
        connector: Connector,
    },
    /// Activation was rejected and the connector deleted
    ActivationFailed {
        connector_name: String,
        status: u16,
    },
    /// A stage failed with an error
    Abandoned {
        stage: Stage,
        error: String,
    },
}

impl ProvisioningOutcome {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Skipped { .. } => "skipped",
            Self::Activated { .. } => "activated",
            Self::ActivationFailed { .. } => "activation_failed",
            Self::Abandoned { .. } => "abandoned",
        }
    }
}

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct ProvisionerSettings {
    /// Qualys account trusted by the connector role
    pub qualys_base_account_id: String,
    /// Delete-and-recreate rounds after an empty creation result
    pub max_empty_create_retries: u32,
    pub production_suffixes: Vec<String>,
}

/// Error tagged with the stage it happened in
#[derive(Debug)]
struct StageFailure {
    stage: Stage,
    source: ProvisionerError,
}

trait AtStage<T> {
    fn at(self, stage: Stage) -> std::result::Result<T, StageFailure>;
}

impl<T> AtStage<T> for Result<T> {
    fn at(self, stage: Stage) -> std::result::Result<T, StageFailure> {
        self.map_err(|source| StageFailure { stage, source })
    }
}

/// Connector provisioning orchestrator
pub struct Provisioner {
    connectors: Arc<dyn ConnectorService>,
    roles: Arc<dyn RoleSetup>,
    notifier: Arc<dyn Notifier>,
    settings: ProvisionerSettings,
}

impl fmt::Debug for Provisioner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provisioner")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Provisioner {
    pub fn new(
        connectors: Arc<dyn ConnectorService>,
        roles: Arc<dyn RoleSetup>,
        notifier: Arc<dyn Notifier>,
        settings: ProvisionerSettings,
    ) -> Self {
        Self {
            connectors,
            roles,
            notifier,
            settings,
        }
    }

    /// Handle one account creation event to completion
    pub async fn handle_event(&self, event: &AccountCreationEvent) -> ProvisioningOutcome {
        let outcome = match event.created_account() {
            None => {
                info!("Event is not a succeeded account creation, ignoring");
                ProvisioningOutcome::Skipped {
                    reason: SkipReason::NotApplicable,
                }
            }
            Some(account)
                if !is_production_account(&account.name, &self.settings.production_suffixes) =>
            {
                info!(account.name = %account.name, "Account is not a production account, ignoring");
                ProvisioningOutcome::Skipped {
                    reason: SkipReason::NonProduction,
                }
            }
            Some(account) => {
                let span = info_span!(
                    "provision",
                    account.name = %account.name,
                    account.id = %account.id
                );
                self.provision_account(&account).instrument(span).await
            }
        };

        metrics::increment_events(outcome.kind());
        outcome
    }

    async fn provision_account(&self, account: &CreatedAccount) -> ProvisioningOutcome {
        let connector_name = connector_name_for(&account.name);

        match self.run(account, &connector_name).await {
            Ok(outcome) => outcome,
            Err(StageFailure { stage, source }) => {
                error!(stage = %stage, error = %source, "Connector provisioning failed");
                let error_message = format!("{stage}: {source}");
                self.send(&ProvisioningNotice::Failure {
                    account_name: account.name.clone(),
                    account_id: account.id.clone(),
                    error_message: error_message.clone(),
                })
                .await;
                ProvisioningOutcome::Abandoned {
                    stage,
                    error: error_message,
                }
            }
        }
    }

    async fn run(
        &self,
        account: &CreatedAccount,
        connector_name: &str,
    ) -> std::result::Result<ProvisioningOutcome, StageFailure> {
        let connector = self.create_connector(connector_name).await?;
        info!(connector.id = %connector.id, connector.name = %connector.name, "Connector created");

        let role_arn = self
            .roles
            .setup_role(&RoleSetupRequest {
                qualys_base_account_id: self.settings.qualys_base_account_id.clone(),
                external_id: connector.external_id.clone(),
                account_id: account.id.clone(),
            })
            .await
            .at(Stage::RoleSetup)?;
        info!(role.arn = %role_arn, "Connector role ready");

        let activation = self
            .connectors
            .activate(&connector.id, &role_arn)
            .await
            .at(Stage::Activate)?;

        if !activation.succeeded {
            warn!(
                connector.name = %connector.name,
                status = activation.status,
                "Connector activation rejected, deleting connector"
            );
            let cleanup = match self.connectors.delete(&connector.name).await {
                Ok(deletion) if deletion.succeeded => "connector deleted".to_owned(),
                Ok(deletion) => {
                    warn!(status = deletion.status, "Connector deletion after failed activation was rejected");
                    format!("connector deletion returned HTTP {}", deletion.status)
                }
                Err(e) => {
                    warn!(error = %e, "Connector deletion after failed activation failed");
                    format!("connector deletion failed: {e}")
                }
            };

            self.send(&ProvisioningNotice::Failure {
                account_name: account.name.clone(),
                account_id: account.id.clone(),
                error_message: format!(
                    "{}: connector {} activation returned HTTP {}; {cleanup}",
                    Stage::Activate,
                    connector.name,
                    activation.status
                ),
            })
            .await;

            return Ok(ProvisioningOutcome::ActivationFailed {
                connector_name: connector.name,
                status: activation.status,
            });
        }

        // Looked up by the name the server reported, which may differ from
        // the requested one
        let mut activated = self
            .connectors
            .find_by_name(&connector.name)
            .await
            .at(Stage::Refetch)?
            .unwrap_or(connector);
        activated.role_arn = Some(role_arn);
        info!(connector.id = %activated.id, state = %activated.state, "Connector activated");

        self.notifier
            .notify(&ProvisioningNotice::Success {
                account_name: account.name.clone(),
                account_id: account.id.clone(),
                connector: activated.clone(),
                creation_succeeded: true,
                activation_succeeded: true,
            })
            .await
            .at(Stage::Notify)?;

        Ok(ProvisioningOutcome::Activated {
            connector: activated,
        })
    }

    /// Create the connector, deleting and recreating while creation returns
    /// no connector, up to the configured bound
    async fn create_connector(&self, name: &str) -> std::result::Result<Connector, StageFailure> {
        let max_retries = self.settings.max_empty_create_retries;
        let mut attempt = 0u32;

        loop {
            let stage = if attempt == 0 {
                Stage::Create
            } else {
                Stage::Recreate
            };

            let created = self.connectors.create(name).await.at(stage)?;
            if !created.succeeded {
                return Err(StageFailure {
                    stage,
                    source: ProvisionerError::CreationRejected {
                        name: name.to_owned(),
                        status: created.status,
                    },
                });
            }

            if let Some(connector) = created.connectors.into_iter().next() {
                return Ok(connector);
            }

            metrics::increment_empty_create();
            warn!(connector.name = name, attempt, "Creation returned no connector, deleting it");
            let deletion = self.connectors.delete(name).await.at(stage)?;
            if !deletion.succeeded {
                warn!(status = deletion.status, "Deletion of empty connector was rejected");
            }

            if attempt >= max_retries {
                return Err(StageFailure {
                    stage,
                    source: ProvisionerError::EmptyCreateExhausted {
                        name: name.to_owned(),
                        attempts: attempt + 1,
                    },
                });
            }
            attempt += 1;
        }
    }

    /// Deliver a failure notice. Delivery failures are logged and never escalate.
    async fn send(&self, notice: &ProvisioningNotice) {
        if let Err(e) = self.notifier.notify(notice).await {
            error!(
                stage = %Stage::Notify,
                error = %e,
                "Failed to deliver failure notification"
            );
        }
    }
}
