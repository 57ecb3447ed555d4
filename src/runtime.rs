//! # Runtime
//!
//! Process setup shared by every subcommand: TLS provider, tracing, metrics
//! and collaborator wiring.

use crate::config::ProvisionerConfig;
use crate::notification::{Notifier, SlackNotifier};
use crate::observability;
use crate::provisioner::{Provisioner, ProvisionerSettings};
use crate::qualys::{ConnectorService, QualysClient};
use crate::role::{IamRoleProvisioner, RoleSetup};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Install the TLS provider, load `.env`, start tracing and register metrics
///
/// # Errors
///
/// Returns an error if metric registration fails.
pub fn initialize() -> Result<()> {
    // Must run before any reqwest or AWS client is built
    let provider_installed = rustls::crypto::ring::default_provider()
        .install_default()
        .is_ok();

    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qualys_connector_provisioner=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if !provider_installed {
        warn!("rustls crypto provider was already installed");
    }
    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded environment file");
    }

    info!("Starting Qualys connector provisioner");
    info!(
        "Build info: datetime={}, git_hash={}",
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    observability::metrics::register_metrics().context("Failed to register metrics")?;
    Ok(())
}

/// Qualys client built from configuration
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built.
pub fn connector_service(config: &ProvisionerConfig) -> Result<Arc<dyn ConnectorService>> {
    let client = QualysClient::from_config(config).context("Failed to create Qualys client")?;
    Ok(Arc::new(client))
}

/// Provisioner wired to Qualys, IAM and Slack
///
/// # Errors
///
/// Returns an error if one of the HTTP clients cannot be built.
pub async fn build_provisioner(config: &ProvisionerConfig) -> Result<Provisioner> {
    let connectors = connector_service(config)?;
    let roles: Arc<dyn RoleSetup> = Arc::new(IamRoleProvisioner::from_config(config).await);
    let notifier: Arc<dyn Notifier> = Arc::new(
        SlackNotifier::new(config.slack_webhook_url.clone(), config.http_timeout())
            .context("Failed to create Slack notifier")?,
    );

    Ok(Provisioner::new(
        connectors,
        roles,
        notifier,
        ProvisionerSettings {
            qualys_base_account_id: config.qualys_base_account_id.clone(),
            max_empty_create_retries: config.max_empty_create_retries,
            production_suffixes: config.production_suffixes.clone(),
        },
    ))
}
