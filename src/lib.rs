//! # Qualys Connector Provisioner
//!
//! Provisions a Qualys AWS EC2 connector for every new production account
//! created by AWS Control Tower.
//!
//! ## Overview
//!
//! For each succeeded `CreateManagedAccount` event the provisioner:
//!
//! 1. **Creates the connector** on Qualys (disabled, all regions)
//! 2. **Creates the connector role** in the new account, trusting the Qualys
//!    account under the connector's external ID
//! 3. **Activates the connector** with the role ARN
//! 4. **Reports** the outcome to Slack
//!
//! Creation that returns no connector is deleted and retried a bounded
//! number of times. A connector whose activation is rejected is deleted.
//!
//! ## Modules
//!
//! - [`connector`] - connector record, XML codec and request templates
//! - [`qualys`] - connector lifecycle operations over the QPS REST API
//! - [`role`] - cross-account IAM role setup
//! - [`notification`] - provisioning reports
//! - [`provisioner`] - the lifecycle orchestrator
//! - [`server`] - HTTP event intake, metrics and probes

pub mod cli;
pub mod config;
pub mod connector;
pub mod constants;
pub mod error;
pub mod event;
pub mod notification;
pub mod observability;
pub mod provisioner;
pub mod qualys;
pub mod role;
pub mod runtime;
pub mod server;

pub use error::{ProvisionerError, Result};
