//! # Provisioner Configuration
//!
//! Settings loaded from environment variables. A `.env` file in the working
//! directory is loaded first (see `main.rs`) so local runs need no exports.

use crate::constants::{
    DEFAULT_AWS_REGION, DEFAULT_BOOTSTRAP_ROLE_NAME, DEFAULT_CONNECTOR_POLICY_NAME,
    DEFAULT_CONNECTOR_ROLE_NAME, DEFAULT_EMPTY_CREATE_MAX_RETRIES, DEFAULT_HTTP_TIMEOUT_SECS,
    DEFAULT_METRICS_PORT, DEFAULT_PRODUCTION_SUFFIXES, DEFAULT_QUALYS_API_PROTOCOL,
    DEFAULT_QUALYS_API_SERVER,
};
use crate::error::{ProvisionerError, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use zeroize::Zeroizing;

/// Provisioner configuration
///
/// Credentials and the webhook are required. Everything else has a default.
#[derive(Clone)]
pub struct ProvisionerConfig {
    /// Qualys API user name
    pub qualys_user: String,
    /// Qualys API password, wiped from memory on drop
    pub qualys_password: Zeroizing<String>,
    /// Qualys API host (e.g. `qualysapi.qg3.apps.qualys.com`)
    pub qualys_server: String,
    /// `https` or `http`
    pub qualys_protocol: String,
    /// Qualys AWS account trusted by the connector role
    pub qualys_base_account_id: String,
    /// Directory holding request templates. Embedded templates when unset.
    pub template_dir: Option<PathBuf>,
    /// Slack incoming webhook for provisioning reports
    pub slack_webhook_url: String,
    /// Timeout applied to every outbound HTTP call (seconds)
    pub http_timeout_secs: u64,
    /// Delete-and-recreate rounds after creation returns no connector
    pub max_empty_create_retries: u32,
    /// Account name suffixes that mark a production account
    pub production_suffixes: Vec<String>,
    /// Role in the new account assumed to create the connector role
    pub bootstrap_role_name: String,
    pub connector_role_name: String,
    pub connector_policy_name: String,
    pub aws_region: String,
    /// Port of the HTTP server in serve mode
    pub metrics_port: u16,
}

impl fmt::Debug for ProvisionerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisionerConfig")
            .field("qualys_user", &self.qualys_user)
            .field("qualys_server", &self.qualys_server)
            .field("qualys_protocol", &self.qualys_protocol)
            .field("qualys_base_account_id", &self.qualys_base_account_id)
            .field("template_dir", &self.template_dir)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("max_empty_create_retries", &self.max_empty_create_retries)
            .field("production_suffixes", &self.production_suffixes)
            .field("bootstrap_role_name", &self.bootstrap_role_name)
            .field("connector_role_name", &self.connector_role_name)
            .field("connector_policy_name", &self.connector_policy_name)
            .field("aws_region", &self.aws_region)
            .field("metrics_port", &self.metrics_port)
            .finish_non_exhaustive()
    }
}

impl ProvisionerConfig {
    /// Load configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionerError::Config`] when a required variable is unset
    /// or a numeric variable does not parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Same as [`ProvisionerConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvSource { lookup };

        Ok(Self {
            qualys_user: env.required("QUALYS_API_USER")?,
            qualys_password: Zeroizing::new(env.required("QUALYS_API_PASSWORD")?),
            qualys_server: env.var_or_default_str("QUALYS_API_SERVER", DEFAULT_QUALYS_API_SERVER),
            qualys_protocol: env
                .var_or_default_str("QUALYS_API_PROTOCOL", DEFAULT_QUALYS_API_PROTOCOL),
            qualys_base_account_id: env.required("QUALYS_BASE_ACCOUNT_ID")?,
            template_dir: env.optional("QUALYS_TEMPLATE_DIR").map(PathBuf::from),
            slack_webhook_url: env.required("SLACK_WEBHOOK_URL")?,
            http_timeout_secs: env.var_or_default("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?,
            max_empty_create_retries: env
                .var_or_default("EMPTY_CREATE_MAX_RETRIES", DEFAULT_EMPTY_CREATE_MAX_RETRIES)?,
            production_suffixes: env
                .optional("PRODUCTION_SUFFIXES")
                .map(|v| parse_list(&v))
                .filter(|list| !list.is_empty())
                .unwrap_or_else(|| {
                    DEFAULT_PRODUCTION_SUFFIXES
                        .iter()
                        .map(|s| (*s).to_owned())
                        .collect()
                }),
            bootstrap_role_name: env
                .var_or_default_str("BOOTSTRAP_ROLE_NAME", DEFAULT_BOOTSTRAP_ROLE_NAME),
            connector_role_name: env
                .var_or_default_str("CONNECTOR_ROLE_NAME", DEFAULT_CONNECTOR_ROLE_NAME),
            connector_policy_name: env
                .var_or_default_str("CONNECTOR_POLICY_NAME", DEFAULT_CONNECTOR_POLICY_NAME),
            aws_region: env.var_or_default_str("AWS_REGION", DEFAULT_AWS_REGION),
            metrics_port: env.var_or_default("METRICS_PORT", DEFAULT_METRICS_PORT)?,
        })
    }

    /// Base URL of the Qualys API, without a trailing slash
    #[must_use]
    pub fn qualys_base_url(&self) -> String {
        format!("{}://{}", self.qualys_protocol, self.qualys_server)
    }

    /// Get HTTP timeout duration
    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

struct EnvSource<F> {
    lookup: F,
}

impl<F> EnvSource<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Read variable, treating blank values as unset
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> Result<String> {
        self.optional(key).ok_or_else(|| {
            ProvisionerError::Config(format!("environment variable {key} must be set"))
        })
    }

    /// Read variable or return default value
    fn var_or_default<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.optional(key) {
            Some(v) => v.parse().map_err(|e| {
                ProvisionerError::Config(format!("environment variable {key}={v:?} is invalid: {e}"))
            }),
            None => Ok(default),
        }
    }

    /// Read variable as string or return default
    fn var_or_default_str(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_owned())
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}
