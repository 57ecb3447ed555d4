//! # Constants
//!
//! Shared constants used throughout the provisioner.
//!
//! These values represent reasonable defaults and can be overridden via
//! environment variables where applicable (see [`crate::config`]).

/// Default Qualys API server (platform US3)
pub const DEFAULT_QUALYS_API_SERVER: &str = "qualysapi.qg3.apps.qualys.com";

/// Default protocol used to reach the Qualys API
pub const DEFAULT_QUALYS_API_PROTOCOL: &str = "https";

/// QPS search path (the search endpoint is only served under 3.0)
pub const QPS_SEARCH_PATH: &str = "qps/rest/3.0/search/am";

/// QPS create path
pub const QPS_CREATE_PATH: &str = "qps/rest/2.0/create/am";

/// QPS update path
pub const QPS_UPDATE_PATH: &str = "qps/rest/2.0/update/am";

/// QPS delete path
pub const QPS_DELETE_PATH: &str = "qps/rest/2.0/delete/am";

/// Object category of the AWS EC2 connector resource
pub const CONNECTOR_OBJECT_CATEGORY: &str = "awsassetdataconnector";

/// XML element wrapping one connector in QPS responses
pub const CONNECTOR_ELEMENT: &str = "AwsAssetDataConnector";

/// Value of the `X-Requested-With` header sent to Qualys
pub const QUALYS_REQUESTED_WITH: &str = "QualysConnectorProvisioner";

/// Default HTTP timeout for Qualys and Slack calls (seconds)
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default number of delete-and-recreate rounds after an empty creation result
pub const DEFAULT_EMPTY_CREATE_MAX_RETRIES: u32 = 1;

/// Account name suffixes that identify production accounts
pub const DEFAULT_PRODUCTION_SUFFIXES: &[&str] = &["prd", "prod", "production", "producao"];

/// Control Tower state that marks a successful account creation
pub const ACCOUNT_CREATION_SUCCEEDED: &str = "SUCCEEDED";

/// Role in every new account that the provisioner assumes to manage IAM
pub const DEFAULT_BOOTSTRAP_ROLE_NAME: &str = "qualysintegrationassumerole";

/// Role created in the new account for the Qualys connector to assume
pub const DEFAULT_CONNECTOR_ROLE_NAME: &str = "Role_For_QualysEC2Connector";

/// Read-only policy attached to the connector role
pub const DEFAULT_CONNECTOR_POLICY_NAME: &str = "IAM_Policy_For_EC2Connector";

/// Default AWS region for the STS/IAM clients (IAM itself is global)
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Default HTTP server port for events, metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;
