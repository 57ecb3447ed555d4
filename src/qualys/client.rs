//! Qualys QPS REST client
//!
//! Every call is a `POST` with an XML body and HTTP Basic authentication.
//! Search lives under QPS 3.0; create, update and delete under 2.0.
//!
//! No call is retried. Transport errors propagate as
//! [`ProvisionerError::Transport`].

use super::{ConnectorService, CreateResult, OperationResult};
use crate::config::ProvisionerConfig;
use crate::connector::{
    codec::decode_connectors, render, Connector, DirectoryTemplates, EmbeddedTemplates,
    RequestKind, Substitutions, TemplateStore,
};
use crate::constants::{
    CONNECTOR_OBJECT_CATEGORY, QPS_CREATE_PATH, QPS_DELETE_PATH, QPS_SEARCH_PATH,
    QPS_UPDATE_PATH, QUALYS_REQUESTED_WITH,
};
use crate::error::{ProvisionerError, Result};
use crate::observability::metrics;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, field, info, info_span, warn, Instrument};
use zeroize::Zeroizing;

/// Qualys connector client
pub struct QualysClient {
    http_client: Client,
    base_url: String,
    /// Precomputed `Basic ...` header value
    authorization: Zeroizing<String>,
    templates: Arc<dyn TemplateStore>,
}

impl std::fmt::Debug for QualysClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QualysClient")
            .field("base_url", &self.base_url)
            .field("templates", &self.templates)
            .finish_non_exhaustive()
    }
}

impl QualysClient {
    /// Create a client for `base_url` (`{protocol}://{server}`)
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionerError::Transport`] if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        user: &str,
        password: &str,
        timeout: Duration,
        templates: Arc<dyn TemplateStore>,
    ) -> Result<Self> {
        let http_client = Client::builder().timeout(timeout).build()?;
        let credentials = Zeroizing::new(format!("{user}:{password}"));
        let authorization = Zeroizing::new(format!(
            "Basic {}",
            general_purpose::STANDARD.encode(credentials.as_bytes())
        ));

        info!(base_url, "Initializing Qualys connector client");

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            authorization,
            templates,
        })
    }

    /// Create a client from the provisioner configuration
    ///
    /// # Errors
    ///
    /// Same as [`QualysClient::new`].
    pub fn from_config(config: &ProvisionerConfig) -> Result<Self> {
        let templates: Arc<dyn TemplateStore> = match &config.template_dir {
            Some(dir) => {
                info!(dir = %dir.display(), "Using request templates from directory");
                Arc::new(DirectoryTemplates::new(dir.clone()))
            }
            None => Arc::new(EmbeddedTemplates),
        };

        Self::new(
            &config.qualys_base_url(),
            &config.qualys_user,
            &config.qualys_password,
            config.http_timeout(),
            templates,
        )
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}/{CONNECTOR_OBJECT_CATEGORY}", self.base_url)
    }

    /// POST `body` and return the status code and response text
    async fn post(&self, operation: &'static str, url: String, body: String) -> Result<(u16, String)> {
        let span = info_span!(
            "qualys.connector",
            operation,
            url = %url,
            http.status = field::Empty,
            operation.duration_ms = field::Empty,
        );
        let span_clone = span.clone();
        let start = Instant::now();

        async move {
            let response = self
                .http_client
                .post(&url)
                .header(CONTENT_TYPE, "text/xml")
                .header("X-Requested-With", QUALYS_REQUESTED_WITH)
                .header(AUTHORIZATION, self.authorization.as_str())
                .body(body)
                .send()
                .await;

            let response = match response {
                Ok(response) => response,
                Err(e) => {
                    warn!(error = %e, "Qualys request failed");
                    metrics::record_connector_operation(operation, false, start.elapsed().as_secs_f64());
                    return Err(ProvisionerError::from(e));
                }
            };

            let status = response.status().as_u16();
            let text = response.text().await?;

            #[allow(clippy::cast_possible_truncation, reason = "Durations fit in u64 milliseconds")]
            span_clone.record("operation.duration_ms", start.elapsed().as_millis() as u64);
            span_clone.record("http.status", status);
            metrics::record_connector_operation(
                operation,
                (200..300).contains(&status),
                start.elapsed().as_secs_f64(),
            );
            debug!(status, bytes = text.len(), "Qualys responded");

            Ok::<_, ProvisionerError>((status, text))
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl ConnectorService for QualysClient {
    async fn list_connectors(&self) -> Result<Vec<Connector>> {
        let url = self.endpoint(QPS_SEARCH_PATH);
        let (status, text) = self.post("search", url.clone(), String::new()).await?;

        if !(200..300).contains(&status) {
            return Err(ProvisionerError::UnexpectedStatus { endpoint: url, status });
        }
        decode_connectors(&text)
    }

    async fn create(&self, name: &str) -> Result<CreateResult> {
        let body = render(
            self.templates.as_ref(),
            RequestKind::Create,
            &Substitutions::for_create(name),
        )?;
        let (status, text) = self
            .post("create", self.endpoint(QPS_CREATE_PATH), body)
            .await?;

        let succeeded = OperationResult::from_status(status).succeeded;
        let connectors = if succeeded {
            decode_connectors(&text)?
        } else {
            warn!(connector.name = name, status, "Connector creation rejected");
            Vec::new()
        };

        Ok(CreateResult {
            connectors,
            succeeded,
            status,
        })
    }

    async fn activate(&self, id: &str, role_arn: &str) -> Result<OperationResult> {
        let body = render(
            self.templates.as_ref(),
            RequestKind::Activate,
            &Substitutions::for_activate(role_arn),
        )?;
        let url = format!("{}/{id}", self.endpoint(QPS_UPDATE_PATH));
        let (status, _) = self.post("activate", url, body).await?;
        Ok(OperationResult::from_status(status))
    }

    async fn delete(&self, name: &str) -> Result<OperationResult> {
        let body = render(
            self.templates.as_ref(),
            RequestKind::Delete,
            &Substitutions::for_delete(name),
        )?;
        let (status, _) = self
            .post("delete", self.endpoint(QPS_DELETE_PATH), body)
            .await?;
        Ok(OperationResult::from_status(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> QualysClient {
        QualysClient::new(
            base_url,
            "svc_qualys",
            "s3cret",
            Duration::from_secs(5),
            Arc::new(EmbeddedTemplates),
        )
        .unwrap()
    }

    #[test]
    fn test_endpoints() {
        let client = client("https://qualysapi.qg3.apps.qualys.com/");
        assert_eq!(
            client.endpoint(QPS_SEARCH_PATH),
            "https://qualysapi.qg3.apps.qualys.com/qps/rest/3.0/search/am/awsassetdataconnector"
        );
        assert_eq!(
            client.endpoint(QPS_DELETE_PATH),
            "https://qualysapi.qg3.apps.qualys.com/qps/rest/2.0/delete/am/awsassetdataconnector"
        );
    }

    #[test]
    fn test_authorization_is_basic() {
        let client = client("http://localhost");
        // base64("svc_qualys:s3cret")
        assert_eq!(client.authorization.as_str(), "Basic c3ZjX3F1YWx5czpzM2NyZXQ=");
    }

    #[test]
    fn test_debug_hides_credentials() {
        let rendered = format!("{:?}", client("http://localhost"));
        assert!(!rendered.contains("Basic"));
        assert!(rendered.contains("http://localhost"));
    }

    #[test]
    fn test_operation_result_from_status() {
        assert!(OperationResult::from_status(200).succeeded);
        assert!(OperationResult::from_status(204).succeeded);
        assert!(!OperationResult::from_status(302).succeeded);
        assert!(!OperationResult::from_status(500).succeeded);
    }
}
