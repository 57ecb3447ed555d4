//! Slack incoming-webhook notifier
//!
//! Messages use Block Kit: a header block plus one coloured attachment with
//! the account and outcome fields.

use super::{Notifier, ProvisioningNotice};
use crate::error::{ProvisionerError, Result};
use crate::observability::metrics;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

const MESSAGE_TEXT: &str = "Qualys AWS EC2 Creation";
const HEADER_TEXT: &str = ":qualys-logo: Qualys AWS EC2 Connector creation";
const ATTACHMENT_COLOR: &str = "#3b9cff";

/// Posts provisioning reports to a Slack webhook
pub struct SlackNotifier {
    http_client: Client,
    webhook_url: String,
}

impl std::fmt::Debug for SlackNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The webhook URL is a credential.
        f.debug_struct("SlackNotifier").finish_non_exhaustive()
    }
}

impl SlackNotifier {
    /// # Errors
    ///
    /// Returns [`ProvisionerError::Transport`] if the HTTP client cannot be built.
    pub fn new(webhook_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            http_client,
            webhook_url: webhook_url.into(),
        })
    }
}

fn status_label(succeeded: bool) -> &'static str {
    if succeeded {
        "Success"
    } else {
        "Failed"
    }
}

fn field_pair(left: String, right: String) -> Value {
    json!({
        "type": "section",
        "fields": [
            { "type": "mrkdwn", "text": left },
            { "type": "mrkdwn", "text": right }
        ]
    })
}

/// Build the Block Kit payload for `notice`
#[must_use]
pub fn build_message(notice: &ProvisioningNotice) -> Value {
    let mut sections = vec![field_pair(
        format!("*Account Name:*\n{}", notice.account_name()),
        format!("*Account ID:*\n{}", notice.account_id()),
    )];

    match notice {
        ProvisioningNotice::Success {
            connector,
            creation_succeeded,
            activation_succeeded,
            ..
        } => {
            sections.push(field_pair(
                format!("*Connector Name:*\n{}", connector.name),
                format!("*Connector State:*\n{}", connector.state),
            ));
            sections.push(field_pair(
                format!("*Creation Result:*\n{}", status_label(*creation_succeeded)),
                format!("*Activation Result:*\n{}", status_label(*activation_succeeded)),
            ));
            if let Some(arn) = &connector.role_arn {
                sections.push(json!({
                    "type": "section",
                    "text": { "type": "mrkdwn", "text": format!("*Role ARN:*\n{arn}") }
                }));
            }
        }
        ProvisioningNotice::Failure { error_message, .. } => {
            sections.push(field_pair(
                "*Error message:*".to_owned(),
                error_message.clone(),
            ));
        }
    }

    json!({
        "text": MESSAGE_TEXT,
        "blocks": [{
            "type": "header",
            "text": { "type": "plain_text", "text": HEADER_TEXT }
        }],
        "attachments": [{
            "color": ATTACHMENT_COLOR,
            "blocks": sections
        }]
    })
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, notice: &ProvisioningNotice) -> Result<()> {
        let response = self
            .http_client
            .post(&self.webhook_url)
            .json(&build_message(notice))
            .send()
            .await
            .inspect_err(|_| metrics::increment_notification_failures())?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "Slack rejected notification");
            metrics::increment_notification_failures();
            return Err(ProvisionerError::Notification(format!(
                "Slack webhook returned HTTP {status}"
            )));
        }

        debug!(account.id = notice.account_id(), success = notice.is_success(), "Notification delivered");
        Ok(())
    }
}
