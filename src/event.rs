//! # Account Creation Events
//!
//! Control Tower `CreateManagedAccount` lifecycle events, as delivered by
//! EventBridge:
//!
//! ```json
//! { "detail": { "serviceEventDetails": { "createManagedAccountStatus": {
//!     "state": "SUCCEEDED",
//!     "account": { "accountName": "payments-prd", "accountId": "111122223333" }
//! } } } }
//! ```
//!
//! Every level is optional. Anything that does not carry a succeeded account
//! creation is ignored rather than rejected.

use crate::constants::ACCOUNT_CREATION_SUCCEEDED;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountCreationEvent {
    #[serde(default)]
    pub detail: Option<EventDetail>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetail {
    #[serde(default)]
    pub service_event_details: Option<ServiceEventDetails>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEventDetails {
    #[serde(default)]
    pub create_managed_account_status: Option<CreateManagedAccountStatus>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateManagedAccountStatus {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub account: Option<ManagedAccount>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedAccount {
    #[serde(default)]
    pub account_name: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
}

/// Account whose creation succeeded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedAccount {
    pub name: String,
    pub id: String,
}

impl AccountCreationEvent {
    /// The created account, if this event reports a succeeded creation
    #[must_use]
    pub fn created_account(&self) -> Option<CreatedAccount> {
        let status = self
            .detail
            .as_ref()?
            .service_event_details
            .as_ref()?
            .create_managed_account_status
            .as_ref()?;

        if status.state.as_deref() != Some(ACCOUNT_CREATION_SUCCEEDED) {
            return None;
        }

        let account = status.account.as_ref()?;
        Some(CreatedAccount {
            name: account.account_name.clone()?,
            id: account.account_id.clone()?,
        })
    }
}

/// Whether the last hyphen-delimited segment of `account_name` is a
/// production suffix (case-insensitive)
#[must_use]
pub fn is_production_account(account_name: &str, suffixes: &[String]) -> bool {
    let last = account_name.rsplit('-').next().unwrap_or(account_name).trim();
    suffixes.iter().any(|s| s.eq_ignore_ascii_case(last))
}

/// Connector name for an account: every space becomes `" - "`
#[must_use]
pub fn connector_name_for(account_name: &str) -> String {
    account_name.replace(' ', " - ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENT: &str = include_str!("../tests/fixtures/account_created_event.json");

    fn suffixes() -> Vec<String> {
        crate::constants::DEFAULT_PRODUCTION_SUFFIXES
            .iter()
            .map(|s| (*s).to_owned())
            .collect()
    }

    #[test]
    fn test_created_account_from_fixture() {
        let event: AccountCreationEvent = serde_json::from_str(EVENT).unwrap();
        assert_eq!(
            event.created_account(),
            Some(CreatedAccount {
                name: "payments-prd".to_owned(),
                id: "111122223333".to_owned(),
            })
        );
    }

    #[test]
    fn test_other_state_is_ignored() {
        let json = EVENT.replace("SUCCEEDED", "FAILED");
        let event: AccountCreationEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event.created_account(), None);
    }

    #[test]
    fn test_missing_structure_is_ignored() {
        for json in [
            "{}",
            r#"{"detail": {}}"#,
            r#"{"detail": {"serviceEventDetails": {"createManagedAccountStatus": {"state": "SUCCEEDED"}}}}"#,
        ] {
            let event: AccountCreationEvent = serde_json::from_str(json).unwrap();
            assert_eq!(event.created_account(), None, "{json}");
        }
    }

    #[test]
    fn test_production_filter() {
        let suffixes = suffixes();
        assert!(is_production_account("myapp-prd", &suffixes));
        assert!(!is_production_account("myapp-dev", &suffixes));
        assert!(is_production_account("myapp-PROD", &suffixes));
        assert!(is_production_account("core-banking-producao", &suffixes));
        assert!(!is_production_account("prd-sandbox", &suffixes));
        assert!(is_production_account("prd", &suffixes));
    }

    #[test]
    fn test_connector_name_for() {
        assert_eq!(connector_name_for("Payments prd"), "Payments - prd");
        assert_eq!(connector_name_for("payments-prd"), "payments-prd");
    }
}
