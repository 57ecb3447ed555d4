//! # Connector
//!
//! The Qualys AWS EC2 connector record and its wire codec.
//!
//! A connector travels in two shapes:
//! - [`ConnectorFields`] - the field mapping read straight off the XML, every
//!   value a string exactly as Qualys sent it
//! - [`Connector`] - the typed record used by the rest of the crate, with the
//!   `"true"`/`"false"` strings decoded to real booleans
//!
//! Booleans are only ever strings at the wire boundary. [`Connector::fields`]
//! re-encodes them when a mapping is needed again.

pub mod codec;
pub mod template;

use crate::error::{ProvisionerError, Result};
use serde::Serialize;
use std::fmt;

pub use codec::parse_connectors;
pub use template::{
    render, DirectoryTemplates, EmbeddedTemplates, RequestKind, Substitutions, TemplateStore,
};

/// Single tag carried in `defaultTags/list/TagSimple`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefaultTag {
    pub id: String,
    pub name: String,
}

/// Raw field mapping of one `AwsAssetDataConnector` element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectorFields {
    pub id: String,
    pub name: String,
    pub aws_account_id: Option<String>,
    pub last_sync: Option<String>,
    pub last_error: Option<String>,
    pub connector_state: String,
    pub connector_type: String,
    pub default_tags: Option<DefaultTag>,
    pub disabled: String,
    pub is_gov_cloud_configured: String,
    pub is_china_configured: String,
    pub is_deleted: Option<String>,
    pub arn: Option<String>,
    pub external_id: String,
    pub qualys_aws_account_id: Option<String>,
    pub auth_record: Option<String>,
    pub all_regions: String,
}

/// One Qualys AWS EC2 connector
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Connector {
    /// Server-assigned identifier, stable for the connector's life
    pub id: String,
    /// Caller-chosen name, the lookup key before `id` is known
    pub name: String,
    pub account_id: Option<String>,
    pub last_sync: Option<String>,
    pub last_error: Option<String>,
    /// Opaque status reported by Qualys
    pub state: String,
    pub connector_type: String,
    pub default_tags: Option<DefaultTag>,
    pub disabled: bool,
    pub is_gov_cloud: bool,
    pub is_china: bool,
    pub is_deleted: Option<bool>,
    /// Role the connector assumes. Patched locally after activation.
    pub role_arn: Option<String>,
    /// Issued by Qualys at creation, used as the `sts:ExternalId` condition
    pub external_id: String,
    pub qualys_account_id: Option<String>,
    pub auth_record: Option<String>,
    pub all_regions: bool,
}

impl Connector {
    /// Rebuild the wire field mapping for this connector
    #[must_use]
    pub fn fields(&self) -> ConnectorFields {
        ConnectorFields {
            id: self.id.clone(),
            name: self.name.clone(),
            aws_account_id: self.account_id.clone(),
            last_sync: self.last_sync.clone(),
            last_error: self.last_error.clone(),
            connector_state: self.state.clone(),
            connector_type: self.connector_type.clone(),
            default_tags: self.default_tags.clone(),
            disabled: encode_bool(self.disabled).to_string(),
            is_gov_cloud_configured: encode_bool(self.is_gov_cloud).to_string(),
            is_china_configured: encode_bool(self.is_china).to_string(),
            is_deleted: self.is_deleted.map(|v| encode_bool(v).to_string()),
            arn: self.role_arn.clone(),
            external_id: self.external_id.clone(),
            qualys_aws_account_id: self.qualys_account_id.clone(),
            auth_record: self.auth_record.clone(),
            all_regions: encode_bool(self.all_regions).to_string(),
        }
    }
}

impl TryFrom<ConnectorFields> for Connector {
    type Error = ProvisionerError;

    fn try_from(fields: ConnectorFields) -> Result<Self> {
        Ok(Self {
            disabled: decode_bool("disabled", &fields.disabled)?,
            is_gov_cloud: decode_bool("isGovCloudConfigured", &fields.is_gov_cloud_configured)?,
            is_china: decode_bool("isChinaConfigured", &fields.is_china_configured)?,
            is_deleted: fields
                .is_deleted
                .as_deref()
                .map(|v| decode_bool("isDeleted", v))
                .transpose()?,
            all_regions: decode_bool("allRegions", &fields.all_regions)?,
            id: fields.id,
            name: fields.name,
            account_id: fields.aws_account_id,
            last_sync: fields.last_sync,
            last_error: fields.last_error,
            state: fields.connector_state,
            connector_type: fields.connector_type,
            default_tags: fields.default_tags,
            role_arn: fields.arn,
            external_id: fields.external_id,
            qualys_account_id: fields.qualys_aws_account_id,
            auth_record: fields.auth_record,
        })
    }
}

/// Decode a wire boolean (`"true"`/`"false"`, any case)
pub(crate) fn decode_bool(field: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(ProvisionerError::ProtocolViolation(format!(
            "<{field}> must be \"true\" or \"false\", got {other:?}"
        ))),
    }
}

/// Encode a boolean the way Qualys expects it on the wire
#[must_use]
pub fn encode_bool(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn opt(value: Option<&str>) -> &str {
            value.unwrap_or("-")
        }

        let tags = self
            .default_tags
            .as_ref()
            .map(|t| format!("{} ({})", t.name, t.id));
        let is_deleted = self.is_deleted.map(encode_bool);

        let rows: [(&str, &str); 17] = [
            ("ID:", self.id.as_str()),
            ("Name:", self.name.as_str()),
            ("AWS account ID:", opt(self.account_id.as_deref())),
            ("Last sync:", opt(self.last_sync.as_deref())),
            ("Last error:", opt(self.last_error.as_deref())),
            ("Connector state:", self.state.as_str()),
            ("Type:", self.connector_type.as_str()),
            ("Default tags:", opt(tags.as_deref())),
            ("Disabled:", encode_bool(self.disabled)),
            ("Is Gov Cloud configured:", encode_bool(self.is_gov_cloud)),
            ("Is China configured:", encode_bool(self.is_china)),
            ("Is deleted:", opt(is_deleted)),
            ("ARN:", opt(self.role_arn.as_deref())),
            ("External ID:", self.external_id.as_str()),
            ("Qualys AWS account ID:", opt(self.qualys_account_id.as_deref())),
            ("Auth record:", opt(self.auth_record.as_deref())),
            ("All regions:", encode_bool(self.all_regions)),
        ];

        for (i, (label, value)) in rows.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{label:<30}{value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fields() -> ConnectorFields {
        ConnectorFields {
            id: "1729384".to_string(),
            name: "Payments - prd".to_string(),
            aws_account_id: Some("111122223333".to_string()),
            connector_state: "PENDING".to_string(),
            connector_type: "AWS".to_string(),
            disabled: "true".to_string(),
            is_gov_cloud_configured: "false".to_string(),
            is_china_configured: "false".to_string(),
            external_id: "qualys-ext-9f2c".to_string(),
            all_regions: "true".to_string(),
            ..ConnectorFields::default()
        }
    }

    #[test]
    fn test_try_from_decodes_booleans() {
        let connector = Connector::try_from(sample_fields()).unwrap();
        assert!(connector.disabled);
        assert!(!connector.is_gov_cloud);
        assert!(connector.all_regions);
        assert_eq!(connector.is_deleted, None);
        assert_eq!(connector.external_id, "qualys-ext-9f2c");
    }

    #[test]
    fn test_try_from_accepts_uppercase_booleans() {
        let mut fields = sample_fields();
        fields.disabled = "FALSE".to_string();
        fields.is_deleted = Some("True".to_string());
        let connector = Connector::try_from(fields).unwrap();
        assert!(!connector.disabled);
        assert_eq!(connector.is_deleted, Some(true));
    }

    #[test]
    fn test_try_from_rejects_non_boolean() {
        let mut fields = sample_fields();
        fields.all_regions = "yes".to_string();
        let err = Connector::try_from(fields).unwrap_err();
        assert!(matches!(err, ProvisionerError::ProtocolViolation(_)));
        assert!(err.to_string().contains("allRegions"));
    }

    #[test]
    fn test_fields_round_trip() {
        let mut fields = sample_fields();
        fields.is_deleted = Some("false".to_string());
        fields.arn = Some("arn:aws:iam::111122223333:role/R".to_string());
        let connector = Connector::try_from(fields.clone()).unwrap();
        assert_eq!(connector.fields(), fields);
    }

    #[test]
    fn test_display_aligns_labels() {
        let connector = Connector::try_from(sample_fields()).unwrap();
        let rendered = connector.to_string();
        let first = rendered.lines().next().unwrap();
        assert_eq!(first, format!("{:<30}1729384", "ID:"));
        assert!(rendered.contains(&format!("{:<30}-", "ARN:")));
        assert_eq!(rendered.lines().count(), 17);
    }
}
