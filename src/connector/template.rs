//! # Request Templates
//!
//! QPS request bodies are XML templates with `{{token}}` placeholders.
//!
//! Known tokens:
//! - `{{connector_name}}` - create and delete
//! - `{{role_arn}}` - activate
//! - `{{disabled_state}}` - activate
//!
//! Rendering is a single left-to-right pass. Inserted values are XML-escaped
//! and never scanned again, and tokens without a value are copied through.

use crate::error::{ProvisionerError, Result};
use quick_xml::escape::escape;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

pub const CONNECTOR_NAME_TOKEN: &str = "connector_name";
pub const ROLE_ARN_TOKEN: &str = "role_arn";
pub const DISABLED_STATE_TOKEN: &str = "disabled_state";

/// Request body a template is rendered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Create,
    Activate,
    Delete,
}

impl RequestKind {
    /// Template file name used by [`DirectoryTemplates`]
    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            RequestKind::Create => "create_aws_connector.xml",
            RequestKind::Activate => "activate_aws_connector.xml",
            RequestKind::Delete => "delete_aws_connector.xml",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RequestKind::Create => "create",
            RequestKind::Activate => "activate",
            RequestKind::Delete => "delete",
        })
    }
}

/// Source of request body templates
pub trait TemplateStore: Send + Sync + fmt::Debug {
    /// Return the raw template for `kind`
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionerError::Template`] when the template cannot be loaded.
    fn get_template(&self, kind: RequestKind) -> Result<String>;
}

/// Templates compiled into the binary
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedTemplates;

impl TemplateStore for EmbeddedTemplates {
    fn get_template(&self, kind: RequestKind) -> Result<String> {
        let body = match kind {
            RequestKind::Create => include_str!("../../templates/create_aws_connector.xml"),
            RequestKind::Activate => include_str!("../../templates/activate_aws_connector.xml"),
            RequestKind::Delete => include_str!("../../templates/delete_aws_connector.xml"),
        };
        Ok(body.to_owned())
    }
}

/// Templates read from a directory at render time
#[derive(Debug, Clone)]
pub struct DirectoryTemplates {
    dir: PathBuf,
}

impl DirectoryTemplates {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl TemplateStore for DirectoryTemplates {
    fn get_template(&self, kind: RequestKind) -> Result<String> {
        let path = self.dir.join(kind.file_name());
        std::fs::read_to_string(&path).map_err(|e| {
            ProvisionerError::Template(format!(
                "failed to read {kind} template {}: {e}",
                path.display()
            ))
        })
    }
}

/// Token values for one rendering
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitutions {
    values: BTreeMap<String, String>,
}

impl Substitutions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `token` (without braces) to `value`
    #[must_use]
    pub fn with(mut self, token: &str, value: impl Into<String>) -> Self {
        self.values.insert(token.to_owned(), value.into());
        self
    }

    /// Values for a create request
    #[must_use]
    pub fn for_create(connector_name: &str) -> Self {
        Self::new().with(CONNECTOR_NAME_TOKEN, connector_name)
    }

    /// Values for an activate request. Activation always enables the connector.
    #[must_use]
    pub fn for_activate(role_arn: &str) -> Self {
        Self::new()
            .with(DISABLED_STATE_TOKEN, "false")
            .with(ROLE_ARN_TOKEN, role_arn)
    }

    /// Values for a delete request
    #[must_use]
    pub fn for_delete(connector_name: &str) -> Self {
        Self::new().with(CONNECTOR_NAME_TOKEN, connector_name)
    }

    fn get(&self, token: &str) -> Option<&str> {
        self.values.get(token).map(String::as_str)
    }
}

/// Fetch the template for `kind` from `store` and fill in `substitutions`
///
/// # Errors
///
/// Propagates the store's [`ProvisionerError::Template`] error.
pub fn render(
    store: &dyn TemplateStore,
    kind: RequestKind,
    substitutions: &Substitutions,
) -> Result<String> {
    let template = store.get_template(kind)?;
    Ok(substitute(&template, substitutions))
}

fn substitute(template: &str, substitutions: &Substitutions) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };

        let token = &after_open[..end];
        match substitutions.get(token.trim()) {
            Some(value) => out.push_str(&escape(value)),
            None => {
                out.push_str("{{");
                out.push_str(token);
                out.push_str("}}");
            }
        }
        rest = &after_open[end + 2..];
    }

    out.push_str(rest);
    out
}
