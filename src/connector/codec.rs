//! # Connector XML Codec
//!
//! Reads `AwsAssetDataConnector` elements out of Qualys QPS responses.
//!
//! Parsing is streaming (`quick-xml` events). Every element below a connector
//! is recorded under its slash-joined path relative to the connector
//! (`name`, `defaultTags/list/TagSimple/id`, ...), then the path map is turned
//! into a [`ConnectorFields`].
//!
//! Presence rule: an element that appears in the document is present, even
//! when it has no text and no children (`<arn/>` reads as `Some("")`).
//! Repeated elements keep the first occurrence.

use super::{Connector, ConnectorFields, DefaultTag};
use crate::constants::CONNECTOR_ELEMENT;
use crate::error::{ProvisionerError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::{HashMap, HashSet};

const TAG_SIMPLE_PATH: &str = "defaultTags/list/TagSimple";

/// Parse every connector element in `xml` into a field mapping.
///
/// Zero connector elements (or an empty body) yields an empty list.
///
/// # Errors
///
/// Returns [`ProvisionerError::ProtocolViolation`] when the document is not
/// well-formed XML or a connector lacks a required element.
pub fn parse_connectors(xml: &str) -> Result<Vec<ConnectorFields>> {
    if xml.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut connectors = Vec::new();
    let mut capture: Option<Capture> = None;
    let mut depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                let name = local_name(&e)?;
                if let Some(cap) = capture.as_mut() {
                    cap.enter(name);
                } else if name == CONNECTOR_ELEMENT {
                    capture = Some(Capture::new(depth));
                }
            }
            Ok(Event::Empty(e)) => {
                let name = local_name(&e)?;
                if let Some(cap) = capture.as_mut() {
                    cap.enter(name);
                    cap.leave();
                } else if name == CONNECTOR_ELEMENT {
                    connectors.push(Capture::new(depth + 1).finish()?);
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(cap) = capture.as_mut() {
                    let text = t.unescape().map_err(|e| malformed(&reader, &e))?;
                    cap.text(&text);
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(cap) = capture.as_mut() {
                    cap.text(&String::from_utf8_lossy(&c));
                }
            }
            Ok(Event::End(_)) => {
                if let Some(cap) = capture.as_mut() {
                    if cap.depth == depth {
                        if let Some(done) = capture.take() {
                            connectors.push(done.finish()?);
                        }
                    } else {
                        cap.leave();
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(malformed(&reader, &e)),
            Ok(_) => {}
        }
    }

    Ok(connectors)
}

/// Parse and decode every connector in `xml` into typed records
///
/// # Errors
///
/// Same as [`parse_connectors`], plus invalid boolean strings.
pub fn decode_connectors(xml: &str) -> Result<Vec<Connector>> {
    parse_connectors(xml)?
        .into_iter()
        .map(Connector::try_from)
        .collect()
}

fn local_name(e: &BytesStart<'_>) -> Result<String> {
    std::str::from_utf8(e.local_name().as_ref())
        .map(str::to_owned)
        .map_err(|err| ProvisionerError::ProtocolViolation(format!("non UTF-8 element name: {err}")))
}

fn malformed(reader: &Reader<&[u8]>, err: &dyn std::fmt::Display) -> ProvisionerError {
    ProvisionerError::ProtocolViolation(format!(
        "malformed XML at byte {}: {err}",
        reader.buffer_position()
    ))
}

/// Element values collected for one connector
#[derive(Debug)]
struct Capture {
    /// Reader depth of the connector's own start tag
    depth: usize,
    path: Vec<String>,
    values: HashMap<String, String>,
    closed: HashSet<String>,
}

impl Capture {
    fn new(depth: usize) -> Self {
        Self {
            depth,
            path: Vec::new(),
            values: HashMap::new(),
            closed: HashSet::new(),
        }
    }

    fn enter(&mut self, name: String) {
        self.path.push(name);
        self.values.entry(self.path.join("/")).or_default();
    }

    fn leave(&mut self) {
        self.closed.insert(self.path.join("/"));
        self.path.pop();
    }

    fn text(&mut self, text: &str) {
        if self.path.is_empty() {
            return;
        }
        let key = self.path.join("/");
        if self.closed.contains(&key) {
            return;
        }
        if let Some(value) = self.values.get_mut(&key) {
            value.push_str(text);
        }
    }

    fn required(&self, field: &str) -> Result<String> {
        self.values
            .get(field)
            .cloned()
            .ok_or_else(|| ProvisionerError::missing_field(field))
    }

    fn optional(&self, field: &str) -> Option<String> {
        self.values.get(field).cloned()
    }

    fn finish(self) -> Result<ConnectorFields> {
        let default_tags = if self.values.contains_key(TAG_SIMPLE_PATH) {
            Some(DefaultTag {
                id: self.required(&format!("{TAG_SIMPLE_PATH}/id"))?,
                name: self.required(&format!("{TAG_SIMPLE_PATH}/name"))?,
            })
        } else {
            None
        };

        Ok(ConnectorFields {
            id: self.required("id")?,
            name: self.required("name")?,
            aws_account_id: self.optional("awsAccountId"),
            last_sync: self.optional("lastSync"),
            last_error: self.optional("lastError"),
            connector_state: self.required("connectorState")?,
            connector_type: self.required("type")?,
            default_tags,
            disabled: self.required("disabled")?,
            is_gov_cloud_configured: self.required("isGovCloudConfigured")?,
            is_china_configured: self.required("isChinaConfigured")?,
            is_deleted: self.optional("isDeleted"),
            arn: self.optional("arn"),
            external_id: self.required("externalId")?,
            qualys_aws_account_id: self.optional("qualysAwsAccountId"),
            auth_record: self.optional("authRecord"),
            all_regions: self.required("allRegions")?,
        })
    }
}
