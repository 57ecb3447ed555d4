//! Common test utilities for Qualys contract tests
//!
//! Provides rustls setup, client construction against a Pact mock server,
//! and the request headers every QPS call carries.

#![allow(dead_code, reason = "Each test binary uses a different subset")]

use qualys_connector_provisioner::connector::EmbeddedTemplates;
use qualys_connector_provisioner::qualys::QualysClient;
use std::sync::{Arc, Once};
use std::time::Duration;

static RUSTLS_INIT: Once = Once::new();

pub const CONSUMER: &str = "Qualys-Connector-Provisioner";
pub const PROVIDER: &str = "Qualys-QPS";

/// `Basic base64("svc_qualys:s3cret")`
pub const AUTHORIZATION: &str = "Basic c3ZjX3F1YWx5czpzM2NyZXQ=";

pub const CREATE_RESPONSE: &str = include_str!("../fixtures/create_response.xml");
pub const SEARCH_RESPONSE: &str = include_str!("../fixtures/search_response.xml");
pub const EMPTY_RESPONSE: &str = include_str!("../fixtures/empty_response.xml");

/// Initialize rustls crypto provider for tests
///
/// Uses a `Once` so it runs a single time across all tests in a binary.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        // Another test harness may already have installed one
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Client pointed at a Pact mock server
pub fn qualys_client(mock_url: &str) -> QualysClient {
    init_rustls();
    QualysClient::new(
        mock_url.trim_end_matches('/'),
        "svc_qualys",
        "s3cret",
        Duration::from_secs(5),
        Arc::new(EmbeddedTemplates),
    )
    .expect("Failed to build Qualys client")
}
