//! # HTTP Server
//!
//! HTTP server for account creation events, metrics and health checks.
//!
//! Provides endpoints:
//! - `POST /events` - Control Tower account creation event, answers with the outcome
//! - `/metrics` - Prometheus metrics in text format
//! - `/healthz` - Liveness probe (always returns 200)
//! - `/readyz` - Readiness probe (returns 200 once the provisioner is built)
//!
//! The server runs on port 8080 by default (configurable via `METRICS_PORT` environment variable).

use crate::event::AccountCreationEvent;
use crate::provisioner::{Provisioner, ProvisioningOutcome};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub struct ServerState {
    pub is_ready: AtomicBool,
    provisioner: Provisioner,
    /// Held for the whole of one event so accounts are provisioned one at a time
    event_lock: Mutex<()>,
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("is_ready", &self.is_ready)
            .field("provisioner", &self.provisioner)
            .finish_non_exhaustive()
    }
}

impl ServerState {
    #[must_use]
    pub fn new(provisioner: Provisioner) -> Self {
        Self {
            is_ready: AtomicBool::new(false),
            provisioner,
            event_lock: Mutex::new(()),
        }
    }
}

/// Build the router
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/events", post(events_handler))
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until the listener fails
///
/// # Errors
///
/// Returns an error if the port cannot be bound or the server stops with an error.
pub async fn start_server(port: u16, state: Arc<ServerState>) -> Result<(), anyhow::Error> {
    let app = router(Arc::clone(&state));

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr).await?;

    state.is_ready.store(true, Ordering::Relaxed);
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn events_handler(
    State(state): State<Arc<ServerState>>,
    Json(event): Json<AccountCreationEvent>,
) -> Json<ProvisioningOutcome> {
    let _guard = state.event_lock.lock().await;
    let outcome = state.provisioner.handle_event(&event).await;
    info!(outcome = outcome.kind(), "Event handled");
    Json(outcome)
}

fn gather() -> Vec<prometheus::proto::MetricFamily> {
    use crate::observability::metrics::REGISTRY;
    REGISTRY.gather()
}

async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        buffer,
    )
}

async fn healthz_handler() -> impl IntoResponse {
    StatusCode::OK
}

async fn readyz_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    if state.is_ready.load(Ordering::Relaxed) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::Connector;
    use crate::error::{ProvisionerError, Result};
    use crate::notification::{Notifier, ProvisioningNotice};
    use crate::provisioner::ProvisionerSettings;
    use crate::qualys::{ConnectorService, CreateResult, OperationResult};
    use crate::role::{RoleSetup, RoleSetupRequest};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    /// Every remote call fails, so only skipped events succeed end to end
    struct Unreachable;

    #[async_trait]
    impl ConnectorService for Unreachable {
        async fn list_connectors(&self) -> Result<Vec<Connector>> {
            Err(ProvisionerError::UnexpectedStatus {
                endpoint: "search".to_owned(),
                status: 503,
            })
        }

        async fn create(&self, _name: &str) -> Result<CreateResult> {
            Ok(CreateResult {
                connectors: Vec::new(),
                succeeded: false,
                status: 503,
            })
        }

        async fn activate(&self, _id: &str, _role_arn: &str) -> Result<OperationResult> {
            Ok(OperationResult::from_status(503))
        }

        async fn delete(&self, _name: &str) -> Result<OperationResult> {
            Ok(OperationResult::from_status(503))
        }
    }

    #[async_trait]
    impl RoleSetup for Unreachable {
        async fn setup_role(&self, _request: &RoleSetupRequest) -> Result<String> {
            Err(ProvisionerError::RoleSetup("unreachable".to_owned()))
        }
    }

    #[async_trait]
    impl Notifier for Unreachable {
        async fn notify(&self, _notice: &ProvisioningNotice) -> Result<()> {
            Ok(())
        }
    }

    fn state() -> Arc<ServerState> {
        let fake = Arc::new(Unreachable);
        Arc::new(ServerState::new(Provisioner::new(
            Arc::clone(&fake) as Arc<dyn ConnectorService>,
            Arc::clone(&fake) as Arc<dyn RoleSetup>,
            fake as Arc<dyn Notifier>,
            ProvisionerSettings {
                qualys_base_account_id: "805950163170".to_owned(),
                max_empty_create_retries: 1,
                production_suffixes: vec!["prd".to_owned()],
            },
        )))
    }

    fn event_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/events")
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_healthz() {
        let response = router(state())
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_readyz_follows_flag() {
        let state = state();
        let response = router(Arc::clone(&state))
            .oneshot(Request::get("/readyz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        state.is_ready.store(true, Ordering::Relaxed);
        let response = router(state)
            .oneshot(Request::get("/readyz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        crate::observability::metrics::register_metrics().unwrap();
        let response = router(state())
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_event_skipped_for_non_production() {
        let event = include_str!("../tests/fixtures/account_created_event.json")
            .replace("payments-prd", "payments-dev");
        let response = router(state()).oneshot(event_request(&event)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["outcome"], "skipped");
        assert_eq!(json["reason"], "non_production");
    }

    #[tokio::test]
    async fn test_failed_provisioning_still_answers_ok() {
        let event = include_str!("../tests/fixtures/account_created_event.json");
        let response = router(state()).oneshot(event_request(event)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["outcome"], "abandoned");
        assert_eq!(json["stage"], "create");
    }

    #[tokio::test]
    async fn test_malformed_body_is_rejected() {
        let response = router(state())
            .oneshot(event_request("not json"))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }
}
