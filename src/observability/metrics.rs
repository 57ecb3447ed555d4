//! # Metrics
//!
//! Prometheus metrics for monitoring connector provisioning.
//!
//! ## Metrics Exposed
//!
//! - `qualys_provisioner_connector_operations_total` - Qualys API calls by operation and outcome
//! - `qualys_provisioner_connector_operation_duration_seconds` - Duration of Qualys API calls
//! - `qualys_provisioner_events_total` - Provisioning events by outcome
//! - `qualys_provisioner_empty_create_total` - Creations that returned no connector
//! - `qualys_provisioner_role_setup_total` - Role setups by outcome
//! - `qualys_provisioner_notification_failures_total` - Notifications that could not be delivered

use anyhow::Result;
use prometheus::{HistogramVec, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static CONNECTOR_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "qualys_provisioner_connector_operations_total",
            "Total number of Qualys connector API operations by operation and outcome",
        ),
        &["operation", "outcome"],
    )
    .expect("Failed to create CONNECTOR_OPERATIONS_TOTAL metric - this should never happen")
});

static CONNECTOR_OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "qualys_provisioner_connector_operation_duration_seconds",
            "Duration of Qualys connector API operations in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["operation"],
    )
    .expect("Failed to create CONNECTOR_OPERATION_DURATION metric - this should never happen")
});

static EVENTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "qualys_provisioner_events_total",
            "Total number of account creation events by provisioning outcome",
        ),
        &["outcome"],
    )
    .expect("Failed to create EVENTS_TOTAL metric - this should never happen")
});

static EMPTY_CREATE_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "qualys_provisioner_empty_create_total",
        "Total number of connector creations that returned no connector",
    )
    .expect("Failed to create EMPTY_CREATE_TOTAL metric - this should never happen")
});

static ROLE_SETUP_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "qualys_provisioner_role_setup_total",
            "Total number of connector role setups by outcome",
        ),
        &["outcome"],
    )
    .expect("Failed to create ROLE_SETUP_TOTAL metric - this should never happen")
});

static NOTIFICATION_FAILURES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "qualys_provisioner_notification_failures_total",
        "Total number of provisioning notifications that could not be delivered",
    )
    .expect("Failed to create NOTIFICATION_FAILURES_TOTAL metric - this should never happen")
});

/// Register all metrics with the crate registry
///
/// Safe to call more than once; collectors that are already registered are skipped.
///
/// # Errors
///
/// Returns an error if a collector is rejected for any reason other than
/// being registered already.
pub fn register_metrics() -> Result<()> {
    register(Box::new(CONNECTOR_OPERATIONS_TOTAL.clone()))?;
    register(Box::new(CONNECTOR_OPERATION_DURATION.clone()))?;
    register(Box::new(EVENTS_TOTAL.clone()))?;
    register(Box::new(EMPTY_CREATE_TOTAL.clone()))?;
    register(Box::new(ROLE_SETUP_TOTAL.clone()))?;
    register(Box::new(NOTIFICATION_FAILURES_TOTAL.clone()))?;

    Ok(())
}

fn register(collector: Box<dyn prometheus::core::Collector>) -> Result<()> {
    match REGISTRY.register(collector) {
        Ok(()) | Err(prometheus::Error::AlreadyReg) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Record one Qualys API call
pub fn record_connector_operation(operation: &str, succeeded: bool, duration: f64) {
    let outcome = if succeeded { "success" } else { "failure" };
    CONNECTOR_OPERATIONS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
    CONNECTOR_OPERATION_DURATION
        .with_label_values(&[operation])
        .observe(duration);
}

pub fn increment_events(outcome: &str) {
    EVENTS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn increment_empty_create() {
    EMPTY_CREATE_TOTAL.inc();
}

pub fn increment_role_setup(succeeded: bool) {
    let outcome = if succeeded { "success" } else { "failure" };
    ROLE_SETUP_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn increment_notification_failures() {
    NOTIFICATION_FAILURES_TOTAL.inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics_is_idempotent() {
        assert!(register_metrics().is_ok());
        assert!(register_metrics().is_ok());
    }

    #[test]
    fn test_record_connector_operation() {
        let before = CONNECTOR_OPERATIONS_TOTAL
            .with_label_values(&["search", "failure"])
            .get();
        record_connector_operation("search", false, 0.2);
        let after = CONNECTOR_OPERATIONS_TOTAL
            .with_label_values(&["search", "failure"])
            .get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_increment_events() {
        let before = EVENTS_TOTAL.with_label_values(&["skipped"]).get();
        increment_events("skipped");
        assert_eq!(EVENTS_TOTAL.with_label_values(&["skipped"]).get(), before + 1u64);
    }

    #[test]
    fn test_increment_notification_failures() {
        let before = NOTIFICATION_FAILURES_TOTAL.get();
        increment_notification_failures();
        assert_eq!(NOTIFICATION_FAILURES_TOTAL.get(), before + 1u64);
    }
}
