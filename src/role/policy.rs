//! IAM policy documents for the connector role

use serde_json::{json, Value};

/// Actions the connector needs to inventory EC2
pub const CONNECTOR_ACTIONS: &[&str] = &[
    "ec2:DescribeInstances",
    "ec2:DescribeAddresses",
    "ec2:DescribeImages",
];

/// Trust policy letting the Qualys account assume the role with `external_id`
#[must_use]
pub fn trust_policy(qualys_base_account_id: &str, external_id: &str) -> Value {
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Principal": { "AWS": format!("arn:aws:iam::{qualys_base_account_id}:root") },
            "Action": "sts:AssumeRole",
            "Condition": {
                "StringEquals": { "sts:ExternalId": external_id }
            }
        }]
    })
}

/// Read-only permissions attached to the connector role
#[must_use]
pub fn connector_permissions() -> Value {
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Action": CONNECTOR_ACTIONS,
            "Resource": "*"
        }]
    })
}
