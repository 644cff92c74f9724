//! Keep/drop policy for change events.
//!
//! Only successful creations or completed write operations are actionable.
//! Deployment records and resource types that reject tag writes are dropped
//! before any API call is spent on them.

use std::fmt;

use crate::model::ChangeEvent;

/// Deployment records describe a template run, not a created resource.
pub const DEPLOYMENTS_RESOURCE_TYPE: &str = "Microsoft.Resources/deployments";

/// Lower-cased `namespace/type` pairs that do not accept tag writes or are
/// non-taggable child objects.
pub const UNSUPPORTED_RESOURCE_TYPES: &[&str] = &[
    "microsoft.eventhub/namespaces/eventhubs/authorizationrules",
    "microsoft.eventhub/namespaces/eventhubs/consumergroups",
    "microsoft.network/privatednszones/a",
    "microsoft.network/networksecuritygroups/securityrules",
    "microsoft.sql/servers/databases/securityalertpolicies",
    "microsoft.support/supporttickets",
    "microsoft.insights/diagnosticsettings",
    "microsoft.storage/storageaccounts/blobservices/containers",
    "microsoft.network/virtualnetworks/subnets",
    "microsoft.network/routetables/routes",
    "microsoft.network/virtualnetworks/virtualnetworkpeerings",
    "microsoft.sql/servers/firewallrules",
    "microsoft.authorization/roledefinitions",
    "microsoft.authorization/roleassignments",
    "microsoft.securityinsights/incidents/investigations",
];

const CREATED_SUB_STATUS: &str = "Created";
const WRITE_OPERATION_SUFFIX: &str = "/write";

/// Why an event was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterReason {
    MissingCaller,
    MissingResourceType,
    Deployment,
    UnsupportedResourceType,
    MissingSubStatus,
    NotACreation,
}

impl fmt::Display for FilterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            FilterReason::MissingCaller => "missing caller",
            FilterReason::MissingResourceType => "missing resource type",
            FilterReason::Deployment => "deployment record",
            FilterReason::UnsupportedResourceType => "resource type does not support tags",
            FilterReason::MissingSubStatus => "missing sub-status",
            FilterReason::NotACreation => "neither a creation nor a write",
        };
        f.write_str(reason)
    }
}

/// Returns `true` when the event should be processed.
pub fn should_process(event: &ChangeEvent) -> bool {
    filter_reason(event).is_none()
}

/// Returns the reason an event is dropped, or `None` if it is kept.
pub fn filter_reason(event: &ChangeEvent) -> Option<FilterReason> {
    if event.caller.is_none() {
        return Some(FilterReason::MissingCaller);
    }
    let Some(resource_type) = event.resource_type.as_deref() else {
        return Some(FilterReason::MissingResourceType);
    };
    if resource_type == DEPLOYMENTS_RESOURCE_TYPE {
        return Some(FilterReason::Deployment);
    }
    if is_unsupported(resource_type) {
        return Some(FilterReason::UnsupportedResourceType);
    }
    let Some(sub_status) = event.sub_status.as_deref() else {
        return Some(FilterReason::MissingSubStatus);
    };
    if sub_status != CREATED_SUB_STATUS && !is_write_operation(event.operation_name.as_deref()) {
        return Some(FilterReason::NotACreation);
    }
    None
}

pub fn is_unsupported(resource_type: &str) -> bool {
    let lowered = resource_type.to_lowercase();
    UNSUPPORTED_RESOURCE_TYPES.contains(&lowered.as_str())
}

fn is_write_operation(operation_name: Option<&str>) -> bool {
    operation_name.is_some_and(|op| op.ends_with(WRITE_OPERATION_SUFFIX))
}
