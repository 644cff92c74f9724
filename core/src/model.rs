//! Data types exchanged between the scanner and its collaborators.

use std::collections::BTreeMap;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Tag holding the resolved display name of the creator.
pub const CREATED_BY_TAG: &str = "Created-by";

/// Tag holding the raw caller reference of the creator.
pub const CREATED_BY_ID_TAG: &str = "Created-by-id";

/// Identity written when the event carries neither a name nor an app id claim.
pub const UNKNOWN_IDENTITY: &str = "UNKNOWN";

/// Claim present when the caller is a human user.
pub const NAME_CLAIM: &str = "name";

/// Claim present when the caller is an application (service principal).
pub const APP_ID_CLAIM: &str = "appid";

/// Claims attached to a change event's caller.
pub type Claims = HashMap<String, String>;

/// A resource's tag map.
pub type Tags = BTreeMap<String, String>;

/// One entry of a subscription's change-event (activity log) stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeEvent {
    pub event_id: String,
    pub timestamp: Option<DateTime<Utc>>,
    /// Raw caller reference: a user principal name or an application id.
    pub caller: Option<String>,
    pub claims: Claims,
    pub resource_id: Option<String>,
    /// `Namespace/type`, as emitted by the platform (mixed case).
    pub resource_type: Option<String>,
    pub operation_name: Option<String>,
    pub sub_status: Option<String>,
}

/// Current state of a resource as returned by the read call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resource {
    pub id: String,
    pub tags: Tags,
}

impl Resource {
    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }
}

/// A resource provider namespace and the types it exposes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderInfo {
    pub namespace: String,
    pub resource_types: Vec<ResourceTypeInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceTypeInfo {
    pub resource_type: String,
    /// Supported API versions, newest first.
    pub api_versions: Vec<String>,
}

/// One page of a paged listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Opaque continuation; `None` on the last page.
    pub next_link: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_link: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("time window start {from} is not before its end {to}")]
pub struct TimeWindowError {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Query range of one scan. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

impl TimeWindow {
    /// Timestamp format understood by the activity log filter.
    const FILTER_FORMAT: &'static str = "%Y-%m-%dT%H:%M:%S";

    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self, TimeWindowError> {
        if from < to {
            Ok(Self { from, to })
        } else {
            Err(TimeWindowError { from, to })
        }
    }

    pub fn from(&self) -> DateTime<Utc> {
        self.from
    }

    pub fn to(&self) -> DateTime<Utc> {
        self.to
    }

    /// Server-side filter selecting events inside this window.
    pub fn filter_expression(&self) -> String {
        format!(
            "eventTimestamp ge '{}' and eventTimestamp le '{}'",
            self.from.format(Self::FILTER_FORMAT),
            self.to.format(Self::FILTER_FORMAT),
        )
    }
}
