//! Scan of one subscription's change events over one time window.
//!
//! Every event that survives the filter has its target resource read back;
//! resources without a `Created-by` tag get the creator's identity written
//! as a `Created-by` / `Created-by-id` pair. Failures on a single event are
//! logged and skipped, only a failed event listing aborts the scan.

use std::ops::AddAssign;
use std::sync::Arc;

use crate::api::ManagementApi;
use crate::catalog::ProviderCatalog;
use crate::error::{ApiError, ScanError};
use crate::filter::filter_reason;
use crate::identity::IdentityResolver;
use crate::model::{CREATED_BY_ID_TAG, CREATED_BY_TAG, ChangeEvent, Tags, TimeWindow};
use crate::resource_id::{ParsedResourceId, ResourceIdentifier};

/// What happened to one change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventOutcome {
    Filtered,
    UnknownProvider,
    Deleted,
    FetchFailed,
    Unparsed,
    AlreadyTagged,
    Tagged,
    UpdateFailed,
}

/// Per-outcome event counts of a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub events_seen: usize,
    pub filtered: usize,
    pub unknown_provider: usize,
    pub deleted: usize,
    pub fetch_failed: usize,
    pub unparsed: usize,
    pub already_tagged: usize,
    pub tagged: usize,
    pub update_failed: usize,
}

impl ScanReport {
    fn record(&mut self, outcome: EventOutcome) {
        self.events_seen += 1;
        let counter = match outcome {
            EventOutcome::Filtered => &mut self.filtered,
            EventOutcome::UnknownProvider => &mut self.unknown_provider,
            EventOutcome::Deleted => &mut self.deleted,
            EventOutcome::FetchFailed => &mut self.fetch_failed,
            EventOutcome::Unparsed => &mut self.unparsed,
            EventOutcome::AlreadyTagged => &mut self.already_tagged,
            EventOutcome::Tagged => &mut self.tagged,
            EventOutcome::UpdateFailed => &mut self.update_failed,
        };
        *counter += 1;
    }
}

impl AddAssign for ScanReport {
    fn add_assign(&mut self, other: Self) {
        self.events_seen += other.events_seen;
        self.filtered += other.filtered;
        self.unknown_provider += other.unknown_provider;
        self.deleted += other.deleted;
        self.fetch_failed += other.fetch_failed;
        self.unparsed += other.unparsed;
        self.already_tagged += other.already_tagged;
        self.tagged += other.tagged;
        self.update_failed += other.update_failed;
    }
}

/// Returns `existing` with the provenance pair added. Existing tags are
/// kept as they are.
pub fn provenance_tags(existing: &Tags, created_by: &str, created_by_id: &str) -> Tags {
    let mut tags = existing.clone();
    tags.insert(CREATED_BY_TAG.to_string(), created_by.to_string());
    tags.insert(CREATED_BY_ID_TAG.to_string(), created_by_id.to_string());
    tags
}

/// Scans subscriptions. Holds no per-scan state, so one instance serves all
/// concurrent scans.
pub struct SubscriptionScanner {
    management: Arc<dyn ManagementApi>,
    identity: IdentityResolver,
    catalog: Arc<ProviderCatalog>,
}

impl SubscriptionScanner {
    pub fn new(
        management: Arc<dyn ManagementApi>,
        identity: IdentityResolver,
        catalog: Arc<ProviderCatalog>,
    ) -> Self {
        Self {
            management,
            identity,
            catalog,
        }
    }

    pub async fn scan(
        &self,
        subscription: &str,
        window: TimeWindow,
    ) -> Result<ScanReport, ScanError> {
        tracing::info!(
            "Evaluating status for: {subscription} ({} .. {})",
            window.from(),
            window.to()
        );
        let filter = window.filter_expression();
        let mut report = ScanReport::default();
        let mut next_link: Option<String> = None;

        loop {
            let page = self
                .management
                .list_change_events(subscription, &filter, next_link.as_deref())
                .await
                .map_err(|source| ScanError::ListEvents {
                    subscription: subscription.to_string(),
                    source,
                })?;

            for event in &page.items {
                let outcome = self.process_event(event).await;
                report.record(outcome);
            }

            match page.next_link {
                Some(link) => next_link = Some(link),
                None => break,
            }
        }

        tracing::info!(
            subscription,
            events = report.events_seen,
            tagged = report.tagged,
            already_tagged = report.already_tagged,
            skipped = report.filtered + report.unknown_provider + report.deleted + report.unparsed,
            failed = report.fetch_failed + report.update_failed,
            "Finished scan"
        );
        Ok(report)
    }

    async fn process_event(&self, event: &ChangeEvent) -> EventOutcome {
        if let Some(reason) = filter_reason(event) {
            tracing::debug!(event_id = %event.event_id, "Dropping event: {reason}");
            return EventOutcome::Filtered;
        }
        // The filter guarantees both are present.
        let (Some(caller), Some(resource_type)) =
            (event.caller.as_deref(), event.resource_type.as_deref())
        else {
            return EventOutcome::Filtered;
        };
        let resource_type = resource_type.to_lowercase();

        let Some(resource_id) = event.resource_id.as_deref() else {
            tracing::warn!(event_id = %event.event_id, "Event has no resource id");
            return EventOutcome::Unparsed;
        };

        let Some(api_version) = self.catalog.api_version(&resource_type) else {
            tracing::warn!("No API version known for {resource_type}, skipping {resource_id}");
            return EventOutcome::UnknownProvider;
        };

        let resource = match self.management.get_resource(resource_id, api_version).await {
            Ok(resource) => resource,
            Err(ApiError::NotFound) => {
                tracing::debug!("Resource {resource_id} no longer exists");
                return EventOutcome::Deleted;
            }
            Err(e) => {
                tracing::warn!("Failed to read {resource_id}: {e}");
                return EventOutcome::FetchFailed;
            }
        };

        let id = match ResourceIdentifier::parse(&resource.id) {
            ParsedResourceId::Parsed(id) => id,
            ParsedResourceId::Unparsed => {
                tracing::warn!("Unrecognized resource id {:?}, skipping", resource.id);
                return EventOutcome::Unparsed;
            }
        };

        if resource.has_tag(CREATED_BY_TAG) {
            return EventOutcome::AlreadyTagged;
        }

        let created_by = self.identity.resolve(caller, &event.claims).await;
        tracing::info!(
            "UPDATING {} | {} | {} | {}",
            id.subscription,
            id.name,
            resource_type,
            created_by
        );
        let tags = provenance_tags(&resource.tags, &created_by, caller);
        match self
            .management
            .update_tags(&resource.id, api_version, &tags)
            .await
        {
            Ok(()) => EventOutcome::Tagged,
            Err(e) => {
                tracing::warn!("Failed to tag {}: {e}", resource.id);
                EventOutcome::UpdateFailed
            }
        }
    }
}
