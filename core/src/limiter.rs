//! Process-wide cap on outbound API calls.
//!
//! Callers enqueue a waiter on a bounded queue; a background task releases
//! each waiter no sooner than one `1s / rate_limit` period after the previous
//! admission. Consecutive admissions are therefore at least one period
//! apart, so no one-second interval admits more than `rate_limit` calls no
//! matter how many scans share the limiter.

use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until};

use crate::api::{DirectoryApi, ManagementApi};
use crate::error::ApiResult;
use crate::model::{ChangeEvent, Page, ProviderInfo, Resource, Tags};

/// The release task is gone and no further calls will be admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("rate limiter is shut down")]
pub struct LimiterClosed;

type Waiter = oneshot::Sender<()>;

/// Shared admission gate. Cloning yields another handle to the same gate.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    queue: mpsc::Sender<Waiter>,
    rate_limit: NonZeroU32,
}

impl RateLimiter {
    /// Starts the release task. Must be called from within a tokio runtime.
    /// The task exits once every handle has been dropped.
    pub fn new(rate_limit: NonZeroU32) -> Self {
        let (queue, pending) = mpsc::channel(rate_limit.get() as usize);
        tokio::spawn(release_waiters(pending, Self::period(rate_limit)));
        Self { queue, rate_limit }
    }

    pub fn rate_limit(&self) -> NonZeroU32 {
        self.rate_limit
    }

    /// Minimum spacing between two admissions, rounded up so that
    /// `rate_limit` periods never fit in less than one second.
    pub fn period(rate_limit: NonZeroU32) -> Duration {
        Duration::from_nanos(1_000_000_000_u64.div_ceil(u64::from(rate_limit.get())))
    }

    /// Waits until this call is admitted. Every call consumes exactly one
    /// admission.
    pub async fn acquire(&self) -> Result<(), LimiterClosed> {
        let (waiter, admitted) = oneshot::channel();
        self.queue.send(waiter).await.map_err(|_| LimiterClosed)?;
        admitted.await.map_err(|_| LimiterClosed)
    }
}

async fn release_waiters(mut pending: mpsc::Receiver<Waiter>, period: Duration) {
    // Spacing is measured from the previous admission, not from a fixed
    // schedule, so a waiter arriving between slots cannot be admitted early.
    let mut last: Option<Instant> = None;
    while let Some(waiter) = pending.recv().await {
        if let Some(last) = last {
            sleep_until(last + period).await;
        }
        last = Some(Instant::now());
        // A caller that stopped waiting still spent its slot.
        let _ = waiter.send(());
    }
    tracing::debug!("rate limiter stopped: all handles dropped");
}

/// Decorator that takes one limiter admission before every call to the
/// wrapped collaborator.
pub struct Throttled<T> {
    inner: T,
    limiter: RateLimiter,
}

impl<T> Throttled<T> {
    pub fn new(inner: T, limiter: RateLimiter) -> Self {
        Self { inner, limiter }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: ManagementApi> ManagementApi for Throttled<T> {
    async fn list_tenants(&self) -> ApiResult<Vec<String>> {
        self.limiter.acquire().await?;
        self.inner.list_tenants().await
    }

    async fn list_subscriptions(&self, next_link: Option<&str>) -> ApiResult<Page<String>> {
        self.limiter.acquire().await?;
        self.inner.list_subscriptions(next_link).await
    }

    async fn list_providers(&self, subscription: &str) -> ApiResult<Vec<ProviderInfo>> {
        self.limiter.acquire().await?;
        self.inner.list_providers(subscription).await
    }

    async fn list_change_events(
        &self,
        subscription: &str,
        filter: &str,
        next_link: Option<&str>,
    ) -> ApiResult<Page<ChangeEvent>> {
        self.limiter.acquire().await?;
        self.inner
            .list_change_events(subscription, filter, next_link)
            .await
    }

    async fn get_resource(&self, resource_id: &str, api_version: &str) -> ApiResult<Resource> {
        self.limiter.acquire().await?;
        self.inner.get_resource(resource_id, api_version).await
    }

    async fn update_tags(
        &self,
        resource_id: &str,
        api_version: &str,
        tags: &Tags,
    ) -> ApiResult<()> {
        self.limiter.acquire().await?;
        self.inner.update_tags(resource_id, api_version, tags).await
    }
}

#[async_trait]
impl<T: DirectoryApi> DirectoryApi for Throttled<T> {
    async fn display_name(&self, app_id: &str) -> ApiResult<String> {
        self.limiter.acquire().await?;
        self.inner.display_name(app_id).await
    }
}
