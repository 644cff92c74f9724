//! The poll loop.
//!
//! Each cycle captures `now`, scans `[start, now]` for every subscription
//! (at most `burst_limit` scans at once), then moves `start` to
//! `now - overlap` and starts over right away. The overlap re-covers events
//! the activity log ingested late; re-processing them is harmless because
//! tagging is idempotent. Pacing comes from the shared rate limiter only.

use std::convert::Infallible;
use std::num::{NonZeroU32, NonZeroUsize};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::api::ManagementApi;
use crate::bootstrap::list_all_subscriptions;
use crate::error::SchedulerError;
use crate::model::{TimeWindow, TimeWindowError};
use crate::scanner::{ScanReport, SubscriptionScanner};

pub const DEFAULT_RATE_LIMIT: u32 = 20;
pub const DEFAULT_BURST_LIMIT: usize = 5;
pub const DEFAULT_LOOKBACK_DAYS: i64 = 89;
pub const DEFAULT_OVERLAP_SECONDS_PER_RATE: u32 = 20;

const DEFAULT_RATE: NonZeroU32 = match NonZeroU32::new(DEFAULT_RATE_LIMIT) {
    Some(rate) => rate,
    None => panic!("default rate limit must be non-zero"),
};
const DEFAULT_BURST: NonZeroUsize = match NonZeroUsize::new(DEFAULT_BURST_LIMIT) {
    Some(burst) => burst,
    None => panic!("default burst limit must be non-zero"),
};

/// Smallest overlap applied between cycles, so a new window always starts
/// strictly before the previous cycle's `now`.
const MIN_OVERLAP: Duration = Duration::seconds(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Outbound API calls per second, shared by all scans.
    pub rate_limit: NonZeroU32,
    /// Subscription scans running at once.
    pub burst_limit: NonZeroUsize,
    /// History covered by the first cycle.
    pub lookback: Duration,
    /// Overlap between cycles, in seconds per unit of `rate_limit`.
    pub overlap_seconds_per_rate: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            rate_limit: DEFAULT_RATE,
            burst_limit: DEFAULT_BURST,
            lookback: Duration::days(DEFAULT_LOOKBACK_DAYS),
            overlap_seconds_per_rate: DEFAULT_OVERLAP_SECONDS_PER_RATE,
        }
    }
}

impl SchedulerConfig {
    /// `rate_limit × overlap_seconds_per_rate` seconds, at least one second.
    pub fn overlap(&self) -> Duration {
        let seconds = i64::from(self.rate_limit.get()) * i64::from(self.overlap_seconds_per_rate);
        Duration::seconds(seconds).max(MIN_OVERLAP)
    }
}

/// Loop-local start of the next window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlidingWindow {
    start: DateTime<Utc>,
}

impl SlidingWindow {
    /// First window starts `lookback` before `process_start`.
    pub fn seeded(process_start: DateTime<Utc>, lookback: Duration) -> Self {
        Self {
            start: process_start - lookback,
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn window_until(&self, now: DateTime<Utc>) -> Result<TimeWindow, TimeWindowError> {
        TimeWindow::new(self.start, now)
    }

    /// Next window starts `overlap` before the `now` this cycle captured.
    pub fn advance(&mut self, now: DateTime<Utc>, overlap: Duration) {
        self.start = now - overlap.max(MIN_OVERLAP);
    }
}

/// Outcome of one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub subscriptions: usize,
    pub scanned: usize,
    pub failed: usize,
    pub events: ScanReport,
}

pub struct ScanScheduler {
    management: Arc<dyn ManagementApi>,
    scanner: Arc<SubscriptionScanner>,
    gate: Arc<Semaphore>,
    config: SchedulerConfig,
}

impl ScanScheduler {
    pub fn new(
        management: Arc<dyn ManagementApi>,
        scanner: SubscriptionScanner,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            management,
            scanner: Arc::new(scanner),
            gate: Arc::new(Semaphore::new(config.burst_limit.get())),
            config,
        }
    }

    /// Runs cycles until subscription enumeration fails.
    pub async fn run(self) -> Result<Infallible, SchedulerError> {
        let mut window = SlidingWindow::seeded(Utc::now(), self.config.lookback);
        let overlap = self.config.overlap();
        tracing::info!(
            rate_limit = self.config.rate_limit.get(),
            burst_limit = self.config.burst_limit.get(),
            overlap_s = overlap.num_seconds(),
            "Starting scan loop from {}",
            window.start()
        );

        loop {
            let now = Utc::now();
            match window.window_until(now) {
                Ok(range) => {
                    let report = self.run_cycle(range).await?;
                    tracing::info!(
                        subscriptions = report.subscriptions,
                        failed = report.failed,
                        events = report.events.events_seen,
                        tagged = report.events.tagged,
                        "Cycle complete"
                    );
                }
                // Only reachable if the wall clock stepped backwards.
                Err(e) => tracing::warn!("Skipping cycle: {e}"),
            }
            window.advance(now, overlap);
        }
    }

    /// Scans every current subscription over `window` and waits for all
    /// scans to finish. A failed scan is logged and counted; only a failed
    /// subscription enumeration is returned as an error.
    pub async fn run_cycle(&self, window: TimeWindow) -> Result<CycleReport, SchedulerError> {
        let subscriptions = list_all_subscriptions(self.management.as_ref())
            .await
            .map_err(SchedulerError::ListSubscriptions)?;
        let mut report = CycleReport {
            subscriptions: subscriptions.len(),
            ..CycleReport::default()
        };

        let mut scans = JoinSet::new();
        for subscription in subscriptions {
            // Blocks while `burst_limit` scans are running.
            let permit = Arc::clone(&self.gate)
                .acquire_owned()
                .await
                .map_err(|_| SchedulerError::GateClosed)?;
            let scanner = Arc::clone(&self.scanner);
            scans.spawn(async move {
                let result = scanner.scan(&subscription, window).await;
                drop(permit);
                (subscription, result)
            });
        }

        while let Some(joined) = scans.join_next().await {
            match joined {
                Ok((_, Ok(scan))) => {
                    report.scanned += 1;
                    report.events += scan;
                }
                Ok((subscription, Err(e))) => {
                    tracing::warn!("Scan of {subscription} aborted for this cycle: {e}");
                    report.failed += 1;
                }
                Err(e) => {
                    tracing::error!("Scan task failed: {e}");
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }
}
