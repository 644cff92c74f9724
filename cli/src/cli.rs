use std::num::{NonZeroU32, NonZeroUsize};

use anyhow::Context;
use clap::Parser;
use tagger_azure::{
    DEFAULT_AUTHORITY_HOST, DEFAULT_GRAPH_ENDPOINT, DEFAULT_RESOURCE_MANAGER_ENDPOINT, Endpoints,
};
use tagger_core::SchedulerConfig;
use tagger_core::scheduler::{
    DEFAULT_BURST_LIMIT, DEFAULT_LOOKBACK_DAYS, DEFAULT_OVERLAP_SECONDS_PER_RATE,
    DEFAULT_RATE_LIMIT,
};
use url::Url;

/// Tags newly created Azure resources with the identity that created them.
///
/// Credentials come from `AZURE_CLIENT_ID` / `AZURE_TENANT_ID` /
/// `AZURE_CLIENT_SECRET`, from the file named by `AZURE_AUTH_LOCATION`, or
/// from the logged-in Azure CLI, in that order.
#[derive(Parser, Debug)]
#[command(version)]
pub struct Args {
    /// Outbound API calls per second, shared by all scans.
    #[arg(
        long,
        env = "CHECK_RATE_LIMIT_PER_SECOND",
        default_value_t = DEFAULT_RATE_LIMIT,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub rate_limit: u32,

    /// Subscriptions scanned at the same time.
    #[arg(
        long,
        env = "CHECK_BURST_LIMIT",
        default_value_t = DEFAULT_BURST_LIMIT as u32,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub burst_limit: u32,

    /// Days of history covered by the first scan.
    #[arg(
        long,
        env = "CHECK_LOOKBACK_DAYS",
        default_value_t = DEFAULT_LOOKBACK_DAYS,
        value_parser = clap::value_parser!(i64).range(0..)
    )]
    pub lookback_days: i64,

    /// Overlap between consecutive windows, in seconds per unit of
    /// `--rate-limit`.
    #[arg(
        long,
        env = "CHECK_OVERLAP_SECONDS_PER_RATE",
        default_value_t = DEFAULT_OVERLAP_SECONDS_PER_RATE
    )]
    pub overlap_seconds_per_rate: u32,

    #[arg(
        long,
        env = "AZURE_RESOURCE_MANAGER_ENDPOINT",
        default_value = DEFAULT_RESOURCE_MANAGER_ENDPOINT
    )]
    pub resource_manager_endpoint: Url,

    #[arg(long, env = "AZURE_GRAPH_ENDPOINT", default_value = DEFAULT_GRAPH_ENDPOINT)]
    pub graph_endpoint: Url,

    #[arg(long, env = "AZURE_AUTHORITY_HOST", default_value = DEFAULT_AUTHORITY_HOST)]
    pub authority_host: Url,
}

impl Args {
    pub fn scheduler_config(&self) -> anyhow::Result<SchedulerConfig> {
        let burst_limit = usize::try_from(self.burst_limit).context("--burst-limit is too large")?;
        Ok(SchedulerConfig {
            rate_limit: NonZeroU32::new(self.rate_limit).context("--rate-limit must be at least 1")?,
            burst_limit: NonZeroUsize::new(burst_limit)
                .context("--burst-limit must be at least 1")?,
            lookback: chrono::Duration::try_days(self.lookback_days)
                .context("--lookback-days is out of range")?,
            overlap_seconds_per_rate: self.overlap_seconds_per_rate,
        })
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints::new(
            self.resource_manager_endpoint.as_str(),
            self.graph_endpoint.as_str(),
            self.authority_host.as_str(),
        )
    }
}
