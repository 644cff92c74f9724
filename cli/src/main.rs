//! `provenance-tagger` entry point.
//!
//! Authenticates, resolves the tenant, subscriptions and provider catalog,
//! then runs the scan loop until a fatal error or Ctrl+C.

mod cli;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tagger_azure::{CredentialSource, DirectoryClient, ManagementClient};
use tagger_core::{
    DirectoryApi, IdentityResolver, ManagementApi, RateLimiter, ScanScheduler,
    SubscriptionScanner, Throttled, bootstrap,
};

use crate::cli::Args;

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("provenance-tagger v{} starting", env!("CARGO_PKG_VERSION"));

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = args.scheduler_config()?;
    let endpoints = args.endpoints();
    let http = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .context("failed to build HTTP client")?;

    let credentials =
        CredentialSource::from_env(&endpoints).context("failed to load credentials")?;
    tracing::info!("Authenticating with {}", credentials.describe());
    let management_auth = credentials.authorizer(http.clone(), endpoints.resource_manager_base());
    let directory_auth = credentials.authorizer(http.clone(), endpoints.graph_base());
    // Both tokens are fetched up front so a bad credential fails at startup.
    management_auth
        .token()
        .await
        .context("failed to acquire resource manager token")?;
    directory_auth
        .token()
        .await
        .context("failed to acquire directory token")?;

    let limiter = RateLimiter::new(config.rate_limit);
    let management: Arc<dyn ManagementApi> = Arc::new(Throttled::new(
        ManagementClient::new(http.clone(), &endpoints, management_auth),
        limiter.clone(),
    ));
    let state = bootstrap(management.as_ref())
        .await
        .context("startup failed")?;
    let directory: Arc<dyn DirectoryApi> = Arc::new(Throttled::new(
        DirectoryClient::new(http, &endpoints, &state.tenant_id, directory_auth),
        limiter,
    ));

    let scanner = SubscriptionScanner::new(
        Arc::clone(&management),
        IdentityResolver::new(directory),
        Arc::new(state.catalog),
    );
    let scheduler = ScanScheduler::new(management, scanner, config);

    tokio::select! {
        result = scheduler.run() => {
            let Err(e) = result;
            Err(e).context("scan loop stopped")
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, exiting");
            Ok(())
        }
    }
}
