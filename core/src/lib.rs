//! Root of the `tagger-core` library.
//!
//! Scans the change-event stream of every reachable subscription over a
//! sliding time window, finds resources without a `Created-by` tag and
//! writes the creator's identity back as a tag pair. Outbound calls share
//! one rate limiter; concurrent subscription scans are bounded.
//!
//! The cloud platform itself is reached through the [`ManagementApi`] and
//! [`DirectoryApi`] traits so this crate stays free of wire concerns.

// Library code reports through `tracing`, never directly to stdout/stderr.
#![deny(clippy::print_stdout, clippy::print_stderr)]

mod api;
pub mod bootstrap;
pub mod catalog;
mod error;
pub mod filter;
pub mod identity;
pub mod limiter;
pub mod model;
pub mod resource_id;
pub mod scanner;
pub mod scheduler;


pub use api::{DirectoryApi, ManagementApi};
pub use bootstrap::{Bootstrap, bootstrap};
pub use catalog::ProviderCatalog;
pub use error::{ApiError, ApiResult, BootstrapError, ScanError, SchedulerError};
pub use filter::should_process;
pub use identity::IdentityResolver;
pub use limiter::{LimiterClosed, RateLimiter, Throttled};
pub use model::{
    CREATED_BY_ID_TAG, CREATED_BY_TAG, ChangeEvent, Claims, Page, ProviderInfo, Resource,
    ResourceTypeInfo, Tags, TimeWindow, TimeWindowError, UNKNOWN_IDENTITY,
};
pub use resource_id::{ParsedResourceId, ResourceIdentifier};
pub use scanner::{ScanReport, SubscriptionScanner};
pub use scheduler::{CycleReport, ScanScheduler, SchedulerConfig, SlidingWindow};
