//! One-time startup lookups. Any failure here is fatal.

use crate::api::ManagementApi;
use crate::catalog::ProviderCatalog;
use crate::error::{ApiResult, BootstrapError};

/// State resolved before the first scan cycle.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    /// Tenant used for directory lookups.
    pub tenant_id: String,
    pub subscriptions: Vec<String>,
    pub catalog: ProviderCatalog,
}

/// Resolves the active tenant, enumerates subscriptions and loads the
/// provider catalog from the first subscription.
pub async fn bootstrap(management: &dyn ManagementApi) -> Result<Bootstrap, BootstrapError> {
    let tenants = management
        .list_tenants()
        .await
        .map_err(BootstrapError::ListTenants)?;
    // The last listed tenant wins when the credential reaches several.
    let tenant_id = tenants.into_iter().last().ok_or(BootstrapError::NoTenant)?;
    tracing::info!("Using tenant {tenant_id}");

    let subscriptions = list_all_subscriptions(management)
        .await
        .map_err(BootstrapError::ListSubscriptions)?;
    let Some(first) = subscriptions.first() else {
        return Err(BootstrapError::NoSubscription);
    };
    tracing::info!("{} subscription(s) reachable", subscriptions.len());

    let providers = management
        .list_providers(first)
        .await
        .map_err(|source| BootstrapError::ListProviders {
            subscription: first.clone(),
            source,
        })?;
    let catalog = ProviderCatalog::from_providers(&providers);
    tracing::info!(
        "Loaded API versions for {} resource types from {first}",
        catalog.len()
    );

    Ok(Bootstrap {
        tenant_id,
        subscriptions,
        catalog,
    })
}

/// Follows `next_link` until the last page of subscriptions.
pub async fn list_all_subscriptions(management: &dyn ManagementApi) -> ApiResult<Vec<String>> {
    let mut subscriptions = Vec::new();
    let mut next_link: Option<String> = None;
    loop {
        let page = management.list_subscriptions(next_link.as_deref()).await?;
        subscriptions.extend(page.items);
        match page.next_link {
            Some(link) => next_link = Some(link),
            None => return Ok(subscriptions),
        }
    }
}
