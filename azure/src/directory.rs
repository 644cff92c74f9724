//! [`DirectoryApi`] over the Graph `servicePrincipals` collection.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tagger_core::{ApiError, ApiResult, DirectoryApi};

use crate::Endpoints;
use crate::auth::Authorizer;
use crate::http::{authorized, read_json, send};

const GRAPH_API_VERSION: &str = "1.6";

#[derive(Debug, Deserialize)]
struct ServicePrincipalList {
    #[serde(default)]
    value: Vec<ServicePrincipal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServicePrincipal {
    #[serde(default)]
    display_name: String,
}

/// Resolves application ids to display names within one tenant.
pub struct DirectoryClient {
    http: reqwest::Client,
    url: String,
    authorizer: Arc<dyn Authorizer>,
}

impl DirectoryClient {
    pub fn new(
        http: reqwest::Client,
        endpoints: &Endpoints,
        tenant_id: &str,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        Self {
            http,
            url: format!("{}/{tenant_id}/servicePrincipals", endpoints.graph_base()),
            authorizer,
        }
    }
}

#[async_trait]
impl DirectoryApi for DirectoryClient {
    async fn display_name(&self, app_id: &str) -> ApiResult<String> {
        // Quotes are doubled inside OData string literals.
        let filter = format!("appId eq '{}'", app_id.replace('\'', "''"));
        let request = self.http.get(&self.url).query(&[
            ("$filter", filter.as_str()),
            ("api-version", GRAPH_API_VERSION),
        ]);
        let response = send(authorized(request, self.authorizer.as_ref()).await?).await?;
        let list: ServicePrincipalList = read_json(response).await?;
        list.value
            .into_iter()
            .next()
            .map(|principal| principal.display_name)
            .ok_or(ApiError::NotFound)
    }
}
