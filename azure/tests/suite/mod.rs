mod auth;
mod directory;
mod management;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tagger_azure::{AccessToken, AuthError, Authorizer, Endpoints};
use wiremock::MockServer;

pub const TOKEN: &str = "test-token";

/// Hands out a fixed token.
pub struct StaticAuthorizer;

#[async_trait]
impl Authorizer for StaticAuthorizer {
    async fn token(&self) -> Result<AccessToken, AuthError> {
        Ok(AccessToken {
            token: TOKEN.to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        })
    }
}

pub fn authorizer() -> Arc<dyn Authorizer> {
    Arc::new(StaticAuthorizer)
}

/// Every endpoint pointed at `server`.
pub fn endpoints(server: &MockServer) -> Endpoints {
    let base = server.uri();
    Endpoints::new(&base, &base, &base)
}
