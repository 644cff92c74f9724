//! Credential acquisition.
//!
//! Three sources, picked from the environment in this order:
//! - `AZURE_CLIENT_ID` + `AZURE_TENANT_ID` (+ `AZURE_CLIENT_SECRET`): the
//!   OAuth client-credentials flow.
//! - `AZURE_AUTH_LOCATION`: an SDK auth file holding the same values.
//! - Otherwise the logged-in Azure CLI (`az account get-access-token`).
//!
//! Every source is wrapped in [`CachedAuthorizer`], which reuses a token
//! until five minutes before it expires.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, NaiveDateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::Mutex;

use crate::Endpoints;

pub const CLIENT_ID_ENV_VAR: &str = "AZURE_CLIENT_ID";
pub const TENANT_ID_ENV_VAR: &str = "AZURE_TENANT_ID";
pub const CLIENT_SECRET_ENV_VAR: &str = "AZURE_CLIENT_SECRET";
pub const AUTH_LOCATION_ENV_VAR: &str = "AZURE_AUTH_LOCATION";

/// Tokens are refreshed this long before they expire.
const REFRESH_MARGIN: Duration = Duration::minutes(5);

/// Errors while acquiring an access token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// OAuth error from the token endpoint.
    #[error("OAuth error: {error} - {description}")]
    OAuth { error: String, description: String },

    /// Invalid or malformed token response.
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    /// IO error reading the auth file or running the CLI.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error in the auth file or CLI output.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Incomplete credential configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// `az` exited unsuccessfully.
    #[error("az CLI failed: {0}")]
    Cli(String),
}

#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Produces bearer tokens for one audience.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn token(&self) -> Result<AccessToken, AuthError>;
}

/// Reuses the last token until it is within [`REFRESH_MARGIN`] of expiry.
pub struct CachedAuthorizer<A> {
    inner: A,
    cached: Mutex<Option<AccessToken>>,
}

impl<A: Authorizer> CachedAuthorizer<A> {
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            cached: Mutex::new(None),
        }
    }
}

#[async_trait]
impl<A: Authorizer> Authorizer for CachedAuthorizer<A> {
    async fn token(&self) -> Result<AccessToken, AuthError> {
        // Held across the refresh so concurrent callers wait for one fetch.
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && token.expires_at > Utc::now() + REFRESH_MARGIN
        {
            return Ok(token.clone());
        }
        let fresh = self.inner.token().await?;
        tracing::debug!("Acquired access token expiring at {}", fresh.expires_at);
        *cached = Some(fresh.clone());
        Ok(fresh)
    }
}

/// Service principal credential for the client-credentials flow.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientSecretCredential {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    /// Authority host without a trailing slash.
    pub authority_host: String,
}

impl fmt::Debug for ClientSecretCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSecretCredential")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("authority_host", &self.authority_host)
            .finish()
    }
}

/// Contents of the file `AZURE_AUTH_LOCATION` points at.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthFile {
    client_id: String,
    client_secret: String,
    tenant_id: String,
    #[serde(default)]
    active_directory_endpoint_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    ClientSecret(ClientSecretCredential),
    AzureCli,
}

impl CredentialSource {
    pub fn from_env(endpoints: &Endpoints) -> Result<Self, AuthError> {
        Self::from_lookup(endpoints, |name| {
            std::env::var(name).ok().filter(|value| !value.is_empty())
        })
    }

    /// Same as [`CredentialSource::from_env`] with variables read through
    /// `lookup`.
    pub fn from_lookup(
        endpoints: &Endpoints,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AuthError> {
        if let (Some(client_id), Some(tenant_id)) =
            (lookup(CLIENT_ID_ENV_VAR), lookup(TENANT_ID_ENV_VAR))
        {
            let client_secret = lookup(CLIENT_SECRET_ENV_VAR).ok_or_else(|| {
                AuthError::Config(format!(
                    "{CLIENT_SECRET_ENV_VAR} must be set together with {CLIENT_ID_ENV_VAR} and {TENANT_ID_ENV_VAR}"
                ))
            })?;
            return Ok(Self::ClientSecret(ClientSecretCredential {
                tenant_id,
                client_id,
                client_secret,
                authority_host: endpoints.authority_base().to_string(),
            }));
        }

        if let Some(location) = lookup(AUTH_LOCATION_ENV_VAR) {
            return Self::from_auth_file(Path::new(&location), endpoints);
        }

        Ok(Self::AzureCli)
    }

    fn from_auth_file(path: &Path, endpoints: &Endpoints) -> Result<Self, AuthError> {
        let contents = std::fs::read_to_string(path)?;
        let file: AuthFile = serde_json::from_str(&contents)?;
        let authority_host = file
            .active_directory_endpoint_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .unwrap_or_else(|| endpoints.authority_base())
            .to_string();
        Ok(Self::ClientSecret(ClientSecretCredential {
            tenant_id: file.tenant_id,
            client_id: file.client_id,
            client_secret: file.client_secret,
            authority_host,
        }))
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::ClientSecret(_) => "client credentials",
            Self::AzureCli => "Azure CLI",
        }
    }

    /// Cached authorizer issuing tokens for `audience`.
    pub fn authorizer(&self, http: reqwest::Client, audience: &str) -> Arc<dyn Authorizer> {
        match self {
            Self::ClientSecret(credential) => Arc::new(CachedAuthorizer::new(
                ClientSecretAuthorizer::new(http, credential.clone(), audience),
            )),
            Self::AzureCli => Arc::new(CachedAuthorizer::new(AzureCliAuthorizer::new(audience))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Seconds; a number on the v2 endpoint, a string on older ones.
    expires_in: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: String,
}

pub struct ClientSecretAuthorizer {
    http: reqwest::Client,
    credential: ClientSecretCredential,
    scope: String,
}

impl ClientSecretAuthorizer {
    pub fn new(http: reqwest::Client, credential: ClientSecretCredential, audience: &str) -> Self {
        Self {
            http,
            credential,
            scope: format!("{}/.default", audience.trim_end_matches('/')),
        }
    }

    fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.credential.authority_host, self.credential.tenant_id
        )
    }
}

#[async_trait]
impl Authorizer for ClientSecretAuthorizer {
    async fn token(&self) -> Result<AccessToken, AuthError> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credential.client_id.as_str()),
            ("client_secret", self.credential.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];
        let response = self.http.post(self.token_url()).form(&form).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(error) => AuthError::OAuth {
                    error: error.error,
                    description: error.error_description,
                },
                Err(_) => AuthError::InvalidResponse(format!("HTTP {status}: {body}")),
            });
        }

        let response: TokenResponse = serde_json::from_str(&body)?;
        let expires_in = match &response.expires_in {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
        .ok_or_else(|| {
            AuthError::InvalidResponse(format!("bad expires_in: {}", response.expires_in))
        })?;

        Ok(AccessToken {
            token: response.access_token,
            expires_at: Utc::now() + Duration::seconds(expires_in),
        })
    }
}

/// Borrows the Azure CLI's logged-in session.
pub struct AzureCliAuthorizer {
    resource: String,
}

impl AzureCliAuthorizer {
    pub fn new(resource: &str) -> Self {
        Self {
            resource: resource.to_string(),
        }
    }
}

#[async_trait]
impl Authorizer for AzureCliAuthorizer {
    async fn token(&self) -> Result<AccessToken, AuthError> {
        let output = Command::new("az")
            .args([
                "account",
                "get-access-token",
                "--resource",
                &self.resource,
                "--output",
                "json",
            ])
            .output()
            .await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AuthError::Cli(stderr.trim().to_string()));
        }
        parse_cli_token(&output.stdout)
    }
}

#[derive(Debug, Deserialize)]
struct CliToken {
    #[serde(rename = "accessToken")]
    access_token: String,
    /// Unix seconds; only printed by newer CLI versions.
    #[serde(default)]
    expires_on: Option<i64>,
    /// Local wall-clock time, e.g. `2024-03-01 10:00:00.000000`.
    #[serde(rename = "expiresOn", default)]
    expires_on_local: Option<String>,
}

/// Parses the JSON printed by `az account get-access-token`.
pub fn parse_cli_token(stdout: &[u8]) -> Result<AccessToken, AuthError> {
    let token: CliToken = serde_json::from_slice(stdout)?;
    let expires_at = match (token.expires_on, token.expires_on_local.as_deref()) {
        (Some(timestamp), _) => DateTime::from_timestamp(timestamp, 0),
        (None, Some(local)) => NaiveDateTime::parse_from_str(local, "%Y-%m-%d %H:%M:%S%.f")
            .ok()
            .and_then(|naive| naive.and_local_timezone(Local).earliest())
            .map(|local| local.with_timezone(&Utc)),
        (None, None) => None,
    }
    .ok_or_else(|| AuthError::InvalidResponse("missing or invalid token expiry".to_string()))?;

    Ok(AccessToken {
        token: token.access_token,
        expires_at,
    })
}
