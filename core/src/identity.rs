//! Resolves a change event's caller to the name written in `Created-by`.

use std::sync::Arc;

use crate::api::DirectoryApi;
use crate::model::{APP_ID_CLAIM, Claims, NAME_CLAIM, UNKNOWN_IDENTITY};

/// Kind of principal behind a change event, derived from its claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal<'a> {
    /// A human user; the caller reference is already readable.
    User,
    /// A service principal identified by its application id.
    Application(&'a str),
    Unknown,
}

impl<'a> Principal<'a> {
    /// A `name` claim wins over `appid`. Only presence is checked: an empty
    /// `name` claim still marks the caller as a user.
    pub fn from_claims(claims: &'a Claims) -> Self {
        if claims.contains_key(NAME_CLAIM) {
            Principal::User
        } else if let Some(app_id) = claims.get(APP_ID_CLAIM) {
            Principal::Application(app_id)
        } else {
            Principal::Unknown
        }
    }
}

pub struct IdentityResolver {
    directory: Arc<dyn DirectoryApi>,
}

impl IdentityResolver {
    pub fn new(directory: Arc<dyn DirectoryApi>) -> Self {
        Self { directory }
    }

    /// Never fails: a directory error falls back to the raw application id.
    pub async fn resolve(&self, caller: &str, claims: &Claims) -> String {
        match Principal::from_claims(claims) {
            Principal::User => caller.to_string(),
            Principal::Application(app_id) => match self.directory.display_name(app_id).await {
                Ok(name) => name,
                Err(e) => {
                    tracing::warn!("Directory lookup failed for application {app_id}: {e}");
                    app_id.to_string()
                }
            },
            Principal::Unknown => UNKNOWN_IDENTITY.to_string(),
        }
    }
}
