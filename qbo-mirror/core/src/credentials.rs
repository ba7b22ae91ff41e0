//! Access to the bearer token and tenant of the accounting API.
//!
//! Acquiring and refreshing tokens happens outside of this crate, the engine only
//! asks a [`CredentialProvider`] for the current pair before every request.

use async_trait::async_trait;
use std::fmt;

use crate::error::{Error, Result};

/// A bearer token and the realm (company) it is scoped to
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: String,
    pub realm_id: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"***")
            .field("realm_id", &self.realm_id)
            .finish()
    }
}

/// Source of currently valid credentials
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn credentials(&self) -> Result<Credentials>;
}

/// Credentials refreshed externally and handed to the process, e.g. through
/// the `CURR_AUTH_TOKEN` and `REALM_ID` environment variables
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    credentials: Credentials,
}

impl StaticCredentials {
    pub fn new(access_token: impl Into<String>, realm_id: impl Into<String>) -> Self {
        Self {
            credentials: Credentials {
                access_token: access_token.into(),
                realm_id: realm_id.into(),
            },
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn credentials(&self) -> Result<Credentials> {
        if self.credentials.access_token.trim().is_empty() {
            return Err(Error::Credential("access token is empty".to_string()));
        }

        if self.credentials.realm_id.trim().is_empty() {
            return Err(Error::Credential("realm id is empty".to_string()));
        }

        Ok(self.credentials.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_credentials() {
        let provider = StaticCredentials::new("eyJlbmMiOiJBMTI4", "9130355");
        let credentials = provider.credentials().await.unwrap();

        assert_eq!(credentials.realm_id, "9130355");
        assert!(!format!("{credentials:?}").contains("eyJlbmMiOiJBMTI4"));
    }

    #[tokio::test]
    async fn test_empty_token_is_a_credential_error() {
        let provider = StaticCredentials::new("", "9130355");
        let err = provider.credentials().await.unwrap_err();

        assert!(matches!(err, Error::Credential(_)));
    }

    #[tokio::test]
    async fn test_empty_realm_is_a_credential_error() {
        let provider = StaticCredentials::new("token", " ");
        let err = provider.credentials().await.unwrap_err();

        assert!(matches!(err, Error::Credential(_)));
    }
}
