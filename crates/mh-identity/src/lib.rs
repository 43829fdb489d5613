//! Bearer-token resolution against the external identity provider.
//!
//! Authentication is fully delegated: this service never verifies token
//! signatures locally. A token is valid iff the provider's user-info
//! endpoint accepts it and returns a user id. Authorization on top of that
//! is row-ownership checks in the domain services.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

/// The authenticated caller, as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
}

/// Outcome of presenting a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenCheck {
    Valid(AuthUser),
    /// The provider rejected the token (expired, revoked, malformed).
    Rejected,
}

#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a bearer token to a user. `Err` means the provider itself was
    /// unreachable, not that the token is bad.
    async fn check_token(&self, token: &str) -> Result<TokenCheck>;
}

// ---------------------------------------------------------------------------
// Remote user-info implementation
// ---------------------------------------------------------------------------

/// Calls `GET {base}/auth/v1/user` with the caller's token plus the service
/// api key, the provider's standard user-info exchange. Tokens are never
/// logged.
#[derive(Debug, Clone)]
pub struct RemoteIdentityProvider {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl RemoteIdentityProvider {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build identity http client")?;
        Ok(Self {
            base_url,
            api_key,
            http,
        })
    }

    fn userinfo_url(&self) -> String {
        format!("{}/auth/v1/user", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone, Deserialize)]
struct UserInfoResponse {
    id: Option<Uuid>,
    email: Option<String>,
}

#[async_trait::async_trait]
impl IdentityProvider for RemoteIdentityProvider {
    async fn check_token(&self, token: &str) -> Result<TokenCheck> {
        let resp = self
            .http
            .get(self.userinfo_url())
            .bearer_auth(token)
            .header("apikey", self.api_key.as_str())
            .send()
            .await
            .context("identity user-info request failed")?;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED
            || resp.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Ok(TokenCheck::Rejected);
        }

        let resp = resp
            .error_for_status()
            .context("identity user-info returned error status")?;
        let info: UserInfoResponse = resp
            .json()
            .await
            .context("identity user-info decode failed")?;

        match info.id {
            Some(id) => Ok(TokenCheck::Valid(AuthUser {
                id,
                email: info.email,
            })),
            // A 200 with no id is a provider contract break; treat the token
            // as unusable rather than trusting it.
            None => Ok(TokenCheck::Rejected),
        }
    }
}
