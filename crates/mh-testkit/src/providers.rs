//! Static identity and distance providers for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use uuid::Uuid;

use mh_geo::{Destination, DistanceProvider, Origin, RoadEstimate};
use mh_identity::{AuthUser, IdentityProvider, TokenCheck};

/// Token -> user map. Unknown tokens are rejected, mirroring the remote
/// provider's 401 path.
#[derive(Default)]
pub struct StaticIdentityProvider {
    users: Mutex<HashMap<String, AuthUser>>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token and return the user id it resolves to.
    pub fn register(&self, token: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.users.lock().unwrap().insert(
            token.to_string(),
            AuthUser {
                id,
                email: Some(format!("{token}@example.test")),
            },
        );
        id
    }
}

#[async_trait::async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn check_token(&self, token: &str) -> Result<TokenCheck> {
        Ok(match self.users.lock().unwrap().get(token) {
            Some(u) => TokenCheck::Valid(u.clone()),
            None => TokenCheck::Rejected,
        })
    }
}

/// Returns a fixed estimate for every destination, with optional per-id
/// overrides. `None` overrides simulate unreachable destinations.
#[derive(Default)]
pub struct StaticDistanceProvider {
    pub default: RoadEstimate,
    pub overrides: HashMap<Uuid, RoadEstimate>,
}

impl StaticDistanceProvider {
    pub fn constant(distance_meters: f64, duration_seconds: f64) -> Self {
        Self {
            default: RoadEstimate {
                distance_meters: Some(distance_meters),
                duration_seconds: Some(duration_seconds),
            },
            overrides: HashMap::new(),
        }
    }
}

#[async_trait::async_trait]
impl DistanceProvider for StaticDistanceProvider {
    async fn estimates(
        &self,
        _origin: Origin,
        destinations: &[Destination],
    ) -> Result<HashMap<Uuid, RoadEstimate>> {
        Ok(destinations
            .iter()
            .map(|d| (d.id, *self.overrides.get(&d.id).unwrap_or(&self.default)))
            .collect())
    }
}
