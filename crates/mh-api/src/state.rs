//! Shared state handed to every Axum handler.
//!
//! All three collaborators are trait objects so the scenario tests can run
//! the full router against the in-memory store and static providers.

use std::sync::Arc;

use serde::Serialize;

use mh_geo::DistanceProvider;
use mh_identity::IdentityProvider;
use mh_store::Store;

/// Static build metadata included in the health response.
#[derive(Clone, Debug, Serialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

/// Cloneable (Arc) handle shared across all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub identity: Arc<dyn IdentityProvider>,
    pub distance: Arc<dyn DistanceProvider>,
    pub build: BuildInfo,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        identity: Arc<dyn IdentityProvider>,
        distance: Arc<dyn DistanceProvider>,
    ) -> Self {
        Self {
            store,
            identity,
            distance,
            build: BuildInfo {
                service: "mh-api",
                version: env!("CARGO_PKG_VERSION"),
            },
        }
    }
}
