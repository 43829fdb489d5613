//! Road distance/duration lookups against a directions-matrix service.
//!
//! One request covers a single source and up to
//! [`MAX_DESTINATIONS_PER_REQUEST`] destinations, so larger destination sets
//! are split into chunks issued concurrently. A failed chunk degrades its
//! destinations to "no estimate" instead of failing the whole lookup; the
//! ready-orders feed must keep working when the mapping service hiccups.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::future::join_all;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

/// Mapbox caps driving-matrix requests at 25 coordinates; one slot is the
/// source, leaving 24 destinations per call.
pub const MAX_DESTINATIONS_PER_REQUEST: usize = 24;

#[derive(Debug, Clone, Copy)]
pub struct Origin {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct Destination {
    /// Caller-side key (here: restaurant id) the estimate is reported under.
    pub id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
}

/// Road estimate from the origin to one destination. Both fields are `None`
/// when the destination was unreachable or its chunk failed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RoadEstimate {
    pub distance_meters: Option<f64>,
    pub duration_seconds: Option<f64>,
}

/// Pluggable distance-matrix interface.
#[async_trait::async_trait]
pub trait DistanceProvider: Send + Sync {
    /// Estimates for every destination, keyed by destination id. Entries may
    /// be missing or empty when lookups degrade; callers treat absence as
    /// "unknown", never as an error.
    async fn estimates(
        &self,
        origin: Origin,
        destinations: &[Destination],
    ) -> Result<HashMap<Uuid, RoadEstimate>>;
}

// ---------------------------------------------------------------------------
// Mapbox implementation
// ---------------------------------------------------------------------------

/// Mapbox Directions Matrix (driving profile).
///
/// The access token is read by the caller and passed in; do not log it.
#[derive(Debug, Clone)]
pub struct MapboxMatrixProvider {
    access_token: String,
    http: reqwest::Client,
    base_url: String,
}

impl MapboxMatrixProvider {
    pub fn new(access_token: String, timeout: Duration) -> Result<Self> {
        Self::new_with_base_url(access_token, timeout, "https://api.mapbox.com".to_string())
    }

    pub fn new_with_base_url(
        access_token: String,
        timeout: Duration,
        base_url: String,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build mapbox http client")?;
        Ok(Self {
            access_token,
            http,
            base_url,
        })
    }

    fn matrix_url(&self, origin: Origin, chunk: &[Destination]) -> String {
        format!(
            "{}/directions-matrix/v1/mapbox/driving/{}",
            self.base_url.trim_end_matches('/'),
            coordinates_path(origin, chunk)
        )
    }

    async fn fetch_chunk(
        &self,
        origin: Origin,
        chunk: &[Destination],
    ) -> Result<MatrixResponse> {
        let url = self.matrix_url(origin, chunk);
        let destinations = destination_indexes(chunk.len());

        let resp = self
            .http
            .get(url)
            .query(&[
                ("access_token", self.access_token.as_str()),
                ("sources", "0"),
                ("destinations", destinations.as_str()),
                ("annotations", "distance,duration"),
            ])
            .send()
            .await
            .context("matrix request failed")?
            .error_for_status()
            .context("matrix request returned error status")?;

        resp.json::<MatrixResponse>()
            .await
            .context("matrix response decode failed")
    }
}

#[async_trait::async_trait]
impl DistanceProvider for MapboxMatrixProvider {
    async fn estimates(
        &self,
        origin: Origin,
        destinations: &[Destination],
    ) -> Result<HashMap<Uuid, RoadEstimate>> {
        if destinations.is_empty() {
            return Ok(HashMap::new());
        }

        let chunks: Vec<&[Destination]> =
            destinations.chunks(MAX_DESTINATIONS_PER_REQUEST).collect();

        let results = join_all(chunks.iter().map(|c| self.fetch_chunk(origin, c))).await;

        let mut out = HashMap::new();
        for (chunk, result) in chunks.iter().zip(results) {
            match result {
                Ok(resp) => apply_chunk_response(&mut out, chunk, &resp),
                Err(err) => {
                    // Degrade this chunk only; its destinations stay unknown.
                    warn!(error = %err, destinations = chunk.len(), "matrix chunk failed");
                    for d in *chunk {
                        out.insert(d.id, RoadEstimate::default());
                    }
                }
            }
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Wire shapes and pure assembly helpers
// ---------------------------------------------------------------------------

/// Matrix body: row 0 holds source-to-destination values; unreachable pairs
/// come back as nulls.
#[derive(Debug, Clone, Deserialize)]
struct MatrixResponse {
    distances: Option<Vec<Vec<Option<f64>>>>,
    durations: Option<Vec<Vec<Option<f64>>>>,
}

/// `lng,lat;lng,lat;…` — source first, then every destination.
fn coordinates_path(origin: Origin, chunk: &[Destination]) -> String {
    let mut parts = Vec::with_capacity(chunk.len() + 1);
    parts.push(format!("{},{}", origin.longitude, origin.latitude));
    for d in chunk {
        parts.push(format!("{},{}", d.longitude, d.latitude));
    }
    parts.join(";")
}

/// `1;2;…;n` — destination coordinate indexes (0 is the source).
fn destination_indexes(n: usize) -> String {
    (1..=n)
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(";")
}

fn apply_chunk_response(
    out: &mut HashMap<Uuid, RoadEstimate>,
    chunk: &[Destination],
    resp: &MatrixResponse,
) {
    let empty: Vec<Option<f64>> = Vec::new();
    let distances = resp
        .distances
        .as_ref()
        .and_then(|m| m.first())
        .unwrap_or(&empty);
    let durations = resp
        .durations
        .as_ref()
        .and_then(|m| m.first())
        .unwrap_or(&empty);

    for (i, d) in chunk.iter().enumerate() {
        out.insert(
            d.id,
            RoadEstimate {
                distance_meters: distances.get(i).copied().flatten(),
                duration_seconds: durations.get(i).copied().flatten(),
            },
        );
    }
}

// -----------------
// Tests (no network)
// -----------------
