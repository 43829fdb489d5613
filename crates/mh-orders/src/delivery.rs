//! Delivery assignment and the driver-side order flow.
//!
//! Assignment is a single atomic claim: whichever driver's conditional write
//! lands first gets the order, everyone else gets a conflict. A driver holds
//! at most one active delivery at a time. The delivered transition is gated
//! on the handoff code generated at checkout.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use mh_geo::{Destination, DistanceProvider, Origin, RoadEstimate};
use mh_schemas::status::Actor;
use mh_schemas::{Order, OrderStatus};
use mh_store::Store;

use crate::{OrderError, Result};

const METERS_PER_MILE: f64 = 1609.34;

/// One claimable order in the driver feed, enriched with a road estimate
/// from the driver's position to the restaurant.
#[derive(Debug, Clone, Serialize)]
pub struct ReadyOrder {
    pub order_id: Uuid,
    pub restaurant_id: Uuid,
    pub restaurant_name: String,
    pub restaurant_address: Option<String>,
    pub delivery_address: Option<String>,
    pub total_cents: i64,
    pub distance_meters: Option<f64>,
    pub duration_seconds: Option<f64>,
    pub distance_miles: Option<f64>,
    pub duration_minutes: Option<f64>,
    /// False when the matrix reported no road route (or the lookup degraded).
    pub reachable_by_road: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AcceptedDelivery {
    pub order_id: Uuid,
    pub status: OrderStatus,
    /// Handed to the driver once, at acceptance.
    pub delivery_code: Option<String>,
}

/// All `ready`, unassigned orders, distance-enriched when the driver shared
/// a position. A provider failure degrades every estimate to unknown; the
/// feed itself never fails because the mapping service is down.
pub async fn ready_orders(
    store: &dyn Store,
    distance: &dyn DistanceProvider,
    driver_position: Option<Origin>,
) -> Result<Vec<ReadyOrder>> {
    let rows = store.ready_unassigned_orders().await?;

    let estimates: HashMap<Uuid, RoadEstimate> = match driver_position {
        Some(origin) => {
            let destinations: Vec<Destination> = rows
                .iter()
                .filter_map(|(_, r)| match (r.latitude, r.longitude) {
                    (Some(latitude), Some(longitude)) => Some(Destination {
                        id: r.id,
                        latitude,
                        longitude,
                    }),
                    _ => None,
                })
                .collect();

            match distance.estimates(origin, &destinations).await {
                Ok(map) => map,
                Err(err) => {
                    warn!(error = %err, "distance lookup failed, serving feed without estimates");
                    HashMap::new()
                }
            }
        }
        None => HashMap::new(),
    };

    Ok(rows
        .into_iter()
        .map(|(order, restaurant)| {
            let est = estimates
                .get(&restaurant.id)
                .copied()
                .unwrap_or_default();
            ReadyOrder {
                order_id: order.id,
                restaurant_id: restaurant.id,
                restaurant_name: restaurant.name,
                restaurant_address: restaurant.address,
                delivery_address: order.delivery_address,
                total_cents: order.total_cents,
                distance_miles: est.distance_meters.map(|m| round3(m / METERS_PER_MILE)),
                duration_minutes: est.duration_seconds.map(|s| round1(s / 60.0)),
                reachable_by_road: est.distance_meters.is_some(),
                distance_meters: est.distance_meters,
                duration_seconds: est.duration_seconds,
            }
        })
        .collect())
}

/// Claim an order for delivery. The claim is one conditional write carrying
/// every guard, including "this driver holds no other active delivery"; the
/// reads below only shape the error message for the loser.
pub async fn accept_delivery(
    store: &dyn Store,
    driver_id: Uuid,
    order_id: Uuid,
) -> Result<AcceptedDelivery> {
    let order = store
        .order(order_id)
        .await?
        .ok_or(OrderError::NotFound("order"))?;

    let claimed = store.claim_delivery(order_id, driver_id).await?;
    if !claimed {
        // Distinguish "someone beat you to it" from "you are busy" from
        // "not claimable at all".
        let now = store
            .order(order_id)
            .await?
            .ok_or(OrderError::NotFound("order"))?;
        if now.delivery_user_id.is_some() {
            return Err(OrderError::Conflict("order already assigned".to_string()));
        }
        if store.active_delivery_count(driver_id).await? > 0 {
            return Err(OrderError::Conflict(
                "finish your current delivery first".to_string(),
            ));
        }
        return Err(OrderError::InvalidState(
            "order is not ready for delivery".to_string(),
        ));
    }
    store
        .insert_status_event(order_id, OrderStatus::Assigned)
        .await?;
    info!(%order_id, %driver_id, "delivery claimed");

    Ok(AcceptedDelivery {
        order_id,
        status: OrderStatus::Assigned,
        delivery_code: order.delivery_code,
    })
}

/// Driver-side status update (`out_for_delivery`, `delivered`). The delivered
/// edge additionally demands the handoff code the customer holds.
pub async fn update_delivery_status(
    store: &dyn Store,
    driver_id: Uuid,
    order_id: Uuid,
    target_raw: &str,
    code: Option<&str>,
) -> Result<Order> {
    let target = OrderStatus::parse(target_raw)
        .map_err(|_| OrderError::InvalidInput(format!("invalid status: {target_raw}")))?;

    let order = store
        .order(order_id)
        .await?
        .ok_or(OrderError::NotFound("order"))?;
    if order.delivery_user_id != Some(driver_id) {
        return Err(OrderError::Forbidden("not your delivery"));
    }
    if !order.status.can_transition(target, Actor::Driver) {
        return Err(OrderError::InvalidTransition {
            from: order.status,
            to: target,
        });
    }

    if target == OrderStatus::Delivered {
        let presented = code
            .filter(|c| !c.is_empty())
            .ok_or_else(|| OrderError::InvalidInput("delivery code required".to_string()))?;
        // Exact match only. The code is handed out verbatim; anything else,
        // including a case variant, is a wrong code.
        if order.delivery_code.as_deref() != Some(presented) {
            return Err(OrderError::InvalidCode);
        }
    }

    let applied = store.set_status_if(order_id, order.status, target).await?;
    if !applied {
        return Err(OrderError::Conflict(
            "order changed status concurrently".to_string(),
        ));
    }
    store.insert_status_event(order_id, target).await?;
    info!(%order_id, from = %order.status, to = %target, "delivery status update");

    store
        .order(order_id)
        .await?
        .ok_or(OrderError::NotFound("order"))
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
