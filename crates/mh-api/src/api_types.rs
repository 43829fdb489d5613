//! Request and query shapes for the HTTP surface. Response bodies reuse the
//! domain view types directly; only the health envelope is defined here.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::BuildInfo;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

impl HealthResponse {
    pub fn from_build(build: &BuildInfo) -> Self {
        Self {
            ok: true,
            service: build.service,
            version: build.version,
        }
    }
}

// ---------------------------------------------------------------------------
// Cart / checkout
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct AddCartItemRequest {
    pub meal_id: Uuid,
    pub qty: i64,
}

#[derive(Debug, Deserialize)]
pub struct QtyQuery {
    pub qty: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct CheckoutRequest {
    pub delivery_address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrderItemRequest {
    pub meal_id: Uuid,
    pub qty: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub restaurant_id: Uuid,
    pub items: Vec<OrderItemRequest>,
    pub delivery_address: Option<String>,
}

// ---------------------------------------------------------------------------
// Orders / delivery / feedback
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct MyOrdersQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

#[derive(Debug, Deserialize)]
pub struct DeliveryStatusRequest {
    pub status: String,
    /// Required for the delivered transition.
    pub code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReadyQuery {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub rating: i32,
    pub comment: Option<String>,
}

// ---------------------------------------------------------------------------
// Catalog queries
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct RestaurantsQuery {
    pub search: Option<String>,
    /// "asc" (default) or "desc".
    pub sort: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct MealsQuery {
    #[serde(default)]
    pub surplus_only: bool,
    pub search: Option<String>,
    /// "name" (default) or "surplus_price".
    pub sort_by: Option<String>,
    pub sort: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    #[serde(default)]
    pub vegetarian: bool,
    #[serde(default)]
    pub vegan: bool,
    #[serde(default)]
    pub gluten_free: bool,
    pub exclude_allergens: Option<String>,
}

pub(crate) fn default_limit() -> i64 {
    50
}
