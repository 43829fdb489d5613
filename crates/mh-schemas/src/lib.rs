//! Typed records for every entity the marketplace persists.
//!
//! The hosted database hands back rows; these structs are the only shape the
//! rest of the workspace sees. Required vs. optional fields are explicit so
//! handlers never propagate untyped maps.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod status;

pub use status::OrderStatus;

// ---------------------------------------------------------------------------
// Restaurant / staff roster
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Roster entry binding a user to a restaurant as staff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffEntry {
    pub restaurant_id: Uuid,
    pub user_id: Uuid,
}

// ---------------------------------------------------------------------------
// Meal
// ---------------------------------------------------------------------------

/// A menu entry. `quantity` is surplus stock: `None` (or zero) means the meal
/// is a standard unlimited-stock item priced at `base_price_cents`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meal {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    pub tags: Vec<String>,
    pub base_price_cents: i64,
    pub surplus_price_cents: Option<i64>,
    /// Remaining surplus stock. Mutated by checkout (decrement) and customer
    /// cancellation (restore). Never observed negative.
    pub quantity: Option<i64>,
    pub allergens: Vec<String>,
    pub calories: Option<i32>,
    pub image_link: Option<String>,
}

impl Meal {
    /// Surplus stock with the original truthiness semantics: `None` and
    /// `Some(0)` both mean "no surplus", i.e. the meal sells at base tier.
    pub fn surplus_stock(&self) -> Option<i64> {
        match self.quantity {
            Some(q) if q > 0 => Some(q),
            _ => None,
        }
    }

    /// True when the meal currently sells at the discounted surplus tier.
    pub fn is_surplus(&self) -> bool {
        self.surplus_price_cents.is_some() && self.surplus_stock().is_some()
    }

    /// Unit price a cart shows right now: surplus price when set, else base.
    pub fn display_price_cents(&self) -> i64 {
        self.surplus_price_cents.unwrap_or(self.base_price_cents)
    }
}

/// Fields staff supply when publishing a meal. The restaurant comes from the
/// caller's roster membership, never from the payload.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMeal {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub base_price_cents: i64,
    #[serde(default)]
    pub surplus_price_cents: Option<i64>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub allergens: Vec<String>,
    #[serde(default)]
    pub calories: Option<i32>,
    #[serde(default)]
    pub image_link: Option<String>,
}

/// Partial meal update: only `Some` fields are written. Absent fields keep
/// their current value; there is no way to null a field through a patch.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MealPatch {
    pub name: Option<String>,
    pub tags: Option<Vec<String>>,
    pub base_price_cents: Option<i64>,
    pub surplus_price_cents: Option<i64>,
    pub quantity: Option<i64>,
    pub allergens: Option<Vec<String>>,
    pub calories: Option<i32>,
    pub image_link: Option<String>,
}

impl MealPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.tags.is_none()
            && self.base_price_cents.is_none()
            && self.surplus_price_cents.is_none()
            && self.quantity.is_none()
            && self.allergens.is_none()
            && self.calories.is_none()
            && self.image_link.is_none()
    }
}

// ---------------------------------------------------------------------------
// Cart
// ---------------------------------------------------------------------------

/// One cart per user, created lazily on first access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
}

/// Unique per (cart_id, meal_id); add-to-cart merges quantities instead of
/// duplicating rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub meal_id: Uuid,
    pub qty: i64,
}

// ---------------------------------------------------------------------------
// Order
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub restaurant_id: Uuid,
    pub status: OrderStatus,
    pub total_cents: i64,
    pub delivery_user_id: Option<Uuid>,
    /// Short handoff code the driver must present to mark the order
    /// delivered. Generated at order creation; never logged.
    pub delivery_code: Option<String>,
    pub delivery_address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub delivery_fee_cents: Option<i64>,
    pub tip_cents: Option<i64>,
    pub tax_cents: Option<i64>,
    pub restaurant_rating: Option<i32>,
    pub restaurant_comment: Option<String>,
    pub driver_rating: Option<i32>,
    pub driver_comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields the caller supplies when inserting a fresh order row.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Uuid,
    pub restaurant_id: Uuid,
    pub total_cents: i64,
    pub delivery_code: String,
    pub delivery_address: Option<String>,
}

/// A line frozen at checkout. `price_cents` is the line price (unit × qty) at
/// order time, immune to later menu edits. `surplus` records whether the line
/// was priced at the surplus tier and therefore decremented stock, so
/// cancellation restores exactly what checkout took.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub meal_id: Uuid,
    pub qty: i64,
    pub price_cents: i64,
    pub surplus: bool,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub meal_id: Uuid,
    pub qty: i64,
    pub price_cents: i64,
    pub surplus: bool,
}

/// Append-only audit row; one per transition including the initial `pending`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusEvent {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Feedback
// ---------------------------------------------------------------------------

/// The two independent one-shot rating slots an order carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackSide {
    Restaurant,
    Driver,
}

impl FeedbackSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackSide::Restaurant => "restaurant",
            FeedbackSide::Driver => "driver",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "restaurant" => Ok(FeedbackSide::Restaurant),
            "driver" => Ok(FeedbackSide::Driver),
            other => Err(anyhow!("invalid feedback side: {}", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog query shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Listing filter for `GET /restaurants`.
#[derive(Debug, Clone)]
pub struct RestaurantFilter {
    /// Case-insensitive name substring.
    pub search: Option<String>,
    pub sort: SortOrder,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MealSortKey {
    Name,
    SurplusPrice,
}

/// Listing filter for `GET /restaurants/{id}/meals`. Dietary filtering is
/// applied after the query, in the catalog service.
#[derive(Debug, Clone)]
pub struct MealFilter {
    pub surplus_only: bool,
    pub search: Option<String>,
    pub sort_key: MealSortKey,
    pub sort: SortOrder,
    pub limit: i64,
    pub offset: i64,
}
