//! Deterministic fakes for unit and scenario tests.
//!
//! [`MemStore`] implements the full [`mh_store::Store`] contract over plain
//! vectors behind one mutex, so every conditional write really is atomic.
//! No network I/O, no randomness beyond fresh UUIDs.

pub mod mem_store;
pub mod providers;

pub use mem_store::MemStore;
pub use providers::{StaticDistanceProvider, StaticIdentityProvider};

use uuid::Uuid;

use mh_schemas::{Meal, Restaurant};

/// Restaurant fixture at a fixed downtown coordinate.
pub fn restaurant_fixture(name: &str) -> Restaurant {
    Restaurant {
        id: Uuid::new_v4(),
        name: name.to_string(),
        address: Some("1 Market St".to_string()),
        latitude: Some(39.95),
        longitude: Some(-75.16),
    }
}

/// Surplus-tier meal: discounted price and limited stock.
pub fn surplus_meal_fixture(
    restaurant_id: Uuid,
    name: &str,
    base_cents: i64,
    surplus_cents: i64,
    stock: i64,
) -> Meal {
    Meal {
        id: Uuid::new_v4(),
        restaurant_id,
        name: name.to_string(),
        tags: vec![],
        base_price_cents: base_cents,
        surplus_price_cents: Some(surplus_cents),
        quantity: Some(stock),
        allergens: vec![],
        calories: None,
        image_link: None,
    }
}

/// Standard menu item: base price only, unlimited stock.
pub fn base_meal_fixture(restaurant_id: Uuid, name: &str, base_cents: i64) -> Meal {
    Meal {
        id: Uuid::new_v4(),
        restaurant_id,
        name: name.to_string(),
        tags: vec![],
        base_price_cents: base_cents,
        surplus_price_cents: None,
        quantity: None,
        allergens: vec![],
        calories: None,
        image_link: None,
    }
}
