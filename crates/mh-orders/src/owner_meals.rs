//! Staff-side menu management: publish meals, edit them, restock surplus,
//! retire them. This is the only path through which stock ever increases
//! outside of a cancellation; every operation is gated on roster membership
//! and scoped to the caller's own restaurant.

use tracing::info;
use uuid::Uuid;

use mh_schemas::{Meal, MealFilter, MealPatch, MealSortKey, NewMeal, SortOrder};
use mh_store::Store;

use crate::{OrderError, Result};

/// The restaurant the caller manages, or `Forbidden`.
async fn own_restaurant(store: &dyn Store, user_id: Uuid) -> Result<Uuid> {
    store
        .staff_restaurant(user_id)
        .await?
        .ok_or(OrderError::Forbidden("not allowed"))
}

fn validate_prices(
    base_price_cents: Option<i64>,
    surplus_price_cents: Option<i64>,
    quantity: Option<i64>,
) -> Result<()> {
    if base_price_cents.is_some_and(|p| p < 0) || surplus_price_cents.is_some_and(|p| p < 0) {
        return Err(OrderError::InvalidInput(
            "prices must not be negative".to_string(),
        ));
    }
    if quantity.is_some_and(|q| q < 0) {
        return Err(OrderError::InvalidInput(
            "quantity must not be negative".to_string(),
        ));
    }
    Ok(())
}

/// The full menu of the caller's restaurant, sold out items included.
pub async fn my_meals(store: &dyn Store, user_id: Uuid) -> Result<Vec<Meal>> {
    let restaurant_id = own_restaurant(store, user_id).await?;
    let filter = MealFilter {
        surplus_only: false,
        search: None,
        sort_key: MealSortKey::Name,
        sort: SortOrder::Asc,
        limit: 100,
        offset: 0,
    };
    Ok(store.meals_for_restaurant(restaurant_id, &filter).await?)
}

pub async fn create_meal(store: &dyn Store, user_id: Uuid, new: NewMeal) -> Result<Meal> {
    let restaurant_id = own_restaurant(store, user_id).await?;

    if new.name.trim().is_empty() {
        return Err(OrderError::InvalidInput("meal name required".to_string()));
    }
    validate_prices(
        Some(new.base_price_cents),
        new.surplus_price_cents,
        new.quantity,
    )?;

    let meal = store.insert_meal(restaurant_id, &new).await?;
    info!(meal_id = %meal.id, %restaurant_id, "meal published");
    Ok(meal)
}

/// Partial edit. Restocking is just a patch with `quantity` set; the scoped
/// conditional update in the store keeps one restaurant's staff from ever
/// touching another's menu.
pub async fn update_meal(
    store: &dyn Store,
    user_id: Uuid,
    meal_id: Uuid,
    patch: MealPatch,
) -> Result<Meal> {
    let restaurant_id = own_restaurant(store, user_id).await?;

    if patch.is_empty() {
        return Err(OrderError::InvalidInput("no fields to update".to_string()));
    }
    if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(OrderError::InvalidInput("meal name required".to_string()));
    }
    validate_prices(patch.base_price_cents, patch.surplus_price_cents, patch.quantity)?;

    let meal = store
        .update_meal(restaurant_id, meal_id, &patch)
        .await?
        .ok_or(OrderError::NotFound("meal"))?;
    info!(meal_id = %meal.id, %restaurant_id, "meal updated");
    Ok(meal)
}

pub async fn delete_meal(store: &dyn Store, user_id: Uuid, meal_id: Uuid) -> Result<()> {
    let restaurant_id = own_restaurant(store, user_id).await?;
    if !store.delete_meal(restaurant_id, meal_id).await? {
        return Err(OrderError::NotFound("meal"));
    }
    info!(%meal_id, %restaurant_id, "meal deleted");
    Ok(())
}
