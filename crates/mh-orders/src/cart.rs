//! Cart staging: a per-user scratch area with read-time pricing.
//!
//! Totals are computed on every read from the current meal rows, never
//! persisted, so a price edit between cart-add and checkout shows up
//! automatically. Add is additive (merge into the existing row); the PATCH
//! update is an absolute replacement. That asymmetry is deliberate.

use serde::Serialize;
use uuid::Uuid;

use mh_schemas::{Cart, CartItem, Meal};
use mh_store::Store;

use crate::{OrderError, Result};

/// Hard ceiling on any single line's quantity. Orders never legitimately get
/// near this, and it keeps every `price * qty` product far from i64 overflow.
pub const MAX_ITEM_QTY: i64 = 1_000;

#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub item_id: Uuid,
    pub meal_id: Uuid,
    pub meal_name: String,
    pub restaurant_id: Uuid,
    pub qty: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
    /// Remaining surplus stock for the meal right now (0 for base items).
    pub surplus_left: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub cart_id: Uuid,
    pub items: Vec<CartLine>,
    pub cart_total_cents: i64,
}

/// Exactly one cart per user, created lazily on first touch.
pub async fn get_or_create_cart(store: &dyn Store, user_id: Uuid) -> Result<Cart> {
    if let Some(cart) = store.cart_for_user(user_id).await? {
        return Ok(cart);
    }
    Ok(store.create_cart(user_id).await?)
}

/// Join cart items with their current meals and price at read time.
pub async fn cart_view(store: &dyn Store, cart_id: Uuid) -> Result<CartView> {
    let rows = store.cart_items_with_meals(cart_id).await?;

    let mut items = Vec::with_capacity(rows.len());
    let mut total = 0i64;
    for (item, meal) in rows {
        let unit = meal.display_price_cents();
        let line = unit
            .checked_mul(item.qty)
            .ok_or_else(|| OrderError::InvalidInput("cart total too large".to_string()))?;
        total = total
            .checked_add(line)
            .ok_or_else(|| OrderError::InvalidInput("cart total too large".to_string()))?;
        items.push(CartLine {
            item_id: item.id,
            meal_id: meal.id,
            meal_name: meal.name.clone(),
            restaurant_id: meal.restaurant_id,
            qty: item.qty,
            unit_price_cents: unit,
            line_total_cents: line,
            surplus_left: meal.quantity.unwrap_or(0),
        });
    }

    Ok(CartView {
        cart_id,
        items,
        cart_total_cents: total,
    })
}

pub async fn my_cart(store: &dyn Store, user_id: Uuid) -> Result<CartView> {
    let cart = get_or_create_cart(store, user_id).await?;
    cart_view(store, cart.id).await
}

/// Additive add: merges into any existing row for the same meal. Capacity is
/// checked against the combined quantity, and only for meals with surplus
/// stock; base items are never capacity-limited.
pub async fn add_item(
    store: &dyn Store,
    user_id: Uuid,
    meal_id: Uuid,
    add_qty: i64,
) -> Result<CartView> {
    check_qty(add_qty)?;

    let cart = get_or_create_cart(store, user_id).await?;
    let meal = store
        .meal(meal_id)
        .await?
        .ok_or(OrderError::NotFound("meal"))?;

    let existing = store.cart_item_for_meal(cart.id, meal_id).await?;
    let current_qty = existing.as_ref().map(|i| i.qty).unwrap_or(0);
    let new_qty = current_qty + add_qty;

    check_qty(new_qty)?;
    check_capacity(&meal, new_qty)?;

    match existing {
        Some(item) => store.set_cart_item_qty(item.id, new_qty).await?,
        None => {
            store.insert_cart_item(cart.id, meal_id, add_qty).await?;
        }
    }

    cart_view(store, cart.id).await
}

/// Absolute replacement of the item's quantity (not additive).
pub async fn update_item_qty(
    store: &dyn Store,
    user_id: Uuid,
    item_id: Uuid,
    qty: i64,
) -> Result<CartView> {
    check_qty(qty)?;

    let cart = get_or_create_cart(store, user_id).await?;
    let item: CartItem = store
        .cart_item(cart.id, item_id)
        .await?
        .ok_or(OrderError::NotFound("item"))?;
    let meal = store
        .meal(item.meal_id)
        .await?
        .ok_or(OrderError::NotFound("meal"))?;

    check_capacity(&meal, qty)?;

    store.set_cart_item_qty(item_id, qty).await?;
    cart_view(store, cart.id).await
}

/// Idempotent: removing an item that is not there is a no-op.
pub async fn remove_item(store: &dyn Store, user_id: Uuid, item_id: Uuid) -> Result<CartView> {
    let cart = get_or_create_cart(store, user_id).await?;
    store.delete_cart_item(cart.id, item_id).await?;
    cart_view(store, cart.id).await
}

/// Idempotent: clearing an empty cart is a no-op.
pub async fn clear_cart(store: &dyn Store, user_id: Uuid) -> Result<CartView> {
    let cart = get_or_create_cart(store, user_id).await?;
    store.clear_cart(cart.id).await?;
    cart_view(store, cart.id).await
}

/// Quantity gate shared by the cart mutations and checkout planning.
pub(crate) fn check_qty(qty: i64) -> Result<()> {
    if qty <= 0 {
        return Err(OrderError::InvalidInput("positive qty required".to_string()));
    }
    if qty > MAX_ITEM_QTY {
        return Err(OrderError::InvalidInput(format!(
            "qty must be at most {MAX_ITEM_QTY}"
        )));
    }
    Ok(())
}

/// Capacity gate: only meals with live surplus stock are limited.
fn check_capacity(meal: &Meal, wanted_qty: i64) -> Result<()> {
    if let Some(stock) = meal.surplus_stock() {
        if wanted_qty > stock {
            return Err(OrderError::CapacityExceeded { available: stock });
        }
    }
    Ok(())
}
