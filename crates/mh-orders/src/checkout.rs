//! Checkout: turns a cart (or a direct item payload) into a pending order.
//!
//! Planning is pure and side-effect free; execution runs the decrement /
//! insert / clear sequence and compensates already-applied decrements when a
//! later step loses a race. Prices are frozen into order items at this point,
//! so later menu edits never change what the customer owes.

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use mh_schemas::{Meal, NewOrder, NewOrderItem, Order, OrderStatus};
use mh_store::Store;

use crate::{cart, OrderError, Result};

/// One priced line of a checkout plan.
#[derive(Debug, Clone)]
pub struct PlannedLine {
    pub meal_id: Uuid,
    pub qty: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
    /// Priced at the surplus tier; stock will be decremented for this line.
    pub surplus: bool,
}

#[derive(Debug, Clone)]
pub struct CheckoutPlan {
    pub restaurant_id: Uuid,
    pub lines: Vec<PlannedLine>,
    pub total_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReceipt {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub total_cents: i64,
    pub delivery_code: String,
}

/// Price the given (meal, qty) pairs and pin the single restaurant.
///
/// The stock pre-check here is advisory; the authoritative check is the
/// conditional decrement during execution. It exists so an obviously
/// oversubscribed cart fails before any stock is touched.
pub fn plan_checkout(items: &[(Meal, i64)]) -> Result<CheckoutPlan> {
    if items.is_empty() {
        return Err(OrderError::EmptyCart);
    }

    let restaurant_id = items[0].0.restaurant_id;
    if items.iter().any(|(m, _)| m.restaurant_id != restaurant_id) {
        return Err(OrderError::MultiRestaurantCart);
    }

    let mut lines = Vec::with_capacity(items.len());
    let mut total = 0i64;
    for (meal, qty) in items {
        cart::check_qty(*qty)?;
        let surplus = meal.is_surplus();
        if surplus {
            // is_surplus() guarantees surplus_stock() is Some here.
            let stock = meal.surplus_stock().unwrap_or(0);
            if stock < *qty {
                return Err(OrderError::InsufficientStock { meal_id: meal.id });
            }
        }
        let unit = if surplus {
            meal.surplus_price_cents.unwrap_or(meal.base_price_cents)
        } else {
            meal.base_price_cents
        };
        let line_total = unit
            .checked_mul(*qty)
            .ok_or_else(|| OrderError::InvalidInput("order total too large".to_string()))?;
        total = total
            .checked_add(line_total)
            .ok_or_else(|| OrderError::InvalidInput("order total too large".to_string()))?;
        lines.push(PlannedLine {
            meal_id: meal.id,
            qty: *qty,
            unit_price_cents: unit,
            line_total_cents: line_total,
            surplus,
        });
    }

    Ok(CheckoutPlan {
        restaurant_id,
        lines,
        total_cents: total,
    })
}

/// Handoff code shown to the customer and demanded from the driver. Derived
/// from a fresh v4 uuid, 6 uppercase hex chars.
pub fn generate_delivery_code() -> String {
    Uuid::new_v4().simple().to_string()[..6].to_uppercase()
}

/// Run a plan: decrement surplus stock line by line, insert the order and its
/// frozen items, record the initial `pending` event. Any failure after a
/// decrement restores every decrement already applied.
async fn execute_plan(
    store: &dyn Store,
    user_id: Uuid,
    plan: CheckoutPlan,
    delivery_address: Option<String>,
) -> Result<Order> {
    let mut decremented: Vec<(Uuid, i64)> = Vec::new();

    for line in plan.lines.iter().filter(|l| l.surplus) {
        let applied = store.try_decrement_stock(line.meal_id, line.qty).await?;
        if !applied {
            restore_all(store, &decremented).await;
            return Err(OrderError::InsufficientStock {
                meal_id: line.meal_id,
            });
        }
        decremented.push((line.meal_id, line.qty));
    }

    let new = NewOrder {
        user_id,
        restaurant_id: plan.restaurant_id,
        total_cents: plan.total_cents,
        delivery_code: generate_delivery_code(),
        delivery_address,
    };

    let order = match store.insert_order(&new).await {
        Ok(order) => order,
        Err(e) => {
            restore_all(store, &decremented).await;
            return Err(e.into());
        }
    };

    let items: Vec<NewOrderItem> = plan
        .lines
        .iter()
        .map(|l| NewOrderItem {
            meal_id: l.meal_id,
            qty: l.qty,
            price_cents: l.line_total_cents,
            surplus: l.surplus,
        })
        .collect();

    if let Err(e) = store.insert_order_items(order.id, &items).await {
        restore_all(store, &decremented).await;
        return Err(e.into());
    }
    store.insert_status_event(order.id, OrderStatus::Pending).await?;

    info!(order_id = %order.id, total_cents = order.total_cents, "order created");
    Ok(order)
}

async fn restore_all(store: &dyn Store, decremented: &[(Uuid, i64)]) {
    for (meal_id, qty) in decremented {
        if let Err(e) = store.restore_stock(*meal_id, *qty).await {
            warn!(%meal_id, qty, error = %e, "stock restore failed during checkout rollback");
        }
    }
}

/// Checkout the user's persisted cart. The cart is cleared only after the
/// order exists.
pub async fn checkout_cart(
    store: &dyn Store,
    user_id: Uuid,
    delivery_address: Option<String>,
) -> Result<CheckoutReceipt> {
    let user_cart = cart::get_or_create_cart(store, user_id).await?;
    let rows = store.cart_items_with_meals(user_cart.id).await?;
    let items: Vec<(Meal, i64)> = rows.into_iter().map(|(i, m)| (m, i.qty)).collect();

    let plan = plan_checkout(&items)?;
    let order = execute_plan(store, user_id, plan, delivery_address).await?;
    store.clear_cart(user_cart.id).await?;

    Ok(receipt(order))
}

/// Direct order creation that bypasses the cart. The restaurant is derived
/// from the meals themselves; a payload restaurant id that disagrees is a
/// client bug, not a conflict.
pub async fn create_order_direct(
    store: &dyn Store,
    user_id: Uuid,
    restaurant_id: Uuid,
    item_qtys: &[(Uuid, i64)],
    delivery_address: Option<String>,
) -> Result<CheckoutReceipt> {
    if item_qtys.is_empty() {
        return Err(OrderError::EmptyCart);
    }

    let mut items = Vec::with_capacity(item_qtys.len());
    for (meal_id, qty) in item_qtys {
        let meal = store
            .meal(*meal_id)
            .await?
            .ok_or(OrderError::NotFound("meal"))?;
        items.push((meal, *qty));
    }

    let plan = plan_checkout(&items)?;
    if plan.restaurant_id != restaurant_id {
        return Err(OrderError::InvalidInput(
            "restaurant_id does not match the meals ordered".to_string(),
        ));
    }

    let order = execute_plan(store, user_id, plan, delivery_address).await?;
    Ok(receipt(order))
}

fn receipt(order: Order) -> CheckoutReceipt {
    CheckoutReceipt {
        order_id: order.id,
        status: order.status,
        total_cents: order.total_cents,
        // insert_order always stores the code it was given.
        delivery_code: order.delivery_code.unwrap_or_default(),
    }
}
