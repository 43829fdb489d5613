//! Order state machine services and read paths.
//!
//! Every transition goes through the same shape: authorize the actor, consult
//! the transition table, compare-and-swap the status, append the audit event.
//! The CAS means two racing writers resolve to exactly one applied
//! transition; the loser sees a conflict, never a double event.

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use mh_schemas::status::Actor;
use mh_schemas::{Order, OrderStatus, OrderStatusEvent};
use mh_store::Store;

use crate::{OrderError, Result};

const MAX_ORDER_PAGE: i64 = 100;

/// One line of an order as shown to the customer or the restaurant feed.
#[derive(Debug, Clone, Serialize)]
pub struct OrderLine {
    pub meal_id: Uuid,
    pub meal_name: String,
    pub qty: i64,
    pub price_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderLine>,
}

/// Load an order or fail with a uniform not-found.
async fn load_order(store: &dyn Store, order_id: Uuid) -> Result<Order> {
    store
        .order(order_id)
        .await?
        .ok_or(OrderError::NotFound("order"))
}

/// Staff-driven transition (accept, preparing, ready, complete, cancel).
///
/// Staff authorization is against the order's restaurant roster, not the
/// order's customer. The CAS is keyed on the status read here, so a
/// concurrent transition surfaces as a conflict rather than a silent
/// double-apply.
pub async fn staff_transition(
    store: &dyn Store,
    staff_user: Uuid,
    order_id: Uuid,
    target: OrderStatus,
) -> Result<Order> {
    let order = load_order(store, order_id).await?;

    if !store.is_staff(staff_user, order.restaurant_id).await? {
        return Err(OrderError::Forbidden("not allowed"));
    }
    if !order.status.can_transition(target, Actor::Staff) {
        return Err(OrderError::InvalidTransition {
            from: order.status,
            to: target,
        });
    }

    let applied = store.set_status_if(order_id, order.status, target).await?;
    if !applied {
        return Err(OrderError::Conflict(
            "order changed status concurrently".to_string(),
        ));
    }
    store.insert_status_event(order_id, target).await?;
    info!(%order_id, from = %order.status, to = %target, "staff transition");

    load_order(store, order_id).await
}

/// Customer cancellation. Allowed only while the order is still `pending`;
/// once the kitchen accepts, only staff can cancel. Restores the surplus
/// stock the order's checkout decremented.
pub async fn cancel_by_customer(
    store: &dyn Store,
    user_id: Uuid,
    order_id: Uuid,
) -> Result<Order> {
    let order = load_order(store, order_id).await?;
    if order.user_id != user_id {
        return Err(OrderError::Forbidden("not your order"));
    }
    if order.status != OrderStatus::Pending {
        return Err(OrderError::InvalidState(
            "order can no longer be cancelled".to_string(),
        ));
    }

    let applied = store
        .set_status_if(order_id, OrderStatus::Pending, OrderStatus::Cancelled)
        .await?;
    if !applied {
        return Err(OrderError::Conflict(
            "order changed status concurrently".to_string(),
        ));
    }
    store
        .insert_status_event(order_id, OrderStatus::Cancelled)
        .await?;

    // Give back exactly what checkout took: surplus lines only.
    for item in store.order_items(order_id).await? {
        if item.surplus {
            store.restore_stock(item.meal_id, item.qty).await?;
        }
    }
    info!(%order_id, "customer cancelled order");

    load_order(store, order_id).await
}

/// Cancellation entry point for the cancel endpoint: staff of the order's
/// restaurant cancel through the staff table, everyone else is treated as
/// the customer.
pub async fn cancel(store: &dyn Store, user_id: Uuid, order_id: Uuid) -> Result<Order> {
    let order = load_order(store, order_id).await?;
    if store.is_staff(user_id, order.restaurant_id).await? {
        staff_transition(store, user_id, order_id, OrderStatus::Cancelled).await
    } else {
        cancel_by_customer(store, user_id, order_id).await
    }
}

/// Full order view, restricted to the customer who placed it.
pub async fn get_order(store: &dyn Store, user_id: Uuid, order_id: Uuid) -> Result<OrderDetail> {
    let order = load_order(store, order_id).await?;
    if order.user_id != user_id {
        return Err(OrderError::Forbidden("not your order"));
    }
    let items = store
        .order_items_with_meals(order_id)
        .await?
        .into_iter()
        .map(|(item, meal)| OrderLine {
            meal_id: item.meal_id,
            meal_name: meal.name,
            qty: item.qty,
            price_cents: item.price_cents,
        })
        .collect();
    Ok(OrderDetail { order, items })
}

/// The customer's order history, newest first, capped at a page.
pub async fn list_my_orders(store: &dyn Store, user_id: Uuid, limit: i64) -> Result<Vec<Order>> {
    let limit = limit.clamp(1, MAX_ORDER_PAGE);
    Ok(store.orders_for_user(user_id, limit).await?)
}

/// Status audit trail, owner only, oldest first.
pub async fn timeline(
    store: &dyn Store,
    user_id: Uuid,
    order_id: Uuid,
) -> Result<Vec<OrderStatusEvent>> {
    let order = load_order(store, order_id).await?;
    if order.user_id != user_id {
        return Err(OrderError::Forbidden("not your order"));
    }
    Ok(store.status_events(order_id).await?)
}

/// Live work queue for the restaurant the staff user belongs to: everything
/// the kitchen still has to act on.
pub async fn owner_feed(store: &dyn Store, staff_user: Uuid) -> Result<Vec<OrderDetail>> {
    let restaurant_id = store
        .staff_restaurant(staff_user)
        .await?
        .ok_or(OrderError::Forbidden("not allowed"))?;

    let open = [
        OrderStatus::Pending,
        OrderStatus::Accepted,
        OrderStatus::Preparing,
        OrderStatus::Ready,
    ];
    let orders = store
        .orders_for_restaurant_in(restaurant_id, &open)
        .await?;

    let mut feed = Vec::with_capacity(orders.len());
    for order in orders {
        let items = store
            .order_items_with_meals(order.id)
            .await?
            .into_iter()
            .map(|(item, meal)| OrderLine {
                meal_id: item.meal_id,
                meal_name: meal.name,
                qty: item.qty,
                price_cents: item.price_cents,
            })
            .collect();
        feed.push(OrderDetail { order, items });
    }
    Ok(feed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cart, checkout};
    use mh_testkit::{restaurant_fixture, surplus_meal_fixture, MemStore};

    struct Fixture {
        store: MemStore,
        customer: Uuid,
        staff: Uuid,
        restaurant_id: Uuid,
        meal_id: Uuid,
        order_id: Uuid,
    }

    async fn place_order() -> Fixture {
        let store = MemStore::new();
        let r = restaurant_fixture("Noodle Bar");
        let restaurant_id = r.id;
        let meal = surplus_meal_fixture(restaurant_id, "pad thai", 1200, 800, 5);
        let meal_id = meal.id;
        store.add_restaurant(r);
        store.add_meal(meal);

        let staff = Uuid::new_v4();
        store.add_staff(restaurant_id, staff);

        let customer = Uuid::new_v4();
        cart::add_item(&store, customer, meal_id, 2).await.unwrap();
        let receipt = checkout::checkout_cart(&store, customer, None).await.unwrap();

        Fixture {
            store,
            customer,
            staff,
            restaurant_id,
            meal_id,
            order_id: receipt.order_id,
        }
    }

    #[tokio::test]
    async fn staff_walks_the_kitchen_path() {
        let f = place_order().await;
        for target in [
            OrderStatus::Accepted,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::Completed,
        ] {
            let order = staff_transition(&f.store, f.staff, f.order_id, target)
                .await
                .unwrap();
            assert_eq!(order.status, target);
        }

        let events = f.store.status_events(f.order_id).await.unwrap();
        let statuses: Vec<OrderStatus> = events.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![
                OrderStatus::Pending,
                OrderStatus::Accepted,
                OrderStatus::Preparing,
                OrderStatus::Ready,
                OrderStatus::Completed,
            ]
        );
    }

    #[tokio::test]
    async fn staff_cannot_skip_states() {
        let f = place_order().await;
        let err = staff_transition(&f.store, f.staff, f.order_id, OrderStatus::Ready)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Ready
            }
        ));
    }

    #[tokio::test]
    async fn non_staff_is_forbidden() {
        let f = place_order().await;
        let err = staff_transition(&f.store, Uuid::new_v4(), f.order_id, OrderStatus::Accepted)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Forbidden(_)));
    }

    #[tokio::test]
    async fn staff_of_another_restaurant_is_forbidden() {
        let f = place_order().await;
        let other = restaurant_fixture("Other Kitchen");
        let outsider = Uuid::new_v4();
        f.store.add_staff(other.id, outsider);
        f.store.add_restaurant(other);

        let err = staff_transition(&f.store, outsider, f.order_id, OrderStatus::Accepted)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Forbidden(_)));
    }

    #[tokio::test]
    async fn customer_cancel_restores_stock() {
        let f = place_order().await;
        assert_eq!(f.store.stock_of(f.meal_id), Some(3));

        let order = cancel_by_customer(&f.store, f.customer, f.order_id)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(f.store.stock_of(f.meal_id), Some(5));
    }

    #[tokio::test]
    async fn customer_cannot_cancel_after_accept() {
        let f = place_order().await;
        staff_transition(&f.store, f.staff, f.order_id, OrderStatus::Accepted)
            .await
            .unwrap();

        let err = cancel_by_customer(&f.store, f.customer, f.order_id)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidState(_)));
        assert_eq!(f.store.stock_of(f.meal_id), Some(3));
    }

    #[tokio::test]
    async fn staff_cancel_after_accept_does_not_restore_stock() {
        // Staff cancellation is an operational decision; the original system
        // only restores stock on the customer path.
        let f = place_order().await;
        staff_transition(&f.store, f.staff, f.order_id, OrderStatus::Accepted)
            .await
            .unwrap();
        let order = staff_transition(&f.store, f.staff, f.order_id, OrderStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(f.store.stock_of(f.meal_id), Some(3));
    }

    #[tokio::test]
    async fn cancel_dispatches_on_the_caller_role() {
        let f = place_order().await;
        staff_transition(&f.store, f.staff, f.order_id, OrderStatus::Accepted)
            .await
            .unwrap();

        // Customer can no longer cancel an accepted order; staff still can.
        let err = cancel(&f.store, f.customer, f.order_id).await.unwrap_err();
        assert!(matches!(err, OrderError::InvalidState(_)));

        let order = cancel(&f.store, f.staff, f.order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn get_order_is_owner_only() {
        let f = place_order().await;
        let detail = get_order(&f.store, f.customer, f.order_id).await.unwrap();
        assert_eq!(detail.items.len(), 1);
        assert_eq!(detail.items[0].meal_name, "pad thai");
        assert_eq!(detail.items[0].price_cents, 1600);

        let err = get_order(&f.store, Uuid::new_v4(), f.order_id)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Forbidden(_)));
    }

    #[tokio::test]
    async fn timeline_is_owner_only_and_ordered() {
        let f = place_order().await;
        staff_transition(&f.store, f.staff, f.order_id, OrderStatus::Accepted)
            .await
            .unwrap();

        let events = timeline(&f.store, f.customer, f.order_id).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].status, OrderStatus::Pending);
        assert_eq!(events[1].status, OrderStatus::Accepted);

        let err = timeline(&f.store, Uuid::new_v4(), f.order_id)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Forbidden(_)));
    }

    #[tokio::test]
    async fn owner_feed_lists_open_orders_only() {
        let f = place_order().await;
        let feed = owner_feed(&f.store, f.staff).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].order.id, f.order_id);
        assert_eq!(feed[0].order.restaurant_id, f.restaurant_id);

        // Completed orders drop out of the feed.
        for target in [
            OrderStatus::Accepted,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::Completed,
        ] {
            staff_transition(&f.store, f.staff, f.order_id, target)
                .await
                .unwrap();
        }
        let feed = owner_feed(&f.store, f.staff).await.unwrap();
        assert!(feed.is_empty());
    }

    #[tokio::test]
    async fn owner_feed_requires_staff_membership() {
        let f = place_order().await;
        let err = owner_feed(&f.store, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, OrderError::Forbidden(_)));
    }

    #[tokio::test]
    async fn my_orders_newest_first() {
        let f = place_order().await;
        cart::add_item(&f.store, f.customer, f.meal_id, 1).await.unwrap();
        let second = checkout::checkout_cart(&f.store, f.customer, None)
            .await
            .unwrap();

        let orders = list_my_orders(&f.store, f.customer, 50).await.unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].id, second.order_id);
    }
}
