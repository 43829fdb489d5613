//! Repository seam between domain logic and the hosted database.
//!
//! The original system talked to the database through a process-global
//! client handle; here the store is an injected dependency whose lifecycle
//! is owned by the process entry point. Domain crates only ever see this
//! trait — the Postgres implementation lives in `mh-db`, the in-memory one
//! in `mh-testkit`.
//!
//! # Atomicity contract
//!
//! Every mutating method is individually atomic, and the check-then-act
//! sequences of the original are collapsed into conditional writes that
//! report whether they applied:
//!
//! - [`Store::try_decrement_stock`] only decrements when enough stock
//!   remains (`quantity >= n` guard).
//! - [`Store::claim_delivery`] only claims a `ready`, unassigned order for a
//!   driver with no other active delivery.
//! - [`Store::set_status_if`] is a compare-and-swap on the current status.
//! - [`Store::set_feedback_if_absent`] only writes an empty rating slot.
//!
//! Callers MUST branch on the returned `bool` instead of pre-reading state;
//! a `false` means a concurrent writer won.

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use mh_schemas::{
    Cart, CartItem, FeedbackSide, Meal, MealFilter, MealPatch, NewMeal, NewOrder, NewOrderItem,
    Order, OrderItem, OrderStatus, OrderStatusEvent, Restaurant, RestaurantFilter,
};

#[async_trait]
pub trait Store: Send + Sync {
    // -----------------------------------------------------------------------
    // Restaurants and the staff roster
    // -----------------------------------------------------------------------

    async fn restaurant(&self, id: Uuid) -> Result<Option<Restaurant>>;

    async fn list_restaurants(&self, filter: &RestaurantFilter) -> Result<Vec<Restaurant>>;

    /// Roster membership check backing every staff-gated transition.
    async fn is_staff(&self, user_id: Uuid, restaurant_id: Uuid) -> Result<bool>;

    /// The restaurant a staff user belongs to, if any (owner order feed).
    async fn staff_restaurant(&self, user_id: Uuid) -> Result<Option<Uuid>>;

    // -----------------------------------------------------------------------
    // Meals
    // -----------------------------------------------------------------------

    async fn meal(&self, id: Uuid) -> Result<Option<Meal>>;

    /// Filtered + paginated meal listing for one restaurant. Dietary
    /// post-filters are applied by the caller, not here.
    async fn meals_for_restaurant(
        &self,
        restaurant_id: Uuid,
        filter: &MealFilter,
    ) -> Result<Vec<Meal>>;

    /// Publish a new meal on the restaurant's menu.
    async fn insert_meal(&self, restaurant_id: Uuid, new: &NewMeal) -> Result<Meal>;

    /// Partial update scoped to the owning restaurant. `None` when the meal
    /// does not exist or belongs to a different restaurant.
    async fn update_meal(
        &self,
        restaurant_id: Uuid,
        meal_id: Uuid,
        patch: &MealPatch,
    ) -> Result<Option<Meal>>;

    /// Returns `false` when the meal is absent or not the restaurant's.
    async fn delete_meal(&self, restaurant_id: Uuid, meal_id: Uuid) -> Result<bool>;

    /// Atomically decrement surplus stock. Returns `false` (and changes
    /// nothing) when the meal has no stock row or fewer than `qty` left.
    async fn try_decrement_stock(&self, meal_id: Uuid, qty: i64) -> Result<bool>;

    /// Add stock back (checkout compensation, customer cancellation).
    async fn restore_stock(&self, meal_id: Uuid, qty: i64) -> Result<()>;

    // -----------------------------------------------------------------------
    // Carts
    // -----------------------------------------------------------------------

    async fn cart_for_user(&self, user_id: Uuid) -> Result<Option<Cart>>;

    async fn create_cart(&self, user_id: Uuid) -> Result<Cart>;

    /// Cart items joined with their current meal rows (read-time pricing).
    async fn cart_items_with_meals(&self, cart_id: Uuid) -> Result<Vec<(CartItem, Meal)>>;

    async fn cart_item_for_meal(&self, cart_id: Uuid, meal_id: Uuid)
        -> Result<Option<CartItem>>;

    /// Lookup scoped to the cart so one user cannot touch another's items.
    async fn cart_item(&self, cart_id: Uuid, item_id: Uuid) -> Result<Option<CartItem>>;

    async fn insert_cart_item(&self, cart_id: Uuid, meal_id: Uuid, qty: i64) -> Result<CartItem>;

    /// Absolute quantity replacement (PATCH semantics).
    async fn set_cart_item_qty(&self, item_id: Uuid, qty: i64) -> Result<()>;

    /// Idempotent: deleting an absent item is a no-op.
    async fn delete_cart_item(&self, cart_id: Uuid, item_id: Uuid) -> Result<()>;

    /// Idempotent: clearing an empty cart is a no-op.
    async fn clear_cart(&self, cart_id: Uuid) -> Result<()>;

    // -----------------------------------------------------------------------
    // Orders
    // -----------------------------------------------------------------------

    /// Insert a new order in `pending` status.
    async fn insert_order(&self, new: &NewOrder) -> Result<Order>;

    async fn order(&self, id: Uuid) -> Result<Option<Order>>;

    /// Customer's orders, newest first.
    async fn orders_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<Order>>;

    /// Restaurant orders restricted to the given statuses, newest first.
    async fn orders_for_restaurant_in(
        &self,
        restaurant_id: Uuid,
        statuses: &[OrderStatus],
    ) -> Result<Vec<Order>>;

    /// `status = ready`, unassigned orders with their restaurant rows
    /// (coordinates feed the distance enrichment).
    async fn ready_unassigned_orders(&self) -> Result<Vec<(Order, Restaurant)>>;

    async fn insert_order_items(
        &self,
        order_id: Uuid,
        items: &[NewOrderItem],
    ) -> Result<Vec<OrderItem>>;

    async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>>;

    async fn order_items_with_meals(&self, order_id: Uuid) -> Result<Vec<(OrderItem, Meal)>>;

    /// Compare-and-swap the status. Returns `false` when the order is absent
    /// or its status no longer equals `expected`.
    async fn set_status_if(
        &self,
        order_id: Uuid,
        expected: OrderStatus,
        target: OrderStatus,
    ) -> Result<bool>;

    /// Atomic delivery claim: binds the driver and moves `ready -> assigned`
    /// only when the order is still `ready`, unassigned, and the driver holds
    /// no other order in `{assigned, out_for_delivery}`. The busy-driver
    /// check is part of the same conditional write, not a separate read.
    async fn claim_delivery(&self, order_id: Uuid, driver_id: Uuid) -> Result<bool>;

    /// Orders the driver currently holds in `{assigned, out_for_delivery}`.
    async fn active_delivery_count(&self, driver_id: Uuid) -> Result<i64>;

    /// One-shot rating write: applies only when the side's rating is still
    /// null. Rating and comment land in a single update.
    async fn set_feedback_if_absent(
        &self,
        order_id: Uuid,
        side: FeedbackSide,
        rating: i32,
        comment: Option<&str>,
    ) -> Result<bool>;

    async fn insert_status_event(&self, order_id: Uuid, status: OrderStatus) -> Result<()>;

    /// Audit timeline, oldest first.
    async fn status_events(&self, order_id: Uuid) -> Result<Vec<OrderStatusEvent>>;
}
