//! In-memory [`Store`] implementation.
//!
//! All state lives under a single `Mutex`, which makes every method atomic
//! by construction — the same guarantee the Postgres store gets from
//! conditional single-statement writes. The lock is never held across an
//! await point.

use std::sync::Mutex;

use anyhow::Result;
use chrono::Utc;
use uuid::Uuid;

use mh_schemas::{
    Cart, CartItem, FeedbackSide, Meal, MealFilter, MealPatch, MealSortKey, NewMeal, NewOrder,
    NewOrderItem, Order, OrderItem, OrderStatus, OrderStatusEvent, Restaurant, RestaurantFilter,
    SortOrder, StaffEntry,
};
use mh_store::Store;

#[derive(Default)]
struct Inner {
    restaurants: Vec<Restaurant>,
    staff: Vec<StaffEntry>,
    meals: Vec<Meal>,
    carts: Vec<Cart>,
    cart_items: Vec<CartItem>,
    orders: Vec<Order>,
    order_items: Vec<OrderItem>,
    events: Vec<OrderStatusEvent>,
}

#[derive(Default)]
pub struct MemStore {
    inner: Mutex<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Seeding helpers for tests; not part of the Store contract.

    pub fn add_restaurant(&self, r: Restaurant) {
        self.inner.lock().unwrap().restaurants.push(r);
    }

    pub fn add_meal(&self, m: Meal) {
        self.inner.lock().unwrap().meals.push(m);
    }

    pub fn add_staff(&self, restaurant_id: Uuid, user_id: Uuid) {
        self.inner.lock().unwrap().staff.push(StaffEntry {
            restaurant_id,
            user_id,
        });
    }

    /// Current stock of a meal, for assertions.
    pub fn stock_of(&self, meal_id: Uuid) -> Option<i64> {
        self.inner
            .lock()
            .unwrap()
            .meals
            .iter()
            .find(|m| m.id == meal_id)
            .and_then(|m| m.quantity)
    }
}

#[async_trait::async_trait]
impl Store for MemStore {
    async fn restaurant(&self, id: Uuid) -> Result<Option<Restaurant>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.restaurants.iter().find(|r| r.id == id).cloned())
    }

    async fn list_restaurants(&self, filter: &RestaurantFilter) -> Result<Vec<Restaurant>> {
        let inner = self.inner.lock().unwrap();
        let needle = filter.search.as_deref().map(str::to_lowercase);
        let mut rows: Vec<Restaurant> = inner
            .restaurants
            .iter()
            .filter(|r| match &needle {
                Some(n) => r.name.to_lowercase().contains(n),
                None => true,
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        if filter.sort == SortOrder::Desc {
            rows.reverse();
        }
        Ok(rows
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect())
    }

    async fn is_staff(&self, user_id: Uuid, restaurant_id: Uuid) -> Result<bool> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .staff
            .iter()
            .any(|s| s.user_id == user_id && s.restaurant_id == restaurant_id))
    }

    async fn staff_restaurant(&self, user_id: Uuid) -> Result<Option<Uuid>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .staff
            .iter()
            .find(|s| s.user_id == user_id)
            .map(|s| s.restaurant_id))
    }

    async fn meal(&self, id: Uuid) -> Result<Option<Meal>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.meals.iter().find(|m| m.id == id).cloned())
    }

    async fn meals_for_restaurant(
        &self,
        restaurant_id: Uuid,
        filter: &MealFilter,
    ) -> Result<Vec<Meal>> {
        let inner = self.inner.lock().unwrap();
        let needle = filter.search.as_deref().map(str::to_lowercase);
        let mut rows: Vec<Meal> = inner
            .meals
            .iter()
            .filter(|m| m.restaurant_id == restaurant_id)
            .filter(|m| !filter.surplus_only || m.quantity.unwrap_or(0) > 0)
            .filter(|m| match &needle {
                Some(n) => m.name.to_lowercase().contains(n),
                None => true,
            })
            .cloned()
            .collect();
        match filter.sort_key {
            MealSortKey::Name => rows.sort_by(|a, b| a.name.cmp(&b.name)),
            MealSortKey::SurplusPrice => rows.sort_by_key(|m| {
                // Unpriced surplus sorts last, like SQL NULLS LAST.
                m.surplus_price_cents.unwrap_or(i64::MAX)
            }),
        }
        if filter.sort == SortOrder::Desc {
            rows.reverse();
        }
        Ok(rows
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect())
    }

    async fn insert_meal(&self, restaurant_id: Uuid, new: &NewMeal) -> Result<Meal> {
        let mut inner = self.inner.lock().unwrap();
        let meal = Meal {
            id: Uuid::new_v4(),
            restaurant_id,
            name: new.name.clone(),
            tags: new.tags.clone(),
            base_price_cents: new.base_price_cents,
            surplus_price_cents: new.surplus_price_cents,
            quantity: new.quantity,
            allergens: new.allergens.clone(),
            calories: new.calories,
            image_link: new.image_link.clone(),
        };
        inner.meals.push(meal.clone());
        Ok(meal)
    }

    async fn update_meal(
        &self,
        restaurant_id: Uuid,
        meal_id: Uuid,
        patch: &MealPatch,
    ) -> Result<Option<Meal>> {
        let mut inner = self.inner.lock().unwrap();
        let Some(meal) = inner
            .meals
            .iter_mut()
            .find(|m| m.id == meal_id && m.restaurant_id == restaurant_id)
        else {
            return Ok(None);
        };
        if let Some(name) = &patch.name {
            meal.name = name.clone();
        }
        if let Some(tags) = &patch.tags {
            meal.tags = tags.clone();
        }
        if let Some(base) = patch.base_price_cents {
            meal.base_price_cents = base;
        }
        if let Some(surplus) = patch.surplus_price_cents {
            meal.surplus_price_cents = Some(surplus);
        }
        if let Some(quantity) = patch.quantity {
            meal.quantity = Some(quantity);
        }
        if let Some(allergens) = &patch.allergens {
            meal.allergens = allergens.clone();
        }
        if let Some(calories) = patch.calories {
            meal.calories = Some(calories);
        }
        if let Some(link) = &patch.image_link {
            meal.image_link = Some(link.clone());
        }
        Ok(Some(meal.clone()))
    }

    async fn delete_meal(&self, restaurant_id: Uuid, meal_id: Uuid) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.meals.len();
        inner
            .meals
            .retain(|m| !(m.id == meal_id && m.restaurant_id == restaurant_id));
        Ok(inner.meals.len() < before)
    }

    async fn try_decrement_stock(&self, meal_id: Uuid, qty: i64) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        let Some(meal) = inner.meals.iter_mut().find(|m| m.id == meal_id) else {
            return Ok(false);
        };
        match meal.quantity {
            Some(q) if q >= qty => {
                meal.quantity = Some(q - qty);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn restore_stock(&self, meal_id: Uuid, qty: i64) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(meal) = inner.meals.iter_mut().find(|m| m.id == meal_id) {
            meal.quantity = Some(meal.quantity.unwrap_or(0) + qty);
        }
        Ok(())
    }

    async fn cart_for_user(&self, user_id: Uuid) -> Result<Option<Cart>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.carts.iter().find(|c| c.user_id == user_id).cloned())
    }

    async fn create_cart(&self, user_id: Uuid) -> Result<Cart> {
        let mut inner = self.inner.lock().unwrap();
        // Lazy-create stays idempotent even when racing callers both miss.
        if let Some(existing) = inner.carts.iter().find(|c| c.user_id == user_id) {
            return Ok(existing.clone());
        }
        let cart = Cart {
            id: Uuid::new_v4(),
            user_id,
        };
        inner.carts.push(cart.clone());
        Ok(cart)
    }

    async fn cart_items_with_meals(&self, cart_id: Uuid) -> Result<Vec<(CartItem, Meal)>> {
        let inner = self.inner.lock().unwrap();
        let mut out = Vec::new();
        for item in inner.cart_items.iter().filter(|i| i.cart_id == cart_id) {
            if let Some(meal) = inner.meals.iter().find(|m| m.id == item.meal_id) {
                out.push((item.clone(), meal.clone()));
            }
        }
        Ok(out)
    }

    async fn cart_item_for_meal(
        &self,
        cart_id: Uuid,
        meal_id: Uuid,
    ) -> Result<Option<CartItem>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .cart_items
            .iter()
            .find(|i| i.cart_id == cart_id && i.meal_id == meal_id)
            .cloned())
    }

    async fn cart_item(&self, cart_id: Uuid, item_id: Uuid) -> Result<Option<CartItem>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .cart_items
            .iter()
            .find(|i| i.cart_id == cart_id && i.id == item_id)
            .cloned())
    }

    async fn insert_cart_item(
        &self,
        cart_id: Uuid,
        meal_id: Uuid,
        qty: i64,
    ) -> Result<CartItem> {
        let mut inner = self.inner.lock().unwrap();
        let item = CartItem {
            id: Uuid::new_v4(),
            cart_id,
            meal_id,
            qty,
        };
        inner.cart_items.push(item.clone());
        Ok(item)
    }

    async fn set_cart_item_qty(&self, item_id: Uuid, qty: i64) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(item) = inner.cart_items.iter_mut().find(|i| i.id == item_id) {
            item.qty = qty;
        }
        Ok(())
    }

    async fn delete_cart_item(&self, cart_id: Uuid, item_id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .cart_items
            .retain(|i| !(i.cart_id == cart_id && i.id == item_id));
        Ok(())
    }

    async fn clear_cart(&self, cart_id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.cart_items.retain(|i| i.cart_id != cart_id);
        Ok(())
    }

    async fn insert_order(&self, new: &NewOrder) -> Result<Order> {
        let mut inner = self.inner.lock().unwrap();
        let order = Order {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            restaurant_id: new.restaurant_id,
            status: OrderStatus::Pending,
            total_cents: new.total_cents,
            delivery_user_id: None,
            delivery_code: Some(new.delivery_code.clone()),
            delivery_address: new.delivery_address.clone(),
            latitude: None,
            longitude: None,
            delivery_fee_cents: None,
            tip_cents: None,
            tax_cents: None,
            restaurant_rating: None,
            restaurant_comment: None,
            driver_rating: None,
            driver_comment: None,
            created_at: Utc::now(),
        };
        inner.orders.push(order.clone());
        Ok(order)
    }

    async fn order(&self, id: Uuid) -> Result<Option<Order>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn orders_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<Order>> {
        let inner = self.inner.lock().unwrap();
        // Insertion index breaks created_at ties so "newest first" holds even
        // for orders created within the same clock tick.
        let mut rows: Vec<(usize, Order)> = inner
            .orders
            .iter()
            .enumerate()
            .filter(|(_, o)| o.user_id == user_id)
            .map(|(i, o)| (i, o.clone()))
            .collect();
        rows.sort_by(|(ai, a), (bi, b)| b.created_at.cmp(&a.created_at).then(bi.cmp(ai)));
        rows.truncate(limit.max(0) as usize);
        Ok(rows.into_iter().map(|(_, o)| o).collect())
    }

    async fn orders_for_restaurant_in(
        &self,
        restaurant_id: Uuid,
        statuses: &[OrderStatus],
    ) -> Result<Vec<Order>> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<Order> = inner
            .orders
            .iter()
            .filter(|o| o.restaurant_id == restaurant_id && statuses.contains(&o.status))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn ready_unassigned_orders(&self) -> Result<Vec<(Order, Restaurant)>> {
        let inner = self.inner.lock().unwrap();
        let mut out = Vec::new();
        for order in inner
            .orders
            .iter()
            .filter(|o| o.status == OrderStatus::Ready && o.delivery_user_id.is_none())
        {
            if let Some(r) = inner
                .restaurants
                .iter()
                .find(|r| r.id == order.restaurant_id)
            {
                out.push((order.clone(), r.clone()));
            }
        }
        Ok(out)
    }

    async fn insert_order_items(
        &self,
        order_id: Uuid,
        items: &[NewOrderItem],
    ) -> Result<Vec<OrderItem>> {
        let mut inner = self.inner.lock().unwrap();
        let mut out = Vec::with_capacity(items.len());
        for it in items {
            let row = OrderItem {
                id: Uuid::new_v4(),
                order_id,
                meal_id: it.meal_id,
                qty: it.qty,
                price_cents: it.price_cents,
                surplus: it.surplus,
            };
            inner.order_items.push(row.clone());
            out.push(row);
        }
        Ok(out)
    }

    async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .order_items
            .iter()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn order_items_with_meals(&self, order_id: Uuid) -> Result<Vec<(OrderItem, Meal)>> {
        let inner = self.inner.lock().unwrap();
        let mut out = Vec::new();
        for item in inner.order_items.iter().filter(|i| i.order_id == order_id) {
            if let Some(meal) = inner.meals.iter().find(|m| m.id == item.meal_id) {
                out.push((item.clone(), meal.clone()));
            }
        }
        Ok(out)
    }

    async fn set_status_if(
        &self,
        order_id: Uuid,
        expected: OrderStatus,
        target: OrderStatus,
    ) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        let Some(order) = inner.orders.iter_mut().find(|o| o.id == order_id) else {
            return Ok(false);
        };
        if order.status != expected {
            return Ok(false);
        }
        order.status = target;
        Ok(true)
    }

    async fn claim_delivery(&self, order_id: Uuid, driver_id: Uuid) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        // Busy-driver guard under the same lock as the claim itself.
        if inner
            .orders
            .iter()
            .any(|o| o.delivery_user_id == Some(driver_id) && o.status.is_active_delivery())
        {
            return Ok(false);
        }
        let Some(order) = inner.orders.iter_mut().find(|o| o.id == order_id) else {
            return Ok(false);
        };
        if order.status != OrderStatus::Ready || order.delivery_user_id.is_some() {
            return Ok(false);
        }
        order.delivery_user_id = Some(driver_id);
        order.status = OrderStatus::Assigned;
        Ok(true)
    }

    async fn active_delivery_count(&self, driver_id: Uuid) -> Result<i64> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .orders
            .iter()
            .filter(|o| o.delivery_user_id == Some(driver_id) && o.status.is_active_delivery())
            .count() as i64)
    }

    async fn set_feedback_if_absent(
        &self,
        order_id: Uuid,
        side: FeedbackSide,
        rating: i32,
        comment: Option<&str>,
    ) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        let Some(order) = inner.orders.iter_mut().find(|o| o.id == order_id) else {
            return Ok(false);
        };
        match side {
            FeedbackSide::Restaurant => {
                if order.restaurant_rating.is_some() {
                    return Ok(false);
                }
                order.restaurant_rating = Some(rating);
                order.restaurant_comment = comment.map(str::to_string);
            }
            FeedbackSide::Driver => {
                if order.driver_rating.is_some() {
                    return Ok(false);
                }
                order.driver_rating = Some(rating);
                order.driver_comment = comment.map(str::to_string);
            }
        }
        Ok(true)
    }

    async fn insert_status_event(&self, order_id: Uuid, status: OrderStatus) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.events.push(OrderStatusEvent {
            order_id,
            status,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn status_events(&self, order_id: Uuid) -> Result<Vec<OrderStatusEvent>> {
        let inner = self.inner.lock().unwrap();
        // Insertion order doubles as chronological order here.
        Ok(inner
            .events
            .iter()
            .filter(|e| e.order_id == order_id)
            .cloned()
            .collect())
    }
}
