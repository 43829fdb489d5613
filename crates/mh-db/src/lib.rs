//! Postgres-backed [`Store`] implementation.
//!
//! Every conditional operation in the trait maps to a single guarded
//! `UPDATE`; the guard lives in the `WHERE` clause and the caller branches on
//! `rows_affected`. No operation here reads state and then writes it back.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use mh_schemas::{
    Cart, CartItem, FeedbackSide, Meal, MealFilter, MealPatch, MealSortKey, NewMeal, NewOrder,
    NewOrderItem, Order, OrderItem, OrderStatus, OrderStatusEvent, Restaurant, RestaurantFilter,
    SortOrder,
};
use mh_store::Store;

/// Connect with a modest pool; the API process is the only client.
pub async fn connect(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")?;
    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn restaurant_from_row(row: &PgRow) -> Result<Restaurant> {
    Ok(Restaurant {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        address: row.try_get("address")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
    })
}

fn meal_from_row(row: &PgRow) -> Result<Meal> {
    Ok(Meal {
        id: row.try_get("id")?,
        restaurant_id: row.try_get("restaurant_id")?,
        name: row.try_get("name")?,
        tags: row.try_get("tags")?,
        base_price_cents: row.try_get("base_price_cents")?,
        surplus_price_cents: row.try_get("surplus_price_cents")?,
        quantity: row.try_get("quantity")?,
        allergens: row.try_get("allergens")?,
        calories: row.try_get("calories")?,
        image_link: row.try_get("image_link")?,
    })
}

fn cart_item_from_row(row: &PgRow) -> Result<CartItem> {
    Ok(CartItem {
        id: row.try_get("id")?,
        cart_id: row.try_get("cart_id")?,
        meal_id: row.try_get("meal_id")?,
        qty: row.try_get("qty")?,
    })
}

fn order_from_row(row: &PgRow) -> Result<Order> {
    Ok(Order {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        restaurant_id: row.try_get("restaurant_id")?,
        status: OrderStatus::parse(&row.try_get::<String, _>("status")?)?,
        total_cents: row.try_get("total_cents")?,
        delivery_user_id: row.try_get("delivery_user_id")?,
        delivery_code: row.try_get("delivery_code")?,
        delivery_address: row.try_get("delivery_address")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        delivery_fee_cents: row.try_get("delivery_fee_cents")?,
        tip_cents: row.try_get("tip_cents")?,
        tax_cents: row.try_get("tax_cents")?,
        restaurant_rating: row.try_get("restaurant_rating")?,
        restaurant_comment: row.try_get("restaurant_comment")?,
        driver_rating: row.try_get("driver_rating")?,
        driver_comment: row.try_get("driver_comment")?,
        created_at: row.try_get("created_at")?,
    })
}

fn order_item_from_row(row: &PgRow) -> Result<OrderItem> {
    Ok(OrderItem {
        id: row.try_get("id")?,
        order_id: row.try_get("order_id")?,
        meal_id: row.try_get("meal_id")?,
        qty: row.try_get("qty")?,
        price_cents: row.try_get("price_cents")?,
        surplus: row.try_get("surplus")?,
    })
}

const ORDER_COLUMNS: &str = "id, user_id, restaurant_id, status, total_cents, delivery_user_id, \
     delivery_code, delivery_address, latitude, longitude, delivery_fee_cents, tip_cents, \
     tax_cents, restaurant_rating, restaurant_comment, driver_rating, driver_comment, created_at";

const MEAL_COLUMNS: &str = "id, restaurant_id, name, tags, base_price_cents, \
     surplus_price_cents, quantity, allergens, calories, image_link";

fn direction(sort: SortOrder) -> &'static str {
    match sort {
        SortOrder::Asc => "asc",
        SortOrder::Desc => "desc",
    }
}

// ---------------------------------------------------------------------------
// Store impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Store for PgStore {
    async fn restaurant(&self, id: Uuid) -> Result<Option<Restaurant>> {
        let row = sqlx::query(
            "select id, name, address, latitude, longitude from restaurants where id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("restaurant lookup failed")?;
        row.as_ref().map(restaurant_from_row).transpose()
    }

    async fn list_restaurants(&self, filter: &RestaurantFilter) -> Result<Vec<Restaurant>> {
        // Direction cannot be bound; it is interpolated from a closed enum.
        let sql = format!(
            "select id, name, address, latitude, longitude from restaurants \
             where ($1::text is null or name ilike $1) \
             order by name {} limit $2 offset $3",
            direction(filter.sort)
        );
        let pattern = filter.search.as_ref().map(|s| format!("%{s}%"));
        let rows = sqlx::query(&sql)
            .bind(pattern)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await
            .context("restaurant listing failed")?;
        rows.iter().map(restaurant_from_row).collect()
    }

    async fn is_staff(&self, user_id: Uuid, restaurant_id: Uuid) -> Result<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            "select exists (select 1 from restaurant_staff \
             where user_id = $1 and restaurant_id = $2)",
        )
        .bind(user_id)
        .bind(restaurant_id)
        .fetch_one(&self.pool)
        .await
        .context("staff roster check failed")?;
        Ok(exists)
    }

    async fn staff_restaurant(&self, user_id: Uuid) -> Result<Option<Uuid>> {
        let row =
            sqlx::query("select restaurant_id from restaurant_staff where user_id = $1 limit 1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .context("staff restaurant lookup failed")?;
        Ok(match row {
            Some(r) => Some(r.try_get("restaurant_id")?),
            None => None,
        })
    }

    async fn meal(&self, id: Uuid) -> Result<Option<Meal>> {
        let row = sqlx::query(&format!("select {MEAL_COLUMNS} from meals where id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("meal lookup failed")?;
        row.as_ref().map(meal_from_row).transpose()
    }

    async fn meals_for_restaurant(
        &self,
        restaurant_id: Uuid,
        filter: &MealFilter,
    ) -> Result<Vec<Meal>> {
        let sort_column = match filter.sort_key {
            MealSortKey::Name => "name",
            MealSortKey::SurplusPrice => "surplus_price_cents",
        };
        let sql = format!(
            "select {MEAL_COLUMNS} from meals \
             where restaurant_id = $1 \
               and ($2::boolean = false or (surplus_price_cents is not null and quantity > 0)) \
               and ($3::text is null or name ilike $3) \
             order by {sort_column} {} nulls last limit $4 offset $5",
            direction(filter.sort)
        );
        let pattern = filter.search.as_ref().map(|s| format!("%{s}%"));
        let rows = sqlx::query(&sql)
            .bind(restaurant_id)
            .bind(filter.surplus_only)
            .bind(pattern)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await
            .context("meal listing failed")?;
        rows.iter().map(meal_from_row).collect()
    }

    async fn insert_meal(&self, restaurant_id: Uuid, new: &NewMeal) -> Result<Meal> {
        let row = sqlx::query(&format!(
            "insert into meals (id, restaurant_id, name, tags, base_price_cents, \
                                surplus_price_cents, quantity, allergens, calories, image_link) \
             values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             returning {MEAL_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(restaurant_id)
        .bind(&new.name)
        .bind(&new.tags)
        .bind(new.base_price_cents)
        .bind(new.surplus_price_cents)
        .bind(new.quantity)
        .bind(&new.allergens)
        .bind(new.calories)
        .bind(&new.image_link)
        .fetch_one(&self.pool)
        .await
        .context("meal insert failed")?;
        meal_from_row(&row)
    }

    async fn update_meal(
        &self,
        restaurant_id: Uuid,
        meal_id: Uuid,
        patch: &MealPatch,
    ) -> Result<Option<Meal>> {
        // Coalesce keeps unpatched columns; a patch cannot null a field.
        let row = sqlx::query(&format!(
            "update meals set \
                 name = coalesce($3, name), \
                 tags = coalesce($4, tags), \
                 base_price_cents = coalesce($5, base_price_cents), \
                 surplus_price_cents = coalesce($6, surplus_price_cents), \
                 quantity = coalesce($7, quantity), \
                 allergens = coalesce($8, allergens), \
                 calories = coalesce($9, calories), \
                 image_link = coalesce($10, image_link) \
             where id = $1 and restaurant_id = $2 \
             returning {MEAL_COLUMNS}"
        ))
        .bind(meal_id)
        .bind(restaurant_id)
        .bind(&patch.name)
        .bind(&patch.tags)
        .bind(patch.base_price_cents)
        .bind(patch.surplus_price_cents)
        .bind(patch.quantity)
        .bind(&patch.allergens)
        .bind(patch.calories)
        .bind(&patch.image_link)
        .fetch_optional(&self.pool)
        .await
        .context("meal update failed")?;
        row.as_ref().map(meal_from_row).transpose()
    }

    async fn delete_meal(&self, restaurant_id: Uuid, meal_id: Uuid) -> Result<bool> {
        let result = sqlx::query("delete from meals where id = $1 and restaurant_id = $2")
            .bind(meal_id)
            .bind(restaurant_id)
            .execute(&self.pool)
            .await
            .context("meal delete failed")?;
        Ok(result.rows_affected() > 0)
    }

    async fn try_decrement_stock(&self, meal_id: Uuid, qty: i64) -> Result<bool> {
        // Null quantity fails the guard, so base-tier meals are untouched.
        let result = sqlx::query(
            "update meals set quantity = quantity - $2 where id = $1 and quantity >= $2",
        )
        .bind(meal_id)
        .bind(qty)
        .execute(&self.pool)
        .await
        .context("stock decrement failed")?;
        Ok(result.rows_affected() > 0)
    }

    async fn restore_stock(&self, meal_id: Uuid, qty: i64) -> Result<()> {
        sqlx::query("update meals set quantity = coalesce(quantity, 0) + $2 where id = $1")
            .bind(meal_id)
            .bind(qty)
            .execute(&self.pool)
            .await
            .context("stock restore failed")?;
        Ok(())
    }

    async fn cart_for_user(&self, user_id: Uuid) -> Result<Option<Cart>> {
        let row = sqlx::query("select id, user_id from carts where user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .context("cart lookup failed")?;
        Ok(match row {
            Some(r) => Some(Cart {
                id: r.try_get("id")?,
                user_id: r.try_get("user_id")?,
            }),
            None => None,
        })
    }

    async fn create_cart(&self, user_id: Uuid) -> Result<Cart> {
        // Racing first-touch requests collapse onto the same row.
        let row = sqlx::query(
            "insert into carts (id, user_id) values ($1, $2) \
             on conflict (user_id) do update set user_id = excluded.user_id \
             returning id, user_id",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .context("cart create failed")?;
        Ok(Cart {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
        })
    }

    async fn cart_items_with_meals(&self, cart_id: Uuid) -> Result<Vec<(CartItem, Meal)>> {
        let rows = sqlx::query(
            "select ci.id, ci.cart_id, ci.meal_id, ci.qty, \
                    m.id as m_id, m.restaurant_id, m.name, m.tags, m.base_price_cents, \
                    m.surplus_price_cents, m.quantity, m.allergens, m.calories, m.image_link \
             from cart_items ci join meals m on m.id = ci.meal_id \
             where ci.cart_id = $1 order by ci.id",
        )
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await
        .context("cart items query failed")?;

        rows.iter()
            .map(|row| {
                let item = cart_item_from_row(row)?;
                let meal = Meal {
                    id: row.try_get("m_id")?,
                    restaurant_id: row.try_get("restaurant_id")?,
                    name: row.try_get("name")?,
                    tags: row.try_get("tags")?,
                    base_price_cents: row.try_get("base_price_cents")?,
                    surplus_price_cents: row.try_get("surplus_price_cents")?,
                    quantity: row.try_get("quantity")?,
                    allergens: row.try_get("allergens")?,
                    calories: row.try_get("calories")?,
                    image_link: row.try_get("image_link")?,
                };
                Ok((item, meal))
            })
            .collect()
    }

    async fn cart_item_for_meal(
        &self,
        cart_id: Uuid,
        meal_id: Uuid,
    ) -> Result<Option<CartItem>> {
        let row = sqlx::query(
            "select id, cart_id, meal_id, qty from cart_items \
             where cart_id = $1 and meal_id = $2",
        )
        .bind(cart_id)
        .bind(meal_id)
        .fetch_optional(&self.pool)
        .await
        .context("cart item lookup failed")?;
        row.as_ref().map(cart_item_from_row).transpose()
    }

    async fn cart_item(&self, cart_id: Uuid, item_id: Uuid) -> Result<Option<CartItem>> {
        let row = sqlx::query(
            "select id, cart_id, meal_id, qty from cart_items where cart_id = $1 and id = $2",
        )
        .bind(cart_id)
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await
        .context("cart item lookup failed")?;
        row.as_ref().map(cart_item_from_row).transpose()
    }

    async fn insert_cart_item(
        &self,
        cart_id: Uuid,
        meal_id: Uuid,
        qty: i64,
    ) -> Result<CartItem> {
        let row = sqlx::query(
            "insert into cart_items (id, cart_id, meal_id, qty) values ($1, $2, $3, $4) \
             on conflict (cart_id, meal_id) do update set qty = cart_items.qty + excluded.qty \
             returning id, cart_id, meal_id, qty",
        )
        .bind(Uuid::new_v4())
        .bind(cart_id)
        .bind(meal_id)
        .bind(qty)
        .fetch_one(&self.pool)
        .await
        .context("cart item insert failed")?;
        cart_item_from_row(&row)
    }

    async fn set_cart_item_qty(&self, item_id: Uuid, qty: i64) -> Result<()> {
        sqlx::query("update cart_items set qty = $2 where id = $1")
            .bind(item_id)
            .bind(qty)
            .execute(&self.pool)
            .await
            .context("cart item update failed")?;
        Ok(())
    }

    async fn delete_cart_item(&self, cart_id: Uuid, item_id: Uuid) -> Result<()> {
        sqlx::query("delete from cart_items where cart_id = $1 and id = $2")
            .bind(cart_id)
            .bind(item_id)
            .execute(&self.pool)
            .await
            .context("cart item delete failed")?;
        Ok(())
    }

    async fn clear_cart(&self, cart_id: Uuid) -> Result<()> {
        sqlx::query("delete from cart_items where cart_id = $1")
            .bind(cart_id)
            .execute(&self.pool)
            .await
            .context("cart clear failed")?;
        Ok(())
    }

    async fn insert_order(&self, new: &NewOrder) -> Result<Order> {
        let row = sqlx::query(&format!(
            "insert into orders (id, user_id, restaurant_id, status, total_cents, \
                                 delivery_code, delivery_address) \
             values ($1, $2, $3, 'pending', $4, $5, $6) \
             returning {ORDER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(new.restaurant_id)
        .bind(new.total_cents)
        .bind(&new.delivery_code)
        .bind(&new.delivery_address)
        .fetch_one(&self.pool)
        .await
        .context("order insert failed")?;
        order_from_row(&row)
    }

    async fn order(&self, id: Uuid) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("select {ORDER_COLUMNS} from orders where id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("order lookup failed")?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn orders_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "select {ORDER_COLUMNS} from orders where user_id = $1 \
             order by created_at desc limit $2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("orders for user failed")?;
        rows.iter().map(order_from_row).collect()
    }

    async fn orders_for_restaurant_in(
        &self,
        restaurant_id: Uuid,
        statuses: &[OrderStatus],
    ) -> Result<Vec<Order>> {
        let names: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
        let rows = sqlx::query(&format!(
            "select {ORDER_COLUMNS} from orders \
             where restaurant_id = $1 and status = any($2) \
             order by created_at desc"
        ))
        .bind(restaurant_id)
        .bind(&names)
        .fetch_all(&self.pool)
        .await
        .context("orders for restaurant failed")?;
        rows.iter().map(order_from_row).collect()
    }

    async fn ready_unassigned_orders(&self) -> Result<Vec<(Order, Restaurant)>> {
        let rows = sqlx::query(
            "select o.id, o.user_id, o.restaurant_id, o.status, o.total_cents, \
                    o.delivery_user_id, o.delivery_code, o.delivery_address, o.latitude, \
                    o.longitude, o.delivery_fee_cents, o.tip_cents, o.tax_cents, \
                    o.restaurant_rating, o.restaurant_comment, o.driver_rating, \
                    o.driver_comment, o.created_at, \
                    r.id as r_id, r.name as r_name, r.address as r_address, \
                    r.latitude as r_latitude, r.longitude as r_longitude \
             from orders o join restaurants r on r.id = o.restaurant_id \
             where o.status = 'ready' and o.delivery_user_id is null \
             order by o.created_at asc",
        )
        .fetch_all(&self.pool)
        .await
        .context("ready orders query failed")?;

        rows.iter()
            .map(|row| {
                let order = order_from_row(row)?;
                let restaurant = Restaurant {
                    id: row.try_get("r_id")?,
                    name: row.try_get("r_name")?,
                    address: row.try_get("r_address")?,
                    latitude: row.try_get("r_latitude")?,
                    longitude: row.try_get("r_longitude")?,
                };
                Ok((order, restaurant))
            })
            .collect()
    }

    async fn insert_order_items(
        &self,
        order_id: Uuid,
        items: &[NewOrderItem],
    ) -> Result<Vec<OrderItem>> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            let row = sqlx::query(
                "insert into order_items (id, order_id, meal_id, qty, price_cents, surplus) \
                 values ($1, $2, $3, $4, $5, $6) \
                 returning id, order_id, meal_id, qty, price_cents, surplus",
            )
            .bind(Uuid::new_v4())
            .bind(order_id)
            .bind(item.meal_id)
            .bind(item.qty)
            .bind(item.price_cents)
            .bind(item.surplus)
            .fetch_one(&self.pool)
            .await
            .context("order item insert failed")?;
            out.push(order_item_from_row(&row)?);
        }
        Ok(out)
    }

    async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(
            "select id, order_id, meal_id, qty, price_cents, surplus \
             from order_items where order_id = $1 order by id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .context("order items query failed")?;
        rows.iter().map(order_item_from_row).collect()
    }

    async fn order_items_with_meals(&self, order_id: Uuid) -> Result<Vec<(OrderItem, Meal)>> {
        let rows = sqlx::query(
            "select oi.id, oi.order_id, oi.meal_id, oi.qty, oi.price_cents, oi.surplus, \
                    m.id as m_id, m.restaurant_id, m.name, m.tags, m.base_price_cents, \
                    m.surplus_price_cents, m.quantity, m.allergens, m.calories, m.image_link \
             from order_items oi join meals m on m.id = oi.meal_id \
             where oi.order_id = $1 order by oi.id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .context("order items query failed")?;

        rows.iter()
            .map(|row| {
                let item = order_item_from_row(row)?;
                let meal = Meal {
                    id: row.try_get("m_id")?,
                    restaurant_id: row.try_get("restaurant_id")?,
                    name: row.try_get("name")?,
                    tags: row.try_get("tags")?,
                    base_price_cents: row.try_get("base_price_cents")?,
                    surplus_price_cents: row.try_get("surplus_price_cents")?,
                    quantity: row.try_get("quantity")?,
                    allergens: row.try_get("allergens")?,
                    calories: row.try_get("calories")?,
                    image_link: row.try_get("image_link")?,
                };
                Ok((item, meal))
            })
            .collect()
    }

    async fn set_status_if(
        &self,
        order_id: Uuid,
        expected: OrderStatus,
        target: OrderStatus,
    ) -> Result<bool> {
        let result = sqlx::query("update orders set status = $3 where id = $1 and status = $2")
            .bind(order_id)
            .bind(expected.as_str())
            .bind(target.as_str())
            .execute(&self.pool)
            .await
            .context("status cas failed")?;
        Ok(result.rows_affected() > 0)
    }

    async fn claim_delivery(&self, order_id: Uuid, driver_id: Uuid) -> Result<bool> {
        // The busy-driver guard sits inside the same statement so two racing
        // accepts by one driver cannot both pass a separate count check.
        let result = sqlx::query(
            "update orders set delivery_user_id = $2, status = 'assigned' \
             where id = $1 and status = 'ready' and delivery_user_id is null \
               and not exists (select 1 from orders \
                               where delivery_user_id = $2 \
                                 and status in ('assigned', 'out_for_delivery'))",
        )
        .bind(order_id)
        .bind(driver_id)
        .execute(&self.pool)
        .await
        .context("delivery claim failed")?;
        Ok(result.rows_affected() > 0)
    }

    async fn active_delivery_count(&self, driver_id: Uuid) -> Result<i64> {
        let (n,): (i64,) = sqlx::query_as(
            "select count(*)::bigint from orders \
             where delivery_user_id = $1 and status in ('assigned', 'out_for_delivery')",
        )
        .bind(driver_id)
        .fetch_one(&self.pool)
        .await
        .context("active delivery count failed")?;
        Ok(n)
    }

    async fn set_feedback_if_absent(
        &self,
        order_id: Uuid,
        side: FeedbackSide,
        rating: i32,
        comment: Option<&str>,
    ) -> Result<bool> {
        let sql = match side {
            FeedbackSide::Restaurant => {
                "update orders set restaurant_rating = $2, restaurant_comment = $3 \
                 where id = $1 and restaurant_rating is null"
            }
            FeedbackSide::Driver => {
                "update orders set driver_rating = $2, driver_comment = $3 \
                 where id = $1 and driver_rating is null"
            }
        };
        let result = sqlx::query(sql)
            .bind(order_id)
            .bind(rating)
            .bind(comment)
            .execute(&self.pool)
            .await
            .context("feedback write failed")?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_status_event(&self, order_id: Uuid, status: OrderStatus) -> Result<()> {
        sqlx::query("insert into order_status_events (order_id, status) values ($1, $2)")
            .bind(order_id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .context("status event insert failed")?;
        Ok(())
    }

    async fn status_events(&self, order_id: Uuid) -> Result<Vec<OrderStatusEvent>> {
        let rows = sqlx::query(
            "select order_id, status, created_at from order_status_events \
             where order_id = $1 order by id asc",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .context("status events query failed")?;

        rows.iter()
            .map(|row| {
                Ok(OrderStatusEvent {
                    order_id: row.try_get("order_id")?,
                    status: OrderStatus::parse(&row.try_get::<String, _>("status")?)?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }
}
