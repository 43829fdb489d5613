//! Axum router and all HTTP handlers.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Handlers stay thin: authenticate, parse, delegate to a
//! domain service, map the result. Scenario tests in `tests/` compose the
//! router directly against the in-memory store.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use uuid::Uuid;

use mh_geo::Origin;
use mh_identity::TokenCheck;
use mh_schemas::{
    FeedbackSide, MealFilter, MealPatch, MealSortKey, NewMeal, OrderStatus, RestaurantFilter,
    SortOrder,
};
use mh_orders::{cart, catalog, checkout, delivery, feedback, orders, owner_meals, OrderError};

use crate::{
    api_types::{
        AddCartItemRequest, CheckoutRequest, CreateOrderRequest, DeliveryStatusRequest,
        FeedbackRequest, HealthResponse, MealsQuery, MyOrdersQuery, QtyQuery, ReadyQuery,
        RestaurantsQuery,
    },
    error::ApiError,
    state::AppState,
};

type ApiResult<T> = Result<T, ApiError>;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/restaurants", get(list_restaurants))
        .route("/restaurants/:id/meals", get(list_meals))
        .route("/cart", get(get_cart).delete(clear_cart))
        .route("/cart/items", post(add_cart_item))
        .route(
            "/cart/items/:id",
            patch(update_cart_item).delete(remove_cart_item),
        )
        .route("/cart/checkout", post(checkout_cart))
        .route("/orders", post(create_order))
        .route("/orders/mine", get(my_orders))
        .route("/orders/:id", get(order_detail))
        .route(
            "/orders/:id/status",
            get(order_timeline).patch(delivery_status),
        )
        .route("/orders/:id/accept", patch(staff_accept))
        .route("/orders/:id/preparing", patch(staff_preparing))
        .route("/orders/:id/ready", patch(staff_ready))
        .route("/orders/:id/complete", patch(staff_complete))
        .route("/orders/:id/cancel", patch(cancel_order))
        .route(
            "/orders/:id/feedback",
            get(get_feedback),
        )
        .route("/orders/:id/feedback/:side", post(submit_feedback))
        .route("/owner/orders", get(owner_orders))
        .route("/owner/meals", get(owner_meals_list).post(owner_meals_create))
        .route(
            "/owner/meals/:id",
            patch(owner_meals_update).delete(owner_meals_delete),
        )
        .route("/deliveries/ready", get(ready_deliveries))
        .route("/deliveries/:id/accept", patch(accept_delivery))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

/// Resolve the caller from the `Authorization: Bearer` header. A rejected
/// token is 401; an unreachable identity provider is 502.
async fn require_user(st: &AppState, headers: &HeaderMap) -> ApiResult<Uuid> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::Unauthorized)?;

    match st.identity.check_token(token).await {
        Ok(TokenCheck::Valid(user)) => Ok(user.id),
        Ok(TokenCheck::Rejected) => Err(ApiError::Unauthorized),
        Err(err) => Err(ApiError::Upstream(err)),
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse::from_build(&st.build)))
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

fn parse_sort(raw: Option<&str>) -> SortOrder {
    match raw {
        Some("desc") => SortOrder::Desc,
        _ => SortOrder::Asc,
    }
}

async fn list_restaurants(
    State(st): State<Arc<AppState>>,
    Query(q): Query<RestaurantsQuery>,
) -> ApiResult<impl IntoResponse> {
    let filter = RestaurantFilter {
        search: q.search,
        sort: parse_sort(q.sort.as_deref()),
        limit: q.limit.clamp(1, 100),
        offset: q.offset.max(0),
    };
    let restaurants = catalog::list_restaurants(st.store.as_ref(), &filter).await?;
    Ok(Json(restaurants))
}

async fn list_meals(
    State(st): State<Arc<AppState>>,
    Path(restaurant_id): Path<Uuid>,
    Query(q): Query<MealsQuery>,
) -> ApiResult<impl IntoResponse> {
    let filter = MealFilter {
        surplus_only: q.surplus_only,
        search: q.search,
        sort_key: match q.sort_by.as_deref() {
            Some("surplus_price") => MealSortKey::SurplusPrice,
            _ => MealSortKey::Name,
        },
        sort: parse_sort(q.sort.as_deref()),
        limit: q.limit.clamp(1, 100),
        offset: q.offset.max(0),
    };
    let dietary = catalog::DietaryFilter {
        vegetarian: q.vegetarian,
        vegan: q.vegan,
        gluten_free: q.gluten_free,
        exclude_allergens: q.exclude_allergens,
    };
    let meals = catalog::list_meals(st.store.as_ref(), restaurant_id, &filter, &dietary).await?;
    Ok(Json(meals))
}

// ---------------------------------------------------------------------------
// Cart
// ---------------------------------------------------------------------------

async fn get_cart(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let user = require_user(&st, &headers).await?;
    let view = cart::my_cart(st.store.as_ref(), user).await?;
    Ok(Json(view))
}

async fn add_cart_item(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<AddCartItemRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = require_user(&st, &headers).await?;
    let view = cart::add_item(st.store.as_ref(), user, body.meal_id, body.qty).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn update_cart_item(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(item_id): Path<Uuid>,
    Query(q): Query<QtyQuery>,
) -> ApiResult<impl IntoResponse> {
    let user = require_user(&st, &headers).await?;
    let view = cart::update_item_qty(st.store.as_ref(), user, item_id, q.qty).await?;
    Ok(Json(view))
}

async fn remove_cart_item(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(item_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let user = require_user(&st, &headers).await?;
    let view = cart::remove_item(st.store.as_ref(), user, item_id).await?;
    Ok(Json(view))
}

async fn clear_cart(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let user = require_user(&st, &headers).await?;
    let view = cart::clear_cart(st.store.as_ref(), user).await?;
    Ok(Json(view))
}

// ---------------------------------------------------------------------------
// Checkout / order creation
// ---------------------------------------------------------------------------

async fn checkout_cart(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Option<Json<CheckoutRequest>>,
) -> ApiResult<impl IntoResponse> {
    let user = require_user(&st, &headers).await?;
    let Json(body) = body.unwrap_or_default();
    let receipt = checkout::checkout_cart(st.store.as_ref(), user, body.delivery_address).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn create_order(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateOrderRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = require_user(&st, &headers).await?;
    let items: Vec<(Uuid, i64)> = body.items.iter().map(|i| (i.meal_id, i.qty)).collect();
    let receipt = checkout::create_order_direct(
        st.store.as_ref(),
        user,
        body.restaurant_id,
        &items,
        body.delivery_address,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

// ---------------------------------------------------------------------------
// Order reads
// ---------------------------------------------------------------------------

async fn my_orders(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(q): Query<MyOrdersQuery>,
) -> ApiResult<impl IntoResponse> {
    let user = require_user(&st, &headers).await?;
    let list = orders::list_my_orders(st.store.as_ref(), user, q.limit).await?;
    Ok(Json(list))
}

async fn order_detail(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(order_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let user = require_user(&st, &headers).await?;
    let detail = orders::get_order(st.store.as_ref(), user, order_id).await?;
    Ok(Json(detail))
}

async fn order_timeline(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(order_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let user = require_user(&st, &headers).await?;
    let events = orders::timeline(st.store.as_ref(), user, order_id).await?;
    Ok(Json(events))
}

async fn owner_orders(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let user = require_user(&st, &headers).await?;
    let feed = orders::owner_feed(st.store.as_ref(), user).await?;
    Ok(Json(feed))
}

// ---------------------------------------------------------------------------
// Staff transitions
// ---------------------------------------------------------------------------

async fn staff_step(
    st: &AppState,
    headers: &HeaderMap,
    order_id: Uuid,
    target: OrderStatus,
) -> ApiResult<impl IntoResponse> {
    let user = require_user(st, headers).await?;
    let order = orders::staff_transition(st.store.as_ref(), user, order_id, target).await?;
    Ok(Json(order))
}

async fn staff_accept(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(order_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    staff_step(&st, &headers, order_id, OrderStatus::Accepted).await
}

async fn staff_preparing(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(order_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    staff_step(&st, &headers, order_id, OrderStatus::Preparing).await
}

async fn staff_ready(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(order_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    staff_step(&st, &headers, order_id, OrderStatus::Ready).await
}

async fn staff_complete(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(order_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    staff_step(&st, &headers, order_id, OrderStatus::Completed).await
}

async fn cancel_order(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(order_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let user = require_user(&st, &headers).await?;
    let order = orders::cancel(st.store.as_ref(), user, order_id).await?;
    Ok(Json(order))
}

// ---------------------------------------------------------------------------
// Owner meal management
// ---------------------------------------------------------------------------

async fn owner_meals_list(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let user = require_user(&st, &headers).await?;
    let menu = owner_meals::my_meals(st.store.as_ref(), user).await?;
    Ok(Json(menu))
}

async fn owner_meals_create(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NewMeal>,
) -> ApiResult<impl IntoResponse> {
    let user = require_user(&st, &headers).await?;
    let meal = owner_meals::create_meal(st.store.as_ref(), user, body).await?;
    Ok((StatusCode::CREATED, Json(meal)))
}

async fn owner_meals_update(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(meal_id): Path<Uuid>,
    Json(body): Json<MealPatch>,
) -> ApiResult<impl IntoResponse> {
    let user = require_user(&st, &headers).await?;
    let meal = owner_meals::update_meal(st.store.as_ref(), user, meal_id, body).await?;
    Ok(Json(meal))
}

async fn owner_meals_delete(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(meal_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let user = require_user(&st, &headers).await?;
    owner_meals::delete_meal(st.store.as_ref(), user, meal_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

async fn ready_deliveries(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(q): Query<ReadyQuery>,
) -> ApiResult<impl IntoResponse> {
    let _driver = require_user(&st, &headers).await?;
    let position = match (q.latitude, q.longitude) {
        (Some(latitude), Some(longitude)) => Some(Origin {
            latitude,
            longitude,
        }),
        _ => None,
    };
    let feed = delivery::ready_orders(st.store.as_ref(), st.distance.as_ref(), position).await?;
    Ok(Json(feed))
}

async fn accept_delivery(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(order_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let driver = require_user(&st, &headers).await?;
    let accepted = delivery::accept_delivery(st.store.as_ref(), driver, order_id).await?;
    Ok(Json(accepted))
}

async fn delivery_status(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(order_id): Path<Uuid>,
    Json(body): Json<DeliveryStatusRequest>,
) -> ApiResult<impl IntoResponse> {
    let driver = require_user(&st, &headers).await?;
    let order = delivery::update_delivery_status(
        st.store.as_ref(),
        driver,
        order_id,
        &body.status,
        body.code.as_deref(),
    )
    .await?;
    Ok(Json(order))
}

// ---------------------------------------------------------------------------
// Feedback
// ---------------------------------------------------------------------------

async fn submit_feedback(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((order_id, side)): Path<(Uuid, String)>,
    Json(body): Json<FeedbackRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = require_user(&st, &headers).await?;
    let side = FeedbackSide::parse(&side)
        .map_err(|_| OrderError::InvalidInput(format!("invalid feedback side: {side}")))?;
    feedback::submit_feedback(
        st.store.as_ref(),
        user,
        order_id,
        side,
        body.rating,
        body.comment.as_deref(),
    )
    .await?;
    Ok(StatusCode::CREATED)
}

async fn get_feedback(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(order_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let user = require_user(&st, &headers).await?;
    let fb = feedback::order_feedback(st.store.as_ref(), user, order_id).await?;
    Ok(Json(fb))
}
