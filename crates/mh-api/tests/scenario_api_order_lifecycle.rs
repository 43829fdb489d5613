//! End-to-end scenario: cart, checkout, kitchen flow, delivery claim,
//! code-gated handoff, and feedback, all through the HTTP surface.

use std::sync::Arc;

use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt; // oneshot

use mh_api::{routes, state::AppState};
use mh_schemas::Meal;
use mh_testkit::{
    restaurant_fixture, surplus_meal_fixture, MemStore, StaticDistanceProvider,
    StaticIdentityProvider,
};

struct Harness {
    state: Arc<AppState>,
    store: Arc<MemStore>,
    identity: Arc<StaticIdentityProvider>,
}

fn harness() -> Harness {
    let store = Arc::new(MemStore::new());
    let identity = Arc::new(StaticIdentityProvider::new());
    // 2 miles / 5 minutes to every restaurant.
    let distance = Arc::new(StaticDistanceProvider::constant(3218.68, 300.0));
    let state = Arc::new(AppState::new(store.clone(), identity.clone(), distance));
    Harness {
        state,
        store,
        identity,
    }
}

impl Harness {
    /// Seed one restaurant with a staff member and one surplus meal; register
    /// customer, staff, and driver tokens.
    fn seed(&self) -> Meal {
        let r = restaurant_fixture("Noodle Bar");
        let meal = surplus_meal_fixture(r.id, "pad thai", 1200, 800, 5);
        let staff = self.identity.register("staff");
        self.store.add_staff(r.id, staff);
        self.store.add_restaurant(r);
        self.store.add_meal(meal.clone());
        self.identity.register("customer");
        self.identity.register("driver");
        self.identity.register("driver2");
        meal
    }

    async fn call(
        &self,
        method: &str,
        uri: &str,
        token: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {token}"));
        let req = match body {
            Some(v) => builder
                .header("content-type", "application/json")
                .body(axum::body::Body::from(v.to_string()))
                .unwrap(),
            None => builder.body(axum::body::Body::empty()).unwrap(),
        };
        let resp = routes::build_router(Arc::clone(&self.state))
            .oneshot(req)
            .await
            .expect("oneshot failed");
        let status = resp.status();
        let bytes = resp
            .into_body()
            .collect()
            .await
            .expect("body collect failed")
            .to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("body is not valid JSON")
        };
        (status, json)
    }

    /// Cart + checkout as the customer; returns (order_id, delivery_code).
    async fn place_order(&self, meal: &Meal) -> (String, String) {
        self.call(
            "POST",
            "/cart/items",
            "customer",
            Some(json!({"meal_id": meal.id, "qty": 1})),
        )
        .await;
        let (status, receipt) = self.call("POST", "/cart/checkout", "customer", None).await;
        assert_eq!(status, StatusCode::CREATED);
        (
            receipt["order_id"].as_str().unwrap().to_string(),
            receipt["delivery_code"].as_str().unwrap().to_string(),
        )
    }

    /// Walk the order to `ready` as staff.
    async fn make_ready(&self, order_id: &str) {
        for step in ["accept", "preparing", "ready"] {
            let (status, _) = self
                .call("PATCH", &format!("/orders/{order_id}/{step}"), "staff", None)
                .await;
            assert_eq!(status, StatusCode::OK, "staff step {step}");
        }
    }
}

#[tokio::test]
async fn full_lifecycle_through_delivery_and_feedback() {
    let h = harness();
    let meal = h.seed();
    let (order_id, code) = h.place_order(&meal).await;
    h.make_ready(&order_id).await;

    // Driver sees the order in the ready feed, with distance enrichment.
    let (status, feed) = h
        .call(
            "GET",
            "/deliveries/ready?latitude=39.95&longitude=-75.16",
            "driver",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feed.as_array().unwrap().len(), 1);
    assert_eq!(feed[0]["order_id"], order_id);
    assert_eq!(feed[0]["distance_miles"], 2.0);
    assert_eq!(feed[0]["duration_minutes"], 5.0);
    assert_eq!(feed[0]["reachable_by_road"], true);

    // Claim it; the delivery code is revealed exactly here.
    let (status, accepted) = h
        .call(
            "PATCH",
            &format!("/deliveries/{order_id}/accept"),
            "driver",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["status"], "assigned");
    assert_eq!(accepted["delivery_code"], code);

    // A rival driver is too late.
    let (status, _) = h
        .call(
            "PATCH",
            &format!("/deliveries/{order_id}/accept"),
            "driver2",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Out the door, then a wrong code, then the real one.
    let (status, _) = h
        .call(
            "PATCH",
            &format!("/orders/{order_id}/status"),
            "driver",
            Some(json!({"status": "out_for_delivery"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = h
        .call(
            "PATCH",
            &format!("/orders/{order_id}/status"),
            "driver",
            Some(json!({"status": "delivered", "code": "WRONG1"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid delivery code");

    let (status, order) = h
        .call(
            "PATCH",
            &format!("/orders/{order_id}/status"),
            "driver",
            Some(json!({"status": "delivered", "code": code})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "delivered");

    // Audit timeline is the complete legal walk.
    let (status, events) = h
        .call("GET", &format!("/orders/{order_id}/status"), "customer", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let statuses: Vec<&str> = events
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["status"].as_str().unwrap())
        .collect();
    assert_eq!(
        statuses,
        vec![
            "pending",
            "accepted",
            "preparing",
            "ready",
            "assigned",
            "out_for_delivery",
            "delivered",
        ]
    );

    // Feedback: both sides once, repeats conflict.
    let (status, _) = h
        .call(
            "POST",
            &format!("/orders/{order_id}/feedback/restaurant"),
            "customer",
            Some(json!({"rating": 5, "comment": "great noodles"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = h
        .call(
            "POST",
            &format!("/orders/{order_id}/feedback/driver"),
            "customer",
            Some(json!({"rating": 4})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = h
        .call(
            "POST",
            &format!("/orders/{order_id}/feedback/restaurant"),
            "customer",
            Some(json!({"rating": 1})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, fb) = h
        .call(
            "GET",
            &format!("/orders/{order_id}/feedback"),
            "customer",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fb["restaurant"]["rating"], 5);
    assert_eq!(fb["restaurant"]["comment"], "great noodles");
    assert_eq!(fb["driver"]["rating"], 4);
}

#[tokio::test]
async fn staff_transitions_enforce_role_and_order() {
    let h = harness();
    let meal = h.seed();
    let (order_id, _) = h.place_order(&meal).await;

    // The customer is not staff.
    let (status, _) = h
        .call(
            "PATCH",
            &format!("/orders/{order_id}/accept"),
            "customer",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // No skipping ahead.
    let (status, json) = h
        .call("PATCH", &format!("/orders/{order_id}/ready"), "staff", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("invalid transition"));

    let (status, order) = h
        .call("PATCH", &format!("/orders/{order_id}/accept"), "staff", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "accepted");
}

#[tokio::test]
async fn customer_cancel_restores_stock_only_while_pending() {
    let h = harness();
    let meal = h.seed();

    let (order_id, _) = h.place_order(&meal).await;
    assert_eq!(h.store.stock_of(meal.id), Some(4));

    let (status, order) = h
        .call(
            "PATCH",
            &format!("/orders/{order_id}/cancel"),
            "customer",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "cancelled");
    assert_eq!(h.store.stock_of(meal.id), Some(5));

    // A second order, accepted by the kitchen, can no longer be cancelled
    // by the customer.
    let (order_id, _) = h.place_order(&meal).await;
    h.call("PATCH", &format!("/orders/{order_id}/accept"), "staff", None)
        .await;
    let (status, _) = h
        .call(
            "PATCH",
            &format!("/orders/{order_id}/cancel"),
            "customer",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn order_reads_are_scoped_to_the_owner() {
    let h = harness();
    let meal = h.seed();
    let (order_id, _) = h.place_order(&meal).await;

    let (status, detail) = h
        .call("GET", &format!("/orders/{order_id}"), "customer", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["items"][0]["meal_name"], "pad thai");
    // The customer keeps access to their delivery code.
    assert!(detail["delivery_code"].is_string());

    let (status, _) = h
        .call("GET", &format!("/orders/{order_id}"), "driver", None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, mine) = h.call("GET", "/orders/mine", "customer", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn owner_feed_shows_open_orders() {
    let h = harness();
    let meal = h.seed();
    let (order_id, _) = h.place_order(&meal).await;

    let (status, feed) = h.call("GET", "/owner/orders", "staff", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feed.as_array().unwrap().len(), 1);
    assert_eq!(feed[0]["id"], order_id);
    assert_eq!(feed[0]["items"][0]["qty"], 1);

    // Customers have no owner feed.
    let (status, _) = h.call("GET", "/owner/orders", "customer", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn ready_feed_degrades_without_coordinates() {
    let h = harness();
    let meal = h.seed();
    let (order_id, _) = h.place_order(&meal).await;
    h.make_ready(&order_id).await;

    let (status, feed) = h.call("GET", "/deliveries/ready", "driver", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feed.as_array().unwrap().len(), 1);
    assert!(feed[0]["distance_meters"].is_null());
    assert_eq!(feed[0]["reachable_by_road"], false);
}
