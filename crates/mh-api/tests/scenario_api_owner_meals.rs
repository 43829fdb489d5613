//! In-process scenario tests for staff menu management.

use std::sync::Arc;

use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt; // oneshot
use uuid::Uuid;

use mh_api::{routes, state::AppState};
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
    let distance = Arc::new(StaticDistanceProvider::default());
    let state = Arc::new(AppState::new(store.clone(), identity.clone(), distance));
    Harness {
        state,
        store,
        identity,
    }
}

impl Harness {
    /// Seed one restaurant with a staff token; returns the restaurant id.
    fn seed(&self) -> Uuid {
        let r = restaurant_fixture("Noodle Bar");
        let rid = r.id;
        let staff = self.identity.register("staff");
        self.store.add_staff(rid, staff);
        self.store.add_restaurant(r);
        self.identity.register("customer");
        rid
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
}

#[tokio::test]
async fn staff_publish_and_the_catalog_sees_it() {
    let h = harness();
    let rid = h.seed();

    let (status, meal) = h
        .call(
            "POST",
            "/owner/meals",
            "staff",
            Some(json!({
                "name": "pad thai",
                "tags": ["vegetarian"],
                "base_price_cents": 1200,
                "surplus_price_cents": 800,
                "quantity": 5
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(meal["restaurant_id"], rid.to_string());

    let (status, listed) = h
        .call("GET", &format!("/restaurants/{rid}/meals"), "customer", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["name"], "pad thai");

    let (status, menu) = h.call("GET", "/owner/meals", "staff", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(menu.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn customers_cannot_manage_meals() {
    let h = harness();
    h.seed();

    let (status, _) = h
        .call(
            "POST",
            "/owner/meals",
            "customer",
            Some(json!({"name": "pad thai", "base_price_cents": 1200})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = h.call("GET", "/owner/meals", "customer", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn patch_restocks_and_reprices() {
    let h = harness();
    let rid = h.seed();
    let sold_out = surplus_meal_fixture(rid, "soup", 900, 500, 0);
    let meal_id = sold_out.id;
    h.store.add_meal(sold_out);

    let (status, meal) = h
        .call(
            "PATCH",
            &format!("/owner/meals/{meal_id}"),
            "staff",
            Some(json!({"quantity": 4, "surplus_price_cents": 450})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(meal["quantity"], 4);
    assert_eq!(meal["surplus_price_cents"], 450);
    // Fields absent from the patch keep their values.
    assert_eq!(meal["base_price_cents"], 900);

    let (status, json) = h
        .call(
            "PATCH",
            &format!("/owner/meals/{meal_id}"),
            "staff",
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "no fields to update");
}

#[tokio::test]
async fn delete_retires_a_meal() {
    let h = harness();
    let rid = h.seed();
    let meal = surplus_meal_fixture(rid, "soup", 900, 500, 2);
    let meal_id = meal.id;
    h.store.add_meal(meal);

    let (status, _) = h
        .call("DELETE", &format!("/owner/meals/{meal_id}"), "staff", None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = h
        .call("DELETE", &format!("/owner/meals/{meal_id}"), "staff", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listed) = h
        .call("GET", &format!("/restaurants/{rid}/meals"), "customer", None)
        .await;
    assert!(listed.as_array().unwrap().is_empty());
}
