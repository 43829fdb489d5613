//! In-process scenario tests for the health endpoint and bearer-token
//! authentication. The router runs without a TCP socket, driven via
//! `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt; // oneshot

use mh_api::{routes, state::AppState};
use mh_testkit::{MemStore, StaticDistanceProvider, StaticIdentityProvider};

fn make_state() -> (Arc<AppState>, Arc<StaticIdentityProvider>) {
    let store = Arc::new(MemStore::new());
    let identity = Arc::new(StaticIdentityProvider::new());
    let distance = Arc::new(StaticDistanceProvider::default());
    let state = Arc::new(AppState::new(store, identity.clone(), distance));
    (state, identity)
}

async fn call(
    state: Arc<AppState>,
    req: Request<axum::body::Body>,
) -> (StatusCode, serde_json::Value) {
    let resp = routes::build_router(state)
        .oneshot(req)
        .await
        .expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).expect("body is not valid JSON")
    };
    (status, json)
}

#[tokio::test]
async fn health_returns_200_ok_true() {
    let (state, _) = make_state();
    let req = Request::builder()
        .method("GET")
        .uri("/v1/health")
        .body(axum::body::Body::empty())
        .unwrap();

    let (status, json) = call(state, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], true);
    assert_eq!(json["service"], "mh-api");
}

#[tokio::test]
async fn missing_token_is_401_with_error_body() {
    let (state, _) = make_state();
    let req = Request::builder()
        .method("GET")
        .uri("/cart")
        .body(axum::body::Body::empty())
        .unwrap();

    let (status, json) = call(state, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn rejected_token_is_401() {
    let (state, identity) = make_state();
    identity.register("good-token");

    let req = Request::builder()
        .method("GET")
        .uri("/cart")
        .header("authorization", "Bearer some-other-token")
        .body(axum::body::Body::empty())
        .unwrap();

    let (status, _) = call(state, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn known_token_is_accepted() {
    let (state, identity) = make_state();
    identity.register("good-token");

    let req = Request::builder()
        .method("GET")
        .uri("/cart")
        .header("authorization", "Bearer good-token")
        .body(axum::body::Body::empty())
        .unwrap();

    let (status, json) = call(state, req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["items"].as_array().unwrap().is_empty());
    assert_eq!(json["cart_total_cents"], 0);
}

#[tokio::test]
async fn catalog_is_public() {
    let (state, _) = make_state();
    let req = Request::builder()
        .method("GET")
        .uri("/restaurants")
        .body(axum::body::Body::empty())
        .unwrap();

    let (status, json) = call(state, req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json.as_array().unwrap().is_empty());
}
