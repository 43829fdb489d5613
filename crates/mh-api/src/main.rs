//! mh-api entry point.
//!
//! This file is intentionally thin: it loads configuration, connects the
//! database, constructs the external providers, wires middleware, and starts
//! the HTTP server. All route handlers live in `routes.rs`.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use mh_api::{routes, state::AppState};
use mh_config::Config;
use mh_geo::MapboxMatrixProvider;
use mh_identity::RemoteIdentityProvider;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cfg = Config::from_env().context("configuration")?;

    let pool = mh_db::connect(&cfg.database_url).await?;
    mh_db::migrate(&pool).await?;

    let store = Arc::new(mh_db::PgStore::new(pool));
    let identity = Arc::new(RemoteIdentityProvider::new(
        cfg.identity_base_url.clone(),
        cfg.identity_api_key.clone(),
        cfg.outbound_timeout,
    )?);
    let distance = Arc::new(MapboxMatrixProvider::new(
        cfg.mapbox_access_token.clone(),
        cfg.outbound_timeout,
    )?);

    let shared = Arc::new(AppState::new(store, identity, distance));

    let app = routes::build_router(shared)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer());

    let addr: SocketAddr = cfg
        .api_addr
        .parse()
        .with_context(|| format!("invalid bind address {}", cfg.api_addr))?;
    info!("mh-api listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// CORS: allow only localhost origins (web client dev servers).
fn cors_layer() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(tower_http::cors::Any)
}
