//! cursor-sim: a synthetic software-development telemetry generator that serves a
//! GitHub/Cursor-analytics-shaped HTTP API over data it fabricates itself, or replays from a
//! previously exported dataset.

pub mod auth;
pub mod config;
pub mod csv_export;
pub mod dateparse;
pub mod error;
pub mod generators;
pub mod health;
pub mod models;
pub mod replay;
pub mod research_metrics;
pub mod rng;
pub mod routes;
pub mod seed;
pub mod state;
pub mod store;
pub mod temporal;

use axum::middleware;
use axum::Router;
use state::AppState;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Assembles the full route tree: `/health` is public, everything else requires HTTP Basic
/// auth, and each analytics family carries its own rate-limit tier (spec §4.7/§4.8).
pub fn build_router(state: AppState) -> Router {
    let admin_routes = routes::admin::router()
        .merge(routes::analytics::teams_router())
        .layer(middleware::from_fn_with_state(state.clone(), auth::rate_limit_admin));

    let ai_code_routes = routes::analytics::ai_code_router()
        .layer(middleware::from_fn_with_state(state.clone(), auth::rate_limit_ai_code));

    let team_routes = routes::analytics::team_router()
        .layer(middleware::from_fn_with_state(state.clone(), auth::rate_limit_team_analytics));

    let by_user_routes = routes::analytics::by_user_router()
        .layer(middleware::from_fn_with_state(state.clone(), auth::rate_limit_by_user));

    let unmetered_protected = Router::new()
        .merge(routes::repos::router())
        .merge(routes::research::router());

    let protected = Router::new()
        .merge(admin_routes)
        .merge(ai_code_routes)
        .merge(team_routes)
        .merge(by_user_routes)
        .merge(unmetered_protected)
        .layer(middleware::from_fn_with_state(state.clone(), auth::auth_middleware));

    let timeout = Duration::from_secs(state.config.request_timeout_seconds);

    Router::new()
        .merge(routes::health::router())
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(timeout))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
