//! `GET /health` — the one endpoint that never requires auth.

use crate::health::HealthResponse;
use crate::state::AppState;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let replay_loaded = state.is_replay().then(|| {
        state
            .corpus
            .read()
            .expect("corpus lock poisoned")
            .as_ref()
            .is_some_and(|c| !c.is_empty())
    });
    Json(state.health.check(&state.store, replay_loaded))
}
