//! Research dataset and metrics endpoints (spec §4.10). Served identically from runtime
//! (flattened store) or replay (loaded corpus) — the one endpoint family available in both
//! modes.

use crate::dateparse::parse_date_range;
use crate::error::{CursorSimError, Result};
use crate::models::{Band, ResearchDataPoint};
use crate::research_metrics::{self, BandMetrics, QualityMetrics, ReviewCostMetrics, VelocityMetrics};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/research/dataset", get(dataset))
        .route("/research/metrics/:metric", get(metrics))
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

fn research_points(state: &AppState) -> Vec<ResearchDataPoint> {
    if state.is_replay() {
        state
            .corpus
            .read()
            .expect("corpus lock poisoned")
            .as_ref()
            .map(|c| c.all().to_vec())
            .unwrap_or_default()
    } else {
        research_metrics::flatten_store(&state.store.snapshot())
    }
}

async fn dataset(State(state): State<AppState>, Query(q): Query<RangeQuery>) -> Result<Json<serde_json::Value>> {
    let now = Utc::now();
    let range = parse_date_range(q.from.as_deref(), q.to.as_deref(), now)?;
    let mut points = research_points(&state);
    points.retain(|p| p.timestamp >= range.start && p.timestamp <= range.end);
    points.sort_by(|a, b| a.commit_hash.cmp(&b.commit_hash));

    Ok(Json(serde_json::json!({
        "data": points,
        "params": { "from": range.start, "to": range.end },
    })))
}

#[derive(Debug, Serialize)]
struct VelocityRow {
    band: Band,
    #[serde(flatten)]
    metrics: VelocityMetrics,
}

#[derive(Debug, Serialize)]
struct ReviewCostRow {
    band: Band,
    #[serde(flatten)]
    metrics: ReviewCostMetrics,
}

#[derive(Debug, Serialize)]
struct QualityRow {
    band: Band,
    #[serde(flatten)]
    metrics: QualityMetrics,
}

fn metric_rows(metric: &str, bands: &[BandMetrics]) -> Result<serde_json::Value> {
    let value = match metric {
        "velocity" => serde_json::to_value(
            bands
                .iter()
                .map(|b| VelocityRow { band: b.band, metrics: b.velocity.clone() })
                .collect::<Vec<_>>(),
        ),
        "review-costs" => serde_json::to_value(
            bands
                .iter()
                .map(|b| ReviewCostRow { band: b.band, metrics: b.review_cost.clone() })
                .collect::<Vec<_>>(),
        ),
        "quality" => serde_json::to_value(
            bands
                .iter()
                .map(|b| QualityRow { band: b.band, metrics: b.quality.clone() })
                .collect::<Vec<_>>(),
        ),
        other => {
            return Err(CursorSimError::InvalidRequest(format!(
                "unknown research metric '{other}', known metrics: velocity, review-costs, quality"
            )))
        }
    };
    Ok(value?)
}

async fn metrics(
    State(state): State<AppState>,
    Path(metric): Path<String>,
    Query(q): Query<RangeQuery>,
) -> Result<Json<serde_json::Value>> {
    let now = Utc::now();
    let range = parse_date_range(q.from.as_deref(), q.to.as_deref(), now)?;
    let points = research_points(&state);
    let bands = research_metrics::compute(&points, range.start, range.end);
    let data = metric_rows(&metric, &bands)?;

    Ok(Json(serde_json::json!({
        "data": data,
        "params": { "metric": metric, "from": range.start, "to": range.end },
    })))
}
