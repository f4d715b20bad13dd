//! Admin surface (spec §4.8): introspection, regenerate, seed replacement, presets.

use crate::config::Velocity;
use crate::error::{CursorSimError, Result};
use crate::generators::{self, GenerationOutcome, GenerationRequest, GenerationStats};
use crate::models::{Region, Seniority};
use crate::seed::{self, ExternalSourceToggles, SeedFile, SeedFormat, SeedPreset};
use crate::state::AppState;
use crate::store::StoreStats;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/config", get(config))
        .route("/admin/stats", get(stats))
        .route("/admin/regenerate", post(regenerate))
        .route("/admin/seed", post(replace_seed))
        .route("/admin/seed/presets", get(presets))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfigResponse {
    mode: crate::config::Mode,
    days: u32,
    velocity: Velocity,
    developers: Option<u32>,
    max_commits: u32,
    external_sources: ExternalSourceToggles,
    uptime_seconds: i64,
}

async fn config(State(state): State<AppState>) -> Json<ConfigResponse> {
    let seed_file = state.seed_file.read().expect("seed lock poisoned");
    Json(ConfigResponse {
        mode: state.mode,
        days: state.config.days,
        velocity: seed_file.velocity,
        developers: state.config.developers,
        max_commits: state.config.max_commits,
        external_sources: seed_file.external_sources.clone(),
        uptime_seconds: state.uptime_seconds(),
    })
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    #[serde(flatten)]
    counts: StoreStats,
    by_region: HashMap<String, usize>,
    by_seniority: HashMap<String, usize>,
    by_team: HashMap<String, usize>,
    quality: crate::research_metrics::QualityMetrics,
}

fn aggregate_quality(bands: &[crate::research_metrics::BandMetrics]) -> crate::research_metrics::QualityMetrics {
    let merged: usize = bands.iter().map(|b| b.quality.merged_prs).sum();
    let reverted: usize = bands.iter().map(|b| b.quality.reverted_prs).sum();
    let hotfix: usize = bands.iter().map(|b| b.quality.hotfix_count).sum();
    crate::research_metrics::QualityMetrics {
        merged_prs: merged,
        reverted_prs: reverted,
        revert_rate: if merged == 0 { 0.0 } else { reverted as f64 / merged as f64 },
        hotfix_count: hotfix,
        hotfix_rate: if merged == 0 { 0.0 } else { hotfix as f64 / merged as f64 },
    }
}

async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let snapshot = state.store.snapshot();
    let counts = snapshot.stats();

    let mut by_region = HashMap::new();
    for region in [Region::Us, Region::Eu, Region::Apac] {
        by_region.insert(region.to_string(), snapshot.developers_by_region(region).len());
    }

    let mut by_seniority: HashMap<String, usize> = HashMap::new();
    let mut by_team: HashMap<String, usize> = HashMap::new();
    for dev in snapshot.developers.values() {
        *by_seniority.entry(seniority_key(dev.seniority)).or_insert(0) += 1;
        *by_team.entry(dev.team.clone()).or_insert(0) += 1;
    }

    let points = crate::research_metrics::flatten_store(&snapshot);
    let quality = if points.is_empty() {
        crate::research_metrics::QualityMetrics {
            merged_prs: 0,
            reverted_prs: 0,
            revert_rate: 0.0,
            hotfix_count: 0,
            hotfix_rate: 0.0,
        }
    } else {
        let earliest = points.iter().map(|p| p.timestamp).min().expect("non-empty");
        let latest = points.iter().map(|p| p.timestamp).max().expect("non-empty");
        let bands = crate::research_metrics::compute(&points, earliest, latest);
        aggregate_quality(&bands)
    };

    Json(StatsResponse { counts, by_region, by_seniority, by_team, quality })
}

fn seniority_key(s: Seniority) -> String {
    s.to_string()
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
enum RegenerateMode {
    Append,
    Override,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegenerateRequest {
    mode: RegenerateMode,
    #[serde(default)]
    days: Option<u32>,
    #[serde(default)]
    velocity: Option<Velocity>,
    #[serde(default)]
    developers: Option<u32>,
    #[serde(default)]
    max_commits: Option<u32>,
}

#[derive(Debug, Serialize)]
struct RegenerateConfigUsed {
    mode: RegenerateMode,
    days: u32,
    velocity: Velocity,
    developers: u32,
}

#[derive(Debug, Serialize)]
struct RegenerateResponse {
    status: &'static str,
    added: GenerationStats,
    configuration: RegenerateConfigUsed,
}

async fn run_regenerate(state: &AppState, req: RegenerateRequest) -> Result<RegenerateResponse> {
    let _guard = state
        .regenerate_lock
        .try_lock()
        .map_err(|_| CursorSimError::Conflict("a regenerate is already in progress".into()))?;

    let start = Utc::now();
    let days = req.days.unwrap_or(state.config.days);
    let velocity = req.velocity.unwrap_or(state.config.velocity);
    let max_commits = req.max_commits.unwrap_or(state.config.max_commits);

    let seed_file = state.seed_file.read().expect("seed lock poisoned").clone();
    let requested_developers = req.developers.unwrap_or(seed_file.developers.len() as u32);
    seed::validate_request_bounds(requested_developers, days, max_commits)?;

    let mut rng = state.root_seed.root_rng();
    let developer_seeds =
        seed::resolve_developer_count(&seed_file.developers, requested_developers as usize, &mut rng);

    let generation = GenerationRequest {
        days,
        velocity,
        max_commits,
        generation_start: Utc::now(),
        distributions: seed_file.distributions.clone(),
        external_sources: seed_file.external_sources.clone(),
    };

    let GenerationOutcome { store: new_store, stats } =
        generators::run(developer_seeds, seed_file.repositories.clone(), generation, state.root_seed)?;

    match req.mode {
        RegenerateMode::Override => {
            info!(developers = stats.developers, "regenerate: override");
            state.store.replace(new_store);
        }
        RegenerateMode::Append => {
            info!(developers = stats.developers, "regenerate: append");
            state.store.append(|inner| {
                inner.insert_developers(new_store.developers.into_values().collect())?;
                inner.insert_repositories(new_store.repositories.into_values().collect())?;
                inner.insert_commits(new_store.commits.into_values().collect())?;
                inner.insert_pull_requests(new_store.pull_requests.into_values().collect())?;
                inner.insert_reviews(new_store.reviews.into_values().collect())?;
                inner.insert_issues(new_store.issues.into_values().collect())?;
                inner.append_external_usage(new_store.external_usage);
                Ok(())
            })?;
        }
    }

    info!(duration_ms = (Utc::now() - start).num_milliseconds(), "regenerate finished");

    Ok(RegenerateResponse {
        status: "ok",
        added: stats,
        configuration: RegenerateConfigUsed { mode: req.mode, days, velocity, developers: requested_developers },
    })
}

async fn regenerate(State(state): State<AppState>, Json(req): Json<RegenerateRequest>) -> Result<Json<RegenerateResponse>> {
    Ok(Json(run_regenerate(&state, req).await?))
}

#[derive(Debug, Deserialize)]
pub struct SeedUploadRequest {
    data: String,
    format: String,
    #[serde(default)]
    regenerate: bool,
    #[serde(default)]
    regenerate_config: Option<RegenerateRequest>,
}

#[derive(Debug, Serialize)]
struct SeedUploadResponse {
    status: &'static str,
    developers: usize,
    regenerated: Option<RegenerateResponse>,
}

async fn replace_seed(
    State(state): State<AppState>,
    Json(req): Json<SeedUploadRequest>,
) -> Result<Json<SeedUploadResponse>> {
    let format = match req.format.as_str() {
        "json" => SeedFormat::Json,
        "yaml" | "yml" => SeedFormat::Yaml,
        "csv" => SeedFormat::Csv,
        other => return Err(CursorSimError::InvalidSeed(format!("unrecognized seed format: {other}"))),
    };
    let parsed = SeedFile::parse(&req.data, format)?;
    let developer_count = parsed.developers.len();

    {
        let mut seed_file = state.seed_file.write().expect("seed lock poisoned");
        *seed_file = parsed;
    }
    info!(developers = developer_count, "seed replaced");

    let regenerated = if req.regenerate {
        let regen_req = req.regenerate_config.unwrap_or(RegenerateRequest {
            mode: RegenerateMode::Override,
            days: None,
            velocity: None,
            developers: None,
            max_commits: None,
        });
        Some(run_regenerate(&state, regen_req).await?)
    } else {
        None
    };

    Ok(Json(SeedUploadResponse { status: "ok", developers: developer_count, regenerated }))
}

async fn presets() -> Json<Vec<SeedPreset>> {
    Json(seed::presets())
}
