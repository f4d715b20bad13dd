//! End-to-end HTTP tests driving the full router via `tower::ServiceExt::oneshot`, covering
//! the walkthroughs a client of this API would actually exercise.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::Engine;
use cursor_sim::config::{AppConfig, Mode, Velocity};
use cursor_sim::generators::{self, GenerationRequest};
use cursor_sim::models::ResearchDataPoint;
use cursor_sim::replay::Corpus;
use cursor_sim::rng::RootSeed;
use cursor_sim::seed::{self, DistributionOverrides, ExternalSourceToggles};
use cursor_sim::state::AppState;
use cursor_sim::store::Store;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

const API_KEY: &str = "cursor-sim-dev-key";

fn runtime_config(days: u32, velocity: Velocity, max_commits: u32, developers: Option<u32>) -> AppConfig {
    AppConfig {
        mode: Mode::Runtime,
        seed: None,
        port: 0,
        days,
        velocity,
        developers,
        max_commits,
        interactive: false,
        corpus: None,
        api_key: API_KEY.to_string(),
        request_timeout_seconds: 30,
    }
}

fn build_runtime_state(config: AppConfig, roster_size: usize) -> AppState {
    let seed_file = cursor_sim::seed::SeedFile {
        version: 1,
        developers: seed::synthesize_default_roster(roster_size),
        repositories: seed::default_repositories(),
        org: seed::default_org_tree(),
        external_sources: ExternalSourceToggles::default(),
        velocity: config.velocity,
        distributions: DistributionOverrides::default(),
    };

    let root_seed = RootSeed(42);
    let mut rng = root_seed.root_rng();
    let developer_seeds = seed::resolve_developer_count(&seed_file.developers, roster_size, &mut rng);

    let request = GenerationRequest {
        days: config.days,
        velocity: config.velocity,
        max_commits: config.max_commits,
        generation_start: chrono::Utc::now(),
        distributions: seed_file.distributions.clone(),
        external_sources: seed_file.external_sources.clone(),
    };

    let outcome = generators::run(developer_seeds, seed_file.repositories.clone(), request, root_seed)
        .expect("generation should succeed for valid test inputs");

    AppState::new(config, root_seed, seed_file, Store::from_inner(outcome.store))
}

fn auth_header() -> String {
    format!("Basic {}", base64::engine::general_purpose::STANDARD.encode(format!("{API_KEY}:")))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("response body should be valid json")
}

#[tokio::test]
async fn commits_respect_max_commits_and_author_roster() {
    let config = runtime_config(7, Velocity::Medium, 50, Some(2));
    let state = build_runtime_state(config, 2);
    let app = cursor_sim::build_router(state);

    let request = Request::builder()
        .uri("/analytics/ai-code/commits?startDate=7d&pageSize=1000")
        .header("Authorization", auth_header())
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    let total_count = body["totalCount"].as_u64().unwrap();
    assert!(total_count <= 50);

    let allowed_authors = ["alice", "bob"];
    for item in body["items"].as_array().unwrap() {
        let author = item["authorId"].as_str().unwrap();
        assert!(allowed_authors.contains(&author), "unexpected author {author}");
    }
}

#[tokio::test]
async fn regeneration_with_identical_inputs_is_reproducible() {
    let config_a = runtime_config(7, Velocity::Medium, 50, Some(2));
    let config_b = runtime_config(7, Velocity::Medium, 50, Some(2));
    let state_a = build_runtime_state(config_a, 2);
    let state_b = build_runtime_state(config_b, 2);

    let mut hashes_a: Vec<String> = state_a.store.snapshot().commits.keys().cloned().collect();
    let mut hashes_b: Vec<String> = state_b.store.snapshot().commits.keys().cloned().collect();
    hashes_a.sort();
    hashes_b.sort();
    assert_eq!(hashes_a, hashes_b);
}

#[tokio::test]
async fn health_check_requires_no_authorization() {
    let config = runtime_config(7, Velocity::Medium, 10, Some(2));
    let state = build_runtime_state(config, 2);
    let app = cursor_sim::build_router(state);

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn bad_credentials_are_rejected_with_invalid_api_key_message() {
    let config = runtime_config(7, Velocity::Medium, 10, Some(2));
    let state = build_runtime_state(config, 2);
    let app = cursor_sim::build_router(state);

    let bad_header = format!("Basic {}", base64::engine::general_purpose::STANDARD.encode("wrong-key:"));
    let request = Request::builder()
        .uri("/analytics/ai-code/commits")
        .header("Authorization", bad_header)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Unauthorized");
    assert_eq!(body["message"], "Invalid API key");
}

#[tokio::test]
async fn malformed_start_date_is_a_400_with_field_specific_message() {
    let config = runtime_config(7, Velocity::Medium, 10, Some(2));
    let state = build_runtime_state(config, 2);
    let app = cursor_sim::build_router(state);

    let request = Request::builder()
        .uri("/analytics/team/agent-edits?startDate=foo")
        .header("Authorization", auth_header())
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Bad Request");
    assert_eq!(body["message"], "invalid startDate: foo");
}

#[tokio::test]
async fn override_regenerate_replaces_the_store_instead_of_accumulating() {
    let config = runtime_config(30, Velocity::Medium, 0, Some(5));
    let state = build_runtime_state(config, 5);
    let initial_commits = state.store.snapshot().commits.len();
    assert!(initial_commits > 0, "initial generation should produce commits to override");

    let app = cursor_sim::build_router(state);

    let regenerate_body = serde_json::json!({
        "mode": "override",
        "days": 30,
        "velocity": "high",
        "developers": 3,
        "max_commits": 0,
    });
    let request = Request::builder()
        .method("POST")
        .uri("/admin/regenerate")
        .header("Authorization", auth_header())
        .header("Content-Type", "application/json")
        .body(Body::from(regenerate_body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let regenerate_response = body_json(response).await;
    let added_commits = regenerate_response["added"]["commits"].as_u64().unwrap();

    let stats_request = Request::builder()
        .uri("/admin/stats")
        .header("Authorization", auth_header())
        .body(Body::empty())
        .unwrap();
    let stats_response = app.oneshot(stats_request).await.unwrap();
    assert_eq!(stats_response.status(), StatusCode::OK);
    let stats = body_json(stats_response).await;

    assert_eq!(stats["developers"], 3);
    assert_eq!(stats["commits"].as_u64().unwrap(), added_commits);
}

#[tokio::test]
async fn replay_velocity_metrics_split_into_two_single_commit_bands() {
    let low_band = ResearchDataPoint {
        commit_hash: "a".repeat(40),
        pr_number: Some(1),
        author_id: "alice".into(),
        ai_ratio: 0.1,
        additions: 10,
        deletions: 2,
        coding_lead_time_hours: 3.0,
        review_lead_time_hours: 1.0,
        review_iterations: 1,
        was_reverted: false,
        required_hotfix: false,
        pr_merged: true,
        timestamp: chrono::Utc::now(),
    };
    let high_band = ResearchDataPoint {
        commit_hash: "b".repeat(40),
        pr_number: Some(2),
        author_id: "bob".into(),
        ai_ratio: 0.9,
        additions: 20,
        deletions: 4,
        coding_lead_time_hours: 1.0,
        review_lead_time_hours: 0.5,
        review_iterations: 1,
        was_reverted: false,
        required_hotfix: false,
        pr_merged: true,
        timestamp: chrono::Utc::now(),
    };
    let corpus = Corpus::from_points(vec![low_band, high_band]);

    let config = AppConfig {
        mode: Mode::Replay,
        seed: None,
        port: 0,
        days: 90,
        velocity: Velocity::Medium,
        developers: None,
        max_commits: 0,
        interactive: false,
        corpus: None,
        api_key: API_KEY.to_string(),
        request_timeout_seconds: 30,
    };
    let state = AppState::replay(config, corpus);
    let app = cursor_sim::build_router(state);

    let request = Request::builder()
        .uri("/research/metrics/velocity?from=2000-01-01&to=2100-01-01")
        .header("Authorization", auth_header())
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    for row in rows {
        assert_eq!(row["totalCommits"], 1);
    }
}

#[tokio::test]
async fn replay_mode_rejects_runtime_only_endpoints() {
    let corpus = Corpus::from_points(Vec::new());
    let config = AppConfig {
        mode: Mode::Replay,
        seed: None,
        port: 0,
        days: 90,
        velocity: Velocity::Medium,
        developers: None,
        max_commits: 0,
        interactive: false,
        corpus: None,
        api_key: API_KEY.to_string(),
        request_timeout_seconds: 30,
    };
    let state = AppState::replay(config, corpus);
    let app = cursor_sim::build_router(state);

    let request = Request::builder()
        .uri("/analytics/ai-code/commits")
        .header("Authorization", auth_header())
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn pagination_round_trips_every_item_exactly_once() {
    let config = runtime_config(30, Velocity::High, 0, Some(8));
    let state = build_runtime_state(config, 8);
    let total = state.store.snapshot().commits.len();
    let app = cursor_sim::build_router(state);

    let page_size = 7u64;
    let mut seen = std::collections::HashSet::new();
    let mut page = 1u64;
    loop {
        let uri = format!("/analytics/ai-code/commits?page={page}&pageSize={page_size}&startDate=3650d");
        let request = Request::builder()
            .uri(uri)
            .header("Authorization", auth_header())
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let body = body_json(response).await;
        let items = body["items"].as_array().unwrap();
        if items.is_empty() {
            break;
        }
        for item in items {
            seen.insert(item["commitHash"].as_str().unwrap().to_string());
        }
        page += 1;
        if page > 100 {
            panic!("pagination did not terminate");
        }
    }

    assert_eq!(seen.len(), total);
}
