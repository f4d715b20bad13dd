//! GitHub-shaped repository/PR/review endpoints and the Microsoft Graph Copilot usage
//! report (spec §4.7, §6). The wire shapes mirror the upstream services closely enough that
//! a client already written against GitHub/Graph needs no translation layer.

use super::require_runtime;
use crate::error::{CursorSimError, Result};
use crate::models::{PrState, PullRequest, Repository, Review, ReviewState};
use crate::state::AppState;
use crate::store::StoreInner;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/repos", get(list_repos))
        .route("/repos/:owner/:repo/pulls", get(list_pulls))
        .route("/repos/:owner/:repo/pulls/:number/reviews", get(list_pull_reviews))
        .route("/reports/*call", get(copilot_usage))
}

#[derive(Debug, Serialize)]
struct GithubOwner {
    login: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
struct GithubRepo {
    id: String,
    name: String,
    full_name: String,
    owner: GithubOwner,
    default_branch: String,
    language: String,
    size: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<&Repository> for GithubRepo {
    fn from(r: &Repository) -> Self {
        Self {
            id: r.id.clone(),
            name: r.name.clone(),
            full_name: r.full_name(),
            owner: GithubOwner { login: r.owner.clone() },
            default_branch: r.default_branch.clone(),
            language: r.language.clone(),
            size: r.size_kb,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

async fn list_repos(State(state): State<AppState>) -> Result<Json<Vec<GithubRepo>>> {
    require_runtime(&state)?;
    let snapshot = state.store.snapshot();
    let mut repos: Vec<GithubRepo> = snapshot.repositories.values().map(GithubRepo::from).collect();
    repos.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(Json(repos))
}

fn resolve_repo_id(snapshot: &StoreInner, owner: &str, repo: &str) -> Result<String> {
    snapshot
        .repositories
        .values()
        .find(|r| r.owner == owner && r.name == repo)
        .map(|r| r.id.clone())
        .ok_or_else(|| CursorSimError::NotFound(format!("repository {owner}/{repo} not found")))
}

#[derive(Debug, Serialize)]
struct GithubRef {
    #[serde(rename = "ref")]
    ref_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
struct GithubPull {
    number: u32,
    title: String,
    state: String,
    user: GithubOwner,
    head: GithubRef,
    base: GithubRef,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    merged_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
    additions: u32,
    deletions: u32,
}

/// GitHub reports merged PRs with `state: "closed"` and a populated `merged_at`; only truly
/// open PRs carry `state: "open"`.
fn pr_state_label(s: PrState) -> &'static str {
    match s {
        PrState::Open => "open",
        PrState::Merged | PrState::Closed => "closed",
    }
}

fn github_pull(pr: &PullRequest, author_login: String) -> GithubPull {
    GithubPull {
        number: pr.number,
        title: pr.title.clone(),
        state: pr_state_label(pr.state).to_string(),
        user: GithubOwner { login: author_login },
        head: GithubRef { ref_name: pr.head_branch.clone() },
        base: GithubRef { ref_name: pr.base_branch.clone() },
        created_at: pr.created_at,
        updated_at: pr.updated_at,
        merged_at: pr.merged_at,
        closed_at: pr.closed_at,
        additions: pr.additions,
        deletions: pr.deletions,
    }
}

async fn list_pulls(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
) -> Result<Json<Vec<GithubPull>>> {
    require_runtime(&state)?;
    let snapshot = state.store.snapshot();
    let repo_id = resolve_repo_id(&snapshot, &owner, &repo)?;
    let mut prs = snapshot.pull_requests_by_repo(&repo_id);
    prs.sort_by_key(|p| p.number);

    let out = prs
        .iter()
        .map(|p| {
            let login = snapshot
                .developer(&p.author_id)
                .map(|d| d.display_name.clone())
                .unwrap_or_else(|| p.author_id.clone());
            github_pull(p, login)
        })
        .collect();
    Ok(Json(out))
}

#[derive(Debug, Serialize)]
struct GithubReview {
    id: String,
    user: GithubOwner,
    state: String,
    body: String,
    submitted_at: DateTime<Utc>,
}

fn review_state_label(s: ReviewState) -> &'static str {
    match s {
        ReviewState::Approved => "APPROVED",
        ReviewState::ChangesRequested => "CHANGES_REQUESTED",
        ReviewState::Commented => "COMMENTED",
    }
}

fn github_review(r: &Review, login: String) -> GithubReview {
    GithubReview {
        id: r.id.clone(),
        user: GithubOwner { login },
        state: review_state_label(r.state).to_string(),
        body: r.body.clone(),
        submitted_at: r.submitted_at,
    }
}

async fn list_pull_reviews(
    State(state): State<AppState>,
    Path((owner, repo, number)): Path<(String, String, u32)>,
) -> Result<Json<Vec<GithubReview>>> {
    require_runtime(&state)?;
    let snapshot = state.store.snapshot();
    let repo_id = resolve_repo_id(&snapshot, &owner, &repo)?;
    let pr = snapshot
        .pull_request_by_repo_number(&repo_id, number)
        .ok_or_else(|| CursorSimError::NotFound(format!("pull request {owner}/{repo}#{number} not found")))?;

    let mut reviews = snapshot.reviews_by_pr(&pr.id);
    reviews.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));

    let out = reviews
        .iter()
        .map(|r| {
            let login = snapshot
                .developer(&r.reviewer_id)
                .map(|d| d.display_name.clone())
                .unwrap_or_else(|| r.reviewer_id.clone());
            github_review(r, login)
        })
        .collect();
    Ok(Json(out))
}

/// Extracts the `period` value out of an OData function-call path segment like
/// `getMicrosoft365CopilotUsageUserDetail(period='D30')`.
fn extract_period(call: &str) -> Option<String> {
    let marker = "period='";
    let start = call.find(marker)? + marker.len();
    let rest = &call[start..];
    let end = rest.find('\'')?;
    Some(rest[..end].to_string())
}

async fn copilot_usage(
    State(state): State<AppState>,
    Path(call): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<axum::response::Response> {
    require_runtime(&state)?;
    if !call.starts_with("getMicrosoft365CopilotUsageUserDetail") {
        return Err(CursorSimError::NotFound(format!("unknown report: {call}")));
    }
    let period = extract_period(&call)
        .or_else(|| params.get("period").cloned())
        .unwrap_or_else(|| "D30".to_string());

    let snapshot = state.store.snapshot();
    let mut records = snapshot.external_usage.copilot.clone();
    records.sort_by(|a, b| a.user_principal_name.cmp(&b.user_principal_name));

    let wants_csv = crate::csv_export::wants_csv(
        &format!("/reports/{call}"),
        params.get("$format").map(|s| s.as_str()),
    );
    if wants_csv {
        return crate::csv_export::csv_response("copilot-usage", &records);
    }

    Ok(Json(serde_json::json!({
        "@odata.context": "https://graph.microsoft.com/v1.0/$metadata#Collection(microsoft.graph.microsoft365CopilotUsageUserDetail)",
        "value": records,
        "period": period,
    }))
    .into_response())
}
