//! AI-code tracking, team-level, and by-user analytics (spec §4.7), plus `/teams/members`.

use super::pagination::{paginate, ByUserPagination, PageParams};
use super::require_runtime;
use crate::dateparse::parse_date_range;
use crate::error::{CursorSimError, Result};
use crate::models::{Commit, Seniority};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const TEAM_METRICS: &[&str] = &["agent-edits", "tab-usage", "composer-usage"];
const BY_USER_METRICS: &[&str] = &["agent-edits", "tab-usage", "composer-usage"];

pub fn ai_code_router() -> Router<AppState> {
    Router::new()
        .route("/analytics/ai-code/commits", get(ai_code_commits))
        .route("/analytics/ai-code/changes", get(ai_code_changes))
}

pub fn team_router() -> Router<AppState> {
    Router::new().route("/analytics/team/:metric", get(team_metric))
}

pub fn by_user_router() -> Router<AppState> {
    Router::new().route("/analytics/by-user/:metric", get(by_user_metric))
}

pub fn teams_router() -> Router<AppState> {
    Router::new().route("/teams/members", get(team_members))
}

fn seniority_role(s: Seniority) -> String {
    s.to_string()
}

#[derive(Debug, Deserialize)]
pub struct AiCodeQuery {
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
    pub user: Option<String>,
    #[serde(flatten)]
    pub page: PageParams,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemsEnvelope<T: Serialize> {
    items: Vec<T>,
    total_count: usize,
    page: u32,
    page_size: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CommitSummary {
    commit_hash: String,
    author_id: String,
    repo_id: String,
    timestamp: DateTime<Utc>,
    ai_ratio: f64,
    additions: u32,
    deletions: u32,
    message: String,
}

impl From<&Commit> for CommitSummary {
    fn from(c: &Commit) -> Self {
        Self {
            commit_hash: c.hash.clone(),
            author_id: c.author_id.clone(),
            repo_id: c.repo_id.clone(),
            timestamp: c.timestamp,
            ai_ratio: c.ai_ratio(),
            additions: c.total_added(),
            deletions: c.total_deleted(),
            message: c.message.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChangeSummary {
    commit_hash: String,
    author_id: String,
    timestamp: DateTime<Utc>,
    tab_added: u32,
    tab_deleted: u32,
    composer_added: u32,
    composer_deleted: u32,
    non_ai_added: u32,
    non_ai_deleted: u32,
}

impl From<&Commit> for ChangeSummary {
    fn from(c: &Commit) -> Self {
        Self {
            commit_hash: c.hash.clone(),
            author_id: c.author_id.clone(),
            timestamp: c.timestamp,
            tab_added: c.tab_added,
            tab_deleted: c.tab_deleted,
            composer_added: c.composer_added,
            composer_deleted: c.composer_deleted,
            non_ai_added: c.non_ai_added,
            non_ai_deleted: c.non_ai_deleted,
        }
    }
}

fn filtered_commits<'a>(
    commits: Vec<&'a Commit>,
    user: Option<&str>,
    snapshot: &'a crate::store::StoreInner,
) -> Vec<&'a Commit> {
    let mut commits = commits;
    if let Some(user) = user {
        match snapshot.find_developer_by_user(user) {
            Some(dev) => commits.retain(|c| c.author_id == dev.id),
            None => commits.clear(),
        }
    }
    commits.sort_by(|a, b| a.hash.cmp(&b.hash));
    commits
}

async fn ai_code_commits(
    State(state): State<AppState>,
    Query(q): Query<AiCodeQuery>,
) -> Result<Json<ItemsEnvelope<CommitSummary>>> {
    require_runtime(&state)?;
    let now = Utc::now();
    let range = parse_date_range(q.start_date.as_deref(), q.end_date.as_deref(), now)?;
    let snapshot = state.store.snapshot();
    let commits = filtered_commits(
        snapshot.commits_in_range(range.start, range.end),
        q.user.as_deref(),
        &snapshot,
    );
    let (page_items, total_count) = paginate(&commits, q.page);
    let (page, page_size) = q.page.normalized();
    Ok(Json(ItemsEnvelope {
        items: page_items.iter().map(|c| CommitSummary::from(*c)).collect(),
        total_count,
        page,
        page_size,
    }))
}

async fn ai_code_changes(
    State(state): State<AppState>,
    Query(q): Query<AiCodeQuery>,
) -> Result<Json<ItemsEnvelope<ChangeSummary>>> {
    require_runtime(&state)?;
    let now = Utc::now();
    let range = parse_date_range(q.start_date.as_deref(), q.end_date.as_deref(), now)?;
    let snapshot = state.store.snapshot();
    let commits = filtered_commits(
        snapshot.commits_in_range(range.start, range.end),
        q.user.as_deref(),
        &snapshot,
    );
    let (page_items, total_count) = paginate(&commits, q.page);
    let (page, page_size) = q.page.normalized();
    Ok(Json(ItemsEnvelope {
        items: page_items.iter().map(|c| ChangeSummary::from(*c)).collect(),
        total_count,
        page,
        page_size,
    }))
}

#[derive(Debug, Deserialize)]
pub struct TeamQuery {
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
    pub team: Option<String>,
}

#[derive(Debug, Default)]
struct TeamTotals {
    agent_edits: f64,
    tab_usage: f64,
    composer_usage: f64,
}

#[derive(Debug, Serialize)]
struct TeamMetricRow {
    team: String,
    value: f64,
}

fn unknown_metric(metric: &str, known: &[&str]) -> CursorSimError {
    CursorSimError::InvalidRequest(format!(
        "unknown metric '{metric}', known metrics: {}",
        known.join(", ")
    ))
}

async fn team_metric(
    State(state): State<AppState>,
    Path(metric): Path<String>,
    Query(q): Query<TeamQuery>,
) -> Result<Json<serde_json::Value>> {
    require_runtime(&state)?;
    if !TEAM_METRICS.contains(&metric.as_str()) {
        return Err(unknown_metric(&metric, TEAM_METRICS));
    }

    let now = Utc::now();
    let range = parse_date_range(q.start_date.as_deref(), q.end_date.as_deref(), now)?;
    let snapshot = state.store.snapshot();
    let commits = snapshot.commits_in_range(range.start, range.end);

    let mut by_team: HashMap<String, TeamTotals> = HashMap::new();
    for c in &commits {
        let team = snapshot
            .developer(&c.author_id)
            .map(|d| d.team.clone())
            .unwrap_or_else(|| "unknown".to_string());
        if let Some(filter) = &q.team {
            if &team != filter {
                continue;
            }
        }
        let totals = by_team.entry(team).or_default();
        totals.agent_edits += (c.tab_added + c.composer_added) as f64;
        totals.tab_usage += c.tab_added as f64;
        totals.composer_usage += c.composer_added as f64;
    }

    let mut rows: Vec<TeamMetricRow> = by_team
        .into_iter()
        .map(|(team, totals)| {
            let value = match metric.as_str() {
                "agent-edits" => totals.agent_edits,
                "tab-usage" => totals.tab_usage,
                "composer-usage" => totals.composer_usage,
                _ => unreachable!("checked above"),
            };
            TeamMetricRow { team, value }
        })
        .collect();
    rows.sort_by(|a, b| a.team.cmp(&b.team));

    Ok(Json(serde_json::json!({
        "data": rows,
        "params": {
            "metric": metric,
            "startDate": range.start,
            "endDate": range.end,
            "team": q.team,
        },
    })))
}

#[derive(Debug, Deserialize)]
pub struct ByUserQuery {
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
    pub user: Option<String>,
    pub users: Option<String>,
    #[serde(flatten)]
    pub page: PageParams,
}

#[derive(Debug, Serialize)]
struct UserMetricRow {
    user_id: String,
    value: f64,
}

async fn by_user_metric(
    State(state): State<AppState>,
    Path(metric): Path<String>,
    Query(q): Query<ByUserQuery>,
) -> Result<Json<serde_json::Value>> {
    require_runtime(&state)?;
    if !BY_USER_METRICS.contains(&metric.as_str()) {
        return Err(unknown_metric(&metric, BY_USER_METRICS));
    }

    let now = Utc::now();
    let range = parse_date_range(q.start_date.as_deref(), q.end_date.as_deref(), now)?;
    let snapshot = state.store.snapshot();
    let commits = snapshot.commits_in_range(range.start, range.end);

    let wanted_users: Option<Vec<String>> = q
        .users
        .as_deref()
        .map(|csv| csv.split(',').map(|s| s.trim().to_string()).collect())
        .or_else(|| q.user.clone().map(|u| vec![u]));

    let mut by_user: HashMap<String, TeamTotals> = HashMap::new();
    for c in &commits {
        if let Some(users) = &wanted_users {
            let dev = snapshot.developer(&c.author_id);
            let matches = users.iter().any(|u| {
                u == &c.author_id || dev.is_some_and(|d| &d.email == u)
            });
            if !matches {
                continue;
            }
        }
        let totals = by_user.entry(c.author_id.clone()).or_default();
        totals.agent_edits += (c.tab_added + c.composer_added) as f64;
        totals.tab_usage += c.tab_added as f64;
        totals.composer_usage += c.composer_added as f64;
    }

    let mut rows: Vec<UserMetricRow> = by_user
        .into_iter()
        .map(|(user_id, totals)| {
            let value = match metric.as_str() {
                "agent-edits" => totals.agent_edits,
                "tab-usage" => totals.tab_usage,
                "composer-usage" => totals.composer_usage,
                _ => unreachable!("checked above"),
            };
            UserMetricRow { user_id, value }
        })
        .collect();
    rows.sort_by(|a, b| a.user_id.cmp(&b.user_id));

    let (page_rows, total_users) = paginate(&rows, q.page);
    let pagination = ByUserPagination::build(q.page, total_users);

    Ok(Json(serde_json::json!({
        "data": page_rows,
        "pagination": pagination,
        "params": {
            "metric": metric,
            "startDate": range.start,
            "endDate": range.end,
            "user": q.user,
            "users": q.users,
        },
    })))
}

#[derive(Debug, Serialize)]
struct TeamMember {
    name: String,
    email: String,
    role: String,
}

async fn team_members(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    require_runtime(&state)?;
    let snapshot = state.store.snapshot();
    let mut members: Vec<TeamMember> = snapshot
        .developers
        .values()
        .map(|d| TeamMember {
            name: d.display_name.clone(),
            email: d.email.clone(),
            role: seniority_role(d.seniority),
        })
        .collect();
    members.sort_by(|a, b| a.email.cmp(&b.email));
    Ok(Json(serde_json::json!({ "teamMembers": members })))
}
