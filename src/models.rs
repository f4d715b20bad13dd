//! Data model: the entity graph cursor-sim fabricates and serves.
//!
//! Every entity is immutable once inserted into the store (generation produces a complete,
//! self-consistent value; nothing is mutated in place afterwards — `override` regenerate
//! replaces the whole store rather than patching entities).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    Us,
    Eu,
    Apac,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Us => write!(f, "US"),
            Region::Eu => write!(f, "EU"),
            Region::Apac => write!(f, "APAC"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Seniority {
    Junior,
    Mid,
    Senior,
    Staff,
}

impl fmt::Display for Seniority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seniority::Junior => write!(f, "junior"),
            Seniority::Mid => write!(f, "mid"),
            Seniority::Senior => write!(f, "senior"),
            Seniority::Staff => write!(f, "staff"),
        }
    }
}

/// Per-developer generation parameters, carried verbatim when a developer is cloned to pad
/// a roster out to a requested headcount (see `seed.rs`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DeveloperParams {
    pub acceptance_rate: f64,
    pub events_per_day_mean: f64,
    pub events_per_day_std: f64,
    /// Fraction of AI-assisted lines attributed to TAB rather than Composer, in [0,1].
    pub tab_composer_ratio: f64,
    pub working_hours_start: u8,
    pub working_hours_end: u8,
    pub peak_hour: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Developer {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub team: String,
    pub division: String,
    pub organization: String,
    pub region: Region,
    pub timezone: String,
    pub seniority: Seniority,
    pub params: DeveloperParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: String,
    pub owner: String,
    pub name: String,
    pub default_branch: String,
    pub language: String,
    pub size_kb: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Repository {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    /// 40-char hex hash, the commit's stable id.
    pub hash: String,
    pub author_id: String,
    pub repo_id: String,
    pub branch: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub tab_added: u32,
    pub tab_deleted: u32,
    pub composer_added: u32,
    pub composer_deleted: u32,
    pub non_ai_added: u32,
    pub non_ai_deleted: u32,
}

impl Commit {
    pub fn total_added(&self) -> u32 {
        self.tab_added + self.composer_added + self.non_ai_added
    }

    pub fn total_deleted(&self) -> u32 {
        self.tab_deleted + self.composer_deleted + self.non_ai_deleted
    }

    /// `(tab+composer)/(tab+composer+non_ai)` over added lines, in `[0,1]`. A commit with no
    /// added lines at all has an undefined ratio by the formula; we define it as 0 rather
    /// than NaN so downstream aggregation never has to special-case it.
    pub fn ai_ratio(&self) -> f64 {
        let ai = (self.tab_added + self.composer_added) as f64;
        let total = self.total_added() as f64;
        if total == 0.0 {
            0.0
        } else {
            ai / total
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrState {
    Open,
    Merged,
    Closed,
}

impl fmt::Display for PrState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrState::Open => write!(f, "open"),
            PrState::Merged => write!(f, "merged"),
            PrState::Closed => write!(f, "closed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: String,
    pub repo_id: String,
    pub number: u32,
    pub title: String,
    pub state: PrState,
    pub author_id: String,
    pub head_branch: String,
    pub base_branch: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub commit_hashes: Vec<String>,
    /// Mean `ai_ratio` across member commits, aggregated at generation time.
    pub ai_ratio: f64,
    pub additions: u32,
    pub deletions: u32,
    pub was_reverted: bool,
    pub is_bug_fix: bool,
    pub is_hotfix: bool,
}

impl PullRequest {
    pub fn active_window_end(&self) -> DateTime<Utc> {
        self.merged_at
            .or(self.closed_at)
            .unwrap_or(self.created_at + chrono::Duration::days(7))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineComment {
    pub file_path: String,
    pub line: u32,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub pr_id: String,
    pub reviewer_id: String,
    pub state: ReviewState,
    pub body: String,
    pub submitted_at: DateTime<Utc>,
    pub comments: Vec<InlineComment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub repo_id: String,
    pub number: u32,
    pub title: String,
    pub body: String,
    pub author_id: String,
    pub labels: Vec<String>,
    pub state: IssueState,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_by_pr: Option<String>,
}

/// A single Harvey usage record: legal-research/drafting assistant activity per user per day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarveyUsageRecord {
    pub user_email: String,
    pub date: DateTime<Utc>,
    pub queries: u32,
    pub documents_drafted: u32,
    pub minutes_active: u32,
}

/// Shaped after the real Microsoft Graph `getMicrosoft365CopilotUsageUserDetail` report rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopilotUsageRecord {
    #[serde(rename = "reportRefreshDate")]
    pub report_refresh_date: String,
    #[serde(rename = "userPrincipalName")]
    pub user_principal_name: String,
    #[serde(rename = "lastActivityDate")]
    pub last_activity_date: Option<String>,
    #[serde(rename = "copilotChatLastActivityDate")]
    pub copilot_chat_last_activity_date: Option<String>,
    #[serde(rename = "reportPeriod")]
    pub report_period: String,
}

/// A Qualtrics developer-experience survey response, tied to a Developer by email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualtricsUsageRecord {
    pub respondent_email: String,
    pub survey_date: DateTime<Utc>,
    pub satisfaction_score: u8,
    pub ai_tooling_sentiment: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalUsage {
    pub harvey: Vec<HarveyUsageRecord>,
    pub copilot: Vec<CopilotUsageRecord>,
    pub qualtrics: Vec<QualtricsUsageRecord>,
}

/// Flattened per-commit record; the unit both `/research/dataset` serves and replay-mode
/// corpora are made of.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchDataPoint {
    pub commit_hash: String,
    pub pr_number: Option<u32>,
    pub author_id: String,
    pub ai_ratio: f64,
    pub additions: u32,
    pub deletions: u32,
    pub coding_lead_time_hours: f64,
    pub review_lead_time_hours: f64,
    pub review_iterations: u32,
    pub was_reverted: bool,
    pub required_hotfix: bool,
    pub pr_merged: bool,
    pub timestamp: DateTime<Utc>,
}

/// The `[0,0.30) / [0.30,0.70) / [0.70,1.0]` partition of `ai_ratio` used by research metrics
/// and replay-mode corpus indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Band {
    L,
    M,
    H,
}

impl Band {
    pub fn of(ai_ratio: f64) -> Band {
        if ai_ratio < 0.30 {
            Band::L
        } else if ai_ratio < 0.70 {
            Band::M
        } else {
            Band::H
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Band::L => write!(f, "L"),
            Band::M => write!(f, "M"),
            Band::H => write!(f, "H"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ai_ratio_is_zero_for_empty_commit() {
        let c = Commit {
            hash: "a".repeat(40),
            author_id: "dev-1".into(),
            repo_id: "repo-1".into(),
            branch: "main".into(),
            timestamp: Utc::now(),
            message: "empty".into(),
            tab_added: 0,
            tab_deleted: 0,
            composer_added: 0,
            composer_deleted: 0,
            non_ai_added: 0,
            non_ai_deleted: 0,
        };
        assert_eq!(c.ai_ratio(), 0.0);
    }

    #[test]
    fn ai_ratio_bounds() {
        let c = Commit {
            hash: "b".repeat(40),
            author_id: "dev-1".into(),
            repo_id: "repo-1".into(),
            branch: "main".into(),
            timestamp: Utc::now(),
            message: "mixed".into(),
            tab_added: 30,
            tab_deleted: 0,
            composer_added: 20,
            composer_deleted: 0,
            non_ai_added: 50,
            non_ai_deleted: 0,
        };
        assert!((c.ai_ratio() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn band_boundaries() {
        assert_eq!(Band::of(0.0), Band::L);
        assert_eq!(Band::of(0.29), Band::L);
        assert_eq!(Band::of(0.30), Band::M);
        assert_eq!(Band::of(0.69), Band::M);
        assert_eq!(Band::of(0.70), Band::H);
        assert_eq!(Band::of(1.0), Band::H);
    }
}
