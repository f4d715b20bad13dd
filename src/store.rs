//! In-Memory Store (C4).
//!
//! Owns every entity the generation pipeline produces, indexed multiple ways for the query
//! patterns the HTTP layer needs. `StoreInner` is a plain, cloneable value; `Store` wraps it
//! in `Arc<RwLock<Arc<StoreInner>>>` so that `override` regenerate can build a complete
//! replacement off the lock and then swap the root pointer in one write — readers never
//! observe a half-cleared store, only the pre- or post-state (spec §5's "versioned root
//! swap"). `append` regenerate clones the current version, mutates the clone, and swaps it
//! in the same way, so both modes share one atomic-commit discipline.

use crate::error::{CursorSimError, Result};
use crate::models::{
    Commit, Developer, ExternalUsage, Issue, IssueState, PrState, PullRequest, Region, Repository,
    Review,
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

/// Optional per-kind caps; exceeding one on insert raises `ResourceExhausted` rather than
/// silently growing the store without bound.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreLimits {
    pub max_developers: Option<usize>,
    pub max_commits: Option<usize>,
    pub max_pull_requests: Option<usize>,
    pub max_reviews: Option<usize>,
    pub max_issues: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct StoreInner {
    pub developers: HashMap<String, Developer>,
    pub repositories: HashMap<String, Repository>,
    pub commits: HashMap<String, Commit>,
    pub pull_requests: HashMap<String, PullRequest>,
    pub reviews: HashMap<String, Review>,
    pub issues: HashMap<String, Issue>,
    pub external_usage: ExternalUsage,

    developer_by_email: HashMap<String, String>,
    developer_by_team: HashMap<String, Vec<String>>,
    developer_by_region: HashMap<Region, Vec<String>>,

    commit_by_developer: HashMap<String, Vec<String>>,
    commit_by_timestamp: BTreeMap<DateTime<Utc>, Vec<String>>,

    pr_by_repo_number: HashMap<(String, u32), String>,
    pr_by_author: HashMap<String, Vec<String>>,
    pr_by_state: HashMap<PrState, Vec<String>>,

    review_by_pr: HashMap<String, Vec<String>>,
    review_by_reviewer: HashMap<String, Vec<String>>,

    issue_by_repo_number: HashMap<(String, u32), String>,
    issue_by_state: HashMap<IssueState, Vec<String>>,

    pub limits: StoreLimits,
}

impl StoreInner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: StoreLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    // ---- developers ----------------------------------------------------

    pub fn insert_developers(&mut self, developers: Vec<Developer>) -> Result<()> {
        if let Some(max) = self.limits.max_developers {
            if self.developers.len() + developers.len() > max {
                return Err(CursorSimError::ResourceExhausted(format!(
                    "developer limit {max} exceeded"
                )));
            }
        }
        for d in &developers {
            if self.developers.contains_key(&d.id) {
                return Err(CursorSimError::Conflict(format!(
                    "duplicate developer id {}",
                    d.id
                )));
            }
        }
        for d in developers {
            self.developer_by_email.insert(d.email.clone(), d.id.clone());
            self.developer_by_team
                .entry(d.team.clone())
                .or_default()
                .push(d.id.clone());
            self.developer_by_region.entry(d.region).or_default().push(d.id.clone());
            self.developers.insert(d.id.clone(), d);
        }
        Ok(())
    }

    pub fn developer(&self, id: &str) -> Option<&Developer> {
        self.developers.get(id)
    }

    /// `user` filters match by email OR stable developer id, per spec §4.7.
    pub fn find_developer_by_user(&self, user: &str) -> Option<&Developer> {
        self.developer_by_email
            .get(user)
            .and_then(|id| self.developers.get(id))
            .or_else(|| self.developers.get(user))
    }

    pub fn developers_by_team(&self, team: &str) -> Vec<&Developer> {
        self.developer_by_team
            .get(team)
            .into_iter()
            .flatten()
            .filter_map(|id| self.developers.get(id))
            .collect()
    }

    pub fn developers_by_region(&self, region: Region) -> Vec<&Developer> {
        self.developer_by_region
            .get(&region)
            .into_iter()
            .flatten()
            .filter_map(|id| self.developers.get(id))
            .collect()
    }

    // ---- repositories ----------------------------------------------------

    pub fn insert_repositories(&mut self, repos: Vec<Repository>) -> Result<()> {
        for r in &repos {
            if self.repositories.contains_key(&r.id) {
                return Err(CursorSimError::Conflict(format!(
                    "duplicate repository id {}",
                    r.id
                )));
            }
        }
        for r in repos {
            self.repositories.insert(r.id.clone(), r);
        }
        Ok(())
    }

    pub fn repository(&self, id: &str) -> Option<&Repository> {
        self.repositories.get(id)
    }

    // ---- commits ----------------------------------------------------

    pub fn insert_commits(&mut self, commits: Vec<Commit>) -> Result<()> {
        if let Some(max) = self.limits.max_commits {
            if self.commits.len() + commits.len() > max {
                return Err(CursorSimError::ResourceExhausted(format!(
                    "commit limit {max} exceeded"
                )));
            }
        }
        for c in &commits {
            if self.commits.contains_key(&c.hash) {
                return Err(CursorSimError::Conflict(format!(
                    "duplicate commit hash {}",
                    c.hash
                )));
            }
        }
        for c in commits {
            self.commit_by_developer
                .entry(c.author_id.clone())
                .or_default()
                .push(c.hash.clone());
            self.commit_by_timestamp
                .entry(c.timestamp)
                .or_default()
                .push(c.hash.clone());
            self.commits.insert(c.hash.clone(), c);
        }
        Ok(())
    }

    pub fn commit(&self, hash: &str) -> Option<&Commit> {
        self.commits.get(hash)
    }

    pub fn commits_by_developer(&self, developer_id: &str) -> Vec<&Commit> {
        self.commit_by_developer
            .get(developer_id)
            .into_iter()
            .flatten()
            .filter_map(|h| self.commits.get(h))
            .collect()
    }

    /// O(log n + k): walks only the `BTreeMap` range covering `[start, end]`.
    pub fn commits_in_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<&Commit> {
        self.commit_by_timestamp
            .range(start..=end)
            .flat_map(|(_, hashes)| hashes.iter())
            .filter_map(|h| self.commits.get(h))
            .collect()
    }

    // ---- pull requests ----------------------------------------------------

    pub fn insert_pull_requests(&mut self, prs: Vec<PullRequest>) -> Result<()> {
        if let Some(max) = self.limits.max_pull_requests {
            if self.pull_requests.len() + prs.len() > max {
                return Err(CursorSimError::ResourceExhausted(format!(
                    "pull request limit {max} exceeded"
                )));
            }
        }
        for p in &prs {
            if self.pull_requests.contains_key(&p.id) {
                return Err(CursorSimError::Conflict(format!("duplicate PR id {}", p.id)));
            }
        }
        for p in prs {
            self.pr_by_repo_number
                .insert((p.repo_id.clone(), p.number), p.id.clone());
            self.pr_by_author.entry(p.author_id.clone()).or_default().push(p.id.clone());
            self.pr_by_state.entry(p.state).or_default().push(p.id.clone());
            self.pull_requests.insert(p.id.clone(), p);
        }
        Ok(())
    }

    pub fn pull_request(&self, id: &str) -> Option<&PullRequest> {
        self.pull_requests.get(id)
    }

    pub fn pull_request_by_repo_number(&self, repo_id: &str, number: u32) -> Option<&PullRequest> {
        self.pr_by_repo_number
            .get(&(repo_id.to_string(), number))
            .and_then(|id| self.pull_requests.get(id))
    }

    pub fn pull_requests_by_author(&self, author_id: &str) -> Vec<&PullRequest> {
        self.pr_by_author
            .get(author_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.pull_requests.get(id))
            .collect()
    }

    pub fn pull_requests_by_state(&self, state: PrState) -> Vec<&PullRequest> {
        self.pr_by_state
            .get(&state)
            .into_iter()
            .flatten()
            .filter_map(|id| self.pull_requests.get(id))
            .collect()
    }

    pub fn pull_requests_by_repo(&self, repo_id: &str) -> Vec<&PullRequest> {
        self.pull_requests.values().filter(|p| p.repo_id == repo_id).collect()
    }

    // ---- reviews ----------------------------------------------------

    pub fn insert_reviews(&mut self, reviews: Vec<Review>) -> Result<()> {
        if let Some(max) = self.limits.max_reviews {
            if self.reviews.len() + reviews.len() > max {
                return Err(CursorSimError::ResourceExhausted(format!(
                    "review limit {max} exceeded"
                )));
            }
        }
        for r in &reviews {
            if self.reviews.contains_key(&r.id) {
                return Err(CursorSimError::Conflict(format!("duplicate review id {}", r.id)));
            }
        }
        for r in reviews {
            self.review_by_pr.entry(r.pr_id.clone()).or_default().push(r.id.clone());
            self.review_by_reviewer
                .entry(r.reviewer_id.clone())
                .or_default()
                .push(r.id.clone());
            self.reviews.insert(r.id.clone(), r);
        }
        Ok(())
    }

    pub fn reviews_by_pr(&self, pr_id: &str) -> Vec<&Review> {
        self.review_by_pr
            .get(pr_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.reviews.get(id))
            .collect()
    }

    pub fn reviews_by_reviewer(&self, reviewer_id: &str) -> Vec<&Review> {
        self.review_by_reviewer
            .get(reviewer_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.reviews.get(id))
            .collect()
    }

    // ---- issues ----------------------------------------------------

    pub fn insert_issues(&mut self, issues: Vec<Issue>) -> Result<()> {
        if let Some(max) = self.limits.max_issues {
            if self.issues.len() + issues.len() > max {
                return Err(CursorSimError::ResourceExhausted(format!(
                    "issue limit {max} exceeded"
                )));
            }
        }
        for i in &issues {
            if self.issues.contains_key(&i.id) {
                return Err(CursorSimError::Conflict(format!("duplicate issue id {}", i.id)));
            }
        }
        for i in issues {
            self.issue_by_repo_number
                .insert((i.repo_id.clone(), i.number), i.id.clone());
            self.issue_by_state.entry(i.state).or_default().push(i.id.clone());
            self.issues.insert(i.id.clone(), i);
        }
        Ok(())
    }

    pub fn issues_by_state(&self, state: IssueState) -> Vec<&Issue> {
        self.issue_by_state
            .get(&state)
            .into_iter()
            .flatten()
            .filter_map(|id| self.issues.get(id))
            .collect()
    }

    // ---- external usage ----------------------------------------------------

    pub fn append_external_usage(&mut self, usage: ExternalUsage) {
        self.external_usage.harvey.extend(usage.harvey);
        self.external_usage.copilot.extend(usage.copilot);
        self.external_usage.qualtrics.extend(usage.qualtrics);
    }

    // ---- observability ----------------------------------------------------

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            developers: self.developers.len(),
            repositories: self.repositories.len(),
            commits: self.commits.len(),
            pull_requests: self.pull_requests.len(),
            reviews: self.reviews.len(),
            issues: self.issues.len(),
            approx_bytes: self.approx_byte_estimate(),
        }
    }

    /// Rough estimate, not an exact measurement: a handful of bytes per scalar field times
    /// entity counts, enough to give `/admin/stats` a sense of the store's footprint.
    fn approx_byte_estimate(&self) -> usize {
        self.developers.len() * 256
            + self.repositories.len() * 128
            + self.commits.len() * 192
            + self.pull_requests.len() * 256
            + self.reviews.len() * 192
            + self.issues.len() * 192
    }

    /// Reports dangling references, duplicate ids (which insert already prevents, so this
    /// only reports cross-version inconsistencies after an `append`), and invariant breaks.
    /// Read-only; never mutates.
    pub fn verify_consistency(&self) -> Vec<String> {
        let mut violations = Vec::new();

        for commit in self.commits.values() {
            if !self.developers.contains_key(&commit.author_id) {
                violations.push(format!(
                    "commit {} references unknown developer {}",
                    commit.hash, commit.author_id
                ));
            }
            if !self.repositories.contains_key(&commit.repo_id) {
                violations.push(format!(
                    "commit {} references unknown repository {}",
                    commit.hash, commit.repo_id
                ));
            }
        }

        for pr in self.pull_requests.values() {
            if !self.developers.contains_key(&pr.author_id) {
                violations.push(format!("PR {} references unknown developer {}", pr.id, pr.author_id));
            }
            for hash in &pr.commit_hashes {
                if !self.commits.contains_key(hash) {
                    violations.push(format!("PR {} references unknown commit {}", pr.id, hash));
                }
            }
            if pr.state == PrState::Merged && pr.merged_at.is_none() {
                violations.push(format!("PR {} is merged but has no merged_at", pr.id));
            }
            if pr.state != PrState::Merged && pr.merged_at.is_some() {
                violations.push(format!("PR {} has merged_at but state is {}", pr.id, pr.state));
            }
        }

        for review in self.reviews.values() {
            match self.pull_requests.get(&review.pr_id) {
                None => violations.push(format!(
                    "review {} references unknown PR {}",
                    review.id, review.pr_id
                )),
                Some(pr) if pr.author_id == review.reviewer_id => violations.push(format!(
                    "review {} has reviewer equal to PR author {}",
                    review.id, pr.author_id
                )),
                _ => {}
            }
        }

        for issue in self.issues.values() {
            if let Some(pr_id) = &issue.closed_by_pr {
                if !self.pull_requests.contains_key(pr_id) {
                    violations.push(format!(
                        "issue {} references unknown closing PR {}",
                        issue.id, pr_id
                    ));
                }
            }
        }

        violations
    }
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct StoreStats {
    pub developers: usize,
    pub repositories: usize,
    pub commits: usize,
    pub pull_requests: usize,
    pub reviews: usize,
    pub issues: usize,
    pub approx_bytes: usize,
}

/// Thread-safe handle over a versioned `StoreInner`. Cloning a `Store` is cheap (it clones
/// the `Arc`s, not the data); every clone shares the same underlying state.
#[derive(Clone)]
pub struct Store {
    inner: Arc<RwLock<Arc<StoreInner>>>,
}

impl Store {
    pub fn empty() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(StoreInner::new()))),
        }
    }

    pub fn from_inner(inner: StoreInner) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(inner))),
        }
    }

    /// A consistent, immutable view of the store at this instant. Callers should read from
    /// the snapshot and drop it promptly rather than holding it across request boundaries.
    pub fn snapshot(&self) -> Arc<StoreInner> {
        self.inner
            .read()
            .expect("store lock poisoned")
            .clone()
    }

    /// `override` regenerate: install a wholly new version. Readers see either the old or
    /// the new version, never a mix.
    pub fn replace(&self, new_inner: StoreInner) {
        let mut guard = self.inner.write().expect("store lock poisoned");
        *guard = Arc::new(new_inner);
    }

    /// `append` regenerate (and any other incremental batch write): clones the current
    /// version, applies `mutate`, and swaps the clone in atomically. If `mutate` fails the
    /// lock is released with the store unchanged.
    pub fn append<F>(&self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut StoreInner) -> Result<()>,
    {
        let mut guard = self.inner.write().expect("store lock poisoned");
        let mut next = (**guard).clone();
        mutate(&mut next)?;
        *guard = Arc::new(next);
        Ok(())
    }
}
