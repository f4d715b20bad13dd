//! Stage 5: for ~40% of merged PRs, an Issue is generated with `created_at` 1-7 days prior
//! to the PR and closed at merge time; a further configurable fraction of issues are
//! generated standalone and remain permanently open.

use crate::models::{Issue, IssueState, PrState, PullRequest};
use crate::rng::RootSeed;
use crate::temporal::TemporalCoordinator;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

const MERGED_PR_ISSUE_RATE: f64 = 0.40;
const ALWAYS_OPEN_FRACTION: f64 = 0.10;

const LABEL_POOL: &[&str] = &["bug", "feature", "enhancement", "documentation"];

pub fn generate(
    prs: &[PullRequest],
    generation_start: DateTime<Utc>,
    root_seed: RootSeed,
) -> Vec<Issue> {
    let coordinator = TemporalCoordinator::new(generation_start);
    let mut issues = Vec::new();
    let mut number_per_repo: std::collections::HashMap<String, u32> = std::collections::HashMap::new();

    let merged: Vec<&PullRequest> = {
        let mut v: Vec<&PullRequest> = prs.iter().filter(|p| p.state == PrState::Merged).collect();
        v.sort_by(|a, b| a.id.cmp(&b.id));
        v
    };

    for (pr_index, pr) in merged.iter().enumerate() {
        let mut rng = root_seed.child_rng("issue", pr_index as u64);
        if !rng.gen_bool(MERGED_PR_ISSUE_RATE) {
            continue;
        }

        let merged_at = pr.merged_at.expect("filtered to merged PRs");
        let lead_days = rng.gen_range(1..=7);
        let created_at = (pr.created_at - Duration::days(lead_days)).min(pr.created_at - Duration::seconds(1));

        let number = next_number(&mut number_per_repo, &pr.repo_id);
        issues.push(Issue {
            id: Uuid::new_v4().to_string(),
            repo_id: pr.repo_id.clone(),
            number,
            title: format!("Fix regression closed by PR #{}", pr.number),
            body: "Reported by automated triage.".to_string(),
            author_id: pr.author_id.clone(),
            labels: random_labels(&mut rng),
            state: IssueState::Closed,
            created_at,
            closed_at: Some(merged_at),
            closed_by_pr: Some(pr.id.clone()),
        });
    }

    // A separate stream of always-open issues, independent of PR activity.
    let mut rng = root_seed.child_rng("standalone-issue", 0);
    let standalone_count = (prs.len() as f64 * ALWAYS_OPEN_FRACTION).round() as usize;
    let fallback_repo = prs.first().map(|p| p.repo_id.clone());
    if let Some(repo_id) = fallback_repo {
        for _ in 0..standalone_count {
            let number = next_number(&mut number_per_repo, &repo_id);
            let created_at = coordinator.clamp_not_future(generation_start - Duration::days(rng.gen_range(1..60)));
            issues.push(Issue {
                id: Uuid::new_v4().to_string(),
                repo_id: repo_id.clone(),
                number,
                title: "Standing feature request".to_string(),
                body: "Tracked for future planning.".to_string(),
                author_id: String::new(),
                labels: random_labels(&mut rng),
                state: IssueState::Open,
                created_at,
                closed_at: None,
                closed_by_pr: None,
            });
        }
    }

    issues
}

fn next_number(counter: &mut std::collections::HashMap<String, u32>, repo_id: &str) -> u32 {
    let entry = counter.entry(repo_id.to_string()).or_insert(0);
    *entry += 1;
    *entry
}

fn random_labels(rng: &mut ChaCha8Rng) -> Vec<String> {
    let n = rng.gen_range(1..=2);
    let mut labels: Vec<String> = Vec::new();
    while labels.len() < n {
        let candidate = LABEL_POOL[rng.gen_range(0..LABEL_POOL.len())].to_string();
        if !labels.contains(&candidate) {
            labels.push(candidate);
        }
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merged_pr(id: &str, number: u32) -> PullRequest {
        let now = Utc::now();
        PullRequest {
            id: id.into(),
            repo_id: "repo-1".into(),
            number,
            title: "fix".into(),
            state: PrState::Merged,
            author_id: "alice".into(),
            head_branch: "feature/x".into(),
            base_branch: "main".into(),
            created_at: now - Duration::days(3),
            updated_at: now,
            merged_at: Some(now),
            closed_at: None,
            commit_hashes: vec![],
            ai_ratio: 0.5,
            additions: 5,
            deletions: 1,
            was_reverted: false,
            is_bug_fix: true,
            is_hotfix: false,
        }
    }

    #[test]
    fn closed_issues_precede_their_closing_pr() {
        let prs: Vec<PullRequest> = (0..20).map(|i| merged_pr(&format!("pr-{i}"), i)).collect();
        let issues = generate(&prs, Utc::now(), RootSeed(3));
        for issue in issues.iter().filter(|i| i.closed_by_pr.is_some()) {
            let pr = prs.iter().find(|p| Some(p.id.clone()) == issue.closed_by_pr).unwrap();
            assert!(issue.created_at < pr.created_at);
            assert_eq!(issue.closed_at, pr.merged_at);
        }
    }
}
