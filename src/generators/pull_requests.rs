//! Stage 3: commits are bucketed per author by temporal proximity (24-48h windows) into
//! groups of 3-10; ~60% of commits flow into PRs, the rest land direct-to-main and never
//! appear in a PR's `commit_hashes`. Each PR gets a status from an 85/10/5 distribution and,
//! if merged, a merge time drawn from `Exponential(λ≈1/3 days)` clamped to ≤7 days.

use crate::models::{Commit, Developer, PrState, PullRequest};
use crate::rng::RootSeed;
use crate::seed::DistributionOverrides;
use crate::temporal::TemporalCoordinator;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Exp};
use uuid::Uuid;

const DEFAULT_PR_STATUS: [f64; 3] = [0.85, 0.10, 0.05];
const MIN_GROUP_SIZE: usize = 3;
const MAX_GROUP_SIZE: usize = 10;
const GROUP_WINDOW_HOURS: i64 = 48;
const PR_FLOW_PROBABILITY: f64 = 0.60;

pub fn generate(
    commits: &[Commit],
    developers: &[Developer],
    generation_start: DateTime<Utc>,
    distributions: &DistributionOverrides,
    root_seed: RootSeed,
) -> Vec<PullRequest> {
    let coordinator = TemporalCoordinator::new(generation_start);
    let status_weights = distributions.pr_status.unwrap_or(DEFAULT_PR_STATUS);

    let mut prs = Vec::new();
    let mut next_number_per_repo: std::collections::HashMap<String, u32> = std::collections::HashMap::new();

    for (dev_index, dev) in developers.iter().enumerate() {
        let mut rng = root_seed.child_rng("pull-request", dev_index as u64);

        let mut by_repo: std::collections::HashMap<String, Vec<&Commit>> = std::collections::HashMap::new();
        for c in commits.iter().filter(|c| c.author_id == dev.id) {
            by_repo.entry(c.repo_id.clone()).or_default().push(c);
        }

        let mut repo_ids: Vec<String> = by_repo.keys().cloned().collect();
        repo_ids.sort();

        for repo_id in repo_ids {
            let mut author_commits = by_repo.remove(&repo_id).expect("key came from this map");
            author_commits.sort_by_key(|c| c.timestamp);

            let flowing: Vec<&Commit> = author_commits
                .into_iter()
                .filter(|_| rng.gen_bool(PR_FLOW_PROBABILITY))
                .collect();

            for group in bucket_into_groups(&flowing, &mut rng) {
                let number = {
                    let counter = next_number_per_repo.entry(repo_id.clone()).or_insert(0);
                    *counter += 1;
                    *counter
                };

                prs.push(build_pull_request(
                    &mut rng,
                    dev,
                    &repo_id,
                    number,
                    &group,
                    &coordinator,
                    status_weights,
                ));
            }
        }
    }

    prs
}

fn bucket_into_groups<'a>(commits: &[&'a Commit], rng: &mut ChaCha8Rng) -> Vec<Vec<&'a Commit>> {
    let mut groups = Vec::new();
    let mut current: Vec<&Commit> = Vec::new();
    let mut target_size = rng.gen_range(MIN_GROUP_SIZE..=MAX_GROUP_SIZE);

    for &commit in commits {
        let exceeds_window = current
            .first()
            .map(|first| (commit.timestamp - first.timestamp) > Duration::hours(GROUP_WINDOW_HOURS))
            .unwrap_or(false);

        if current.len() >= target_size || exceeds_window {
            if !current.is_empty() {
                groups.push(std::mem::take(&mut current));
            }
            target_size = rng.gen_range(MIN_GROUP_SIZE..=MAX_GROUP_SIZE);
        }
        current.push(commit);
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

fn build_pull_request(
    rng: &mut ChaCha8Rng,
    author: &Developer,
    repo_id: &str,
    number: u32,
    commits: &[&Commit],
    coordinator: &TemporalCoordinator,
    status_weights: [f64; 3],
) -> PullRequest {
    let last_commit_ts = commits.iter().map(|c| c.timestamp).max().expect("group is non-empty");
    let created_at = coordinator.strictly_after(last_commit_ts + Duration::minutes(30), last_commit_ts);

    let state = sample_status(rng, status_weights);

    let (merged_at, closed_at) = match state {
        PrState::Merged => {
            let exp = Exp::new(1.0 / 3.0).expect("valid exponential rate");
            let days: f64 = Distribution::<f64>::sample(&exp, rng).min(7.0);
            let merged = coordinator.at_or_after(created_at + Duration::seconds((days * 86400.0) as i64), created_at);
            (Some(merged), None)
        }
        PrState::Closed => {
            let days = rng.gen_range(0.5..5.0);
            let closed = coordinator.at_or_after(created_at + Duration::seconds((days * 86400.0) as i64), created_at);
            (None, Some(closed))
        }
        PrState::Open => (None, None),
    };

    let total_added: u32 = commits.iter().map(|c| c.total_added()).sum();
    let total_deleted: u32 = commits.iter().map(|c| c.total_deleted()).sum();
    let ai_ratio = commits.iter().map(|c| c.ai_ratio()).sum::<f64>() / commits.len() as f64;

    let first_message = &commits[0].message;
    let branch_prefix = if first_message.starts_with("fix") { "bugfix" } else { "feature" };
    let slug = first_message.replace(' ', "-");

    let is_bug_fix = first_message.starts_with("fix");
    let is_hotfix = is_bug_fix && matches!(state, PrState::Merged) && rng.gen_bool(0.1);
    let was_reverted = matches!(state, PrState::Merged) && rng.gen_bool(0.03);

    PullRequest {
        id: Uuid::new_v4().to_string(),
        repo_id: repo_id.to_string(),
        number,
        title: capitalize(first_message),
        state,
        author_id: author.id.clone(),
        head_branch: format!("{branch_prefix}/{slug}"),
        base_branch: "main".to_string(),
        created_at,
        updated_at: merged_at.or(closed_at).unwrap_or(created_at),
        merged_at,
        closed_at,
        commit_hashes: commits.iter().map(|c| c.hash.clone()).collect(),
        ai_ratio,
        additions: total_added,
        deletions: total_deleted,
        was_reverted,
        is_bug_fix,
        is_hotfix,
    }
}

fn sample_status(rng: &mut ChaCha8Rng, weights: [f64; 3]) -> PrState {
    let roll: f64 = rng.gen();
    if roll < weights[0] {
        PrState::Merged
    } else if roll < weights[0] + weights[1] {
        PrState::Closed
    } else {
        PrState::Open
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::{commits, developers};
    use crate::config::Velocity;
    use crate::models::Repository;
    use crate::seed::synthesize_default_roster;

    fn repos() -> Vec<Repository> {
        vec![Repository {
            id: "repo-1".into(),
            owner: "acme".into(),
            name: "main".into(),
            default_branch: "main".into(),
            language: "rust".into(),
            size_kb: 1000,
            created_at: Utc::now() - Duration::days(400),
            updated_at: Utc::now(),
        }]
    }

    #[test]
    fn merged_prs_have_merged_at_and_others_do_not() {
        let developers = developers::generate(synthesize_default_roster(3));
        let now = Utc::now();
        let outcome = commits::generate(&developers, &repos(), 30, Velocity::High, 0, now, RootSeed(11));
        let prs = generate(&outcome.commits, &developers, now, &DistributionOverrides::default(), RootSeed(11));
        for pr in &prs {
            match pr.state {
                PrState::Merged => assert!(pr.merged_at.is_some()),
                _ => assert!(pr.merged_at.is_none()),
            }
        }
    }

    #[test]
    fn pr_created_at_is_after_its_commits() {
        let developers = developers::generate(synthesize_default_roster(2));
        let now = Utc::now();
        let outcome = commits::generate(&developers, &repos(), 20, Velocity::High, 0, now, RootSeed(3));
        let prs = generate(&outcome.commits, &developers, now, &DistributionOverrides::default(), RootSeed(3));
        for pr in &prs {
            let last_commit = pr
                .commit_hashes
                .iter()
                .filter_map(|h| outcome.commits.iter().find(|c| &c.hash == h))
                .map(|c| c.timestamp)
                .max()
                .unwrap();
            assert!(pr.created_at >= last_commit);
        }
    }
}
