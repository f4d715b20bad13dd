//! Stage 4: for each PR, 1-3 reviewers (≈50/35/15%) sampled uniformly from developers other
//! than the author; each reviewer produces a review with state drawn from the 70/20/10
//! distribution and a `submitted_at` uniform over the PR's active window. Non-approval
//! reviews get a body and 0-5 inline comments with synthetic file paths and line numbers.

use crate::models::{InlineComment, PullRequest, Review, ReviewState};
use crate::rng::RootSeed;
use crate::seed::DistributionOverrides;
use crate::temporal::TemporalCoordinator;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

const DEFAULT_REVIEWER_COUNT: [f64; 3] = [0.50, 0.35, 0.15];
const DEFAULT_REVIEW_STATE: [f64; 3] = [0.70, 0.20, 0.10];

const FILE_PATHS: &[&str] = &[
    "src/lib.rs",
    "src/main.rs",
    "src/handlers/mod.rs",
    "src/store.rs",
    "src/config.rs",
    "tests/integration.rs",
];

const REVIEW_COMMENTS: &[&str] = &[
    "Consider extracting this into a helper.",
    "This could panic on empty input.",
    "Nit: rename this variable.",
    "Looks good, but please add a test.",
    "Can this allocate less?",
];

pub fn generate(
    prs: &[PullRequest],
    developer_ids: &[String],
    generation_start: DateTime<Utc>,
    distributions: &DistributionOverrides,
    root_seed: RootSeed,
) -> Vec<Review> {
    let coordinator = TemporalCoordinator::new(generation_start);
    let reviewer_count_weights = distributions.reviewer_count.unwrap_or(DEFAULT_REVIEWER_COUNT);
    let state_weights = distributions.review_state.unwrap_or(DEFAULT_REVIEW_STATE);

    let mut reviews = Vec::new();

    for (pr_index, pr) in prs.iter().enumerate() {
        let mut rng = root_seed.child_rng("review", pr_index as u64);

        let candidates: Vec<&String> = developer_ids.iter().filter(|id| id.as_str() != pr.author_id).collect();
        if candidates.is_empty() {
            continue;
        }

        let reviewer_count = sample_reviewer_count(&mut rng, reviewer_count_weights).min(candidates.len());
        let mut pool = candidates;
        pool.shuffle(&mut rng);

        let window_start = pr.created_at;
        let window_end = pr.active_window_end();

        for reviewer_id in pool.into_iter().take(reviewer_count) {
            let state = sample_state(&mut rng, state_weights);
            let submitted_at = coordinator.at_or_before(
                coordinator.at_or_after(random_time_in_window(&mut rng, window_start, window_end), window_start),
                window_end,
            );

            let comments = if state == ReviewState::Approved {
                Vec::new()
            } else {
                let n = rng.gen_range(0..=5);
                (0..n).map(|_| random_inline_comment(&mut rng)).collect()
            };

            let body = match state {
                ReviewState::Approved => "LGTM".to_string(),
                ReviewState::ChangesRequested => "Please address the comments before merging.".to_string(),
                ReviewState::Commented => "A few thoughts, nothing blocking.".to_string(),
            };

            reviews.push(Review {
                id: Uuid::new_v4().to_string(),
                pr_id: pr.id.clone(),
                reviewer_id: reviewer_id.clone(),
                state,
                body,
                submitted_at,
                comments,
            });
        }
    }

    reviews
}

fn sample_reviewer_count(rng: &mut ChaCha8Rng, weights: [f64; 3]) -> usize {
    let roll: f64 = rng.gen();
    if roll < weights[0] {
        1
    } else if roll < weights[0] + weights[1] {
        2
    } else {
        3
    }
}

fn sample_state(rng: &mut ChaCha8Rng, weights: [f64; 3]) -> ReviewState {
    let roll: f64 = rng.gen();
    if roll < weights[0] {
        ReviewState::Approved
    } else if roll < weights[0] + weights[1] {
        ReviewState::ChangesRequested
    } else {
        ReviewState::Commented
    }
}

fn random_time_in_window(rng: &mut ChaCha8Rng, start: DateTime<Utc>, end: DateTime<Utc>) -> DateTime<Utc> {
    let span = (end - start).num_seconds().max(1);
    start + chrono::Duration::seconds(rng.gen_range(0..=span))
}

fn random_inline_comment(rng: &mut ChaCha8Rng) -> InlineComment {
    InlineComment {
        file_path: FILE_PATHS[rng.gen_range(0..FILE_PATHS.len())].to_string(),
        line: rng.gen_range(1..400),
        body: REVIEW_COMMENTS[rng.gen_range(0..REVIEW_COMMENTS.len())].to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PrState;

    fn sample_pr(author: &str) -> PullRequest {
        let now = Utc::now();
        PullRequest {
            id: "pr-1".into(),
            repo_id: "repo-1".into(),
            number: 1,
            title: "fix thing".into(),
            state: PrState::Merged,
            author_id: author.into(),
            head_branch: "feature/x".into(),
            base_branch: "main".into(),
            created_at: now - chrono::Duration::days(2),
            updated_at: now,
            merged_at: Some(now),
            closed_at: None,
            commit_hashes: vec![],
            ai_ratio: 0.5,
            additions: 10,
            deletions: 2,
            was_reverted: false,
            is_bug_fix: true,
            is_hotfix: false,
        }
    }

    #[test]
    fn reviewer_is_never_the_author() {
        let pr = sample_pr("alice");
        let developer_ids = vec!["alice".to_string(), "bob".to_string(), "carol".to_string()];
        let reviews = generate(&[pr], &developer_ids, Utc::now(), &DistributionOverrides::default(), RootSeed(5));
        for r in &reviews {
            assert_ne!(r.reviewer_id, "alice");
        }
    }

    #[test]
    fn submitted_at_falls_within_pr_window() {
        let pr = sample_pr("alice");
        let developer_ids = vec!["alice".to_string(), "bob".to_string()];
        let reviews = generate(&[pr.clone()], &developer_ids, Utc::now(), &DistributionOverrides::default(), RootSeed(9));
        for r in &reviews {
            assert!(r.submitted_at >= pr.created_at);
            assert!(r.submitted_at <= pr.active_window_end());
        }
    }
}
