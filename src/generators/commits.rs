//! Stage 2: for each developer, an inhomogeneous Poisson process over `days` of history,
//! rate-modulated by velocity, the developer's own events-per-day mean, and a weekday/
//! weekend pattern. Line deltas are fat-tailed; the AI-vs-non-AI split comes from the
//! developer's TAB/Composer ratio with noise. A global `max_commits` cap (0 = unlimited)
//! truncates the merged, time-sorted output and is logged, not treated as an error.

use crate::config::Velocity;
use crate::models::{Commit, Developer, Repository};
use crate::rng::RootSeed;
use crate::temporal::TemporalCoordinator;
use chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal, Poisson};

pub struct CommitGenerationOutcome {
    pub commits: Vec<Commit>,
    pub early_halt: bool,
}

pub fn generate(
    developers: &[Developer],
    repos: &[Repository],
    days: u32,
    velocity: Velocity,
    max_commits: u32,
    generation_start: DateTime<Utc>,
    root_seed: RootSeed,
) -> CommitGenerationOutcome {
    assert!(!repos.is_empty(), "generation requires at least one repository");
    let coordinator = TemporalCoordinator::new(generation_start);
    let window_start = generation_start - Duration::days(days as i64);

    let mut all_commits = Vec::new();

    for (dev_index, dev) in developers.iter().enumerate() {
        let home_repo = &repos[dev_index % repos.len()];
        let mut rng = root_seed.developer_rng(dev_index);
        let mut last_ts = window_start;

        for day_offset in 0..days {
            let date = window_start + Duration::days(day_offset as i64);
            let weekday_factor = match date.weekday() {
                Weekday::Sat | Weekday::Sun => 0.3,
                _ => 1.0,
            };
            let lambda = (velocity.multiplier() * dev.params.events_per_day_mean * weekday_factor).max(0.0001);
            let count = Poisson::new(lambda)
                .map(|p| p.sample(&mut rng) as u32)
                .unwrap_or(0);

            for _ in 0..count {
                let candidate = sample_timestamp_in_working_hours(&mut rng, date, dev.params.working_hours_start, dev.params.working_hours_end, dev.params.peak_hour);
                let ts = coordinator.strictly_after(candidate, last_ts);
                last_ts = ts;
                all_commits.push(build_commit(&mut rng, dev, home_repo, ts));
            }
        }
    }

    all_commits.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.hash.cmp(&b.hash)));

    let early_halt = max_commits != 0 && all_commits.len() as u32 > max_commits;
    if early_halt {
        tracing::warn!(
            generated = all_commits.len(),
            cap = max_commits,
            "max_commits reached; halting commit generation early"
        );
        all_commits.truncate(max_commits as usize);
    }

    CommitGenerationOutcome {
        commits: all_commits,
        early_halt,
    }
}

fn sample_timestamp_in_working_hours(
    rng: &mut ChaCha8Rng,
    date: DateTime<Utc>,
    start_hour: u8,
    end_hour: u8,
    peak_hour: u8,
) -> DateTime<Utc> {
    let span = (end_hour.max(start_hour + 1) - start_hour) as f64;
    let normal = Normal::new(peak_hour as f64, (span / 4.0).max(0.5)).expect("valid normal params");
    let raw_hour = normal.sample(rng);
    let hour = raw_hour.clamp(start_hour as f64, end_hour as f64) as u32;
    let minute = rng.gen_range(0..60);
    let second = rng.gen_range(0..60);
    date.with_hour(hour.min(23))
        .and_then(|d| d.with_minute(minute))
        .and_then(|d| d.with_second(second))
        .unwrap_or(date)
}

fn build_commit(rng: &mut ChaCha8Rng, dev: &Developer, repo: &Repository, timestamp: DateTime<Utc>) -> Commit {
    let total_added = sample_fat_tailed_lines(rng);
    let total_deleted = (total_added as f64 * rng.gen_range(0.1..0.6)) as u32;

    let noise = Normal::new(0.0, 0.1).expect("valid normal params").sample(rng);
    let ai_fraction = (dev.params.acceptance_rate + noise).clamp(0.0, 1.0);

    let ai_added = (total_added as f64 * ai_fraction).round() as u32;
    let ai_deleted = (total_deleted as f64 * ai_fraction).round() as u32;
    let non_ai_added = total_added.saturating_sub(ai_added);
    let non_ai_deleted = total_deleted.saturating_sub(ai_deleted);

    let tab_added = (ai_added as f64 * dev.params.tab_composer_ratio).round() as u32;
    let composer_added = ai_added.saturating_sub(tab_added);
    let tab_deleted = (ai_deleted as f64 * dev.params.tab_composer_ratio).round() as u32;
    let composer_deleted = ai_deleted.saturating_sub(tab_deleted);

    Commit {
        hash: random_hex_hash(rng),
        author_id: dev.id.clone(),
        repo_id: repo.id.clone(),
        branch: repo.default_branch.clone(),
        timestamp,
        message: random_commit_message(rng),
        tab_added,
        tab_deleted,
        composer_added,
        composer_deleted,
        non_ai_added,
        non_ai_deleted,
    }
}

/// Most commits are small; a long tail occasionally touches hundreds of lines.
fn sample_fat_tailed_lines(rng: &mut ChaCha8Rng) -> u32 {
    let lognormal = rand_distr::LogNormal::new(3.0, 1.2).expect("valid lognormal params");
    let raw: f64 = lognormal.sample(rng);
    raw.clamp(1.0, 2000.0) as u32
}

const COMMIT_VERBS: &[&str] = &["fix", "add", "refactor", "update", "remove", "improve", "optimize", "clean up"];
const COMMIT_SUBJECTS: &[&str] = &[
    "auth flow",
    "pagination logic",
    "error handling",
    "test coverage",
    "query builder",
    "cache layer",
    "config loader",
    "retry policy",
    "logging format",
    "rate limiter",
];

fn random_commit_message(rng: &mut ChaCha8Rng) -> String {
    let verb = COMMIT_VERBS[rng.gen_range(0..COMMIT_VERBS.len())];
    let subject = COMMIT_SUBJECTS[rng.gen_range(0..COMMIT_SUBJECTS.len())];
    format!("{verb} {subject}")
}

fn random_hex_hash(rng: &mut ChaCha8Rng) -> String {
    let bytes: [u8; 20] = rng.gen();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn respects_max_commits_cap() {
        let developers = super::super::developers::generate(synthesize_default_roster(2));
        let outcome = generate(&developers, &repos(), 7, Velocity::High, 5, Utc::now(), RootSeed(42));
        assert!(outcome.commits.len() <= 5);
    }

    #[test]
    fn every_commit_author_is_a_known_developer() {
        let developers = super::super::developers::generate(synthesize_default_roster(2));
        let ids: std::collections::HashSet<_> = developers.iter().map(|d| d.id.clone()).collect();
        let outcome = generate(&developers, &repos(), 7, Velocity::Medium, 50, Utc::now(), RootSeed(42));
        for c in &outcome.commits {
            assert!(ids.contains(&c.author_id));
        }
    }

    #[test]
    fn reproducible_given_same_seed() {
        let developers = super::super::developers::generate(synthesize_default_roster(2));
        let now = Utc::now();
        let a = generate(&developers, &repos(), 7, Velocity::Medium, 50, now, RootSeed(42));
        let b = generate(&developers, &repos(), 7, Velocity::Medium, 50, now, RootSeed(42));
        let hashes_a: Vec<_> = a.commits.iter().map(|c| c.hash.clone()).collect();
        let hashes_b: Vec<_> = b.commits.iter().map(|c| c.hash.clone()).collect();
        assert_eq!(hashes_a, hashes_b);
    }

    #[test]
    fn timestamps_strictly_increase_per_developer() {
        let developers = super::super::developers::generate(synthesize_default_roster(2));
        let outcome = generate(&developers, &repos(), 14, Velocity::High, 0, Utc::now(), RootSeed(7));
        for dev in &developers {
            let mut ts: Vec<_> = outcome
                .commits
                .iter()
                .filter(|c| c.author_id == dev.id)
                .map(|c| c.timestamp)
                .collect();
            let sorted = {
                let mut s = ts.clone();
                s.sort();
                s
            };
            ts.sort();
            assert_eq!(ts, sorted);
            for pair in ts.windows(2) {
                assert!(pair[0] < pair[1]);
            }
        }
    }
}
