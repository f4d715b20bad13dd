//! Research Metrics Service (C10).
//!
//! Given a time window and a set of `ResearchDataPoint`s — the live dataset flattened from
//! the store in runtime mode, or the loaded corpus in replay mode — computes per ai-usage
//! band (§4.6) velocity, review-cost, and quality aggregations. Empty input yields an empty
//! result list, never an error; std-dev uses the unbiased (N-1) estimator and is 0 when
//! `N<=1`.

use crate::models::{Band, Commit, PullRequest, Review, ResearchDataPoint};
use crate::store::StoreInner;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VelocityMetrics {
    pub total_commits: usize,
    pub total_additions: u64,
    pub total_deletions: u64,
    pub mean_coding_lead_time_hours: f64,
    pub median_coding_lead_time_hours: f64,
    pub std_coding_lead_time_hours: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCostMetrics {
    pub prs_reviewed: usize,
    pub total_review_iterations: u64,
    pub mean_iterations_per_pr: f64,
    pub mean_review_time_hours: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetrics {
    pub merged_prs: usize,
    pub reverted_prs: usize,
    pub revert_rate: f64,
    pub hotfix_count: usize,
    pub hotfix_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BandMetrics {
    pub band: Band,
    pub velocity: VelocityMetrics,
    pub review_cost: ReviewCostMetrics,
    pub quality: QualityMetrics,
}

/// Flattens the live store into the same `ResearchDataPoint` shape replay mode serves, so
/// both modes share one metrics implementation.
pub fn flatten_store(store: &StoreInner) -> Vec<ResearchDataPoint> {
    let pr_by_commit: HashMap<&str, &PullRequest> = store
        .pull_requests
        .values()
        .flat_map(|pr| pr.commit_hashes.iter().map(move |h| (h.as_str(), pr)))
        .collect();

    store
        .commits
        .values()
        .map(|commit| flatten_commit(commit, pr_by_commit.get(commit.hash.as_str()).copied(), store))
        .collect()
}

fn flatten_commit(commit: &Commit, pr: Option<&PullRequest>, store: &StoreInner) -> ResearchDataPoint {
    let (pr_number, coding_lead_time_hours, review_lead_time_hours, review_iterations, was_reverted, required_hotfix, pr_merged) =
        match pr {
            Some(pr) => {
                let coding_lead_time = (pr.created_at - commit.timestamp).num_seconds().max(0) as f64 / 3600.0;
                let reviews: Vec<&Review> = store.reviews_by_pr(&pr.id);
                let review_lead_time = reviews
                    .iter()
                    .map(|r| r.submitted_at)
                    .min()
                    .map(|first| (first - pr.created_at).num_seconds().max(0) as f64 / 3600.0)
                    .unwrap_or(0.0);
                (
                    Some(pr.number),
                    coding_lead_time,
                    review_lead_time,
                    reviews.len() as u32,
                    pr.was_reverted,
                    pr.is_hotfix,
                    pr.state == crate::models::PrState::Merged,
                )
            }
            None => (None, 0.0, 0.0, 0, false, false, false),
        };

    ResearchDataPoint {
        commit_hash: commit.hash.clone(),
        pr_number,
        author_id: commit.author_id.clone(),
        ai_ratio: commit.ai_ratio(),
        additions: commit.total_added(),
        deletions: commit.total_deleted(),
        coding_lead_time_hours,
        review_lead_time_hours,
        review_iterations,
        was_reverted,
        required_hotfix,
        pr_merged,
        timestamp: commit.timestamp,
    }
}

pub fn compute(points: &[ResearchDataPoint], start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<BandMetrics> {
    let in_range: Vec<&ResearchDataPoint> = points
        .iter()
        .filter(|p| p.timestamp >= start && p.timestamp <= end)
        .collect();

    if in_range.is_empty() {
        return Vec::new();
    }

    let mut by_band: HashMap<Band, Vec<&ResearchDataPoint>> = HashMap::new();
    for p in in_range {
        by_band.entry(Band::of(p.ai_ratio)).or_default().push(p);
    }

    let mut bands: Vec<Band> = by_band.keys().copied().collect();
    bands.sort_by_key(|b| format!("{b}"));

    bands
        .into_iter()
        .map(|band| {
            let group = by_band.remove(&band).unwrap_or_default();
            BandMetrics {
                band,
                velocity: compute_velocity(&group),
                review_cost: compute_review_cost(&group),
                quality: compute_quality(&group),
            }
        })
        .collect()
}

fn compute_velocity(points: &[&ResearchDataPoint]) -> VelocityMetrics {
    let lead_times: Vec<f64> = points.iter().map(|p| p.coding_lead_time_hours).collect();
    let (mean, std) = mean_and_std(&lead_times);
    VelocityMetrics {
        total_commits: points.len(),
        total_additions: points.iter().map(|p| p.additions as u64).sum(),
        total_deletions: points.iter().map(|p| p.deletions as u64).sum(),
        mean_coding_lead_time_hours: mean,
        median_coding_lead_time_hours: median(&lead_times),
        std_coding_lead_time_hours: std,
    }
}

/// Commits sharing a PR carry identical review fields by construction (`flatten_commit`
/// copies them from the owning PR), so the first commit seen per `pr_number` represents
/// that PR's review cost without double-counting.
fn distinct_prs<'a>(points: &'a [&'a ResearchDataPoint]) -> Vec<&'a ResearchDataPoint> {
    let mut seen = std::collections::HashSet::new();
    points
        .iter()
        .filter(|p| p.pr_number.is_some())
        .filter(|p| seen.insert(p.pr_number))
        .copied()
        .collect()
}

fn compute_review_cost(points: &[&ResearchDataPoint]) -> ReviewCostMetrics {
    let prs = distinct_prs(points);
    let reviewed: Vec<&&ResearchDataPoint> = prs.iter().filter(|p| p.review_iterations > 0).collect();

    let total_iterations: u64 = prs.iter().map(|p| p.review_iterations as u64).sum();
    let mean_iterations = if prs.is_empty() {
        0.0
    } else {
        total_iterations as f64 / prs.len() as f64
    };
    let mean_review_time = if reviewed.is_empty() {
        0.0
    } else {
        reviewed.iter().map(|p| p.review_lead_time_hours).sum::<f64>() / reviewed.len() as f64
    };

    ReviewCostMetrics {
        prs_reviewed: reviewed.len(),
        total_review_iterations: total_iterations,
        mean_iterations_per_pr: mean_iterations,
        mean_review_time_hours: mean_review_time,
    }
}

fn compute_quality(points: &[&ResearchDataPoint]) -> QualityMetrics {
    let distinct = distinct_prs(points);
    let merged_prs: Vec<&&ResearchDataPoint> = distinct.iter().filter(|p| p.pr_merged).collect();
    let merged = merged_prs.len();
    let reverted = merged_prs.iter().filter(|p| p.was_reverted).count();
    let hotfix = merged_prs.iter().filter(|p| p.required_hotfix).count();

    QualityMetrics {
        merged_prs: merged,
        reverted_prs: reverted,
        revert_rate: rate(reverted, merged),
        hotfix_count: hotfix,
        hotfix_rate: rate(hotfix, merged),
    }
}

fn rate(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

fn mean_and_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if values.len() <= 1 {
        return (mean, 0.0);
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    (mean, variance.sqrt())
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn point(ai_ratio: f64, pr_number: Option<u32>, timestamp: DateTime<Utc>) -> ResearchDataPoint {
        ResearchDataPoint {
            commit_hash: "a".repeat(40),
            pr_number,
            author_id: "alice".into(),
            ai_ratio,
            additions: 10,
            deletions: 2,
            coding_lead_time_hours: 3.0,
            review_lead_time_hours: 1.0,
            review_iterations: 2,
            was_reverted: false,
            required_hotfix: false,
            pr_merged: true,
            timestamp,
        }
    }

    #[test]
    fn empty_input_yields_empty_result() {
        let now = Utc::now();
        let result = compute(&[], now - Duration::days(7), now);
        assert!(result.is_empty());
    }

    #[test]
    fn two_bands_from_two_distinct_ratios() {
        let now = Utc::now();
        let points = vec![point(0.1, Some(1), now), point(0.9, Some(2), now)];
        let result = compute(&points, now - Duration::days(1), now + Duration::days(1));
        assert_eq!(result.len(), 2);
        for band in &result {
            assert_eq!(band.velocity.total_commits, 1);
        }
    }

    #[test]
    fn std_dev_is_zero_for_single_sample() {
        let (_, std) = mean_and_std(&[5.0]);
        assert_eq!(std, 0.0);
    }

    #[test]
    fn distinct_prs_does_not_double_count_commits_from_same_pr() {
        let now = Utc::now();
        let points = vec![point(0.5, Some(7), now), point(0.5, Some(7), now)];
        let refs: Vec<&ResearchDataPoint> = points.iter().collect();
        assert_eq!(distinct_prs(&refs).len(), 1);
    }

    #[test]
    fn quality_excludes_prs_that_are_not_merged() {
        let now = Utc::now();
        let mut merged = point(0.5, Some(1), now);
        merged.was_reverted = true;
        let mut unmerged = point(0.5, Some(2), now);
        unmerged.pr_merged = false;
        unmerged.was_reverted = true;

        let points = vec![merged, unmerged];
        let refs: Vec<&ResearchDataPoint> = points.iter().collect();
        let quality = compute_quality(&refs);

        assert_eq!(quality.merged_prs, 1);
        assert_eq!(quality.reverted_prs, 1);
        assert_eq!(quality.revert_rate, 1.0);
    }
}
