//! Entity Generators (C3): the ordered pipeline that turns a resolved seed into a complete,
//! self-consistent entity graph. Each stage only observes the outputs of earlier stages,
//! matching the dependency order in the system overview.

pub mod commits;
pub mod developers;
pub mod external_usage;
pub mod issues;
pub mod pull_requests;
pub mod reviews;

use crate::config::Velocity;
use crate::error::{CursorSimError, Result};
use crate::models::Repository;
use crate::rng::RootSeed;
use crate::seed::{DeveloperSeed, DistributionOverrides, ExternalSourceToggles, RepositorySeed};
use crate::store::StoreInner;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub days: u32,
    pub velocity: Velocity,
    pub max_commits: u32,
    pub generation_start: DateTime<Utc>,
    pub distributions: DistributionOverrides,
    pub external_sources: ExternalSourceToggles,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct GenerationStats {
    pub developers: usize,
    pub repositories: usize,
    pub commits: usize,
    pub pull_requests: usize,
    pub reviews: usize,
    pub issues: usize,
    pub early_halt: bool,
}

pub struct GenerationOutcome {
    pub store: StoreInner,
    pub stats: GenerationStats,
}

/// Runs the full pipeline and returns a brand-new `StoreInner`. Never mutates an existing
/// store — callers decide whether the result replaces (`override`) or is merged into
/// (`append`) the live store.
pub fn run(
    developer_seeds: Vec<DeveloperSeed>,
    repository_seeds: Vec<RepositorySeed>,
    request: GenerationRequest,
    root_seed: RootSeed,
) -> Result<GenerationOutcome> {
    if repository_seeds.is_empty() {
        return Err(CursorSimError::GenerationFailed {
            stage: "repositories".into(),
            reason: "seed must list at least one repository".into(),
        });
    }

    let developers = developers::generate(developer_seeds);
    let repositories = instantiate_repositories(repository_seeds, request.generation_start);

    let commit_outcome = commits::generate(
        &developers,
        &repositories,
        request.days,
        request.velocity,
        request.max_commits,
        request.generation_start,
        root_seed,
    );

    let prs = pull_requests::generate(
        &commit_outcome.commits,
        &developers,
        request.generation_start,
        &request.distributions,
        root_seed,
    );

    let developer_ids: Vec<String> = developers.iter().map(|d| d.id.clone()).collect();
    let reviews = reviews::generate(
        &prs,
        &developer_ids,
        request.generation_start,
        &request.distributions,
        root_seed,
    );

    let issues = issues::generate(&prs, request.generation_start, root_seed);

    let external_usage = external_usage::generate(
        &developers,
        &request.external_sources,
        request.generation_start,
        root_seed,
    );

    let mut store = StoreInner::new();
    store
        .insert_developers(developers)
        .map_err(|e| stage_failure("developers", e))?;
    store
        .insert_repositories(repositories)
        .map_err(|e| stage_failure("repositories", e))?;
    store
        .insert_commits(commit_outcome.commits)
        .map_err(|e| stage_failure("commits", e))?;
    store
        .insert_pull_requests(prs)
        .map_err(|e| stage_failure("pull_requests", e))?;
    store
        .insert_reviews(reviews)
        .map_err(|e| stage_failure("reviews", e))?;
    store
        .insert_issues(issues)
        .map_err(|e| stage_failure("issues", e))?;
    store.append_external_usage(external_usage);

    let violations = store.verify_consistency();
    if !violations.is_empty() {
        return Err(CursorSimError::GenerationFailed {
            stage: "verify_consistency".into(),
            reason: violations.join("; "),
        });
    }

    let stats = GenerationStats {
        developers: store.developers.len(),
        repositories: store.repositories.len(),
        commits: store.commits.len(),
        pull_requests: store.pull_requests.len(),
        reviews: store.reviews.len(),
        issues: store.issues.len(),
        early_halt: request.max_commits != 0 && store.commits.len() as u32 >= request.max_commits,
    };

    Ok(GenerationOutcome { store, stats })
}

fn stage_failure(stage: &str, err: CursorSimError) -> CursorSimError {
    CursorSimError::GenerationFailed {
        stage: stage.to_string(),
        reason: err.to_string(),
    }
}

fn instantiate_repositories(seeds: Vec<RepositorySeed>, generation_start: DateTime<Utc>) -> Vec<Repository> {
    seeds
        .into_iter()
        .map(|s| Repository {
            id: s.id,
            owner: s.owner,
            name: s.name,
            default_branch: s.default_branch,
            language: s.language,
            size_kb: s.size_kb,
            created_at: generation_start - chrono::Duration::days(365),
            updated_at: generation_start,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::{default_org_tree, synthesize_default_roster, DeveloperSeed};

    fn repo_seeds() -> Vec<RepositorySeed> {
        vec![RepositorySeed {
            id: "repo-1".into(),
            owner: "acme".into(),
            name: "main".into(),
            default_branch: "main".into(),
            language: "rust".into(),
            size_kb: 500,
        }]
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            days: 7,
            velocity: Velocity::Medium,
            max_commits: 50,
            generation_start: Utc::now(),
            distributions: DistributionOverrides::default(),
            external_sources: ExternalSourceToggles::default(),
        }
    }

    #[test]
    fn full_pipeline_produces_a_consistent_store() {
        let devs: Vec<DeveloperSeed> = synthesize_default_roster(2);
        let outcome = run(devs, repo_seeds(), request(), RootSeed(42)).unwrap();
        assert!(outcome.store.commits.len() <= 50);
        assert!(outcome.store.verify_consistency().is_empty());
        let _ = default_org_tree();
    }

    #[test]
    fn reproducible_given_identical_inputs() {
        let a = run(synthesize_default_roster(2), repo_seeds(), request(), RootSeed(42)).unwrap();
        let b = run(synthesize_default_roster(2), repo_seeds(), request(), RootSeed(42)).unwrap();
        let mut hashes_a: Vec<_> = a.store.commits.keys().cloned().collect();
        let mut hashes_b: Vec<_> = b.store.commits.keys().cloned().collect();
        hashes_a.sort();
        hashes_b.sort();
        assert_eq!(hashes_a, hashes_b);
    }
}
