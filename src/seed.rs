//! Seed Model & Loader (C1).
//!
//! A seed is a declarative description of the universe to fabricate: a developer roster with
//! per-person parameter bundles, a repository catalog, an org tree, external-source toggles,
//! and optional overrides of the default distribution vectors the generators otherwise use.
//! Accepted on disk as JSON, YAML, or CSV (CSV encodes the developer roster only — one row
//! per developer — since the other sections have no natural tabular shape; a CSV seed always
//! uses the default repository catalog, org tree, and distributions).

use crate::config::Velocity;
use crate::error::{CursorSimError, Result};
use crate::models::{DeveloperParams, Region, Seniority};
use crate::rng::RootSeed;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeveloperSeed {
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
pub struct RepositorySeed {
    pub id: String,
    pub owner: String,
    pub name: String,
    pub default_branch: String,
    pub language: String,
    pub size_kb: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DivisionNode {
    pub name: String,
    pub teams: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgTree {
    pub organization: String,
    pub divisions: Vec<DivisionNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalSourceToggles {
    pub harvey: bool,
    pub copilot: bool,
    pub qualtrics: bool,
}

impl Default for ExternalSourceToggles {
    fn default() -> Self {
        Self {
            harvey: true,
            copilot: true,
            qualtrics: true,
        }
    }
}

/// Overrides of the default distribution vectors used by the entity generators. Any
/// present vector must sum to `1.0` within `±0.01`; absent vectors fall back to the spec
/// defaults baked into `generators/`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DistributionOverrides {
    /// `[merged, closed_without_merge, open]`, default `[0.85, 0.10, 0.05]`.
    pub pr_status: Option<[f64; 3]>,
    /// `[approved, changes_requested, commented]`, default `[0.70, 0.20, 0.10]`.
    pub review_state: Option<[f64; 3]>,
    /// `[1 reviewer, 2 reviewers, 3 reviewers]`, default `[0.50, 0.35, 0.15]`.
    pub reviewer_count: Option<[f64; 3]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedFile {
    pub version: u32,
    pub developers: Vec<DeveloperSeed>,
    #[serde(default)]
    pub repositories: Vec<RepositorySeed>,
    pub org: OrgTree,
    #[serde(default)]
    pub external_sources: ExternalSourceToggles,
    #[serde(default)]
    pub velocity: Velocity,
    #[serde(default)]
    pub distributions: DistributionOverrides,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedFormat {
    Json,
    Yaml,
    Csv,
}

impl SeedFormat {
    pub fn from_path(path: &Path) -> Result<SeedFormat> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(SeedFormat::Json),
            Some("yaml") | Some("yml") => Ok(SeedFormat::Yaml),
            Some("csv") => Ok(SeedFormat::Csv),
            other => Err(CursorSimError::InvalidSeed(format!(
                "unrecognized seed file extension: {:?}",
                other
            ))),
        }
    }
}

/// `csv` cannot deserialize the nested `DeveloperParams` directly, so the roster CSV format
/// is a flat row shape that gets assembled into a `DeveloperSeed` afterwards.
#[derive(Debug, Clone, Deserialize)]
struct CsvDeveloperRow {
    id: String,
    display_name: String,
    email: String,
    team: String,
    division: String,
    organization: String,
    region: Region,
    timezone: String,
    seniority: Seniority,
    acceptance_rate: f64,
    events_per_day_mean: f64,
    events_per_day_std: f64,
    tab_composer_ratio: f64,
    working_hours_start: u8,
    working_hours_end: u8,
    peak_hour: u8,
}

impl CsvDeveloperRow {
    fn into_developer_seed(self) -> DeveloperSeed {
        DeveloperSeed {
            id: self.id,
            display_name: self.display_name,
            email: self.email,
            team: self.team,
            division: self.division,
            organization: self.organization,
            region: self.region,
            timezone: self.timezone,
            seniority: self.seniority,
            params: DeveloperParams {
                acceptance_rate: self.acceptance_rate,
                events_per_day_mean: self.events_per_day_mean,
                events_per_day_std: self.events_per_day_std,
                tab_composer_ratio: self.tab_composer_ratio,
                working_hours_start: self.working_hours_start,
                working_hours_end: self.working_hours_end,
                peak_hour: self.peak_hour,
            },
        }
    }
}

impl SeedFile {
    pub fn load_from_path(path: &Path) -> Result<SeedFile> {
        let format = SeedFormat::from_path(path)?;
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw, format)
    }

    pub fn parse(raw: &str, format: SeedFormat) -> Result<SeedFile> {
        let seed = match format {
            SeedFormat::Json => {
                serde_json::from_str(raw).map_err(|e| CursorSimError::InvalidSeed(e.to_string()))?
            }
            SeedFormat::Yaml => {
                serde_yaml::from_str(raw).map_err(|e| CursorSimError::InvalidSeed(e.to_string()))?
            }
            SeedFormat::Csv => Self::parse_csv_roster(raw)?,
        };
        Self::validate(&seed)?;
        Ok(seed)
    }

    fn parse_csv_roster(raw: &str) -> Result<SeedFile> {
        let mut reader = csv::Reader::from_reader(raw.as_bytes());
        let mut developers = Vec::new();
        for record in reader.deserialize() {
            let row: CsvDeveloperRow = record.map_err(CursorSimError::Csv)?;
            developers.push(row.into_developer_seed());
        }
        Ok(SeedFile {
            version: 1,
            developers,
            repositories: default_repositories(),
            org: default_org_tree(),
            external_sources: ExternalSourceToggles::default(),
            velocity: Velocity::Medium,
            distributions: DistributionOverrides::default(),
        })
    }

    /// Validates the loader invariants from the seed model: non-empty roster, distribution
    /// vectors (if present) summing to `1.0 ± 0.01`.
    pub fn validate(&self) -> Result<()> {
        if self.developers.is_empty() {
            return Err(CursorSimError::InvalidSeed(
                "developer roster must not be empty".into(),
            ));
        }

        for (label, vector) in [
            ("pr_status", self.distributions.pr_status),
            ("review_state", self.distributions.review_state),
            ("reviewer_count", self.distributions.reviewer_count),
        ] {
            if let Some(v) = vector {
                let sum: f64 = v.iter().sum();
                if (sum - 1.0).abs() > 0.01 {
                    return Err(CursorSimError::InvalidSeed(format!(
                        "distribution vector {label} sums to {sum}, expected 1.0 +/- 0.01"
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Numeric bounds on a generation request: developers 1..=10000, days 1..=3650,
/// max_commits 0..=100000.
pub fn validate_request_bounds(developers: u32, days: u32, max_commits: u32) -> Result<()> {
    if !(1..=10_000).contains(&developers) {
        return Err(CursorSimError::InvalidSeed(format!(
            "developers must be in 1..=10000, got {developers}"
        )));
    }
    if !(1..=3650).contains(&days) {
        return Err(CursorSimError::InvalidSeed(format!(
            "days must be in 1..=3650, got {days}"
        )));
    }
    if max_commits > 100_000 {
        return Err(CursorSimError::InvalidSeed(format!(
            "max_commits must be in 0..=100000, got {max_commits}"
        )));
    }
    Ok(())
}

/// Resolves the seed's roster to exactly `requested` developers. Cloning preserves every
/// parameter verbatim and only suffixes id/email/display_name, per the spec's assumed
/// default (clones are not resampled).
pub fn resolve_developer_count(
    roster: &[DeveloperSeed],
    requested: usize,
    rng: &mut ChaCha8Rng,
) -> Vec<DeveloperSeed> {
    if requested == roster.len() {
        return roster.to_vec();
    }

    if requested > roster.len() {
        let mut out = Vec::with_capacity(requested);
        let mut clone_index = 0usize;
        let mut cycle = roster.iter().cycle();
        for i in 0..requested {
            let base = cycle.next().expect("roster is non-empty");
            if i < roster.len() {
                out.push(base.clone());
            } else {
                clone_index += 1;
                out.push(clone_developer(base, clone_index));
            }
        }
        out
    } else {
        let mut pool: Vec<&DeveloperSeed> = roster.iter().collect();
        pool.shuffle(rng);
        pool.into_iter().take(requested).cloned().collect()
    }
}

fn clone_developer(base: &DeveloperSeed, clone_index: usize) -> DeveloperSeed {
    let mut clone = base.clone();
    clone.id = format!("{}_clone{}", base.id, clone_index);
    let (local, domain) = base
        .email
        .split_once('@')
        .unwrap_or((base.email.as_str(), "example.com"));
    clone.email = format!("{local}+clone{clone_index}@{domain}");
    clone.display_name = format!("{} (clone {})", base.display_name, clone_index);
    clone
}

pub fn default_org_tree() -> OrgTree {
    OrgTree {
        organization: "cursor-sim-corp".into(),
        divisions: vec![DivisionNode {
            name: "engineering".into(),
            teams: vec!["platform".into(), "product".into()],
        }],
    }
}

pub fn default_repositories() -> Vec<RepositorySeed> {
    vec![RepositorySeed {
        id: "repo-main".into(),
        owner: "cursor-sim-corp".into(),
        name: "main-service".into(),
        default_branch: "main".into(),
        language: "rust".into(),
        size_kb: 40_000,
    }]
}

/// One of the four enumerated presets served from `GET /admin/seed/presets`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedPresetName {
    Small,
    Medium,
    Enterprise,
    Distributed,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeedPreset {
    pub name: SeedPresetName,
    pub developers: u32,
    pub repositories: u32,
    pub days: u32,
    pub velocity: Velocity,
}

pub fn presets() -> Vec<SeedPreset> {
    vec![
        SeedPreset {
            name: SeedPresetName::Small,
            developers: 5,
            repositories: 1,
            days: 30,
            velocity: Velocity::Low,
        },
        SeedPreset {
            name: SeedPresetName::Medium,
            developers: 25,
            repositories: 3,
            days: 90,
            velocity: Velocity::Medium,
        },
        SeedPreset {
            name: SeedPresetName::Enterprise,
            developers: 250,
            repositories: 12,
            days: 180,
            velocity: Velocity::High,
        },
        SeedPreset {
            name: SeedPresetName::Distributed,
            developers: 80,
            repositories: 20,
            days: 120,
            velocity: Velocity::Medium,
        },
    ]
}

fn default_developer_params() -> DeveloperParams {
    DeveloperParams {
        acceptance_rate: 0.6,
        events_per_day_mean: 8.0,
        events_per_day_std: 3.0,
        tab_composer_ratio: 0.6,
        working_hours_start: 9,
        working_hours_end: 18,
        peak_hour: 11,
    }
}

/// Builds a minimal roster for callers (e.g. `--developers N` with no `--seed`) who want
/// generation to proceed from defaults rather than a file.
pub fn synthesize_default_roster(count: usize) -> Vec<DeveloperSeed> {
    let first_names = ["alice", "bob", "carol", "dave", "erin", "frank", "grace", "heidi"];
    (0..count)
        .map(|i| {
            let name = first_names[i % first_names.len()];
            let id = if i < first_names.len() {
                name.to_string()
            } else {
                format!("{name}{}", i / first_names.len())
            };
            DeveloperSeed {
                email: format!("{id}@example.com"),
                display_name: id.clone(),
                id,
                team: "platform".into(),
                division: "engineering".into(),
                organization: "cursor-sim-corp".into(),
                region: Region::Us,
                timezone: "UTC".into(),
                seniority: Seniority::Mid,
                params: default_developer_params(),
            }
        })
        .collect()
}

pub fn root_seed_from_config(seed_value: Option<u64>) -> RootSeed {
    RootSeed(seed_value.unwrap_or(42))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_roster(n: usize) -> Vec<DeveloperSeed> {
        synthesize_default_roster(n)
    }

    #[test]
    fn rejects_empty_roster() {
        let seed = SeedFile {
            version: 1,
            developers: vec![],
            repositories: default_repositories(),
            org: default_org_tree(),
            external_sources: ExternalSourceToggles::default(),
            velocity: Velocity::Medium,
            distributions: DistributionOverrides::default(),
        };
        assert!(seed.validate().is_err());
    }

    #[test]
    fn rejects_bad_distribution_sum() {
        let mut seed = SeedFile {
            version: 1,
            developers: sample_roster(2),
            repositories: default_repositories(),
            org: default_org_tree(),
            external_sources: ExternalSourceToggles::default(),
            velocity: Velocity::Medium,
            distributions: DistributionOverrides::default(),
        };
        seed.distributions.pr_status = Some([0.5, 0.5, 0.5]);
        assert!(seed.validate().is_err());
    }

    #[test]
    fn accepts_valid_distribution_sum() {
        let mut seed = SeedFile {
            version: 1,
            developers: sample_roster(2),
            repositories: default_repositories(),
            org: default_org_tree(),
            external_sources: ExternalSourceToggles::default(),
            velocity: Velocity::Medium,
            distributions: DistributionOverrides::default(),
        };
        seed.distributions.pr_status = Some([0.85, 0.10, 0.05]);
        assert!(seed.validate().is_ok());
    }

    #[test]
    fn clones_when_requested_exceeds_roster() {
        let roster = sample_roster(2);
        let mut rng = RootSeed(1).root_rng();
        let resolved = resolve_developer_count(&roster, 5, &mut rng);
        assert_eq!(resolved.len(), 5);
        let ids: std::collections::HashSet<_> = resolved.iter().map(|d| d.id.clone()).collect();
        assert_eq!(ids.len(), 5, "all resolved ids must be unique");
    }

    #[test]
    fn samples_without_replacement_when_requested_is_smaller() {
        let roster = sample_roster(5);
        let mut rng = RootSeed(1).root_rng();
        let resolved = resolve_developer_count(&roster, 2, &mut rng);
        assert_eq!(resolved.len(), 2);
        let ids: std::collections::HashSet<_> = resolved.iter().map(|d| d.id.clone()).collect();
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn bounds_reject_zero_developers() {
        assert!(validate_request_bounds(0, 30, 0).is_err());
    }

    #[test]
    fn bounds_reject_excess_days() {
        assert!(validate_request_bounds(5, 4000, 0).is_err());
    }

    #[test]
    fn bounds_accept_defaults() {
        assert!(validate_request_bounds(2, 7, 50).is_ok());
    }
}
