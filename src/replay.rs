//! Corpus Loader / Replay mode (C6).
//!
//! Reads a previously-exported dataset of `ResearchDataPoint`s — either a JSON array or
//! NDJSON (one record per line) — and builds a time-sorted index plus an ai-ratio band
//! index. In replay mode, generators are inactive: the research endpoints are served
//! directly from this index, and every other endpoint returns `ModeNotSupported`.

use crate::error::{CursorSimError, Result};
use crate::models::{Band, ResearchDataPoint};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct Corpus {
    /// Insertion order is load order; `time_sorted` holds indices into `points` sorted by
    /// timestamp so range queries don't have to re-sort on every request.
    points: Vec<ResearchDataPoint>,
    time_sorted: Vec<usize>,
    by_band: HashMap<Band, Vec<usize>>,
}

impl Corpus {
    pub fn load_from_path(path: &Path) -> Result<Corpus> {
        let raw = std::fs::read_to_string(path)?;
        let looks_like_array = raw.trim_start().starts_with('[');
        let points: Vec<ResearchDataPoint> = if looks_like_array {
            serde_json::from_str(&raw)?
        } else {
            Self::parse_ndjson(&raw)?
        };
        Ok(Corpus::from_points(points))
    }

    fn parse_ndjson(raw: &str) -> Result<Vec<ResearchDataPoint>> {
        raw.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str::<ResearchDataPoint>(line).map_err(CursorSimError::from))
            .collect()
    }

    pub fn from_points(points: Vec<ResearchDataPoint>) -> Corpus {
        let mut time_sorted: Vec<usize> = (0..points.len()).collect();
        time_sorted.sort_by_key(|&i| points[i].timestamp);

        let mut by_band: HashMap<Band, Vec<usize>> = HashMap::new();
        for (i, p) in points.iter().enumerate() {
            by_band.entry(Band::of(p.ai_ratio)).or_default().push(i);
        }

        Corpus { points, time_sorted, by_band }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn all(&self) -> &[ResearchDataPoint] {
        &self.points
    }

    pub fn in_range(&self, start: chrono::DateTime<chrono::Utc>, end: chrono::DateTime<chrono::Utc>) -> Vec<&ResearchDataPoint> {
        self.time_sorted
            .iter()
            .map(|&i| &self.points[i])
            .filter(|p| p.timestamp >= start && p.timestamp <= end)
            .collect()
    }

    pub fn by_band(&self, band: Band) -> Vec<&ResearchDataPoint> {
        self.by_band
            .get(&band)
            .into_iter()
            .flatten()
            .map(|&i| &self.points[i])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn point(ai_ratio: f64) -> ResearchDataPoint {
        ResearchDataPoint {
            commit_hash: "a".repeat(40),
            pr_number: None,
            author_id: "alice".into(),
            ai_ratio,
            additions: 10,
            deletions: 2,
            coding_lead_time_hours: 1.0,
            review_lead_time_hours: 2.0,
            review_iterations: 1,
            was_reverted: false,
            required_hotfix: false,
            pr_merged: true,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn buckets_by_band_correctly() {
        let corpus = Corpus::from_points(vec![point(0.1), point(0.9)]);
        assert_eq!(corpus.by_band(Band::L).len(), 1);
        assert_eq!(corpus.by_band(Band::H).len(), 1);
        assert_eq!(corpus.by_band(Band::M).len(), 0);
    }

    #[test]
    fn parses_ndjson() {
        let raw = format!(
            "{}\n{}\n",
            serde_json::to_string(&point(0.1)).unwrap(),
            serde_json::to_string(&point(0.5)).unwrap()
        );
        let points = Corpus::parse_ndjson(&raw).unwrap();
        assert_eq!(points.len(), 2);
    }
}
