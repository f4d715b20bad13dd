//! Temporal Coordinator (C5).
//!
//! A stateless helper generators call to assign timestamps. Given a requested time and the
//! relevant predecessor(s), it returns the requested time when legal, or the minimum legal
//! later time otherwise. It never moves a time backwards, and a generation run caps every
//! timestamp at its own start time so nothing is ever dated into the future.

use chrono::{DateTime, Duration, Utc};

/// Smallest unit by which a strictly-after timestamp is pushed past its predecessor.
const EPSILON: Duration = Duration::seconds(1);

#[derive(Debug, Clone, Copy)]
pub struct TemporalCoordinator {
    generation_start: DateTime<Utc>,
}

impl TemporalCoordinator {
    pub fn new(generation_start: DateTime<Utc>) -> Self {
        Self { generation_start }
    }

    pub fn generation_start(&self) -> DateTime<Utc> {
        self.generation_start
    }

    /// Returns `requested` if it is strictly later than `predecessor`, else
    /// `predecessor + EPSILON`. Used for e.g. `commit.ts < PR.created_at`.
    pub fn strictly_after(&self, requested: DateTime<Utc>, predecessor: DateTime<Utc>) -> DateTime<Utc> {
        let floor = self.clamp_not_future(predecessor.max(predecessor));
        let candidate = self.clamp_not_future(requested);
        if candidate > floor {
            candidate
        } else {
            self.clamp_not_future(floor + EPSILON)
        }
    }

    /// Returns `requested` if it is at or after `floor`, else `floor`. Used for
    /// non-decreasing orderings such as `review.submitted_at` within a PR's active window.
    pub fn at_or_after(&self, requested: DateTime<Utc>, floor: DateTime<Utc>) -> DateTime<Utc> {
        let candidate = self.clamp_not_future(requested);
        let floor = self.clamp_not_future(floor);
        if candidate >= floor {
            candidate
        } else {
            floor
        }
    }

    /// Returns `requested` if it falls at or before `ceiling`, else `ceiling`. Used to keep
    /// e.g. `review.submitted_at` inside a PR's active window.
    pub fn at_or_before(&self, requested: DateTime<Utc>, ceiling: DateTime<Utc>) -> DateTime<Utc> {
        let candidate = self.clamp_not_future(requested);
        candidate.min(ceiling)
    }

    /// No timestamp in a generated graph may fall after the run's own start time.
    pub fn clamp_not_future(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        ts.min(self.generation_start)
    }

    /// Returns the latest of a non-empty slice of predecessor timestamps, or `None` if the
    /// entity has no predecessors yet (e.g. a developer's first commit on a branch).
    pub fn latest(predecessors: &[DateTime<Utc>]) -> Option<DateTime<Utc>> {
        predecessors.iter().copied().max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strictly_after_returns_requested_when_already_legal() {
        let coord = TemporalCoordinator::new(Utc::now());
        let predecessor = coord.generation_start() - Duration::days(1);
        let requested = predecessor + Duration::hours(1);
        assert_eq!(coord.strictly_after(requested, predecessor), requested);
    }

    #[test]
    fn strictly_after_pushes_forward_when_illegal() {
        let coord = TemporalCoordinator::new(Utc::now());
        let predecessor = coord.generation_start() - Duration::days(1);
        let requested = predecessor - Duration::hours(1);
        let resolved = coord.strictly_after(requested, predecessor);
        assert!(resolved > predecessor);
    }

    #[test]
    fn never_moves_into_the_future() {
        let start = Utc::now() - Duration::days(5);
        let coord = TemporalCoordinator::new(start);
        let future = start + Duration::days(10);
        assert_eq!(coord.clamp_not_future(future), start);
    }

    #[test]
    fn at_or_after_respects_floor() {
        let coord = TemporalCoordinator::new(Utc::now());
        let floor = coord.generation_start() - Duration::days(2);
        let earlier = floor - Duration::hours(3);
        assert_eq!(coord.at_or_after(earlier, floor), floor);

        let later = floor + Duration::hours(3);
        assert_eq!(coord.at_or_after(later, floor), later);
    }
}
