//! Health / Observability (C9).
//!
//! `GET /health` never requires auth and reports the status of the subsystems a request
//! actually depends on: the store (always "up" once boot completes) and the mode the
//! process is running in (runtime generation vs. a loaded replay corpus).

use crate::store::Store;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubsystemStatus {
    Up,
    Degraded,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub subsystems: HashMap<String, SubsystemStatus>,
    pub uptime_seconds: i64,
}

pub struct HealthService {
    service_start_time: DateTime<Utc>,
}

impl HealthService {
    pub fn new() -> Self {
        Self {
            service_start_time: Utc::now(),
        }
    }

    pub fn check(&self, store: &Store, replay_loaded: Option<bool>) -> HealthResponse {
        let mut subsystems = HashMap::new();

        let snapshot = store.snapshot();
        let store_status = if snapshot.verify_consistency().is_empty() {
            SubsystemStatus::Up
        } else {
            SubsystemStatus::Degraded
        };
        subsystems.insert("store".to_string(), store_status);

        if let Some(loaded) = replay_loaded {
            let replay_status = if loaded { SubsystemStatus::Up } else { SubsystemStatus::Degraded };
            subsystems.insert("replay_corpus".to_string(), replay_status);
        }

        let overall = if subsystems.values().all(|s| *s == SubsystemStatus::Up) {
            "healthy"
        } else {
            "degraded"
        };

        HealthResponse {
            status: overall,
            subsystems,
            uptime_seconds: (Utc::now() - self.service_start_time).num_seconds(),
        }
    }
}

impl Default for HealthService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_is_healthy() {
        let service = HealthService::new();
        let store = Store::empty();
        let response = service.check(&store, None);
        assert_eq!(response.status, "healthy");
        assert_eq!(response.subsystems.get("store"), Some(&SubsystemStatus::Up));
    }

    #[test]
    fn replay_mode_reports_corpus_subsystem() {
        let service = HealthService::new();
        let store = Store::empty();
        let response = service.check(&store, Some(true));
        assert_eq!(response.subsystems.get("replay_corpus"), Some(&SubsystemStatus::Up));
    }
}
