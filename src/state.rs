//! Application state management.
//!
//! Mirrors the teacher's `AppState` shape: one `Clone`-able struct, services wrapped in
//! `Arc` where they carry their own interior mutability or are expensive to duplicate, plain
//! fields where the value is already cheap to copy or share.

use crate::auth::RateLimiters;
use crate::config::{AppConfig, Mode};
use crate::health::HealthService;
use crate::replay::Corpus;
use crate::rng::RootSeed;
use crate::seed::SeedFile;
use crate::store::Store;
use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub mode: Mode,
    pub store: Store,
    pub root_seed: RootSeed,
    pub seed_file: Arc<RwLock<SeedFile>>,
    pub rate_limiters: Arc<RateLimiters>,
    pub health: Arc<HealthService>,
    pub corpus: Arc<RwLock<Option<Corpus>>>,
    /// Held for the duration of an `/admin/regenerate` call so concurrent attempts observe
    /// a 409 instead of racing the store's root swap.
    pub regenerate_lock: Arc<tokio::sync::Mutex<()>>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: AppConfig, root_seed: RootSeed, seed_file: SeedFile, store: Store) -> Self {
        Self {
            mode: config.mode,
            config: Arc::new(config),
            store,
            root_seed,
            seed_file: Arc::new(RwLock::new(seed_file)),
            rate_limiters: Arc::new(RateLimiters::new()),
            health: Arc::new(HealthService::new()),
            corpus: Arc::new(RwLock::new(None)),
            regenerate_lock: Arc::new(tokio::sync::Mutex::new(())),
            started_at: Utc::now(),
        }
    }

    pub fn replay(config: AppConfig, corpus: Corpus) -> Self {
        Self {
            mode: config.mode,
            config: Arc::new(config),
            store: Store::empty(),
            root_seed: RootSeed(0),
            seed_file: Arc::new(RwLock::new(blank_seed_file())),
            rate_limiters: Arc::new(RateLimiters::new()),
            health: Arc::new(HealthService::new()),
            corpus: Arc::new(RwLock::new(Some(corpus))),
            regenerate_lock: Arc::new(tokio::sync::Mutex::new(())),
            started_at: Utc::now(),
        }
    }

    pub fn is_replay(&self) -> bool {
        matches!(self.mode, Mode::Replay)
    }

    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

fn blank_seed_file() -> SeedFile {
    use crate::seed::{default_org_tree, ExternalSourceToggles};
    SeedFile {
        version: 1,
        developers: Vec::new(),
        repositories: Vec::new(),
        org: default_org_tree(),
        external_sources: ExternalSourceToggles::default(),
        velocity: crate::config::Velocity::default(),
        distributions: Default::default(),
    }
}
