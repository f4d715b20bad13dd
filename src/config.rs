//! Application configuration.
//!
//! `AppConfig` is a single tagged struct — no dynamic maps of untyped options — populated
//! from CLI flags with environment-variable fallbacks, per the external CLI surface
//! contract. Unknown fields in a seed file are rejected at parse time by `seed.rs`, not
//! here; this module only concerns itself with process-level configuration.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Runtime,
    Replay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Velocity {
    Low,
    Medium,
    High,
}

impl Velocity {
    /// Multiplier applied to a developer's base events-per-day mean.
    pub fn multiplier(self) -> f64 {
        match self {
            Velocity::Low => 0.4,
            Velocity::Medium => 1.0,
            Velocity::High => 2.2,
        }
    }
}

impl Default for Velocity {
    fn default() -> Self {
        Velocity::Medium
    }
}

/// `cursor-sim` — synthetic software-development telemetry generator and server.
#[derive(Debug, Clone, Parser)]
#[command(name = "cursor-sim", version, about)]
pub struct AppConfig {
    #[arg(long, env = "CURSOR_SIM_MODE", value_enum, default_value = "runtime")]
    pub mode: Mode,

    #[arg(long, env = "CURSOR_SIM_SEED")]
    pub seed: Option<PathBuf>,

    #[arg(long, env = "CURSOR_SIM_PORT", default_value_t = 8080)]
    pub port: u16,

    #[arg(long, env = "CURSOR_SIM_DAYS", default_value_t = 90)]
    pub days: u32,

    #[arg(long, env = "CURSOR_SIM_VELOCITY", value_enum, default_value = "medium")]
    pub velocity: Velocity,

    #[arg(long, env = "CURSOR_SIM_DEVELOPERS")]
    pub developers: Option<u32>,

    #[arg(long, env = "CURSOR_SIM_MAX_COMMITS", default_value_t = 0)]
    pub max_commits: u32,

    #[arg(long, env = "CURSOR_SIM_INTERACTIVE", default_value_t = false)]
    pub interactive: bool,

    #[arg(long, env = "CURSOR_SIM_CORPUS")]
    pub corpus: Option<PathBuf>,

    /// API key validated as the HTTP Basic username against every non-health endpoint.
    #[arg(long, env = "CURSOR_SIM_API_KEY", default_value = "cursor-sim-dev-key")]
    pub api_key: String,

    #[arg(long, env = "CURSOR_SIM_REQUEST_TIMEOUT_SECONDS", default_value_t = 30)]
    pub request_timeout_seconds: u64,
}

impl AppConfig {
    pub fn host(&self) -> &'static str {
        "0.0.0.0"
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host(), self.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Runtime,
            seed: None,
            port: 8080,
            days: 90,
            velocity: Velocity::Medium,
            developers: None,
            max_commits: 0,
            interactive: false,
            corpus: None,
            api_key: "cursor-sim-dev-key".to_string(),
            request_timeout_seconds: 30,
        }
    }
}
