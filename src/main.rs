//! `cursor-sim` binary entrypoint: parses CLI flags, builds the initial dataset (or loads a
//! replay corpus), and serves the HTTP API until a shutdown signal arrives.

use anyhow::Context;
use clap::Parser;
use cursor_sim::config::{AppConfig, Mode, Velocity};
use cursor_sim::generators::{self, GenerationRequest};
use cursor_sim::replay::Corpus;
use cursor_sim::seed::{self, SeedFile};
use cursor_sim::state::AppState;
use cursor_sim::store::Store;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter("cursor_sim=info,tower_http=info,axum=info")
        .with_target(false)
        .compact()
        .init();

    let config = AppConfig::parse();

    let state = match config.mode {
        Mode::Runtime => build_runtime_state(config),
        Mode::Replay => build_replay_state(config),
    };

    let state = match state {
        Ok(state) => state,
        Err(err) => {
            error!(error = ?err, "configuration error");
            std::process::exit(1);
        }
    };

    if let Err(err) = serve(state).await {
        error!(error = ?err, "runtime failure");
        std::process::exit(2);
    }
}

/// Loads a seed file if `--seed` was given, otherwise synthesizes a roster from
/// `--developers` (defaulting to 10), then runs the initial generation pass.
fn build_runtime_state(config: AppConfig) -> anyhow::Result<AppState> {
    let seed_file = match &config.seed {
        Some(path) => SeedFile::load_from_path(path)
            .with_context(|| format!("loading seed file {}", path.display()))?,
        None => synthesize_seed_file(config.developers.unwrap_or(10)),
    };

    let requested_developers = config.developers.unwrap_or(seed_file.developers.len() as u32);
    seed::validate_request_bounds(requested_developers, config.days, config.max_commits)
        .context("seed/config out of bounds")?;

    let root_seed = seed::root_seed_from_config(None);
    let mut rng = root_seed.root_rng();
    let developer_seeds =
        seed::resolve_developer_count(&seed_file.developers, requested_developers as usize, &mut rng);

    let generation = GenerationRequest {
        days: config.days,
        velocity: config.velocity,
        max_commits: config.max_commits,
        generation_start: chrono::Utc::now(),
        distributions: seed_file.distributions.clone(),
        external_sources: seed_file.external_sources.clone(),
    };

    let outcome = generators::run(developer_seeds, seed_file.repositories.clone(), generation, root_seed)
        .context("initial generation failed")?;

    info!(
        developers = outcome.stats.developers,
        commits = outcome.stats.commits,
        pull_requests = outcome.stats.pull_requests,
        "generated initial dataset"
    );

    Ok(AppState::new(config, root_seed, seed_file, Store::from_inner(outcome.store)))
}

fn synthesize_seed_file(developer_count: u32) -> SeedFile {
    SeedFile {
        version: 1,
        developers: seed::synthesize_default_roster(developer_count as usize),
        repositories: seed::default_repositories(),
        org: seed::default_org_tree(),
        external_sources: Default::default(),
        velocity: Velocity::default(),
        distributions: Default::default(),
    }
}

fn build_replay_state(config: AppConfig) -> anyhow::Result<AppState> {
    let corpus_path = config.corpus.clone().context("replay mode requires --corpus PATH")?;
    let corpus = Corpus::load_from_path(&corpus_path)
        .with_context(|| format!("loading corpus {}", corpus_path.display()))?;
    info!(points = corpus.all().len(), "loaded replay corpus");
    Ok(AppState::replay(config, corpus))
}

async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr = state.config.addr();
    let app = cursor_sim::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "cursor-sim listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C, shutting down gracefully");
        },
        _ = terminate => {
            info!("received terminate signal, shutting down gracefully");
        },
    }
}
