mod routes;
mod state;
mod tick_loop;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use void_control::{AutoPlayer, AutoPlayerConfig};
use void_core::{Catalog, Game, TickScheduler, Tuning};
use void_store::{load_tuning, unix_millis, FileStore, DEFAULT_SAVE_FILE};

use crate::routes::make_router_with_cors;
use crate::state::{AppState, SimState};
use crate::tick_loop::TickDriver;

#[derive(Parser)]
#[command(name = "void_daemon", about = "Void Architect simulation server")]
struct Cli {
    /// Save file to resume from and autosave into.
    #[arg(long, default_value = DEFAULT_SAVE_FILE)]
    save: PathBuf,
    /// Tuning override file (JSON).
    #[arg(long)]
    tuning: Option<PathBuf>,
    #[arg(long, default_value_t = 20.0)]
    ticks_per_sec: f64,
    /// Seconds of simulated time between autosaves. Defaults to the tuning value.
    #[arg(long)]
    autosave_interval: Option<f64>,
    #[arg(long, default_value = "127.0.0.1:3001")]
    bind: SocketAddr,
    #[arg(long, default_value = "http://localhost:5173")]
    cors_origin: String,
    /// Let the autoplayer click and buy while the server runs.
    #[arg(long)]
    autoplay: bool,
    /// Start with the tick loop paused.
    #[arg(long)]
    paused: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_sim(cli: &Cli) -> Result<SimState> {
    let tuning = match &cli.tuning {
        Some(path) => load_tuning(path)?,
        None => Tuning::STANDARD,
    };
    let mut scheduler = TickScheduler::new(FileStore::new(&cli.save), &tuning);
    if let Some(seconds) = cli.autosave_interval {
        ensure!(seconds > 0.0, "--autosave-interval must be > 0, got {seconds}");
        scheduler = scheduler.with_autosave_interval(seconds);
    }

    let mut game = Game::new(Catalog::STANDARD, tuning);
    if scheduler.restore_into(&mut game) {
        info!(path = %cli.save.display(), "resumed from save");
    } else {
        info!(path = %cli.save.display(), "starting a new game");
    }
    // load events predate any stream subscriber
    let _ = game.take_events();

    Ok(SimState {
        game,
        scheduler,
        autoplayer: cli
            .autoplay
            .then(|| AutoPlayer::new(AutoPlayerConfig::default())),
    })
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    ensure!(
        cli.ticks_per_sec.is_finite() && cli.ticks_per_sec > 0.0,
        "--ticks-per-sec must be > 0, got {}",
        cli.ticks_per_sec
    );

    let app_state = AppState::new(build_sim(&cli)?, cli.ticks_per_sec);
    app_state
        .paused
        .store(cli.paused, std::sync::atomic::Ordering::Relaxed);
    let router = make_router_with_cors(app_state.clone(), &cli.cors_origin)?;

    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .with_context(|| format!("binding {}", cli.bind))?;
    info!(
        "void_daemon listening on http://{} ({} ticks/sec)",
        cli.bind, cli.ticks_per_sec
    );

    let driver = TickDriver::start(app_state.clone());
    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving http");
    driver.stop().await;

    let mut guard = app_state.sim.lock();
    let sim = &mut *guard;
    if sim.scheduler.save_now(&mut sim.game, unix_millis()) {
        info!(path = %cli.save.display(), "final save written");
    } else {
        warn!(path = %cli.save.display(), "final save failed");
    }
    served
}
