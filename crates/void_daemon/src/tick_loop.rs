use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use void_control::CommandSource;
use void_core::{apply_command, Event};
use void_store::unix_millis;

use crate::state::{AppState, SimState};

/// Owns the background tick task. Dropping the driver without calling
/// [`TickDriver::stop`] leaves the task running until the runtime shuts down.
pub struct TickDriver {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl TickDriver {
    pub fn start(app_state: AppState) -> Self {
        let (shutdown, rx) = watch::channel(false);
        let handle = tokio::spawn(run_tick_loop(app_state, rx));
        Self { shutdown, handle }
    }

    /// Signals the loop and waits for it to exit. No tick runs after this
    /// returns.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.handle.await {
            tracing::error!("tick loop task failed: {err}");
        }
    }
}

/// One host frame: autoplayer commands, then the scheduler's fixed tick order.
pub fn step(sim: &mut SimState, delta_seconds: f64, now_ms: u64) -> Vec<Event> {
    let SimState {
        game,
        scheduler,
        autoplayer,
    } = sim;
    if let Some(player) = autoplayer.as_mut() {
        for command in player.generate_commands(game, delta_seconds) {
            apply_command(game, &command);
        }
    }
    scheduler.advance(game, delta_seconds, now_ms)
}

async fn run_tick_loop(app_state: AppState, mut shutdown: watch::Receiver<bool>) {
    let mut interval =
        tokio::time::interval(Duration::from_secs_f64(1.0 / app_state.ticks_per_sec));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut last = Instant::now();

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = interval.tick() => {}
        }
        if *shutdown.borrow() {
            break;
        }

        let now = Instant::now();
        let delta = now.duration_since(last).as_secs_f64();
        last = now;
        // paused time is dropped, not replayed on resume
        if app_state.paused.load(Ordering::Relaxed) {
            continue;
        }

        let events = {
            let mut guard = app_state.sim.lock();
            step(&mut guard, delta, unix_millis())
        };
        app_state.publish(events);
    }
    tracing::debug!("tick loop stopped");
}
