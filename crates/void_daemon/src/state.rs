use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use void_control::AutoPlayer;
use void_core::{Event, Game, TickScheduler};
use void_store::FileStore;

pub struct SimState {
    pub game: Game,
    pub scheduler: TickScheduler<FileStore>,
    /// Clicks and buys on the player's behalf when set.
    pub autoplayer: Option<AutoPlayer>,
}

pub type SharedSim = Arc<Mutex<SimState>>;
pub type EventTx = broadcast::Sender<Vec<Event>>;

#[derive(Clone)]
pub struct AppState {
    pub sim: SharedSim,
    pub event_tx: EventTx,
    pub paused: Arc<AtomicBool>,
    pub ticks_per_sec: f64,
}

impl AppState {
    pub fn new(sim: SimState, ticks_per_sec: f64) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            sim: Arc::new(Mutex::new(sim)),
            event_tx,
            paused: Arc::new(AtomicBool::new(false)),
            ticks_per_sec,
        }
    }

    /// Sends events to every stream subscriber. Having none is fine.
    pub fn publish(&self, events: Vec<Event>) {
        if !events.is_empty() {
            let _ = self.event_tx.send(events);
        }
    }
}
