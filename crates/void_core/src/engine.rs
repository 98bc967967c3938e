use std::convert::Infallible;
use std::fmt::Display;

use serde_json::Value;
use tracing::{debug, error, warn};

use crate::snapshot;
use crate::{Event, Game, Snapshot, Tuning};

/// Where encoded snapshots go. The scheduler only ever hands it finished
/// text; transport and atomicity are the store's concern.
pub trait SnapshotStore {
    type Error: Display;

    fn persist(&mut self, text: &str) -> Result<(), Self::Error>;
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<String>, Self::Error>;
}

/// In-memory store, used by tests and headless runs that do not persist.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    saved: Option<String>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            saved: Some(text.into()),
            writes: 0,
        }
    }

    pub fn saved(&self) -> Option<&str> {
        self.saved.as_deref()
    }

    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl SnapshotStore for MemoryStore {
    type Error = Infallible;

    fn persist(&mut self, text: &str) -> Result<(), Infallible> {
        self.saved = Some(text.to_string());
        self.writes += 1;
        Ok(())
    }

    fn load(&self) -> Result<Option<String>, Infallible> {
        Ok(self.saved.clone())
    }
}

/// Longest stretch one call may simulate, roughly 31 years.
pub const MAX_DELTA_SECONDS: f64 = 1.0e9;

/// Negative, NaN and infinite deltas count as zero elapsed time. Finite
/// deltas are capped at [`MAX_DELTA_SECONDS`] so rate × delta stays finite.
pub fn sanitize_delta(delta_seconds: f64) -> f64 {
    if delta_seconds.is_finite() && delta_seconds > 0.0 {
        delta_seconds.min(MAX_DELTA_SECONDS)
    } else {
        0.0
    }
}

/// Drives a [`Game`] forward and persists it periodically.
#[derive(Debug)]
pub struct TickScheduler<S> {
    store: S,
    draft: Snapshot,
    autosave_interval: f64,
    since_last_save: f64,
}

impl<S: SnapshotStore> TickScheduler<S> {
    pub fn new(store: S, tuning: &Tuning) -> Self {
        Self {
            store,
            draft: Snapshot::default(),
            autosave_interval: tuning.autosave_interval_seconds,
            since_last_save: 0.0,
        }
    }

    /// Overrides the autosave interval. Non-positive values save every tick.
    #[must_use]
    pub fn with_autosave_interval(mut self, seconds: f64) -> Self {
        self.autosave_interval = seconds;
        self
    }

    /// Advance the simulation by `delta_seconds`.
    ///
    /// Order of operations:
    /// 1. Click state machine (cooldown, heat, efficiency, auto-clicks).
    /// 2. Passive income at the current derived rate.
    /// 3. Snapshot draft refresh.
    /// 4. Autosave once the interval has elapsed.
    ///
    /// Returns every event recorded since the previous call, including those
    /// from commands applied between ticks.
    pub fn advance(&mut self, game: &mut Game, delta_seconds: f64, now_ms: u64) -> Vec<Event> {
        let delta = sanitize_delta(delta_seconds);
        if !delta_seconds.is_finite() || delta_seconds < 0.0 {
            debug!(delta_seconds, "invalid delta treated as zero");
        }

        game.tick_clicker(delta);
        game.apply_passive_income(delta);
        game.prepare_snapshot(&mut self.draft);

        self.since_last_save += delta;
        if self.since_last_save >= self.autosave_interval {
            self.save_now(game, now_ms);
        }
        game.take_events()
    }

    /// Writes the current state through the store. Failures are logged and
    /// recorded as [`Event::SaveFailed`]; they never stop the simulation.
    pub fn save_now(&mut self, game: &mut Game, now_ms: u64) -> bool {
        self.since_last_save = 0.0;
        game.prepare_snapshot(&mut self.draft);
        self.draft.last_save_time = Some(now_ms);

        let text = match snapshot::encode(&self.draft) {
            Ok(text) => text,
            Err(err) => {
                error!(%err, "failed to encode snapshot");
                game.record(Event::SaveFailed {
                    reason: err.to_string(),
                });
                return false;
            }
        };
        match self.store.persist(&text) {
            Ok(()) => {
                game.mark_saved(now_ms);
                debug!(bytes = text.len(), "game saved");
                game.record(Event::Saved {
                    last_save_time: Some(now_ms),
                });
                true
            }
            Err(err) => {
                error!(%err, "failed to persist snapshot");
                game.record(Event::SaveFailed {
                    reason: err.to_string(),
                });
                false
            }
        }
    }

    /// Loads the stored save into `game`. Returns `true` when a save was
    /// applied; a missing, unreadable or malformed save leaves `game` at
    /// defaults.
    pub fn restore_into(&mut self, game: &mut Game) -> bool {
        let text = match self.store.load() {
            Ok(Some(text)) => text,
            Ok(None) => return false,
            Err(err) => {
                error!(%err, "failed to read save");
                return false;
            }
        };
        let raw: Value = match serde_json::from_str(&text) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(%err, "save is not valid JSON, starting from defaults");
                game.reset_all();
                return false;
            }
        };
        let loaded = game.load_from_snapshot(&raw).is_ok();
        game.prepare_snapshot(&mut self.draft);
        loaded
    }

    /// The snapshot as of the end of the last tick.
    pub fn draft(&self) -> &Snapshot {
        &self.draft
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn seconds_since_last_save(&self) -> f64 {
        self.since_last_save
    }
}
