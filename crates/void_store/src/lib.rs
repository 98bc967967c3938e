//! Save files and tuning overrides shared between void_cli and void_daemon.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{ensure, Context, Result};
use tracing::debug;
use void_core::{SnapshotStore, Tuning};

pub const DEFAULT_SAVE_FILE: &str = "void_architect_save.json";

/// A single save slot on disk. Writes go through a sibling `.tmp` file and a
/// rename, so a crash mid-write leaves the previous save intact.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotStore for FileStore {
    type Error = anyhow::Error;

    fn persist(&mut self, text: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating save directory: {}", parent.display()))?;
            }
        }
        let tmp_path = self.tmp_path();
        let mut file = File::create(&tmp_path)
            .with_context(|| format!("creating {}", tmp_path.display()))?;
        file.write_all(text.as_bytes())
            .with_context(|| format!("writing {}", tmp_path.display()))?;
        file.sync_all()
            .with_context(|| format!("syncing {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("renaming save into place: {}", self.path.display()))?;
        debug!(path = %self.path.display(), bytes = text.len(), "save written");
        Ok(())
    }

    fn load(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => {
                Err(err).with_context(|| format!("reading save file: {}", self.path.display()))
            }
        }
    }
}

/// Reads a tuning override file. Missing keys keep their standard values.
pub fn load_tuning(path: &Path) -> Result<Tuning> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading tuning file: {}", path.display()))?;
    let tuning: Tuning = serde_json::from_str(&text)
        .with_context(|| format!("parsing tuning file: {}", path.display()))?;
    validate_tuning(&tuning)?;
    Ok(tuning)
}

/// Rejects tunings that would break the click state machine's bounds.
pub fn validate_tuning(tuning: &Tuning) -> Result<()> {
    let positive = [
        ("max_click_heat", tuning.max_click_heat),
        ("heat_per_click", tuning.heat_per_click),
        ("overheat_cooldown_seconds", tuning.overheat_cooldown_seconds),
    ];
    for (name, value) in positive {
        ensure!(value.is_finite() && value > 0.0, "{name} must be > 0, got {value}");
    }
    let non_negative = [
        ("base_click_energy", tuning.base_click_energy),
        ("heat_decay_rate", tuning.heat_decay_rate),
        ("click_efficiency_decay_rate", tuning.click_efficiency_decay_rate),
        ("click_efficiency_recovery_rate", tuning.click_efficiency_recovery_rate),
        ("efficiency_recovery_delay_seconds", tuning.efficiency_recovery_delay_seconds),
    ];
    for (name, value) in non_negative {
        ensure!(value.is_finite() && value >= 0.0, "{name} must be >= 0, got {value}");
    }
    ensure!(
        tuning.min_click_efficiency > 0.0 && tuning.min_click_efficiency <= 1.0,
        "min_click_efficiency must be in (0, 1], got {}",
        tuning.min_click_efficiency
    );
    ensure!(
        tuning.autosave_interval_seconds > 0.0,
        "autosave_interval_seconds must be > 0, got {}",
        tuning.autosave_interval_seconds
    );
    Ok(())
}

/// Wall-clock Unix time in milliseconds, as stored in `lastSaveTime`.
pub fn unix_millis() -> u64 {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
