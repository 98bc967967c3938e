//! Versioned save snapshot and its validator.
//!
//! Loading never trusts the raw payload. [`validate`] walks every declared
//! field, copies values whose JSON type matches, substitutes defaults for
//! anything missing or mistyped, and reports each repair as a
//! [`FieldWarning`]. Older save versions are migrated in place first.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::{Catalog, Tuning};

pub const CURRENT_SAVE_VERSION: u32 = 2;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("save data is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("save data must be a JSON object, found {found}")]
    NotAnObject { found: &'static str },
    #[error("failed to encode save data: {0}")]
    Encode(#[source] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StructureRecord {
    pub count: u32,
}

/// The persisted form of every piece of simulation state. Created at save
/// time, consumed at load time, never held as live state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub void_energy: f64,
    pub echoes: f64,
    pub transcendence_points: f64,
    pub total_void_energy_generated_this_prestige: f64,
    pub click_heat: f64,
    pub is_core_overheated: bool,
    pub click_efficiency: f64,
    pub structures: BTreeMap<String, StructureRecord>,
    pub upgrades: BTreeMap<String, u32>,
    /// Unix time in milliseconds.
    pub last_save_time: Option<u64>,
    pub save_version: u32,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            void_energy: 0.0,
            echoes: 0.0,
            transcendence_points: 0.0,
            total_void_energy_generated_this_prestige: 0.0,
            click_heat: 0.0,
            is_core_overheated: false,
            click_efficiency: 1.0,
            structures: BTreeMap::new(),
            upgrades: BTreeMap::new(),
            last_save_time: None,
            save_version: CURRENT_SAVE_VERSION,
        }
    }
}

impl Snapshot {
    /// Fresh-game state with an entry for every catalog structure and upgrade.
    pub fn initial(catalog: &Catalog) -> Self {
        Self {
            structures: catalog
                .structures()
                .iter()
                .map(|def| (def.id.as_str().to_string(), StructureRecord::default()))
                .collect(),
            upgrades: catalog
                .upgrades()
                .iter()
                .map(|def| (def.id.as_str().to_string(), 0))
                .collect(),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "problem", rename_all = "snake_case")]
pub enum FieldProblem {
    Missing,
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
    OutOfRange,
    UnknownId,
    /// Save written by a newer build; loaded best-effort.
    NewerVersion {
        version: u64,
    },
}

impl std::fmt::Display for FieldProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldProblem::Missing => f.write_str("missing, using default"),
            FieldProblem::WrongType { expected, found } => {
                write!(f, "expected {expected}, found {found}, using default")
            }
            FieldProblem::OutOfRange => f.write_str("out of range, clamped"),
            FieldProblem::UnknownId => f.write_str("unknown id, dropped"),
            FieldProblem::NewerVersion { version } => write!(
                f,
                "save version {version} is newer than {CURRENT_SAVE_VERSION}, loading best-effort"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldWarning {
    /// Dotted path, e.g. `structures.crystalNode.count`.
    pub field: String,
    #[serde(flatten)]
    pub problem: FieldProblem,
}

impl std::fmt::Display for FieldWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.problem)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    pub snapshot: Snapshot,
    pub warnings: Vec<FieldWarning>,
}

// ---------------------------------------------------------------------------
// Encode / decode
// ---------------------------------------------------------------------------

/// Export text for manual backup.
pub fn encode(snapshot: &Snapshot) -> Result<String, SnapshotError> {
    serde_json::to_string(snapshot).map_err(SnapshotError::Encode)
}

/// Parses export text and runs it through [`validate`].
pub fn decode(text: &str, catalog: &Catalog, tuning: &Tuning) -> Result<Validated, SnapshotError> {
    let raw: Value = serde_json::from_str(text).map_err(SnapshotError::Decode)?;
    validate(&raw, catalog, tuning)
}

// ---------------------------------------------------------------------------
// Migration
// ---------------------------------------------------------------------------

type Migration = fn(&mut Map<String, Value>);

/// `(from_version, step)`: each step lifts a save from `from_version` to the next.
const MIGRATIONS: &[(u64, Migration)] = &[(1, migrate_v1_to_v2)];

/// Version 1 saves may store upgrades as purchase flags. A set flag is level 1.
fn migrate_v1_to_v2(map: &mut Map<String, Value>) {
    if let Some(Value::Object(upgrades)) = map.get_mut("upgrades") {
        for value in upgrades.values_mut() {
            if let Value::Bool(purchased) = *value {
                *value = Value::from(u32::from(purchased));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

struct FieldReader<'a> {
    map: &'a Map<String, Value>,
    warnings: Vec<FieldWarning>,
}

impl<'a> FieldReader<'a> {
    fn warn(&mut self, field: impl Into<String>, problem: FieldProblem) {
        self.warnings.push(FieldWarning {
            field: field.into(),
            problem,
        });
    }

    /// Returns the raw value if present, recording `Missing` otherwise.
    fn present(&mut self, key: &str) -> Option<&'a Value> {
        let map = self.map;
        let value = map.get(key);
        if value.is_none() {
            self.warn(key, FieldProblem::Missing);
        }
        value
    }

    fn number(&mut self, key: &str, default: f64) -> f64 {
        match self.present(key) {
            None => default,
            Some(Value::Number(n)) => n.as_f64().unwrap_or(default),
            Some(other) => {
                let found = json_kind(other);
                self.warn(key, FieldProblem::WrongType { expected: "number", found });
                default
            }
        }
    }

    /// A number that must not be negative; negatives are reset to zero.
    fn non_negative(&mut self, key: &str) -> f64 {
        let value = self.number(key, 0.0);
        if value < 0.0 {
            self.warn(key, FieldProblem::OutOfRange);
            0.0
        } else {
            value
        }
    }

    fn boolean(&mut self, key: &str, default: bool) -> bool {
        match self.present(key) {
            None => default,
            Some(Value::Bool(b)) => *b,
            Some(other) => {
                let found = json_kind(other);
                self.warn(key, FieldProblem::WrongType { expected: "boolean", found });
                default
            }
        }
    }

    fn timestamp(&mut self, key: &str) -> Option<u64> {
        match self.present(key) {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) => {
                let millis = n.as_u64().or_else(|| n.as_f64().and_then(whole_non_negative));
                if millis.is_none() {
                    self.warn(key, FieldProblem::OutOfRange);
                }
                millis
            }
            Some(other) => {
                let found = json_kind(other);
                self.warn(key, FieldProblem::WrongType { expected: "number or null", found });
                None
            }
        }
    }

    fn object(&mut self, key: &str) -> Option<&'a Map<String, Value>> {
        let map = self.map;
        match map.get(key) {
            None => {
                self.warn(key, FieldProblem::Missing);
                None
            }
            Some(Value::Object(inner)) => Some(inner),
            Some(other) => {
                let found = json_kind(other);
                self.warn(key, FieldProblem::WrongType { expected: "object", found });
                None
            }
        }
    }
}

/// Truncates a finite non-negative float to an integer count.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_non_negative(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0).then(|| value.trunc() as u64)
}

/// Reads a per-id count from a non-negative JSON number. The flag is set
/// when the stored value had to be truncated or saturated to fit a `u32`.
fn count_value(value: &Value) -> Result<(u32, bool), FieldProblem> {
    let Value::Number(n) = value else {
        return Err(FieldProblem::WrongType {
            expected: "number",
            found: json_kind(value),
        });
    };
    let (whole, truncated) = match n.as_u64() {
        Some(whole) => (whole, false),
        None => {
            let float = n.as_f64().ok_or(FieldProblem::OutOfRange)?;
            let whole = whole_non_negative(float).ok_or(FieldProblem::OutOfRange)?;
            (whole, float.fract() > 0.0)
        }
    };
    match u32::try_from(whole) {
        Ok(count) => Ok((count, truncated)),
        Err(_) => Ok((u32::MAX, true)),
    }
}

fn read_version(reader: &mut FieldReader<'_>) -> u64 {
    match reader.present("saveVersion") {
        // saves without a version predate versioning
        None => 1,
        Some(Value::Number(n)) => n.as_u64().unwrap_or(1),
        Some(other) => {
            let found = json_kind(other);
            reader.warn("saveVersion", FieldProblem::WrongType { expected: "number", found });
            1
        }
    }
}

fn read_structures(
    reader: &mut FieldReader<'_>,
    catalog: &Catalog,
) -> BTreeMap<String, StructureRecord> {
    let mut structures: BTreeMap<String, StructureRecord> = catalog
        .structures()
        .iter()
        .map(|def| (def.id.as_str().to_string(), StructureRecord::default()))
        .collect();
    let Some(raw) = reader.object("structures") else {
        return structures;
    };
    let mut problems = Vec::new();
    for (id, entry) in raw {
        let Some(record) = structures.get_mut(id) else {
            problems.push((format!("structures.{id}"), FieldProblem::UnknownId));
            continue;
        };
        let field = format!("structures.{id}.count");
        match entry {
            Value::Object(fields) => match fields.get("count").map(count_value) {
                Some(Ok((count, repaired))) => {
                    record.count = count;
                    if repaired {
                        problems.push((field, FieldProblem::OutOfRange));
                    }
                }
                Some(Err(problem)) => problems.push((field, problem)),
                None => problems.push((field, FieldProblem::Missing)),
            },
            other => problems.push((
                format!("structures.{id}"),
                FieldProblem::WrongType {
                    expected: "object",
                    found: json_kind(other),
                },
            )),
        }
    }
    for (field, problem) in problems {
        reader.warn(field, problem);
    }
    structures
}

fn read_upgrades(reader: &mut FieldReader<'_>, catalog: &Catalog) -> BTreeMap<String, u32> {
    let mut upgrades: BTreeMap<String, u32> = catalog
        .upgrades()
        .iter()
        .map(|def| (def.id.as_str().to_string(), 0))
        .collect();
    let Some(raw) = reader.object("upgrades") else {
        return upgrades;
    };
    let mut problems = Vec::new();
    for (id, entry) in raw {
        let Some(def) = catalog.upgrade(id) else {
            problems.push((format!("upgrades.{id}"), FieldProblem::UnknownId));
            continue;
        };
        match count_value(entry) {
            Ok((level, repaired)) => {
                let capped = def.max_level.map_or(level, |max| level.min(max));
                if repaired || capped != level {
                    problems.push((format!("upgrades.{id}"), FieldProblem::OutOfRange));
                }
                upgrades.insert(id.clone(), capped);
            }
            Err(problem) => problems.push((format!("upgrades.{id}"), problem)),
        }
    }
    for (field, problem) in problems {
        reader.warn(field, problem);
    }
    upgrades
}

/// Cleans a raw save payload. Fails only when `raw` is not a JSON object;
/// every field-level problem is repaired and reported.
pub fn validate(
    raw: &Value,
    catalog: &Catalog,
    tuning: &Tuning,
) -> Result<Validated, SnapshotError> {
    let Value::Object(source) = raw else {
        return Err(SnapshotError::NotAnObject {
            found: json_kind(raw),
        });
    };

    let mut map = source.clone();
    let mut version_reader = FieldReader {
        map: source,
        warnings: Vec::new(),
    };
    let version = read_version(&mut version_reader);
    for (from, migrate) in MIGRATIONS {
        if version <= *from {
            migrate(&mut map);
        }
    }

    let mut reader = FieldReader {
        map: &map,
        warnings: version_reader.warnings,
    };
    if version > u64::from(CURRENT_SAVE_VERSION) {
        reader.warn("saveVersion", FieldProblem::NewerVersion { version });
    }

    let defaults = Snapshot::default();
    let mut snapshot = Snapshot {
        void_energy: reader.non_negative("voidEnergy"),
        echoes: reader.non_negative("echoes"),
        transcendence_points: reader.non_negative("transcendencePoints"),
        total_void_energy_generated_this_prestige: reader
            .non_negative("totalVoidEnergyGeneratedThisPrestige"),
        click_heat: reader.number("clickHeat", defaults.click_heat),
        is_core_overheated: reader.boolean("isCoreOverheated", defaults.is_core_overheated),
        click_efficiency: reader.number("clickEfficiency", defaults.click_efficiency),
        structures: read_structures(&mut reader, catalog),
        upgrades: read_upgrades(&mut reader, catalog),
        last_save_time: reader.timestamp("lastSaveTime"),
        save_version: CURRENT_SAVE_VERSION,
    };

    let heat = snapshot.click_heat.clamp(0.0, tuning.max_click_heat);
    if (heat - snapshot.click_heat).abs() > 0.0 {
        reader.warn("clickHeat", FieldProblem::OutOfRange);
        snapshot.click_heat = heat;
    }
    let efficiency = snapshot
        .click_efficiency
        .clamp(tuning.min_click_efficiency.min(1.0), 1.0);
    if (efficiency - snapshot.click_efficiency).abs() > 0.0 {
        reader.warn("clickEfficiency", FieldProblem::OutOfRange);
        snapshot.click_efficiency = efficiency;
    }

    for warning in &reader.warnings {
        warn!(field = %warning.field, "save repaired: {}", warning.problem);
    }
    Ok(Validated {
        snapshot,
        warnings: reader.warnings,
    })
}
