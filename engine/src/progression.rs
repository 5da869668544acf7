use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::content;
use crate::stats::BonusBlock;

const BASE_EXP_PER_LEVEL: u32 = 100;

/// Experience needed to leave `level`.
pub fn required_exp(level: u32) -> u32 {
    level.max(1).saturating_mul(BASE_EXP_PER_LEVEL)
}

/// Persistent growth of one card, keyed by its uuid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionRecord {
    pub hp_bonus: u32,
    pub attack_bonus: u32,
    pub defence_bonus: u32,
    pub points: u32,
    pub level: u32,
    pub exp: u32,
}

impl Default for ProgressionRecord {
    fn default() -> Self {
        Self {
            hp_bonus: 0,
            attack_bonus: 0,
            defence_bonus: 0,
            points: 0,
            level: 1,
            exp: 0,
        }
    }
}

impl ProgressionRecord {
    pub fn bonuses(&self) -> BonusBlock {
        BonusBlock {
            hp_bonus: self.hp_bonus,
            attack_bonus: self.attack_bonus,
            defence_bonus: self.defence_bonus,
        }
    }

    /// Add experience and level up as many times as it pays for.
    /// Returns the number of levels gained; afterwards `exp < required_exp(level)`.
    pub fn gain_exp(&mut self, amount: u32) -> u32 {
        self.level = self.level.max(1);
        self.exp = self.exp.saturating_add(amount);
        let mut gained = 0;
        while self.exp >= required_exp(self.level) {
            self.exp -= required_exp(self.level);
            self.level += 1;
            gained += 1;
        }
        gained
    }

    fn bonus_mut(&mut self, stat: StatKind) -> &mut u32 {
        match stat {
            StatKind::Hp => &mut self.hp_bonus,
            StatKind::Attack => &mut self.attack_bonus,
            StatKind::Defence => &mut self.defence_bonus,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    Hp,
    Attack,
    Defence,
}

impl FromStr for StatKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hp" | "health" => Ok(StatKind::Hp),
            "attack" | "atk" => Ok(StatKind::Attack),
            "defence" | "defense" | "def" => Ok(StatKind::Defence),
            other => Err(format!("unknown stat '{}'", other)),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read progression from {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write progression to {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("progression document is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("progression document must be a JSON object keyed by uuid")]
    NotAnObject,
    #[error("progression storage unavailable: {0}")]
    Unavailable(String),
}

/// Where a named record-set lives. `read` returns `Ok(None)` when nothing has been saved yet.
pub trait StorageBackend: Send {
    fn describe(&self) -> String;
    fn read(&self) -> Result<Option<String>, StoreError>;
    fn write(&self, document: &str) -> Result<(), StoreError>;
}

/// JSON document on disk.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageBackend for FileBackend {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn read(&self) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                path: self.describe(),
                source,
            }),
        }
    }

    fn write(&self, document: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                path: self.describe(),
                source,
            })?;
        }
        fs::write(&self.path, document).map_err(|source| StoreError::Write {
            path: self.describe(),
            source,
        })
    }
}

/// In-process document. Clones share the same slot, so a test can keep a handle
/// and inspect what the store wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    document: Arc<Mutex<Option<String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: impl Into<String>) -> Self {
        Self {
            document: Arc::new(Mutex::new(Some(document.into()))),
        }
    }

    pub fn document(&self) -> Option<String> {
        self.document.lock().ok().and_then(|d| d.clone())
    }
}

impl StorageBackend for MemoryBackend {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn read(&self) -> Result<Option<String>, StoreError> {
        self.document
            .lock()
            .map(|d| d.clone())
            .map_err(|_| StoreError::Unavailable("memory document lock poisoned".into()))
    }

    fn write(&self, document: &str) -> Result<(), StoreError> {
        let mut slot = self
            .document
            .lock()
            .map_err(|_| StoreError::Unavailable("memory document lock poisoned".into()))?;
        *slot = Some(document.to_string());
        Ok(())
    }
}

const FIELDS: [(&str, u32); 6] = [
    ("hpBonus", 0),
    ("attackBonus", 0),
    ("defenceBonus", 0),
    ("points", 0),
    ("level", 1),
    ("exp", 0),
];

/// Bring one stored record up to the current shape. Returns true if anything changed.
///
/// `speedBonus` becomes `defenceBonus` (a leftover `speedBonus` next to an existing
/// `defenceBonus` is dropped), missing or malformed fields take their defaults and a
/// level of 0 becomes 1. Running it on an already-current record changes nothing.
pub fn migrate(record: &mut Map<String, Value>) -> bool {
    let mut changed = false;

    if let Some(speed) = record.remove("speedBonus") {
        if !record.contains_key("defenceBonus") {
            record.insert("defenceBonus".to_string(), speed);
        }
        changed = true;
    }

    for (field, default) in FIELDS {
        let current = record.get(field).and_then(as_u32);
        let minimum = if field == "level" { 1 } else { 0 };
        let wanted = match current {
            Some(n) if n >= minimum => n,
            _ => default,
        };
        let already = record.get(field).and_then(Value::as_u64) == Some(u64::from(wanted));
        if !already {
            record.insert(field.to_string(), Value::from(wanted));
            changed = true;
        }
    }

    changed
}

fn as_u32(v: &Value) -> Option<u32> {
    if let Some(n) = v.as_u64() {
        return u32::try_from(n).ok();
    }
    v.as_f64()
        .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= f64::from(u32::MAX))
        .map(|f| f as u32)
}

/// Parse a flat `{ uuid: record }` document, migrating each entry.
/// The flag is true when the migrated mapping differs from what was stored.
pub fn parse_document(text: &str) -> Result<(IndexMap<String, ProgressionRecord>, bool), StoreError> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Object(entries) = value else {
        return Err(StoreError::NotAnObject);
    };

    let mut records = IndexMap::with_capacity(entries.len());
    let mut changed = false;
    for (uuid, entry) in entries {
        let Value::Object(mut fields) = entry else {
            warn!(%uuid, "dropping progression entry that is not an object");
            changed = true;
            continue;
        };
        if migrate(&mut fields) {
            debug!(%uuid, "migrated progression record");
            changed = true;
        }
        let record: ProgressionRecord = serde_json::from_value(Value::Object(fields))?;
        records.insert(uuid, record);
    }
    Ok((records, changed))
}

/// Migrated view of what `backend` holds, falling back to the bundled dataset when
/// there is no document. Nothing is written back.
pub fn peek(backend: &dyn StorageBackend) -> Result<IndexMap<String, ProgressionRecord>, StoreError> {
    let text = backend
        .read()?
        .unwrap_or_else(|| content::BUNDLED_PROGRESSION.to_string());
    let (records, _) = parse_document(&text)?;
    Ok(records)
}

/// The uuid → progression mapping plus the backend it is persisted to.
pub struct ProgressionStore {
    records: IndexMap<String, ProgressionRecord>,
    backend: Box<dyn StorageBackend>,
}

impl ProgressionStore {
    /// Load from `backend`. Never fails: a missing document falls back to the bundled
    /// dataset and any read or parse error yields an empty mapping.
    pub fn load(backend: impl StorageBackend + 'static) -> Self {
        let origin = backend.describe();
        let text = match backend.read() {
            Ok(Some(text)) => Some(text),
            Ok(None) => {
                info!(store = %origin, "no saved progression, using bundled defaults");
                Some(content::BUNDLED_PROGRESSION.to_string())
            }
            Err(e) => {
                warn!(store = %origin, error = %e, "progression read failed, starting empty");
                None
            }
        };

        let (records, changed) = match text.as_deref().map(parse_document) {
            Some(Ok(parsed)) => parsed,
            Some(Err(e)) => {
                warn!(store = %origin, error = %e, "progression parse failed, starting empty");
                (IndexMap::new(), false)
            }
            None => (IndexMap::new(), false),
        };

        let store = Self {
            records,
            backend: Box::new(backend),
        };
        info!(store = %origin, records = store.records.len(), "progression loaded");
        if changed {
            store.save();
        }
        store
    }

    /// Empty mapping on a fresh memory backend; nothing is read.
    pub fn in_memory() -> Self {
        Self {
            records: IndexMap::new(),
            backend: Box::new(MemoryBackend::new()),
        }
    }

    pub fn records(&self) -> &IndexMap<String, ProgressionRecord> {
        &self.records
    }

    pub fn get(&self, uuid: &str) -> Option<&ProgressionRecord> {
        self.records.get(uuid)
    }

    pub fn get_or_create(&mut self, uuid: &str) -> &mut ProgressionRecord {
        self.records.entry(uuid.to_string()).or_default()
    }

    /// Trade one point for a permanent +1 bonus on `stat`. No change unless
    /// the record exists and holds at least one point.
    pub fn spend_point(&mut self, uuid: &str, stat: StatKind) -> bool {
        let Some(record) = self.records.get_mut(uuid) else {
            debug!(%uuid, "spend_point on unknown card");
            return false;
        };
        if record.points < 1 {
            return false;
        }
        record.points -= 1;
        *record.bonus_mut(stat) += 1;
        info!(%uuid, ?stat, points_left = record.points, "bonus point spent");
        self.save();
        true
    }

    pub fn to_document(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(&self.records)?)
    }

    /// Best-effort persistence: failures are logged and in-memory state is kept.
    pub fn save(&self) {
        if let Err(e) = self.try_save() {
            warn!(store = %self.backend.describe(), error = %e, "progression save failed");
        }
    }

    pub fn try_save(&self) -> Result<(), StoreError> {
        let document = self.to_document()?;
        self.backend.write(&document)?;
        debug!(store = %self.backend.describe(), records = self.records.len(), "progression saved");
        Ok(())
    }
}

impl std::fmt::Debug for ProgressionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressionStore")
            .field("backend", &self.backend.describe())
            .field("records", &self.records)
            .finish()
    }
}
