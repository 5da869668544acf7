use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::combat::{CombatRules, CombatRuleset, DEFAULT_BLOCK_CHANCE};
use crate::record::DEFAULT_IDENTITY_MARKER;
use crate::settlement::AwardRule;

pub const DEFAULT_SCAN_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_TURN_DELAY_MS: u64 = 2_000;
pub const DEFAULT_ROULETTE_TICK_MS: u64 = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Session-wide settings. Every field has a default, so a config file only lists overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ArenaConfig {
    pub ruleset: CombatRuleset,
    pub block_chance: f64,
    pub award_rule: AwardRule,
    /// Substring a card's uuid must contain to be accepted.
    pub identity_marker: String,
    pub seed: u64,
    /// Progression file; `None` keeps progression in memory for the session.
    pub store_path: Option<PathBuf>,
    pub scan_timeout_ms: u64,
    pub turn_delay_ms: u64,
    pub roulette_tick_ms: u64,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            ruleset: CombatRuleset::default(),
            block_chance: DEFAULT_BLOCK_CHANCE,
            award_rule: AwardRule::default(),
            identity_marker: DEFAULT_IDENTITY_MARKER.to_string(),
            seed: 0,
            store_path: None,
            scan_timeout_ms: DEFAULT_SCAN_TIMEOUT_MS,
            turn_delay_ms: DEFAULT_TURN_DELAY_MS,
            roulette_tick_ms: DEFAULT_ROULETTE_TICK_MS,
        }
    }
}

impl ArenaConfig {
    /// Load YAML (`.yaml`/`.yml`) or JSON (anything else).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
        if is_yaml {
            Self::from_yaml_str(&text)
        } else {
            Self::from_json_str(&text)
        }
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_yaml::from_str(text)?;
        cfg.validated()
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(text)?;
        cfg.validated()
    }

    pub fn validated(self) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&self.block_chance) {
            return Err(ConfigError::Invalid(format!(
                "block_chance must be within 0..=1, got {}",
                self.block_chance
            )));
        }
        if self.identity_marker.trim().is_empty() {
            return Err(ConfigError::Invalid("identity_marker must not be empty".into()));
        }
        Ok(self)
    }

    pub fn rules(&self) -> CombatRules {
        CombatRules {
            ruleset: self.ruleset,
            block_chance: self.block_chance,
        }
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan_timeout_ms)
    }

    pub fn turn_delay(&self) -> Duration {
        Duration::from_millis(self.turn_delay_ms)
    }

    pub fn roulette_tick(&self) -> Duration {
        Duration::from_millis(self.roulette_tick_ms)
    }
}
