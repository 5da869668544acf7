use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::stats::StatBlock;

pub const DEFAULT_IDENTITY_MARKER: &str = "beyonder";
pub const DEFAULT_NAME: &str = "UNKNOWN";
pub const DEFAULT_SPRITE: &str = "⚔️";
pub const DEFAULT_HP: u32 = 100;
pub const DEFAULT_ATTACK: u32 = 10;
pub const DEFAULT_DEFENCE: u32 = 10;
pub const DEFAULT_SPEED: u32 = 50;

pub const MAX_NAME_LEN: usize = 50;
pub const MAX_IMAGE_URL_LEN: usize = 500;
pub const MAX_UUID_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("card has no identity")]
    MissingIdentity,
    #[error("card identity '{uuid}' does not carry the '{marker}' marker")]
    UnrecognizedIdentity { uuid: String, marker: String },
}

/// Card data as handed over by a scanner or manual entry, before validation.
///
/// Every field is optional and loosely typed; numbers may arrive as strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCard {
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default, alias = "baseHp")]
    pub hp: Option<Value>,
    #[serde(default, alias = "atk", alias = "baseAttack")]
    pub attack: Option<Value>,
    #[serde(default, alias = "defense", alias = "def", alias = "baseDefence")]
    pub defence: Option<Value>,
    #[serde(default, alias = "spd", alias = "baseSpeed")]
    pub speed: Option<Value>,
    #[serde(default)]
    pub sprite: Option<Value>,
    #[serde(default, rename = "imageUrl", alias = "imageURL", alias = "image_url")]
    pub image_url: Option<Value>,
    #[serde(default)]
    pub uuid: Option<Value>,
}

impl RawCard {
    pub fn new(name: &str, uuid: &str, hp: u32, attack: u32, defence: u32) -> Self {
        Self {
            name: Some(Value::from(name)),
            hp: Some(Value::from(hp)),
            attack: Some(Value::from(attack)),
            defence: Some(Value::from(defence)),
            uuid: Some(Value::from(uuid)),
            ..Self::default()
        }
    }
}

/// A validated, normalized card. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterRecord {
    pub name: String,
    pub base_hp: u32,
    pub base_attack: u32,
    pub base_defence: u32,
    pub speed: u32,
    pub sprite: String,
    pub image_url: Option<String>,
    pub uuid: String,
}

impl CharacterRecord {
    /// Validate the identity marker and normalize every other field.
    ///
    /// Only the identity can make a card invalid; bad numbers fall back to defaults.
    pub fn from_raw(raw: &RawCard, marker: &str) -> Result<Self, RecordError> {
        let uuid = raw
            .uuid
            .as_ref()
            .and_then(text)
            .map(|s| truncate(&s, MAX_UUID_LEN))
            .filter(|s| !s.is_empty())
            .ok_or(RecordError::MissingIdentity)?;
        if !uuid.contains(marker) {
            return Err(RecordError::UnrecognizedIdentity {
                uuid,
                marker: marker.to_string(),
            });
        }

        let name = raw
            .name
            .as_ref()
            .and_then(text)
            .filter(|s| !s.is_empty())
            .map(|s| truncate(&s, MAX_NAME_LEN))
            .unwrap_or_else(|| DEFAULT_NAME.to_string());
        let sprite = raw
            .sprite
            .as_ref()
            .and_then(text)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SPRITE.to_string());
        let image_url = raw
            .image_url
            .as_ref()
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(|s| truncate(s, MAX_IMAGE_URL_LEN));

        Ok(Self {
            name,
            base_hp: stat_or(raw.hp.as_ref(), DEFAULT_HP),
            base_attack: stat_or(raw.attack.as_ref(), DEFAULT_ATTACK),
            base_defence: stat_or(raw.defence.as_ref(), DEFAULT_DEFENCE),
            speed: stat_or(raw.speed.as_ref(), DEFAULT_SPEED),
            sprite,
            image_url,
            uuid,
        })
    }

    pub fn base_stats(&self) -> StatBlock {
        StatBlock::new(self.base_hp, self.base_attack, self.base_defence)
    }
}

fn text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Positive integer or `fallback`. Strings are read up to the first non-digit, so
/// `"12abc"` is 12 and `"abc"` falls back.
fn stat_or(v: Option<&Value>, fallback: u32) -> u32 {
    let parsed = match v {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 1.0).map(|f| f.trunc() as u64)),
        Some(Value::String(s)) => {
            let digits: String = s.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse::<u64>().ok()
        }
        _ => None,
    };
    match parsed {
        Some(n) if n > 0 => u32::try_from(n).unwrap_or(u32::MAX),
        _ => fallback,
    }
}
